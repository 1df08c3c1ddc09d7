//! Single-producer/single-consumer atomic flag.
//!
//! The engine's control thread raises flags (LFO retrigger, forced voice
//! recycling) that the render thread consumes exactly once at the start
//! of a block. [`AckFlag`] packages that exchange-and-clear pattern so
//! the memory ordering lives in one place instead of scattered across
//! call sites.

use core::sync::atomic::{AtomicBool, Ordering};

/// Set-once / consume-once boolean for cross-thread signalling.
///
/// The producer calls [`raise`](Self::raise); the consumer calls
/// [`consume`](Self::consume), which returns `true` at most once per
/// raise and clears the flag atomically. Release/Acquire ordering makes
/// writes done before `raise` visible to the consumer after a `true`
/// `consume`.
///
/// ```rust
/// use resin_core::AckFlag;
///
/// let flag = AckFlag::new();
/// flag.raise();
/// assert!(flag.consume());
/// assert!(!flag.consume());
/// ```
#[derive(Debug, Default)]
pub struct AckFlag {
    inner: AtomicBool,
}

impl AckFlag {
    /// Create an unraised flag.
    pub const fn new() -> Self {
        Self {
            inner: AtomicBool::new(false),
        }
    }

    /// Raise the flag. Idempotent until consumed.
    #[inline]
    pub fn raise(&self) {
        self.inner.store(true, Ordering::Release);
    }

    /// Atomically read and clear the flag.
    ///
    /// Returns `true` only if the flag was raised since the last consume.
    #[inline]
    pub fn consume(&self) -> bool {
        self.inner.swap(false, Ordering::Acquire)
    }

    /// Peek without clearing. Diagnostic use only.
    #[inline]
    pub fn is_raised(&self) -> bool {
        self.inner.load(Ordering::Relaxed)
    }
}
