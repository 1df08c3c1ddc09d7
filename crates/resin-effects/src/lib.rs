//! Resin Effects - The synthesizer's master bus
//!
//! Three stereo effects applied after the voice pool has been summed and
//! gain-staged:
//!
//! - [`StereoDelay`] - Tempo-syncable feedback delay with ping-pong mode
//! - [`PlateReverb`] - Dattorro-style plate with a modulated tank
//! - [`Limiter`] - Stereo-linked brickwall with final sanitization
//!
//! All three implement [`resin_core::Effect`] and expose their controls
//! through [`resin_core::ParameterInfo`]. They are real-time safe after
//! construction; buffers are sized once from the sample rate.
//!
//! ## Example
//!
//! ```rust
//! use resin_core::Effect;
//! use resin_effects::{StereoDelay, PlateReverb, Limiter};
//!
//! let mut delay = StereoDelay::new(48000.0);
//! let mut reverb = PlateReverb::new(48000.0);
//! let mut limiter = Limiter::new(48000.0);
//!
//! let (mut l, mut r) = (0.5, -0.5);
//! (l, r) = delay.process_stereo(l, r);
//! (l, r) = reverb.process_stereo(l, r);
//! let _out = limiter.process_stereo(l, r);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod delay;
pub mod limiter;
pub mod reverb;

pub use delay::StereoDelay;
pub use limiter::Limiter;
pub use reverb::PlateReverb;
