//! Math utilities for real-time DSP.
//!
//! Allocation-free helpers shared across the engine: level conversions,
//! clipping, interpolation, and numeric hygiene for feedback paths.

use libm::{expf, logf, tanhf};

/// Convert decibels to linear gain.
///
/// 0 dB maps to 1.0, -6 dB to ~0.5, +6 dB to ~2.0.
///
/// ```rust
/// use resin_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
///
/// Input is floored at 1e-10 so silence maps to -200 dB instead of -inf.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    // 20 * log10(x) = 20 * ln(x) / ln(10)
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Hyperbolic tangent for saturation stages.
#[inline]
pub fn fast_tanh(x: f32) -> f32 {
    tanhf(x)
}

/// Soft clip via hyperbolic tangent.
///
/// Smooth saturation approaching ±1 asymptotically. Used as the final
/// per-sample safety stage of the voice mix bus.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    tanhf(x)
}

/// Hard clip to the ±threshold range.
#[inline]
pub fn hard_clip(x: f32, threshold: f32) -> f32 {
    x.clamp(-threshold, threshold)
}

/// Linear interpolation from `a` (t = 0) to `b` (t = 1).
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Convert milliseconds to samples.
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms * sample_rate / 1000.0
}

/// Replace NaN and infinity with silence.
///
/// A corrupted sample in a feedback structure poisons everything after
/// it, so the engine sanitizes at the voice output and after the final
/// limiter stage.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn sanitize(x: f32) -> f32 {
    if x.is_finite() { x } else { 0.0 }
}

/// Flush subnormal floats to zero.
///
/// Subnormals (below ~1.2e-38) cause large slowdowns on most CPUs.
/// Values below 1e-20 are replaced with zero, leaving margin before the
/// subnormal range begins. Apply in any feedback loop where the signal
/// can decay indefinitely: delay lines, allpass chains, filter states.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Crossfade between dry and wet signals.
///
/// Same result as `dry * (1 - mix) + wet * mix` with one fewer multiply.
#[inline]
pub fn wet_dry_mix(dry: f32, wet: f32, mix: f32) -> f32 {
    dry + (wet - dry) * mix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_linear_roundtrip() {
        let original = 0.5;
        let db = linear_to_db(original);
        let back = db_to_linear(db);
        assert!(
            (original - back).abs() < 1e-5,
            "roundtrip failed: {original} -> {db} -> {back}"
        );
    }

    #[test]
    fn db_known_values() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-6.0206) - 0.5).abs() < 0.001);
        assert!((db_to_linear(6.0206) - 2.0).abs() < 0.001);
    }

    #[test]
    fn soft_clip_bounded() {
        assert!(soft_clip(4.0) < 1.0 && soft_clip(4.0) > 0.99);
        assert!(soft_clip(-4.0) > -1.0 && soft_clip(-4.0) < -0.99);
    }

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(0.0, 10.0, 0.0), 0.0);
        assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
        assert_eq!(lerp(0.0, 10.0, 1.0), 10.0);
    }

    #[test]
    fn ms_conversion() {
        assert_eq!(ms_to_samples(10.0, 48000.0), 480.0);
        assert_eq!(ms_to_samples(1.0, 48000.0), 48.0);
    }

    #[test]
    fn denormals_flushed() {
        assert_eq!(flush_denormal(1.0), 1.0);
        assert_eq!(flush_denormal(1e-10), 1e-10);
        assert_eq!(flush_denormal(1e-21), 0.0);
        assert_eq!(flush_denormal(-1e-38), 0.0);
    }

    #[test]
    fn sanitize_replaces_non_finite() {
        assert_eq!(sanitize(0.5), 0.5);
        assert_eq!(sanitize(f32::NAN), 0.0);
        assert_eq!(sanitize(f32::INFINITY), 0.0);
        assert_eq!(sanitize(f32::NEG_INFINITY), 0.0);
    }

    #[test]
    fn wet_dry_matches_reference() {
        let dry = 0.3;
        let wet = 0.8;
        let mix = 0.7;
        let expected = dry * (1.0 - mix) + wet * mix;
        assert!((wet_dry_mix(dry, wet, mix) - expected).abs() < 1e-6);
        assert_eq!(wet_dry_mix(1.0, 0.5, 0.0), 1.0);
        assert_eq!(wet_dry_mix(1.0, 0.5, 1.0), 0.5);
    }
}
