//! Fast approximations for coefficient and control-rate math.
//!
//! These trade full IEEE 754 precision for speed where the input range is
//! bounded and the consumer is a coefficient or a modulation signal, never
//! the audio path itself. Each function documents its accuracy limit.

use libm::floorf;

/// Fast tangent for filter coefficient prewarping.
///
/// Padé \[2/1\] rational approximation:
/// `tan(x) ≈ x · (15 − x²) / (15 − 6x²)`, matching the Taylor series
/// through the x⁵ term.
///
/// Relative error stays under 0.2% for `x < 0.5` (about 7.6 kHz at a
/// 48 kHz rate), growing toward 2% near `x = 1.0`. Callers that need
/// cutoffs above ~10 kHz should fall back to `libm::tanf`.
///
/// ```
/// use resin_core::fast_math::fast_tan;
///
/// let x = core::f32::consts::PI * 1000.0 / 48000.0;
/// let exact = libm::tanf(x);
/// assert!((fast_tan(x) - exact).abs() / exact < 0.001);
/// ```
#[inline]
pub fn fast_tan(x: f32) -> f32 {
    let x2 = x * x;
    x * (15.0 - x2) / (15.0 - 6.0 * x2)
}

/// Fast sine from phase in turns (full cycles).
///
/// `turns` ∈ \[0, 1): 0.0 → 0, 0.25 → 1, 0.5 → 0, 0.75 → −1. Inputs
/// outside the unit range wrap.
///
/// Corrected parabolic approximation (Bhaskara I variant): the base
/// parabola `4p(1−p)` models each half-wave, and the `0.225·y·(y−1)`
/// correction brings peak error from 0.056 down below 0.001. Plenty for
/// LFO and modulation duty.
///
/// ```
/// use resin_core::fast_math::fast_sin_turns;
///
/// assert!(fast_sin_turns(0.0).abs() < 0.002);
/// assert!((fast_sin_turns(0.25) - 1.0).abs() < 0.002);
/// assert!((fast_sin_turns(0.75) + 1.0).abs() < 0.002);
/// ```
#[inline]
pub fn fast_sin_turns(turns: f32) -> f32 {
    let p = turns - floorf(turns);
    let (half_p, sign) = if p < 0.5 {
        (p * 2.0, 1.0_f32)
    } else {
        ((p - 0.5) * 2.0, -1.0_f32)
    };
    let y = 4.0 * half_p * (1.0 - half_p);
    sign * (0.225 * y * (y - 1.0) + y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tan_small_angles() {
        for i in 1..10 {
            let x = i as f32 * 0.01;
            let exact = libm::tanf(x);
            let approx = fast_tan(x);
            let rel_err = (approx - exact).abs() / exact;
            assert!(rel_err < 0.001, "fast_tan({x}) rel_err = {rel_err}");
        }
    }

    #[test]
    fn tan_filter_range() {
        let sr = 48000.0;
        for freq in [20.0, 100.0, 500.0, 1000.0, 2000.0, 5000.0, 9500.0] {
            let x = core::f32::consts::PI * freq / sr;
            let exact = libm::tanf(x);
            let approx = fast_tan(x);
            let rel_err = (approx - exact).abs() / exact;
            assert!(
                rel_err < 0.01,
                "fast_tan at {freq} Hz: exact={exact}, approx={approx}, rel_err={rel_err}"
            );
        }
    }

    #[test]
    fn tan_zero() {
        assert_eq!(fast_tan(0.0), 0.0);
    }

    #[test]
    fn sin_cardinal_points() {
        assert!(fast_sin_turns(0.0).abs() < 0.002);
        assert!((fast_sin_turns(0.25) - 1.0).abs() < 0.002);
        assert!(fast_sin_turns(0.5).abs() < 0.002);
        assert!((fast_sin_turns(0.75) + 1.0).abs() < 0.002);
    }

    #[test]
    fn sin_accuracy_sweep() {
        let mut max_err: f32 = 0.0;
        for i in 0..1000 {
            let turns = i as f32 / 1000.0;
            let exact = libm::sinf(turns * core::f32::consts::TAU);
            let err = (fast_sin_turns(turns) - exact).abs();
            if err > max_err {
                max_err = err;
            }
        }
        assert!(max_err < 0.002, "max sin error {max_err:.6}");
    }

    #[test]
    fn sin_wraps() {
        assert!((fast_sin_turns(1.25) - fast_sin_turns(0.25)).abs() < 0.002);
        assert!((fast_sin_turns(-0.25) - fast_sin_turns(0.75)).abs() < 0.002);
    }
}
