//! Circular-buffer delay line with fractional reads.
//!
//! The building block under the stereo delay effect, the reverb tank,
//! and the allpass diffusers. The buffer is heap-allocated once at
//! construction and never reallocates; no allocation happens while
//! processing.
//!
//! For modulated read positions (the reverb tank), use
//! [`Interpolation::Cubic`] so the moving read head does not introduce
//! zipper noise.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

/// Interpolation method for fractional delay reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Truncate to the nearest sample (lowest cost).
    None,
    /// Two-point linear interpolation.
    #[default]
    Linear,
    /// Four-point cubic Lagrange interpolation (best for modulated reads).
    Cubic,
}

/// Variable-length delay line over a circular buffer.
///
/// # Example
///
/// ```rust
/// use resin_core::InterpolatedDelay;
///
/// let max_delay_samples = (0.05 * 48000.0) as usize;
/// let mut delay = InterpolatedDelay::new(max_delay_samples);
///
/// let output = delay.read(10.5);
/// delay.write(1.0);
/// ```
#[derive(Debug, Clone)]
pub struct InterpolatedDelay {
    buffer: Vec<f32>,
    write_pos: usize,
    interpolation: Interpolation,
}

impl InterpolatedDelay {
    /// Create a delay line holding up to `max_delay_samples` samples.
    ///
    /// # Panics
    ///
    /// Panics if `max_delay_samples` is 0.
    pub fn new(max_delay_samples: usize) -> Self {
        assert!(max_delay_samples > 0, "delay size must be > 0");

        Self {
            buffer: vec![0.0; max_delay_samples],
            write_pos: 0,
            interpolation: Interpolation::Linear,
        }
    }

    /// Create from a sample rate and maximum delay time in seconds.
    pub fn from_time(sample_rate: f32, max_seconds: f32) -> Self {
        let max_samples = (sample_rate * max_seconds) as usize + 1;
        Self::new(max_samples)
    }

    /// Select the interpolation method for fractional reads.
    pub fn set_interpolation(&mut self, interp: Interpolation) {
        self.interpolation = interp;
    }

    /// Read the sample `delay_samples` behind the write head.
    ///
    /// `delay_samples` may be fractional; values beyond the capacity are
    /// clamped.
    #[inline]
    pub fn read(&self, delay_samples: f32) -> f32 {
        debug_assert!(delay_samples >= 0.0);

        let len = self.buffer.len();
        let delay_clamped = delay_samples.min((len - 1) as f32);

        let delay_int = delay_clamped as usize;
        let frac = delay_clamped - delay_int as f32;

        // Points at the sample delay_int steps before the last write.
        let read_pos = (self.write_pos + len - delay_int - 1) % len;

        match self.interpolation {
            Interpolation::None => self.buffer[read_pos],

            Interpolation::Linear => {
                let next_pos = (read_pos + len - 1) % len;
                let a = self.buffer[read_pos];
                let b = self.buffer[next_pos];
                a + (b - a) * frac
            }

            Interpolation::Cubic => {
                let p0 = (read_pos + 1) % len;
                let p1 = read_pos;
                let p2 = (read_pos + len - 1) % len;
                let p3 = (read_pos + len - 2) % len;

                let y0 = self.buffer[p0];
                let y1 = self.buffer[p1];
                let y2 = self.buffer[p2];
                let y3 = self.buffer[p3];

                let t = frac;
                let t2 = t * t;
                let t3 = t2 * t;

                let a0 = y3 - y2 - y0 + y1;
                let a1 = y0 - y1 - a0;
                let a2 = y2 - y0;

                a0 * t3 + a1 * t2 + a2 * t + y1
            }
        }
    }

    /// Write a sample and advance the write head.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Read then write in one call.
    #[inline]
    pub fn read_write(&mut self, sample: f32, delay_samples: f32) -> f32 {
        let output = self.read(delay_samples);
        self.write(sample);
        output
    }

    /// Zero the buffer and rewind the write head.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    /// Maximum delay capacity in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_delay_recall() {
        let mut delay = InterpolatedDelay::new(10);

        for i in 1..=5 {
            delay.write(i as f32);
        }
        delay.write(6.0);

        assert_eq!(delay.read(3.0), 3.0);
    }

    #[test]
    fn fractional_read_interpolates() {
        let mut delay = InterpolatedDelay::new(10);

        delay.write(0.0);
        delay.write(1.0);
        delay.write(2.0);
        delay.write(3.0);

        let output = delay.read(1.5);
        assert!((output - 1.5).abs() < 0.01, "expected ~1.5, got {output}");
    }

    #[test]
    fn read_across_wrap_boundary() {
        let mut delay = InterpolatedDelay::new(4);

        delay.write(1.0);
        delay.write(2.0);
        delay.write(3.0);
        delay.write(4.0);
        delay.write(5.0); // wraps

        assert_eq!(delay.read(3.0), 2.0);
    }

    #[test]
    fn none_interpolation_truncates() {
        let mut delay = InterpolatedDelay::new(16);
        delay.set_interpolation(Interpolation::None);

        for i in 0..5 {
            delay.write(i as f32);
        }

        assert_eq!(delay.read(1.7), 3.0);
    }

    #[test]
    fn cubic_beats_linear_on_smooth_signal() {
        let mut delay_lin = InterpolatedDelay::new(64);
        let mut delay_cub = InterpolatedDelay::new(64);
        delay_cub.set_interpolation(Interpolation::Cubic);

        for i in 0..32 {
            let sample = libm::sinf(i as f32 * core::f32::consts::TAU / 32.0);
            delay_lin.write(sample);
            delay_cub.write(sample);
        }

        // delay 5.5 behind the last write (index 31) is sample index 25.5
        let true_val = libm::sinf(25.5 * core::f32::consts::TAU / 32.0);

        let lin_err = (delay_lin.read(5.5) - true_val).abs();
        let cub_err = (delay_cub.read(5.5) - true_val).abs();

        assert!(
            cub_err <= lin_err,
            "cubic error ({cub_err}) should be <= linear error ({lin_err})"
        );
    }

    #[test]
    fn cubic_survives_wrap() {
        let mut delay = InterpolatedDelay::new(8);
        delay.set_interpolation(Interpolation::Cubic);

        for i in 0..12 {
            delay.write(i as f32);
        }

        assert!(delay.read(6.5).is_finite());
    }

    #[test]
    fn clear_silences() {
        let mut delay = InterpolatedDelay::new(8);
        for _ in 0..16 {
            delay.write(1.0);
        }
        delay.clear();
        assert_eq!(delay.read(4.0), 0.0);
    }

    #[test]
    #[should_panic]
    fn zero_size_panics() {
        let _delay = InterpolatedDelay::new(0);
    }
}
