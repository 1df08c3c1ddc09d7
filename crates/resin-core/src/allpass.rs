//! Schroeder allpass diffusers for the reverb.
//!
//! An allpass passes all frequencies at unit gain but smears their phase,
//! which turns discrete echoes into a dense wash without colouring the
//! tone. [`AllpassFilter`] is the fixed-delay diffuser used at the reverb
//! input; [`ModulatedAllpass`] slowly wobbles its delay time so the tank's
//! recirculating modes never settle into metallic ringing.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

use libm::sinf;

use crate::delay::{InterpolatedDelay, Interpolation};
use crate::math::flush_denormal;

/// Schroeder allpass with a fixed integer delay.
///
/// # Example
///
/// ```rust
/// use resin_core::AllpassFilter;
///
/// // 5 ms diffuser at 48 kHz
/// let mut ap = AllpassFilter::new(240, 0.5);
/// let out = ap.process(1.0);
/// ```
#[derive(Debug, Clone)]
pub struct AllpassFilter {
    buffer: Vec<f32>,
    write_pos: usize,
    feedback: f32,
}

impl AllpassFilter {
    /// Create an allpass with the given delay in samples and feedback gain.
    ///
    /// Feedback is clamped to (-1, 1) for stability.
    ///
    /// # Panics
    ///
    /// Panics if `delay_samples` is 0.
    pub fn new(delay_samples: usize, feedback: f32) -> Self {
        assert!(delay_samples > 0, "allpass delay must be > 0");

        Self {
            buffer: vec![0.0; delay_samples],
            write_pos: 0,
            feedback: feedback.clamp(-0.99, 0.99),
        }
    }

    /// Set the feedback gain, clamped to (-1, 1).
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(-0.99, 0.99);
    }

    /// Current feedback gain.
    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    /// Delay length in samples.
    pub fn delay_samples(&self) -> usize {
        self.buffer.len()
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.write_pos];
        let output = -input + delayed;

        self.buffer[self.write_pos] = flush_denormal(input + delayed * self.feedback);
        self.write_pos = (self.write_pos + 1) % self.buffer.len();

        output
    }

    /// Zero the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// Allpass whose delay time is modulated by an internal sine LFO.
///
/// Used inside the reverb tank. The read head moves a few samples either
/// side of the nominal delay, detuning the loop's resonant modes so long
/// tails stay smooth. Reads are cubic-interpolated to keep the moving
/// head clean.
#[derive(Debug, Clone)]
pub struct ModulatedAllpass {
    delay: InterpolatedDelay,
    base_delay: f32,
    feedback: f32,
    mod_depth: f32,
    lfo_phase: f32,
    lfo_inc: f32,
}

impl ModulatedAllpass {
    /// Create a modulated allpass.
    ///
    /// `base_delay_samples` is the nominal delay; the read head swings
    /// ±`mod_depth_samples` around it at `mod_rate_hz`.
    pub fn new(
        base_delay_samples: f32,
        feedback: f32,
        mod_depth_samples: f32,
        mod_rate_hz: f32,
        sample_rate: f32,
    ) -> Self {
        let capacity = (base_delay_samples + mod_depth_samples) as usize + 4;
        let mut delay = InterpolatedDelay::new(capacity);
        delay.set_interpolation(Interpolation::Cubic);

        Self {
            delay,
            base_delay: base_delay_samples,
            feedback: feedback.clamp(-0.99, 0.99),
            mod_depth: mod_depth_samples,
            lfo_phase: 0.0,
            lfo_inc: mod_rate_hz / sample_rate,
        }
    }

    /// Set the feedback gain, clamped to (-1, 1).
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(-0.99, 0.99);
    }

    /// Offset the LFO phase in \[0, 1\].
    ///
    /// Tank stages run their LFOs at staggered phases so the modulation
    /// never lines up across stages.
    pub fn set_lfo_phase(&mut self, phase: f32) {
        self.lfo_phase = phase.clamp(0.0, 1.0);
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let wobble = sinf(self.lfo_phase * core::f32::consts::TAU) * self.mod_depth;
        let delay_samples = (self.base_delay + wobble).max(1.0);

        self.lfo_phase += self.lfo_inc;
        if self.lfo_phase >= 1.0 {
            self.lfo_phase -= 1.0;
        }

        let delayed = self.delay.read(delay_samples);
        let output = -input + delayed;
        self.delay.write(flush_denormal(input + delayed * self.feedback));

        output
    }

    /// Zero the internal buffer.
    pub fn clear(&mut self) {
        self.delay.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_response_starts_negative() {
        let mut ap = AllpassFilter::new(10, 0.5);

        // First output of an impulse is -input (direct path)
        assert_eq!(ap.process(1.0), -1.0);

        // Nothing until the delayed path arrives
        for _ in 0..9 {
            assert_eq!(ap.process(0.0), 0.0);
        }
        let delayed = ap.process(0.0);
        assert!(delayed > 0.0, "delayed echo expected, got {delayed}");
    }

    #[test]
    fn energy_preserving_over_impulse() {
        // Allpass: the impulse response has unit energy
        let mut ap = AllpassFilter::new(7, 0.6);

        let mut energy = 0.0;
        let mut input = 1.0;
        for _ in 0..4000 {
            let out = ap.process(input);
            energy += out * out;
            input = 0.0;
        }

        assert!(
            (energy - 1.0).abs() < 0.01,
            "impulse energy should be ~1, got {energy}"
        );
    }

    #[test]
    fn feedback_clamped() {
        let ap = AllpassFilter::new(10, 1.5);
        assert_eq!(ap.feedback(), 0.99);

        let mut ap = AllpassFilter::new(10, 0.0);
        ap.set_feedback(-2.0);
        assert_eq!(ap.feedback(), -0.99);
    }

    #[test]
    fn clear_silences() {
        let mut ap = AllpassFilter::new(5, 0.7);
        for _ in 0..20 {
            ap.process(1.0);
        }
        ap.clear();
        assert_eq!(ap.process(0.0), 0.0);
    }

    #[test]
    #[should_panic]
    fn zero_delay_panics() {
        let _ap = AllpassFilter::new(0, 0.5);
    }

    #[test]
    fn modulated_allpass_stays_bounded() {
        let mut ap = ModulatedAllpass::new(150.0, 0.6, 8.0, 0.7, 48000.0);

        let mut peak: f32 = 0.0;
        for i in 0..48000 {
            let input = if i < 100 { 0.5 } else { 0.0 };
            let out = ap.process(input);
            assert!(out.is_finite());
            peak = peak.max(out.abs());
        }
        assert!(peak < 4.0, "runaway output: {peak}");
    }

    #[test]
    fn modulated_allpass_decays_to_silence() {
        let mut ap = ModulatedAllpass::new(100.0, 0.5, 4.0, 1.0, 48000.0);

        ap.process(1.0);
        let mut tail: f32 = 0.0;
        for i in 0..96000 {
            let out = ap.process(0.0);
            if i > 90000 {
                tail = tail.max(out.abs());
            }
        }
        assert!(tail < 1e-3, "tail should decay, got {tail}");
    }

    #[test]
    fn staggered_phases_differ() {
        let mut a = ModulatedAllpass::new(100.0, 0.5, 6.0, 1.0, 48000.0);
        let mut b = ModulatedAllpass::new(100.0, 0.5, 6.0, 1.0, 48000.0);
        b.set_lfo_phase(0.5);

        let mut differ = false;
        for i in 0..2000 {
            let input = if i == 0 { 1.0 } else { 0.0 };
            if (a.process(input) - b.process(input)).abs() > 1e-6 {
                differ = true;
            }
        }
        assert!(differ, "phase-offset instances should diverge");
    }
}
