//! One-pole lowpass smoother.
//!
//! 6 dB/oct lowpass used wherever a gentle rolloff is enough: damping in
//! the reverb tank's feedback paths and tone shaping in the delay's
//! feedback loop. Far cheaper than the SVF when only a lowpass is needed.

use libm::expf;

use crate::math::flush_denormal;

/// One-pole lowpass filter.
///
/// # Example
///
/// ```rust
/// use resin_core::OnePole;
///
/// let mut lp = OnePole::new(48000.0, 4000.0);
/// let smoothed = lp.process(1.0);
/// ```
#[derive(Debug, Clone)]
pub struct OnePole {
    coeff: f32,
    state: f32,
    sample_rate: f32,
    cutoff: f32,
}

impl OnePole {
    /// Create a one-pole lowpass at the given cutoff.
    pub fn new(sample_rate: f32, cutoff_hz: f32) -> Self {
        let mut filter = Self {
            coeff: 0.0,
            state: 0.0,
            sample_rate,
            cutoff: cutoff_hz,
        };
        filter.update_coeff();
        filter
    }

    /// Set the cutoff frequency in Hz.
    ///
    /// Clamped to \[1.0, `sample_rate` × 0.49\].
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.cutoff = cutoff_hz;
        self.update_coeff();
    }

    /// Current cutoff frequency in Hz.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Update the sample rate, keeping the cutoff.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_coeff();
    }

    fn update_coeff(&mut self) {
        let clamped = self.cutoff.clamp(1.0, self.sample_rate * 0.49);
        self.coeff = expf(-core::f32::consts::TAU * clamped / self.sample_rate);
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = flush_denormal(input + self.coeff * (self.state - input));
        self.state
    }

    /// Zero the filter state.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}
