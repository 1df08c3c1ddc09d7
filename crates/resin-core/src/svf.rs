//! State variable filter for per-voice tone shaping.
//!
//! Topology-Preserving Transform (TPT) SVF after Zavalishin, "The Art of
//! VA Filter Design". The trapezoidal integrator discretization keeps the
//! filter stable when cutoff and resonance are modulated per sample,
//! which the envelope and LFO routings do constantly.
//!
//! Resonance is exposed as a normalized \[0, 1\] control and mapped
//! exponentially onto Q ∈ \[0.5, 25\]; the top of the range
//! self-oscillates audibly without blowing up, because the output stage
//! soft-saturates once the signal exceeds twice full scale.
//!
//! # Reference
//!
//! Zavalishin, "The Art of VA Filter Design", rev. 2.1.2 (2018), Ch. 3.

use core::f32::consts::PI;
use libm::{powf, tanf};

use crate::Effect;
use crate::fast_math::fast_tan;
use crate::flush_denormal;
use crate::math::fast_tanh;

/// Filter response selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterMode {
    /// Passes below the cutoff, 12 dB/oct above.
    #[default]
    Lowpass,
    /// Passes above the cutoff.
    Highpass,
    /// Passes a band around the cutoff.
    Bandpass,
    /// Rejects a band around the cutoff.
    Notch,
}

/// Lowest permitted Q, at resonance = 0.
const Q_MIN: f32 = 0.5;
/// Highest permitted Q, at resonance = 1.
const Q_MAX: f32 = 25.0;
/// Output level above which the saturation stage engages.
const SAT_KNEE: f32 = 2.0;

/// TPT state variable filter (2-pole, 12 dB/oct).
///
/// All four responses are computed each sample; [`FilterMode`] selects
/// which one [`Effect::process`] returns.
///
/// # Example
///
/// ```rust
/// use resin_core::{StateVariableFilter, FilterMode, Effect};
///
/// let mut svf = StateVariableFilter::new(48000.0);
/// svf.set_cutoff(2500.0);
/// svf.set_resonance(0.6);
/// svf.set_mode(FilterMode::Bandpass);
///
/// let out = svf.process(0.5);
/// ```
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    // Integrator states
    ic1eq: f32,
    ic2eq: f32,

    // Coefficients
    g: f32,
    k: f32,

    sample_rate: f32,
    cutoff: f32,
    resonance: f32,
    mode: FilterMode,
}

impl Default for StateVariableFilter {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl StateVariableFilter {
    /// Create a filter at the given sample rate.
    ///
    /// Defaults: cutoff 1 kHz, resonance 0 (Q = 0.5), lowpass.
    pub fn new(sample_rate: f32) -> Self {
        let mut svf = Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            g: 0.0,
            k: 0.0,
            sample_rate,
            cutoff: 1000.0,
            resonance: 0.0,
            mode: FilterMode::Lowpass,
        };
        svf.update_coefficients();
        svf
    }

    /// Set the cutoff frequency in Hz.
    ///
    /// Clamped to \[20.0, `sample_rate` × 0.45\]. Cheap enough to call
    /// per sample; uses [`fast_tan`] below 10 kHz and `libm::tanf`
    /// above, where the rational approximation loses accuracy.
    pub fn set_cutoff(&mut self, freq: f32) {
        self.cutoff = freq.clamp(20.0, self.sample_rate * 0.45);
        self.update_coefficients();
    }

    /// Current cutoff frequency in Hz.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Set normalized resonance.
    ///
    /// Clamped to \[0, 1\] and mapped exponentially onto Q ∈ \[0.5, 25\],
    /// so equal control increments feel like equal resonance increments
    /// across the whole range.
    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = resonance.clamp(0.0, 1.0);
        self.update_coefficients();
    }

    /// Current normalized resonance.
    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    /// Effective Q after the exponential map.
    pub fn q(&self) -> f32 {
        powf(Q_MAX / Q_MIN, self.resonance) * Q_MIN
    }

    /// Select which response [`Effect::process`] returns.
    pub fn set_mode(&mut self, mode: FilterMode) {
        self.mode = mode;
    }

    /// Current response selection.
    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    fn update_coefficients(&mut self) {
        let arg = PI * self.cutoff / self.sample_rate;
        self.g = if self.cutoff < 10_000.0 {
            fast_tan(arg)
        } else {
            tanf(arg)
        };
        self.k = 1.0 / self.q();
    }

    /// Process one sample and return all four responses
    /// (lowpass, highpass, bandpass, notch).
    pub fn process_all(&mut self, input: f32) -> (f32, f32, f32, f32) {
        let v3 = input - self.ic2eq;
        let v1 = (self.g * v3 + self.ic1eq) / (1.0 + self.g * (self.g + self.k));
        let v2 = self.ic2eq + self.g * v1;

        self.ic1eq = flush_denormal(2.0 * v1 - self.ic1eq);
        self.ic2eq = flush_denormal(2.0 * v2 - self.ic2eq);

        let lp = saturate_output(v2);
        let bp = saturate_output(v1);
        let hp = saturate_output(input - self.k * v1 - v2);
        let notch = saturate_output(lp + hp);

        (lp, hp, bp, notch)
    }
}

/// Soft-limit the filter output once it exceeds twice full scale.
///
/// Linear through \[-2, 2\], then a tanh knee that caps the excursion at
/// ±3. High resonance can ring far above full scale; this keeps the
/// self-oscillation region musical instead of explosive.
#[inline]
fn saturate_output(x: f32) -> f32 {
    let mag = x.abs();
    if mag <= SAT_KNEE {
        x
    } else {
        let sign = if x >= 0.0 { 1.0 } else { -1.0 };
        sign * (SAT_KNEE + fast_tanh(mag - SAT_KNEE))
    }
}

impl Effect for StateVariableFilter {
    fn process(&mut self, input: f32) -> f32 {
        let (lp, hp, bp, notch) = self.process_all(input);

        match self.mode {
            FilterMode::Lowpass => lp,
            FilterMode::Highpass => hp,
            FilterMode::Bandpass => bp,
            FilterMode::Notch => notch,
        }
    }

    fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.cutoff = self.cutoff.clamp(20.0, sample_rate * 0.45);
        self.update_coefficients();
    }
}
