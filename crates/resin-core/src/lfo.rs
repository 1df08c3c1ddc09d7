//! Low-frequency oscillator for control-rate modulation.
//!
//! Phase-accumulator oscillator producing bipolar control signals in
//! \[-1, 1\]. The engine runs two of these as global modulation buses and
//! uses per-voice instances for vibrato.

use libm::{floorf, sinf};

/// LFO waveform type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoWaveform {
    /// Smooth sinusoidal modulation.
    #[default]
    Sine,
    /// Linear up/down ramps.
    Triangle,
    /// Rising ramp with abrupt reset.
    SawUp,
    /// Falling ramp with abrupt reset.
    SawDown,
    /// Binary high/low.
    Square,
    /// Random value latched once per cycle.
    SampleAndHold,
}

/// Phase-accumulator LFO, alias-free at control rates.
///
/// # Example
///
/// ```rust
/// use resin_core::{Lfo, LfoWaveform};
///
/// let mut lfo = Lfo::new(48000.0, 2.0);
/// lfo.set_waveform(LfoWaveform::Triangle);
/// let value = lfo.next();
/// assert!((-1.0..=1.0).contains(&value));
/// ```
#[derive(Debug, Clone)]
pub struct Lfo {
    /// Phase in [0.0, 1.0).
    phase: f32,
    phase_inc: f32,
    sample_rate: f32,
    waveform: LfoWaveform,
    /// Held value for sample & hold.
    sh_value: f32,
    /// Previous phase, for wrap detection.
    prev_phase: f32,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(48000.0, 1.0)
    }
}

impl Lfo {
    /// Create an LFO at the given sample rate and frequency.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: freq_hz / sample_rate,
            sample_rate,
            waveform: LfoWaveform::Sine,
            sh_value: 0.0,
            prev_phase: 0.0,
        }
    }

    /// Set the frequency in Hz.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.phase_inc = freq_hz / self.sample_rate;
    }

    /// Current frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.phase_inc * self.sample_rate
    }

    /// Set the waveform.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    /// Current waveform.
    pub fn waveform(&self) -> LfoWaveform {
        self.waveform
    }

    /// Restart the cycle at phase zero.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.prev_phase = 0.0;
    }

    /// Jump to a specific phase in \[0, 1\].
    ///
    /// Useful for phase-offset pairs: 0.25 = 90 degrees, 0.5 = 180.
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase.clamp(0.0, 1.0);
        self.prev_phase = self.phase;
    }

    /// Current phase in \[0, 1\).
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Produce the next value in \[-1, 1\] and advance the phase.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let output = match self.waveform {
            LfoWaveform::Sine => sinf(self.phase * core::f32::consts::TAU),

            LfoWaveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }

            LfoWaveform::SawUp => 2.0 * self.phase - 1.0,

            LfoWaveform::SawDown => 1.0 - 2.0 * self.phase,

            LfoWaveform::Square => {
                if self.phase < 0.5 { 1.0 } else { -1.0 }
            }

            LfoWaveform::SampleAndHold => {
                // Latch a new pseudo-random value when the phase wraps
                if self.phase < self.prev_phase {
                    let x = sinf(self.phase * 12345.6789) * 43758.5453;
                    self.sh_value = (x - floorf(x)) * 2.0 - 1.0;
                }
                self.sh_value
            }
        };

        self.prev_phase = self.phase;
        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        output
    }

    /// Update the sample rate, preserving the configured frequency.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let freq = self.phase_inc * self.sample_rate;
        self.sample_rate = sample_rate;
        self.set_frequency(freq);
    }
}
