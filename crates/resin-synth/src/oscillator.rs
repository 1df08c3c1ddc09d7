//! Audio-rate oscillators with anti-aliasing.
//!
//! Band-limited waveform generation using 4th-order PolyBLEP (Polynomial
//! Band-Limited Step) correction, plus two table-free digital variants:
//! phase-modulation FM with a hidden per-oscillator sine modulator, and
//! mip-mapped wavetable playback.
//!
//! Each unison copy in a voice owns one `Oscillator`, so per-copy state
//! (phase, FM modulator phase, triangle integrator, noise seed) never
//! leaks between copies. Sharing one FM modulator across unison copies
//! detunes the carriers but not the modulators and sounds wrong.

use core::f32::consts::{PI, TAU};
use libm::{floorf, sinf};

use resin_core::SmoothedParam;

use crate::wavetable::Wavetable;

/// Euclidean remainder for f32.
#[inline]
fn rem_euclid_f32(a: f32, b: f32) -> f32 {
    let r = a - b * floorf(a / b);
    if r < 0.0 { r + b } else { r }
}

/// Oscillator waveform types.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OscWaveform {
    /// Pure fundamental tone.
    #[default]
    Sine,
    /// Odd harmonics, softer than saw.
    Triangle,
    /// All harmonics, bright timbre.
    Saw,
    /// Odd harmonics, hollow timbre (50% duty).
    Square,
    /// Variable duty cycle, set via [`Oscillator::set_pulse_width`].
    Pulse,
    /// White noise (xorshift PRNG).
    Noise,
    /// Sine carrier phase-modulated by a hidden sine modulator.
    Fm,
    /// Mip-mapped morph table, rendered via
    /// [`Oscillator::advance_wavetable`].
    Wavetable,
}

/// Duty cycle bounds; 0% or 100% would collapse to DC.
const PULSE_WIDTH_MIN: f32 = 0.05;
const PULSE_WIDTH_MAX: f32 = 0.95;
/// Smoothing time for duty-cycle changes.
const PULSE_WIDTH_SMOOTH_MS: f32 = 5.0;

/// Band-limited audio oscillator.
///
/// # Example
///
/// ```rust
/// use resin_synth::{Oscillator, OscWaveform};
///
/// let mut osc = Oscillator::new(48000.0);
/// osc.set_frequency(440.0);
/// osc.set_waveform(OscWaveform::Saw);
///
/// let sample = osc.advance(1.0);
/// assert!(sample.abs() <= 1.5);
/// ```
#[derive(Debug, Clone)]
pub struct Oscillator {
    /// Current phase position [0.0, 1.0).
    phase: f32,
    /// Phase increment per sample.
    phase_inc: f32,
    sample_rate: f32,
    frequency: f32,
    waveform: OscWaveform,
    /// Smoothed duty cycle for [`OscWaveform::Pulse`].
    pulse_width: SmoothedParam,
    /// Noise state for pseudo-random generation.
    noise_state: u32,
    /// Previous output for triangle integration.
    prev_output: f32,
    /// Hidden FM modulator phase, [0.0, 1.0).
    fm_phase: f32,
    /// Modulator-to-carrier frequency ratio: coarse × (1 + fine).
    fm_ratio: f32,
    /// FM index control, [0, 1].
    fm_depth: f32,
    /// Velocity scaling of the FM index, set at note-on.
    fm_velocity: f32,
    /// True when the last advance wrapped the phase. Drives hard sync.
    wrapped: bool,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl Oscillator {
    /// Create a new oscillator at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: 440.0 / sample_rate,
            sample_rate,
            frequency: 440.0,
            waveform: OscWaveform::Sine,
            pulse_width: SmoothedParam::with_config(0.5, sample_rate, PULSE_WIDTH_SMOOTH_MS),
            noise_state: 0x12345678,
            prev_output: 0.0,
            fm_phase: 0.0,
            fm_ratio: 1.0,
            fm_depth: 0.0,
            fm_velocity: 1.0,
            wrapped: false,
        }
    }

    /// Set frequency in Hz.
    #[inline]
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.frequency = freq_hz.max(0.0);
        self.phase_inc = self.frequency / self.sample_rate;
    }

    /// Current frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Set waveform type.
    pub fn set_waveform(&mut self, waveform: OscWaveform) {
        self.waveform = waveform;
    }

    /// Current waveform.
    pub fn waveform(&self) -> OscWaveform {
        self.waveform
    }

    /// Set the pulse duty cycle, clamped to \[0.05, 0.95\].
    ///
    /// Smoothed over ~5 ms so width sweeps do not click.
    pub fn set_pulse_width(&mut self, width: f32) {
        self.pulse_width
            .set_target(width.clamp(PULSE_WIDTH_MIN, PULSE_WIDTH_MAX));
    }

    /// Set the FM modulator ratio from coarse and fine controls.
    pub fn set_fm_ratio(&mut self, coarse: f32, fine: f32) {
        self.fm_ratio = (coarse * (1.0 + fine)).max(0.0);
    }

    /// Set the FM index, clamped to \[0, 1\].
    pub fn set_fm_depth(&mut self, depth: f32) {
        self.fm_depth = depth.clamp(0.0, 1.0);
    }

    /// Velocity scaling applied to the FM index; call at note-on.
    pub fn set_fm_velocity(&mut self, velocity: f32) {
        self.fm_velocity = velocity.clamp(0.0, 1.0);
    }

    /// Update the sample rate, preserving frequency.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.phase_inc = self.frequency / self.sample_rate;
        self.pulse_width.set_sample_rate(sample_rate);
    }

    /// Reset all per-note state.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.fm_phase = 0.0;
        self.prev_output = 0.0;
        self.wrapped = false;
        self.pulse_width.snap_to_target();
    }

    /// Hard sync: force the phase back to the cycle start.
    ///
    /// Called on slave oscillators when the master wraps.
    pub fn sync(&mut self) {
        self.phase = 0.0;
    }

    /// Set phase directly, \[0, 1\].
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase.clamp(0.0, 1.0);
    }

    /// Current phase.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Whether the last advance wrapped the cycle.
    #[inline]
    pub fn wrapped(&self) -> bool {
        self.wrapped
    }

    /// Generate the next sample.
    ///
    /// `pitch_ratio` scales the phase step for this sample only (LFO
    /// pitch modulation); the nominal increment is untouched, so
    /// modulation never accumulates drift.
    #[inline]
    pub fn advance(&mut self, pitch_ratio: f32) -> f32 {
        let dt = self.phase_inc * pitch_ratio;
        let output = self.generate(self.phase, dt);
        self.step_phase(dt);
        output
    }

    /// Generate the next sample from the shared morph table.
    ///
    /// The mip level follows the effective frequency, so high notes read
    /// reduced-bandwidth levels and never alias.
    #[inline]
    pub fn advance_wavetable(
        &mut self,
        table: &Wavetable,
        morph: f32,
        pitch_ratio: f32,
    ) -> f32 {
        let dt = self.phase_inc * pitch_ratio;
        let mip = Wavetable::mip_for_frequency(self.frequency * pitch_ratio, self.sample_rate);
        let output = table.sample(self.phase, morph, mip);
        self.step_phase(dt);
        output
    }

    #[inline]
    fn step_phase(&mut self, dt: f32) {
        self.phase += dt;
        self.wrapped = self.phase >= 1.0;
        if self.wrapped {
            self.phase -= 1.0;
        }
    }

    /// Each waveform uses a different anti-aliasing strategy:
    ///
    /// - **Sine / FM**: single-harmonic or smooth PM output, `sinf` directly.
    /// - **Saw**: naive ramp with 4th-order PolyBLEP at the wrap.
    /// - **Square / Pulse**: naive bipolar signal with PolyBLEP at both edges.
    /// - **Triangle**: leaky integration of a PolyBLEP-corrected square.
    ///   The triangle's discontinuity is in the derivative, so correcting
    ///   the square before integration works better than a direct BLEP.
    /// - **Noise**: xorshift32, broadband by construction.
    #[inline]
    fn generate(&mut self, phase: f32, dt: f32) -> f32 {
        match self.waveform {
            OscWaveform::Sine => sinf(phase * TAU),

            OscWaveform::Saw => {
                let naive = 2.0 * phase - 1.0;
                naive - poly_blep(phase, dt)
            }

            OscWaveform::Square => self.generate_pulse(phase, 0.5, dt),

            OscWaveform::Pulse => {
                let duty = self.pulse_width.advance();
                self.generate_pulse(phase, duty, dt)
            }

            OscWaveform::Triangle => {
                let square = if phase < 0.5 { 1.0 } else { -1.0 };
                let blep_square =
                    square + poly_blep(phase, dt) - poly_blep(rem_euclid_f32(phase + 0.5, 1.0), dt);

                // Leaky integrator with frequency-adaptive coefficient
                // for DC stability across the audible range.
                let leak = 1.0 - (self.frequency / self.sample_rate).min(0.1);
                self.prev_output = leak * self.prev_output + blep_square * dt * 4.0;
                self.prev_output
            }

            OscWaveform::Noise => self.generate_noise(),

            OscWaveform::Fm => {
                let modulator = sinf(self.fm_phase * TAU);
                let index = self.fm_depth * self.fm_velocity * 4.0 * PI;
                let output = sinf(phase * TAU + index * modulator);

                self.fm_phase += dt * self.fm_ratio;
                self.fm_phase -= floorf(self.fm_phase);
                output
            }

            // Needs the shared table; rendered via advance_wavetable.
            OscWaveform::Wavetable => sinf(phase * TAU),
        }
    }

    #[inline]
    fn generate_pulse(&self, phase: f32, duty: f32, dt: f32) -> f32 {
        let naive = if phase < duty { 1.0 } else { -1.0 };

        // PolyBLEP at the rising (phase = 0) and falling (phase = duty) edges
        let blep1 = poly_blep(phase, dt);
        let blep2 = poly_blep(rem_euclid_f32(phase - duty + 1.0, 1.0), dt);

        naive + blep1 - blep2
    }

    #[inline]
    fn generate_noise(&mut self) -> f32 {
        let mut x = self.noise_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise_state = x;

        (x as i32 as f32) / (i32::MAX as f32)
    }
}

/// 4th-order PolyBLEP correction.
///
/// C²-continuous, degree-4 piecewise polynomial applied within 2 samples
/// of a discontinuity on either side, giving roughly 50 dB of alias
/// suppression versus ~30 dB for the 1-sample 2nd-order form.
///
/// Reference: Välimäki et al., "Antialiasing Oscillators", IEEE Signal
/// Processing Magazine, 2010.
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    // p₁(n) = A₄·n⁴ + A₃·n³ + A₂·n² + A₀  for n ∈ [0,1)
    // p₂(n) = C·(2-n)⁴                     for n ∈ [1,2)
    // with p₁(0) = -1, C⁰/C¹/C² continuity at n=1, smooth exit at n=2.
    const A4: f32 = -43.0 / 48.0;
    const A3: f32 = 7.0 / 6.0;
    const A2: f32 = 0.5;
    const A0: f32 = -1.0;
    const C: f32 = -11.0 / 48.0;

    let dt2 = 2.0 * dt;
    if t < dt2 {
        let n = t / dt;
        if n < 1.0 {
            let n2 = n * n;
            A4 * n2 * n2 + A3 * n2 * n + A2 * n2 + A0
        } else {
            let u = 2.0 - n;
            let u2 = u * u;
            C * u2 * u2
        }
    } else if t > 1.0 - dt2 {
        // Antisymmetric mirror before the discontinuity
        let n = (1.0 - t) / dt;
        if n < 1.0 {
            let n2 = n * n;
            -(A4 * n2 * n2 + A3 * n2 * n + A2 * n2 + A0)
        } else {
            let u = 2.0 - n;
            let u2 = u * u;
            -(C * u2 * u2)
        }
    } else {
        0.0
    }
}
