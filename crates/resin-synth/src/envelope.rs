//! ADSR envelope generator.
//!
//! Exponential attack-decay-sustain-release segments for amplitude and
//! filter modulation. Two behaviors matter for click-free polyphony:
//! retriggering holds the prior level as a decaying floor for ~5 ms so a
//! re-pressed note never steps down to zero, and the release segment can
//! be sped up by the voice pool when many voices are ringing.

use libm::expf;

/// Sustain is clamped away from exact zero; a zero target never
/// terminates an exponential segment.
const SUSTAIN_FLOOR: f32 = 1e-4;
/// Duration of the retrigger level floor.
const RETRIGGER_FLOOR_MS: f32 = 5.0;
/// Velocity sensitivity shortens segment times to at most 10% of nominal.
const VELOCITY_TIME_RANGE: f32 = 0.9;

/// ADSR envelope states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeState {
    /// Inactive, output is zero.
    #[default]
    Idle,
    /// Ramping up toward peak.
    Attack,
    /// Falling from peak toward sustain.
    Decay,
    /// Holding at sustain while the gate is held.
    Sustain,
    /// Decaying to zero after gate release.
    Release,
}

/// Exponential ADSR envelope.
///
/// # Example
///
/// ```rust
/// use resin_synth::{AdsrEnvelope, EnvelopeState};
///
/// let mut env = AdsrEnvelope::new(48000.0);
/// env.set_attack_ms(10.0);
/// env.set_decay_ms(100.0);
/// env.set_sustain(0.7);
/// env.set_release_ms(200.0);
///
/// env.gate_on(1.0);
/// let level = env.advance();
/// assert!(level > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    state: EnvelopeState,
    level: f32,
    sample_rate: f32,

    // Nominal times in milliseconds, before velocity scaling
    attack_ms: f32,
    decay_ms: f32,
    release_ms: f32,
    sustain: f32,

    /// Velocity-to-time sensitivity, [0, 1].
    velocity_sens: f32,
    /// Time scale from the velocity of the current note.
    velocity_time_scale: f32,
    /// Release speed-up applied by the pool under load.
    release_scale: f32,

    // Pre-calculated per-segment coefficients
    attack_coeff: f32,
    decay_coeff: f32,
    release_coeff: f32,

    /// Attack overshoots 1.0 so the exponential actually arrives.
    attack_target: f32,

    // Retrigger floor: prior level, ramped to zero over the floor window
    floor_level: f32,
    floor_step: f32,
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl AdsrEnvelope {
    /// Create an envelope with 10/100/0.7/200 defaults.
    pub fn new(sample_rate: f32) -> Self {
        let mut env = Self {
            state: EnvelopeState::Idle,
            level: 0.0,
            sample_rate,
            attack_ms: 10.0,
            decay_ms: 100.0,
            release_ms: 200.0,
            sustain: 0.7,
            velocity_sens: 0.0,
            velocity_time_scale: 1.0,
            release_scale: 1.0,
            attack_coeff: 0.0,
            decay_coeff: 0.0,
            release_coeff: 0.0,
            attack_target: 1.2,
            floor_level: 0.0,
            floor_step: 0.0,
        };
        env.recalculate_coefficients();
        env
    }

    /// Set attack time in milliseconds.
    pub fn set_attack_ms(&mut self, ms: f32) {
        self.attack_ms = ms.max(0.1);
        self.recalculate_coefficients();
    }

    /// Attack time in milliseconds.
    pub fn attack_ms(&self) -> f32 {
        self.attack_ms
    }

    /// Set decay time in milliseconds.
    pub fn set_decay_ms(&mut self, ms: f32) {
        self.decay_ms = ms.max(0.1);
        self.recalculate_coefficients();
    }

    /// Decay time in milliseconds.
    pub fn decay_ms(&self) -> f32 {
        self.decay_ms
    }

    /// Set sustain level, clamped to \[1e-4, 1\].
    pub fn set_sustain(&mut self, level: f32) {
        self.sustain = level.clamp(SUSTAIN_FLOOR, 1.0);
    }

    /// Sustain level.
    pub fn sustain(&self) -> f32 {
        self.sustain
    }

    /// Set release time in milliseconds.
    pub fn set_release_ms(&mut self, ms: f32) {
        self.release_ms = ms.max(0.1);
        self.recalculate_coefficients();
    }

    /// Release time in milliseconds.
    pub fn release_ms(&self) -> f32 {
        self.release_ms
    }

    /// Set velocity-to-time sensitivity, \[0, 1\].
    ///
    /// At sensitivity 1 and velocity 1, segment times shrink to 10% of
    /// nominal: `scaled = base × (1 − sens × vel × 0.9)`.
    pub fn set_velocity_sensitivity(&mut self, sens: f32) {
        self.velocity_sens = sens.clamp(0.0, 1.0);
    }

    /// Speed up the release segment (1.0 = nominal, 2.0 = twice as fast).
    ///
    /// The pool raises this under heavy load so the release backlog
    /// drains before the voice count explodes.
    pub fn set_release_scale(&mut self, scale: f32) {
        let scale = scale.max(1.0);
        if (scale - self.release_scale).abs() > f32::EPSILON {
            self.release_scale = scale;
            self.recalculate_coefficients();
        }
    }

    /// Update the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coefficients();
    }

    /// Trigger the envelope with a normalized velocity, \[0, 1\].
    ///
    /// If the envelope is still sounding, the current level is captured
    /// and held as a decaying floor for ~5 ms while the new attack ramps,
    /// so retriggering never produces a step discontinuity.
    pub fn gate_on(&mut self, velocity: f32) {
        if self.state != EnvelopeState::Idle && self.level > 0.001 {
            let floor_samples =
                (RETRIGGER_FLOOR_MS / 1000.0 * self.sample_rate).max(1.0);
            self.floor_level = self.level;
            self.floor_step = self.level / floor_samples;
        }

        self.velocity_time_scale =
            1.0 - self.velocity_sens * velocity.clamp(0.0, 1.0) * VELOCITY_TIME_RANGE;
        self.recalculate_coefficients();
        self.state = EnvelopeState::Attack;
    }

    /// Release the envelope (note off).
    pub fn gate_off(&mut self) {
        if self.state != EnvelopeState::Idle {
            self.state = EnvelopeState::Release;
        }
    }

    /// Force the envelope to idle.
    pub fn reset(&mut self) {
        self.state = EnvelopeState::Idle;
        self.level = 0.0;
        self.floor_level = 0.0;
        self.floor_step = 0.0;
        self.release_scale = 1.0;
        self.recalculate_coefficients();
    }

    /// Current state.
    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// Current level without advancing.
    pub fn level(&self) -> f32 {
        self.level.max(self.floor_level)
    }

    /// Whether the envelope is active (not idle).
    pub fn is_active(&self) -> bool {
        self.state != EnvelopeState::Idle
    }

    /// Whether the envelope is in its release segment.
    pub fn is_releasing(&self) -> bool {
        self.state == EnvelopeState::Release
    }

    /// Advance one sample and return the current level.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        match self.state {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                self.level =
                    self.attack_target + (self.level - self.attack_target) * self.attack_coeff;

                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.state = EnvelopeState::Decay;
                }
            }

            EnvelopeState::Decay => {
                self.level = self.sustain + (self.level - self.sustain) * self.decay_coeff;

                if (self.level - self.sustain).abs() < 0.0001 {
                    self.level = self.sustain;
                    self.state = EnvelopeState::Sustain;
                }
            }

            EnvelopeState::Sustain => {
                self.level = self.sustain;
            }

            EnvelopeState::Release => {
                self.level *= self.release_coeff;

                if self.level < 0.0001 {
                    self.level = 0.0;
                    self.state = EnvelopeState::Idle;
                }
            }
        }

        // The retrigger floor ramps to zero underneath the new segment
        if self.floor_level > 0.0 {
            self.floor_level = (self.floor_level - self.floor_step).max(0.0);
        }

        self.level.max(self.floor_level)
    }

    fn recalculate_coefficients(&mut self) {
        self.attack_coeff = time_coeff(self.attack_ms * self.velocity_time_scale, self.sample_rate);
        self.decay_coeff = time_coeff(self.decay_ms * self.velocity_time_scale, self.sample_rate);
        self.release_coeff = time_coeff(
            self.release_ms * self.velocity_time_scale / self.release_scale,
            self.sample_rate,
        );
    }
}

/// One-pole coefficient reaching ~63% of target in the given time.
#[inline]
fn time_coeff(ms: f32, sample_rate: f32) -> f32 {
    let samples = ms * sample_rate / 1000.0;
    expf(-1.0 / samples.max(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_outputs_zero() {
        let mut env = AdsrEnvelope::new(48000.0);
        assert_eq!(env.state(), EnvelopeState::Idle);
        for _ in 0..100 {
            assert_eq!(env.advance(), 0.0);
        }
    }

    #[test]
    fn attack_rises_monotonically() {
        let mut env = AdsrEnvelope::new(48000.0);
        env.set_attack_ms(10.0);
        env.gate_on(1.0);

        let mut prev = 0.0;
        while env.state() == EnvelopeState::Attack {
            let level = env.advance();
            assert!(level >= prev, "attack must rise: {prev} -> {level}");
            prev = level;
        }
        assert_eq!(env.state(), EnvelopeState::Decay);
    }

    #[test]
    fn decay_reaches_sustain() {
        let mut env = AdsrEnvelope::new(48000.0);
        env.set_attack_ms(1.0);
        env.set_decay_ms(10.0);
        env.set_sustain(0.5);
        env.gate_on(1.0);

        for _ in 0..5000 {
            env.advance();
        }
        assert_eq!(env.state(), EnvelopeState::Sustain);
        assert!((env.level() - 0.5).abs() < 0.01);
    }

    #[test]
    fn decay_and_release_non_increasing() {
        let mut env = AdsrEnvelope::new(48000.0);
        env.set_attack_ms(1.0);
        env.set_decay_ms(20.0);
        env.set_sustain(0.4);
        env.set_release_ms(30.0);
        env.gate_on(1.0);

        // run past the attack
        while env.state() == EnvelopeState::Attack {
            env.advance();
        }
        let mut prev = env.level();
        for _ in 0..3000 {
            let level = env.advance();
            assert!(level <= prev + 1e-6, "decay must not rise");
            prev = level;
        }

        env.gate_off();
        for _ in 0..10000 {
            let level = env.advance();
            assert!(level <= prev + 1e-6, "release must not rise");
            prev = level;
        }
    }

    #[test]
    fn release_reaches_idle() {
        let mut env = AdsrEnvelope::new(48000.0);
        env.set_attack_ms(1.0);
        env.set_decay_ms(1.0);
        env.set_release_ms(50.0);
        env.gate_on(1.0);
        for _ in 0..2000 {
            env.advance();
        }
        env.gate_off();
        for _ in 0..48000 {
            env.advance();
        }
        assert_eq!(env.state(), EnvelopeState::Idle);
        assert!(env.level() < 0.001);
    }

    #[test]
    fn sustain_clamped_off_zero() {
        let mut env = AdsrEnvelope::new(48000.0);
        env.set_sustain(0.0);
        assert!(env.sustain() > 0.0);
        env.set_sustain(-1.0);
        assert!(env.sustain() > 0.0);
    }

    #[test]
    fn velocity_shortens_times() {
        let mut fast = AdsrEnvelope::new(48000.0);
        let mut slow = AdsrEnvelope::new(48000.0);
        for env in [&mut fast, &mut slow] {
            env.set_attack_ms(50.0);
            env.set_velocity_sensitivity(1.0);
        }
        fast.gate_on(1.0);
        slow.gate_on(0.0);

        // After 10ms the high-velocity envelope has climbed further
        for _ in 0..480 {
            fast.advance();
            slow.advance();
        }
        assert!(
            fast.level() > slow.level(),
            "velocity 1.0 should attack faster: {} vs {}",
            fast.level(),
            slow.level()
        );
    }

    #[test]
    fn retrigger_holds_floor() {
        let mut env = AdsrEnvelope::new(48000.0);
        env.set_attack_ms(100.0);
        env.set_decay_ms(100.0);
        env.set_sustain(0.8);
        env.gate_on(1.0);

        for _ in 0..10000 {
            env.advance();
        }
        let before = env.level();
        assert!(before > 0.5);

        env.gate_on(1.0);
        // Immediately after retrigger the output must not collapse
        let after = env.advance();
        assert!(
            after > before * 0.9,
            "retrigger must hold prior level: {before} -> {after}"
        );
    }

    #[test]
    fn retrigger_floor_expires() {
        let mut env = AdsrEnvelope::new(48000.0);
        env.set_attack_ms(1.0);
        env.set_sustain(0.9);
        env.gate_on(1.0);
        for _ in 0..2000 {
            env.advance();
        }
        env.gate_on(1.0);

        // 10ms later the floor has fully ramped out
        for _ in 0..480 {
            env.advance();
        }
        assert_eq!(env.level(), env.level.max(0.0));
        assert_eq!(env.floor_level, 0.0);
    }

    #[test]
    fn release_scale_speeds_release() {
        let mut nominal = AdsrEnvelope::new(48000.0);
        let mut scaled = AdsrEnvelope::new(48000.0);
        for env in [&mut nominal, &mut scaled] {
            env.set_attack_ms(1.0);
            env.set_decay_ms(1.0);
            env.set_sustain(1.0);
            env.set_release_ms(500.0);
            env.gate_on(1.0);
        }
        for _ in 0..1000 {
            nominal.advance();
            scaled.advance();
        }
        nominal.gate_off();
        scaled.gate_off();
        scaled.set_release_scale(8.0);

        for _ in 0..4800 {
            nominal.advance();
            scaled.advance();
        }
        assert!(
            scaled.level() < nominal.level() * 0.5,
            "8x release should decay much faster: {} vs {}",
            scaled.level(),
            nominal.level()
        );
    }

    #[test]
    fn state_transition_sequence() {
        let mut env = AdsrEnvelope::new(48000.0);
        env.set_attack_ms(1.0);
        env.set_decay_ms(5.0);
        env.set_sustain(0.5);
        env.set_release_ms(10.0);

        assert_eq!(env.state(), EnvelopeState::Idle);
        env.gate_on(1.0);
        assert_eq!(env.state(), EnvelopeState::Attack);

        for _ in 0..48000 {
            env.advance();
            if env.state() == EnvelopeState::Sustain {
                break;
            }
        }
        assert_eq!(env.state(), EnvelopeState::Sustain);

        env.gate_off();
        assert_eq!(env.state(), EnvelopeState::Release);
        for _ in 0..48000 {
            env.advance();
        }
        assert_eq!(env.state(), EnvelopeState::Idle);
    }
}
