//! Envelope follower for level detection.
//!
//! Tracks the rectified amplitude of a signal with separate attack and
//! release time constants. The limiter uses one per detection path; the
//! voice pool reads per-voice followers to pick the quietest steal
//! candidate.

use libm::expf;

/// Peak-style envelope follower with asymmetric attack/release.
///
/// # Example
///
/// ```rust
/// use resin_core::EnvelopeFollower;
///
/// let mut follower = EnvelopeFollower::new(48000.0, 1.0, 100.0);
/// let level = follower.process(0.8);
/// assert!(level > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    attack_coeff: f32,
    release_coeff: f32,
    env: f32,
    sample_rate: f32,
    attack_ms: f32,
    release_ms: f32,
}

impl EnvelopeFollower {
    /// Create a follower with the given attack and release times in ms.
    pub fn new(sample_rate: f32, attack_ms: f32, release_ms: f32) -> Self {
        let mut follower = Self {
            attack_coeff: 0.0,
            release_coeff: 0.0,
            env: 0.0,
            sample_rate,
            attack_ms,
            release_ms,
        };
        follower.update_coeffs();
        follower
    }

    /// Set the attack time in milliseconds. Zero means instant.
    pub fn set_attack_ms(&mut self, attack_ms: f32) {
        self.attack_ms = attack_ms.max(0.0);
        self.update_coeffs();
    }

    /// Set the release time in milliseconds.
    pub fn set_release_ms(&mut self, release_ms: f32) {
        self.release_ms = release_ms.max(0.01);
        self.update_coeffs();
    }

    /// Update the sample rate, preserving the configured times.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_coeffs();
    }

    fn update_coeffs(&mut self) {
        self.attack_coeff = time_coeff(self.attack_ms, self.sample_rate);
        self.release_coeff = time_coeff(self.release_ms, self.sample_rate);
    }

    /// Feed one sample, returning the current envelope level.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let rectified = input.abs();
        let coeff = if rectified > self.env {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.env = coeff * self.env + (1.0 - coeff) * rectified;
        self.env
    }

    /// Current envelope level without consuming a sample.
    pub fn level(&self) -> f32 {
        self.env
    }

    /// Zero the envelope.
    pub fn reset(&mut self) {
        self.env = 0.0;
    }
}

#[inline]
fn time_coeff(time_ms: f32, sample_rate: f32) -> f32 {
    let samples = time_ms * sample_rate / 1000.0;
    if samples < 1.0 {
        0.0
    } else {
        expf(-1.0 / samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_rising_signal() {
        let mut follower = EnvelopeFollower::new(48000.0, 1.0, 100.0);

        let mut level = 0.0;
        for _ in 0..500 {
            level = follower.process(1.0);
        }
        assert!(level > 0.9, "should track toward 1.0, got {level}");
    }

    #[test]
    fn release_slower_than_attack() {
        let mut follower = EnvelopeFollower::new(48000.0, 1.0, 200.0);

        for _ in 0..1000 {
            follower.process(1.0);
        }
        let peak = follower.level();

        for _ in 0..480 {
            follower.process(0.0);
        }
        // after 10 ms of a 200 ms release, the envelope barely moved
        assert!(follower.level() > peak * 0.9);
    }

    #[test]
    fn zero_attack_is_instant() {
        let mut follower = EnvelopeFollower::new(48000.0, 0.0, 100.0);
        let level = follower.process(0.7);
        assert!((level - 0.7).abs() < 1e-6);
    }

    #[test]
    fn rectifies_negative_input() {
        let mut follower = EnvelopeFollower::new(48000.0, 0.0, 100.0);
        let level = follower.process(-0.5);
        assert!((level - 0.5).abs() < 1e-6);
    }

    #[test]
    fn decays_to_silence() {
        let mut follower = EnvelopeFollower::new(48000.0, 1.0, 20.0);

        for _ in 0..1000 {
            follower.process(1.0);
        }
        for _ in 0..48000 {
            follower.process(0.0);
        }
        assert!(follower.level() < 1e-4);
    }

    #[test]
    fn reset_zeroes_level() {
        let mut follower = EnvelopeFollower::new(48000.0, 1.0, 100.0);
        follower.process(1.0);
        follower.reset();
        assert_eq!(follower.level(), 0.0);
    }
}
