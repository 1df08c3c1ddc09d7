//! Stereo-linked brickwall limiter, last stage of the master bus.
//!
//! An [`EnvelopeFollower`] with instant attack tracks `max(|L|, |R|)`;
//! when the tracked level exceeds the threshold, both channels are
//! scaled by `threshold / level` so the stereo image never shifts under
//! gain reduction. A short lookahead buffer lets the reduction land
//! before the transient does. The output stage soft-clips anything that
//! still pokes past the ceiling and replaces non-finite samples with
//! silence, so whatever happens upstream, this stage emits valid audio.
//!
//! # Reference
//!
//! Giannoulis, Massberg & Reiss, "Digital Dynamic Range Compressor
//! Design - A Tutorial and Analysis", JAES vol. 60 no. 6, 2012.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

use resin_core::{
    Effect, EnvelopeFollower, ParamDescriptor, ParameterInfo, db_to_linear, sanitize, soft_clip,
};

/// Fixed lookahead window.
const LOOKAHEAD_MS: f32 = 2.0;

/// Stereo-linked envelope-follower limiter.
///
/// ## Parameter Indices (`ParameterInfo`)
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 0 | Threshold | -30.0–0.0 dB | -3.0 |
/// | 1 | Ceiling | -30.0–0.0 dB | -0.3 |
/// | 2 | Release | 10.0–500.0 ms | 80.0 |
///
/// # Example
///
/// ```rust
/// use resin_core::Effect;
/// use resin_effects::Limiter;
///
/// let mut limiter = Limiter::new(48000.0);
/// limiter.set_threshold_db(-6.0);
///
/// for _ in 0..512 {
///     let (l, r) = limiter.process_stereo(1.5, -1.5);
///     assert!(l.abs() <= 1.0 && r.abs() <= 1.0);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Limiter {
    sample_rate: f32,
    threshold_db: f32,
    ceiling_db: f32,
    threshold_linear: f32,
    ceiling_linear: f32,

    detector: EnvelopeFollower,
    release_ms: f32,

    buffer_l: Vec<f32>,
    buffer_r: Vec<f32>,
    write_pos: usize,
    lookahead_samples: usize,
}

impl Limiter {
    /// Create a limiter at the given sample rate.
    ///
    /// Defaults: threshold -3 dB, ceiling -0.3 dB, release 80 ms.
    pub fn new(sample_rate: f32) -> Self {
        let lookahead_samples = ((LOOKAHEAD_MS / 1000.0 * sample_rate) as usize).max(1);
        let release_ms = 80.0;

        Self {
            sample_rate,
            threshold_db: -3.0,
            ceiling_db: -0.3,
            threshold_linear: db_to_linear(-3.0),
            ceiling_linear: db_to_linear(-0.3),
            detector: EnvelopeFollower::new(sample_rate, 0.0, release_ms),
            release_ms,
            buffer_l: vec![0.0; lookahead_samples],
            buffer_r: vec![0.0; lookahead_samples],
            write_pos: 0,
            lookahead_samples,
        }
    }

    /// Set the threshold in dB, clamped to \[-30, 0\].
    pub fn set_threshold_db(&mut self, db: f32) {
        self.threshold_db = db.clamp(-30.0, 0.0);
        self.threshold_linear = db_to_linear(self.threshold_db);
    }

    /// Current threshold in dB.
    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    /// Set the output ceiling in dB, clamped to \[-30, 0\].
    pub fn set_ceiling_db(&mut self, db: f32) {
        self.ceiling_db = db.clamp(-30.0, 0.0);
        self.ceiling_linear = db_to_linear(self.ceiling_db);
    }

    /// Current ceiling in dB.
    pub fn ceiling_db(&self) -> f32 {
        self.ceiling_db
    }

    /// Set the release time in ms, clamped to \[10, 500\].
    pub fn set_release_ms(&mut self, ms: f32) {
        self.release_ms = ms.clamp(10.0, 500.0);
        self.detector.set_release_ms(self.release_ms);
    }

    /// Current release time in ms.
    pub fn release_ms(&self) -> f32 {
        self.release_ms
    }

    /// Current gain reduction as a linear factor (1.0 = none).
    pub fn gain_reduction(&self) -> f32 {
        let level = self.detector.level();
        if level > self.threshold_linear && level > 1e-9 {
            self.threshold_linear / level
        } else {
            1.0
        }
    }

    #[inline]
    fn process_linked(&mut self, left: f32, right: f32) -> (f32, f32) {
        // Detect on the incoming sample; output the delayed one, so the
        // reduction is already in place when the transient emerges.
        let peak = left.abs().max(right.abs());
        self.detector.process(peak);
        let gain = self.gain_reduction() * self.ceiling_linear;

        let read_pos = (self.write_pos + 1) % self.lookahead_samples;
        let delayed_l = self.buffer_l[read_pos];
        let delayed_r = self.buffer_r[read_pos];

        self.buffer_l[self.write_pos] = left;
        self.buffer_r[self.write_pos] = right;
        self.write_pos = (self.write_pos + 1) % self.lookahead_samples;

        // Anything that still escapes the follower gets soft-clipped at
        // the ceiling; corrupt samples become silence.
        let out_l = soft_clip(delayed_l * gain / self.ceiling_linear) * self.ceiling_linear;
        let out_r = soft_clip(delayed_r * gain / self.ceiling_linear) * self.ceiling_linear;

        (sanitize(out_l), sanitize(out_r))
    }
}

impl Effect for Limiter {
    fn process(&mut self, input: f32) -> f32 {
        let (l, _r) = self.process_linked(input, input);
        l
    }

    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        self.process_linked(left, right)
    }

    fn is_true_stereo(&self) -> bool {
        true
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.detector.set_sample_rate(sample_rate);

        let lookahead_samples = ((LOOKAHEAD_MS / 1000.0 * sample_rate) as usize).max(1);
        self.lookahead_samples = lookahead_samples;
        self.buffer_l = vec![0.0; lookahead_samples];
        self.buffer_r = vec![0.0; lookahead_samples];
        self.write_pos = 0;
    }

    fn reset(&mut self) {
        self.buffer_l.fill(0.0);
        self.buffer_r.fill(0.0);
        self.write_pos = 0;
        self.detector.reset();
    }

    fn latency_samples(&self) -> usize {
        self.lookahead_samples
    }
}

impl ParameterInfo for Limiter {
    fn param_count(&self) -> usize {
        3
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        match index {
            0 => Some(ParamDescriptor::gain_db("Threshold", "Thresh", -30.0, 0.0, -3.0)),
            1 => Some(ParamDescriptor::gain_db("Ceiling", "Ceil", -30.0, 0.0, -0.3)),
            2 => Some(ParamDescriptor::time_ms("Release", "Rel", 10.0, 500.0, 80.0)),
            _ => None,
        }
    }

    fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.threshold_db,
            1 => self.ceiling_db,
            2 => self.release_ms,
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.set_threshold_db(value),
            1 => self.set_ceiling_db(value),
            2 => self.set_release_ms(value),
            _ => {}
        }
    }
}
