//! Stereo feedback delay with tempo sync and ping-pong mode.

use libm::ceilf;
use resin_core::{
    Effect, InterpolatedDelay, NoteDivision, OnePole, ParamDescriptor, ParameterInfo,
    SmoothedParam, flush_denormal,
};

/// Longest free-running delay time.
const MAX_DELAY_MS: f32 = 2000.0;

/// Stereo feedback delay.
///
/// Runs one delay line per channel. In ping-pong mode the feedback paths
/// cross, so a hit on one channel bounces to the other on each repeat. A
/// one-pole lowpass in each feedback loop darkens successive repeats the
/// way an analog delay would.
///
/// Delay time is either free-running in milliseconds or locked to a
/// [`NoteDivision`] at the tempo supplied via [`set_bpm`](Self::set_bpm).
///
/// ## Parameter Indices (`ParameterInfo`)
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 0 | Time | 1.0–2000.0 ms | 300.0 |
/// | 1 | Feedback | 0–95% | 40.0 |
/// | 2 | Tone | 500–20000 Hz | 6000.0 |
/// | 3 | Mix | 0–100% | 30.0 |
///
/// # Example
///
/// ```rust
/// use resin_core::{Effect, NoteDivision};
/// use resin_effects::StereoDelay;
///
/// let mut delay = StereoDelay::new(48000.0);
/// delay.set_sync(Some(NoteDivision::DottedEighth));
/// delay.set_bpm(128.0);
/// delay.set_ping_pong(true);
///
/// let (_l, _r) = delay.process_stereo(0.5, 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct StereoDelay {
    line_l: InterpolatedDelay,
    line_r: InterpolatedDelay,
    tone_l: OnePole,
    tone_r: OnePole,
    max_delay_samples: f32,
    delay_samples: SmoothedParam,
    feedback: SmoothedParam,
    mix: SmoothedParam,
    sample_rate: f32,
    time_ms: f32,
    bpm: f32,
    sync: Option<NoteDivision>,
    ping_pong: bool,
}

impl StereoDelay {
    /// Create a delay with a 2-second maximum time.
    pub fn new(sample_rate: f32) -> Self {
        let max_delay_samples = ceilf(MAX_DELAY_MS / 1000.0 * sample_rate) as usize;
        let default_samples = 300.0 / 1000.0 * sample_rate;

        Self {
            line_l: InterpolatedDelay::new(max_delay_samples),
            line_r: InterpolatedDelay::new(max_delay_samples),
            tone_l: OnePole::new(sample_rate, 6000.0),
            tone_r: OnePole::new(sample_rate, 6000.0),
            max_delay_samples: max_delay_samples as f32,
            delay_samples: SmoothedParam::with_config(default_samples, sample_rate, 50.0),
            feedback: SmoothedParam::with_config(0.4, sample_rate, 10.0),
            mix: SmoothedParam::with_config(0.3, sample_rate, 10.0),
            sample_rate,
            time_ms: 300.0,
            bpm: 120.0,
            sync: None,
            ping_pong: false,
        }
    }

    /// Set the free-running delay time in milliseconds.
    ///
    /// Ignored while tempo sync is active, but remembered for when sync
    /// is turned off.
    pub fn set_time_ms(&mut self, time_ms: f32) {
        self.time_ms = time_ms.clamp(1.0, MAX_DELAY_MS);
        self.update_time();
    }

    /// Current delay time in milliseconds (synced or free).
    pub fn time_ms(&self) -> f32 {
        match self.sync {
            Some(division) => division.to_ms(self.bpm).min(MAX_DELAY_MS),
            None => self.time_ms,
        }
    }

    /// Lock the delay time to a note division, or `None` for free-running.
    pub fn set_sync(&mut self, sync: Option<NoteDivision>) {
        self.sync = sync;
        self.update_time();
    }

    /// Current sync division, if any.
    pub fn sync(&self) -> Option<NoteDivision> {
        self.sync
    }

    /// Update the host tempo. Only audible while synced.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm;
        if self.sync.is_some() {
            self.update_time();
        }
    }

    /// Set feedback amount (0 to 0.95).
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback.set_target(feedback.clamp(0.0, 0.95));
    }

    /// Set the feedback lowpass cutoff in Hz.
    pub fn set_tone_hz(&mut self, cutoff: f32) {
        let clamped = cutoff.clamp(500.0, 20000.0);
        self.tone_l.set_cutoff(clamped);
        self.tone_r.set_cutoff(clamped);
    }

    /// Set wet/dry mix (0 to 1).
    pub fn set_mix(&mut self, mix: f32) {
        self.mix.set_target(mix.clamp(0.0, 1.0));
    }

    /// Enable or disable ping-pong feedback crossing.
    pub fn set_ping_pong(&mut self, enabled: bool) {
        self.ping_pong = enabled;
    }

    /// Current ping-pong state.
    pub fn ping_pong(&self) -> bool {
        self.ping_pong
    }

    fn update_time(&mut self) {
        let samples = self.time_ms() / 1000.0 * self.sample_rate;
        self.delay_samples
            .set_target(samples.clamp(1.0, self.max_delay_samples - 1.0));
    }
}

impl Effect for StereoDelay {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let (l, _r) = self.process_stereo(input, input);
        l
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let delay_samples = self.delay_samples.advance();
        let feedback = self.feedback.advance();
        let mix = self.mix.advance();

        let delayed_l = self.line_l.read(delay_samples);
        let delayed_r = self.line_r.read(delay_samples);

        let fed_l = self.tone_l.process(delayed_l) * feedback;
        let fed_r = self.tone_r.process(delayed_r) * feedback;

        if self.ping_pong {
            self.line_l.write(flush_denormal(left + fed_r));
            self.line_r.write(flush_denormal(right + fed_l));
        } else {
            self.line_l.write(flush_denormal(left + fed_l));
            self.line_r.write(flush_denormal(right + fed_r));
        }

        (
            left * (1.0 - mix) + delayed_l * mix,
            right * (1.0 - mix) + delayed_r * mix,
        )
    }

    fn is_true_stereo(&self) -> bool {
        self.ping_pong
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;

        let max_delay_samples = ceilf(MAX_DELAY_MS / 1000.0 * sample_rate) as usize;
        self.line_l = InterpolatedDelay::new(max_delay_samples);
        self.line_r = InterpolatedDelay::new(max_delay_samples);
        self.max_delay_samples = max_delay_samples as f32;

        self.tone_l.set_sample_rate(sample_rate);
        self.tone_r.set_sample_rate(sample_rate);
        self.delay_samples.set_sample_rate(sample_rate);
        self.feedback.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);

        self.update_time();
        self.delay_samples.snap_to_target();
    }

    fn reset(&mut self) {
        self.line_l.clear();
        self.line_r.clear();
        self.tone_l.reset();
        self.tone_r.reset();
        self.delay_samples.snap_to_target();
        self.feedback.snap_to_target();
        self.mix.snap_to_target();
    }
}

impl ParameterInfo for StereoDelay {
    fn param_count(&self) -> usize {
        4
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        match index {
            0 => Some(ParamDescriptor::time_ms("Time", "Time", 1.0, MAX_DELAY_MS, 300.0)),
            1 => Some(ParamDescriptor::percent("Feedback", "Fbk", 40.0)),
            2 => Some(ParamDescriptor::freq_hz("Tone", "Tone", 500.0, 20000.0, 6000.0)),
            3 => Some(ParamDescriptor::percent("Mix", "Mix", 30.0)),
            _ => None,
        }
    }

    fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.time_ms(),
            1 => self.feedback.target() * 100.0,
            2 => self.tone_l.cutoff(),
            3 => self.mix.target() * 100.0,
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.set_time_ms(value),
            1 => self.set_feedback(value / 100.0),
            2 => self.set_tone_hz(value),
            3 => self.set_mix(value / 100.0),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resin_core::ParamUnit;

    #[test]
    fn delayed_impulse_arrives() {
        let mut delay = StereoDelay::new(48000.0);
        delay.set_time_ms(100.0);
        delay.set_mix(1.0);
        delay.reset();

        delay.process_stereo(1.0, 1.0);

        let mut found = false;
        for _ in 0..10000 {
            let (l, _r) = delay.process_stereo(0.0, 0.0);
            if l > 0.5 {
                found = true;
                break;
            }
        }
        assert!(found, "delayed impulse should appear");
    }

    #[test]
    fn dry_mix_passes_input() {
        let mut delay = StereoDelay::new(48000.0);
        delay.set_mix(0.0);
        delay.reset();

        let (l, r) = delay.process_stereo(0.5, -0.5);
        assert!((l - 0.5).abs() < 0.01);
        assert!((r + 0.5).abs() < 0.01);
    }

    #[test]
    fn ping_pong_crosses_channels() {
        let mut delay = StereoDelay::new(48000.0);
        delay.set_time_ms(50.0);
        delay.set_feedback(0.8);
        delay.set_mix(1.0);
        delay.set_ping_pong(true);
        delay.reset();

        assert!(delay.is_true_stereo());

        // impulse on the left only
        delay.process_stereo(1.0, 0.0);

        let mut found_left = false;
        let mut found_right = false;
        for _ in 0..15000 {
            let (l, r) = delay.process_stereo(0.0, 0.0);
            if l.abs() > 0.3 {
                found_left = true;
            }
            if found_left && r.abs() > 0.2 {
                found_right = true;
                break;
            }
        }
        assert!(found_left, "first repeat on the left");
        assert!(found_right, "second repeat should bounce to the right");
    }

    #[test]
    fn tempo_sync_sets_time() {
        let mut delay = StereoDelay::new(48000.0);
        delay.set_bpm(120.0);
        delay.set_sync(Some(NoteDivision::Quarter));

        assert!((delay.time_ms() - 500.0).abs() < 0.1);

        delay.set_bpm(60.0);
        assert!((delay.time_ms() - 1000.0).abs() < 0.1);

        delay.set_sync(None);
        delay.set_time_ms(333.0);
        assert!((delay.time_ms() - 333.0).abs() < 0.1);
    }

    #[test]
    fn sync_clamps_to_max_delay() {
        let mut delay = StereoDelay::new(48000.0);
        delay.set_bpm(20.0);
        delay.set_sync(Some(NoteDivision::Whole)); // 12 seconds at 20 BPM
        assert!(delay.time_ms() <= MAX_DELAY_MS);
    }

    #[test]
    fn feedback_repeats_decay() {
        let mut delay = StereoDelay::new(48000.0);
        delay.set_time_ms(10.0);
        delay.set_feedback(0.5);
        delay.set_mix(1.0);
        delay.reset();

        delay.process_stereo(1.0, 1.0);

        let mut peak_early: f32 = 0.0;
        let mut peak_late: f32 = 0.0;
        for i in 0..48000 {
            let (l, _) = delay.process_stereo(0.0, 0.0);
            if i < 2400 {
                peak_early = peak_early.max(l.abs());
            } else if i > 24000 {
                peak_late = peak_late.max(l.abs());
            }
        }
        assert!(peak_late < peak_early * 0.1, "repeats should die away");
    }

    #[test]
    fn param_info_round_trip() {
        let mut delay = StereoDelay::new(48000.0);
        assert_eq!(delay.param_count(), 4);

        delay.set_param(0, 250.0);
        assert!((delay.get_param(0) - 250.0).abs() < 0.5);

        delay.set_param(1, 60.0);
        assert!((delay.get_param(1) - 60.0).abs() < 0.1);

        delay.set_param(3, 150.0); // clamped
        assert!(delay.get_param(3) <= 100.0);

        assert_eq!(delay.param_info(0).map(|p| p.unit), Some(ParamUnit::Milliseconds));
        assert!(delay.param_info(9).is_none());
    }
}
