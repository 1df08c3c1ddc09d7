//! Global LFO buses.
//!
//! Two engine-wide LFOs precomputed once per block into shared buffers,
//! so every voice observes the identical modulation value at a given
//! sample index. A per-voice LFO would skew phase across a chord; the
//! shared bus keeps vibrato and filter sweeps phase-locked.
//!
//! Retriggering is requested from the event side through an
//! [`AckFlag`] and consumed exactly once at the start of the next block
//! on the render side.

use resin_core::{AckFlag, Lfo, LfoWaveform, NoteDivision};

/// Modulation routing targets for a global LFO.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoDestination {
    /// Not routed; the bus is skipped entirely.
    #[default]
    Off,
    /// Pitch of both oscillators.
    Pitch,
    /// Pitch of oscillator 1 only.
    Osc1Pitch,
    /// Pitch of oscillator 2 only.
    Osc2Pitch,
    /// Filter cutoff.
    FilterCutoff,
    /// Filter resonance.
    FilterResonance,
    /// Oscillator 1 level.
    Osc1Level,
    /// Oscillator 2 level.
    Osc2Level,
    /// Sub-oscillator level.
    SubLevel,
    /// Oscillator 1 pulse width.
    Osc1PulseWidth,
    /// Oscillator 2 pulse width.
    Osc2PulseWidth,
    /// Oscillator 1 wavetable morph position.
    Osc1Morph,
    /// Oscillator 2 wavetable morph position.
    Osc2Morph,
    /// FM index.
    FmDepth,
    /// Voice pan.
    Pan,
    /// Master output gain.
    MasterGain,
}

/// All routable destinations, in menu order.
pub const ALL_DESTINATIONS: [LfoDestination; 16] = [
    LfoDestination::Off,
    LfoDestination::Pitch,
    LfoDestination::Osc1Pitch,
    LfoDestination::Osc2Pitch,
    LfoDestination::FilterCutoff,
    LfoDestination::FilterResonance,
    LfoDestination::Osc1Level,
    LfoDestination::Osc2Level,
    LfoDestination::SubLevel,
    LfoDestination::Osc1PulseWidth,
    LfoDestination::Osc2PulseWidth,
    LfoDestination::Osc1Morph,
    LfoDestination::Osc2Morph,
    LfoDestination::FmDepth,
    LfoDestination::Pan,
    LfoDestination::MasterGain,
];

/// One global LFO bus with its per-block output buffer.
///
/// # Example
///
/// ```rust
/// use resin_synth::{GlobalLfo, LfoDestination};
///
/// let mut lfo = GlobalLfo::new(48000.0);
/// lfo.set_enabled(true);
/// lfo.set_destination(LfoDestination::FilterCutoff);
/// lfo.set_rate_hz(2.0);
///
/// lfo.fill(128, 120.0);
/// assert!(lfo.buffer()[..128].iter().all(|v| (-1.0..=1.0).contains(v)));
/// ```
#[derive(Debug)]
pub struct GlobalLfo {
    lfo: Lfo,
    enabled: bool,
    destination: LfoDestination,
    /// Output window lower bound, \[-1, 1\].
    low: f32,
    /// Output window upper bound, \[-1, 1\].
    high: f32,
    /// Free rate in Hz, used when `sync` is `None`.
    rate_hz: f32,
    sync: Option<NoteDivision>,
    retrigger: AckFlag,
    buffer: Vec<f32>,
}

impl GlobalLfo {
    /// Create a disabled bus at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            lfo: Lfo::new(sample_rate, 1.0),
            enabled: false,
            destination: LfoDestination::Off,
            low: -1.0,
            high: 1.0,
            rate_hz: 1.0,
            sync: None,
            retrigger: AckFlag::new(),
            buffer: vec![0.0; 512],
        }
    }

    /// Enable or disable the bus. Disabled buses fill zero and skip the
    /// oscillator entirely.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether the bus is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set the routing destination.
    pub fn set_destination(&mut self, destination: LfoDestination) {
        self.destination = destination;
    }

    /// Current routing destination.
    pub fn destination(&self) -> LfoDestination {
        self.destination
    }

    /// Set the waveform.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.lfo.set_waveform(waveform);
    }

    /// Set the free-running rate in Hz and leave tempo sync.
    pub fn set_rate_hz(&mut self, hz: f32) {
        self.rate_hz = hz.clamp(0.01, 50.0);
        self.sync = None;
        self.lfo.set_frequency(self.rate_hz);
    }

    /// Lock the rate to a musical division of the host tempo.
    pub fn set_sync(&mut self, division: NoteDivision) {
        self.sync = Some(division);
    }

    /// Leave tempo sync, returning to the free rate.
    pub fn clear_sync(&mut self) {
        self.sync = None;
        self.lfo.set_frequency(self.rate_hz);
    }

    /// Current tempo-sync division, if synced.
    pub fn sync(&self) -> Option<NoteDivision> {
        self.sync
    }

    /// Set the output window. Both bounds are clamped to \[-1, 1\] and
    /// swapped if reversed.
    pub fn set_range(&mut self, low: f32, high: f32) {
        let low = low.clamp(-1.0, 1.0);
        let high = high.clamp(-1.0, 1.0);
        if low <= high {
            self.low = low;
            self.high = high;
        } else {
            self.low = high;
            self.high = low;
        }
    }

    /// Request a phase reset, applied at the start of the next block.
    ///
    /// Safe to call from the event-ingest side.
    pub fn request_retrigger(&self) {
        self.retrigger.raise();
    }

    /// Update the sample rate and resize the block buffer.
    pub fn reset(&mut self, sample_rate: f32, block_size: usize) {
        self.lfo.set_sample_rate(sample_rate);
        self.lfo.reset();
        self.buffer.resize(block_size.max(1), 0.0);
        self.buffer.fill(0.0);
    }

    /// Precompute one block of output.
    ///
    /// Must run before any voice renders. When the bus is disabled or
    /// unrouted, the buffer is zero-filled and the oscillator does not
    /// advance (explicit CPU bypass).
    pub fn fill(&mut self, frames: usize, bpm: f32) {
        let frames = frames.min(self.buffer.len());

        if self.retrigger.consume() {
            self.lfo.reset();
        }

        if !self.enabled || self.destination == LfoDestination::Off {
            self.buffer[..frames].fill(0.0);
            return;
        }

        if let Some(division) = self.sync {
            self.lfo.set_frequency(division.to_hz(bpm));
        }

        for slot in &mut self.buffer[..frames] {
            let raw = self.lfo.next();
            // Remap [-1, 1] into the [low, high] window, then clamp back
            // so downstream depth formulas stay bounded
            let windowed = self.low + (raw + 1.0) * 0.5 * (self.high - self.low);
            *slot = windowed.clamp(-1.0, 1.0);
        }
    }

    /// The precomputed block buffer.
    #[inline]
    pub fn buffer(&self) -> &[f32] {
        &self.buffer
    }

    /// Most recent output value, for telemetry.
    pub fn last_value(&self) -> f32 {
        self.buffer.last().copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_fills_zero() {
        let mut lfo = GlobalLfo::new(48000.0);
        lfo.set_destination(LfoDestination::FilterCutoff);
        lfo.fill(256, 120.0);
        assert!(lfo.buffer()[..256].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn unrouted_fills_zero_even_when_enabled() {
        let mut lfo = GlobalLfo::new(48000.0);
        lfo.set_enabled(true);
        lfo.fill(256, 120.0);
        assert!(lfo.buffer()[..256].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn output_in_range() {
        let mut lfo = GlobalLfo::new(48000.0);
        lfo.set_enabled(true);
        lfo.set_destination(LfoDestination::Pitch);
        lfo.set_rate_hz(10.0);

        for _ in 0..20 {
            lfo.fill(512, 120.0);
            assert!(
                lfo.buffer()[..512]
                    .iter()
                    .all(|v| (-1.0..=1.0).contains(v))
            );
        }
    }

    #[test]
    fn window_remaps_output() {
        let mut lfo = GlobalLfo::new(48000.0);
        lfo.set_enabled(true);
        lfo.set_destination(LfoDestination::Pitch);
        lfo.set_rate_hz(5.0);
        lfo.set_range(0.0, 0.5);

        lfo.fill(512, 120.0);
        for &v in &lfo.buffer()[..512] {
            assert!((0.0..=0.5).contains(&v), "windowed value out of range: {v}");
        }
    }

    #[test]
    fn reversed_window_swapped() {
        let mut lfo = GlobalLfo::new(48000.0);
        lfo.set_range(0.8, -0.3);
        assert!(lfo.low < lfo.high);
    }

    #[test]
    fn retrigger_consumed_once() {
        let mut lfo = GlobalLfo::new(48000.0);
        lfo.set_enabled(true);
        lfo.set_destination(LfoDestination::Pitch);
        lfo.set_rate_hz(1.0);

        lfo.fill(512, 120.0);
        let mid_phase = lfo.lfo.phase();
        assert!(mid_phase > 0.0);

        lfo.request_retrigger();
        lfo.fill(512, 120.0);
        // Phase restarted from zero, so after 512 samples it is lower
        // than after 1024 free-running samples
        assert!(lfo.lfo.phase() < mid_phase * 1.5);

        // A second fill without a new request must not reset again
        let phase_before = lfo.lfo.phase();
        lfo.fill(512, 120.0);
        assert!(lfo.lfo.phase() > phase_before);
    }

    #[test]
    fn tempo_sync_follows_bpm() {
        let mut lfo = GlobalLfo::new(48000.0);
        lfo.set_enabled(true);
        lfo.set_destination(LfoDestination::Pitch);
        lfo.set_sync(NoteDivision::Quarter);

        lfo.fill(64, 120.0);
        assert!((lfo.lfo.frequency() - 2.0).abs() < 1e-4);

        lfo.fill(64, 60.0);
        assert!((lfo.lfo.frequency() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn zero_bpm_falls_back() {
        let mut lfo = GlobalLfo::new(48000.0);
        lfo.set_enabled(true);
        lfo.set_destination(LfoDestination::Pitch);
        lfo.set_sync(NoteDivision::Quarter);

        lfo.fill(64, 0.0);
        // 120 BPM default: quarter note = 2 Hz
        assert!((lfo.lfo.frequency() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn fill_clamps_to_buffer_len() {
        let mut lfo = GlobalLfo::new(48000.0);
        lfo.reset(48000.0, 128);
        lfo.set_enabled(true);
        lfo.set_destination(LfoDestination::Pitch);
        lfo.fill(4096, 120.0);
        assert_eq!(lfo.buffer().len(), 128);
    }
}
