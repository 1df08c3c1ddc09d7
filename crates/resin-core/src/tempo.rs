//! Musical timing for tempo-synced LFOs and delay times.

use libm::floorf;

/// Fallback tempo when the host reports a non-positive BPM.
pub const DEFAULT_BPM: f32 = 120.0;

/// Musical note divisions for tempo sync.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoteDivision {
    /// Whole note (4 beats)
    Whole,
    /// Half note (2 beats)
    Half,
    /// Quarter note (1 beat)
    #[default]
    Quarter,
    /// Eighth note (1/2 beat)
    Eighth,
    /// Sixteenth note (1/4 beat)
    Sixteenth,
    /// Thirty-second note (1/8 beat)
    ThirtySecond,
    /// Dotted half note (3 beats)
    DottedHalf,
    /// Dotted quarter note (1.5 beats)
    DottedQuarter,
    /// Dotted eighth note (3/4 beat)
    DottedEighth,
    /// Triplet quarter note (2/3 beat)
    TripletQuarter,
    /// Triplet eighth note (1/3 beat)
    TripletEighth,
    /// Triplet sixteenth note (1/6 beat)
    TripletSixteenth,
}

/// All divisions, in menu order.
pub const ALL_DIVISIONS: [NoteDivision; 12] = [
    NoteDivision::Whole,
    NoteDivision::Half,
    NoteDivision::Quarter,
    NoteDivision::Eighth,
    NoteDivision::Sixteenth,
    NoteDivision::ThirtySecond,
    NoteDivision::DottedHalf,
    NoteDivision::DottedQuarter,
    NoteDivision::DottedEighth,
    NoteDivision::TripletQuarter,
    NoteDivision::TripletEighth,
    NoteDivision::TripletSixteenth,
];

impl NoteDivision {
    /// Number of beats this division spans.
    pub fn beats(&self) -> f32 {
        match self {
            NoteDivision::Whole => 4.0,
            NoteDivision::Half => 2.0,
            NoteDivision::Quarter => 1.0,
            NoteDivision::Eighth => 0.5,
            NoteDivision::Sixteenth => 0.25,
            NoteDivision::ThirtySecond => 0.125,
            NoteDivision::DottedHalf => 3.0,
            NoteDivision::DottedQuarter => 1.5,
            NoteDivision::DottedEighth => 0.75,
            NoteDivision::TripletQuarter => 2.0 / 3.0,
            NoteDivision::TripletEighth => 1.0 / 3.0,
            NoteDivision::TripletSixteenth => 1.0 / 6.0,
        }
    }

    /// Rate in Hz of one cycle per division at the given BPM.
    ///
    /// Non-positive BPM falls back to [`DEFAULT_BPM`].
    ///
    /// ```rust
    /// use resin_core::NoteDivision;
    ///
    /// // 120 BPM: one quarter note every half second
    /// assert!((NoteDivision::Quarter.to_hz(120.0) - 2.0).abs() < 0.001);
    /// assert!((NoteDivision::Eighth.to_hz(120.0) - 4.0).abs() < 0.001);
    /// ```
    pub fn to_hz(&self, bpm: f32) -> f32 {
        let bpm = sanitize_bpm(bpm);
        (bpm / 60.0) / self.beats()
    }

    /// Duration in milliseconds at the given BPM.
    pub fn to_ms(&self, bpm: f32) -> f32 {
        let bpm = sanitize_bpm(bpm);
        self.beats() * 60000.0 / bpm
    }

    /// Duration in samples at the given BPM and sample rate.
    pub fn to_samples(&self, bpm: f32, sample_rate: f32) -> f32 {
        self.to_ms(bpm) / 1000.0 * sample_rate
    }
}

#[inline]
fn sanitize_bpm(bpm: f32) -> f32 {
    if bpm > 0.0 { bpm } else { DEFAULT_BPM }
}

/// Transport run state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
}

/// Tracks tempo and transport position for synced processing.
///
/// # Example
///
/// ```rust
/// use resin_core::{TempoManager, NoteDivision};
///
/// let mut tempo = TempoManager::new(48000.0, 120.0);
/// tempo.play();
///
/// assert!((tempo.division_to_hz(NoteDivision::Eighth) - 4.0).abs() < 0.001);
///
/// for _ in 0..48000 {
///     tempo.advance();
/// }
/// // one second at 120 BPM is two beats
/// assert!((tempo.beat_position() - 2.0).abs() < 0.01);
/// ```
#[derive(Debug, Clone)]
pub struct TempoManager {
    bpm: f32,
    sample_rate: f32,
    samples_per_beat: f32,
    /// Transport position in samples.
    position: u64,
    transport: TransportState,
}

impl TempoManager {
    /// Create a tempo manager. Non-positive BPM falls back to 120.
    pub fn new(sample_rate: f32, bpm: f32) -> Self {
        let bpm = sanitize_bpm(bpm);
        Self {
            bpm,
            sample_rate,
            samples_per_beat: sample_rate * 60.0 / bpm,
            position: 0,
            transport: TransportState::Stopped,
        }
    }

    /// Set the tempo. Non-positive BPM falls back to 120.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = sanitize_bpm(bpm);
        self.samples_per_beat = self.sample_rate * 60.0 / self.bpm;
    }

    /// Current tempo in BPM.
    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Update the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.samples_per_beat = self.sample_rate * 60.0 / self.bpm;
    }

    /// Start the transport.
    pub fn play(&mut self) {
        self.transport = TransportState::Playing;
    }

    /// Stop the transport.
    pub fn stop(&mut self) {
        self.transport = TransportState::Stopped;
    }

    /// Current transport state.
    pub fn transport(&self) -> TransportState {
        self.transport
    }

    /// Whether the transport is running.
    pub fn is_playing(&self) -> bool {
        self.transport == TransportState::Playing
    }

    /// Rewind the position to zero.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Advance one sample, if playing.
    pub fn advance(&mut self) {
        if self.transport == TransportState::Playing {
            self.position = self.position.wrapping_add(1);
        }
    }

    /// Position in beats since start.
    pub fn beat_position(&self) -> f32 {
        self.position as f32 / self.samples_per_beat
    }

    /// Fractional position within the current beat, \[0, 1).
    pub fn beat_phase(&self) -> f32 {
        let beat_pos = self.beat_position();
        beat_pos - floorf(beat_pos)
    }

    /// LFO rate in Hz for a division at the current tempo.
    pub fn division_to_hz(&self, division: NoteDivision) -> f32 {
        division.to_hz(self.bpm)
    }

    /// Delay time in milliseconds for a division at the current tempo.
    pub fn division_to_ms(&self, division: NoteDivision) -> f32 {
        division.to_ms(self.bpm)
    }

    /// Delay time in samples for a division at the current tempo.
    pub fn division_to_samples(&self, division: NoteDivision) -> f32 {
        division.to_samples(self.bpm, self.sample_rate)
    }
}

impl Default for TempoManager {
    fn default() -> Self {
        Self::new(48000.0, DEFAULT_BPM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_rates_at_120() {
        assert!((NoteDivision::Quarter.to_hz(120.0) - 2.0).abs() < 0.001);
        assert!((NoteDivision::Eighth.to_hz(120.0) - 4.0).abs() < 0.001);
        assert!((NoteDivision::Half.to_hz(120.0) - 1.0).abs() < 0.001);
        assert!((NoteDivision::Sixteenth.to_hz(120.0) - 8.0).abs() < 0.001);
    }

    #[test]
    fn division_times_at_120() {
        assert!((NoteDivision::Quarter.to_ms(120.0) - 500.0).abs() < 0.1);
        assert!((NoteDivision::DottedQuarter.to_ms(120.0) - 750.0).abs() < 0.1);
        assert!((NoteDivision::TripletEighth.to_ms(120.0) - 166.667).abs() < 0.1);
    }

    #[test]
    fn hz_times_ms_is_one_second() {
        // to_hz and to_ms must be consistent: hz * (ms / 1000) == 1
        for bpm in [60.0, 97.3, 120.0, 174.0] {
            for div in ALL_DIVISIONS {
                let product = div.to_hz(bpm) * div.to_ms(bpm) / 1000.0;
                assert!(
                    (product - 1.0).abs() < 1e-4,
                    "{div:?} at {bpm} BPM: hz*sec = {product}"
                );
            }
        }
    }

    #[test]
    fn non_positive_bpm_falls_back() {
        assert!((NoteDivision::Quarter.to_hz(0.0) - 2.0).abs() < 0.001);
        assert!((NoteDivision::Quarter.to_hz(-30.0) - 2.0).abs() < 0.001);

        let mut tempo = TempoManager::new(48000.0, -1.0);
        assert_eq!(tempo.bpm(), DEFAULT_BPM);
        tempo.set_bpm(0.0);
        assert_eq!(tempo.bpm(), DEFAULT_BPM);
    }

    #[test]
    fn transport_position() {
        let mut tempo = TempoManager::new(48000.0, 120.0);
        tempo.play();

        for _ in 0..24000 {
            tempo.advance();
        }
        assert!((tempo.beat_position() - 1.0).abs() < 0.001);
    }

    #[test]
    fn stopped_transport_holds_position() {
        let mut tempo = TempoManager::new(48000.0, 120.0);
        for _ in 0..1000 {
            tempo.advance();
        }
        assert_eq!(tempo.position, 0);
    }

    #[test]
    fn beat_phase_wraps() {
        let mut tempo = TempoManager::new(48000.0, 120.0);
        tempo.play();
        for _ in 0..12000 {
            tempo.advance();
        }
        assert!((tempo.beat_phase() - 0.5).abs() < 0.001);
    }

    #[test]
    fn division_to_samples_quarter() {
        let tempo = TempoManager::new(48000.0, 120.0);
        let samples = tempo.division_to_samples(NoteDivision::Quarter);
        assert!((samples - 24000.0).abs() < 0.1);
    }
}
