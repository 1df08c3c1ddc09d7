//! Voice pool: allocation, stealing, and polyphony management.
//!
//! Owns the fixed array of 32 voices. Allocation prefers idle voices,
//! then steals the quietest releasing voice, then the quietest active
//! one. Two pressure valves keep dense playing clean: release times are
//! scaled up to 16x as the active count climbs, and a hard cap of 16
//! simultaneously sounding voices is enforced with ~1 ms force fades.
//!
//! Mono and Legato modes collapse everything onto voice 0 and keep a
//! held-note stack so releasing the current key falls back to the
//! previous one.

use crate::voice::Voice;

/// Total voices in the pool.
pub const MAX_VOICES: usize = 32;

/// Most voices allowed to sound at once; the rest are force-faded.
pub const HARD_CAP: usize = 16;

/// Held-note stack depth for mono modes.
const NOTE_STACK_DEPTH: usize = 16;

/// Voice allocation behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceMode {
    /// One voice per note.
    #[default]
    Poly,
    /// Single voice, every note retriggers the envelopes.
    Mono,
    /// Single voice, overlapping notes glide without retriggering.
    Legato,
}

/// Fixed pool of voices with allocation bookkeeping.
///
/// # Example
///
/// ```rust
/// use resin_synth::VoicePool;
///
/// let mut pool = VoicePool::new(48000.0);
/// pool.note_on(60, 100);
/// pool.note_on(64, 100);
/// assert_eq!(pool.active_count(), 2);
///
/// pool.note_off(60);
/// pool.note_off(64);
/// ```
#[derive(Debug)]
pub struct VoicePool {
    voices: [Voice; MAX_VOICES],
    mode: VoiceMode,
    age_counter: u64,
    note_stack: [u8; NOTE_STACK_DEPTH],
    stack_len: usize,
    last_velocity: u8,
    release_scale: f32,
}

impl VoicePool {
    /// Create an idle pool.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            voices: core::array::from_fn(|_| Voice::new(sample_rate)),
            mode: VoiceMode::Poly,
            age_counter: 0,
            note_stack: [0; NOTE_STACK_DEPTH],
            stack_len: 0,
            last_velocity: 100,
            release_scale: 1.0,
        }
    }

    /// Current allocation mode.
    pub fn mode(&self) -> VoiceMode {
        self.mode
    }

    /// Switch modes. All sounding notes are released and the mono note
    /// stack cleared before the new mode takes effect, so no voice is
    /// left stuck across the boundary.
    pub fn set_mode(&mut self, mode: VoiceMode) {
        if mode == self.mode {
            return;
        }
        self.release_all();
        self.stack_len = 0;
        self.mode = mode;
    }

    // Note events

    /// Start a note.
    pub fn note_on(&mut self, note: u8, velocity: u8) {
        if velocity == 0 {
            self.note_off(note);
            return;
        }
        self.last_velocity = velocity;

        match self.mode {
            VoiceMode::Poly => self.allocate(note, velocity),
            VoiceMode::Mono => {
                self.stack_push(note);
                self.voices[0].note_on(note, velocity);
                self.stamp(0);
            }
            VoiceMode::Legato => {
                let held = self.voices[0].is_busy() && !self.voices[0].is_releasing();
                self.stack_push(note);
                if held {
                    self.voices[0].change_note(note);
                } else {
                    self.voices[0].note_on(note, velocity);
                }
                self.stamp(0);
            }
        }
    }

    /// Release a note.
    pub fn note_off(&mut self, note: u8) {
        match self.mode {
            VoiceMode::Poly => {
                for voice in &mut self.voices {
                    if voice.is_busy() && !voice.is_releasing() && voice.note() == note {
                        voice.release();
                    }
                }
            }
            VoiceMode::Mono | VoiceMode::Legato => {
                let was_current = self.stack_len > 0
                    && self.note_stack[self.stack_len - 1] == note;
                self.stack_remove(note);

                if !was_current {
                    return;
                }
                if self.stack_len > 0 {
                    let previous = self.note_stack[self.stack_len - 1];
                    if self.mode == VoiceMode::Mono {
                        self.voices[0].note_on(previous, self.last_velocity);
                    } else {
                        self.voices[0].change_note(previous);
                    }
                } else {
                    self.voices[0].release();
                }
            }
        }
    }

    /// Release every sounding voice.
    pub fn release_all(&mut self) {
        for voice in &mut self.voices {
            if voice.is_busy() && !voice.is_releasing() {
                voice.release();
            }
        }
        self.stack_len = 0;
    }

    /// Reset every voice and all bookkeeping.
    pub fn reset(&mut self) {
        for voice in &mut self.voices {
            voice.reset();
        }
        self.age_counter = 0;
        self.stack_len = 0;
        self.release_scale = 1.0;
    }

    /// Update the sample rate on every voice.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        for voice in &mut self.voices {
            voice.set_sample_rate(sample_rate);
        }
    }

    // Per-block maintenance

    /// Consume cross-thread requests, rescale release times for the
    /// current density, and enforce the hard cap. Called once per block
    /// before the voices render.
    pub fn housekeeping(&mut self) {
        for voice in &mut self.voices {
            voice.housekeeping();
        }

        // One snapshot drives both valves so they cannot disagree
        let active = self.sounding_count();

        self.release_scale = match active {
            n if n > 20 => 16.0,
            n if n > 16 => 8.0,
            n if n > 12 => 4.0,
            n if n > 8 => 2.0,
            _ => 1.0,
        };
        for voice in &mut self.voices {
            voice.set_release_scale(self.release_scale);
        }

        if active > HARD_CAP {
            self.enforce_hard_cap(active - HARD_CAP);
        }
    }

    /// Force-fade the `excess` quietest voices, preferring ones already
    /// in release. Bounded scan per victim, no allocation.
    fn enforce_hard_cap(&mut self, excess: usize) {
        for _ in 0..excess {
            let mut victim: Option<usize> = None;
            let mut best_key = (false, f32::MAX);
            for (i, voice) in self.voices.iter().enumerate() {
                if !voice.is_busy() || voice.is_fading() {
                    continue;
                }
                // Releasing voices sort before held ones at any level
                let key = (!voice.is_releasing(), voice.level());
                if victim.is_none() || key < best_key {
                    victim = Some(i);
                    best_key = key;
                }
            }
            match victim {
                Some(i) => self.voices[i].begin_force_fade(),
                None => break,
            }
        }
    }

    // Allocation

    fn allocate(&mut self, note: u8, velocity: u8) {
        // Idle or recycle-marked voice first
        if let Some(i) = self.voices.iter().position(|v| !v.is_busy()) {
            self.voices[i].steal(note, velocity);
            self.stamp(i);
            return;
        }

        // Quietest releasing voice, else quietest overall
        let mut best = 0;
        let mut best_key = (true, f32::MAX);
        for (i, voice) in self.voices.iter().enumerate() {
            let key = (!voice.is_releasing(), voice.level());
            if key < best_key {
                best = i;
                best_key = key;
            }
        }
        self.voices[best].steal(note, velocity);
        self.stamp(best);
    }

    fn stamp(&mut self, index: usize) {
        self.age_counter += 1;
        self.voices[index].set_age(self.age_counter);
    }

    // Mono note stack

    fn stack_push(&mut self, note: u8) {
        self.stack_remove(note);
        if self.stack_len == NOTE_STACK_DEPTH {
            self.note_stack.copy_within(1.., 0);
            self.stack_len -= 1;
        }
        self.note_stack[self.stack_len] = note;
        self.stack_len += 1;
    }

    fn stack_remove(&mut self, note: u8) {
        let mut write = 0;
        for read in 0..self.stack_len {
            if self.note_stack[read] != note {
                self.note_stack[write] = self.note_stack[read];
                write += 1;
            }
        }
        self.stack_len = write;
    }

    // Queries

    /// Voices currently sounding and not force-fading out.
    fn sounding_count(&self) -> usize {
        self.voices
            .iter()
            .filter(|v| v.is_busy() && !v.is_fading())
            .count()
    }

    /// Busy voice count, for telemetry.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_busy()).count()
    }

    /// Current release time multiplier.
    pub fn release_scale(&self) -> f32 {
        self.release_scale
    }

    /// Iterate all voices mutably, for broadcast configuration and
    /// rendering.
    pub fn voices_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.voices.iter_mut()
    }

    /// Iterate all voices.
    pub fn voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter()
    }
}
