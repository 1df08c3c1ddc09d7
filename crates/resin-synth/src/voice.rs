//! A single polyphonic voice.
//!
//! Composes the oscillator bank (two unison slots plus a sub), one state
//! variable filter per stereo channel, amplitude and filter envelopes,
//! glide, hard sync, and the crossfades that keep retriggering and voice
//! stealing click-free. Voices are value types owned by the pool; they
//! are constructed once and reused across notes.

use libm::exp2f;

use resin_core::{
    AckFlag, Effect, FilterMode, LinearSmoothedParam, SmoothedParam, StateVariableFilter, sanitize,
};

use crate::envelope::AdsrEnvelope;
use crate::global_lfo::LfoDestination;
use crate::oscillator::{OscWaveform, Oscillator};
use crate::params::EngineParams;
use crate::unison::{MAX_UNISON, UnisonCopy, UnisonSettings, compute_layout, pan_gains};
use crate::wavetable::Wavetable;

/// Steal fades run this fast; long enough to avoid a click, short
/// enough that the stolen voice is gone before its replacement speaks.
const STEAL_FADE_MS: f32 = 1.0;
/// Velocity smoothing for aftertouch-style level changes.
const VELOCITY_SMOOTH_MS: f32 = 20.0;
/// Routed LFO pitch depth at full window, in semitones.
const LFO_PITCH_SEMITONES: f32 = 2.0;
/// Mod-wheel vibrato depth at full wheel, in semitones.
const VIBRATO_SEMITONES: f32 = 0.5;
/// Routed LFO cutoff depth at full window, in octaves.
const LFO_CUTOFF_OCTAVES: f32 = 3.0;

/// Convert a MIDI note number to frequency (A4 = 440 Hz).
#[inline]
pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * exp2f((f32::from(note) - 69.0) / 12.0)
}

/// Convert a detune offset in cents to a frequency ratio.
#[inline]
pub fn cents_to_ratio(cents: f32) -> f32 {
    exp2f(cents / 1200.0)
}

#[inline]
fn octave_ratio(octave: i32) -> f32 {
    match octave.clamp(-3, 3) {
        -3 => 0.125,
        -2 => 0.25,
        -1 => 0.5,
        0 => 1.0,
        1 => 2.0,
        2 => 4.0,
        _ => 8.0,
    }
}

/// Shared per-block state handed to every voice render.
pub struct RenderContext<'a> {
    /// Global read-only engine configuration.
    pub params: &'a EngineParams,
    /// Precomputed LFO 1 buffer, one value per frame.
    pub lfo1: &'a [f32],
    /// Precomputed LFO 2 buffer.
    pub lfo2: &'a [f32],
    /// Shared morph table.
    pub wavetable: &'a Wavetable,
}

impl RenderContext<'_> {
    /// Sum of both buses routed to `dest` at frame `i`.
    #[inline]
    fn routed(&self, dest: LfoDestination, i: usize) -> f32 {
        let mut value = 0.0;
        if self.params.lfo1_dest == dest {
            value += self.lfo1[i];
        }
        if self.params.lfo2_dest == dest {
            value += self.lfo2[i];
        }
        value
    }
}

/// One cached unison slot: layout plus derived ratios and pan gains.
#[derive(Debug, Clone)]
struct UnisonSlot {
    settings: UnisonSettings,
    layout: [UnisonCopy; MAX_UNISON],
    count: usize,
    detune_ratio: [f32; MAX_UNISON],
    pan: [(f32, f32); MAX_UNISON],
}

impl UnisonSlot {
    fn new() -> Self {
        let mut slot = Self {
            settings: UnisonSettings::default(),
            layout: [UnisonCopy::default(); MAX_UNISON],
            count: 1,
            detune_ratio: [1.0; MAX_UNISON],
            pan: [(0.0, 0.0); MAX_UNISON],
        };
        slot.recalculate();
        slot
    }

    fn set(&mut self, settings: UnisonSettings) {
        self.settings = settings;
        self.recalculate();
    }

    fn recalculate(&mut self) {
        self.count = compute_layout(self.settings, &mut self.layout);
        for v in 0..self.count {
            self.detune_ratio[v] = cents_to_ratio(self.layout[v].detune_cents);
            self.pan[v] = pan_gains(self.layout[v].pan);
        }
    }
}

/// A single voice in the pool.
///
/// # Example
///
/// ```rust
/// use resin_synth::{Voice, RenderContext, EngineParams, Wavetable};
///
/// let table = Wavetable::build();
/// let params = EngineParams::new();
/// let mut voice = Voice::new(48000.0);
/// voice.note_on(69, 100);
///
/// let lfo = [0.0f32; 64];
/// let (mut l, mut r) = ([0.0f32; 64], [0.0f32; 64]);
/// let ctx = RenderContext { params: &params, lfo1: &lfo, lfo2: &lfo, wavetable: &table };
/// voice.render(&mut l, &mut r, &ctx);
/// assert!(voice.is_busy());
/// ```
#[derive(Debug)]
pub struct Voice {
    note: u8,
    /// Allocation order stamp, set by the pool.
    age: u64,
    velocity: SmoothedParam,

    osc1: [Oscillator; MAX_UNISON],
    osc2: [Oscillator; MAX_UNISON],
    sub_osc: Oscillator,
    unison1: UnisonSlot,
    unison2: UnisonSlot,

    filter_l: StateVariableFilter,
    filter_r: StateVariableFilter,
    filter_resonance: f32,

    amp_env: AdsrEnvelope,
    filter_env: AdsrEnvelope,

    /// Note frequency with glide smoothing.
    freq: SmoothedParam,
    glide_ms: f32,

    /// Steal fade gain: 1.0 while sounding, ramped to 0 over ~1 ms
    /// when the voice is force-faded.
    fade: LinearSmoothedParam,
    fading: bool,

    /// Base controls needed when an LFO modulates them.
    pulse_width1: f32,
    pulse_width2: f32,
    fm_depth: f32,

    /// Note-off requested from the event side.
    release_request: AckFlag,
    /// Steal marked; allocator treats the voice as free.
    recycle_request: AckFlag,

    sample_rate: f32,
}

impl Voice {
    /// Create an idle voice.
    pub fn new(sample_rate: f32) -> Self {
        let mut freq = SmoothedParam::new(440.0);
        freq.set_sample_rate(sample_rate);

        Self {
            note: 0,
            age: 0,
            velocity: SmoothedParam::with_config(0.0, sample_rate, VELOCITY_SMOOTH_MS),
            osc1: core::array::from_fn(|_| Oscillator::new(sample_rate)),
            osc2: core::array::from_fn(|_| Oscillator::new(sample_rate)),
            sub_osc: Oscillator::new(sample_rate),
            unison1: UnisonSlot::new(),
            unison2: UnisonSlot::new(),
            filter_l: StateVariableFilter::new(sample_rate),
            filter_r: StateVariableFilter::new(sample_rate),
            filter_resonance: 0.0,
            amp_env: AdsrEnvelope::new(sample_rate),
            filter_env: AdsrEnvelope::new(sample_rate),
            freq,
            glide_ms: 0.0,
            fade: LinearSmoothedParam::with_config(1.0, sample_rate, STEAL_FADE_MS),
            fading: false,
            pulse_width1: 0.5,
            pulse_width2: 0.5,
            fm_depth: 0.0,
            release_request: AckFlag::new(),
            recycle_request: AckFlag::new(),
            sample_rate,
        }
    }

    // Lifecycle

    /// Trigger a note.
    ///
    /// An already-sounding voice glides to the new pitch (when glide is
    /// configured) and retriggers its envelopes with the level floor, so
    /// reuse never clicks.
    pub fn note_on(&mut self, note: u8, velocity: u8) {
        let vel = f32::from(velocity) / 127.0;
        let target = midi_to_freq(note);

        if self.amp_env.is_active() && self.glide_ms > 0.0 {
            self.freq.set_target(target);
        } else {
            self.freq.set_immediate(target);
        }

        if self.amp_env.is_active() {
            self.velocity.set_target(vel);
        } else {
            self.velocity.set_immediate(vel);
            for osc in self.osc1.iter_mut().chain(self.osc2.iter_mut()) {
                osc.reset();
            }
            self.sub_osc.reset();
        }

        for osc in self.osc1.iter_mut().chain(self.osc2.iter_mut()) {
            osc.set_fm_velocity(vel);
        }

        self.note = note;
        self.fading = false;
        self.fade.set_immediate(1.0);
        self.amp_env.gate_on(vel);
        self.filter_env.gate_on(vel);
    }

    /// Glide to a new note without retriggering envelopes (legato).
    pub fn change_note(&mut self, note: u8) {
        self.note = note;
        let target = midi_to_freq(note);
        if self.glide_ms > 0.0 {
            self.freq.set_target(target);
        } else {
            self.freq.set_immediate(target);
        }
    }

    /// Reuse this voice for a new note after a steal.
    ///
    /// Consumes the pending recycle mark; the envelope retrigger floor
    /// bridges the old level into the new attack.
    pub fn steal(&mut self, note: u8, velocity: u8) {
        self.recycle_request.consume();
        self.note_on(note, velocity);
    }

    /// Request a release from the event side; applied at block start.
    pub fn request_release(&self) {
        self.release_request.raise();
    }

    /// Mark the voice stealable; the allocator treats it as free.
    pub fn request_recycle(&self) {
        self.recycle_request.raise();
    }

    /// Release the note immediately (render side).
    pub fn release(&mut self) {
        self.amp_env.gate_off();
        self.filter_env.gate_off();
    }

    /// Start the ~1 ms force fade used by the hard voice cap.
    pub fn begin_force_fade(&mut self) {
        if !self.fading {
            self.fading = true;
            self.fade.set_target(0.0);
        }
    }

    /// Consume pending cross-thread requests. Called once per block.
    pub fn housekeeping(&mut self) {
        if self.release_request.consume() {
            self.release();
        }
        if self.fading && self.fade.is_settled() {
            self.finish();
        }
    }

    /// Force the voice idle with no fade.
    pub fn finish(&mut self) {
        self.amp_env.reset();
        self.filter_env.reset();
        self.filter_l.reset();
        self.filter_r.reset();
        self.fading = false;
        self.fade.set_immediate(1.0);
        self.release_request.consume();
        self.recycle_request.consume();
    }

    /// Full reset to construction state.
    pub fn reset(&mut self) {
        self.finish();
        for osc in self.osc1.iter_mut().chain(self.osc2.iter_mut()) {
            osc.reset();
        }
        self.sub_osc.reset();
        self.freq.set_immediate(440.0);
        self.velocity.set_immediate(0.0);
        self.note = 0;
        self.age = 0;
    }

    // Queries

    /// Busy means sounding and not marked for recycling.
    pub fn is_busy(&self) -> bool {
        self.amp_env.is_active() && !self.recycle_request.is_raised()
    }

    /// Whether the amplitude envelope is in its release segment.
    pub fn is_releasing(&self) -> bool {
        self.amp_env.is_releasing()
    }

    /// Whether a force fade is in progress.
    pub fn is_fading(&self) -> bool {
        self.fading
    }

    /// Current amplitude envelope level.
    pub fn level(&self) -> f32 {
        self.amp_env.level()
    }

    /// Note this voice is playing.
    pub fn note(&self) -> u8 {
        self.note
    }

    /// Allocation stamp, maintained by the pool.
    pub fn age(&self) -> u64 {
        self.age
    }

    /// Set the allocation stamp.
    pub fn set_age(&mut self, age: u64) {
        self.age = age;
    }

    // Broadcast parameter setters

    /// Set oscillator 1 waveform on every unison copy.
    pub fn set_osc1_waveform(&mut self, waveform: OscWaveform) {
        for osc in &mut self.osc1 {
            osc.set_waveform(waveform);
        }
    }

    /// Set oscillator 2 waveform on every unison copy.
    pub fn set_osc2_waveform(&mut self, waveform: OscWaveform) {
        for osc in &mut self.osc2 {
            osc.set_waveform(waveform);
        }
    }

    /// Set the sub-oscillator waveform.
    pub fn set_sub_waveform(&mut self, waveform: OscWaveform) {
        self.sub_osc.set_waveform(waveform);
    }

    /// Set oscillator 1 pulse duty cycle.
    pub fn set_osc1_pulse_width(&mut self, width: f32) {
        self.pulse_width1 = width.clamp(0.05, 0.95);
        for osc in &mut self.osc1 {
            osc.set_pulse_width(self.pulse_width1);
        }
    }

    /// Set oscillator 2 pulse duty cycle.
    pub fn set_osc2_pulse_width(&mut self, width: f32) {
        self.pulse_width2 = width.clamp(0.05, 0.95);
        for osc in &mut self.osc2 {
            osc.set_pulse_width(self.pulse_width2);
        }
    }

    /// Set the FM modulator ratio and index on both slots.
    pub fn set_fm(&mut self, coarse: f32, fine: f32, depth: f32) {
        self.fm_depth = depth.clamp(0.0, 1.0);
        for osc in self.osc1.iter_mut().chain(self.osc2.iter_mut()) {
            osc.set_fm_ratio(coarse, fine);
            osc.set_fm_depth(self.fm_depth);
        }
    }

    /// Set oscillator 1 unison layout.
    pub fn set_unison1(&mut self, settings: UnisonSettings) {
        self.unison1.set(settings);
    }

    /// Set oscillator 2 unison layout.
    pub fn set_unison2(&mut self, settings: UnisonSettings) {
        self.unison2.set(settings);
    }

    /// Set normalized filter resonance on both channels.
    pub fn set_filter_resonance(&mut self, resonance: f32) {
        self.filter_resonance = resonance.clamp(0.0, 1.0);
        self.filter_l.set_resonance(self.filter_resonance);
        self.filter_r.set_resonance(self.filter_resonance);
    }

    /// Set the filter response on both channels.
    pub fn set_filter_mode(&mut self, mode: FilterMode) {
        self.filter_l.set_mode(mode);
        self.filter_r.set_mode(mode);
    }

    /// Amplitude envelope, for time/sustain configuration.
    pub fn amp_env_mut(&mut self) -> &mut AdsrEnvelope {
        &mut self.amp_env
    }

    /// Filter envelope, for time/sustain configuration.
    pub fn filter_env_mut(&mut self) -> &mut AdsrEnvelope {
        &mut self.filter_env
    }

    /// Set the release speed-up applied under heavy polyphony.
    pub fn set_release_scale(&mut self, scale: f32) {
        self.amp_env.set_release_scale(scale);
        self.filter_env.set_release_scale(scale);
    }

    /// Set glide (portamento) time in milliseconds.
    pub fn set_glide_ms(&mut self, ms: f32) {
        self.glide_ms = ms.max(0.0);
        self.freq.set_smoothing_time_ms(self.glide_ms);
    }

    /// Retarget the smoothed velocity (aftertouch).
    pub fn set_velocity_target(&mut self, velocity: f32) {
        self.velocity.set_target(velocity.clamp(0.0, 1.0));
    }

    /// Set velocity-to-envelope-time sensitivity on both envelopes.
    pub fn set_velocity_sensitivity(&mut self, sens: f32) {
        self.amp_env.set_velocity_sensitivity(sens);
        self.filter_env.set_velocity_sensitivity(sens);
    }

    /// Update the sample rate on every component.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for osc in self.osc1.iter_mut().chain(self.osc2.iter_mut()) {
            osc.set_sample_rate(sample_rate);
        }
        self.sub_osc.set_sample_rate(sample_rate);
        self.filter_l.set_sample_rate(sample_rate);
        self.filter_r.set_sample_rate(sample_rate);
        self.amp_env.set_sample_rate(sample_rate);
        self.filter_env.set_sample_rate(sample_rate);
        self.freq.set_sample_rate(sample_rate);
        self.fade.set_sample_rate(sample_rate);
        self.velocity.set_sample_rate(sample_rate);
    }

    // Rendering

    /// Render and accumulate into the stereo output slices.
    ///
    /// Both slices and both LFO buffers must be at least `out_l.len()`
    /// frames long. Inactive voices return immediately.
    pub fn render(&mut self, out_l: &mut [f32], out_r: &mut [f32], ctx: &RenderContext<'_>) {
        if !self.amp_env.is_active() {
            return;
        }

        let p = ctx.params;
        let frames = out_l.len().min(out_r.len());

        for i in 0..frames {
            // Pitch: glide + bend + vibrato + routed LFO, in semitones
            let vibrato = ctx.lfo1[i] * p.mod_wheel * VIBRATO_SEMITONES;
            let common_semis =
                p.pitch_bend + vibrato + ctx.routed(LfoDestination::Pitch, i) * LFO_PITCH_SEMITONES;
            let base_freq = self.freq.advance() * pitch_ratio(common_semis);

            let ratio1 =
                pitch_ratio(ctx.routed(LfoDestination::Osc1Pitch, i) * LFO_PITCH_SEMITONES);
            let ratio2 =
                pitch_ratio(ctx.routed(LfoDestination::Osc2Pitch, i) * LFO_PITCH_SEMITONES);

            // Slow controls modulated at audio rate only when routed
            self.apply_control_mods(ctx, i);

            let mut pre_l = 0.0;
            let mut pre_r = 0.0;
            let mut direct_l = 0.0;
            let mut direct_r = 0.0;

            // Oscillator 1 bank
            let level1 = (p.osc1.level * (1.0 + ctx.routed(LfoDestination::Osc1Level, i))).max(0.0);
            if level1 > 0.0 {
                let f1 = base_freq * octave_ratio(p.osc1.octave);
                let morph = (p.osc1.morph + ctx.routed(LfoDestination::Osc1Morph, i)).clamp(0.0, 1.0);
                for v in 0..self.unison1.count {
                    let osc = &mut self.osc1[v];
                    osc.set_frequency(f1 * self.unison1.detune_ratio[v]);
                    let s = if osc.waveform() == OscWaveform::Wavetable {
                        osc.advance_wavetable(ctx.wavetable, morph, ratio1)
                    } else {
                        osc.advance(ratio1)
                    };
                    let g = s * self.unison1.layout[v].weight * level1;
                    let (pl, pr) = self.unison1.pan[v];
                    pre_l += g * pl;
                    pre_r += g * pr;
                }
            } else {
                // Keep phases moving so sync and re-entry stay coherent
                for v in 0..self.unison1.count {
                    let f1 = base_freq * octave_ratio(p.osc1.octave);
                    self.osc1[v].set_frequency(f1 * self.unison1.detune_ratio[v]);
                    self.osc1[v].advance(ratio1);
                }
            }

            // Hard sync: master cycle completion resets every slave phase
            if p.osc2_sync && self.osc1[0].wrapped() {
                for v in 0..self.unison2.count {
                    self.osc2[v].sync();
                }
            }

            // Oscillator 2 bank
            let level2 = (p.osc2.level * (1.0 + ctx.routed(LfoDestination::Osc2Level, i))).max(0.0);
            if level2 > 0.0 {
                let f2 = base_freq
                    * octave_ratio(p.osc2.octave)
                    * cents_to_ratio(p.osc2.detune_cents);
                let morph = (p.osc2.morph + ctx.routed(LfoDestination::Osc2Morph, i)).clamp(0.0, 1.0);
                for v in 0..self.unison2.count {
                    let osc = &mut self.osc2[v];
                    osc.set_frequency(f2 * self.unison2.detune_ratio[v]);
                    let s = if osc.waveform() == OscWaveform::Wavetable {
                        osc.advance_wavetable(ctx.wavetable, morph, ratio2)
                    } else {
                        osc.advance(ratio2)
                    };
                    let g = s * self.unison2.layout[v].weight * level2;
                    let (pl, pr) = self.unison2.pan[v];
                    pre_l += g * pl;
                    pre_r += g * pr;
                }
            }

            // Sub-oscillator
            let sub_level = (p.sub.level * (1.0 + ctx.routed(LfoDestination::SubLevel, i))).max(0.0);
            if sub_level > 0.0 {
                self.sub_osc
                    .set_frequency(base_freq * octave_ratio(-i32::from(p.sub.octave_down.min(3))));
                let s = self.sub_osc.advance(1.0) * sub_level;
                let (pl, pr) = pan_gains(p.sub.pan);
                if p.sub.direct_out {
                    direct_l += s * pl;
                    direct_r += s * pr;
                } else {
                    pre_l += s * pl;
                    pre_r += s * pr;
                }
            }

            // Filter with envelope and LFO cutoff modulation in octaves
            let filter_env = self.filter_env.advance();
            let (mut sig_l, mut sig_r) = (pre_l, pre_r);
            if p.filter_enabled {
                let octaves = p.filter_env_amount * filter_env * 4.0
                    + ctx.routed(LfoDestination::FilterCutoff, i) * LFO_CUTOFF_OCTAVES;
                let cutoff = p.filter_cutoff * exp2f(octaves);
                self.filter_l.set_cutoff(cutoff);
                self.filter_r.set_cutoff(cutoff);
                sig_l = self.filter_l.process(sig_l);
                sig_r = self.filter_r.process(sig_r);
            }

            let amp = self.amp_env.advance() * self.velocity.advance() * self.fade.advance();
            let pan_mod = ctx.routed(LfoDestination::Pan, i);
            let (pan_l, pan_r) = if pan_mod == 0.0 {
                (1.0, 1.0)
            } else {
                let (l, r) = pan_gains(pan_mod);
                (l * core::f32::consts::SQRT_2, r * core::f32::consts::SQRT_2)
            };

            out_l[i] += sanitize((sig_l + direct_l) * amp * pan_l);
            out_r[i] += sanitize((sig_r + direct_r) * amp * pan_r);
        }
    }

    /// Push routed LFO values into the stateful controls (pulse width,
    /// FM index, resonance). No-ops when nothing is routed there.
    #[inline]
    fn apply_control_mods(&mut self, ctx: &RenderContext<'_>, i: usize) {
        let pw1 = ctx.routed(LfoDestination::Osc1PulseWidth, i);
        if pw1 != 0.0 {
            let width = self.pulse_width1 + pw1 * 0.45;
            for osc in &mut self.osc1 {
                osc.set_pulse_width(width);
            }
        }
        let pw2 = ctx.routed(LfoDestination::Osc2PulseWidth, i);
        if pw2 != 0.0 {
            let width = self.pulse_width2 + pw2 * 0.45;
            for osc in &mut self.osc2 {
                osc.set_pulse_width(width);
            }
        }
        let fm = ctx.routed(LfoDestination::FmDepth, i);
        if fm != 0.0 {
            let depth = (self.fm_depth + fm).clamp(0.0, 1.0);
            for osc in self.osc1.iter_mut().chain(self.osc2.iter_mut()) {
                osc.set_fm_depth(depth);
            }
        }
        let res = ctx.routed(LfoDestination::FilterResonance, i);
        if res != 0.0 {
            let resonance = (self.filter_resonance + res).clamp(0.0, 1.0);
            self.filter_l.set_resonance(resonance);
            self.filter_r.set_resonance(resonance);
        }
    }
}

/// Semitones to frequency ratio, skipping the exp for the common case.
#[inline]
fn pitch_ratio(semitones: f32) -> f32 {
    if semitones == 0.0 {
        1.0
    } else {
        exp2f(semitones / 12.0)
    }
}
