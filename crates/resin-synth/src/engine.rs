//! The polyphonic engine: voices, global modulation, and the master
//! effects chain behind one block-rendering facade.
//!
//! Per block, in order: clear the output, drain the event queue, run
//! pool housekeeping, precompute both LFO buses, render the voices,
//! apply master gain and soft clipping, then delay, reverb, and the
//! limiter. Event ingestion is wait-free; everything else runs on the
//! render thread.

use resin_core::{
    Effect, FilterMode, ParamDescriptor, ParameterInfo, SmoothedParam, TempoManager,
    TransportState, db_to_linear, sanitize, soft_clip,
};
use resin_effects::{Limiter, PlateReverb, StereoDelay};

use crate::envelope::AdsrEnvelope;
use crate::events::{EVENT_QUEUE_CAPACITY, EventReceiver, EventSender, MidiEvent, event_channel};
use crate::global_lfo::{GlobalLfo, LfoDestination};
use crate::oscillator::OscWaveform;
use crate::params::EngineParams;
use crate::pool::{VoiceMode, VoicePool};
use crate::unison::UnisonSettings;
use crate::voice::RenderContext;
use crate::wavetable::Wavetable;

/// Headroom scale applied after summing voices. Sized so a 16-voice
/// chord stays shy of full scale before the soft clipper.
const POLY_SCALE: f32 = 0.25;

/// Default pitch bend range in semitones.
const DEFAULT_BEND_RANGE: f32 = 2.0;

/// Default render block size in frames.
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Per-block diagnostics snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct Telemetry {
    /// Voices currently sounding.
    pub active_voices: usize,
    /// Release time multiplier in force.
    pub release_scale: f32,
    /// Peak absolute sample, left channel.
    pub peak_left: f32,
    /// Peak absolute sample, right channel.
    pub peak_right: f32,
    /// Last LFO 1 output.
    pub lfo1_value: f32,
    /// Last LFO 2 output.
    pub lfo2_value: f32,
    /// Limiter gain reduction, linear.
    pub gain_reduction: f32,
}

/// Complete synthesizer engine.
///
/// # Example
///
/// ```rust
/// use resin_synth::{SynthEngine, MidiEvent};
///
/// let mut engine = SynthEngine::new(48000.0, 512);
/// engine.handle_event(MidiEvent::NoteOn { note: 60, velocity: 100 });
///
/// let mut left = [0.0f32; 512];
/// let mut right = [0.0f32; 512];
/// engine.process_block(&mut left, &mut right);
/// assert!(left.iter().any(|&s| s != 0.0));
/// ```
pub struct SynthEngine {
    pool: VoicePool,
    params: EngineParams,
    lfo1: GlobalLfo,
    lfo2: GlobalLfo,
    wavetable: Wavetable,

    events: EventReceiver,
    sender: Option<EventSender>,

    delay: StereoDelay,
    delay_enabled: bool,
    reverb: PlateReverb,
    reverb_enabled: bool,
    limiter: Limiter,
    limiter_enabled: bool,

    master_gain: SmoothedParam,
    master_gain_db: f32,
    tempo: TempoManager,
    bend_range: f32,

    // Shadow copies of broadcast-only settings, for parameter readback
    filter_resonance: f32,
    amp_adsr: (f32, f32, f32, f32),
    filter_adsr: (f32, f32, f32, f32),
    unison1: UnisonSettings,
    unison2: UnisonSettings,
    glide_ms: f32,

    telemetry: Telemetry,
    sample_rate: f32,
    block_size: usize,
}

impl SynthEngine {
    /// Create an engine with its own event queue.
    pub fn new(sample_rate: f32, block_size: usize) -> Self {
        let (sender, events) = event_channel(EVENT_QUEUE_CAPACITY);
        let mut lfo1 = GlobalLfo::new(sample_rate);
        let mut lfo2 = GlobalLfo::new(sample_rate);
        lfo1.reset(sample_rate, block_size);
        lfo2.reset(sample_rate, block_size);

        let mut engine = Self {
            pool: VoicePool::new(sample_rate),
            params: EngineParams::new(),
            lfo1,
            lfo2,
            wavetable: Wavetable::build(),
            events,
            sender: Some(sender),
            delay: StereoDelay::new(sample_rate),
            delay_enabled: false,
            reverb: PlateReverb::new(sample_rate),
            reverb_enabled: false,
            limiter: Limiter::new(sample_rate),
            limiter_enabled: true,
            master_gain: SmoothedParam::with_config(1.0, sample_rate, 20.0),
            master_gain_db: 0.0,
            tempo: TempoManager::new(sample_rate, 120.0),
            bend_range: DEFAULT_BEND_RANGE,
            filter_resonance: 0.0,
            amp_adsr: (10.0, 200.0, 0.7, 300.0),
            filter_adsr: (5.0, 150.0, 0.3, 200.0),
            unison1: UnisonSettings::default(),
            unison2: UnisonSettings::default(),
            glide_ms: 0.0,
            telemetry: Telemetry::default(),
            sample_rate,
            block_size: block_size.max(1),
        };
        engine.apply_adsr();
        engine
    }

    /// Take the producer half of the event queue. Returns `None` after
    /// the first call; there is exactly one producer.
    pub fn take_event_sender(&mut self) -> Option<EventSender> {
        self.sender.take()
    }

    /// Apply an event immediately on the render thread.
    pub fn handle_event(&mut self, event: MidiEvent) {
        match event {
            MidiEvent::NoteOn { note, velocity } => self.pool.note_on(note, velocity),
            MidiEvent::NoteOff { note } => self.pool.note_off(note),
            MidiEvent::ControlChange { cc: 1, value } => {
                self.params.mod_wheel = f32::from(value) / 127.0;
            }
            MidiEvent::ControlChange { cc: 123, .. } | MidiEvent::AllNotesOff => {
                self.pool.release_all();
            }
            MidiEvent::ControlChange { .. } | MidiEvent::ProgramChange { .. } => {}
            MidiEvent::PitchBend { value } => {
                self.params.pitch_bend = value.clamp(-1.0, 1.0) * self.bend_range;
            }
            MidiEvent::Aftertouch { pressure } => {
                let target = f32::from(pressure) / 127.0;
                for voice in self.pool.voices_mut() {
                    if voice.is_busy() {
                        voice.set_velocity_target(target);
                    }
                }
            }
        }
    }

    /// Render one block of stereo audio.
    ///
    /// Both slices must be the same length, at most the configured
    /// block size.
    pub fn process_block(&mut self, out_l: &mut [f32], out_r: &mut [f32]) {
        let frames = out_l.len().min(out_r.len()).min(self.block_size);
        let out_l = &mut out_l[..frames];
        let out_r = &mut out_r[..frames];
        out_l.fill(0.0);
        out_r.fill(0.0);

        while let Some(event) = self.events.pop() {
            self.handle_event(event);
        }

        self.pool.housekeeping();

        let bpm = self.tempo.bpm();
        self.lfo1.fill(frames, bpm);
        self.lfo2.fill(frames, bpm);

        let ctx = RenderContext {
            params: &self.params,
            lfo1: self.lfo1.buffer(),
            lfo2: self.lfo2.buffer(),
            wavetable: &self.wavetable,
        };
        for voice in self.pool.voices_mut() {
            voice.render(out_l, out_r, &ctx);
        }

        let gain_mod = |buses: (f32, f32)| (1.0 + buses.0 + buses.1).max(0.0);
        let lfo1_routed = self.params.lfo1_dest == LfoDestination::MasterGain;
        let lfo2_routed = self.params.lfo2_dest == LfoDestination::MasterGain;

        for i in 0..frames {
            let mut gain = self.master_gain.advance() * POLY_SCALE;
            if lfo1_routed || lfo2_routed {
                gain *= gain_mod((
                    if lfo1_routed { self.lfo1.buffer()[i] } else { 0.0 },
                    if lfo2_routed { self.lfo2.buffer()[i] } else { 0.0 },
                ));
            }
            out_l[i] = soft_clip(out_l[i] * gain);
            out_r[i] = soft_clip(out_r[i] * gain);
        }

        if self.delay_enabled {
            self.delay.set_bpm(bpm);
            for i in 0..frames {
                let (l, r) = self.delay.process_stereo(out_l[i], out_r[i]);
                out_l[i] = l;
                out_r[i] = r;
            }
        }
        if self.reverb_enabled {
            for i in 0..frames {
                let (l, r) = self.reverb.process_stereo(out_l[i], out_r[i]);
                out_l[i] = l;
                out_r[i] = r;
            }
        }
        if self.limiter_enabled {
            for i in 0..frames {
                let (l, r) = self.limiter.process_stereo(out_l[i], out_r[i]);
                out_l[i] = l;
                out_r[i] = r;
            }
        }

        let mut peak_l = 0.0f32;
        let mut peak_r = 0.0f32;
        for i in 0..frames {
            out_l[i] = sanitize(out_l[i]);
            out_r[i] = sanitize(out_r[i]);
            peak_l = peak_l.max(out_l[i].abs());
            peak_r = peak_r.max(out_r[i].abs());
            self.tempo.advance();
        }

        self.telemetry = Telemetry {
            active_voices: self.pool.active_count(),
            release_scale: self.pool.release_scale(),
            peak_left: peak_l,
            peak_right: peak_r,
            lfo1_value: self.lfo1.last_value(),
            lfo2_value: self.lfo2.last_value(),
            gain_reduction: self.limiter.gain_reduction(),
        };
    }

    /// Reconfigure for a new sample rate and block size, resetting all
    /// state.
    pub fn reset(&mut self, sample_rate: f32, block_size: usize) {
        #[cfg(feature = "tracing")]
        tracing::debug!(sample_rate, block_size, "engine reset");

        self.sample_rate = sample_rate;
        self.block_size = block_size.max(1);
        self.pool.set_sample_rate(sample_rate);
        self.pool.reset();
        self.lfo1.reset(sample_rate, self.block_size);
        self.lfo2.reset(sample_rate, self.block_size);
        self.delay.set_sample_rate(sample_rate);
        self.delay.reset();
        self.reverb.set_sample_rate(sample_rate);
        self.reverb.reset();
        self.limiter.set_sample_rate(sample_rate);
        self.limiter.reset();
        self.master_gain.set_sample_rate(sample_rate);
        self.master_gain.snap_to_target();
        self.tempo.set_sample_rate(sample_rate);
        self.tempo.reset();
        self.apply_adsr();
    }

    // Transport

    /// Set the host transport state. The stopped-to-running edge clears
    /// effect tails so playback starts clean.
    pub fn set_transport(&mut self, state: TransportState) {
        let starting =
            state == TransportState::Playing && self.tempo.transport() == TransportState::Stopped;
        match state {
            TransportState::Playing => self.tempo.play(),
            TransportState::Stopped => self.tempo.stop(),
        }
        if starting {
            self.delay.reset();
            self.reverb.reset();
            self.limiter.reset();
        }
    }

    /// Set the host tempo. Non-positive values fall back to 120 BPM.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.tempo.set_bpm(bpm);
    }

    /// Current tempo in BPM.
    pub fn bpm(&self) -> f32 {
        self.tempo.bpm()
    }

    // Voice configuration, broadcast to the pool

    /// Set the allocation mode. Sounding notes are released first.
    pub fn set_voice_mode(&mut self, mode: VoiceMode) {
        #[cfg(feature = "tracing")]
        tracing::debug!(?mode, "voice mode switch");
        self.pool.set_mode(mode);
    }

    /// Current allocation mode.
    pub fn voice_mode(&self) -> VoiceMode {
        self.pool.mode()
    }

    /// Set oscillator 1's waveform.
    pub fn set_osc1_waveform(&mut self, waveform: OscWaveform) {
        for voice in self.pool.voices_mut() {
            voice.set_osc1_waveform(waveform);
        }
    }

    /// Set oscillator 2's waveform.
    pub fn set_osc2_waveform(&mut self, waveform: OscWaveform) {
        for voice in self.pool.voices_mut() {
            voice.set_osc2_waveform(waveform);
        }
    }

    /// Set the sub-oscillator waveform.
    pub fn set_sub_waveform(&mut self, waveform: OscWaveform) {
        for voice in self.pool.voices_mut() {
            voice.set_sub_waveform(waveform);
        }
    }

    /// Set oscillator 1's pulse duty cycle.
    pub fn set_osc1_pulse_width(&mut self, width: f32) {
        for voice in self.pool.voices_mut() {
            voice.set_osc1_pulse_width(width);
        }
    }

    /// Set oscillator 2's pulse duty cycle.
    pub fn set_osc2_pulse_width(&mut self, width: f32) {
        for voice in self.pool.voices_mut() {
            voice.set_osc2_pulse_width(width);
        }
    }

    /// Set the FM modulator ratio and index for both slots.
    pub fn set_fm(&mut self, coarse: f32, fine: f32, depth: f32) {
        for voice in self.pool.voices_mut() {
            voice.set_fm(coarse, fine, depth);
        }
    }

    /// Set oscillator 1's unison layout.
    pub fn set_unison1(&mut self, settings: UnisonSettings) {
        self.unison1 = settings.clamped();
        for voice in self.pool.voices_mut() {
            voice.set_unison1(settings);
        }
    }

    /// Set oscillator 2's unison layout.
    pub fn set_unison2(&mut self, settings: UnisonSettings) {
        self.unison2 = settings.clamped();
        for voice in self.pool.voices_mut() {
            voice.set_unison2(settings);
        }
    }

    /// Set glide (portamento) time in milliseconds.
    pub fn set_glide_ms(&mut self, ms: f32) {
        self.glide_ms = ms.max(0.0);
        for voice in self.pool.voices_mut() {
            voice.set_glide_ms(ms);
        }
    }

    /// Set velocity-to-envelope-time sensitivity, \[0, 1\].
    pub fn set_velocity_sensitivity(&mut self, sens: f32) {
        for voice in self.pool.voices_mut() {
            voice.set_velocity_sensitivity(sens);
        }
    }

    /// Set the pitch bend range in semitones.
    pub fn set_bend_range(&mut self, semitones: f32) {
        self.bend_range = semitones.clamp(0.0, 48.0);
    }

    /// Set the amplitude envelope times and sustain.
    pub fn set_amp_adsr(&mut self, attack_ms: f32, decay_ms: f32, sustain: f32, release_ms: f32) {
        self.amp_adsr = (attack_ms, decay_ms, sustain, release_ms);
        self.apply_adsr();
    }

    /// Set the filter envelope times and sustain.
    pub fn set_filter_adsr(
        &mut self,
        attack_ms: f32,
        decay_ms: f32,
        sustain: f32,
        release_ms: f32,
    ) {
        self.filter_adsr = (attack_ms, decay_ms, sustain, release_ms);
        self.apply_adsr();
    }

    fn apply_adsr(&mut self) {
        let amp = self.amp_adsr;
        let filt = self.filter_adsr;
        let configure = |env: &mut AdsrEnvelope, (a, d, s, r): (f32, f32, f32, f32)| {
            env.set_attack_ms(a);
            env.set_decay_ms(d);
            env.set_sustain(s);
            env.set_release_ms(r);
        };
        for voice in self.pool.voices_mut() {
            configure(voice.amp_env_mut(), amp);
            configure(voice.filter_env_mut(), filt);
        }
    }

    // Filter

    /// Enable or disable the per-voice filter.
    pub fn set_filter_enabled(&mut self, enabled: bool) {
        self.params.filter_enabled = enabled;
    }

    /// Set the filter base cutoff in Hz.
    pub fn set_filter_cutoff(&mut self, hz: f32) {
        self.params.filter_cutoff = hz.clamp(20.0, 20_000.0);
    }

    /// Set the normalized filter resonance.
    pub fn set_filter_resonance(&mut self, resonance: f32) {
        self.filter_resonance = resonance.clamp(0.0, 1.0);
        for voice in self.pool.voices_mut() {
            voice.set_filter_resonance(resonance);
        }
    }

    /// Set the filter response mode.
    pub fn set_filter_mode(&mut self, mode: FilterMode) {
        for voice in self.pool.voices_mut() {
            voice.set_filter_mode(mode);
        }
    }

    /// Set the filter envelope depth, \[-1, 1\] mapped to ±4 octaves.
    pub fn set_filter_env_amount(&mut self, amount: f32) {
        self.params.filter_env_amount = amount.clamp(-1.0, 1.0);
    }

    // Mix

    /// Set the master output gain in dB.
    pub fn set_master_gain_db(&mut self, db: f32) {
        self.master_gain_db = db.clamp(-60.0, 6.0);
        self.master_gain.set_target(db_to_linear(self.master_gain_db));
    }

    // Direct access for the remaining knobs

    /// Read-only view of the render parameters.
    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// Mutable render parameters (oscillator slots, sub, sync, wheel).
    pub fn params_mut(&mut self) -> &mut EngineParams {
        &mut self.params
    }

    /// Global LFO 1.
    pub fn lfo1_mut(&mut self) -> &mut GlobalLfo {
        &mut self.lfo1
    }

    /// Global LFO 2.
    pub fn lfo2_mut(&mut self) -> &mut GlobalLfo {
        &mut self.lfo2
    }

    /// Route LFO 1 and keep the bus and the voices agreeing.
    pub fn set_lfo1_destination(&mut self, dest: LfoDestination) {
        self.lfo1.set_destination(dest);
        self.params.lfo1_dest = dest;
    }

    /// Route LFO 2.
    pub fn set_lfo2_destination(&mut self, dest: LfoDestination) {
        self.lfo2.set_destination(dest);
        self.params.lfo2_dest = dest;
    }

    /// Tempo-synced stereo delay.
    pub fn delay_mut(&mut self) -> &mut StereoDelay {
        &mut self.delay
    }

    /// Plate reverb.
    pub fn reverb_mut(&mut self) -> &mut PlateReverb {
        &mut self.reverb
    }

    /// Output limiter.
    pub fn limiter_mut(&mut self) -> &mut Limiter {
        &mut self.limiter
    }

    /// Enable or bypass the delay.
    pub fn set_delay_enabled(&mut self, enabled: bool) {
        self.delay_enabled = enabled;
    }

    /// Enable or bypass the reverb.
    pub fn set_reverb_enabled(&mut self, enabled: bool) {
        self.reverb_enabled = enabled;
    }

    /// Enable or bypass the limiter.
    pub fn set_limiter_enabled(&mut self, enabled: bool) {
        self.limiter_enabled = enabled;
    }

    // Diagnostics

    /// Snapshot of the last rendered block.
    pub fn telemetry(&self) -> Telemetry {
        self.telemetry
    }

    /// Voices currently sounding.
    pub fn active_voices(&self) -> usize {
        self.pool.active_count()
    }

    /// Configured sample rate.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Configured maximum block size.
    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

const PARAMS: [ParamDescriptor; 20] = [
    ParamDescriptor::gain_db("Master Gain", "Gain", -60.0, 6.0, 0.0),
    ParamDescriptor::freq_hz("Filter Cutoff", "Cutoff", 20.0, 20_000.0, 8000.0),
    ParamDescriptor::scalar("Filter Resonance", "Reso", 0.0, 1.0, 0.0),
    ParamDescriptor::scalar("Filter Env Amount", "FltEnv", -1.0, 1.0, 0.0),
    ParamDescriptor::time_ms("Amp Attack", "AmpAtk", 0.1, 5000.0, 10.0),
    ParamDescriptor::time_ms("Amp Decay", "AmpDec", 1.0, 5000.0, 200.0),
    ParamDescriptor::scalar("Amp Sustain", "AmpSus", 0.0, 1.0, 0.7),
    ParamDescriptor::time_ms("Amp Release", "AmpRel", 1.0, 10_000.0, 300.0),
    ParamDescriptor::time_ms("Filter Attack", "FltAtk", 0.1, 5000.0, 5.0),
    ParamDescriptor::time_ms("Filter Decay", "FltDec", 1.0, 5000.0, 150.0),
    ParamDescriptor::scalar("Filter Sustain", "FltSus", 0.0, 1.0, 0.3),
    ParamDescriptor::time_ms("Filter Release", "FltRel", 1.0, 10_000.0, 200.0),
    ParamDescriptor::scalar("Osc 1 Level", "Osc1Lvl", 0.0, 1.0, 1.0),
    ParamDescriptor::scalar("Osc 2 Level", "Osc2Lvl", 0.0, 1.0, 0.0),
    ParamDescriptor::scalar("Sub Level", "SubLvl", 0.0, 1.0, 0.0),
    ParamDescriptor::scalar("Osc 2 Detune", "Osc2Det", -100.0, 100.0, 0.0),
    ParamDescriptor::stepped("Unison Voices", "Unison", 8.0, 1.0),
    ParamDescriptor::scalar("Unison Spread", "UniSprd", 0.0, 1.0, 0.2),
    ParamDescriptor::time_ms("Glide Time", "Glide", 0.0, 2000.0, 0.0),
    ParamDescriptor::stepped("Voice Mode", "Mode", 2.0, 0.0),
];

impl ParameterInfo for SynthEngine {
    fn param_count(&self) -> usize {
        PARAMS.len()
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        PARAMS.get(index).copied()
    }

    fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.master_gain_db,
            1 => self.params.filter_cutoff,
            2 => self.filter_resonance,
            3 => self.params.filter_env_amount,
            4 => self.amp_adsr.0,
            5 => self.amp_adsr.1,
            6 => self.amp_adsr.2,
            7 => self.amp_adsr.3,
            8 => self.filter_adsr.0,
            9 => self.filter_adsr.1,
            10 => self.filter_adsr.2,
            11 => self.filter_adsr.3,
            12 => self.params.osc1.level,
            13 => self.params.osc2.level,
            14 => self.params.sub.level,
            15 => self.params.osc2.detune_cents,
            16 => self.unison1.count as f32,
            17 => self.unison1.spread,
            18 => self.glide_ms,
            19 => match self.pool.mode() {
                VoiceMode::Poly => 0.0,
                VoiceMode::Mono => 1.0,
                VoiceMode::Legato => 2.0,
            },
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        let Some(desc) = PARAMS.get(index) else {
            return;
        };
        let value = desc.clamp(value);
        match index {
            0 => self.set_master_gain_db(value),
            1 => self.set_filter_cutoff(value),
            2 => self.set_filter_resonance(value),
            3 => self.set_filter_env_amount(value),
            4 => self.set_amp_adsr(value, self.amp_adsr.1, self.amp_adsr.2, self.amp_adsr.3),
            5 => self.set_amp_adsr(self.amp_adsr.0, value, self.amp_adsr.2, self.amp_adsr.3),
            6 => self.set_amp_adsr(self.amp_adsr.0, self.amp_adsr.1, value, self.amp_adsr.3),
            7 => self.set_amp_adsr(self.amp_adsr.0, self.amp_adsr.1, self.amp_adsr.2, value),
            8 => {
                self.set_filter_adsr(value, self.filter_adsr.1, self.filter_adsr.2, self.filter_adsr.3);
            }
            9 => {
                self.set_filter_adsr(self.filter_adsr.0, value, self.filter_adsr.2, self.filter_adsr.3);
            }
            10 => {
                self.set_filter_adsr(self.filter_adsr.0, self.filter_adsr.1, value, self.filter_adsr.3);
            }
            11 => {
                self.set_filter_adsr(self.filter_adsr.0, self.filter_adsr.1, self.filter_adsr.2, value);
            }
            12 => self.params.osc1.level = value,
            13 => self.params.osc2.level = value,
            14 => self.params.sub.level = value,
            15 => self.params.osc2.detune_cents = value,
            16 => {
                let settings = UnisonSettings {
                    count: value as usize,
                    ..self.unison1
                };
                self.set_unison1(settings);
            }
            17 => {
                let settings = UnisonSettings {
                    spread: value,
                    ..self.unison1
                };
                self.set_unison1(settings);
            }
            18 => self.set_glide_ms(value),
            19 => self.set_voice_mode(match value as u8 {
                1 => VoiceMode::Mono,
                2 => VoiceMode::Legato,
                _ => VoiceMode::Poly,
            }),
            _ => {}
        }
    }
}
