//! Engine configuration shared by the parameter path and the render path.
//!
//! A single [`EngineParams`] value lives in the engine and is passed by
//! reference into every voice render. The parameter path is its only
//! writer; the render path only reads. Values that derive per-voice DSP
//! state (envelope coefficients, filter resonance, unison layouts) are
//! instead broadcast to the voices through setters, so this struct holds
//! only the plain read-at-render values.

use crate::global_lfo::LfoDestination;

/// Read-at-render settings for one oscillator slot.
#[derive(Debug, Clone, Copy)]
pub struct OscSlotParams {
    /// Octave shift, \[-3, 3\].
    pub octave: i32,
    /// Slot-level detune in cents (osc 2 against osc 1).
    pub detune_cents: f32,
    /// Output level, \[0, 1\].
    pub level: f32,
    /// Wavetable morph position, \[0, 1\].
    pub morph: f32,
}

impl Default for OscSlotParams {
    fn default() -> Self {
        Self {
            octave: 0,
            detune_cents: 0.0,
            level: 1.0,
            morph: 0.0,
        }
    }
}

/// Sub-oscillator settings.
#[derive(Debug, Clone, Copy)]
pub struct SubOscParams {
    /// Octaves below the note pitch, 1 or 2.
    pub octave_down: u8,
    /// Output level, \[0, 1\].
    pub level: f32,
    /// Pan position, \[-1, 1\].
    pub pan: f32,
    /// When set, the sub bypasses the filter and feeds the output
    /// stage directly.
    pub direct_out: bool,
}

impl Default for SubOscParams {
    fn default() -> Self {
        Self {
            octave_down: 1,
            level: 0.0,
            pan: 0.0,
            direct_out: false,
        }
    }
}

/// Global engine state read by the render path.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineParams {
    /// Oscillator 1 slot.
    pub osc1: OscSlotParams,
    /// Oscillator 2 slot.
    pub osc2: OscSlotParams,
    /// Sub-oscillator slot.
    pub sub: SubOscParams,
    /// Hard-sync oscillator 2 to oscillator 1's cycle.
    pub osc2_sync: bool,
    /// Filter engaged; when false the voices run dry.
    pub filter_enabled: bool,
    /// Filter base cutoff in Hz.
    pub filter_cutoff: f32,
    /// Filter envelope depth, \[-1, 1\] mapped to ±4 octaves.
    pub filter_env_amount: f32,
    /// Pitch bend in semitones, already scaled by the bend range.
    pub pitch_bend: f32,
    /// Mod-wheel vibrato depth, \[0, 1\].
    pub mod_wheel: f32,
    /// LFO 1 routing.
    pub lfo1_dest: LfoDestination,
    /// LFO 2 routing.
    pub lfo2_dest: LfoDestination,
}

impl EngineParams {
    /// Defaults matching a plain initialized engine: oscillator 1 alone,
    /// filter open at 8 kHz.
    pub fn new() -> Self {
        Self {
            osc2: OscSlotParams {
                level: 0.0,
                ..OscSlotParams::default()
            },
            filter_enabled: true,
            filter_cutoff: 8000.0,
            ..Self::default()
        }
    }
}
