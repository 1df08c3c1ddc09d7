//! Polyphonic subtractive synthesizer engine.
//!
//! A 32-voice pool of two-oscillator voices (plus sub) with unison,
//! FM, wavetable morphing, hard sync, dual ADSR envelopes, a state
//! variable filter per voice, two tempo-syncable global LFO buses, and
//! a delay, reverb, and limiter master chain. [`SynthEngine`] is the
//! facade: feed it events, pull stereo blocks.
//!
//! Events can arrive from another thread through the wait-free queue:
//!
//! ```rust
//! use resin_synth::{SynthEngine, MidiEvent};
//!
//! let mut engine = SynthEngine::new(48000.0, 256);
//! let mut sender = engine.take_event_sender().unwrap();
//!
//! // UI or MIDI thread
//! sender.send(MidiEvent::NoteOn { note: 69, velocity: 110 });
//!
//! // Audio thread
//! let (mut l, mut r) = ([0.0f32; 256], [0.0f32; 256]);
//! engine.process_block(&mut l, &mut r);
//! ```

pub mod engine;
pub mod envelope;
pub mod events;
pub mod global_lfo;
pub mod oscillator;
pub mod params;
pub mod pool;
pub mod unison;
pub mod voice;
pub mod wavetable;

pub use engine::{DEFAULT_BLOCK_SIZE, SynthEngine, Telemetry};
pub use envelope::{AdsrEnvelope, EnvelopeState};
pub use events::{EVENT_QUEUE_CAPACITY, EventReceiver, EventSender, MidiEvent, event_channel};
pub use global_lfo::{ALL_DESTINATIONS, GlobalLfo, LfoDestination};
pub use oscillator::{OscWaveform, Oscillator};
pub use params::{EngineParams, OscSlotParams, SubOscParams};
pub use pool::{HARD_CAP, MAX_VOICES, VoiceMode, VoicePool};
pub use unison::{MAX_UNISON, UnisonCopy, UnisonSettings, compute_layout, pan_gains};
pub use voice::{RenderContext, Voice, cents_to_ratio, midi_to_freq};
pub use wavetable::Wavetable;

// Re-export the commonly needed foundation types so engine users do not
// have to depend on the lower crates directly.
pub use resin_core::{
    FilterMode, LfoWaveform, NoteDivision, ParamDescriptor, ParameterInfo, TempoManager,
    TransportState,
};
pub use resin_effects::{Limiter, PlateReverb, StereoDelay};
