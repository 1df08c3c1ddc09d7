//! Resin Core - DSP primitives for the resin synthesizer engine
//!
//! Foundational building blocks shared by the voice engine and the effects
//! crate. Everything here is real-time safe: no allocation after
//! construction, no blocking, no I/O in any processing path.
//!
//! # Core Abstractions
//!
//! ## Effect System
//!
//! - [`Effect`] - Object-safe trait for audio processors
//! - [`EffectExt`] - Extension trait for effect chaining
//! - [`Chain`] - Zero-cost effect chain combinator
//!
//! ## Parameter Smoothing
//!
//! - [`SmoothedParam`] - Exponential smoothing (one-pole response)
//! - [`LinearSmoothedParam`] - Linear ramps for crossfades
//!
//! ## Filters
//!
//! - [`StateVariableFilter`] - TPT SVF with four simultaneous outputs
//! - [`AllpassFilter`] - Schroeder allpass for diffusion
//! - [`ModulatedAllpass`] - Allpass with LFO-modulated delay for reverb tanks
//! - [`OnePole`] - 6 dB/oct lowpass for damping and control smoothing
//!
//! ## Delay Lines
//!
//! - [`InterpolatedDelay`] - Variable-length delay with fractional reads
//!
//! ## Modulation & Dynamics
//!
//! - [`Lfo`] - Low-frequency oscillator (6 waveforms)
//! - [`EnvelopeFollower`] - Amplitude envelope detection
//! - [`NoteDivision`] / [`TempoManager`] - Tempo sync utilities
//!
//! ## Cross-Thread Signalling
//!
//! - [`AckFlag`] - set-once/consume-once atomic flag for SPSC handoff
//!
//! # no_std Support
//!
//! The crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! resin-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod allpass;
pub mod delay;
pub mod effect;
pub mod envelope;
pub mod fast_math;
pub mod flag;
pub mod lfo;
pub mod math;
pub mod one_pole;
pub mod param;
pub mod param_info;
pub mod svf;
pub mod tempo;

pub use allpass::{AllpassFilter, ModulatedAllpass};
pub use delay::{InterpolatedDelay, Interpolation};
pub use effect::{Chain, Effect, EffectExt};
pub use envelope::EnvelopeFollower;
pub use fast_math::{fast_sin_turns, fast_tan};
pub use flag::AckFlag;
pub use lfo::{Lfo, LfoWaveform};
pub use math::{
    db_to_linear, fast_tanh, flush_denormal, hard_clip, lerp, linear_to_db, ms_to_samples,
    sanitize, soft_clip, wet_dry_mix,
};
pub use one_pole::OnePole;
pub use param::{LinearSmoothedParam, SmoothedParam};
pub use param_info::{ParamDescriptor, ParamUnit, ParameterInfo};
pub use svf::{FilterMode, StateVariableFilter};
pub use tempo::{ALL_DIVISIONS, DEFAULT_BPM, NoteDivision, TempoManager, TransportState};
