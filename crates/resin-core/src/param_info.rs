//! Parameter introspection for the engine's flat parameter table.
//!
//! The host sets and reads engine parameters by index. [`ParameterInfo`]
//! lets it discover what lives at each index without compile-time
//! knowledge of the engine: enough for generic UI generation, MIDI CC
//! mapping, and preset capture.
//!
//! Access is index-based. `set_param` clamps to the descriptor range and
//! silently ignores unknown indices; `get_param` returns 0.0 for them.
//! The render thread never touches this path.

/// Trait for processors that expose an indexed parameter table.
///
/// # Example
///
/// ```rust
/// use resin_core::{ParameterInfo, ParamDescriptor};
///
/// struct Trim {
///     gain_db: f32,
/// }
///
/// impl ParameterInfo for Trim {
///     fn param_count(&self) -> usize {
///         1
///     }
///
///     fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
///         match index {
///             0 => Some(ParamDescriptor::gain_db("Gain", "Gain", -60.0, 12.0, 0.0)),
///             _ => None,
///         }
///     }
///
///     fn get_param(&self, index: usize) -> f32 {
///         match index {
///             0 => self.gain_db,
///             _ => 0.0,
///         }
///     }
///
///     fn set_param(&mut self, index: usize, value: f32) {
///         if index == 0 {
///             self.gain_db = value.clamp(-60.0, 12.0);
///         }
///     }
/// }
/// ```
pub trait ParameterInfo {
    /// Number of exposed parameters; valid indices are `0..param_count()`.
    fn param_count(&self) -> usize;

    /// Descriptor for the parameter at `index`, `None` when out of range.
    fn param_info(&self, index: usize) -> Option<ParamDescriptor>;

    /// Current value at `index`, 0.0 when out of range.
    fn get_param(&self, index: usize) -> f32;

    /// Set the value at `index`, clamped to the descriptor range.
    ///
    /// Out-of-range indices are ignored.
    fn set_param(&mut self, index: usize, value: f32);

    /// Find a parameter index by name, matching `name` or `short_name`
    /// case-insensitively.
    fn find_param_by_name(&self, name: &str) -> Option<usize> {
        for i in 0..self.param_count() {
            if let Some(desc) = self.param_info(i)
                && (desc.name.eq_ignore_ascii_case(name)
                    || desc.short_name.eq_ignore_ascii_case(name))
            {
                return Some(i);
            }
        }
        None
    }
}

/// Metadata for one parameter: display names, unit, range, default.
///
/// `short_name` should stay at 8 characters or fewer so hardware
/// controller displays can show it. `step` is the recommended encoder
/// increment: small for continuous parameters, 1.0 for discrete ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDescriptor {
    /// Full display name, e.g. "Filter Cutoff".
    pub name: &'static str,

    /// Abbreviated name for small displays, max 8 characters.
    pub short_name: &'static str,

    /// Unit used when formatting the value.
    pub unit: ParamUnit,

    /// Minimum allowed value.
    pub min: f32,

    /// Maximum allowed value.
    pub max: f32,

    /// Value after construction or reset.
    pub default: f32,

    /// Recommended increment for encoder control.
    pub step: f32,
}

impl ParamDescriptor {
    /// Continuous unitless parameter over an arbitrary range.
    pub const fn scalar(
        name: &'static str,
        short_name: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            short_name,
            unit: ParamUnit::None,
            min,
            max,
            default,
            step: 0.01,
        }
    }

    /// Time parameter in milliseconds.
    pub const fn time_ms(
        name: &'static str,
        short_name: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            short_name,
            unit: ParamUnit::Milliseconds,
            min,
            max,
            default,
            step: 1.0,
        }
    }

    /// Gain parameter in decibels.
    pub const fn gain_db(
        name: &'static str,
        short_name: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            short_name,
            unit: ParamUnit::Decibels,
            min,
            max,
            default,
            step: 0.5,
        }
    }

    /// Frequency parameter in Hz.
    pub const fn freq_hz(
        name: &'static str,
        short_name: &'static str,
        min: f32,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            short_name,
            unit: ParamUnit::Hertz,
            min,
            max,
            default,
            step: 0.05,
        }
    }

    /// Percentage parameter, 0 to 100.
    pub const fn percent(name: &'static str, short_name: &'static str, default: f32) -> Self {
        Self {
            name,
            short_name,
            unit: ParamUnit::Percent,
            min: 0.0,
            max: 100.0,
            default,
            step: 1.0,
        }
    }

    /// Discrete selector over `0..=max` with integer steps.
    pub const fn stepped(
        name: &'static str,
        short_name: &'static str,
        max: f32,
        default: f32,
    ) -> Self {
        Self {
            name,
            short_name,
            unit: ParamUnit::None,
            min: 0.0,
            max,
            default,
            step: 1.0,
        }
    }

    /// Clamp a value to this parameter's range.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }
}

/// Unit tag for parameter display formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamUnit {
    /// Decibels, for gains and thresholds.
    Decibels,
    /// Hertz, for frequencies and rates.
    Hertz,
    /// Milliseconds, for times.
    Milliseconds,
    /// Percent, for mixes and depths.
    Percent,
    /// Dimensionless.
    None,
}

impl ParamUnit {
    /// Suffix string for value display.
    pub const fn suffix(&self) -> &'static str {
        match self {
            ParamUnit::Decibels => " dB",
            ParamUnit::Hertz => " Hz",
            ParamUnit::Milliseconds => " ms",
            ParamUnit::Percent => "%",
            ParamUnit::None => "",
        }
    }
}
