//! Plate reverb with a modulated figure-eight tank.
//!
//! Dattorro's plate topology: the input is bandwidth-limited, diffused
//! through four series allpasses, then injected into two cross-coupled
//! tank branches. Each branch runs a modulated allpass, a long delay, a
//! damping lowpass and a second allpass before feeding the opposite
//! branch. Stereo outputs are tapped at fixed points along the tank
//! delays.
//!
//! # Reference
//!
//! Dattorro, "Effect Design Part 1: Reverberator and Other Filters",
//! JAES vol. 45 no. 9, 1997.

use resin_core::{
    AllpassFilter, Effect, InterpolatedDelay, ModulatedAllpass, OnePole, ParamDescriptor,
    ParameterInfo, SmoothedParam, flush_denormal,
};

/// Dattorro's reference sample rate; all tunings below are in samples
/// at this rate.
const REFERENCE_RATE: f32 = 29761.0;

/// Input diffusion allpass delays.
const INPUT_DIFFUSION: [usize; 4] = [142, 107, 379, 277];
/// Input diffusion coefficients, first pair / second pair.
const DIFFUSION_COEFF_1: f32 = 0.75;
const DIFFUSION_COEFF_2: f32 = 0.625;

/// Tank tunings per branch: modulated allpass, first delay, plain
/// allpass, second delay.
const TANK_MOD_AP: [f32; 2] = [672.0, 908.0];
const TANK_DELAY_1: [usize; 2] = [4453, 4217];
const TANK_AP: [usize; 2] = [1800, 2656];
const TANK_DELAY_2: [usize; 2] = [3720, 3163];

/// Decay diffusion inside the tank.
const DECAY_DIFFUSION_1: f32 = 0.70;
const DECAY_DIFFUSION_2: f32 = 0.50;

/// Tank modulation excursion and rates, slightly detuned per branch.
const MOD_EXCURSION: f32 = 12.0;
const MOD_RATES_HZ: [f32; 2] = [0.61, 0.83];

/// Output tap positions into the tank delays, left then right.
const TAPS_L: [(usize, f32); 5] = [
    (266, 0.6),   // delay 1 right
    (2974, 0.6),  // delay 1 right
    (1996, 0.6),  // delay 2 right
    (1990, -0.6), // delay 1 left
    (1066, -0.6), // delay 2 left
];
const TAPS_R: [(usize, f32); 5] = [
    (353, 0.6),   // delay 1 left
    (3627, 0.6),  // delay 1 left
    (2673, 0.6),  // delay 2 left
    (2111, -0.6), // delay 1 right
    (121, -0.6),  // delay 2 right
];

const MAX_PREDELAY_MS: f32 = 100.0;

fn scale_to_rate(samples: usize, target_rate: f32) -> usize {
    ((samples as f32 * target_rate / REFERENCE_RATE) as usize).max(1)
}

/// One half of the figure-eight tank.
#[derive(Debug, Clone)]
struct TankBranch {
    mod_ap: ModulatedAllpass,
    delay_1: InterpolatedDelay,
    damping: OnePole,
    ap: AllpassFilter,
    delay_2: InterpolatedDelay,
}

impl TankBranch {
    fn new(index: usize, sample_rate: f32) -> Self {
        let scale = sample_rate / REFERENCE_RATE;
        let mut mod_ap = ModulatedAllpass::new(
            TANK_MOD_AP[index] * scale,
            -DECAY_DIFFUSION_1,
            MOD_EXCURSION * scale,
            MOD_RATES_HZ[index],
            sample_rate,
        );
        mod_ap.set_lfo_phase(index as f32 * 0.5);

        Self {
            mod_ap,
            delay_1: InterpolatedDelay::new(scale_to_rate(TANK_DELAY_1[index], sample_rate) + 1),
            damping: OnePole::new(sample_rate, 6000.0),
            ap: AllpassFilter::new(scale_to_rate(TANK_AP[index], sample_rate), DECAY_DIFFUSION_2),
            delay_2: InterpolatedDelay::new(scale_to_rate(TANK_DELAY_2[index], sample_rate) + 1),
        }
    }

    /// Run one sample through the branch, returning its recirculation
    /// output for the opposite branch.
    #[inline]
    fn process(&mut self, input: f32, decay: f32) -> f32 {
        let diffused = self.mod_ap.process(input);

        let d1_out = self.delay_1.read((self.delay_1.capacity() - 1) as f32);
        self.delay_1.write(flush_denormal(diffused));

        let damped = self.damping.process(d1_out) * decay;
        let ap_out = self.ap.process(damped);

        let d2_out = self.delay_2.read((self.delay_2.capacity() - 1) as f32);
        self.delay_2.write(flush_denormal(ap_out));

        d2_out * decay
    }

    fn clear(&mut self) {
        self.mod_ap.clear();
        self.delay_1.clear();
        self.damping.reset();
        self.ap.clear();
        self.delay_2.clear();
    }
}

/// Dattorro-style plate reverb.
///
/// ## Parameter Indices (`ParameterInfo`)
///
/// | Index | Name | Range | Default |
/// |-------|------|-------|---------|
/// | 0 | Decay | 0–100% | 50.0 |
/// | 1 | Damping | 0–100% | 40.0 |
/// | 2 | Pre-Delay | 0–100 ms | 10.0 |
/// | 3 | Mix | 0–100% | 30.0 |
///
/// # Example
///
/// ```rust
/// use resin_core::Effect;
/// use resin_effects::PlateReverb;
///
/// let mut reverb = PlateReverb::new(48000.0);
/// reverb.set_decay(0.7);
/// reverb.set_damping(0.3);
///
/// let (_l, _r) = reverb.process_stereo(0.5, 0.5);
/// ```
pub struct PlateReverb {
    bandwidth: OnePole,
    diffusers: [AllpassFilter; 4],
    predelay_line: InterpolatedDelay,
    branches: [TankBranch; 2],

    predelay_samples: SmoothedParam,
    decay: SmoothedParam,
    damping: SmoothedParam,
    mix: SmoothedParam,

    sample_rate: f32,
    tap_scale: f32,

    /// Last output of each branch, fed into the opposite branch.
    recirc: [f32; 2],

    cached_damping: f32,
}

impl PlateReverb {
    /// Create a plate reverb at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        let diffusers = core::array::from_fn(|i| {
            let coeff = if i < 2 {
                DIFFUSION_COEFF_1
            } else {
                DIFFUSION_COEFF_2
            };
            AllpassFilter::new(scale_to_rate(INPUT_DIFFUSION[i], sample_rate), coeff)
        });

        let max_predelay = (MAX_PREDELAY_MS / 1000.0 * sample_rate) as usize + 1;
        let default_predelay = 10.0 / 1000.0 * sample_rate;

        let mut reverb = Self {
            bandwidth: OnePole::new(sample_rate, 10000.0),
            diffusers,
            predelay_line: InterpolatedDelay::new(max_predelay),
            branches: core::array::from_fn(|i| TankBranch::new(i, sample_rate)),
            predelay_samples: SmoothedParam::with_config(default_predelay, sample_rate, 50.0),
            decay: SmoothedParam::with_config(0.5, sample_rate, 20.0),
            damping: SmoothedParam::with_config(0.4, sample_rate, 20.0),
            mix: SmoothedParam::with_config(0.3, sample_rate, 10.0),
            sample_rate,
            tap_scale: sample_rate / REFERENCE_RATE,
            recirc: [0.0; 2],
            cached_damping: -1.0,
        };
        reverb.update_damping();
        reverb
    }

    /// Set the tail decay (0 to 1). Higher values ring longer.
    pub fn set_decay(&mut self, decay: f32) {
        self.decay.set_target(decay.clamp(0.0, 1.0));
    }

    /// Current decay setting.
    pub fn decay(&self) -> f32 {
        self.decay.target()
    }

    /// Set high-frequency damping (0 = bright, 1 = dark).
    pub fn set_damping(&mut self, damping: f32) {
        self.damping.set_target(damping.clamp(0.0, 1.0));
    }

    /// Current damping setting.
    pub fn damping(&self) -> f32 {
        self.damping.target()
    }

    /// Set the pre-delay in milliseconds (0 to 100).
    pub fn set_predelay_ms(&mut self, ms: f32) {
        let samples = ms.clamp(0.0, MAX_PREDELAY_MS) / 1000.0 * self.sample_rate;
        self.predelay_samples.set_target(samples);
    }

    /// Current pre-delay in milliseconds.
    pub fn predelay_ms(&self) -> f32 {
        self.predelay_samples.target() / self.sample_rate * 1000.0
    }

    /// Set wet/dry mix (0 to 1).
    pub fn set_mix(&mut self, mix: f32) {
        self.mix.set_target(mix.clamp(0.0, 1.0));
    }

    /// Current mix setting.
    pub fn mix(&self) -> f32 {
        self.mix.target()
    }

    fn update_damping(&mut self) {
        let damping = self.damping.get();
        if (damping - self.cached_damping).abs() < 0.001 {
            return;
        }
        self.cached_damping = damping;

        // 0 -> 16 kHz (open), 1 -> 1 kHz (dark); exponential feel
        let cutoff = 16000.0 * libm::powf(1000.0 / 16000.0, damping);
        for branch in &mut self.branches {
            branch.damping.set_cutoff(cutoff);
        }
    }

    /// Map the user decay control onto the tank feedback gain.
    #[inline]
    fn tank_decay(control: f32) -> f32 {
        // 0.25..0.94: short room up to a tail of tens of seconds
        0.25 + control * 0.69
    }

    #[inline]
    fn tap(delay: &InterpolatedDelay, reference_samples: usize, scale: f32) -> f32 {
        delay.read(reference_samples as f32 * scale)
    }
}

impl Effect for PlateReverb {
    fn process(&mut self, input: f32) -> f32 {
        let (l, r) = self.process_stereo(input, input);
        0.5 * (l + r)
    }

    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let predelay = self.predelay_samples.advance();
        self.decay.advance();
        self.damping.advance();
        let mix = self.mix.advance();

        self.update_damping();
        let decay = Self::tank_decay(self.decay.get());

        // mono feed into the tank
        let mono = 0.5 * (left + right);
        let predelayed = if predelay > 0.5 {
            self.predelay_line.read_write(mono, predelay)
        } else {
            self.predelay_line.write(mono);
            mono
        };

        let mut diffused = self.bandwidth.process(predelayed);
        for ap in &mut self.diffusers {
            diffused = ap.process(diffused);
        }

        // figure-eight recirculation: each branch feeds the other
        let feed_l = diffused + self.recirc[1];
        let feed_r = diffused + self.recirc[0];
        self.recirc[0] = self.branches[0].process(feed_l, decay);
        self.recirc[1] = self.branches[1].process(feed_r, decay);

        let scale = self.tap_scale;
        let wet_l = Self::tap(&self.branches[1].delay_1, TAPS_L[0].0, scale) * TAPS_L[0].1
            + Self::tap(&self.branches[1].delay_1, TAPS_L[1].0, scale) * TAPS_L[1].1
            + Self::tap(&self.branches[1].delay_2, TAPS_L[2].0, scale) * TAPS_L[2].1
            + Self::tap(&self.branches[0].delay_1, TAPS_L[3].0, scale) * TAPS_L[3].1
            + Self::tap(&self.branches[0].delay_2, TAPS_L[4].0, scale) * TAPS_L[4].1;
        let wet_r = Self::tap(&self.branches[0].delay_1, TAPS_R[0].0, scale) * TAPS_R[0].1
            + Self::tap(&self.branches[0].delay_1, TAPS_R[1].0, scale) * TAPS_R[1].1
            + Self::tap(&self.branches[0].delay_2, TAPS_R[2].0, scale) * TAPS_R[2].1
            + Self::tap(&self.branches[1].delay_1, TAPS_R[3].0, scale) * TAPS_R[3].1
            + Self::tap(&self.branches[1].delay_2, TAPS_R[4].0, scale) * TAPS_R[4].1;

        (
            left * (1.0 - mix) + wet_l * mix,
            right * (1.0 - mix) + wet_r * mix,
        )
    }

    fn is_true_stereo(&self) -> bool {
        true
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        // Tank tunings are in samples, so the structures are rebuilt.
        let decay = self.decay.target();
        let damping = self.damping.target();
        let predelay_ms = self.predelay_ms();
        let mix = self.mix.target();

        *self = Self::new(sample_rate);
        self.set_decay(decay);
        self.set_damping(damping);
        self.set_predelay_ms(predelay_ms);
        self.set_mix(mix);

        self.predelay_samples.snap_to_target();
        self.decay.snap_to_target();
        self.damping.snap_to_target();
        self.mix.snap_to_target();
        self.cached_damping = -1.0;
        self.update_damping();
    }

    fn reset(&mut self) {
        self.bandwidth.reset();
        for ap in &mut self.diffusers {
            ap.clear();
        }
        self.predelay_line.clear();
        for branch in &mut self.branches {
            branch.clear();
        }
        self.recirc = [0.0; 2];

        self.predelay_samples.snap_to_target();
        self.decay.snap_to_target();
        self.damping.snap_to_target();
        self.mix.snap_to_target();
        self.cached_damping = -1.0;
        self.update_damping();
    }

    fn latency_samples(&self) -> usize {
        self.predelay_samples.get() as usize
    }
}

impl ParameterInfo for PlateReverb {
    fn param_count(&self) -> usize {
        4
    }

    fn param_info(&self, index: usize) -> Option<ParamDescriptor> {
        match index {
            0 => Some(ParamDescriptor::percent("Decay", "Decay", 50.0)),
            1 => Some(ParamDescriptor::percent("Damping", "Damp", 40.0)),
            2 => Some(ParamDescriptor::time_ms("Pre-Delay", "PreDly", 0.0, MAX_PREDELAY_MS, 10.0)),
            3 => Some(ParamDescriptor::percent("Mix", "Mix", 30.0)),
            _ => None,
        }
    }

    fn get_param(&self, index: usize) -> f32 {
        match index {
            0 => self.decay.target() * 100.0,
            1 => self.damping.target() * 100.0,
            2 => self.predelay_ms(),
            3 => self.mix.target() * 100.0,
            _ => 0.0,
        }
    }

    fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.set_decay(value / 100.0),
            1 => self.set_damping(value / 100.0),
            2 => self.set_predelay_ms(value),
            3 => self.set_mix(value / 100.0),
            _ => {}
        }
    }
}
