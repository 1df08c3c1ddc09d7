//! Mip-mapped morphable wavetable.
//!
//! A single table object built once at engine construction and shared
//! read-only (via `Arc`) by every voice and unison copy. The table holds
//! 16 morph frames, each rendered at 8 mip levels of decreasing harmonic
//! content so that playback can pick a level from the current frequency
//! and never alias.
//!
//! Frames sweep sine → saw → square → triangle by blending per-harmonic
//! amplitudes, so morphing is smooth in the spectral domain rather than
//! a crossfade of naive waveforms.

use libm::{floorf, log2f, sinf};

use resin_core::lerp;

/// Number of morph frames along the wavetable's sweep.
pub const MORPH_FRAMES: usize = 16;
/// Number of octave-halving mip levels.
pub const MIP_LEVELS: usize = 8;
/// Samples per single-cycle table.
pub const TABLE_SIZE: usize = 2048;

/// Harmonics rendered at mip level 0. Each level halves this.
const MAX_HARMONICS: usize = 512;

/// Immutable mip-mapped morph table.
///
/// # Example
///
/// ```rust
/// use resin_synth::Wavetable;
///
/// let table = Wavetable::build();
/// let value = table.sample(0.25, 0.0, 0.0);
/// assert!(value.is_finite());
/// ```
#[derive(Debug)]
pub struct Wavetable {
    /// Flattened `[mip][frame][sample]` storage.
    data: Vec<f32>,
}

impl Wavetable {
    /// Render the full table via additive synthesis.
    ///
    /// One-time cost at engine construction; no lazy initialization.
    pub fn build() -> Self {
        let mut data = vec![0.0f32; MIP_LEVELS * MORPH_FRAMES * TABLE_SIZE];

        // One exact fundamental cycle; harmonic k at sample i is
        // cycle[(k * i) % TABLE_SIZE], so no per-harmonic sinf calls.
        let mut cycle = [0.0f32; TABLE_SIZE];
        for (i, slot) in cycle.iter_mut().enumerate() {
            *slot = sinf(core::f32::consts::TAU * i as f32 / TABLE_SIZE as f32);
        }

        let mut scratch = vec![0.0f32; MAX_HARMONICS + 1];

        for frame in 0..MORPH_FRAMES {
            let morph = frame as f32 / (MORPH_FRAMES - 1) as f32;
            for (k, amp) in scratch.iter_mut().enumerate().skip(1) {
                *amp = harmonic_amplitude(k, morph);
            }

            for k in 1..=MAX_HARMONICS {
                let amp = scratch[k];
                if amp.abs() < 1e-6 {
                    continue;
                }

                for mip in 0..MIP_LEVELS {
                    if k > MAX_HARMONICS >> mip {
                        break;
                    }
                    let base = (mip * MORPH_FRAMES + frame) * TABLE_SIZE;
                    for i in 0..TABLE_SIZE {
                        data[base + i] += amp * cycle[(k * i) % TABLE_SIZE];
                    }
                }
            }

            // Normalize every mip of this frame by the level-0 peak so
            // mip transitions do not jump in level.
            let base0 = frame * TABLE_SIZE;
            let mut peak = 0.0f32;
            for i in 0..TABLE_SIZE {
                peak = peak.max(data[base0 + i].abs());
            }
            if peak > 1e-9 {
                let norm = 1.0 / peak;
                for mip in 0..MIP_LEVELS {
                    let base = (mip * MORPH_FRAMES + frame) * TABLE_SIZE;
                    for i in 0..TABLE_SIZE {
                        data[base + i] *= norm;
                    }
                }
            }
        }

        Self { data }
    }

    /// Fractional mip level for a playback frequency.
    ///
    /// Chosen so that the highest rendered harmonic of the selected level
    /// stays below Nyquist. Clamped to the available levels.
    pub fn mip_for_frequency(freq_hz: f32, sample_rate: f32) -> f32 {
        let nyquist = sample_rate * 0.5;
        if freq_hz <= 0.0 || nyquist <= 0.0 {
            return 0.0;
        }
        let level = log2f(freq_hz * MAX_HARMONICS as f32 / nyquist);
        level.clamp(0.0, (MIP_LEVELS - 1) as f32)
    }

    /// Trilinear lookup: fractional sample index × morph frame × mip level.
    ///
    /// `phase` wraps to \[0, 1), `morph` and `mip` are clamped.
    #[inline]
    pub fn sample(&self, phase: f32, morph: f32, mip: f32) -> f32 {
        let phase = phase - floorf(phase);
        let idx_f = phase * TABLE_SIZE as f32;
        let i0 = idx_f as usize % TABLE_SIZE;
        let i1 = (i0 + 1) % TABLE_SIZE;
        let fi = idx_f - floorf(idx_f);

        let frame_f = morph.clamp(0.0, 1.0) * (MORPH_FRAMES - 1) as f32;
        let f0 = frame_f as usize;
        let f1 = (f0 + 1).min(MORPH_FRAMES - 1);
        let ff = frame_f - f0 as f32;

        let mip_f = mip.clamp(0.0, (MIP_LEVELS - 1) as f32);
        let m0 = mip_f as usize;
        let m1 = (m0 + 1).min(MIP_LEVELS - 1);
        let fm = mip_f - m0 as f32;

        let read = |m: usize, f: usize, i: usize| self.data[(m * MORPH_FRAMES + f) * TABLE_SIZE + i];

        let v00 = lerp(read(m0, f0, i0), read(m0, f0, i1), fi);
        let v01 = lerp(read(m0, f1, i0), read(m0, f1, i1), fi);
        let v10 = lerp(read(m1, f0, i0), read(m1, f0, i1), fi);
        let v11 = lerp(read(m1, f1, i0), read(m1, f1, i1), fi);

        let v0 = lerp(v00, v01, ff);
        let v1 = lerp(v10, v11, ff);
        lerp(v0, v1, fm)
    }
}

/// Per-harmonic amplitude along the morph sweep.
///
/// Three blended segments: sine → saw (0..1/3), saw → square (1/3..2/3),
/// square → triangle (2/3..1).
fn harmonic_amplitude(k: usize, morph: f32) -> f32 {
    let kf = k as f32;
    let sine = if k == 1 { 1.0 } else { 0.0 };
    let saw = 1.0 / kf;
    let square = if k % 2 == 1 { 1.0 / kf } else { 0.0 };
    let triangle = if k % 2 == 1 {
        let sign = if (k / 2) % 2 == 0 { 1.0 } else { -1.0 };
        sign / (kf * kf)
    } else {
        0.0
    };

    if morph < 1.0 / 3.0 {
        lerp(sine, saw, morph * 3.0)
    } else if morph < 2.0 / 3.0 {
        lerp(saw, square, (morph - 1.0 / 3.0) * 3.0)
    } else {
        lerp(square, triangle, (morph - 2.0 / 3.0) * 3.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_is_sine() {
        let table = Wavetable::build();
        for i in 0..64 {
            let phase = i as f32 / 64.0;
            let expected = sinf(core::f32::consts::TAU * phase);
            let got = table.sample(phase, 0.0, 0.0);
            assert!(
                (got - expected).abs() < 0.02,
                "phase {phase}: expected {expected}, got {got}"
            );
        }
    }

    #[test]
    fn output_bounded() {
        let table = Wavetable::build();
        for frame in 0..MORPH_FRAMES {
            let morph = frame as f32 / (MORPH_FRAMES - 1) as f32;
            for i in 0..TABLE_SIZE {
                let v = table.sample(i as f32 / TABLE_SIZE as f32, morph, 0.0);
                assert!(v.abs() <= 1.0 + 1e-4, "frame {frame} sample {i}: {v}");
            }
        }
    }

    #[test]
    fn higher_mips_are_smoother() {
        let table = Wavetable::build();
        // Saw frame: max sample-to-sample jump shrinks as harmonics drop
        let morph = 1.0 / 3.0;
        let max_delta = |mip: f32| {
            let mut max = 0.0f32;
            let mut prev = table.sample(0.0, morph, mip);
            for i in 1..TABLE_SIZE {
                let v = table.sample(i as f32 / TABLE_SIZE as f32, morph, mip);
                max = max.max((v - prev).abs());
                prev = v;
            }
            max
        };
        assert!(max_delta(7.0) < max_delta(0.0) * 0.5);
    }

    #[test]
    fn tables_have_no_dc() {
        let table = Wavetable::build();
        for frame in 0..MORPH_FRAMES {
            let morph = frame as f32 / (MORPH_FRAMES - 1) as f32;
            let mut sum = 0.0f64;
            for i in 0..TABLE_SIZE {
                sum += f64::from(table.sample(i as f32 / TABLE_SIZE as f32, morph, 0.0));
            }
            let mean = sum / TABLE_SIZE as f64;
            assert!(mean.abs() < 1e-3, "frame {frame} has DC offset {mean}");
        }
    }

    #[test]
    fn mip_selection_tracks_frequency() {
        // Low notes use the full-bandwidth level
        assert!(Wavetable::mip_for_frequency(40.0, 48000.0) < 0.1);
        // High notes use the reduced levels
        assert!(Wavetable::mip_for_frequency(5000.0, 48000.0) > 6.0);
        // Monotone in frequency
        let a = Wavetable::mip_for_frequency(200.0, 48000.0);
        let b = Wavetable::mip_for_frequency(400.0, 48000.0);
        assert!((b - a - 1.0).abs() < 1e-3, "one octave = one mip: {a} -> {b}");
    }

    #[test]
    fn phase_wraps() {
        let table = Wavetable::build();
        let a = table.sample(0.25, 0.5, 2.0);
        let b = table.sample(1.25, 0.5, 2.0);
        assert!((a - b).abs() < 1e-6);
    }
}
