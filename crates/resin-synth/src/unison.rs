//! Unison layout: detune, pan, and gain weight per oscillator copy.
//!
//! Given a copy count, detune spread, stereo width, and center/spread
//! blend, produces one `(detune_cents, pan, weight)` entry per copy.
//! Weights are power-compensated so total loudness is independent of the
//! count and the blend, and pan follows a constant-power law so stereo
//! energy is independent of position.

use core::f32::consts::FRAC_PI_4;
use libm::{sincosf, sqrtf};

/// Most copies one oscillator slot can fan out to.
pub const MAX_UNISON: usize = 8;

/// Widest detune excursion at spread = 1.0, in cents.
const MAX_DETUNE_CENTS: f32 = 50.0;

/// Placement of one unison copy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UnisonCopy {
    /// Detune offset in cents.
    pub detune_cents: f32,
    /// Pan position, -1 (left) to +1 (right).
    pub pan: f32,
    /// Power-compensated gain weight.
    pub weight: f32,
}

/// Unison controls for one oscillator slot.
#[derive(Debug, Clone, Copy)]
pub struct UnisonSettings {
    /// Number of copies, \[1, 8\].
    pub count: usize,
    /// Detune spread, \[0, 1\] mapped to ±50 cents at the extremes.
    pub spread: f32,
    /// Stereo width, \[0, 1\].
    pub width: f32,
    /// Center/spread balance: 0 = center copy only, 1 = spread copies only.
    pub blend: f32,
}

impl Default for UnisonSettings {
    fn default() -> Self {
        Self {
            count: 1,
            spread: 0.2,
            width: 0.5,
            blend: 0.5,
        }
    }
}

impl UnisonSettings {
    /// Clamp all fields into their declared ranges.
    pub fn clamped(self) -> Self {
        Self {
            count: self.count.clamp(1, MAX_UNISON),
            spread: self.spread.clamp(0.0, 1.0),
            width: self.width.clamp(0.0, 1.0),
            blend: self.blend.clamp(0.0, 1.0),
        }
    }
}

/// Fill `layout` for the given settings; returns the copy count.
///
/// - 1 copy: centered, no detune, unit weight.
/// - 2 copies: symmetric hard-left/hard-right pair, detune and pan
///   scaled by blend so blend = 0 collapses to the single-copy sound.
/// - 3+ copies: copy 0 sits at center; the rest alternate sign with
///   growing magnitude `(v + 1) / 2`, weighted `(1 - blend)` for the
///   center against `blend / (count - 1)` for each spread copy.
///
/// All weights are then scaled by `1 / sqrt(Σ w²)` so the summed power
/// is exactly 1 regardless of count or blend.
pub fn compute_layout(settings: UnisonSettings, layout: &mut [UnisonCopy; MAX_UNISON]) -> usize {
    let s = settings.clamped();
    let detune = s.spread * MAX_DETUNE_CENTS;

    match s.count {
        1 => {
            layout[0] = UnisonCopy {
                detune_cents: 0.0,
                pan: 0.0,
                weight: 1.0,
            };
        }
        2 => {
            let d = detune * s.blend;
            let p = s.width * s.blend;
            layout[0] = UnisonCopy {
                detune_cents: -d,
                pan: -p,
                weight: 1.0,
            };
            layout[1] = UnisonCopy {
                detune_cents: d,
                pan: p,
                weight: 1.0,
            };
        }
        count => {
            layout[0] = UnisonCopy {
                detune_cents: 0.0,
                pan: 0.0,
                weight: 1.0 - s.blend,
            };
            let spread_weight = s.blend / (count - 1) as f32;
            let max_level = count as f32 / 2.0;

            for v in 1..count {
                let sign = if v % 2 == 1 { 1.0 } else { -1.0 };
                let level = (v + 1) as f32 / 2.0;
                let rel = level / max_level;
                layout[v] = UnisonCopy {
                    detune_cents: sign * rel * detune,
                    pan: sign * rel * s.width,
                    weight: spread_weight,
                };
            }
        }
    }

    // Power compensation
    let mut power = 0.0;
    for copy in layout.iter().take(s.count) {
        power += copy.weight * copy.weight;
    }
    if power > 1e-12 {
        let norm = 1.0 / sqrtf(power);
        for copy in layout.iter_mut().take(s.count) {
            copy.weight *= norm;
        }
    }

    s.count
}

/// Constant-power pan gains for a position in \[-1, 1\].
///
/// `L = cos(angle), R = sin(angle)` with the angle swept over a quarter
/// turn, so `L² + R² = 1` at every position.
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    let (sin, cos) = sincosf(angle);
    (cos, sin)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_for(count: usize, spread: f32, width: f32, blend: f32) -> [UnisonCopy; MAX_UNISON] {
        let mut layout = [UnisonCopy::default(); MAX_UNISON];
        compute_layout(
            UnisonSettings {
                count,
                spread,
                width,
                blend,
            },
            &mut layout,
        );
        layout
    }

    fn total_power(layout: &[UnisonCopy; MAX_UNISON], count: usize) -> f32 {
        layout.iter().take(count).map(|c| c.weight * c.weight).sum()
    }

    #[test]
    fn single_copy_is_neutral() {
        let layout = layout_for(1, 1.0, 1.0, 1.0);
        assert_eq!(layout[0].detune_cents, 0.0);
        assert_eq!(layout[0].pan, 0.0);
        assert!((layout[0].weight - 1.0).abs() < 1e-6);
    }

    #[test]
    fn two_copies_symmetric() {
        let layout = layout_for(2, 1.0, 1.0, 1.0);
        assert!((layout[0].detune_cents + layout[1].detune_cents).abs() < 1e-6);
        assert!((layout[0].pan + layout[1].pan).abs() < 1e-6);
        assert!(layout[0].detune_cents < 0.0 && layout[1].detune_cents > 0.0);
    }

    #[test]
    fn two_copies_blend_zero_collapses() {
        let layout = layout_for(2, 1.0, 1.0, 0.0);
        assert_eq!(layout[0].detune_cents, 0.0);
        assert_eq!(layout[0].pan, 0.0);
        assert_eq!(layout[1].detune_cents, 0.0);
    }

    #[test]
    fn center_copy_undetuned() {
        for count in 3..=MAX_UNISON {
            let layout = layout_for(count, 1.0, 1.0, 0.7);
            assert_eq!(layout[0].detune_cents, 0.0);
            assert_eq!(layout[0].pan, 0.0);
        }
    }

    #[test]
    fn spread_copies_alternate_and_grow() {
        let layout = layout_for(5, 1.0, 1.0, 1.0);
        assert!(layout[1].detune_cents > 0.0);
        assert!(layout[2].detune_cents < 0.0);
        assert!(layout[3].detune_cents > layout[1].detune_cents);
        assert!(layout[4].detune_cents < layout[2].detune_cents);
    }

    #[test]
    fn weights_power_normalized() {
        for count in 1..=MAX_UNISON {
            for blend_step in 0..=10 {
                let blend = blend_step as f32 / 10.0;
                let layout = layout_for(count, 0.5, 0.5, blend);
                let power = total_power(&layout, count);
                assert!(
                    (power - 1.0).abs() < 1e-4,
                    "count {count} blend {blend}: power {power}"
                );
            }
        }
    }

    #[test]
    fn blend_extremes_for_three_copies() {
        // blend = 0: all power in the center copy
        let layout = layout_for(3, 1.0, 1.0, 0.0);
        assert!((layout[0].weight - 1.0).abs() < 1e-4);
        assert!(layout[1].weight.abs() < 1e-6);

        // blend = 1: center silent, spread copies carry everything
        let layout = layout_for(3, 1.0, 1.0, 1.0);
        assert!(layout[0].weight.abs() < 1e-6);
        assert!(layout[1].weight > 0.1);
    }

    #[test]
    fn count_clamped() {
        let mut layout = [UnisonCopy::default(); MAX_UNISON];
        let n = compute_layout(
            UnisonSettings {
                count: 99,
                spread: 0.5,
                width: 0.5,
                blend: 0.5,
            },
            &mut layout,
        );
        assert_eq!(n, MAX_UNISON);

        let n = compute_layout(
            UnisonSettings {
                count: 0,
                spread: 0.5,
                width: 0.5,
                blend: 0.5,
            },
            &mut layout,
        );
        assert_eq!(n, 1);
    }

    #[test]
    fn pan_constant_power() {
        for i in 0..=20 {
            let pan = i as f32 / 10.0 - 1.0;
            let (l, r) = pan_gains(pan);
            assert!(
                (l * l + r * r - 1.0).abs() < 1e-5,
                "pan {pan}: L={l} R={r}"
            );
        }
    }

    #[test]
    fn pan_extremes() {
        let (l, r) = pan_gains(-1.0);
        assert!((l - 1.0).abs() < 1e-5 && r.abs() < 1e-5);
        let (l, r) = pan_gains(1.0);
        assert!(l.abs() < 1e-5 && (r - 1.0).abs() < 1e-5);
        let (l, r) = pan_gains(0.0);
        assert!((l - r).abs() < 1e-6);
    }
}
