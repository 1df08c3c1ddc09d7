//! End-to-end engine behavior: stealing under load, retrigger
//! continuity, modulation bounds, and random event fuzzing.

use proptest::prelude::*;

use resin_synth::{
    LfoDestination, LfoWaveform, MAX_VOICES, MidiEvent, SynthEngine, VoiceMode,
};

const SR: f32 = 48000.0;
const BLOCK: usize = 256;

fn engine() -> SynthEngine {
    SynthEngine::new(SR, BLOCK)
}

fn render(engine: &mut SynthEngine, blocks: usize) -> (f32, f32) {
    let mut peak = 0.0f32;
    let mut energy = 0.0f32;
    for _ in 0..blocks {
        let mut l = [0.0f32; BLOCK];
        let mut r = [0.0f32; BLOCK];
        engine.process_block(&mut l, &mut r);
        for i in 0..BLOCK {
            assert!(l[i].is_finite() && r[i].is_finite());
            peak = peak.max(l[i].abs()).max(r[i].abs());
            energy += l[i] * l[i] + r[i] * r[i];
        }
    }
    (peak, energy)
}

#[test]
fn more_notes_than_voices_steals_cleanly() {
    let mut engine = engine();
    for note in 0..MAX_VOICES as u8 {
        engine.handle_event(MidiEvent::NoteOn {
            note: 30 + note,
            velocity: 100,
        });
    }
    render(&mut engine, 2);
    assert_eq!(engine.active_voices(), MAX_VOICES);

    // One more note must sound without growing the pool or blowing up
    engine.handle_event(MidiEvent::NoteOn {
        note: 100,
        velocity: 127,
    });
    let (peak, energy) = render(&mut engine, 4);
    assert!(engine.active_voices() <= MAX_VOICES);
    assert!(energy > 0.0);
    assert!(peak <= 1.0 + 1e-3, "limited output, got {peak}");
}

#[test]
fn mono_retrigger_is_click_free() {
    let mut engine = engine();
    engine.set_voice_mode(VoiceMode::Mono);
    engine.set_filter_enabled(false);
    engine.set_limiter_enabled(false);
    engine.set_amp_adsr(5.0, 100.0, 0.8, 80.0);

    engine.handle_event(MidiEvent::NoteOn {
        note: 60,
        velocity: 100,
    });
    render(&mut engine, 8);

    // Retrigger the same pitch at full level
    engine.handle_event(MidiEvent::NoteOn {
        note: 60,
        velocity: 100,
    });
    let mut l = [0.0f32; BLOCK];
    let mut r = [0.0f32; BLOCK];
    engine.process_block(&mut l, &mut r);

    let mut max_delta = 0.0f32;
    for i in 1..BLOCK {
        max_delta = max_delta.max((l[i] - l[i - 1]).abs());
    }
    assert!(
        max_delta < 0.05,
        "retrigger stepped by {max_delta} in one sample"
    );
}

#[test]
fn resonant_sweep_stays_bounded_without_limiter() {
    let mut engine = engine();
    engine.set_limiter_enabled(false);
    engine.set_filter_resonance(1.0);
    engine.lfo1_mut().set_enabled(true);
    engine.lfo1_mut().set_waveform(LfoWaveform::Triangle);
    engine.lfo1_mut().set_rate_hz(8.0);
    engine.set_lfo1_destination(LfoDestination::FilterCutoff);

    for note in [36u8, 48, 60, 72] {
        engine.handle_event(MidiEvent::NoteOn {
            note,
            velocity: 127,
        });
    }
    let (peak, _) = render(&mut engine, 40);
    assert!(peak < 10.0, "sweep peak {peak}");
}

#[test]
fn legato_line_holds_one_voice() {
    let mut engine = engine();
    engine.set_voice_mode(VoiceMode::Legato);
    engine.set_glide_ms(30.0);
    engine.set_amp_adsr(5.0, 100.0, 0.7, 30.0);

    engine.handle_event(MidiEvent::NoteOn {
        note: 48,
        velocity: 100,
    });
    render(&mut engine, 2);
    for note in [52u8, 55, 60] {
        engine.handle_event(MidiEvent::NoteOn {
            note,
            velocity: 100,
        });
        render(&mut engine, 2);
        assert_eq!(engine.active_voices(), 1);
    }

    for note in [60u8, 55, 52, 48] {
        engine.handle_event(MidiEvent::NoteOff { note });
    }
    render(&mut engine, 120);
    assert_eq!(engine.active_voices(), 0);
}

#[test]
fn release_pressure_drains_dense_chords_faster() {
    let mut engine = engine();
    engine.set_amp_adsr(1.0, 50.0, 0.8, 300.0);

    for note in 0..24u8 {
        engine.handle_event(MidiEvent::NoteOn {
            note: 40 + note,
            velocity: 100,
        });
    }
    render(&mut engine, 1);
    engine.handle_event(MidiEvent::AllNotesOff);
    render(&mut engine, 1);
    // A dense releasing chord keeps a release multiplier in force
    assert!(engine.telemetry().release_scale >= 4.0);

    // The nominal 300 ms tail drains well inside a second
    render(&mut engine, 200);
    assert_eq!(engine.active_voices(), 0);
}

#[test]
fn all_voices_recovered_after_arbitrary_sequence() {
    let mut engine = engine();
    engine.set_amp_adsr(1.0, 50.0, 0.7, 40.0);
    // Hammer the allocator with overlapping ons and offs
    for round in 0..6u8 {
        for note in 0..20u8 {
            engine.handle_event(MidiEvent::NoteOn {
                note: 30 + note,
                velocity: 64 + round * 10,
            });
        }
        render(&mut engine, 1);
        for note in (0..20u8).step_by(2) {
            engine.handle_event(MidiEvent::NoteOff { note: 30 + note });
        }
        render(&mut engine, 1);
    }

    engine.handle_event(MidiEvent::AllNotesOff);
    render(&mut engine, 200);
    assert_eq!(engine.active_voices(), 0);

    // The pool still works afterward
    engine.handle_event(MidiEvent::NoteOn {
        note: 60,
        velocity: 100,
    });
    let (_, energy) = render(&mut engine, 2);
    assert!(energy > 0.0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn random_event_streams_never_break_the_output(
        events in prop::collection::vec((0u8..128, 0u8..128, prop::bool::ANY), 1..64),
    ) {
        let mut engine = engine();
        for (note, velocity, on) in events {
            if on {
                engine.handle_event(MidiEvent::NoteOn { note, velocity });
            } else {
                engine.handle_event(MidiEvent::NoteOff { note });
            }
            let mut l = [0.0f32; BLOCK];
            let mut r = [0.0f32; BLOCK];
            engine.process_block(&mut l, &mut r);
            for i in 0..BLOCK {
                prop_assert!(l[i].is_finite() && r[i].is_finite());
                prop_assert!(l[i].abs() <= 1.0 + 1e-3);
                prop_assert!(r[i].abs() <= 1.0 + 1e-3);
            }
        }
    }
}
