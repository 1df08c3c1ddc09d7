use criterion::{Criterion, black_box, criterion_group, criterion_main};

use resin_synth::{MidiEvent, SynthEngine, UnisonSettings};

const BLOCK: usize = 512;

fn held_chord(engine: &mut SynthEngine, notes: u8) {
    for note in 0..notes {
        engine.handle_event(MidiEvent::NoteOn {
            note: 36 + note * 3,
            velocity: 100,
        });
    }
    // settle attacks so the benchmark measures steady state
    let mut l = [0.0f32; BLOCK];
    let mut r = [0.0f32; BLOCK];
    for _ in 0..8 {
        engine.process_block(&mut l, &mut r);
    }
}

fn bench_chord(c: &mut Criterion) {
    let mut group = c.benchmark_group("chord");

    for voices in [1u8, 4, 16] {
        group.bench_function(format!("{voices}_voices"), |b| {
            let mut engine = SynthEngine::new(48000.0, BLOCK);
            held_chord(&mut engine, voices);
            let mut l = [0.0f32; BLOCK];
            let mut r = [0.0f32; BLOCK];

            b.iter(|| {
                engine.process_block(black_box(&mut l), black_box(&mut r));
                black_box(l[0])
            });
        });
    }

    group.finish();
}

fn bench_unison(c: &mut Criterion) {
    c.bench_function("unison_8x_pad", |b| {
        let mut engine = SynthEngine::new(48000.0, BLOCK);
        engine.set_unison1(UnisonSettings {
            count: 8,
            spread: 0.6,
            width: 1.0,
            blend: 0.7,
        });
        held_chord(&mut engine, 4);
        let mut l = [0.0f32; BLOCK];
        let mut r = [0.0f32; BLOCK];

        b.iter(|| {
            engine.process_block(black_box(&mut l), black_box(&mut r));
            black_box(l[0])
        });
    });
}

fn bench_effects_tail(c: &mut Criterion) {
    c.bench_function("full_chain_16_voices", |b| {
        let mut engine = SynthEngine::new(48000.0, BLOCK);
        engine.set_delay_enabled(true);
        engine.set_reverb_enabled(true);
        engine.set_limiter_enabled(true);
        held_chord(&mut engine, 16);
        let mut l = [0.0f32; BLOCK];
        let mut r = [0.0f32; BLOCK];

        b.iter(|| {
            engine.process_block(black_box(&mut l), black_box(&mut r));
            black_box(l[0])
        });
    });
}

criterion_group!(benches, bench_chord, bench_unison, bench_effects_tail);
criterion_main!(benches);
