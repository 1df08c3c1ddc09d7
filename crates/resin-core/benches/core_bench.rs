use criterion::{Criterion, black_box, criterion_group, criterion_main};

use resin_core::{
    Effect, InterpolatedDelay, Interpolation, Lfo, SmoothedParam, StateVariableFilter,
};

const BLOCK: usize = 512;

fn bench_svf(c: &mut Criterion) {
    let mut group = c.benchmark_group("svf");

    group.bench_function("static_block", |b| {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_cutoff(2000.0);
        svf.set_resonance(0.7);

        b.iter(|| {
            let mut acc = 0.0f32;
            for i in 0..BLOCK {
                let input = (i % 97) as f32 / 48.5 - 1.0;
                acc += svf.process(black_box(input));
            }
            black_box(acc)
        });
    });

    group.bench_function("swept_block", |b| {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_resonance(0.9);

        b.iter(|| {
            let mut acc = 0.0f32;
            for i in 0..BLOCK {
                svf.set_cutoff(200.0 + i as f32 * 30.0);
                let input = (i % 97) as f32 / 48.5 - 1.0;
                acc += svf.process(black_box(input));
            }
            black_box(acc)
        });
    });

    group.finish();
}

fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("delay");

    for (name, interp) in [
        ("linear", Interpolation::Linear),
        ("cubic", Interpolation::Cubic),
    ] {
        group.bench_function(name, |b| {
            let mut delay = InterpolatedDelay::new(48000);
            delay.set_interpolation(interp);

            b.iter(|| {
                let mut acc = 0.0f32;
                for i in 0..BLOCK {
                    let input = (i % 97) as f32 / 48.5 - 1.0;
                    acc += delay.read_write(black_box(input), 1234.5);
                }
                black_box(acc)
            });
        });
    }

    group.finish();
}

fn bench_lfo(c: &mut Criterion) {
    c.bench_function("lfo_block", |b| {
        let mut lfo = Lfo::new(48000.0, 5.0);

        b.iter(|| {
            let mut acc = 0.0f32;
            for _ in 0..BLOCK {
                acc += lfo.next();
            }
            black_box(acc)
        });
    });
}

fn bench_smoothing(c: &mut Criterion) {
    c.bench_function("smoothed_param_block", |b| {
        let mut param = SmoothedParam::with_config(0.0, 48000.0, 10.0);
        param.set_target(1.0);

        b.iter(|| {
            let mut acc = 0.0f32;
            for _ in 0..BLOCK {
                acc += param.advance();
            }
            black_box(acc)
        });
    });
}

criterion_group!(benches, bench_svf, bench_delay, bench_lfo, bench_smoothing);
criterion_main!(benches);
