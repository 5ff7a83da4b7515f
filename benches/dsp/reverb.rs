//! Benchmarks for the Boss reverb model.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use mt32_core::dsp::reverb::{BReverbModel, ReverbMode};

use crate::BLOCK_SIZES;

pub fn bench_reverb(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/reverb");

    for &size in BLOCK_SIZES {
        // Decaying burst so every comb has something to chew on
        let input: Vec<i16> = (0..size)
            .map(|i| if i < 16 { 8000 - i as i16 * 500 } else { ((i * 37) % 200) as i16 - 100 })
            .collect();
        let mut out_l = vec![0i16; size];
        let mut out_r = vec![0i16; size];

        for mode in ReverbMode::ALL {
            let mut reverb = BReverbModel::<i16>::new(mode, false);
            reverb.open();
            reverb.set_parameters(5, 3);
            let name = format!("{mode:?}").to_lowercase();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    reverb.process(black_box(&input), black_box(&input), &mut out_l, &mut out_r);
                    out_l[0]
                })
            });
        }

        // Float rendition of the same network
        let input_f: Vec<f32> = input.iter().map(|&s| s as f32 / 32768.0).collect();
        let mut out_lf = vec![0.0f32; size];
        let mut out_rf = vec![0.0f32; size];
        let mut reverb = BReverbModel::<f32>::new(ReverbMode::Hall, false);
        reverb.open();
        reverb.set_parameters(5, 3);
        group.bench_with_input(BenchmarkId::new("hall_float", size), &size, |b, _| {
            b.iter(|| {
                reverb.process(black_box(&input_f), black_box(&input_f), &mut out_lf, &mut out_rf);
                out_lf[0]
            })
        });
    }

    group.finish();
}
