//! Benchmarks for rendering with a given number of sounding notes.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use mt32_core::{io::PcmRom, Synth, SynthConfig};

use crate::BLOCK_SIZES;

fn synth_with_notes(notes: usize) -> Synth {
    let mut synth = match Synth::new(SynthConfig::default(), PcmRom::empty()) {
        Ok(synth) => synth,
        Err(err) => panic!("default config rejected: {err}"),
    };
    for n in 0..notes {
        synth.play_note(n % 8, 48 + (n * 5 % 36) as u8, 100);
    }
    synth
}

pub fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/render");

    for &size in BLOCK_SIZES {
        let mut out = vec![0i16; 2 * size];

        // Idle: reverb only
        let mut idle = synth_with_notes(0);
        group.bench_with_input(BenchmarkId::new("idle", size), &size, |b, _| {
            b.iter(|| idle.render(black_box(&mut out)))
        });

        // 4 notes × 2 partials
        let mut light = synth_with_notes(4);
        group.bench_with_input(BenchmarkId::new("8_partials", size), &size, |b, _| {
            b.iter(|| light.render(black_box(&mut out)))
        });

        // Full polyphony
        let mut full = synth_with_notes(16);
        group.bench_with_input(BenchmarkId::new("32_partials", size), &size, |b, _| {
            b.iter(|| full.render(black_box(&mut out)))
        });
    }

    group.finish();
}
