//! Benchmarks for LA32 wave generation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use mt32_core::dsp::la32::{La32PartialPair, PairHalf, MIDDLE_C_PITCH};

use crate::BLOCK_SIZES;

pub fn bench_la32(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/la32");
    let pitch = MIDDLE_C_PITCH as u16;
    let pcm: Vec<i16> = (0..4096).map(|i| ((i * 13) % 2000) as i16 - 1000).collect();

    for &size in BLOCK_SIZES {
        // Single square, no partner
        let mut square = La32PartialPair::new();
        square.init(false, false);
        square.init_synth(PairHalf::Master, false, 30);
        group.bench_with_input(BenchmarkId::new("square", size), &size, |b, &n| {
            b.iter(|| {
                let mut acc = 0i32;
                for _ in 0..n {
                    square.generate_next_sample(PairHalf::Master, 0xFF00, black_box(pitch), 200, &pcm);
                    acc += square.next_out_sample() as i32;
                }
                acc
            })
        });

        // Sawtooth ring-modulated by a looping PCM slave
        let mut ring = La32PartialPair::new();
        ring.init(true, true);
        ring.init_synth(PairHalf::Master, true, 0);
        ring.init_pcm(PairHalf::Slave, 0, pcm.len(), true);
        group.bench_with_input(BenchmarkId::new("ring_pcm", size), &size, |b, &n| {
            b.iter(|| {
                let mut acc = 0i32;
                for _ in 0..n {
                    ring.generate_next_sample(PairHalf::Master, 0xFF00, black_box(pitch), 200, &pcm);
                    ring.generate_next_sample(PairHalf::Slave, 0xFF00, black_box(pitch + 700), 255, &pcm);
                    acc += ring.next_out_sample() as i32;
                }
                acc
            })
        });
    }

    group.finish();
}
