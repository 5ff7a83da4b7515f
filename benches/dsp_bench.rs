//! Benchmarks for the DSP stages and full-synth rendering.
//!
//! Run with: cargo bench
//!
//! Reference timing at the native 32kHz rate:
//!   - 64 samples  = 2.00ms deadline
//!   - 128 samples = 4.00ms deadline
//!   - 256 samples = 8.00ms deadline
//!   - 512 samples = 16.00ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Individual stages (LA32 pair, reverb, analog output)
//!   - scenarios/*  Whole-synth renders at different polyphony levels

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    dsp::bench_la32,
    dsp::bench_reverb,
    dsp::bench_analog,
    scenarios::bench_render,
    scenarios::bench_stealing,
);
criterion_main!(benches);
