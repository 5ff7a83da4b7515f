//! Benchmarks for the analog output stage.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use mt32_core::dsp::analog::{Analog, DacStreams};
use mt32_core::AnalogOutputMode;

use crate::BLOCK_SIZES;

pub fn bench_analog(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/analog");

    for &size in BLOCK_SIZES {
        let input: Vec<i16> = (0..size).map(|i| ((i * 101) % 4000) as i16 - 2000).collect();
        let mut out = vec![0i16; 2 * size];

        for mode in [
            AnalogOutputMode::DigitalOnly,
            AnalogOutputMode::Coarse,
            AnalogOutputMode::Accurate,
            AnalogOutputMode::Oversampled,
        ] {
            let mut analog = Analog::new(mode, false);
            let name = format!("{mode:?}").to_lowercase();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    let streams = DacStreams {
                        non_reverb_left: &input,
                        non_reverb_right: &input,
                        reverb_dry_left: &input,
                        reverb_dry_right: &input,
                        reverb_wet_left: &input,
                        reverb_wet_right: &input,
                    };
                    analog.process(black_box(&mut out), streams);
                    out[0]
                })
            });
        }
    }

    group.finish();
}
