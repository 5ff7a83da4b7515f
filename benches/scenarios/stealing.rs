//! Benchmarks for note-on under full polyphony, where every new note
//! has to abort an older one.

use std::hint::black_box;

use criterion::Criterion;
use mt32_core::{io::PcmRom, Synth, SynthConfig};

pub fn bench_stealing(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/stealing");

    let mut synth = match Synth::new(SynthConfig::default(), PcmRom::empty()) {
        Ok(synth) => synth,
        Err(err) => panic!("default config rejected: {err}"),
    };
    let mut key = 36u8;
    group.bench_function("note_on_full", |b| {
        b.iter(|| {
            let part = (key % 8) as usize;
            synth.play_note(part, black_box(key), 100);
            key = if key >= 96 { 36 } else { key + 1 };
        })
    });

    group.finish();
}
