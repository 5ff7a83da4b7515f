//! Benchmarks for individual DSP stages.

mod analog;
mod la32;
mod reverb;

pub use analog::bench_analog;
pub use la32::bench_la32;
pub use reverb::bench_reverb;
