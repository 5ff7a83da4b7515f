//! Whole-synth scenario benchmarks.
//!
//! These drive the public `Synth` API the way a host would: notes in,
//! interleaved stereo out.

mod render;
mod stealing;

pub use render::bench_render;
pub use stealing::bench_stealing;
