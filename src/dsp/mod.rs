//! Signal-processing building blocks below the voice layer.
//!
//! Nothing in here knows about parts or notes. Every type is allocation-free
//! once constructed so it can sit directly inside the render loop.

/// Analog output stage emulation and resampling.
pub mod analog;
/// LA32 output to DAC input bit mapping.
pub mod dac;
/// Integer linear ramps shared by the TVA, TVP and TVF.
pub mod envelope;
/// LA32 wave generators and partial pairing.
pub mod la32;
/// Boss reverb chip model.
pub mod reverb;
/// Fixed-point sample helpers.
pub mod sample;

pub use envelope::Ramp;
pub use la32::{La32PartialPair, PairHalf};
pub use reverb::{BReverbModel, ReverbMode};
