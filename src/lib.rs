//! Sound generation core of an LA32-based synthesizer module.
//!
//! ```text
//!   SynthMessage ──► Synth ──► Part (x9) ──► Poly ──► Partial (xN)
//!                                                      │
//!                     ┌────────────────────────────────┘
//!                     ▼
//!      TVP/TVF/TVA ──► LA32 pair ──► pan ──► dry / non-reverb buses
//!                                              │
//!                                 BReverbModel ┴──► DAC ──► Analog ──► out
//! ```
//!
//! Everything below [`Synth`] runs at the native 32 kHz rate in integer
//! arithmetic. The render path never allocates and never panics.

pub mod config;
pub mod dsp;
pub mod error;
pub mod io;
pub mod patch;
pub mod synth;

pub use config::{AnalogOutputMode, DacInputMode, SynthConfig};
pub use error::{Error, Result};
pub use synth::message::{MessageReceiver, SynthMessage};
pub use synth::{DacOutputStreams, Synth};

/// Native LA32 output rate.
pub const SAMPLE_RATE: u32 = 32_000;

/// Longest slice rendered in one pass; longer requests are chunked.
pub const MAX_SAMPLES_PER_RUN: usize = 4096;
