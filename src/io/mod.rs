// Purpose - external interfaces: PCM sample data and MIDI input

pub mod converter;
pub mod midi;
pub mod pcm;

pub use pcm::{PcmRom, PcmWave};
