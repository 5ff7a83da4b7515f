use thiserror::Error;

/// Construction-time failures. Rendering itself never fails.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("partial count must be between {min} and {max}, got {got}")]
    InvalidPartialCount { got: usize, min: usize, max: usize },

    #[error("reverb mode {0} does not exist (expected 0..=3)")]
    InvalidReverbMode(u8),

    #[error("PCM wave {index} spans {start}..{end}, beyond the {rom_len}-sample PCM ROM")]
    PcmWaveOutOfRange {
        index: usize,
        start: usize,
        end: usize,
        rom_len: usize,
    },

    #[error("part {0} does not exist (expected 0..=8)")]
    InvalidPart(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
