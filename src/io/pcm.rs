//! PCM sample memory and its wave directory.

use crate::error::{Error, Result};

/// One entry of the wave directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmWave {
    /// First sample, as an index into the ROM.
    pub addr: usize,
    pub len: usize,
    pub looped: bool,
}

/// Decoded PCM samples plus the waves carved out of them.
#[derive(Debug, Clone, Default)]
pub struct PcmRom {
    samples: Vec<i16>,
    waves: Vec<PcmWave>,
}

impl PcmRom {
    /// Every wave must lie entirely inside `samples`.
    pub fn new(samples: Vec<i16>, waves: Vec<PcmWave>) -> Result<Self> {
        for (index, wave) in waves.iter().enumerate() {
            let end = wave.addr.checked_add(wave.len).unwrap_or(usize::MAX);
            if end > samples.len() {
                return Err(Error::PcmWaveOutOfRange {
                    index,
                    start: wave.addr,
                    end,
                    rom_len: samples.len(),
                });
            }
        }
        log::debug!(
            "PCM ROM: {} samples, {} waves",
            samples.len(),
            waves.len()
        );
        Ok(Self { samples, waves })
    }

    /// A ROM with no waves; PCM partials stay silent.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn wave_count(&self) -> usize {
        self.waves.len()
    }

    pub fn wave(&self, index: usize) -> Option<&PcmWave> {
        self.waves.get(index)
    }
}
