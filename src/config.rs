//! Hardware-level options of the emulated unit.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MIN_PARTIAL_COUNT: usize = 8;
pub const MAX_PARTIAL_COUNT: usize = 256;
pub const DEFAULT_PARTIAL_COUNT: usize = 32;

/// How LA32 output is turned into DAC input.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DacInputMode {
    /// Doubled with saturation. Cleanest, not hardware-accurate.
    #[default]
    Nice,
    /// Samples passed through untouched (half volume).
    Pure,
    /// First-generation bit shift: sign kept, LSB cleared.
    Generation1,
    /// Later-generation bit shift: sign kept, bit 14 copied into the LSB.
    Generation2,
}

/// Fidelity of the analog output circuit emulation.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalogOutputMode {
    /// No filtering, 32 kHz.
    DigitalOnly,
    /// Short FIR approximation of the LPF, 32 kHz.
    #[default]
    Coarse,
    /// Interpolating FIR, 48 kHz.
    Accurate,
    /// Interpolating FIR, 96 kHz.
    Oversampled,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub partial_count: usize,
    pub analog_output_mode: AnalogOutputMode,
    pub dac_input_mode: DacInputMode,
    /// Use the first-generation MT-32 reverb tables instead of the CM-32L ones.
    pub mt32_reverb_compatibility: bool,
    /// Use the first-generation analog LPF response.
    pub old_mt32_analog_lpf: bool,
    pub reverb_enabled: bool,
    pub reversed_stereo: bool,
    /// Keep odd panpot values instead of masking them like the LA32 does.
    pub nice_panning: bool,
    pub output_gain: f32,
    pub reverb_output_gain: f32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            partial_count: DEFAULT_PARTIAL_COUNT,
            analog_output_mode: AnalogOutputMode::default(),
            dac_input_mode: DacInputMode::default(),
            mt32_reverb_compatibility: false,
            old_mt32_analog_lpf: false,
            reverb_enabled: true,
            reversed_stereo: false,
            nice_panning: false,
            output_gain: 1.0,
            reverb_output_gain: 1.0,
        }
    }
}

impl SynthConfig {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_PARTIAL_COUNT..=MAX_PARTIAL_COUNT).contains(&self.partial_count) {
            return Err(Error::InvalidPartialCount {
                got: self.partial_count,
                min: MIN_PARTIAL_COUNT,
                max: MAX_PARTIAL_COUNT,
            });
        }
        Ok(())
    }

    pub fn with_partial_count(mut self, partial_count: usize) -> Self {
        self.partial_count = partial_count;
        self
    }

    pub fn with_analog_output_mode(mut self, mode: AnalogOutputMode) -> Self {
        self.analog_output_mode = mode;
        self
    }

    pub fn with_dac_input_mode(mut self, mode: DacInputMode) -> Self {
        self.dac_input_mode = mode;
        self
    }
}
