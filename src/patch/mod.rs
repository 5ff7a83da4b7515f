//! Timbre parameters and the per-partial cache derived from them.
//!
//! A timbre describes up to four partials arranged as two pairs (1+2, 3+4).
//! Each pair has a structure (0..=12) choosing synth or PCM sources and how
//! the two are mixed. [`build_patch_cache`] flattens that into four
//! [`PatchCache`] entries that the voice layer reads at note-on.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per structure: bit 1 makes the first partial of the pair PCM, bit 0 the second.
pub const PARTIAL_STRUCT: [u8; 13] = [0, 0, 2, 2, 1, 3, 3, 0, 3, 0, 2, 1, 3];

/// Per structure: 0 mix, 1 ring plus master, 2 ring only, 3 stereo split.
pub const PARTIAL_MIX_STRUCT: [u8; 13] = [0, 1, 0, 1, 1, 0, 1, 3, 3, 2, 2, 2, 2];

/// Wave generator settings.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WgParam {
    /// Semitones, 36 is unison.
    pub pitch_coarse: u8,
    /// Cents, 50 is unison.
    pub pitch_fine: u8,
    /// Index into the keyfollow table (0..=16), 11 tracks the keyboard.
    pub pitch_keyfollow: u8,
    pub pitch_bender_enabled: bool,
    /// Bit 0 selects sawtooth for synth partials; values above 1 select
    /// the upper PCM bank.
    pub waveform: u8,
    pub pcm_wave: u8,
    /// 0..=100.
    pub pulse_width: u8,
    /// 0..=14, 7 is neutral.
    pub pulse_width_velo_sensitivity: u8,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchEnvParam {
    /// 0..=10.
    pub depth: u8,
    pub velo_sensitivity: u8,
    /// 0..=4.
    pub time_keyfollow: u8,
    /// Attack, decay 1, decay 2, release.
    pub time: [u8; 4],
    /// Initial, end of attack, end of decay 1, sustain, end of release.
    /// 50 is no offset.
    pub level: [u8; 5],
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TvfParam {
    /// 0..=100.
    pub cutoff: u8,
    /// Index into the keyfollow table.
    pub keyfollow: u8,
    /// 0..=100.
    pub env_depth: u8,
    /// 0..=100.
    pub env_velo_sensitivity: u8,
    pub env_time: [u8; 5],
    pub env_level: [u8; 4],
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TvaParam {
    /// 0..=100.
    pub level: u8,
    /// 0..=100, 50 ignores velocity.
    pub velo_sensitivity: u8,
    /// 0..=4, shortens envelope times for higher keys.
    pub env_time_keyfollow: u8,
    /// Four segment times plus release.
    pub env_time: [u8; 5],
    /// Levels reached at the end of each segment; the last is the sustain.
    pub env_level: [u8; 4],
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialParam {
    pub wg: WgParam,
    pub pitch_env: PitchEnvParam,
    pub tvf: TvfParam,
    pub tva: TvaParam,
}

impl Default for PartialParam {
    fn default() -> Self {
        Self {
            wg: WgParam {
                pitch_coarse: 36,
                pitch_fine: 50,
                pitch_keyfollow: 11,
                pitch_bender_enabled: true,
                waveform: 0,
                pcm_wave: 0,
                pulse_width: 0,
                pulse_width_velo_sensitivity: 7,
            },
            pitch_env: PitchEnvParam {
                depth: 0,
                velo_sensitivity: 0,
                time_keyfollow: 0,
                time: [0, 0, 0, 0],
                level: [50; 5],
            },
            tvf: TvfParam {
                cutoff: 100,
                keyfollow: 0,
                env_depth: 0,
                env_velo_sensitivity: 0,
                env_time: [0; 5],
                env_level: [100; 4],
            },
            tva: TvaParam {
                level: 100,
                velo_sensitivity: 50,
                env_time_keyfollow: 0,
                env_time: [0, 20, 30, 30, 30],
                env_level: [100, 90, 80, 70],
            },
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimbreCommon {
    pub name: String,
    /// Structure of partials 1+2, 0..=12.
    pub partial_structure12: u8,
    /// Structure of partials 3+4, 0..=12.
    pub partial_structure34: u8,
    /// Bit `n` set plays partial `n`.
    pub partial_mute: u8,
    /// Non-sustaining timbres ignore note-off and decay on their own.
    pub no_sustain: bool,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timbre {
    pub common: TimbreCommon,
    pub partials: [PartialParam; 4],
}

impl Default for Timbre {
    /// Two detuned synth partials, square and sawtooth.
    fn default() -> Self {
        let mut saw = PartialParam::default();
        saw.wg.waveform = 1;
        saw.wg.pitch_fine = 53;
        Self {
            common: TimbreCommon {
                name: String::from("Init Tone"),
                partial_structure12: 0,
                partial_structure34: 0,
                partial_mute: 0b0011,
                no_sustain: false,
            },
            partials: [PartialParam::default(), saw, PartialParam::default(), PartialParam::default()],
        }
    }
}

/// Everything a partial needs at note-on, precomputed per timbre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatchCache {
    pub play_partial: bool,
    pub pcm_partial: bool,
    pub pcm: u8,
    pub waveform: u8,
    pub structure_mix: u8,
    /// 0 for the first partial of a pair, 1 for the second.
    pub structure_position: u8,
    /// Index of the other partial in the pair.
    pub structure_pair: usize,
    /// Partials the whole timbre plays; the same in all four entries.
    pub partial_count: usize,
    pub sustain: bool,
    pub reverb: bool,
    pub partial_param: PartialParam,
}

pub fn build_patch_cache(timbre: &Timbre, reverb: bool) -> [PatchCache; 4] {
    let common = &timbre.common;
    let structure12 = common.partial_structure12.min(12) as usize;
    let structure34 = common.partial_structure34.min(12) as usize;

    let mut cache = [PatchCache::default(); 4];
    let mut partial_count = 0;
    for (t, entry) in cache.iter_mut().enumerate() {
        let (structure, bit, position, pair) = match t {
            0 => (structure12, 2, 0, 1),
            1 => (structure12, 1, 1, 0),
            2 => (structure34, 2, 0, 3),
            _ => (structure34, 1, 1, 2),
        };
        let param = &timbre.partials[t];
        entry.play_partial = (common.partial_mute >> t) & 1 == 1;
        entry.pcm_partial = PARTIAL_STRUCT[structure] & bit != 0;
        entry.structure_mix = PARTIAL_MIX_STRUCT[structure];
        entry.structure_position = position;
        entry.structure_pair = pair;
        entry.pcm = param.wg.pcm_wave;
        entry.waveform = param.wg.waveform;
        entry.sustain = !common.no_sustain;
        entry.reverb = reverb;
        entry.partial_param = *param;
        if entry.play_partial {
            partial_count += 1;
        }
    }
    for entry in cache.iter_mut() {
        entry.partial_count = partial_count;
    }
    cache
}
