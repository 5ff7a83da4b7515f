//! Lookup tables shared by the envelopes and the partial mixer.

use once_cell::sync::Lazy;

use crate::SAMPLE_RATE;

/// Keyfollow ratios in eighths: index 11 tracks the keyboard 1:1.
pub const KEYFOLLOW: [i32; 17] = [-8, -4, -2, 0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 12, 16, 8, 8];

/// Stereo-split panning for the first partial of a pair.
pub const PAN_NUMERATOR_MASTER: [u8; 15] = [0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7];
/// Stereo-split panning for the second partial of a pair.
pub const PAN_NUMERATOR_SLAVE: [u8; 15] = [0, 1, 2, 3, 4, 5, 6, 7, 7, 7, 7, 7, 7, 7, 7];

/// Pan position 0..=14 to a gain with 13 fractional bits.
pub static PAN_FACTORS: Lazy<[i32; 15]> = Lazy::new(|| {
    let mut table = [0; 15];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = (0.5 + i as f64 * 8192.0 / 14.0) as i32;
    }
    table
});

/// Envelope time parameter 0..=100 to samples. Roughly exponential, from
/// 1 ms up to about 23 s.
pub static ENV_TIME_SAMPLES: Lazy<[u32; 101]> = Lazy::new(|| {
    let samples_per_ms = (SAMPLE_RATE / 1000) as f64;
    let mut table = [0; 101];
    for (t, entry) in table.iter_mut().enumerate() {
        *entry = (samples_per_ms * (t as f64 * 0.145).exp2()).round() as u32;
    }
    table
});

/// Envelope time for `time` after keyfollow: every `keyfollow` step halves
/// the time over four octaves above middle C and doubles it below.
pub fn env_time(time: u8, keyfollow: u8, key: u8) -> u32 {
    let base = ENV_TIME_SAMPLES[time.min(100) as usize];
    if keyfollow == 0 {
        return base;
    }
    let octaves = (key as f64 - 60.0) / 12.0 * keyfollow.min(4) as f64 / 4.0;
    (base as f64 * (-octaves).exp2()).round().max(1.0) as u32
}
