//! Reverb constants read from the control ROMs.
//!
//! Buffer sizes are in samples at 32 kHz. Comb and allpass sizes, output
//! taps and gain bytes are hardware data and are reproduced verbatim.

use super::filters::{MODE_3_ADDITIONAL_DELAY, MODE_3_FEEDBACK_DELAY, PROCESS_DELAY};
use super::ReverbMode;

pub struct BReverbSettings {
    pub allpass_sizes: &'static [usize],
    pub comb_sizes: &'static [usize],
    /// Left output taps (multi-comb modes) or delay times per time value (tap delay).
    pub out_l_positions_or_delay_times: &'static [usize],
    pub out_r_positions_or_delay_times: &'static [usize],
    pub filter_factors: &'static [u8],
    /// Flattened `[comb][time]` table, or two entries for tap delay.
    pub feedback_factors: &'static [u8],
    /// 8 entries per level; tap delay carries a second row of 8 for its quirk.
    pub dry_amps: &'static [u8],
    pub wet_levels: &'static [u8],
    pub lpf_amp: u8,
}

impl BReverbSettings {
    pub fn number_of_allpasses(&self) -> usize {
        self.allpass_sizes.len()
    }

    pub fn number_of_combs(&self) -> usize {
        self.comb_sizes.len()
    }

    /// Longest ring buffer of the mode.
    pub fn max_buffer_size(&self) -> usize {
        self.allpass_sizes
            .iter()
            .chain(self.comb_sizes.iter())
            .copied()
            .max()
            .unwrap_or(0)
    }
}

const MODE_3_DELAY: [usize; 1] =
    [16000 + MODE_3_FEEDBACK_DELAY + PROCESS_DELAY + MODE_3_ADDITIONAL_DELAY];
const MODE_3_OUTL: [usize; 8] = [400, 624, 960, 1488, 2256, 3472, 5280, 8000];
const MODE_3_OUTR: [usize; 8] = [800, 1248, 1920, 2976, 4512, 6944, 10560, 16000];
const MODE_3_COMB_FACTOR: [u8; 1] = [0x68];
const MODE_3_COMB_FEEDBACK: [u8; 2] = [0x68, 0x60];
const MODE_3_DRY_AMP: [u8; 16] = [
    0x20, 0x50, 0x50, 0x50, 0x50, 0x50, 0x50, 0x50, //
    0x20, 0x50, 0x50, 0x50, 0x50, 0x50, 0x50, 0x50,
];
const MODE_3_WET_AMP: [u8; 8] = [0x18, 0x18, 0x28, 0x40, 0x60, 0x80, 0xA8, 0xF8];

const WET_AMP: [u8; 8] = [0x10, 0x30, 0x50, 0x70, 0x90, 0xC0, 0xF0, 0xF0];

const FEEDBACK_ROOM: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x28, 0x48, 0x60, 0x78, 0x80, 0x88, 0x90, 0x98, //
    0x28, 0x48, 0x60, 0x78, 0x80, 0x88, 0x90, 0x98, //
    0x28, 0x48, 0x60, 0x78, 0x80, 0x88, 0x90, 0x98,
];
const FEEDBACK_HALL: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x28, 0x48, 0x60, 0x70, 0x78, 0x80, 0x90, 0x98, //
    0x28, 0x48, 0x60, 0x78, 0x80, 0x88, 0x90, 0x98, //
    0x28, 0x48, 0x60, 0x78, 0x80, 0x88, 0x90, 0x98,
];
const FEEDBACK_PLATE_CM32L: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x30, 0x58, 0x78, 0x88, 0xA0, 0xB8, 0xC0, 0xD0, //
    0x30, 0x58, 0x78, 0x88, 0xA0, 0xB8, 0xC0, 0xD0, //
    0x30, 0x58, 0x78, 0x88, 0xA0, 0xB8, 0xC0, 0xD0,
];
const FEEDBACK_PLATE_MT32: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x28, 0x48, 0x60, 0x70, 0x78, 0x80, 0x90, 0x98, //
    0x28, 0x48, 0x60, 0x78, 0x80, 0x88, 0x90, 0x98, //
    0x28, 0x48, 0x60, 0x78, 0x80, 0x88, 0x90, 0x98,
];

const TAP_DELAY: BReverbSettings = BReverbSettings {
    allpass_sizes: &[],
    comb_sizes: &MODE_3_DELAY,
    out_l_positions_or_delay_times: &MODE_3_OUTL,
    out_r_positions_or_delay_times: &MODE_3_OUTR,
    filter_factors: &MODE_3_COMB_FACTOR,
    feedback_factors: &MODE_3_COMB_FEEDBACK,
    dry_amps: &MODE_3_DRY_AMP,
    wet_levels: &MODE_3_WET_AMP,
    lpf_amp: 0,
};

// Found in the LAPC-I control ROM.
static CM32L_LAPC_SETTINGS: [BReverbSettings; 4] = [
    BReverbSettings {
        allpass_sizes: &[994, 729, 78],
        comb_sizes: &[705 + PROCESS_DELAY, 2349, 2839, 3632],
        out_l_positions_or_delay_times: &[2349, 141, 1960],
        out_r_positions_or_delay_times: &[1174, 1570, 145],
        filter_factors: &[0xA0, 0x60, 0x60, 0x60],
        feedback_factors: &FEEDBACK_ROOM,
        dry_amps: &[0xA0, 0xA0, 0xA0, 0xA0, 0xB0, 0xB0, 0xB0, 0xD0],
        wet_levels: &WET_AMP,
        lpf_amp: 0x60,
    },
    BReverbSettings {
        allpass_sizes: &[1324, 809, 176],
        comb_sizes: &[961 + PROCESS_DELAY, 2619, 3545, 4519],
        out_l_positions_or_delay_times: &[2618, 1760, 4518],
        out_r_positions_or_delay_times: &[1300, 3532, 2274],
        filter_factors: &[0x80, 0x60, 0x60, 0x60],
        feedback_factors: &FEEDBACK_HALL,
        dry_amps: &[0xA0, 0xA0, 0xB0, 0xB0, 0xB0, 0xB0, 0xB0, 0xE0],
        wet_levels: &WET_AMP,
        lpf_amp: 0x60,
    },
    BReverbSettings {
        allpass_sizes: &[969, 644, 157],
        comb_sizes: &[116 + PROCESS_DELAY, 2259, 2839, 3539],
        out_l_positions_or_delay_times: &[2259, 718, 1769],
        out_r_positions_or_delay_times: &[1136, 2128, 1],
        filter_factors: &[0, 0x20, 0x20, 0x20],
        feedback_factors: &FEEDBACK_PLATE_CM32L,
        dry_amps: &[0xA0, 0xA0, 0xB0, 0xB0, 0xB0, 0xB0, 0xC0, 0xE0],
        wet_levels: &WET_AMP,
        lpf_amp: 0x80,
    },
    TAP_DELAY,
];

// Taken from the MT-32 control ROM version 1.07.
static MT32_SETTINGS: [BReverbSettings; 4] = [
    BReverbSettings {
        allpass_sizes: &[994, 729, 78],
        comb_sizes: &[575 + PROCESS_DELAY, 2040, 2752, 3629],
        out_l_positions_or_delay_times: &[2040, 687, 1814],
        out_r_positions_or_delay_times: &[1019, 2072, 1],
        filter_factors: &[0xB0, 0x60, 0x60, 0x60],
        feedback_factors: &FEEDBACK_HALL,
        dry_amps: &[0xA0, 0xA0, 0xA0, 0xA0, 0xB0, 0xB0, 0xB0, 0xD0],
        wet_levels: &WET_AMP,
        lpf_amp: 0x80,
    },
    BReverbSettings {
        allpass_sizes: &[1324, 809, 176],
        comb_sizes: &[961 + PROCESS_DELAY, 2619, 3545, 4519],
        out_l_positions_or_delay_times: &[2618, 1760, 4518],
        out_r_positions_or_delay_times: &[1300, 3532, 2274],
        filter_factors: &[0x90, 0x60, 0x60, 0x60],
        feedback_factors: &FEEDBACK_HALL,
        dry_amps: &[0xA0, 0xA0, 0xB0, 0xB0, 0xB0, 0xB0, 0xB0, 0xE0],
        wet_levels: &WET_AMP,
        lpf_amp: 0x80,
    },
    BReverbSettings {
        allpass_sizes: &[969, 644, 157],
        comb_sizes: &[116 + PROCESS_DELAY, 2259, 2839, 3539],
        out_l_positions_or_delay_times: &[2259, 718, 1769],
        out_r_positions_or_delay_times: &[1136, 2128, 1],
        filter_factors: &[0, 0x60, 0x60, 0x60],
        feedback_factors: &FEEDBACK_PLATE_MT32,
        dry_amps: &[0xA0, 0xA0, 0xB0, 0xB0, 0xB0, 0xB0, 0xC0, 0xE0],
        wet_levels: &WET_AMP,
        lpf_amp: 0x80,
    },
    TAP_DELAY,
];

/// Settings of the first-generation MT-32.
pub fn get_mt32_settings(mode: ReverbMode) -> &'static BReverbSettings {
    &MT32_SETTINGS[mode as usize]
}

/// Settings of the CM-32L, LAPC-I and later MT-32 models.
pub fn get_cm32l_lapc_settings(mode: ReverbMode) -> &'static BReverbSettings {
    &CM32L_LAPC_SETTINGS[mode as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODES: [ReverbMode; 4] = [
        ReverbMode::Room,
        ReverbMode::Hall,
        ReverbMode::Plate,
        ReverbMode::TapDelay,
    ];

    #[test]
    fn multi_comb_tables_are_complete() {
        for settings in MODES[..3]
            .iter()
            .flat_map(|&m| [get_mt32_settings(m), get_cm32l_lapc_settings(m)])
        {
            assert_eq!(settings.number_of_allpasses(), 3);
            assert_eq!(settings.number_of_combs(), 4);
            assert_eq!(settings.filter_factors.len(), 4);
            assert_eq!(settings.feedback_factors.len(), 32);
            assert_eq!(settings.dry_amps.len(), 8);
            assert_eq!(settings.wet_levels.len(), 8);
            assert_eq!(settings.out_l_positions_or_delay_times.len(), 3);
            assert_eq!(settings.out_r_positions_or_delay_times.len(), 3);
            // Output taps must lie inside the comb they read from.
            for (tap, comb) in settings
                .out_l_positions_or_delay_times
                .iter()
                .zip(&settings.comb_sizes[1..])
            {
                assert!(tap <= comb);
            }
        }
    }

    #[test]
    fn tap_delay_is_shared_between_generations() {
        let old = get_mt32_settings(ReverbMode::TapDelay);
        let new = get_cm32l_lapc_settings(ReverbMode::TapDelay);
        assert_eq!(old.comb_sizes, new.comb_sizes);
        assert_eq!(old.comb_sizes[0], 16003);
        assert_eq!(old.dry_amps.len(), 16);
        assert_eq!(old.number_of_allpasses(), 0);
        assert_eq!(old.max_buffer_size(), 16003);
    }
}
