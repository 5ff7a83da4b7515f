//! Boss reverb chip model.
//!
//! ```text
//!                     multi-comb modes (room, hall, plate)
//!
//! dry ──→ [entrance delay + LPF] ──→ [AP 1] → [AP 2] → [AP 3] ──┬──→ [Comb 1] ──┐
//!                                                                ├──→ [Comb 2] ──┼──→ taps → L / R
//!                                                                └──→ [Comb 3] ──┘
//!
//!                     tap delay mode
//!
//! dry ──→ [16000-sample delay with LPF feedback] ──→ tap L / tap R
//! ```
//!
//! All arithmetic goes through [`ReverbSample`], so the same graph runs
//! bit-exact in 16-bit fixed point or approximately in float.

pub mod filters;
pub mod settings;

use crate::dsp::sample::ReverbSample;
use crate::error::Error;

use self::filters::{AllpassFilter, CombFilter};
use self::settings::{get_cm32l_lapc_settings, get_mt32_settings, BReverbSettings};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReverbMode {
    Room = 0,
    Hall = 1,
    Plate = 2,
    TapDelay = 3,
}

impl ReverbMode {
    pub const ALL: [ReverbMode; 4] = [
        ReverbMode::Room,
        ReverbMode::Hall,
        ReverbMode::Plate,
        ReverbMode::TapDelay,
    ];
}

impl TryFrom<u8> for ReverbMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ReverbMode::Room),
            1 => Ok(ReverbMode::Hall),
            2 => Ok(ReverbMode::Plate),
            3 => Ok(ReverbMode::TapDelay),
            other => Err(Error::InvalidReverbMode(other)),
        }
    }
}

/// Filter objects exist only between `open()` and `close()`.
struct Filters<S: ReverbSample> {
    allpasses: Vec<AllpassFilter<S>>,
    combs: Vec<CombFilter<S>>,
}

pub struct BReverbModel<S: ReverbSample> {
    mode: ReverbMode,
    mt32_compatible: bool,
    settings: &'static BReverbSettings,
    tap_delay_mode: bool,
    filters: Option<Filters<S>>,
    dry_amp: u8,
    wet_level: u8,
}

impl<S: ReverbSample> BReverbModel<S> {
    /// Select the settings of one hardware generation. Call `open()` before use.
    pub fn new(mode: ReverbMode, mt32_compatible: bool) -> Self {
        let settings = if mt32_compatible {
            get_mt32_settings(mode)
        } else {
            get_cm32l_lapc_settings(mode)
        };
        Self {
            mode,
            mt32_compatible,
            settings,
            tap_delay_mode: mode == ReverbMode::TapDelay,
            filters: None,
            dry_amp: 0,
            wet_level: 0,
        }
    }

    pub fn mode(&self) -> ReverbMode {
        self.mode
    }

    pub fn settings(&self) -> &'static BReverbSettings {
        self.settings
    }

    pub fn is_open(&self) -> bool {
        self.filters.is_some()
    }

    /// Allocate the ring buffers. Reopening an open model does nothing.
    pub fn open(&mut self) {
        if self.is_open() {
            return;
        }
        let settings = self.settings;
        let allpasses = settings
            .allpass_sizes
            .iter()
            .map(|&size| AllpassFilter::new(size))
            .collect();
        let combs = if self.tap_delay_mode {
            vec![CombFilter::tap_delay(
                settings.comb_sizes[0],
                settings.filter_factors[0],
            )]
        } else {
            let mut combs = Vec::with_capacity(settings.number_of_combs());
            combs.push(CombFilter::delay_with_low_pass(
                settings.comb_sizes[0],
                settings.filter_factors[0],
                settings.lpf_amp,
            ));
            for i in 1..settings.number_of_combs() {
                combs.push(CombFilter::comb(
                    settings.comb_sizes[i],
                    settings.filter_factors[i],
                ));
            }
            combs
        };
        self.filters = Some(Filters { allpasses, combs });
        self.dry_amp = 0;
        self.wet_level = 0;
        self.mute();
        log::trace!(
            "reverb {:?} opened ({} settings)",
            self.mode,
            if self.mt32_compatible { "MT-32" } else { "CM-32L" }
        );
    }

    pub fn close(&mut self) {
        self.filters = None;
    }

    pub fn mute(&mut self) {
        let Some(filters) = self.filters.as_mut() else {
            return;
        };
        for allpass in &mut filters.allpasses {
            allpass.mute();
        }
        for comb in &mut filters.combs {
            comb.mute();
        }
    }

    /// Apply reverb time and level, 3 bits each.
    pub fn set_parameters(&mut self, time: u8, level: u8) {
        let settings = self.settings;
        let tap_delay_mode = self.tap_delay_mode;
        let Some(filters) = self.filters.as_mut() else {
            return;
        };
        let time = (time & 7) as usize;
        let level = (level & 7) as usize;
        if tap_delay_mode {
            let comb = &mut filters.combs[0];
            comb.set_output_positions(
                settings.out_l_positions_or_delay_times[time],
                settings.out_r_positions_or_delay_times[time],
            );
            let feedback_index = if level < 3 || time < 6 { 0 } else { 1 };
            comb.set_feedback_factor(settings.feedback_factors[feedback_index]);
        } else {
            for (i, comb) in filters.combs.iter_mut().enumerate() {
                comb.set_feedback_factor(settings.feedback_factors[(i << 3) + time]);
            }
        }
        if time == 0 && level == 0 {
            self.dry_amp = 0;
            self.wet_level = 0;
        } else {
            // The tap-delay dry level irregularity is present on the real unit.
            self.dry_amp = if tap_delay_mode && (time == 0 || (time == 1 && level == 1)) {
                settings.dry_amps[level + 8]
            } else {
                settings.dry_amps[level]
            };
            self.wet_level = settings.wet_levels[level];
        }
    }

    /// True if any ring buffer still holds audible samples.
    pub fn is_active(&self) -> bool {
        let Some(filters) = self.filters.as_ref() else {
            return false;
        };
        filters.allpasses.iter().any(|a| !a.is_empty())
            || filters.combs.iter().any(|c| !c.is_empty())
    }

    pub fn is_mt32_compatible(&self, mode: ReverbMode) -> bool {
        self.mt32_compatible && self.mode == mode
    }

    /// Process stereo dry input into stereo wet output.
    ///
    /// The number of samples is the shortest of the four slices. A closed
    /// model writes silence.
    pub fn process(
        &mut self,
        in_left: &[S],
        in_right: &[S],
        out_left: &mut [S],
        out_right: &mut [S],
    ) {
        let num_samples = in_left
            .len()
            .min(in_right.len())
            .min(out_left.len())
            .min(out_right.len());
        let settings = self.settings;
        let Some(filters) = self.filters.as_mut() else {
            out_left[..num_samples].fill(S::default());
            out_right[..num_samples].fill(S::default());
            return;
        };

        for i in 0..num_samples {
            let dry = S::dry_mix(in_left[i], in_right[i], self.tap_delay_mode);
            let dry = dry.weird_mul(self.dry_amp, 0xFF);

            if self.tap_delay_mode {
                let comb = &mut filters.combs[0];
                comb.process(dry);
                out_left[i] = comb.get_left_output().weird_mul(self.wet_level, 0xFF);
                out_right[i] = comb.get_right_output().weird_mul(self.wet_level, 0xFF);
                continue;
            }

            let combs = &mut filters.combs;
            // A tap equal to the buffer size must be read before it is overwritten.
            let link = combs[0].get_output_at(settings.comb_sizes[0] - 1);
            combs[0].process(dry);

            let mut link = link;
            for allpass in &mut filters.allpasses {
                link = allpass.process(link);
            }

            let out_l1 = combs[1].get_output_at(settings.out_l_positions_or_delay_times[0] - 1);
            for comb in &mut combs[1..] {
                comb.process(link);
            }

            let outl = &settings.out_l_positions_or_delay_times;
            let out_l2 = combs[2].get_output_at(outl[1]);
            let out_l3 = combs[3].get_output_at(outl[2]);
            out_left[i] = S::mix_combs(out_l1, out_l2, out_l3).weird_mul(self.wet_level, 0xFF);

            let outr = &settings.out_r_positions_or_delay_times;
            let out_r1 = combs[1].get_output_at(outr[0]);
            let out_r2 = combs[2].get_output_at(outr[1]);
            let out_r3 = combs[3].get_output_at(outr[2]);
            out_right[i] = S::mix_combs(out_r1, out_r2, out_r3).weird_mul(self.wet_level, 0xFF);
        }
    }
}
