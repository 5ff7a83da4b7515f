//! Part (MIDI channel) state.
//!
//! Parts 0..=7 are melodic and play one timbre. Part 8 is the rhythm part:
//! every key from [`RHYTHM_FIRST_KEY`] up carries its own timbre, panpot
//! and reverb switch.

use std::collections::VecDeque;

use crate::patch::{build_patch_cache, PatchCache, Timbre};
use crate::synth::poly::PolyId;
use crate::synth::tvp::OCTAVE;

pub const PART_COUNT: usize = 9;
pub const RHYTHM_PART: usize = 8;
pub const RHYTHM_FIRST_KEY: u8 = 24;
pub const RHYTHM_KEY_COUNT: usize = 85;

#[derive(Debug, Clone)]
pub struct RhythmKey {
    pub timbre: Timbre,
    /// 0..=14, 7 is centre.
    pub panpot: u8,
    pub reverb: bool,
    cache: [PatchCache; 4],
}

impl RhythmKey {
    pub fn new(timbre: Timbre, panpot: u8, reverb: bool) -> Self {
        let cache = build_patch_cache(&timbre, reverb);
        Self {
            timbre,
            panpot: panpot.min(14),
            reverb,
            cache,
        }
    }

    pub fn patch_cache(&self) -> &[PatchCache; 4] {
        &self.cache
    }
}

#[derive(Debug, Clone)]
pub struct Part {
    number: usize,
    timbre: Timbre,
    cache: [PatchCache; 4],
    volume: u8,
    panpot: u8,
    reverb: bool,
    assign_mode: u8,
    hold_pedal: bool,
    /// Current bend in pitch units.
    pitch_bend: i32,
    bend_range: u8,
    rhythm_keys: Vec<Option<RhythmKey>>,
    /// Active polys, oldest first.
    pub(crate) active_polys: VecDeque<PolyId>,
}

impl Part {
    pub fn new(number: usize, poly_capacity: usize) -> Self {
        let timbre = Timbre::default();
        let cache = build_patch_cache(&timbre, true);
        let rhythm_keys = if number == RHYTHM_PART {
            vec![None; RHYTHM_KEY_COUNT]
        } else {
            Vec::new()
        };
        Self {
            number,
            timbre,
            cache,
            volume: 100,
            panpot: 7,
            reverb: true,
            assign_mode: 0,
            hold_pedal: false,
            pitch_bend: 0,
            bend_range: 2,
            rhythm_keys,
            active_polys: VecDeque::with_capacity(poly_capacity),
        }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn is_rhythm(&self) -> bool {
        self.number == RHYTHM_PART
    }

    pub fn timbre(&self) -> &Timbre {
        &self.timbre
    }

    pub fn set_timbre(&mut self, timbre: Timbre) {
        self.cache = build_patch_cache(&timbre, self.reverb);
        self.timbre = timbre;
    }

    pub fn patch_cache(&self) -> &[PatchCache; 4] {
        &self.cache
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
    }

    pub fn panpot(&self) -> u8 {
        self.panpot
    }

    pub fn set_panpot(&mut self, panpot: u8) {
        self.panpot = panpot.min(14);
    }

    pub fn reverb_switch(&self) -> bool {
        self.reverb
    }

    /// Takes effect on the next note.
    pub fn set_reverb_switch(&mut self, reverb: bool) {
        self.reverb = reverb;
        self.cache = build_patch_cache(&self.timbre, reverb);
    }

    /// Bit 0: never steal from other parts beyond the reserve.
    /// Bit 1: allow several polys on the same key.
    pub fn assign_mode(&self) -> u8 {
        self.assign_mode
    }

    pub fn set_assign_mode(&mut self, assign_mode: u8) {
        self.assign_mode = assign_mode & 3;
    }

    pub fn hold_pedal(&self) -> bool {
        self.hold_pedal
    }

    pub(crate) fn set_hold_pedal_flag(&mut self, on: bool) {
        self.hold_pedal = on;
    }

    pub fn pitch_bend(&self) -> i32 {
        self.pitch_bend
    }

    /// `value` is the 14-bit MIDI bend, 8192 centre.
    pub(crate) fn set_pitch_bend_raw(&mut self, value: u16) {
        let offset = value.min(16383) as i32 - 8192;
        self.pitch_bend = offset * self.bend_range as i32 * OCTAVE / (12 * 8192);
    }

    pub fn bend_range(&self) -> u8 {
        self.bend_range
    }

    pub fn set_bend_range(&mut self, semitones: u8) {
        self.bend_range = semitones.min(24);
    }

    pub fn rhythm_key(&self, key: u8) -> Option<&RhythmKey> {
        let index = key.checked_sub(RHYTHM_FIRST_KEY)? as usize;
        self.rhythm_keys.get(index)?.as_ref()
    }

    /// Ignored on melodic parts and for keys outside the rhythm range.
    pub fn set_rhythm_key(&mut self, key: u8, setup: RhythmKey) -> bool {
        let Some(index) = key.checked_sub(RHYTHM_FIRST_KEY) else {
            return false;
        };
        match self.rhythm_keys.get_mut(index as usize) {
            Some(slot) => {
                *slot = Some(setup);
                true
            }
            None => false,
        }
    }

    pub fn active_polys(&self) -> impl Iterator<Item = PolyId> + '_ {
        self.active_polys.iter().copied()
    }

    pub fn active_poly_count(&self) -> usize {
        self.active_polys.len()
    }

    pub(crate) fn remove_poly(&mut self, poly: PolyId) {
        if let Some(pos) = self.active_polys.iter().position(|&p| p == poly) {
            self.active_polys.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bend_range_scales_pitch_bend() {
        let mut part = Part::new(0, 4);
        part.set_pitch_bend_raw(16383);
        assert_eq!(part.pitch_bend(), 8191 * 2 * OCTAVE / (12 * 8192));
        part.set_pitch_bend_raw(0);
        assert_eq!(part.pitch_bend(), -2 * OCTAVE / 12);
        part.set_pitch_bend_raw(8192);
        assert_eq!(part.pitch_bend(), 0);
    }

    #[test]
    fn rhythm_keys_only_on_rhythm_part() {
        let mut melodic = Part::new(0, 4);
        assert!(!melodic.set_rhythm_key(36, RhythmKey::new(Timbre::default(), 7, true)));

        let mut rhythm = Part::new(RHYTHM_PART, 4);
        assert!(rhythm.is_rhythm());
        assert!(rhythm.set_rhythm_key(36, RhythmKey::new(Timbre::default(), 20, false)));
        let key = rhythm.rhythm_key(36).unwrap();
        assert_eq!(key.panpot, 14);
        assert!(!key.patch_cache()[0].reverb);
        assert!(rhythm.rhythm_key(37).is_none());
        assert!(rhythm.rhythm_key(10).is_none());
        assert!(!rhythm.set_rhythm_key(109, RhythmKey::new(Timbre::default(), 7, true)));
    }

    #[test]
    fn reverb_switch_rebuilds_cache() {
        let mut part = Part::new(1, 4);
        assert!(part.patch_cache()[0].reverb);
        part.set_reverb_switch(false);
        assert!(!part.patch_cache()[0].reverb);
    }
}
