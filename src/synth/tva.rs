//! Time-variant amplifier.
//!
//! ```text
//!   amp
//!    L1 ┤   ╱╲
//!    L2 ┤  ╱  ╲__
//!    L3 ┤ ╱      ╲__
//!    S  ┤╱          ╲_______________
//!       │                           ╲      release
//!     0 └─Attack─P2─P3──P4──Sustain──╲──→  Dead
//! ```
//!
//! A partial keeps sounding exactly as long as its TVA is playing.

use crate::dsp::Ramp;
use crate::patch::TvaParam;
use crate::synth::tables::env_time;

/// Peak output of [`Tva::next_amp`].
pub const MAX_AMP: u32 = 0xFF00;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TvaPhase {
    Attack,
    Phase2,
    Phase3,
    Phase4,
    Sustain,
    Release,
    Dead,
}

/// Base amplitude 0..=255 for a partial.
pub fn calc_base_amp(level: u8, velo_sensitivity: u8, velocity: u8, part_volume: u8) -> u32 {
    let velocity = velocity.min(127) as i32;
    let sensitivity = velo_sensitivity.min(100) as i32 - 50;
    let velo_factor = if sensitivity >= 0 {
        127 - (127 - velocity) * sensitivity / 50
    } else {
        127 + velocity * sensitivity / 50
    };
    let amp = 255 * level.min(100) as i32 * part_volume.min(100) as i32 * velo_factor
        / (100 * 100 * 127);
    amp.max(0) as u32
}

#[derive(Debug, Clone)]
pub struct Tva {
    phase: TvaPhase,
    ramp: Ramp,
    param: TvaParam,
    times: [u32; 5],
    level: u8,
    velo_sensitivity: u8,
    velocity: u8,
    base_amp: u32,
    sustain: bool,
}

impl Default for Tva {
    fn default() -> Self {
        Self::new()
    }
}

impl Tva {
    pub fn new() -> Self {
        let param = crate::patch::PartialParam::default().tva;
        Self {
            phase: TvaPhase::Dead,
            ramp: Ramp::new(0),
            param,
            times: [0; 5],
            level: 0,
            velo_sensitivity: 50,
            velocity: 0,
            base_amp: 0,
            sustain: false,
        }
    }

    pub fn reset(&mut self, param: &TvaParam, key: u8, velocity: u8, part_volume: u8, sustain: bool) {
        self.param = *param;
        for (time, &t) in self.times.iter_mut().zip(param.env_time.iter()) {
            *time = env_time(t, param.env_time_keyfollow, key);
        }
        self.level = param.level;
        self.velo_sensitivity = param.velo_sensitivity;
        self.velocity = velocity;
        self.sustain = sustain;
        self.base_amp = calc_base_amp(param.level, param.velo_sensitivity, velocity, part_volume);
        self.ramp.reset(0);
        self.enter(TvaPhase::Attack);
    }

    pub fn phase(&self) -> TvaPhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.phase != TvaPhase::Dead
    }

    /// Recompute the base amplitude; a sustained note glides to the new level.
    pub fn set_part_volume(&mut self, part_volume: u8) {
        self.base_amp = calc_base_amp(self.level, self.velo_sensitivity, self.velocity, part_volume);
        if self.phase == TvaPhase::Sustain {
            self.ramp.start(self.level_amp(3), 32);
        }
    }

    /// Enter the release phase from wherever the envelope is.
    pub fn start_decay(&mut self) {
        if self.phase >= TvaPhase::Release {
            return;
        }
        self.enter(TvaPhase::Release);
    }

    /// Amplitude for the next sample, 0..=[`MAX_AMP`].
    pub fn next_amp(&mut self) -> u32 {
        if self.phase == TvaPhase::Dead {
            return 0;
        }
        if self.ramp.next_sample() {
            match self.phase {
                TvaPhase::Attack => self.enter(TvaPhase::Phase2),
                TvaPhase::Phase2 => self.enter(TvaPhase::Phase3),
                TvaPhase::Phase3 => self.enter(TvaPhase::Phase4),
                TvaPhase::Phase4 if self.sustain => self.phase = TvaPhase::Sustain,
                TvaPhase::Phase4 => self.enter(TvaPhase::Release),
                TvaPhase::Release => self.phase = TvaPhase::Dead,
                TvaPhase::Sustain | TvaPhase::Dead => {}
            }
        }
        self.ramp.value().clamp(0, MAX_AMP as i32) as u32
    }

    fn level_amp(&self, index: usize) -> i32 {
        let level = self.param.env_level[index].min(100) as u32;
        (self.base_amp * level * 256 / 100) as i32
    }

    fn enter(&mut self, phase: TvaPhase) {
        self.phase = phase;
        match phase {
            TvaPhase::Attack => self.ramp.start(self.level_amp(0), self.times[0]),
            TvaPhase::Phase2 => self.ramp.start(self.level_amp(1), self.times[1]),
            TvaPhase::Phase3 => self.ramp.start(self.level_amp(2), self.times[2]),
            TvaPhase::Phase4 => self.ramp.start(self.level_amp(3), self.times[3]),
            TvaPhase::Release => self.ramp.start(0, self.times[4]),
            TvaPhase::Sustain | TvaPhase::Dead => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::PartialParam;

    fn run_until_dead(tva: &mut Tva, limit: usize) -> Option<usize> {
        (0..limit).find(|_| {
            tva.next_amp();
            !tva.is_playing()
        })
    }

    #[test]
    fn base_amp_follows_velocity_sensitivity() {
        assert_eq!(calc_base_amp(100, 50, 0, 100), 255);
        assert_eq!(calc_base_amp(100, 100, 127, 100), 255);
        assert_eq!(calc_base_amp(100, 100, 0, 100), 0);
        assert_eq!(calc_base_amp(100, 0, 127, 100), 0);
        assert_eq!(calc_base_amp(50, 50, 64, 100), 127);
        assert_eq!(calc_base_amp(100, 50, 64, 0), 0);
    }

    #[test]
    fn sustains_until_released() {
        let param = PartialParam::default().tva;
        let mut tva = Tva::new();
        tva.reset(&param, 60, 100, 100, true);
        assert_eq!(tva.phase(), TvaPhase::Attack);
        for _ in 0..200_000 {
            tva.next_amp();
        }
        assert_eq!(tva.phase(), TvaPhase::Sustain);
        let sustain = tva.next_amp();
        assert_eq!(sustain, 255 * 70 * 256 / 100);

        tva.start_decay();
        assert_eq!(tva.phase(), TvaPhase::Release);
        assert!(run_until_dead(&mut tva, 10_000).is_some());
        assert_eq!(tva.next_amp(), 0);
    }

    #[test]
    fn non_sustaining_tone_releases_by_itself() {
        let param = PartialParam::default().tva;
        let mut tva = Tva::new();
        tva.reset(&param, 60, 100, 100, false);
        assert!(run_until_dead(&mut tva, 200_000).is_some());
    }

    #[test]
    fn attack_rises_to_first_level() {
        let mut param = PartialParam::default().tva;
        param.env_time[0] = 50;
        let mut tva = Tva::new();
        tva.reset(&param, 60, 127, 100, true);
        let early = tva.next_amp();
        for _ in 0..2000 {
            tva.next_amp();
        }
        let later = tva.next_amp();
        assert!(later > early);
        assert!(later <= MAX_AMP);
    }

    #[test]
    fn decay_is_idempotent() {
        let param = PartialParam::default().tva;
        let mut tva = Tva::new();
        tva.reset(&param, 60, 100, 100, true);
        tva.start_decay();
        tva.next_amp();
        tva.start_decay();
        assert_eq!(tva.phase(), TvaPhase::Release);
    }
}
