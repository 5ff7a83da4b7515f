//! Time-variant filter cutoff.
//!
//! Produces a cutoff value 0..=255 per sample from a base cutoff, key
//! tracking and an envelope added on top. Resonance is not modelled.

use crate::dsp::Ramp;
use crate::patch::TvfParam;
use crate::synth::tables::{env_time, KEYFOLLOW};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TvfPhase {
    Attack,
    Phase2,
    Phase3,
    Phase4,
    Sustain,
    Release,
    Done,
}

pub fn calc_base_cutoff(param: &TvfParam, key: u8) -> i32 {
    let keyfollow = KEYFOLLOW[param.keyfollow.min(16) as usize];
    let key_offset = (key as i32 - 60) * keyfollow * 2 / 8;
    (param.cutoff.min(100) as i32 * 255 / 100 + key_offset).clamp(0, 255)
}

#[derive(Debug, Clone)]
pub struct Tvf {
    phase: TvfPhase,
    ramp: Ramp,
    base_cutoff: i32,
    /// Envelope depth after velocity scaling, 0..=100.
    depth: i32,
    levels: [u8; 4],
    times: [u32; 5],
}

impl Default for Tvf {
    fn default() -> Self {
        Self::new()
    }
}

impl Tvf {
    pub fn new() -> Self {
        Self {
            phase: TvfPhase::Done,
            ramp: Ramp::new(0),
            base_cutoff: 255,
            depth: 0,
            levels: [0; 4],
            times: [0; 5],
        }
    }

    pub fn reset(&mut self, param: &TvfParam, key: u8, velocity: u8) {
        self.base_cutoff = calc_base_cutoff(param, key);
        let sensitivity = param.env_velo_sensitivity.min(100) as i32;
        let velo_factor = 127 - (127 - velocity.min(127) as i32) * sensitivity / 100;
        self.depth = param.env_depth.min(100) as i32 * velo_factor / 127;
        self.levels = param.env_level;
        for (time, &t) in self.times.iter_mut().zip(param.env_time.iter()) {
            *time = env_time(t, 0, key);
        }
        self.ramp.reset(0);
        self.enter(TvfPhase::Attack);
    }

    pub fn phase(&self) -> TvfPhase {
        self.phase
    }

    pub fn base_cutoff(&self) -> i32 {
        self.base_cutoff
    }

    pub fn start_decay(&mut self) {
        if self.phase >= TvfPhase::Release {
            return;
        }
        self.enter(TvfPhase::Release);
    }

    pub fn next_cutoff(&mut self) -> u8 {
        if self.ramp.next_sample() {
            match self.phase {
                TvfPhase::Attack => self.enter(TvfPhase::Phase2),
                TvfPhase::Phase2 => self.enter(TvfPhase::Phase3),
                TvfPhase::Phase3 => self.enter(TvfPhase::Phase4),
                TvfPhase::Phase4 => self.phase = TvfPhase::Sustain,
                TvfPhase::Release => self.phase = TvfPhase::Done,
                TvfPhase::Sustain | TvfPhase::Done => {}
            }
        }
        (self.base_cutoff + self.ramp.value()).clamp(0, 255) as u8
    }

    fn level_offset(&self, index: usize) -> i32 {
        self.levels[index].min(100) as i32 * self.depth * 255 / 10_000
    }

    fn enter(&mut self, phase: TvfPhase) {
        self.phase = phase;
        match phase {
            TvfPhase::Attack => self.ramp.start(self.level_offset(0), self.times[0]),
            TvfPhase::Phase2 => self.ramp.start(self.level_offset(1), self.times[1]),
            TvfPhase::Phase3 => self.ramp.start(self.level_offset(2), self.times[2]),
            TvfPhase::Phase4 => self.ramp.start(self.level_offset(3), self.times[3]),
            TvfPhase::Release => self.ramp.start(0, self.times[4]),
            TvfPhase::Sustain | TvfPhase::Done => {}
        }
    }
}
