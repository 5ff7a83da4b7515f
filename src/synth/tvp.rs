//! Time-variant pitch.
//!
//! The pitch a partial plays is the sum of a static base (key, keyfollow,
//! coarse and fine tuning), the part's pitch bend, and a pitch envelope
//! whose levels sit around 50.

use crate::dsp::la32::{MAX_PITCH, MIDDLE_C_PITCH};
use crate::dsp::Ramp;
use crate::patch::{PitchEnvParam, WgParam};
use crate::synth::tables::{env_time, KEYFOLLOW};

/// Pitch units per octave.
pub const OCTAVE: i32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TvpPhase {
    Attack,
    Phase2,
    Phase3,
    Sustain,
    Release,
    Done,
}

/// Static pitch of a partial for `key`, before bend and envelope.
pub fn calc_base_pitch(wg: &WgParam, key: u8) -> i32 {
    let keyfollow = KEYFOLLOW[wg.pitch_keyfollow.min(16) as usize];
    let key_offset = (key as i32 - 60) * OCTAVE * keyfollow / (12 * 8);
    let coarse = (wg.pitch_coarse.min(96) as i32 - 36) * OCTAVE / 12;
    let fine = (wg.pitch_fine.min(100) as i32 - 50) * OCTAVE / 1200;
    MIDDLE_C_PITCH + key_offset + coarse + fine
}

#[derive(Debug, Clone)]
pub struct Tvp {
    phase: TvpPhase,
    ramp: Ramp,
    base_pitch: i32,
    bend: i32,
    bender_enabled: bool,
    /// Pitch units per envelope level step away from 50.
    depth: i32,
    levels: [u8; 5],
    times: [u32; 4],
}

impl Default for Tvp {
    fn default() -> Self {
        Self::new()
    }
}

impl Tvp {
    pub fn new() -> Self {
        Self {
            phase: TvpPhase::Done,
            ramp: Ramp::new(0),
            base_pitch: MIDDLE_C_PITCH,
            bend: 0,
            bender_enabled: false,
            depth: 0,
            levels: [50; 5],
            times: [0; 4],
        }
    }

    pub fn reset(&mut self, wg: &WgParam, env: &PitchEnvParam, key: u8, velocity: u8, bend: i32) {
        self.base_pitch = calc_base_pitch(wg, key);
        self.bender_enabled = wg.pitch_bender_enabled;
        self.bend = bend;

        // Velocity sensitivity trims the depth for soft notes.
        let sensitivity = env.velo_sensitivity.min(3) as i32;
        let velo_scale = 128 - (127 - velocity.min(127) as i32) * sensitivity / 4;
        self.depth = env.depth.min(10) as i32 * OCTAVE * velo_scale / (500 * 128);

        self.levels = env.level;
        for (time, &t) in self.times.iter_mut().zip(env.time.iter()) {
            *time = env_time(t, env.time_keyfollow, key);
        }
        self.ramp.reset(self.level_offset(0));
        self.enter(TvpPhase::Attack);
    }

    pub fn phase(&self) -> TvpPhase {
        self.phase
    }

    /// Bend in pitch units; ignored when the partial disables the bender.
    pub fn set_bend(&mut self, bend: i32) {
        self.bend = bend;
    }

    pub fn start_decay(&mut self) {
        if self.phase >= TvpPhase::Release {
            return;
        }
        self.enter(TvpPhase::Release);
    }

    pub fn next_pitch(&mut self) -> u16 {
        if self.ramp.next_sample() {
            match self.phase {
                TvpPhase::Attack => self.enter(TvpPhase::Phase2),
                TvpPhase::Phase2 => self.enter(TvpPhase::Phase3),
                TvpPhase::Phase3 => self.phase = TvpPhase::Sustain,
                TvpPhase::Release => self.phase = TvpPhase::Done,
                TvpPhase::Sustain | TvpPhase::Done => {}
            }
        }
        let bend = if self.bender_enabled { self.bend } else { 0 };
        (self.base_pitch + bend + self.ramp.value()).clamp(0, MAX_PITCH as i32) as u16
    }

    fn level_offset(&self, index: usize) -> i32 {
        (self.levels[index].min(100) as i32 - 50) * self.depth
    }

    fn enter(&mut self, phase: TvpPhase) {
        self.phase = phase;
        match phase {
            TvpPhase::Attack => self.ramp.start(self.level_offset(1), self.times[0]),
            TvpPhase::Phase2 => self.ramp.start(self.level_offset(2), self.times[1]),
            TvpPhase::Phase3 => self.ramp.start(self.level_offset(3), self.times[2]),
            TvpPhase::Release => self.ramp.start(self.level_offset(4), self.times[3]),
            TvpPhase::Sustain | TvpPhase::Done => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::PartialParam;

    #[test]
    fn base_pitch_tracks_keyboard() {
        let wg = PartialParam::default().wg;
        assert_eq!(calc_base_pitch(&wg, 60), MIDDLE_C_PITCH);
        assert_eq!(calc_base_pitch(&wg, 72), MIDDLE_C_PITCH + OCTAVE);
        assert_eq!(calc_base_pitch(&wg, 48), MIDDLE_C_PITCH - OCTAVE);

        let mut fixed = wg;
        fixed.pitch_keyfollow = 3;
        assert_eq!(calc_base_pitch(&fixed, 96), MIDDLE_C_PITCH);

        let mut coarse = wg;
        coarse.pitch_coarse = 48;
        assert_eq!(calc_base_pitch(&coarse, 60), MIDDLE_C_PITCH + OCTAVE);
    }

    #[test]
    fn flat_envelope_holds_base_pitch() {
        let param = PartialParam::default();
        let mut tvp = Tvp::new();
        tvp.reset(&param.wg, &param.pitch_env, 60, 100, 0);
        for _ in 0..1000 {
            assert_eq!(tvp.next_pitch(), MIDDLE_C_PITCH as u16);
        }
        assert_eq!(tvp.phase(), TvpPhase::Sustain);
    }

    #[test]
    fn bend_respects_bender_switch() {
        let param = PartialParam::default();
        let mut tvp = Tvp::new();
        tvp.reset(&param.wg, &param.pitch_env, 60, 100, 0);
        tvp.set_bend(OCTAVE / 6);
        assert_eq!(tvp.next_pitch(), (MIDDLE_C_PITCH + OCTAVE / 6) as u16);

        let mut wg = param.wg;
        wg.pitch_bender_enabled = false;
        tvp.reset(&wg, &param.pitch_env, 60, 100, OCTAVE / 6);
        assert_eq!(tvp.next_pitch(), MIDDLE_C_PITCH as u16);
    }

    #[test]
    fn envelope_starts_at_initial_level() {
        let mut param = PartialParam::default();
        param.pitch_env.depth = 10;
        param.pitch_env.level = [100, 50, 50, 50, 0];
        param.pitch_env.time = [60, 0, 0, 0];
        let mut tvp = Tvp::new();
        tvp.reset(&param.wg, &param.pitch_env, 60, 127, 0);
        let first = tvp.next_pitch() as i32;
        assert!(first > MIDDLE_C_PITCH + OCTAVE * 9 / 10);
        tvp.start_decay();
        for _ in 0..100 {
            tvp.next_pitch();
        }
        assert!((tvp.next_pitch() as i32) < MIDDLE_C_PITCH - OCTAVE / 2);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut param = PartialParam::default();
        param.wg.pitch_coarse = 96;
        let mut tvp = Tvp::new();
        tvp.reset(&param.wg, &param.pitch_env, 127, 100, 0);
        assert_eq!(tvp.next_pitch(), MAX_PITCH);
    }
}
