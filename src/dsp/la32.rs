//! LA32 wave generation.
//!
//! Each partial drives one half of an [`La32PartialPair`]. A pair is two wave
//! generators (master and slave) plus the mixer that either sums them or
//! ring-modulates the slave onto the master.
//!
//! ```text
//!   master ──┬──────────────────────(+)──► out   mixed ring
//!            └──► (×) ring ─────────┘
//!   slave  ─────┘
//! ```
//!
//! Pitch is expressed in LA32 units: 4096 per octave, where a value `p`
//! corresponds to `2^(p / 4096 - 16) * 32000` Hz.

use once_cell::sync::Lazy;

use crate::dsp::sample::{clip_sample_ex, IntSample, IntSampleEx};

/// Highest pitch the TVP may request.
pub const MAX_PITCH: u16 = 59392;
/// Pitch at which PCM samples play back at their recorded rate (C4).
pub const MIDDLE_C_PITCH: i32 = 37133;
/// Peak level of a raw synth waveform before amplification.
pub const WAVE_AMPLITUDE: i32 = 8191;

/// `EXP2_TABLE[i] = 2^(16 + i / 4096)`, rounded.
static EXP2_TABLE: Lazy<[u32; 4096]> = Lazy::new(|| {
    let mut table = [0u32; 4096];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = (65536.0 * (i as f64 / 4096.0).exp2()).round() as u32;
    }
    table
});

/// Phase increment of a 32-bit accumulator: one full wrap per wave cycle.
pub fn pitch_to_phase_increment(pitch: u16) -> u32 {
    let pitch = pitch.min(MAX_PITCH) as u32;
    EXP2_TABLE[(pitch & 4095) as usize] << (pitch >> 12)
}

/// PCM read step in 16.16 fixed point, 1.0 at [`MIDDLE_C_PITCH`].
pub fn pcm_step(pitch: u16) -> u64 {
    let d = (pitch as i32 - MIDDLE_C_PITCH + 65536).max(0) as u32;
    ((EXP2_TABLE[(d & 4095) as usize] as u64) << (d >> 12)) >> 16
}

/// Which of the two generators in a pair a partial drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairHalf {
    Master,
    Slave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaveSource {
    Synth { sawtooth: bool, pulse_threshold: u32 },
    Pcm { addr: usize, len: usize, looped: bool },
}

#[derive(Debug, Clone, Copy)]
struct WaveGenerator {
    active: bool,
    source: WaveSource,
    phase: u32,
    smoothed: IntSampleEx,
    pcm_position: u64,
    out: IntSampleEx,
}

impl WaveGenerator {
    fn new() -> Self {
        Self {
            active: false,
            source: WaveSource::Synth {
                sawtooth: false,
                pulse_threshold: 0x8000_0000,
            },
            phase: 0,
            smoothed: 0,
            pcm_position: 0,
            out: 0,
        }
    }

    fn init(&mut self, source: WaveSource) {
        *self = Self::new();
        self.source = source;
        self.active = true;
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.out = 0;
    }

    fn generate_next_sample(&mut self, amp: u32, pitch: u16, cutoff: u8, pcm: &[i16]) {
        if !self.active {
            self.out = 0;
            return;
        }
        let raw = match self.source {
            WaveSource::Synth {
                sawtooth,
                pulse_threshold,
            } => {
                self.phase = self.phase.wrapping_add(pitch_to_phase_increment(pitch));
                let raw = if sawtooth {
                    ((self.phase >> 16) as IntSampleEx - 32768) * WAVE_AMPLITUDE / 32768
                } else if self.phase < pulse_threshold {
                    WAVE_AMPLITUDE
                } else {
                    -WAVE_AMPLITUDE
                };
                // One-pole smoothing; cutoff 255 passes the raw wave.
                let k = cutoff as IntSampleEx + 1;
                self.smoothed += ((raw - self.smoothed) * k) >> 8;
                self.smoothed
            }
            WaveSource::Pcm { addr, len, looped } => {
                let mut index = (self.pcm_position >> 16) as usize;
                if index >= len {
                    if !looped || len == 0 {
                        self.deactivate();
                        return;
                    }
                    self.pcm_position %= (len as u64) << 16;
                    index = (self.pcm_position >> 16) as usize;
                }
                self.pcm_position += pcm_step(pitch);
                (pcm.get(addr + index).copied().unwrap_or(0) as IntSampleEx) >> 2
            }
        };
        self.out = (raw * (amp >> 8) as IntSampleEx) >> 8;
    }
}

/// Duty threshold of the square wave for a pulse width of 0..=100.
/// 0 is a symmetric square, 100 is a 6% pulse.
fn pulse_threshold(pulse_width: u8) -> u32 {
    let pw = pulse_width.min(100) as u64;
    (0x8000_0000u64 - 0x8000_0000u64 * pw * 44 / 5000) as u32
}

#[derive(Debug, Clone, Copy)]
pub struct La32PartialPair {
    master: WaveGenerator,
    slave: WaveGenerator,
    ring_modulated: bool,
    mixed: bool,
}

impl Default for La32PartialPair {
    fn default() -> Self {
        Self::new()
    }
}

impl La32PartialPair {
    pub fn new() -> Self {
        Self {
            master: WaveGenerator::new(),
            slave: WaveGenerator::new(),
            ring_modulated: false,
            mixed: false,
        }
    }

    /// Configure the mixer. `mixed` keeps the master audible next to the
    /// ring product.
    pub fn init(&mut self, ring_modulated: bool, mixed: bool) {
        self.ring_modulated = ring_modulated;
        self.mixed = mixed;
    }

    pub fn init_synth(&mut self, half: PairHalf, sawtooth: bool, pulse_width: u8) {
        self.generator_mut(half).init(WaveSource::Synth {
            sawtooth,
            pulse_threshold: pulse_threshold(pulse_width),
        });
    }

    pub fn init_pcm(&mut self, half: PairHalf, addr: usize, len: usize, looped: bool) {
        self.generator_mut(half)
            .init(WaveSource::Pcm { addr, len, looped });
    }

    /// `amp` is 0..=0xFF00, `cutoff` 0..=255.
    pub fn generate_next_sample(
        &mut self,
        half: PairHalf,
        amp: u32,
        pitch: u16,
        cutoff: u8,
        pcm: &[i16],
    ) {
        self.generator_mut(half)
            .generate_next_sample(amp, pitch, cutoff, pcm);
    }

    /// Combine the latest master and slave samples.
    pub fn next_out_sample(&self) -> IntSample {
        let master = self.master.out;
        let slave = self.slave.out;
        if !self.ring_modulated {
            return clip_sample_ex(master + slave);
        }
        let ring = if self.slave.active {
            (master * slave) >> 13
        } else {
            0
        };
        if self.mixed {
            clip_sample_ex(master + ring)
        } else {
            clip_sample_ex(ring)
        }
    }

    pub fn deactivate(&mut self, half: PairHalf) {
        self.generator_mut(half).deactivate();
    }

    pub fn is_active(&self, half: PairHalf) -> bool {
        match half {
            PairHalf::Master => self.master.active,
            PairHalf::Slave => self.slave.active,
        }
    }

    fn generator_mut(&mut self, half: PairHalf) -> &mut WaveGenerator {
        match half {
            PairHalf::Master => &mut self.master,
            PairHalf::Slave => &mut self.slave,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A4_PITCH: u16 = 40205;

    #[test]
    fn phase_increment_tracks_frequency() {
        // 440 Hz at 32 kHz wraps a 32-bit phase every 72.7 samples.
        let expected = (440.0 / 32000.0 * 4294967296.0) as i64;
        let got = pitch_to_phase_increment(A4_PITCH) as i64;
        assert!((got - expected).abs() < expected / 1000, "{got} vs {expected}");
        assert_eq!(
            pitch_to_phase_increment(A4_PITCH + 4096),
            pitch_to_phase_increment(A4_PITCH) * 2
        );
    }

    #[test]
    fn pcm_step_is_unity_at_middle_c() {
        assert_eq!(pcm_step(MIDDLE_C_PITCH as u16), 65536);
        assert_eq!(pcm_step(MIDDLE_C_PITCH as u16 + 4096), 131072);
        assert_eq!(pcm_step(MIDDLE_C_PITCH as u16 - 4096), 32768);
    }

    #[test]
    fn inactive_pair_is_silent() {
        let pair = La32PartialPair::new();
        assert_eq!(pair.next_out_sample(), 0);
    }

    #[test]
    fn square_wave_alternates_sign() {
        let mut pair = La32PartialPair::new();
        pair.init(false, false);
        pair.init_synth(PairHalf::Master, false, 0);
        let mut positive = 0;
        let mut negative = 0;
        for _ in 0..3200 {
            pair.generate_next_sample(PairHalf::Master, 0xFF00, A4_PITCH, 255, &[]);
            let s = pair.next_out_sample();
            if s > 4000 {
                positive += 1;
            } else if s < -4000 {
                negative += 1;
            }
        }
        assert!((1500..=1700).contains(&positive), "{positive}");
        assert!((1500..=1700).contains(&negative), "{negative}");
    }

    #[test]
    fn pcm_one_shot_stops_at_end() {
        let rom = [4000i16; 8];
        let mut pair = La32PartialPair::new();
        pair.init_pcm(PairHalf::Master, 2, 4, false);
        for _ in 0..4 {
            pair.generate_next_sample(PairHalf::Master, 0xFF00, MIDDLE_C_PITCH as u16, 0, &rom);
            assert!(pair.next_out_sample() > 0);
        }
        pair.generate_next_sample(PairHalf::Master, 0xFF00, MIDDLE_C_PITCH as u16, 0, &rom);
        assert!(!pair.is_active(PairHalf::Master));
        assert_eq!(pair.next_out_sample(), 0);
    }

    #[test]
    fn pcm_loop_keeps_playing() {
        let rom = [1000i16, 2000, 3000];
        let mut pair = La32PartialPair::new();
        pair.init_pcm(PairHalf::Master, 0, 3, true);
        for _ in 0..10 {
            pair.generate_next_sample(PairHalf::Master, 0xFF00, MIDDLE_C_PITCH as u16, 0, &rom);
        }
        assert!(pair.is_active(PairHalf::Master));
    }

    #[test]
    fn ring_modulation_without_slave_is_silent() {
        let mut pair = La32PartialPair::new();
        pair.init(true, false);
        pair.init_synth(PairHalf::Master, false, 0);
        pair.generate_next_sample(PairHalf::Master, 0xFF00, A4_PITCH, 255, &[]);
        assert_eq!(pair.next_out_sample(), 0);

        // Mixed ring keeps the master.
        pair.init(true, true);
        assert!(pair.next_out_sample() != 0);
    }

    #[test]
    fn ring_product_of_two_squares() {
        let mut pair = La32PartialPair::new();
        pair.init(true, false);
        pair.init_synth(PairHalf::Master, false, 0);
        pair.init_synth(PairHalf::Slave, false, 0);
        pair.generate_next_sample(PairHalf::Master, 0xFF00, A4_PITCH, 255, &[]);
        pair.generate_next_sample(PairHalf::Slave, 0xFF00, A4_PITCH, 255, &[]);
        let m = pair.master.out;
        let s = pair.slave.out;
        assert_eq!(pair.next_out_sample() as i32, (m * s) >> 13);
    }
}
