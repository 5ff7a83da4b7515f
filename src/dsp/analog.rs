//! Analog output circuit: mixes the DAC streams and emulates the post-DAC
//! low-pass filter.
//!
//! | mode        | filter                       | output rate |
//! | ----------- | ---------------------------- | ----------- |
//! | DigitalOnly | none                         | 32 kHz      |
//! | Coarse      | 9-tap FIR                    | 32 kHz      |
//! | Accurate    | 3x polyphase FIR, decimate 2 | 48 kHz      |
//! | Oversampled | 3x polyphase FIR             | 96 kHz      |
//!
//! The coarse taps model the measured circuit response. The accurate and
//! oversampled taps are a Blackman-windowed sinc stand-in with a similar
//! cutoff, not hardware-derived coefficients.

use std::f32::consts::PI;

use once_cell::sync::Lazy;

use crate::config::AnalogOutputMode;
use crate::dsp::sample::{clip_sample_ex, IntSample, IntSampleEx};
use crate::SAMPLE_RATE;

/// Reverb output of the CM-32L is quieter relative to the LA32 output.
const CM32L_REVERB_TO_LA32_ANALOG_OUTPUT_GAIN_FACTOR: f32 = 0.68;

const COARSE_LPF_DELAY_LINE_LENGTH: usize = 8;
const COARSE_LPF_INT_FRACTION_BITS: u32 = 14;
// Sample-and-hold plus LPF impulse response, scaled by 1 << 14.
const COARSE_LPF_INT_TAPS_MT32: [IntSampleEx; COARSE_LPF_DELAY_LINE_LENGTH + 1] =
    [20848, -3609, -2589, 2943, -1827, 887, -385, 180, -114];
const COARSE_LPF_INT_TAPS_CM32L: [IntSampleEx; COARSE_LPF_DELAY_LINE_LENGTH + 1] =
    [21965, -6608, 590, 1084, -1142, 812, -510, 314, -204];

const ACCURATE_LPF_NUMBER_OF_PHASES: u32 = 3;
const ACCURATE_LPF_DELAY_LINE_LENGTH: usize = 16;
const ACCURATE_LPF_NUMBER_OF_TAPS: usize =
    ACCURATE_LPF_NUMBER_OF_PHASES as usize * ACCURATE_LPF_DELAY_LINE_LENGTH + 1;
const ACCURATE_LPF_PHASE_INCREMENT_REGULAR: u32 = 2;
const ACCURATE_LPF_PHASE_INCREMENT_OVERSAMPLED: u32 = 1;

// Stand-in windowed-sinc taps at 96 kHz. The later generation has a slightly wider passband.
static ACCURATE_LPF_TAPS_MT32: Lazy<[f32; ACCURATE_LPF_NUMBER_OF_TAPS]> =
    Lazy::new(|| design_accurate_taps(13_000.0));
static ACCURATE_LPF_TAPS_CM32L: Lazy<[f32; ACCURATE_LPF_NUMBER_OF_TAPS]> =
    Lazy::new(|| design_accurate_taps(14_500.0));

fn design_accurate_taps(cutoff_hz: f32) -> [f32; ACCURATE_LPF_NUMBER_OF_TAPS] {
    let oversampled_rate = (SAMPLE_RATE * ACCURATE_LPF_NUMBER_OF_PHASES) as f32;
    let fc = cutoff_hz / oversampled_rate;
    let centre = (ACCURATE_LPF_NUMBER_OF_TAPS - 1) as f32 / 2.0;
    let last = (ACCURATE_LPF_NUMBER_OF_TAPS - 1) as f32;
    let mut taps = [0.0f32; ACCURATE_LPF_NUMBER_OF_TAPS];
    for (n, tap) in taps.iter_mut().enumerate() {
        let x = n as f32 - centre;
        let sinc = if x == 0.0 {
            2.0 * fc
        } else {
            (2.0 * PI * fc * x).sin() / (PI * x)
        };
        // Blackman window
        let w = 0.42 - 0.5 * (2.0 * PI * n as f32 / last).cos()
            + 0.08 * (4.0 * PI * n as f32 / last).cos();
        *tap = sinc * w;
    }
    let sum: f32 = taps.iter().sum();
    for tap in taps.iter_mut() {
        *tap /= sum;
    }
    taps
}

pub struct CoarseLowPassFilter {
    taps: &'static [IntSampleEx; COARSE_LPF_DELAY_LINE_LENGTH + 1],
    ring: [IntSampleEx; COARSE_LPF_DELAY_LINE_LENGTH],
    position: usize,
}

impl CoarseLowPassFilter {
    pub fn new(old_mt32_analog_lpf: bool) -> Self {
        Self {
            taps: if old_mt32_analog_lpf {
                &COARSE_LPF_INT_TAPS_MT32
            } else {
                &COARSE_LPF_INT_TAPS_CM32L
            },
            ring: [0; COARSE_LPF_DELAY_LINE_LENGTH],
            position: 0,
        }
    }

    pub fn process(&mut self, input: IntSampleEx) -> IntSampleEx {
        const MASK: usize = COARSE_LPF_DELAY_LINE_LENGTH - 1;
        let mut sample = self.taps[COARSE_LPF_DELAY_LINE_LENGTH] * self.ring[self.position];
        self.ring[self.position] = clip_sample_ex(input) as IntSampleEx;
        for i in 0..COARSE_LPF_DELAY_LINE_LENGTH {
            sample += self.taps[i] * self.ring[(i + self.position) & MASK];
        }
        self.position = self.position.wrapping_sub(1) & MASK;
        sample >> COARSE_LPF_INT_FRACTION_BITS
    }
}

/// Polyphase interpolator. Produces 3 outputs per input, of which every
/// `phase_increment`-th is kept.
pub struct AccurateLowPassFilter {
    taps: &'static [f32; ACCURATE_LPF_NUMBER_OF_TAPS],
    ring: [f32; ACCURATE_LPF_DELAY_LINE_LENGTH],
    position: usize,
    phase: u32,
    phase_increment: u32,
}

impl AccurateLowPassFilter {
    pub fn new(old_mt32_analog_lpf: bool, oversample: bool) -> Self {
        let taps: &'static [f32; ACCURATE_LPF_NUMBER_OF_TAPS] = if old_mt32_analog_lpf {
            &*ACCURATE_LPF_TAPS_MT32
        } else {
            &*ACCURATE_LPF_TAPS_CM32L
        };
        Self {
            taps,
            ring: [0.0; ACCURATE_LPF_DELAY_LINE_LENGTH],
            position: 0,
            phase: 0,
            phase_increment: if oversample {
                ACCURATE_LPF_PHASE_INCREMENT_OVERSAMPLED
            } else {
                ACCURATE_LPF_PHASE_INCREMENT_REGULAR
            },
        }
    }

    /// The next output can be computed without a new input sample.
    pub fn has_next_sample(&self) -> bool {
        self.phase >= self.phase_increment
    }

    pub fn process(&mut self, input: IntSampleEx) -> IntSampleEx {
        const MASK: usize = ACCURATE_LPF_DELAY_LINE_LENGTH - 1;
        let mut sample = if self.phase == 0 {
            self.taps[ACCURATE_LPF_NUMBER_OF_TAPS - 1] * self.ring[self.position]
        } else {
            0.0
        };
        if !self.has_next_sample() {
            self.ring[self.position] = input as f32;
        }
        let mut tap = self.phase as usize;
        for delay in 0..ACCURATE_LPF_DELAY_LINE_LENGTH {
            sample += self.taps[tap] * self.ring[(delay + self.position) & MASK];
            tap += ACCURATE_LPF_NUMBER_OF_PHASES as usize;
        }
        self.phase += self.phase_increment;
        if self.phase >= ACCURATE_LPF_NUMBER_OF_PHASES {
            self.phase -= ACCURATE_LPF_NUMBER_OF_PHASES;
            self.position = self.position.wrapping_sub(1) & MASK;
        }
        (ACCURATE_LPF_NUMBER_OF_PHASES as f32 * sample) as IntSampleEx
    }

    /// Input samples consumed while producing `output_length` outputs.
    pub fn inputs_needed(&self, output_length: usize) -> usize {
        let mut phase = self.phase;
        let mut needed = 0;
        for _ in 0..output_length {
            if phase < self.phase_increment {
                needed += 1;
            }
            phase += self.phase_increment;
            if phase >= ACCURATE_LPF_NUMBER_OF_PHASES {
                phase -= ACCURATE_LPF_NUMBER_OF_PHASES;
            }
        }
        needed
    }
}

pub enum LowPassFilter {
    Null,
    Coarse(CoarseLowPassFilter),
    Accurate(AccurateLowPassFilter),
}

impl LowPassFilter {
    pub fn create(mode: AnalogOutputMode, old_mt32_analog_lpf: bool) -> Self {
        match mode {
            AnalogOutputMode::DigitalOnly => LowPassFilter::Null,
            AnalogOutputMode::Coarse => {
                LowPassFilter::Coarse(CoarseLowPassFilter::new(old_mt32_analog_lpf))
            }
            AnalogOutputMode::Accurate => {
                LowPassFilter::Accurate(AccurateLowPassFilter::new(old_mt32_analog_lpf, false))
            }
            AnalogOutputMode::Oversampled => {
                LowPassFilter::Accurate(AccurateLowPassFilter::new(old_mt32_analog_lpf, true))
            }
        }
    }

    pub fn has_next_sample(&self) -> bool {
        match self {
            LowPassFilter::Accurate(lpf) => lpf.has_next_sample(),
            _ => false,
        }
    }

    pub fn process(&mut self, input: IntSampleEx) -> IntSampleEx {
        match self {
            LowPassFilter::Null => input,
            LowPassFilter::Coarse(lpf) => lpf.process(input),
            LowPassFilter::Accurate(lpf) => lpf.process(input),
        }
    }

    fn inputs_needed(&self, output_length: usize) -> usize {
        match self {
            LowPassFilter::Accurate(lpf) => lpf.inputs_needed(output_length),
            _ => output_length,
        }
    }
}

/// The six DAC-rate streams consumed by [`Analog::process`].
#[derive(Clone, Copy)]
pub struct DacStreams<'a> {
    pub non_reverb_left: &'a [IntSample],
    pub non_reverb_right: &'a [IntSample],
    pub reverb_dry_left: &'a [IntSample],
    pub reverb_dry_right: &'a [IntSample],
    pub reverb_wet_left: &'a [IntSample],
    pub reverb_wet_right: &'a [IntSample],
}

pub struct Analog {
    mode: AnalogOutputMode,
    left: LowPassFilter,
    right: LowPassFilter,
    synth_gain: IntSampleEx,
    reverb_gain: IntSampleEx,
}

impl Analog {
    pub fn new(mode: AnalogOutputMode, old_mt32_analog_lpf: bool) -> Self {
        Self {
            mode,
            left: LowPassFilter::create(mode, old_mt32_analog_lpf),
            right: LowPassFilter::create(mode, old_mt32_analog_lpf),
            synth_gain: 256,
            reverb_gain: 256,
        }
    }

    pub fn mode(&self) -> AnalogOutputMode {
        self.mode
    }

    pub fn get_output_sample_rate(&self) -> u32 {
        match self.mode {
            AnalogOutputMode::Accurate => SAMPLE_RATE * 3 / 2,
            AnalogOutputMode::Oversampled => SAMPLE_RATE * 3,
            AnalogOutputMode::DigitalOnly | AnalogOutputMode::Coarse => SAMPLE_RATE,
        }
    }

    /// DAC-rate samples needed to produce `output_length` output frames.
    pub fn get_dac_streams_length(&self, output_length: usize) -> usize {
        self.left.inputs_needed(output_length)
    }

    pub fn set_synth_output_gain(&mut self, gain: f32) {
        self.synth_gain = gain_to_fixed(gain);
    }

    /// The gain is pre-scaled for the CM-32L unless MT-32 reverb compatibility is on.
    pub fn set_reverb_output_gain(&mut self, gain: f32, mt32_reverb_compatibility: bool) {
        let gain = if mt32_reverb_compatibility {
            gain
        } else {
            gain * CM32L_REVERB_TO_LA32_ANALOG_OUTPUT_GAIN_FACTOR
        };
        self.reverb_gain = gain_to_fixed(gain);
    }

    /// Mix the streams and filter them into interleaved stereo `out`.
    ///
    /// Streams must hold at least `get_dac_streams_length(out.len() / 2)`
    /// samples; missing samples read as silence.
    pub fn process(&mut self, out: &mut [IntSample], streams: DacStreams<'_>) {
        let mut consumed = 0;
        for frame in out.chunks_exact_mut(2) {
            let (out_l, out_r) = if self.left.has_next_sample() {
                (self.left.process(0), self.right.process(0))
            } else {
                let at = |s: &[IntSample]| s.get(consumed).copied().unwrap_or(0) as IntSampleEx;
                let in_l = (((at(streams.non_reverb_left) + at(streams.reverb_dry_left))
                    * self.synth_gain)
                    >> 8)
                    + ((at(streams.reverb_wet_left) * self.reverb_gain) >> 8);
                let in_r = (((at(streams.non_reverb_right) + at(streams.reverb_dry_right))
                    * self.synth_gain)
                    >> 8)
                    + ((at(streams.reverb_wet_right) * self.reverb_gain) >> 8);
                consumed += 1;
                (self.left.process(in_l), self.right.process(in_r))
            };
            frame[0] = clip_sample_ex(out_l);
            frame[1] = clip_sample_ex(out_r);
        }
    }
}

fn gain_to_fixed(gain: f32) -> IntSampleEx {
    (gain.max(0.0) * 256.0).min(i16::MAX as f32) as IntSampleEx
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::{num_complex::Complex, FftPlanner};

    fn streams<'a>(dry: &'a [IntSample], wet: &'a [IntSample], zero: &'a [IntSample]) -> DacStreams<'a> {
        DacStreams {
            non_reverb_left: dry,
            non_reverb_right: dry,
            reverb_dry_left: zero,
            reverb_dry_right: zero,
            reverb_wet_left: wet,
            reverb_wet_right: wet,
        }
    }

    #[test]
    fn digital_only_mixes_with_gains() {
        let mut analog = Analog::new(AnalogOutputMode::DigitalOnly, false);
        analog.set_synth_output_gain(1.0);
        analog.set_reverb_output_gain(0.5, true);
        let dry = [1000i16; 4];
        let wet = [400i16; 4];
        let zero = [0i16; 4];
        let mut out = [0i16; 8];
        analog.process(&mut out, streams(&dry, &wet, &zero));
        assert_eq!(out, [1200; 8]);
    }

    #[test]
    fn cm32l_reverb_gain_is_scaled_down() {
        let mut analog = Analog::new(AnalogOutputMode::DigitalOnly, false);
        analog.set_reverb_output_gain(1.0, false);
        let wet = [1000i16; 2];
        let zero = [0i16; 2];
        let mut out = [0i16; 4];
        analog.process(&mut out, streams(&zero, &wet, &zero));
        // 0.68 * 256 = 174.08 -> 174
        assert_eq!(out[0], ((1000i32 * 174) >> 8) as i16);
    }

    #[test]
    fn accurate_taps_are_linear_phase_and_normalized() {
        for taps in [&*ACCURATE_LPF_TAPS_MT32, &*ACCURATE_LPF_TAPS_CM32L] {
            let sum: f32 = taps.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4);
            for n in 0..ACCURATE_LPF_NUMBER_OF_TAPS / 2 {
                assert!((taps[n] - taps[ACCURATE_LPF_NUMBER_OF_TAPS - 1 - n]).abs() < 1e-6);
            }
        }
        let centre = ACCURATE_LPF_NUMBER_OF_TAPS / 2;
        assert_ne!(ACCURATE_LPF_TAPS_MT32[centre], ACCURATE_LPF_TAPS_CM32L[centre]);
    }

    #[test]
    fn coarse_filter_has_near_unity_dc_gain() {
        for old in [false, true] {
            let mut analog = Analog::new(AnalogOutputMode::Coarse, old);
            let dry = [1000i16; 32];
            let zero = [0i16; 32];
            let mut out = [0i16; 64];
            analog.process(&mut out, streams(&dry, &zero, &zero));
            let settled = out[40];
            assert!((990..=1000).contains(&settled), "{settled}");
        }
    }

    #[test]
    fn output_rates_and_stream_lengths() {
        let analog = Analog::new(AnalogOutputMode::Coarse, false);
        assert_eq!(analog.get_output_sample_rate(), 32_000);
        assert_eq!(analog.get_dac_streams_length(100), 100);

        let analog = Analog::new(AnalogOutputMode::Accurate, false);
        assert_eq!(analog.get_output_sample_rate(), 48_000);
        assert_eq!(analog.get_dac_streams_length(3), 2);
        assert_eq!(analog.get_dac_streams_length(300), 200);

        let analog = Analog::new(AnalogOutputMode::Oversampled, false);
        assert_eq!(analog.get_output_sample_rate(), 96_000);
        assert_eq!(analog.get_dac_streams_length(300), 100);
    }

    #[test]
    fn accurate_mode_consumes_exactly_the_reported_length() {
        let mut analog = Analog::new(AnalogOutputMode::Accurate, false);
        let mut out = [0i16; 2 * 7];
        let dry = [100i16; 16];
        let zero = [0i16; 16];
        // Offset the phase first, then check the prediction matches consumption.
        analog.process(&mut out, streams(&dry, &zero, &zero));
        let predicted = analog.get_dac_streams_length(7);
        assert_eq!(analog.left.inputs_needed(7), predicted);
        let mut consumed = 0;
        for _ in 0..7 {
            if !analog.left.has_next_sample() {
                consumed += 1;
            }
            analog.left.process(0);
        }
        assert_eq!(consumed, predicted);
    }

    #[test]
    fn oversampled_filter_rejects_images() {
        let mut analog = Analog::new(AnalogOutputMode::Oversampled, false);
        let mut dry = [0i16; 64];
        dry[0] = 10_000;
        let zero = [0i16; 64];
        let mut out = [0i16; 2 * 192];
        analog.process(&mut out, streams(&dry, &zero, &zero));

        let mut spectrum: Vec<Complex<f32>> = out
            .chunks_exact(2)
            .map(|f| Complex::new(f[0] as f32, 0.0))
            .collect();
        FftPlanner::new().plan_fft_forward(spectrum.len()).process(&mut spectrum);

        // 192 bins over 96 kHz: bin 2 = 1 kHz, bin 64 = 32 kHz (first image of DC).
        let passband = spectrum[2].norm();
        let image = spectrum[64].norm();
        assert!(passband > 5_000.0, "{passband}");
        assert!(image < passband * 0.05, "{image} vs {passband}");
    }
}
