//! LA32 → DAC bit mapping.
//!
//! The LA32 output bus is narrower than the DAC input; each hardware
//! generation wires the bits differently. Generation 1 shifts after the
//! reverb, generation 2 before it.

use crate::config::DacInputMode;
use crate::dsp::sample::{clip_sample_ex, IntSample, IntSampleEx};

/// Applied to partial sums before they reach the reverb.
pub fn produce_la32_output(mode: DacInputMode, buffer: &mut [IntSample]) {
    match mode {
        DacInputMode::Nice => {
            for sample in buffer.iter_mut() {
                *sample = clip_sample_ex((*sample as IntSampleEx) << 1);
            }
        }
        DacInputMode::Generation2 => {
            for sample in buffer.iter_mut() {
                let s = *sample as u16;
                *sample = ((s & 0x8000) | ((s << 1) & 0x7FFE) | ((s >> 14) & 0x0001)) as i16;
            }
        }
        DacInputMode::Pure | DacInputMode::Generation1 => {}
    }
}

/// Applied to every stream after reverb processing.
pub fn convert_samples_to_output(mode: DacInputMode, buffer: &mut [IntSample]) {
    if mode == DacInputMode::Generation1 {
        for sample in buffer.iter_mut() {
            let s = *sample as u16;
            *sample = ((s & 0x8000) | ((s << 1) & 0x7FFE)) as i16;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nice_mode_doubles_and_saturates() {
        let mut buf = [100i16, -100, 20000, -20000];
        produce_la32_output(DacInputMode::Nice, &mut buf);
        assert_eq!(buf, [200, -200, i16::MAX, i16::MIN]);
        convert_samples_to_output(DacInputMode::Nice, &mut buf);
        assert_eq!(buf, [200, -200, i16::MAX, i16::MIN]);
    }

    #[test]
    fn generation1_wraps_instead_of_clipping() {
        let mut buf = [0x4000i16, -1, 3];
        produce_la32_output(DacInputMode::Generation1, &mut buf);
        assert_eq!(buf, [0x4000, -1, 3]);
        convert_samples_to_output(DacInputMode::Generation1, &mut buf);
        // 0x4000 << 1 loses bit 14 into the (kept) sign bit position.
        assert_eq!(buf, [0, -2, 6]);
    }

    #[test]
    fn generation2_copies_bit_14_into_lsb() {
        let mut buf = [0x4000i16, 0x0001, -1];
        produce_la32_output(DacInputMode::Generation2, &mut buf);
        assert_eq!(buf, [0x0001, 0x0002, -1]);
    }

    #[test]
    fn pure_mode_is_untouched() {
        let mut buf = [1234i16, -4321];
        produce_la32_output(DacInputMode::Pure, &mut buf);
        convert_samples_to_output(DacInputMode::Pure, &mut buf);
        assert_eq!(buf, [1234, -4321]);
    }
}
