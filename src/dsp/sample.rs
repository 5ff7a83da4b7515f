//! Sample formats and the fixed-point arithmetic shared by the DSP stages.
//!
//! The LA32 and Boss chips both work on 16-bit signed samples. Intermediate
//! sums are carried in 32 bits and saturated back to 16 bits only at the
//! points where the hardware adders clip.

/// 16-bit signed sample as produced by the LA32 and consumed by the DAC.
pub type IntSample = i16;
/// Widened sample used for intermediate sums.
pub type IntSampleEx = i32;

/// Saturate a widened sample to the 16-bit range.
#[inline]
pub fn clip_sample_ex(sample: IntSampleEx) -> IntSample {
    sample.clamp(i16::MIN as i32, i16::MAX as i32) as IntSample
}

/// Saturating add of one 16-bit sample into an accumulator slot.
#[inline]
pub fn mix_sample(acc: &mut IntSample, sample: IntSampleEx) {
    *acc = clip_sample_ex(*acc as IntSampleEx + sample);
}

/// Bit-serial reproduction of the Boss chip multiplier.
///
/// For each bit of `add_mask` (MSB first) the sample is shifted right by one
/// and accumulated when the bit is set. While the sample is negative and the
/// matching bit of `carry_mask` is set, the bit shifted out is carried into
/// that accumulation step.
#[inline]
pub fn weird_mul_precise(sample: i32, add_mask: u8, carry_mask: u8) -> i32 {
    let mut sample = sample;
    let mut mask: u8 = 0x80;
    let mut res = 0i32;
    for _ in 0..8 {
        let carry = if sample < 0 && (mask & carry_mask) != 0 {
            sample & 1
        } else {
            0
        };
        sample >>= 1;
        if mask & add_mask != 0 {
            res += sample + carry;
        }
        mask >>= 1;
    }
    res
}

/// Plain `(sample * add_mask) >> 8`, ignoring the carry behaviour.
#[inline]
pub fn weird_mul_fast(sample: i32, add_mask: u8, _carry_mask: u8) -> i32 {
    (sample * add_mask as i32) >> 8
}

/// The multiplier selected for the integer renderer.
#[inline]
pub fn weird_mul(sample: i32, add_mask: u8, carry_mask: u8) -> i32 {
    #[cfg(feature = "precise-boss-reverb")]
    {
        weird_mul_precise(sample, add_mask, carry_mask)
    }
    #[cfg(not(feature = "precise-boss-reverb"))]
    {
        weird_mul_fast(sample, add_mask, carry_mask)
    }
}

/// Sample arithmetic needed by the reverb primitives.
///
/// Implemented for `i16` (bit-exact fixed point, wrapping where the chip's
/// 16-bit RAM truncates) and `f32` (float renderer).
pub trait ReverbSample: Copy + Default + PartialEq + std::fmt::Debug + Send + 'static {
    /// Multiply by `add_mask / 256` the way the Boss chip does.
    fn weird_mul(self, add_mask: u8, carry_mask: u8) -> Self;
    fn halve(self) -> Self;
    /// Sum truncated to the storage width.
    fn add(self, other: Self) -> Self;
    fn sub(self, other: Self) -> Self;
    /// Whether the sample counts as silence for `RingBuffer::is_empty`.
    fn is_quiet(self) -> bool;
    /// Mono sum feeding the reverb: 2-to-1 in tap-delay mode, 4-to-1 otherwise.
    fn dry_mix(left: Self, right: Self, tap_delay: bool) -> Self;
    /// Output adder for the three comb taps of the multi-comb modes.
    fn mix_combs(out1: Self, out2: Self, out3: Self) -> Self;
}

impl ReverbSample for i16 {
    #[inline]
    fn weird_mul(self, add_mask: u8, carry_mask: u8) -> Self {
        weird_mul(self as i32, add_mask, carry_mask) as i16
    }

    #[inline]
    fn halve(self) -> Self {
        self >> 1
    }

    #[inline]
    fn add(self, other: Self) -> Self {
        self.wrapping_add(other)
    }

    #[inline]
    fn sub(self, other: Self) -> Self {
        self.wrapping_sub(other)
    }

    #[inline]
    fn is_quiet(self) -> bool {
        (-8..=8).contains(&self)
    }

    #[inline]
    fn dry_mix(left: Self, right: Self, tap_delay: bool) -> Self {
        if tap_delay {
            (left >> 1) + (right >> 1)
        } else {
            (left >> 2) + (right >> 2)
        }
    }

    #[inline]
    fn mix_combs(out1: Self, out2: Self, out3: Self) -> Self {
        let (out1, out2, out3) = (out1 as i32, out2 as i32, out3 as i32);
        let acc = clip_sample_ex(out1 + (out1 >> 1)) as i32;
        let acc = clip_sample_ex(acc + out2) as i32;
        let acc = clip_sample_ex(acc + (out2 >> 1)) as i32;
        clip_sample_ex(acc + out3)
    }
}

impl ReverbSample for f32 {
    #[inline]
    fn weird_mul(self, add_mask: u8, _carry_mask: u8) -> Self {
        self * add_mask as f32 / 256.0
    }

    #[inline]
    fn halve(self) -> Self {
        self * 0.5
    }

    #[inline]
    fn add(self, other: Self) -> Self {
        self + other
    }

    #[inline]
    fn sub(self, other: Self) -> Self {
        self - other
    }

    #[inline]
    fn is_quiet(self) -> bool {
        (-0.001..=0.001).contains(&self)
    }

    #[inline]
    fn dry_mix(left: Self, right: Self, tap_delay: bool) -> Self {
        if tap_delay {
            (left + right) * 0.5
        } else {
            (left + right) * 0.25
        }
    }

    #[inline]
    fn mix_combs(out1: Self, out2: Self, out3: Self) -> Self {
        1.5 * (out1 + out2) + out3
    }
}
