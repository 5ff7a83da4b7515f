//! Ring-buffer filter stages of the Boss reverb chip.
//!
//! Every stage is a fixed-length circular buffer. `next()` advances the
//! write index first and then returns the slot it now points at, which
//! still holds the sample written `size` steps ago.

use crate::dsp::sample::ReverbSample;

/// Samples of latency added by the chip between input and comb read-out.
pub const PROCESS_DELAY: usize = 1;
/// Extra read-out delay of the tap-delay mode outputs.
pub const MODE_3_ADDITIONAL_DELAY: usize = 1;
/// Offset of the tap-delay feedback read position.
pub const MODE_3_FEEDBACK_DELAY: usize = 1;

pub struct RingBuffer<S: ReverbSample> {
    buffer: Vec<S>,
    index: usize,
}

impl<S: ReverbSample> RingBuffer<S> {
    pub fn new(size: usize) -> Self {
        Self {
            buffer: vec![S::default(); size.max(1)],
            index: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Advance the write index and return the oldest sample.
    #[inline]
    pub fn next(&mut self) -> S {
        self.index += 1;
        if self.index >= self.buffer.len() {
            self.index = 0;
        }
        self.buffer[self.index]
    }

    /// Heuristic silence check: every sample is within the quiet threshold.
    pub fn is_empty(&self) -> bool {
        self.buffer.iter().all(|s| s.is_quiet())
    }

    pub fn mute(&mut self) {
        self.buffer.fill(S::default());
    }

    #[inline]
    fn current(&self) -> S {
        self.buffer[self.index]
    }

    #[inline]
    fn store(&mut self, sample: S) {
        self.buffer[self.index] = sample;
    }

    /// Sample written `out_index` steps before the current slot.
    #[inline]
    pub fn get_output_at(&self, out_index: usize) -> S {
        let size = self.buffer.len();
        self.buffer[(size + self.index - out_index % size) % size]
    }
}

/// Allpass stage with the chip's fixed 0.5 coefficient.
pub struct AllpassFilter<S: ReverbSample> {
    ring: RingBuffer<S>,
}

impl<S: ReverbSample> AllpassFilter<S> {
    pub fn new(size: usize) -> Self {
        Self {
            ring: RingBuffer::new(size),
        }
    }

    #[inline]
    pub fn process(&mut self, input: S) -> S {
        let buffer_out = self.ring.next();
        // store input - feedback / 2
        let stored = input.sub(buffer_out.halve());
        self.ring.store(stored);
        // return buffer output + feedforward / 2
        buffer_out.add(stored.halve())
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn mute(&mut self) {
        self.ring.mute();
    }
}

/// The comb-like stages. The set of kinds is fixed by the chip.
pub enum CombFilter<S: ReverbSample> {
    /// Comb with a low-pass filter in its feedback loop.
    Comb {
        ring: RingBuffer<S>,
        filter_factor: u8,
        feedback_factor: u8,
    },
    /// Entrance delay with a one-pole low-pass; processed as the first comb.
    DelayWithLowPass {
        ring: RingBuffer<S>,
        filter_factor: u8,
        amp: u8,
    },
    /// Single long delay of the tap-delay mode with movable output taps.
    TapDelay {
        ring: RingBuffer<S>,
        filter_factor: u8,
        feedback_factor: u8,
        out_l: usize,
        out_r: usize,
    },
}

impl<S: ReverbSample> CombFilter<S> {
    pub fn comb(size: usize, filter_factor: u8) -> Self {
        CombFilter::Comb {
            ring: RingBuffer::new(size),
            filter_factor,
            feedback_factor: 0,
        }
    }

    pub fn delay_with_low_pass(size: usize, filter_factor: u8, amp: u8) -> Self {
        CombFilter::DelayWithLowPass {
            ring: RingBuffer::new(size),
            filter_factor,
            amp,
        }
    }

    pub fn tap_delay(size: usize, filter_factor: u8) -> Self {
        CombFilter::TapDelay {
            ring: RingBuffer::new(size),
            filter_factor,
            feedback_factor: 0,
            out_l: 0,
            out_r: 0,
        }
    }

    pub fn process(&mut self, input: S) {
        match self {
            CombFilter::Comb {
                ring,
                filter_factor,
                feedback_factor,
            } => {
                let last = ring.current();
                let filter_in = input.add(ring.next().weird_mul(*feedback_factor, 0xF0));
                // store input + feedback processed by a low-pass filter
                ring.store(last.weird_mul(*filter_factor, 0xF0).sub(filter_in));
            }
            CombFilter::DelayWithLowPass {
                ring,
                filter_factor,
                amp,
            } => {
                let last = ring.current();
                ring.next();
                let lpf_out = last.weird_mul(*filter_factor, 0xFF).add(input);
                ring.store(lpf_out.weird_mul(*amp, 0xFF));
            }
            CombFilter::TapDelay {
                ring,
                filter_factor,
                feedback_factor,
                out_r,
                ..
            } => {
                let last = ring.current();
                ring.next();
                let lpf_out = last.weird_mul(*filter_factor, 0xF0).add(input);
                let feedback = ring.get_output_at(*out_r + MODE_3_FEEDBACK_DELAY);
                ring.store(feedback.weird_mul(*feedback_factor, 0xF0).sub(lpf_out));
            }
        }
    }

    /// No-op for the entrance delay, which has no feedback path.
    pub fn set_feedback_factor(&mut self, factor: u8) {
        match self {
            CombFilter::Comb {
                feedback_factor, ..
            }
            | CombFilter::TapDelay {
                feedback_factor, ..
            } => *feedback_factor = factor,
            CombFilter::DelayWithLowPass { .. } => {}
        }
    }

    /// Only meaningful for the tap-delay kind.
    pub fn set_output_positions(&mut self, left: usize, right: usize) {
        if let CombFilter::TapDelay { out_l, out_r, .. } = self {
            *out_l = left;
            *out_r = right;
        }
    }

    pub fn get_left_output(&self) -> S {
        match self {
            CombFilter::TapDelay { ring, out_l, .. } => {
                ring.get_output_at(*out_l + PROCESS_DELAY + MODE_3_ADDITIONAL_DELAY)
            }
            _ => S::default(),
        }
    }

    pub fn get_right_output(&self) -> S {
        match self {
            CombFilter::TapDelay { ring, out_r, .. } => {
                ring.get_output_at(*out_r + PROCESS_DELAY + MODE_3_ADDITIONAL_DELAY)
            }
            _ => S::default(),
        }
    }

    pub fn get_output_at(&self, out_index: usize) -> S {
        self.ring().get_output_at(out_index)
    }

    pub fn is_empty(&self) -> bool {
        self.ring().is_empty()
    }

    pub fn mute(&mut self) {
        self.ring_mut().mute();
    }

    fn ring(&self) -> &RingBuffer<S> {
        match self {
            CombFilter::Comb { ring, .. }
            | CombFilter::DelayWithLowPass { ring, .. }
            | CombFilter::TapDelay { ring, .. } => ring,
        }
    }

    fn ring_mut(&mut self) -> &mut RingBuffer<S> {
        match self {
            CombFilter::Comb { ring, .. }
            | CombFilter::DelayWithLowPass { ring, .. }
            | CombFilter::TapDelay { ring, .. } => ring,
        }
    }
}
