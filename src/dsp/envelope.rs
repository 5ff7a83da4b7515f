/*
Integer Envelope Ramps
======================

The LA32 envelopes (TVA, TVP, TVF) are all built from the same primitive: a
straight line from the current value to a target value over a whole number
of samples. Each envelope owns one `Ramp` and a small phase state machine on
top of it; when a ramp lands, the owner picks the next target.

  value
    T ┤            ●━━━━━━━━  target reached, owner advances its phase
      │        ╱
      │    ╱
    C ┤●        current value when `start` was called
      └┴───────────┴──────→ samples
       0        duration


Fixed Point
-----------

Values are plain integers (amplitude, pitch offset or cutoff units) but the
ramp tracks them with 16 fractional bits so that slow ramps still move:

    increment = ((target - current) << 16) / duration

On the last sample the value snaps to the target exactly, so rounding error
never accumulates across phases.
*/

const FRACTION_BITS: u32 = 16;

#[derive(Debug, Clone, Copy, Default)]
pub struct Ramp {
    current: i64,
    target: i64,
    increment: i64,
    remaining: u32,
}

impl Ramp {
    pub fn new(value: i32) -> Self {
        let mut ramp = Self::default();
        ramp.reset(value);
        ramp
    }

    /// Jump to `value` and stop moving.
    pub fn reset(&mut self, value: i32) {
        self.current = (value as i64) << FRACTION_BITS;
        self.target = self.current;
        self.increment = 0;
        self.remaining = 0;
    }

    /// Head for `target`, arriving after `samples` calls to [`Ramp::next_sample`].
    /// A zero duration lands on the next sample.
    pub fn start(&mut self, target: i32, samples: u32) {
        let samples = samples.max(1);
        self.target = (target as i64) << FRACTION_BITS;
        self.increment = (self.target - self.current) / samples as i64;
        self.remaining = samples;
    }

    /// Advance one sample. Returns `true` exactly once, on the sample the
    /// target is reached.
    pub fn next_sample(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            self.current = self.target;
            true
        } else {
            self.current += self.increment;
            false
        }
    }

    pub fn value(&self) -> i32 {
        (self.current >> FRACTION_BITS) as i32
    }

    pub fn target(&self) -> i32 {
        (self.target >> FRACTION_BITS) as i32
    }

    pub fn is_ramping(&self) -> bool {
        self.remaining > 0
    }
}
