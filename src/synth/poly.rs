//! One sounding note: a key on a part and the partials playing it.

/// Index into the partial manager's poly pool.
pub type PolyId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolyState {
    Inactive,
    Playing,
    /// Note released while the hold pedal is down.
    Held,
    Releasing,
}

#[derive(Debug, Clone)]
pub struct Poly {
    part: Option<usize>,
    key: u8,
    velocity: u8,
    sustain: bool,
    state: PolyState,
    partials: [Option<usize>; 4],
    active_partial_count: usize,
}

impl Default for Poly {
    fn default() -> Self {
        Self::new()
    }
}

impl Poly {
    pub fn new() -> Self {
        Self {
            part: None,
            key: 0,
            velocity: 0,
            sustain: false,
            state: PolyState::Inactive,
            partials: [None; 4],
            active_partial_count: 0,
        }
    }

    pub fn reset(&mut self, part: usize, key: u8, velocity: u8, sustain: bool, partials: [Option<usize>; 4]) {
        self.part = Some(part);
        self.key = key;
        self.velocity = velocity;
        self.sustain = sustain;
        self.partials = partials;
        self.active_partial_count = partials.iter().flatten().count();
        self.state = if self.active_partial_count > 0 {
            PolyState::Playing
        } else {
            PolyState::Inactive
        };
    }

    pub fn part(&self) -> Option<usize> {
        self.part
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn state(&self) -> PolyState {
        self.state
    }

    pub fn can_sustain(&self) -> bool {
        self.sustain
    }

    pub fn is_active(&self) -> bool {
        self.state != PolyState::Inactive
    }

    pub fn active_partial_count(&self) -> usize {
        self.active_partial_count
    }

    pub fn partials(&self) -> [Option<usize>; 4] {
        self.partials
    }

    /// Decide what a note-off does. Returns `false` if the poly ignores it.
    /// When it returns `true` and the pedal is up, the caller must start
    /// the decay of every partial.
    pub fn note_off(&mut self, pedal_held: bool) -> bool {
        match self.state {
            PolyState::Inactive | PolyState::Releasing => false,
            PolyState::Held if pedal_held => false,
            _ if pedal_held => {
                self.state = PolyState::Held;
                true
            }
            _ => {
                self.state = PolyState::Releasing;
                true
            }
        }
    }

    /// Releasing the pedal: returns `true` if this poly was held and must
    /// now decay.
    pub fn stop_pedal_hold(&mut self) -> bool {
        if self.state == PolyState::Held {
            self.state = PolyState::Releasing;
            true
        } else {
            false
        }
    }

    /// Returns `true` when this was the last active partial.
    pub fn partial_deactivated(&mut self, partial: usize) -> bool {
        for slot in self.partials.iter_mut() {
            if *slot == Some(partial) {
                *slot = None;
                self.active_partial_count -= 1;
            }
        }
        if self.active_partial_count == 0 && self.state != PolyState::Inactive {
            self.state = PolyState::Inactive;
            return true;
        }
        false
    }
}
