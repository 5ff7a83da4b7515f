#[cfg(feature = "rtrb")]
use rtrb::Consumer;

/// Control events handed to the render thread.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SynthMessage {
    /// Velocity 0 is a note-off.
    NoteOn { part: u8, key: u8, velocity: u8 },
    NoteOff { part: u8, key: u8 },
    HoldPedal { part: u8, on: bool },
    /// 0..=100.
    PartVolume { part: u8, volume: u8 },
    /// 0..=14, 7 is centre.
    PartPanpot { part: u8, panpot: u8 },
    /// 14-bit, 8192 is centre.
    PitchBend { part: u8, value: u16 },
    AllNotesOff { part: u8 },
    AllSoundOff { part: u8 },
    /// System reverb parameters; ignored while the reverb is overridden.
    Reverb { mode: u8, time: u8, level: u8 },
    Reset,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<SynthMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        Consumer::pop(self).ok()
    }
}

/// Drains a fixed list; handy for offline rendering and tests.
impl MessageReceiver for std::collections::VecDeque<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        self.pop_front()
    }
}
