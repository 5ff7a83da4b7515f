//! Scripted MIDI phrase, as raw channel messages.

/// (delay before the message in steps, raw MIDI bytes)
pub type Step = (u32, [u8; 3]);

const MELODY_ON: u8 = 0x91;
const MELODY_OFF: u8 = 0x81;
const RHYTHM_ON: u8 = 0x99;
const PEDAL: u8 = 0xB1;

/// Kick on every beat, an arpeggio on top, the last chord held by the pedal.
pub fn phrase() -> Vec<Step> {
    let mut steps = Vec::new();
    for &key in &[60u8, 64, 67, 72, 67, 64] {
        steps.push((0, [RHYTHM_ON, 36, 110]));
        steps.push((0, [MELODY_ON, key, 100]));
        steps.push((1, [MELODY_OFF, key, 0]));
    }
    steps.push((0, [PEDAL, 64, 127]));
    for &key in &[48u8, 55, 60, 64] {
        steps.push((0, [MELODY_ON, key, 90]));
        steps.push((0, [MELODY_OFF, key, 0]));
    }
    steps.push((8, [PEDAL, 64, 0]));
    steps.push((4, [0xB1, 123, 0]));
    steps
}
