use crate::{io::midi::MidiEvent, synth::message::SynthMessage, synth::part::RHYTHM_PART};

const CC_VOLUME: u8 = 7;
const CC_PAN: u8 = 10;
const CC_HOLD_PEDAL: u8 = 64;
const CC_ALL_SOUND_OFF: u8 = 120;
const CC_ALL_NOTES_OFF: u8 = 123;

/// Factory channel assignment: MIDI channels 2..=9 drive parts 0..=7,
/// channel 10 the rhythm part. Channels are zero-based here.
pub fn channel_to_part(channel: u8) -> Option<u8> {
    match channel {
        1..=8 => Some(channel - 1),
        9 => Some(RHYTHM_PART as u8),
        _ => None,
    }
}

pub fn midi_to_synth(midi: MidiEvent) -> Option<SynthMessage> {
    match midi {
        MidiEvent::NoteOn {
            channel,
            key,
            velocity,
        } => Some(SynthMessage::NoteOn {
            part: channel_to_part(channel)?,
            key,
            velocity,
        }),
        MidiEvent::NoteOff { channel, key, .. } => Some(SynthMessage::NoteOff {
            part: channel_to_part(channel)?,
            key,
        }),
        MidiEvent::PitchBend { channel, value } => Some(SynthMessage::PitchBend {
            part: channel_to_part(channel)?,
            value,
        }),
        MidiEvent::ControlChange {
            channel,
            controller,
            value,
        } => {
            let part = channel_to_part(channel)?;
            match controller {
                CC_VOLUME => Some(SynthMessage::PartVolume {
                    part,
                    volume: (value as u16 * 100 / 127) as u8,
                }),
                CC_PAN => Some(SynthMessage::PartPanpot {
                    part,
                    panpot: (value as u16 * 14 / 127) as u8,
                }),
                CC_HOLD_PEDAL => Some(SynthMessage::HoldPedal {
                    part,
                    on: value >= 64,
                }),
                CC_ALL_SOUND_OFF => Some(SynthMessage::AllSoundOff { part }),
                CC_ALL_NOTES_OFF => Some(SynthMessage::AllNotesOff { part }),
                _ => None,
            }
        }
        MidiEvent::ProgramChange { .. } => None,
    }
}
