/// Channel voice messages the synth understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// 14-bit value, 8192 is centre.
    PitchBend { channel: u8, value: u16 },
    ProgramChange { channel: u8, program: u8 },
}

impl MidiEvent {
    /// Decode one complete short message. Running status and system
    /// messages are not handled.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        let channel = status & 0x0F;
        let d0 = data.first().map(|b| b & 0x7F);
        let d1 = data.get(1).map(|b| b & 0x7F);
        match status & 0xF0 {
            0x80 => Some(MidiEvent::NoteOff {
                channel,
                key: d0?,
                velocity: d1?,
            }),
            0x90 => Some(MidiEvent::NoteOn {
                channel,
                key: d0?,
                velocity: d1?,
            }),
            0xB0 => Some(MidiEvent::ControlChange {
                channel,
                controller: d0?,
                value: d1?,
            }),
            0xC0 => Some(MidiEvent::ProgramChange {
                channel,
                program: d0?,
            }),
            0xE0 => Some(MidiEvent::PitchBend {
                channel,
                value: ((d1? as u16) << 7) | d0? as u16,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_channel_messages() {
        assert_eq!(
            MidiEvent::parse(&[0x91, 60, 100]),
            Some(MidiEvent::NoteOn { channel: 1, key: 60, velocity: 100 })
        );
        assert_eq!(
            MidiEvent::parse(&[0xE9, 0x00, 0x40]),
            Some(MidiEvent::PitchBend { channel: 9, value: 8192 })
        );
        assert_eq!(MidiEvent::parse(&[0x90, 60]), None);
        assert_eq!(MidiEvent::parse(&[0xF8]), None);
        assert_eq!(MidiEvent::parse(&[]), None);
    }
}
