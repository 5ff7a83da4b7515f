//! Player - opens the audio device and feeds the synth from the main thread

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use rtrb::RingBuffer;

use mt32_core::{
    io::{converter::midi_to_synth, midi::MidiEvent, PcmRom},
    patch::Timbre,
    AnalogOutputMode, Synth, SynthConfig, SynthMessage, MAX_SAMPLES_PER_RUN,
};

use super::phrase::phrase;

pub struct Player {
    tempo_ms: u64,
    repeats: usize,
}

impl Player {
    pub fn new() -> Self {
        Self {
            tempo_ms: 150,
            repeats: 1,
        }
    }

    /// Length of one phrase step
    pub fn tempo_ms(mut self, ms: u64) -> Self {
        self.tempo_ms = ms;
        self
    }

    pub fn repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats;
        self
    }

    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let mode = analog_mode_for_rate(sample_rate)?;

        let mut synth = Synth::new(
            SynthConfig::default().with_analog_output_mode(mode),
            PcmRom::empty(),
        )
        .wrap_err("failed to create synth")?;
        synth.set_rhythm_key(36, kick(), 7, false);

        println!("=== mt32play ===");
        println!("Sample rate: {} Hz ({:?})", sample_rate, mode);
        println!("Channels: {}", channels);
        println!();

        let (mut tx, mut rx) = RingBuffer::<SynthMessage>::new(256);
        let mut render_buf = vec![0i16; 2 * MAX_SAMPLES_PER_RUN];

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                synth.process_messages(&mut rx);
                for frames in data.chunks_mut(channels * MAX_SAMPLES_PER_RUN) {
                    let frame_count = frames.len() / channels;
                    let stereo = &mut render_buf[..2 * frame_count];
                    synth.render(stereo);
                    for (frame, lr) in frames.chunks_mut(channels).zip(stereo.chunks(2)) {
                        for (ch, out) in frame.iter_mut().enumerate() {
                            *out = lr[ch.min(1)] as f32 / 32768.0;
                        }
                    }
                }
            },
            |err| eprintln!("Audio error: {}", err),
            None,
        )?;
        stream.play()?;

        for pass in 0..self.repeats {
            println!("Pass {}", pass + 1);
            for (delay, bytes) in phrase() {
                std::thread::sleep(std::time::Duration::from_millis(delay as u64 * self.tempo_ms));
                let Some(msg) = MidiEvent::parse(&bytes).and_then(midi_to_synth) else {
                    continue;
                };
                if tx.push(msg).is_err() {
                    eprintln!("message queue full, dropped {:?}", msg);
                }
            }
        }
        // Let the reverb tail ring out.
        std::thread::sleep(std::time::Duration::from_secs(2));
        Ok(())
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

fn analog_mode_for_rate(sample_rate: u32) -> EyreResult<AnalogOutputMode> {
    match sample_rate {
        32_000 => Ok(AnalogOutputMode::Coarse),
        48_000 => Ok(AnalogOutputMode::Accurate),
        96_000 => Ok(AnalogOutputMode::Oversampled),
        other => Err(eyre!(
            "output device runs at {other} Hz; 32000, 48000 or 96000 Hz is required"
        )),
    }
}

/// Short non-sustaining square with a falling pitch envelope.
fn kick() -> Timbre {
    let mut timbre = Timbre::default();
    timbre.common.name = String::from("Kick");
    timbre.common.partial_mute = 0b0001;
    timbre.common.no_sustain = true;
    let partial = &mut timbre.partials[0];
    partial.wg.pitch_coarse = 12;
    partial.wg.pitch_keyfollow = 3;
    partial.pitch_env.depth = 10;
    partial.pitch_env.level = [100, 30, 30, 30, 30];
    partial.pitch_env.time = [25, 0, 0, 0];
    partial.tva.env_time = [0, 30, 30, 30, 20];
    partial.tva.env_level = [100, 40, 10, 0];
    partial.tvf.cutoff = 40;
    timbre
}
