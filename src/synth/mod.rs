// Purpose: voice layer and the render loop
// Parts own polys, polys own partials, PartialManager arbitrates between them

pub mod message;
pub mod part;
pub mod partial;
pub mod partial_manager;
pub mod poly;
pub mod tables;
pub mod tva;
pub mod tvf;
pub mod tvp;

use std::ops::Range;

use log::{debug, info};

use crate::config::{DacInputMode, SynthConfig};
use crate::dsp::analog::{Analog, DacStreams};
use crate::dsp::dac::{convert_samples_to_output, produce_la32_output};
use crate::dsp::reverb::{BReverbModel, ReverbMode};
use crate::dsp::sample::IntSample;
use crate::error::{Error, Result};
use crate::io::PcmRom;
use crate::patch::Timbre;
use crate::MAX_SAMPLES_PER_RUN;

use self::message::{MessageReceiver, SynthMessage};
use self::part::{Part, RhythmKey, PART_COUNT, RHYTHM_PART};
use self::partial_manager::PartialManager;

const DEFAULT_REVERB_TIME: u8 = 5;
const DEFAULT_REVERB_LEVEL: u8 = 3;

/// Caller-provided DAC-rate buffers. A `None` stream is rendered into
/// internal scratch space and discarded.
#[derive(Default)]
pub struct DacOutputStreams<'a> {
    pub non_reverb_left: Option<&'a mut [IntSample]>,
    pub non_reverb_right: Option<&'a mut [IntSample]>,
    pub reverb_dry_left: Option<&'a mut [IntSample]>,
    pub reverb_dry_right: Option<&'a mut [IntSample]>,
    pub reverb_wet_left: Option<&'a mut [IntSample]>,
    pub reverb_wet_right: Option<&'a mut [IntSample]>,
}

impl DacOutputStreams<'_> {
    /// `len` limited to the shortest provided buffer.
    fn shortest(&self, len: usize) -> usize {
        [
            &self.non_reverb_left,
            &self.non_reverb_right,
            &self.reverb_dry_left,
            &self.reverb_dry_right,
            &self.reverb_wet_left,
            &self.reverb_wet_right,
        ]
        .iter()
        .filter_map(|s| s.as_ref().map(|b| b.len()))
        .fold(len, usize::min)
    }
}

/// Six equally long slices for one pass of at most [`MAX_SAMPLES_PER_RUN`].
struct RunBuffers<'a> {
    non_reverb_left: &'a mut [IntSample],
    non_reverb_right: &'a mut [IntSample],
    reverb_dry_left: &'a mut [IntSample],
    reverb_dry_right: &'a mut [IntSample],
    reverb_wet_left: &'a mut [IntSample],
    reverb_wet_right: &'a mut [IntSample],
}

#[derive(Default)]
struct StreamBuffers {
    buffers: [Vec<IntSample>; 6],
}

impl StreamBuffers {
    fn new() -> Self {
        Self {
            buffers: std::array::from_fn(|_| vec![0; MAX_SAMPLES_PER_RUN]),
        }
    }
}

fn pick<'b>(
    stream: &'b mut Option<&mut [IntSample]>,
    scratch: &'b mut [IntSample],
    range: Range<usize>,
) -> &'b mut [IntSample] {
    match stream {
        Some(buf) => &mut buf[range],
        None => &mut scratch[..range.len()],
    }
}

pub struct Synth {
    config: SynthConfig,
    pcm_rom: PcmRom,
    partial_manager: PartialManager,
    /// One model per mode; only the current one is open.
    reverb_models: Vec<BReverbModel<IntSample>>,
    reverb_mode: ReverbMode,
    reverb_time: u8,
    reverb_level: u8,
    reverb_overridden: bool,
    analog: Analog,
    scratch: StreamBuffers,
    dac: StreamBuffers,
    rendered_sample_count: u64,
}

impl Synth {
    pub fn new(config: SynthConfig, pcm_rom: PcmRom) -> Result<Self> {
        config.validate()?;

        let mut partial_manager = PartialManager::new(config.partial_count);
        partial_manager.set_panning(config.reversed_stereo, config.nice_panning);

        let mut analog = Analog::new(config.analog_output_mode, config.old_mt32_analog_lpf);
        analog.set_synth_output_gain(config.output_gain);
        analog.set_reverb_output_gain(config.reverb_output_gain, config.mt32_reverb_compatibility);

        let reverb_models = ReverbMode::ALL
            .iter()
            .map(|&mode| BReverbModel::new(mode, config.mt32_reverb_compatibility))
            .collect();

        info!(
            "synth ready: {} partials, {:?} output at {} Hz, {} PCM waves",
            config.partial_count,
            config.analog_output_mode,
            analog.get_output_sample_rate(),
            pcm_rom.wave_count()
        );

        let mut synth = Self {
            config,
            pcm_rom,
            partial_manager,
            reverb_models,
            reverb_mode: ReverbMode::Room,
            reverb_time: DEFAULT_REVERB_TIME,
            reverb_level: DEFAULT_REVERB_LEVEL,
            reverb_overridden: false,
            analog,
            scratch: StreamBuffers::new(),
            dac: StreamBuffers::new(),
            rendered_sample_count: 0,
        };
        synth.open_current_reverb();
        Ok(synth)
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn pcm_rom(&self) -> &PcmRom {
        &self.pcm_rom
    }

    pub fn partial_manager(&self) -> &PartialManager {
        &self.partial_manager
    }

    pub fn part(&self, part_num: usize) -> Option<&Part> {
        self.partial_manager.part(part_num)
    }

    pub fn part_mut(&mut self, part_num: usize) -> Result<&mut Part> {
        self.partial_manager
            .part_mut(part_num)
            .ok_or(Error::InvalidPart(part_num))
    }

    /// Applies to notes started afterwards.
    pub fn set_timbre(&mut self, part_num: usize, timbre: Timbre) -> Result<()> {
        if part_num == RHYTHM_PART {
            return Err(Error::InvalidPart(part_num));
        }
        self.part_mut(part_num)?.set_timbre(timbre);
        Ok(())
    }

    /// Returns `false` for keys outside the rhythm range.
    pub fn set_rhythm_key(&mut self, key: u8, timbre: Timbre, panpot: u8, reverb: bool) -> bool {
        match self.partial_manager.part_mut(RHYTHM_PART) {
            Some(part) => part.set_rhythm_key(key, RhythmKey::new(timbre, panpot, reverb)),
            None => false,
        }
    }

    /// Returns the total number of partials reserved.
    pub fn set_reserve(&mut self, reserve: &[u8; PART_COUNT]) -> u32 {
        self.partial_manager.set_reserve(reserve)
    }

    pub fn play_note(&mut self, part_num: usize, key: u8, velocity: u8) -> bool {
        self.partial_manager
            .play_note(part_num, key, velocity, &self.pcm_rom)
    }

    pub fn stop_note(&mut self, part_num: usize, key: u8) {
        self.partial_manager.stop_note(part_num, key);
    }

    pub fn set_hold_pedal(&mut self, part_num: usize, on: bool) {
        self.partial_manager.set_hold_pedal(part_num, on);
    }

    pub fn set_part_volume(&mut self, part_num: usize, volume: u8) {
        self.partial_manager.set_part_volume(part_num, volume);
    }

    pub fn set_part_panpot(&mut self, part_num: usize, panpot: u8) {
        if let Some(part) = self.partial_manager.part_mut(part_num) {
            part.set_panpot(panpot);
        }
    }

    pub fn set_pitch_bend(&mut self, part_num: usize, value: u16) {
        self.partial_manager.set_pitch_bend(part_num, value);
    }

    pub fn all_notes_off(&mut self, part_num: usize) {
        self.partial_manager.all_notes_off(part_num);
    }

    pub fn all_sound_off(&mut self, part_num: usize) {
        self.partial_manager.all_sound_off(part_num);
    }

    pub fn handle_message(&mut self, msg: SynthMessage) {
        match msg {
            SynthMessage::NoteOn {
                part,
                key,
                velocity: 0,
            }
            | SynthMessage::NoteOff { part, key } => self.stop_note(part as usize, key),
            SynthMessage::NoteOn {
                part,
                key,
                velocity,
            } => {
                self.play_note(part as usize, key, velocity);
            }
            SynthMessage::HoldPedal { part, on } => self.set_hold_pedal(part as usize, on),
            SynthMessage::PartVolume { part, volume } => self.set_part_volume(part as usize, volume),
            SynthMessage::PartPanpot { part, panpot } => self.set_part_panpot(part as usize, panpot),
            SynthMessage::PitchBend { part, value } => self.set_pitch_bend(part as usize, value),
            SynthMessage::AllNotesOff { part } => self.all_notes_off(part as usize),
            SynthMessage::AllSoundOff { part } => self.all_sound_off(part as usize),
            SynthMessage::Reverb { mode, time, level } => {
                if self.reverb_overridden {
                    debug!("reverb overridden, ignoring mode {mode} time {time} level {level}");
                    return;
                }
                match ReverbMode::try_from(mode) {
                    Ok(mode) => {
                        self.set_reverb_mode(mode);
                        self.set_reverb_parameters(time, level);
                    }
                    Err(err) => debug!("{err}"),
                }
            }
            SynthMessage::Reset => self.reset(),
        }
    }

    /// Apply every pending message. Call from the render thread.
    pub fn process_messages<R: MessageReceiver + ?Sized>(&mut self, rx: &mut R) {
        while let Some(msg) = rx.pop() {
            self.handle_message(msg);
        }
    }

    pub fn reverb_mode(&self) -> ReverbMode {
        self.reverb_mode
    }

    pub fn set_reverb_mode(&mut self, mode: ReverbMode) {
        if mode == self.reverb_mode {
            return;
        }
        self.reverb_models[self.reverb_mode as usize].close();
        self.reverb_mode = mode;
        self.open_current_reverb();
    }

    pub fn set_reverb_parameters(&mut self, time: u8, level: u8) {
        self.reverb_time = time & 7;
        self.reverb_level = level & 7;
        self.reverb_models[self.reverb_mode as usize].set_parameters(self.reverb_time, self.reverb_level);
    }

    pub fn is_reverb_enabled(&self) -> bool {
        self.config.reverb_enabled
    }

    pub fn set_reverb_enabled(&mut self, enabled: bool) {
        if enabled && !self.config.reverb_enabled {
            self.reverb_models[self.reverb_mode as usize].mute();
        }
        self.config.reverb_enabled = enabled;
    }

    pub fn is_reverb_overridden(&self) -> bool {
        self.reverb_overridden
    }

    /// While overridden, reverb messages are ignored; direct calls still apply.
    pub fn set_reverb_overridden(&mut self, overridden: bool) {
        self.reverb_overridden = overridden;
    }

    pub fn is_mt32_reverb_compatibility_mode(&self) -> bool {
        self.config.mt32_reverb_compatibility
    }

    /// Switch between the MT-32 and CM-32L reverb tables.
    pub fn set_reverb_compatibility_mode(&mut self, mt32_compatible: bool) {
        if mt32_compatible == self.config.mt32_reverb_compatibility {
            return;
        }
        self.config.mt32_reverb_compatibility = mt32_compatible;
        for (model, &mode) in self.reverb_models.iter_mut().zip(ReverbMode::ALL.iter()) {
            *model = BReverbModel::new(mode, mt32_compatible);
        }
        self.open_current_reverb();
        self.analog
            .set_reverb_output_gain(self.config.reverb_output_gain, mt32_compatible);
    }

    fn open_current_reverb(&mut self) {
        let model = &mut self.reverb_models[self.reverb_mode as usize];
        model.open();
        model.set_parameters(self.reverb_time, self.reverb_level);
    }

    pub fn set_output_gain(&mut self, gain: f32) {
        self.config.output_gain = gain;
        self.analog.set_synth_output_gain(gain);
    }

    pub fn set_reverb_output_gain(&mut self, gain: f32) {
        self.config.reverb_output_gain = gain;
        self.analog
            .set_reverb_output_gain(gain, self.config.mt32_reverb_compatibility);
    }

    pub fn set_dac_input_mode(&mut self, mode: DacInputMode) {
        self.config.dac_input_mode = mode;
    }

    pub fn get_output_sample_rate(&self) -> u32 {
        self.analog.get_output_sample_rate()
    }

    pub fn get_dac_streams_length(&self, output_length: usize) -> usize {
        self.analog.get_dac_streams_length(output_length)
    }

    pub fn free_partial_count(&self) -> usize {
        self.partial_manager.get_free_partial_count()
    }

    pub fn has_active_partials(&self) -> bool {
        self.partial_manager.has_active_partials()
    }

    /// True while anything can still be heard, reverb tail included.
    pub fn is_active(&self) -> bool {
        self.has_active_partials()
            || (self.config.reverb_enabled && self.reverb_models[self.reverb_mode as usize].is_active())
    }

    pub fn rendered_sample_count(&self) -> u64 {
        self.rendered_sample_count
    }

    /// Cut all sound and return every part to its idle state.
    pub fn reset(&mut self) {
        self.partial_manager.deactivate_all();
        for part_num in 0..PART_COUNT {
            self.partial_manager.set_hold_pedal(part_num, false);
            self.partial_manager.set_pitch_bend(part_num, 8192);
        }
        self.reverb_models[self.reverb_mode as usize].mute();
        debug!("synth reset");
    }

    /// Render `len` samples at the DAC rate into separate streams.
    pub fn render_streams(&mut self, mut streams: DacOutputStreams<'_>, len: usize) {
        let len = streams.shortest(len);
        let mut scratch = std::mem::take(&mut self.scratch);
        let mut offset = 0;
        while offset < len {
            let n = (len - offset).min(MAX_SAMPLES_PER_RUN);
            let range = offset..offset + n;
            let [s0, s1, s2, s3, s4, s5] = &mut scratch.buffers;
            self.do_render_streams(RunBuffers {
                non_reverb_left: pick(&mut streams.non_reverb_left, s0, range.clone()),
                non_reverb_right: pick(&mut streams.non_reverb_right, s1, range.clone()),
                reverb_dry_left: pick(&mut streams.reverb_dry_left, s2, range.clone()),
                reverb_dry_right: pick(&mut streams.reverb_dry_right, s3, range.clone()),
                reverb_wet_left: pick(&mut streams.reverb_wet_left, s4, range.clone()),
                reverb_wet_right: pick(&mut streams.reverb_wet_right, s5, range),
            });
            offset += n;
        }
        self.scratch = scratch;
    }

    fn do_render_streams(&mut self, out: RunBuffers<'_>) {
        let RunBuffers {
            non_reverb_left,
            non_reverb_right,
            reverb_dry_left,
            reverb_dry_right,
            reverb_wet_left,
            reverb_wet_right,
        } = out;
        non_reverb_left.fill(0);
        non_reverb_right.fill(0);
        reverb_dry_left.fill(0);
        reverb_dry_right.fill(0);

        self.partial_manager.clear_already_outputed();
        let pcm = self.pcm_rom.samples();
        for i in 0..self.partial_manager.partial_count() {
            if self.partial_manager.should_reverb(i) {
                self.partial_manager
                    .produce_output(i, reverb_dry_left, reverb_dry_right, pcm);
            } else {
                self.partial_manager
                    .produce_output(i, non_reverb_left, non_reverb_right, pcm);
            }
        }

        let dac_mode = self.config.dac_input_mode;
        produce_la32_output(dac_mode, reverb_dry_left);
        produce_la32_output(dac_mode, reverb_dry_right);
        produce_la32_output(dac_mode, non_reverb_left);
        produce_la32_output(dac_mode, non_reverb_right);

        if self.config.reverb_enabled {
            self.reverb_models[self.reverb_mode as usize].process(
                reverb_dry_left,
                reverb_dry_right,
                reverb_wet_left,
                reverb_wet_right,
            );
            convert_samples_to_output(dac_mode, reverb_wet_left);
            convert_samples_to_output(dac_mode, reverb_wet_right);
        } else {
            reverb_wet_left.fill(0);
            reverb_wet_right.fill(0);
        }
        convert_samples_to_output(dac_mode, reverb_dry_left);
        convert_samples_to_output(dac_mode, reverb_dry_right);
        convert_samples_to_output(dac_mode, non_reverb_left);
        convert_samples_to_output(dac_mode, non_reverb_right);

        self.rendered_sample_count += non_reverb_left.len() as u64;
    }

    /// Render interleaved stereo at [`Synth::get_output_sample_rate`].
    pub fn render(&mut self, out: &mut [IntSample]) {
        let mut dac = std::mem::take(&mut self.dac);
        for chunk in out.chunks_mut(2 * MAX_SAMPLES_PER_RUN) {
            let frames = chunk.len() / 2;
            let dac_len = self
                .analog
                .get_dac_streams_length(frames)
                .min(MAX_SAMPLES_PER_RUN);
            let [b0, b1, b2, b3, b4, b5] = &mut dac.buffers;
            self.render_streams(
                DacOutputStreams {
                    non_reverb_left: Some(&mut b0[..dac_len]),
                    non_reverb_right: Some(&mut b1[..dac_len]),
                    reverb_dry_left: Some(&mut b2[..dac_len]),
                    reverb_dry_right: Some(&mut b3[..dac_len]),
                    reverb_wet_left: Some(&mut b4[..dac_len]),
                    reverb_wet_right: Some(&mut b5[..dac_len]),
                },
                dac_len,
            );
            self.analog.process(
                chunk,
                DacStreams {
                    non_reverb_left: &b0[..dac_len],
                    non_reverb_right: &b1[..dac_len],
                    reverb_dry_left: &b2[..dac_len],
                    reverb_dry_right: &b3[..dac_len],
                    reverb_wet_left: &b4[..dac_len],
                    reverb_wet_right: &b5[..dac_len],
                },
            );
        }
        if out.len() % 2 == 1 {
            if let Some(last) = out.last_mut() {
                *last = 0;
            }
        }
        self.dac = dac;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnalogOutputMode;

    fn synth() -> Synth {
        Synth::new(SynthConfig::default(), PcmRom::empty()).unwrap()
    }

    #[test]
    fn rejects_bad_partial_count() {
        let result = Synth::new(SynthConfig::default().with_partial_count(300), PcmRom::empty());
        assert!(matches!(result, Err(Error::InvalidPartialCount { got: 300, .. })));
    }

    #[test]
    fn idle_synth_renders_silence() {
        let mut synth = synth();
        let mut out = vec![1i16; 1024];
        synth.render(&mut out);
        assert!(out.iter().all(|&s| s == 0));
        assert!(!synth.is_active());
    }

    #[test]
    fn missing_streams_use_scratch() {
        let mut synth = synth();
        synth.play_note(0, 60, 100);
        let mut left = vec![0i16; 10_000];
        synth.render_streams(
            DacOutputStreams {
                reverb_dry_left: Some(&mut left),
                ..Default::default()
            },
            10_000,
        );
        assert!(left.iter().any(|&s| s != 0));
        assert_eq!(synth.rendered_sample_count(), 10_000);
    }

    #[test]
    fn len_is_limited_by_shortest_stream() {
        let mut synth = synth();
        let mut a = vec![0i16; 100];
        let mut b = vec![0i16; 50];
        synth.render_streams(
            DacOutputStreams {
                non_reverb_left: Some(&mut a),
                non_reverb_right: Some(&mut b),
                ..Default::default()
            },
            100,
        );
        assert_eq!(synth.rendered_sample_count(), 50);
    }

    #[test]
    fn reverb_messages_respect_override() {
        let mut synth = synth();
        synth.handle_message(SynthMessage::Reverb { mode: 1, time: 3, level: 4 });
        assert_eq!(synth.reverb_mode(), ReverbMode::Hall);
        synth.set_reverb_overridden(true);
        synth.handle_message(SynthMessage::Reverb { mode: 2, time: 3, level: 4 });
        assert_eq!(synth.reverb_mode(), ReverbMode::Hall);
        synth.set_reverb_mode(ReverbMode::Plate);
        assert_eq!(synth.reverb_mode(), ReverbMode::Plate);
        // Unknown modes are dropped.
        synth.set_reverb_overridden(false);
        synth.handle_message(SynthMessage::Reverb { mode: 9, time: 0, level: 0 });
        assert_eq!(synth.reverb_mode(), ReverbMode::Plate);
    }

    #[test]
    fn velocity_zero_is_note_off() {
        let mut synth = synth();
        let mut rx: std::collections::VecDeque<_> = [
            SynthMessage::NoteOn { part: 0, key: 60, velocity: 100 },
            SynthMessage::NoteOn { part: 0, key: 60, velocity: 0 },
        ]
        .into();
        synth.process_messages(&mut rx);
        let part = synth.part(0).unwrap();
        let id = part.active_polys().next().unwrap();
        assert_eq!(
            synth.partial_manager().poly(id).unwrap().state(),
            poly::PolyState::Releasing
        );
    }

    #[test]
    fn rhythm_part_rejects_melodic_timbre() {
        let mut synth = synth();
        assert_eq!(synth.set_timbre(RHYTHM_PART, Timbre::default()), Err(Error::InvalidPart(8)));
        assert_eq!(synth.set_timbre(9, Timbre::default()), Err(Error::InvalidPart(9)));
        assert!(synth.set_timbre(0, Timbre::default()).is_ok());
        assert!(synth.set_rhythm_key(36, Timbre::default(), 7, true));
        assert!(synth.play_note(RHYTHM_PART, 36, 100));
        assert!(!synth.play_note(RHYTHM_PART, 37, 100));
    }

    #[test]
    fn output_rate_follows_analog_mode() {
        let config = SynthConfig::default().with_analog_output_mode(AnalogOutputMode::Accurate);
        let synth = Synth::new(config, PcmRom::empty()).unwrap();
        assert_eq!(synth.get_output_sample_rate(), 48_000);
        assert!(synth.get_dac_streams_length(480) <= 330);
    }
}
