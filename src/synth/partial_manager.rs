//! Ownership of every partial, poly and part, and the voice-stealing policy.
//!
//! All objects live in flat arrays and refer to each other by index, so a
//! partial can name its pair and its poly without shared ownership:
//!
//! ```text
//!   parts[p].active_polys ──► polys[id].partials ──► partials[i]
//!                                                      │  ▲
//!                                                 pair └──┘ (symmetric)
//! ```
//!
//! When a part needs more partials than are free, [`PartialManager::free_partials`]
//! aborts polys in a fixed priority order:
//!
//! 1. releasing polys of parts over their reserve, lowest priority part first
//!    (part 7 down to part 0, rhythm last)
//! 2. if the target part is itself over its reserve: held then playing polys of
//!    parts over reserve, limited to the target and lower priority parts
//! 3. otherwise the same for any part over reserve
//! 4. finally the target part's own oldest polys

use log::{debug, trace};

use crate::dsp::la32::PairHalf;
use crate::io::PcmRom;
use crate::patch::PatchCache;
use crate::synth::part::{Part, PART_COUNT, RHYTHM_PART};
use crate::synth::partial::Partial;
use crate::synth::poly::{Poly, PolyId, PolyState};
use crate::synth::tables::{PAN_FACTORS, PAN_NUMERATOR_MASTER, PAN_NUMERATOR_SLAVE};

/// Partial reserve of the factory system settings.
pub const DEFAULT_RESERVE: [u8; PART_COUNT] = [3, 10, 6, 4, 3, 0, 0, 0, 6];

/// Per-note values a partial needs when it starts.
#[derive(Debug, Clone, Copy)]
pub struct NoteContext {
    /// Key used for pitch and keyfollow, after folding into range.
    pub key: u8,
    pub velocity: u8,
    pub panpot: u8,
    pub part_volume: u8,
    pub pitch_bend: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AbortTarget {
    Releasing,
    PreferHeld,
}

#[derive(Debug)]
pub struct PartialManager {
    partials: Vec<Partial>,
    polys: Vec<Poly>,
    parts: Vec<Part>,
    reserve: [u8; PART_COUNT],
    reversed_stereo: bool,
    nice_panning: bool,
}

impl PartialManager {
    pub fn new(partial_count: usize) -> Self {
        Self {
            partials: (0..partial_count).map(Partial::new).collect(),
            polys: (0..partial_count).map(|_| Poly::new()).collect(),
            parts: (0..PART_COUNT).map(|n| Part::new(n, partial_count)).collect(),
            reserve: DEFAULT_RESERVE,
            reversed_stereo: false,
            nice_panning: false,
        }
    }

    pub fn set_panning(&mut self, reversed_stereo: bool, nice_panning: bool) {
        self.reversed_stereo = reversed_stereo;
        self.nice_panning = nice_panning;
    }

    pub fn partial_count(&self) -> usize {
        self.partials.len()
    }

    pub fn partial(&self, index: usize) -> Option<&Partial> {
        self.partials.get(index)
    }

    pub fn partials(&self) -> &[Partial] {
        &self.partials
    }

    pub fn poly(&self, id: PolyId) -> Option<&Poly> {
        self.polys.get(id)
    }

    pub fn part(&self, part_num: usize) -> Option<&Part> {
        self.parts.get(part_num)
    }

    pub fn part_mut(&mut self, part_num: usize) -> Option<&mut Part> {
        self.parts.get_mut(part_num)
    }

    pub fn reserve(&self) -> &[u8; PART_COUNT] {
        &self.reserve
    }

    /// Replace the per-part reserve. Returns the total reserved.
    pub fn set_reserve(&mut self, reserve: &[u8; PART_COUNT]) -> u32 {
        self.reserve = *reserve;
        let total = reserve.iter().map(|&r| r as u32).sum();
        debug!("partial reserve {:?} (total {total})", reserve);
        total
    }

    pub fn get_free_partial_count(&self) -> usize {
        self.partials.iter().filter(|p| !p.is_active()).count()
    }

    pub fn has_active_partials(&self) -> bool {
        self.partials.iter().any(Partial::is_active)
    }

    pub fn clear_already_outputed(&mut self) {
        for partial in &mut self.partials {
            partial.already_outputed = false;
        }
    }

    pub fn should_reverb(&self, index: usize) -> bool {
        self.partials.get(index).is_some_and(Partial::should_reverb)
    }

    /// First inactive partial, now owned by `part_num`.
    pub fn alloc_partial(&mut self, part_num: usize) -> Option<usize> {
        let index = self.partials.iter().position(|p| !p.is_active());
        match index {
            Some(index) => self.partials[index].activate(part_num),
            None => debug!("[Part {part_num}] no free partial to allocate"),
        }
        index
    }

    pub fn deactivate_all(&mut self) {
        for index in 0..self.partials.len() {
            self.deactivate(index);
        }
    }

    /// Silence a partial immediately, release it from its poly and break
    /// its pairing. A ring-modulating slave goes down with its master.
    pub fn deactivate(&mut self, index: usize) {
        let Some(partial) = self.partials.get_mut(index) else {
            return;
        };
        if !partial.is_active() {
            return;
        }
        partial.owner_part = None;
        let poly = partial.poly.take();
        let pair = partial.pair;
        let is_slave = partial.is_ring_modulating_slave();
        let has_slave = partial.has_ring_modulating_slave();

        if let Some(poly) = poly {
            self.poly_partial_deactivated(poly, index);
        }
        if is_slave {
            if let Some(master) = pair {
                self.partials[master].la32.deactivate(PairHalf::Slave);
            }
        } else {
            self.partials[index].la32.deactivate(PairHalf::Master);
            if has_slave {
                if let Some(slave) = pair {
                    self.deactivate(slave);
                }
            }
        }
        self.unlink_pair(index);
    }

    fn poly_partial_deactivated(&mut self, poly: PolyId, partial: usize) {
        let Some(p) = self.polys.get_mut(poly) else {
            return;
        };
        if p.partial_deactivated(partial) {
            if let Some(part) = p.part() {
                self.parts[part].remove_poly(poly);
            }
        }
    }

    fn link_pair(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.partials[a].pair = Some(b);
        self.partials[b].pair = Some(a);
    }

    fn unlink_pair(&mut self, index: usize) {
        if let Some(other) = self.partials[index].pair.take() {
            if let Some(other) = self.partials.get_mut(other) {
                if other.pair == Some(index) {
                    other.pair = None;
                }
            }
        }
    }

    pub fn part_active_partial_count(&self, part_num: usize) -> usize {
        self.parts[part_num]
            .active_polys()
            .map(|id| self.polys[id].active_partial_count())
            .sum()
    }

    pub fn part_active_non_releasing_partial_count(&self, part_num: usize) -> usize {
        self.parts[part_num]
            .active_polys()
            .filter(|&id| self.polys[id].state() != PolyState::Releasing)
            .map(|id| self.polys[id].active_partial_count())
            .sum()
    }

    fn abort_poly(&mut self, poly: PolyId) {
        for partial in self.polys[poly].partials().into_iter().flatten() {
            self.deactivate(partial);
        }
    }

    /// Abort the oldest poly of a part, optionally only one in `state`.
    fn abort_first_poly(&mut self, part_num: usize, state: Option<PolyState>) -> bool {
        let found = self.parts[part_num]
            .active_polys()
            .find(|&id| state.map_or(true, |s| self.polys[id].state() == s));
        match found {
            Some(id) => {
                trace!("[Part {part_num}] aborting poly {id} ({:?})", self.polys[id].state());
                self.abort_poly(id);
                true
            }
            None => false,
        }
    }

    fn abort_first_poly_prefer_held(&mut self, part_num: usize) -> bool {
        self.abort_first_poly(part_num, Some(PolyState::Held)) || self.abort_first_poly(part_num, None)
    }

    fn abort_first_poly_by_key(&mut self, part_num: usize, key: u8) -> bool {
        let found = self.parts[part_num]
            .active_polys()
            .find(|&id| self.polys[id].key() == key);
        match found {
            Some(id) => {
                self.abort_poly(id);
                true
            }
            None => false,
        }
    }

    /// Scan parts from 7 down to `min_part` (-1 or 8 reaching the rhythm
    /// part last) and abort one poly from the first part over its reserve.
    fn abort_where_reserve_exceeded(&mut self, target: AbortTarget, min_part: i32) -> bool {
        let min_part = if min_part == RHYTHM_PART as i32 { -1 } else { min_part };
        for part_num in (min_part..=7).rev() {
            let part_num = if part_num < 0 { RHYTHM_PART } else { part_num as usize };
            if self.part_active_partial_count(part_num) <= self.reserve[part_num] as usize {
                continue;
            }
            let aborted = match target {
                AbortTarget::Releasing => self.abort_first_poly(part_num, Some(PolyState::Releasing)),
                AbortTarget::PreferHeld => self.abort_first_poly_prefer_held(part_num),
            };
            if aborted {
                return true;
            }
        }
        false
    }

    /// Make at least `needed` partials free for `part_num`, aborting polys
    /// in priority order. Returns `false` if that is not possible.
    pub fn free_partials(&mut self, needed: usize, part_num: usize) -> bool {
        if needed == 0 || self.get_free_partial_count() >= needed {
            return true;
        }
        if part_num >= PART_COUNT {
            return false;
        }

        while self.abort_where_reserve_exceeded(AbortTarget::Releasing, -1) {
            if self.get_free_partial_count() >= needed {
                return true;
            }
        }

        let reserve = self.reserve[part_num] as usize;
        if self.part_active_non_releasing_partial_count(part_num) + needed > reserve {
            if self.parts[part_num].assign_mode() & 1 != 0 {
                return false;
            }
            while self.abort_where_reserve_exceeded(AbortTarget::PreferHeld, part_num as i32) {
                if self.get_free_partial_count() >= needed {
                    return true;
                }
            }
            if needed > reserve {
                return false;
            }
        } else {
            let min_part = if part_num == RHYTHM_PART { -1 } else { 0 };
            while self.abort_where_reserve_exceeded(AbortTarget::PreferHeld, min_part) {
                if self.get_free_partial_count() >= needed {
                    return true;
                }
            }
        }

        while self.abort_first_poly_prefer_held(part_num) {
            if self.get_free_partial_count() >= needed {
                return true;
            }
        }
        false
    }

    fn assign_poly_to_part(&mut self, part_num: usize) -> Option<PolyId> {
        let id = self.polys.iter().position(|p| !p.is_active())?;
        self.parts[part_num].active_polys.push_back(id);
        Some(id)
    }

    /// Start a note on a part. Returns `false` if nothing could be played.
    pub fn play_note(&mut self, part_num: usize, midi_key: u8, velocity: u8, pcm_rom: &PcmRom) -> bool {
        let Some(part) = self.parts.get(part_num) else {
            return false;
        };
        let (cache, panpot, key) = if part.is_rhythm() {
            match part.rhythm_key(midi_key) {
                Some(setup) => (*setup.patch_cache(), setup.panpot, midi_key),
                None => {
                    debug!("[Part {part_num}] no rhythm setup for key {midi_key}");
                    return false;
                }
            }
        } else {
            (*part.patch_cache(), part.panpot(), fold_key(midi_key))
        };
        let ctx = NoteContext {
            key,
            velocity,
            panpot,
            part_volume: part.volume(),
            pitch_bend: part.pitch_bend(),
        };

        let needed = cache[0].partial_count;
        if needed == 0 {
            debug!("[Part {part_num}] timbre is completely muted");
            return false;
        }
        if part.assign_mode() & 2 == 0 {
            self.abort_first_poly_by_key(part_num, key);
        }
        if !self.free_partials(needed, part_num) {
            debug!(
                "[Part {part_num}] insufficient free partials for key {midi_key} (needed {needed}, free {})",
                self.get_free_partial_count()
            );
            return false;
        }
        let Some(poly) = self.assign_poly_to_part(part_num) else {
            debug!("[Part {part_num}] no free poly for key {midi_key}");
            return false;
        };

        let mut partials = [None; 4];
        for (slot, entry) in partials.iter_mut().zip(cache.iter()) {
            if entry.play_partial {
                *slot = self.alloc_partial(part_num);
            }
        }
        self.polys[poly].reset(part_num, key, velocity, cache[0].sustain, partials);
        if !self.polys[poly].is_active() {
            self.parts[part_num].remove_poly(poly);
            return false;
        }
        for (t, entry) in cache.iter().enumerate() {
            if let (Some(a), Some(b)) = (partials[t], partials[entry.structure_pair]) {
                self.link_pair(a, b);
            }
        }
        for (t, entry) in cache.iter().enumerate() {
            if let Some(index) = partials[t] {
                self.start_partial(index, Some(poly), Some(entry), &ctx, pcm_rom);
            }
        }
        true
    }

    /// Set up a freshly allocated partial. Its pair must already be linked.
    pub fn start_partial(
        &mut self,
        index: usize,
        poly: Option<PolyId>,
        cache: Option<&PatchCache>,
        ctx: &NoteContext,
        pcm_rom: &PcmRom,
    ) {
        let (Some(poly), Some(cache)) = (poly, cache) else {
            debug!("[Partial {index}] start without poly or patch cache ignored");
            return;
        };
        let Some(partial) = self.partials.get_mut(index) else {
            return;
        };
        partial.patch_cache = *cache;
        partial.poly = Some(poly);
        partial.mix_type = cache.structure_mix;
        partial.structure_position = cache.structure_position;

        let mut pan = ctx.panpot.min(14);
        if partial.mix_type == 3 {
            // Stereo split: each half of the pair gets its own side.
            let numerators = if partial.structure_position == 0 {
                &PAN_NUMERATOR_MASTER
            } else {
                &PAN_NUMERATOR_SLAVE
            };
            pan = numerators[pan as usize] << 1;
            partial.mix_type = 0;
            self.unlink_pair(index);
        } else if !self.nice_panning {
            pan &= 0x0E;
        }

        let partial = &mut self.partials[index];
        let left = if self.reversed_stereo { 14 - pan } else { pan };
        let right = 14 - left;
        partial.left_pan = PAN_FACTORS[left as usize];
        partial.right_pan = PAN_FACTORS[right as usize];
        // LA32 hardware quirk: partials 8..15 of every 16 come out inverted.
        if index & 8 != 0 {
            partial.left_pan = -partial.left_pan;
            partial.right_pan = -partial.right_pan;
        }

        let param = cache.partial_param;
        partial
            .tva
            .reset(&param.tva, ctx.key, ctx.velocity, ctx.part_volume, cache.sustain);
        partial
            .tvp
            .reset(&param.wg, &param.pitch_env, ctx.key, ctx.velocity, ctx.pitch_bend);
        partial.tvf.reset(&param.tvf, ctx.key, ctx.velocity);

        let is_slave = partial.is_ring_modulating_slave();
        let has_slave = partial.has_ring_modulating_slave();
        let pair = partial.pair;
        let (unit, half) = match (is_slave, pair) {
            (true, Some(master)) => (master, PairHalf::Slave),
            _ => {
                partial.la32.init(has_slave, partial.mix_type == 1);
                (index, PairHalf::Master)
            }
        };

        let la32 = &mut self.partials[unit].la32;
        if cache.pcm_partial {
            let mut wave_index = cache.pcm as usize;
            if pcm_rom.wave_count() > 128 && cache.waveform > 1 {
                wave_index += 128;
            }
            match pcm_rom.wave(wave_index) {
                Some(wave) => la32.init_pcm(half, wave.addr, wave.len, wave.looped),
                None => {
                    debug!("[Partial {index}] PCM wave {wave_index} missing, partial stays silent");
                    la32.deactivate(half);
                }
            }
        } else {
            let sensitivity = param.wg.pulse_width_velo_sensitivity.min(14) as i32 - 7;
            let pulse_width = (param.wg.pulse_width as i32
                + (ctx.velocity as i32 - 64) * sensitivity / 16)
                .clamp(0, 100) as u8;
            la32.init_synth(half, cache.waveform & 1 != 0, pulse_width);
        }

        let partial = &mut self.partials[index];
        if is_slave {
            partial.la32.deactivate(PairHalf::Master);
            partial.la32.deactivate(PairHalf::Slave);
        } else if !has_slave {
            partial.la32.deactivate(PairHalf::Slave);
        }
        trace!(
            "[Partial {index}] started: poly {poly}, pair {:?}, mix {}, pan {left}/{right}",
            partial.pair,
            partial.mix_type
        );
    }

    /// Render one partial (and its ring-modulating slave) into the buses.
    /// Returns `false` if it produced nothing this pass.
    pub fn produce_output(&mut self, index: usize, left: &mut [i16], right: &mut [i16], pcm: &[i16]) -> bool {
        let Some(partial) = self.partials.get(index) else {
            return false;
        };
        if !partial.is_active() || partial.already_outputed || partial.is_ring_modulating_slave() {
            return false;
        }
        if partial.poly.is_none() {
            debug!("[Partial {index}] active without a poly, skipped");
            return false;
        }
        let mut slave = if partial.has_ring_modulating_slave() {
            partial.pair.filter(|&s| s != index)
        } else {
            None
        };
        self.partials[index].already_outputed = true;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let master = &self.partials[index];
            if !master.tva.is_playing() || !master.la32.is_active(PairHalf::Master) {
                self.deactivate(index);
                break;
            }
            let (amp, pitch, cutoff) = self.partials[index].next_envelope_values();
            self.partials[index]
                .la32
                .generate_next_sample(PairHalf::Master, amp, pitch, cutoff, pcm);

            if let Some(s) = slave {
                let (amp, pitch, cutoff) = self.partials[s].next_envelope_values();
                let slave_playing = self.partials[s].tva.is_playing();
                let master = &mut self.partials[index];
                master
                    .la32
                    .generate_next_sample(PairHalf::Slave, amp, pitch, cutoff, pcm);
                if !slave_playing || !master.la32.is_active(PairHalf::Slave) {
                    self.deactivate(s);
                    slave = None;
                    if self.partials[index].mix_type == 2 {
                        self.deactivate(index);
                        break;
                    }
                }
            }

            let partial = &self.partials[index];
            let sample = partial.la32.next_out_sample();
            partial.mix_output(l, r, sample);
        }
        true
    }

    /// Note-off for the oldest matching poly.
    pub fn stop_note(&mut self, part_num: usize, key: u8) {
        let Some(part) = self.parts.get(part_num) else {
            return;
        };
        let key = if part.is_rhythm() { key } else { fold_key(key) };
        let pedal_held = part.hold_pedal() && key != 0;
        for i in 0..part.active_poly_count() {
            let id = self.parts[part_num].active_polys[i];
            let poly = &mut self.polys[id];
            if poly.key() != key || !(poly.can_sustain() || key == 0) {
                continue;
            }
            if poly.note_off(pedal_held) {
                if !pedal_held {
                    self.start_poly_decay(id);
                }
                break;
            }
        }
    }

    fn start_poly_decay(&mut self, poly: PolyId) {
        for index in self.polys[poly].partials().into_iter().flatten() {
            self.partials[index].start_decay();
        }
    }

    pub fn set_hold_pedal(&mut self, part_num: usize, on: bool) {
        let Some(part) = self.parts.get_mut(part_num) else {
            return;
        };
        let was_on = part.hold_pedal();
        part.set_hold_pedal_flag(on);
        if was_on && !on {
            for i in 0..self.parts[part_num].active_poly_count() {
                let id = self.parts[part_num].active_polys[i];
                if self.polys[id].stop_pedal_hold() {
                    self.start_poly_decay(id);
                }
            }
        }
    }

    /// Note-off for every poly of the part, honouring the hold pedal.
    pub fn all_notes_off(&mut self, part_num: usize) {
        let Some(part) = self.parts.get(part_num) else {
            return;
        };
        let pedal_held = part.hold_pedal();
        for i in 0..part.active_poly_count() {
            let id = self.parts[part_num].active_polys[i];
            let poly = &mut self.polys[id];
            if (poly.can_sustain() || poly.key() == 0) && poly.note_off(pedal_held) && !pedal_held {
                self.start_poly_decay(id);
            }
        }
    }

    /// Cut every poly of the part immediately.
    pub fn all_sound_off(&mut self, part_num: usize) {
        if part_num >= PART_COUNT {
            return;
        }
        while self.abort_first_poly(part_num, None) {}
    }

    pub fn set_part_volume(&mut self, part_num: usize, volume: u8) {
        let Some(part) = self.parts.get_mut(part_num) else {
            return;
        };
        part.set_volume(volume);
        let volume = part.volume();
        for partial in &mut self.partials {
            if partial.owner_part == Some(part_num) {
                partial.tva.set_part_volume(volume);
            }
        }
    }

    pub fn set_pitch_bend(&mut self, part_num: usize, value: u16) {
        let Some(part) = self.parts.get_mut(part_num) else {
            return;
        };
        part.set_pitch_bend_raw(value);
        let bend = part.pitch_bend();
        for partial in &mut self.partials {
            if partial.owner_part == Some(part_num) {
                partial.tvp.set_bend(bend);
            }
        }
    }
}

/// Melodic parts play keys 12..=108; anything outside folds by octaves.
fn fold_key(mut key: u8) -> u8 {
    while key < 12 {
        key += 12;
    }
    while key > 108 {
        key -= 12;
    }
    key
}
