//! A single LA32 sound generator.
//!
//! A partial is owned by a part while active and belongs to one poly. Up to
//! two partials form a structure pair; in ring-modulated structures the
//! second partial (the slave) renders through the first one's LA32 pair
//! and produces no output of its own.
//!
//! Lifecycle and output are driven by [`PartialManager`], since both touch
//! the partial's pair and poly as well.
//!
//! [`PartialManager`]: crate::synth::partial_manager::PartialManager

use crate::dsp::la32::La32PartialPair;
use crate::dsp::sample::{mix_sample, IntSample, IntSampleEx};
use crate::patch::PatchCache;
use crate::synth::poly::PolyId;
use crate::synth::tva::Tva;
use crate::synth::tvf::Tvf;
use crate::synth::tvp::Tvp;

#[derive(Debug, Clone)]
pub struct Partial {
    number: usize,
    pub(crate) owner_part: Option<usize>,
    pub(crate) poly: Option<PolyId>,
    pub(crate) pair: Option<usize>,
    pub(crate) patch_cache: PatchCache,
    pub(crate) mix_type: u8,
    pub(crate) structure_position: u8,
    pub(crate) left_pan: IntSampleEx,
    pub(crate) right_pan: IntSampleEx,
    pub(crate) already_outputed: bool,
    pub(crate) tva: Tva,
    pub(crate) tvp: Tvp,
    pub(crate) tvf: Tvf,
    pub(crate) la32: La32PartialPair,
}

impl Partial {
    pub fn new(number: usize) -> Self {
        Self {
            number,
            owner_part: None,
            poly: None,
            pair: None,
            patch_cache: PatchCache::default(),
            mix_type: 0,
            structure_position: 0,
            left_pan: 0,
            right_pan: 0,
            already_outputed: false,
            tva: Tva::new(),
            tvp: Tvp::new(),
            tvf: Tvf::new(),
            la32: La32PartialPair::new(),
        }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn is_active(&self) -> bool {
        self.owner_part.is_some()
    }

    pub fn owner_part(&self) -> Option<usize> {
        self.owner_part
    }

    pub fn poly(&self) -> Option<PolyId> {
        self.poly
    }

    pub fn pair(&self) -> Option<usize> {
        self.pair
    }

    pub fn mix_type(&self) -> u8 {
        self.mix_type
    }

    pub fn structure_position(&self) -> u8 {
        self.structure_position
    }

    pub fn is_pcm(&self) -> bool {
        self.patch_cache.pcm_partial
    }

    pub fn should_reverb(&self) -> bool {
        self.patch_cache.reverb
    }

    pub fn tva(&self) -> &Tva {
        &self.tva
    }

    pub(crate) fn activate(&mut self, part: usize) {
        self.owner_part = Some(part);
        self.already_outputed = false;
    }

    fn is_ring_modulated_structure(&self) -> bool {
        matches!(self.mix_type, 1 | 2)
    }

    /// First partial of a ring-modulated pair whose partner is present.
    pub fn has_ring_modulating_slave(&self) -> bool {
        self.pair.is_some() && self.structure_position == 0 && self.is_ring_modulated_structure()
    }

    /// Second partial of a ring-modulated pair whose partner is present.
    pub fn is_ring_modulating_slave(&self) -> bool {
        self.pair.is_some() && self.structure_position == 1 && self.is_ring_modulated_structure()
    }

    /// Ring product only, master not mixed back in.
    pub fn is_ring_modulating_no_mix(&self) -> bool {
        self.pair.is_some() && self.mix_type == 2
    }

    pub(crate) fn start_decay(&mut self) {
        self.tva.start_decay();
        self.tvp.start_decay();
        self.tvf.start_decay();
    }

    /// Amplitude, pitch and cutoff for the next sample.
    pub(crate) fn next_envelope_values(&mut self) -> (u32, u16, u8) {
        (self.tva.next_amp(), self.tvp.next_pitch(), self.tvf.next_cutoff())
    }

    /// Pan and accumulate one sample into the stereo buses.
    pub(crate) fn mix_output(&self, left: &mut IntSample, right: &mut IntSample, sample: IntSample) {
        mix_sample(left, (sample as IntSampleEx * self.left_pan) >> 13);
        mix_sample(right, (sample as IntSampleEx * self.right_pan) >> 13);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_roles_depend_on_pair_and_position() {
        let mut master = Partial::new(0);
        master.mix_type = 1;
        assert!(!master.has_ring_modulating_slave());
        master.pair = Some(1);
        assert!(master.has_ring_modulating_slave());
        assert!(!master.is_ring_modulating_slave());

        let mut slave = Partial::new(1);
        slave.mix_type = 2;
        slave.structure_position = 1;
        slave.pair = Some(0);
        assert!(slave.is_ring_modulating_slave());
        assert!(slave.is_ring_modulating_no_mix());

        slave.mix_type = 0;
        assert!(!slave.is_ring_modulating_slave());
    }

    #[test]
    fn mix_output_applies_pan() {
        let mut partial = Partial::new(0);
        partial.left_pan = 8192;
        partial.right_pan = 4096;
        let (mut l, mut r) = (100, 100);
        partial.mix_output(&mut l, &mut r, 1000);
        assert_eq!((l, r), (1100, 600));
    }
}
