// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Capture-unit identifiers and DSP parameter data model.

use crate::error::ValidationError;
use crate::memory_map;

/// A capture unit identifier, 0..=7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureUnitId(u32);

impl CaptureUnitId {
    pub const COUNT: u32 = 8;

    pub fn new(id: u32) -> Result<Self, ValidationError> {
        if id >= Self::COUNT {
            return Err(ValidationError::new(
                "CaptureUnitId::new",
                format!("capture unit id {id} out of range, expected 0..={}", Self::COUNT - 1),
            ));
        }
        Ok(Self(id))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<CaptureUnitId> for u32 {
    fn from(id: CaptureUnitId) -> u32 {
        id.0
    }
}

impl CaptureUnitId {
    /// The capture module this unit belongs to. Units 0..=3 belong to
    /// module 0 and units 4..=7 to module 1 — this grouping is this crate's
    /// own convention, matching the two capture-module trigger-source
    /// registers the memory map reserves.
    pub fn module(self) -> CaptureModuleId {
        CaptureModuleId(self.0 / 4)
    }
}

/// A capture module identifier, 0..=1. Each module owns one
/// AWG-trigger-source register shared by its four capture units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureModuleId(u32);

impl CaptureModuleId {
    pub const COUNT: u32 = 2;

    pub fn new(id: u32) -> Result<Self, ValidationError> {
        if id >= Self::COUNT {
            return Err(ValidationError::new(
                "CaptureModuleId::new",
                format!("capture module id {id} out of range, expected 0..={}", Self::COUNT - 1),
            ));
        }
        Ok(Self(id))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// One entry of the post-DSP summation table: sum over `sum_section_length`
/// words, then skip `post_blank_length` words before the next section.
#[derive(Debug, Clone, Copy)]
pub struct SumSection {
    pub sum_section_length: u32,
    pub post_blank_length: u32,
}

/// Which optional DSP stages are enabled for a capture unit.
/// Stored as a bitset over the register's `DSP_ENABLE_MASK` field; bit
/// positions are this crate's own convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DspStage {
    ComplexFir,
    RealFirI,
    RealFirQ,
    Window,
    Sum,
    Decision,
    Integration,
    Classification,
}

impl DspStage {
    fn bit(self) -> u32 {
        match self {
            Self::ComplexFir => 0,
            Self::RealFirI => 1,
            Self::RealFirQ => 2,
            Self::Window => 3,
            Self::Sum => 4,
            Self::Decision => 5,
            Self::Integration => 6,
            Self::Classification => 7,
        }
    }
}

/// Encode an IEEE-754 single-precision decision-function coefficient as the
/// 32-bit word a register write carries; the write path little-endian-encodes
/// the word itself.
pub fn encode_f32(v: f32) -> u32 {
    v.to_bits()
}

pub fn decode_f32(word: u32) -> f32 {
    f32::from_bits(word)
}

/// A linear decision boundary `a*I + b*Q + c` evaluated per sum result;
/// two of these run per capture unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionFunc {
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

/// Full DSP parameter set for one capture unit.
#[derive(Debug, Clone)]
pub struct CaptureParam {
    num_integ_sections: u32,
    capture_delay: u32,
    dsp_enabled: Vec<DspStage>,
    sum_sections: Vec<SumSection>,
    complex_fir_coefs: Option<[(i32, i32); 8]>,
    real_fir_i_coefs: Option<[i32; 8]>,
    real_fir_q_coefs: Option<[i32; 8]>,
    window_coefs: Vec<(i32, i32)>,
    sum_start_word_no: u32,
    num_words_to_sum: u32,
    decision_funcs: [DecisionFunc; 2],
}

impl CaptureParam {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        num_integ_sections: u32,
        capture_delay: u32,
        dsp_enabled: Vec<DspStage>,
        sum_sections: Vec<SumSection>,
        complex_fir_coefs: Option<[(i32, i32); 8]>,
        real_fir_i_coefs: Option<[i32; 8]>,
        real_fir_q_coefs: Option<[i32; 8]>,
        window_coefs: Vec<(i32, i32)>,
        sum_start_word_no: u32,
        num_words_to_sum: u32,
        decision_funcs: [DecisionFunc; 2],
    ) -> Result<Self, ValidationError> {
        if sum_sections.len() as u64 > memory_map::CAP_REG_MAX_SUM_SECTIONS {
            return Err(ValidationError::new(
                "CaptureParam::new",
                format!(
                    "{} sum sections exceeds the {}-entry table",
                    sum_sections.len(),
                    memory_map::CAP_REG_MAX_SUM_SECTIONS
                ),
            ));
        }
        if window_coefs.len() as u64 > memory_map::CAP_REG_WINDOW_TAPS {
            return Err(ValidationError::new(
                "CaptureParam::new",
                format!(
                    "{} window taps exceeds the {}-tap table",
                    window_coefs.len(),
                    memory_map::CAP_REG_WINDOW_TAPS
                ),
            ));
        }
        Ok(Self {
            num_integ_sections,
            capture_delay,
            dsp_enabled,
            sum_sections,
            complex_fir_coefs,
            real_fir_i_coefs,
            real_fir_q_coefs,
            window_coefs,
            sum_start_word_no,
            num_words_to_sum,
            decision_funcs,
        })
    }

    pub fn num_integ_sections(&self) -> u32 {
        self.num_integ_sections
    }

    pub fn capture_delay(&self) -> u32 {
        self.capture_delay
    }

    pub fn dsp_enable_mask(&self) -> u32 {
        self.dsp_enabled.iter().fold(0u32, |m, s| m | (1 << s.bit()))
    }

    pub fn sum_sections(&self) -> &[SumSection] {
        &self.sum_sections
    }

    pub fn complex_fir_coefs(&self) -> Option<&[(i32, i32); 8]> {
        self.complex_fir_coefs.as_ref()
    }

    pub fn real_fir_i_coefs(&self) -> Option<&[i32; 8]> {
        self.real_fir_i_coefs.as_ref()
    }

    pub fn real_fir_q_coefs(&self) -> Option<&[i32; 8]> {
        self.real_fir_q_coefs.as_ref()
    }

    pub fn window_coefs(&self) -> &[(i32, i32)] {
        &self.window_coefs
    }

    pub fn sum_start_word_no(&self) -> u32 {
        self.sum_start_word_no
    }

    pub fn num_words_to_sum(&self) -> u32 {
        self.num_words_to_sum
    }

    pub fn decision_funcs(&self) -> &[DecisionFunc; 2] {
        &self.decision_funcs
    }

    pub fn dsp_stage_enabled(&self, stage: DspStage) -> bool {
        self.dsp_enabled.contains(&stage)
    }

    /// Number of capture results this unit will produce: one per sum
    /// section when SUM collapses the capture, otherwise the raw sample
    /// count spanned by `num_words_to_sum`. Used by the controller's
    /// pre-write size checks.
    pub fn capture_samples(&self) -> u32 {
        if self.dsp_stage_enabled(DspStage::Sum) {
            self.sum_sections.len() as u32
        } else {
            self.num_words_to_sum * memory_map::ADC_WORD_SAMPLES
        }
    }

    /// Element count of the integration output vector: when SUM is also
    /// enabled each section already collapsed to one sample, so the vector
    /// has one element per `capture_samples()`; otherwise every 4 raw
    /// samples (one ADC word) integrate down to one element.
    pub fn integ_vec_elems(&self) -> u32 {
        if self.dsp_stage_enabled(DspStage::Sum) {
            self.capture_samples()
        } else {
            self.capture_samples() / memory_map::ADC_WORD_SAMPLES
        }
    }
}

impl Default for CaptureParam {
    /// An all-zero, no-DSP parameter set: the null configuration
    /// `CaptureController::initialize` installs on every unit it resets.
    fn default() -> Self {
        Self::new(1, 0, vec![], vec![], None, None, None, vec![], 0, 0, [
            DecisionFunc::default(),
            DecisionFunc::default(),
        ])
        .expect("an all-zero CaptureParam is always within the registers' limits")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_param() -> CaptureParam {
        CaptureParam::new(
            1,
            0,
            vec![],
            vec![],
            None,
            None,
            None,
            vec![],
            0,
            0,
            [DecisionFunc::default(), DecisionFunc::default()],
        )
        .unwrap()
    }

    #[test]
    fn rejects_too_many_sum_sections() {
        let sections = vec![SumSection { sum_section_length: 1, post_blank_length: 0 }; 17];
        assert!(CaptureParam::new(1, 0, vec![], sections, None, None, None, vec![], 0, 0, [
            DecisionFunc::default(),
            DecisionFunc::default()
        ])
        .is_err());
    }

    #[test]
    fn rejects_oversized_window() {
        let window = vec![(0, 0); 1025];
        assert!(CaptureParam::new(1, 0, vec![], vec![], None, None, None, window, 0, 0, [
            DecisionFunc::default(),
            DecisionFunc::default()
        ])
        .is_err());
    }

    #[test]
    fn dsp_enable_mask_combines_bits() {
        let p = CaptureParam::new(
            1,
            0,
            vec![DspStage::Window, DspStage::Sum],
            vec![],
            None,
            None,
            None,
            vec![],
            0,
            0,
            [DecisionFunc::default(), DecisionFunc::default()],
        )
        .unwrap();
        assert_eq!(p.dsp_enable_mask(), (1 << 3) | (1 << 4));
    }

    #[test]
    fn float_word_round_trips() {
        let word = encode_f32(-1.5);
        assert_eq!(decode_f32(word), -1.5);
    }

    #[test]
    fn unit_maps_to_expected_module() {
        assert_eq!(CaptureUnitId::new(0).unwrap().module().get(), 0);
        assert_eq!(CaptureUnitId::new(3).unwrap().module().get(), 0);
        assert_eq!(CaptureUnitId::new(4).unwrap().module().get(), 1);
        assert_eq!(CaptureUnitId::new(7).unwrap().module().get(), 1);
    }

    #[test]
    fn minimal_param_constructs() {
        let p = minimal_param();
        assert_eq!(p.num_integ_sections(), 1);
    }

    #[test]
    fn capture_samples_counts_sum_sections_when_sum_enabled() {
        let p = CaptureParam::new(
            1,
            0,
            vec![DspStage::Sum],
            vec![
                SumSection { sum_section_length: 4, post_blank_length: 0 },
                SumSection { sum_section_length: 4, post_blank_length: 0 },
            ],
            None,
            None,
            None,
            vec![],
            0,
            0,
            [DecisionFunc::default(), DecisionFunc::default()],
        )
        .unwrap();
        assert_eq!(p.capture_samples(), 2);
    }

    #[test]
    fn capture_samples_falls_back_to_raw_word_span_without_sum() {
        let p = CaptureParam::new(
            1, 0, vec![], vec![], None, None, None, vec![], 0, 32, [
                DecisionFunc::default(),
                DecisionFunc::default(),
            ],
        )
        .unwrap();
        assert_eq!(p.capture_samples(), 32 * memory_map::ADC_WORD_SAMPLES);
    }

    #[test]
    fn integ_vec_elems_divides_by_adc_word_size_without_sum() {
        let p = CaptureParam::new(
            1,
            0,
            vec![DspStage::Integration],
            vec![],
            None,
            None,
            None,
            vec![],
            0,
            32,
            [DecisionFunc::default(), DecisionFunc::default()],
        )
        .unwrap();
        assert_eq!(p.integ_vec_elems(), 32);
    }

    #[test]
    fn default_param_is_all_zero() {
        let p = CaptureParam::default();
        assert_eq!(p.capture_delay(), 0);
        assert_eq!(p.dsp_enable_mask(), 0);
        assert!(p.sum_sections().is_empty());
    }
}
