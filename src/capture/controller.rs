// SPDX-License-Identifier: Apache-2.0 OR MIT

//! High-level control of the 8 capture units behind one instrument.
//! Mirrors [`crate::awg::AwgController`]'s critical-section and
//! registry-vs-live pattern; see that module for the shared-lock rationale.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::access::{ParamRegistryAccessor, RegisterAccessor, WaveRamAccessor};
use crate::awg::AwgId;
use crate::capture::types::{CaptureParam, CaptureUnitId, DspStage};
use crate::config::Config;
use crate::error::{CaptureFault, Error, Result, ValidationError};
use crate::lock::InterProcessLock;
use crate::logging::{self, Level, Logger};
use crate::memory_map;
use crate::transport::Transport;
use crate::util::{self, ErrOrTimeout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamDest {
    Live,
    Registry(u16),
}

/// Host-side handle for the 8 capture units of one instrument.
pub struct CaptureController {
    register: RegisterAccessor,
    waveram: WaveRamAccessor,
    paramreg: ParamRegistryAccessor,
    lock: InterProcessLock,
    loggers: Vec<Arc<dyn Logger>>,
    config: Config,
}

impl CaptureController {
    /// Minimum time the reset line must be held and then held clear.
    const RESET_PULSE_WIDTH: Duration = Duration::from_micros(10);

    pub fn new(
        reg_transport: Arc<dyn Transport>,
        wave_transport: Arc<dyn Transport>,
        canonical_ip: &str,
        config: Config,
    ) -> Self {
        Self {
            register: RegisterAccessor::new(reg_transport, config.mtu),
            waveram: WaveRamAccessor::new(wave_transport.clone(), config.mtu),
            paramreg: ParamRegistryAccessor::new(wave_transport, config.mtu),
            lock: InterProcessLock::for_capture_ip(canonical_ip),
            loggers: Vec::new(),
            config,
        }
    }

    pub fn add_logger(&mut self, logger: Arc<dyn Logger>) {
        self.loggers.push(logger);
    }

    fn log(&self, level: Level, message: &str) {
        logging::emit(&self.loggers, level, message);
    }

    // =========================================================================
    // Master-control critical sections
    // =========================================================================

    fn select_mask(ids: &[CaptureUnitId]) -> u32 {
        ids.iter()
            .fold(0u32, |mask, id| mask | (1 << memory_map::cap_ctrl_target_sel_bit(id.get())))
    }

    fn critical_section<T>(
        &self,
        ids: &[CaptureUnitId],
        action: impl FnOnce(u32) -> Result<T>,
    ) -> Result<T> {
        let _guard = self.lock.acquire().map_err(Error::from)?;
        let mask = Self::select_mask(ids);
        let result = action(mask);
        let deselect = self
            .register
            .write(memory_map::CAP_MASTER_CTRL_REG_ADDR, 0, 0)
            .map_err(Error::from);
        match result {
            Ok(v) => deselect.map(|()| v),
            Err(e) => Err(e),
        }
    }

    fn pulse(&self, ids: &[CaptureUnitId], bit: u32) -> Result<()> {
        self.critical_section(ids, |mask| {
            self.register
                .write(memory_map::CAP_MASTER_CTRL_REG_ADDR, 0, mask | (1 << bit))
                .map_err(Into::into)
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Disable the start trigger, clear each unit's control register, reset
    /// every unit, then install an all-zero [`CaptureParam`] so a unit
    /// started before real parameters are programmed does nothing harmful.
    pub fn initialize(&self, ids: &[CaptureUnitId]) -> Result<()> {
        self.disable_start_trigger(ids)?;
        self.critical_section(ids, |_mask| Ok(()))?;
        for id in ids {
            self.register.write(memory_map::cap_reg_base(id.get()), memory_map::CAP_REG_OFF_CTRL, 0)?;
        }
        self.reset_capture_units(ids)?;
        let null_param = CaptureParam::default();
        for id in ids {
            self.set_capture_params(*id, &null_param)?;
        }
        self.log(Level::Info, &format!("initialized capture units {:?}", ids_as_u32(ids)));
        Ok(())
    }

    /// Raise `CTRL_RESET`, hold it, then clear it — mirrors
    /// [`crate::awg::AwgController::reset_awgs`]'s pulse width.
    pub fn reset_capture_units(&self, ids: &[CaptureUnitId]) -> Result<()> {
        self.critical_section(ids, |mask| {
            self.register.write(
                memory_map::CAP_MASTER_CTRL_REG_ADDR,
                0,
                mask | (1 << memory_map::CAP_CTRL_RESET_BIT),
            )?;
            std::thread::sleep(Self::RESET_PULSE_WIDTH);
            self.register.write(memory_map::CAP_MASTER_CTRL_REG_ADDR, 0, mask)?;
            std::thread::sleep(Self::RESET_PULSE_WIDTH);
            Ok(())
        })
    }

    pub fn clear_capture_stop_flags(&self, ids: &[CaptureUnitId]) -> Result<()> {
        self.pulse(ids, memory_map::CAP_CTRL_DONE_CLR_BIT)
    }

    pub fn start_capture_units(&self, ids: &[CaptureUnitId]) -> Result<()> {
        self.pulse(ids, memory_map::CAP_CTRL_START_BIT)
    }

    /// Route the AWG-start event of `awg_id` to capture `module`'s trigger
    /// input, so capture units in that module can start from it. `None`
    /// disables the module's trigger input; encoded on the wire as `0`,
    /// with AWG `k` encoded as `k + 1`.
    pub fn select_trigger_awg(
        &self,
        module: crate::capture::types::CaptureModuleId,
        awg_id: Option<AwgId>,
    ) -> Result<()> {
        let encoded = match awg_id {
            None => 0,
            Some(id) => id.get() + 1,
        };
        self.register
            .write(memory_map::cap_module_trig_src_reg_addr(module.get()), 0, encoded)
            .map_err(Into::into)
    }

    /// Enable (or, via [`Self::disable_start_trigger`]) whether each unit in
    /// `ids` actually starts when its module's selected AWG starts.
    pub fn enable_start_trigger(&self, ids: &[CaptureUnitId]) -> Result<()> {
        self.set_trigger_mask_bits(ids, true)
    }

    pub fn disable_start_trigger(&self, ids: &[CaptureUnitId]) -> Result<()> {
        self.set_trigger_mask_bits(ids, false)
    }

    fn set_trigger_mask_bits(&self, ids: &[CaptureUnitId], enabled: bool) -> Result<()> {
        for id in ids {
            self.register.write_bits(
                memory_map::AWG_TRIG_MASK_REG_ADDR,
                0,
                memory_map::cap_ctrl_target_sel_bit(id.get()),
                1,
                enabled as u32,
            )?;
        }
        Ok(())
    }

    pub fn wait_for_capture_units_to_stop(&self, ids: &[CaptureUnitId], timeout: Duration) -> Result<()> {
        let result: std::result::Result<(), ErrOrTimeout<Error>> = util::poll_until_empty(
            "wait_for_capture_units_to_stop",
            timeout,
            self.config.poll_interval,
            || {
                let mut pending = Vec::new();
                for id in ids {
                    let done = self.register.read_bits(
                        memory_map::cap_reg_base(id.get()),
                        memory_map::CAP_REG_OFF_STATUS,
                        memory_map::CAP_STATUS_DONE_BIT,
                        1,
                    )?;
                    if done == 0 {
                        pending.push(*id);
                    }
                }
                Ok(pending)
            },
        );
        unwrap_poll(result)
    }

    // =========================================================================
    // DSP parameters
    // =========================================================================

    pub fn set_capture_params(&self, id: CaptureUnitId, param: &CaptureParam) -> Result<()> {
        self.program_params(id, ParamDest::Live, param)
    }

    pub fn register_capture_params(&self, id: CaptureUnitId, entry: u16, param: &CaptureParam) -> Result<()> {
        self.program_params(id, ParamDest::Registry(entry), param)
    }

    /// Reject `param` before any register is touched if its DSP output
    /// would exceed a hardware size limit. SUM ranges that are merely risky
    /// (not impossible) are warned through the controller's logger instead
    /// of refused.
    fn validate_params(&self, param: &CaptureParam) -> Result<()> {
        let integration = param.dsp_stage_enabled(DspStage::Integration);
        let classification = param.dsp_stage_enabled(DspStage::Classification);

        if integration {
            let elems = param.integ_vec_elems();
            if elems > memory_map::MAX_INTEG_VEC_ELEMS {
                return Err(Error::from(ValidationError::new(
                    "CaptureController::program_params",
                    format!(
                        "integration vector would have {elems} elements, exceeding the {}-element limit",
                        memory_map::MAX_INTEG_VEC_ELEMS
                    ),
                )));
            }
        }

        if classification {
            let results = param.capture_samples();
            if results > memory_map::MAX_CLASSIFICATION_RESULTS {
                return Err(Error::from(ValidationError::new(
                    "CaptureController::program_params",
                    format!(
                        "{results} classification results exceeds the {}-result limit",
                        memory_map::MAX_CLASSIFICATION_RESULTS
                    ),
                )));
            }
        } else if !integration {
            let samples = param.capture_samples();
            if samples > memory_map::MAX_CAPTURE_SAMPLES {
                return Err(Error::from(ValidationError::new(
                    "CaptureController::program_params",
                    format!(
                        "{samples} capture samples exceeds the {}-sample limit",
                        memory_map::MAX_CAPTURE_SAMPLES
                    ),
                )));
            }
        }

        if param.dsp_stage_enabled(DspStage::Sum) {
            for (i, section) in param.sum_sections().iter().enumerate() {
                if section.sum_section_length > memory_map::MAX_SUM_RANGE_LEN {
                    self.log(
                        Level::Warning,
                        &format!(
                            "sum section {i} sums {} words, beyond the {}-word guideline and at risk of accumulator overflow",
                            section.sum_section_length, memory_map::MAX_SUM_RANGE_LEN
                        ),
                    );
                }
            }
        }

        Ok(())
    }

    fn program_params(&self, id: CaptureUnitId, dest: ParamDest, param: &CaptureParam) -> Result<()> {
        self.validate_params(param)?;

        let j = id.get();
        self.write_word(j, dest, memory_map::CAP_REG_OFF_CAPTURE_DELAY, param.capture_delay())?;
        self.write_word(
            j,
            dest,
            memory_map::CAP_REG_OFF_NUM_INTEG_SECTIONS,
            param.num_integ_sections(),
        )?;
        self.write_word(j, dest, memory_map::CAP_REG_OFF_DSP_ENABLE_MASK, param.dsp_enable_mask())?;
        self.write_word(
            j,
            dest,
            memory_map::CAP_REG_OFF_NUM_SUM_SECTIONS,
            param.sum_sections().len() as u32,
        )?;

        let mut sum_words = Vec::with_capacity(param.sum_sections().len() * 2);
        for s in param.sum_sections() {
            sum_words.push(s.sum_section_length);
            sum_words.push(s.post_blank_length);
        }
        self.write_words(j, dest, memory_map::CAP_REG_OFF_SUM_SECTION_TABLE, &sum_words)?;

        if let Some(taps) = param.complex_fir_coefs() {
            let mut words = Vec::with_capacity(16);
            for (re, im) in taps {
                words.push(*re as u32);
                words.push(*im as u32);
            }
            self.write_words(j, dest, memory_map::CAP_REG_OFF_CFIR, &words)?;
        }
        if let Some(taps) = param.real_fir_i_coefs() {
            let words: Vec<u32> = taps.iter().map(|v| *v as u32).collect();
            self.write_words(j, dest, memory_map::CAP_REG_OFF_RFIR_I, &words)?;
        }
        if let Some(taps) = param.real_fir_q_coefs() {
            let words: Vec<u32> = taps.iter().map(|v| *v as u32).collect();
            self.write_words(j, dest, memory_map::CAP_REG_OFF_RFIR_Q, &words)?;
        }
        if !param.window_coefs().is_empty() {
            let mut words = Vec::with_capacity(param.window_coefs().len() * 2);
            for (re, im) in param.window_coefs() {
                words.push(*re as u32);
                words.push(*im as u32);
            }
            self.write_words(j, dest, memory_map::CAP_REG_OFF_WINDOW, &words)?;
        }

        self.write_word(j, dest, memory_map::CAP_REG_OFF_SUM_START_WORD_NO, param.sum_start_word_no())?;
        let sum_end_word_no = (param.sum_start_word_no() + param.num_words_to_sum())
            .saturating_sub(1)
            .min(memory_map::MAX_SUM_SECTION_LEN);
        self.write_word(j, dest, memory_map::CAP_REG_OFF_SUM_END_WORD_NO, sum_end_word_no)?;

        let d0 = &param.decision_funcs()[0];
        let d1 = &param.decision_funcs()[1];
        let decision_words = [
            crate::capture::types::encode_f32(d0.a),
            crate::capture::types::encode_f32(d0.b),
            crate::capture::types::encode_f32(d0.c),
            crate::capture::types::encode_f32(d1.a),
            crate::capture::types::encode_f32(d1.b),
            crate::capture::types::encode_f32(d1.c),
        ];
        self.write_words(j, dest, memory_map::CAP_REG_OFF_DECISION_U0, &decision_words)?;
        Ok(())
    }

    fn write_word(&self, j: u32, dest: ParamDest, offset: u64, value: u32) -> Result<()> {
        match dest {
            ParamDest::Live => self
                .register
                .write(memory_map::cap_reg_base(j), offset, value)
                .map_err(Into::into),
            ParamDest::Registry(entry) => self
                .paramreg
                .write(memory_map::capture_param_registry_addr(entry as u32) + offset, value)
                .map_err(Into::into),
        }
    }

    fn write_words(&self, j: u32, dest: ParamDest, offset: u64, values: &[u32]) -> Result<()> {
        match dest {
            ParamDest::Live => self
                .register
                .multi_write(memory_map::cap_reg_base(j), offset, values)
                .map_err(Into::into),
            ParamDest::Registry(entry) => self
                .paramreg
                .multi_write(memory_map::capture_param_registry_addr(entry as u32) + offset, values)
                .map_err(Into::into),
        }
    }

    // =========================================================================
    // Captured data
    // =========================================================================

    pub fn num_captured_samples(&self, id: CaptureUnitId) -> Result<u32> {
        self.register
            .read(memory_map::cap_reg_base(id.get()), memory_map::CAP_REG_OFF_NUM_CAPTURED_SAMPLES)
            .map_err(Into::into)
    }

    /// (I, Q) samples captured by `id`, as IEEE-754 little-endian f32 pairs —
    /// capture DSP output is floating point regardless of the AWG's int16
    /// input format.
    pub fn get_capture_data(&self, id: CaptureUnitId, num_samples: u32) -> Result<Vec<(f32, f32)>> {
        let byte_len = memory_map::ceil32(num_samples as u64 * memory_map::CAPTURE_SAMPLE_BYTES);
        let bytes = self.waveram.read(memory_map::cap_wave_base(id.get()), byte_len)?;
        Ok(bytes
            .chunks_exact(8)
            .take(num_samples as usize)
            .map(|c| {
                (
                    f32::from_le_bytes(c[0..4].try_into().unwrap()),
                    f32::from_le_bytes(c[4..8].try_into().unwrap()),
                )
            })
            .collect())
    }

    /// Decision-function classification results, 2 bits per result,
    /// unpacked in capture order.
    pub fn get_classification_results(&self, id: CaptureUnitId, num_results: u32) -> Result<Vec<u8>> {
        let num_bytes = (num_results as u64 + 3) / 4;
        let bytes = self.waveram.read(memory_map::cap_wave_base(id.get()), memory_map::ceil32(num_bytes))?;
        Ok((0..num_results)
            .map(|i| {
                let byte = bytes[(i / 4) as usize];
                let shift = (i % 4) * 2;
                (byte >> shift) & 0b11
            })
            .collect())
    }

    /// Faults latched since the last `clear_capture_stop_flags`, per unit.
    /// Units with no latched fault are omitted from the result.
    pub fn check_err(&self, ids: &[CaptureUnitId]) -> Result<HashMap<CaptureUnitId, Vec<CaptureFault>>> {
        let mut out = HashMap::new();
        for id in ids {
            let bits = self
                .register
                .read(memory_map::cap_reg_base(id.get()), memory_map::CAP_REG_OFF_ERR)?;
            let mut faults = Vec::new();
            if bits & (1 << memory_map::CAP_ERR_OVERFLOW_BIT) != 0 {
                faults.push(CaptureFault::Overflow);
            }
            if bits & (1 << memory_map::CAP_ERR_WRITE_BIT) != 0 {
                faults.push(CaptureFault::MemWrite);
            }
            if !faults.is_empty() {
                out.insert(*id, faults);
            }
        }
        Ok(out)
    }

    /// Hardware version word for capture unit `id`, as `(major, minor, patch)`.
    /// Packing convention matches [`crate::awg::AwgController::version`].
    pub fn version(&self, id: CaptureUnitId) -> Result<(u8, u8, u16)> {
        let raw = self
            .register
            .read(memory_map::cap_reg_base(id.get()), memory_map::CAP_REG_OFF_VERSION)?;
        Ok(((raw >> 24) as u8, (raw >> 16) as u8, (raw & 0xFFFF) as u16))
    }
}

fn unwrap_poll<T>(r: std::result::Result<T, ErrOrTimeout<Error>>) -> Result<T> {
    match r {
        Ok(v) => Ok(v),
        Err(ErrOrTimeout::Other(e)) => Err(e),
        Err(ErrOrTimeout::Timeout(t)) => Err(t.into()),
    }
}

fn ids_as_u32(ids: &[CaptureUnitId]) -> Vec<u32> {
    ids.iter().map(|id| id.get()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::types::{CaptureModuleId, DecisionFunc, DspStage, SumSection};
    use crate::transport::udp::fake::FakeTransport;
    use std::sync::Mutex as StdMutex;

    fn controller() -> CaptureController {
        let fake = Arc::new(FakeTransport::new());
        CaptureController::new(fake.clone(), fake, "127.0.0.1", Config::default())
    }

    struct CollectingLogger(StdMutex<Vec<String>>);

    impl Logger for CollectingLogger {
        fn log(&self, level: Level, message: &str) -> std::io::Result<()> {
            self.0.lock().unwrap().push(format!("{}:{message}", level as u8));
            Ok(())
        }
    }

    fn param_with_decisions() -> CaptureParam {
        CaptureParam::new(
            1,
            10,
            vec![DspStage::Decision],
            vec![],
            None,
            None,
            None,
            vec![],
            0,
            100,
            [
                DecisionFunc { a: 1.0, b: -2.0, c: 0.5 },
                DecisionFunc { a: 0.0, b: 1.0, c: 0.0 },
            ],
        )
        .unwrap()
    }

    #[test]
    fn set_capture_params_writes_capture_delay() {
        let ctrl = controller();
        let id = CaptureUnitId::new(2).unwrap();
        ctrl.set_capture_params(id, &param_with_decisions()).unwrap();
        assert_eq!(
            ctrl.register
                .read(memory_map::cap_reg_base(2), memory_map::CAP_REG_OFF_CAPTURE_DELAY)
                .unwrap(),
            10
        );
    }

    #[test]
    fn register_capture_params_writes_decision_coefficients_to_registry() {
        let ctrl = controller();
        let id = CaptureUnitId::new(0).unwrap();
        ctrl.register_capture_params(id, 9, &param_with_decisions()).unwrap();
        let addr = memory_map::capture_param_registry_addr(9) + memory_map::CAP_REG_OFF_DECISION_U0;
        let word = ctrl.paramreg.read(addr).unwrap();
        assert_eq!(crate::capture::types::decode_f32(word), 1.0);
    }

    #[test]
    fn get_capture_data_decodes_iq_float_samples() {
        let ctrl = controller();
        let id = CaptureUnitId::new(1).unwrap();
        let base = memory_map::cap_wave_base(1);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        bytes.extend_from_slice(&(-2.0f32).to_le_bytes());
        bytes.extend_from_slice(&3.25f32.to_le_bytes());
        bytes.extend_from_slice(&4.0f32.to_le_bytes());
        bytes.resize(64, 0);
        ctrl.waveram.write(base, &bytes).unwrap();
        let data = ctrl.get_capture_data(id, 2).unwrap();
        assert_eq!(data, vec![(1.5, -2.0), (3.25, 4.0)]);
    }

    #[test]
    fn get_classification_results_unpacks_two_bit_fields() {
        let ctrl = controller();
        let id = CaptureUnitId::new(3).unwrap();
        let base = memory_map::cap_wave_base(3);
        // 0b11_10_01_00 -> results [0, 1, 2, 3] least-significant-first.
        let mut bytes = vec![0b11_10_01_00];
        bytes.resize(32, 0);
        ctrl.waveram.write(base, &bytes).unwrap();
        assert_eq!(ctrl.get_classification_results(id, 4).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn check_err_omits_clean_units() {
        let ctrl = controller();
        let clean = CaptureUnitId::new(0).unwrap();
        let faulty = CaptureUnitId::new(1).unwrap();
        ctrl.register
            .write(
                memory_map::cap_reg_base(1),
                memory_map::CAP_REG_OFF_ERR,
                1 << memory_map::CAP_ERR_OVERFLOW_BIT,
            )
            .unwrap();
        let faults = ctrl.check_err(&[clean, faulty]).unwrap();
        assert!(!faults.contains_key(&clean));
        assert_eq!(faults[&faulty], vec![CaptureFault::Overflow]);
    }

    #[test]
    fn wait_for_capture_units_to_stop_times_out_when_never_done() {
        let ctrl = controller();
        let id = CaptureUnitId::new(5).unwrap();
        let err = ctrl
            .wait_for_capture_units_to_stop(&[id], Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[test]
    fn select_trigger_awg_writes_module_register() {
        let ctrl = controller();
        ctrl.select_trigger_awg(CaptureModuleId::new(1).unwrap(), Some(AwgId::new(3).unwrap()))
            .unwrap();
        assert_eq!(
            ctrl.register
                .read(memory_map::cap_module_trig_src_reg_addr(1), 0)
                .unwrap(),
            4
        );
    }

    #[test]
    fn select_trigger_awg_none_writes_zero() {
        let ctrl = controller();
        ctrl.select_trigger_awg(CaptureModuleId::new(1).unwrap(), Some(AwgId::new(3).unwrap()))
            .unwrap();
        ctrl.select_trigger_awg(CaptureModuleId::new(1).unwrap(), None).unwrap();
        assert_eq!(
            ctrl.register
                .read(memory_map::cap_module_trig_src_reg_addr(1), 0)
                .unwrap(),
            0
        );
    }

    #[test]
    fn program_params_rejects_oversized_integration_vector() {
        let ctrl = controller();
        let id = CaptureUnitId::new(0).unwrap();
        let too_many_words = memory_map::MAX_INTEG_VEC_ELEMS * memory_map::ADC_WORD_SAMPLES + memory_map::ADC_WORD_SAMPLES;
        let param = CaptureParam::new(
            1,
            0,
            vec![DspStage::Integration],
            vec![],
            None,
            None,
            None,
            vec![],
            0,
            too_many_words,
            [DecisionFunc::default(), DecisionFunc::default()],
        )
        .unwrap();
        let err = ctrl.set_capture_params(id, &param).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(
            ctrl.register
                .read(memory_map::cap_reg_base(0), memory_map::CAP_REG_OFF_CAPTURE_DELAY)
                .unwrap(),
            0
        );
    }

    #[test]
    fn program_params_rejects_oversized_classification_results() {
        let ctrl = controller();
        let id = CaptureUnitId::new(0).unwrap();
        let param = CaptureParam::new(
            1,
            0,
            vec![DspStage::Classification],
            vec![],
            None,
            None,
            None,
            vec![],
            0,
            (memory_map::MAX_CLASSIFICATION_RESULTS / memory_map::ADC_WORD_SAMPLES) + 1,
            [DecisionFunc::default(), DecisionFunc::default()],
        )
        .unwrap();
        let err = ctrl.set_capture_params(id, &param).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn program_params_rejects_oversized_plain_capture() {
        let ctrl = controller();
        let id = CaptureUnitId::new(0).unwrap();
        let param = CaptureParam::new(
            1,
            0,
            vec![],
            vec![],
            None,
            None,
            None,
            vec![],
            0,
            (memory_map::MAX_CAPTURE_SAMPLES / memory_map::ADC_WORD_SAMPLES) + 1,
            [DecisionFunc::default(), DecisionFunc::default()],
        )
        .unwrap();
        let err = ctrl.set_capture_params(id, &param).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn program_params_warns_on_oversized_sum_range_but_still_writes() {
        let mut with_logger = controller();
        let logger = Arc::new(CollectingLogger(StdMutex::new(Vec::new())));
        with_logger.add_logger(logger.clone());
        let id = CaptureUnitId::new(0).unwrap();
        let section = SumSection {
            sum_section_length: memory_map::MAX_SUM_RANGE_LEN + 1,
            post_blank_length: 0,
        };
        let param = CaptureParam::new(
            1,
            0,
            vec![DspStage::Sum],
            vec![section],
            None,
            None,
            None,
            vec![],
            0,
            0,
            [DecisionFunc::default(), DecisionFunc::default()],
        )
        .unwrap();
        with_logger.set_capture_params(id, &param).unwrap();
        assert!(logger.0.lock().unwrap().iter().any(|m| m.contains("sum section 0")));
    }

    #[test]
    fn enable_then_disable_trigger_toggles_mask_bit() {
        let ctrl = controller();
        let id = CaptureUnitId::new(2).unwrap();
        ctrl.enable_start_trigger(&[id]).unwrap();
        assert_eq!(
            ctrl.register
                .read_bits(memory_map::AWG_TRIG_MASK_REG_ADDR, 0, 2, 1)
                .unwrap(),
            1
        );
        ctrl.disable_start_trigger(&[id]).unwrap();
        assert_eq!(
            ctrl.register
                .read_bits(memory_map::AWG_TRIG_MASK_REG_ADDR, 0, 2, 1)
                .unwrap(),
            0
        );
    }
}
