// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pure address/offset/bit-index arithmetic naming every register, per-engine
//! base, and per-chunk/sub-region offset.
//!
//! The wave-RAM address map below reproduces the instrument's published
//! constants exactly. The register-space field layout (offsets within a
//! per-engine control block) is this crate's own internal convention — the
//! instrument only pins down the bit positions within the shared
//! master-control register and the wave-RAM map, which this module also
//! reproduces exactly.

/// One RAM word.
pub const RAM_WORD_BYTES: u64 = 32;
/// One AWG word = 16 samples.
pub const AWG_WORD_SAMPLES: u32 = 16;
/// One wave block = 64 samples = 4 AWG words.
pub const WAVE_BLOCK_SAMPLES: u32 = 64;
/// One ADC word = 4 samples.
pub const ADC_WORD_SAMPLES: u32 = 4;

/// Round a byte length up to the next 32-byte RAM word boundary.
pub const fn ceil32(bytes: u64) -> u64 {
    (bytes + RAM_WORD_BYTES - 1) / RAM_WORD_BYTES * RAM_WORD_BYTES
}

// ===========================================================================
// Wave-RAM address map
// ===========================================================================

/// Stride between successive per-AWG source regions in wave-RAM space.
pub const AWG_BASE_STRIDE: u64 = 0x2000_0000;
/// Stride between successive per-capture-unit output regions.
pub const CAP_BASE_STRIDE: u64 = 0x2000_0000;
/// Base of capture unit 0's output region.
pub const CAP_BASE_0: u64 = 0x1000_0000;

/// Wave-RAM base address of AWG `k`'s source region (`k` in 0..=15).
pub const fn awg_wave_base(k: u32) -> u64 {
    k as u64 * AWG_BASE_STRIDE
}

/// Wave-RAM base address of capture unit `j`'s output region (`j` in 0..=7).
pub const fn cap_wave_base(j: u32) -> u64 {
    CAP_BASE_0 + j as u64 * CAP_BASE_STRIDE
}

/// Base of the wave-sequence registry.
pub const WAVE_SEQ_REGISTRY_BASE: u64 = 0x1_F200_0000;
/// Size of one AWG's slice of the wave-sequence registry.
pub const WAVE_SEQ_REGISTRY_AWG_SIZE: u64 = 0x8_0000;
/// Size of one entry within an AWG's registry slice.
pub const WAVE_SEQ_REGISTRY_ENTRY_SIZE: u64 = 0x400;
/// Maximum registry entries per AWG.
pub const WAVE_SEQ_REGISTRY_MAX_ENTRIES: u32 = 512;

/// Wave-RAM address of registry entry `entry` (0..512) for AWG `k`.
pub const fn wave_seq_registry_addr(k: u32, entry: u32) -> u64 {
    WAVE_SEQ_REGISTRY_BASE
        + k as u64 * WAVE_SEQ_REGISTRY_AWG_SIZE
        + entry as u64 * WAVE_SEQ_REGISTRY_ENTRY_SIZE
}

/// Base of the capture-param registry.
pub const CAPTURE_PARAM_REGISTRY_BASE: u64 = 0x1_F000_0000;
/// Size of one entry in the capture-param registry.
pub const CAPTURE_PARAM_REGISTRY_ENTRY_SIZE: u64 = 0x1_0000;
/// Maximum registry entries.
pub const CAPTURE_PARAM_REGISTRY_MAX_ENTRIES: u32 = 512;

/// Wave-RAM address of capture-param registry entry `entry` (0..512).
pub const fn capture_param_registry_addr(entry: u32) -> u64 {
    CAPTURE_PARAM_REGISTRY_BASE + entry as u64 * CAPTURE_PARAM_REGISTRY_ENTRY_SIZE
}

// ===========================================================================
// AWG register space
// ===========================================================================

/// Stride between successive per-AWG register blocks.
pub const AWG_REG_STRIDE: u64 = 0x1000;

/// Per-AWG control register offset (holds `CTRL_TERMINATE`).
pub const AWG_REG_OFF_CTRL: u64 = 0x00;
/// Per-AWG status register offset (`STATUS_READY`/`STATUS_BUSY`/`STATUS_DONE`).
pub const AWG_REG_OFF_STATUS: u64 = 0x04;
/// Per-AWG error register offset (`ERR_READ`/`ERR_SAMPLE_SHORTAGE`).
pub const AWG_REG_OFF_ERR: u64 = 0x08;
/// Per-AWG version register offset.
pub const AWG_REG_OFF_VERSION: u64 = 0x0C;
/// Per-AWG block-startable-interval register offset.
pub const AWG_REG_OFF_BLOCK_STARTABLE_INTERVAL: u64 = 0x10;
/// Per-AWG `num_wait_words` register offset.
pub const AWG_REG_OFF_NUM_WAIT_WORDS: u64 = 0x14;
/// Per-AWG `num_repeats` register offset.
pub const AWG_REG_OFF_NUM_REPEATS: u64 = 0x18;
/// Per-AWG `num_chunks` register offset.
pub const AWG_REG_OFF_NUM_CHUNKS: u64 = 0x1C;
/// Start of the per-chunk parameter table.
pub const AWG_REG_OFF_CHUNK_TABLE: u64 = 0x20;
/// Bytes occupied by one chunk's parameter entry
/// (`start_addr>>4`, `wave_part_words`, `blank_words`, `chunk_repeats`).
pub const AWG_REG_CHUNK_ENTRY_BYTES: u64 = 0x10;
/// Maximum chunks representable in one AWG's register block.
pub const AWG_REG_MAX_CHUNKS: u64 =
    (AWG_REG_STRIDE - AWG_REG_OFF_CHUNK_TABLE) / AWG_REG_CHUNK_ENTRY_BYTES;

pub const fn awg_reg_base(k: u32) -> u64 {
    k as u64 * AWG_REG_STRIDE
}

pub const fn awg_chunk_entry_offset(chunk_idx: u32) -> u64 {
    AWG_REG_OFF_CHUNK_TABLE + chunk_idx as u64 * AWG_REG_CHUNK_ENTRY_BYTES
}

/// Address of the shared AWG master-control register.
pub const AWG_MASTER_CTRL_REG_ADDR: u64 = 0x0010_0000;

/// Bit index of `CTRL_TARGET_SEL[k]` within the AWG master-control register.
pub const fn awg_ctrl_target_sel_bit(k: u32) -> u32 {
    k
}
pub const AWG_CTRL_PREPARE_BIT: u32 = 16;
pub const AWG_CTRL_START_BIT: u32 = 17;
pub const AWG_CTRL_RESET_BIT: u32 = 18;
pub const AWG_CTRL_DONE_CLR_BIT: u32 = 19;

/// Bit indices within the per-AWG control register.
pub const AWG_CTRL_TERMINATE_BIT: u32 = 0;

/// Bit indices within the per-AWG status register.
pub const AWG_STATUS_READY_BIT: u32 = 0;
pub const AWG_STATUS_BUSY_BIT: u32 = 1;
pub const AWG_STATUS_DONE_BIT: u32 = 2;

/// Bit indices within the per-AWG error register.
pub const AWG_ERR_READ_BIT: u32 = 0;
pub const AWG_ERR_SAMPLE_SHORTAGE_BIT: u32 = 1;

// ===========================================================================
// Capture register space
// ===========================================================================

pub const CAP_REG_STRIDE: u64 = 0x1000;
/// Per-unit control register offset, mirroring [`AWG_REG_OFF_CTRL`]; cleared
/// to 0 by `CaptureController::initialize`.
pub const CAP_REG_OFF_CTRL: u64 = 0x00;
pub const CAP_REG_OFF_STATUS: u64 = 0x04;
pub const CAP_REG_OFF_ERR: u64 = 0x08;
pub const CAP_REG_OFF_VERSION: u64 = 0x0C;
pub const CAP_REG_OFF_NUM_CAPTURED_SAMPLES: u64 = 0x10;
pub const CAP_REG_OFF_CAPTURE_ADDR: u64 = 0x14;
pub const CAP_REG_OFF_CAPTURE_DELAY: u64 = 0x18;
pub const CAP_REG_OFF_NUM_INTEG_SECTIONS: u64 = 0x1C;
pub const CAP_REG_OFF_DSP_ENABLE_MASK: u64 = 0x20;
pub const CAP_REG_OFF_NUM_SUM_SECTIONS: u64 = 0x24;
pub const CAP_REG_OFF_SUM_SECTION_TABLE: u64 = 0x28;
/// Two words (`sum_section_length`, `post_blank_length`) per entry.
pub const CAP_REG_SUM_SECTION_ENTRY_BYTES: u64 = 0x08;
pub const CAP_REG_MAX_SUM_SECTIONS: u64 = 16;

const AFTER_SUM_TABLE: u64 =
    CAP_REG_OFF_SUM_SECTION_TABLE + CAP_REG_MAX_SUM_SECTIONS * CAP_REG_SUM_SECTION_ENTRY_BYTES;

/// 8-tap complex FIR, re/im interleaved (16 words).
pub const CAP_REG_OFF_CFIR: u64 = AFTER_SUM_TABLE;
pub const CAP_REG_CFIR_TAPS: u64 = 8;
/// 8-tap real FIR for I (8 words).
pub const CAP_REG_OFF_RFIR_I: u64 = CAP_REG_OFF_CFIR + CAP_REG_CFIR_TAPS * 2 * 4;
/// 8-tap real FIR for Q (8 words).
pub const CAP_REG_OFF_RFIR_Q: u64 = CAP_REG_OFF_RFIR_I + CAP_REG_CFIR_TAPS * 4;
pub const CAP_REG_RFIR_TAPS: u64 = 8;
/// 1024-tap complex window, re/im interleaved.
pub const CAP_REG_OFF_WINDOW: u64 = CAP_REG_OFF_RFIR_Q + CAP_REG_RFIR_TAPS * 4;
pub const CAP_REG_WINDOW_TAPS: u64 = 1024;
const AFTER_WINDOW: u64 = CAP_REG_OFF_WINDOW + CAP_REG_WINDOW_TAPS * 2 * 4;

pub const CAP_REG_OFF_SUM_START_WORD_NO: u64 = AFTER_WINDOW;
pub const CAP_REG_OFF_SUM_END_WORD_NO: u64 = CAP_REG_OFF_SUM_START_WORD_NO + 4;
/// Three IEEE-754 singles (a, b, c) for decision unit 0.
pub const CAP_REG_OFF_DECISION_U0: u64 = CAP_REG_OFF_SUM_END_WORD_NO + 4;
/// Three IEEE-754 singles (a, b, c) for decision unit 1.
pub const CAP_REG_OFF_DECISION_U1: u64 = CAP_REG_OFF_DECISION_U0 + 3 * 4;

pub const fn cap_reg_base(j: u32) -> u64 {
    j as u64 * CAP_REG_STRIDE
}

/// Address of the shared capture master-control register.
pub const CAP_MASTER_CTRL_REG_ADDR: u64 = 0x0010_0000;

pub const fn cap_ctrl_target_sel_bit(j: u32) -> u32 {
    j
}
pub const CAP_CTRL_START_BIT: u32 = 8;
pub const CAP_CTRL_RESET_BIT: u32 = 9;
pub const CAP_CTRL_DONE_CLR_BIT: u32 = 10;

pub const CAP_STATUS_DONE_BIT: u32 = 0;
pub const CAP_ERR_OVERFLOW_BIT: u32 = 0;
pub const CAP_ERR_WRITE_BIT: u32 = 1;

/// Per-module trigger-source register base; one register per capture module.
pub const CAP_MODULE_TRIG_SRC_REG_BASE: u64 = 0x0020_0000;
pub const CAP_MODULE_TRIG_SRC_REG_STRIDE: u64 = 0x04;

pub const fn cap_module_trig_src_reg_addr(module: u32) -> u64 {
    CAP_MODULE_TRIG_SRC_REG_BASE + module as u64 * CAP_MODULE_TRIG_SRC_REG_STRIDE
}

/// Register whose bits gate whether each capture unit honors its AWG start trigger.
pub const AWG_TRIG_MASK_REG_ADDR: u64 = 0x0020_1000;

// ===========================================================================
// DSP output sizing limits
// ===========================================================================

/// Bytes per captured (I, Q) sample pair: two little-endian IEEE-754 singles.
pub const CAPTURE_SAMPLE_BYTES: u64 = 8;
/// Bits per packed classification result.
pub const CLASSIFICATION_RESULT_BITS: u64 = 2;

/// Largest sample count `CaptureController::program_params` accepts when
/// neither INTEGRATION nor CLASSIFICATION is enabled: as many `(I, Q)` pairs
/// as fit in one capture unit's wave-RAM output region.
pub const MAX_CAPTURE_SAMPLES: u32 = (CAP_BASE_STRIDE / CAPTURE_SAMPLE_BYTES) as u32;
/// Largest classification-result count accepted when CLASSIFICATION is
/// enabled: as many 2-bit results as fit in the same output region.
pub const MAX_CLASSIFICATION_RESULTS: u32 =
    ((CAP_BASE_STRIDE * 8) / CLASSIFICATION_RESULT_BITS) as u32;
/// Largest integration-vector element count the on-chip accumulator holds.
/// Not derivable from the output-region size (the accumulator is separate
/// from wave-RAM); this crate's own invented hardware limit.
pub const MAX_INTEG_VEC_ELEMS: u32 = 4096;
/// Largest value `sum_end_word_no` may take, reflecting the register's word
/// counter width. This crate's own invented convention.
pub const MAX_SUM_SECTION_LEN: u32 = 0x0003_FFFF;
/// Per-section summed-word count above which `program_params` warns (but
/// does not refuse) of possible accumulator overflow.
pub const MAX_SUM_RANGE_LEN: u32 = 8192;
