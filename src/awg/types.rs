// SPDX-License-Identifier: Apache-2.0 OR MIT

//! AWG identifiers and waveform-sequence data model.

use crate::error::ValidationError;
use crate::memory_map::{self, WAVE_BLOCK_SAMPLES};

/// Total wave-RAM budget for one waveform sequence.
pub const MAX_SEQUENCE_BYTES: u64 = 256 * 1024 * 1024;

/// An AWG identifier, 0..=15.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AwgId(u32);

impl AwgId {
    pub const COUNT: u32 = 16;

    pub fn new(id: u32) -> Result<Self, ValidationError> {
        if id >= Self::COUNT {
            return Err(ValidationError::new(
                "AwgId::new",
                format!("awg id {id} out of range, expected 0..={}", Self::COUNT - 1),
            ));
        }
        Ok(Self(id))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<AwgId> for u32 {
    fn from(id: AwgId) -> u32 {
        id.0
    }
}

/// A contiguous piece of a waveform.
#[derive(Debug, Clone)]
pub struct WaveChunk {
    num_samples: u32,
    num_blank_words: u32,
    num_repeats: u32,
    iq_samples: Vec<(i16, i16)>,
}

impl WaveChunk {
    /// Validates invariants: `num_samples` is a nonzero multiple of 64,
    /// `num_repeats` >= 1, `iq_samples` has exactly `num_samples` entries,
    /// and blanking does not exceed the chunk.
    pub fn new(
        iq_samples: Vec<(i16, i16)>,
        num_blank_words: u32,
        num_repeats: u32,
    ) -> Result<Self, ValidationError> {
        let num_samples = iq_samples.len() as u32;
        if num_samples == 0 || num_samples % WAVE_BLOCK_SAMPLES != 0 {
            return Err(ValidationError::new(
                "WaveChunk::new",
                format!(
                    "num_samples {num_samples} must be a nonzero multiple of {WAVE_BLOCK_SAMPLES}"
                ),
            ));
        }
        if num_repeats == 0 {
            return Err(ValidationError::new(
                "WaveChunk::new",
                "num_repeats must be >= 1",
            ));
        }
        let num_words = num_samples / memory_map::AWG_WORD_SAMPLES;
        if num_blank_words > num_words {
            return Err(ValidationError::new(
                "WaveChunk::new",
                format!("num_blank_words {num_blank_words} exceeds chunk's {num_words} words"),
            ));
        }
        Ok(Self {
            num_samples,
            num_blank_words,
            num_repeats,
            iq_samples,
        })
    }

    pub fn num_samples(&self) -> u32 {
        self.num_samples
    }

    pub fn num_blank_words(&self) -> u32 {
        self.num_blank_words
    }

    pub fn num_repeats(&self) -> u32 {
        self.num_repeats
    }

    pub fn num_words(&self) -> u32 {
        self.num_samples / memory_map::AWG_WORD_SAMPLES
    }

    pub fn num_wave_part_words(&self) -> u32 {
        self.num_words() - self.num_blank_words
    }

    pub fn iq_samples(&self) -> &[(i16, i16)] {
        &self.iq_samples
    }

    /// Little-endian interleaved int16 (I, Q) sample bytes.
    pub fn serialize_samples(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.iq_samples.len() * 4);
        for (i, q) in &self.iq_samples {
            buf.extend_from_slice(&i.to_le_bytes());
            buf.extend_from_slice(&q.to_le_bytes());
        }
        buf
    }

    /// Byte length of `serialize_samples()`, before 32-byte rounding.
    pub fn raw_byte_len(&self) -> u64 {
        self.iq_samples.len() as u64 * 4
    }

    /// Byte length rounded up to the next 32-byte RAM word.
    pub fn ram_byte_len(&self) -> u64 {
        memory_map::ceil32(self.raw_byte_len())
    }
}

/// A waveform sequence: initial silence, a repeat count, and an ordered
/// non-empty list of chunks.
#[derive(Debug, Clone)]
pub struct WaveSequence {
    num_wait_words: u32,
    num_repeats: u32,
    chunks: Vec<WaveChunk>,
}

impl WaveSequence {
    pub fn new(
        num_wait_words: u32,
        num_repeats: u32,
        chunks: Vec<WaveChunk>,
    ) -> Result<Self, ValidationError> {
        if chunks.is_empty() {
            return Err(ValidationError::new(
                "WaveSequence::new",
                "a wave sequence needs at least one chunk",
            ));
        }
        if num_repeats == 0 {
            return Err(ValidationError::new(
                "WaveSequence::new",
                "num_repeats must be >= 1",
            ));
        }
        let total: u64 = chunks.iter().map(WaveChunk::ram_byte_len).sum();
        if total > MAX_SEQUENCE_BYTES {
            return Err(ValidationError::new(
                "WaveSequence::new",
                format!(
                    "sequence occupies {total} bytes of wave-RAM, exceeding the {MAX_SEQUENCE_BYTES}-byte limit"
                ),
            ));
        }
        Ok(Self {
            num_wait_words,
            num_repeats,
            chunks,
        })
    }

    pub fn num_wait_words(&self) -> u32 {
        self.num_wait_words
    }

    pub fn num_repeats(&self) -> u32 {
        self.num_repeats
    }

    pub fn chunks(&self) -> &[WaveChunk] {
        &self.chunks
    }

    pub fn total_ram_bytes(&self) -> u64 {
        self.chunks.iter().map(WaveChunk::ram_byte_len).sum()
    }
}

/// Key under which a sequence is programmed by `register_wave_sequences`:
/// either the AWG's live parameters, or a slot in the wave-sequence registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Inline,
    Registry(u16),
}

impl Slot {
    pub const MAX_REGISTRY_ENTRY: u16 = 511;

    pub fn registry(entry: u16) -> Result<Self, ValidationError> {
        if entry > Self::MAX_REGISTRY_ENTRY {
            return Err(ValidationError::new(
                "Slot::registry",
                format!("registry entry {entry} exceeds max {}", Self::MAX_REGISTRY_ENTRY),
            ));
        }
        Ok(Self::Registry(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(samples: u32, blank: u32, repeats: u32) -> WaveChunk {
        WaveChunk::new(vec![(1, 2); samples as usize], blank, repeats).unwrap()
    }

    #[test]
    fn chunk_rejects_non_multiple_of_64() {
        assert!(WaveChunk::new(vec![(0, 0); 63], 0, 1).is_err());
    }

    #[test]
    fn chunk_word_math() {
        let c = chunk(64, 4, 1);
        assert_eq!(c.num_words(), 4);
        assert_eq!(c.num_wave_part_words(), 0);
        assert_eq!(c.ram_byte_len(), memory_map::ceil32(64 * 4));
    }

    #[test]
    fn sequence_rejects_empty_chunks() {
        assert!(WaveSequence::new(0, 1, vec![]).is_err());
    }

    #[test]
    fn sequence_rejects_oversized_total() {
        // One chunk whose rounded byte length alone exceeds the 256 MiB cap.
        let huge_samples = (MAX_SEQUENCE_BYTES / 4 + WAVE_BLOCK_SAMPLES as u64) as u32;
        let huge_samples = huge_samples - (huge_samples % WAVE_BLOCK_SAMPLES);
        let big_chunk = WaveChunk::new(vec![(0, 0); huge_samples as usize], 0, 1).unwrap();
        assert!(WaveSequence::new(0, 1, vec![big_chunk]).is_err());
    }

    #[test]
    fn slot_rejects_out_of_range_entry() {
        assert!(Slot::registry(512).is_err());
        assert!(Slot::registry(511).is_ok());
    }

    #[test]
    fn awg_id_rejects_out_of_range() {
        assert!(AwgId::new(16).is_err());
        assert!(AwgId::new(15).is_ok());
    }
}
