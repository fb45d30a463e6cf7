// SPDX-License-Identifier: Apache-2.0 OR MIT

//! AWG (arbitrary waveform generator) data model and controller.

mod controller;
mod types;

pub use controller::AwgController;
pub use types::{AwgId, Slot, WaveChunk, WaveSequence, MAX_SEQUENCE_BYTES};
