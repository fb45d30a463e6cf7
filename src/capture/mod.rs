// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Capture-unit DSP data model and controller.

mod controller;
mod types;

pub use controller::CaptureController;
pub use types::{CaptureModuleId, CaptureParam, CaptureUnitId, DecisionFunc, DspStage, SumSection};
