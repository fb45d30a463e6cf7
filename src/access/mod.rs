// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed accessors built on top of [`crate::transport`].

pub mod paramreg;
pub mod register;
pub mod waveram;

pub use paramreg::ParamRegistryAccessor;
pub use register::RegisterAccessor;
pub use waveram::WaveRamAccessor;
