// SPDX-License-Identifier: Apache-2.0 OR MIT

//! UDP request/response transport.
//!
//! - `packet` — the FPGA-defined command framing.
//! - `udp` — the concrete [`udp::UdpTransport`] and the [`udp::Transport`]
//!   capability accessors are built against.

pub mod packet;
pub mod udp;

pub use udp::{Transport, UdpTransport};
