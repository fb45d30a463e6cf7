// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Top-level facade tying one instrument's three UDP endpoints to its AWG
//! and capture controllers.
//!
//! Transports are opened lazily and cached per port in a lock-free
//! [`DashMap`], so building an [`AwgController`] and a [`CaptureController`]
//! against the same instrument reuses the shared wave-RAM socket instead of
//! binding it twice.

use std::sync::Arc;

use dashmap::DashMap;

use crate::awg::AwgController;
use crate::capture::CaptureController;
use crate::config::{Config, InstrumentAddr};
use crate::error::Result;
use crate::transport::{Transport, UdpTransport};

/// One physical instrument: its address, its shared transport config, and a
/// cache of the UDP sockets opened against it so far.
pub struct Instrument {
    addr: InstrumentAddr,
    config: Config,
    transports: DashMap<u16, Arc<dyn Transport>>,
}

impl Instrument {
    pub fn new(addr: InstrumentAddr, config: Config) -> Self {
        Self {
            addr,
            config,
            transports: DashMap::new(),
        }
    }

    /// Open (or reuse) the transport bound to `port` on this instrument's host.
    fn transport(&self, port: u16) -> Result<Arc<dyn Transport>> {
        if let Some(existing) = self.transports.get(&port) {
            return Ok(existing.clone());
        }
        let opened: Arc<dyn Transport> =
            Arc::new(UdpTransport::connect(&self.addr.host, port, self.config.clone())?);
        self.transports.insert(port, opened.clone());
        Ok(opened)
    }

    /// Build an [`AwgController`] for this instrument, opening its register
    /// and wave-RAM transports as needed.
    pub fn awg_controller(&self) -> Result<AwgController> {
        let register = self.transport(self.addr.awg_reg_port)?;
        let wave = self.transport(self.addr.wave_ram_port)?;
        Ok(AwgController::new(
            register,
            wave,
            &self.addr.canonical_host(),
            self.config.clone(),
        ))
    }

    /// Build a [`CaptureController`] for this instrument, sharing the
    /// wave-RAM transport with any [`AwgController`] built from the same
    /// [`Instrument`].
    pub fn capture_controller(&self) -> Result<CaptureController> {
        let register = self.transport(self.addr.capture_reg_port)?;
        let wave = self.transport(self.addr.wave_ram_port)?;
        Ok(CaptureController::new(
            register,
            wave,
            &self.addr.canonical_host(),
            self.config.clone(),
        ))
    }
}
