// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Byte-addressed bulk I/O to wave-RAM space, fragmented to the transport's
//! MTU. RAM word size is 32 bytes; addresses must be 32-byte
//! aligned and lengths are rounded up to 32 bytes by the caller (the
//! controllers, not this accessor, own that invariant — see `awg`/`capture`).

use std::sync::Arc;

use crate::error::Error;
use crate::memory_map::RAM_WORD_BYTES;
use crate::transport::packet::{AddressWidth, Request};
use crate::transport::Transport;

pub struct WaveRamAccessor {
    transport: Arc<dyn Transport>,
    mtu: usize,
}

impl WaveRamAccessor {
    pub fn new(transport: Arc<dyn Transport>, mtu: usize) -> Self {
        Self { transport, mtu }
    }

    /// Write `data` starting at `address`, both must be 32-byte aligned
    /// (caller's responsibility); fragmented into packets of at most `mtu`
    /// payload bytes.
    pub fn write(&self, address: u64, data: &[u8]) -> Result<(), Error> {
        debug_assert_eq!(address % RAM_WORD_BYTES, 0, "wave-RAM address must be 32-byte aligned");
        debug_assert_eq!(
            data.len() as u64 % RAM_WORD_BYTES,
            0,
            "wave-RAM write length must be a multiple of 32 bytes"
        );
        for (offset, chunk) in data.chunks(self.mtu).enumerate() {
            let addr = address + (offset * self.mtu) as u64;
            let req = Request::write(AddressWidth::Wide, addr, chunk.to_vec(), chunk.len() as u16);
            self.transport.write_request(&req)?;
        }
        Ok(())
    }

    /// Read `len` bytes starting at `address` (both 32-byte aligned),
    /// reassembled in order from as many fragments as the MTU requires.
    pub fn read(&self, address: u64, len: u64) -> Result<Vec<u8>, Error> {
        debug_assert_eq!(address % RAM_WORD_BYTES, 0, "wave-RAM address must be 32-byte aligned");
        debug_assert_eq!(len % RAM_WORD_BYTES, 0, "wave-RAM read length must be a multiple of 32 bytes");
        let mut out = Vec::with_capacity(len as usize);
        let mut remaining = len;
        let mut addr = address;
        while remaining > 0 {
            let take = remaining.min(self.mtu as u64);
            let req = Request::read(AddressWidth::Wide, addr, take as u16);
            let reply = self.transport.write_request(&req)?;
            out.extend_from_slice(&reply.payload);
            addr += take;
            remaining -= take;
        }
        Ok(out)
    }
}
