// SPDX-License-Identifier: Apache-2.0 OR MIT

//! 32-bit word writes to the wave-sequence/capture-param registry regions,
//! which live inside wave-RAM address space rather than register space.
//! Same word semantics as [`crate::access::register::RegisterAccessor`],
//! routed through the wave-RAM transport with wide addresses.

use std::sync::Arc;

use crate::error::Error;
use crate::transport::packet::{AddressWidth, Request};
use crate::transport::Transport;

pub struct ParamRegistryAccessor {
    transport: Arc<dyn Transport>,
    mtu: usize,
}

impl ParamRegistryAccessor {
    pub fn new(transport: Arc<dyn Transport>, mtu: usize) -> Self {
        Self { transport, mtu }
    }

    pub fn read(&self, address: u64) -> Result<u32, Error> {
        let req = Request::read(AddressWidth::Wide, address, 1);
        let reply = self.transport.write_request(&req)?;
        Ok(u32::from_le_bytes(reply.payload[..4].try_into().unwrap()))
    }

    pub fn write(&self, address: u64, value: u32) -> Result<(), Error> {
        let req = Request::write(AddressWidth::Wide, address, value.to_le_bytes().to_vec(), 1);
        self.transport.write_request(&req)?;
        Ok(())
    }

    /// Write consecutive 32-bit words starting at `address`, batching into
    /// one packet per `mtu` worth of words.
    pub fn multi_write(&self, address: u64, values: &[u32]) -> Result<(), Error> {
        const WORD_BYTES: usize = 4;
        for (chunk_idx, chunk) in values.chunks(self.mtu / WORD_BYTES) .enumerate() {
            let mut payload = Vec::with_capacity(chunk.len() * WORD_BYTES);
            for v in chunk {
                payload.extend_from_slice(&v.to_le_bytes());
            }
            let addr = address + (chunk_idx * (self.mtu / WORD_BYTES) * WORD_BYTES) as u64;
            let req = Request::write(AddressWidth::Wide, addr, payload, chunk.len() as u16);
            self.transport.write_request(&req)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::udp::fake::FakeTransport;

    #[test]
    fn write_then_read_round_trips() {
        let fake = Arc::new(FakeTransport::new());
        let acc = ParamRegistryAccessor::new(fake, 1472);
        acc.write(0x1_F200_0400, 77).unwrap();
        assert_eq!(acc.read(0x1_F200_0400).unwrap(), 77);
    }

    #[test]
    fn multi_write_spans_several_packets() {
        let fake = Arc::new(FakeTransport::new());
        let acc = ParamRegistryAccessor::new(fake, 8); // 2 words per packet
        let values: Vec<u32> = (0..9).collect();
        acc.multi_write(0x1_F000_0000, &values).unwrap();
        for (i, v) in values.iter().enumerate() {
            assert_eq!(acc.read(0x1_F000_0000 + i as u64 * 4).unwrap(), *v);
        }
    }
}
