// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed 32-bit register reads/writes and multi-word bursts.

use std::sync::Arc;

use crate::error::{Error, TransportError};
use crate::transport::packet::{AddressWidth, Request};
use crate::transport::Transport;

const WORD_BYTES: u64 = 4;

/// 32-bit word-addressed register space accessor. Registers are sparse:
/// every write sends one packet per word unless batched via `multi_write`.
pub struct RegisterAccessor {
    transport: Arc<dyn Transport>,
    mtu: usize,
}

impl RegisterAccessor {
    pub fn new(transport: Arc<dyn Transport>, mtu: usize) -> Self {
        Self { transport, mtu }
    }

    pub fn read(&self, base: u64, offset: u64) -> Result<u32, Error> {
        let req = Request::read(AddressWidth::Narrow, base + offset, 1);
        let reply = self.send(req)?;
        Ok(u32::from_le_bytes(reply.payload[..4].try_into().unwrap()))
    }

    pub fn write(&self, base: u64, offset: u64, value: u32) -> Result<(), Error> {
        let req = Request::write(
            AddressWidth::Narrow,
            base + offset,
            value.to_le_bytes().to_vec(),
            1,
        );
        self.send(req)?;
        Ok(())
    }

    /// Write `values` starting at `offset`, each at the next word. Batches
    /// into one packet when the whole burst fits the MTU; otherwise falls
    /// back to one sequential packet per word with monotonically
    /// increasing offsets.
    pub fn multi_write(&self, base: u64, offset: u64, values: &[u32]) -> Result<(), Error> {
        if values.is_empty() {
            return Ok(());
        }
        let total_bytes = values.len() * WORD_BYTES as usize;
        if total_bytes <= self.mtu {
            let mut payload = Vec::with_capacity(total_bytes);
            for v in values {
                payload.extend_from_slice(&v.to_le_bytes());
            }
            let req = Request::write(
                AddressWidth::Narrow,
                base + offset,
                payload,
                values.len() as u16,
            );
            self.send(req)?;
            return Ok(());
        }
        for (i, v) in values.iter().enumerate() {
            self.write(base, offset + i as u64 * WORD_BYTES, *v)?;
        }
        Ok(())
    }

    /// Read-modify-write `nbits` starting at `start_bit` within the word at
    /// `base + offset`. Not atomic with respect to other processes unless
    /// the caller holds the master lock.
    pub fn write_bits(
        &self,
        base: u64,
        offset: u64,
        start_bit: u32,
        nbits: u32,
        value: u32,
    ) -> Result<(), Error> {
        let mask = field_mask(start_bit, nbits);
        let current = self.read(base, offset)?;
        let cleared = current & !mask;
        let inserted = (value << start_bit) & mask;
        self.write(base, offset, cleared | inserted)
    }

    pub fn read_bits(&self, base: u64, offset: u64, start_bit: u32, nbits: u32) -> Result<u32, Error> {
        let mask = field_mask(start_bit, nbits);
        let current = self.read(base, offset)?;
        Ok((current & mask) >> start_bit)
    }

    fn send(
        &self,
        req: Request,
    ) -> Result<crate::transport::packet::Reply, TransportError> {
        self.transport.write_request(&req)
    }
}

fn field_mask(start_bit: u32, nbits: u32) -> u32 {
    if nbits >= 32 {
        u32::MAX
    } else {
        ((1u32 << nbits) - 1) << start_bit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::udp::fake::FakeTransport;

    fn accessor() -> (RegisterAccessor, Arc<FakeTransport>) {
        let fake = Arc::new(FakeTransport::new());
        let acc = RegisterAccessor::new(fake.clone(), 1472);
        (acc, fake)
    }

    #[test]
    fn write_then_read_round_trips() {
        let (acc, _) = accessor();
        acc.write(0x1000, 0x10, 0xDEAD_BEEF).unwrap();
        assert_eq!(acc.read(0x1000, 0x10).unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn multi_write_batches_within_mtu() {
        let (acc, _) = accessor();
        let values = vec![1, 2, 3, 4];
        acc.multi_write(0x2000, 0, &values).unwrap();
        for (i, v) in values.iter().enumerate() {
            assert_eq!(acc.read(0x2000, i as u64 * 4).unwrap(), *v);
        }
    }

    #[test]
    fn multi_write_falls_back_to_sequential_beyond_mtu() {
        let (acc, _) = accessor();
        let values: Vec<u32> = (0..10).collect();
        let acc_small_mtu = RegisterAccessor {
            mtu: 4, // force the sequential path
            ..accessor().0
        };
        let _ = acc; // silence unused
        acc_small_mtu.multi_write(0x3000, 0, &values).unwrap();
        for (i, v) in values.iter().enumerate() {
            assert_eq!(acc_small_mtu.read(0x3000, i as u64 * 4).unwrap(), *v);
        }
    }

    #[test]
    fn write_bits_preserves_other_fields() {
        let (acc, _) = accessor();
        acc.write(0x0, 0x0, 0b1111_0000).unwrap();
        acc.write_bits(0x0, 0x0, 0, 4, 0b1010).unwrap();
        assert_eq!(acc.read(0x0, 0x0).unwrap(), 0b1111_1010);
        assert_eq!(acc.read_bits(0x0, 0x0, 4, 4).unwrap(), 0b1111);
        assert_eq!(acc.read_bits(0x0, 0x0, 0, 4).unwrap(), 0b1010);
    }
}
