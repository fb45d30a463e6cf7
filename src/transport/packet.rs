// SPDX-License-Identifier: Apache-2.0 OR MIT

//! FPGA-defined register/RAM command packet framing.
//!
//! Wire format: a small header (1-byte command, 1-byte reserved, 2-byte
//! little-endian length-in-units, followed by a little-endian address)
//! followed by payload for writes. Replies echo the header and carry
//! payload for reads. All multi-byte fields are little-endian.
//!
//! Register-space addresses fit a 4-byte address field. Wave-RAM space is
//! larger than 32 bits (its registry region alone sits past
//! `0x1_F000_0000`, see `memory_map`), so wave-RAM/registry packets widen
//! the address field to 8 bytes; this is an implementation resolution of
//! that gap, not a wire constant pinned by anything external (see
//! DESIGN.md).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Read = 0,
    Write = 1,
}

impl Command {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Read),
            1 => Some(Self::Write),
            _ => None,
        }
    }
}

/// Whether a packet's address field is 4 or 8 bytes wide on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressWidth {
    /// Register space: addresses fit 32 bits.
    Narrow,
    /// Wave-RAM / registry space: addresses may exceed 32 bits.
    Wide,
}

impl AddressWidth {
    fn addr_bytes(self) -> usize {
        match self {
            Self::Narrow => 4,
            Self::Wide => 8,
        }
    }

    fn header_bytes(self) -> usize {
        4 + self.addr_bytes()
    }
}

/// One request packet: a command, a byte/word address, a unit count, and
/// for writes, the payload bytes. `length_units` is the addressing
/// granularity the caller asks for (4 bytes for register words, 1 byte for
/// wave-RAM bytes).
#[derive(Debug, Clone)]
pub struct Request {
    pub command: Command,
    pub address: u64,
    pub width: AddressWidth,
    pub length_units: u16,
    pub payload: Vec<u8>,
}

impl Request {
    pub fn read(width: AddressWidth, address: u64, length_units: u16) -> Self {
        Self {
            command: Command::Read,
            address,
            width,
            length_units,
            payload: Vec::new(),
        }
    }

    pub fn write(width: AddressWidth, address: u64, payload: Vec<u8>, length_units: u16) -> Self {
        Self {
            command: Command::Write,
            address,
            width,
            length_units,
            payload,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.width.header_bytes() + self.payload.len());
        buf.push(self.command as u8);
        buf.push(0); // reserved
        buf.extend_from_slice(&self.length_units.to_le_bytes());
        match self.width {
            AddressWidth::Narrow => {
                buf.extend_from_slice(&(self.address as u32).to_le_bytes());
            }
            AddressWidth::Wide => {
                buf.extend_from_slice(&self.address.to_le_bytes());
            }
        }
        if self.command == Command::Write {
            buf.extend_from_slice(&self.payload);
        }
        buf
    }
}

/// A decoded reply packet.
#[derive(Debug, Clone)]
pub struct Reply {
    pub command: Command,
    pub address: u64,
    pub length_units: u16,
    pub payload: Vec<u8>,
}

/// Reasons a reply datagram fails to parse as a valid [`Reply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    TooShort,
    UnknownCommand,
}

impl Reply {
    pub fn decode(bytes: &[u8], width: AddressWidth) -> Result<Self, DecodeError> {
        let header_bytes = width.header_bytes();
        if bytes.len() < header_bytes {
            return Err(DecodeError::TooShort);
        }
        let command = Command::from_byte(bytes[0]).ok_or(DecodeError::UnknownCommand)?;
        let length_units = u16::from_le_bytes([bytes[2], bytes[3]]);
        let address = match width {
            AddressWidth::Narrow => {
                u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as u64
            }
            AddressWidth::Wide => u64::from_le_bytes([
                bytes[4], bytes[5], bytes[6], bytes[7], bytes[8], bytes[9], bytes[10], bytes[11],
            ]),
        };
        let payload = bytes[header_bytes..].to_vec();
        Ok(Self {
            command,
            address,
            length_units,
            payload,
        })
    }

    /// True if this reply plausibly answers `request` (same command, same
    /// address).
    pub fn matches(&self, request: &Request) -> bool {
        self.command == request.command && self.address == request.address
    }
}
