//! CAN frame representation and field accessors.
//!
//! Reads past the frame's DLC never panic: the payload buffer is always
//! 8 bytes wide and zero-filled beyond `len`.

use crate::{SafetyError, SafetyResult};

/// Maximum classic CAN payload length in bytes.
pub const MAX_FRAME_LEN: usize = 8;

/// A classic CAN frame as seen by the safety hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    addr: u32,
    bus: u8,
    len: u8,
    data: [u8; MAX_FRAME_LEN],
}

impl CanFrame {
    /// Build a frame from an address, bus index and payload.
    ///
    /// # Errors
    /// Returns `SafetyError::InvalidFrame` if the payload is longer than 8 bytes.
    pub fn new(addr: u32, bus: u8, payload: &[u8]) -> SafetyResult<Self> {
        if payload.len() > MAX_FRAME_LEN {
            return Err(SafetyError::InvalidFrame(format!(
                "Expected at most {} bytes, got {} bytes",
                MAX_FRAME_LEN,
                payload.len()
            )));
        }
        let mut data = [0u8; MAX_FRAME_LEN];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            addr,
            bus,
            len: payload.len() as u8,
            data,
        })
    }

    /// Build a full-length (8 byte) frame.
    pub const fn from_bytes(addr: u32, bus: u8, data: [u8; MAX_FRAME_LEN]) -> Self {
        Self {
            addr,
            bus,
            len: MAX_FRAME_LEN as u8,
            data,
        }
    }

    pub fn addr(&self) -> u32 {
        self.addr
    }

    pub fn bus(&self) -> u8 {
        self.bus
    }

    pub fn len(&self) -> u8 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Same frame, different bus. Used when relaying between buses.
    pub fn with_bus(mut self, bus: u8) -> Self {
        self.bus = bus;
        self
    }

    /// Byte at `index`, or 0 if the index is beyond the DLC.
    pub fn byte(&self, index: usize) -> u8 {
        if index < self.len as usize {
            self.data[index]
        } else {
            0
        }
    }

    /// Bytes 0..4 as a little-endian word.
    pub fn bytes_04(&self) -> u32 {
        read_le_u32_at(self, 0)
    }

    /// Bytes 4..8 as a little-endian word.
    pub fn bytes_48(&self) -> u32 {
        read_le_u32_at(self, 4)
    }
}

/// An (address, bus, length) triple a platform is allowed to transmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanMsg {
    pub addr: u32,
    pub bus: u8,
    pub len: u8,
}

impl CanMsg {
    pub const fn new(addr: u32, bus: u8, len: u8) -> Self {
        Self { addr, bus, len }
    }
}

/// `true` if the frame exactly matches an entry of the allow-list.
pub fn msg_allowed(frame: &CanFrame, allowed: &[CanMsg]) -> bool {
    allowed
        .iter()
        .any(|m| m.addr == frame.addr && m.bus == frame.bus && m.len == frame.len)
}

fn read_le_u32_at(frame: &CanFrame, offset: usize) -> u32 {
    u32::from_le_bytes([
        frame.byte(offset),
        frame.byte(offset + 1),
        frame.byte(offset + 2),
        frame.byte(offset + 3),
    ])
}

/// Sign-extend the low `bits` bits of `value`.
pub fn to_signed(value: u32, bits: u32) -> i32 {
    debug_assert!(bits > 0 && bits < 32);
    let mask = (1u32 << bits) - 1;
    let value = value & mask;
    if value & (1u32 << (bits - 1)) != 0 {
        value as i32 - (1i32 << bits)
    } else {
        value as i32
    }
}

/// Inverse of [`to_signed`]: two's complement of `value` truncated to `bits` bits.
pub fn to_unsigned(value: i32, bits: u32) -> u32 {
    debug_assert!(bits > 0 && bits < 32);
    (value as u32) & ((1u32 << bits) - 1)
}
