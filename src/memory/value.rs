//! Typed codecs for the byte store
//!
//! This module defines the value types that give raw memory a typed
//! interpretation:
//!
//! - [`Byte`]: an 8-bit cell with a pointer display tag
//! - [`Int32`]: a signed 32-bit integer, stored as 4 little-endian bytes
//! - [`FixedString`]: a fixed-length, zero-padded string
//!
//! # Tagging
//!
//! The pointer tag on [`Byte`] is purely semantic: it marks a cell as holding
//! an address so a consumer can render it differently. It never affects
//! access control or bounds checking.

use crate::error::{MemoryError, Result};
use std::fmt;

/// Memory address type (a plain index into the byte store)
pub type Address = usize;

/// Bits per byte, most significant first in the display order
pub const BYTE_SIZE: usize = 8;

/// Encoded width of an [`Int32`] in bytes
pub const INT32_SIZE: usize = 4;

/// Default fixed-string length used by overlay consumers
pub const FIXED_STRING_SIZE: usize = 16;

/// A single memory cell: an 8-bit value plus a pointer display tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Byte {
    value: u8,
    is_pointer: bool,
}

impl Byte {
    /// Create a plain (non-pointer) byte
    pub fn new(value: u8) -> Self {
        Byte {
            value,
            is_pointer: false,
        }
    }

    /// Create a byte tagged as holding a pointer
    ///
    /// This is the only path that sets the pointer tag.
    pub fn pointer(value: u8) -> Self {
        Byte {
            value,
            is_pointer: true,
        }
    }

    /// Create a byte from a wider integer, masking to the low 8 bits
    ///
    /// Silent truncation, not an error: `Byte::from_int(259)` is the byte `3`.
    pub fn from_int(value: i64) -> Self {
        Byte::new((value & 0xff) as u8)
    }

    /// Create a byte from a bit slice, most significant bit first
    ///
    /// Slices longer than 8 bits are truncated to the first 8; shorter slices
    /// are read as the low-order bits of the value.
    pub fn from_bits(bits: &[u8]) -> Self {
        let mut value = 0u8;
        for &bit in bits.iter().take(BYTE_SIZE) {
            value = (value << 1) | (bit & 1);
        }
        Byte::new(value)
    }

    /// Get the unsigned integer value of this byte
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Set the value, re-deriving all 8 bits
    ///
    /// The pointer tag is left untouched.
    pub fn set_value(&mut self, value: u8) {
        self.value = value;
    }

    /// Whether this byte is tagged as holding a pointer
    pub fn is_pointer(&self) -> bool {
        self.is_pointer
    }

    /// The 8 bits of this byte, most significant first
    pub fn bits(&self) -> [u8; BYTE_SIZE] {
        let mut bits = [0u8; BYTE_SIZE];
        for (i, bit) in bits.iter_mut().enumerate() {
            *bit = (self.value >> (BYTE_SIZE - 1 - i)) & 1;
        }
        bits
    }
}

impl From<u8> for Byte {
    fn from(value: u8) -> Self {
        Byte::new(value)
    }
}

impl fmt::Display for Byte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08b}", self.value)
    }
}

/// A signed 32-bit integer codec (little-endian two's-complement)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Int32 {
    value: i32,
}

impl Int32 {
    pub fn new(value: i32) -> Self {
        Int32 { value }
    }

    /// Coerce a wider integer into the 32-bit signed range by wrap-around
    pub fn wrapping_from(value: i64) -> Self {
        Int32 { value: value as i32 }
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    /// Encode as exactly 4 little-endian bytes; always succeeds
    pub fn to_bytes(&self) -> [Byte; INT32_SIZE] {
        self.value.to_le_bytes().map(Byte::new)
    }

    /// Decode from exactly 4 bytes
    ///
    /// Fails with [`MemoryError::InvalidLength`] for any other length.
    pub fn from_bytes(bytes: &[Byte]) -> Result<Self> {
        if bytes.len() != INT32_SIZE {
            return Err(MemoryError::InvalidLength {
                expected: INT32_SIZE,
                got: bytes.len(),
            });
        }

        let mut raw = [0u8; INT32_SIZE];
        for (slot, byte) in raw.iter_mut().zip(bytes) {
            *slot = byte.value();
        }

        Ok(Int32::new(i32::from_le_bytes(raw)))
    }
}

/// A fixed-length string codec
///
/// The value is truncated to at most `length` characters at construction.
/// Encoding zero-pads character codes (masked to 8 bits) to exactly `length`
/// bytes. Decoding strips only the maximal run of trailing zero bytes, so an
/// interior zero byte followed by non-zero bytes survives a round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedString {
    value: String,
    length: usize,
}

impl FixedString {
    pub fn new(value: &str, length: usize) -> Self {
        FixedString {
            value: value.chars().take(length).collect(),
            length,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The fixed encoded length in bytes
    pub fn length(&self) -> usize {
        self.length
    }

    /// Encode as exactly `length` bytes, zero-padded at the end
    pub fn to_bytes(&self) -> Vec<Byte> {
        let mut bytes: Vec<Byte> = self
            .value
            .chars()
            .map(|c| Byte::new((c as u32 & 0xff) as u8))
            .collect();
        bytes.resize(self.length, Byte::default());
        bytes
    }

    /// Decode from a byte slice, stripping trailing zero padding
    ///
    /// The resulting fixed length equals the number of bytes supplied, not a
    /// caller-chosen one.
    pub fn from_bytes(bytes: &[Byte]) -> Self {
        let mut end = bytes.len();
        while end > 0 && bytes[end - 1].value() == 0 {
            end -= 1;
        }

        let value: String = bytes[..end].iter().map(|b| b.value() as char).collect();

        FixedString {
            value,
            length: bytes.len(),
        }
    }
}
