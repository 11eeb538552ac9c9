//! The byte store: a fixed-length address space of tagged bytes
//!
//! The store is a flat `Vec<Byte>` indexed by plain integer addresses. It has
//! no notion of allocations or regions; range validation happens in
//! [`super::guard`] before any access reaches it, so the accessors here
//! assume in-range arguments.

use super::value::Byte;

/// Fixed-length ordered sequence of tagged bytes
#[derive(Debug, Clone)]
pub struct ByteStore {
    bytes: Vec<Byte>,
}

impl ByteStore {
    /// Create a zeroed store of the given size
    pub fn new(size: usize) -> Self {
        ByteStore {
            bytes: vec![Byte::default(); size],
        }
    }

    /// The address space size
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Read the byte at an address
    pub fn get(&self, address: usize) -> Byte {
        self.bytes[address]
    }

    /// Overwrite the byte at an address
    pub fn set(&mut self, address: usize, byte: Byte) {
        self.bytes[address] = byte;
    }

    /// View a range of bytes
    pub fn slice(&self, address: usize, length: usize) -> &[Byte] {
        &self.bytes[address..address + length]
    }

    /// Bulk-write a run of bytes starting at an address
    pub fn write(&mut self, address: usize, data: &[Byte]) {
        self.bytes[address..address + data.len()].copy_from_slice(data);
    }

    /// Zero every byte, dropping all pointer tags
    pub fn zero(&mut self) {
        self.bytes.fill(Byte::default());
    }

    /// The full byte sequence (used for snapshots and diffs)
    pub fn bytes(&self) -> &[Byte] {
        &self.bytes
    }

    /// Replace the full byte sequence from a snapshot
    pub fn restore(&mut self, bytes: &[Byte]) {
        self.bytes.clear();
        self.bytes.extend_from_slice(bytes);
    }

    /// Flat hex dump of all byte values, space-separated
    pub fn dump(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{:02x}", b.value()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
