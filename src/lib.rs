//! # Introduction
//!
//! membox simulates a small, fixed-size addressable memory space — split into
//! a heap region and a stack region — to teach how allocation, pointers, and
//! garbage collection behave. Every mutating operation records a deep-copy
//! snapshot, so the whole engine can time-travel to any prior state and diff
//! two states byte by byte.
//!
//! ## Component stack
//!
//! ```text
//! Memory facade → Bounds guard → Byte store / Allocator (+ Collector) → History
//! ```
//!
//! 1. [`memory::value`] — typed codecs: tagged bytes, little-endian `Int32`,
//!    fixed-length strings.
//! 2. [`memory::store`] — the byte store covering addresses `0..size`.
//! 3. [`memory::alloc`] — first-fit heap placement, stack frames growing down
//!    from the top, optional reference counting with a heap-scoped sweep.
//! 4. [`memory::guard`] — hard address-space limit plus optional
//!    allocation-containment checking.
//! 5. [`snapshot`] — linear snapshot history with branch truncation and
//!    byte-level diffs.
//! 6. [`memory::Memory`] — the public facade composing all of the above.
//!
//! ## Example
//!
//! ```
//! use membox::memory::Memory;
//! use membox::memory::value::Int32;
//!
//! let mut memory = Memory::new(64);
//! let address = memory.allocate(4)?;
//! memory.write_int32(address, Int32::new(-1))?;
//! assert_eq!(memory.read_int32(address)?.value(), -1);
//!
//! // Time-travel back to the zeroed initial state
//! memory.go_to_snapshot(0)?;
//! assert_eq!(memory.read_int32(address)?.value(), 0);
//! # Ok::<(), membox::MemoryError>(())
//! ```

pub mod error;
pub mod memory;
pub mod snapshot;

pub use error::{MemoryError, Result};
pub use memory::Memory;
