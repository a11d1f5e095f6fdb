//! Global Flag Set
//!
//! Bit-packed boolean flags shared by statement filters, reply opcodes and
//! sequence "use" slots. Flag ids are signed: a negative id names the same
//! flag with inverted sense.

use std::fmt;

/// Default number of flags for a new game
pub const DEFAULT_FLAG_COUNT: usize = 1024;

/// Largest flag id a reply program can encode (15-bit magnitude)
pub const MAX_FLAG_ID: usize = 0x7FFF;

/// Process-wide game flags, owned by the `World` context object
#[derive(Clone, PartialEq, Eq)]
pub struct FlagSet {
    bytes: Vec<u8>,
    count: usize,
}

impl FlagSet {
    /// Create a zeroed flag set holding `count` flags
    pub fn new(count: usize) -> Self {
        let count = count.min(MAX_FLAG_ID + 1);
        FlagSet {
            bytes: vec![0u8; (count + 7) >> 3],
            count,
        }
    }

    /// Number of flags in the set
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Raw value of flag `id`. Out-of-range ids read as false.
    pub fn get(&self, id: usize) -> bool {
        if id >= self.count {
            log::warn!("Read of out-of-range flag {}", id);
            return false;
        }
        (self.bytes[id >> 3] >> (id & 7)) & 1 != 0
    }

    /// Store a raw value. Out-of-range ids are ignored.
    pub fn put(&mut self, id: usize, value: bool) {
        if id >= self.count {
            log::warn!("Write of out-of-range flag {} ignored", id);
            return;
        }
        let mask = 1u8 << (id & 7);
        if value {
            self.bytes[id >> 3] |= mask;
        } else {
            self.bytes[id >> 3] &= !mask;
        }
    }

    /// Test a signed flag: `-n` is satisfied when flag `n` is clear
    pub fn read(&self, flag: i32) -> bool {
        let value = self.get(flag.unsigned_abs() as usize);
        if flag < 0 {
            !value
        } else {
            value
        }
    }

    /// Apply a signed flag: `n` sets flag `n`, `-n` clears it
    pub fn set(&mut self, flag: i32) {
        self.put(flag.unsigned_abs() as usize, flag >= 0);
    }

    /// True if every signed flag in `flags` holds
    pub fn all(&self, flags: &[i16]) -> bool {
        flags.iter().all(|&f| self.read(f as i32))
    }

    /// Raw bytes for serialization
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Replace the contents from serialized bytes; extra bytes are dropped,
    /// missing bytes read as zero
    pub fn load_bytes(&mut self, bytes: &[u8]) {
        let n = bytes.len().min(self.bytes.len());
        self.bytes.fill(0);
        self.bytes[..n].copy_from_slice(&bytes[..n]);
    }

    /// Clear every flag (new game)
    pub fn reset(&mut self) {
        self.bytes.fill(0);
    }
}

impl Default for FlagSet {
    fn default() -> Self {
        Self::new(DEFAULT_FLAG_COUNT)
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagSet")
            .field("count", &self.count)
            .field(
                "set",
                &self.bytes.iter().map(|b| b.count_ones()).sum::<u32>(),
            )
            .finish()
    }
}
