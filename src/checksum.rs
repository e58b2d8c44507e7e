//! LPC vector table checksum.
//!
//! The boot ROM of LPC microcontrollers only starts user code if the first
//! eight words of the image add up to zero (mod 2^32). One of those words is
//! reserved for a value that makes this true.

use object::{Endian, Endianness};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use thiserror::Error;

/// Number of words in the vector table.
pub const VECTOR_COUNT: usize = 8;

/// Size of the vector table in bytes.
pub const VECTOR_TABLE_SIZE: usize = VECTOR_COUNT * 4;

/// Checksum position for LPC17xx, LPC43xx and most other LPC parts.
/// The LPC2000 family uses slot 5.
pub const DEFAULT_CHECKSUM_SLOT: usize = 7;

/// Index of the vector table word that holds the checksum, always below
/// `VECTOR_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumSlot(usize);

impl ChecksumSlot {
    pub fn new(index: usize) -> Option<Self> {
        (index < VECTOR_COUNT).then_some(Self(index))
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl Default for ChecksumSlot {
    fn default() -> Self {
        Self(DEFAULT_CHECKSUM_SLOT)
    }
}

/// Why a textual checksum slot was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("not a slot number: {0}")]
    Invalid(#[from] ParseIntError),
    #[error("slot {0} is outside the vector table (0..{})", VECTOR_COUNT)]
    OutOfRange(usize),
}

impl FromStr for ChecksumSlot {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let index: usize = s.trim().parse()?;
        Self::new(index).ok_or(SlotError::OutOfRange(index))
    }
}

impl fmt::Display for ChecksumSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns the value that makes `vectors` sum to zero once stored at `slot`.
///
/// The word currently at `slot` does not take part in the sum.
pub fn compute_checksum(vectors: &[u32; VECTOR_COUNT], slot: ChecksumSlot) -> u32 {
    let sum = vectors
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != slot.index())
        .fold(0u32, |acc, (_, v)| acc.wrapping_add(*v));
    0u32.wrapping_sub(sum)
}

/// A copy of the first `VECTOR_COUNT` words of a code image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorTable {
    words: [u32; VECTOR_COUNT],
}

impl VectorTable {
    pub fn new(words: [u32; VECTOR_COUNT]) -> Self {
        Self { words }
    }

    /// Decodes the table from the start of `bytes`. Returns `None` if fewer
    /// than `VECTOR_TABLE_SIZE` bytes are available.
    pub fn from_bytes(bytes: &[u8], endian: Endianness) -> Option<Self> {
        let table = bytes.get(..VECTOR_TABLE_SIZE)?;
        let mut words = [0u32; VECTOR_COUNT];
        for (word, chunk) in words.iter_mut().zip(table.chunks_exact(4)) {
            *word = endian.read_u32_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Some(Self { words })
    }

    /// Encodes the table over the first `VECTOR_TABLE_SIZE` bytes of `bytes`,
    /// leaving the rest alone.
    ///
    /// # Panics
    /// If `bytes` is shorter than `VECTOR_TABLE_SIZE`.
    pub fn write_to(&self, bytes: &mut [u8], endian: Endianness) {
        for (word, chunk) in self
            .words
            .iter()
            .zip(bytes[..VECTOR_TABLE_SIZE].chunks_exact_mut(4))
        {
            chunk.copy_from_slice(&endian.write_u32_bytes(*word));
        }
    }

    pub fn words(&self) -> &[u32; VECTOR_COUNT] {
        &self.words
    }

    pub fn get(&self, slot: ChecksumSlot) -> u32 {
        self.words[slot.index()]
    }

    pub fn checksum(&self, slot: ChecksumSlot) -> u32 {
        compute_checksum(&self.words, slot)
    }

    /// Returns a copy with the checksum stored at `slot`.
    pub fn with_checksum(mut self, slot: ChecksumSlot) -> Self {
        self.words[slot.index()] = self.checksum(slot);
        self
    }

    /// Whether the table already passes the boot ROM check.
    pub fn is_valid(&self) -> bool {
        self.words.iter().fold(0u32, |acc, v| acc.wrapping_add(*v)) == 0
    }
}
