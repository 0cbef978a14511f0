//! Byte-addressable frame memory.
//!
//! Memory only grows, in whole 32-byte words. Gas for growth is charged by
//! the operation before any access, so the accessors here expand silently.

use crate::error::{HaltReason, OpResult};
use crate::word::saturating_u64;
use keel_primitives::U256;

/// Largest offset or length an operation may address. Anything above costs
/// more gas than a block can hold.
pub const MAX_MEMORY_OFFSET: u64 = u32::MAX as u64;

/// A resolved, nonempty region of memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange {
    /// Start offset
    pub offset: usize,
    /// Length in bytes, never zero
    pub len: usize,
}

impl MemoryRange {
    /// One past the last byte
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Resolve a stack-supplied offset/length pair.
///
/// A zero length never touches memory, whatever the offset.
pub fn resolve(offset: U256, len: U256) -> OpResult<Option<MemoryRange>> {
    if len.is_zero() {
        return Ok(None);
    }
    let offset = saturating_u64(offset);
    let len = saturating_u64(len);
    if offset > MAX_MEMORY_OFFSET || len > MAX_MEMORY_OFFSET {
        return Err(HaltReason::InsufficientGas);
    }
    Ok(Some(MemoryRange {
        offset: offset as usize,
        len: len as usize,
    }))
}

/// Resolve a fixed-length access (MLOAD, MSTORE, MSTORE8).
pub fn resolve_fixed(offset: U256, len: usize) -> OpResult<MemoryRange> {
    let offset = saturating_u64(offset);
    if offset > MAX_MEMORY_OFFSET {
        return Err(HaltReason::InsufficientGas);
    }
    Ok(MemoryRange {
        offset: offset as usize,
        len,
    })
}

/// Number of 32-byte words needed to hold `bytes`
pub fn words(bytes: usize) -> usize {
    bytes.div_ceil(32)
}

/// Frame memory
#[derive(Debug, Clone, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create empty memory
    pub fn new() -> Self {
        Self::default()
    }

    /// Current size in bytes, always a multiple of 32
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been touched yet
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Grow to cover `end`, rounded up to a whole word
    pub fn expand(&mut self, end: usize) {
        let target = words(end) * 32;
        if target > self.data.len() {
            self.data.resize(target, 0);
        }
    }

    /// Grow to cover an optional range
    pub fn expand_range(&mut self, range: Option<MemoryRange>) {
        if let Some(range) = range {
            self.expand(range.end());
        }
    }

    /// Load one word
    pub fn load_word(&mut self, offset: usize) -> U256 {
        self.expand(offset + 32);
        U256::from_big_endian(&self.data[offset..offset + 32])
    }

    /// Store one word
    pub fn store_word(&mut self, offset: usize, value: U256) {
        self.expand(offset + 32);
        value.to_big_endian(&mut self.data[offset..offset + 32]);
    }

    /// Store the low byte of a word
    pub fn store_byte(&mut self, offset: usize, value: u8) {
        self.expand(offset + 1);
        self.data[offset] = value;
    }

    /// Copy a range out; empty for `None`
    pub fn read(&mut self, range: Option<MemoryRange>) -> Vec<u8> {
        match range {
            Some(range) => {
                self.expand(range.end());
                self.data[range.offset..range.end()].to_vec()
            }
            None => Vec::new(),
        }
    }

    /// Write `bytes` at `offset`
    pub fn write(&mut self, offset: usize, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.expand(offset + bytes.len());
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Fill `range` from `source[source_offset..]`, zero-padding anything
    /// past the end of `source`.
    pub fn write_padded(&mut self, range: Option<MemoryRange>, source: &[u8], source_offset: u64) {
        let Some(range) = range else {
            return;
        };
        self.expand(range.end());
        let dest = &mut self.data[range.offset..range.end()];
        let start = usize::try_from(source_offset)
            .unwrap_or(usize::MAX)
            .min(source.len());
        let available = (source.len() - start).min(range.len);
        dest[..available].copy_from_slice(&source[start..start + available]);
        dest[available..].fill(0);
    }

    /// Overlap-safe copy within memory (MCOPY)
    pub fn copy_within(&mut self, dest: usize, src: usize, len: usize) {
        if len == 0 {
            return;
        }
        self.expand(dest.max(src) + len);
        self.data.copy_within(src..src + len, dest);
    }

    /// Raw contents
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_aligned_growth() {
        let mut memory = Memory::new();
        memory.store_byte(0, 0xaa);
        assert_eq!(memory.len(), 32);
        memory.store_word(31, U256::one());
        assert_eq!(memory.len(), 64);
        assert_eq!(memory.load_word(31), U256::one());
    }

    #[test]
    fn test_resolve_zero_length_ignores_offset() {
        assert_eq!(resolve(U256::MAX, U256::zero()), Ok(None));
        assert_eq!(
            resolve(U256::MAX, U256::one()),
            Err(HaltReason::InsufficientGas)
        );
        assert_eq!(
            resolve(U256::from(4), U256::from(8)),
            Ok(Some(MemoryRange { offset: 4, len: 8 }))
        );
    }

    #[test]
    fn test_write_padded() {
        let mut memory = Memory::new();
        memory.write(0, &[0xff; 8]);
        let range = resolve(U256::zero(), U256::from(6)).unwrap();
        memory.write_padded(range, &[1, 2, 3, 4], 2);
        assert_eq!(&memory.as_slice()[..8], &[3, 4, 0, 0, 0, 0, 0xff, 0xff]);

        memory.write_padded(range, &[1, 2, 3], u64::MAX);
        assert_eq!(&memory.as_slice()[..6], &[0; 6]);
    }

    #[test]
    fn test_copy_within_overlapping() {
        let mut memory = Memory::new();
        memory.write(0, &[1, 2, 3, 4]);
        memory.copy_within(1, 0, 3);
        assert_eq!(&memory.as_slice()[..4], &[1, 1, 2, 3]);
    }

    #[test]
    fn test_read_none_is_empty() {
        let mut memory = Memory::new();
        assert!(memory.read(None).is_empty());
        assert!(memory.is_empty());
    }
}
