//! # Linear Memory
//!
//! Byte-addressable frame memory that grows in 32-byte words and never
//! shrinks. Growth is priced by [`memory_gas_cost`]; the interpreter charges
//! [`Memory::expansion_cost`] before calling [`Memory::expand`], so a frame
//! that cannot pay never observes the larger memory.

use crate::domain::value_objects::U256;
use crate::errors::VmError;

/// Default memory ceiling (16 MiB).
pub const MAX_MEMORY_SIZE: usize = 16 * 1024 * 1024;

/// Word size in bytes (32 bytes = 256 bits).
pub const WORD_SIZE: usize = 32;

/// Frame memory.
#[derive(Clone, Debug)]
pub struct Memory {
    data: Vec<u8>,
    limit: usize,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    /// Creates a new empty memory with the default ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(MAX_MEMORY_SIZE)
    }

    /// Creates a new empty memory that may grow to `limit` bytes.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            data: Vec::new(),
            limit,
        }
    }

    /// Returns the current memory size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if memory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the memory size in 32-byte words.
    #[must_use]
    pub fn word_size(&self) -> usize {
        self.data.len() / WORD_SIZE
    }

    /// Gas owed for growing memory so that `end` bytes are addressable.
    ///
    /// # Errors
    ///
    /// Returns `MemoryLimitExceeded` when `end` passes the ceiling.
    pub fn expansion_cost(&self, end: usize) -> Result<u64, VmError> {
        if end <= self.data.len() {
            return Ok(0);
        }
        if end > self.limit {
            return Err(VmError::MemoryLimitExceeded {
                requested: end,
                max: self.limit,
            });
        }
        Ok(memory_expansion_cost(self.word_size(), end.div_ceil(WORD_SIZE)))
    }

    /// Grows memory, zero-filled, to cover `end` bytes rounded up to a word.
    ///
    /// # Errors
    ///
    /// Returns `MemoryLimitExceeded` when `end` passes the ceiling.
    pub fn expand(&mut self, end: usize) -> Result<(), VmError> {
        if end <= self.data.len() {
            return Ok(());
        }
        if end > self.limit {
            return Err(VmError::MemoryLimitExceeded {
                requested: end,
                max: self.limit,
            });
        }
        self.data.resize(end.div_ceil(WORD_SIZE) * WORD_SIZE, 0);
        Ok(())
    }

    /// Reads the big-endian word at `offset`, zero-padded past the end.
    #[must_use]
    pub fn read_word(&self, offset: usize) -> U256 {
        let mut word = [0u8; 32];
        self.copy_out(offset, &mut word);
        U256::from_big_endian(&word)
    }

    /// Copies `size` bytes starting at `offset`, zero-padded past the end.
    #[must_use]
    pub fn read_bytes(&self, offset: usize, size: usize) -> Vec<u8> {
        let mut out = vec![0u8; size];
        self.copy_out(offset, &mut out);
        out
    }

    fn copy_out(&self, offset: usize, out: &mut [u8]) {
        if offset >= self.data.len() {
            return;
        }
        let available = (self.data.len() - offset).min(out.len());
        out[..available].copy_from_slice(&self.data[offset..offset + available]);
    }

    /// Writes one byte (MSTORE8).
    pub fn write_byte(&mut self, offset: usize, value: u8) {
        self.ensure(offset.saturating_add(1));
        self.data[offset] = value;
    }

    /// Writes a big-endian word (MSTORE).
    pub fn write_word(&mut self, offset: usize, value: U256) {
        let mut word = [0u8; 32];
        value.to_big_endian(&mut word);
        self.write_bytes(offset, &word);
    }

    /// Writes `data` at `offset`.
    pub fn write_bytes(&mut self, offset: usize, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let end = offset.saturating_add(data.len());
        self.ensure(end);
        self.data[offset..end].copy_from_slice(data);
    }

    /// Writes `size` bytes of `source` starting at `source_offset`,
    /// zero-filling whatever lies past the end of `source`.
    ///
    /// This is the copy rule shared by CALLDATACOPY, CODECOPY and
    /// EXTCODECOPY.
    pub fn write_padded(&mut self, offset: usize, source: &[u8], source_offset: U256, size: usize) {
        if size == 0 {
            return;
        }
        let end = offset.saturating_add(size);
        self.ensure(end);
        let target = &mut self.data[offset..end];
        target.fill(0);

        let Ok(start) = usize::try_from(source_offset) else {
            return;
        };
        if start < source.len() {
            let available = (source.len() - start).min(size);
            target[..available].copy_from_slice(&source[start..start + available]);
        }
    }

    /// Copies `size` bytes from `src` to `dest`; regions may overlap (MCOPY).
    pub fn copy_within(&mut self, dest: usize, src: usize, size: usize) {
        if size == 0 {
            return;
        }
        self.ensure(dest.max(src).saturating_add(size));
        self.data.copy_within(src..src + size, dest);
    }

    /// Get a reference to the underlying data.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    // Paid expansions already cover every write; this only keeps indexing
    // total if a caller skips the charge.
    fn ensure(&mut self, end: usize) {
        if end > self.data.len() {
            self.data.resize(end.div_ceil(WORD_SIZE) * WORD_SIZE, 0);
        }
    }
}

/// Total cost of a memory of `words` words.
///
/// Cost = `words^2` / 512 + 3 * `words`
#[must_use]
pub fn memory_gas_cost(words: usize) -> u64 {
    let words = words as u64;
    words.saturating_mul(words) / 512 + words.saturating_mul(3)
}

/// Incremental cost of growing from `old_words` to `new_words`.
#[must_use]
pub fn memory_expansion_cost(old_words: usize, new_words: usize) -> u64 {
    if new_words <= old_words {
        return 0;
    }
    memory_gas_cost(new_words) - memory_gas_cost(old_words)
}

// =============================================================================
// TESTS
// =============================================================================
