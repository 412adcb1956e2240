//! # Code Analysis
//!
//! Jump destination analysis and the per-engine cache of analysed code.
//!
//! A byte is a valid jump target only when it holds JUMPDEST *and* is an
//! instruction start, never an immediate of a preceding PUSH.

use crate::domain::services::keccak256;
use crate::domain::value_objects::{Bytes, Hash, U256};
use lru::LruCache;
use parking_lot::Mutex;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

const JUMPDEST: u8 = 0x5B;
const PUSH1: u8 = 0x60;
const PUSH32: u8 = 0x7F;

/// Bit set of valid jump destinations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JumpTable {
    bits: Vec<u64>,
    len: usize,
}

impl JumpTable {
    /// Scans `code`, skipping PUSH immediates.
    #[must_use]
    pub fn analyze(code: &[u8]) -> Self {
        let mut bits = vec![0u64; code.len().div_ceil(64)];
        let mut pc = 0;
        while pc < code.len() {
            let op = code[pc];
            if op == JUMPDEST {
                bits[pc / 64] |= 1 << (pc % 64);
            } else if (PUSH1..=PUSH32).contains(&op) {
                pc += usize::from(op - PUSH1) + 1;
            }
            pc += 1;
        }
        Self {
            bits,
            len: code.len(),
        }
    }

    /// True when `pc` is an instruction-start JUMPDEST.
    #[must_use]
    pub fn contains(&self, pc: usize) -> bool {
        pc < self.len && self.bits[pc / 64] & (1 << (pc % 64)) != 0
    }
}

/// Code together with its hash and jump table.
#[derive(Debug)]
pub struct AnalyzedCode {
    code: Bytes,
    hash: Hash,
    jump_table: JumpTable,
}

impl AnalyzedCode {
    /// Analyses `code`, hashing it.
    #[must_use]
    pub fn new(code: Bytes) -> Self {
        let hash = keccak256(code.as_slice());
        Self::with_hash(code, hash)
    }

    /// Analyses `code` whose hash is already known.
    #[must_use]
    pub fn with_hash(code: Bytes, hash: Hash) -> Self {
        let jump_table = JumpTable::analyze(code.as_slice());
        Self {
            code,
            hash,
            jump_table,
        }
    }

    /// Raw bytecode.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.code.as_slice()
    }

    /// Code length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// True for empty code.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Keccak-256 of the code.
    #[must_use]
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// Byte at `pc`; reading past the end yields STOP.
    #[must_use]
    pub fn byte_at(&self, pc: usize) -> u8 {
        self.code.as_slice().get(pc).copied().unwrap_or(0)
    }

    /// True when the stack word `dest` names a valid jump destination.
    #[must_use]
    pub fn is_valid_jump(&self, dest: U256) -> bool {
        usize::try_from(dest).is_ok_and(|pc| self.jump_table.contains(pc))
    }
}

// =============================================================================
// CODE CACHE
// =============================================================================

/// Analysed code keyed by code hash, shared by every frame of an engine.
///
/// Least recently used entries are evicted once `capacity` is reached.
pub struct CodeCache {
    entries: Option<Mutex<LruCache<Hash, Arc<AnalyzedCode>>>>,
}

impl CodeCache {
    /// Creates a cache holding at most `capacity` entries (0 disables it).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Returns the analysis for `hash`, building it from `code` on a miss.
    pub fn get_or_analyze(&self, hash: Hash, code: Bytes) -> Arc<AnalyzedCode> {
        let Some(entries) = &self.entries else {
            return Arc::new(AnalyzedCode::with_hash(code, hash));
        };
        if let Some(hit) = entries.lock().get(&hash) {
            return Arc::clone(hit);
        }

        let analyzed = Arc::new(AnalyzedCode::with_hash(code, hash));
        if let Some((evicted, _)) = entries.lock().push(hash, Arc::clone(&analyzed)) {
            if evicted != hash {
                tracing::trace!(?evicted, "code cache evicted entry");
            }
        }
        analyzed
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.lock().len())
    }

    /// True when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for CodeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let capacity = self
            .entries
            .as_ref()
            .map_or(0, |entries| entries.lock().cap().get());
        f.debug_struct("CodeCache")
            .field("len", &self.len())
            .field("capacity", &capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jumpdest_inside_push_data_is_invalid() {
        // PUSH1 0x5B, JUMPDEST
        let table = JumpTable::analyze(&[0x60, 0x5B, 0x5B]);
        assert!(!table.contains(1));
        assert!(table.contains(2));
        assert!(!table.contains(3));
    }

    #[test]
    fn test_truncated_push_at_end() {
        // PUSH32 with only two immediate bytes
        let table = JumpTable::analyze(&[0x7F, 0x5B, 0x5B]);
        assert!(!table.contains(1));
        assert!(!table.contains(2));
    }

    #[test]
    fn test_is_valid_jump_large_word() {
        let code = AnalyzedCode::new(Bytes::from_vec(vec![0x5B]));
        assert!(code.is_valid_jump(U256::zero()));
        assert!(!code.is_valid_jump(U256::MAX));
        assert_eq!(code.byte_at(5), 0);
    }

    #[test]
    fn test_cache_reuses_analysis() {
        let cache = CodeCache::new(4);
        let code = Bytes::from_vec(vec![0x5B, 0x00]);
        let hash = keccak256(code.as_slice());
        let first = cache.get_or_analyze(hash, code.clone());
        let second = cache.get_or_analyze(hash, code);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_evicts_least_recently_used() {
        let cache = CodeCache::new(2);
        let blob = |byte: u8| {
            let code = Bytes::from_vec(vec![byte]);
            (keccak256(code.as_slice()), code)
        };
        let (hot_hash, hot_code) = blob(0xA0);
        let hot = cache.get_or_analyze(hot_hash, hot_code.clone());

        for byte in [0xB0, 0xC0] {
            assert!(Arc::ptr_eq(&hot, &cache.get_or_analyze(hot_hash, hot_code.clone())));
            let (hash, code) = blob(byte);
            cache.get_or_analyze(hash, code);
        }

        assert_eq!(cache.len(), 2);
        assert!(Arc::ptr_eq(&hot, &cache.get_or_analyze(hot_hash, hot_code)));
        let (cold_hash, cold_code) = blob(0xB0);
        let cold = cache.get_or_analyze(cold_hash, cold_code);
        assert_eq!(cold.hash(), cold_hash);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_disabled_cache() {
        let cache = CodeCache::new(0);
        let code = Bytes::from_vec(vec![0x00]);
        cache.get_or_analyze(Hash::ZERO, code);
        assert!(cache.is_empty());
    }
}
