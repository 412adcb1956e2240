//! # Transaction Substate
//!
//! Per-execution bookkeeping that lives beside the state collaborator but
//! is not account state: the EIP-2929 warm set, EIP-1153 transient storage,
//! transaction-start storage values for SSTORE pricing, and the accounts
//! created or scheduled for destruction.
//!
//! Every change except the original-value cache is journaled. The
//! dispatcher takes a [`SubstateCheckpoint`] next to each state checkpoint
//! and rolls both back together.

use crate::domain::value_objects::{Address, StorageKey, StorageValue};
use std::collections::{HashMap, HashSet};

/// Whether an access was the first of the transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessStatus {
    /// Already touched earlier in the transaction.
    Warm,
    /// First touch; the cold surcharge applies.
    Cold,
}

impl AccessStatus {
    /// True for [`AccessStatus::Cold`].
    #[must_use]
    pub const fn is_cold(self) -> bool {
        matches!(self, Self::Cold)
    }
}

/// Journal position to roll back to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubstateCheckpoint(usize);

#[derive(Clone, Debug)]
enum Entry {
    AccountWarmed(Address),
    SlotWarmed(Address, StorageKey),
    TransientWritten {
        address: Address,
        key: StorageKey,
        previous: StorageValue,
    },
    Created(Address),
    Destructed(Address),
}

/// Journaled per-execution substate.
#[derive(Clone, Debug, Default)]
pub struct Substate {
    warm_accounts: HashSet<Address>,
    warm_slots: HashSet<(Address, StorageKey)>,
    transient: HashMap<(Address, StorageKey), StorageValue>,
    originals: HashMap<(Address, StorageKey), StorageValue>,
    created: HashSet<Address>,
    destructed: Vec<Address>,
    journal: Vec<Entry>,
}

impl Substate {
    /// Creates an empty substate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // CHECKPOINTS
    // =========================================================================

    /// Marks the current journal position.
    #[must_use]
    pub fn checkpoint(&self) -> SubstateCheckpoint {
        SubstateCheckpoint(self.journal.len())
    }

    /// Undoes every journaled change made after `checkpoint`.
    pub fn revert_to(&mut self, checkpoint: SubstateCheckpoint) {
        while self.journal.len() > checkpoint.0 {
            let Some(entry) = self.journal.pop() else {
                break;
            };
            match entry {
                Entry::AccountWarmed(address) => {
                    self.warm_accounts.remove(&address);
                }
                Entry::SlotWarmed(address, key) => {
                    self.warm_slots.remove(&(address, key));
                }
                Entry::TransientWritten {
                    address,
                    key,
                    previous,
                } => {
                    if previous.is_zero() {
                        self.transient.remove(&(address, key));
                    } else {
                        self.transient.insert((address, key), previous);
                    }
                }
                Entry::Created(address) => {
                    self.created.remove(&address);
                }
                Entry::Destructed(address) => {
                    if let Some(pos) = self.destructed.iter().rposition(|a| *a == address) {
                        self.destructed.remove(pos);
                    }
                }
            }
        }
    }

    // =========================================================================
    // WARM SET (EIP-2929)
    // =========================================================================

    /// Warms `address`, reporting whether it was cold.
    pub fn access_account(&mut self, address: Address) -> AccessStatus {
        if self.warm_accounts.insert(address) {
            self.journal.push(Entry::AccountWarmed(address));
            AccessStatus::Cold
        } else {
            AccessStatus::Warm
        }
    }

    /// Warms a storage slot, reporting whether it was cold.
    pub fn access_slot(&mut self, address: Address, key: StorageKey) -> AccessStatus {
        if self.warm_slots.insert((address, key)) {
            self.journal.push(Entry::SlotWarmed(address, key));
            AccessStatus::Cold
        } else {
            AccessStatus::Warm
        }
    }

    /// True when `address` has been touched.
    #[must_use]
    pub fn is_account_warm(&self, address: &Address) -> bool {
        self.warm_accounts.contains(address)
    }

    /// True when the slot has been touched.
    #[must_use]
    pub fn is_slot_warm(&self, address: Address, key: StorageKey) -> bool {
        self.warm_slots.contains(&(address, key))
    }

    // =========================================================================
    // ORIGINAL STORAGE VALUES
    // =========================================================================

    /// Value the slot held when the transaction started.
    ///
    /// The first call for a slot must pass the value read from state before
    /// any write to it; later calls return the remembered value.
    pub fn original_value(
        &mut self,
        address: Address,
        key: StorageKey,
        current: StorageValue,
    ) -> StorageValue {
        *self.originals.entry((address, key)).or_insert(current)
    }

    // =========================================================================
    // TRANSIENT STORAGE (EIP-1153)
    // =========================================================================

    /// TLOAD.
    #[must_use]
    pub fn transient_load(&self, address: Address, key: StorageKey) -> StorageValue {
        self.transient
            .get(&(address, key))
            .copied()
            .unwrap_or_default()
    }

    /// TSTORE.
    pub fn transient_store(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        let previous = if value.is_zero() {
            self.transient.remove(&(address, key))
        } else {
            self.transient.insert((address, key), value)
        }
        .unwrap_or_default();

        if previous != value {
            self.journal.push(Entry::TransientWritten {
                address,
                key,
                previous,
            });
        }
    }

    // =========================================================================
    // CREATION AND DESTRUCTION
    // =========================================================================

    /// Records an account created in this transaction.
    pub fn mark_created(&mut self, address: Address) {
        if self.created.insert(address) {
            self.journal.push(Entry::Created(address));
        }
    }

    /// True when `address` was created in this transaction.
    #[must_use]
    pub fn was_created(&self, address: &Address) -> bool {
        self.created.contains(address)
    }

    /// Schedules `address` for deletion. Returns false if already scheduled.
    pub fn schedule_destruct(&mut self, address: Address) -> bool {
        if self.destructed.contains(&address) {
            return false;
        }
        self.destructed.push(address);
        self.journal.push(Entry::Destructed(address));
        true
    }

    /// Accounts scheduled for deletion, in scheduling order.
    #[must_use]
    pub fn destructed(&self) -> &[Address] {
        &self.destructed
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::U256;

    fn key(n: u64) -> StorageKey {
        StorageKey::from_u256(U256::from(n))
    }

    fn value(n: u64) -> StorageValue {
        StorageValue::from_u256(U256::from(n))
    }

    #[test]
    fn test_account_access_cold_then_warm() {
        let mut substate = Substate::new();
        let addr = Address::new([1u8; 20]);
        assert_eq!(substate.access_account(addr), AccessStatus::Cold);
        assert_eq!(substate.access_account(addr), AccessStatus::Warm);
    }

    #[test]
    fn test_revert_drops_warmth_added_after_checkpoint() {
        let mut substate = Substate::new();
        let a = Address::new([1u8; 20]);
        let b = Address::new([2u8; 20]);
        substate.access_account(a);

        let cp = substate.checkpoint();
        substate.access_account(b);
        substate.access_slot(a, key(1));
        substate.revert_to(cp);

        assert!(substate.is_account_warm(&a));
        assert!(!substate.is_account_warm(&b));
        assert!(!substate.is_slot_warm(a, key(1)));
    }

    #[test]
    fn test_transient_storage_is_journaled() {
        let mut substate = Substate::new();
        let addr = Address::new([3u8; 20]);
        substate.transient_store(addr, key(1), value(10));

        let cp = substate.checkpoint();
        substate.transient_store(addr, key(1), value(20));
        substate.transient_store(addr, key(2), value(30));
        assert_eq!(substate.transient_load(addr, key(1)), value(20));
        substate.revert_to(cp);

        assert_eq!(substate.transient_load(addr, key(1)), value(10));
        assert_eq!(substate.transient_load(addr, key(2)), StorageValue::ZERO);
    }

    #[test]
    fn test_transient_storage_isolated_per_contract() {
        let mut substate = Substate::new();
        substate.transient_store(Address::new([1u8; 20]), key(1), value(42));
        assert!(substate.transient_load(Address::new([2u8; 20]), key(1)).is_zero());
    }

    #[test]
    fn test_original_value_sticks() {
        let mut substate = Substate::new();
        let addr = Address::new([4u8; 20]);
        assert_eq!(substate.original_value(addr, key(0), value(5)), value(5));
        assert_eq!(substate.original_value(addr, key(0), value(9)), value(5));
    }

    #[test]
    fn test_destruct_and_create_revert() {
        let mut substate = Substate::new();
        let addr = Address::new([5u8; 20]);
        let cp = substate.checkpoint();
        substate.mark_created(addr);
        assert!(substate.schedule_destruct(addr));
        assert!(!substate.schedule_destruct(addr));
        assert_eq!(substate.destructed(), &[addr]);

        substate.revert_to(cp);
        assert!(substate.destructed().is_empty());
        assert!(!substate.was_created(&addr));
    }
}
