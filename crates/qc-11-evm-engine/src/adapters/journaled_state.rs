//! # Journaled State
//!
//! In-memory [`StateAccess`] + [`JournalBridge`] backend. Every write made
//! while a checkpoint is open is recorded with the value it replaced, and
//! reverting replays those records backwards. Writes made with no
//! checkpoint open (seeding) are not journaled.
//!
//! Cloning produces a deep, fully isolated copy, which is what
//! [`EvmEngine::clone`](crate::engine::EvmEngine) relies on for parallel
//! speculative runs.

use crate::domain::entities::AccountState;
use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Bytes, StorageKey, StorageValue, U256};
use crate::errors::StateError;
use crate::ports::outbound::{Checkpoint, JournalBridge, StateAccess};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

type Slots = HashMap<StorageKey, StorageValue>;

#[derive(Clone, Debug)]
enum JournalEntry {
    Account {
        address: Address,
        previous: Option<AccountState>,
    },
    Code {
        address: Address,
        previous: Option<Bytes>,
    },
    Storage {
        address: Address,
        key: StorageKey,
        previous: Option<StorageValue>,
    },
    Deleted {
        address: Address,
        account: Option<AccountState>,
        code: Option<Bytes>,
        storage: Option<Slots>,
    },
}

#[derive(Clone, Debug, Default)]
struct Inner {
    accounts: HashMap<Address, AccountState>,
    code: HashMap<Address, Bytes>,
    storage: HashMap<Address, Slots>,
    journal: Vec<JournalEntry>,
    /// Open checkpoints, innermost last: (id, journal length when opened).
    checkpoints: Vec<(u64, usize)>,
    next_id: u64,
}

impl Inner {
    fn record(&mut self, entry: JournalEntry) {
        if !self.checkpoints.is_empty() {
            self.journal.push(entry);
        }
    }

    fn update_account(&mut self, address: Address, update: impl FnOnce(&mut AccountState)) {
        let previous = self.accounts.get(&address).cloned();
        self.record(JournalEntry::Account { address, previous });
        update(self.accounts.entry(address).or_default());
    }

    fn write_storage(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        let slots = self.storage.entry(address).or_default();
        let previous = if value.is_zero() {
            slots.remove(&key)
        } else {
            slots.insert(key, value)
        };
        self.record(JournalEntry::Storage {
            address,
            key,
            previous,
        });
    }

    fn write_code(&mut self, address: Address, code: Bytes) {
        let code_hash = if code.is_empty() {
            AccountState::EMPTY_CODE_HASH
        } else {
            keccak256(code.as_slice())
        };
        self.update_account(address, |account| account.code_hash = code_hash);
        let previous = if code.is_empty() {
            self.code.remove(&address)
        } else {
            self.code.insert(address, code)
        };
        self.record(JournalEntry::Code { address, previous });
    }

    fn check_innermost(&self, checkpoint: Checkpoint) -> Result<usize, StateError> {
        match self.checkpoints.last() {
            Some((id, mark)) if *id == checkpoint.id() => Ok(*mark),
            _ => Err(StateError::InvalidCheckpoint(checkpoint.id())),
        }
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Account { address, previous } => {
                restore(&mut self.accounts, address, previous);
            }
            JournalEntry::Code { address, previous } => {
                restore(&mut self.code, address, previous);
            }
            JournalEntry::Storage {
                address,
                key,
                previous,
            } => {
                let slots = self.storage.entry(address).or_default();
                restore(slots, key, previous);
            }
            JournalEntry::Deleted {
                address,
                account,
                code,
                storage,
            } => {
                restore(&mut self.accounts, address, account);
                restore(&mut self.code, address, code);
                restore(&mut self.storage, address, storage);
            }
        }
    }
}

fn restore<K: std::hash::Hash + Eq, V>(map: &mut HashMap<K, V>, key: K, previous: Option<V>) {
    match previous {
        Some(value) => {
            map.insert(key, value);
        }
        None => {
            map.remove(&key);
        }
    }
}

/// In-memory journaled state.
#[derive(Debug, Default)]
pub struct JournaledState {
    inner: RwLock<Inner>,
}

impl Clone for JournaledState {
    fn clone(&self) -> Self {
        Self {
            inner: RwLock::new(self.inner.read().clone()),
        }
    }
}

impl JournaledState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // SEEDING AND INSPECTION
    // =========================================================================

    /// Inserts or replaces an account record.
    pub fn seed_account(&self, address: Address, account: AccountState) {
        let mut inner = self.inner.write();
        let previous = inner.accounts.insert(address, account);
        inner.record(JournalEntry::Account { address, previous });
    }

    /// Sets a balance, creating the account if needed.
    pub fn seed_balance(&self, address: Address, balance: U256) {
        self.inner
            .write()
            .update_account(address, |account| account.balance = balance);
    }

    /// Installs code, creating the account if needed.
    pub fn seed_code(&self, address: Address, code: impl Into<Bytes>) {
        self.inner.write().write_code(address, code.into());
    }

    /// Writes a storage slot.
    pub fn seed_storage(&self, address: Address, key: StorageKey, value: StorageValue) {
        self.inner.write().write_storage(address, key, value);
    }

    /// Account record, if present.
    #[must_use]
    pub fn account_of(&self, address: &Address) -> Option<AccountState> {
        self.inner.read().accounts.get(address).cloned()
    }

    /// Balance, zero for unknown accounts.
    #[must_use]
    pub fn balance_of(&self, address: &Address) -> U256 {
        self.account_of(address)
            .map_or_else(U256::zero, |account| account.balance)
    }

    /// Nonce, zero for unknown accounts.
    #[must_use]
    pub fn nonce_of(&self, address: &Address) -> u64 {
        self.account_of(address).map_or(0, |account| account.nonce)
    }

    /// Code, empty for accounts without code.
    #[must_use]
    pub fn code_of(&self, address: &Address) -> Bytes {
        self.inner
            .read()
            .code
            .get(address)
            .cloned()
            .unwrap_or_default()
    }

    /// Storage slot, zero when unset.
    #[must_use]
    pub fn storage_of(&self, address: &Address, key: &StorageKey) -> StorageValue {
        self.inner
            .read()
            .storage
            .get(address)
            .and_then(|slots| slots.get(key))
            .copied()
            .unwrap_or_default()
    }

    /// Number of checkpoints currently open.
    #[must_use]
    pub fn open_checkpoints(&self) -> usize {
        self.inner.read().checkpoints.len()
    }
}

#[async_trait]
impl StateAccess for JournaledState {
    async fn get_account(&self, address: Address) -> Result<Option<AccountState>, StateError> {
        Ok(self.account_of(&address))
    }

    async fn get_storage(
        &self,
        address: Address,
        key: StorageKey,
    ) -> Result<StorageValue, StateError> {
        Ok(self.storage_of(&address, &key))
    }

    async fn set_storage(
        &self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), StateError> {
        self.inner.write().write_storage(address, key, value);
        Ok(())
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, StateError> {
        Ok(self.code_of(&address))
    }

    async fn set_code(&self, address: Address, code: Bytes) -> Result<(), StateError> {
        self.inner.write().write_code(address, code);
        Ok(())
    }

    async fn set_balance(&self, address: Address, balance: U256) -> Result<(), StateError> {
        self.seed_balance(address, balance);
        Ok(())
    }

    async fn set_nonce(&self, address: Address, nonce: u64) -> Result<(), StateError> {
        self.inner
            .write()
            .update_account(address, |account| account.nonce = nonce);
        Ok(())
    }

    async fn delete_account(&self, address: Address) -> Result<(), StateError> {
        let mut inner = self.inner.write();
        let account = inner.accounts.remove(&address);
        let code = inner.code.remove(&address);
        let storage = inner.storage.remove(&address);
        inner.record(JournalEntry::Deleted {
            address,
            account,
            code,
            storage,
        });
        Ok(())
    }

    async fn account_exists(&self, address: Address) -> Result<bool, StateError> {
        Ok(self.inner.read().accounts.contains_key(&address))
    }
}

#[async_trait]
impl JournalBridge for JournaledState {
    async fn checkpoint(&self) -> Result<Checkpoint, StateError> {
        let mut inner = self.inner.write();
        let id = inner.next_id;
        inner.next_id += 1;
        let mark = inner.journal.len();
        inner.checkpoints.push((id, mark));
        Ok(Checkpoint::new(id))
    }

    async fn commit(&self, checkpoint: Checkpoint) -> Result<(), StateError> {
        let mut inner = self.inner.write();
        inner.check_innermost(checkpoint)?;
        inner.checkpoints.pop();
        if inner.checkpoints.is_empty() {
            inner.journal.clear();
        }
        Ok(())
    }

    async fn revert(&self, checkpoint: Checkpoint) -> Result<(), StateError> {
        let mut inner = self.inner.write();
        let mark = inner.check_innermost(checkpoint)?;
        inner.checkpoints.pop();
        while inner.journal.len() > mark {
            if let Some(entry) = inner.journal.pop() {
                inner.undo(entry);
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
