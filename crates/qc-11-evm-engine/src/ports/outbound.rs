//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the engine depends on:
//! - [`StateAccess`]: account and storage reads and writes
//! - [`JournalBridge`]: checkpoint, commit and revert of those writes
//! - [`BlockHashOracle`]: historical block hashes for BLOCKHASH
//!
//! ## Suspension
//!
//! Every state method is `async` so a backend may yield while it loads a
//! slot. The engine awaits each call to completion before the next
//! instruction runs, so no two instructions of one execution ever
//! interleave.

use crate::domain::entities::AccountState;
use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue, U256};
use crate::errors::StateError;
use async_trait::async_trait;

// =============================================================================
// STATE ACCESS
// =============================================================================

/// Account and storage primitives.
///
/// Writes take `&self`; implementations provide their own interior
/// mutability and must make every write undoable through the
/// [`JournalBridge`] they are paired with.
#[async_trait]
pub trait StateAccess: Send + Sync {
    /// Get account state.
    ///
    /// # Returns
    ///
    /// * `Some(AccountState)` - If the account exists
    /// * `None` - If it was never touched
    async fn get_account(&self, address: Address) -> Result<Option<AccountState>, StateError>;

    /// Get a storage value (zero if never written).
    async fn get_storage(&self, address: Address, key: StorageKey)
        -> Result<StorageValue, StateError>;

    /// Set a storage value.
    async fn set_storage(
        &self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), StateError>;

    /// Get contract code (empty for accounts without code).
    async fn get_code(&self, address: Address) -> Result<Bytes, StateError>;

    /// Install code, updating the account's code hash.
    async fn set_code(&self, address: Address, code: Bytes) -> Result<(), StateError>;

    /// Overwrite a balance, creating the account if needed.
    async fn set_balance(&self, address: Address, balance: U256) -> Result<(), StateError>;

    /// Overwrite a nonce, creating the account if needed.
    async fn set_nonce(&self, address: Address, nonce: u64) -> Result<(), StateError>;

    /// Remove an account together with its code and storage.
    async fn delete_account(&self, address: Address) -> Result<(), StateError>;

    /// True when the account is present in state, empty or not.
    async fn account_exists(&self, address: Address) -> Result<bool, StateError>;

    /// Account balance, zero for unknown accounts.
    async fn get_balance(&self, address: Address) -> Result<U256, StateError> {
        Ok(self
            .get_account(address)
            .await?
            .map_or_else(U256::zero, |account| account.balance))
    }

    /// Account nonce, zero for unknown accounts.
    async fn get_nonce(&self, address: Address) -> Result<u64, StateError> {
        Ok(self
            .get_account(address)
            .await?
            .map_or(0, |account| account.nonce))
    }

    /// Code hash, or `None` for an account that does not exist.
    async fn get_code_hash(&self, address: Address) -> Result<Option<Hash>, StateError> {
        Ok(self
            .get_account(address)
            .await?
            .map(|account| account.code_hash))
    }

    /// EIP-161 emptiness: missing, or zero balance, zero nonce and no code.
    async fn is_empty(&self, address: Address) -> Result<bool, StateError> {
        Ok(self
            .get_account(address)
            .await?
            .map_or(true, |account| account.is_empty()))
    }

    /// Moves `value` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// `BalanceUnderflow` if `from` cannot cover `value`, `BalanceOverflow`
    /// if `to` would wrap. Nothing is written on error.
    async fn transfer(&self, from: Address, to: Address, value: U256) -> Result<(), StateError> {
        if value.is_zero() || from == to {
            // Self-transfers still require the funds to exist
            if self.get_balance(from).await? < value {
                return Err(StateError::BalanceUnderflow(from));
            }
            return Ok(());
        }
        let from_balance = self.get_balance(from).await?;
        let remaining = from_balance
            .checked_sub(value)
            .ok_or(StateError::BalanceUnderflow(from))?;
        let to_balance = self
            .get_balance(to)
            .await?
            .checked_add(value)
            .ok_or(StateError::BalanceOverflow(to))?;
        self.set_balance(from, remaining).await?;
        self.set_balance(to, to_balance).await
    }
}

// =============================================================================
// JOURNAL BRIDGE
// =============================================================================

/// Opaque token marking a point state can be rolled back to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Checkpoint(u64);

impl Checkpoint {
    /// Wraps a collaborator-issued identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The collaborator-issued identifier.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.0
    }
}

/// Checkpoint discipline over [`StateAccess`] writes.
///
/// Checkpoints nest like a stack. Only the innermost open checkpoint may be
/// committed or reverted. Reverting undoes every write made after the
/// checkpoint was taken, including writes under inner checkpoints that
/// were already committed. A commit is provisional until the outermost
/// checkpoint commits.
#[async_trait]
pub trait JournalBridge: Send + Sync {
    /// Opens a checkpoint.
    async fn checkpoint(&self) -> Result<Checkpoint, StateError>;

    /// Folds the writes since `checkpoint` into the enclosing one.
    async fn commit(&self, checkpoint: Checkpoint) -> Result<(), StateError>;

    /// Undoes the writes since `checkpoint`.
    async fn revert(&self, checkpoint: Checkpoint) -> Result<(), StateError>;
}

/// Everything the engine needs from its state backend.
pub trait StateCollaborator: StateAccess + JournalBridge {}

impl<T: StateAccess + JournalBridge + ?Sized> StateCollaborator for T {}

// =============================================================================
// BLOCK HASH ORACLE
// =============================================================================

/// Historical block hashes for BLOCKHASH.
///
/// The interpreter only asks for the 256 blocks preceding the current one.
#[async_trait]
pub trait BlockHashOracle: Send + Sync {
    /// Hash of block `number`, if known.
    async fn block_hash(&self, number: u64) -> Option<Hash>;
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Balances(Mutex<HashMap<Address, U256>>);

    #[async_trait]
    impl StateAccess for Balances {
        async fn get_account(&self, address: Address) -> Result<Option<AccountState>, StateError> {
            Ok(self
                .0
                .lock()
                .get(&address)
                .map(|balance| AccountState::new_eoa(*balance, 0)))
        }

        async fn get_storage(&self, _: Address, _: StorageKey) -> Result<StorageValue, StateError> {
            Ok(StorageValue::ZERO)
        }

        async fn set_storage(
            &self,
            _: Address,
            _: StorageKey,
            _: StorageValue,
        ) -> Result<(), StateError> {
            Ok(())
        }

        async fn get_code(&self, _: Address) -> Result<Bytes, StateError> {
            Ok(Bytes::new())
        }

        async fn set_code(&self, _: Address, _: Bytes) -> Result<(), StateError> {
            Ok(())
        }

        async fn set_balance(&self, address: Address, balance: U256) -> Result<(), StateError> {
            self.0.lock().insert(address, balance);
            Ok(())
        }

        async fn set_nonce(&self, _: Address, _: u64) -> Result<(), StateError> {
            Ok(())
        }

        async fn delete_account(&self, address: Address) -> Result<(), StateError> {
            self.0.lock().remove(&address);
            Ok(())
        }

        async fn account_exists(&self, address: Address) -> Result<bool, StateError> {
            Ok(self.0.lock().contains_key(&address))
        }
    }

    #[tokio::test]
    async fn test_default_accessors() {
        let state = Balances::default();
        let addr = Address::new([1u8; 20]);
        assert_eq!(state.get_balance(addr).await.unwrap(), U256::zero());
        assert_eq!(state.get_code_hash(addr).await.unwrap(), None);
        assert!(state.is_empty(addr).await.unwrap());

        state.set_balance(addr, U256::from(5)).await.unwrap();
        assert!(!state.is_empty(addr).await.unwrap());
        assert_eq!(
            state.get_code_hash(addr).await.unwrap(),
            Some(AccountState::EMPTY_CODE_HASH)
        );
    }

    #[tokio::test]
    async fn test_transfer_checks_funds() {
        let state = Balances::default();
        let a = Address::new([1u8; 20]);
        let b = Address::new([2u8; 20]);
        state.set_balance(a, U256::from(100)).await.unwrap();

        state.transfer(a, b, U256::from(40)).await.unwrap();
        assert_eq!(state.get_balance(a).await.unwrap(), U256::from(60));
        assert_eq!(state.get_balance(b).await.unwrap(), U256::from(40));

        let err = state.transfer(a, b, U256::from(61)).await.unwrap_err();
        assert_eq!(err, StateError::BalanceUnderflow(a));
        assert_eq!(state.get_balance(a).await.unwrap(), U256::from(60));
    }

    #[test]
    fn test_checkpoint_id() {
        assert_eq!(Checkpoint::new(7).id(), 7);
    }
}
