//! # State Adapter
//!
//! In-memory state backend for tests and local tooling.
//! A node would back [`StateAccess`] with its storage engine instead.

use crate::codec::WireValue;
use crate::domain::entities::{StateChange, StateRead};
use crate::domain::value_objects::{Address, Hash, U256};
use crate::errors::StateError;
use crate::ports::outbound::StateAccess;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory state.
#[derive(Debug, Default)]
pub struct InMemoryState {
    balances: RwLock<HashMap<Address, U256>>,
    storage: RwLock<HashMap<Hash, WireValue>>,
}

impl InMemoryState {
    /// Create a new empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set balance for an address.
    pub fn set_balance(&self, address: Address, balance: U256) {
        self.balances.write().insert(address, balance);
    }

    /// Committed balance.
    #[must_use]
    pub fn balance_of(&self, address: &Address) -> U256 {
        self.balances.read().get(address).copied().unwrap_or_default()
    }

    /// Number of occupied storage slots.
    #[must_use]
    pub fn storage_len(&self) -> usize {
        self.storage.read().len()
    }
}

impl StateAccess for InMemoryState {
    fn balance(&self, address: &Address) -> Result<U256, StateError> {
        Ok(self.balance_of(address))
    }

    fn storage(&self, key: &Hash) -> Result<Option<WireValue>, StateError> {
        Ok(self.storage.read().get(key).cloned())
    }

    fn apply(&self, reads: &[StateRead], changes: Vec<StateChange>) -> Result<(), StateError> {
        let mut balances = self.balances.write();
        let mut storage = self.storage.write();

        for read in reads {
            match read {
                StateRead::Balance { address, balance } => {
                    let current = balances.get(address).copied().unwrap_or_default();
                    if current != *balance {
                        return Err(StateError::Conflict(format!("balance of {address}")));
                    }
                }
                StateRead::Storage { key, value } => {
                    if storage.get(key) != value.as_ref() {
                        return Err(StateError::Conflict(format!("storage slot {key}")));
                    }
                }
            }
        }

        for change in changes {
            match change {
                StateChange::Balance { address, balance } => {
                    balances.insert(address, balance);
                }
                StateChange::Storage { key, value: Some(value) } => {
                    storage.insert(key, value);
                }
                StateChange::Storage { key, value: None } => {
                    storage.remove(&key);
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
