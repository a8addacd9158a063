//! # Transaction Journal
//!
//! Write overlay on top of committed state plus the transaction's event log.
//! Every call frame takes a checkpoint on entry; a failed frame rolls both
//! back to it, leaving the caller's earlier effects in place.
//!
//! The first committed value seen for each balance and storage slot is kept
//! for the lifetime of the transaction, rollbacks included. Later reads of
//! the same key return it, and the commit hands the whole set to the backend
//! for validation.

use crate::codec::WireValue;
use crate::domain::entities::{EventLogEntry, StateChange, StateRead};
use crate::domain::value_objects::{Address, Hash, U256};
use crate::errors::{HostError, StateError};
use crate::ports::outbound::StateAccess;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Position in the journal to roll back to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    undo_len: usize,
}

#[derive(Debug)]
enum UndoEntry {
    Balance {
        address: Address,
        previous: Option<U256>,
    },
    Storage {
        key: Hash,
        previous: Option<Option<WireValue>>,
    },
}

// =============================================================================
// STATE JOURNAL
// =============================================================================

/// Uncommitted state of one top-level transaction.
pub struct StateJournal {
    backend: Arc<dyn StateAccess>,
    balances: BTreeMap<Address, U256>,
    storage: BTreeMap<Hash, Option<WireValue>>,
    undo: Vec<UndoEntry>,
    observed_balances: BTreeMap<Address, U256>,
    observed_storage: BTreeMap<Hash, Option<WireValue>>,
}

impl StateJournal {
    /// Creates an empty overlay over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn StateAccess>) -> Self {
        Self {
            backend,
            balances: BTreeMap::new(),
            storage: BTreeMap::new(),
            undo: Vec::new(),
            observed_balances: BTreeMap::new(),
            observed_storage: BTreeMap::new(),
        }
    }

    /// Current balance, including uncommitted changes.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn balance(&mut self, address: &Address) -> Result<U256, StateError> {
        if let Some(balance) = self.balances.get(address) {
            return Ok(*balance);
        }
        if let Some(balance) = self.observed_balances.get(address) {
            return Ok(*balance);
        }
        let balance = self.backend.balance(address)?;
        self.observed_balances.insert(*address, balance);
        Ok(balance)
    }

    fn set_balance(&mut self, address: Address, balance: U256) {
        let previous = self.balances.insert(address, balance);
        self.undo.push(UndoEntry::Balance { address, previous });
    }

    /// Moves `amount` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// - `InsufficientBalance` if `from` cannot cover `amount`
    /// - `BalanceOverflow` if `to` cannot hold the credit
    /// - backend failures
    ///
    /// Nothing is changed when an error is returned.
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: U256) -> Result<(), HostError> {
        if amount.is_zero() {
            return Ok(());
        }
        let available = self.balance(from)?;
        if available < amount {
            return Err(HostError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance(to)?
            .checked_add(amount)
            .ok_or(HostError::BalanceOverflow(*to))?;
        self.set_balance(*from, available - amount);
        self.set_balance(*to, credited);
        Ok(())
    }

    /// Current value of a storage slot, including uncommitted changes.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn storage(&mut self, key: &Hash) -> Result<Option<WireValue>, StateError> {
        if let Some(value) = self.storage.get(key) {
            return Ok(value.clone());
        }
        if let Some(value) = self.observed_storage.get(key) {
            return Ok(value.clone());
        }
        let value = self.backend.storage(key)?;
        self.observed_storage.insert(*key, value.clone());
        Ok(value)
    }

    /// Writes (`Some`) or deletes (`None`) a storage slot.
    pub fn set_storage(&mut self, key: Hash, value: Option<WireValue>) {
        let previous = self.storage.insert(key, value);
        self.undo.push(UndoEntry::Storage { key, previous });
    }

    /// Marks the current position.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            undo_len: self.undo.len(),
        }
    }

    /// Undoes every change made after `checkpoint`.
    pub fn revert_to(&mut self, checkpoint: Checkpoint) {
        while self.undo.len() > checkpoint.undo_len {
            match self.undo.pop() {
                Some(UndoEntry::Balance { address, previous }) => match previous {
                    Some(balance) => {
                        self.balances.insert(address, balance);
                    }
                    None => {
                        self.balances.remove(&address);
                    }
                },
                Some(UndoEntry::Storage { key, previous }) => match previous {
                    Some(value) => {
                        self.storage.insert(key, value);
                    }
                    None => {
                        self.storage.remove(&key);
                    }
                },
                None => break,
            }
        }
    }

    /// Committed values observed, then net changes. Both are ordered balances
    /// first, each group in key order.
    #[must_use]
    pub fn into_parts(self) -> (Vec<StateRead>, Vec<StateChange>) {
        let reads = self
            .observed_balances
            .into_iter()
            .map(|(address, balance)| StateRead::Balance { address, balance })
            .chain(
                self.observed_storage
                    .into_iter()
                    .map(|(key, value)| StateRead::Storage { key, value }),
            )
            .collect();
        let changes = self
            .balances
            .into_iter()
            .map(|(address, balance)| StateChange::Balance { address, balance })
            .chain(
                self.storage
                    .into_iter()
                    .map(|(key, value)| StateChange::Storage { key, value }),
            )
            .collect();
        (reads, changes)
    }
}

// =============================================================================
// EVENT LOG
// =============================================================================

/// Append-only event sequence of one top-level transaction.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<EventLogEntry>,
}

impl EventLog {
    /// Appends an entry.
    pub fn push(&mut self, entry: EventLogEntry) {
        self.entries.push(entry);
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops entries emitted after position `len`.
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Entries in emission order.
    #[must_use]
    pub fn into_entries(self) -> Vec<EventLogEntry> {
        self.entries
    }
}

// =============================================================================
// TESTS
// =============================================================================
