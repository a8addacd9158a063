//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the executor depends on. External adapters implement these to
//! provide:
//! - Blockchain state (balances and contract storage)
//! - Deployment loaders (bytecode and script packages)
//!
//! Both are synchronous: guest execution never suspends, so every state read
//! completes or fails in place.

use crate::codec::WireValue;
use crate::domain::entities::{StateChange, StateRead};
use crate::domain::value_objects::{Address, Hash, U256};
use crate::errors::{DeployError, StateError};
use crate::ports::inbound::Contract;
use std::sync::Arc;

// =============================================================================
// STATE ACCESS
// =============================================================================

/// Committed blockchain state.
///
/// Transactions execute concurrently against this state without locks. The
/// executor reads through a journal and hands over, in one
/// [`apply`](StateAccess::apply), the committed values the transaction
/// observed together with its net changes.
pub trait StateAccess: Send + Sync {
    /// Balance of `address` (zero if the account was never funded).
    fn balance(&self, address: &Address) -> Result<U256, StateError>;

    /// Value stored under `key`, if any.
    fn storage(&self, key: &Hash) -> Result<Option<WireValue>, StateError>;

    /// Atomically applies the changes of a committed transaction.
    ///
    /// # Errors
    ///
    /// `Conflict` if any of `reads` no longer matches the committed state;
    /// nothing is applied in that case.
    fn apply(&self, reads: &[StateRead], changes: Vec<StateChange>) -> Result<(), StateError>;
}

// =============================================================================
// CONTENT LOADER
// =============================================================================

/// Turns a deployment payload into executable guest code.
///
/// Payload interpretation (package parsing, verification, instrumentation)
/// belongs entirely to the loader.
pub trait ContentLoader: Send + Sync {
    /// Loads the payload.
    ///
    /// # Errors
    ///
    /// `InvalidPackage` if the payload is not a package this loader accepts.
    fn load(&self, payload: &[u8]) -> Result<Arc<dyn Contract>, DeployError>;
}
