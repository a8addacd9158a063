//! # Core Domain Entities
//!
//! Main business entities for sandboxed contract invocation.

use crate::codec::WireValue;
use crate::domain::typed_value::{ParamSpec, TypedValue, ValueKind};
use crate::domain::value_objects::{Address, Hash, U256};
use serde::{Deserialize, Serialize};

// =============================================================================
// TRANSACTION CONTEXT
// =============================================================================

/// Read-only facts about the top-level transaction.
///
/// Shared by every execution context spawned while processing the
/// transaction; never mutated by guest code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionContext {
    /// Transaction hash.
    pub hash: Hash,
    /// Position of the transaction in its block.
    pub index: i32,
    /// Transaction timestamp (microseconds).
    pub timestamp: i64,
    /// Sender-supplied nonce.
    pub nonce: U256,
    /// Account that signed the transaction.
    pub origin: Address,
    /// Block height.
    pub block_height: i64,
    /// Block timestamp (microseconds).
    pub block_timestamp: i64,
}

impl Default for TransactionContext {
    fn default() -> Self {
        Self {
            hash: Hash::ZERO,
            index: 0,
            timestamp: 0,
            nonce: U256::zero(),
            origin: Address::account([0u8; 20]),
            block_height: 0,
            block_timestamp: 0,
        }
    }
}

// =============================================================================
// EXECUTION CONTEXT
// =============================================================================

/// State of one method invocation.
///
/// Created on method entry (including nested calls) and dropped on return or
/// revert, which makes the caller's context active again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Immediate caller.
    pub caller: Address,
    /// Transaction signer.
    pub origin: Address,
    /// Contract being executed.
    pub address: Address,
    /// Account that deployed the contract.
    pub owner: Address,
    /// Value attached to this call.
    pub value: U256,
    /// Method being executed.
    pub method: String,
    /// Whether state-mutating operations are forbidden.
    pub read_only: bool,
    /// 1 for the top-level invocation.
    pub depth: u16,
}

impl ExecutionContext {
    /// Creates a child context for a nested call from this one.
    ///
    /// The child is read-only if either the parent or the target method is.
    #[must_use]
    pub fn child_call(
        &self,
        address: Address,
        owner: Address,
        value: U256,
        method: &str,
        method_read_only: bool,
    ) -> Self {
        Self {
            caller: self.address,
            origin: self.origin,
            address,
            owner,
            value,
            method: method.to_owned(),
            read_only: self.read_only || method_read_only,
            depth: self.depth.saturating_add(1),
        }
    }
}

// =============================================================================
// METHOD SIGNATURE
// =============================================================================

/// Declaration of one externally callable guest method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    /// Method name, unique within its contract.
    pub name: String,
    /// Ordered parameters.
    pub params: Vec<ParamSpec>,
    /// Declared return kind.
    pub returns: ValueKind,
    /// Whether the return value may be `Null`.
    pub returns_optional: bool,
    /// Read-only methods cannot mutate state.
    pub read_only: bool,
    /// Payable methods accept attached value.
    pub payable: bool,
}

impl MethodSignature {
    /// A state-mutating, non-payable method returning `returns`.
    #[must_use]
    pub fn external(name: &str, params: Vec<ParamSpec>, returns: ValueKind) -> Self {
        Self {
            name: name.to_owned(),
            params,
            returns,
            returns_optional: returns.is_nullable(),
            read_only: false,
            payable: false,
        }
    }

    /// Marks the method read-only.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Marks the method payable.
    #[must_use]
    pub fn payable(mut self) -> Self {
        self.payable = true;
        self
    }

    /// Returns true if `value` is an acceptable return for this method.
    #[must_use]
    pub fn accepts_return(&self, value: &TypedValue) -> bool {
        value.conforms_to(self.returns, self.returns_optional)
    }

    /// Returns true if the declaration is internally consistent: no optional
    /// primitive parameters, and read-only methods are not payable.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.params
            .iter()
            .all(|p| !p.optional || p.kind.is_nullable())
            && !(self.read_only && self.payable)
            && self.params.iter().all(|p| p.kind != ValueKind::Void)
    }
}

// =============================================================================
// EVENT LOG ENTRY
// =============================================================================

/// Event emitted through `logEvent`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Emitting contract.
    pub address: Address,
    /// Indexed fields.
    pub indexed: Vec<TypedValue>,
    /// Non-indexed fields.
    pub data: Vec<TypedValue>,
}

// =============================================================================
// STORAGE HANDLE
// =============================================================================

/// Handle to a contract-scoped key/value store.
///
/// Identity is `(contract, id)`; the handle stays valid for as long as the
/// contract is deployed, independent of any one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnyDb {
    /// Owning contract.
    pub contract: Address,
    /// Store identifier within the contract.
    pub id: String,
    /// Kind of the stored values.
    pub value_kind: ValueKind,
}

// =============================================================================
// STATE CHANGE
// =============================================================================

/// State change produced by a committed transaction.
///
/// Collected during execution and applied atomically on success. On revert,
/// all changes are discarded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateChange {
    /// New balance of an account.
    Balance {
        /// Account.
        address: Address,
        /// Balance after the transaction.
        balance: U256,
    },
    /// Write (`Some`) or delete (`None`) of a storage slot.
    Storage {
        /// Digest of the storage key.
        key: Hash,
        /// Encoded value.
        value: Option<WireValue>,
    },
}

/// Committed value a transaction observed before its first write.
///
/// Handed to the backend with the transaction's changes so that the commit
/// can be refused when another transaction changed the value in between.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateRead {
    /// Balance as first read.
    Balance {
        /// Account.
        address: Address,
        /// Observed balance.
        balance: U256,
    },
    /// Storage slot as first read (`None` if it was empty).
    Storage {
        /// Digest of the storage key.
        key: Hash,
        /// Observed value.
        value: Option<WireValue>,
    },
}

// =============================================================================
// INVOCATION REQUEST / RESULT
// =============================================================================

/// Invocation delivered by the transport layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Caller of the top-level method (usually the transaction origin).
    pub from: Address,
    /// Target contract.
    pub to: Address,
    /// Method name.
    pub method: String,
    /// Wire-encoded arguments.
    pub args: Vec<WireValue>,
    /// Value attached to the call.
    pub value: U256,
    /// Resource budget requested for the invocation.
    pub budget: u64,
    /// Query mode: only read-only methods may be invoked.
    pub read_only: bool,
}

/// How an invocation ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Method returned normally.
    Success {
        /// Encoded return value.
        value: WireValue,
    },
    /// Invocation reverted; no state change or event survives.
    Reverted {
        /// Status code.
        code: u32,
        /// Optional diagnostic.
        message: Option<String>,
    },
}

/// Result reported back to the transport layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResult {
    /// Return value or revert.
    pub outcome: Outcome,
    /// Events emitted, in emission order; empty on revert.
    pub events: Vec<EventLogEntry>,
    /// Budget consumed.
    pub budget_used: u64,
    /// Budget left.
    pub budget_remaining: u64,
}

impl InvocationResult {
    /// Returns true for a normal return.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    /// Status code: zero on success.
    #[must_use]
    pub fn status(&self) -> u32 {
        match &self.outcome {
            Outcome::Success { .. } => crate::errors::status::SUCCESS,
            Outcome::Reverted { code, .. } => *code,
        }
    }

    /// Encoded return value on success.
    #[must_use]
    pub fn return_value(&self) -> Option<&WireValue> {
        match &self.outcome {
            Outcome::Success { value } => Some(value),
            Outcome::Reverted { .. } => None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
