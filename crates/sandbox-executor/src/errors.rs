//! # Error Types
//!
//! All error types for sandboxed contract execution.
//!
//! Every failure a guest can observe is a [`HostError`]. Each variant maps to a
//! numeric status code reported in the invocation result (see [`status`]).

use crate::domain::typed_value::ValueKind;
use crate::domain::value_objects::{Address, U256};
use thiserror::Error;

// =============================================================================
// STATUS CODES
// =============================================================================

/// Numeric status codes reported in invocation results.
pub mod status {
    /// Invocation completed normally.
    pub const SUCCESS: u32 = 0;
    /// Failure without a more specific code (require, bad return value).
    pub const UNKNOWN_FAILURE: u32 = 1;
    /// Target address holds no deployed contract.
    pub const CONTRACT_NOT_FOUND: u32 = 2;
    /// Target contract does not expose the method.
    pub const METHOD_NOT_FOUND: u32 = 3;
    /// Value attached to a non-payable method.
    pub const METHOD_NOT_PAYABLE: u32 = 4;
    /// Malformed input outside of argument decoding.
    pub const ILLEGAL_FORMAT: u32 = 5;
    /// Argument decoding failed.
    pub const INVALID_PARAMETER: u32 = 6;
    /// Mutating operation attempted in a read-only context.
    pub const ACCESS_DENIED: u32 = 9;
    /// Resource budget exhausted.
    pub const OUT_OF_STEP: u32 = 10;
    /// Balance too low for a value transfer.
    pub const OUT_OF_BALANCE: u32 = 11;
    /// Maximum call depth exceeded.
    pub const STACK_OVERFLOW: u32 = 13;
    /// Base for guest-defined revert codes (`USER_REVERTED + code`).
    pub const USER_REVERTED: u32 = 32;
}

// =============================================================================
// CODEC ERRORS
// =============================================================================

/// Errors raised by the type codec at the invocation boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The wire value's kind does not match the declared kind.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Declared kind of the slot.
        expected: ValueKind,
        /// Description of what was on the wire.
        found: String,
    },

    /// The wire tag matched but the payload is not a valid encoding.
    #[error("malformed {kind} payload: {reason}")]
    Malformed {
        /// Declared kind of the slot.
        kind: ValueKind,
        /// What was wrong with the payload.
        reason: String,
    },

    /// Too many arguments, or a required argument was missing.
    #[error("argument count mismatch: expected {expected}, got {got}")]
    Arity {
        /// Number of declared parameters.
        expected: usize,
        /// Number of supplied arguments.
        got: usize,
    },
}

// =============================================================================
// STATE ERRORS
// =============================================================================

/// Errors from the external state backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// State read by the transaction changed before it could commit.
    #[error("commit conflict: {0}")]
    Conflict(String),

    /// Other state error.
    #[error("state error: {0}")]
    Other(String),
}

// =============================================================================
// HOST ERRORS
// =============================================================================

/// Errors surfaced through the host service interface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// Argument or value did not match its declared kind.
    #[error("type mismatch: {0}")]
    TypeMismatch(#[from] CodecError),

    /// A host operation was called with no active execution context.
    #[error("no active execution context")]
    NoContext,

    /// An address could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A nested call reverted or failed.
    #[error("call failed with status {code}: {}", message.as_deref().unwrap_or("-"))]
    CallFailure {
        /// Status code of the nested failure.
        code: u32,
        /// Message carried by the nested failure.
        message: Option<String>,
    },

    /// A recoverable signature was malformed.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// A public key could not be parsed.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// `logEvent` was given more indexed fields than the host allows.
    #[error("too many indexed fields: {count} > {max}")]
    TooManyIndexedFields {
        /// Number of indexed fields supplied.
        count: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Entering a nested call would exceed the configured depth.
    #[error("call depth exceeded: {depth} > {max}")]
    CallDepthExceeded {
        /// Depth the call would have reached.
        depth: u16,
        /// Configured maximum.
        max: u16,
    },

    /// Value was attached to a method not declared payable.
    #[error("method not payable: {method}")]
    NotPayable {
        /// Method name.
        method: String,
    },

    /// Deployment content type is not recognised.
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Explicit revert raised by guest code.
    #[error("reverted with code {code}: {}", message.as_deref().unwrap_or("-"))]
    Revert {
        /// Guest-defined revert code.
        code: u32,
        /// Optional message.
        message: Option<String>,
    },

    /// `require` was called with a false condition.
    #[error("require failed")]
    RequireFailed,

    /// A contract tried to write a storage handle owned by another contract.
    #[error("storage owned by {owner} is not writable from {writer}")]
    ForeignStorage {
        /// Contract owning the handle.
        owner: Address,
        /// Contract attempting the write.
        writer: Address,
    },

    /// A state-mutating operation was attempted in a read-only context.
    #[error("{operation} not permitted in read-only context")]
    ReadOnlyViolation {
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// The shared resource budget is exhausted.
    #[error("out of budget: requested {requested}, remaining {remaining}")]
    OutOfBudget {
        /// Amount the operation tried to charge.
        requested: u64,
        /// Amount left before the charge.
        remaining: u64,
    },

    /// No contract is deployed at the address.
    #[error("contract not found: {0}")]
    ContractNotFound(Address),

    /// The contract does not expose the method.
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// A transfer exceeds the sender's balance.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Amount to transfer.
        required: U256,
        /// Sender's balance.
        available: U256,
    },

    /// Crediting a transfer would overflow the recipient's balance.
    #[error("balance overflow crediting {0}")]
    BalanceOverflow(Address),

    /// A guest returned a value that does not conform to its declared return kind.
    #[error("invalid return value: expected {expected}")]
    InvalidReturn {
        /// Declared return kind.
        expected: ValueKind,
    },

    /// State backend failure.
    #[error("state error: {0}")]
    State(#[from] StateError),
}

impl HostError {
    /// Status code reported for this error.
    #[must_use]
    pub fn status(&self) -> u32 {
        match self {
            Self::TypeMismatch(_) => status::INVALID_PARAMETER,
            Self::InvalidAddress(_)
            | Self::InvalidSignature(_)
            | Self::InvalidPublicKey
            | Self::TooManyIndexedFields { .. }
            | Self::UnsupportedContentType(_) => status::ILLEGAL_FORMAT,
            Self::CallFailure { code, .. } => *code,
            Self::CallDepthExceeded { .. } => status::STACK_OVERFLOW,
            Self::NotPayable { .. } => status::METHOD_NOT_PAYABLE,
            Self::Revert { code, .. } => status::USER_REVERTED.saturating_add(*code),
            Self::ReadOnlyViolation { .. } | Self::ForeignStorage { .. } => status::ACCESS_DENIED,
            Self::OutOfBudget { .. } => status::OUT_OF_STEP,
            Self::ContractNotFound(_) => status::CONTRACT_NOT_FOUND,
            Self::MethodNotFound(_) => status::METHOD_NOT_FOUND,
            Self::InsufficientBalance { .. } => status::OUT_OF_BALANCE,
            Self::NoContext
            | Self::RequireFailed
            | Self::InvalidReturn { .. }
            | Self::BalanceOverflow(_)
            | Self::State(_) => status::UNKNOWN_FAILURE,
        }
    }

    /// Message reported alongside the status code.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Revert { message, .. } | Self::CallFailure { message, .. } => message.clone(),
            other => Some(other.to_string()),
        }
    }

    /// Returns true if this error aborts the whole top-level transaction.
    ///
    /// Fatal errors pass through nested call boundaries unwrapped.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OutOfBudget { .. } | Self::State(_))
    }

    /// Converts a nested-call failure into what the calling context observes.
    ///
    /// A depth overflow raised further down the stack arrives as a
    /// `CallFailure` with the stack overflow status.
    #[must_use]
    pub fn into_call_failure(self) -> Self {
        match self {
            fatal if fatal.is_fatal() => fatal,
            other => Self::CallFailure {
                code: other.status(),
                message: other.message(),
            },
        }
    }
}

// =============================================================================
// DEPLOY ERRORS
// =============================================================================

/// Errors raised by a content loader while interpreting a deployment payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeployError {
    /// The payload is not a valid package for its content type.
    #[error("invalid package: {0}")]
    InvalidPackage(String),

    /// A contract is already registered at the derived address.
    #[error("contract already exists at {0}")]
    AlreadyExists(Address),

    /// Content type negotiation failed.
    #[error(transparent)]
    Host(#[from] HostError),
}

// =============================================================================
// SERVICE ERRORS
// =============================================================================

/// Errors raised by the async service facade itself, never by guest code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The service was shut down while the request waited for a worker.
    #[error("executor service is shut down")]
    Shutdown,

    /// The blocking worker running the invocation panicked or was cancelled.
    #[error("worker failed: {0}")]
    Worker(String),

    /// The request asked for zero budget.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

// =============================================================================
// TESTS
// =============================================================================
