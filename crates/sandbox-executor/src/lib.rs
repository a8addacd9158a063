//! # Sandbox Executor
//!
//! Runs untrusted guest contracts behind a host-controlled runtime that meters
//! resource use, mediates every access to blockchain state, and marshals typed
//! values across the host/guest boundary.
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Type codec | `codec.rs` | `TypedValue` <-> `WireValue`, optional/null rules |
//! | Host services | `runtime/mod.rs` | `BlockchainRuntime`, the guest's only capability surface |
//! | Lifecycle | `runtime/instrumentation.rs` | per-invocation context creation and scoped teardown |
//! | Journal | `runtime/journal.rs` | checkpointed state overlay and event log |
//! | Executor | `executor.rs` | dispatch, argument decoding, commit or revert |
//! | Deployment | `deploy.rs` | content-type negotiation and loader routing |
//! | Service | `service.rs` | async facade, parallel independent transactions |
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Null only for optional reference kinds | `codec::decode` |
//! | Read-only contexts never mutate | `Runtime::ensure_writable`, query-mode check in `AvmExecutor::dispatch` |
//! | Failed frames leave no state or events | `Runtime::run_frame` checkpoints |
//! | Budget never refunded, exhaustion is fatal | `ResourceBudget::charge`, `Runtime::take_fatal` |
//! | Call depth bounded | `Instrumentation::enter` |
//!
//! ## Usage Example
//!
//! ```ignore
//! use sandbox_executor::prelude::*;
//!
//! let executor = AvmExecutor::new(AvmConfiguration::from_env(), state, negotiator);
//! let address = executor.deploy(owner, "application/java", &package, b"salt")?;
//!
//! let result = executor.run(&tx, InvocationRequest {
//!     from: owner,
//!     to: address,
//!     method: "transfer".into(),
//!     args: encode_all(&[TypedValue::Address(bob), TypedValue::BigInteger(100.into())]),
//!     value: U256::zero(),
//!     budget: 1_000_000,
//!     read_only: false,
//! });
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod codec;
pub mod config;
pub mod deploy;
pub mod domain;
pub mod errors;
pub mod executor;
pub mod ports;
pub mod runtime;
pub mod service;
pub mod telemetry;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        AnyDb, EventLogEntry, ExecutionContext, InvocationRequest, InvocationResult,
        MethodSignature, Outcome, StateChange, StateRead, TransactionContext,
    };

    // Typed values
    pub use crate::domain::typed_value::{ParamSpec, TypedValue, ValueKind};

    // Value objects
    pub use crate::domain::value_objects::{Address, BigInt, Hash, ResourceBudget, U256};

    // Invariants
    pub use crate::domain::invariants::{
        check_all_invariants, limits, InvariantCheckResult, InvariantViolation,
    };

    // Codec
    pub use crate::codec::{decode, decode_any, decode_arguments, encode, encode_all, WireValue};

    // Configuration
    pub use crate::config::{AvmConfiguration, StepCosts};

    // Runtime
    pub use crate::runtime::{
        BlockchainRuntime, CommonInstrumentationFactory, InstrumentationFactory,
    };

    // Ports
    pub use crate::ports::inbound::{Contract, ExecutorApi};
    pub use crate::ports::outbound::{ContentLoader, StateAccess};

    // Errors
    pub use crate::errors::{status, CodecError, DeployError, HostError, ServiceError, StateError};

    // Executor and deployment
    pub use crate::deploy::{ContentNegotiator, ContentType};
    pub use crate::executor::AvmExecutor;

    // Adapters
    pub use crate::adapters::{HashedContentLoader, InMemoryState};

    // Service
    pub use crate::service::{ExecutorService, ServiceStats};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================
