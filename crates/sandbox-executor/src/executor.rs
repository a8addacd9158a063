//! # Executor
//!
//! Synchronous entry point for one top-level invocation:
//!
//! 1. Acquire an instrumentation (released on every exit path)
//! 2. Resolve contract and method, check payability and query mode
//! 3. Decode arguments through the codec
//! 4. Run the method against the host runtime
//! 5. Commit state on success; discard state and events on revert
//!
//! Invocations run concurrently without holding state locks. A commit whose
//! observed values were changed by another transaction in the meantime is
//! refused by the backend, and the invocation is executed again from the
//! start, up to `max_commit_attempts` times.

use crate::codec;
use crate::config::AvmConfiguration;
use crate::deploy::{ContentNegotiator, ContentType};
use crate::domain::entities::{
    ExecutionContext, InvocationRequest, InvocationResult, Outcome, TransactionContext,
};
use crate::domain::services::derive_contract_address;
use crate::domain::typed_value::TypedValue;
use crate::domain::value_objects::Address;
use crate::errors::{DeployError, HostError, StateError};
use crate::ports::inbound::Contract;
use crate::ports::outbound::StateAccess;
use crate::runtime::{
    CommonInstrumentationFactory, EventLog, InstrumentationFactory, InstrumentationGuard, Runtime,
    StateJournal,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

// =============================================================================
// CONTRACT REGISTRY
// =============================================================================

/// A contract as registered at its address.
#[derive(Clone)]
pub struct DeployedContract {
    /// Deployer.
    pub owner: Address,
    /// Content type it was deployed from.
    pub content_type: ContentType,
    /// Loaded guest code.
    pub code: Arc<dyn Contract>,
}

/// Deployed contracts by address.
#[derive(Default)]
pub struct ContractRegistry {
    contracts: RwLock<HashMap<Address, DeployedContract>>,
}

impl ContractRegistry {
    /// Looks up a contract. The lock is released before the caller runs it.
    #[must_use]
    pub fn get(&self, address: &Address) -> Option<DeployedContract> {
        self.contracts.read().get(address).cloned()
    }

    /// Returns true if a contract is registered at `address`.
    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.contracts.read().contains_key(address)
    }

    /// Number of registered contracts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contracts.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.read().is_empty()
    }

    /// Registers `contract` at `address`.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the address is taken.
    pub fn register(&self, address: Address, contract: DeployedContract) -> Result<(), DeployError> {
        let mut contracts = self.contracts.write();
        if contracts.contains_key(&address) {
            return Err(DeployError::AlreadyExists(address));
        }
        contracts.insert(address, contract);
        Ok(())
    }
}

// =============================================================================
// EXECUTOR
// =============================================================================

/// Result of executing an invocation once.
enum Attempt {
    /// Committed, or reverted for a reason re-execution cannot change.
    Finished(InvocationResult),
    /// The backend refused the commit because an observed value went stale.
    Conflict(InvocationResult),
}

/// Runs invocations and deployments against a state backend.
pub struct AvmExecutor {
    config: AvmConfiguration,
    factory: Arc<dyn InstrumentationFactory>,
    registry: ContractRegistry,
    negotiator: ContentNegotiator,
    state: Arc<dyn StateAccess>,
}

impl AvmExecutor {
    /// Creates an executor with the production instrumentation factory.
    #[must_use]
    pub fn new(
        config: AvmConfiguration,
        state: Arc<dyn StateAccess>,
        negotiator: ContentNegotiator,
    ) -> Self {
        Self::with_factory(
            config,
            state,
            negotiator,
            Arc::new(CommonInstrumentationFactory::new()),
        )
    }

    /// Creates an executor with a caller-supplied instrumentation factory.
    #[must_use]
    pub fn with_factory(
        config: AvmConfiguration,
        state: Arc<dyn StateAccess>,
        negotiator: ContentNegotiator,
        factory: Arc<dyn InstrumentationFactory>,
    ) -> Self {
        Self {
            config,
            factory,
            registry: ContractRegistry::default(),
            negotiator,
            state,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &AvmConfiguration {
        &self.config
    }

    /// Deployed contracts.
    #[must_use]
    pub fn registry(&self) -> &ContractRegistry {
        &self.registry
    }

    // -------------------------------------------------------------------------
    // Deployment
    // -------------------------------------------------------------------------

    /// Deploys `payload` and returns the new contract's address.
    ///
    /// The address is derived from `owner` and `salt`.
    ///
    /// # Errors
    ///
    /// - `UnsupportedContentType` (wrapped) for an unknown content type
    /// - `InvalidPackage` if the loader rejects the payload or a method
    ///   declaration is inconsistent
    /// - `AlreadyExists` if the derived address is taken
    pub fn deploy(
        &self,
        owner: Address,
        content_type: &str,
        payload: &[u8],
        salt: &[u8],
    ) -> Result<Address, DeployError> {
        let (content_type, loader) = self.negotiator.negotiate(content_type)?;
        let code = loader.load(payload)?;
        self.install(owner, content_type, salt, code)
    }

    /// Registers already-loaded guest code.
    ///
    /// # Errors
    ///
    /// As [`deploy`](Self::deploy), minus content negotiation.
    pub fn install(
        &self,
        owner: Address,
        content_type: ContentType,
        salt: &[u8],
        code: Arc<dyn Contract>,
    ) -> Result<Address, DeployError> {
        if let Some(bad) = code.methods().iter().find(|m| !m.is_well_formed()) {
            return Err(DeployError::InvalidPackage(format!(
                "inconsistent declaration of {}",
                bad.name
            )));
        }

        let address = derive_contract_address(&owner, salt);
        self.registry.register(
            address,
            DeployedContract {
                owner,
                content_type,
                code,
            },
        )?;
        info!(%address, %owner, content_type = content_type.as_str(), "contract deployed");
        Ok(address)
    }

    // -------------------------------------------------------------------------
    // Invocation
    // -------------------------------------------------------------------------

    /// Runs one top-level invocation to completion.
    ///
    /// Never fails: every failure becomes a reverted [`InvocationResult`].
    pub fn run(&self, tx: &TransactionContext, request: InvocationRequest) -> InvocationResult {
        let mut attempt = 1;
        loop {
            match self.execute_once(tx, &request) {
                Attempt::Finished(result) => return result,
                Attempt::Conflict(result) if attempt >= self.config.max_commit_attempts => {
                    warn!(
                        to = %request.to,
                        method = %request.method,
                        attempts = attempt,
                        "commit conflicts exhausted"
                    );
                    return result;
                }
                Attempt::Conflict(_) => {
                    debug!(
                        to = %request.to,
                        method = %request.method,
                        attempt,
                        "commit conflict, executing again"
                    );
                    attempt += 1;
                }
            }
        }
    }

    fn execute_once(&self, tx: &TransactionContext, request: &InvocationRequest) -> Attempt {
        let mut guard = InstrumentationGuard::acquire(self.factory.as_ref(), &self.config);
        guard.limit_budget(request.budget);

        let mut journal = StateJournal::new(Arc::clone(&self.state));
        let mut events = EventLog::default();

        let outcome = {
            let mut rt = Runtime::new(
                tx,
                &self.config,
                &mut guard,
                &mut journal,
                &mut events,
                &self.registry,
            );
            let result = self.dispatch(&mut rt, tx, request);
            match rt.take_fatal() {
                Some(fatal) => Err(fatal),
                None => result,
            }
        };

        let budget_used = guard.budget().used();
        let budget_remaining = guard.budget().remaining();

        let committed = outcome.and_then(|value| {
            let (reads, changes) = journal.into_parts();
            self.state.apply(&reads, changes)?;
            Ok(value)
        });
        let conflicted = matches!(committed, Err(HostError::State(StateError::Conflict(_))));

        let result = match committed {
            Ok(value) => {
                debug!(
                    to = %request.to,
                    method = %request.method,
                    budget_used,
                    events = events.len(),
                    "invocation succeeded"
                );
                InvocationResult {
                    outcome: Outcome::Success {
                        value: codec::encode(&value),
                    },
                    events: events.into_entries(),
                    budget_used,
                    budget_remaining,
                }
            }
            Err(err) => {
                warn!(
                    to = %request.to,
                    method = %request.method,
                    status = err.status(),
                    error = %err,
                    "invocation reverted"
                );
                InvocationResult {
                    outcome: Outcome::Reverted {
                        code: err.status(),
                        message: err.message(),
                    },
                    events: Vec::new(),
                    budget_used,
                    budget_remaining,
                }
            }
        };

        if conflicted {
            Attempt::Conflict(result)
        } else {
            Attempt::Finished(result)
        }
    }

    fn dispatch(
        &self,
        rt: &mut Runtime<'_>,
        tx: &TransactionContext,
        request: &InvocationRequest,
    ) -> Result<TypedValue, HostError> {
        let deployed = self
            .registry
            .get(&request.to)
            .ok_or(HostError::ContractNotFound(request.to))?;
        let signature = deployed
            .code
            .method(&request.method)
            .cloned()
            .ok_or_else(|| HostError::MethodNotFound(request.method.clone()))?;

        if !request.value.is_zero() && !signature.payable {
            return Err(HostError::NotPayable {
                method: request.method.clone(),
            });
        }
        if request.read_only && !signature.read_only {
            return Err(HostError::ReadOnlyViolation {
                operation: "invoke",
            });
        }

        let args = codec::decode_arguments(&signature.params, &request.args)?;
        let frame = ExecutionContext {
            caller: request.from,
            origin: tx.origin,
            address: request.to,
            owner: deployed.owner,
            value: request.value,
            method: request.method.clone(),
            read_only: request.read_only || signature.read_only,
            depth: 1,
        };
        rt.run_frame(frame, &deployed, &signature, &args)
    }
}

// =============================================================================
// TESTS
// =============================================================================
