//! # Driving Ports (API - Inbound)
//!
//! - [`Contract`]: what a loaded guest program exposes to the executor
//! - [`ExecutorApi`]: what the transport layer calls to run invocations

use crate::domain::entities::{
    InvocationRequest, InvocationResult, MethodSignature, TransactionContext,
};
use crate::domain::typed_value::TypedValue;
use crate::domain::value_objects::Address;
use crate::errors::{DeployError, HostError, ServiceError};
use crate::runtime::BlockchainRuntime;
use crate::service::ServiceStats;
use async_trait::async_trait;

// =============================================================================
// GUEST CONTRACT
// =============================================================================

/// A loaded guest program.
///
/// Guests reach the host only through the `rt` handle passed to
/// [`invoke`](Contract::invoke); there is no ambient access to state.
pub trait Contract: Send + Sync {
    /// Externally callable methods.
    fn methods(&self) -> &[MethodSignature];

    /// Looks up a method declaration by name.
    fn method(&self, name: &str) -> Option<&MethodSignature> {
        self.methods().iter().find(|m| m.name == name)
    }

    /// Runs `method` with arguments already decoded against its declaration.
    ///
    /// # Errors
    ///
    /// Any [`HostError`]; the executor rolls back the invocation's effects.
    fn invoke(
        &self,
        rt: &mut dyn BlockchainRuntime,
        method: &str,
        args: &[TypedValue],
    ) -> Result<TypedValue, HostError>;
}

// =============================================================================
// EXECUTOR API
// =============================================================================

/// Primary API for running invocations.
///
/// ## Usage
///
/// ```ignore
/// let result = api.execute(tx, request).await?;
/// if result.is_success() {
///     println!("budget used: {}", result.budget_used);
/// }
/// ```
#[async_trait]
pub trait ExecutorApi: Send + Sync {
    /// Runs one top-level invocation.
    ///
    /// Guest failures are reported inside the [`InvocationResult`]; the error
    /// path is for failures of the service itself.
    async fn execute(
        &self,
        tx: TransactionContext,
        request: InvocationRequest,
    ) -> Result<InvocationResult, ServiceError>;

    /// Runs independent invocations in parallel, preserving input order in
    /// the output.
    async fn execute_batch(
        &self,
        batch: Vec<(TransactionContext, InvocationRequest)>,
    ) -> Vec<Result<InvocationResult, ServiceError>>;

    /// Deploys a package and returns the new contract address.
    async fn deploy(
        &self,
        owner: Address,
        content_type: &str,
        payload: Vec<u8>,
        salt: Vec<u8>,
    ) -> Result<Address, DeployError>;

    /// Current service statistics.
    async fn stats(&self) -> ServiceStats;
}
