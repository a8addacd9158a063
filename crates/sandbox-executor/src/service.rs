//! # Executor Service
//!
//! Async facade over [`AvmExecutor`]. Independent top-level invocations run
//! in parallel on the blocking pool, at most `parallelism` at a time; each
//! invocation, including its nested calls, runs to completion on one worker.

use crate::domain::entities::{InvocationRequest, InvocationResult, TransactionContext};
use crate::domain::invariants::check_all_invariants;
use crate::domain::value_objects::Address;
use crate::errors::{DeployError, ServiceError};
use crate::executor::AvmExecutor;
use crate::ports::inbound::ExecutorApi;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn, Span};
use uuid::Uuid;

/// Statistics for the executor service.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Invocations that reached the executor.
    pub invocations_executed: u64,
    /// Invocations that returned normally.
    pub successful_invocations: u64,
    /// Invocations that reverted.
    pub reverted_invocations: u64,
    /// Total budget consumed.
    pub total_budget_used: u64,
    /// Average execution time in microseconds.
    pub avg_execution_time_us: u64,
    /// Requests rejected before execution.
    pub rejected_requests: u64,
    /// Contracts deployed.
    pub deployments: u64,
}

/// The executor service.
pub struct ExecutorService {
    executor: Arc<AvmExecutor>,
    permits: Arc<Semaphore>,
    stats: Arc<RwLock<ServiceStats>>,
}

impl ExecutorService {
    /// Wraps `executor`, allowing `config().parallelism` concurrent invocations.
    #[must_use]
    pub fn new(executor: AvmExecutor) -> Self {
        let parallelism = executor.config().parallelism.max(1);
        Self {
            executor: Arc::new(executor),
            permits: Arc::new(Semaphore::new(parallelism)),
            stats: Arc::new(RwLock::new(ServiceStats::default())),
        }
    }

    /// Underlying executor.
    #[must_use]
    pub fn executor(&self) -> &Arc<AvmExecutor> {
        &self.executor
    }

    /// Stops admitting requests. Invocations already running finish normally.
    pub fn shutdown(&self) {
        info!("executor service shutting down");
        self.permits.close();
    }

    /// Runs one invocation under the given correlation id.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for a zero budget, `Shutdown` after [`shutdown`](Self::shutdown),
    /// `Worker` if the worker panicked.
    #[instrument(skip(self, tx, request), fields(correlation_id = %correlation_id))]
    pub async fn handle_invocation(
        &self,
        correlation_id: Uuid,
        tx: TransactionContext,
        request: InvocationRequest,
    ) -> Result<InvocationResult, ServiceError> {
        info!(
            to = %request.to,
            method = %request.method,
            read_only = request.read_only,
            "processing invocation"
        );
        self.validate(&request).await?;

        let permit = self.acquire().await?;
        let start = Instant::now();
        let result = self.spawn_run(permit, tx, request).await;
        self.record(&result, start).await;
        result
    }

    async fn validate(&self, request: &InvocationRequest) -> Result<(), ServiceError> {
        if request.budget == 0 {
            warn!(to = %request.to, "rejected request with zero budget");
            self.stats.write().await.rejected_requests += 1;
            return Err(ServiceError::InvalidRequest("budget must be positive".into()));
        }
        Ok(())
    }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit, ServiceError> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ServiceError::Shutdown)
    }

    /// Runs the invocation on the blocking pool, holding `permit` until done.
    fn spawn_run(
        &self,
        permit: OwnedSemaphorePermit,
        tx: TransactionContext,
        request: InvocationRequest,
    ) -> impl std::future::Future<Output = Result<InvocationResult, ServiceError>> {
        let executor = Arc::clone(&self.executor);
        let span = Span::current();
        let handle: JoinHandle<InvocationResult> = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            span.in_scope(|| {
                let limit = request.budget.min(executor.config().budget_ceiling);
                let result = executor.run(&tx, request);
                let check = check_all_invariants(&result, limit);
                if !check.is_valid() {
                    error!(?check, "invocation result violates invariants");
                }
                result
            })
        });
        async move { handle.await.map_err(|e| ServiceError::Worker(e.to_string())) }
    }

    async fn record(&self, result: &Result<InvocationResult, ServiceError>, start: Instant) {
        let elapsed_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        let mut stats = self.stats.write().await;
        match result {
            Ok(res) => {
                stats.invocations_executed += 1;
                stats.total_budget_used = stats.total_budget_used.saturating_add(res.budget_used);
                if res.is_success() {
                    stats.successful_invocations += 1;
                } else {
                    stats.reverted_invocations += 1;
                }
                stats.avg_execution_time_us = running_average(
                    stats.avg_execution_time_us,
                    stats.invocations_executed,
                    elapsed_us,
                );
                debug!(
                    status = res.status(),
                    budget_used = res.budget_used,
                    events = res.events.len(),
                    "invocation completed"
                );
            }
            Err(err) => {
                error!(error = %err, "invocation failed in service");
            }
        }
    }
}

/// Mean of `count` samples, given the mean of the first `count - 1`.
fn running_average(average: u64, count: u64, sample: u64) -> u64 {
    if count == 0 {
        return sample;
    }
    let total = u128::from(average) * u128::from(count - 1) + u128::from(sample);
    u64::try_from(total / u128::from(count)).unwrap_or(u64::MAX)
}

#[async_trait]
impl ExecutorApi for ExecutorService {
    async fn execute(
        &self,
        tx: TransactionContext,
        request: InvocationRequest,
    ) -> Result<InvocationResult, ServiceError> {
        self.handle_invocation(Uuid::new_v4(), tx, request).await
    }

    async fn execute_batch(
        &self,
        batch: Vec<(TransactionContext, InvocationRequest)>,
    ) -> Vec<Result<InvocationResult, ServiceError>> {
        let batch_id = Uuid::new_v4();
        info!(%batch_id, size = batch.len(), "processing batch");

        let mut pending = Vec::with_capacity(batch.len());
        for (tx, request) in batch {
            let admitted = match self.validate(&request).await {
                Ok(()) => self.acquire().await,
                Err(err) => Err(err),
            };
            pending.push(match admitted {
                Ok(permit) => Ok((Instant::now(), self.spawn_run(permit, tx, request))),
                Err(err) => Err(err),
            });
        }

        let mut results = Vec::with_capacity(pending.len());
        for entry in pending {
            let result = match entry {
                Ok((start, run)) => {
                    let result = run.await;
                    self.record(&result, start).await;
                    result
                }
                Err(err) => Err(err),
            };
            results.push(result);
        }
        results
    }

    async fn deploy(
        &self,
        owner: Address,
        content_type: &str,
        payload: Vec<u8>,
        salt: Vec<u8>,
    ) -> Result<Address, DeployError> {
        let address = self.executor.deploy(owner, content_type, &payload, &salt)?;
        self.stats.write().await.deployments += 1;
        Ok(address)
    }

    async fn stats(&self) -> ServiceStats {
        self.stats.read().await.clone()
    }
}

// =============================================================================
// TESTS
// =============================================================================
