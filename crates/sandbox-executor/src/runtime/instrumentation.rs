//! # Execution Context Lifecycle
//!
//! An [`Instrumentation`] is the per-invocation execution state: the stack of
//! active [`ExecutionContext`]s and the shared resource budget. Factories
//! create and destroy them; [`InstrumentationGuard`] ties destruction to scope
//! so it happens on every exit path, including reverts and panics.

use crate::config::AvmConfiguration;
use crate::domain::entities::ExecutionContext;
use crate::domain::invariants::limits;
use crate::domain::value_objects::ResourceBudget;
use crate::errors::HostError;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::debug;

// =============================================================================
// INSTRUMENTATION
// =============================================================================

/// Execution state bound to one logical thread of execution.
#[derive(Debug)]
pub struct Instrumentation {
    id: u64,
    frames: Vec<ExecutionContext>,
    budget: ResourceBudget,
    budget_ceiling: u64,
    max_call_depth: u16,
    live: bool,
}

impl Instrumentation {
    fn new(id: u64, config: &AvmConfiguration) -> Self {
        Self {
            id,
            frames: Vec::new(),
            budget: ResourceBudget::new(config.budget_ceiling),
            budget_ceiling: config.budget_ceiling,
            max_call_depth: config.max_call_depth.min(limits::MAX_SUPPORTED_CALL_DEPTH),
            live: true,
        }
    }

    /// Identifier assigned by the factory.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns false once destroyed.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Restricts the budget to `limit`, capped at the configured ceiling.
    ///
    /// Called once, before the first frame is entered.
    pub fn limit_budget(&mut self, limit: u64) {
        self.budget = ResourceBudget::new(limit.min(self.budget_ceiling));
    }

    /// Shared budget.
    #[must_use]
    pub fn budget(&self) -> &ResourceBudget {
        &self.budget
    }

    /// Charges the shared budget.
    ///
    /// # Errors
    ///
    /// `OutOfBudget` once exhausted.
    pub fn charge(&mut self, amount: u64) -> Result<(), HostError> {
        self.budget.charge(amount)
    }

    /// The active context, if any.
    #[must_use]
    pub fn current(&self) -> Option<&ExecutionContext> {
        self.frames.last()
    }

    /// Number of active contexts.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Checks that one more frame fits on the stack.
    ///
    /// # Errors
    ///
    /// `CallDepthExceeded` if the stack already holds `max_call_depth` frames.
    pub fn check_depth(&self) -> Result<(), HostError> {
        if self.frames.len() >= usize::from(self.max_call_depth) {
            let depth = u16::try_from(self.frames.len() + 1).unwrap_or(u16::MAX);
            return Err(HostError::CallDepthExceeded {
                depth,
                max: self.max_call_depth,
            });
        }
        Ok(())
    }

    /// Makes `frame` the active context.
    ///
    /// # Errors
    ///
    /// As [`check_depth`](Self::check_depth).
    pub fn enter(&mut self, frame: ExecutionContext) -> Result<(), HostError> {
        self.check_depth()?;
        debug!(
            instrumentation = self.id,
            depth = frame.depth,
            contract = %frame.address,
            method = %frame.method,
            "enter"
        );
        self.frames.push(frame);
        Ok(())
    }

    /// Pops the active context, making its caller active again.
    pub fn exit(&mut self) -> Option<ExecutionContext> {
        let frame = self.frames.pop();
        if let Some(frame) = &frame {
            debug!(instrumentation = self.id, depth = frame.depth, "exit");
        }
        frame
    }
}

// =============================================================================
// FACTORY
// =============================================================================

/// Creates and releases execution state.
pub trait InstrumentationFactory: Send + Sync {
    /// Creates fresh execution state configured by `config`. Never fails.
    fn create_instrumentation(&self, config: &AvmConfiguration) -> Instrumentation;

    /// Releases execution state. Calling it again on the same value is a no-op.
    fn destroy_instrumentation(&self, instrumentation: &mut Instrumentation);
}

/// Production factory; counts live instances.
#[derive(Debug, Default)]
pub struct CommonInstrumentationFactory {
    next_id: AtomicU64,
    live: AtomicUsize,
}

impl CommonInstrumentationFactory {
    /// Creates a factory with no live instances.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of created but not yet destroyed instances.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl InstrumentationFactory for CommonInstrumentationFactory {
    fn create_instrumentation(&self, config: &AvmConfiguration) -> Instrumentation {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.live.fetch_add(1, Ordering::SeqCst);
        debug!(instrumentation = id, "instrumentation created");
        Instrumentation::new(id, config)
    }

    fn destroy_instrumentation(&self, instrumentation: &mut Instrumentation) {
        if !instrumentation.live {
            return;
        }
        instrumentation.live = false;
        instrumentation.frames.clear();
        self.live.fetch_sub(1, Ordering::SeqCst);
        debug!(
            instrumentation = instrumentation.id,
            budget_used = instrumentation.budget.used(),
            "instrumentation destroyed"
        );
    }
}

// =============================================================================
// SCOPED GUARD
// =============================================================================

/// Owns an [`Instrumentation`] and destroys it when dropped.
pub struct InstrumentationGuard<'f> {
    factory: &'f dyn InstrumentationFactory,
    instrumentation: Instrumentation,
}

impl<'f> InstrumentationGuard<'f> {
    /// Creates execution state through `factory`.
    #[must_use]
    pub fn acquire(factory: &'f dyn InstrumentationFactory, config: &AvmConfiguration) -> Self {
        Self {
            factory,
            instrumentation: factory.create_instrumentation(config),
        }
    }
}

impl Deref for InstrumentationGuard<'_> {
    type Target = Instrumentation;

    fn deref(&self) -> &Instrumentation {
        &self.instrumentation
    }
}

impl DerefMut for InstrumentationGuard<'_> {
    fn deref_mut(&mut self) -> &mut Instrumentation {
        &mut self.instrumentation
    }
}

impl Drop for InstrumentationGuard<'_> {
    fn drop(&mut self) {
        self.factory.destroy_instrumentation(&mut self.instrumentation);
    }
}

// =============================================================================
// TESTS
// =============================================================================
