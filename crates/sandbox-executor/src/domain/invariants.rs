//! # Domain Invariants
//!
//! Properties every invocation result must satisfy before it is handed back
//! to the transport layer.
//!
//! - Budget: consumption never exceeds the limit and is fully accounted for
//! - Revert: a reverted invocation exposes no events

use crate::domain::entities::{InvocationResult, Outcome};
use crate::errors::status;

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// Budget consumption cannot exceed the limit, and `used + remaining` must
/// equal it.
#[must_use]
pub fn check_budget_invariant(result: &InvocationResult, budget_limit: u64) -> bool {
    result.budget_used <= budget_limit
        && result.budget_used.checked_add(result.budget_remaining) == Some(budget_limit)
}

/// A reverted invocation carries no events, and never the success code.
#[must_use]
pub fn check_revert_invariant(result: &InvocationResult) -> bool {
    match &result.outcome {
        Outcome::Success { .. } => true,
        Outcome::Reverted { code, .. } => result.events.is_empty() && *code != status::SUCCESS,
    }
}

/// Checks every result invariant at once.
#[must_use]
pub fn check_all_invariants(result: &InvocationResult, budget_limit: u64) -> InvariantCheckResult {
    let mut violations = Vec::new();

    if !check_budget_invariant(result, budget_limit) {
        violations.push(InvariantViolation::BudgetExceeded {
            used: result.budget_used,
            limit: budget_limit,
        });
    }

    if !check_revert_invariant(result) {
        violations.push(InvariantViolation::EventsNotDiscarded {
            events: result.events.len(),
        });
    }

    if violations.is_empty() {
        InvariantCheckResult::Valid
    } else {
        InvariantCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    /// Returns true if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Budget accounting is inconsistent with the limit.
    BudgetExceeded {
        /// Reported consumption.
        used: u64,
        /// Budget limit.
        limit: u64,
    },
    /// A reverted result still carries events, or reports success.
    EventsNotDiscarded {
        /// Number of events present.
        events: usize,
    },
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BudgetExceeded { used, limit } => {
                write!(f, "budget accounting broken: used {used}, limit {limit}")
            }
            Self::EventsNotDiscarded { events } => {
                write!(f, "reverted result carries {events} events")
            }
        }
    }
}

// =============================================================================
// LIMITS
// =============================================================================

/// Default host policy values.
pub mod limits {
    /// Default resource budget ceiling per top-level transaction.
    pub const DEFAULT_BUDGET_CEILING: u64 = 2_500_000_000;

    /// Default maximum call depth, counting the top-level invocation.
    pub const DEFAULT_MAX_CALL_DEPTH: u16 = 64;

    /// Deepest call nesting the host thread stack can carry. Each guest frame
    /// recurses natively, so larger configured depths are rejected.
    pub const MAX_SUPPORTED_CALL_DEPTH: u16 = 128;

    /// Default number of times a transaction is re-executed after its reads
    /// went stale before commit.
    pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 8;

    /// Default maximum number of indexed fields per event.
    pub const DEFAULT_MAX_INDEXED_FIELDS: usize = 4;
}

// =============================================================================
// TESTS
// =============================================================================
