//! # Executor Configuration
//!
//! Immutable options applied when an execution context is created.
//!
//! ## Environment Variables
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `AVM_BUDGET_CEILING` | `budget_ceiling` | 2 500 000 000 |
//! | `AVM_MAX_CALL_DEPTH` | `max_call_depth` | 64 |
//! | `AVM_MAX_INDEXED_FIELDS` | `max_indexed_fields` | 4 |
//! | `AVM_PARALLELISM` | `parallelism` | number of CPUs |
//! | `AVM_ENFORCE_READ_ONLY` | `enforce_read_only` | `true` |
//! | `AVM_MAX_COMMIT_ATTEMPTS` | `max_commit_attempts` | 8 |

use crate::domain::invariants::limits;
use std::env;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// STEP COSTS
// =============================================================================

/// Resource charged by each host operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepCosts {
    /// Transaction/block introspection and `getValue`.
    pub api_read: u64,
    /// `getBalance`.
    pub balance: u64,
    /// Entering a nested call (charged before the callee runs).
    pub call: u64,
    /// Storage read.
    pub storage_read: u64,
    /// Storage write, base.
    pub storage_write_base: u64,
    /// Storage write, per encoded byte.
    pub storage_write_per_byte: u64,
    /// `logEvent`, base.
    pub log_event_base: u64,
    /// `logEvent`, per encoded byte.
    pub log_event_per_byte: u64,
    /// Digest, base.
    pub hash_base: u64,
    /// Digest, per 32-byte word of input.
    pub hash_per_word: u64,
    /// `recoverKey`.
    pub recover_key: u64,
}

impl Default for StepCosts {
    fn default() -> Self {
        Self {
            api_read: 10,
            balance: 25,
            call: 1_000,
            storage_read: 25,
            storage_write_base: 100,
            storage_write_per_byte: 1,
            log_event_base: 100,
            log_event_per_byte: 1,
            hash_base: 60,
            hash_per_word: 12,
            recover_key: 3_000,
        }
    }
}

impl StepCosts {
    /// Cost of hashing `len` bytes.
    #[must_use]
    pub fn hash(&self, len: usize) -> u64 {
        let words = (len as u64).div_ceil(32);
        self.hash_base.saturating_add(self.hash_per_word.saturating_mul(words))
    }

    /// Cost of writing `len` encoded bytes.
    #[must_use]
    pub fn storage_write(&self, len: usize) -> u64 {
        self.storage_write_base
            .saturating_add(self.storage_write_per_byte.saturating_mul(len as u64))
    }

    /// Cost of logging `len` encoded bytes.
    #[must_use]
    pub fn log_event(&self, len: usize) -> u64 {
        self.log_event_base
            .saturating_add(self.log_event_per_byte.saturating_mul(len as u64))
    }
}

// =============================================================================
// AVM CONFIGURATION
// =============================================================================

/// Options recognised by the executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AvmConfiguration {
    /// Upper bound on the budget any single transaction may request.
    pub budget_ceiling: u64,
    /// Maximum call depth, counting the top-level invocation. At most
    /// [`limits::MAX_SUPPORTED_CALL_DEPTH`].
    pub max_call_depth: u16,
    /// Maximum indexed fields per event.
    pub max_indexed_fields: usize,
    /// Independent transactions processed in parallel.
    pub parallelism: usize,
    /// Reject mutating host operations in read-only contexts.
    pub enforce_read_only: bool,
    /// Executions of one transaction before a commit conflict is reported.
    pub max_commit_attempts: u32,
    /// Per-operation resource charges.
    pub step_costs: StepCosts,
}

impl Default for AvmConfiguration {
    fn default() -> Self {
        Self {
            budget_ceiling: limits::DEFAULT_BUDGET_CEILING,
            max_call_depth: limits::DEFAULT_MAX_CALL_DEPTH,
            max_indexed_fields: limits::DEFAULT_MAX_INDEXED_FIELDS,
            parallelism: num_cpus::get(),
            enforce_read_only: true,
            max_commit_attempts: limits::DEFAULT_MAX_COMMIT_ATTEMPTS,
            step_costs: StepCosts::default(),
        }
    }
}

impl AvmConfiguration {
    /// Loads configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            budget_ceiling: parsed(&lookup, "AVM_BUDGET_CEILING")
                .unwrap_or(defaults.budget_ceiling),
            max_call_depth: parsed(&lookup, "AVM_MAX_CALL_DEPTH")
                .unwrap_or(defaults.max_call_depth),
            max_indexed_fields: parsed(&lookup, "AVM_MAX_INDEXED_FIELDS")
                .unwrap_or(defaults.max_indexed_fields),
            parallelism: parsed(&lookup, "AVM_PARALLELISM").unwrap_or(defaults.parallelism),
            enforce_read_only: lookup("AVM_ENFORCE_READ_ONLY")
                .map_or(defaults.enforce_read_only, |v| {
                    v.to_lowercase() != "false" && v != "0"
                }),
            max_commit_attempts: parsed(&lookup, "AVM_MAX_COMMIT_ATTEMPTS")
                .unwrap_or(defaults.max_commit_attempts),
            step_costs: defaults.step_costs,
        }
    }

    /// Sets the maximum call depth.
    #[must_use]
    pub fn with_max_call_depth(mut self, depth: u16) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Sets the maximum number of indexed event fields.
    #[must_use]
    pub fn with_max_indexed_fields(mut self, max: usize) -> Self {
        self.max_indexed_fields = max;
        self
    }

    /// Sets the budget ceiling.
    #[must_use]
    pub fn with_budget_ceiling(mut self, ceiling: u64) -> Self {
        self.budget_ceiling = ceiling;
        self
    }

    /// Sets the parallelism degree.
    #[must_use]
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Sets how many times a conflicting transaction is executed.
    #[must_use]
    pub fn with_max_commit_attempts(mut self, attempts: u32) -> Self {
        self.max_commit_attempts = attempts;
        self
    }

    /// Checks that every option is usable.
    ///
    /// # Errors
    ///
    /// `ConfigError` naming the first offending option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_call_depth == 0 {
            return Err(ConfigError::ZeroCallDepth);
        }
        if self.max_call_depth > limits::MAX_SUPPORTED_CALL_DEPTH {
            return Err(ConfigError::CallDepthTooLarge {
                depth: self.max_call_depth,
                max: limits::MAX_SUPPORTED_CALL_DEPTH,
            });
        }
        if self.parallelism == 0 {
            return Err(ConfigError::ZeroParallelism);
        }
        if self.budget_ceiling == 0 {
            return Err(ConfigError::ZeroBudgetCeiling);
        }
        if self.max_commit_attempts == 0 {
            return Err(ConfigError::ZeroCommitAttempts);
        }
        Ok(())
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

/// Invalid configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No invocation could ever run.
    #[error("max_call_depth must be at least 1")]
    ZeroCallDepth,

    /// Nesting this deep would exhaust the host thread stack.
    #[error("max_call_depth {depth} exceeds supported maximum {max}")]
    CallDepthTooLarge {
        /// Configured depth.
        depth: u16,
        /// Supported maximum.
        max: u16,
    },

    /// No worker could ever run.
    #[error("parallelism must be at least 1")]
    ZeroParallelism,

    /// Every invocation would fail immediately.
    #[error("budget_ceiling must be positive")]
    ZeroBudgetCeiling,

    /// No transaction could ever commit.
    #[error("max_commit_attempts must be at least 1")]
    ZeroCommitAttempts,
}

// =============================================================================
// TESTS
// =============================================================================
