//! # Host Service Interface
//!
//! [`BlockchainRuntime`] is the complete capability surface a guest can use.
//! Guests receive it as an explicit `&mut dyn BlockchainRuntime`; every
//! operation acts on the active [`ExecutionContext`] of the instrumentation
//! it wraps.
//!
//! ## Operation groups
//!
//! | Group | Operations | Mutating |
//! |-------|------------|----------|
//! | Introspection | `get_transaction_*`, `get_address`, `get_caller`, `get_origin`, `get_owner`, `get_block_*` | no |
//! | Value | `get_value`, `get_balance` | no |
//! | Calls | `call` | with value |
//! | Control | `revert`, `require` | no |
//! | Crypto | `sha3_256`, `sha256`, `recover_key`, `get_address_from_key` | no |
//! | Storage | `new_any_db`, `db_get`, `db_set` | `db_set` |
//! | Logging | `log_event`, `println` | `log_event` |

pub mod instrumentation;
pub mod journal;

pub use instrumentation::{
    CommonInstrumentationFactory, Instrumentation, InstrumentationFactory, InstrumentationGuard,
};
pub use journal::{Checkpoint, EventLog, StateJournal};

use crate::codec::{self, payload_len};
use crate::config::AvmConfiguration;
use crate::domain::entities::{
    AnyDb, EventLogEntry, ExecutionContext, MethodSignature, TransactionContext,
};
use crate::domain::services;
use crate::domain::typed_value::{TypedValue, ValueKind};
use crate::domain::value_objects::{Address, Hash, U256};
use crate::errors::{CodecError, HostError};
use crate::executor::{ContractRegistry, DeployedContract};
use crate::telemetry::PRINTLN_TARGET;
use tracing::{debug, error, info, warn};

// =============================================================================
// HOST SERVICE INTERFACE
// =============================================================================

/// Operations available to guest code.
///
/// Every operation charges the shared resource budget and fails with
/// `NoContext` when no execution context is active.
pub trait BlockchainRuntime {
    /// Hash of the current transaction.
    fn get_transaction_hash(&mut self) -> Result<Hash, HostError>;
    /// Position of the current transaction in its block.
    fn get_transaction_index(&mut self) -> Result<i32, HostError>;
    /// Timestamp of the current transaction.
    fn get_transaction_timestamp(&mut self) -> Result<i64, HostError>;
    /// Nonce of the current transaction.
    fn get_transaction_nonce(&mut self) -> Result<U256, HostError>;
    /// Address of the executing contract.
    fn get_address(&mut self) -> Result<Address, HostError>;
    /// Immediate caller.
    fn get_caller(&mut self) -> Result<Address, HostError>;
    /// Transaction signer.
    fn get_origin(&mut self) -> Result<Address, HostError>;
    /// Deployer of the executing contract.
    fn get_owner(&mut self) -> Result<Address, HostError>;
    /// Timestamp of the current block.
    fn get_block_timestamp(&mut self) -> Result<i64, HostError>;
    /// Height of the current block.
    fn get_block_height(&mut self) -> Result<i64, HostError>;

    /// Value attached to the current call.
    fn get_value(&mut self) -> Result<U256, HostError>;
    /// Balance of `address`, including this transaction's uncommitted transfers.
    fn get_balance(&mut self, address: &Address) -> Result<U256, HostError>;

    /// Calls `method` on `target`, transferring `value` with the call.
    ///
    /// Calling an account address is a plain transfer returning `Null`. If the
    /// callee fails, its effects (and the transfer) are rolled back and the
    /// caller observes `CallFailure`, or `CallDepthExceeded` when this call
    /// would nest deeper than the configured maximum.
    fn call(
        &mut self,
        value: U256,
        target: &Address,
        method: &str,
        params: &[TypedValue],
    ) -> Result<TypedValue, HostError>;

    /// Builds the error that unwinds the current context. Return it with `Err`.
    fn revert(&self, code: u32, message: Option<&str>) -> HostError;
    /// Fails with `RequireFailed` if `condition` is false.
    fn require(&mut self, condition: bool) -> Result<(), HostError>;

    /// SHA3-256 digest.
    fn sha3_256(&mut self, data: &[u8]) -> Result<[u8; 32], HostError>;
    /// SHA-256 digest.
    fn sha256(&mut self, data: &[u8]) -> Result<[u8; 32], HostError>;
    /// Recovers the signer's public key from a 65-byte recoverable signature.
    fn recover_key(
        &mut self,
        msg_hash: &[u8],
        signature: &[u8],
        compressed: bool,
    ) -> Result<Vec<u8>, HostError>;
    /// Account address derived from a public key.
    fn get_address_from_key(&mut self, public_key: &[u8]) -> Result<Address, HostError>;

    /// Handle to the executing contract's store `id`.
    fn new_any_db(&mut self, id: &str, value_kind: ValueKind) -> Result<AnyDb, HostError>;
    /// Reads `key`; `Null` if absent.
    fn db_get(&mut self, db: &AnyDb, key: &[u8]) -> Result<TypedValue, HostError>;
    /// Writes (`Some`) or deletes (`None`) `key`.
    fn db_set(&mut self, db: &AnyDb, key: &[u8], value: Option<&TypedValue>)
        -> Result<(), HostError>;

    /// Appends an event to the transaction log.
    fn log_event(&mut self, indexed: &[TypedValue], data: &[TypedValue]) -> Result<(), HostError>;
    /// Diagnostic output. Never fails and is not part of consensus state.
    fn println(&mut self, message: &str);
}

// =============================================================================
// RUNTIME
// =============================================================================

/// The host side of one top-level transaction.
pub struct Runtime<'a> {
    tx: &'a TransactionContext,
    config: &'a AvmConfiguration,
    instrumentation: &'a mut Instrumentation,
    journal: &'a mut StateJournal,
    events: &'a mut EventLog,
    registry: &'a ContractRegistry,
    fatal: Option<HostError>,
}

impl<'a> Runtime<'a> {
    /// Binds the host surface to one transaction's execution state.
    #[must_use]
    pub fn new(
        tx: &'a TransactionContext,
        config: &'a AvmConfiguration,
        instrumentation: &'a mut Instrumentation,
        journal: &'a mut StateJournal,
        events: &'a mut EventLog,
        registry: &'a ContractRegistry,
    ) -> Self {
        Self {
            tx,
            config,
            instrumentation,
            journal,
            events,
            registry,
            fatal: None,
        }
    }

    /// Runs `signature` of `deployed` in a new active context.
    ///
    /// Transfers the frame's value first. On failure every state change and
    /// event recorded since entry is rolled back.
    ///
    /// # Errors
    ///
    /// `CallDepthExceeded` if the frame cannot be entered, otherwise whatever
    /// the guest or the host raised.
    pub fn run_frame(
        &mut self,
        frame: ExecutionContext,
        deployed: &DeployedContract,
        signature: &MethodSignature,
        args: &[TypedValue],
    ) -> Result<TypedValue, HostError> {
        let checkpoint = self.journal.checkpoint();
        let mark = self.events.len();
        self.instrumentation.enter(frame)?;

        let result = self.execute_frame(deployed, signature, args);

        self.instrumentation.exit();
        if let Err(err) = &result {
            self.journal.revert_to(checkpoint);
            self.events.truncate(mark);
            if err.is_fatal() {
                error!(method = %signature.name, error = %err, "fatal failure");
                self.fatal.get_or_insert_with(|| err.clone());
            } else {
                debug!(method = %signature.name, status = err.status(), "frame reverted");
            }
        }
        result
    }

    fn execute_frame(
        &mut self,
        deployed: &DeployedContract,
        signature: &MethodSignature,
        args: &[TypedValue],
    ) -> Result<TypedValue, HostError> {
        let (caller, address, value) = {
            let ctx = self.context()?;
            (ctx.caller, ctx.address, ctx.value)
        };
        self.journal.transfer(&caller, &address, value)?;

        let returned = deployed.code.invoke(self, &signature.name, args)?;
        if !signature.accepts_return(&returned) {
            return Err(HostError::InvalidReturn {
                expected: signature.returns,
            });
        }
        Ok(returned)
    }

    /// The first fatal failure seen, which overrides whatever the guest
    /// returned afterwards.
    #[must_use]
    pub fn take_fatal(&mut self) -> Option<HostError> {
        self.fatal.take()
    }

    fn context(&self) -> Result<&ExecutionContext, HostError> {
        self.instrumentation.current().ok_or(HostError::NoContext)
    }

    fn charge(&mut self, amount: u64) -> Result<(), HostError> {
        self.instrumentation.charge(amount).map_err(|err| {
            self.fatal.get_or_insert_with(|| err.clone());
            err
        })
    }

    /// Checks for an active context, then charges `amount`.
    fn metered(&mut self, amount: u64) -> Result<&ExecutionContext, HostError> {
        self.context()?;
        self.charge(amount)?;
        self.context()
    }

    fn ensure_writable(&self, operation: &'static str) -> Result<(), HostError> {
        let ctx = self.context()?;
        if self.config.enforce_read_only && ctx.read_only {
            warn!(operation, contract = %ctx.address, "read-only violation");
            return Err(HostError::ReadOnlyViolation { operation });
        }
        Ok(())
    }

    /// Runs `method` of contract `target` in a child frame of `parent`.
    ///
    /// Failures reach the caller as `CallFailure`. The one exception is a
    /// depth overflow caused by this call itself, which the caller observes
    /// as `CallDepthExceeded` so that it can recover from it.
    fn nested_call(
        &mut self,
        parent: &ExecutionContext,
        value: U256,
        target: &Address,
        method: &str,
        params: &[TypedValue],
    ) -> Result<TypedValue, HostError> {
        let (deployed, signature, args) = self
            .resolve_callee(value, target, method, params)
            .map_err(HostError::into_call_failure)?;
        self.instrumentation.check_depth()?;

        let frame = parent.child_call(*target, deployed.owner, value, method, signature.read_only);
        self.run_frame(frame, &deployed, &signature, &args)
            .and_then(|returned| {
                codec::decode_any(&codec::encode(&returned)).map_err(HostError::from)
            })
            .map_err(HostError::into_call_failure)
    }

    fn resolve_callee(
        &self,
        value: U256,
        target: &Address,
        method: &str,
        params: &[TypedValue],
    ) -> Result<(DeployedContract, MethodSignature, Vec<TypedValue>), HostError> {
        let deployed = self
            .registry
            .get(target)
            .ok_or(HostError::ContractNotFound(*target))?;
        let signature = deployed
            .code
            .method(method)
            .cloned()
            .ok_or_else(|| HostError::MethodNotFound(method.to_owned()))?;
        if !value.is_zero() && !signature.payable {
            return Err(HostError::NotPayable {
                method: method.to_owned(),
            });
        }

        let args = codec::decode_arguments(&signature.params, &codec::encode_all(params))?;
        Ok((deployed, signature, args))
    }

    fn api_read<T>(&mut self, read: impl FnOnce(&TransactionContext, &ExecutionContext) -> T) -> Result<T, HostError> {
        let cost = self.config.step_costs.api_read;
        let tx = self.tx;
        let ctx = self.metered(cost)?;
        Ok(read(tx, ctx))
    }
}

impl BlockchainRuntime for Runtime<'_> {
    fn get_transaction_hash(&mut self) -> Result<Hash, HostError> {
        self.api_read(|tx, _| tx.hash)
    }

    fn get_transaction_index(&mut self) -> Result<i32, HostError> {
        self.api_read(|tx, _| tx.index)
    }

    fn get_transaction_timestamp(&mut self) -> Result<i64, HostError> {
        self.api_read(|tx, _| tx.timestamp)
    }

    fn get_transaction_nonce(&mut self) -> Result<U256, HostError> {
        self.api_read(|tx, _| tx.nonce)
    }

    fn get_address(&mut self) -> Result<Address, HostError> {
        self.api_read(|_, ctx| ctx.address)
    }

    fn get_caller(&mut self) -> Result<Address, HostError> {
        self.api_read(|_, ctx| ctx.caller)
    }

    fn get_origin(&mut self) -> Result<Address, HostError> {
        self.api_read(|_, ctx| ctx.origin)
    }

    fn get_owner(&mut self) -> Result<Address, HostError> {
        self.api_read(|_, ctx| ctx.owner)
    }

    fn get_block_timestamp(&mut self) -> Result<i64, HostError> {
        self.api_read(|tx, _| tx.block_timestamp)
    }

    fn get_block_height(&mut self) -> Result<i64, HostError> {
        self.api_read(|tx, _| tx.block_height)
    }

    fn get_value(&mut self) -> Result<U256, HostError> {
        self.api_read(|_, ctx| ctx.value)
    }

    fn get_balance(&mut self, address: &Address) -> Result<U256, HostError> {
        self.metered(self.config.step_costs.balance)?;
        Ok(self.journal.balance(address)?)
    }

    fn call(
        &mut self,
        value: U256,
        target: &Address,
        method: &str,
        params: &[TypedValue],
    ) -> Result<TypedValue, HostError> {
        let parent = self.metered(self.config.step_costs.call)?.clone();
        if !value.is_zero() {
            self.ensure_writable("call")?;
        }
        debug!(from = %parent.address, to = %target, method, %value, "call");

        if !target.is_contract() {
            let checkpoint = self.journal.checkpoint();
            return match self.journal.transfer(&parent.address, target, value) {
                Ok(()) => Ok(TypedValue::Null),
                Err(err) => {
                    self.journal.revert_to(checkpoint);
                    Err(err.into_call_failure())
                }
            };
        }

        self.nested_call(&parent, value, target, method, params)
    }

    fn revert(&self, code: u32, message: Option<&str>) -> HostError {
        HostError::Revert {
            code,
            message: message.map(str::to_owned),
        }
    }

    fn require(&mut self, condition: bool) -> Result<(), HostError> {
        if condition {
            Ok(())
        } else {
            Err(HostError::RequireFailed)
        }
    }

    fn sha3_256(&mut self, data: &[u8]) -> Result<[u8; 32], HostError> {
        self.metered(self.config.step_costs.hash(data.len()))?;
        Ok(services::sha3_256(data))
    }

    fn sha256(&mut self, data: &[u8]) -> Result<[u8; 32], HostError> {
        self.metered(self.config.step_costs.hash(data.len()))?;
        Ok(services::sha256(data))
    }

    fn recover_key(
        &mut self,
        msg_hash: &[u8],
        signature: &[u8],
        compressed: bool,
    ) -> Result<Vec<u8>, HostError> {
        self.metered(self.config.step_costs.recover_key)?;
        services::recover_key(msg_hash, signature, compressed)
    }

    fn get_address_from_key(&mut self, public_key: &[u8]) -> Result<Address, HostError> {
        self.metered(self.config.step_costs.hash(public_key.len()))?;
        services::address_from_key(public_key)
    }

    fn new_any_db(&mut self, id: &str, value_kind: ValueKind) -> Result<AnyDb, HostError> {
        let contract = self.metered(self.config.step_costs.api_read)?.address;
        Ok(AnyDb {
            contract,
            id: id.to_owned(),
            value_kind,
        })
    }

    fn db_get(&mut self, db: &AnyDb, key: &[u8]) -> Result<TypedValue, HostError> {
        self.metered(self.config.step_costs.storage_read)?;
        match self.journal.storage(&services::storage_key(db, key))? {
            Some(wire) => Ok(codec::decode(&wire, db.value_kind, false)?),
            None => Ok(TypedValue::Null),
        }
    }

    fn db_set(
        &mut self,
        db: &AnyDb,
        key: &[u8],
        value: Option<&TypedValue>,
    ) -> Result<(), HostError> {
        let writer = self.context()?.address;
        self.ensure_writable("dbSet")?;
        if db.contract != writer {
            return Err(HostError::ForeignStorage {
                owner: db.contract,
                writer,
            });
        }

        let wire = match value {
            Some(v) if !v.conforms_to(db.value_kind, false) => {
                return Err(CodecError::TypeMismatch {
                    expected: db.value_kind,
                    found: v.kind().map_or_else(|| "null".to_owned(), |k| k.to_string()),
                }
                .into());
            }
            Some(v) => Some(codec::encode(v)),
            None => None,
        };
        let size = key.len() + wire.as_ref().map_or(0, payload_len);
        self.charge(self.config.step_costs.storage_write(size))?;

        self.journal.set_storage(services::storage_key(db, key), wire);
        Ok(())
    }

    fn log_event(&mut self, indexed: &[TypedValue], data: &[TypedValue]) -> Result<(), HostError> {
        let address = self.context()?.address;
        if indexed.len() > self.config.max_indexed_fields {
            return Err(HostError::TooManyIndexedFields {
                count: indexed.len(),
                max: self.config.max_indexed_fields,
            });
        }
        self.ensure_writable("logEvent")?;

        let size: usize = indexed
            .iter()
            .chain(data)
            .map(|v| payload_len(&codec::encode(v)))
            .sum();
        self.charge(self.config.step_costs.log_event(size))?;

        self.events.push(EventLogEntry {
            address,
            indexed: indexed.to_vec(),
            data: data.to_vec(),
        });
        Ok(())
    }

    fn println(&mut self, message: &str) {
        match self.instrumentation.current() {
            Some(ctx) => info!(target: PRINTLN_TARGET, contract = %ctx.address, "{message}"),
            None => info!(target: PRINTLN_TARGET, "{message}"),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryState;
    use crate::errors::status;
    use std::sync::Arc;

    struct Harness {
        tx: TransactionContext,
        config: AvmConfiguration,
        factory: CommonInstrumentationFactory,
        journal: StateJournal,
        events: EventLog,
        registry: ContractRegistry,
    }

    impl Harness {
        fn new() -> Self {
            let state = InMemoryState::new();
            state.set_balance(contract(), U256::from(1_000));
            Self {
                tx: TransactionContext {
                    block_height: 42,
                    ..TransactionContext::default()
                },
                config: AvmConfiguration::default().with_max_indexed_fields(2),
                factory: CommonInstrumentationFactory::new(),
                journal: StateJournal::new(Arc::new(state)),
                events: EventLog::default(),
                registry: ContractRegistry::default(),
            }
        }

        fn with_runtime<T>(
            &mut self,
            read_only: bool,
            f: impl FnOnce(&mut Runtime<'_>) -> T,
        ) -> T {
            let mut guard = InstrumentationGuard::acquire(&self.factory, &self.config);
            guard
                .enter(ExecutionContext {
                    caller: Address::account([1u8; 20]),
                    origin: Address::account([1u8; 20]),
                    address: contract(),
                    owner: Address::account([9u8; 20]),
                    value: U256::zero(),
                    method: "test".into(),
                    read_only,
                    depth: 1,
                })
                .unwrap();
            let mut rt = Runtime::new(
                &self.tx,
                &self.config,
                &mut guard,
                &mut self.journal,
                &mut self.events,
                &self.registry,
            );
            f(&mut rt)
        }
    }

    fn contract() -> Address {
        Address::contract([5u8; 20])
    }

    #[test]
    fn test_no_context() {
        let mut h = Harness::new();
        let mut inst = h.factory.create_instrumentation(&h.config);
        let mut rt = Runtime::new(
            &h.tx,
            &h.config,
            &mut inst,
            &mut h.journal,
            &mut h.events,
            &h.registry,
        );
        assert_eq!(rt.get_block_height(), Err(HostError::NoContext));
        assert_eq!(rt.get_address(), Err(HostError::NoContext));
        rt.println("still fine");
    }

    #[test]
    fn test_introspection() {
        let mut h = Harness::new();
        h.with_runtime(false, |rt| {
            assert_eq!(rt.get_block_height(), Ok(42));
            assert_eq!(rt.get_address(), Ok(contract()));
            assert_eq!(rt.get_owner(), Ok(Address::account([9u8; 20])));
            assert_eq!(rt.get_value(), Ok(U256::zero()));
            assert_eq!(rt.get_balance(&contract()), Ok(U256::from(1_000)));
        });
    }

    #[test]
    fn test_storage_roundtrip() {
        let mut h = Harness::new();
        h.with_runtime(false, |rt| {
            let db = rt.new_any_db("counter", ValueKind::Int).unwrap();
            assert_eq!(rt.db_get(&db, b"k"), Ok(TypedValue::Null));
            rt.db_set(&db, b"k", Some(&TypedValue::Int(7))).unwrap();
            assert_eq!(rt.db_get(&db, b"k"), Ok(TypedValue::Int(7)));

            let err = rt.db_set(&db, b"k", Some(&TypedValue::Long(7))).unwrap_err();
            assert_eq!(err.status(), status::INVALID_PARAMETER);

            rt.db_set(&db, b"k", None).unwrap();
            assert_eq!(rt.db_get(&db, b"k"), Ok(TypedValue::Null));
        });
    }

    #[test]
    fn test_foreign_storage_write_denied() {
        let mut h = Harness::new();
        h.with_runtime(false, |rt| {
            let foreign = AnyDb {
                contract: Address::contract([6u8; 20]),
                id: "x".into(),
                value_kind: ValueKind::Int,
            };
            let err = rt.db_set(&foreign, b"k", Some(&TypedValue::Int(1))).unwrap_err();
            assert_eq!(err.status(), status::ACCESS_DENIED);
        });
    }

    #[test]
    fn test_read_only_violations() {
        let mut h = Harness::new();
        h.with_runtime(true, |rt| {
            let db = rt.new_any_db("s", ValueKind::Int).unwrap();
            assert_eq!(
                rt.db_set(&db, b"k", Some(&TypedValue::Int(1))),
                Err(HostError::ReadOnlyViolation { operation: "dbSet" })
            );
            assert_eq!(
                rt.log_event(&[], &[]),
                Err(HostError::ReadOnlyViolation { operation: "logEvent" })
            );
            assert_eq!(
                rt.call(U256::one(), &Address::account([2u8; 20]), "", &[]),
                Err(HostError::ReadOnlyViolation { operation: "call" })
            );
            assert!(rt.db_get(&db, b"k").is_ok());
        });
        assert!(h.events.is_empty());
    }

    #[test]
    fn test_too_many_indexed_fields() {
        let mut h = Harness::new();
        h.with_runtime(false, |rt| {
            let fields = vec![TypedValue::Int(1); 3];
            assert_eq!(
                rt.log_event(&fields, &[]),
                Err(HostError::TooManyIndexedFields { count: 3, max: 2 })
            );
            rt.log_event(&fields[..2], &[TypedValue::from("d")]).unwrap();
        });
        assert_eq!(h.events.len(), 1);
    }

    #[test]
    fn test_transfer_to_account() {
        let mut h = Harness::new();
        let bob = Address::account([2u8; 20]);
        h.with_runtime(false, |rt| {
            assert_eq!(rt.call(U256::from(10), &bob, "", &[]), Ok(TypedValue::Null));
            assert_eq!(rt.get_balance(&bob), Ok(U256::from(10)));

            let err = rt.call(U256::from(5_000), &bob, "", &[]).unwrap_err();
            assert_eq!(err.status(), status::OUT_OF_BALANCE);
            assert!(matches!(err, HostError::CallFailure { .. }));
        });
    }

    #[test]
    fn test_call_unknown_contract() {
        let mut h = Harness::new();
        h.with_runtime(false, |rt| {
            let err = rt
                .call(U256::zero(), &Address::contract([8u8; 20]), "m", &[])
                .unwrap_err();
            assert_eq!(
                err,
                HostError::CallFailure {
                    code: status::CONTRACT_NOT_FOUND,
                    message: Some(format!("contract not found: {}", Address::contract([8u8; 20]))),
                }
            );
        });
    }

    #[test]
    fn test_budget_exhaustion_is_recorded() {
        let mut h = Harness::new();
        h.config = h.config.clone().with_budget_ceiling(15);
        h.with_runtime(false, |rt| {
            assert!(rt.get_address().is_ok());
            assert!(matches!(rt.get_address(), Err(HostError::OutOfBudget { .. })));
            assert!(rt.take_fatal().is_some());
        });
    }

    #[test]
    fn test_revert_and_require() {
        let mut h = Harness::new();
        h.with_runtime(false, |rt| {
            assert_eq!(
                rt.revert(3, Some("no")),
                HostError::Revert {
                    code: 3,
                    message: Some("no".into())
                }
            );
            assert_eq!(rt.require(true), Ok(()));
            assert_eq!(rt.require(false), Err(HostError::RequireFailed));
        });
    }
}
