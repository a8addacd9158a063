//! Shared fixtures: sample guest contracts and an in-memory chain.

#![allow(dead_code)]

use sandbox_executor::prelude::*;
use std::sync::Arc;

// =============================================================================
// CHAIN HARNESS
// =============================================================================

pub const BYTECODE: &str = "application/java";

pub fn owner() -> Address {
    Address::account([0x0A; 20])
}

pub fn sender() -> Address {
    Address::account([0x0B; 20])
}

pub struct Chain {
    pub executor: AvmExecutor,
    pub state: Arc<InMemoryState>,
    pub factory: Arc<CommonInstrumentationFactory>,
    pub loader: Arc<HashedContentLoader>,
}

impl Chain {
    pub fn new(config: AvmConfiguration) -> Self {
        let state = Arc::new(InMemoryState::new());
        let factory = Arc::new(CommonInstrumentationFactory::new());
        let loader = Arc::new(HashedContentLoader::new());
        let executor = AvmExecutor::with_factory(
            config,
            state.clone(),
            ContentNegotiator::new(loader.clone(), loader.clone()),
            factory.clone(),
        );
        Self {
            executor,
            state,
            factory,
            loader,
        }
    }

    /// Publishes `code` under a package named after `salt` and deploys it.
    pub fn install(&self, code: Arc<dyn Contract>, salt: &str) -> Address {
        let package = format!("package:{salt}");
        self.loader.publish(package.as_bytes(), code);
        self.executor
            .deploy(owner(), BYTECODE, package.as_bytes(), salt.as_bytes())
            .unwrap()
    }

    pub fn request(&self, to: Address, method: &str, args: &[TypedValue]) -> InvocationRequest {
        InvocationRequest {
            from: sender(),
            to,
            method: method.into(),
            args: encode_all(args),
            value: U256::zero(),
            budget: 10_000_000,
            read_only: false,
        }
    }

    pub fn invoke(&self, to: Address, method: &str, args: &[TypedValue]) -> InvocationResult {
        self.run(self.request(to, method, args))
    }

    pub fn run(&self, request: InvocationRequest) -> InvocationResult {
        let tx = TransactionContext {
            origin: request.from,
            block_height: 100,
            index: 3,
            ..TransactionContext::default()
        };
        self.executor.run(&tx, request)
    }
}

pub fn returned(result: &InvocationResult) -> TypedValue {
    assert!(result.is_success(), "invocation reverted: {:?}", result.outcome);
    decode_any(result.return_value().unwrap()).unwrap()
}

fn unknown(method: &str) -> HostError {
    HostError::MethodNotFound(method.to_owned())
}

fn int_arg(args: &[TypedValue], i: usize) -> i32 {
    args[i].as_int().unwrap_or_default()
}

// =============================================================================
// TYPE ECHO CONTRACT
// =============================================================================

/// Echoes its single argument for every kind.
pub struct TypeEcho {
    methods: Vec<MethodSignature>,
}

impl TypeEcho {
    pub fn new() -> Self {
        let primitive = |name: &str, kind| {
            MethodSignature::external(name, vec![ParamSpec::required("v", kind)], kind)
        };
        let optional = |name: &str, kind| {
            MethodSignature::external(name, vec![ParamSpec::optional("v", kind)], kind)
        };
        Self {
            methods: vec![
                primitive("mByte", ValueKind::Byte),
                primitive("mShort", ValueKind::Short),
                primitive("mInt", ValueKind::Int),
                primitive("mLong", ValueKind::Long),
                primitive("mBoolean", ValueKind::Boolean),
                primitive("mChar", ValueKind::Char),
                optional("mBigInteger", ValueKind::BigInteger),
                optional("mString", ValueKind::String),
                optional("mByteArray", ValueKind::ByteArray),
                optional("mAddress", ValueKind::Address),
                optional("mObjectArray", ValueKind::ObjectArray),
                primitive("mRequiredString", ValueKind::String),
                MethodSignature::external(
                    "mPair",
                    vec![
                        ParamSpec::required("a", ValueKind::Int),
                        ParamSpec::optional("b", ValueKind::String),
                    ],
                    ValueKind::ObjectArray,
                ),
                MethodSignature::external("mVoid", vec![], ValueKind::Void),
            ],
        }
    }
}

impl Contract for TypeEcho {
    fn methods(&self) -> &[MethodSignature] {
        &self.methods
    }

    fn invoke(
        &self,
        _rt: &mut dyn BlockchainRuntime,
        method: &str,
        args: &[TypedValue],
    ) -> Result<TypedValue, HostError> {
        match method {
            "mPair" => Ok(TypedValue::ObjectArray(args.to_vec())),
            "mVoid" => Ok(TypedValue::Void),
            _ if self.method(method).is_some() => Ok(args[0].clone()),
            other => Err(unknown(other)),
        }
    }
}

// =============================================================================
// API CONTRACT
// =============================================================================

/// Exercises the host service surface.
pub struct ApiContract {
    methods: Vec<MethodSignature>,
}

impl ApiContract {
    pub fn new() -> Self {
        Self {
            methods: vec![
                MethodSignature::external(
                    "getBalance",
                    vec![ParamSpec::optional("address", ValueKind::Address)],
                    ValueKind::BigInteger,
                )
                .read_only(),
                MethodSignature::external("getContext", vec![], ValueKind::ObjectArray)
                    .read_only(),
                MethodSignature::external("deposit", vec![], ValueKind::Void).payable(),
                MethodSignature::external("touched", vec![], ValueKind::Boolean).read_only(),
                MethodSignature::external(
                    "setValue",
                    vec![ParamSpec::required("v", ValueKind::Int)],
                    ValueKind::Void,
                ),
                MethodSignature::external("getValue", vec![], ValueKind::Int).read_only(),
                MethodSignature::external("sneakyWrite", vec![], ValueKind::Void).read_only(),
                MethodSignature::external(
                    "recover",
                    vec![
                        ParamSpec::required("hash", ValueKind::ByteArray),
                        ParamSpec::required("signature", ValueKind::ByteArray),
                    ],
                    ValueKind::Address,
                )
                .read_only(),
                MethodSignature::external(
                    "hash",
                    vec![ParamSpec::required("data", ValueKind::ByteArray)],
                    ValueKind::ByteArray,
                )
                .read_only(),
                MethodSignature::external(
                    "emitIndexed",
                    vec![ParamSpec::required("count", ValueKind::Int)],
                    ValueKind::Void,
                ),
            ],
        }
    }

    fn values(rt: &mut dyn BlockchainRuntime) -> Result<AnyDb, HostError> {
        rt.new_any_db("values", ValueKind::Int)
    }
}

impl Contract for ApiContract {
    fn methods(&self) -> &[MethodSignature] {
        &self.methods
    }

    fn invoke(
        &self,
        rt: &mut dyn BlockchainRuntime,
        method: &str,
        args: &[TypedValue],
    ) -> Result<TypedValue, HostError> {
        match method {
            "getBalance" => {
                let address = match args[0].as_address() {
                    Some(address) => address,
                    None => rt.get_address()?,
                };
                Ok(TypedValue::BigInteger(BigInt::from(rt.get_balance(&address)?)))
            }
            "getContext" => Ok(TypedValue::ObjectArray(vec![
                TypedValue::Address(rt.get_address()?),
                TypedValue::Address(rt.get_caller()?),
                TypedValue::Address(rt.get_origin()?),
                TypedValue::Address(rt.get_owner()?),
                TypedValue::Long(rt.get_block_height()?),
                TypedValue::Int(rt.get_transaction_index()?),
            ])),
            "deposit" => {
                let caller = rt.get_caller()?;
                let value = rt.get_value()?;
                rt.log_event(
                    &[TypedValue::from("Deposit"), TypedValue::Address(caller)],
                    &[TypedValue::BigInteger(BigInt::from(value))],
                )?;
                let db = rt.new_any_db("flags", ValueKind::Boolean)?;
                rt.db_set(&db, b"touched", Some(&TypedValue::Boolean(true)))?;
                Ok(TypedValue::Void)
            }
            "touched" => {
                let db = rt.new_any_db("flags", ValueKind::Boolean)?;
                Ok(TypedValue::Boolean(!rt.db_get(&db, b"touched")?.is_null()))
            }
            "setValue" => {
                let db = Self::values(rt)?;
                rt.db_set(&db, b"v", Some(&args[0]))?;
                rt.log_event(&[TypedValue::from("ValueSet")], &[args[0].clone()])?;
                Ok(TypedValue::Void)
            }
            "getValue" => {
                let db = Self::values(rt)?;
                match rt.db_get(&db, b"v")? {
                    TypedValue::Null => Ok(TypedValue::Int(0)),
                    value => Ok(value),
                }
            }
            "sneakyWrite" => {
                let db = Self::values(rt)?;
                rt.db_set(&db, b"v", Some(&TypedValue::Int(666)))?;
                Ok(TypedValue::Void)
            }
            "recover" => {
                let hash = args[0].as_bytes().unwrap_or_default();
                let signature = args[1].as_bytes().unwrap_or_default();
                let key = rt.recover_key(hash, signature, true)?;
                Ok(TypedValue::Address(rt.get_address_from_key(&key)?))
            }
            "hash" => Ok(TypedValue::ByteArray(
                rt.sha3_256(args[0].as_bytes().unwrap_or_default())?.to_vec(),
            )),
            "emitIndexed" => {
                let count = usize::try_from(int_arg(args, 0)).unwrap_or_default();
                let indexed = vec![TypedValue::Int(1); count];
                rt.log_event(&indexed, &[])?;
                Ok(TypedValue::Void)
            }
            other => Err(unknown(other)),
        }
    }
}

// =============================================================================
// RECURSIVE CALLER
// =============================================================================

/// Calls itself to a requested depth.
///
/// `guardedRecurse` returns -1 when its own call is too deep and the status
/// code when the failure comes from further down.
pub struct RecursiveCaller {
    methods: Vec<MethodSignature>,
}

impl RecursiveCaller {
    pub fn new() -> Self {
        Self {
            methods: vec![
                MethodSignature::external(
                    "recurse",
                    vec![ParamSpec::required("n", ValueKind::Int)],
                    ValueKind::Int,
                ),
                MethodSignature::external(
                    "guardedRecurse",
                    vec![ParamSpec::required("n", ValueKind::Int)],
                    ValueKind::Int,
                ),
                MethodSignature::external("marker", vec![], ValueKind::Int).read_only(),
            ],
        }
    }
}

impl Contract for RecursiveCaller {
    fn methods(&self) -> &[MethodSignature] {
        &self.methods
    }

    fn invoke(
        &self,
        rt: &mut dyn BlockchainRuntime,
        method: &str,
        args: &[TypedValue],
    ) -> Result<TypedValue, HostError> {
        let this = rt.get_address()?;
        match method {
            "recurse" => {
                let n = int_arg(args, 0);
                if n <= 0 {
                    return Ok(TypedValue::Int(0));
                }
                let inner = rt.call(U256::zero(), &this, "recurse", &[TypedValue::Int(n - 1)])?;
                Ok(TypedValue::Int(inner.as_int().unwrap_or_default() + 1))
            }
            "guardedRecurse" => {
                let db = rt.new_any_db("marker", ValueKind::Int)?;
                rt.db_set(&db, b"m", Some(&TypedValue::Int(1)))?;
                rt.log_event(&[TypedValue::from("before")], &[])?;

                let outcome = match rt.call(U256::zero(), &this, "recurse", &args[..1]) {
                    Ok(value) => value,
                    Err(HostError::CallDepthExceeded { .. }) => TypedValue::Int(-1),
                    Err(HostError::CallFailure { code, .. }) => {
                        TypedValue::Int(i32::try_from(code).unwrap_or_default())
                    }
                    Err(other) => return Err(other),
                };

                rt.log_event(&[TypedValue::from("after")], &[])?;
                Ok(outcome)
            }
            "marker" => {
                let db = rt.new_any_db("marker", ValueKind::Int)?;
                match rt.db_get(&db, b"m")? {
                    TypedValue::Null => Ok(TypedValue::Int(0)),
                    value => Ok(value),
                }
            }
            other => Err(unknown(other)),
        }
    }
}

// =============================================================================
// VAULT
// =============================================================================

/// Storage, events, transfers and failure handling across nested calls.
pub struct Vault {
    methods: Vec<MethodSignature>,
}

impl Vault {
    pub fn new() -> Self {
        let int_param = || vec![ParamSpec::required("v", ValueKind::Int)];
        let child_param = |extra: Vec<ParamSpec>| {
            let mut params = vec![ParamSpec::required("child", ValueKind::Address)];
            params.extend(extra);
            params
        };
        Self {
            methods: vec![
                MethodSignature::external("store", int_param(), ValueKind::Void),
                MethodSignature::external("storeThenFail", int_param(), ValueKind::Void),
                MethodSignature::external("read", vec![], ValueKind::Int).read_only(),
                MethodSignature::external(
                    "parentCalls",
                    child_param(int_param()),
                    ValueKind::Int,
                ),
                MethodSignature::external("chain", child_param(Vec::new()), ValueKind::Void),
                MethodSignature::external("revertAfterLog", vec![], ValueKind::Void),
                MethodSignature::external("burn", vec![], ValueKind::Int),
                MethodSignature::external("payMe", vec![], ValueKind::BigInteger).payable(),
                MethodSignature::external(
                    "forward",
                    child_param(vec![ParamSpec::required("amount", ValueKind::BigInteger)]),
                    ValueKind::Int,
                ),
            ],
        }
    }

    fn slot(rt: &mut dyn BlockchainRuntime) -> Result<AnyDb, HostError> {
        rt.new_any_db("slot", ValueKind::Int)
    }

    fn child(args: &[TypedValue]) -> Result<Address, HostError> {
        args[0]
            .as_address()
            .ok_or_else(|| HostError::InvalidAddress("missing child".into()))
    }
}

impl Contract for Vault {
    fn methods(&self) -> &[MethodSignature] {
        &self.methods
    }

    fn invoke(
        &self,
        rt: &mut dyn BlockchainRuntime,
        method: &str,
        args: &[TypedValue],
    ) -> Result<TypedValue, HostError> {
        match method {
            "store" => {
                let db = Self::slot(rt)?;
                rt.db_set(&db, b"slot", Some(&args[0]))?;
                rt.log_event(&[TypedValue::from("store")], &[args[0].clone()])?;
                Ok(TypedValue::Void)
            }
            "storeThenFail" => {
                let db = Self::slot(rt)?;
                rt.db_set(&db, b"slot", Some(&args[0]))?;
                rt.log_event(&[TypedValue::from("child")], &[])?;
                Err(rt.revert(7, Some("child failed")))
            }
            "read" => {
                let db = Self::slot(rt)?;
                match rt.db_get(&db, b"slot")? {
                    TypedValue::Null => Ok(TypedValue::Int(0)),
                    value => Ok(value),
                }
            }
            "parentCalls" => {
                let child = Self::child(args)?;
                let db = Self::slot(rt)?;
                rt.db_set(&db, b"slot", Some(&args[1]))?;
                rt.log_event(&[TypedValue::from("parent-before")], &[])?;

                let code = match rt.call(U256::zero(), &child, "storeThenFail", &args[1..2]) {
                    Ok(_) => 0,
                    Err(HostError::CallFailure { code, .. }) => i32::try_from(code).unwrap_or(-1),
                    Err(other) => return Err(other),
                };

                rt.log_event(&[TypedValue::from("parent-after")], &[])?;
                Ok(TypedValue::Int(code))
            }
            "chain" => {
                let child = Self::child(args)?;
                rt.log_event(&[TypedValue::from("a")], &[])?;
                rt.call(U256::zero(), &child, "store", &[TypedValue::Int(5)])?;
                rt.log_event(&[TypedValue::from("b")], &[])?;
                Ok(TypedValue::Void)
            }
            "revertAfterLog" => {
                rt.log_event(&[TypedValue::from("doomed")], &[])?;
                let db = Self::slot(rt)?;
                rt.db_set(&db, b"slot", Some(&TypedValue::Int(99)))?;
                rt.require(false)?;
                Ok(TypedValue::Void)
            }
            "burn" => {
                let mut rounds = 0;
                while rt.sha3_256(&[0u8; 64]).is_ok() {
                    rounds += 1;
                }
                Ok(TypedValue::Int(rounds))
            }
            "payMe" => Ok(TypedValue::BigInteger(BigInt::from(rt.get_value()?))),
            "forward" => {
                let child = Self::child(args)?;
                let amount = args[1]
                    .as_big_integer()
                    .and_then(BigInt::to_u256)
                    .ok_or_else(|| rt.revert(1, Some("bad amount")))?;
                match rt.call(amount, &child, "payMe", &[]) {
                    Ok(_) => Ok(TypedValue::Int(0)),
                    Err(HostError::CallFailure { code, .. }) => {
                        Ok(TypedValue::Int(i32::try_from(code).unwrap_or(-1)))
                    }
                    Err(other) => Err(other),
                }
            }
            other => Err(unknown(other)),
        }
    }
}
