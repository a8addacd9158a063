//! # Host Service Tests
//!
//! The guest-facing capability surface, exercised through real invocations.
//!
//! ## Test Categories
//!
//! 1. Introspection and balances
//! 2. Payable enforcement before guest code runs
//! 3. Read-only enforcement (query mode and read-only methods)
//! 4. Storage persistence and events
//! 5. Cryptographic helpers
//! 6. Budget accounting

mod common;

use common::{owner, returned, sender, ApiContract, Chain};
use k256::ecdsa::SigningKey;
use sandbox_executor::domain::services::{address_from_key, sha3_256};
use sandbox_executor::prelude::*;
use std::sync::Arc;

// =============================================================================
// TEST HELPERS
// =============================================================================

fn make_chain() -> (Chain, Address) {
    let chain = Chain::new(AvmConfiguration::default());
    let api = chain.install(Arc::new(ApiContract::new()), "api");
    (chain, api)
}

fn make_payment(chain: &Chain, to: Address, method: &str, value: u64) -> InvocationResult {
    let mut request = chain.request(to, method, &[]);
    request.value = U256::from(value);
    chain.run(request)
}

fn make_query(chain: &Chain, to: Address, method: &str, args: &[TypedValue]) -> InvocationResult {
    let mut request = chain.request(to, method, args);
    request.read_only = true;
    chain.run(request)
}

fn big(value: u64) -> TypedValue {
    TypedValue::BigInteger(BigInt::from(U256::from(value)))
}

// =============================================================================
// INTROSPECTION AND BALANCES
// =============================================================================

#[test]
fn test_get_balance_null_means_self() {
    let (chain, api) = make_chain();
    chain.state.set_balance(api, U256::from(500));
    chain.state.set_balance(sender(), U256::from(70));

    let own = chain.invoke(api, "getBalance", &[TypedValue::Null]);
    assert_eq!(returned(&own), big(500));

    let other = chain.invoke(api, "getBalance", &[TypedValue::Address(sender())]);
    assert_eq!(returned(&other), big(70));

    let unknown = chain.invoke(api, "getBalance", &[TypedValue::Address(Address::account([0xEE; 20]))]);
    assert_eq!(returned(&unknown), big(0));
}

#[test]
fn test_context_introspection() {
    let (chain, api) = make_chain();
    let result = chain.invoke(api, "getContext", &[]);
    assert_eq!(
        returned(&result),
        TypedValue::ObjectArray(vec![
            TypedValue::Address(api),
            TypedValue::Address(sender()),
            TypedValue::Address(sender()),
            TypedValue::Address(owner()),
            TypedValue::Long(100),
            TypedValue::Int(3),
        ])
    );
}

// =============================================================================
// PAYABLE ENFORCEMENT
// =============================================================================

#[test]
fn test_deposit_moves_value_and_logs() {
    let (chain, api) = make_chain();
    chain.state.set_balance(sender(), U256::from(1_000));

    let result = make_payment(&chain, api, "deposit", 300);
    assert!(result.is_success());
    assert_eq!(chain.state.balance_of(&sender()), U256::from(700));
    assert_eq!(chain.state.balance_of(&api), U256::from(300));

    assert_eq!(result.events.len(), 1);
    assert_eq!(result.events[0].address, api);
    assert_eq!(
        result.events[0].indexed,
        vec![TypedValue::from("Deposit"), TypedValue::Address(sender())]
    );
    assert_eq!(result.events[0].data, vec![big(300)]);
}

#[test]
fn test_value_to_non_payable_rejected_before_guest_runs() {
    let (chain, api) = make_chain();
    chain.state.set_balance(sender(), U256::from(1_000));

    let result = make_payment(&chain, api, "touched", 1);
    assert_eq!(result.status(), status::METHOD_NOT_PAYABLE);

    let mut request = chain.request(api, "setValue", &[TypedValue::Int(5)]);
    request.value = U256::from(10);
    let result = chain.run(request);
    assert_eq!(result.status(), status::METHOD_NOT_PAYABLE);
    assert!(result.events.is_empty());

    assert_eq!(returned(&chain.invoke(api, "getValue", &[])), TypedValue::Int(0));
    assert_eq!(chain.state.balance_of(&sender()), U256::from(1_000));
    assert_eq!(chain.state.balance_of(&api), U256::zero());
}

#[test]
fn test_deposit_exceeding_balance_reverts() {
    let (chain, api) = make_chain();
    chain.state.set_balance(sender(), U256::from(10));

    let result = make_payment(&chain, api, "deposit", 11);
    assert_eq!(result.status(), status::OUT_OF_BALANCE);
    assert!(result.events.is_empty());
    assert_eq!(returned(&chain.invoke(api, "touched", &[])), TypedValue::Boolean(false));
    assert_eq!(chain.state.balance_of(&sender()), U256::from(10));
}

// =============================================================================
// READ-ONLY ENFORCEMENT
// =============================================================================

#[test]
fn test_query_mode_rejects_mutating_method() {
    let (chain, api) = make_chain();
    let result = make_query(&chain, api, "setValue", &[TypedValue::Int(9)]);
    assert_eq!(result.status(), status::ACCESS_DENIED);
    assert_eq!(returned(&chain.invoke(api, "getValue", &[])), TypedValue::Int(0));
}

#[test]
fn test_query_mode_allows_read_only_method() {
    let (chain, api) = make_chain();
    chain.invoke(api, "setValue", &[TypedValue::Int(12)]);
    let result = make_query(&chain, api, "getValue", &[]);
    assert_eq!(returned(&result), TypedValue::Int(12));
}

#[test]
fn test_read_only_method_cannot_write() {
    let (chain, api) = make_chain();
    chain.invoke(api, "setValue", &[TypedValue::Int(1)]);

    let result = chain.invoke(api, "sneakyWrite", &[]);
    assert_eq!(result.status(), status::ACCESS_DENIED);
    assert_eq!(returned(&chain.invoke(api, "getValue", &[])), TypedValue::Int(1));
}

// =============================================================================
// STORAGE AND EVENTS
// =============================================================================

#[test]
fn test_storage_persists_across_transactions() {
    let (chain, api) = make_chain();

    let write = chain.invoke(api, "setValue", &[TypedValue::Int(42)]);
    assert!(write.is_success());
    assert_eq!(write.events.len(), 1);
    assert_eq!(write.events[0].data, vec![TypedValue::Int(42)]);
    assert!(chain.state.storage_len() > 0);

    let read = chain.invoke(api, "getValue", &[]);
    assert_eq!(returned(&read), TypedValue::Int(42));
    assert!(read.events.is_empty());
}

#[test]
fn test_indexed_field_limit() {
    let (chain, api) = make_chain();
    let max = i32::try_from(limits::DEFAULT_MAX_INDEXED_FIELDS).unwrap();

    let ok = chain.invoke(api, "emitIndexed", &[TypedValue::Int(max)]);
    assert!(ok.is_success());
    assert_eq!(ok.events[0].indexed.len(), limits::DEFAULT_MAX_INDEXED_FIELDS);

    let too_many = chain.invoke(api, "emitIndexed", &[TypedValue::Int(max + 1)]);
    assert_eq!(too_many.status(), status::ILLEGAL_FORMAT);
    assert!(too_many.events.is_empty());
}

#[test]
fn test_indexed_field_limit_is_configurable() {
    let chain = Chain::new(AvmConfiguration::default().with_max_indexed_fields(1));
    let api = chain.install(Arc::new(ApiContract::new()), "api");

    let result = chain.invoke(api, "emitIndexed", &[TypedValue::Int(2)]);
    assert_eq!(result.status(), status::ILLEGAL_FORMAT);
}

// =============================================================================
// CRYPTOGRAPHY
// =============================================================================

#[test]
fn test_hash_matches_host_digest() {
    let (chain, api) = make_chain();
    let result = chain.invoke(api, "hash", &[TypedValue::from(b"abc".to_vec())]);
    assert_eq!(returned(&result), TypedValue::ByteArray(sha3_256(b"abc").to_vec()));
}

#[test]
fn test_recover_signer_address() {
    let (chain, api) = make_chain();
    let signing_key = SigningKey::random(&mut rand::thread_rng());
    let hash = sha3_256(b"transfer 10 to bob");
    let (sig, recovery_id) = signing_key.sign_prehash_recoverable(&hash).unwrap();
    let mut raw = sig.to_bytes().to_vec();
    raw.push(recovery_id.to_byte());

    let expected = address_from_key(&signing_key.verifying_key().to_sec1_bytes()).unwrap();
    let result = chain.invoke(
        api,
        "recover",
        &[TypedValue::from(hash.to_vec()), TypedValue::from(raw)],
    );
    assert_eq!(returned(&result), TypedValue::Address(expected));
}

#[test]
fn test_recover_malformed_signature() {
    let (chain, api) = make_chain();
    let result = chain.invoke(
        api,
        "recover",
        &[TypedValue::from(vec![0u8; 32]), TypedValue::from(vec![0u8; 10])],
    );
    assert_eq!(result.status(), status::ILLEGAL_FORMAT);
}

// =============================================================================
// BUDGET ACCOUNTING
// =============================================================================

#[test]
fn test_budget_used_plus_remaining_is_limit() {
    let (chain, api) = make_chain();
    let request = chain.request(api, "setValue", &[TypedValue::Int(3)]);
    let budget = request.budget;

    let result = chain.run(request);
    assert!(result.budget_used > 0);
    assert_eq!(result.budget_used + result.budget_remaining, budget);
    assert!(check_all_invariants(&result, budget).is_valid());
}

#[test]
fn test_budget_capped_by_ceiling() {
    let chain = Chain::new(AvmConfiguration::default().with_budget_ceiling(5_000));
    let api = chain.install(Arc::new(ApiContract::new()), "api");

    let result = chain.invoke(api, "getValue", &[]);
    assert_eq!(result.budget_used + result.budget_remaining, 5_000);
}
