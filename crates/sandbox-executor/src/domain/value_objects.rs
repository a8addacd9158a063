//! # Value Objects
//!
//! Immutable domain primitives used across the invocation boundary.
//! These types represent concepts that are defined by their value, not identity.

use crate::errors::HostError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export U256 from primitive-types for balances and transferred value
pub use primitive_types::U256;

// =============================================================================
// ADDRESS (21 bytes)
// =============================================================================

/// A 21-byte account or contract address.
///
/// The first byte is the kind prefix (`0x00` externally owned, `0x01`
/// contract), followed by a 20-byte body. Textual form is `hx…` / `cx…`
/// followed by 40 hex digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address([u8; 21]);

impl Address {
    /// Encoded length in bytes.
    pub const LEN: usize = 21;

    const ACCOUNT_PREFIX: u8 = 0x00;
    const CONTRACT_PREFIX: u8 = 0x01;

    /// Creates an externally owned account address from its 20-byte body.
    #[must_use]
    pub fn account(body: [u8; 20]) -> Self {
        Self::with_prefix(Self::ACCOUNT_PREFIX, body)
    }

    /// Creates a contract address from its 20-byte body.
    #[must_use]
    pub fn contract(body: [u8; 20]) -> Self {
        Self::with_prefix(Self::CONTRACT_PREFIX, body)
    }

    fn with_prefix(prefix: u8, body: [u8; 20]) -> Self {
        let mut bytes = [0u8; 21];
        bytes[0] = prefix;
        bytes[1..].copy_from_slice(&body);
        Self(bytes)
    }

    /// Parses the 21-byte encoded form.
    ///
    /// # Errors
    ///
    /// `InvalidAddress` if the length is wrong or the prefix is unknown.
    pub fn from_slice(slice: &[u8]) -> Result<Self, HostError> {
        if slice.len() != Self::LEN {
            return Err(HostError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                Self::LEN,
                slice.len()
            )));
        }
        if slice[0] != Self::ACCOUNT_PREFIX && slice[0] != Self::CONTRACT_PREFIX {
            return Err(HostError::InvalidAddress(format!(
                "unknown prefix 0x{:02x}",
                slice[0]
            )));
        }
        let mut bytes = [0u8; 21];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Returns the encoded bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 21] {
        &self.0
    }

    /// Returns the 20-byte body without the prefix.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.0[1..]
    }

    /// Returns true for contract (`cx`) addresses.
    #[must_use]
    pub fn is_contract(&self) -> bool {
        self.0[0] == Self::CONTRACT_PREFIX
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.is_contract() { "cx" } else { "hx" };
        write!(f, "{prefix}{}", hex::encode(self.body()))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let prefix = match s.get(..2) {
            Some("hx") => Self::ACCOUNT_PREFIX,
            Some("cx") => Self::CONTRACT_PREFIX,
            _ => return Err(HostError::InvalidAddress(format!("bad prefix: {s}"))),
        };
        let body = hex::decode(&s[2..])
            .map_err(|e| HostError::InvalidAddress(format!("{s}: {e}")))?;
        let body: [u8; 20] = body
            .try_into()
            .map_err(|_| HostError::InvalidAddress(format!("bad length: {s}")))?;
        Ok(Self::with_prefix(prefix, body))
    }
}

// =============================================================================
// HASH (32 bytes)
// =============================================================================

/// A 32-byte hash (transaction hash, storage key digest).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// The zero hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Creates a hash from a 32-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}...{}", hex::encode(&self.0[..4]), hex::encode(&self.0[28..]))
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// BIG INTEGER (signed, arbitrary precision)
// =============================================================================

/// Signed arbitrary-precision integer.
///
/// Stored as the minimal two's-complement big-endian encoding, so equal
/// numbers always have equal bytes. Zero is `[0x00]`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BigInt(Vec<u8>);

impl BigInt {
    /// Zero.
    #[must_use]
    pub fn zero() -> Self {
        Self(vec![0])
    }

    /// Builds a value from two's-complement big-endian bytes (any length).
    #[must_use]
    pub fn from_signed_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::zero();
        }
        let mut start = 0;
        while start + 1 < bytes.len() {
            let head = bytes[start];
            let next_negative = bytes[start + 1] & 0x80 != 0;
            let redundant =
                (head == 0x00 && !next_negative) || (head == 0xff && next_negative);
            if !redundant {
                break;
            }
            start += 1;
        }
        Self(bytes[start..].to_vec())
    }

    /// Returns the canonical two's-complement encoding.
    #[must_use]
    pub fn to_signed_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns true if the value is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0[0] & 0x80 != 0
    }

    /// Returns true if the value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0]
    }

    /// Converts to `i128` if it fits.
    #[must_use]
    pub fn to_i128(&self) -> Option<i128> {
        if self.0.len() > 16 {
            return None;
        }
        let fill = if self.is_negative() { 0xff } else { 0x00 };
        let mut buf = [fill; 16];
        buf[16 - self.0.len()..].copy_from_slice(&self.0);
        Some(i128::from_be_bytes(buf))
    }

    /// Converts to an unsigned amount if non-negative and at most 256 bits.
    #[must_use]
    pub fn to_u256(&self) -> Option<U256> {
        if self.is_negative() {
            return None;
        }
        let magnitude = match self.0.split_first() {
            Some((0, rest)) => rest,
            _ => &self.0[..],
        };
        if magnitude.len() > 32 {
            return None;
        }
        Some(U256::from_big_endian(magnitude))
    }
}

impl Default for BigInt {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<i128> for BigInt {
    fn from(value: i128) -> Self {
        Self::from_signed_bytes(&value.to_be_bytes())
    }
}

impl From<i64> for BigInt {
    fn from(value: i64) -> Self {
        Self::from(i128::from(value))
    }
}

impl From<U256> for BigInt {
    fn from(value: U256) -> Self {
        let mut bytes = [0u8; 33];
        value.to_big_endian(&mut bytes[1..]);
        Self::from_signed_bytes(&bytes)
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(small) = self.to_i128() {
            write!(f, "{small}")
        } else if let Some(large) = self.to_u256() {
            write!(f, "{large}")
        } else {
            write!(f, "0x{}", hex::encode(&self.0))
        }
    }
}

impl fmt::Debug for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BigInt({self})")
    }
}

// =============================================================================
// RESOURCE BUDGET
// =============================================================================

/// Metered allowance shared by a top-level transaction and all nested calls.
///
/// ## Invariants
/// - `used <= limit` at all times
/// - `used` only grows; nothing is refunded on revert
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceBudget {
    limit: u64,
    used: u64,
}

impl ResourceBudget {
    /// Creates a budget with the given limit.
    #[must_use]
    pub const fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// Returns the limit.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Returns the amount consumed so far.
    #[must_use]
    pub const fn used(&self) -> u64 {
        self.used
    }

    /// Returns the amount left.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    /// Consumes `amount`.
    ///
    /// # Errors
    ///
    /// `OutOfBudget` if the charge exceeds what remains. The remainder is
    /// consumed in that case, so an exhausted budget stays exhausted.
    pub fn charge(&mut self, amount: u64) -> Result<(), HostError> {
        let remaining = self.remaining();
        if amount > remaining {
            self.used = self.limit;
            return Err(HostError::OutOfBudget {
                requested: amount,
                remaining,
            });
        }
        self.used += amount;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
