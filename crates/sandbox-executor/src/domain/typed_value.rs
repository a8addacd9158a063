//! # Typed Values
//!
//! The closed set of values that may cross the host/guest boundary.

use crate::domain::value_objects::{Address, BigInt};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// VALUE KIND
// =============================================================================

/// Declared kind of a parameter, return value, or storage slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// Signed 8-bit integer.
    Byte,
    /// Signed 16-bit integer.
    Short,
    /// Signed 32-bit integer.
    Int,
    /// Signed 64-bit integer.
    Long,
    /// Boolean.
    Boolean,
    /// UTF-16 code unit.
    Char,
    /// Signed arbitrary-precision integer.
    BigInteger,
    /// UTF-8 string.
    String,
    /// Raw bytes.
    ByteArray,
    /// Account or contract address.
    Address,
    /// Ordered heterogeneous sequence of typed values.
    ObjectArray,
    /// No value (return kind only).
    Void,
}

impl ValueKind {
    /// Returns true if a slot of this kind may hold `Null` when declared optional.
    ///
    /// Primitive kinds have no nullable form.
    #[must_use]
    pub const fn is_nullable(self) -> bool {
        matches!(
            self,
            Self::BigInteger | Self::String | Self::ByteArray | Self::Address | Self::ObjectArray
        )
    }

    /// Lower-case name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Boolean => "boolean",
            Self::Char => "char",
            Self::BigInteger => "BigInteger",
            Self::String => "String",
            Self::ByteArray => "byte[]",
            Self::Address => "Address",
            Self::ObjectArray => "Object[]",
            Self::Void => "void",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// TYPED VALUE
// =============================================================================

/// A value as seen by guest code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypedValue {
    /// Signed 8-bit integer.
    Byte(i8),
    /// Signed 16-bit integer.
    Short(i16),
    /// Signed 32-bit integer.
    Int(i32),
    /// Signed 64-bit integer.
    Long(i64),
    /// Boolean.
    Boolean(bool),
    /// UTF-16 code unit.
    Char(u16),
    /// Signed arbitrary-precision integer.
    BigInteger(BigInt),
    /// UTF-8 string.
    String(String),
    /// Raw bytes.
    ByteArray(Vec<u8>),
    /// Account or contract address.
    Address(Address),
    /// Ordered heterogeneous sequence.
    ObjectArray(Vec<TypedValue>),
    /// Absent reference value.
    Null,
    /// No value.
    Void,
}

impl TypedValue {
    /// Kind of this value; `None` for `Null`, which belongs to no single kind.
    #[must_use]
    pub fn kind(&self) -> Option<ValueKind> {
        Some(match self {
            Self::Byte(_) => ValueKind::Byte,
            Self::Short(_) => ValueKind::Short,
            Self::Int(_) => ValueKind::Int,
            Self::Long(_) => ValueKind::Long,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Char(_) => ValueKind::Char,
            Self::BigInteger(_) => ValueKind::BigInteger,
            Self::String(_) => ValueKind::String,
            Self::ByteArray(_) => ValueKind::ByteArray,
            Self::Address(_) => ValueKind::Address,
            Self::ObjectArray(_) => ValueKind::ObjectArray,
            Self::Void => ValueKind::Void,
            Self::Null => return None,
        })
    }

    /// Returns true if this value may occupy a slot of `kind`.
    #[must_use]
    pub fn conforms_to(&self, kind: ValueKind, optional: bool) -> bool {
        match self {
            Self::Null => optional && kind.is_nullable(),
            other => other.kind() == Some(kind),
        }
    }

    /// Returns true for `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the value as an `i32` if it is an `Int`.
    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a `BigInt` if it is a `BigInteger`.
    #[must_use]
    pub fn as_big_integer(&self) -> Option<&BigInt> {
        match self {
            Self::BigInteger(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the value as a string slice if it is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the value as bytes if it is a `ByteArray`.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::ByteArray(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the value as an address if it is an `Address`.
    #[must_use]
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i32> for TypedValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for TypedValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<bool> for TypedValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<BigInt> for TypedValue {
    fn from(v: BigInt) -> Self {
        Self::BigInteger(v)
    }
}

impl From<Address> for TypedValue {
    fn from(v: Address) -> Self {
        Self::Address(v)
    }
}

impl From<Vec<u8>> for TypedValue {
    fn from(v: Vec<u8>) -> Self {
        Self::ByteArray(v)
    }
}

// =============================================================================
// PARAMETER SPEC
// =============================================================================

/// One declared parameter of a guest method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: String,
    /// Declared kind.
    pub kind: ValueKind,
    /// Whether `Null` (or omission, for trailing parameters) is accepted.
    pub optional: bool,
}

impl ParamSpec {
    /// A parameter that must be supplied.
    #[must_use]
    pub fn required(name: &str, kind: ValueKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            optional: false,
        }
    }

    /// A parameter that accepts `Null`.
    #[must_use]
    pub fn optional(name: &str, kind: ValueKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            optional: true,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
