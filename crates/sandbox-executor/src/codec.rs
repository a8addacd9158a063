//! # Type Codec
//!
//! Lossless conversion between guest [`TypedValue`]s and the self-describing
//! [`WireValue`] form that crosses the invocation boundary.
//!
//! ## Rules
//!
//! - A wire value is accepted only for its exact declared kind. There is no
//!   widening across byte/short/int/long/char, and boolean is never an integer.
//! - `Null` is accepted only for nullable kinds declared optional.
//! - An empty list is an empty `ObjectArray`, never `Null`.
//! - `Void` encodes to [`WireValue::Empty`].
//!
//! Scalar payload layout: fixed-width big-endian for byte/short/int/long/char,
//! one byte `0`/`1` for boolean, minimal two's complement for `BigInteger`,
//! UTF-8 for strings, 21 bytes for addresses.

use crate::domain::typed_value::{ParamSpec, TypedValue, ValueKind};
use crate::domain::value_objects::{Address, BigInt};
use crate::errors::CodecError;
use serde::{Deserialize, Serialize};

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// Tag identifying the kind of a scalar wire payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TypeTag {
    /// 1 byte.
    Byte = 1,
    /// 2 bytes big-endian.
    Short = 2,
    /// 4 bytes big-endian.
    Int = 3,
    /// 8 bytes big-endian.
    Long = 4,
    /// 1 byte, `0` or `1`.
    Boolean = 5,
    /// 2 bytes big-endian UTF-16 unit.
    Char = 6,
    /// Minimal two's complement.
    BigInteger = 7,
    /// UTF-8.
    String = 8,
    /// Raw.
    ByteArray = 9,
    /// 21 bytes.
    Address = 10,
}

impl TypeTag {
    /// Kind carried by this tag.
    #[must_use]
    pub const fn kind(self) -> ValueKind {
        match self {
            Self::Byte => ValueKind::Byte,
            Self::Short => ValueKind::Short,
            Self::Int => ValueKind::Int,
            Self::Long => ValueKind::Long,
            Self::Boolean => ValueKind::Boolean,
            Self::Char => ValueKind::Char,
            Self::BigInteger => ValueKind::BigInteger,
            Self::String => ValueKind::String,
            Self::ByteArray => ValueKind::ByteArray,
            Self::Address => ValueKind::Address,
        }
    }
}

/// Boundary representation of a value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireValue {
    /// Absent reference.
    Null,
    /// No value (void).
    Empty,
    /// Scalar payload.
    Tagged {
        /// Payload kind.
        tag: TypeTag,
        /// Encoded payload.
        data: Vec<u8>,
    },
    /// Ordered sequence (object array).
    List(Vec<WireValue>),
}

impl WireValue {
    fn describe(&self) -> String {
        match self {
            Self::Null => "null".to_owned(),
            Self::Empty => "empty".to_owned(),
            Self::Tagged { tag, .. } => tag.kind().to_string(),
            Self::List(_) => ValueKind::ObjectArray.to_string(),
        }
    }

    /// Serializes to JSON for transport.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses the JSON transport form.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// =============================================================================
// ENCODE
// =============================================================================

/// Encodes a typed value. Never fails.
#[must_use]
pub fn encode(value: &TypedValue) -> WireValue {
    let tagged = |tag, data: Vec<u8>| WireValue::Tagged { tag, data };
    match value {
        TypedValue::Byte(v) => tagged(TypeTag::Byte, v.to_be_bytes().to_vec()),
        TypedValue::Short(v) => tagged(TypeTag::Short, v.to_be_bytes().to_vec()),
        TypedValue::Int(v) => tagged(TypeTag::Int, v.to_be_bytes().to_vec()),
        TypedValue::Long(v) => tagged(TypeTag::Long, v.to_be_bytes().to_vec()),
        TypedValue::Boolean(v) => tagged(TypeTag::Boolean, vec![u8::from(*v)]),
        TypedValue::Char(v) => tagged(TypeTag::Char, v.to_be_bytes().to_vec()),
        TypedValue::BigInteger(v) => tagged(TypeTag::BigInteger, v.to_signed_bytes().to_vec()),
        TypedValue::String(v) => tagged(TypeTag::String, v.as_bytes().to_vec()),
        TypedValue::ByteArray(v) => tagged(TypeTag::ByteArray, v.clone()),
        TypedValue::Address(v) => tagged(TypeTag::Address, v.as_bytes().to_vec()),
        TypedValue::ObjectArray(items) => WireValue::List(items.iter().map(encode).collect()),
        TypedValue::Null => WireValue::Null,
        TypedValue::Void => WireValue::Empty,
    }
}

/// Encodes an argument list.
#[must_use]
pub fn encode_all(values: &[TypedValue]) -> Vec<WireValue> {
    values.iter().map(encode).collect()
}

/// Total payload bytes carried by a wire value, used for metering.
#[must_use]
pub fn payload_len(wire: &WireValue) -> usize {
    match wire {
        WireValue::Null | WireValue::Empty => 0,
        WireValue::Tagged { data, .. } => data.len(),
        WireValue::List(items) => items.iter().map(payload_len).sum(),
    }
}

// =============================================================================
// DECODE
// =============================================================================

/// Decodes `wire` into a slot declared as `kind`.
///
/// # Errors
///
/// - `TypeMismatch` if the wire kind differs from `kind`, or `Null` is given
///   for a non-optional or non-nullable slot
/// - `Malformed` if the payload is not a valid encoding of `kind`
pub fn decode(wire: &WireValue, kind: ValueKind, optional: bool) -> Result<TypedValue, CodecError> {
    match (wire, kind) {
        (WireValue::Null, kind) if optional && kind.is_nullable() => Ok(TypedValue::Null),
        (WireValue::Empty, ValueKind::Void) => Ok(TypedValue::Void),
        (WireValue::List(items), ValueKind::ObjectArray) => Ok(TypedValue::ObjectArray(
            items.iter().map(decode_any).collect::<Result<_, _>>()?,
        )),
        (WireValue::Tagged { tag, data }, kind) if tag.kind() == kind => decode_scalar(*tag, data),
        (other, kind) => Err(CodecError::TypeMismatch {
            expected: kind,
            found: other.describe(),
        }),
    }
}

/// Decodes a self-describing wire value without a declared kind.
///
/// Used for object array elements and for results handed back to a caller.
///
/// # Errors
///
/// `Malformed` if any scalar payload is invalid.
pub fn decode_any(wire: &WireValue) -> Result<TypedValue, CodecError> {
    match wire {
        WireValue::Null => Ok(TypedValue::Null),
        WireValue::Empty => Ok(TypedValue::Void),
        WireValue::List(items) => Ok(TypedValue::ObjectArray(
            items.iter().map(decode_any).collect::<Result<_, _>>()?,
        )),
        WireValue::Tagged { tag, data } => decode_scalar(*tag, data),
    }
}

/// Decodes call arguments against a declared parameter list.
///
/// Trailing optional parameters may be omitted and decode as `Null`.
///
/// # Errors
///
/// `Arity` on surplus or missing required arguments, otherwise whatever
/// [`decode`] reports for the first bad argument.
pub fn decode_arguments(
    params: &[ParamSpec],
    args: &[WireValue],
) -> Result<Vec<TypedValue>, CodecError> {
    if args.len() > params.len() {
        return Err(CodecError::Arity {
            expected: params.len(),
            got: args.len(),
        });
    }
    params
        .iter()
        .enumerate()
        .map(|(i, param)| match args.get(i) {
            Some(arg) => decode(arg, param.kind, param.optional),
            None if param.optional => Ok(TypedValue::Null),
            None => Err(CodecError::Arity {
                expected: params.len(),
                got: args.len(),
            }),
        })
        .collect()
}

fn fixed<const N: usize>(data: &[u8], kind: ValueKind) -> Result<[u8; N], CodecError> {
    data.try_into().map_err(|_| CodecError::Malformed {
        kind,
        reason: format!("expected {N} bytes, got {}", data.len()),
    })
}

fn decode_scalar(tag: TypeTag, data: &[u8]) -> Result<TypedValue, CodecError> {
    let kind = tag.kind();
    Ok(match tag {
        TypeTag::Byte => TypedValue::Byte(i8::from_be_bytes(fixed(data, kind)?)),
        TypeTag::Short => TypedValue::Short(i16::from_be_bytes(fixed(data, kind)?)),
        TypeTag::Int => TypedValue::Int(i32::from_be_bytes(fixed(data, kind)?)),
        TypeTag::Long => TypedValue::Long(i64::from_be_bytes(fixed(data, kind)?)),
        TypeTag::Char => TypedValue::Char(u16::from_be_bytes(fixed(data, kind)?)),
        TypeTag::Boolean => match fixed::<1>(data, kind)? {
            [0] => TypedValue::Boolean(false),
            [1] => TypedValue::Boolean(true),
            [other] => {
                return Err(CodecError::Malformed {
                    kind,
                    reason: format!("boolean byte 0x{other:02x}"),
                })
            }
        },
        TypeTag::BigInteger => {
            if data.is_empty() {
                return Err(CodecError::Malformed {
                    kind,
                    reason: "empty integer".to_owned(),
                });
            }
            TypedValue::BigInteger(BigInt::from_signed_bytes(data))
        }
        TypeTag::String => TypedValue::String(String::from_utf8(data.to_vec()).map_err(|e| {
            CodecError::Malformed {
                kind,
                reason: e.to_string(),
            }
        })?),
        TypeTag::ByteArray => TypedValue::ByteArray(data.to_vec()),
        TypeTag::Address => TypedValue::Address(Address::from_slice(data).map_err(|e| {
            CodecError::Malformed {
                kind,
                reason: e.to_string(),
            }
        })?),
    })
}

// =============================================================================
// TESTS
// =============================================================================
