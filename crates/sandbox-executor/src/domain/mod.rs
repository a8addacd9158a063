//! # Domain Layer (Inner Hexagon)
//!
//! Pure types and functions for sandboxed contract invocation.
//! NO I/O, NO async.
//!
//! Outside this module the domain uses only the codec's `WireValue` (the
//! stored and transported form of a value) and the error types. It never
//! depends on the runtime, adapters, executor or service.

pub mod entities;
pub mod invariants;
pub mod services;
pub mod typed_value;
pub mod value_objects;

pub use entities::*;
pub use invariants::*;
pub use services::*;
pub use typed_value::*;
pub use value_objects::*;
