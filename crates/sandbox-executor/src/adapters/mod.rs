//! # Adapters Layer (Outer Hexagon)
//!
//! In-process implementations of the driven ports.
//!
//! - `InMemoryState` implements `StateAccess`
//! - `HashedContentLoader` implements `ContentLoader`

pub mod content_loader;
pub mod state_adapter;

pub use content_loader::*;
pub use state_adapter::*;
