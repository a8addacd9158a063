//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions between the executor and the outside world.
//!
//! - **Driving Ports (Inbound)**: `ExecutorApi`, `Contract`
//! - **Driven Ports (Outbound)**: `StateAccess`, `ContentLoader`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
