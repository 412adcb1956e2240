//! # Ports Layer (Middle Hexagon)
//!
//! - **Driving Ports (Inbound)**: [`ExecutionApi`]
//! - **Driven Ports (Outbound)**: [`StateAccess`], [`JournalBridge`],
//!   [`BlockHashOracle`]
//!
//! No concrete implementations live here.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
