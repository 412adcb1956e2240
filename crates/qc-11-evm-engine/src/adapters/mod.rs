//! # Adapters Layer (Outer Hexagon)
//!
//! In-memory implementations of the driven ports, used by tests and by
//! embedders without a persistent state backend.

pub mod block_hashes;
pub mod journaled_state;

pub use block_hashes::*;
pub use journaled_state::*;
