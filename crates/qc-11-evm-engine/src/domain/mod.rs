//! # Domain Layer (Inner Hexagon)
//!
//! Value types, entities and pure functions of the execution engine.
//! NO I/O, NO async.

pub mod entities;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use services::*;
pub use value_objects::*;
