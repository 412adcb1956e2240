//! # Driving Ports (API - Inbound)
//!
//! What callers of the engine program against. [`EvmEngine`] is the
//! production implementation; tests and embedding code may substitute
//! their own.
//!
//! [`EvmEngine`]: crate::engine::EvmEngine

use crate::domain::entities::{Environment, ExecutionResult, Message};
use crate::domain::value_objects::Bytes;
use async_trait::async_trait;

/// Execution entry points.
///
/// Neither method returns a Rust error: every outcome, including
/// collaborator failures, is encoded in the [`ExecutionResult`].
#[async_trait]
pub trait ExecutionApi: Send + Sync {
    /// Executes `message` against the current state, committing or
    /// reverting as it goes.
    async fn run_call(&self, message: Message, env: &Environment) -> ExecutionResult;

    /// Executes raw `code` with no target account semantics.
    ///
    /// State writes are still journaled and revertible.
    async fn run_code(&self, code: Bytes, gas_limit: u64, env: &Environment) -> ExecutionResult;
}
