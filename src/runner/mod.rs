//! Pair execution.

pub mod process;

use async_trait::async_trait;

use crate::catalog::{Outcome, Pair};

pub use process::ProcessRunner;

/// Executes one pair on one port.
///
/// Implementations fill in the pair's `outcome`, `return_code` and `error`
/// fields and return the outcome. They must not panic on ordinary
/// failures; a panic is still contained by the worker and classified as a
/// harness failure.
#[async_trait]
pub trait PairRunner: Send + Sync {
    async fn run(&self, pair: &mut Pair, port: u16) -> Outcome;
}
