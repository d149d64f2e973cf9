//! Blockchain module: the block data model, the chain a node mines on and
//! the history-rewrite attack.

pub mod block;
pub mod chain;
pub mod rewrite;

pub use block::{Block, BlockHeader, Metric, Transaction};
pub use chain::Chain;
pub use rewrite::Attacker;
