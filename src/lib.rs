//! An educational proof-of-work blockchain node.
//!
//! Each node mines signed transactions into blocks over a hash-prefix
//! puzzle, serves its chain over HTTP to a static peer list, and reconciles
//! forks with a longest-chain / earliest-tip consensus. An attacker variant
//! can rewrite a suffix of history and race the honest nodes.

pub mod blockchain;
pub mod config;
pub mod consensus;
pub mod crypto;
pub mod error;
pub mod miner;
pub mod network;

pub use blockchain::{Attacker, Block, BlockHeader, Chain, Metric, Transaction};
pub use error::{NodeError, Result};
