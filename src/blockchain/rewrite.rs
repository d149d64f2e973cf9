//! The history-rewrite attack: rebuild a suffix of the chain with
//! substituted transactions, re-mine it under the same rules, adopt it and
//! race the honest nodes through consensus.

use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

use crate::blockchain::block::{Metric, Transaction};
use crate::blockchain::chain::{save_blocks, Chain};
use crate::blockchain::Block;
use crate::consensus;
use crate::consensus::pow::proof_of_work;
use crate::error::Result;

/// Capability extension of an honest node: a separate malicious transaction
/// pool and the rewrite routine. Wraps the chain rather than subclassing
/// it; the honest code paths stay untouched.
#[derive(Debug, Default)]
pub struct Attacker {
    /// Transactions spliced into the rewritten block.
    pub transactions: Vec<Transaction>,
    /// The rewritten chain produced by the last attack.
    pub blocks: Vec<Block>,
}

impl Attacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signs and pools a transaction destined for the rewritten block. Same
    /// contract as the honest pool: rejections leave the pool alone.
    pub fn add_transaction(
        &mut self,
        sender: &str,
        private_key: &str,
        recipient: &str,
        amount: &str,
        concept: &str,
    ) -> Result<()> {
        let transaction = Transaction::signed(sender, private_key, recipient, amount, concept)?;
        self.transactions.push(transaction);
        Ok(())
    }

    /// Pools the reward transaction for the attacking miner.
    pub fn add_reward_transaction(&mut self, miner_address: &str) {
        self.transactions.push(Transaction::reward(miner_address));
    }

    /// Rewrites the chain from block `index` on: that block receives the
    /// malicious transaction pool and a rebuilt header (same parent, same
    /// difficulty); every later block is re-linked and re-mined. Mining is
    /// non-cooperative so the attack never abandons itself. The rewritten
    /// chain replaces the local one and a consensus round broadcasts the
    /// race to the peers.
    pub fn rewrite_chain(&mut self, chain: &mut Chain, index: u64) {
        if self.transactions.is_empty() {
            warn!("rewriting with an empty malicious transaction pool");
        }

        let source = chain.blocks.clone();
        self.blocks.clear();

        let last_index = chain.tip().index;
        let started = Instant::now();
        info!(index, "rewriting chain from block");

        let mut previous_hash = String::new();
        for mut block in source {
            if block.index < index {
                self.blocks.push(block);
                continue;
            }

            if block.index == index {
                block.transactions = self.transactions.clone();
                block.transaction_count = block.transactions.len();
                let parent = block.header.previous_hash.clone();
                let difficulty = block.header.difficulty;
                block.build_header(
                    &parent,
                    &Transaction::list_canonical(&block.transactions),
                    difficulty,
                );
                proof_of_work(chain, &mut block, false);
                block.mined_by = chain.miner_id.clone();
            } else {
                // Later blocks keep their transactions and merkle root; only
                // the link changes, and the nonce search continues from
                // wherever it stood.
                block.header.previous_hash = previous_hash.clone();
                proof_of_work(chain, &mut block, false);
            }

            if block.index == last_index {
                block.mining_time = Metric::Number(started.elapsed().as_secs_f64());
            }

            previous_hash = block.hash.clone();
            self.blocks.push(block);
        }

        chain.replace(self.blocks.clone());
        info!(
            elapsed_secs = started.elapsed().as_secs_f64(),
            length = chain.blocks.len(),
            "chain rewritten"
        );

        consensus::run(chain);
    }

    /// Writes the rewritten chain as a pretty-printed JSON array.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        save_blocks(&self.blocks, path)
    }
}
