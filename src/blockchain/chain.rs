//! The chain a node mines on: genesis seeding, the unconfirmed-transaction
//! pool, append validation and end-of-run persistence.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::blockchain::block::{Block, Metric, Transaction};
use crate::error::Result;

pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Sentinel hash of the genesis block. It does not satisfy any positive
/// difficulty; chain validation exempts index 0 for exactly this reason.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000001";

pub const GENESIS_TIMESTAMP: f64 = 1_654_065_166.509_127_9;
pub const GENESIS_NONCE: u64 = 4_266_222;

/// A node's view of the ledger. Owns its blocks outright; peer chains are
/// snapshots that are either discarded after the consensus vote or adopted
/// wholesale.
#[derive(Debug)]
pub struct Chain {
    pub difficulty: usize,
    pub ip: String,
    pub port: u16,
    /// Static peer base URLs; there is no discovery.
    pub peers: Vec<String>,
    pub miner_id: String,
    pub miner_address: String,
    pub miner_private_key: String,
    /// Ordered pool of unconfirmed transactions.
    pub pending_transactions: Vec<Transaction>,
    pub blocks: Vec<Block>,
    /// Valid peer chains fetched during the current consensus round.
    pub peer_chains: Vec<Vec<Block>>,
}

impl Chain {
    pub fn new(
        difficulty: usize,
        ip: &str,
        port: u16,
        peers: Vec<String>,
        miner_id: &str,
        miner_address: &str,
        miner_private_key: &str,
    ) -> Self {
        let mut chain = Self {
            difficulty,
            ip: ip.to_string(),
            port,
            peers,
            miner_id: miner_id.to_string(),
            miner_address: miner_address.to_string(),
            miner_private_key: miner_private_key.to_string(),
            pending_transactions: Vec::new(),
            blocks: Vec::new(),
            peer_chains: Vec::new(),
        };
        chain.seed_genesis();
        chain
    }

    /// Seeds the deterministic genesis block. Every field except the
    /// difficulty and the derived size is a fixed constant, so two nodes
    /// configured alike start from byte-identical chains.
    fn seed_genesis(&mut self) {
        info!(
            difficulty = self.difficulty,
            port = self.port,
            peers = self.peers.len(),
            "generating genesis block"
        );

        let genesis_tx = Transaction::genesis();
        let mut block = Block::new(0, vec![genesis_tx.clone()]);
        // The genesis merkle root hashes the flat record, not a list of
        // records; nodes depend on this preimage.
        block.build_header(GENESIS_PREVIOUS_HASH, &genesis_tx.canonical(), self.difficulty);
        block.header.timestamp = GENESIS_TIMESTAMP;
        block.header.nonce = GENESIS_NONCE;
        block.hash = GENESIS_HASH.to_string();
        block.mining_time = Metric::dash();
        block.hash_power = Metric::dash();
        block.mined_by = "-".to_string();
        block.compute_size();

        self.blocks.push(block);
    }

    /// The last (highest-indexed) block.
    pub fn tip(&self) -> &Block {
        self.blocks.last().expect("chain always holds the genesis block")
    }

    /// A hash is valid for `block` when it clears the difficulty prefix and
    /// matches the recomputed header hash.
    pub fn is_hash_valid(&self, block: &Block, hash: &str) -> bool {
        hash.starts_with(&"0".repeat(self.difficulty)) && hash == block.header.hash()
    }

    /// Appends `block` if it links to the current tip and `hash` is valid.
    pub fn add_block(&mut self, block: Block, hash: &str) -> bool {
        if self.tip().hash != block.header.previous_hash {
            debug!(index = block.index, "rejecting block: parent mismatch");
            return false;
        }
        if !self.is_hash_valid(&block, hash) {
            debug!(index = block.index, "rejecting block: invalid hash");
            return false;
        }
        self.blocks.push(block);
        true
    }

    /// Validates a full (peer) chain. The genesis block is exempt: its
    /// stored sentinel hash never satisfies the difficulty.
    pub fn is_chain_valid(&self, blocks: &[Block]) -> bool {
        blocks
            .iter()
            .all(|block| block.index == 0 || self.is_hash_valid(block, &block.hash))
    }

    /// Signs and pools a user transaction. Rejections (bad key length,
    /// failed verification) come back as errors and leave the pool alone.
    pub fn add_transaction(
        &mut self,
        sender: &str,
        private_key: &str,
        recipient: &str,
        amount: &str,
        concept: &str,
    ) -> Result<()> {
        let transaction = Transaction::signed(sender, private_key, recipient, amount, concept)?;
        self.pending_transactions.push(transaction);
        Ok(())
    }

    /// Pools the fixed-form reward transaction for this node's miner.
    pub fn add_reward_transaction(&mut self) {
        let reward = Transaction::reward(&self.miner_address);
        self.pending_transactions.push(reward);
    }

    /// Wholesale replacement after a lost consensus round. The pending pool
    /// is deliberately left untouched.
    pub fn replace(&mut self, blocks: Vec<Block>) {
        self.blocks = blocks;
    }

    /// Writes the chain as a pretty-printed JSON array of block records.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        save_blocks(&self.blocks, path)
    }
}

pub(crate) fn save_blocks(blocks: &[Block], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(blocks)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::signatures;
    use crate::error::NodeError;

    fn test_chain(difficulty: usize) -> Chain {
        Chain::new(
            difficulty,
            "127.0.0.1",
            5000,
            Vec::new(),
            "1",
            "miner-address",
            "miner-key",
        )
    }

    #[test]
    fn fresh_chains_share_an_identical_genesis() {
        let a = test_chain(5);
        let b = test_chain(5);

        assert_eq!(
            serde_json::to_string(&a.blocks).unwrap(),
            serde_json::to_string(&b.blocks).unwrap()
        );
    }

    #[test]
    fn genesis_block_uses_the_fixed_constants() {
        let chain = test_chain(5);
        let genesis = chain.tip();

        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.hash, GENESIS_HASH);
        assert_eq!(genesis.header.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(genesis.header.timestamp, GENESIS_TIMESTAMP);
        assert_eq!(genesis.header.nonce, GENESIS_NONCE);
        assert_eq!(genesis.mined_by, "-");
        assert_eq!(genesis.mining_time, Metric::dash());
        assert!(genesis.size > 0);
    }

    #[test]
    fn genesis_chain_is_valid_despite_the_sentinel_hash() {
        let chain = test_chain(5);
        assert!(!chain.is_hash_valid(chain.tip(), GENESIS_HASH));
        assert!(chain.is_chain_valid(&chain.blocks));
    }

    #[test]
    fn add_block_rejects_a_parent_mismatch() {
        let mut chain = test_chain(1);
        let mut block = Block::new(1, vec![Transaction::genesis()]);
        block.build_header(&"f".repeat(64), &Transaction::genesis().canonical(), 1);
        let hash = block.refresh_hash();

        assert!(!chain.add_block(block, &hash));
        assert_eq!(chain.blocks.len(), 1);
    }

    #[test]
    fn add_block_rejects_an_unworked_hash() {
        let mut chain = test_chain(4);
        let mut block = Block::new(1, vec![Transaction::genesis()]);
        block.build_header(GENESIS_HASH, &Transaction::genesis().canonical(), 4);
        let hash = block.refresh_hash();

        // A freshly built header essentially never clears difficulty 4.
        assert!(!chain.add_block(block, &hash));
        assert_eq!(chain.blocks.len(), 1);
    }

    #[test]
    fn signed_transaction_enters_the_pool() {
        let mut chain = test_chain(2);
        let (private_key, address) = signatures::generate_keypair();

        chain
            .add_transaction(&address, &private_key, "receiver", "0.02", "Transaccion normal")
            .unwrap();

        assert_eq!(chain.pending_transactions.len(), 1);
        let record = &chain.pending_transactions[0];
        assert_eq!(record.0[0], format!("De: {address}"));
        assert_eq!(record.0[2], "Cantidad: 0.02");
        assert_eq!(record.0[3], "concepto: Transaccion normal");
    }

    #[test]
    fn short_private_key_is_rejected() {
        let mut chain = test_chain(2);
        let err = chain
            .add_transaction("addr", "abcdef", "receiver", "1", "x")
            .unwrap_err();

        assert!(matches!(err, NodeError::BadKeyLength));
        assert!(chain.pending_transactions.is_empty());
    }

    #[test]
    fn mismatched_key_pair_is_rejected_as_invalid_signature() {
        let mut chain = test_chain(2);
        let (_, address) = signatures::generate_keypair();
        let (other_private, _) = signatures::generate_keypair();

        let err = chain
            .add_transaction(&address, &other_private, "receiver", "1", "x")
            .unwrap_err();

        assert!(matches!(err, NodeError::InvalidSignature));
        assert_eq!(err.to_string(), "Firma no válida");
        assert!(chain.pending_transactions.is_empty());
    }

    #[test]
    fn reward_transaction_targets_the_miner_address() {
        let mut chain = test_chain(2);
        chain.add_reward_transaction();

        let record = &chain.pending_transactions[0];
        assert_eq!(record.0[1], "Para: miner-address");
        assert_eq!(record.0[3], "Concepto: Transaccion recompensa");
    }

    #[test]
    fn chain_round_trips_through_the_saved_file() {
        let chain = test_chain(3);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("normal/blockchains/blockchain-1.json");

        chain.save_to_file(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let restored: Vec<Block> = serde_json::from_str(&raw).unwrap();
        assert_eq!(restored, chain.blocks);
    }
}
