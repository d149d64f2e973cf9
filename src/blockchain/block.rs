//! Block data model: transactions, headers and the double-SHA-256 hash
//! contract shared by every node.
//!
//! The hash contract is `SHA256(hex(SHA256(json(canonical_header))))`, where
//! the canonical header form is the brace/single-quote rendering produced by
//! [`BlockHeader::canonical`]. Every node must reproduce it bit-exactly or
//! consensus falls apart, so the canonical strings are pinned by tests.

use std::mem;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::signatures;
use crate::error::{NodeError, Result};

pub const BLOCK_VERSION: u32 = 1;

/// Sender stamped on reward and genesis transactions.
pub const NETWORK_SENDER: &str = "De: Red blockchain";

/// A mining metric that is a number on mined blocks and the literal `"-"`
/// on the genesis block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    Number(f64),
    Text(String),
}

impl Metric {
    pub fn dash() -> Self {
        Metric::Text("-".to_string())
    }
}

/// An ordered five-field transaction record: sender, recipient, amount,
/// concept and date, each rendered as a prefixed string. On the wire it is
/// the plain string array of the peer-sync schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transaction(pub Vec<String>);

impl Transaction {
    /// Builds and signs a user transaction.
    ///
    /// The ECDSA signature covers only the date string, not the sender,
    /// recipient, amount or concept. This is a known weakness of the
    /// protocol, kept for wire compatibility: a valid signature proves the
    /// key holder signed *at that time*, nothing more.
    pub fn signed(
        sender: &str,
        private_key: &str,
        recipient: &str,
        amount: &str,
        concept: &str,
    ) -> Result<Self> {
        if private_key.len() != 64 {
            return Err(NodeError::BadKeyLength);
        }

        let (signature, date) = signatures::sign_with_key(private_key)?;

        let transaction = Self(vec![
            format!("De: {sender}"),
            format!("Para: {recipient}"),
            format!("Cantidad: {amount}"),
            format!("concepto: {concept}"),
            format!("Fecha: {date}"),
        ]);

        if signatures::verify(sender, &signature, &date) {
            Ok(transaction)
        } else {
            Err(NodeError::InvalidSignature)
        }
    }

    /// The fixed-form, unsigned miner reward.
    pub fn reward(miner_address: &str) -> Self {
        Self(vec![
            NETWORK_SENDER.to_string(),
            format!("Para: {miner_address}"),
            "Cantidad: 50".to_string(),
            "Concepto: Transaccion recompensa".to_string(),
            format!("Fecha: {}", signatures::current_date_string()),
        ])
    }

    /// The genesis transaction, identical on every node.
    pub fn genesis() -> Self {
        Self(vec![
            NETWORK_SENDER.to_string(),
            "Para: Nadie".to_string(),
            "Cantidad: 50".to_string(),
            "Concepto: Transaccion Genesis".to_string(),
            "Fecha: Indeterminado".to_string(),
        ])
    }

    /// Canonical single-quoted rendering of one record, e.g.
    /// `['De: a', 'Para: b', ...]`.
    pub fn canonical(&self) -> String {
        let fields: Vec<String> = self.0.iter().map(|field| format!("'{field}'")).collect();
        format!("[{}]", fields.join(", "))
    }

    /// Canonical rendering of a transaction list; the merkle-root preimage
    /// for mined blocks.
    pub fn list_canonical(transactions: &[Transaction]) -> String {
        let records: Vec<String> = transactions.iter().map(Transaction::canonical).collect();
        format!("[{}]", records.join(", "))
    }
}

/// Block header; the only input to the block hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    #[serde(rename = "hash_previo")]
    pub previous_hash: String,
    #[serde(rename = "raiz_merkle")]
    pub merkle_root: String,
    pub timestamp: f64,
    #[serde(rename = "dificultad")]
    pub difficulty: usize,
    pub nonce: u64,
}

impl BlockHeader {
    /// Canonical string form of the header. Field order is fixed; changing
    /// it changes every block hash on the network.
    pub fn canonical(&self) -> String {
        format!(
            "{{'version': {}, 'hash_previo': '{}', 'raiz_merkle': '{}', 'timestamp': {}, 'dificultad': {}, 'nonce': {}}}",
            self.version,
            self.previous_hash,
            self.merkle_root,
            canonical_float(self.timestamp),
            self.difficulty,
            self.nonce,
        )
    }

    /// Double SHA-256 over the JSON-encoded canonical form; the inner digest
    /// is re-hashed as its lowercase hex string.
    pub fn hash(&self) -> String {
        let encoded =
            serde_json::to_string(&self.canonical()).expect("string encoding is infallible");
        let inner = hex::encode(Sha256::digest(encoded.as_bytes()));
        hex::encode(Sha256::digest(inner.as_bytes()))
    }
}

/// A single block. Wire field names and their order follow the peer-sync
/// schema; struct names stay idiomatic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "indice")]
    pub index: u64,
    #[serde(rename = "tamano")]
    pub size: u64,
    #[serde(rename = "cabecera")]
    pub header: BlockHeader,
    #[serde(rename = "contador_transacciones")]
    pub transaction_count: usize,
    #[serde(rename = "transacciones")]
    pub transactions: Vec<Transaction>,
    pub hash: String,
    #[serde(rename = "tiempo_minado")]
    pub mining_time: Metric,
    #[serde(rename = "potencia_computacion")]
    pub hash_power: Metric,
    #[serde(rename = "minado_por")]
    pub mined_by: String,
}

impl Block {
    pub fn new(index: u64, transactions: Vec<Transaction>) -> Self {
        Self {
            index,
            size: 0,
            header: BlockHeader {
                version: BLOCK_VERSION,
                previous_hash: String::new(),
                merkle_root: String::new(),
                timestamp: 0.0,
                difficulty: 0,
                nonce: 0,
            },
            transaction_count: transactions.len(),
            transactions,
            hash: String::new(),
            mining_time: Metric::dash(),
            hash_power: Metric::dash(),
            mined_by: "-".to_string(),
        }
    }

    /// Installs a fresh header over `merkle_source` (the canonical string
    /// the merkle root is a single SHA-256 of) with a zeroed nonce.
    pub fn build_header(&mut self, previous_hash: &str, merkle_source: &str, difficulty: usize) {
        self.header = BlockHeader {
            version: BLOCK_VERSION,
            previous_hash: previous_hash.to_string(),
            merkle_root: hex::encode(Sha256::digest(merkle_source.as_bytes())),
            timestamp: unix_time(),
            difficulty,
            nonce: 0,
        };
    }

    /// Recomputes the stored hash from the current header and returns it.
    pub fn refresh_hash(&mut self) -> String {
        self.hash = self.header.hash();
        self.hash.clone()
    }

    /// In-memory size estimate in bytes. Informational only; never hashed.
    pub fn compute_size(&mut self) -> u64 {
        let transaction_bytes: usize = self
            .transactions
            .iter()
            .map(|tx| tx.0.iter().map(String::len).sum::<usize>())
            .sum();
        let header_bytes = self.header.previous_hash.len() + self.header.merkle_root.len();

        self.size = (mem::size_of::<Self>() + header_bytes + transaction_bytes + self.hash.len())
            as u64;
        self.size
    }
}

pub(crate) fn unix_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs_f64()
}

// Shortest round-trip rendering; integral values keep a trailing `.0` so
// every node formats the canonical header identically.
pub(crate) fn canonical_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}
