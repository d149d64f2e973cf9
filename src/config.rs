//! Node configuration: CLI flags plus the INI files describing a miner and
//! its wallets.
//!
//! A miner is configured by `<config-dir>/miners/miner-<id>.ini`:
//!
//! ```ini
//! [node]
//! ip = 127.0.0.1
//! port = 5000
//! peers = http://127.0.0.1:5001,http://127.0.0.1:5002
//!
//! [miner]
//! address = <base64 public key>
//! private_key = <64 hex chars>
//!
//! [wallets]
//! sender = emitter.ini
//! receiver = receiver.ini
//! malicious = malicious.ini
//! ```
//!
//! The `[wallets]` entries name files under `<config-dir>/wallets/`, each
//! holding a `[wallet]` section with `address` and `private_key`.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use ::config::FileFormat;

use crate::error::{NodeError, Result};

#[derive(Parser, Debug)]
#[command(name = "aula-chain", version, about = "Educational proof-of-work blockchain node")]
pub struct Cli {
    /// Leading zero hex digits a block hash must carry.
    #[arg(short, long, default_value_t = 5)]
    pub difficulty: usize,

    /// Miner number; selects miners/miner-<id>.ini under the config dir.
    #[arg(short, long)]
    pub miner: u32,

    /// Stop mining once the chain tip reaches this index (default: never).
    #[arg(short, long)]
    pub iterations: Option<u64>,

    /// Index of the block whose transactions the rewrite attack replaces.
    #[arg(long, requires = "rewrite_at")]
    pub rewrite_block: Option<u64>,

    /// Tip index at which the rewrite attack fires.
    #[arg(long, requires = "rewrite_block")]
    pub rewrite_at: Option<u64>,

    /// Shut the node down once the mining loop has finished.
    #[arg(long)]
    pub stop: bool,

    /// Skip the initial wait for every peer to come online.
    #[arg(long)]
    pub no_peers: bool,

    /// Directory holding miners/ and wallets/.
    #[arg(long, default_value = "config")]
    pub config_dir: PathBuf,

    /// Directory the end-of-run chain dumps are written to.
    #[arg(long, default_value = "results")]
    pub output_dir: PathBuf,
}

/// A wallet: base64 public key (the address) and hex private key.
#[derive(Debug, Clone, Deserialize)]
pub struct Wallet {
    pub address: String,
    pub private_key: String,
}

/// The rewrite attack order: replace block `block` once the tip reaches
/// `trigger_at`.
#[derive(Debug, Clone)]
pub struct RewritePlan {
    pub block: u64,
    pub trigger_at: u64,
}

/// Everything a running node needs, merged from the CLI and the INI files.
#[derive(Debug, Clone)]
pub struct Settings {
    pub difficulty: usize,
    pub miner_id: String,
    pub iterations: u64,
    pub rewrite: Option<RewritePlan>,
    pub stop_when_done: bool,
    pub skip_peer_wait: bool,
    pub ip: String,
    pub port: u16,
    pub peers: Vec<String>,
    pub miner_wallet: Wallet,
    pub sender_wallet: Wallet,
    pub receiver_wallet: Wallet,
    pub malicious_wallet: Wallet,
    pub output_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct MinerFile {
    node: NodeSection,
    miner: Wallet,
    wallets: WalletRefs,
}

#[derive(Debug, Deserialize)]
struct NodeSection {
    ip: String,
    port: u16,
    /// Comma-separated peer base URLs; may be empty.
    #[serde(default)]
    peers: String,
}

#[derive(Debug, Deserialize)]
struct WalletRefs {
    sender: String,
    receiver: String,
    malicious: String,
}

#[derive(Debug, Deserialize)]
struct WalletFile {
    wallet: Wallet,
}

impl Settings {
    pub fn load(cli: &Cli) -> Result<Self> {
        let miner_path = cli
            .config_dir
            .join("miners")
            .join(format!("miner-{}.ini", cli.miner));
        let miner_file: MinerFile = read_ini(&miner_path)?;

        let wallets_dir = cli.config_dir.join("wallets");
        let sender_wallet = read_wallet(&wallets_dir.join(&miner_file.wallets.sender))?;
        let receiver_wallet = read_wallet(&wallets_dir.join(&miner_file.wallets.receiver))?;
        let malicious_wallet = read_wallet(&wallets_dir.join(&miner_file.wallets.malicious))?;

        let peers = miner_file
            .node
            .peers
            .split(',')
            .map(str::trim)
            .filter(|peer| !peer.is_empty())
            .map(String::from)
            .collect();

        let rewrite = match (cli.rewrite_block, cli.rewrite_at) {
            (Some(block), Some(trigger_at)) => Some(RewritePlan { block, trigger_at }),
            _ => None,
        };

        Ok(Self {
            difficulty: cli.difficulty,
            miner_id: cli.miner.to_string(),
            iterations: cli.iterations.unwrap_or(u64::MAX),
            rewrite,
            stop_when_done: cli.stop,
            skip_peer_wait: cli.no_peers,
            ip: miner_file.node.ip,
            port: miner_file.node.port,
            peers,
            miner_wallet: miner_file.miner,
            sender_wallet,
            receiver_wallet,
            malicious_wallet,
            output_dir: cli.output_dir.clone(),
        })
    }
}

fn read_ini<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let source = ::config::File::from(path).format(FileFormat::Ini);
    let loaded = ::config::Config::builder()
        .add_source(source)
        .build()
        .map_err(|err| NodeError::Config(format!("{}: {err}", path.display())))?;

    loaded
        .try_deserialize()
        .map_err(|err| NodeError::Config(format!("{}: {err}", path.display())))
}

fn read_wallet(path: &Path) -> Result<Wallet> {
    let file: WalletFile = read_ini(path)?;
    Ok(file.wallet)
}

/// Renders a wallet as the INI file the node loads back.
pub fn wallet_ini(address: &str, private_key: &str) -> String {
    format!("[wallet]\naddress = {address}\nprivate_key = {private_key}\n")
}
