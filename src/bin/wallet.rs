//! Wallet generator: create a SECP256k1 keypair and persist it as the INI
//! file the node loads.
//!
//! ```bash
//! # Generate a new wallet
//! cargo run --bin wallet -- generate --file config/wallets/emitter.ini
//!
//! # Show the address stored in an existing wallet file
//! cargo run --bin wallet -- address --file config/wallets/emitter.ini
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use aula_chain::config::wallet_ini;
use aula_chain::crypto::signatures;

#[derive(Parser)]
#[command(name = "wallet", version, about = "aula-chain wallet generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new wallet and write it to the given INI file.
    Generate {
        /// Path of the wallet file to create.
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Display the address stored in an existing wallet file.
    Address {
        /// Path of the wallet file to read.
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn generate(path: &Path) -> anyhow::Result<()> {
    let (private_key, address) = signatures::generate_keypair();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, wallet_ini(&address, &private_key))?;

    println!("Wallet written to {}", path.display());
    println!("Address: {address}");
    Ok(())
}

fn show_address(path: &Path) -> anyhow::Result<()> {
    let contents = fs::read_to_string(path)?;
    let address = contents
        .lines()
        .find_map(|line| line.strip_prefix("address = "))
        .ok_or_else(|| anyhow::anyhow!("no address in {}", path.display()))?;

    println!("{address}");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Generate { file } => generate(&file),
        Commands::Address { file } => show_address(&file),
    }
}
