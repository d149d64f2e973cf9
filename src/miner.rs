//! Mining: the single-block `mine` operation and the driver loop a node
//! runs until its iteration cap is reached.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::blockchain::block::{Metric, Transaction};
use crate::blockchain::{Attacker, Block, Chain};
use crate::config::Settings;
use crate::consensus;
use crate::consensus::pow::{proof_of_work, PowOutcome};
use crate::error::Result;
use crate::network::sync;

/// How long the driver sleeps between polls while waiting for peers.
const PEER_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Mines one block from the pending pool. Returns `true` when a block was
/// appended.
///
/// On preemption (a consensus probe adopted a better chain mid-search) the
/// half-mined block is dropped and the pending pool is left exactly as it
/// was at entry. A consensus round always closes the attempt.
pub fn mine(chain: &mut Chain) -> bool {
    if chain.pending_transactions.is_empty() {
        return false;
    }

    let started = Instant::now();
    let transactions = chain.pending_transactions.clone();
    let mut block = Block::new(chain.tip().index + 1, transactions.clone());
    let tip_hash = chain.tip().hash.clone();
    block.build_header(
        &tip_hash,
        &Transaction::list_canonical(&transactions),
        chain.difficulty,
    );

    info!(index = block.index, "mining block");
    let outcome = proof_of_work(chain, &mut block, true);
    let elapsed = started.elapsed().as_secs_f64();

    let appended = match outcome {
        PowOutcome::Preempted => false,
        PowOutcome::Solved(hash) => {
            let nonce = block.header.nonce;
            let hash_power_khs = (nonce as f64 / elapsed / 1000.0).round();

            block.mining_time = Metric::Number((elapsed * 100.0).round() / 100.0);
            block.hash_power = Metric::Number(hash_power_khs);
            block.mined_by = chain.miner_id.clone();
            block.compute_size();

            if chain.is_hash_valid(&block, &hash) && chain.add_block(block, &hash) {
                chain.pending_transactions.clear();
                info!(elapsed_secs = elapsed, hash_power_khs, nonce, "hash found");
                true
            } else {
                false
            }
        }
    };

    consensus::run(chain);
    appended
}

/// Blocks until every configured peer answers a chain fetch.
fn wait_for_peers(chain: &Arc<Mutex<Chain>>) {
    loop {
        let not_ready = sync::discover_peer_chains(&mut chain.lock());
        if not_ready.is_empty() {
            return;
        }
        info!(?not_ready, "waiting for peers");
        thread::sleep(PEER_POLL_INTERVAL);
    }
}

/// Seeds the malicious pool and runs the rewrite attack once.
fn run_rewrite(chain: &mut Chain, settings: &Settings, attacker: &mut Attacker, index: u64) {
    attacker.add_reward_transaction(&chain.miner_address);
    if let Err(err) = attacker.add_transaction(
        &settings.sender_wallet.address,
        &settings.sender_wallet.private_key,
        &settings.malicious_wallet.address,
        "10",
        "Transaccion maliciosa",
    ) {
        warn!(%err, "malicious transaction rejected");
    }
    attacker.rewrite_chain(chain, index);
}

/// The mining loop: each iteration pools the reward transaction plus one
/// signed user transaction and mines, firing the rewrite attack once when
/// its trigger index is reached. Ends when the tip index reaches the
/// iteration cap, then persists the run's chains.
pub fn run_driver(chain: &Arc<Mutex<Chain>>, settings: &Settings) -> Result<()> {
    let mut attacker = Attacker::new();
    let mut rewritten = false;

    if !settings.skip_peer_wait {
        wait_for_peers(chain);
    }

    while chain.lock().tip().index < settings.iterations {
        if let Some(plan) = &settings.rewrite {
            if !rewritten && plan.trigger_at <= chain.lock().tip().index {
                run_rewrite(&mut chain.lock(), settings, &mut attacker, plan.block);
                rewritten = true;
                continue;
            }
        }

        let mut guard = chain.lock();
        guard.add_reward_transaction();
        if let Err(err) = guard.add_transaction(
            &settings.sender_wallet.address,
            &settings.sender_wallet.private_key,
            &settings.receiver_wallet.address,
            "0.02",
            "Transaccion normal",
        ) {
            warn!(%err, "transaction rejected");
        }
        mine(&mut guard);
    }

    let chain_path = normal_output_path(settings);
    chain.lock().save_to_file(&chain_path)?;
    info!(path = %chain_path.display(), "chain persisted");

    if rewritten {
        let attack_path = malicious_output_path(settings);
        attacker.save_to_file(&attack_path)?;
        info!(path = %attack_path.display(), "rewritten chain persisted");
    }

    Ok(())
}

fn normal_output_path(settings: &Settings) -> std::path::PathBuf {
    settings
        .output_dir
        .join("normal")
        .join("blockchains")
        .join(format!("blockchain-{}.json", settings.miner_id))
}

fn malicious_output_path(settings: &Settings) -> std::path::PathBuf {
    settings
        .output_dir
        .join("malicioso")
        .join("blockchains")
        .join(format!("blockchain-maliciosa-{}.json", settings.miner_id))
}
