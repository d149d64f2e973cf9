//! Peer synchronization: fetch each peer's chain over HTTP, validate it and
//! cache it for the consensus vote.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::blockchain::{Block, Chain};

/// Per-peer fetch window. A peer that cannot answer within it is treated
/// as not ready and retried on the next round.
const PEER_TIMEOUT: Duration = Duration::from_secs(1);

/// Fetches every peer's chain into `chain.peer_chains` and returns the
/// peers that could not be reached (or decoded) this round.
///
/// The cache is cleared on entry, so after the call it holds exactly the
/// valid chains of the current round. Chains failing validation are dropped
/// without being reported as "not ready" — the peer answered, it just lied.
pub fn discover_peer_chains(chain: &mut Chain) -> Vec<String> {
    chain.peer_chains.clear();
    if chain.peers.is_empty() {
        return Vec::new();
    }

    let client = match Client::builder().timeout(PEER_TIMEOUT).build() {
        Ok(client) => client,
        Err(err) => {
            warn!(%err, "could not build the peer HTTP client");
            return chain.peers.clone();
        }
    };

    let mut not_ready = Vec::new();
    for peer in chain.peers.clone() {
        match fetch_chain(&client, &peer) {
            Ok(blocks) => {
                if chain.is_chain_valid(&blocks) {
                    chain.peer_chains.push(blocks);
                } else {
                    warn!(peer = %peer, "peer served an invalid chain; dropping it");
                }
            }
            Err(err) => {
                debug!(peer = %peer, %err, "peer not ready");
                not_ready.push(peer);
            }
        }
    }

    not_ready
}

/// One peer fetch: blocks are reconstructed straight from the JSON record
/// dump; validation is the caller's duty.
fn fetch_chain(client: &Client, peer: &str) -> reqwest::Result<Vec<Block>> {
    client
        .get(format!("{peer}/blockchain"))
        .send()?
        .error_for_status()?
        .json()
}
