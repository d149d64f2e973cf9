//! Consensus: elect the longest valid chain (earliest tip timestamp as the
//! tie-break) among the local chain and the last round of peer fetches, and
//! adopt the winner wholesale.

pub mod pow;

pub use pow::{proof_of_work, PowOutcome};

use tracing::info;

use crate::blockchain::Chain;
use crate::network::sync;

/// Runs one full consensus round: refresh the peer-chain cache, then vote.
/// Returns `true` when the local chain was replaced.
pub fn run(chain: &mut Chain) -> bool {
    sync::discover_peer_chains(chain);
    elect(chain)
}

/// Votes over the cached peer chains without touching the network.
///
/// Longer beats shorter; among equal lengths with differing tip timestamps
/// the earlier tip wins. Replacement is wholesale and leaves the pending
/// transaction pool alone.
pub fn elect(chain: &mut Chain) -> bool {
    let local_length = chain.blocks.len();
    let local_tip_timestamp = chain.tip().header.timestamp;

    let mut winner: Option<usize> = None;
    let mut winner_length = local_length;
    let mut winner_tip_timestamp = local_tip_timestamp;

    for (candidate_index, candidate) in chain.peer_chains.iter().enumerate() {
        let Some(tip) = candidate.last() else {
            continue;
        };

        if candidate.len() > winner_length {
            winner = Some(candidate_index);
            winner_length = candidate.len();
            winner_tip_timestamp = tip.header.timestamp;
        } else if candidate.len() == winner_length
            && tip.header.timestamp != winner_tip_timestamp
            && winner_tip_timestamp > tip.header.timestamp
        {
            winner = Some(candidate_index);
            winner_tip_timestamp = tip.header.timestamp;
        }
    }

    let Some(candidate_index) = winner else {
        return false;
    };

    let longer = winner_length > local_length;
    let earlier_tip = winner_length == local_length
        && winner_tip_timestamp != local_tip_timestamp
        && local_tip_timestamp > winner_tip_timestamp;

    if longer || earlier_tip {
        let adopted = chain.peer_chains[candidate_index].clone();
        info!(
            from_length = local_length,
            to_length = adopted.len(),
            "adopting peer chain"
        );
        chain.replace(adopted);
        return true;
    }

    false
}
