//! Proof-of-work: the nonce search, with an optional cooperative probe
//! that lets a better peer chain preempt the work.

use tracing::debug;

use crate::blockchain::{Block, Chain};
use crate::consensus;

/// Outcome of a mining attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowOutcome {
    /// The search finished; the hash clears the difficulty prefix.
    Solved(String),
    /// A consensus probe adopted a better chain; the block must be dropped.
    Preempted,
}

/// Nonce period of the cooperative consensus probe: the difficulty-length
/// repunit (1, 11, 111, ...). The probe stays cheap because its period
/// grows with the expected search length.
pub fn probe_interval(difficulty: usize) -> u64 {
    (0..difficulty).fold(0u64, |acc, _| acc * 10 + 1).max(1)
}

/// Searches a nonce whose block hash carries `chain.difficulty` leading
/// zero hex digits.
///
/// With `cooperative` set, every positive nonce multiple of
/// [`probe_interval`] runs a consensus round; if that round adopts a peer
/// chain the search aborts with [`PowOutcome::Preempted`]. The rewrite
/// attack mines non-cooperatively so it never abandons itself mid-attack.
pub fn proof_of_work(chain: &mut Chain, block: &mut Block, cooperative: bool) -> PowOutcome {
    let target = "0".repeat(chain.difficulty);
    let probe = probe_interval(chain.difficulty);

    let mut hash = block.refresh_hash();
    while !hash.starts_with(&target) {
        block.header.nonce += 1;
        hash = block.refresh_hash();

        if cooperative && block.header.nonce % probe == 0 && consensus::run(chain) {
            debug!(
                index = block.index,
                nonce = block.header.nonce,
                "mining preempted by a better peer chain"
            );
            return PowOutcome::Preempted;
        }
    }

    PowOutcome::Solved(hash)
}
