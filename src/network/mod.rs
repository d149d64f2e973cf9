//! Network module: the served HTTP surface and the peer-chain fetcher.

pub mod server;
pub mod sync;

pub use server::serve;
pub use sync::discover_peer_chains;
