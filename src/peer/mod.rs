//! Peer protocol
//!
//! [`Peer`] is the state machine that owns one ledger and reacts to relay
//! commands. [`PeerHandle`] runs it on a mailbox thread so the relay reader,
//! the operator and the miner can all reach it safely.

pub mod handle;
pub mod miner;
pub mod state;

pub use handle::{PeerHandle, PeerStatus};
pub use miner::Miner;
pub use state::{Peer, PeerState, Resolution};
