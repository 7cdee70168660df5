//! # peerchain
//!
//! A small proof-of-work ledger replicated by peers that never talk to each
//! other directly: every message goes through a relay that assigns each peer
//! an identifier and forwards envelopes by recipient.
//!
//! ## Layout
//! - `core/`: blocks, transactions, proof-of-work and the ledger itself
//! - `network/`: wire envelopes plus the relay server and client
//! - `peer/`: the per-peer protocol state machine, its mailbox and miner
//! - `pool/`: relay membership and reseeding, and the single-peer client side
//! - `config/`: defaults, TOML file and environment overrides
//! - `cli/`: process arguments and the operator console
//! - `utils/`: hashing and canonical JSON helpers
//!
//! Consensus is longest-valid-chain: a peer adopts the strictly longest chain
//! that validates, collected either from a resolution round over all its
//! neighbors or from a single propagated chain.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod peer;
pub mod pool;
pub mod utils;

#[cfg(test)]
pub mod testnet;

pub use cli::{run_console, Command, OperatorCommand, Opt};
pub use config::Config;
pub use core::{Block, Chain, Ledger, ProofOfWork, Transaction, MINING_REWARD, MINT_SENDER};
pub use error::{ChainError, Result};
pub use network::{
    ClientEvent, Envelope, Message, MessageSink, RelayClient, RelayServer, ServerEvent,
    RELAY_SENDER,
};
pub use peer::{Peer, PeerHandle, PeerState, PeerStatus, Resolution};
pub use pool::{ClientPool, RemotePeer, ServerPool};
pub use utils::{current_timestamp, sha256_digest, sha256_hex, to_canonical_json};
