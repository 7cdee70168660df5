//! Pool orchestration
//!
//! Ties relay connection events to peer lifecycle: the relay process keeps a
//! membership list and reseeds it, a peer process owns exactly one peer.

pub mod client;
pub mod remote_peer;
pub mod server;

pub use client::ClientPool;
pub use remote_peer::RemotePeer;
pub use server::ServerPool;
