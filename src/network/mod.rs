//! Relay transport
//!
//! The relay is a switchboard: peers connect to it, get an identifier, and
//! address envelopes to each other by identifier. The server side never
//! decodes payloads; the client side hands typed [`Message`]s to its peer.
//! Connection notifications are delivered as closed enums over channels.

pub mod envelope;
pub mod relay_client;
pub mod relay_server;

pub use envelope::{write_envelope, Envelope, EnvelopeReader, Message, RELAY_SENDER};
pub use relay_client::{ClientEvent, RelayClient};
pub use relay_server::{RelayServer, ServerEvent};

use crate::error::Result;

/// Outbound half of a transport, as seen by whoever emits envelopes.
pub trait MessageSink: Send + Sync {
    fn send(&self, envelope: Envelope) -> Result<()>;
}
