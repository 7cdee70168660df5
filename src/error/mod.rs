//! Error handling for the ledger, relay and peer protocol
//!
//! Every fallible operation in the crate returns [`Result`]. None of these
//! conditions is fatal for the process: callers log them and carry on.

use std::fmt;

/// Result type alias for peerchain operations
pub type Result<T> = std::result::Result<T, ChainError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ChainError {
    /// A transaction, block or envelope missing required fields
    MalformedInput(String),
    /// Candidate chain failed structural validation
    InvalidChain(String),
    /// Relay asked to forward to an identifier with no live connection
    UnknownRecipient(String),
    /// The tip of a chain was requested on an empty chain
    EmptyChain,
    /// Operation requires a peer that has received its identifier
    NotIdentified,
    /// Proof-of-work search was cancelled or failed
    Mining(String),
    /// Socket level errors
    Network(String),
    /// Configuration loading errors
    Config(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// A mailbox or connection on the other side has gone away
    Disconnected(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::MalformedInput(msg) => write!(f, "Malformed input: {msg}"),
            ChainError::InvalidChain(msg) => write!(f, "Invalid chain: {msg}"),
            ChainError::UnknownRecipient(id) => write!(f, "Unknown recipient: {id}"),
            ChainError::EmptyChain => write!(f, "Chain is empty"),
            ChainError::NotIdentified => write!(f, "Peer has not been assigned an identifier"),
            ChainError::Mining(msg) => write!(f, "Mining error: {msg}"),
            ChainError::Network(msg) => write!(f, "Network error: {msg}"),
            ChainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            ChainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            ChainError::Io(msg) => write!(f, "I/O error: {msg}"),
            ChainError::Disconnected(msg) => write!(f, "Disconnected: {msg}"),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}
