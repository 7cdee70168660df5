//! Utility functions and helpers
//!
//! Hashing, timestamps and the canonical JSON encoding used to hash blocks.

pub mod crypto;
pub mod serialization;

pub use crypto::{current_timestamp, sha256_digest, sha256_hex};
pub use serialization::to_canonical_json;
