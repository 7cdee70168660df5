//! Test helpers shared by the unit tests
//!
//! An in-memory transport that records every envelope instead of sending it,
//! plus small builders for ledgers and chains.

pub mod test_utils;

pub use test_utils::*;
