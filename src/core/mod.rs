//! Core ledger functionality
//!
//! Blocks, transactions, the prefix-match proof-of-work and the ledger that
//! ties them together with chain validation and longest-valid-chain
//! resolution.

pub mod block;
pub mod ledger;
pub mod proof_of_work;
pub mod transaction;

pub use block::{Block, Chain};
pub use ledger::Ledger;
pub use proof_of_work::ProofOfWork;
pub use transaction::{Transaction, MINING_REWARD, MINT_SENDER};
