use crate::error::{ChainError, Result};
use serde::{Deserialize, Serialize};

/// Sender label of freshly minted coins; no prior owner exists.
pub const MINT_SENDER: &str = "0";

/// Amount credited to a miner for each forged block
pub const MINING_REWARD: i64 = 1;

/// Unauthenticated value transfer between two labels.
///
/// Transactions carry no identity beyond their fields, so two equal
/// transactions are allowed to sit in the same block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    sender: String,
    recipient: String,
    amount: i64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: i64) -> Transaction {
        Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    /// The reward a miner pays itself when it forges a block
    pub fn new_reward(recipient: &str) -> Transaction {
        Transaction::new(MINT_SENDER, recipient, MINING_REWARD)
    }

    /// Parse a transaction submitted from outside the node.
    ///
    /// Missing or mistyped fields are rejected here so they never reach the
    /// pending buffer.
    pub fn from_json(json: &str) -> Result<Transaction> {
        serde_json::from_str(json).map_err(|e| ChainError::MalformedInput(e.to_string()))
    }

    pub fn is_reward(&self) -> bool {
        self.sender == MINT_SENDER
    }

    pub fn get_sender(&self) -> &str {
        self.sender.as_str()
    }

    pub fn get_recipient(&self) -> &str {
        self.recipient.as_str()
    }

    pub fn get_amount(&self) -> i64 {
        self.amount
    }
}
