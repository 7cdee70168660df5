use crate::core::Transaction;
use crate::error::Result;
use crate::utils::{sha256_hex, to_canonical_json};
use serde::{Deserialize, Serialize};

/// `previousHash` every node puts in its genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "1";
/// `proof` every node puts in its genesis block
pub const GENESIS_PROOF: u64 = 100;
/// Genesis carries a fixed timestamp so all nodes share one identical block
pub const GENESIS_TIMESTAMP: i64 = 0;

/// An ordered, contiguous sequence of blocks starting at index 1
pub type Chain = Vec<Block>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    index: u64,
    timestamp: i64,
    transactions: Vec<Transaction>,
    previous_hash: String,
    proof: u64,
}

impl Block {
    pub fn new_block(
        index: u64,
        timestamp: i64,
        transactions: Vec<Transaction>,
        previous_hash: String,
        proof: u64,
    ) -> Block {
        Block {
            index,
            timestamp,
            transactions,
            previous_hash,
            proof,
        }
    }

    pub fn generate_genesis_block() -> Block {
        Block::new_block(
            1,
            GENESIS_TIMESTAMP,
            vec![],
            String::from(GENESIS_PREVIOUS_HASH),
            GENESIS_PROOF,
        )
    }

    /// SHA-256 of the block's canonical JSON, hex encoded.
    ///
    /// Keys are sorted before hashing, so two structurally equal blocks hash
    /// the same no matter how they were built or decoded.
    pub fn hash(&self) -> Result<String> {
        let canonical = to_canonical_json(self)?;
        Ok(sha256_hex(canonical.as_bytes()))
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_proof(&self) -> u64 {
        self.proof
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block::new_block(
            2,
            1_700_000_000_000,
            vec![Transaction::new("x", "y", 5), Transaction::new_reward("me")],
            "abc".to_string(),
            35293,
        )
    }

    #[test]
    fn test_hash_is_deterministic() {
        let block = sample_block();
        let first = block.hash().unwrap();
        assert_eq!(first, block.hash().unwrap());
        assert_eq!(first, sample_block().hash().unwrap());
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_hash_ignores_json_key_order() {
        let reordered = r#"{
            "proof": 35293,
            "previousHash": "abc",
            "transactions": [
                {"amount": 5, "recipient": "y", "sender": "x"},
                {"recipient": "me", "sender": "0", "amount": 1}
            ],
            "timestamp": 1700000000000,
            "index": 2
        }"#;
        let decoded: Block = serde_json::from_str(reordered).unwrap();
        assert_eq!(decoded.hash().unwrap(), sample_block().hash().unwrap());
    }

    #[test]
    fn test_hash_changes_with_any_field() {
        let base = sample_block().hash().unwrap();
        let mut block = sample_block();
        block.proof += 1;
        assert_ne!(block.hash().unwrap(), base);

        let mut block = sample_block();
        block.previous_hash.push('0');
        assert_ne!(block.hash().unwrap(), base);

        let mut block = sample_block();
        block.transactions.pop();
        assert_ne!(block.hash().unwrap(), base);
    }

    #[test]
    fn test_genesis_is_identical_everywhere() {
        let a = Block::generate_genesis_block();
        let b = Block::generate_genesis_block();
        assert_eq!(a, b);
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
        assert_eq!(a.get_index(), 1);
        assert_eq!(a.get_previous_hash(), GENESIS_PREVIOUS_HASH);
        assert_eq!(a.get_proof(), GENESIS_PROOF);
        assert!(a.get_transactions().is_empty());
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(sample_block()).unwrap();
        assert!(json.get("previousHash").is_some());
        assert!(json.get("previous_hash").is_none());
        assert_eq!(json["transactions"][1]["sender"], "0");
    }
}
