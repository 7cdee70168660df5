// The in-memory ledger one peer owns: its chain, its pending transactions and
// the rules that decide whether somebody else's chain is better than ours.
// Nothing here locks; the owning peer is the only writer.

use crate::core::{Block, Chain, ProofOfWork, Transaction};
use crate::error::{ChainError, Result};
use crate::utils::current_timestamp;
use log::{debug, info};

#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Chain,
    pending: Vec<Transaction>,
    pow: ProofOfWork,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// A fresh ledger seeded with the shared genesis block
    pub fn new() -> Ledger {
        Self::with_proof_of_work(ProofOfWork::new())
    }

    pub(crate) fn with_proof_of_work(pow: ProofOfWork) -> Ledger {
        Ledger {
            chain: vec![Block::generate_genesis_block()],
            pending: vec![],
            pow,
        }
    }

    /// Canonical hash of any block
    pub fn hash(block: &Block) -> Result<String> {
        block.hash()
    }

    pub fn get_chain(&self) -> &[Block] {
        self.chain.as_slice()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn get_pending_transactions(&self) -> &[Transaction] {
        self.pending.as_slice()
    }

    pub fn get_proof_of_work(&self) -> ProofOfWork {
        self.pow
    }

    pub fn last_block(&self) -> Result<&Block> {
        self.chain.last().ok_or(ChainError::EmptyChain)
    }

    pub fn last_block_hash(&self) -> Result<String> {
        self.last_block()?.hash()
    }

    /// Buffer a transaction and report the index of the block it will land in.
    pub fn add_transaction(&mut self, transaction: Transaction) -> u64 {
        self.pending.push(transaction);
        self.chain.len() as u64 + 1
    }

    /// Seal the pending buffer into a new block on top of the chain.
    ///
    /// `previous_hash` defaults to the hash of the current last block.
    pub fn append_block(&mut self, previous_hash: Option<String>, proof: u64) -> Result<Block> {
        let previous_hash = match previous_hash {
            Some(hash) => hash,
            None => self.last_block_hash()?,
        };
        let block = Block::new_block(
            self.chain.len() as u64 + 1,
            current_timestamp()?,
            std::mem::take(&mut self.pending),
            previous_hash,
            proof,
        );
        self.chain.push(block.clone());
        Ok(block)
    }

    /// Blocking proof search against the current last block.
    pub fn mine(&self) -> Result<u64> {
        let last_proof = self.last_block()?.get_proof();
        Ok(self.pow.run(last_proof))
    }

    pub fn is_valid_proof(&self, last_proof: u64, proof: u64) -> bool {
        self.pow.validate(last_proof, proof)
    }

    pub fn is_valid_chain(&self, candidate: &[Block]) -> bool {
        self.validate_chain(candidate).is_ok()
    }

    /// Structural validation of a chain received from elsewhere.
    ///
    /// Indices must run 1..N without gaps. Genesis is exempt from linkage;
    /// every later block must point at the hash of its predecessor and carry
    /// a proof valid against the predecessor's proof.
    pub fn validate_chain(&self, candidate: &[Block]) -> Result<()> {
        let first = candidate
            .first()
            .ok_or_else(|| ChainError::InvalidChain("chain is empty".to_string()))?;
        if first.get_index() != 1 {
            return Err(ChainError::InvalidChain(format!(
                "chain starts at index {}",
                first.get_index()
            )));
        }

        for pair in candidate.windows(2) {
            let (previous, block) = (&pair[0], &pair[1]);
            if block.get_index() != previous.get_index() + 1 {
                return Err(ChainError::InvalidChain(format!(
                    "index {} follows index {}",
                    block.get_index(),
                    previous.get_index()
                )));
            }
            if previous.hash()? != block.get_previous_hash() {
                return Err(ChainError::InvalidChain(format!(
                    "block {} does not link to its predecessor",
                    block.get_index()
                )));
            }
            if !self.is_valid_proof(previous.get_proof(), block.get_proof()) {
                return Err(ChainError::InvalidChain(format!(
                    "block {} carries an invalid proof",
                    block.get_index()
                )));
            }
        }
        Ok(())
    }

    /// Adopt the strictly longest valid chain among `candidates`.
    ///
    /// Returns `true` when the local chain was replaced. Equal length never
    /// replaces. On replacement the pending buffer is discarded.
    pub fn resolve_against_many(&mut self, candidates: Vec<Chain>) -> bool {
        let mut best: Option<Chain> = None;
        let mut best_len = self.chain.len();

        for candidate in candidates {
            if candidate.len() <= best_len {
                continue;
            }
            if let Err(e) = self.validate_chain(&candidate) {
                debug!(
                    "Excluding candidate chain of length {}: {e}",
                    candidate.len()
                );
                continue;
            }
            best_len = candidate.len();
            best = Some(candidate);
        }

        match best {
            Some(chain) => {
                info!(
                    "Replacing chain of length {} with length {}",
                    self.chain.len(),
                    chain.len()
                );
                self.chain = chain;
                self.pending.clear();
                true
            }
            None => false,
        }
    }
}
