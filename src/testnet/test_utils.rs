//! Test utilities for peer and ledger testing

use crate::core::{Block, Chain, Ledger, ProofOfWork, Transaction};
use crate::error::{ChainError, Result};
use crate::network::{Envelope, Message, MessageSink};
use crate::peer::Peer;
use std::sync::{Arc, Mutex};

/// Leading zeros required by test ledgers; keeps proof searches instant
pub const TEST_DIFFICULTY: usize = 2;

/// Transport double that keeps every envelope it is asked to send
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Envelope>>,
    closed: Mutex<bool>,
}

impl RecordingSink {
    pub fn new() -> Arc<RecordingSink> {
        Arc::new(RecordingSink::default())
    }

    /// Remove and return everything sent so far
    pub fn take(&self) -> Vec<Envelope> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    /// Make every further send fail as if the relay went away
    pub fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }
}

impl MessageSink for RecordingSink {
    fn send(&self, envelope: Envelope) -> Result<()> {
        if *self.closed.lock().unwrap() {
            return Err(ChainError::Disconnected("test sink closed".to_string()));
        }
        self.sent.lock().unwrap().push(envelope);
        Ok(())
    }
}

pub fn test_proof_of_work() -> ProofOfWork {
    ProofOfWork::with_difficulty(TEST_DIFFICULTY)
}

pub fn create_test_ledger() -> Ledger {
    Ledger::with_proof_of_work(test_proof_of_work())
}

/// A peer on a recording sink, already identified as `id`
pub fn create_identified_peer(id: &str) -> (Peer, Arc<RecordingSink>) {
    let sink = RecordingSink::new();
    let mut peer = Peer::with_proof_of_work(sink.clone(), test_proof_of_work());
    peer.handle_message("relay", Message::SetUuid(id.to_string()))
        .unwrap();
    (peer, sink)
}

/// A valid chain of `extra_blocks` blocks on top of genesis
pub fn create_test_chain(extra_blocks: usize) -> Chain {
    let mut ledger = create_test_ledger();
    for _ in 0..extra_blocks {
        let proof = ledger.mine().unwrap();
        ledger.add_transaction(Transaction::new_reward("test-miner"));
        ledger.append_block(None, proof).unwrap();
    }
    ledger.get_chain().to_vec()
}

/// Copy of `chain` with one field of one block overwritten through its JSON form
pub fn tamper_chain(chain: &[Block], position: usize, field: &str, value: serde_json::Value) -> Chain {
    let mut json = serde_json::to_value(chain).unwrap();
    json[position][field] = value;
    serde_json::from_value(json).unwrap()
}
