use crate::core::{Block, Chain, Ledger, ProofOfWork, Transaction};
use crate::error::{ChainError, Result};
use crate::network::{Envelope, Message, MessageSink};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Where a peer is in its protocol lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// Waiting for `setUuid`
    Unidentified,
    /// Has an identifier and a ledger, no neighbor list yet
    Identified,
    /// Knows its neighbors, no resolution round in flight
    Seeded,
    /// Collecting `getChainResponse`s from every neighbor
    Resolving,
}

/// Outcome of one longest-chain decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub candidates: usize,
    pub replaced: bool,
}

/// One participant's protocol state machine.
///
/// Owns its ledger outright and only reaches other peers by sending
/// envelopes through its sink. It is driven from a single thread; see
/// [`crate::peer::PeerHandle`].
pub struct Peer {
    id: Option<String>,
    ledger: Option<Ledger>,
    neighbors: HashSet<String>,
    responses: HashMap<String, Chain>,
    seeded: bool,
    round_open: bool,
    sink: Arc<dyn MessageSink>,
    pow: ProofOfWork,
}

impl Peer {
    pub fn new(sink: Arc<dyn MessageSink>) -> Peer {
        Self::with_proof_of_work(sink, ProofOfWork::new())
    }

    pub(crate) fn with_proof_of_work(sink: Arc<dyn MessageSink>, pow: ProofOfWork) -> Peer {
        Peer {
            id: None,
            ledger: None,
            neighbors: HashSet::new(),
            responses: HashMap::new(),
            seeded: false,
            round_open: false,
            sink,
            pow,
        }
    }

    pub fn get_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn state(&self) -> PeerState {
        if self.id.is_none() {
            PeerState::Unidentified
        } else if self.round_open {
            PeerState::Resolving
        } else if self.seeded {
            PeerState::Seeded
        } else {
            PeerState::Identified
        }
    }

    /// Current neighbor identifiers, sorted
    pub fn get_neighbors(&self) -> Vec<String> {
        let mut neighbors: Vec<String> = self.neighbors.iter().cloned().collect();
        neighbors.sort();
        neighbors
    }

    pub fn ledger(&self) -> Result<&Ledger> {
        self.ledger.as_ref().ok_or(ChainError::NotIdentified)
    }

    fn ledger_mut(&mut self) -> Result<&mut Ledger> {
        self.ledger.as_mut().ok_or(ChainError::NotIdentified)
    }

    pub fn get_chain(&self) -> Result<Chain> {
        Ok(self.ledger()?.get_chain().to_vec())
    }

    fn label(&self) -> &str {
        self.id.as_deref().unwrap_or("<unidentified>")
    }

    /// Apply one inbound command.
    ///
    /// Returns the resolution decision when the command produced one: every
    /// `propagateChain`, and the `getChainResponse` that completes a round.
    pub fn handle_message(&mut self, sender: &str, message: Message) -> Result<Option<Resolution>> {
        match message {
            Message::SetUuid(id) => {
                self.set_uuid(id);
                Ok(None)
            }
            message if self.id.is_none() => {
                warn!(
                    "Peer {}: ignoring {} from {sender} before identification",
                    self.label(),
                    message.command()
                );
                Ok(None)
            }
            Message::Seed(neighbors) => {
                self.seed(neighbors);
                Ok(None)
            }
            Message::PropagateChain(chain) => self.resolve(vec![chain]).map(Some),
            Message::GetChain => {
                let chain = self.get_chain()?;
                self.send(sender, Message::GetChainResponse(chain))?;
                Ok(None)
            }
            Message::GetChainResponse(chain) => self.record_response(sender, chain),
        }
    }

    fn set_uuid(&mut self, id: String) {
        if let Some(current) = &self.id {
            warn!("Peer {current}: ignoring second setUuid ({id})");
            return;
        }
        info!("Peer {id}: identifier assigned");
        self.ledger = Some(Ledger::with_proof_of_work(self.pow));
        self.id = Some(id);
    }

    fn seed(&mut self, neighbors: Vec<String>) {
        let own = self.id.clone();
        self.neighbors = neighbors
            .into_iter()
            .filter(|neighbor| Some(neighbor) != own.as_ref())
            .collect();
        self.responses.clear();
        self.seeded = true;
        info!(
            "Peer {}: received seed with {} neighbor(s)",
            self.label(),
            self.neighbors.len()
        );

        if self.neighbors.is_empty() {
            self.round_open = false;
            return;
        }

        self.round_open = true;
        for neighbor in self.get_neighbors() {
            if let Err(e) = self.send(&neighbor, Message::GetChain) {
                warn!("Peer {}: failed to ask {neighbor} for its chain: {e}", self.label());
            }
        }
    }

    fn record_response(&mut self, sender: &str, chain: Chain) -> Result<Option<Resolution>> {
        if !self.round_open || !self.neighbors.contains(sender) {
            debug!(
                "Peer {}: ignoring chain from {sender} outside a resolution round",
                self.label()
            );
            return Ok(None);
        }

        self.responses.insert(sender.to_string(), chain);
        if self.responses.len() < self.neighbors.len() {
            return Ok(None);
        }

        self.round_open = false;
        let candidates: Vec<Chain> = self.responses.drain().map(|(_, chain)| chain).collect();
        self.resolve(candidates).map(Some)
    }

    fn resolve(&mut self, candidates: Vec<Chain>) -> Result<Resolution> {
        let count = candidates.len();
        let ledger = self.ledger_mut()?;
        let replaced = ledger.resolve_against_many(candidates);
        let length = ledger.len();

        if replaced {
            info!("Peer {}: chain replaced, length is now {length}", self.label());
        } else {
            debug!("Peer {}: chain is authoritative at length {length}", self.label());
        }
        Ok(Resolution {
            candidates: count,
            replaced,
        })
    }

    /// Buffer a transaction locally. It only travels once mined into a block.
    pub fn add_transaction(&mut self, transaction: Transaction) -> Result<u64> {
        Ok(self.ledger_mut()?.add_transaction(transaction))
    }

    /// What a proof search has to work from: the rule and the tip's proof
    pub fn mining_target(&self) -> Result<(ProofOfWork, u64)> {
        let ledger = self.ledger()?;
        Ok((ledger.get_proof_of_work(), ledger.last_block()?.get_proof()))
    }

    /// Blocking mine-and-forge on the calling thread.
    pub fn mine(&mut self) -> Result<Block> {
        let proof = self.ledger()?.mine()?;
        self.forge(proof)
    }

    /// Turn a found proof into a block: reward ourselves, append, propagate.
    ///
    /// Fails with `Mining` when `proof` no longer extends the tip, which
    /// happens when the chain was replaced while the search ran.
    pub fn forge(&mut self, proof: u64) -> Result<Block> {
        let id = self.id.clone().ok_or(ChainError::NotIdentified)?;
        let ledger = self.ledger_mut()?;

        let last_proof = ledger.last_block()?.get_proof();
        if !ledger.is_valid_proof(last_proof, proof) {
            return Err(ChainError::Mining(format!(
                "proof {proof} does not extend the current tip"
            )));
        }

        ledger.add_transaction(Transaction::new_reward(&id));
        let block = ledger.append_block(None, proof)?;
        info!("Peer {id}: new block {} forged", block.get_index());

        self.propagate()?;
        Ok(block)
    }

    fn propagate(&self) -> Result<()> {
        if self.neighbors.is_empty() {
            return Ok(());
        }
        let chain = self.get_chain()?;
        for neighbor in self.get_neighbors() {
            if let Err(e) = self.send(&neighbor, Message::PropagateChain(chain.clone())) {
                warn!("Peer {}: failed to propagate to {neighbor}: {e}", self.label());
            }
        }
        Ok(())
    }

    fn send(&self, recipient: &str, message: Message) -> Result<()> {
        let sender = self.id.as_deref().ok_or(ChainError::NotIdentified)?;
        self.sink.send(Envelope::new(sender, recipient, message))
    }
}
