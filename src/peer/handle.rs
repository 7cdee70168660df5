use crate::core::{Block, Chain, Transaction};
use crate::error::{ChainError, Result};
use crate::network::{Envelope, MessageSink};
use crate::peer::{Miner, Peer, PeerState};
use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

/// Snapshot of a running peer, for status displays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerStatus {
    pub id: Option<String>,
    pub state: PeerState,
    pub chain_length: usize,
    pub pending_transactions: usize,
    pub neighbors: usize,
    pub mining: bool,
}

enum Command {
    Deliver(Envelope),
    AddTransaction(Transaction, Sender<Result<u64>>),
    Mine(Sender<Result<Block>>),
    StopMiner,
    ProofFound { generation: u64, proof: Option<u64> },
    GetChain(Sender<Result<Chain>>),
    GetNeighbors(Sender<Vec<String>>),
    GetStatus(Sender<PeerStatus>),
    Shutdown,
}

struct HandleInner {
    mailbox: Sender<Command>,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        let _ = self.mailbox.send(Command::Shutdown);
    }
}

/// Thread-safe front for a [`Peer`].
///
/// The peer lives on its own mailbox thread and sees inbound envelopes,
/// local requests and miner results one at a time, in arrival order. The
/// thread stops on [`PeerHandle::shutdown`] or when the last handle drops.
#[derive(Clone)]
pub struct PeerHandle {
    inner: Arc<HandleInner>,
}

impl PeerHandle {
    pub fn spawn(sink: Arc<dyn MessageSink>) -> PeerHandle {
        Self::spawn_peer(Peer::new(sink))
    }

    pub(crate) fn spawn_peer(peer: Peer) -> PeerHandle {
        let (mailbox, commands) = mpsc::channel();
        let worker = Mailbox {
            peer,
            commands,
            mailbox: mailbox.clone(),
            miner: None,
            next_generation: 0,
            waiting: Vec::new(),
        };
        thread::spawn(move || worker.run());
        PeerHandle {
            inner: Arc::new(HandleInner { mailbox }),
        }
    }

    fn post(&self, command: Command) -> Result<()> {
        self.inner
            .mailbox
            .send(command)
            .map_err(|_| ChainError::Disconnected("peer mailbox closed".to_string()))
    }

    fn request<T>(&self, build: impl FnOnce(Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = mpsc::channel();
        self.post(build(reply))?;
        response
            .recv()
            .map_err(|_| ChainError::Disconnected("peer mailbox closed".to_string()))
    }

    /// Queue an envelope that arrived from the relay.
    pub fn deliver(&self, envelope: Envelope) -> Result<()> {
        self.post(Command::Deliver(envelope))
    }

    /// Buffer a transaction; returns the index of the block that will hold it.
    pub fn add_transaction(&self, transaction: Transaction) -> Result<u64> {
        self.request(|reply| Command::AddTransaction(transaction, reply))?
    }

    /// Mine the next block and wait for it.
    ///
    /// The search runs off the mailbox thread, so the peer keeps answering
    /// its neighbors meanwhile. Callers that ask while a search is running
    /// share its result.
    pub fn mine(&self) -> Result<Block> {
        self.request(Command::Mine)?
    }

    /// Abandon the running search; waiting `mine` calls fail with `Mining`.
    pub fn stop_miner(&self) -> Result<()> {
        self.post(Command::StopMiner)
    }

    pub fn chain(&self) -> Result<Chain> {
        self.request(Command::GetChain)?
    }

    pub fn neighbors(&self) -> Result<Vec<String>> {
        self.request(Command::GetNeighbors)
    }

    pub fn status(&self) -> Result<PeerStatus> {
        self.request(Command::GetStatus)
    }

    pub fn id(&self) -> Result<Option<String>> {
        Ok(self.status()?.id)
    }

    pub fn state(&self) -> Result<PeerState> {
        Ok(self.status()?.state)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.post(Command::Shutdown)
    }
}

struct Mailbox {
    peer: Peer,
    commands: Receiver<Command>,
    mailbox: Sender<Command>,
    miner: Option<Miner>,
    next_generation: u64,
    waiting: Vec<Sender<Result<Block>>>,
}

impl Mailbox {
    fn run(mut self) {
        while let Ok(command) = self.commands.recv() {
            match command {
                Command::Deliver(envelope) => self.deliver(envelope),
                Command::AddTransaction(transaction, reply) => {
                    let _ = reply.send(self.peer.add_transaction(transaction));
                }
                Command::Mine(reply) => self.request_mine(reply),
                Command::StopMiner => self.stop_miner("mining cancelled"),
                Command::ProofFound { generation, proof } => self.proof_found(generation, proof),
                Command::GetChain(reply) => {
                    let _ = reply.send(self.peer.get_chain());
                }
                Command::GetNeighbors(reply) => {
                    let _ = reply.send(self.peer.get_neighbors());
                }
                Command::GetStatus(reply) => {
                    let _ = reply.send(self.status());
                }
                Command::Shutdown => {
                    self.stop_miner("peer shut down");
                    break;
                }
            }
        }
        debug!("Peer {}: mailbox closed", self.label());
    }

    fn label(&self) -> String {
        self.peer.get_id().unwrap_or("<unidentified>").to_string()
    }

    fn status(&self) -> PeerStatus {
        let ledger = self.peer.ledger().ok();
        PeerStatus {
            id: self.peer.get_id().map(str::to_string),
            state: self.peer.state(),
            chain_length: ledger.map_or(0, |l| l.len()),
            pending_transactions: ledger.map_or(0, |l| l.get_pending_transactions().len()),
            neighbors: self.peer.get_neighbors().len(),
            mining: self.miner.is_some(),
        }
    }

    fn deliver(&mut self, envelope: Envelope) {
        let command = envelope.message.command();
        match self.peer.handle_message(&envelope.sender, envelope.message) {
            Ok(Some(resolution)) if resolution.replaced && self.miner.is_some() => {
                info!("Peer {}: tip changed, restarting proof search", self.label());
                self.start_miner();
            }
            Ok(_) => {}
            Err(e) => warn!(
                "Peer {}: failed to handle {command} from {}: {e}",
                self.label(),
                envelope.sender
            ),
        }
    }

    fn request_mine(&mut self, reply: Sender<Result<Block>>) {
        if let Err(e) = self.peer.mining_target() {
            let _ = reply.send(Err(e));
            return;
        }
        self.waiting.push(reply);
        if self.miner.is_none() {
            self.start_miner();
        }
    }

    /// Start a fresh search on the current tip, replacing any running one.
    fn start_miner(&mut self) {
        let (pow, last_proof) = match self.peer.mining_target() {
            Ok(target) => target,
            Err(e) => {
                self.miner = None;
                self.fail_waiting(e);
                return;
            }
        };
        let generation = self.next_generation;
        self.next_generation += 1;

        let mailbox = self.mailbox.clone();
        self.miner = Some(Miner::spawn(generation, pow, last_proof, move |proof| {
            let _ = mailbox.send(Command::ProofFound { generation, proof });
        }));
    }

    fn proof_found(&mut self, generation: u64, proof: Option<u64>) {
        match &self.miner {
            Some(miner) if miner.get_generation() == generation => {}
            _ => {
                debug!("Peer {}: discarding superseded search {generation}", self.label());
                return;
            }
        }
        self.miner = None;

        let Some(proof) = proof else {
            return;
        };
        match self.peer.forge(proof) {
            Ok(block) => {
                for reply in self.waiting.drain(..) {
                    let _ = reply.send(Ok(block.clone()));
                }
            }
            Err(ChainError::Mining(reason)) => {
                info!("Peer {}: {reason}, searching again", self.label());
                self.start_miner();
            }
            Err(e) => self.fail_waiting(e),
        }
    }

    fn stop_miner(&mut self, reason: &str) {
        if let Some(miner) = self.miner.take() {
            miner.stop();
        }
        self.fail_waiting(ChainError::Mining(reason.to_string()));
    }

    fn fail_waiting(&mut self, error: ChainError) {
        for reply in self.waiting.drain(..) {
            let _ = reply.send(Err(error.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ProofOfWork, MINT_SENDER};
    use crate::network::Message;
    use crate::testnet::{create_test_chain, test_proof_of_work, RecordingSink};
    use std::time::{Duration, Instant};

    fn spawn_test_peer(pow: ProofOfWork) -> (PeerHandle, Arc<RecordingSink>) {
        let sink = RecordingSink::new();
        let handle = PeerHandle::spawn_peer(Peer::with_proof_of_work(sink.clone(), pow));
        (handle, sink)
    }

    fn identify(handle: &PeerHandle, id: &str) {
        handle
            .deliver(Envelope::new("relay", id, Message::SetUuid(id.to_string())))
            .unwrap();
    }

    #[test]
    fn test_requests_before_identification_fail() {
        let (handle, _sink) = spawn_test_peer(test_proof_of_work());
        assert_eq!(handle.state().unwrap(), PeerState::Unidentified);
        assert_eq!(handle.mine(), Err(ChainError::NotIdentified));
        assert_eq!(
            handle.add_transaction(Transaction::new("x", "y", 1)),
            Err(ChainError::NotIdentified)
        );
    }

    #[test]
    fn test_mine_forges_rewarded_block() {
        let (handle, _sink) = spawn_test_peer(test_proof_of_work());
        identify(&handle, "p1");

        assert_eq!(
            handle.add_transaction(Transaction::new("x", "y", 5)).unwrap(),
            2
        );
        let block = handle.mine().unwrap();
        assert_eq!(block.get_index(), 2);
        assert_eq!(block.get_transactions()[1].get_sender(), MINT_SENDER);
        assert_eq!(handle.chain().unwrap().len(), 2);

        let status = handle.status().unwrap();
        assert_eq!(status.id.as_deref(), Some("p1"));
        assert_eq!(status.pending_transactions, 0);
        assert!(!status.mining);
    }

    #[test]
    fn test_concurrent_mine_requests_share_block() {
        let (handle, _sink) = spawn_test_peer(test_proof_of_work());
        identify(&handle, "p1");

        let other = handle.clone();
        let worker = thread::spawn(move || other.mine());
        let mine = handle.mine().unwrap();
        let theirs = worker.join().unwrap().unwrap();

        // Either both waited on one search, or the second started after the first
        assert!(mine.get_index() >= 2 && theirs.get_index() >= 2);
        assert_eq!(
            handle.chain().unwrap().len() as u64,
            mine.get_index().max(theirs.get_index())
        );
    }

    #[test]
    fn test_stop_miner_fails_waiting_callers() {
        let (handle, _sink) = spawn_test_peer(ProofOfWork::with_difficulty(64));
        identify(&handle, "p1");

        let other = handle.clone();
        let worker = thread::spawn(move || other.mine());

        let deadline = Instant::now() + Duration::from_secs(10);
        while !handle.status().unwrap().mining {
            assert!(Instant::now() < deadline, "miner never started");
            thread::sleep(Duration::from_millis(5));
        }
        handle.stop_miner().unwrap();

        assert!(matches!(worker.join().unwrap(), Err(ChainError::Mining(_))));
        assert!(!handle.status().unwrap().mining);
        assert_eq!(handle.chain().unwrap().len(), 1);
    }

    #[test]
    fn test_inbound_envelopes_are_applied_in_order() {
        let (handle, sink) = spawn_test_peer(test_proof_of_work());
        identify(&handle, "p1");
        handle
            .deliver(Envelope::new("q", "p1", Message::GetChain))
            .unwrap();

        let longer = create_test_chain(2);
        handle
            .deliver(Envelope::new("q", "p1", Message::PropagateChain(longer.clone())))
            .unwrap();

        assert_eq!(handle.chain().unwrap(), longer);
        let sent = sink.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "q");
        assert_eq!(sent[0].message.command(), "getChainResponse");
    }

    #[test]
    fn test_shutdown_closes_mailbox() {
        let (handle, _sink) = spawn_test_peer(test_proof_of_work());
        identify(&handle, "p1");
        handle.shutdown().unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            match handle.chain() {
                Err(ChainError::Disconnected(_)) => break,
                _ => {
                    assert!(Instant::now() < deadline, "mailbox still open");
                    thread::sleep(Duration::from_millis(5));
                }
            }
        }
    }
}
