use crate::error::{ChainError, Result};
use crate::network::{ClientEvent, RelayClient};
use crate::peer::PeerHandle;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Peer process side of the pool: one relay connection, one local peer.
pub struct ClientPool {
    client: RelayClient,
    peer: PeerHandle,
    running: Arc<AtomicBool>,
    dispatcher: Option<JoinHandle<()>>,
}

impl ClientPool {
    /// Connect to the relay and start the local peer.
    ///
    /// With `mine_interval` set, a timer thread mines a block every interval
    /// once the peer has been identified.
    pub fn connect(addr: &str, mine_interval: Option<Duration>) -> Result<ClientPool> {
        let (client, events) = RelayClient::connect(addr)?;
        match events.recv() {
            Ok(ClientEvent::Connected) => {}
            Ok(other) => {
                return Err(ChainError::Network(format!(
                    "Unexpected relay event before connect: {other:?}"
                )))
            }
            Err(_) => {
                return Err(ChainError::Disconnected(
                    "relay closed before connecting".to_string(),
                ))
            }
        }

        let peer = PeerHandle::spawn(Arc::new(client.clone()));
        let running = Arc::new(AtomicBool::new(true));

        let dispatcher = {
            let peer = peer.clone();
            let running = Arc::clone(&running);
            thread::spawn(move || Self::dispatch(events, peer, running))
        };

        if let Some(interval) = mine_interval {
            let peer = peer.clone();
            let running = Arc::clone(&running);
            thread::spawn(move || Self::mine_periodically(peer, interval, running));
            info!("Pool: mining every {}s", interval.as_secs());
        }

        Ok(ClientPool {
            client,
            peer,
            running,
            dispatcher: Some(dispatcher),
        })
    }

    pub fn peer(&self) -> &PeerHandle {
        &self.peer
    }

    /// Block until the relay connection closes.
    pub fn wait(&mut self) {
        if let Some(dispatcher) = self.dispatcher.take() {
            let _ = dispatcher.join();
        }
    }

    /// Close the relay connection and stop the local peer.
    pub fn shutdown(&mut self) -> Result<()> {
        self.running.store(false, Ordering::Relaxed);
        let closed = self.client.shutdown();
        self.peer.shutdown()?;
        self.wait();
        closed
    }

    fn dispatch(events: Receiver<ClientEvent>, peer: PeerHandle, running: Arc<AtomicBool>) {
        for event in events {
            match event {
                ClientEvent::Received(envelope) => {
                    if let Err(e) = peer.deliver(envelope) {
                        warn!("Pool: local peer stopped: {e}");
                        break;
                    }
                }
                ClientEvent::Disconnected => break,
                ClientEvent::Connected => {}
            }
        }
        running.store(false, Ordering::Relaxed);
        info!("Pool: relay connection closed");
    }

    fn mine_periodically(peer: PeerHandle, interval: Duration, running: Arc<AtomicBool>) {
        loop {
            thread::sleep(interval);
            if !running.load(Ordering::Relaxed) {
                break;
            }
            match peer.mine() {
                Ok(block) => info!("Pool: timer mined block {}", block.get_index()),
                Err(ChainError::NotIdentified) => {}
                Err(ChainError::Disconnected(_)) => break,
                Err(e) => warn!("Pool: timed mining failed: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::PeerState;
    use crate::pool::ServerPool;
    use std::time::Instant;

    #[test]
    fn test_client_pool_peer_gets_identity() {
        let (server, events) = ServerPool::listen("127.0.0.1:0").unwrap();
        let runner = server.clone();
        thread::spawn(move || runner.run(events));

        let mut pool = ClientPool::connect(&server.local_addr().to_string(), None).unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while pool.peer().state().unwrap() != PeerState::Seeded {
            assert!(Instant::now() < deadline, "peer never seeded");
            thread::sleep(Duration::from_millis(10));
        }
        let id = pool.peer().id().unwrap().unwrap();
        assert_eq!(server.members().unwrap(), vec![id]);
        assert_eq!(pool.peer().chain().unwrap().len(), 1);

        pool.shutdown().unwrap();
        assert!(pool.peer().chain().is_err());
    }
}
