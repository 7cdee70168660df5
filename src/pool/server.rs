use crate::error::{ChainError, Result};
use crate::network::{RelayServer, ServerEvent};
use crate::pool::RemotePeer;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, RwLock};

/// Relay process side of the pool.
///
/// Keeps one [`RemotePeer`] per live connection and, whenever membership
/// changes, sends every member the identifiers of all the others.
#[derive(Clone)]
pub struct ServerPool {
    relay: RelayServer,
    members: Arc<RwLock<BTreeMap<String, RemotePeer>>>,
}

impl ServerPool {
    /// Bind and start the relay. Feed the returned events to [`ServerPool::run`].
    pub fn listen(addr: &str) -> Result<(ServerPool, Receiver<ServerEvent>)> {
        let (relay, events) = RelayServer::bind(addr)?;
        relay.start();
        let pool = ServerPool {
            relay,
            members: Arc::new(RwLock::new(BTreeMap::new())),
        };
        Ok((pool, events))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.relay.local_addr()
    }

    /// Identifiers of the current members, sorted
    pub fn members(&self) -> Result<Vec<String>> {
        let members = self
            .members
            .read()
            .map_err(|e| ChainError::Network(format!("Failed to acquire members lock: {e}")))?;
        Ok(members.keys().cloned().collect())
    }

    /// Process relay events until the relay goes away.
    pub fn run(&self, events: Receiver<ServerEvent>) {
        for event in events {
            if let Err(e) = self.handle_event(event) {
                warn!("Pool: {e}");
            }
        }
    }

    pub fn handle_event(&self, event: ServerEvent) -> Result<()> {
        match event {
            ServerEvent::Connected(id) => self.join(id),
            ServerEvent::Disconnected(id) => self.leave(&id),
            ServerEvent::Relayed { sender, recipient } => {
                debug!("Pool: relayed {sender} -> {recipient}");
                Ok(())
            }
        }
    }

    fn join(&self, id: String) -> Result<()> {
        let remote = RemotePeer::new(id.clone());
        if let Err(e) = remote.assign(&self.relay) {
            warn!("Pool: failed to assign identifier to {id}: {e}");
        }
        self.members
            .write()
            .map_err(|e| ChainError::Network(format!("Failed to acquire members lock: {e}")))?
            .insert(id.clone(), remote);
        info!("Pool: {id} joined");
        self.reseed()
    }

    fn leave(&self, id: &str) -> Result<()> {
        let removed = self
            .members
            .write()
            .map_err(|e| ChainError::Network(format!("Failed to acquire members lock: {e}")))?
            .remove(id);
        if removed.is_none() {
            return Ok(());
        }
        info!("Pool: {id} left");
        self.reseed()
    }

    /// Send each member the list of every other member.
    fn reseed(&self) -> Result<()> {
        let members: Vec<RemotePeer> = self
            .members
            .read()
            .map_err(|e| ChainError::Network(format!("Failed to acquire members lock: {e}")))?
            .values()
            .cloned()
            .collect();

        for member in &members {
            let neighbors: Vec<String> = members
                .iter()
                .filter(|other| other.get_id() != member.get_id())
                .map(|other| other.get_id().to_string())
                .collect();
            if let Err(e) = member.seed(&self.relay, neighbors) {
                warn!("Pool: failed to seed {}: {e}", member.get_id());
            }
        }
        debug!("Pool: reseeded {} member(s)", members.len());
        Ok(())
    }
}
