use crate::error::{ChainError, Result};
use crate::network::{Envelope, EnvelopeReader, Message, MessageSink};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use uuid::Uuid;

/// Notifications raised by the relay server
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// A connection was accepted and registered under this identifier
    Connected(String),
    /// The connection registered under this identifier closed
    Disconnected(String),
    /// An envelope from `sender` to `recipient` was handed to the forwarder.
    /// Only the addressing is reported; the payload is not retained.
    Relayed { sender: String, recipient: String },
}

type Connection = Arc<Mutex<TcpStream>>;

/// Live connections keyed by identifier
#[derive(Clone, Default)]
struct Registry {
    inner: Arc<RwLock<HashMap<String, Connection>>>,
}

impl Registry {
    /// Register a connection under a fresh identifier.
    ///
    /// Identifiers are random UUIDs without dashes; a collision with a live
    /// identifier just draws again.
    fn register(&self, stream: TcpStream) -> Result<String> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| ChainError::Network(format!("Failed to acquire registry lock: {e}")))?;
        let mut id = Uuid::new_v4().simple().to_string();
        while inner.contains_key(&id) {
            id = Uuid::new_v4().simple().to_string();
        }
        inner.insert(id.clone(), Arc::new(Mutex::new(stream)));
        Ok(id)
    }

    fn remove(&self, id: &str) -> Result<usize> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| ChainError::Network(format!("Failed to acquire registry lock: {e}")))?;
        inner.remove(id);
        Ok(inner.len())
    }

    fn get(&self, id: &str) -> Result<Option<Connection>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| ChainError::Network(format!("Failed to acquire registry lock: {e}")))?;
        Ok(inner.get(id).cloned())
    }

    fn ids(&self) -> Result<Vec<String>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| ChainError::Network(format!("Failed to acquire registry lock: {e}")))?;
        let mut ids: Vec<String> = inner.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    /// Write an envelope to the connection registered as its recipient.
    fn forward<P: Serialize>(&self, envelope: &Envelope<P>) -> Result<()> {
        let connection = self
            .get(&envelope.recipient)?
            .ok_or_else(|| ChainError::UnknownRecipient(envelope.recipient.clone()))?;
        let mut stream = connection
            .lock()
            .map_err(|e| ChainError::Network(format!("Failed to acquire connection lock: {e}")))?;
        crate::network::write_envelope(&mut *stream, envelope)
    }
}

/// Message switch: accepts peers, names them, and moves envelopes between
/// them by recipient without interpreting the payload.
#[derive(Clone)]
pub struct RelayServer {
    listener: Arc<TcpListener>,
    local_addr: SocketAddr,
    registry: Registry,
    events: Sender<ServerEvent>,
}

impl RelayServer {
    /// Bind the listening socket. Nothing is accepted until [`RelayServer::start`].
    pub fn bind(addr: &str) -> Result<(RelayServer, Receiver<ServerEvent>)> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| ChainError::Network(format!("Failed to bind to {addr}: {e}")))?;
        let local_addr = listener.local_addr()?;
        let (events, receiver) = mpsc::channel();

        info!("Relay: listening on {local_addr}");
        let server = RelayServer {
            listener: Arc::new(listener),
            local_addr,
            registry: Registry::default(),
            events,
        };
        Ok((server, receiver))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Identifiers of every live connection, sorted
    pub fn connected_ids(&self) -> Result<Vec<String>> {
        self.registry.ids()
    }

    /// Spawn the accept loop in the background.
    pub fn start(&self) {
        let server = self.clone();
        thread::spawn(move || server.accept_loop());
    }

    /// Deliver an envelope to its recipient's connection.
    pub fn forward<P: Serialize>(&self, envelope: &Envelope<P>) -> Result<()> {
        self.registry.forward(envelope)
    }

    fn accept_loop(&self) {
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(e) = self.accept(stream) {
                        error!("Relay: failed to register connection: {e}");
                    }
                }
                Err(e) => {
                    error!("Relay: error accepting connection: {e}");
                }
            }
        }
    }

    fn accept(&self, stream: TcpStream) -> Result<()> {
        let reader = stream.try_clone()?;
        let id = self.registry.register(stream)?;
        info!(
            "Relay: {id} connected, {} client(s)",
            self.registry.ids()?.len()
        );

        // Connected must be queued before the reader can queue Disconnected
        let _ = self.events.send(ServerEvent::Connected(id.clone()));

        let server = self.clone();
        thread::spawn(move || server.handle_connection(id, reader));
        Ok(())
    }

    fn handle_connection(&self, id: String, stream: TcpStream) {
        let envelopes = EnvelopeReader::<_, Value>::new(&stream);

        for envelope in envelopes {
            match envelope {
                Ok(envelope) => {
                    match self.registry.forward(&envelope) {
                        Ok(()) => {}
                        Err(ChainError::UnknownRecipient(recipient)) => {
                            warn!("Relay: dropping envelope from {id}, {recipient} is not connected");
                        }
                        Err(e) => {
                            warn!("Relay: failed to forward envelope from {id}: {e}");
                        }
                    }
                    let _ = self.events.send(ServerEvent::Relayed {
                        sender: envelope.sender,
                        recipient: envelope.recipient,
                    });
                }
                Err(ChainError::MalformedInput(reason)) => {
                    warn!("Relay: skipping malformed envelope from {id}: {reason}");
                }
                Err(e) => {
                    info!("Relay: connection {id} ended: {e}");
                    break;
                }
            }
        }

        let _ = stream.shutdown(Shutdown::Both);
        match self.registry.remove(&id) {
            Ok(remaining) => info!("Relay: {id} disconnected, {remaining} client(s)"),
            Err(e) => error!("Relay: failed to unregister {id}: {e}"),
        }
        let _ = self.events.send(ServerEvent::Disconnected(id));
    }
}

impl MessageSink for RelayServer {
    fn send(&self, envelope: Envelope<Message>) -> Result<()> {
        self.registry.forward(&envelope)
    }
}
