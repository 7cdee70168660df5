use crate::error::{ChainError, Result};
use crate::network::{write_envelope, Envelope, EnvelopeReader, Message, MessageSink};
use log::{info, warn};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const TCP_CONNECT_TIMEOUT: u64 = 5000;

/// Notifications raised by the client side of the relay
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The connection to the relay is open. The identifier arrives later as
    /// a `setUuid` envelope.
    Connected,
    /// The relay closed the connection
    Disconnected,
    Received(Envelope),
}

/// The single outbound connection of a peer process to the relay
#[derive(Clone)]
pub struct RelayClient {
    writer: Arc<Mutex<TcpStream>>,
}

impl RelayClient {
    /// Connect to `addr` (`host:port`; host names are resolved and each
    /// resolved address is tried in turn).
    pub fn connect(addr: &str) -> Result<(RelayClient, Receiver<ClientEvent>)> {
        let candidates: Vec<SocketAddr> = addr
            .to_socket_addrs()
            .map_err(|e| ChainError::Network(format!("Invalid address {addr}: {e}")))?
            .collect();

        info!("Relay: connecting to {addr}");
        let stream = Self::open(addr, &candidates)?;
        let reader = stream.try_clone()?;

        let (events, receiver) = mpsc::channel();
        info!("Relay: connected to {}", stream.peer_addr()?);
        let _ = events.send(ClientEvent::Connected);
        thread::spawn(move || Self::read_loop(reader, events));

        let client = RelayClient {
            writer: Arc::new(Mutex::new(stream)),
        };
        Ok((client, receiver))
    }

    fn open(addr: &str, candidates: &[SocketAddr]) -> Result<TcpStream> {
        let mut last_error = format!("no address found for {addr}");
        for candidate in candidates {
            match TcpStream::connect_timeout(candidate, Duration::from_millis(TCP_CONNECT_TIMEOUT))
            {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = format!("{candidate}: {e}"),
            }
        }
        Err(ChainError::Network(format!(
            "Failed to connect to {addr}: {last_error}"
        )))
    }

    /// Wrap `message` in an envelope and write it to the relay.
    pub fn send_message(&self, sender: &str, recipient: &str, message: Message) -> Result<()> {
        self.send(Envelope::new(sender, recipient, message))
    }

    /// Close both directions; the read loop then reports `Disconnected`.
    pub fn shutdown(&self) -> Result<()> {
        let stream = self
            .writer
            .lock()
            .map_err(|e| ChainError::Network(format!("Failed to acquire connection lock: {e}")))?;
        stream.shutdown(Shutdown::Both)?;
        Ok(())
    }

    fn read_loop(stream: TcpStream, events: Sender<ClientEvent>) {
        for envelope in EnvelopeReader::<_, Message>::new(&stream) {
            match envelope {
                Ok(envelope) => {
                    if events.send(ClientEvent::Received(envelope)).is_err() {
                        break;
                    }
                }
                Err(ChainError::MalformedInput(reason)) => {
                    warn!("Relay: skipping malformed envelope: {reason}");
                }
                Err(e) => {
                    warn!("Relay: {e}");
                    break;
                }
            }
        }
        info!("Relay: disconnected");
        let _ = events.send(ClientEvent::Disconnected);
    }
}

impl MessageSink for RelayClient {
    fn send(&self, envelope: Envelope) -> Result<()> {
        let mut stream = self
            .writer
            .lock()
            .map_err(|e| ChainError::Network(format!("Failed to acquire connection lock: {e}")))?;
        write_envelope(&mut *stream, &envelope)
    }
}
