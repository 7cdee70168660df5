use crate::error::Result;
use crate::network::{Envelope, Message, MessageSink, RELAY_SENDER};

/// Relay-side record of one connected identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePeer {
    id: String,
}

impl RemotePeer {
    pub fn new(id: impl Into<String>) -> RemotePeer {
        RemotePeer { id: id.into() }
    }

    pub fn get_id(&self) -> &str {
        self.id.as_str()
    }

    /// Tell the peer which identifier the relay registered it under.
    pub fn assign(&self, sink: &dyn MessageSink) -> Result<()> {
        self.send(sink, Message::SetUuid(self.id.clone()))
    }

    /// Hand the peer its current neighbor list.
    pub fn seed(&self, sink: &dyn MessageSink, neighbors: Vec<String>) -> Result<()> {
        self.send(sink, Message::Seed(neighbors))
    }

    fn send(&self, sink: &dyn MessageSink, message: Message) -> Result<()> {
        sink.send(Envelope::new(RELAY_SENDER, self.id.as_str(), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::RecordingSink;

    #[test]
    fn test_assign_and_seed_come_from_relay() {
        let sink = RecordingSink::new();
        let remote = RemotePeer::new("abc");
        remote.assign(sink.as_ref()).unwrap();
        remote.seed(sink.as_ref(), vec!["def".to_string()]).unwrap();

        assert_eq!(
            sink.take(),
            vec![
                Envelope::new("relay", "abc", Message::SetUuid("abc".to_string())),
                Envelope::new("relay", "abc", Message::Seed(vec!["def".to_string()])),
            ]
        );
    }
}
