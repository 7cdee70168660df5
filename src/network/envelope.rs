use crate::core::Chain;
use crate::error::{ChainError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Deserializer, StreamDeserializer, Value};
use std::io::{BufReader, Read, Write};
use std::marker::PhantomData;

/// Sender label the relay uses for envelopes it originates itself
pub const RELAY_SENDER: &str = "relay";

/// Peer protocol commands, carried as `{"command": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "data", rename_all = "camelCase")]
pub enum Message {
    SetUuid(String),
    Seed(Vec<String>),
    PropagateChain(Chain),
    GetChain,
    GetChainResponse(Chain),
}

impl Message {
    pub fn command(&self) -> &'static str {
        match self {
            Message::SetUuid(_) => "setUuid",
            Message::Seed(_) => "seed",
            Message::PropagateChain(_) => "propagateChain",
            Message::GetChain => "getChain",
            Message::GetChainResponse(_) => "getChainResponse",
        }
    }
}

/// Addressed unit moved by the relay. The relay itself routes
/// `Envelope<Value>` and never looks inside `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<P = Message> {
    pub sender: String,
    pub recipient: String,
    pub message: P,
}

impl<P> Envelope<P> {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, message: P) -> Envelope<P> {
        Envelope {
            sender: sender.into(),
            recipient: recipient.into(),
            message,
        }
    }
}

/// Write one envelope, newline terminated, and flush.
pub fn write_envelope<W: Write, P: Serialize>(writer: &mut W, envelope: &Envelope<P>) -> Result<()> {
    serde_json::to_writer(&mut *writer, envelope)
        .map_err(|e| ChainError::Network(format!("Failed to send envelope: {e}")))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Iterator over envelopes arriving on a stream.
///
/// Each JSON value is decoded on its own, so an envelope with missing fields
/// yields `MalformedInput` and reading continues with the next one. A broken
/// stream yields one `Network` error and then ends.
pub struct EnvelopeReader<R: Read, P> {
    values: StreamDeserializer<'static, serde_json::de::IoRead<BufReader<R>>, Value>,
    finished: bool,
    payload: PhantomData<P>,
}

impl<R: Read, P: DeserializeOwned> EnvelopeReader<R, P> {
    pub fn new(reader: R) -> EnvelopeReader<R, P> {
        EnvelopeReader {
            values: Deserializer::from_reader(BufReader::new(reader)).into_iter::<Value>(),
            finished: false,
            payload: PhantomData,
        }
    }
}

impl<R: Read, P: DeserializeOwned> Iterator for EnvelopeReader<R, P> {
    type Item = Result<Envelope<P>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.values.next() {
            Some(Ok(value)) => Some(
                serde_json::from_value(value)
                    .map_err(|e| ChainError::MalformedInput(format!("Bad envelope: {e}"))),
            ),
            Some(Err(e)) => {
                self.finished = true;
                Some(Err(ChainError::Network(format!("Failed to read envelope: {e}"))))
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Block;
    use serde_json::json;

    #[test]
    fn test_message_wire_shape() {
        let json = serde_json::to_value(Message::SetUuid("abc".to_string())).unwrap();
        assert_eq!(json, json!({"command": "setUuid", "data": "abc"}));

        let json = serde_json::to_value(Message::Seed(vec!["a".into(), "b".into()])).unwrap();
        assert_eq!(json, json!({"command": "seed", "data": ["a", "b"]}));

        let json = serde_json::to_value(Message::GetChain).unwrap();
        assert_eq!(json["command"], "getChain");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_get_chain_without_data_field() {
        let message: Message = serde_json::from_value(json!({"command": "getChain"})).unwrap();
        assert_eq!(message, Message::GetChain);
        assert_eq!(message.command(), "getChain");
    }

    #[test]
    fn test_chain_payload_decodes() {
        let chain = vec![Block::generate_genesis_block()];
        let raw = json!({
            "command": "getChainResponse",
            "data": serde_json::to_value(&chain).unwrap(),
        });
        let message: Message = serde_json::from_value(raw).unwrap();
        assert_eq!(message, Message::GetChainResponse(chain));
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        let result = serde_json::from_value::<Message>(json!({"command": "selfDestruct"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_reader_skips_malformed_envelopes() {
        let mut wire = Vec::new();
        write_envelope(&mut wire, &Envelope::new("a", "b", Message::GetChain)).unwrap();
        wire.extend_from_slice(b"{\"sender\":\"a\"}\n");
        write_envelope(&mut wire, &Envelope::new("b", "a", Message::GetChain)).unwrap();

        let items: Vec<Result<Envelope>> = EnvelopeReader::new(wire.as_slice()).collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap().recipient, "b");
        assert!(matches!(items[1], Err(ChainError::MalformedInput(_))));
        assert_eq!(items[2].as_ref().unwrap().sender, "b");
    }

    #[test]
    fn test_reader_stops_on_broken_stream() {
        let wire = b"{\"sender\": \"a\", \"recip".to_vec();
        let mut reader = EnvelopeReader::<_, Value>::new(wire.as_slice());
        assert!(matches!(reader.next(), Some(Err(ChainError::Network(_)))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_opaque_payload_is_preserved() {
        let mut wire = Vec::new();
        let envelope = Envelope::new("a", "b", json!({"command": "anything", "data": [1, 2]}));
        write_envelope(&mut wire, &envelope).unwrap();
        let decoded: Vec<Result<Envelope<Value>>> = EnvelopeReader::new(wire.as_slice()).collect();
        assert_eq!(decoded[0].as_ref().unwrap(), &envelope);
    }
}
