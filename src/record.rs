//! Records flowing through the decoder.
//!
//! A batch is an ordered `Vec<Message>`. Parsed messages carry their fields
//! in an insertion-ordered [`Body`]; raw messages carry opaque bytes and are
//! never decoded.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use indexmap::IndexMap as IndexMapRaw;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// `IndexMap` alias using hashbrown's default hasher for `no_std` compatibility.
type IndexMap<K, V> = IndexMapRaw<K, V, hashbrown::DefaultHashBuilder>;

/// Field name to value map of a parsed message.
pub type Body = IndexMap<String, Value>;

/// Free-form string properties attached to a message.
pub type Metadata = IndexMap<String, String>;

/// LogMiner `OPERATION` column.
pub const OPERATION_FIELD: &str = "OPERATION";
/// LogMiner `SQL_REDO` column.
pub const SQL_REDO_FIELD: &str = "SQL_REDO";
/// LogMiner `ROW_ID` column.
pub const ROW_ID_FIELD: &str = "ROW_ID";
/// LogMiner `TIMESTAMP` column.
pub const TIMESTAMP_FIELD: &str = "TIMESTAMP";
/// LogMiner `TABLE_NAME` column.
pub const TABLE_NAME_FIELD: &str = "TABLE_NAME";

/// Fields every decodable record must carry.
pub const REQUIRED_FIELDS: [&str; 5] = [
    OPERATION_FIELD,
    SQL_REDO_FIELD,
    ROW_ID_FIELD,
    TIMESTAMP_FIELD,
    TABLE_NAME_FIELD,
];

/// `OPERATION` value LogMiner writes for changes it cannot express as SQL.
pub const UNSUPPORTED_OPERATION: &str = "UNSUPPORTED";

/// Protocols accepted for decoding, besides the empty protocol.
pub const PROTOCOLS: [&str; 2] = ["csv", "oracle-log-miner"];

/// Protocol set on every decoded message.
pub const AGGREGATED_PROTOCOL: &str = "[csv,oracle-log-miner]";

/// Message type of a record that replaces a failed one.
pub const ERROR_MESSAGE_TYPE: &str = "th2-codec-error";

/// Field of an error record holding the failure description.
pub const ERROR_CONTENT_FIELD: &str = "content";

/// Direction of a message relative to the monitored system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Received from the system.
    #[default]
    Incoming,
    /// Sent to the system.
    Outgoing,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        })
    }
}

/// Identity of a message within its session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MessageId {
    /// Name of the session the message belongs to.
    pub session_alias: String,
    /// Message direction.
    pub direction: Direction,
    /// Position in the session stream.
    pub sequence: i64,
    /// Position within a message split into parts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subsequence: Vec<u32>,
}

impl MessageId {
    /// Identity of a whole message.
    #[must_use]
    pub fn new(session_alias: impl Into<String>, direction: Direction, sequence: i64) -> Self {
        Self {
            session_alias: session_alias.into(),
            direction,
            sequence,
            subsequence: Vec::new(),
        }
    }
}

/// Compact form used in log lines, e.g. `session:incoming:42.1`.
impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.session_alias, self.direction, self.sequence)?;
        for part in &self.subsequence {
            write!(f, ".{part}")?;
        }
        Ok(())
    }
}

/// A message whose fields were already extracted upstream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedMessage {
    /// Identity.
    pub id: MessageId,
    /// Event the message is linked to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Message type.
    #[serde(rename = "type", default)]
    pub message_type: String,
    /// Free-form properties.
    #[serde(default)]
    pub metadata: Metadata,
    /// Protocol tag; empty when unknown.
    #[serde(default)]
    pub protocol: String,
    /// Fields.
    #[serde(default)]
    pub body: Body,
}

impl ParsedMessage {
    /// An empty message of the given type.
    #[must_use]
    pub fn new(id: MessageId, message_type: impl Into<String>) -> Self {
        Self {
            id,
            message_type: message_type.into(),
            ..Self::default()
        }
    }

    /// Set the protocol tag.
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Add a body field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(name.into(), value.into());
        self
    }

    /// Copy of everything but the body, as the base of a derived message.
    #[must_use]
    pub fn without_body(&self) -> Self {
        Self {
            id: self.id.clone(),
            event_id: self.event_id.clone(),
            message_type: self.message_type.clone(),
            metadata: self.metadata.clone(),
            protocol: self.protocol.clone(),
            body: Body::default(),
        }
    }
}

/// A message still in its transport encoding.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawMessage {
    /// Identity.
    pub id: MessageId,
    /// Event the message is linked to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Free-form properties.
    #[serde(default)]
    pub metadata: Metadata,
    /// Protocol tag; empty when unknown.
    #[serde(default)]
    pub protocol: String,
    /// Encoded content.
    #[serde(default)]
    pub body: Vec<u8>,
}

/// One element of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Message {
    /// Fields already extracted.
    Parsed(ParsedMessage),
    /// Opaque bytes.
    Raw(RawMessage),
}

impl Message {
    /// Identity of the message.
    #[must_use]
    pub fn id(&self) -> &MessageId {
        match self {
            Message::Parsed(message) => &message.id,
            Message::Raw(message) => &message.id,
        }
    }

    /// Protocol tag of the message.
    #[must_use]
    pub fn protocol(&self) -> &str {
        match self {
            Message::Parsed(message) => &message.protocol,
            Message::Raw(message) => &message.protocol,
        }
    }

    /// The parsed message, if this is one.
    #[must_use]
    pub fn as_parsed(&self) -> Option<&ParsedMessage> {
        match self {
            Message::Parsed(message) => Some(message),
            Message::Raw(_) => None,
        }
    }
}

impl From<ParsedMessage> for Message {
    fn from(message: ParsedMessage) -> Self {
        Message::Parsed(message)
    }
}

impl From<RawMessage> for Message {
    fn from(message: RawMessage) -> Self {
        Message::Raw(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn test_message_id_display() {
        let mut id = MessageId::new("oracle", Direction::Incoming, 42);
        assert_eq!(id.to_string(), "oracle:incoming:42");
        id.subsequence = vec![1, 2];
        assert_eq!(id.to_string(), "oracle:incoming:42.1.2");
    }

    #[test]
    fn test_without_body_keeps_identity() {
        let mut message = ParsedMessage::new(MessageId::new("s", Direction::Outgoing, 1), "Row")
            .with_protocol("csv")
            .with_field("A", "x");
        message.event_id = Some("event".into());
        message.metadata.insert("key".into(), "value".into());

        let derived = message.without_body();
        assert!(derived.body.is_empty());
        assert_eq!(derived.id, message.id);
        assert_eq!(derived.event_id, message.event_id);
        assert_eq!(derived.metadata, message.metadata);
        assert_eq!(derived.message_type, "Row");
        assert_eq!(derived.protocol, "csv");
    }

    #[test]
    fn test_parsed_message_from_json() {
        let message: Message = serde_json::from_str(
            r#"{"parsed": {
                "id": {"session_alias": "s", "direction": "incoming", "sequence": 3},
                "type": "Row",
                "protocol": "csv",
                "body": {"OPERATION": "INSERT", "SCN": 123}
            }}"#,
        )
        .unwrap();
        let parsed = message.as_parsed().unwrap();
        assert_eq!(message.protocol(), "csv");
        assert_eq!(message.id().sequence, 3);
        assert_eq!(parsed.body.get("OPERATION"), Some(&Value::from("INSERT")));
        assert_eq!(parsed.body.get("SCN"), Some(&Value::Integer(123)));
    }
}
