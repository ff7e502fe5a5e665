// Chain events and attribute extraction
//
// Cosmos chains disagree on how event attributes travel over the wire: older
// Tendermint releases base64-encode keys and values, newer ones send them raw.
// Nothing in a response says which one applies, so lookups try each encoding
// in a fixed order.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Deserializer, Serialize};

/// Event type emitted when a packet is committed on the sending chain
pub const SEND_PACKET_EVENT: &str = "send_packet";

/// A single key/value pair attached to an event, as received from the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub key: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: String,
}

/// An ABCI event: a type plus ordered attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub attributes: Vec<EventAttribute>,
}

/// Wire encodings an attribute may arrive in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeEncoding {
    Base64,
    Raw,
}

impl AttributeEncoding {
    /// Order in which encodings are tried. Decoding first, raw comparison last.
    pub const PRIORITY: [AttributeEncoding; 2] =
        [AttributeEncoding::Base64, AttributeEncoding::Raw];

    /// Interpret `text` under this encoding, `None` if it is not valid for it
    pub fn decode(self, text: &str) -> Option<String> {
        match self {
            AttributeEncoding::Raw => Some(text.to_string()),
            AttributeEncoding::Base64 => general_purpose::STANDARD
                .decode(text)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok()),
        }
    }
}

impl EventAttribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Encoding under which this attribute's key reads as `key`, if any
    pub fn key_encoding(&self, key: &str) -> Option<AttributeEncoding> {
        AttributeEncoding::PRIORITY
            .into_iter()
            .find(|encoding| encoding.decode(&self.key).as_deref() == Some(key))
    }

    /// Value decoded with the encoding its key matched under
    pub fn value_as(&self, encoding: AttributeEncoding) -> String {
        encoding
            .decode(&self.value)
            .unwrap_or_else(|| self.value.clone())
    }
}

impl Event {
    pub fn new(event_type: impl Into<String>, attributes: Vec<EventAttribute>) -> Self {
        Self {
            event_type: event_type.into(),
            attributes,
        }
    }

    /// First value for `key` within this event
    pub fn attribute(&self, key: &str) -> Option<String> {
        self.attributes.iter().find_map(|attr| {
            attr.key_encoding(key)
                .map(|encoding| attr.value_as(encoding))
        })
    }
}

/// Returns the value of the first attribute named `key` on an event of type
/// `event_type`. Events of other types are never consulted, and among
/// duplicates the first occurrence wins.
pub fn attribute_value(events: &[Event], event_type: &str, key: &str) -> Option<String> {
    events
        .iter()
        .filter(|event| event.event_type == event_type)
        .find_map(|event| event.attribute(key))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
