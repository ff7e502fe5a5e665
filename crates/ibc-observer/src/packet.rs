// IBC packet descriptors extracted from chain events and messages

use serde::Serialize;

use crate::error::DecodeError;
use crate::events::{attribute_value, Event, EventAttribute, SEND_PACKET_EVENT};

pub const ATTR_SEQUENCE: &str = "packet_sequence";
pub const ATTR_SRC_PORT: &str = "packet_src_port";
pub const ATTR_SRC_CHANNEL: &str = "packet_src_channel";
pub const ATTR_DST_PORT: &str = "packet_dst_port";
pub const ATTR_DST_CHANNEL: &str = "packet_dst_channel";
pub const ATTR_TIMEOUT_HEIGHT: &str = "packet_timeout_height";
pub const ATTR_TIMEOUT_TIMESTAMP: &str = "packet_timeout_timestamp";
pub const ATTR_DATA: &str = "packet_data";
pub const ATTR_DATA_HEX: &str = "packet_data_hex";

/// Routing, timeout and payload metadata of a single IBC packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketDescriptor {
    pub sequence: u64,
    pub source_port: String,
    pub source_channel: String,
    pub dest_port: String,
    pub dest_channel: String,
    /// "{revision_number}-{revision_height}"
    pub timeout_height: String,
    /// Nanoseconds since the Unix epoch, 0 when unset
    pub timeout_timestamp: u64,
    pub data: Vec<u8>,
}

/// An acknowledgement relayed back to the packet's source chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketAcknowledgement {
    pub acknowledgement: Vec<u8>,
    pub packet: PacketDescriptor,
}

impl PacketDescriptor {
    /// Build a descriptor from the first `send_packet` event in `events`.
    ///
    /// All routing and timeout attributes are required. The payload is read
    /// from `packet_data`, falling back to `packet_data_hex`, and is empty
    /// when neither is present.
    pub fn from_send_packet_events(events: &[Event]) -> Result<Self, DecodeError> {
        let required = |key: &str| {
            attribute_value(events, SEND_PACKET_EVENT, key).ok_or_else(|| {
                DecodeError::MissingAttribute {
                    event_type: SEND_PACKET_EVENT.to_string(),
                    key: key.to_string(),
                }
            })
        };

        let sequence = required(ATTR_SEQUENCE)?;
        let sequence = sequence
            .parse::<u64>()
            .map_err(|_| DecodeError::invalid_integer(ATTR_SEQUENCE, &sequence))?;

        let source_port = required(ATTR_SRC_PORT)?;
        let source_channel = required(ATTR_SRC_CHANNEL)?;
        let dest_port = required(ATTR_DST_PORT)?;
        let dest_channel = required(ATTR_DST_CHANNEL)?;
        let timeout_height = required(ATTR_TIMEOUT_HEIGHT)?;

        let timeout_timestamp = required(ATTR_TIMEOUT_TIMESTAMP)?;
        let timeout_timestamp = timeout_timestamp
            .parse::<u64>()
            .map_err(|_| DecodeError::invalid_integer(ATTR_TIMEOUT_TIMESTAMP, &timeout_timestamp))?;

        let data = match attribute_value(events, SEND_PACKET_EVENT, ATTR_DATA) {
            Some(data) => data.into_bytes(),
            None => match attribute_value(events, SEND_PACKET_EVENT, ATTR_DATA_HEX) {
                Some(hex_data) => hex::decode(&hex_data).map_err(|e| DecodeError::InvalidEncoding {
                    field: ATTR_DATA_HEX.to_string(),
                    message: e.to_string(),
                })?,
                None => Vec::new(),
            },
        };

        Ok(Self {
            sequence,
            source_port,
            source_channel,
            dest_port,
            dest_channel,
            timeout_height,
            timeout_timestamp,
            data,
        })
    }

    /// Render as the `send_packet` event a chain would emit for this packet
    pub fn to_send_packet_event(&self) -> Event {
        let mut attributes = Vec::with_capacity(9);
        if let Ok(text) = std::str::from_utf8(&self.data) {
            attributes.push(EventAttribute::new(ATTR_DATA, text));
        }
        attributes.extend([
            EventAttribute::new(ATTR_DATA_HEX, hex::encode(&self.data)),
            EventAttribute::new(ATTR_TIMEOUT_HEIGHT, self.timeout_height.clone()),
            EventAttribute::new(ATTR_TIMEOUT_TIMESTAMP, self.timeout_timestamp.to_string()),
            EventAttribute::new(ATTR_SEQUENCE, self.sequence.to_string()),
            EventAttribute::new(ATTR_SRC_PORT, self.source_port.clone()),
            EventAttribute::new(ATTR_SRC_CHANNEL, self.source_channel.clone()),
            EventAttribute::new(ATTR_DST_PORT, self.dest_port.clone()),
            EventAttribute::new(ATTR_DST_CHANNEL, self.dest_channel.clone()),
        ]);

        Event::new(SEND_PACKET_EVENT, attributes)
    }
}
