// Protobuf definitions for the IBC core channel messages the scanner inspects

use crate::packet::PacketDescriptor;

pub const MSG_ACKNOWLEDGEMENT_TYPE_URL: &str = "/ibc.core.channel.v1.MsgAcknowledgement";

/// ibc.core.client.v1.Height
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Height {
    #[prost(uint64, tag = "1")]
    pub revision_number: u64,
    #[prost(uint64, tag = "2")]
    pub revision_height: u64,
}

/// ibc.core.channel.v1.Packet
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Packet {
    #[prost(uint64, tag = "1")]
    pub sequence: u64,
    #[prost(string, tag = "2")]
    pub source_port: String,
    #[prost(string, tag = "3")]
    pub source_channel: String,
    #[prost(string, tag = "4")]
    pub destination_port: String,
    #[prost(string, tag = "5")]
    pub destination_channel: String,
    #[prost(bytes = "vec", tag = "6")]
    pub data: Vec<u8>,
    #[prost(message, optional, tag = "7")]
    pub timeout_height: Option<Height>,
    #[prost(uint64, tag = "8")]
    pub timeout_timestamp: u64,
}

/// ibc.core.channel.v1.MsgAcknowledgement
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MsgAcknowledgement {
    #[prost(message, optional, tag = "1")]
    pub packet: Option<Packet>,
    #[prost(bytes = "vec", tag = "2")]
    pub acknowledgement: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub proof_acked: Vec<u8>,
    #[prost(message, optional, tag = "4")]
    pub proof_height: Option<Height>,
    #[prost(string, tag = "5")]
    pub signer: String,
}

impl std::fmt::Display for Height {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.revision_number, self.revision_height)
    }
}

impl From<Packet> for PacketDescriptor {
    fn from(packet: Packet) -> Self {
        Self {
            sequence: packet.sequence,
            source_port: packet.source_port,
            source_channel: packet.source_channel,
            dest_port: packet.destination_port,
            dest_channel: packet.destination_channel,
            timeout_height: packet.timeout_height.unwrap_or_default().to_string(),
            timeout_timestamp: packet.timeout_timestamp,
            data: packet.data,
        }
    }
}
