// Transaction decoding and canonical JSON rendering

use base64::{engine::general_purpose, Engine as _};
use cosmos_sdk_proto::cosmos::tx::v1beta1::Tx;
use prost::Message;
use serde_json::{json, Value};

use crate::error::DecodeError;

/// Chain-specific decoder for raw transaction bytes
pub trait TxDecoder: Send + Sync {
    fn decode(&self, raw: &[u8]) -> Result<Tx, DecodeError>;
}

/// Decodes standard Cosmos SDK protobuf transactions
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtoTxDecoder;

impl TxDecoder for ProtoTxDecoder {
    fn decode(&self, raw: &[u8]) -> Result<Tx, DecodeError> {
        Ok(Tx::decode(raw)?)
    }
}

/// Render a decoded transaction as the canonical JSON payload.
///
/// Messages keep their type URL under `@type` with the protobuf value
/// base64-encoded, so unknown message types still round-trip.
pub fn encode_tx_json(tx: &Tx) -> Result<Vec<u8>, DecodeError> {
    Ok(serde_json::to_vec(&tx_to_json(tx))?)
}

fn tx_to_json(tx: &Tx) -> Value {
    let body = tx.body.as_ref().map(|body| {
        let messages: Vec<Value> = body
            .messages
            .iter()
            .map(|msg| {
                json!({
                    "@type": msg.type_url,
                    "value": general_purpose::STANDARD.encode(&msg.value),
                })
            })
            .collect();

        json!({
            "messages": messages,
            "memo": body.memo,
            "timeout_height": body.timeout_height.to_string(),
        })
    });

    let auth_info = tx.auth_info.as_ref().map(|auth| {
        let fee = auth.fee.as_ref().map(|fee| {
            let amount: Vec<Value> = fee
                .amount
                .iter()
                .map(|coin| json!({ "denom": coin.denom, "amount": coin.amount }))
                .collect();
            json!({
                "amount": amount,
                "gas_limit": fee.gas_limit.to_string(),
                "payer": fee.payer,
                "granter": fee.granter,
            })
        });
        let sequences: Vec<String> = auth
            .signer_infos
            .iter()
            .map(|signer| signer.sequence.to_string())
            .collect();

        json!({ "fee": fee, "signer_sequences": sequences })
    });

    let signatures: Vec<String> = tx
        .signatures
        .iter()
        .map(|sig| general_purpose::STANDARD.encode(sig))
        .collect();

    json!({
        "body": body,
        "auth_info": auth_info,
        "signatures": signatures,
    })
}
