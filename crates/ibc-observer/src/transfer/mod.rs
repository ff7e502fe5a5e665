// IBC transfer submission and packet extraction

use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::config::ChainConfig;
use crate::error::{DecodeError, SubmissionError};
use crate::events::Event;
use crate::packet::PacketDescriptor;

pub mod executor;

pub use executor::{CliExecutor, TxExecutor};

/// Gas estimate multiplier applied to every submission
pub const GAS_ADJUSTMENT: f64 = 1.5;

/// Recipient, denom and amount of a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletAmount {
    pub address: String,
    pub denom: String,
    pub amount: u128,
}

/// Requested packet timeout. A zero field means "not set".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IbcTimeout {
    pub nano_seconds: u64,
    pub height: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferOptions {
    pub timeout: Option<IbcTimeout>,
    /// Attached verbatim when non-empty
    pub memo: String,
}

/// The single timeout field set on an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketTimeout {
    Timestamp(u64),
    Height(u64),
}

impl PacketTimeout {
    /// Pick the timeout to send: a non-zero timestamp wins over a height
    pub fn select(timeout: Option<&IbcTimeout>) -> Option<Self> {
        let timeout = timeout?;
        if timeout.nano_seconds > 0 {
            Some(PacketTimeout::Timestamp(timeout.nano_seconds))
        } else if timeout.height > 0 {
            Some(PacketTimeout::Height(timeout.height))
        } else {
            None
        }
    }
}

/// What a transaction does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxInstruction {
    IbcTransfer {
        channel_id: String,
        receiver: String,
        amount: u128,
        denom: String,
        timeout: Option<PacketTimeout>,
        memo: Option<String>,
    },
    /// Fulfil an eIBC demand order on the hub
    FulfillOrder { order_id: String },
}

/// A fully built transaction: instruction, signer, fee and gas parameters
#[derive(Debug, Clone, PartialEq)]
pub struct TxRequest {
    pub instruction: TxInstruction,
    /// Keyring key name of the signer
    pub signer: String,
    pub fees: String,
    pub gas_adjustment: f64,
}

impl TxRequest {
    pub fn ibc_transfer(
        channel_id: &str,
        signer: &str,
        destination: &WalletAmount,
        fees: &str,
        options: &TransferOptions,
    ) -> Self {
        let memo = (!options.memo.is_empty()).then(|| options.memo.clone());

        Self {
            instruction: TxInstruction::IbcTransfer {
                channel_id: channel_id.to_string(),
                receiver: destination.address.clone(),
                amount: destination.amount,
                denom: destination.denom.clone(),
                timeout: PacketTimeout::select(options.timeout.as_ref()),
                memo,
            },
            signer: signer.to_string(),
            fees: fees.to_string(),
            gas_adjustment: GAS_ADJUSTMENT,
        }
    }

    pub fn fulfill_order(order_id: &str, signer: &str, fees: &str) -> Self {
        Self {
            instruction: TxInstruction::FulfillOrder {
                order_id: order_id.to_string(),
            },
            signer: signer.to_string(),
            fees: fees.to_string(),
            gas_adjustment: GAS_ADJUSTMENT,
        }
    }
}

/// Transaction response as printed by the chain CLI (`--output json`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxResponse {
    pub height: String,
    pub txhash: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub raw_log: String,
    #[serde(default)]
    pub gas_wanted: String,
    #[serde(default)]
    pub gas_used: String,
    #[serde(default)]
    pub events: Vec<Event>,
}

/// A committed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResult {
    pub height: u64,
    pub tx_hash: String,
    /// The hub charges for all gas requested, not gas used
    pub gas_wanted: i64,
    pub events: Vec<Event>,
}

impl TryFrom<TxResponse> for TxResult {
    type Error = DecodeError;

    fn try_from(response: TxResponse) -> Result<Self, Self::Error> {
        let height = response
            .height
            .parse()
            .map_err(|_| DecodeError::invalid_integer("height", &response.height))?;
        let gas_wanted = response
            .gas_wanted
            .parse()
            .map_err(|_| DecodeError::invalid_integer("gas_wanted", &response.gas_wanted))?;

        Ok(Self {
            height,
            tx_hash: response.txhash,
            gas_wanted,
            events: response.events,
        })
    }
}

impl TxResult {
    /// Packet committed by this transaction
    pub fn packet(&self) -> Result<PacketDescriptor, DecodeError> {
        packet_from_result(self)
    }
}

/// Extract the packet a transfer committed from its `send_packet` event
pub fn packet_from_result(result: &TxResult) -> Result<PacketDescriptor, DecodeError> {
    PacketDescriptor::from_send_packet_events(&result.events)
}

/// Memo asking eIBC market makers to fulfil a rollapp → hub transfer early
pub fn eibc_memo(fee: u128) -> String {
    json!({ "eibc": { "fee": fee.to_string() } }).to_string()
}

/// Builds transfer instructions and submits them through an executor
pub struct TransferSubmitter {
    executor: Arc<dyn TxExecutor>,
}

impl TransferSubmitter {
    pub fn new(executor: Arc<dyn TxExecutor>) -> Self {
        Self { executor }
    }

    /// Send `destination.amount` of `destination.denom` to
    /// `destination.address` over `channel_id`, returning once committed
    pub async fn send_ibc_transfer(
        &self,
        chain: &ChainConfig,
        channel_id: &str,
        key_name: &str,
        destination: &WalletAmount,
        fees: &str,
        options: &TransferOptions,
    ) -> Result<TxResult, SubmissionError> {
        let request = TxRequest::ibc_transfer(channel_id, key_name, destination, fees, options);
        self.submit(chain, &request).await
    }

    /// Fulfil eIBC demand order `order_id` on the hub
    pub async fn fulfill_demand_order(
        &self,
        hub: &ChainConfig,
        order_id: &str,
        key_name: &str,
        fees: &str,
    ) -> Result<TxResult, SubmissionError> {
        let request = TxRequest::fulfill_order(order_id, key_name, fees);
        self.submit(hub, &request).await
    }

    async fn submit(
        &self,
        chain: &ChainConfig,
        request: &TxRequest,
    ) -> Result<TxResult, SubmissionError> {
        let response = self.executor.execute(chain, request).await?;

        if response.code != 0 {
            return Err(SubmissionError::Rejected {
                tx_hash: response.txhash,
                code: response.code,
                raw_log: response.raw_log,
            });
        }

        let result = TxResult::try_from(response)?;
        info!(
            chain_id = %chain.chain_id,
            tx_hash = %result.tx_hash,
            height = result.height,
            gas_wanted = result.gas_wanted,
            "Transaction committed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_selection() {
        assert_eq!(PacketTimeout::select(None), None);
        assert_eq!(PacketTimeout::select(Some(&IbcTimeout::default())), None);
        assert_eq!(
            PacketTimeout::select(Some(&IbcTimeout { nano_seconds: 9, height: 10 })),
            Some(PacketTimeout::Timestamp(9))
        );
        assert_eq!(
            PacketTimeout::select(Some(&IbcTimeout { nano_seconds: 0, height: 10 })),
            Some(PacketTimeout::Height(10))
        );
    }

    #[test]
    fn test_empty_memo_is_dropped() {
        let destination = WalletAmount {
            address: "dym1xyz".to_string(),
            denom: "arolx".to_string(),
            amount: 5,
        };
        let request = TxRequest::ibc_transfer(
            "channel-0",
            "rolx1",
            &destination,
            "1arolx",
            &TransferOptions::default(),
        );

        match request.instruction {
            TxInstruction::IbcTransfer { memo, timeout, .. } => {
                assert_eq!(memo, None);
                assert_eq!(timeout, None);
            }
            other => panic!("unexpected instruction {:?}", other),
        }
        assert_eq!(request.gas_adjustment, GAS_ADJUSTMENT);
    }

    #[test]
    fn test_tx_result_from_cli_json() {
        let response: TxResponse = serde_json::from_str(
            r#"{
                "height": "1234",
                "txhash": "ABCDEF",
                "codespace": "",
                "code": 0,
                "raw_log": "[]",
                "gas_wanted": "250000",
                "gas_used": "180000",
                "events": [
                    {"type": "send_packet", "attributes": [
                        {"key": "cGFja2V0X3NlcXVlbmNl", "value": "NDI=", "index": true}
                    ]}
                ]
            }"#,
        )
        .unwrap();

        let result = TxResult::try_from(response).unwrap();
        assert_eq!(result.height, 1234);
        assert_eq!(result.gas_wanted, 250_000);
        let sequence =
            crate::events::attribute_value(&result.events, "send_packet", "packet_sequence");
        assert_eq!(sequence.as_deref(), Some("42"));
    }

    #[test]
    fn test_tx_result_rejects_bad_height() {
        let response = TxResponse {
            height: "tall".to_string(),
            gas_wanted: "1".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            TxResult::try_from(response),
            Err(DecodeError::InvalidInteger { ref field, .. }) if field == "height"
        ));
    }

    #[test]
    fn test_eibc_memo() {
        let memo: serde_json::Value = serde_json::from_str(&eibc_memo(100_000)).unwrap();
        assert_eq!(memo["eibc"]["fee"], "100000");
    }
}
