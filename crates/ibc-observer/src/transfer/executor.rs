// Transaction executors: turn a built instruction into a committed tx response

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::{PacketTimeout, TxInstruction, TxRequest, TxResponse};
use crate::config::ChainConfig;
use crate::error::SubmissionError;

/// Submits a fully built instruction and waits until it is committed
#[async_trait]
pub trait TxExecutor: Send + Sync {
    async fn execute(
        &self,
        chain: &ChainConfig,
        request: &TxRequest,
    ) -> Result<TxResponse, SubmissionError>;
}

/// Executor that shells out to the chain's CLI binary with block broadcast
#[derive(Debug, Clone, Copy, Default)]
pub struct CliExecutor;

impl CliExecutor {
    /// Argument list passed to the chain binary for `request`
    pub fn command_args(chain: &ChainConfig, request: &TxRequest) -> Vec<String> {
        let mut args: Vec<String> = vec!["tx".into()];

        match &request.instruction {
            TxInstruction::IbcTransfer {
                channel_id,
                receiver,
                amount,
                denom,
                timeout,
                memo,
            } => {
                args.extend([
                    "ibc-transfer".into(),
                    "transfer".into(),
                    "transfer".into(),
                    channel_id.clone(),
                    receiver.clone(),
                    format!("{}{}", amount, denom),
                ]);
                args.extend(Self::fee_and_node(chain, request));

                // The CLI fills in a default for whichever timeout is not
                // passed, so the unused one is zeroed explicitly.
                match timeout {
                    Some(PacketTimeout::Timestamp(nanos)) => {
                        args.extend([
                            "--packet-timeout-timestamp".into(),
                            nanos.to_string(),
                            "--packet-timeout-height".into(),
                            "0-0".into(),
                        ]);
                    }
                    Some(PacketTimeout::Height(height)) => {
                        args.extend([
                            "--packet-timeout-height".into(),
                            format!("0-{}", height),
                            "--packet-timeout-timestamp".into(),
                            "0".into(),
                        ]);
                    }
                    None => {}
                }
                if let Some(memo) = memo {
                    args.extend(["--memo".into(), memo.clone()]);
                }
            }
            TxInstruction::FulfillOrder { order_id } => {
                args.extend(["eibc".into(), "fulfill-order".into(), order_id.clone()]);
                args.extend(Self::fee_and_node(chain, request));
            }
        }

        args.extend([
            "--chain-id".into(),
            chain.chain_id.clone(),
            "--gas".into(),
            "auto".into(),
            "--gas-adjustment".into(),
            request.gas_adjustment.to_string(),
            "--from".into(),
            request.signer.clone(),
            "--keyring-backend".into(),
            chain.keyring_backend.clone(),
            "--output".into(),
            "json".into(),
            "--broadcast-mode".into(),
            "block".into(),
            "-y".into(),
        ]);

        args
    }

    fn fee_and_node(chain: &ChainConfig, request: &TxRequest) -> [String; 4] {
        [
            "--fees".into(),
            request.fees.clone(),
            "--node".into(),
            chain.rpc_endpoint.clone(),
        ]
    }
}

#[async_trait]
impl TxExecutor for CliExecutor {
    async fn execute(
        &self,
        chain: &ChainConfig,
        request: &TxRequest,
    ) -> Result<TxResponse, SubmissionError> {
        let args = Self::command_args(chain, request);
        info!(binary = %chain.binary, chain_id = %chain.chain_id, "Submitting transaction");
        debug!(?args, "Transaction command");

        let output = Command::new(&chain.binary)
            .args(&args)
            .output()
            .await
            .map_err(|source| SubmissionError::Spawn {
                binary: chain.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SubmissionError::CommandFailed {
                binary: chain.binary.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let response: TxResponse =
            serde_json::from_slice(&output.stdout).map_err(|e| SubmissionError::Decode(e.into()))?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::{IbcTimeout, TransferOptions, WalletAmount, GAS_ADJUSTMENT};

    fn hub() -> ChainConfig {
        ChainConfig {
            chain_id: "blumbus_111-1".to_string(),
            rpc_endpoint: "https://rpc-blumbus.mzonder.com:443".to_string(),
            rest_endpoint: "https://api-blumbus.mzonder.com".to_string(),
            binary: "dymd".to_string(),
            denom: "adym".to_string(),
            gas_prices: "1000adym".to_string(),
            keyring_backend: "test".to_string(),
        }
    }

    fn transfer_request(options: &TransferOptions) -> TxRequest {
        let destination = WalletAmount {
            address: "rolx1receiver".to_string(),
            denom: "adym".to_string(),
            amount: 1_000_000,
        };
        TxRequest::ibc_transfer("channel-17", "dym1", &destination, "6000000000000000adym", options)
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_transfer_args() {
        let request = transfer_request(&TransferOptions::default());
        let args = CliExecutor::command_args(&hub(), &request);

        assert_eq!(
            &args[..7],
            &[
                "tx",
                "ibc-transfer",
                "transfer",
                "transfer",
                "channel-17",
                "rolx1receiver",
                "1000000adym",
            ]
        );
        assert_eq!(value_after(&args, "--fees"), Some("6000000000000000adym"));
        assert_eq!(value_after(&args, "--node"), Some("https://rpc-blumbus.mzonder.com:443"));
        assert_eq!(value_after(&args, "--chain-id"), Some("blumbus_111-1"));
        assert_eq!(value_after(&args, "--gas"), Some("auto"));
        assert_eq!(value_after(&args, "--gas-adjustment"), Some("1.5"));
        assert_eq!(value_after(&args, "--from"), Some("dym1"));
        assert_eq!(value_after(&args, "--broadcast-mode"), Some("block"));
        assert_eq!(args.last().map(String::as_str), Some("-y"));
        assert!(!args.iter().any(|a| a.starts_with("--packet-timeout")));
        assert!(!args.iter().any(|a| a == "--memo"));
        assert_eq!(GAS_ADJUSTMENT.to_string(), "1.5");
    }

    #[test]
    fn test_timestamp_timeout_takes_precedence() {
        let options = TransferOptions {
            timeout: Some(IbcTimeout {
                nano_seconds: 1_700_000_000_000_000_000,
                height: 500,
            }),
            memo: String::new(),
        };
        let args = CliExecutor::command_args(&hub(), &transfer_request(&options));

        assert_eq!(
            value_after(&args, "--packet-timeout-timestamp"),
            Some("1700000000000000000")
        );
        assert_eq!(value_after(&args, "--packet-timeout-height"), Some("0-0"));
    }

    #[test]
    fn test_height_timeout_and_memo() {
        let options = TransferOptions {
            timeout: Some(IbcTimeout {
                nano_seconds: 0,
                height: 500,
            }),
            memo: r#"{"eibc":{"fee":"100000"}}"#.to_string(),
        };
        let args = CliExecutor::command_args(&hub(), &transfer_request(&options));

        assert_eq!(value_after(&args, "--packet-timeout-height"), Some("0-500"));
        assert_eq!(value_after(&args, "--packet-timeout-timestamp"), Some("0"));
        assert_eq!(value_after(&args, "--memo"), Some(r#"{"eibc":{"fee":"100000"}}"#));
    }

    #[test]
    fn test_fulfill_order_args() {
        let request = TxRequest::fulfill_order("order-42", "dym1", "6000000000000000adym");
        let args = CliExecutor::command_args(&hub(), &request);

        assert_eq!(&args[..4], &["tx", "eibc", "fulfill-order", "order-42"]);
        assert_eq!(value_after(&args, "--fees"), Some("6000000000000000adym"));
        assert_eq!(value_after(&args, "--keyring-backend"), Some("test"));
    }
}
