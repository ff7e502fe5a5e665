// Cosmos chain client over Tendermint RPC and the hub REST API

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{BlockResults, ChainQuery, RawBlock, RollappState, TxExecResult};
use crate::config::ChainConfig;
use crate::error::QueryError;
use crate::events::Event;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-only Cosmos chain client
pub struct CosmosChain {
    chain_id: String,
    rpc_endpoint: String,
    rest_endpoint: String,
    client: Client,
}

/// JSON-RPC envelope returned by Tendermint
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    sync_info: SyncInfo,
}

#[derive(Debug, Deserialize)]
struct SyncInfo {
    latest_block_height: String,
}

#[derive(Debug, Deserialize)]
struct BlockResult {
    block: BlockBody,
}

#[derive(Debug, Deserialize)]
struct BlockBody {
    header: BlockHeader,
    data: BlockData,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    height: String,
}

#[derive(Debug, Deserialize)]
struct BlockData {
    #[serde(default)]
    txs: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct BlockResultsResult {
    height: String,
    #[serde(default)]
    txs_results: Option<Vec<TxExecResult>>,
    #[serde(default)]
    begin_block_events: Option<Vec<Event>>,
    #[serde(default)]
    end_block_events: Option<Vec<Event>>,
}

impl CosmosChain {
    /// Create a new Cosmos chain client
    pub fn new(config: &ChainConfig) -> Result<Self, QueryError> {
        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            chain_id: config.chain_id.clone(),
            rpc_endpoint: config.rpc_endpoint.trim_end_matches('/').to_string(),
            rest_endpoint: config.rest_endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// GET a Tendermint RPC route and unwrap the JSON-RPC envelope
    async fn rpc_get<T: DeserializeOwned>(
        &self,
        route: &str,
        height: Option<u64>,
    ) -> Result<T, QueryError> {
        let url = format!("{}/{}", self.rpc_endpoint, route);
        let mut request = self.client.get(&url);
        if let Some(height) = height {
            request = request.query(&[("height", height.to_string())]);
        }

        debug!(chain_id = %self.chain_id, %url, ?height, "RPC query");
        let response: RpcResponse<T> = request.send().await?.json().await?;

        if let Some(err) = response.error {
            let detail = err.data.map(|d| format!(" ({})", d)).unwrap_or_default();
            return Err(QueryError::Rpc {
                endpoint: url,
                message: format!("code {}: {}{}", err.code, err.message, detail),
            });
        }

        response.result.ok_or_else(|| QueryError::Response {
            endpoint: url,
            message: "missing result".to_string(),
        })
    }

    fn parse_height(&self, endpoint: &str, height: &str) -> Result<u64, QueryError> {
        height.parse().map_err(|_| QueryError::Response {
            endpoint: endpoint.to_string(),
            message: format!("invalid height {:?}", height),
        })
    }
}

#[async_trait]
impl ChainQuery for CosmosChain {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Get the latest block height from Tendermint
    async fn latest_height(&self) -> Result<u64, QueryError> {
        let status: StatusResult = self.rpc_get("status", None).await?;
        self.parse_height("status", &status.sync_info.latest_block_height)
    }

    async fn block(&self, height: u64) -> Result<RawBlock, QueryError> {
        let result: BlockResult = self.rpc_get("block", Some(height)).await?;

        let txs = result
            .block
            .data
            .txs
            .unwrap_or_default()
            .iter()
            .map(|tx| {
                general_purpose::STANDARD
                    .decode(tx)
                    .map_err(|e| QueryError::Response {
                        endpoint: format!("{}/block", self.rpc_endpoint),
                        message: format!("invalid base64 transaction: {}", e),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RawBlock {
            height: self.parse_height("block", &result.block.header.height)?,
            txs,
        })
    }

    async fn block_results(&self, height: u64) -> Result<BlockResults, QueryError> {
        let result: BlockResultsResult = self.rpc_get("block_results", Some(height)).await?;

        Ok(BlockResults {
            height: self.parse_height("block_results", &result.height)?,
            txs_results: result.txs_results.unwrap_or_default(),
            begin_block_events: result.begin_block_events.unwrap_or_default(),
            end_block_events: result.end_block_events.unwrap_or_default(),
        })
    }

    async fn rollapp_state(
        &self,
        rollapp_id: &str,
        only_finalized: bool,
    ) -> Result<RollappState, QueryError> {
        let url = format!(
            "{}/dymensionxyz/dymension/rollapp/latest_state_info/{}",
            self.rest_endpoint, rollapp_id
        );

        debug!(chain_id = %self.chain_id, %rollapp_id, only_finalized, "Rollapp state query");
        let response = self
            .client
            .get(&url)
            .query(&[("finalized", only_finalized.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Rpc {
                endpoint: url,
                message: format!("HTTP {}: {}", status, body),
            });
        }

        Ok(response.json().await?)
    }
}
