// Chain-related types and the query interface consumed by the observer

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::events::Event;

pub mod cosmos;
pub mod ibc_msgs;
pub mod tx;

pub use cosmos::CosmosChain;
pub use tx::{ProtoTxDecoder, TxDecoder};

/// Read-only query interface for a chain endpoint
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// Get the chain ID
    fn chain_id(&self) -> &str;

    /// Get the latest block height. Zero means the node has not synced yet.
    async fn latest_height(&self) -> Result<u64, QueryError>;

    /// Get the raw transactions included at `height`
    async fn block(&self, height: u64) -> Result<RawBlock, QueryError>;

    /// Get the execution results (per-tx and block-level events) at `height`
    async fn block_results(&self, height: u64) -> Result<BlockResults, QueryError>;

    /// Query the latest state info a hub holds for `rollapp_id`
    async fn rollapp_state(
        &self,
        rollapp_id: &str,
        only_finalized: bool,
    ) -> Result<RollappState, QueryError>;
}

/// Block contents: raw transaction bytes in block order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBlock {
    pub height: u64,
    pub txs: Vec<Vec<u8>>,
}

/// Execution result of a single transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxExecResult {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub events: Vec<Event>,
}

/// Execution results for a whole block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockResults {
    pub height: u64,
    /// Positionally aligned with `RawBlock::txs`
    pub txs_results: Vec<TxExecResult>,
    pub begin_block_events: Vec<Event>,
    pub end_block_events: Vec<Event>,
}

/// A rollapp's state info as recorded on the hub
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollappState {
    #[serde(rename = "stateInfo")]
    pub state_info: StateInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateInfo {
    #[serde(default)]
    pub sequencer: String,
    #[serde(default)]
    pub start_height: String,
    #[serde(default)]
    pub num_blocks: String,
    /// Hub height at which this state update was created
    #[serde(default)]
    pub creation_height: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "BDs", default)]
    pub block_descriptors: BlockDescriptors,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDescriptors {
    #[serde(rename = "BD", default)]
    pub bd: Vec<BlockDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDescriptor {
    pub height: String,
    #[serde(default)]
    pub state_root: String,
}

impl RollappState {
    /// Block descriptors in the order the hub returned them
    pub fn block_descriptors(&self) -> &[BlockDescriptor] {
        &self.state_info.block_descriptors.bd
    }

    pub fn creation_height(&self) -> &str {
        &self.state_info.creation_height
    }
}

impl BlockDescriptor {
    pub fn new(height: u64) -> Self {
        Self {
            height: height.to_string(),
            state_root: String::new(),
        }
    }

    /// Parsed height, `None` when the hub returned something non-numeric
    pub fn parsed_height(&self) -> Option<u64> {
        self.height.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollapp_state_from_hub_json() {
        let json = r#"{
            "stateInfo": {
                "stateInfoIndex": {"rollappId": "rolx_100004-1", "index": "12"},
                "sequencer": "dym1seq",
                "startHeight": "101",
                "numBlocks": "3",
                "DAPath": "celestia|1|2",
                "version": "1",
                "creationHeight": "55012",
                "status": "FINALIZED",
                "BDs": {"BD": [
                    {"height": "101", "stateRoot": "AA==", "intermediateStatesRoot": "AA=="},
                    {"height": "102", "stateRoot": "AA=="},
                    {"height": "103", "stateRoot": "AA=="}
                ]}
            }
        }"#;

        let state: RollappState = serde_json::from_str(json).unwrap();
        let heights: Vec<u64> = state
            .block_descriptors()
            .iter()
            .filter_map(BlockDescriptor::parsed_height)
            .collect();

        assert_eq!(heights, vec![101, 102, 103]);
        assert_eq!(state.creation_height(), "55012");
        assert_eq!(state.state_info.status, "FINALIZED");
    }

    #[test]
    fn test_tx_exec_result_defaults() {
        let result: TxExecResult = serde_json::from_str(r#"{"log": "ok"}"#).unwrap();
        assert_eq!(result.code, 0);
        assert!(result.events.is_empty());
    }
}
