// Block scanning: reconstruct a block's transactions and their events

use prost::Message;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::chains::ibc_msgs::{MsgAcknowledgement, MSG_ACKNOWLEDGEMENT_TYPE_URL};
use crate::chains::tx::encode_tx_json;
use crate::chains::{BlockResults, ChainQuery, RawBlock, TxDecoder};
use crate::error::QueryError;
use crate::events::Event;
use crate::metrics::ObserverMetrics;
use crate::packet::{PacketAcknowledgement, PacketDescriptor};

/// Payload of the synthetic entry carrying begin-block events
pub const BEGIN_BLOCK_MARKER: &[u8] =
    br#"{"data":"begin_block","note":"this is a transaction artificially created for debugging purposes"}"#;

/// Payload of the synthetic entry carrying end-block events
pub const END_BLOCK_MARKER: &[u8] =
    br#"{"data":"end_block","note":"this is a transaction artificially created for debugging purposes"}"#;

/// A transaction as recorded in a block: JSON payload plus emitted events
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockTx {
    pub data: Vec<u8>,
    pub events: Vec<Event>,
}

impl BlockTx {
    /// True for the begin/end-block pseudo-transactions
    pub fn is_synthetic(&self) -> bool {
        self.data == BEGIN_BLOCK_MARKER || self.data == END_BLOCK_MARKER
    }
}

/// Reads blocks from a chain and pairs each decodable transaction with its
/// execution events
pub struct BlockScanner {
    chain: Arc<dyn ChainQuery>,
    decoder: Arc<dyn TxDecoder>,
    metrics: Option<Arc<ObserverMetrics>>,
}

impl BlockScanner {
    pub fn new(chain: Arc<dyn ChainQuery>, decoder: Arc<dyn TxDecoder>) -> Self {
        Self {
            chain,
            decoder,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ObserverMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Scan the block at `height`.
    ///
    /// Transactions that fail to decode are skipped. Surviving entries keep
    /// the events of their original block index, followed by one synthetic
    /// entry for begin-block events and one for end-block events when those
    /// are non-empty.
    pub async fn scan(&self, height: u64) -> Result<Vec<BlockTx>, QueryError> {
        let (block, results) = self.fetch(height).await?;

        if block.txs.len() != results.txs_results.len() {
            return Err(QueryError::Response {
                endpoint: format!("{}/block_results", self.chain.chain_id()),
                message: format!(
                    "block {} has {} txs but {} tx results",
                    height,
                    block.txs.len(),
                    results.txs_results.len()
                ),
            });
        }

        let mut txs = Vec::with_capacity(block.txs.len() + 2);

        for (index, raw) in block.txs.iter().enumerate() {
            let tx = match self.decoder.decode(raw) {
                Ok(tx) => tx,
                Err(e) => {
                    warn!(
                        height,
                        index,
                        tx_hash = %tx_hash(raw),
                        error = %e,
                        "Failed to decode tx"
                    );
                    self.record_decode_failure();
                    continue;
                }
            };

            let data = match encode_tx_json(&tx) {
                Ok(data) => data,
                Err(e) => {
                    warn!(
                        height,
                        index,
                        tx_hash = %tx_hash(raw),
                        error = %e,
                        "Failed to marshal tx to json"
                    );
                    self.record_decode_failure();
                    continue;
                }
            };

            txs.push(BlockTx {
                data,
                events: results.txs_results[index].events.clone(),
            });
        }

        let BlockResults {
            begin_block_events,
            end_block_events,
            ..
        } = results;

        if !begin_block_events.is_empty() {
            txs.push(BlockTx {
                data: BEGIN_BLOCK_MARKER.to_vec(),
                events: begin_block_events,
            });
        }
        if !end_block_events.is_empty() {
            txs.push(BlockTx {
                data: END_BLOCK_MARKER.to_vec(),
                events: end_block_events,
            });
        }

        if let Some(metrics) = &self.metrics {
            metrics.blocks_scanned.inc();
        }
        debug!(chain_id = %self.chain.chain_id(), height, entries = txs.len(), "Scanned block");

        Ok(txs)
    }

    /// All packet acknowledgements submitted in the block at `height`
    pub async fn acknowledgements(
        &self,
        height: u64,
    ) -> Result<Vec<PacketAcknowledgement>, QueryError> {
        let block = self.chain.block(height).await.map_err(|e| self.record_query_error(e))?;
        let mut acks = Vec::new();

        for (index, raw) in block.txs.iter().enumerate() {
            let tx = match self.decoder.decode(raw) {
                Ok(tx) => tx,
                Err(e) => {
                    debug!(height, index, error = %e, "Skipping undecodable tx");
                    continue;
                }
            };

            let messages = tx.body.map(|body| body.messages).unwrap_or_default();
            for msg in messages.into_iter().filter(|m| m.type_url == MSG_ACKNOWLEDGEMENT_TYPE_URL) {
                match MsgAcknowledgement::decode(msg.value.as_slice()) {
                    Ok(ack) => acks.push(PacketAcknowledgement {
                        acknowledgement: ack.acknowledgement,
                        packet: PacketDescriptor::from(ack.packet.unwrap_or_default()),
                    }),
                    Err(e) => warn!(height, index, error = %e, "Malformed MsgAcknowledgement"),
                }
            }
        }

        Ok(acks)
    }

    /// Fetch block and execution results concurrently; the first failure wins
    async fn fetch(&self, height: u64) -> Result<(RawBlock, BlockResults), QueryError> {
        futures::try_join!(self.chain.block(height), self.chain.block_results(height))
            .map_err(|e| self.record_query_error(e))
    }

    fn record_decode_failure(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.tx_decode_failures.inc();
        }
    }

    fn record_query_error(&self, error: QueryError) -> QueryError {
        if let Some(metrics) = &self.metrics {
            metrics.query_errors.inc();
        }
        error
    }
}

/// Tendermint transaction hash: uppercase hex SHA-256 of the raw bytes
pub fn tx_hash(raw: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_hash_is_uppercase_sha256() {
        assert_eq!(
            tx_hash(b""),
            "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855"
        );
    }

    #[test]
    fn test_markers_are_valid_json() {
        let begin: serde_json::Value = serde_json::from_slice(BEGIN_BLOCK_MARKER).unwrap();
        let end: serde_json::Value = serde_json::from_slice(END_BLOCK_MARKER).unwrap();
        assert_eq!(begin["data"], "begin_block");
        assert_eq!(end["data"], "end_block");
    }
}
