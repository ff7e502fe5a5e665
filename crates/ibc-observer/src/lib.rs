// IBC observer library
// Submits transfers, scans blocks and waits on chain progress and rollapp finalization

pub mod chains;
pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod packet;
pub mod scanner;
pub mod transfer;
pub mod watch;

// Re-export commonly used types for convenience
pub use chains::{ChainQuery, CosmosChain, ProtoTxDecoder, TxDecoder};
pub use config::{ChainConfig, ObserverConfig, WatchConfig};
pub use error::{DecodeError, QueryError, SubmissionError, WatchError};
pub use events::{attribute_value, Event, EventAttribute};
pub use metrics::ObserverMetrics;
pub use packet::{PacketAcknowledgement, PacketDescriptor};
pub use scanner::{BlockScanner, BlockTx};
pub use transfer::{TransferOptions, TransferSubmitter, TxResult, WalletAmount};
pub use watch::{FinalizationWatcher, HeightWatcher};
