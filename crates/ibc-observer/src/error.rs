// Error taxonomy shared by the chain client, scanner, submitter and watchers

use std::time::Duration;
use thiserror::Error;

/// Remote query failures. Retried by the finalization watcher, propagated
/// immediately everywhere else.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error from {endpoint}: {message}")]
    Rpc { endpoint: String, message: String },

    #[error("Unexpected response from {endpoint}: {message}")]
    Response { endpoint: String, message: String },
}

/// Malformed or incomplete responses. Never retried.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Protobuf decode failed: {0}")]
    Proto(#[from] prost::DecodeError),

    #[error("Missing attribute '{key}' in '{event_type}' event")]
    MissingAttribute { event_type: String, key: String },

    #[error("Invalid integer for '{field}': {value:?}")]
    InvalidInteger { field: String, value: String },

    #[error("Invalid encoding for '{field}': {message}")]
    InvalidEncoding { field: String, message: String },
}

impl DecodeError {
    pub(crate) fn invalid_integer(field: &str, value: &str) -> Self {
        DecodeError::InvalidInteger {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

/// The transfer instruction could not be committed.
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Failed to launch {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{binary} exited with {status}: {stderr}")]
    CommandFailed {
        binary: String,
        status: String,
        stderr: String,
    },

    #[error("Transaction {tx_hash} rejected with code {code}: {raw_log}")]
    Rejected {
        tx_hash: String,
        code: u32,
        raw_log: String,
    },

    #[error("Failed to decode transaction result: {0}")]
    Decode(#[from] DecodeError),
}

/// Outcomes of a wait operation other than success.
#[derive(Error, Debug)]
pub enum WatchError {
    /// A query failed and the wait does not retry queries.
    #[error("Query failed while waiting: {0}")]
    Query(#[from] QueryError),

    /// The awaited height never appeared inside the budget.
    #[error("Specified rollapp height {height} not found within the timeout ({timeout:?})")]
    HeightNotFound { height: u64, timeout: Duration },

    /// The last poll failed after the budget was already spent.
    #[error("Error querying rollapp state after {elapsed:?}: {source}")]
    QueryFailedAfterTimeout {
        elapsed: Duration,
        #[source]
        source: QueryError,
    },

    #[error("Wait cancelled: {0}")]
    Cancelled(String),

    /// The hub holds no finalized block descriptors for the rollapp yet.
    #[error("No finalized state for rollapp {rollapp_id}")]
    NoFinalizedState { rollapp_id: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl WatchError {
    /// True for the two budget-exhausted outcomes.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            WatchError::HeightNotFound { .. } | WatchError::QueryFailedAfterTimeout { .. }
        )
    }
}
