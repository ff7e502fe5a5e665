// Shared mocks for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use ibc_observer::chains::{
    BlockDescriptor, BlockDescriptors, BlockResults, ChainQuery, RawBlock, RollappState, StateInfo,
};
use ibc_observer::error::QueryError;

pub fn query_error(message: &str) -> QueryError {
    QueryError::Rpc {
        endpoint: "mock".to_string(),
        message: message.to_string(),
    }
}

pub fn rollapp_state(heights: &[u64], creation_height: &str) -> RollappState {
    RollappState {
        state_info: StateInfo {
            creation_height: creation_height.to_string(),
            status: "FINALIZED".to_string(),
            block_descriptors: BlockDescriptors {
                bd: heights.iter().copied().map(BlockDescriptor::new).collect(),
            },
            ..Default::default()
        },
    }
}

type Scripted<T> = Mutex<VecDeque<Result<T, String>>>;

/// Chain whose responses are scripted per call. The last scripted height or
/// rollapp state is repeated once the script runs out.
pub struct MockChain {
    chain_id: String,
    heights: Scripted<u64>,
    states: Scripted<RollappState>,
    block: Mutex<Result<RawBlock, String>>,
    results: Mutex<Result<BlockResults, String>>,
    height_calls: Mutex<u64>,
    state_calls: Mutex<u64>,
    hang_queries: bool,
    hang_block: bool,
}

impl MockChain {
    pub fn new(chain_id: &str) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            heights: Mutex::new(VecDeque::new()),
            states: Mutex::new(VecDeque::new()),
            block: Mutex::new(Ok(RawBlock::default())),
            results: Mutex::new(Ok(BlockResults::default())),
            height_calls: Mutex::new(0),
            state_calls: Mutex::new(0),
            hang_queries: false,
            hang_block: false,
        }
    }

    /// Height and rollapp state queries never resolve
    pub fn with_hung_queries(mut self) -> Self {
        self.hang_queries = true;
        self
    }

    /// Block queries never resolve; block results still answer
    pub fn with_hung_block(mut self) -> Self {
        self.hang_block = true;
        self
    }

    pub fn with_heights(self, heights: &[u64]) -> Self {
        self.heights.lock().unwrap().extend(heights.iter().map(|h| Ok(*h)));
        self
    }

    pub fn push_height_error(&self, message: &str) {
        self.heights.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn push_state(&self, state: Result<RollappState, String>) {
        self.states.lock().unwrap().push_back(state);
    }

    pub fn set_block(&self, block: Result<RawBlock, String>) {
        *self.block.lock().unwrap() = block;
    }

    pub fn set_block_results(&self, results: Result<BlockResults, String>) {
        *self.results.lock().unwrap() = results;
    }

    pub fn height_calls(&self) -> u64 {
        *self.height_calls.lock().unwrap()
    }

    pub fn state_calls(&self) -> u64 {
        *self.state_calls.lock().unwrap()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

fn next_scripted<T: Clone>(script: &Scripted<T>) -> Result<T, QueryError> {
    let mut script = script.lock().unwrap();
    let next = if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    };
    next.unwrap_or_else(|| Err("nothing scripted".to_string()))
        .map_err(|e| query_error(&e))
}

#[async_trait]
impl ChainQuery for MockChain {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    async fn latest_height(&self) -> Result<u64, QueryError> {
        *self.height_calls.lock().unwrap() += 1;
        if self.hang_queries {
            return std::future::pending().await;
        }
        next_scripted(&self.heights)
    }

    async fn block(&self, _height: u64) -> Result<RawBlock, QueryError> {
        if self.hang_block {
            return std::future::pending().await;
        }
        self.block.lock().unwrap().clone().map_err(|e| query_error(&e))
    }

    async fn block_results(&self, _height: u64) -> Result<BlockResults, QueryError> {
        self.results.lock().unwrap().clone().map_err(|e| query_error(&e))
    }

    async fn rollapp_state(
        &self,
        _rollapp_id: &str,
        only_finalized: bool,
    ) -> Result<RollappState, QueryError> {
        assert!(only_finalized, "watchers only read finalized state");
        *self.state_calls.lock().unwrap() += 1;
        if self.hang_queries {
            return std::future::pending().await;
        }
        next_scripted(&self.states)
    }
}
