use chunkrpc_batch::{StoreConfig, DEFAULT_MAX_CHUNK_LEN};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Byte budget of one chunk payload
    pub max_chunk_len: usize,
    pub call_timeout_ms: u64,
    pub store: StoreConfig,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            max_chunk_len: DEFAULT_MAX_CHUNK_LEN,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            store: StoreConfig::default(),
        }
    }
}
