use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TOTAL_CHUNKS: u32 = 4096;
pub const DEFAULT_MAX_PENDING_BATCHES: usize = 10_000;
pub const DEFAULT_BATCH_TTL_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Largest `total_chunks` a chunk header may declare
    pub max_total_chunks: u32,
    /// Upper bound of in-flight accumulators, new batches are refused above it
    pub max_pending_batches: usize,
    /// Incomplete batches older than this are evicted on tick, `None` keeps them forever
    pub batch_ttl_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_total_chunks: DEFAULT_MAX_TOTAL_CHUNKS,
            max_pending_batches: DEFAULT_MAX_PENDING_BATCHES,
            batch_ttl_ms: Some(DEFAULT_BATCH_TTL_MS),
        }
    }
}
