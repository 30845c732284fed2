use std::sync::atomic::{AtomicU64, Ordering};

use chunkrpc_utils::random::Random;

/// Correlation ids are `<instance prefix>-<sequence>`, the prefix keeps two clients on one broker apart
pub struct RpcIdGenerate {
    prefix: u64,
    seed: AtomicU64,
}

impl RpcIdGenerate {
    pub fn new(random: &dyn Random<u64>) -> Self {
        Self {
            prefix: random.random(),
            seed: AtomicU64::new(0),
        }
    }

    pub fn generate(&self) -> (String, u64) {
        let value = self.seed.fetch_add(1, Ordering::Relaxed);
        (format!("{:016x}-{}", self.prefix, value), value)
    }
}
