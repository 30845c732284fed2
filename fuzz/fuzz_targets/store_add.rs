#![no_main]

use std::sync::Arc;

use chunkrpc_batch::{BatchKey, Chunk, Dispatcher, LogReporter, RawCodec, Store, StoreConfig};
use chunkrpc_utils::MockTimer;
use libfuzzer_sys::fuzz_target;

struct Discard();

impl Dispatcher<Vec<u8>, u8> for Discard {
    fn on_complete(&self, _key: BatchKey, _payload: Vec<u8>, _metadata: u8) -> Result<(), String> {
        Ok(())
    }
}

// every 4 bytes drive one chunk: key, total, index, metadata
fuzz_target!(|data: &[u8]| {
    let config = StoreConfig {
        max_total_chunks: 64,
        max_pending_batches: 8,
        batch_ttl_ms: Some(10),
    };
    let timer = Arc::new(MockTimer::default());
    let store = Store::new(config, RawCodec::default(), Discard(), Arc::new(LogReporter()), timer.clone());
    for (i, op) in data.chunks_exact(4).enumerate() {
        let chunk = Chunk {
            key: BatchKey::new(format!("c{}", op[0] % 16), "request"),
            total_chunks: op[1] as u32 % 70,
            index: op[2] as u32 % 70,
            data: vec![op[3]],
            metadata: op[3] % 2,
        };
        let _ = store.add(chunk);
        timer.advance(1);
        if i % 16 == 0 {
            store.sweep();
        }
        assert!(store.len() <= 8);
    }
});
