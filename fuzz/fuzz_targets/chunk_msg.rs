#![no_main]

use chunkrpc_rpc::ChunkMsg;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(msg) = ChunkMsg::try_from(data) {
        let _ = msg.into_server_chunk();
    }
});
