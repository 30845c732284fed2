use std::sync::Arc;

use chunkrpc_batch::{BatchKey, BincodeCodec, Dispatcher, ErrorKind, ErrorReporter, RawCodec, Store};
use chunkrpc_utils::{error_handle::ErrorUtils, Timer};

use crate::{
    config::RpcConfig,
    rpc_batch::send::{BatchHeader, BatchSender, SendError},
    rpc_msg::{ChunkMsg, Delivery, RpcAnswer, RpcError, ServerMeta, RESPONSE_BATCH},
    rpc_procedure::{Procedure, ProcedureRegistry},
    rpc_publisher::BrokerPublisher,
};

/// Runs the procedure named by a completed request batch and publishes the answer to `reply_to`
pub struct ServerDispatcher {
    queue: String,
    registry: Arc<ProcedureRegistry>,
    sender: BatchSender<BincodeCodec<RpcAnswer>>,
}

impl ServerDispatcher {
    pub fn new(queue: &str, registry: Arc<ProcedureRegistry>, sender: BatchSender<BincodeCodec<RpcAnswer>>) -> Self {
        Self {
            queue: queue.to_string(),
            registry,
            sender,
        }
    }
}

impl Dispatcher<Vec<u8>, ServerMeta> for ServerDispatcher {
    fn on_complete(&self, key: BatchKey, params: Vec<u8>, meta: ServerMeta) -> Result<(), String> {
        let answer = self.registry.execute(&meta.procedure, &params);
        if let Err(e) = &answer {
            log::warn!("[RpcServer] procedure {} for {} answered error {:?}", meta.procedure, key, e);
        }

        let header = BatchHeader {
            correlation_id: key.correlation_id.clone(),
            batch_name: RESPONSE_BATCH.to_string(),
            reply_to: self.queue.clone(),
            req_id: meta.req_id,
            procedure: None,
        };
        match self.sender.send(&meta.reply_to, &header, &answer) {
            Ok(_) => Ok(()),
            Err(SendError::Codec(e)) => {
                // the caller still deserves an answer when the result itself can't be shipped
                log::error!("[RpcServer] answer for {} can not be encoded: {}", key, e);
                self.sender
                    .send(&meta.reply_to, &header, &Err(RpcError::EncodeError(e.to_string())))
                    .print_error("[RpcServer] send encode error answer");
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Server side connector: feeds request chunks from its queue into a store and answers completed calls
pub struct RpcServer {
    queue: String,
    registry: Arc<ProcedureRegistry>,
    reporter: Arc<dyn ErrorReporter>,
    store: Store<RawCodec, ServerDispatcher, ServerMeta>,
}

impl RpcServer {
    pub fn new(config: RpcConfig, queue: &str, publisher: Arc<dyn BrokerPublisher>, reporter: Arc<dyn ErrorReporter>, timer: Arc<dyn Timer>) -> Self {
        let max_chunks = config.store.max_total_chunks;
        let registry = Arc::new(ProcedureRegistry::default());
        let sender = BatchSender::new(BincodeCodec::new(config.max_chunk_len, max_chunks), publisher);
        let dispatcher = ServerDispatcher::new(queue, registry.clone(), sender);
        log::info!("[RpcServer] listen on queue {}", queue);
        Self {
            queue: queue.to_string(),
            registry,
            reporter: reporter.clone(),
            store: Store::new(config.store, RawCodec::new(config.max_chunk_len, max_chunks), dispatcher, reporter, timer),
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn registry(&self) -> &ProcedureRegistry {
        &self.registry
    }

    pub fn register<P: Procedure + 'static>(&self, name: &str, procedure: P) {
        if self.registry.register(name, procedure) {
            log::warn!("[RpcServer] procedure {} replaced", name);
        }
    }

    /// Handle one broker message from the server queue
    pub fn on_delivery(&self, body: &[u8]) -> Delivery {
        let msg = match ChunkMsg::try_from(body) {
            Ok(msg) => msg,
            Err(e) => {
                self.reporter.report(ErrorKind::Protocol, None, e.to_string());
                return Delivery::Nack;
            }
        };
        let key = msg.key();
        let chunk = match msg.into_server_chunk() {
            Ok(chunk) => chunk,
            Err(e) => {
                self.reporter.report(ErrorKind::Protocol, Some(key), e.to_string());
                return Delivery::Nack;
            }
        };
        match self.store.add(chunk) {
            Ok(_) => Delivery::Ack,
            Err(_) => Delivery::Nack,
        }
    }

    /// Evict stale request batches, time is read from the server timer
    pub fn on_tick(&self) {
        self.store.sweep();
    }

    /// Incomplete request batches
    pub fn pending_batches(&self) -> usize {
        self.store.len()
    }
}
