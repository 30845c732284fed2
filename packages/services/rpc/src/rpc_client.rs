use std::{collections::HashMap, sync::Arc, time::Duration};

use async_std::channel::{bounded, Sender};
use chunkrpc_batch::{BatchKey, BincodeCodec, Dispatcher, ErrorKind, ErrorReporter, RawCodec, Store};
use chunkrpc_utils::{error_handle::ErrorUtils, random::Random, Timer};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::RpcConfig,
    rpc_batch::send::{BatchHeader, BatchSender},
    rpc_id_gen::RpcIdGenerate,
    rpc_msg::{ChunkMsg, ClientMeta, Delivery, RpcAnswer, RpcError, REQUEST_BATCH},
    rpc_publisher::BrokerPublisher,
};

struct PendingCall {
    req_id: u64,
    procedure: String,
    timeout_at: u64,
    tx: Sender<RpcAnswer>,
}

type PendingCalls = Arc<Mutex<HashMap<String, PendingCall>>>;

/// Releases the caller waiting on the correlation id of a completed response batch
pub struct ClientDispatcher {
    pending: PendingCalls,
}

impl Dispatcher<RpcAnswer, ClientMeta> for ClientDispatcher {
    fn on_complete(&self, key: BatchKey, answer: RpcAnswer, meta: ClientMeta) -> Result<(), String> {
        let mut pending = self.pending.lock();
        match pending.get(&key.correlation_id) {
            Some(call) if call.req_id == meta.req_id => {}
            Some(call) => {
                log::warn!("[RpcClient] response {} req_id {} does not match pending req_id {}", key, meta.req_id, call.req_id);
                return Ok(());
            }
            None => {
                log::warn!("[RpcClient] response {} from {} has no pending call, maybe timed out", key, meta.reply_to);
                return Ok(());
            }
        }
        if let Some(call) = pending.remove(&key.correlation_id) {
            log::debug!("[RpcClient] call {} {} answered", call.procedure, key.correlation_id);
            call.tx.try_send(answer).print_error("[RpcClient] release caller");
        }
        Ok(())
    }
}

/// Client side connector: publishes request batches to the server queue and reassembles responses from its reply queue
pub struct RpcClient {
    config: RpcConfig,
    reply_queue: String,
    server_queue: String,
    ids: RpcIdGenerate,
    timer: Arc<dyn Timer>,
    reporter: Arc<dyn ErrorReporter>,
    pending: PendingCalls,
    sender: BatchSender<RawCodec>,
    store: Store<BincodeCodec<RpcAnswer>, ClientDispatcher, ClientMeta>,
}

impl RpcClient {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RpcConfig,
        reply_queue: &str,
        server_queue: &str,
        publisher: Arc<dyn BrokerPublisher>,
        reporter: Arc<dyn ErrorReporter>,
        timer: Arc<dyn Timer>,
        random: &dyn Random<u64>,
    ) -> Self {
        let max_chunks = config.store.max_total_chunks;
        let pending: PendingCalls = Default::default();
        let dispatcher = ClientDispatcher { pending: pending.clone() };
        let store = Store::new(config.store.clone(), BincodeCodec::new(config.max_chunk_len, max_chunks), dispatcher, reporter.clone(), timer.clone());
        Self {
            sender: BatchSender::new(RawCodec::new(config.max_chunk_len, max_chunks), publisher),
            config,
            reply_queue: reply_queue.to_string(),
            server_queue: server_queue.to_string(),
            ids: RpcIdGenerate::new(random),
            timer,
            reporter,
            pending,
            store,
        }
    }

    pub fn reply_queue(&self) -> &str {
        &self.reply_queue
    }

    /// Calls waiting for an answer
    pub fn pending_calls(&self) -> usize {
        self.pending.lock().len()
    }

    /// Incomplete response batches
    pub fn pending_batches(&self) -> usize {
        self.store.len()
    }

    /// Call a remote procedure with raw params, waits at most `timeout_ms` for the whole response batch
    pub async fn call(&self, procedure: &str, params: Vec<u8>, timeout_ms: u64) -> RpcAnswer {
        let (correlation_id, req_id) = self.ids.generate();
        let (tx, rx) = bounded(1);
        self.pending.lock().insert(
            correlation_id.clone(),
            PendingCall {
                req_id,
                procedure: procedure.to_string(),
                timeout_at: self.timer.now_ms().saturating_add(timeout_ms),
                tx,
            },
        );

        let header = BatchHeader {
            correlation_id: correlation_id.clone(),
            batch_name: REQUEST_BATCH.to_string(),
            reply_to: self.reply_queue.clone(),
            req_id,
            procedure: Some(procedure.to_string()),
        };
        if let Err(e) = self.sender.send(&self.server_queue, &header, &params) {
            log::error!("[RpcClient] send request {} {} error {}", procedure, correlation_id, e);
            self.pending.lock().remove(&correlation_id);
            return Err(e.into());
        }

        match async_std::future::timeout(Duration::from_millis(timeout_ms), rx.recv()).await {
            Ok(res) => res.map_err(|_| RpcError::LocalQueueError)?,
            Err(_) => {
                log::warn!("[RpcClient] call {} {} timeout after {} ms", procedure, correlation_id, timeout_ms);
                self.pending.lock().remove(&correlation_id);
                Err(RpcError::Timeout)
            }
        }
    }

    /// Same as `call` with serde types on both ends and the configured timeout
    pub async fn call_typed<Req: Serialize, Res: DeserializeOwned>(&self, procedure: &str, req: &Req) -> Result<Res, RpcError> {
        let params = bincode::serialize(req).map_err(|e| RpcError::EncodeError(e.to_string()))?;
        let res = self.call(procedure, params, self.config.call_timeout_ms).await?;
        bincode::deserialize(&res).map_err(|_| RpcError::DeserializeError)
    }

    /// Blocking variant of `call` for callers outside an async runtime
    pub fn call_blocking(&self, procedure: &str, params: Vec<u8>, timeout_ms: u64) -> RpcAnswer {
        async_std::task::block_on(self.call(procedure, params, timeout_ms))
    }

    /// Handle one broker message from the reply queue
    pub fn on_delivery(&self, body: &[u8]) -> Delivery {
        let msg = match ChunkMsg::try_from(body) {
            Ok(msg) => msg,
            Err(e) => {
                self.reporter.report(ErrorKind::Protocol, None, e.to_string());
                return Delivery::Nack;
            }
        };
        match self.store.add(msg.into_client_chunk()) {
            Ok(_) => Delivery::Ack,
            Err(_) => Delivery::Nack,
        }
    }

    /// Fail calls whose deadline passed and evict stale response batches, time is read from the client timer
    pub fn on_tick(&self) {
        let now_ms = self.timer.now_ms();
        let expired = {
            let mut pending = self.pending.lock();
            let keys: Vec<String> = pending.iter().filter(|(_, call)| call.timeout_at <= now_ms).map(|(key, _)| key.clone()).collect();
            keys.into_iter().filter_map(|key| pending.remove(&key).map(|call| (key, call))).collect::<Vec<_>>()
        };
        for (correlation_id, call) in expired {
            log::warn!("[RpcClient] call {} {} expired", call.procedure, correlation_id);
            call.tx.try_send(Err(RpcError::Timeout)).print_error("[RpcClient] release expired caller");
        }
        self.store.on_tick(now_ms);
    }
}
