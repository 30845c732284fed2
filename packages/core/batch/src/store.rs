use std::{
    collections::{hash_map::Entry, HashMap},
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use chunkrpc_utils::Timer;
use parking_lot::Mutex;

use crate::{
    accumulator::BatchAccumulator,
    codec::ChunkCodec,
    config::StoreConfig,
    dispatcher::Dispatcher,
    error::{BatchError, CapacityError, ProtocolError},
    key::BatchKey,
    reporter::ErrorReporter,
};

/// One chunk as extracted from a broker message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<M> {
    pub key: BatchKey,
    pub total_chunks: u32,
    pub index: u32,
    pub data: Vec<u8>,
    pub metadata: M,
}

/// What happened to an accepted chunk
#[derive(Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// Stored, the batch still waits for more chunks
    Pending { received: u32, total: u32 },
    /// Index already received, nothing changed
    Duplicate,
    /// This chunk completed the batch and the dispatcher accepted it
    Dispatched,
    /// This chunk completed the batch but decoding or dispatching failed, the batch is gone
    Failed(BatchError),
}

enum Installed<M> {
    Pending { received: u32, total: u32 },
    Duplicate,
    Complete(BatchAccumulator<M>),
}

/// Registry of in-flight batches.
///
/// A single mutex guards the map across find-or-create, `set_chunk` and removal on completion, so
/// exactly one `add` call observes the completion of a key. Decoding and dispatching run after the
/// lock is released.
pub struct Store<C, D, M> {
    config: StoreConfig,
    codec: C,
    dispatcher: D,
    reporter: Arc<dyn ErrorReporter>,
    timer: Arc<dyn Timer>,
    batches: Mutex<HashMap<BatchKey, BatchAccumulator<M>>>,
}

impl<C, D, M> Store<C, D, M>
where
    C: ChunkCodec,
    C::Payload: Send + Sync + 'static,
    D: Dispatcher<C::Payload, M>,
    M: PartialEq + Send + Sync + 'static,
{
    pub fn new(config: StoreConfig, codec: C, dispatcher: D, reporter: Arc<dyn ErrorReporter>, timer: Arc<dyn Timer>) -> Self {
        Self {
            config,
            codec,
            dispatcher,
            reporter,
            timer,
            batches: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Number of incomplete batches
    pub fn len(&self) -> usize {
        self.batches.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.lock().is_empty()
    }

    pub fn contains(&self, key: &BatchKey) -> bool {
        self.batches.lock().contains_key(key)
    }

    /// Ingest one chunk.
    ///
    /// `Err` means the chunk was rejected (protocol or capacity error) and no state changed.
    /// `Ok` means it was accepted, even when the batch it completed failed afterwards.
    /// Every error is also sent to the reporter.
    pub fn add(&self, chunk: Chunk<M>) -> Result<AddOutcome, BatchError> {
        let Chunk {
            key,
            total_chunks,
            index,
            data,
            metadata,
        } = chunk;

        let acc = match self.install(&key, total_chunks, index, data, metadata) {
            Ok(Installed::Pending { received, total }) => {
                log::debug!("[Store] batch {} got part {}, {}/{}", key, index, received, total);
                return Ok(AddOutcome::Pending { received, total });
            }
            Ok(Installed::Duplicate) => {
                log::debug!("[Store] batch {} duplicated part {}", key, index);
                return Ok(AddOutcome::Duplicate);
            }
            Ok(Installed::Complete(acc)) => acc,
            Err(err) => {
                self.report(Some(&key), &err);
                return Err(err);
            }
        };

        log::debug!("[Store] batch {} complete with {} parts", key, acc.total_chunks());
        match self.dispatch(&key, acc) {
            Ok(()) => Ok(AddOutcome::Dispatched),
            Err(err) => {
                self.report(Some(&key), &err);
                Ok(AddOutcome::Failed(err))
            }
        }
    }

    /// Evict batches older than the configured ttl, each one is reported as expired.
    ///
    /// Creation times come from the store timer, so `now_ms` must be read from that same timer.
    pub fn on_tick(&self, now_ms: u64) {
        let ttl_ms = match self.config.batch_ttl_ms {
            Some(ttl_ms) => ttl_ms,
            None => return,
        };

        let expired = {
            let mut batches = self.batches.lock();
            let keys: Vec<BatchKey> = batches
                .iter()
                .filter(|(_, acc)| now_ms >= acc.created_at_ms().saturating_add(ttl_ms))
                .map(|(key, _)| key.clone())
                .collect();
            keys.into_iter().filter_map(|key| batches.remove(&key).map(|acc| (key, acc))).collect::<Vec<_>>()
        };

        for (key, acc) in expired {
            let err: BatchError = ProtocolError::Expired {
                age_ms: now_ms.saturating_sub(acc.created_at_ms()),
                received: acc.received(),
                total: acc.total_chunks(),
            }
            .into();
            self.report(Some(&key), &err);
        }
    }

    /// Same as `on_tick` with the store timer
    pub fn sweep(&self) {
        self.on_tick(self.timer.now_ms());
    }

    fn install(&self, key: &BatchKey, total_chunks: u32, index: u32, data: Vec<u8>, metadata: M) -> Result<Installed<M>, BatchError> {
        let mut batches = self.batches.lock();
        let pending = batches.len();
        match batches.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let acc = entry.get_mut();
                if acc.total_chunks() != total_chunks {
                    return Err(ProtocolError::TotalMismatch {
                        expected: acc.total_chunks(),
                        got: total_chunks,
                    }
                    .into());
                }
                if acc.metadata() != &metadata {
                    return Err(ProtocolError::MetadataMismatch.into());
                }
                if acc.has_chunk(index) {
                    return Ok(Installed::Duplicate);
                }
                let complete = acc.set_chunk(index, data)?;
                let received = acc.received();
                if complete {
                    Ok(Installed::Complete(entry.remove()))
                } else {
                    Ok(Installed::Pending { received, total: total_chunks })
                }
            }
            Entry::Vacant(entry) => {
                let mut acc = BatchAccumulator::create(total_chunks, self.config.max_total_chunks, metadata, self.timer.now_ms())?;
                // single chunk batches never enter the registry
                if acc.set_chunk(index, data)? {
                    return Ok(Installed::Complete(acc));
                }
                if pending >= self.config.max_pending_batches {
                    return Err(CapacityError::TooManyPending {
                        pending,
                        max: self.config.max_pending_batches,
                    }
                    .into());
                }
                let received = acc.received();
                entry.insert(acc);
                Ok(Installed::Pending { received, total: total_chunks })
            }
        }
    }

    fn dispatch(&self, key: &BatchKey, acc: BatchAccumulator<M>) -> Result<(), BatchError> {
        let payload = acc.assemble(key, &self.codec)?;
        let metadata = acc.into_metadata();
        match catch_unwind(AssertUnwindSafe(|| self.dispatcher.on_complete(key.clone(), payload, metadata))) {
            Ok(res) => res.map_err(|reason| BatchError::Dispatch { key: key.clone(), reason }),
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(BatchError::Dispatch {
                    key: key.clone(),
                    reason: format!("dispatcher panicked: {}", reason),
                })
            }
        }
    }

    fn report(&self, key: Option<&BatchKey>, err: &BatchError) {
        self.reporter.report(err.kind(), key.cloned(), err.to_string());
    }
}
