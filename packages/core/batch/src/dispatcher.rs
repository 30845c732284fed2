use crate::key::BatchKey;

/// Consumer of a fully reassembled payload.
///
/// Called exactly once per completed batch, outside of the store lock, with the metadata captured
/// from the first chunk of the batch. An `Err` is reported by the store and never retried.
#[mockall::automock]
pub trait Dispatcher<P: Send + Sync + 'static, M: Send + Sync + 'static>: Send + Sync {
    fn on_complete(&self, key: BatchKey, payload: P, metadata: M) -> Result<(), String>;
}
