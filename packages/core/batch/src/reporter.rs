use crate::{error::ErrorKind, key::BatchKey};

/// Single side channel for every failure the store absorbs
#[mockall::automock]
pub trait ErrorReporter: Send + Sync {
    fn report(&self, kind: ErrorKind, key: Option<BatchKey>, description: String);
}

/// Default reporter, writes to the log facade
#[derive(Default, Clone)]
pub struct LogReporter();

impl ErrorReporter for LogReporter {
    fn report(&self, kind: ErrorKind, key: Option<BatchKey>, description: String) {
        let key = key.map(|k| k.to_string()).unwrap_or_else(|| "-".to_string());
        match kind {
            ErrorKind::Protocol | ErrorKind::Capacity => log::warn!("[Store] {:?} error on {}: {}", kind, key, description),
            ErrorKind::MalformedBatch | ErrorKind::Dispatch => log::error!("[Store] {:?} error on {}: {}", kind, key, description),
        }
    }
}
