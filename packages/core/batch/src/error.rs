use thiserror::Error;

use crate::key::BatchKey;

/// Malformed chunk header or metadata. The offending chunk is rejected and nothing else changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("total_chunks must be positive")]
    ZeroChunks,
    #[error("chunk index {index} out of range for batch of {total} chunks")]
    IndexOutOfRange { index: u32, total: u32 },
    #[error("batch declared {expected} chunks but chunk declares {got}")]
    TotalMismatch { expected: u32, got: u32 },
    #[error("chunk metadata differs from the first chunk of the batch")]
    MetadataMismatch,
    #[error("unparsable chunk message: {0}")]
    Unparsable(String),
    #[error("missing chunk field {0}")]
    MissingField(&'static str),
    #[error("batch incomplete, {received}/{total} chunks received")]
    Incomplete { received: u32, total: u32 },
    #[error("batch expired after {age_ms} ms with {received}/{total} chunks received")]
    Expired { age_ms: u64, received: u32, total: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityError {
    #[error("batch declares {total} chunks, max is {max}")]
    TooManyChunks { total: u32, max: u32 },
    #[error("{pending} batches already pending, max is {max}")]
    TooManyPending { pending: usize, max: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("malformed batch {key}: {reason}")]
    MalformedBatch { key: BatchKey, reason: String },
    #[error("dispatch of {key} failed: {reason}")]
    Dispatch { key: BatchKey, reason: String },
    #[error("capacity exceeded: {0}")]
    Capacity(#[from] CapacityError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Protocol,
    MalformedBatch,
    Dispatch,
    Capacity,
}

impl BatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BatchError::Protocol(_) => ErrorKind::Protocol,
            BatchError::MalformedBatch { .. } => ErrorKind::MalformedBatch,
            BatchError::Dispatch { .. } => ErrorKind::Dispatch,
            BatchError::Capacity(_) => ErrorKind::Capacity,
        }
    }

    /// Whether the chunk that caused this error should be refused at the broker
    pub fn is_rejection(&self) -> bool {
        matches!(self.kind(), ErrorKind::Protocol | ErrorKind::Capacity)
    }
}
