use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::config::DEFAULT_MAX_TOTAL_CHUNKS;

pub const DEFAULT_MAX_CHUNK_LEN: usize = 64 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("serialize error: {0}")]
    Serialize(String),
    #[error("deserialize error: {0}")]
    Deserialize(String),
    #[error("payload needs {parts} chunks, max is {max}")]
    TooLarge { parts: usize, max: u32 },
}

/// Turns a payload into ordered chunks no larger than a byte budget, and back.
///
/// `decode` receives the concatenation of every chunk in index order.
pub trait ChunkCodec: Send + Sync {
    type Payload;

    fn encode(&self, payload: &Self::Payload) -> Result<Vec<Vec<u8>>, CodecError>;
    fn decode(&self, buf: &[u8]) -> Result<Self::Payload, CodecError>;
}

/// Payload is the raw bytes, chunks are plain slices of it
#[derive(Debug, Clone)]
pub struct RawCodec {
    max_chunk_len: usize,
    max_chunks: u32,
}

impl Default for RawCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_LEN, DEFAULT_MAX_TOTAL_CHUNKS)
    }
}

impl RawCodec {
    pub fn new(max_chunk_len: usize, max_chunks: u32) -> Self {
        Self {
            max_chunk_len: max_chunk_len.max(1),
            max_chunks,
        }
    }

    pub fn max_chunk_len(&self) -> usize {
        self.max_chunk_len
    }

    /// Split a buffer into chunks of `max_chunk_len`, an empty buffer still yields a single empty chunk
    pub fn split(&self, buf: &[u8]) -> Result<Vec<Vec<u8>>, CodecError> {
        let parts = calc_part_count(buf.len(), self.max_chunk_len);
        if parts > self.max_chunks as usize {
            return Err(CodecError::TooLarge { parts, max: self.max_chunks });
        }
        if buf.is_empty() {
            return Ok(vec![vec![]]);
        }
        Ok(buf.chunks(self.max_chunk_len).map(|c| c.to_vec()).collect())
    }
}

impl ChunkCodec for RawCodec {
    type Payload = Vec<u8>;

    fn encode(&self, payload: &Vec<u8>) -> Result<Vec<Vec<u8>>, CodecError> {
        self.split(payload)
    }

    fn decode(&self, buf: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(buf.to_vec())
    }
}

/// Payload is any serde type, serialized with bincode before splitting
pub struct BincodeCodec<T> {
    _tmp: PhantomData<fn() -> T>,
    raw: RawCodec,
}

impl<T> Default for BincodeCodec<T> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_LEN, DEFAULT_MAX_TOTAL_CHUNKS)
    }
}

impl<T> BincodeCodec<T> {
    pub fn new(max_chunk_len: usize, max_chunks: u32) -> Self {
        Self {
            _tmp: Default::default(),
            raw: RawCodec::new(max_chunk_len, max_chunks),
        }
    }
}

impl<T: Serialize + DeserializeOwned> ChunkCodec for BincodeCodec<T> {
    type Payload = T;

    fn encode(&self, payload: &T) -> Result<Vec<Vec<u8>>, CodecError> {
        let buf = bincode::serialize(payload).map_err(|e| CodecError::Serialize(e.to_string()))?;
        self.raw.split(&buf)
    }

    fn decode(&self, buf: &[u8]) -> Result<T, CodecError> {
        bincode::deserialize(buf).map_err(|e| CodecError::Deserialize(e.to_string()))
    }
}

/// Number of parts needed for `len` bytes, never less than one
fn calc_part_count(len: usize, max_part_len: usize) -> usize {
    if len == 0 {
        1
    } else if len % max_part_len == 0 {
        len / max_part_len
    } else {
        len / max_part_len + 1
    }
}
