use crate::{
    codec::ChunkCodec,
    error::{BatchError, CapacityError, ProtocolError},
    key::BatchKey,
};

/// Reassembly state of one batch. Only the store touches it.
///
/// Received indices are tracked in a bitmask packed into `u64` words, `received` caches its popcount.
#[derive(Debug)]
pub(crate) struct BatchAccumulator<M> {
    total_chunks: u32,
    mask: Vec<u64>,
    received: u32,
    chunks: Vec<Option<Vec<u8>>>,
    metadata: M,
    created_at_ms: u64,
}

impl<M> BatchAccumulator<M> {
    pub fn create(total_chunks: u32, max_total_chunks: u32, metadata: M, now_ms: u64) -> Result<Self, BatchError> {
        if total_chunks == 0 {
            return Err(ProtocolError::ZeroChunks.into());
        }
        if total_chunks > max_total_chunks {
            return Err(CapacityError::TooManyChunks {
                total: total_chunks,
                max: max_total_chunks,
            }
            .into());
        }

        let words = (total_chunks as usize + 63) / 64;
        let mut chunks = Vec::with_capacity(total_chunks as usize);
        chunks.resize_with(total_chunks as usize, || None);
        Ok(Self {
            total_chunks,
            mask: vec![0; words],
            received: 0,
            chunks,
            metadata,
            created_at_ms: now_ms,
        })
    }

    pub fn total_chunks(&self) -> u32 {
        self.total_chunks
    }

    pub fn received(&self) -> u32 {
        self.received
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    pub fn has_chunk(&self, index: u32) -> bool {
        if index >= self.total_chunks {
            return false;
        }
        let (word, bit) = Self::bit_pos(index);
        self.mask[word] & bit != 0
    }

    /// Install a chunk, returns whether the batch is complete after this call.
    ///
    /// A chunk whose index is already set is ignored, broker redelivery makes that normal.
    pub fn set_chunk(&mut self, index: u32, data: Vec<u8>) -> Result<bool, ProtocolError> {
        if index >= self.total_chunks {
            return Err(ProtocolError::IndexOutOfRange { index, total: self.total_chunks });
        }
        let (word, bit) = Self::bit_pos(index);
        if self.mask[word] & bit == 0 {
            self.mask[word] |= bit;
            self.received += 1;
            self.chunks[index as usize] = Some(data);
        }
        Ok(self.is_complete())
    }

    pub fn is_complete(&self) -> bool {
        self.received == self.total_chunks
    }

    /// Concatenate chunks in index order and decode them
    pub fn assemble<C: ChunkCodec>(&self, key: &BatchKey, codec: &C) -> Result<C::Payload, BatchError> {
        if !self.is_complete() {
            return Err(ProtocolError::Incomplete {
                received: self.received,
                total: self.total_chunks,
            }
            .into());
        }

        let len: usize = self.chunks.iter().flatten().map(|c| c.len()).sum();
        let mut buf = Vec::with_capacity(len);
        for chunk in self.chunks.iter().flatten() {
            buf.extend_from_slice(chunk);
        }
        codec.decode(&buf).map_err(|e| BatchError::MalformedBatch {
            key: key.clone(),
            reason: e.to_string(),
        })
    }

    pub fn into_metadata(self) -> M {
        self.metadata
    }

    fn bit_pos(index: u32) -> (usize, u64) {
        ((index / 64) as usize, 1u64 << (index % 64))
    }
}
