use std::sync::Arc;

use chunkrpc_batch::{ChunkCodec, CodecError};
use thiserror::Error;

use crate::{
    rpc_msg::{ChunkMsg, RpcError},
    rpc_publisher::{BrokerPublisher, PublishError},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("encode chunk message error: {0}")]
    Encode(String),
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),
}

impl From<SendError> for RpcError {
    fn from(value: SendError) -> Self {
        match value {
            SendError::Codec(e) => RpcError::EncodeError(e.to_string()),
            SendError::Encode(e) => RpcError::EncodeError(e),
            SendError::Publish(e) => RpcError::PublishError(e.to_string()),
        }
    }
}

/// Fields shared by every chunk of one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchHeader {
    pub correlation_id: String,
    pub batch_name: String,
    pub reply_to: String,
    pub req_id: u64,
    pub procedure: Option<String>,
}

/// Splits payloads with a codec and publishes every chunk as its own broker message
pub struct BatchSender<C> {
    codec: C,
    publisher: Arc<dyn BrokerPublisher>,
}

impl<C: ChunkCodec> BatchSender<C> {
    pub fn new(codec: C, publisher: Arc<dyn BrokerPublisher>) -> Self {
        Self { codec, publisher }
    }

    /// Publish a payload to `queue`, returns the number of chunks sent
    pub fn send(&self, queue: &str, header: &BatchHeader, payload: &C::Payload) -> Result<u32, SendError> {
        let chunks = self.codec.encode(payload)?;
        let total_chunks = chunks.len() as u32;
        log::info!(
            "[BatchSender] send {} {} to {} in {} parts",
            header.batch_name,
            header.correlation_id,
            queue,
            total_chunks
        );
        for (chunk_index, payload) in chunks.into_iter().enumerate() {
            let msg = ChunkMsg {
                correlation_id: header.correlation_id.clone(),
                batch_name: header.batch_name.clone(),
                total_chunks,
                chunk_index: chunk_index as u32,
                reply_to: header.reply_to.clone(),
                req_id: header.req_id,
                procedure: header.procedure.clone(),
                payload,
            };
            let body = msg.to_bytes().map_err(|e| SendError::Encode(e.to_string()))?;
            self.publisher.publish(queue, body)?;
        }
        Ok(total_chunks)
    }
}
