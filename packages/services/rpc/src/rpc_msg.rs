use chunkrpc_batch::{BatchKey, Chunk, ProtocolError};
use serde::{Deserialize, Serialize};

pub const REQUEST_BATCH: &str = "request";
pub const RESPONSE_BATCH: &str = "response";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub enum RpcError {
    ProcedureNotFound(String),
    InvalidParams(String),
    Timeout,
    LocalQueueError,
    PublishError(String),
    EncodeError(String),
    DeserializeError,
    RuntimeError(String),
}

/// What the server sends back for one call
pub type RpcAnswer = Result<Vec<u8>, RpcError>;

/// Broker acknowledgement decision for one delivered message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Ack,
    Nack,
}

/// Body of every broker message: one chunk of a batch plus the transport metadata
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct ChunkMsg {
    pub correlation_id: String,
    pub batch_name: String,
    pub total_chunks: u32,
    pub chunk_index: u32,
    pub reply_to: String,
    pub req_id: u64,
    pub procedure: Option<String>,
    pub payload: Vec<u8>,
}

/// Captured from the first request chunk, handed to the server dispatcher
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ServerMeta {
    pub procedure: String,
    pub reply_to: String,
    pub req_id: u64,
}

/// Captured from the first response chunk, handed to the client dispatcher
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ClientMeta {
    pub reply_to: String,
    pub req_id: u64,
}

impl ChunkMsg {
    pub fn key(&self) -> BatchKey {
        BatchKey::new(self.correlation_id.clone(), self.batch_name.clone())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn into_server_chunk(self) -> Result<Chunk<ServerMeta>, ProtocolError> {
        let key = self.key();
        let procedure = self.procedure.ok_or(ProtocolError::MissingField("procedure"))?;
        if self.reply_to.is_empty() {
            return Err(ProtocolError::MissingField("reply_to"));
        }
        Ok(Chunk {
            key,
            total_chunks: self.total_chunks,
            index: self.chunk_index,
            data: self.payload,
            metadata: ServerMeta {
                procedure,
                reply_to: self.reply_to,
                req_id: self.req_id,
            },
        })
    }

    pub fn into_client_chunk(self) -> Chunk<ClientMeta> {
        let key = self.key();
        Chunk {
            key,
            total_chunks: self.total_chunks,
            index: self.chunk_index,
            data: self.payload,
            metadata: ClientMeta {
                reply_to: self.reply_to,
                req_id: self.req_id,
            },
        }
    }
}

impl TryFrom<&[u8]> for ChunkMsg {
    type Error = ProtocolError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        bincode::deserialize(value).map_err(|e| ProtocolError::Unparsable(e.to_string()))
    }
}
