//! Every logical message, request or response, travels as a batch of chunk messages.
//!
//! - The payload is encoded by a `ChunkCodec` into N chunks no larger than `max_chunk_len`.
//! - Each chunk becomes one broker message whose body is a bincode `ChunkMsg` carrying the shared
//!   correlation id, the batch name (`request` or `response`), the chunk index and N.
//! - Transport metadata (reply_to, req_id, procedure) is repeated in every chunk, the receiver keeps
//!   the copy from the first chunk it sees and rejects chunks that disagree.
//!
//! ```text
//!   client                            broker                              server
//!   call() -> BatchSender ---- request chunks (any order, dups ok) ----> Store -> ServerDispatcher
//!   Store <- ClientDispatcher <------------ response chunks ------------ BatchSender
//! ```

pub(crate) mod send;
