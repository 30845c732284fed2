//! Reassembly of chunked broker messages.
//!
//! A logical payload is split by a [`ChunkCodec`] into numbered chunks which travel as independent
//! broker messages sharing a correlation id. The [`Store`] collects them, in any order and with
//! duplicates, and hands the decoded payload to a [`Dispatcher`] exactly once per completion.
//!
//! ```text
//!  broker msg -> adapter -> Store::add -> accumulator (bitmask) -> complete? -> remove -> decode -> Dispatcher
//! ```

mod accumulator;
mod codec;
mod config;
mod dispatcher;
mod error;
mod key;
mod reporter;
mod store;

pub use codec::{BincodeCodec, ChunkCodec, CodecError, RawCodec, DEFAULT_MAX_CHUNK_LEN};
pub use config::{StoreConfig, DEFAULT_BATCH_TTL_MS, DEFAULT_MAX_PENDING_BATCHES, DEFAULT_MAX_TOTAL_CHUNKS};
pub use dispatcher::{Dispatcher, MockDispatcher};
pub use error::{BatchError, CapacityError, ErrorKind, ProtocolError};
pub use key::BatchKey;
pub use reporter::{ErrorReporter, LogReporter, MockErrorReporter};
pub use store::{AddOutcome, Chunk, Store};
