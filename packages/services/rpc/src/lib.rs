mod config;
mod rpc_batch;
mod rpc_client;
mod rpc_id_gen;
mod rpc_msg;
mod rpc_procedure;
mod rpc_publisher;
mod rpc_server;

pub use config::{RpcConfig, DEFAULT_CALL_TIMEOUT_MS};
pub use rpc_batch::send::{BatchHeader, BatchSender, SendError};
pub use rpc_client::{ClientDispatcher, RpcClient};
pub use rpc_id_gen::RpcIdGenerate;
pub use rpc_msg::{ChunkMsg, ClientMeta, Delivery, RpcAnswer, RpcError, ServerMeta, REQUEST_BATCH, RESPONSE_BATCH};
pub use rpc_procedure::{typed, Procedure, ProcedureRegistry, RawProcedure, TypedProcedure};
pub use rpc_publisher::{BrokerPublisher, MockBrokerPublisher, PublishError};
pub use rpc_server::{RpcServer, ServerDispatcher};
