use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("queue {0} not found")]
    QueueNotFound(String),
    #[error("broker error: {0}")]
    Broker(String),
}

/// Outgoing half of the broker connection, one call per chunk message
#[mockall::automock]
pub trait BrokerPublisher: Send + Sync {
    fn publish(&self, queue: &str, body: Vec<u8>) -> Result<(), PublishError>;
}
