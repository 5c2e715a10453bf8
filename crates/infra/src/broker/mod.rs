//! Broker-side request/reply plumbing.
//!
//! - [`processor`]: the per-message pipeline, transport-agnostic
//! - [`amqp`]: the AMQP responder (connection, consumer loop, reply channel)

pub mod amqp;
pub mod processor;

use async_trait::async_trait;
use thiserror::Error;

pub use amqp::{AmqpProbe, AmqpReplyBus, AmqpResponder, ConsumerHandle};
pub use processor::{Disposition, DropReason, process_message};

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker connection failed: {0}")]
    Connect(#[source] lapin::Error),

    #[error("broker channel error: {0}")]
    Channel(#[source] lapin::Error),

    #[error("consume failed: {0}")]
    Consume(#[source] lapin::Error),

    #[error("reply publish failed: {0}")]
    Publish(#[source] lapin::Error),

    #[error("acknowledgement failed: {0}")]
    Ack(#[source] lapin::Error),

    #[error("broker close failed: {0}")]
    Close(#[source] lapin::Error),

    #[error("consumer task failed: {0}")]
    Task(String),
}

/// Liveness check of the broker, used by the health probe.
#[async_trait]
pub trait BrokerProbe: Send + Sync {
    async fn ping(&self) -> Result<(), BrokerError>;
}
