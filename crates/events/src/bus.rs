//! Reply publishing abstraction (mechanics only).
//!
//! The responder answers each request by publishing one [`OutboundReply`] to
//! the queue named in the request's `reply_to`. This trait hides the transport
//! so the per-message pipeline can run against a real broker channel or an
//! in-memory recorder in tests.
//!
//! ## Sharing
//!
//! One bus instance is shared by every in-flight handler, so implementations
//! must be `Send + Sync` and safe to call concurrently. Replies carry their own
//! correlation token; the bus makes no ordering promise between them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::message::OutboundReply;

#[async_trait]
pub trait ReplyBus: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn publish(&self, reply: OutboundReply) -> Result<(), Self::Error>;
}

#[async_trait]
impl<B> ReplyBus for Arc<B>
where
    B: ReplyBus + ?Sized,
{
    type Error = B::Error;

    async fn publish(&self, reply: OutboundReply) -> Result<(), Self::Error> {
        (**self).publish(reply).await
    }
}
