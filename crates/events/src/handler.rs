use std::sync::Arc;

use async_trait::async_trait;

use crate::envelope::{CommandEnvelope, ResponseEnvelope};

/// Answers a decoded command envelope (request handler abstraction).
///
/// This is the transport-agnostic contract between the broker responder and
/// the business logic. It is total: every failure is folded into the returned
/// [`ResponseEnvelope`], so nothing escapes a handler as an error. The same
/// handler can sit behind the broker or an HTTP route.
///
/// Handlers may be re-run for the same envelope after a broker redelivery and
/// must produce an equivalent response each time.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, envelope: CommandEnvelope) -> ResponseEnvelope;
}

#[async_trait]
impl<H> RequestHandler for Arc<H>
where
    H: RequestHandler + ?Sized,
{
    async fn handle(&self, envelope: CommandEnvelope) -> ResponseEnvelope {
        (**self).handle(envelope).await
    }
}
