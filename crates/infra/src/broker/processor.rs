//! Per-message request/reply pipeline.
//!
//! Each consumed message walks this state machine:
//!
//! ```text
//! Received → Decoding → Addressing → Dispatching → Replying → Acknowledged
//!               │           │                          │
//!               └─ Dropped ─┴──→ Acknowledged          └─ PublishFailed → Rejected
//! ```
//!
//! A body that cannot be decoded has no trustworthy reply target, and a message
//! without `reply_to` has none at all, so both are logged and dropped. The
//! caller acknowledges the message in every case except a failed publish
//! (see [`Disposition::PublishFailed`]).

use tracing::{debug, error, info, warn};

use flora_core::DomainError;
use flora_events::{CommandEnvelope, InboundMessage, ReplyBus, RequestHandler};

/// Why a message was dropped without a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The body is not a command envelope.
    Protocol(DomainError),
    /// The message names no reply queue.
    NoReplyTo,
}

/// Terminal state of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// A reply was published; acknowledge.
    Replied {
        correlation_id: Option<String>,
        code: u16,
    },
    /// Nothing was published; acknowledge and forget.
    Dropped(DropReason),
    /// The reply could not be published; reject without requeue.
    PublishFailed(String),
}

impl Disposition {
    /// Whether the message should be acknowledged (as opposed to rejected).
    pub fn should_ack(&self) -> bool {
        !matches!(self, Disposition::PublishFailed(_))
    }
}

/// Decode, dispatch and reply to one inbound message.
pub async fn process_message<H, B>(handler: &H, bus: &B, message: InboundMessage) -> Disposition
where
    H: RequestHandler + ?Sized,
    B: ReplyBus + ?Sized,
{
    debug!(
        bytes = message.body.len(),
        redelivered = message.redelivered,
        "received request"
    );

    let envelope = match CommandEnvelope::decode(&message.body) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(error = %err, "dropping undecodable message");
            return Disposition::Dropped(DropReason::Protocol(err));
        }
    };

    let Some(correlation) = message.correlation() else {
        warn!(cmd = envelope.cmd(), "`reply_to` not specified; dropping request");
        return Disposition::Dropped(DropReason::NoReplyTo);
    };

    let response = handler.handle(envelope).await;
    let code = response.code;
    let correlation_id = correlation.correlation_id().map(str::to_string);
    let reply_to = correlation.reply_to().to_string();

    let reply = match correlation.reply(&response) {
        Ok(reply) => reply,
        Err(err) => {
            error!(error = %err, "failed to encode reply");
            return Disposition::PublishFailed(err.to_string());
        }
    };

    match bus.publish(reply).await {
        Ok(()) => {
            info!(
                reply_to = %reply_to,
                correlation_id = correlation_id.as_deref().unwrap_or(""),
                code,
                "sent response"
            );
            Disposition::Replied {
                correlation_id,
                code,
            }
        }
        Err(err) => {
            error!(reply_to = %reply_to, error = %err, "failed to publish reply");
            Disposition::PublishFailed(err.to_string())
        }
    }
}
