//! Broker-level message models (transport-agnostic).

use crate::envelope::ResponseEnvelope;

/// Content type of every reply body.
pub const REPLY_CONTENT_TYPE: &str = "application/json";

/// A message as received from the inbound queue.
///
/// `reply_to` and `correlation_id` are supplied by the caller and opaque here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub body: Vec<u8>,
    pub reply_to: Option<String>,
    pub correlation_id: Option<String>,
    /// Set by the broker when the message is delivered more than once.
    pub redelivered: bool,
}

impl InboundMessage {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            reply_to: None,
            correlation_id: None,
            redelivered: false,
        }
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Extract the correlation context, if the message can be answered at all.
    ///
    /// An empty `reply_to` counts as absent.
    pub fn correlation(&self) -> Option<CorrelationContext> {
        let reply_to = self.reply_to.as_deref().filter(|r| !r.is_empty())?;
        Some(CorrelationContext {
            reply_to: reply_to.to_string(),
            correlation_id: self.correlation_id.clone(),
        })
    }
}

/// Per-request reply addressing.
///
/// Lives for exactly one request/reply cycle: [`CorrelationContext::reply`]
/// consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationContext {
    reply_to: String,
    correlation_id: Option<String>,
}

impl CorrelationContext {
    pub fn reply_to(&self) -> &str {
        &self.reply_to
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Address `response` back to the caller, echoing the correlation token.
    pub fn reply(self, response: &ResponseEnvelope) -> Result<OutboundReply, serde_json::Error> {
        Ok(OutboundReply {
            routing_key: self.reply_to,
            correlation_id: self.correlation_id,
            content_type: REPLY_CONTENT_TYPE,
            body: response.to_json_bytes()?,
        })
    }
}

/// A reply ready for publication on the default exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub routing_key: String,
    pub correlation_id: Option<String>,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl OutboundReply {
    pub fn response(&self) -> Result<ResponseEnvelope, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_reply_to_means_no_correlation() {
        assert!(InboundMessage::new("{}").correlation().is_none());
        assert!(InboundMessage::new("{}").with_reply_to("").correlation().is_none());
    }

    #[test]
    fn reply_echoes_token_and_queue() {
        let ctx = InboundMessage::new("{}")
            .with_reply_to("amq.rabbitmq.reply-to.abc")
            .with_correlation_id("corr-7")
            .correlation()
            .unwrap();

        let reply = ctx.reply(&ResponseEnvelope::success(json!([]))).unwrap();
        assert_eq!(reply.routing_key, "amq.rabbitmq.reply-to.abc");
        assert_eq!(reply.correlation_id.as_deref(), Some("corr-7"));
        assert_eq!(reply.content_type, "application/json");
        assert_eq!(reply.response().unwrap().code, 200);
    }
}
