//! In-memory reply bus for tests/dev.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::bus::ReplyBus;
use crate::message::OutboundReply;

#[derive(Debug, thiserror::Error)]
pub enum InMemoryBusError {
    /// Publish failed due to internal lock poisoning.
    #[error("reply bus lock poisoned")]
    Poisoned,
    /// Publishing was switched off with [`InMemoryReplyBus::reject_publishes`].
    #[error("publish rejected")]
    Rejected,
}

/// Records every published reply, in publication order.
#[derive(Debug, Default)]
pub struct InMemoryReplyBus {
    published: Mutex<Vec<OutboundReply>>,
    reject: AtomicBool,
}

impl InMemoryReplyBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent publishes fail (simulates a broken channel).
    pub fn reject_publishes(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn replies(&self) -> Vec<OutboundReply> {
        self.published
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Replies addressed to one queue.
    pub fn replies_to(&self, queue: &str) -> Vec<OutboundReply> {
        self.replies()
            .into_iter()
            .filter(|r| r.routing_key == queue)
            .collect()
    }
}

#[async_trait]
impl ReplyBus for InMemoryReplyBus {
    type Error = InMemoryBusError;

    async fn publish(&self, reply: OutboundReply) -> Result<(), Self::Error> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(InMemoryBusError::Rejected);
        }
        self.published
            .lock()
            .map_err(|_| InMemoryBusError::Poisoned)?
            .push(reply);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(queue: &str) -> OutboundReply {
        OutboundReply {
            routing_key: queue.to_string(),
            correlation_id: None,
            content_type: crate::message::REPLY_CONTENT_TYPE,
            body: b"{}".to_vec(),
        }
    }

    #[tokio::test]
    async fn records_and_filters_by_queue() {
        let bus = InMemoryReplyBus::new();
        bus.publish(reply("a")).await.unwrap();
        bus.publish(reply("b")).await.unwrap();

        assert_eq!(bus.replies().len(), 2);
        assert_eq!(bus.replies_to("a").len(), 1);
    }

    #[tokio::test]
    async fn rejects_when_switched_off() {
        let bus = InMemoryReplyBus::new();
        bus.reject_publishes(true);
        assert!(matches!(bus.publish(reply("a")).await, Err(InMemoryBusError::Rejected)));
        assert!(bus.replies().is_empty());
    }
}
