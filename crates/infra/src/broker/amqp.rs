//! AMQP (RabbitMQ) responder.
//!
//! - **Durable inbound queue**: declared on connect
//! - **Manual acknowledgement**: a message is acked only after its reply has
//!   been published, so a crash mid-request leaves it for redelivery
//! - **Concurrent handlers**: every delivery is processed in its own task; the
//!   channel is shared by all of them for publishing replies
//! - **Ordered teardown**: cancel subscription → drain in-flight handlers →
//!   close channel → close connection
//!
//! ## Lifecycle
//!
//! ```text
//! AmqpResponder::connect ──→ start(handler) ──→ ConsumerHandle
//!                                                   │
//! AmqpResponder::stop(consumer) ←───────────────────┘
//! ```
//!
//! `stop` takes the [`ConsumerHandle`], so the channel cannot be closed while
//! the subscription is still live.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicCancelOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
    BasicRejectOptions, QueueDeclareOptions,
};
use lapin::message::Delivery;
use lapin::types::{FieldTable, ShortString};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, instrument, warn};

use flora_events::{InboundMessage, OutboundReply, ReplyBus, RequestHandler};

use super::processor::process_message;
use super::{BrokerError, BrokerProbe};
use crate::config::BrokerConfig;

const REPLY_OK: u16 = 200;

/// Publishes replies through the default exchange, routed by queue name.
#[derive(Clone)]
pub struct AmqpReplyBus {
    channel: Channel,
}

impl AmqpReplyBus {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ReplyBus for AmqpReplyBus {
    type Error = BrokerError;

    async fn publish(&self, reply: OutboundReply) -> Result<(), Self::Error> {
        let mut properties =
            BasicProperties::default().with_content_type(ShortString::from(reply.content_type.to_string()));
        if let Some(correlation_id) = reply.correlation_id {
            properties = properties.with_correlation_id(ShortString::from(correlation_id));
        }

        self.channel
            .basic_publish(
                "",
                &reply.routing_key,
                BasicPublishOptions::default(),
                &reply.body,
                properties,
            )
            .await
            .map_err(BrokerError::Publish)?
            .await
            .map_err(BrokerError::Publish)?;

        Ok(())
    }
}

/// Owns the broker connection and the single channel used for both consuming
/// and replying.
pub struct AmqpResponder {
    connection: Connection,
    channel: Channel,
    queue_name: String,
    consumer_tag: String,
}

impl AmqpResponder {
    /// Connect, open one channel and declare the inbound queue as durable.
    ///
    /// No retry: an unreachable broker at startup is fatal for the caller.
    #[instrument(skip(config), fields(queue = %config.queue_name), err)]
    pub async fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let connection = Connection::connect(&config.url, ConnectionProperties::default())
            .await
            .map_err(BrokerError::Connect)?;

        let channel = connection
            .create_channel()
            .await
            .map_err(BrokerError::Channel)?;

        channel
            .queue_declare(
                &config.queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(BrokerError::Channel)?;

        channel
            .basic_qos(config.prefetch_count, BasicQosOptions::default())
            .await
            .map_err(BrokerError::Channel)?;

        info!(
            queue = %config.queue_name,
            prefetch = config.prefetch_count,
            "connected to queue"
        );

        Ok(Self {
            connection,
            channel,
            queue_name: config.queue_name.clone(),
            consumer_tag: config.consumer_tag.clone(),
        })
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Begin consuming with manual acknowledgement.
    ///
    /// Returns once the subscription is registered; messages are handled on a
    /// background task until [`AmqpResponder::stop`].
    pub async fn start<H>(&self, handler: Arc<H>) -> Result<ConsumerHandle, BrokerError>
    where
        H: RequestHandler + 'static,
    {
        let consumer = self
            .channel
            .basic_consume(
                &self.queue_name,
                &self.consumer_tag,
                BasicConsumeOptions {
                    no_ack: false,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(BrokerError::Consume)?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let bus = Arc::new(AmqpReplyBus::new(self.channel.clone()));
        let join = tokio::spawn(consume_loop(
            consumer,
            self.channel.clone(),
            self.consumer_tag.clone(),
            handler,
            bus,
            shutdown_rx,
        ));

        info!(queue = %self.queue_name, "waiting for RPC requests");

        Ok(ConsumerHandle {
            shutdown: shutdown_tx,
            join,
        })
    }

    /// Cancel consumption, then close the channel, then the connection.
    ///
    /// Every step runs even if an earlier one failed; the first error wins.
    pub async fn stop(self, consumer: ConsumerHandle) -> Result<(), BrokerError> {
        let consumed = consumer.cancel().await;
        let channel = self.channel.close(REPLY_OK, "OK").await.map_err(BrokerError::Close);
        let connection = self
            .connection
            .close(REPLY_OK, "OK")
            .await
            .map_err(BrokerError::Close);

        info!(queue = %self.queue_name, "stopped consuming");
        first_error([consumed, channel, connection])
    }
}

/// Keep the earliest failure of an ordered teardown, logging the rest.
fn first_error<const N: usize>(steps: [Result<(), BrokerError>; N]) -> Result<(), BrokerError> {
    let mut first = Ok(());
    for step in steps {
        if let Err(err) = step {
            if first.is_ok() {
                first = Err(err);
            } else {
                warn!(error = %err, "further teardown failure");
            }
        }
    }
    first
}

/// Handle to the background consumer task.
#[derive(Debug)]
pub struct ConsumerHandle {
    shutdown: oneshot::Sender<()>,
    join: JoinHandle<Result<(), BrokerError>>,
}

impl ConsumerHandle {
    /// Whether the consumer loop has already exited (e.g. connection lost).
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the loop and wait until every in-flight handler has finished.
    async fn cancel(self) -> Result<(), BrokerError> {
        let _ = self.shutdown.send(());
        match self.join.await {
            Ok(result) => result,
            Err(err) => Err(BrokerError::Task(err.to_string())),
        }
    }
}

async fn consume_loop<H>(
    mut consumer: Consumer,
    channel: Channel,
    consumer_tag: String,
    handler: Arc<H>,
    bus: Arc<AmqpReplyBus>,
    mut shutdown: oneshot::Receiver<()>,
) -> Result<(), BrokerError>
where
    H: RequestHandler + 'static,
{
    let mut in_flight = JoinSet::new();
    let mut outcome = Ok(());

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(err) = joined {
                    error!(error = %err, "request handler task failed");
                }
            }
            next = consumer.next() => match next {
                Some(Ok(delivery)) => {
                    in_flight.spawn(handle_delivery(handler.clone(), bus.clone(), delivery));
                }
                Some(Err(err)) => {
                    error!(error = %err, "consumer stream failed");
                    outcome = Err(BrokerError::Consume(err));
                    break;
                }
                None => {
                    warn!("consumer stream closed by broker");
                    break;
                }
            },
        }
    }

    if let Err(err) = channel
        .basic_cancel(&consumer_tag, BasicCancelOptions::default())
        .await
    {
        warn!(error = %err, "failed to cancel subscription");
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(err) = joined {
            error!(error = %err, "request handler task failed");
        }
    }

    outcome
}

async fn handle_delivery<H>(handler: Arc<H>, bus: Arc<AmqpReplyBus>, delivery: Delivery)
where
    H: RequestHandler + 'static,
{
    let message = inbound_message(&delivery);
    let disposition = process_message(&*handler, &*bus, message).await;

    let settled = if disposition.should_ack() {
        delivery
            .ack(BasicAckOptions::default())
            .await
            .map_err(BrokerError::Ack)
    } else {
        delivery
            .reject(BasicRejectOptions { requeue: false })
            .await
            .map_err(BrokerError::Ack)
    };

    if let Err(err) = settled {
        error!(delivery_tag = delivery.delivery_tag, error = %err, "failed to settle message");
    }
}

fn inbound_message(delivery: &Delivery) -> InboundMessage {
    let properties = &delivery.properties;
    InboundMessage {
        body: delivery.data.clone(),
        reply_to: properties.reply_to().as_ref().map(|s| s.as_str().to_string()),
        correlation_id: properties
            .correlation_id()
            .as_ref()
            .map(|s| s.as_str().to_string()),
        redelivered: delivery.redelivered,
    }
}

/// Health check that opens and closes a fresh connection.
#[derive(Debug, Clone)]
pub struct AmqpProbe {
    url: String,
}

impl AmqpProbe {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl BrokerProbe for AmqpProbe {
    async fn ping(&self) -> Result<(), BrokerError> {
        let connection = Connection::connect(&self.url, ConnectionProperties::default())
            .await
            .map_err(BrokerError::Connect)?;
        connection
            .close(REPLY_OK, "OK")
            .await
            .map_err(BrokerError::Close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teardown_reports_the_earliest_failure() {
        let result = first_error([
            Ok(()),
            Err(BrokerError::Task("channel close failed".to_string())),
            Err(BrokerError::Task("connection close failed".to_string())),
        ]);
        assert!(matches!(result, Err(BrokerError::Task(m)) if m == "channel close failed"));

        assert!(first_error([Ok(()), Ok(()), Ok(())]).is_ok());
    }
}
