//! Resource wiring: everything the process owns, acquired in order at startup
//! and released in reverse at shutdown.
//!
//! ```text
//! acquire:  Postgres pool → Mongo client → AMQP connection/channel → consumer
//! release:  consumer (drain) → channel → connection → Postgres pool → Mongo client
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use flora_infra::broker::{AmqpProbe, AmqpResponder, BrokerError, ConsumerHandle};
use flora_infra::document_store::{DocumentStoreError, MongoDocumentStore};
use flora_infra::record_store::{PostgresRecordStore, RecordStoreError};
use flora_infra::{CommandDispatcher, HealthCheck, HealthProbe, ResponderConfig};

pub type FloraDispatcher = CommandDispatcher<Arc<PostgresRecordStore>, Arc<MongoDocumentStore>>;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("postgres: {0}")]
    Postgres(#[from] RecordStoreError),

    #[error("mongo: {0}")]
    Mongo(#[from] DocumentStoreError),

    #[error("rabbitmq: {0}")]
    Broker(#[from] BrokerError),
}

/// Live resources of a running responder.
pub struct AppServices {
    records: Arc<PostgresRecordStore>,
    documents: Arc<MongoDocumentStore>,
    responder: AmqpResponder,
    consumer: ConsumerHandle,
    health: Arc<dyn HealthCheck>,
}

impl AppServices {
    /// Connect to every store and the broker, then start consuming.
    pub async fn start(config: &ResponderConfig) -> Result<Self, StartupError> {
        let records = Arc::new(
            PostgresRecordStore::connect(&config.postgres.url, config.postgres.max_connections)
                .await?,
        );
        let documents = Arc::new(
            MongoDocumentStore::connect(
                &config.mongo.url,
                &config.mongo.database,
                &config.mongo.collection,
            )
            .await?,
        );

        let responder = match AmqpResponder::connect(&config.broker).await {
            Ok(responder) => responder,
            Err(err) => {
                records.close().await;
                documents.close().await;
                return Err(err.into());
            }
        };

        let dispatcher: Arc<FloraDispatcher> =
            Arc::new(CommandDispatcher::new(records.clone(), documents.clone()));
        let consumer = responder.start(dispatcher).await?;

        let health: Arc<dyn HealthCheck> = Arc::new(HealthProbe::new(
            records.clone(),
            documents.clone(),
            AmqpProbe::new(config.broker.url.clone()),
        ));

        Ok(Self {
            records,
            documents,
            responder,
            consumer,
            health,
        })
    }

    pub fn health(&self) -> Arc<dyn HealthCheck> {
        self.health.clone()
    }

    /// Whether the consumer loop has stopped on its own (e.g. broker went away).
    pub fn consumer_finished(&self) -> bool {
        self.consumer.is_finished()
    }

    /// Tear down in reverse acquisition order. Store shutdown runs even if the
    /// broker teardown fails.
    pub async fn shutdown(self) -> Result<(), BrokerError> {
        let broker = self.responder.stop(self.consumer).await;
        if let Err(err) = &broker {
            error!(error = %err, "broker teardown failed");
        }

        self.records.close().await;
        self.documents.close().await;
        info!("all connections closed");

        broker
    }
}
