//! Dependency health probe.
//!
//! All three checks always run (concurrently); one failing never hides the
//! others.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::broker::BrokerProbe;
use crate::document_store::DocumentStore;
use crate::record_store::RecordStore;

pub const HEALTHY: &str = "healthy";

/// Wire form: `{mongo, postgres, rabbitmq, status, code}`.
///
/// Each dependency field is `"healthy"` or `"error: <detail>"`. `status` is
/// always `"healthy"` (the probe itself answered); `code` carries the verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub mongo: String,
    pub postgres: String,
    pub rabbitmq: String,
    pub status: String,
    pub code: u16,
}

impl HealthReport {
    pub fn from_checks<A, B, C>(
        mongo: Result<(), A>,
        postgres: Result<(), B>,
        rabbitmq: Result<(), C>,
    ) -> Self
    where
        A: std::fmt::Display,
        B: std::fmt::Display,
        C: std::fmt::Display,
    {
        let mongo = describe("mongo", mongo);
        let postgres = describe("postgres", postgres);
        let rabbitmq = describe("rabbitmq", rabbitmq);
        let code = if [&mongo, &postgres, &rabbitmq].iter().all(|s| *s == HEALTHY) {
            200
        } else {
            500
        };

        Self {
            mongo,
            postgres,
            rabbitmq,
            status: HEALTHY.to_string(),
            code,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.code == 200
    }
}

fn describe<E: std::fmt::Display>(dependency: &str, check: Result<(), E>) -> String {
    match check {
        Ok(()) => HEALTHY.to_string(),
        Err(err) => {
            warn!(dependency, error = %err, "health check failed");
            format!("error: {err}")
        }
    }
}

/// Object-safe handle for the HTTP layer.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn report(&self) -> HealthReport;
}

pub struct HealthProbe<R, D, B> {
    records: R,
    documents: D,
    broker: B,
}

impl<R, D, B> HealthProbe<R, D, B> {
    pub fn new(records: R, documents: D, broker: B) -> Self {
        Self {
            records,
            documents,
            broker,
        }
    }
}

#[async_trait]
impl<R, D, B> HealthCheck for HealthProbe<R, D, B>
where
    R: RecordStore,
    D: DocumentStore,
    B: BrokerProbe,
{
    async fn report(&self) -> HealthReport {
        let (mongo, postgres, rabbitmq) = tokio::join!(
            self.documents.ping(),
            self.records.ping(),
            self.broker.ping(),
        );
        HealthReport::from_checks(mongo, postgres, rabbitmq)
    }
}

#[async_trait]
impl<H> HealthCheck for Arc<H>
where
    H: HealthCheck + ?Sized,
{
    async fn report(&self) -> HealthReport {
        (**self).report().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::BrokerError;
    use crate::document_store::InMemoryDocumentStore;
    use crate::record_store::InMemoryRecordStore;

    struct StubBroker {
        up: bool,
    }

    #[async_trait]
    impl BrokerProbe for StubBroker {
        async fn ping(&self) -> Result<(), BrokerError> {
            if self.up {
                Ok(())
            } else {
                Err(BrokerError::Task("connection refused".to_string()))
            }
        }
    }

    #[tokio::test]
    async fn all_dependencies_up_is_200() {
        let probe = HealthProbe::new(
            InMemoryRecordStore::new(),
            InMemoryDocumentStore::new(),
            StubBroker { up: true },
        );

        let report = probe.report().await;

        assert_eq!(report.code, 200);
        assert_eq!(report.mongo, "healthy");
        assert_eq!(report.postgres, "healthy");
        assert_eq!(report.rabbitmq, "healthy");
        assert_eq!(report.status, "healthy");
    }

    #[tokio::test]
    async fn one_failure_does_not_mask_the_others() {
        let documents = InMemoryDocumentStore::new();
        documents.set_unavailable(true);
        let probe = HealthProbe::new(
            InMemoryRecordStore::new(),
            documents,
            StubBroker { up: false },
        );

        let report = probe.report().await;

        assert_eq!(report.code, 500);
        assert!(report.mongo.starts_with("error: "));
        assert!(report.rabbitmq.ends_with("connection refused"));
        assert_eq!(report.postgres, "healthy");
        assert_eq!(report.status, "healthy");
        assert!(!report.is_healthy());
    }

    #[test]
    fn report_serializes_with_flat_fields() {
        let report = HealthReport::from_checks::<String, String, String>(
            Ok(()),
            Err("timeout".to_string()),
            Ok(()),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "mongo": "healthy",
                "postgres": "error: timeout",
                "rabbitmq": "healthy",
                "status": "healthy",
                "code": 500
            })
        );
    }
}
