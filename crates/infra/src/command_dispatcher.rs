//! Command execution pipeline (request-level orchestration).
//!
//! The dispatcher is the outermost error boundary of the service: it turns a
//! decoded [`CommandEnvelope`] into a [`ResponseEnvelope`], whatever happens on
//! the way.
//!
//! ## Command Execution Flow
//!
//! ```text
//! CommandEnvelope
//!   ↓
//! 1. Validate into a typed FloraCommand (400 on unknown cmd / bad payload)
//!   ↓
//! 2. Read relational record(s)          (404 when a by-id lookup misses)
//!   ↓
//! 3. Join each with its document        (500 on lookup error or absence)
//!   ↓
//! 4. Wrap in a ResponseEnvelope         (200 with a list of entities)
//! ```
//!
//! ## Failure handling
//!
//! Typed failures from the adapters are converted into [`DomainError`]s and
//! from there into error envelopes. A panic while handling a command is caught
//! and answered with a 500 `"Internal Server Error"`. No failure crosses the
//! transport boundary unconverted.
//!
//! The dispatcher holds no per-request state and performs reads only, so
//! re-running a command after a broker redelivery yields an equivalent reply.

use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{error, info, instrument, warn};

use flora_core::{DomainError, DomainResult, Flora};
use flora_events::{
    CommandEnvelope, FloraCommand, GetFloraById, RequestHandler, ResponseEnvelope,
};

use crate::assembler::EntityAssembler;
use crate::document_store::DocumentStore;
use crate::record_store::RecordStore;

/// Routes flora commands to the stores and assembles replies.
///
/// ## Generic Parameters
///
/// - `R`: relational store (`PostgresRecordStore` in production)
/// - `D`: document store (`MongoDocumentStore` in production)
///
/// Tests plug in `InMemoryRecordStore` / `InMemoryDocumentStore`.
#[derive(Debug)]
pub struct CommandDispatcher<R, D> {
    records: R,
    assembler: EntityAssembler<D>,
}

impl<R, D> CommandDispatcher<R, D> {
    pub fn new(records: R, documents: D) -> Self {
        Self {
            records,
            assembler: EntityAssembler::new(documents),
        }
    }

    pub fn records(&self) -> &R {
        &self.records
    }

    pub fn documents(&self) -> &D {
        self.assembler.documents()
    }
}

impl<R, D> CommandDispatcher<R, D>
where
    R: RecordStore,
    D: DocumentStore,
{
    /// Run a typed command against the stores.
    pub async fn dispatch(&self, command: FloraCommand) -> DomainResult<Vec<Flora>> {
        match command {
            FloraCommand::GetAllFloras => {
                let records = self.records.list_all().await?;
                self.assembler.assemble_many(records).await
            }
            FloraCommand::GetFloraById(GetFloraById { flora_id }) => {
                let record = self
                    .records
                    .get_by_id(flora_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("Flora not found"))?;
                let flora = self.assembler.assemble(record).await?;
                Ok(vec![flora])
            }
        }
    }

    /// Validate, dispatch and wrap. Never fails.
    #[instrument(skip_all, fields(cmd = %envelope.cmd()))]
    pub async fn execute(&self, envelope: CommandEnvelope) -> ResponseEnvelope {
        let command = match FloraCommand::from_envelope(&envelope) {
            Ok(command) => command,
            Err(err) => {
                warn!(error = %err, "rejected command");
                return err.into();
            }
        };

        let outcome = AssertUnwindSafe(self.dispatch(command))
            .catch_unwind()
            .await;

        let response = match outcome {
            Ok(Ok(floras)) => match serde_json::to_value(&floras) {
                Ok(data) => ResponseEnvelope::success(data),
                Err(err) => {
                    error!(error = %err, "failed to serialize floras");
                    ResponseEnvelope::internal_error()
                }
            },
            Ok(Err(err)) => {
                if err.code() >= 500 {
                    error!(error = %err, "command failed");
                }
                err.into()
            }
            Err(_) => {
                error!("command handler panicked");
                ResponseEnvelope::internal_error()
            }
        };

        info!(code = response.code, "command handled");
        response
    }
}

#[async_trait]
impl<R, D> RequestHandler for CommandDispatcher<R, D>
where
    R: RecordStore,
    D: DocumentStore,
{
    async fn handle(&self, envelope: CommandEnvelope) -> ResponseEnvelope {
        self.execute(envelope).await
    }
}
