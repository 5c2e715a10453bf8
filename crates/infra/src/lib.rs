//! Infrastructure layer: stores, entity assembly, dispatch, broker, config.

pub mod assembler;
pub mod broker;
pub mod command_dispatcher;
pub mod config;
pub mod document_store;
pub mod health;
pub mod record_store;

pub use assembler::EntityAssembler;
pub use command_dispatcher::CommandDispatcher;
pub use config::{ConfigError, ResponderConfig};
pub use health::{HealthCheck, HealthProbe, HealthReport};
