//! `flora-core`: domain building blocks for flora records.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod flora;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use flora::{Flora, FloraDocument, FloraRecord, Visibility};
pub use id::{FloraId, OwnerId};
