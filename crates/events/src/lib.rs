//! `flora-events`: RPC envelopes and reply mechanics.
//!
//! Nothing in here performs IO: the envelope codec, the closed command set,
//! broker-level message models and the reply/handler traits that the
//! infrastructure layer implements.

pub mod bus;
pub mod command;
pub mod envelope;
pub mod handler;
pub mod in_memory_bus;
pub mod message;

pub use bus::ReplyBus;
pub use command::{FloraCommand, GetFloraById};
pub use envelope::{CommandEnvelope, Pattern, ResponseEnvelope, ResponseStatus};
pub use handler::RequestHandler;
pub use in_memory_bus::{InMemoryBusError, InMemoryReplyBus};
pub use message::{CorrelationContext, InboundMessage, OutboundReply, REPLY_CONTENT_TYPE};
