//! Flora responder: RPC consumer process plus its health endpoint.

pub mod app;
pub mod services;
