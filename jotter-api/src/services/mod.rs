//! Service Layer
//!
//! Use-case orchestration between the RPC facade and the backend ports.

mod liveness_service;
mod note_service;

pub use liveness_service::*;
pub use note_service::*;
