//! JSON-RPC API Layer
//!
//! Implements the JSON-RPC 2.0 surface for Tabula: file upload, job status and the
//! paginated errors / processed views.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
