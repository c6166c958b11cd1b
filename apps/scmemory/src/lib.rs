//! # scmemory
//!
//! Pieces of the command-line client that are useful on their own: the
//! layered configuration and the WebSocket transport.

pub mod config;
pub mod error;
pub mod transport;

pub use config::ClientConfig;
pub use error::AppError;
pub use transport::WsTransport;
