//! # Transport
//!
//! The duplex channel to the engine. One `round_trip` carries one request
//! and returns its response; pairing is 1:1 and in order. Connection
//! handling, framing and timeouts belong to implementations.

use thiserror::Error;

/// Errors raised by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Cannot reach the engine.
    #[error("Cannot connect to {0}")]
    ConnectionFailed(String),

    /// `round_trip` called while not connected.
    #[error("Transport is not connected")]
    NotConnected,

    /// The engine closed the connection.
    #[error("Connection closed by peer")]
    ClosedByPeer,

    /// The engine sent a frame that is not a text response.
    #[error("Unexpected frame: {0}")]
    UnexpectedFrame(String),

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(String),
}

/// A request/response channel to the engine.
///
/// `Send` so a context can be moved onto worker threads.
pub trait Transport: Send {
    /// Acquire the connection.
    fn open(&mut self) -> Result<(), TransportError>;

    /// Send one serialized request and wait for its serialized response.
    fn round_trip(&mut self, request: &str) -> Result<String, TransportError>;

    /// Release the connection.
    fn close(&mut self) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self) -> Result<(), TransportError> {
        (**self).open()
    }

    fn round_trip(&mut self, request: &str) -> Result<String, TransportError> {
        (**self).round_trip(request)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }
}
