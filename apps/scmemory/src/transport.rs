//! # WebSocket Transport
//!
//! Blocking WebSocket client for the engine's JSON endpoint. Each request
//! is one text frame; the next text frame is its response. Control frames
//! are handled by tungstenite while reading.

use scmemory_core::{Transport, TransportError};
use std::net::TcpStream;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Transport speaking to an engine over WebSocket.
pub struct WsTransport {
    url: String,
    socket: Option<Socket>,
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("url", &self.url)
            .field("connected", &self.socket.is_some())
            .finish()
    }
}

impl WsTransport {
    /// A transport for `url`. Nothing is connected until `open`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            socket: None,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn map_ws_error(error: tungstenite::Error) -> TransportError {
    match error {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::ClosedByPeer
        }
        other => TransportError::Io(other.to_string()),
    }
}

impl Transport for WsTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        let (socket, _response) = tungstenite::connect(self.url.as_str())
            .map_err(|e| TransportError::ConnectionFailed(format!("{}: {}", self.url, e)))?;
        tracing::debug!(url = %self.url, "websocket connected");
        self.socket = Some(socket);
        Ok(())
    }

    fn round_trip(&mut self, request: &str) -> Result<String, TransportError> {
        let socket = self.socket.as_mut().ok_or(TransportError::NotConnected)?;
        socket
            .send(Message::Text(request.to_string()))
            .map_err(map_ws_error)?;
        loop {
            match socket.read().map_err(map_ws_error)? {
                Message::Text(text) => return Ok(text),
                Message::Binary(bytes) => {
                    return String::from_utf8(bytes)
                        .map_err(|e| TransportError::UnexpectedFrame(e.to_string()));
                }
                Message::Close(_) => return Err(TransportError::ClosedByPeer),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let mut socket = self.socket.take().ok_or(TransportError::NotConnected)?;
        match socket.close(None) {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed) => {}
            Err(e) => return Err(map_ws_error(e)),
        }
        // Drain until the peer acknowledges the close.
        loop {
            match socket.read() {
                Ok(_) => {}
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    break;
                }
                Err(e) => return Err(map_ws_error(e)),
            }
        }
        tracing::debug!(url = %self.url, "websocket closed");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
