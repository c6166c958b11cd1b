//! # Core Type Definitions
//!
//! This module contains the value types shared by every protocol layer:
//! - Engine addresses (`ScAddr`)
//! - Semantic type tags (`NodeType`, `EdgeType`, `LinkType`)
//! - Link content (`ContentType`, `LinkContent`)
//! - Error types (`ScMemoryError`)

pub mod sc_type;

pub use sc_type::{EdgeType, LinkType, NodeType};

use crate::context::SessionState;
use crate::request::RequestKind;
use crate::transport::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// ADDRESS
// =============================================================================

/// Identity the engine assigns to a committed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScAddr(pub u64);

impl ScAddr {
    /// The engine reports `0` for an element it could not create.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Get the raw address value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// LINK CONTENT
// =============================================================================

/// Declared content type of a link. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "int")]
    Integer,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "string")]
    String,
}

impl ContentType {
    /// Wire name of the content type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Integer => "int",
            Self::Float => "float",
            Self::String => "string",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" | "integer" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "string" | "str" => Ok(Self::String),
            other => Err(format!("unknown content type '{other}'")),
        }
    }
}

/// Content value carried by a link.
///
/// Serialized untagged; the accompanying `content_type` field on the wire
/// is the discriminator when reading values back (see `coerce`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkContent {
    Integer(i64),
    Float(f64),
    String(String),
}

impl LinkContent {
    /// Content type of this value.
    #[must_use]
    pub const fn content_type(&self) -> ContentType {
        match self {
            Self::Integer(_) => ContentType::Integer,
            Self::Float(_) => ContentType::Float,
            Self::String(_) => ContentType::String,
        }
    }

    /// Reinterpret an untagged value under its declared content type.
    ///
    /// Needed because `3` and `3.0` are indistinguishable once untagged.
    #[must_use]
    pub fn coerce(self, content_type: ContentType) -> Option<Self> {
        match (self, content_type) {
            (v @ Self::Integer(_), ContentType::Integer)
            | (v @ Self::Float(_), ContentType::Float)
            | (v @ Self::String(_), ContentType::String) => Some(v),
            (Self::Integer(i), ContentType::Float) => Some(Self::Float(i as f64)),
            _ => None,
        }
    }

    /// Interpret a raw JSON value as content of the given type.
    ///
    /// Integers are accepted where a float is declared; `int` only takes
    /// integral JSON numbers.
    pub fn from_json(
        content_type: ContentType,
        value: &serde_json::Value,
    ) -> Result<Self, ScMemoryError> {
        let decoded = match content_type {
            ContentType::Integer => value.as_i64().map(Self::Integer),
            ContentType::Float => value.as_f64().map(Self::Float),
            ContentType::String => value.as_str().map(|s| Self::String(s.to_string())),
        };
        decoded.ok_or_else(|| {
            ScMemoryError::Serialization(format!("value {value} is not {content_type} content"))
        })
    }
}

impl fmt::Display for LinkContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the protocol layer.
///
/// Variants up to `SessionClosed` are detected locally and never reach
/// the engine. The remaining variants carry the request kind and id so
/// callers can log and decide whether to retry.
#[derive(Debug, Error)]
pub enum ScMemoryError {
    /// A caller precondition was violated (e.g. parallel inputs of unequal length).
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Link content accessed or written with the wrong content type.
    #[error("Type mismatch: link holds {expected} content, got {found}")]
    TypeMismatch {
        expected: ContentType,
        found: ContentType,
    },

    /// The link's value was never fetched (e.g. a link returned by a search).
    #[error("Link content not loaded")]
    ContentNotLoaded,

    /// An edge endpoint refers to an element that is not part of the batch.
    #[error("Unresolved reference at position {position}: {reason}")]
    UnresolvedReference { position: usize, reason: String },

    /// The element has no engine address yet.
    #[error("Element is not committed")]
    NotCommitted,

    /// Operation attempted outside the Open state.
    #[error("Session closed (state: {0:?})")]
    SessionClosed(SessionState),

    /// The engine rejected or failed the whole request.
    #[error("Remote operation failed ({kind} #{request_id}): {message}")]
    RemoteOperationFailure {
        kind: RequestKind,
        request_id: u64,
        message: String,
    },

    /// The engine answered with something that does not fit the request.
    #[error("Malformed response ({kind} #{request_id}): {message}")]
    MalformedResponse {
        kind: RequestKind,
        request_id: u64,
        message: String,
    },

    /// The transport failed while carrying a request.
    #[error("Transport failure ({kind} #{request_id}): {source}")]
    Transport {
        kind: RequestKind,
        request_id: u64,
        #[source]
        source: TransportError,
    },

    /// The transport failed outside of a request (open/close).
    #[error("Session transport failure: {0}")]
    SessionTransport(#[source] TransportError),

    /// A payload could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The asynchronous worker pool has been shut down.
    #[error("Worker pool is shut down")]
    PoolShutdown,

    /// A worker thread could not be started.
    #[error("Cannot start worker thread: {0}")]
    WorkerSpawn(String),

    /// A worker dropped a call without reporting a result.
    #[error("Worker dropped the call before completing it")]
    WorkerLost,
}

impl ScMemoryError {
    /// Whether the failure was detected before anything was sent.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::ContractViolation(_)
                | Self::TypeMismatch { .. }
                | Self::ContentNotLoaded
                | Self::UnresolvedReference { .. }
                | Self::NotCommitted
                | Self::SessionClosed(_)
        )
    }

    /// Whether this is a caller contract violation.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ContractViolation(_) | Self::TypeMismatch { .. })
    }

    /// Request kind and id for failures that happened on the wire.
    #[must_use]
    pub fn request_context(&self) -> Option<(RequestKind, u64)> {
        match self {
            Self::RemoteOperationFailure {
                kind, request_id, ..
            }
            | Self::MalformedResponse {
                kind, request_id, ..
            }
            | Self::Transport {
                kind, request_id, ..
            } => Some((*kind, *request_id)),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ScMemoryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
