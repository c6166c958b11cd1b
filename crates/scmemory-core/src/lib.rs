//! # scmemory-core
//!
//! Client-side protocol for a remote semantic memory engine.
//!
//! Application code builds nodes, edges and links locally, and this crate
//! packs the work into correlated batch requests, resolves references
//! between elements created in the same batch, and decodes the engine's
//! positional answers back into typed handles.
//!
//! ## Layers
//!
//! - `element`, `types`: typed handles with address-based identity
//! - `reference`, `batch`: `addr`/`ref` endpoint resolution over an arena
//! - `request`, `template`: wire payloads and template search codec
//! - `context`: the synchronous façade, one call per round trip
//! - `async_context`: worker pool with awaitable call handles
//!
//! ## Architectural Constraints
//!
//! - No storage: the engine is reached only through a `Transport`
//! - Local contract checks run before any I/O
//! - No retries; failures carry the request kind and id

// =============================================================================
// MODULES
// =============================================================================

pub mod async_context;
pub mod batch;
pub mod context;
pub mod element;
pub mod loopback;
pub mod primitives;
pub mod reference;
pub mod request;
pub mod template;
pub mod transport;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    ContentType, EdgeType, LinkContent, LinkType, NodeType, ScAddr, ScMemoryError,
};

// =============================================================================
// RE-EXPORTS: Elements and Construction
// =============================================================================

pub use batch::ConstructionBatch;
pub use element::{Edge, Element, Link, Node, ScElement};
pub use reference::{Endpoint, EndpointDescriptor, PendingId};

// =============================================================================
// RE-EXPORTS: Protocol
// =============================================================================

pub use request::{ConstructionEntry, ContentEntry, Request, RequestKind, Response};
pub use template::{SearchMatch, SearchResults, Template};

// =============================================================================
// RE-EXPORTS: Contexts and Transports
// =============================================================================

pub use async_context::{AsyncScContext, CallHandle};
pub use context::{ScContext, SessionState};
pub use loopback::{LoopbackHandle, LoopbackTransport};
pub use transport::{Transport, TransportError};
