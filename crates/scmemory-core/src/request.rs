//! # Batch Request Builder
//!
//! A request is one correlated unit sent to the engine: an id, a kind and
//! an ordered payload. Entries are never reordered; construction entries
//! rely on that because `ref` endpoints index into the payload.
//!
//! The response envelope is positional: entry `i` of the response payload
//! answers entry `i` of the request payload.

use crate::reference::EndpointDescriptor;
use crate::types::{ContentType, EdgeType, LinkContent, LinkType, NodeType, ScAddr, ScMemoryError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// REQUEST KIND
// =============================================================================

/// What a request asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    #[serde(rename = "create_elements")]
    Construction,
    #[serde(rename = "delete_elements")]
    Deletion,
    #[serde(rename = "content")]
    Content,
    #[serde(rename = "search_template")]
    Search,
}

impl RequestKind {
    /// Wire name of the kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Construction => "create_elements",
            Self::Deletion => "delete_elements",
            Self::Content => "content",
            Self::Search => "search_template",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// PAYLOAD ENTRIES
// =============================================================================

/// One element to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "el", rename_all = "lowercase")]
pub enum ConstructionEntry {
    Node {
        #[serde(rename = "type")]
        node_type: NodeType,
    },
    Link {
        #[serde(rename = "type")]
        link_type: LinkType,
        content: LinkContent,
        content_type: ContentType,
    },
    Edge {
        #[serde(rename = "type")]
        edge_type: EdgeType,
        src: EndpointDescriptor,
        trg: EndpointDescriptor,
    },
}

/// One content read or write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ContentEntry {
    Get {
        addr: ScAddr,
    },
    Set {
        addr: ScAddr,
        #[serde(rename = "type")]
        content_type: ContentType,
        data: LinkContent,
    },
}

/// A content value as the engine reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentValue {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub value: serde_json::Value,
}

// =============================================================================
// REQUEST
// =============================================================================

/// An ordered batch of entries under one request id and kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request<E> {
    id: u64,
    #[serde(rename = "type")]
    kind: RequestKind,
    payload: Vec<E>,
}

impl<E: Serialize> Request<E> {
    /// Create an empty request.
    #[must_use]
    pub fn new(id: u64, kind: RequestKind) -> Self {
        Self {
            id,
            kind,
            payload: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Append one entry, preserving caller order.
    pub fn add_to_request(&mut self, entry: E) {
        self.payload.push(entry);
    }

    /// Append entries, preserving caller order.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = E>) {
        self.payload.extend(entries);
    }

    /// Drop all entries; id and kind are kept.
    pub fn reset(&mut self) {
        self.payload.clear();
    }

    #[must_use]
    pub fn entries(&self) -> &[E] {
        &self.payload
    }

    /// Serialize to the wire form.
    pub fn to_json(&self) -> Result<String, ScMemoryError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Fail with `ContractViolation` unless every parallel input has `expected` items.
pub fn ensure_same_len(expected: usize, streams: &[(&str, usize)]) -> Result<(), ScMemoryError> {
    match streams.iter().find(|(_, len)| *len != expected) {
        Some((name, len)) => Err(ScMemoryError::ContractViolation(format!(
            "{name} has {len} items, expected {expected}"
        ))),
        None => Ok(()),
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

/// Response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub status: bool,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl Response {
    /// Parse a response and check it answers `request_id`.
    pub fn parse(text: &str, kind: RequestKind, request_id: u64) -> Result<Self, ScMemoryError> {
        let response: Self =
            serde_json::from_str(text).map_err(|e| ScMemoryError::MalformedResponse {
                kind,
                request_id,
                message: e.to_string(),
            })?;
        if response.id != request_id {
            return Err(ScMemoryError::MalformedResponse {
                kind,
                request_id,
                message: format!("response answers request #{}", response.id),
            });
        }
        Ok(response)
    }

    /// Fail with `RemoteOperationFailure` unless the engine reported success.
    pub fn ensure_success(&self, kind: RequestKind) -> Result<(), ScMemoryError> {
        if self.status {
            return Ok(());
        }
        let message = match &self.errors {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "engine reported failure".to_string(),
        };
        Err(ScMemoryError::RemoteOperationFailure {
            kind,
            request_id: self.id,
            message,
        })
    }

    /// Decode the payload as `expected` positional items.
    pub fn positional<T: DeserializeOwned>(
        self,
        kind: RequestKind,
        expected: usize,
    ) -> Result<Vec<T>, ScMemoryError> {
        let request_id = self.id;
        let items: Vec<T> =
            serde_json::from_value(self.payload).map_err(|e| ScMemoryError::MalformedResponse {
                kind,
                request_id,
                message: e.to_string(),
            })?;
        if items.len() != expected {
            return Err(ScMemoryError::MalformedResponse {
                kind,
                request_id,
                message: format!("expected {expected} items, got {}", items.len()),
            });
        }
        Ok(items)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_preserves_order_and_resets() {
        let mut req: Request<ScAddr> = Request::new(4, RequestKind::Deletion);
        assert!(req.is_empty());
        req.add_to_request(ScAddr(3));
        req.extend([ScAddr(1), ScAddr(2)]);
        assert_eq!(req.entries(), &[ScAddr(3), ScAddr(1), ScAddr(2)]);

        req.reset();
        assert!(req.is_empty());
        assert_eq!(req.id(), 4);
        assert_eq!(req.kind(), RequestKind::Deletion);
    }

    #[test]
    fn construction_wire_shape() {
        let mut req = Request::new(1, RequestKind::Construction);
        req.add_to_request(ConstructionEntry::Node {
            node_type: NodeType::NodeConst,
        });
        req.add_to_request(ConstructionEntry::Link {
            link_type: LinkType::LinkConst,
            content: LinkContent::String("apple".into()),
            content_type: ContentType::String,
        });
        req.add_to_request(ConstructionEntry::Edge {
            edge_type: EdgeType::AccessConstPosPerm,
            src: EndpointDescriptor::Ref(0),
            trg: EndpointDescriptor::Addr(ScAddr(99)),
        });

        let value: serde_json::Value =
            serde_json::from_str(&req.to_json().expect("json")).expect("parse");
        assert_eq!(
            value,
            json!({
                "id": 1,
                "type": "create_elements",
                "payload": [
                    {"el": "node", "type": 33},
                    {"el": "link", "type": 34, "content": "apple", "content_type": "string"},
                    {"el": "edge", "type": 2224,
                     "src": {"type": "ref", "value": 0},
                     "trg": {"type": "addr", "value": 99}}
                ]
            })
        );
    }

    #[test]
    fn content_wire_shape() {
        let get = serde_json::to_value(ContentEntry::Get { addr: ScAddr(5) }).expect("json");
        assert_eq!(get, json!({"command": "get", "addr": 5}));

        let set = serde_json::to_value(ContentEntry::Set {
            addr: ScAddr(5),
            content_type: ContentType::Integer,
            data: LinkContent::Integer(42),
        })
        .expect("json");
        assert_eq!(
            set,
            json!({"command": "set", "addr": 5, "type": "int", "data": 42})
        );
    }

    #[test]
    fn unequal_streams_are_contract_violations() {
        assert!(ensure_same_len(3, &[("types", 3), ("sources", 3)]).is_ok());
        let err = ensure_same_len(3, &[("types", 3), ("sources", 2)]).expect_err("mismatch");
        assert!(err.is_contract_violation());
        assert!(err.to_string().contains("sources"));
    }

    #[test]
    fn response_id_must_match() {
        let text = r#"{"id": 7, "status": true, "payload": [1, 2]}"#;
        assert!(Response::parse(text, RequestKind::Construction, 7).is_ok());
        let err = Response::parse(text, RequestKind::Construction, 8).expect_err("mismatch");
        assert!(matches!(err, ScMemoryError::MalformedResponse { request_id: 8, .. }));
    }

    #[test]
    fn failed_status_carries_context() {
        let text = r#"{"id": 2, "status": false, "errors": "no such element"}"#;
        let resp = Response::parse(text, RequestKind::Content, 2).expect("parse");
        let err = resp.ensure_success(RequestKind::Content).expect_err("failed");
        assert_eq!(err.request_context(), Some((RequestKind::Content, 2)));
        assert!(err.to_string().contains("no such element"));
    }

    #[test]
    fn positional_payload_length_checked() {
        let text = r#"{"id": 1, "status": true, "payload": [10, 11]}"#;
        let resp = Response::parse(text, RequestKind::Construction, 1).expect("parse");
        let addrs: Vec<ScAddr> = resp
            .clone()
            .positional(RequestKind::Construction, 2)
            .expect("decode");
        assert_eq!(addrs, vec![ScAddr(10), ScAddr(11)]);
        assert!(
            resp.positional::<ScAddr>(RequestKind::Construction, 3)
                .is_err()
        );
    }
}
