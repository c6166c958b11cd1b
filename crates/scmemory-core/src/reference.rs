//! # Reference Resolver
//!
//! Edge endpoints are either committed elements or elements pushed earlier
//! into the same construction batch. On the wire the first kind becomes an
//! `addr` descriptor carrying the engine address, the second a `ref`
//! descriptor carrying the zero-based position inside the batch.
//!
//! Resolution happens before anything is sent. A reference the batch
//! cannot satisfy is a local `UnresolvedReference`, never an engine error.

use crate::element::{Edge, Element, Link, Node, ScElement};
use crate::types::{ScAddr, ScMemoryError};
use serde::{Deserialize, Serialize};

/// Position of a pending element inside a specific construction batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PendingId {
    pub(crate) batch: u64,
    pub(crate) ordinal: usize,
}

impl PendingId {
    /// Zero-based position in the batch.
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self.ordinal
    }
}

/// Declared endpoint of an edge.
#[derive(Debug, Clone)]
pub enum Endpoint {
    /// An element that should already carry an engine address.
    Committed(Element),
    /// An element pushed earlier into the same batch.
    Pending(PendingId),
}

impl From<PendingId> for Endpoint {
    fn from(id: PendingId) -> Self {
        Self::Pending(id)
    }
}

impl From<Element> for Endpoint {
    fn from(e: Element) -> Self {
        Self::Committed(e)
    }
}

macro_rules! committed_endpoint {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Endpoint {
                fn from(e: $ty) -> Self {
                    Self::Committed(e.into())
                }
            }

            impl From<&$ty> for Endpoint {
                fn from(e: &$ty) -> Self {
                    Self::Committed(e.to_element())
                }
            }
        )+
    };
}

committed_endpoint!(Node, Edge, Link);

/// Wire form of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum EndpointDescriptor {
    Addr(ScAddr),
    Ref(usize),
}

/// Resolve an endpoint declared by the element at `position` of `batch`.
pub fn resolve(
    endpoint: &Endpoint,
    batch: u64,
    position: usize,
) -> Result<EndpointDescriptor, ScMemoryError> {
    match endpoint {
        Endpoint::Committed(element) => element.addr().map(EndpointDescriptor::Addr).ok_or_else(|| {
            ScMemoryError::UnresolvedReference {
                position,
                reason: format!("{} has no address and is not part of this batch", element.kind()),
            }
        }),
        Endpoint::Pending(id) if id.batch != batch => Err(ScMemoryError::UnresolvedReference {
            position,
            reason: format!("pending element {} belongs to another batch", id.ordinal),
        }),
        Endpoint::Pending(id) if id.ordinal >= position => {
            Err(ScMemoryError::UnresolvedReference {
                position,
                reason: format!(
                    "pending element {} is not created before this element",
                    id.ordinal
                ),
            })
        }
        Endpoint::Pending(id) => Ok(EndpointDescriptor::Ref(id.ordinal)),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeType;

    #[test]
    fn committed_endpoint_resolves_to_addr() {
        let node = Node::at(ScAddr(11), NodeType::NodeConst);
        let d = resolve(&Endpoint::from(&node), 1, 0).expect("resolve");
        assert_eq!(d, EndpointDescriptor::Addr(ScAddr(11)));
    }

    #[test]
    fn earlier_pending_resolves_to_ref() {
        let id = PendingId {
            batch: 3,
            ordinal: 2,
        };
        let d = resolve(&id.into(), 3, 4).expect("resolve");
        assert_eq!(d, EndpointDescriptor::Ref(2));
    }

    #[test]
    fn addressless_element_is_unresolved() {
        let node = Node::pending(NodeType::NodeConst);
        let err = resolve(&node.into(), 1, 0).expect_err("dangling");
        assert!(matches!(
            err,
            ScMemoryError::UnresolvedReference { position: 0, .. }
        ));
    }

    #[test]
    fn foreign_or_forward_refs_are_unresolved() {
        let foreign = PendingId {
            batch: 9,
            ordinal: 0,
        };
        assert!(resolve(&foreign.into(), 1, 5).is_err());

        let forward = PendingId {
            batch: 1,
            ordinal: 5,
        };
        assert!(resolve(&forward.into(), 1, 5).is_err());
    }

    #[test]
    fn descriptor_wire_shape() {
        let json = serde_json::to_value(EndpointDescriptor::Ref(2)).expect("json");
        assert_eq!(json, serde_json::json!({"type": "ref", "value": 2}));
        let json = serde_json::to_value(EndpointDescriptor::Addr(ScAddr(7))).expect("json");
        assert_eq!(json, serde_json::json!({"type": "addr", "value": 7}));
    }
}
