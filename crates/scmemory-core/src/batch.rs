//! # Construction Batch
//!
//! Append-only arena of elements to create in one round trip. Each push
//! returns a `PendingId` (the element's position), which later pushes may
//! use as an edge endpoint. Positions are the `ref` values on the wire, so
//! push order is kept exactly.

use crate::element::{Edge, Element, Link, Node};
use crate::reference::{Endpoint, PendingId, resolve};
use crate::request::ConstructionEntry;
use crate::types::{EdgeType, LinkContent, LinkType, NodeType, ScAddr, ScMemoryError};
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of batch identities; a `PendingId` is only valid in its own batch.
static NEXT_BATCH_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
enum PendingElement {
    Node(NodeType),
    Link(LinkType, LinkContent),
    Edge {
        edge_type: EdgeType,
        source: Endpoint,
        target: Endpoint,
    },
}

/// Elements awaiting creation, in push order.
#[derive(Debug)]
pub struct ConstructionBatch {
    id: u64,
    items: Vec<PendingElement>,
}

impl Default for ConstructionBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionBatch {
    /// Create an empty batch with a fresh identity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_BATCH_ID.fetch_add(1, Ordering::Relaxed),
            items: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn push(&mut self, item: PendingElement) -> PendingId {
        let ordinal = self.items.len();
        self.items.push(item);
        PendingId {
            batch: self.id,
            ordinal,
        }
    }

    pub fn push_node(&mut self, node_type: NodeType) -> PendingId {
        self.push(PendingElement::Node(node_type))
    }

    pub fn push_link(&mut self, link_type: LinkType, content: LinkContent) -> PendingId {
        self.push(PendingElement::Link(link_type, content))
    }

    /// Push an edge. Endpoints are checked when the batch is encoded.
    pub fn push_edge(
        &mut self,
        edge_type: EdgeType,
        source: impl Into<Endpoint>,
        target: impl Into<Endpoint>,
    ) -> PendingId {
        self.push(PendingElement::Edge {
            edge_type,
            source: source.into(),
            target: target.into(),
        })
    }

    /// Wire entries in push order, with every endpoint resolved.
    pub fn encode(&self) -> Result<Vec<ConstructionEntry>, ScMemoryError> {
        self.items
            .iter()
            .enumerate()
            .map(|(position, item)| {
                Ok(match item {
                    PendingElement::Node(node_type) => ConstructionEntry::Node {
                        node_type: *node_type,
                    },
                    PendingElement::Link(link_type, content) => ConstructionEntry::Link {
                        link_type: *link_type,
                        content: content.clone(),
                        content_type: content.content_type(),
                    },
                    PendingElement::Edge {
                        edge_type,
                        source,
                        target,
                    } => ConstructionEntry::Edge {
                        edge_type: *edge_type,
                        src: resolve(source, self.id, position)?,
                        trg: resolve(target, self.id, position)?,
                    },
                })
            })
            .collect()
    }

    /// Turn the batch into committed handles using the engine's addresses.
    ///
    /// `addrs` must be positionally aligned with the batch. Pending
    /// endpoints are replaced by the committed elements they refer to.
    pub(crate) fn materialize(self, addrs: &[ScAddr]) -> Result<Vec<Element>, String> {
        if addrs.len() != self.items.len() {
            return Err(format!(
                "expected {} addresses, got {}",
                self.items.len(),
                addrs.len()
            ));
        }
        let mut committed: Vec<Element> = Vec::with_capacity(self.items.len());
        for (position, (item, addr)) in self.items.into_iter().zip(addrs).enumerate() {
            if !addr.is_valid() {
                return Err(format!("element at position {position} was not created"));
            }
            let element: Element = match item {
                PendingElement::Node(node_type) => Node::at(*addr, node_type).into(),
                PendingElement::Link(link_type, content) => {
                    Link::pending(link_type, content).committed(*addr).into()
                }
                PendingElement::Edge {
                    edge_type,
                    source,
                    target,
                } => {
                    let source = endpoint_element(source, &committed)?;
                    let target = endpoint_element(target, &committed)?;
                    Edge::at(*addr, edge_type, source, target).into()
                }
            };
            committed.push(element);
        }
        Ok(committed)
    }
}

fn endpoint_element(endpoint: Endpoint, committed: &[Element]) -> Result<Element, String> {
    match endpoint {
        Endpoint::Committed(element) => Ok(element),
        Endpoint::Pending(id) => committed
            .get(id.ordinal())
            .cloned()
            .ok_or_else(|| format!("reference {} has no committed element", id.ordinal())),
    }
}

// =============================================================================
// TESTS
// =============================================================================
