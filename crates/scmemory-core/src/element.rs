//! # Element Model
//!
//! Typed handles for nodes, edges and links held by the engine.
//!
//! An element is *pending* until the engine assigns it an address and
//! *committed* afterwards. Identity is the address alone: two committed
//! handles are equal iff their addresses are equal, and a pending handle
//! is equal to nothing, not even itself. Committed handles are therefore
//! safe `HashMap`/`BTreeSet` keys; pending ones must not be used as keys.

use crate::types::{ContentType, EdgeType, LinkContent, LinkType, NodeType, ScAddr, ScMemoryError};
use std::fmt;
use std::hash::{Hash, Hasher};

// =============================================================================
// ELEMENT TRAIT
// =============================================================================

/// Common view over every element handle.
pub trait ScElement {
    /// Engine address, `None` while pending.
    fn addr(&self) -> Option<ScAddr>;

    /// Owned, type-erased copy of this handle.
    fn to_element(&self) -> Element;

    /// Whether the engine has assigned an address.
    fn is_committed(&self) -> bool {
        self.addr().is_some()
    }

    /// Address or `NotCommitted`.
    fn committed_addr(&self) -> Result<ScAddr, ScMemoryError> {
        self.addr().ok_or(ScMemoryError::NotCommitted)
    }
}

/// Address-based equality shared by all handles.
fn same_identity(a: Option<ScAddr>, b: Option<ScAddr>) -> bool {
    a.is_some() && a == b
}

macro_rules! address_identity {
    ($ty:ty) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                same_identity(self.addr(), other.addr())
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.addr().hash(state);
            }
        }
    };
}

// =============================================================================
// NODE
// =============================================================================

/// A node: an element with a semantic role and no payload.
#[derive(Debug, Clone)]
pub struct Node {
    addr: Option<ScAddr>,
    node_type: NodeType,
}

impl Node {
    /// A pending node of the given type.
    #[must_use]
    pub const fn pending(node_type: NodeType) -> Self {
        Self {
            addr: None,
            node_type,
        }
    }

    /// Handle for a node already known to live at `addr`.
    #[must_use]
    pub const fn at(addr: ScAddr, node_type: NodeType) -> Self {
        Self {
            addr: Some(addr),
            node_type,
        }
    }

    #[must_use]
    pub const fn node_type(&self) -> NodeType {
        self.node_type
    }
}

impl ScElement for Node {
    fn addr(&self) -> Option<ScAddr> {
        self.addr
    }

    fn to_element(&self) -> Element {
        Element::Node(self.clone())
    }
}

address_identity!(Node);

// =============================================================================
// LINK
// =============================================================================

/// A link: an element carrying content of a fixed type.
///
/// The content value is a local cache. It is known for links this client
/// created or read, and absent for links discovered by a search.
#[derive(Debug, Clone)]
pub struct Link {
    addr: Option<ScAddr>,
    link_type: LinkType,
    content_type: ContentType,
    content: Option<LinkContent>,
}

impl Link {
    /// A pending link holding `content`.
    #[must_use]
    pub fn pending(link_type: LinkType, content: LinkContent) -> Self {
        Self {
            addr: None,
            link_type,
            content_type: content.content_type(),
            content: Some(content),
        }
    }

    /// Handle for a link at `addr` whose content has not been read.
    #[must_use]
    pub const fn at(addr: ScAddr, link_type: LinkType, content_type: ContentType) -> Self {
        Self {
            addr: Some(addr),
            link_type,
            content_type,
            content: None,
        }
    }

    #[must_use]
    pub const fn link_type(&self) -> LinkType {
        self.link_type
    }

    #[must_use]
    pub const fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Cached content, if loaded.
    #[must_use]
    pub fn content(&self) -> Option<&LinkContent> {
        self.content.as_ref()
    }

    /// Fail with `TypeMismatch` unless this link holds `wanted` content.
    pub fn expect_content_type(&self, wanted: ContentType) -> Result<(), ScMemoryError> {
        if self.content_type == wanted {
            Ok(())
        } else {
            Err(ScMemoryError::TypeMismatch {
                expected: self.content_type,
                found: wanted,
            })
        }
    }

    fn loaded(&self, wanted: ContentType) -> Result<&LinkContent, ScMemoryError> {
        self.expect_content_type(wanted)?;
        self.content.as_ref().ok_or(ScMemoryError::ContentNotLoaded)
    }

    pub fn as_integer(&self) -> Result<i64, ScMemoryError> {
        match self.loaded(ContentType::Integer)? {
            LinkContent::Integer(v) => Ok(*v),
            other => Err(ScMemoryError::TypeMismatch {
                expected: ContentType::Integer,
                found: other.content_type(),
            }),
        }
    }

    pub fn as_float(&self) -> Result<f64, ScMemoryError> {
        match self.loaded(ContentType::Float)? {
            LinkContent::Float(v) => Ok(*v),
            other => Err(ScMemoryError::TypeMismatch {
                expected: ContentType::Float,
                found: other.content_type(),
            }),
        }
    }

    pub fn as_str(&self) -> Result<&str, ScMemoryError> {
        match self.loaded(ContentType::String)? {
            LinkContent::String(v) => Ok(v),
            other => Err(ScMemoryError::TypeMismatch {
                expected: ContentType::String,
                found: other.content_type(),
            }),
        }
    }

    pub(crate) fn committed(mut self, addr: ScAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    pub(crate) fn cache_content(&mut self, content: LinkContent) {
        self.content = Some(content);
    }
}

impl ScElement for Link {
    fn addr(&self) -> Option<ScAddr> {
        self.addr
    }

    fn to_element(&self) -> Element {
        Element::Link(self.clone())
    }
}

address_identity!(Link);

// =============================================================================
// EDGE
// =============================================================================

/// An edge between two elements.
#[derive(Debug, Clone)]
pub struct Edge {
    addr: Option<ScAddr>,
    edge_type: EdgeType,
    source: Box<Element>,
    target: Box<Element>,
}

impl Edge {
    /// Handle for an edge at `addr` with known endpoints.
    #[must_use]
    pub fn at(addr: ScAddr, edge_type: EdgeType, source: Element, target: Element) -> Self {
        Self {
            addr: Some(addr),
            edge_type,
            source: Box::new(source),
            target: Box::new(target),
        }
    }

    #[must_use]
    pub const fn edge_type(&self) -> EdgeType {
        self.edge_type
    }

    #[must_use]
    pub fn source(&self) -> &Element {
        &self.source
    }

    #[must_use]
    pub fn target(&self) -> &Element {
        &self.target
    }
}

impl ScElement for Edge {
    fn addr(&self) -> Option<ScAddr> {
        self.addr
    }

    fn to_element(&self) -> Element {
        Element::Edge(self.clone())
    }
}

address_identity!(Edge);

// =============================================================================
// ELEMENT
// =============================================================================

/// Closed set of element kinds.
#[derive(Debug, Clone)]
pub enum Element {
    Node(Node),
    Edge(Edge),
    Link(Link),
}

impl Element {
    /// Wire discriminator (`el` field).
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Node(_) => "node",
            Self::Edge(_) => "edge",
            Self::Link(_) => "link",
        }
    }

    #[must_use]
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Self::Edge(e) => Some(e),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_link(&self) -> Option<&Link> {
        match self {
            Self::Link(l) => Some(l),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_node(self) -> Option<Node> {
        match self {
            Self::Node(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_edge(self) -> Option<Edge> {
        match self {
            Self::Edge(e) => Some(e),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_link(self) -> Option<Link> {
        match self {
            Self::Link(l) => Some(l),
            _ => None,
        }
    }
}

impl ScElement for Element {
    fn addr(&self) -> Option<ScAddr> {
        match self {
            Self::Node(n) => n.addr(),
            Self::Edge(e) => e.addr(),
            Self::Link(l) => l.addr(),
        }
    }

    fn to_element(&self) -> Element {
        self.clone()
    }
}

address_identity!(Element);

impl From<Node> for Element {
    fn from(n: Node) -> Self {
        Self::Node(n)
    }
}

impl From<Edge> for Element {
    fn from(e: Edge) -> Self {
        Self::Edge(e)
    }
}

impl From<Link> for Element {
    fn from(l: Link) -> Self {
        Self::Link(l)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addr = self
            .addr()
            .map_or_else(|| "pending".to_string(), |a| a.to_string());
        match self {
            Self::Node(n) => write!(f, "node {} ({})", addr, n.node_type()),
            Self::Link(l) => match l.content() {
                Some(c) => write!(f, "link {} ({}, {} = {})", addr, l.link_type(), l.content_type(), c),
                None => write!(f, "link {} ({}, {})", addr, l.link_type(), l.content_type()),
            },
            Self::Edge(e) => write!(
                f,
                "edge {} ({}: {} -> {})",
                addr,
                e.edge_type(),
                e.source().addr().map_or_else(|| "pending".to_string(), |a| a.to_string()),
                e.target().addr().map_or_else(|| "pending".to_string(), |a| a.to_string()),
            ),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn committed_equality_is_address_based() {
        let a = Node::at(ScAddr(5), NodeType::NodeConst);
        let b = Node::at(ScAddr(5), NodeType::NodeConstClass);
        let c = Node::at(ScAddr(6), NodeType::NodeConst);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn pending_elements_are_never_equal() {
        let a = Node::pending(NodeType::NodeConst);
        let b = a.clone();
        assert_ne!(a, b);
        #[allow(clippy::eq_op)]
        let reflexive = a == a;
        assert!(!reflexive);
    }

    #[test]
    fn committed_handles_work_as_set_keys() {
        let mut set = HashSet::new();
        set.insert(Node::at(ScAddr(1), NodeType::Node).to_element());
        set.insert(Node::at(ScAddr(1), NodeType::NodeConst).to_element());
        set.insert(Link::at(ScAddr(2), LinkType::LinkConst, ContentType::String).to_element());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn typed_content_accessors() {
        let link = Link::pending(LinkType::LinkConst, LinkContent::Integer(42));
        assert_eq!(link.as_integer().expect("int"), 42);
        assert!(matches!(
            link.as_str(),
            Err(ScMemoryError::TypeMismatch {
                expected: ContentType::Integer,
                found: ContentType::String
            })
        ));
    }

    #[test]
    fn discovered_link_has_no_content() {
        let link = Link::at(ScAddr(3), LinkType::LinkConst, ContentType::Float);
        assert!(link.content().is_none());
        assert!(matches!(link.as_float(), Err(ScMemoryError::ContentNotLoaded)));
        assert!(matches!(
            link.as_integer(),
            Err(ScMemoryError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn committed_addr_requires_address() {
        let pending = Node::pending(NodeType::Node);
        assert!(matches!(
            pending.committed_addr(),
            Err(ScMemoryError::NotCommitted)
        ));
        assert!(!pending.is_committed());
    }
}
