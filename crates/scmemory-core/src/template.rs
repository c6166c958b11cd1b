//! # Template Queries
//!
//! Three structural search shapes over (fixed element, variable edge,
//! variable element):
//!
//! ```text
//! Node-Edge-Node       fixed ──edge──> node
//! Node-Edge-Link       fixed ──edge──> link
//! Node-Edge-Link with relation:
//!
//!                  relation
//!                     │ relation_edge
//!                     ▼
//!     fixed ────────edge────────> link
//! ```
//!
//! Each template encodes to triples of operands. The engine answers with
//! rows of addresses in triple order, which are decoded back into edges
//! whose source is the caller's fixed node. Matched links come back with
//! their content type only; reading the value is a separate content call.

use crate::element::{Edge, Element, Link, Node, ScElement};
use crate::primitives::{
    EDGE_ALIAS, NODE_EDGE_LINK_COLUMNS, NODE_EDGE_LINK_RELATION_COLUMNS, NODE_EDGE_NODE_COLUMNS,
    RELATION_EDGE_ALIAS, TARGET_ALIAS,
};
use crate::types::{ContentType, EdgeType, LinkType, NodeType, ScAddr, ScMemoryError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// WIRE OPERANDS
// =============================================================================

/// How an operand constrains its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperandKind {
    /// Exactly this address.
    Addr,
    /// Any element of this type; binds `alias` if given.
    Type,
    /// The element already bound to this alias.
    Alias,
}

/// Operand value: an address, a type code or an alias name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperandValue {
    Number(u64),
    Name(String),
}

/// One position of a template triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateOperand {
    #[serde(rename = "type")]
    pub kind: OperandKind,
    pub value: OperandValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
}

impl TemplateOperand {
    fn addr(addr: ScAddr) -> Self {
        Self {
            kind: OperandKind::Addr,
            value: OperandValue::Number(addr.value()),
            alias: None,
            content_type: None,
        }
    }

    fn typed(code: u16, alias: &str) -> Self {
        Self {
            kind: OperandKind::Type,
            value: OperandValue::Number(u64::from(code)),
            alias: Some(alias.to_string()),
            content_type: None,
        }
    }

    fn link(link_type: LinkType, content_type: ContentType) -> Self {
        Self {
            content_type: Some(content_type),
            ..Self::typed(link_type.code(), TARGET_ALIAS)
        }
    }

    fn bound(alias: &str) -> Self {
        Self {
            kind: OperandKind::Alias,
            value: OperandValue::Name(alias.to_string()),
            alias: None,
            content_type: None,
        }
    }
}

/// Source, edge and target operands.
pub type Triple = [TemplateOperand; 3];

/// Search request entry: one template as a list of triples.
pub type TemplateEntry = Vec<Triple>;

/// Engine answer for one template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateResult {
    pub addrs: Vec<Vec<ScAddr>>,
    #[serde(default)]
    pub aliases: BTreeMap<String, usize>,
}

// =============================================================================
// TEMPLATES
// =============================================================================

/// A structural search pattern.
#[derive(Debug, Clone)]
pub enum Template {
    NodeEdgeNode {
        fixed: Node,
        edge_type: EdgeType,
        node_type: NodeType,
    },
    NodeEdgeLink {
        fixed: Node,
        edge_type: EdgeType,
        link_type: LinkType,
        content_type: ContentType,
    },
    NodeEdgeLinkWithRelation {
        fixed: Node,
        edge_type: EdgeType,
        link_type: LinkType,
        content_type: ContentType,
        relation: Node,
        relation_edge_type: EdgeType,
    },
}

/// One decoded result row.
#[derive(Debug, Clone)]
pub struct SearchMatch {
    /// Index of the template (in request order) that produced this row.
    pub template: usize,
    /// Edge from the fixed node to the matched node or link.
    pub edge: Edge,
    /// Edge from the relation node to `edge`, for the relation shape.
    pub relation_edge: Option<Edge>,
}

impl Template {
    #[must_use]
    pub fn node_edge_node(fixed: &Node, edge_type: EdgeType, node_type: NodeType) -> Self {
        Self::NodeEdgeNode {
            fixed: fixed.clone(),
            edge_type,
            node_type,
        }
    }

    #[must_use]
    pub fn node_edge_link(
        fixed: &Node,
        edge_type: EdgeType,
        link_type: LinkType,
        content_type: ContentType,
    ) -> Self {
        Self::NodeEdgeLink {
            fixed: fixed.clone(),
            edge_type,
            link_type,
            content_type,
        }
    }

    #[must_use]
    pub fn node_edge_link_with_relation(
        fixed: &Node,
        edge_type: EdgeType,
        link_type: LinkType,
        content_type: ContentType,
        relation: &Node,
        relation_edge_type: EdgeType,
    ) -> Self {
        Self::NodeEdgeLinkWithRelation {
            fixed: fixed.clone(),
            edge_type,
            link_type,
            content_type,
            relation: relation.clone(),
            relation_edge_type,
        }
    }

    /// The fixed node every matched edge starts from.
    #[must_use]
    pub fn fixed(&self) -> &Node {
        match self {
            Self::NodeEdgeNode { fixed, .. }
            | Self::NodeEdgeLink { fixed, .. }
            | Self::NodeEdgeLinkWithRelation { fixed, .. } => fixed,
        }
    }

    /// Number of addresses in each result row.
    #[must_use]
    pub const fn columns(&self) -> usize {
        match self {
            Self::NodeEdgeNode { .. } => NODE_EDGE_NODE_COLUMNS,
            Self::NodeEdgeLink { .. } => NODE_EDGE_LINK_COLUMNS,
            Self::NodeEdgeLinkWithRelation { .. } => NODE_EDGE_LINK_RELATION_COLUMNS,
        }
    }

    /// Encode to wire triples. Fixed operands must be committed.
    pub fn encode(&self) -> Result<TemplateEntry, ScMemoryError> {
        let fixed = TemplateOperand::addr(self.fixed().committed_addr()?);
        let triples = match self {
            Self::NodeEdgeNode {
                edge_type,
                node_type,
                ..
            } => vec![[
                fixed,
                TemplateOperand::typed(edge_type.code(), EDGE_ALIAS),
                TemplateOperand::typed(node_type.code(), TARGET_ALIAS),
            ]],
            Self::NodeEdgeLink {
                edge_type,
                link_type,
                content_type,
                ..
            } => vec![[
                fixed,
                TemplateOperand::typed(edge_type.code(), EDGE_ALIAS),
                TemplateOperand::link(*link_type, *content_type),
            ]],
            Self::NodeEdgeLinkWithRelation {
                edge_type,
                link_type,
                content_type,
                relation,
                relation_edge_type,
                ..
            } => vec![
                [
                    fixed,
                    TemplateOperand::typed(edge_type.code(), EDGE_ALIAS),
                    TemplateOperand::link(*link_type, *content_type),
                ],
                [
                    TemplateOperand::addr(relation.committed_addr()?),
                    TemplateOperand::typed(relation_edge_type.code(), RELATION_EDGE_ALIAS),
                    TemplateOperand::bound(EDGE_ALIAS),
                ],
            ],
        };
        Ok(triples)
    }

    /// Decode one result row. The fixed node is reused, never re-fetched.
    pub fn decode_row(&self, template: usize, row: &[ScAddr]) -> Result<SearchMatch, String> {
        if row.len() < self.columns() {
            return Err(format!(
                "row has {} columns, template needs {}",
                row.len(),
                self.columns()
            ));
        }
        let fixed = self.fixed();
        if Some(row[0]) != fixed.addr() {
            return Err(format!(
                "row starts at {} instead of the fixed node",
                row[0]
            ));
        }
        let source = fixed.to_element();
        let (edge, relation_edge) = match self {
            Self::NodeEdgeNode {
                edge_type,
                node_type,
                ..
            } => {
                let target = Node::at(row[2], *node_type);
                (Edge::at(row[1], *edge_type, source, target.into()), None)
            }
            Self::NodeEdgeLink {
                edge_type,
                link_type,
                content_type,
                ..
            } => {
                let target = Link::at(row[2], *link_type, *content_type);
                (Edge::at(row[1], *edge_type, source, target.into()), None)
            }
            Self::NodeEdgeLinkWithRelation {
                edge_type,
                link_type,
                content_type,
                relation,
                relation_edge_type,
                ..
            } => {
                if Some(row[3]) != relation.addr() || row[5] != row[1] {
                    return Err("relation columns do not match the template".to_string());
                }
                let target = Link::at(row[2], *link_type, *content_type);
                let edge = Edge::at(row[1], *edge_type, source, target.into());
                let relation_edge = Edge::at(
                    row[4],
                    *relation_edge_type,
                    relation.to_element(),
                    Element::Edge(edge.clone()),
                );
                (edge, Some(relation_edge))
            }
        };
        Ok(SearchMatch {
            template,
            edge,
            relation_edge,
        })
    }
}

// =============================================================================
// SEARCH RESULTS
// =============================================================================

/// Finite, single-pass sequence of search results.
///
/// Rows are fetched eagerly by the search call; iterating consumes them.
/// Collect into a `Vec` when more than one pass is needed.
#[derive(Debug)]
pub struct SearchResults<T> {
    rows: std::vec::IntoIter<T>,
}

impl<T> SearchResults<T> {
    pub(crate) fn new(rows: Vec<T>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl<T> Iterator for SearchResults<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.rows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl<T> ExactSizeIterator for SearchResults<T> {}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixed() -> Node {
        Node::at(ScAddr(100), NodeType::NodeConstClass)
    }

    #[test]
    fn node_edge_node_encoding() {
        let t = Template::node_edge_node(&fixed(), EdgeType::AccessVarPosPerm, NodeType::NodeVar);
        let json = serde_json::to_value(t.encode().expect("encode")).expect("json");
        assert_eq!(
            json,
            json!([[
                {"type": "addr", "value": 100},
                {"type": "type", "value": 2256, "alias": "_edge"},
                {"type": "type", "value": 65, "alias": "_target"}
            ]])
        );
    }

    #[test]
    fn relation_template_has_five_operands_and_a_back_reference() {
        let rel = Node::at(ScAddr(200), NodeType::NodeConstNoRole);
        let t = Template::node_edge_link_with_relation(
            &fixed(),
            EdgeType::DCommonVar,
            LinkType::LinkVar,
            ContentType::String,
            &rel,
            EdgeType::AccessVarPosPerm,
        );
        let triples = t.encode().expect("encode");
        assert_eq!(triples.len(), 2);
        assert_eq!(triples[0][2].content_type, Some(ContentType::String));
        assert_eq!(triples[1][0].value, OperandValue::Number(200));
        assert_eq!(triples[1][2].kind, OperandKind::Alias);
        assert_eq!(triples[1][2].value, OperandValue::Name(EDGE_ALIAS.into()));
    }

    #[test]
    fn pending_fixed_node_is_rejected() {
        let t = Template::node_edge_node(
            &Node::pending(NodeType::NodeConst),
            EdgeType::AccessVarPosPerm,
            NodeType::NodeVar,
        );
        assert!(matches!(t.encode(), Err(ScMemoryError::NotCommitted)));
    }

    #[test]
    fn decoded_edge_keeps_fixed_source_and_declared_types() {
        let t = Template::node_edge_link(
            &fixed(),
            EdgeType::DCommonVar,
            LinkType::LinkVar,
            ContentType::Integer,
        );
        let m = t
            .decode_row(3, &[ScAddr(100), ScAddr(101), ScAddr(102)])
            .expect("decode");
        assert_eq!(m.template, 3);
        assert_eq!(m.edge.edge_type(), EdgeType::DCommonVar);
        assert_eq!(m.edge.source().addr(), Some(ScAddr(100)));
        let link = m.edge.target().as_link().expect("link");
        assert_eq!(link.content_type(), ContentType::Integer);
        assert!(link.content().is_none());
    }

    #[test]
    fn rows_not_starting_at_fixed_node_are_rejected() {
        let t = Template::node_edge_node(&fixed(), EdgeType::AccessVarPosPerm, NodeType::NodeVar);
        assert!(t.decode_row(0, &[ScAddr(1), ScAddr(2), ScAddr(3)]).is_err());
        assert!(t.decode_row(0, &[ScAddr(100), ScAddr(2)]).is_err());
    }

    #[test]
    fn relation_row_builds_relation_edge() {
        let rel = Node::at(ScAddr(200), NodeType::NodeConstNoRole);
        let t = Template::node_edge_link_with_relation(
            &fixed(),
            EdgeType::DCommonVar,
            LinkType::LinkVar,
            ContentType::String,
            &rel,
            EdgeType::AccessVarPosPerm,
        );
        let row = [
            ScAddr(100),
            ScAddr(101),
            ScAddr(102),
            ScAddr(200),
            ScAddr(103),
            ScAddr(101),
        ];
        let m = t.decode_row(0, &row).expect("decode");
        let rel_edge = m.relation_edge.expect("relation edge");
        assert_eq!(rel_edge.source().addr(), Some(ScAddr(200)));
        assert_eq!(rel_edge.target().addr(), Some(ScAddr(101)));
    }

    #[test]
    fn results_are_single_pass() {
        let mut results = SearchResults::new(vec![1, 2, 3]);
        assert_eq!(results.len(), 3);
        assert_eq!(results.by_ref().count(), 3);
        assert_eq!(results.next(), None);
    }
}
