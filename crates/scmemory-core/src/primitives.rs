//! # Protocol Constants
//!
//! Fixed values shared by the request builder, template codec and the
//! asynchronous wrapper.

/// First request id used by a fresh context. Ids grow by one per request.
pub const FIRST_REQUEST_ID: u64 = 1;

/// Worker threads in the asynchronous wrapper's pool.
pub const DEFAULT_WORKERS: usize = 4;

/// Alias bound to the matched edge in every template.
pub const EDGE_ALIAS: &str = "_edge";

/// Alias bound to the matched node or link.
pub const TARGET_ALIAS: &str = "_target";

/// Alias bound to the edge from the relation node.
pub const RELATION_EDGE_ALIAS: &str = "_relation_edge";

/// Row width of a Node-Edge-Node result: `[fixed, edge, node]`.
pub const NODE_EDGE_NODE_COLUMNS: usize = 3;

/// Row width of a Node-Edge-Link result: `[fixed, edge, link]`.
pub const NODE_EDGE_LINK_COLUMNS: usize = 3;

/// Row width of a relation result:
/// `[fixed, edge, link, relation, relation_edge, edge]`.
pub const NODE_EDGE_LINK_RELATION_COLUMNS: usize = 6;
