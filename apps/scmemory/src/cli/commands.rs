//! # CLI Command Implementations
//!
//! Elements named on the command line are addressed by raw address; their
//! handles carry the untyped `node`/`link` type since only the address
//! reaches the wire.

use scmemory::{AppError, WsTransport};
use scmemory_core::{
    AsyncScContext, ContentType, EdgeType, Element, Link, LinkContent, LinkType, Node,
    NodeType, ScAddr, ScElement,
};
use serde_json::{Value, json};

use super::SearchCommand;

type Ctx = AsyncScContext<WsTransport>;

// =============================================================================
// HELPERS
// =============================================================================

/// Interpret a command-line value as content of the given type.
pub fn parse_content(content_type: ContentType, raw: &str) -> Result<LinkContent, AppError> {
    let invalid = |e: &dyn std::fmt::Display| {
        AppError::InvalidArgument(format!("'{raw}' is not {content_type} content: {e}"))
    };
    match content_type {
        ContentType::Integer => raw
            .parse()
            .map(LinkContent::Integer)
            .map_err(|e| invalid(&e)),
        ContentType::Float => raw.parse().map(LinkContent::Float).map_err(|e| invalid(&e)),
        ContentType::String => Ok(LinkContent::String(raw.to_string())),
    }
}

/// JSON view of an element handle.
pub fn element_json(element: &Element) -> Value {
    let addr = element.addr().map(ScAddr::value);
    match element {
        Element::Node(n) => json!({
            "el": "node",
            "addr": addr,
            "type": n.node_type().name(),
        }),
        Element::Link(l) => json!({
            "el": "link",
            "addr": addr,
            "type": l.link_type().name(),
            "content_type": l.content_type(),
            "content": l.content(),
        }),
        Element::Edge(e) => json!({
            "el": "edge",
            "addr": addr,
            "type": e.edge_type().name(),
            "src": e.source().addr().map(ScAddr::value),
            "trg": e.target().addr().map(ScAddr::value),
        }),
    }
}

fn print_json(value: &Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn print_elements(json_mode: bool, elements: &[Element]) {
    if json_mode {
        print_json(&Value::Array(elements.iter().map(element_json).collect()));
    } else {
        for element in elements {
            println!("{element}");
        }
    }
}

fn node_at(addr: u64) -> Node {
    Node::at(ScAddr(addr), NodeType::Node)
}

// =============================================================================
// CONSTRUCTION COMMANDS
// =============================================================================

pub async fn cmd_create_node(
    ctx: &Ctx,
    json_mode: bool,
    node_type: NodeType,
) -> Result<(), AppError> {
    let node = ctx.create_node(node_type).await?;
    print_elements(json_mode, &[node.into()]);
    Ok(())
}

pub async fn cmd_create_link(
    ctx: &Ctx,
    json_mode: bool,
    link_type: LinkType,
    content_type: ContentType,
    value: &str,
) -> Result<(), AppError> {
    let content = parse_content(content_type, value)?;
    let links = ctx.create_links(vec![link_type], vec![content]).await?;
    let elements: Vec<Element> = links.into_iter().map(Element::from).collect();
    print_elements(json_mode, &elements);
    Ok(())
}

pub async fn cmd_create_edge(
    ctx: &Ctx,
    json_mode: bool,
    edge_type: EdgeType,
    source: u64,
    target: u64,
) -> Result<(), AppError> {
    let edge = ctx
        .create_edge(edge_type, node_at(source), node_at(target))
        .await?;
    print_elements(json_mode, &[edge.into()]);
    Ok(())
}

// =============================================================================
// DELETE COMMAND
// =============================================================================

pub async fn cmd_delete(ctx: &Ctx, json_mode: bool, addrs: Vec<u64>) -> Result<(), AppError> {
    let count = addrs.len();
    let nodes: Vec<Node> = addrs.into_iter().map(node_at).collect();
    let deleted = ctx.delete_elements(nodes).await?;

    if json_mode {
        print_json(&json!({ "requested": count, "deleted": deleted }));
    } else if deleted {
        println!("Deleted {count} element(s)");
    } else {
        println!("Engine refused to delete {count} element(s)");
    }
    Ok(())
}

// =============================================================================
// CONTENT COMMANDS
// =============================================================================

pub async fn cmd_get_content(
    ctx: &Ctx,
    json_mode: bool,
    content_type: ContentType,
    addrs: Vec<u64>,
) -> Result<(), AppError> {
    let links: Vec<Link> = addrs
        .iter()
        .map(|a| Link::at(ScAddr(*a), LinkType::Link, content_type))
        .collect();
    let contents = ctx.get_link_contents(links).await?;

    if json_mode {
        let rows: Vec<Value> = addrs
            .iter()
            .zip(&contents)
            .map(|(addr, content)| json!({ "addr": addr, "content": content }))
            .collect();
        print_json(&Value::Array(rows));
    } else {
        for (addr, content) in addrs.iter().zip(&contents) {
            println!("{} = {}", ScAddr(*addr), content);
        }
    }
    Ok(())
}

pub async fn cmd_set_content(
    ctx: &Ctx,
    json_mode: bool,
    addr: u64,
    content_type: ContentType,
    value: &str,
) -> Result<(), AppError> {
    let content = parse_content(content_type, value)?;
    let link = Link::at(ScAddr(addr), LinkType::Link, content_type);
    let (_, results) = ctx.set_link_contents(vec![link], vec![content]).await?;
    let updated = results.first().copied().unwrap_or(false);

    if json_mode {
        print_json(&json!({ "addr": addr, "updated": updated }));
    } else if updated {
        println!("Updated {}", ScAddr(addr));
    } else {
        println!("Engine did not update {}", ScAddr(addr));
    }
    Ok(())
}

// =============================================================================
// SEARCH COMMAND
// =============================================================================

pub async fn cmd_search(
    ctx: &Ctx,
    json_mode: bool,
    search: SearchCommand,
) -> Result<(), AppError> {
    let edges = match search {
        SearchCommand::Nen {
            fixed,
            edge_type,
            node_type,
        } => {
            ctx.find_by_template_node_edge_node(node_at(fixed), edge_type, node_type)
                .await?
        }
        SearchCommand::Nel {
            fixed,
            edge_type,
            link_type,
            content_type,
        } => {
            ctx.find_by_template_node_edge_link(node_at(fixed), edge_type, link_type, content_type)
                .await?
        }
        SearchCommand::Nelr {
            fixed,
            edge_type,
            link_type,
            content_type,
            relation,
            relation_edge_type,
        } => {
            ctx.find_by_template_node_edge_link_with_relation(
                node_at(fixed),
                edge_type,
                link_type,
                content_type,
                node_at(relation),
                relation_edge_type,
            )
            .await?
        }
    };
    let elements: Vec<Element> = edges.map(Element::from).collect();
    tracing::info!(matches = elements.len(), "search finished");
    print_elements(json_mode, &elements);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
