//! # scmemory CLI Module
//!
//! ## Available Commands
//!
//! - `create-node` - Create one node
//! - `create-link` - Create one link with content
//! - `create-edge` - Create one edge between two addresses
//! - `delete` - Delete elements by address
//! - `get-content` - Read link content
//! - `set-content` - Overwrite link content
//! - `search` - Run a template search (`nen`, `nel`, `nelr`)

mod commands;

use clap::{Parser, Subcommand};
use scmemory::{AppError, ClientConfig, WsTransport};
use scmemory_core::{AsyncScContext, ContentType, EdgeType, LinkType, NodeType, ScContext};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// scmemory - semantic memory client
///
/// Each command opens a session, runs one call and closes the session.
#[derive(Parser, Debug)]
#[command(name = "scmemory")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Engine WebSocket URL (overrides config and SCMEMORY_URL)
    #[arg(short, long, global = true)]
    pub url: Option<String>,

    /// Worker threads for the call pool (overrides config and SCMEMORY_WORKERS)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a node
    CreateNode {
        /// Node type (e.g. node-const, node-const-class)
        #[arg(short = 't', long = "type", default_value = "node-const")]
        node_type: NodeType,
    },

    /// Create a link holding a value
    CreateLink {
        /// Link type
        #[arg(short = 't', long = "type", default_value = "link-const")]
        link_type: LinkType,

        /// Content type (int, float, string)
        #[arg(short = 'k', long, default_value = "string")]
        content_type: ContentType,

        /// Content value
        value: String,
    },

    /// Create an edge between two existing elements
    CreateEdge {
        /// Edge type (e.g. access-const-pos-perm, dcommon-const)
        #[arg(short = 't', long = "type", default_value = "access-const-pos-perm")]
        edge_type: EdgeType,

        /// Source address
        #[arg(short, long)]
        source: u64,

        /// Target address
        #[arg(short = 'g', long)]
        target: u64,
    },

    /// Delete elements (and their incident edges)
    Delete {
        /// Addresses to delete
        #[arg(required = true)]
        addrs: Vec<u64>,
    },

    /// Read link content
    GetContent {
        /// Content type the links hold
        #[arg(short = 'k', long)]
        content_type: ContentType,

        /// Link addresses
        #[arg(required = true)]
        addrs: Vec<u64>,
    },

    /// Overwrite link content
    SetContent {
        /// Link address
        addr: u64,

        /// Content type the link holds
        #[arg(short = 'k', long)]
        content_type: ContentType,

        /// New value
        value: String,
    },

    /// Run a template search
    #[command(subcommand)]
    Search(SearchCommand),
}

/// Template shapes.
#[derive(Subcommand, Debug)]
pub enum SearchCommand {
    /// Node-Edge-Node
    Nen {
        /// Fixed node address
        #[arg(short, long)]
        fixed: u64,

        /// Edge type
        #[arg(short, long, default_value = "access-const-pos-perm")]
        edge_type: EdgeType,

        /// Type of the matched node
        #[arg(short, long, default_value = "node-const")]
        node_type: NodeType,
    },

    /// Node-Edge-Link
    Nel {
        /// Fixed node address
        #[arg(short, long)]
        fixed: u64,

        /// Edge type
        #[arg(short, long, default_value = "dcommon-const")]
        edge_type: EdgeType,

        /// Type of the matched link
        #[arg(short, long, default_value = "link-const")]
        link_type: LinkType,

        /// Content type of the matched link
        #[arg(short = 'k', long, default_value = "string")]
        content_type: ContentType,
    },

    /// Node-Edge-Link with a relation node marking the edge
    Nelr {
        /// Fixed node address
        #[arg(short, long)]
        fixed: u64,

        /// Edge type
        #[arg(short, long, default_value = "dcommon-const")]
        edge_type: EdgeType,

        /// Type of the matched link
        #[arg(short, long, default_value = "link-const")]
        link_type: LinkType,

        /// Content type of the matched link
        #[arg(short = 'k', long, default_value = "string")]
        content_type: ContentType,

        /// Relation node address
        #[arg(short, long)]
        relation: u64,

        /// Type of the edge from the relation node
        #[arg(long, default_value = "access-const-pos-perm")]
        relation_edge_type: EdgeType,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), AppError> {
    let config = ClientConfig::resolve(cli.config.as_deref(), cli.url, cli.workers)?;
    let json_mode = cli.json_mode;

    let ctx = AsyncScContext::with_workers(
        ScContext::new(WsTransport::new(config.url.clone())),
        config.workers,
    )?;
    ctx.open().await?;

    let result = match cli.command {
        Commands::CreateNode { node_type } => cmd_create_node(&ctx, json_mode, node_type).await,
        Commands::CreateLink {
            link_type,
            content_type,
            value,
        } => cmd_create_link(&ctx, json_mode, link_type, content_type, &value).await,
        Commands::CreateEdge {
            edge_type,
            source,
            target,
        } => cmd_create_edge(&ctx, json_mode, edge_type, source, target).await,
        Commands::Delete { addrs } => cmd_delete(&ctx, json_mode, addrs).await,
        Commands::GetContent {
            content_type,
            addrs,
        } => cmd_get_content(&ctx, json_mode, content_type, addrs).await,
        Commands::SetContent {
            addr,
            content_type,
            value,
        } => cmd_set_content(&ctx, json_mode, addr, content_type, &value).await,
        Commands::Search(search) => cmd_search(&ctx, json_mode, search).await,
    };

    let closed = ctx.close().await;
    ctx.shutdown()?;
    result?;
    closed?;
    Ok(())
}
