//! # Protocol Tier Tests (T0-T4)
//!
//! Every tier runs against the loopback engine through the public API.
//!
//! ## Tiers
//! - T0: Element Identity
//! - T1: Batch Construction and References
//! - T2: Link Content
//! - T3: Template Search
//! - T4: Session and Async Scheduling

use scmemory_core::{
    ConstructionBatch, ContentType, EdgeType, Element, EndpointDescriptor, LinkContent, LinkType,
    LoopbackHandle, LoopbackTransport, Node, NodeType, ScAddr, ScContext, ScElement,
    ScMemoryError, SessionState, Template,
};

fn session() -> (ScContext<LoopbackTransport>, LoopbackHandle) {
    let transport = LoopbackTransport::new();
    let handle = transport.handle();
    let mut ctx = ScContext::new(transport);
    ctx.open().expect("open");
    (ctx, handle)
}

// =============================================================================
// TIER T0: ELEMENT IDENTITY
// =============================================================================

mod t0_element_identity {
    use super::*;

    /// T0.1: Committed handles compare by address.
    #[test]
    fn committed_equality_follows_address() {
        let (mut ctx, _) = session();
        let nodes = ctx
            .create_nodes(&[NodeType::NodeConst, NodeType::NodeConst])
            .expect("nodes");
        let again = Node::at(nodes[0].committed_addr().expect("addr"), NodeType::Node);

        assert_eq!(nodes[0], again);
        assert_ne!(nodes[0], nodes[1]);
    }

    /// T0.2: Pending handles are never equal.
    #[test]
    fn pending_handles_never_equal() {
        let a = Node::pending(NodeType::NodeConst);
        let b = Node::pending(NodeType::NodeConst);
        assert_ne!(a, b);
        assert_ne!(a.to_element(), a.to_element());
    }
}

// =============================================================================
// TIER T1: BATCH CONSTRUCTION AND REFERENCES
// =============================================================================

mod t1_construction {
    use super::*;

    /// T1.1: N node types commit to N nodes in input order.
    #[test]
    fn nodes_commit_in_input_order() {
        let (mut ctx, _) = session();
        let types = [
            NodeType::NodeConstClass,
            NodeType::NodeConst,
            NodeType::NodeConstNoRole,
            NodeType::NodeVar,
        ];
        let nodes = ctx.create_nodes(&types).expect("nodes");

        assert_eq!(nodes.len(), types.len());
        for (node, wanted) in nodes.iter().zip(types) {
            assert_eq!(node.node_type(), wanted);
            assert!(node.is_committed());
        }
        let addrs: Vec<ScAddr> = nodes.iter().filter_map(ScElement::addr).collect();
        let mut sorted = addrs.clone();
        sorted.sort();
        assert_eq!(addrs, sorted);
    }

    /// T1.2: An edge to a node pushed two positions earlier uses REF 2.
    #[test]
    fn pending_target_resolves_to_ref_two() {
        let (mut ctx, _) = session();
        let fixed = ctx.create_node(NodeType::NodeConst).expect("fixed");

        let mut batch = ConstructionBatch::new();
        batch.push_node(NodeType::NodeConst);
        batch.push_node(NodeType::NodeConst);
        let target = batch.push_node(NodeType::NodeConstClass);
        batch.push_node(NodeType::NodeConst);
        batch.push_edge(EdgeType::AccessConstPosPerm, &fixed, target);

        let entries = batch.encode().expect("encode");
        assert!(matches!(
            entries[4],
            scmemory_core::ConstructionEntry::Edge {
                trg: EndpointDescriptor::Ref(2),
                ..
            }
        ));

        let committed = ctx.commit(batch).expect("commit");
        let edge = committed[4].as_edge().expect("edge");
        assert_eq!(edge.target().addr(), committed[2].addr());
        assert_eq!(edge.source().addr(), fixed.addr());
    }

    /// T1.3: Unequal parallel streams fail before any transport call.
    #[test]
    fn unequal_streams_fail_before_transport() {
        let (mut ctx, handle) = session();
        let sources = ctx
            .create_nodes(&[NodeType::NodeConst, NodeType::NodeConst])
            .expect("sources");
        let before = handle.round_trips();

        let err = ctx
            .create_edges(&[EdgeType::DCommonConst; 3], &sources[..], &sources[..])
            .expect_err("unequal");

        assert!(matches!(err, ScMemoryError::ContractViolation(_)));
        assert_eq!(handle.round_trips(), before);
    }

    /// T1.4: A reference into another batch is rejected locally.
    #[test]
    fn foreign_reference_is_unresolved() {
        let (mut ctx, handle) = session();
        let mut first = ConstructionBatch::new();
        let stranger = first.push_node(NodeType::NodeConst);

        let mut second = ConstructionBatch::new();
        let local = second.push_node(NodeType::NodeConst);
        second.push_edge(EdgeType::DCommonConst, local, stranger);

        let err = ctx.commit(second).expect_err("unresolved");
        assert!(matches!(err, ScMemoryError::UnresolvedReference { position: 1, .. }));
        assert!(err.is_local());
        assert_eq!(handle.round_trips(), 0);
    }

    /// T1.5: A rejected batch commits nothing.
    #[test]
    fn rejected_batch_is_atomic() {
        let (mut ctx, handle) = session();
        let mut batch = ConstructionBatch::new();
        let a = batch.push_node(NodeType::NodeConst);
        let l = batch.push_link(LinkType::LinkConst, LinkContent::String("x".into()));
        batch.push_edge(EdgeType::DCommonConst, a, l);

        handle.reject_next("out of memory");
        let err = ctx.commit(batch).expect_err("rejected");
        assert!(matches!(
            err,
            ScMemoryError::RemoteOperationFailure { request_id: 1, .. }
        ));
        assert_eq!(handle.element_count(), 0);
    }

    /// T1.6: Mixed batches return every kind in push order.
    #[test]
    fn mixed_batch_returns_kinds_in_order() {
        let (mut ctx, _) = session();
        let mut batch = ConstructionBatch::new();
        let n = batch.push_node(NodeType::NodeConst);
        let l = batch.push_link(LinkType::LinkConst, LinkContent::Integer(3));
        batch.push_edge(EdgeType::DCommonConst, n, l);

        let kinds: Vec<&str> = ctx
            .commit(batch)
            .expect("commit")
            .iter()
            .map(Element::kind)
            .collect();
        assert_eq!(kinds, ["node", "link", "edge"]);
    }
}

// =============================================================================
// TIER T2: LINK CONTENT
// =============================================================================

mod t2_link_content {
    use super::*;

    /// T2.1: set 42 then get returns 42.
    #[test]
    fn integer_set_then_get() {
        let (mut ctx, _) = session();
        let mut link = ctx.create_integer_link(LinkType::LinkConst, 0).expect("link");

        assert!(ctx.set_integer_link_content(&mut link, 42).expect("set"));
        assert_eq!(ctx.get_integer_link_content(&link).expect("get"), 42);
    }

    /// T2.2: Batched reads keep input order across content types.
    #[test]
    fn batched_reads_are_positional() {
        let (mut ctx, _) = session();
        let links = ctx
            .create_links(
                &[LinkType::LinkConst; 3],
                vec![
                    LinkContent::String("one".into()),
                    LinkContent::Integer(2),
                    LinkContent::Float(3.5),
                ],
            )
            .expect("links");
        let read = ctx.get_link_contents(&links).expect("read");
        assert_eq!(
            read,
            vec![
                LinkContent::String("one".into()),
                LinkContent::Integer(2),
                LinkContent::Float(3.5),
            ]
        );
    }

    /// T2.3: Writing the wrong content type is rejected locally.
    #[test]
    fn wrong_type_write_is_local() {
        let (mut ctx, handle) = session();
        let mut links = ctx
            .create_string_links(&[LinkType::LinkConst], &["name"])
            .expect("links");
        let before = handle.round_trips();

        let err = ctx
            .set_link_contents(&mut links, vec![LinkContent::Float(1.0)])
            .expect_err("mismatch");
        assert!(matches!(
            err,
            ScMemoryError::TypeMismatch {
                expected: ContentType::String,
                found: ContentType::Float
            }
        ));
        assert_eq!(handle.round_trips(), before);
    }
}

// =============================================================================
// TIER T3: TEMPLATE SEARCH
// =============================================================================

mod t3_template_search {
    use super::*;

    /// T3.1: Node-Edge-Node results start at the fixed node and honour both types.
    #[test]
    fn node_edge_node_respects_fixed_and_types() {
        let (mut ctx, _) = session();
        let fixed = ctx.create_node(NodeType::NodeConst).expect("fixed");
        let elsewhere = ctx.create_node(NodeType::NodeConst).expect("other");
        let classes = ctx
            .create_nodes(&[NodeType::NodeConstClass, NodeType::NodeConstClass])
            .expect("classes");
        let plain = ctx.create_node(NodeType::NodeConst).expect("plain");

        for class in &classes {
            ctx.create_edge(EdgeType::AccessConstPosPerm, &fixed, class)
                .expect("edge");
        }
        ctx.create_edge(EdgeType::AccessConstPosPerm, &fixed, &plain)
            .expect("edge to wrong type");
        ctx.create_edge(EdgeType::DCommonConst, &fixed, &classes[0])
            .expect("edge of wrong type");
        ctx.create_edge(EdgeType::AccessConstPosPerm, &elsewhere, &classes[1])
            .expect("edge from elsewhere");

        let edges: Vec<_> = ctx
            .find_by_template_node_edge_node(
                &fixed,
                EdgeType::AccessConstPosPerm,
                NodeType::NodeConstClass,
            )
            .expect("search")
            .collect();

        assert_eq!(edges.len(), 2);
        for edge in &edges {
            assert_eq!(edge.source().addr(), fixed.addr());
            assert_eq!(edge.edge_type(), EdgeType::AccessConstPosPerm);
            let target = edge.target().as_node().expect("node target");
            assert_eq!(target.node_type(), NodeType::NodeConstClass);
        }
    }

    /// T3.2: Results are single-pass.
    #[test]
    fn results_are_not_restartable() {
        let (mut ctx, _) = session();
        let fixed = ctx.create_node(NodeType::NodeConst).expect("fixed");
        let target = ctx.create_node(NodeType::NodeConst).expect("target");
        ctx.create_edge(EdgeType::DCommonConst, &fixed, &target)
            .expect("edge");

        let mut results = ctx
            .find_by_template_node_edge_node(&fixed, EdgeType::DCommonConst, NodeType::NodeConst)
            .expect("search");
        assert_eq!(results.len(), 1);
        assert_eq!(results.by_ref().count(), 1);
        assert_eq!(results.next().map(|e| e.edge_type()), None);
    }

    /// T3.3: Batched search tags rows with their template index.
    #[test]
    fn batched_search_tags_template_index() {
        let (mut ctx, handle) = session();
        let a = ctx.create_node(NodeType::NodeConst).expect("a");
        let b = ctx.create_node(NodeType::NodeConst).expect("b");
        let la = ctx.create_integer_link(LinkType::LinkConst, 1).expect("la");
        let lb = ctx.create_integer_link(LinkType::LinkConst, 2).expect("lb");
        ctx.create_edge(EdgeType::DCommonConst, &a, &la).expect("edge");
        ctx.create_edge(EdgeType::DCommonConst, &b, &lb).expect("edge");
        let before = handle.round_trips();

        let templates = [
            Template::node_edge_link(&b, EdgeType::DCommonConst, LinkType::LinkConst, ContentType::Integer),
            Template::node_edge_link(&a, EdgeType::DCommonConst, LinkType::LinkConst, ContentType::Integer),
        ];
        let tagged: Vec<(usize, Option<ScAddr>)> = ctx
            .search(&templates)
            .expect("search")
            .map(|m| (m.template, m.edge.target().addr()))
            .collect();

        assert_eq!(handle.round_trips(), before + 1);
        assert_eq!(tagged, vec![(0, lb.addr()), (1, la.addr())]);
    }

    /// T3.4: A content-type filter excludes links of other types.
    #[test]
    fn content_type_filters_links() {
        let (mut ctx, _) = session();
        let fixed = ctx.create_node(NodeType::NodeConst).expect("fixed");
        let number = ctx.create_integer_link(LinkType::LinkConst, 7).expect("int");
        let word = ctx.create_string_link(LinkType::LinkConst, "seven").expect("str");
        ctx.create_edge(EdgeType::DCommonConst, &fixed, &number).expect("edge");
        ctx.create_edge(EdgeType::DCommonConst, &fixed, &word).expect("edge");

        let edges: Vec<_> = ctx
            .find_by_template_node_edge_link(
                &fixed,
                EdgeType::DCommonConst,
                LinkType::LinkConst,
                ContentType::String,
            )
            .expect("search")
            .collect();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target().addr(), word.addr());
    }

    /// T3.5: A pending fixed node cannot be searched.
    #[test]
    fn pending_fixed_node_rejected() {
        let (mut ctx, _) = session();
        let err = ctx
            .find_by_template_node_edge_node(
                &Node::pending(NodeType::NodeConst),
                EdgeType::DCommonConst,
                NodeType::NodeConst,
            )
            .expect_err("pending");
        assert!(matches!(err, ScMemoryError::NotCommitted));
    }
}

// =============================================================================
// TIER T4: SESSION AND ASYNC SCHEDULING
// =============================================================================

mod t4_session_and_async {
    use super::*;
    use scmemory_core::AsyncScContext;

    /// T4.1: Double close and operate-after-close both fail.
    #[test]
    fn closed_session_is_terminal() {
        let (mut ctx, _) = session();
        ctx.close().expect("close");

        assert!(matches!(ctx.close(), Err(ScMemoryError::SessionClosed(_))));
        assert!(matches!(
            ctx.create_node(NodeType::NodeConst),
            Err(ScMemoryError::SessionClosed(SessionState::Closed))
        ));
    }

    /// T4.2: Awaiting the first call orders the second after it.
    #[test]
    fn awaited_calls_are_strictly_ordered() {
        let pool = AsyncScContext::new(ScContext::new(LoopbackTransport::new())).expect("pool");
        pool.open().wait().expect("open");

        let first = pool.create_node(NodeType::NodeConst).wait().expect("first");
        let second = pool.create_node(NodeType::NodeConst).wait().expect("second");
        assert!(first.addr() < second.addr());

        pool.close().wait().expect("close");
        pool.shutdown().expect("shutdown");
    }

    /// T4.3: Independent calls all complete, in some order.
    #[test]
    fn independent_calls_all_complete() {
        let transport = LoopbackTransport::new();
        let handle = transport.handle();
        let pool = AsyncScContext::new(ScContext::new(transport)).expect("pool");
        pool.open().wait().expect("open");

        let calls: Vec<_> = (0..16)
            .map(|_| pool.create_node(NodeType::NodeConst))
            .collect();
        let mut addrs: Vec<ScAddr> = calls
            .into_iter()
            .map(|c| c.wait().expect("node").committed_addr().expect("addr"))
            .collect();
        addrs.sort();
        addrs.dedup();

        assert_eq!(addrs.len(), 16);
        assert_eq!(handle.element_count(), 16);
        pool.shutdown().expect("shutdown");
    }

    /// T4.4: Submissions after shutdown fail instead of hanging.
    #[test]
    fn submit_after_shutdown_fails() {
        let pool = AsyncScContext::new(ScContext::new(LoopbackTransport::new())).expect("pool");
        pool.shutdown().expect("shutdown");
        assert!(matches!(
            pool.create_node(NodeType::Node).wait(),
            Err(ScMemoryError::PoolShutdown)
        ));
    }
}
