//! # Memory Context
//!
//! Synchronous façade over the protocol. Every public operation is one
//! round trip: local checks, request assembly, transport, decode.
//!
//! ## Session
//!
//! `Unopened → Open → Closed`, strictly linear. Operations are only valid
//! while Open; the Closed state is terminal. Dropping an open context
//! closes its transport.
//!
//! ## Threading
//!
//! A context is driven by one logical thread at a time (`&mut self`).
//! Share it across threads through `AsyncScContext`.
//!
//! ## Atomicity
//!
//! A construction call either returns every requested element committed
//! or fails; the engine's answer is all-or-nothing per request and no
//! partially decoded result is handed out.

use crate::batch::ConstructionBatch;
use crate::element::{Edge, Element, Link, Node, ScElement};
use crate::primitives::FIRST_REQUEST_ID;
use crate::request::{
    ContentEntry, ContentValue, Request, RequestKind, Response, ensure_same_len,
};
use crate::template::{SearchMatch, SearchResults, Template, TemplateEntry, TemplateResult};
use crate::transport::Transport;
use crate::types::{
    ContentType, EdgeType, LinkContent, LinkType, NodeType, ScAddr, ScMemoryError,
};
use serde::Serialize;

/// Lifecycle of a context's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    Open,
    Closed,
}

/// Synchronous memory context bound to one transport.
pub struct ScContext<T: Transport> {
    transport: T,
    state: SessionState,
    next_request_id: u64,
}

impl<T: Transport> std::fmt::Debug for ScContext<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScContext")
            .field("state", &self.state)
            .field("next_request_id", &self.next_request_id)
            .finish()
    }
}

impl<T: Transport> ScContext<T> {
    /// Wrap a transport. The session starts Unopened.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: SessionState::Unopened,
            next_request_id: FIRST_REQUEST_ID,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    // =========================================================================
    // SESSION
    // =========================================================================

    /// Acquire the transport session. A failed open leaves the context Unopened.
    pub fn open(&mut self) -> Result<(), ScMemoryError> {
        match self.state {
            SessionState::Unopened => {}
            SessionState::Open => {
                return Err(ScMemoryError::ContractViolation(
                    "session is already open".to_string(),
                ));
            }
            SessionState::Closed => return Err(ScMemoryError::SessionClosed(self.state)),
        }
        self.transport
            .open()
            .map_err(ScMemoryError::SessionTransport)?;
        self.state = SessionState::Open;
        tracing::info!("memory session opened");
        Ok(())
    }

    /// Release the transport session. The context is Closed afterwards
    /// even if the transport reports an error.
    pub fn close(&mut self) -> Result<(), ScMemoryError> {
        self.ensure_open()?;
        self.state = SessionState::Closed;
        tracing::info!("memory session closed");
        self.transport
            .close()
            .map_err(ScMemoryError::SessionTransport)
    }

    fn ensure_open(&self) -> Result<(), ScMemoryError> {
        match self.state {
            SessionState::Open => Ok(()),
            other => Err(ScMemoryError::SessionClosed(other)),
        }
    }

    // =========================================================================
    // ROUND TRIP
    // =========================================================================

    fn new_request<E: Serialize>(&mut self, kind: RequestKind) -> Request<E> {
        let id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        Request::new(id, kind)
    }

    /// Send a request and return the envelope of its response.
    fn send<E: Serialize>(&mut self, request: &Request<E>) -> Result<Response, ScMemoryError> {
        let kind = request.kind();
        let request_id = request.id();
        let text = request.to_json()?;
        tracing::debug!(request_id, kind = %kind, entries = request.len(), "sending request");

        let reply = self
            .transport
            .round_trip(&text)
            .map_err(|source| {
                tracing::warn!(request_id, kind = %kind, error = %source, "transport failure");
                ScMemoryError::Transport {
                    kind,
                    request_id,
                    source,
                }
            })?;
        let response = Response::parse(&reply, kind, request_id)?;
        tracing::debug!(request_id, kind = %kind, status = response.status, "response received");
        Ok(response)
    }

    /// Send a request the engine must accept as a whole.
    fn send_checked<E: Serialize>(
        &mut self,
        request: &Request<E>,
    ) -> Result<Response, ScMemoryError> {
        let response = self.send(request)?;
        response.ensure_success(request.kind()).inspect_err(|e| {
            tracing::warn!(error = %e, "engine rejected request");
        })?;
        Ok(response)
    }

    // =========================================================================
    // CONSTRUCTION
    // =========================================================================

    /// Create every element of `batch` in one request.
    ///
    /// Returns committed handles in push order. Endpoint references are
    /// checked before anything is sent.
    pub fn commit(&mut self, batch: ConstructionBatch) -> Result<Vec<Element>, ScMemoryError> {
        self.ensure_open()?;
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let entries = batch.encode()?;
        let mut request = self.new_request(RequestKind::Construction);
        request.extend(entries);

        let response = self.send_checked(&request)?;
        let addrs: Vec<ScAddr> = response.positional(RequestKind::Construction, request.len())?;
        batch
            .materialize(&addrs)
            .map_err(|message| ScMemoryError::RemoteOperationFailure {
                kind: RequestKind::Construction,
                request_id: request.id(),
                message,
            })
    }

    /// Create nodes, one per type, in input order.
    pub fn create_nodes(&mut self, types: &[NodeType]) -> Result<Vec<Node>, ScMemoryError> {
        let mut batch = ConstructionBatch::new();
        for t in types {
            batch.push_node(*t);
        }
        Ok(self
            .commit(batch)?
            .into_iter()
            .filter_map(Element::into_node)
            .collect())
    }

    pub fn create_node(&mut self, node_type: NodeType) -> Result<Node, ScMemoryError> {
        single(self.create_nodes(&[node_type])?)
    }

    /// Create edges between committed elements. All inputs must have equal length.
    pub fn create_edges<S: ScElement, U: ScElement>(
        &mut self,
        types: &[EdgeType],
        sources: &[S],
        targets: &[U],
    ) -> Result<Vec<Edge>, ScMemoryError> {
        ensure_same_len(
            types.len(),
            &[("sources", sources.len()), ("targets", targets.len())],
        )?;
        let mut batch = ConstructionBatch::new();
        for ((t, s), g) in types.iter().zip(sources).zip(targets) {
            batch.push_edge(*t, s.to_element(), g.to_element());
        }
        Ok(self
            .commit(batch)?
            .into_iter()
            .filter_map(Element::into_edge)
            .collect())
    }

    pub fn create_edge<S: ScElement, U: ScElement>(
        &mut self,
        edge_type: EdgeType,
        source: &S,
        target: &U,
    ) -> Result<Edge, ScMemoryError> {
        single(self.create_edges(
            &[edge_type],
            std::slice::from_ref(source),
            std::slice::from_ref(target),
        )?)
    }

    /// Create links with the given contents. All inputs must have equal length.
    pub fn create_links(
        &mut self,
        types: &[LinkType],
        contents: Vec<LinkContent>,
    ) -> Result<Vec<Link>, ScMemoryError> {
        ensure_same_len(types.len(), &[("contents", contents.len())])?;
        let mut batch = ConstructionBatch::new();
        for (t, c) in types.iter().zip(contents) {
            batch.push_link(*t, c);
        }
        Ok(self
            .commit(batch)?
            .into_iter()
            .filter_map(Element::into_link)
            .collect())
    }

    pub fn create_integer_links(
        &mut self,
        types: &[LinkType],
        contents: &[i64],
    ) -> Result<Vec<Link>, ScMemoryError> {
        self.create_links(
            types,
            contents.iter().map(|v| LinkContent::Integer(*v)).collect(),
        )
    }

    pub fn create_float_links(
        &mut self,
        types: &[LinkType],
        contents: &[f64],
    ) -> Result<Vec<Link>, ScMemoryError> {
        self.create_links(
            types,
            contents.iter().map(|v| LinkContent::Float(*v)).collect(),
        )
    }

    pub fn create_string_links<S: AsRef<str>>(
        &mut self,
        types: &[LinkType],
        contents: &[S],
    ) -> Result<Vec<Link>, ScMemoryError> {
        self.create_links(
            types,
            contents
                .iter()
                .map(|v| LinkContent::String(v.as_ref().to_string()))
                .collect(),
        )
    }

    pub fn create_integer_link(
        &mut self,
        link_type: LinkType,
        content: i64,
    ) -> Result<Link, ScMemoryError> {
        single(self.create_links(&[link_type], vec![LinkContent::Integer(content)])?)
    }

    pub fn create_float_link(
        &mut self,
        link_type: LinkType,
        content: f64,
    ) -> Result<Link, ScMemoryError> {
        single(self.create_links(&[link_type], vec![LinkContent::Float(content)])?)
    }

    pub fn create_string_link(
        &mut self,
        link_type: LinkType,
        content: impl Into<String>,
    ) -> Result<Link, ScMemoryError> {
        single(self.create_links(&[link_type], vec![LinkContent::String(content.into())])?)
    }

    // =========================================================================
    // DELETION
    // =========================================================================

    /// Delete elements. Returns the engine's verdict for the whole request.
    ///
    /// Local handles stay valid as values but no longer name live elements.
    pub fn delete_elements<E: ScElement>(&mut self, elements: &[E]) -> Result<bool, ScMemoryError> {
        self.ensure_open()?;
        let addrs = elements
            .iter()
            .map(ScElement::committed_addr)
            .collect::<Result<Vec<_>, _>>()?;
        if addrs.is_empty() {
            return Ok(true);
        }
        let mut request = self.new_request(RequestKind::Deletion);
        request.extend(addrs);
        let response = self.send(&request)?;
        Ok(response.status)
    }

    pub fn delete_element<E: ScElement>(&mut self, element: &E) -> Result<bool, ScMemoryError> {
        self.delete_elements(std::slice::from_ref(element))
    }

    // =========================================================================
    // LINK CONTENT
    // =========================================================================

    /// Read the content of committed links, in input order.
    pub fn get_link_contents(&mut self, links: &[Link]) -> Result<Vec<LinkContent>, ScMemoryError> {
        self.ensure_open()?;
        let addrs = links
            .iter()
            .map(ScElement::committed_addr)
            .collect::<Result<Vec<_>, _>>()?;
        if addrs.is_empty() {
            return Ok(Vec::new());
        }
        let mut request = self.new_request(RequestKind::Content);
        request.extend(addrs.into_iter().map(|addr| ContentEntry::Get { addr }));

        let response = self.send_checked(&request)?;
        let request_id = response.id;
        let values: Vec<ContentValue> = response.positional(RequestKind::Content, request.len())?;
        links
            .iter()
            .zip(values)
            .map(|(link, raw)| {
                if raw.content_type != link.content_type() {
                    return Err(ScMemoryError::MalformedResponse {
                        kind: RequestKind::Content,
                        request_id,
                        message: format!(
                            "link holds {} content, engine returned {}",
                            link.content_type(),
                            raw.content_type
                        ),
                    });
                }
                LinkContent::from_json(raw.content_type, &raw.value).map_err(|e| {
                    ScMemoryError::MalformedResponse {
                        kind: RequestKind::Content,
                        request_id,
                        message: e.to_string(),
                    }
                })
            })
            .collect()
    }

    fn get_one(&mut self, link: &Link, wanted: ContentType) -> Result<LinkContent, ScMemoryError> {
        link.committed_addr()?;
        link.expect_content_type(wanted)?;
        single(self.get_link_contents(std::slice::from_ref(link))?)
    }

    pub fn get_integer_link_content(&mut self, link: &Link) -> Result<i64, ScMemoryError> {
        match self.get_one(link, ContentType::Integer)? {
            LinkContent::Integer(v) => Ok(v),
            other => Err(mismatch(ContentType::Integer, &other)),
        }
    }

    pub fn get_float_link_content(&mut self, link: &Link) -> Result<f64, ScMemoryError> {
        match self.get_one(link, ContentType::Float)? {
            LinkContent::Float(v) => Ok(v),
            other => Err(mismatch(ContentType::Float, &other)),
        }
    }

    pub fn get_string_link_content(&mut self, link: &Link) -> Result<String, ScMemoryError> {
        match self.get_one(link, ContentType::String)? {
            LinkContent::String(v) => Ok(v),
            other => Err(mismatch(ContentType::String, &other)),
        }
    }

    /// Overwrite the content of committed links.
    ///
    /// Every link must be committed and each value must match its link's
    /// content type; both are checked before sending. Links the engine
    /// updated get their cached content replaced.
    pub fn set_link_contents(
        &mut self,
        links: &mut [Link],
        contents: Vec<LinkContent>,
    ) -> Result<Vec<bool>, ScMemoryError> {
        self.ensure_open()?;
        ensure_same_len(links.len(), &[("contents", contents.len())])?;
        let mut entries = Vec::with_capacity(links.len());
        for (link, content) in links.iter().zip(&contents) {
            let addr = link.committed_addr()?;
            link.expect_content_type(content.content_type())?;
            entries.push(ContentEntry::Set {
                addr,
                content_type: content.content_type(),
                data: content.clone(),
            });
        }
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let mut request = self.new_request(RequestKind::Content);
        request.extend(entries);

        let response = self.send_checked(&request)?;
        let results: Vec<bool> = response.positional(RequestKind::Content, request.len())?;
        for ((link, content), ok) in links.iter_mut().zip(contents).zip(&results) {
            if *ok {
                link.cache_content(content);
            }
        }
        Ok(results)
    }

    fn set_one(&mut self, link: &mut Link, content: LinkContent) -> Result<bool, ScMemoryError> {
        single(self.set_link_contents(std::slice::from_mut(link), vec![content])?)
    }

    pub fn set_integer_link_content(
        &mut self,
        link: &mut Link,
        content: i64,
    ) -> Result<bool, ScMemoryError> {
        self.set_one(link, LinkContent::Integer(content))
    }

    pub fn set_float_link_content(
        &mut self,
        link: &mut Link,
        content: f64,
    ) -> Result<bool, ScMemoryError> {
        self.set_one(link, LinkContent::Float(content))
    }

    pub fn set_string_link_content(
        &mut self,
        link: &mut Link,
        content: impl Into<String>,
    ) -> Result<bool, ScMemoryError> {
        self.set_one(link, LinkContent::String(content.into()))
    }

    // =========================================================================
    // TEMPLATE SEARCH
    // =========================================================================

    /// Run several templates in one request.
    ///
    /// Matches are ordered by template (input order), then by engine row
    /// order, and tagged with the index of their template.
    pub fn search(
        &mut self,
        templates: &[Template],
    ) -> Result<SearchResults<SearchMatch>, ScMemoryError> {
        self.ensure_open()?;
        let entries = templates
            .iter()
            .map(Template::encode)
            .collect::<Result<Vec<TemplateEntry>, _>>()?;
        if entries.is_empty() {
            return Ok(SearchResults::new(Vec::new()));
        }
        let mut request = self.new_request(RequestKind::Search);
        request.extend(entries);

        let response = self.send_checked(&request)?;
        let request_id = response.id;
        let results: Vec<TemplateResult> =
            response.positional(RequestKind::Search, request.len())?;

        let mut matches = Vec::new();
        for (index, (template, result)) in templates.iter().zip(results).enumerate() {
            for row in &result.addrs {
                let m = template.decode_row(index, row).map_err(|message| {
                    ScMemoryError::MalformedResponse {
                        kind: RequestKind::Search,
                        request_id,
                        message,
                    }
                })?;
                matches.push(m);
            }
        }
        tracing::debug!(request_id, matches = matches.len(), "search decoded");
        Ok(SearchResults::new(matches))
    }

    fn search_edges(&mut self, template: Template) -> Result<SearchResults<Edge>, ScMemoryError> {
        let edges = self
            .search(std::slice::from_ref(&template))?
            .map(|m| m.edge)
            .collect();
        Ok(SearchResults::new(edges))
    }

    /// Edges of `edge_type` from `fixed` to nodes of `node_type`.
    pub fn find_by_template_node_edge_node(
        &mut self,
        fixed: &Node,
        edge_type: EdgeType,
        node_type: NodeType,
    ) -> Result<SearchResults<Edge>, ScMemoryError> {
        self.search_edges(Template::node_edge_node(fixed, edge_type, node_type))
    }

    /// Edges of `edge_type` from `fixed` to links of `link_type` holding `content_type`.
    pub fn find_by_template_node_edge_link(
        &mut self,
        fixed: &Node,
        edge_type: EdgeType,
        link_type: LinkType,
        content_type: ContentType,
    ) -> Result<SearchResults<Edge>, ScMemoryError> {
        self.search_edges(Template::node_edge_link(
            fixed,
            edge_type,
            link_type,
            content_type,
        ))
    }

    /// Like `find_by_template_node_edge_link`, restricted to edges that
    /// `relation` points at with an edge of `relation_edge_type`.
    pub fn find_by_template_node_edge_link_with_relation(
        &mut self,
        fixed: &Node,
        edge_type: EdgeType,
        link_type: LinkType,
        content_type: ContentType,
        relation: &Node,
        relation_edge_type: EdgeType,
    ) -> Result<SearchResults<Edge>, ScMemoryError> {
        self.search_edges(Template::node_edge_link_with_relation(
            fixed,
            edge_type,
            link_type,
            content_type,
            relation,
            relation_edge_type,
        ))
    }
}

impl<T: Transport> Drop for ScContext<T> {
    fn drop(&mut self) {
        if self.state == SessionState::Open {
            self.state = SessionState::Closed;
            if let Err(e) = self.transport.close() {
                tracing::warn!(error = %e, "failed to close transport on drop");
            }
        }
    }
}

/// Take the only item of a one-element result.
///
/// Callers pass results of one-entry requests whose length
/// `Response::positional` has already checked, so the error arm only
/// guards against a broken caller.
fn single<T>(items: Vec<T>) -> Result<T, ScMemoryError> {
    let len = items.len();
    let mut iter = items.into_iter();
    match (iter.next(), iter.next()) {
        (Some(item), None) => Ok(item),
        _ => Err(ScMemoryError::Serialization(format!(
            "expected exactly one result, got {len}"
        ))),
    }
}

fn mismatch(expected: ContentType, found: &LinkContent) -> ScMemoryError {
    ScMemoryError::TypeMismatch {
        expected,
        found: found.content_type(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
