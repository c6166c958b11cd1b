//! # Asynchronous Context
//!
//! Runs `ScContext` calls on a fixed pool of worker threads. Each call is
//! one job and yields a [`CallHandle`] that can be awaited or blocked on.
//!
//! ## Ordering
//!
//! Independent calls are not ordered: two calls submitted back to back may
//! complete in either order. Dependent work has two options:
//!
//! - wait on the first handle before submitting the second;
//! - put the dependent calls in one [`AsyncScContext::submit`] closure,
//!   which runs them in sequence on a single worker.
//!
//! Batch-local references (`ConstructionBatch`) keep dependent creations
//! in a single request and need neither.
//!
//! ## Lifetime
//!
//! There is no cancellation and no timeout. `shutdown` stops accepting
//! work, lets queued jobs finish and joins the workers; it succeeds once.

use crate::batch::ConstructionBatch;
use crate::context::ScContext;
use crate::element::{Edge, Element, Link, Node, ScElement};
use crate::primitives::DEFAULT_WORKERS;
use crate::template::{SearchMatch, SearchResults, Template};
use crate::transport::Transport;
use crate::types::{ContentType, EdgeType, LinkContent, LinkType, NodeType, ScMemoryError};
use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;

type Job = Box<dyn FnOnce() + Send + 'static>;

// =============================================================================
// CALL HANDLE
// =============================================================================

/// Completion handle of one submitted call.
///
/// Await it from async code, or call [`CallHandle::wait`] from a plain
/// thread. `wait` must not be used inside a Tokio runtime.
#[derive(Debug)]
#[must_use = "a call handle does nothing unless awaited or waited on"]
pub struct CallHandle<R> {
    rx: oneshot::Receiver<Result<R, ScMemoryError>>,
}

impl<R> CallHandle<R> {
    fn ready(result: Result<R, ScMemoryError>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }

    /// Block the current thread until the call completes.
    pub fn wait(self) -> Result<R, ScMemoryError> {
        self.rx
            .blocking_recv()
            .unwrap_or(Err(ScMemoryError::WorkerLost))
    }
}

impl<R> Future for CallHandle<R> {
    type Output = Result<R, ScMemoryError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ScMemoryError::WorkerLost)))
    }
}

// =============================================================================
// ASYNC CONTEXT
// =============================================================================

/// A memory context shared by a pool of worker threads.
pub struct AsyncScContext<T: Transport + 'static> {
    context: Arc<Mutex<ScContext<T>>>,
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: Transport + 'static> std::fmt::Debug for AsyncScContext<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncScContext")
            .field("workers", &self.workers.lock().len())
            .field("accepting", &self.sender.lock().is_some())
            .finish()
    }
}

impl<T: Transport + 'static> AsyncScContext<T> {
    /// Wrap `context` with the default pool size.
    pub fn new(context: ScContext<T>) -> Result<Self, ScMemoryError> {
        Self::with_workers(context, DEFAULT_WORKERS)
    }

    /// Wrap `context` with `workers` threads.
    pub fn with_workers(context: ScContext<T>, workers: usize) -> Result<Self, ScMemoryError> {
        if workers == 0 {
            return Err(ScMemoryError::ContractViolation(
                "worker pool needs at least one thread".to_string(),
            ));
        }
        let (sender, receiver) = unbounded::<Job>();
        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let receiver = receiver.clone();
            let spawned = thread::Builder::new()
                .name(format!("scmemory-worker-{i}"))
                .spawn(move || worker_loop(&receiver));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    drop(sender);
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(ScMemoryError::WorkerSpawn(e.to_string()));
                }
            }
        }
        tracing::info!(workers, "worker pool started");
        Ok(Self {
            context: Arc::new(Mutex::new(context)),
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
        })
    }

    /// Run `f` against the context as a single job.
    ///
    /// Calls made inside `f` execute in order, with no other job
    /// interleaved. After shutdown the handle resolves to `PoolShutdown`.
    pub fn submit<R, F>(&self, f: F) -> CallHandle<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut ScContext<T>) -> Result<R, ScMemoryError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let context = Arc::clone(&self.context);
        let job: Job = Box::new(move || {
            let result = f(&mut context.lock());
            let _ = tx.send(result);
        });
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(s) if s.send(job).is_ok() => CallHandle { rx },
            _ => CallHandle::ready(Err(ScMemoryError::PoolShutdown)),
        }
    }

    /// Stop accepting work, drain the queue and join the workers.
    pub fn shutdown(&self) -> Result<(), ScMemoryError> {
        let Some(sender) = self.sender.lock().take() else {
            return Err(ScMemoryError::PoolShutdown);
        };
        drop(sender);
        let handles = std::mem::take(&mut *self.workers.lock());
        let count = handles.len();
        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!("worker thread exited abnormally");
            }
        }
        tracing::info!(workers = count, "worker pool shut down");
        Ok(())
    }

    // =========================================================================
    // SESSION
    // =========================================================================

    pub fn open(&self) -> CallHandle<()> {
        self.submit(ScContext::open)
    }

    pub fn close(&self) -> CallHandle<()> {
        self.submit(ScContext::close)
    }

    // =========================================================================
    // CONSTRUCTION
    // =========================================================================

    pub fn commit(&self, batch: ConstructionBatch) -> CallHandle<Vec<Element>> {
        self.submit(move |ctx| ctx.commit(batch))
    }

    pub fn create_nodes(&self, types: Vec<NodeType>) -> CallHandle<Vec<Node>> {
        self.submit(move |ctx| ctx.create_nodes(&types))
    }

    pub fn create_node(&self, node_type: NodeType) -> CallHandle<Node> {
        self.submit(move |ctx| ctx.create_node(node_type))
    }

    pub fn create_edges<S, U>(
        &self,
        types: Vec<EdgeType>,
        sources: Vec<S>,
        targets: Vec<U>,
    ) -> CallHandle<Vec<Edge>>
    where
        S: ScElement + Send + 'static,
        U: ScElement + Send + 'static,
    {
        self.submit(move |ctx| ctx.create_edges(&types, &sources, &targets))
    }

    pub fn create_edge<S, U>(&self, edge_type: EdgeType, source: S, target: U) -> CallHandle<Edge>
    where
        S: ScElement + Send + 'static,
        U: ScElement + Send + 'static,
    {
        self.submit(move |ctx| ctx.create_edge(edge_type, &source, &target))
    }

    pub fn create_links(
        &self,
        types: Vec<LinkType>,
        contents: Vec<LinkContent>,
    ) -> CallHandle<Vec<Link>> {
        self.submit(move |ctx| ctx.create_links(&types, contents))
    }

    pub fn create_integer_link(&self, link_type: LinkType, content: i64) -> CallHandle<Link> {
        self.submit(move |ctx| ctx.create_integer_link(link_type, content))
    }

    pub fn create_float_link(&self, link_type: LinkType, content: f64) -> CallHandle<Link> {
        self.submit(move |ctx| ctx.create_float_link(link_type, content))
    }

    pub fn create_string_link(
        &self,
        link_type: LinkType,
        content: impl Into<String>,
    ) -> CallHandle<Link> {
        let content = content.into();
        self.submit(move |ctx| ctx.create_string_link(link_type, content))
    }

    // =========================================================================
    // DELETION
    // =========================================================================

    pub fn delete_elements<E>(&self, elements: Vec<E>) -> CallHandle<bool>
    where
        E: ScElement + Send + 'static,
    {
        self.submit(move |ctx| ctx.delete_elements(&elements))
    }

    pub fn delete_element<E>(&self, element: E) -> CallHandle<bool>
    where
        E: ScElement + Send + 'static,
    {
        self.submit(move |ctx| ctx.delete_element(&element))
    }

    // =========================================================================
    // LINK CONTENT
    // =========================================================================

    pub fn get_link_contents(&self, links: Vec<Link>) -> CallHandle<Vec<LinkContent>> {
        self.submit(move |ctx| ctx.get_link_contents(&links))
    }

    pub fn get_integer_link_content(&self, link: Link) -> CallHandle<i64> {
        self.submit(move |ctx| ctx.get_integer_link_content(&link))
    }

    pub fn get_float_link_content(&self, link: Link) -> CallHandle<f64> {
        self.submit(move |ctx| ctx.get_float_link_content(&link))
    }

    pub fn get_string_link_content(&self, link: Link) -> CallHandle<String> {
        self.submit(move |ctx| ctx.get_string_link_content(&link))
    }

    /// Overwrite link contents. The links come back with their cache updated.
    pub fn set_link_contents(
        &self,
        mut links: Vec<Link>,
        contents: Vec<LinkContent>,
    ) -> CallHandle<(Vec<Link>, Vec<bool>)> {
        self.submit(move |ctx| {
            let results = ctx.set_link_contents(&mut links, contents)?;
            Ok((links, results))
        })
    }

    // =========================================================================
    // TEMPLATE SEARCH
    // =========================================================================

    pub fn search(&self, templates: Vec<Template>) -> CallHandle<SearchResults<SearchMatch>> {
        self.submit(move |ctx| ctx.search(&templates))
    }

    pub fn find_by_template_node_edge_node(
        &self,
        fixed: Node,
        edge_type: EdgeType,
        node_type: NodeType,
    ) -> CallHandle<SearchResults<Edge>> {
        self.submit(move |ctx| ctx.find_by_template_node_edge_node(&fixed, edge_type, node_type))
    }

    pub fn find_by_template_node_edge_link(
        &self,
        fixed: Node,
        edge_type: EdgeType,
        link_type: LinkType,
        content_type: ContentType,
    ) -> CallHandle<SearchResults<Edge>> {
        self.submit(move |ctx| {
            ctx.find_by_template_node_edge_link(&fixed, edge_type, link_type, content_type)
        })
    }

    pub fn find_by_template_node_edge_link_with_relation(
        &self,
        fixed: Node,
        edge_type: EdgeType,
        link_type: LinkType,
        content_type: ContentType,
        relation: Node,
        relation_edge_type: EdgeType,
    ) -> CallHandle<SearchResults<Edge>> {
        self.submit(move |ctx| {
            ctx.find_by_template_node_edge_link_with_relation(
                &fixed,
                edge_type,
                link_type,
                content_type,
                &relation,
                relation_edge_type,
            )
        })
    }
}

impl<T: Transport + 'static> Drop for AsyncScContext<T> {
    fn drop(&mut self) {
        if self.sender.lock().is_some() {
            let _ = self.shutdown();
        }
    }
}

/// Run jobs until the channel is closed and drained.
fn worker_loop(receiver: &Receiver<Job>) {
    while let Ok(job) = receiver.recv() {
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::warn!("call panicked on worker thread");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
