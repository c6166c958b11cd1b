//! # Loopback Engine
//!
//! In-process transport that answers requests from an in-memory element
//! store. It speaks the same JSON protocol as a real engine, so contexts
//! built on it exercise the full encode/send/decode path.
//!
//! Behaviour follows the engine where it matters to clients:
//!
//! - Construction is all-or-nothing; `ref` endpoints resolve to elements
//!   created earlier in the same request.
//! - Deleting an element also deletes every edge incident to it.
//! - Template search matches triples in order with alias bindings.
//!
//! A [`LoopbackHandle`] shares the store and lets tests inspect it or
//! inject failures.

use crate::reference::EndpointDescriptor;
use crate::request::{ConstructionEntry, ContentEntry, RequestKind, Response};
use crate::template::{OperandKind, OperandValue, TemplateEntry, TemplateOperand, TemplateResult};
use crate::transport::{Transport, TransportError};
use crate::types::sc_type::code_matches;
use crate::types::{ContentType, LinkContent, ScAddr};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug, Clone)]
enum Stored {
    Node(u16),
    Link(u16, LinkContent),
    Edge { code: u16, src: u64, trg: u64 },
}

impl Stored {
    const fn code(&self) -> u16 {
        match self {
            Self::Node(code) | Self::Link(code, _) | Self::Edge { code, .. } => *code,
        }
    }

    fn content_type(&self) -> Option<ContentType> {
        match self {
            Self::Link(_, content) => Some(content.content_type()),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct EngineState {
    next_addr: u64,
    elements: BTreeMap<u64, Stored>,
    round_trips: usize,
    closes: usize,
    last_request: Option<String>,
    reject_next: Option<String>,
    fail_next: bool,
    scripted: Option<String>,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            next_addr: 1,
            elements: BTreeMap::new(),
            round_trips: 0,
            closes: 0,
            last_request: None,
            reject_next: None,
            fail_next: false,
            scripted: None,
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    id: u64,
    #[serde(rename = "type")]
    kind: RequestKind,
    payload: Value,
}

type Answer = Result<Value, String>;

impl EngineState {
    fn answer(&mut self, text: &str) -> String {
        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(e) => e,
            Err(e) => return failure(0, &format!("unparseable request: {e}")),
        };
        if let Some(message) = self.reject_next.take() {
            return failure(envelope.id, &message);
        }
        let answer = match envelope.kind {
            RequestKind::Construction => decode(envelope.payload).and_then(|e| self.create(e)),
            RequestKind::Deletion => {
                decode::<Vec<ScAddr>>(envelope.payload).and_then(|e| self.delete(&e))
            }
            RequestKind::Content => decode(envelope.payload).and_then(|e| self.content(e)),
            RequestKind::Search => {
                decode::<Vec<TemplateEntry>>(envelope.payload).map(|e| self.search(&e))
            }
        };
        match answer {
            Ok(payload) => success(envelope.id, payload),
            Err(message) => failure(envelope.id, &message),
        }
    }

    fn create(&mut self, entries: Vec<ConstructionEntry>) -> Answer {
        let base = self.next_addr;
        let mut created: Vec<(u64, Stored)> = Vec::with_capacity(entries.len());
        for (position, entry) in entries.into_iter().enumerate() {
            let stored = match entry {
                ConstructionEntry::Node { node_type } => Stored::Node(node_type.code()),
                ConstructionEntry::Link {
                    link_type,
                    content,
                    content_type,
                } => {
                    let content = content
                        .coerce(content_type)
                        .ok_or_else(|| format!("entry {position}: content is not {content_type}"))?;
                    Stored::Link(link_type.code(), content)
                }
                ConstructionEntry::Edge { edge_type, src, trg } => Stored::Edge {
                    code: edge_type.code(),
                    src: self.endpoint(src, position, &created)?,
                    trg: self.endpoint(trg, position, &created)?,
                },
            };
            created.push((base + position as u64, stored));
        }
        let addrs: Vec<u64> = created.iter().map(|(addr, _)| *addr).collect();
        self.next_addr = base + addrs.len() as u64;
        self.elements.extend(created);
        Ok(json!(addrs))
    }

    fn endpoint(
        &self,
        descriptor: EndpointDescriptor,
        position: usize,
        created: &[(u64, Stored)],
    ) -> Result<u64, String> {
        match descriptor {
            EndpointDescriptor::Addr(addr) if self.elements.contains_key(&addr.value()) => {
                Ok(addr.value())
            }
            EndpointDescriptor::Addr(addr) => {
                Err(format!("entry {position}: no element at {addr}"))
            }
            EndpointDescriptor::Ref(ordinal) if ordinal < position => created
                .get(ordinal)
                .map(|(addr, _)| *addr)
                .ok_or_else(|| format!("entry {position}: bad ref {ordinal}")),
            EndpointDescriptor::Ref(ordinal) => {
                Err(format!("entry {position}: forward ref {ordinal}"))
            }
        }
    }

    fn delete(&mut self, addrs: &[ScAddr]) -> Answer {
        if let Some(missing) = addrs
            .iter()
            .find(|a| !self.elements.contains_key(&a.value()))
        {
            return Err(format!("no element at {missing}"));
        }
        let mut doomed: Vec<u64> = addrs.iter().map(|a| a.value()).collect();
        while let Some(addr) = doomed.pop() {
            if self.elements.remove(&addr).is_none() {
                continue;
            }
            doomed.extend(self.elements.iter().filter_map(|(a, s)| match s {
                Stored::Edge { src, trg, .. } if *src == addr || *trg == addr => Some(*a),
                _ => None,
            }));
        }
        Ok(Value::Null)
    }

    fn content(&mut self, entries: Vec<ContentEntry>) -> Answer {
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                ContentEntry::Get { addr } => match self.elements.get(&addr.value()) {
                    Some(Stored::Link(_, content)) => out.push(json!({
                        "type": content.content_type(),
                        "value": content,
                    })),
                    _ => return Err(format!("no link at {addr}")),
                },
                ContentEntry::Set {
                    addr,
                    content_type,
                    data,
                } => {
                    let updated = match self.elements.get_mut(&addr.value()) {
                        Some(Stored::Link(_, current)) if current.content_type() == content_type => {
                            match data.coerce(content_type) {
                                Some(value) => {
                                    *current = value;
                                    true
                                }
                                None => false,
                            }
                        }
                        _ => false,
                    };
                    out.push(json!(updated));
                }
            }
        }
        Ok(Value::Array(out))
    }

    fn search(&self, templates: &[TemplateEntry]) -> Value {
        let results: Vec<TemplateResult> = templates
            .iter()
            .map(|triples| {
                let mut rows = Vec::new();
                self.match_from(triples, &mut HashMap::new(), &mut Vec::new(), &mut rows);
                let mut aliases = BTreeMap::new();
                for (column, operand) in triples.iter().flatten().enumerate() {
                    if let Some(alias) = &operand.alias {
                        aliases.entry(alias.clone()).or_insert(column);
                    }
                }
                TemplateResult {
                    addrs: rows,
                    aliases,
                }
            })
            .collect();
        json!(results)
    }

    fn match_from(
        &self,
        triples: &[[TemplateOperand; 3]],
        bindings: &mut HashMap<String, u64>,
        row: &mut Vec<ScAddr>,
        rows: &mut Vec<Vec<ScAddr>>,
    ) {
        let Some((triple, rest)) = triples.split_first() else {
            rows.push(row.clone());
            return;
        };
        for (addr, stored) in &self.elements {
            let Stored::Edge { src, trg, .. } = stored else {
                continue;
            };
            let candidate = [*src, *addr, *trg];
            let mut bound = Vec::new();
            let ok = triple
                .iter()
                .zip(candidate)
                .all(|(operand, a)| self.operand_fits(operand, a, bindings, &mut bound));
            if ok {
                row.extend(candidate.map(ScAddr));
                self.match_from(rest, bindings, row, rows);
                row.truncate(row.len() - 3);
            }
            for alias in bound {
                bindings.remove(&alias);
            }
        }
    }

    fn operand_fits(
        &self,
        operand: &TemplateOperand,
        addr: u64,
        bindings: &mut HashMap<String, u64>,
        bound: &mut Vec<String>,
    ) -> bool {
        let fits = match (&operand.kind, &operand.value) {
            (OperandKind::Addr, OperandValue::Number(n)) => *n == addr,
            (OperandKind::Type, OperandValue::Number(code)) => {
                self.elements.get(&addr).is_some_and(|s| {
                    u16::try_from(*code).is_ok_and(|c| code_matches(c, s.code()))
                        && operand
                            .content_type
                            .is_none_or(|ct| s.content_type() == Some(ct))
                })
            }
            (OperandKind::Alias, OperandValue::Name(name)) => bindings.get(name) == Some(&addr),
            _ => false,
        };
        if !fits {
            return false;
        }
        if let Some(alias) = &operand.alias {
            match bindings.get(alias) {
                Some(existing) => return *existing == addr,
                None => {
                    bindings.insert(alias.clone(), addr);
                    bound.push(alias.clone());
                }
            }
        }
        true
    }
}

fn decode<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, String> {
    serde_json::from_value(payload).map_err(|e| format!("bad payload: {e}"))
}

fn success(id: u64, payload: Value) -> String {
    encode(Response {
        id,
        status: true,
        payload,
        errors: None,
    })
}

fn failure(id: u64, message: &str) -> String {
    encode(Response {
        id,
        status: false,
        payload: Value::Null,
        errors: Some(Value::String(message.to_string())),
    })
}

fn encode(response: Response) -> String {
    serde_json::to_string(&response).unwrap_or_default()
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Transport backed by an in-memory engine.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    state: Arc<Mutex<EngineState>>,
    connected: bool,
}

impl LoopbackTransport {
    /// A transport over an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle sharing this transport's store.
    #[must_use]
    pub fn handle(&self) -> LoopbackHandle {
        LoopbackHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Transport for LoopbackTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        Ok(())
    }

    fn round_trip(&mut self, request: &str) -> Result<String, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        let mut state = self.state.lock();
        state.round_trips += 1;
        state.last_request = Some(request.to_string());
        if std::mem::take(&mut state.fail_next) {
            return Err(TransportError::Io("injected failure".to_string()));
        }
        if let Some(reply) = state.scripted.take() {
            return Ok(reply);
        }
        Ok(state.answer(request))
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.connected = false;
        self.state.lock().closes += 1;
        Ok(())
    }
}

/// Inspection and fault injection for a [`LoopbackTransport`].
#[derive(Debug, Clone)]
pub struct LoopbackHandle {
    state: Arc<Mutex<EngineState>>,
}

impl LoopbackHandle {
    /// Requests received so far, including failed ones.
    #[must_use]
    pub fn round_trips(&self) -> usize {
        self.state.lock().round_trips
    }

    /// Successful transport closes so far.
    #[must_use]
    pub fn closes(&self) -> usize {
        self.state.lock().closes
    }

    /// Elements currently stored.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.state.lock().elements.len()
    }

    #[must_use]
    pub fn contains(&self, addr: ScAddr) -> bool {
        self.state.lock().elements.contains_key(&addr.value())
    }

    /// Raw text of the most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<String> {
        self.state.lock().last_request.clone()
    }

    /// Answer the next request with `status: false` and this message.
    pub fn reject_next(&self, message: impl Into<String>) {
        self.state.lock().reject_next = Some(message.into());
    }

    /// Fail the next round trip at the transport level.
    pub fn fail_next(&self) {
        self.state.lock().fail_next = true;
    }

    /// Answer the next request with this exact text.
    pub fn script_next(&self, reply: impl Into<String>) {
        self.state.lock().scripted = Some(reply.into());
    }
}

// =============================================================================
// TESTS
// =============================================================================
