//! Per-call request descriptor.
//!
//! # Responsibilities
//! - Capture everything known about one call (method, arguments, headers)
//! - Carry the call's cancellation token and deadline
//! - Generate the request ID used for tracing
//! - Track the call state machine
//!
//! # Design Decisions
//! - Created fresh for every call and owned by that call's traversal
//! - Arguments are encoded to JSON values eagerly, at the call site
//! - Clones (e.g. for a retry) share the same call state and token

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::contract::MethodDescriptor;

/// Named argument values supplied to a call.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<(&'static str, Value)>,
    encode_error: Option<String>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument, encoding it as JSON.
    ///
    /// Encoding failures are kept and reported when the call is dispatched.
    pub fn with<T: Serialize + ?Sized>(mut self, name: &'static str, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => self.values.push((name, value)),
            Err(e) => {
                if self.encode_error.is_none() {
                    self.encode_error = Some(format!("`{}`: {}", name, e));
                }
            }
        }
        self
    }

    /// Add an already-encoded argument.
    pub fn with_value(mut self, name: &'static str, value: Value) -> Self {
        self.values.push((name, value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.values.iter().map(|(n, v)| (*n, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn take_encode_error(&mut self) -> Option<String> {
        self.encode_error.take()
    }
}

/// Lifecycle of one call.
///
/// ```text
/// Created → Dispatched → Completed | Failed | Cancelled
/// ```
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Created = 0,
    Dispatched = 1,
    Completed = 2,
    Failed = 3,
    Cancelled = 4,
}

impl From<u8> for CallState {
    fn from(val: u8) -> Self {
        match val {
            1 => CallState::Dispatched,
            2 => CallState::Completed,
            3 => CallState::Failed,
            4 => CallState::Cancelled,
            _ => CallState::Created,
        }
    }
}

impl CallState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CallState::Completed | CallState::Failed | CallState::Cancelled)
    }
}

/// Shared, atomically updated call state.
#[derive(Debug, Default)]
pub struct CallCell {
    state: AtomicU8,
}

impl CallCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CallState {
        CallState::from(self.state.load(Ordering::Acquire))
    }

    /// `Created → Dispatched`. Returns false if the call already left `Created`.
    pub fn dispatch(&self) -> bool {
        self.state
            .compare_exchange(
                CallState::Created as u8,
                CallState::Dispatched as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Enter a terminal state. Only the first terminal transition wins.
    pub fn settle(&self, terminal: CallState) -> bool {
        debug_assert!(terminal.is_terminal());
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if CallState::from(current).is_terminal() {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                terminal as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(x) => current = x,
            }
        }
    }
}

/// Everything known about one in-flight call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    id: Uuid,
    contract: &'static str,
    contract_base: Option<&'static str>,
    method: Arc<MethodDescriptor>,
    arguments: Arguments,
    headers: HeaderMap,
    cancellation: CancellationToken,
    deadline: Option<Instant>,
    cell: Arc<CallCell>,
}

impl ApiRequest {
    pub fn new(contract: &'static str, method: Arc<MethodDescriptor>, arguments: Arguments) -> Self {
        Self {
            id: Uuid::new_v4(),
            contract,
            contract_base: None,
            method,
            arguments,
            headers: HeaderMap::new(),
            cancellation: CancellationToken::new(),
            deadline: None,
            cell: Arc::new(CallCell::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn contract(&self) -> &'static str {
        self.contract
    }

    /// Base address declared on the contract itself, if any.
    pub fn contract_base(&self) -> Option<&'static str> {
        self.contract_base
    }

    pub(crate) fn with_contract_base(mut self, base: Option<&'static str>) -> Self {
        self.contract_base = base;
        self
    }

    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    pub fn arguments_mut(&mut self) -> &mut Arguments {
        &mut self.arguments
    }

    /// Headers added by interceptors; argument headers are applied on top.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Set a header unless it is already present.
    pub fn set_default_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.entry(name).or_insert(value);
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Bound the call to `timeout` from now. Only ever tightens the deadline.
    pub fn set_timeout(&mut self, timeout: Duration) {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        });
    }

    pub fn state(&self) -> CallState {
        self.cell.state()
    }

    pub(crate) fn cell(&self) -> &Arc<CallCell> {
        &self.cell
    }

    /// True for verbs that can be repeated without side effects.
    pub fn is_idempotent(&self) -> bool {
        self.method.verb.is_idempotent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ReturnShape;
    use reqwest::Method;

    fn request() -> ApiRequest {
        let method = MethodDescriptor::new("home", Method::GET, "/", ReturnShape::Pending);
        ApiRequest::new("Api", Arc::new(method), Arguments::new())
    }

    #[test]
    fn arguments_encode_eagerly() {
        let args = Arguments::new().with("id", &42u64).with("name", "baidu");
        assert_eq!(args.get("id"), Some(&Value::from(42)));
        assert_eq!(args.get("name"), Some(&Value::from("baidu")));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn argument_encode_error_is_kept() {
        let mut map = std::collections::HashMap::new();
        map.insert((1, 2), "tuple keys are not JSON");
        let mut args = Arguments::new().with("map", &map);
        assert!(args.take_encode_error().is_some());
        assert!(args.take_encode_error().is_none());
    }

    #[test]
    fn state_machine_settles_once() {
        let req = request();
        assert_eq!(req.state(), CallState::Created);
        assert!(req.cell().dispatch());
        assert!(!req.cell().dispatch());
        assert!(req.cell().settle(CallState::Completed));
        assert!(!req.cell().settle(CallState::Failed));
        assert_eq!(req.state(), CallState::Completed);
    }

    #[test]
    fn clones_share_state_and_id() {
        let a = request();
        let b = a.clone();
        a.cell().dispatch();
        assert_eq!(b.state(), CallState::Dispatched);
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), request().id());
    }

    #[test]
    fn timeout_only_tightens() {
        let mut req = request();
        req.set_timeout(Duration::from_secs(1));
        let first = req.deadline().unwrap();
        req.set_timeout(Duration::from_secs(60));
        assert_eq!(req.deadline(), Some(first));
    }

    #[test]
    fn default_header_does_not_override() {
        let mut req = request();
        req.headers_mut().insert("accept", HeaderValue::from_static("text/html"));
        req.set_default_header(HeaderName::from_static("accept"), HeaderValue::from_static("*/*"));
        assert_eq!(req.headers()["accept"], "text/html");
    }
}
