//! Execution Context - everything one flow invocation carries
//!
//! The context travels from the caller through the executor into every
//! dispatched step. Nested flows get a child context sharing the invocation
//! id and cancellation token but carrying their own knowledge item,
//! variables, and namespace.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::ast::KnowledgeItem;
use crate::namespace::Namespace;
use crate::util::INPUT_KEY;

/// Caller-supplied request metadata passed through to step dispatchers.
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    /// Forwarded HTTP-style headers (auth, tenancy, tracing)
    pub headers: FxHashMap<String, String>,
    /// Model override for this invocation; falls back to configuration
    pub model: Option<String>,
}

/// Per-invocation state shared by the executor and every step it runs.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Correlates all log lines and nested invocations of one request
    pub invocation_id: Uuid,
    /// The user's original question, verbatim
    pub query: String,
    /// Initiating payload, also seeded into the namespace under `input`
    pub variables: Value,
    /// The knowledge item being executed (for flows, its body is the
    /// serialized flow definition)
    pub knowledge: Arc<KnowledgeItem>,
    /// Shared step-key → value store for this invocation
    pub namespace: Namespace,
    /// Prior conversation turns, newest last, passed through to the model
    pub history: Vec<Value>,
    pub metadata: RequestMetadata,
    /// Cooperative cancellation, checked at stage boundaries
    pub cancellation: CancellationToken,
}

impl ExecutionContext {
    /// Root context for a fresh invocation. The namespace starts seeded
    /// with the variables under `input`.
    pub fn new(query: impl Into<String>, variables: Value, knowledge: Arc<KnowledgeItem>) -> Self {
        Self {
            invocation_id: Uuid::new_v4(),
            query: query.into(),
            namespace: Namespace::seeded(variables.clone()),
            variables,
            knowledge,
            history: Vec::new(),
            metadata: RequestMetadata::default(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: RequestMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_history(mut self, history: Vec<Value>) -> Self {
        self.history = history;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Child context for a nested flow or a dispatched step.
    ///
    /// Shares the invocation id, query, history, metadata, and a child
    /// cancellation token; gets a fresh namespace seeded with its own
    /// input under `input`.
    pub fn child(&self, knowledge: Arc<KnowledgeItem>, variables: Value) -> Self {
        Self {
            invocation_id: self.invocation_id,
            query: self.query.clone(),
            namespace: Namespace::seeded(variables.clone()),
            variables,
            knowledge,
            history: self.history.clone(),
            metadata: self.metadata.clone(),
            cancellation: self.cancellation.child_token(),
        }
    }

    /// The initiating payload as stored in the namespace.
    pub fn input(&self) -> Option<Arc<Value>> {
        self.namespace.get(INPUT_KEY)
    }
}
