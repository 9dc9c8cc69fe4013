//! Knowledge Items - named, typed units of work
//!
//! A knowledge item describes how to answer part of a query: a structured
//! query, a remote call, a GraphQL/REST request, a plugin tool, or a
//! composite flow whose body is a serialized [`FlowDefinition`].
//!
//! [`FlowDefinition`]: super::flow::FlowDefinition

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type tag of a knowledge item; selects the dispatcher that executes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeKind {
    /// Structured query against a data store (SQL-like)
    StructuredQuery,
    /// Remote procedure call
    RemoteCall,
    /// GraphQL request
    Graphql,
    /// REST request
    Rest,
    /// Composite flow of other knowledge items
    Flow,
    /// Free-form plugin / tool call
    Plugin,
}

impl KnowledgeKind {
    /// Stable string tag, used for registry lookups and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StructuredQuery => "structured_query",
            Self::RemoteCall => "remote_call",
            Self::Graphql => "graphql",
            Self::Rest => "rest",
            Self::Flow => "flow",
            Self::Plugin => "plugin",
        }
    }
}

impl fmt::Display for KnowledgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed unit of work. Immutable once loaded.
///
/// Identity is the name, compared case-insensitively by the catalog.
/// The body's shape depends on the kind: query text, a serialized flow
/// definition, a tool descriptor, an endpoint description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeItem {
    /// Case-insensitive identity
    pub name: String,
    /// Type tag selecting the dispatcher
    pub kind: KnowledgeKind,
    /// Kind-dependent payload (query text, serialized flow, tool descriptor)
    pub body: String,
    /// Typed parameter skeleton for input coercion, when the step expects
    /// a particular shape (see the binding module)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params_template: Option<Value>,
    /// Result-card template rendered by the caller, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_template: Option<String>,
}

impl KnowledgeItem {
    pub fn new(name: impl Into<String>, kind: KnowledgeKind, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            body: body.into(),
            params_template: None,
            card_template: None,
        }
    }

    /// Attach a typed parameter skeleton (builder style).
    pub fn with_params_template(mut self, template: Value) -> Self {
        self.params_template = Some(template);
        self
    }
}
