//! Step Dispatch - the boundary between the executor and the outside world
//!
//! The executor is agnostic to how a step actually runs. Per knowledge-item
//! kind, a [`StepDispatch`] implementation performs the structured query,
//! HTTP call, tool call, or nested flow and returns a JSON array of
//! zero-or-more result objects.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::ast::{KnowledgeItem, KnowledgeKind};
use crate::context::ExecutionContext;
use crate::error::{Result, WeftError};
use crate::util::fold_key;

/// Executes one knowledge item of a particular kind.
///
/// By convention the returned value is a JSON array of result objects;
/// an empty array means "ran fine, found nothing".
#[async_trait]
pub trait StepDispatch: Send + Sync {
    async fn invoke(&self, item: &KnowledgeItem, ctx: &ExecutionContext) -> Result<Value>;
}

/// Kind-keyed dispatcher registry, shared across invocations.
#[derive(Default)]
pub struct DispatchRegistry {
    dispatchers: DashMap<KnowledgeKind, Arc<dyn StepDispatch>>,
}

impl DispatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: KnowledgeKind, dispatch: Arc<dyn StepDispatch>) {
        self.dispatchers.insert(kind, dispatch);
    }

    /// Resolve the dispatcher for a kind.
    pub fn get(&self, kind: KnowledgeKind) -> Result<Arc<dyn StepDispatch>> {
        self.dispatchers
            .get(&kind)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| WeftError::DispatchNotRegistered {
                kind: kind.to_string(),
            })
    }

    pub fn is_registered(&self, kind: KnowledgeKind) -> bool {
        self.dispatchers.contains_key(&kind)
    }
}

/// Named knowledge-item lookup, case-insensitive.
pub trait KnowledgeCatalog: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Arc<KnowledgeItem>>;
}

/// DashMap-backed catalog for in-process use and tests.
#[derive(Default)]
pub struct InMemoryCatalog {
    items: DashMap<String, Arc<KnowledgeItem>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item: KnowledgeItem) {
        self.items
            .insert(fold_key(&item.name).into_owned(), Arc::new(item));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl KnowledgeCatalog for InMemoryCatalog {
    fn lookup(&self, name: &str) -> Option<Arc<KnowledgeItem>> {
        self.items
            .get(fold_key(name).as_ref())
            .map(|entry| Arc::clone(entry.value()))
    }
}
