//! Domain model: knowledge items and flow definitions
//!
//! JSON wire form → Rust types. Nothing here executes anything; the
//! runtime module interprets these structures.

mod flow;
mod knowledge;

pub use flow::{FlowDefinition, FlowItem, StageItems};
pub use knowledge::{KnowledgeItem, KnowledgeKind};
