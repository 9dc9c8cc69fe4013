//! Weft - flow orchestration and data binding for request answering
//!
//! A flow is a declarative list of steps (knowledge items) with execution
//! orders, a shared namespace of step results, and optional synthesis
//! prompts. Weft parses the flow, runs its stages (parallel within a
//! stage, barriers between stages), binds step inputs to declared
//! parameter shapes, and turns the collected data into an answer.
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DOMAIN MODEL                          │
//! │  ast/        JSON → Rust types (FlowDefinition, FlowItem,    │
//! │              KnowledgeItem, KnowledgeKind)                   │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      APPLICATION LAYER                       │
//! │  runtime/    Staged flow execution (FlowExecutor)            │
//! │  binding/    Schema-guided binding (Skeleton, bind)          │
//! │  template    Placeholder resolution ({{$path}}, ternaries)   │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    INFRASTRUCTURE LAYER                      │
//! │  namespace   Step-key → value storage (DashMap)              │
//! │  dispatch/   Step execution boundary (StepDispatch)          │
//! │  provider/   Language-model abstraction (LanguageModel)      │
//! │  util/       Sentinels, timeouts, key folding                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`ast`] | Wire-format parsing → `FlowDefinition`, `KnowledgeItem` |
//! | [`runtime`] | Stage-ordered execution with tokio concurrency |
//! | [`binding`] | Typed-skeleton parsing and fuzzy field binding |
//! | [`template`] | `{{$expr}}` resolution against the namespace |
//! | [`namespace`] | Case-insensitive concurrent result storage |
//! | [`dispatch`] | Kind-keyed step dispatchers and knowledge catalog |
//! | [`provider`] | Model providers (OpenAI, mock) behind one trait |
//! | [`context`] | Per-invocation state and cancellation |
//! | [`config`] | TOML config with env overrides |
//! | [`error`] | Error types with stable codes |

// ═══════════════════════════════════════════════════════════════
// DOMAIN MODEL - wire formats → Rust types
// ═══════════════════════════════════════════════════════════════
pub mod ast;

// ═══════════════════════════════════════════════════════════════
// APPLICATION LAYER - execution logic
// ═══════════════════════════════════════════════════════════════
pub mod binding;
pub mod runtime;
pub mod template;

// ═══════════════════════════════════════════════════════════════
// INFRASTRUCTURE LAYER - storage, dispatch, providers
// ═══════════════════════════════════════════════════════════════
pub mod context;
pub mod dispatch;
pub mod namespace;
pub mod provider;
pub mod util;

// ═══════════════════════════════════════════════════════════════
// CROSS-CUTTING - error handling, configuration
// ═══════════════════════════════════════════════════════════════
pub mod config;
pub mod error;

// ═══════════════════════════════════════════════════════════════
// PUBLIC API RE-EXPORTS
// ═══════════════════════════════════════════════════════════════

// Error types
pub use error::{Result, WeftError};

// Config types
pub use config::WeftConfig;

// Domain model
pub use ast::{FlowDefinition, FlowItem, KnowledgeItem, KnowledgeKind};

// Application layer
pub use binding::{bind, Skeleton};
pub use runtime::FlowExecutor;
pub use template::{has_placeholders, resolve};

// Infrastructure
pub use context::{ExecutionContext, RequestMetadata};
pub use dispatch::{DispatchRegistry, InMemoryCatalog, KnowledgeCatalog, StepDispatch};
pub use namespace::Namespace;
pub use provider::{ChatPrompt, LanguageModel, MockModel, ModelFactory, OpenAiModel};
