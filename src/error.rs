//! Weft Error Types with Error Codes
//!
//! Error code ranges:
//! - WEFT-000-009: Flow definition / configuration errors
//! - WEFT-010-019: Data availability errors
//! - WEFT-020-029: External call errors (step dispatch, language model)
//! - WEFT-030-039: Provider / config errors
//! - WEFT-040-049: Binding / template errors
//! - WEFT-050-059: Execution errors
//! - WEFT-090-099: IO / JSON passthrough

use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WeftError>;

/// All error variants are part of the public API.
///
/// Implements both `thiserror::Error` for std error compatibility
/// and `miette::Diagnostic` for fancy terminal error display.
#[derive(Error, Debug, Diagnostic)]
pub enum WeftError {
    // ═══════════════════════════════════════════
    // CONFIGURATION ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[WEFT-001] Failed to parse flow definition: {details}")]
    #[diagnostic(
        code(weft::flow_parse),
        help("Check the Flow array and prompt fields against the wire format")
    )]
    FlowParse { details: String },

    #[error("[WEFT-002] Knowledge item '{name}' not found (strict flow item '{key}')")]
    #[diagnostic(
        code(weft::knowledge_not_found),
        help("Register the knowledge item in the catalog or drop the Strict flag")
    )]
    KnowledgeNotFound { name: String, key: String },

    #[error("[WEFT-003] No dispatcher registered for knowledge kind '{kind}'")]
    #[diagnostic(
        code(weft::dispatch_not_registered),
        help("Register a StepDispatch for this kind before executing flows")
    )]
    DispatchNotRegistered { kind: String },

    // ═══════════════════════════════════════════
    // DATA AVAILABILITY (010-019)
    // ═══════════════════════════════════════════
    #[error("[WEFT-010] Required flow item '{key}' produced no data")]
    #[diagnostic(
        code(weft::required_data_missing),
        help("Check the upstream step feeding this item, or mark it not required")
    )]
    RequiredDataMissing { key: String },

    // ═══════════════════════════════════════════
    // EXTERNAL CALLS (020-029)
    // ═══════════════════════════════════════════
    #[error("[WEFT-020] Step dispatch failed for '{name}': {reason}")]
    DispatchFailed { name: String, reason: String },

    #[error("[WEFT-021] Language model call failed: {reason}")]
    ModelCallFailed { reason: String },

    // ═══════════════════════════════════════════
    // PROVIDER / CONFIG (030-039)
    // ═══════════════════════════════════════════
    #[error("[WEFT-030] Provider '{provider}' not configured")]
    ProviderNotConfigured { provider: String },

    #[error("[WEFT-031] Provider API error: {message}")]
    ProviderApiError { message: String },

    #[error("[WEFT-032] Missing API key for provider '{provider}'")]
    #[diagnostic(
        code(weft::missing_api_key),
        help("Set the API key env var or add it to the weft config file")
    )]
    MissingApiKey { provider: String },

    #[error("[WEFT-033] Config error: {reason}")]
    ConfigError { reason: String },

    // ═══════════════════════════════════════════
    // BINDING / TEMPLATE (040-049)
    // ═══════════════════════════════════════════
    #[error("[WEFT-040] Invalid typed skeleton: {reason}")]
    InvalidSkeleton { reason: String },

    #[error("[WEFT-041] Template error in '{template}': {reason}")]
    TemplateError { template: String, reason: String },

    // ═══════════════════════════════════════════
    // EXECUTION (050-059)
    // ═══════════════════════════════════════════
    #[error("[WEFT-050] Execution error: {0}")]
    Execution(String),

    #[error("[WEFT-051] Flow cancelled before stage {order}")]
    Cancelled { order: i64 },

    // ═══════════════════════════════════════════
    // IO / JSON PASSTHROUGH (090-099)
    // ═══════════════════════════════════════════
    #[error("[WEFT-093] IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("[WEFT-094] JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl WeftError {
    /// Get the error code (e.g., "WEFT-001")
    pub fn code(&self) -> &'static str {
        match self {
            Self::FlowParse { .. } => "WEFT-001",
            Self::KnowledgeNotFound { .. } => "WEFT-002",
            Self::DispatchNotRegistered { .. } => "WEFT-003",
            Self::RequiredDataMissing { .. } => "WEFT-010",
            Self::DispatchFailed { .. } => "WEFT-020",
            Self::ModelCallFailed { .. } => "WEFT-021",
            Self::ProviderNotConfigured { .. } => "WEFT-030",
            Self::ProviderApiError { .. } => "WEFT-031",
            Self::MissingApiKey { .. } => "WEFT-032",
            Self::ConfigError { .. } => "WEFT-033",
            Self::InvalidSkeleton { .. } => "WEFT-040",
            Self::TemplateError { .. } => "WEFT-041",
            Self::Execution(_) => "WEFT-050",
            Self::Cancelled { .. } => "WEFT-051",
            Self::IoError(_) => "WEFT-093",
            Self::JsonError(_) => "WEFT-094",
        }
    }

    /// Check if error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DispatchFailed { .. }
                | Self::ModelCallFailed { .. }
                | Self::ProviderApiError { .. }
        )
    }

    /// Whether this error aborts the whole flow.
    ///
    /// External-call failures are embedded into result payloads instead of
    /// propagating; only configuration and required-data errors are fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::DispatchFailed { .. } | Self::ModelCallFailed { .. }
        )
    }
}
