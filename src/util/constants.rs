//! Centralized constants for the Weft runtime
//!
//! Sentinel tokens and timeout values in one place for easy tuning.
//! The sentinel strings cross the prompt/namespace boundary and are
//! inspected by substring search downstream: change them and every
//! flow author's prompts break.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════
// Sentinel Tokens
// ═══════════════════════════════════════════════════════════════

/// Marker substituted for a placeholder whose path resolved to nothing.
///
/// Distinguishable from real data so prompt-construction logic can
/// short-circuit before an expensive model call.
pub const NO_DATA_SENTINEL: &str = "{NO_DATA_FOUND}";

/// Prefix tagged onto every successfully resolved placeholder value.
pub const JSON_VALUE_PREFIX: &str = "JSON:";

/// Placeholder value stored for an optional step that produced nothing.
pub const NO_DATA_PLACEHOLDER: &str = "No data found";

/// Fixed reply when both final prompts resolve to no data at all.
pub const UNABLE_TO_PROCESS: &str =
    "Unable to process your request with the available data.";

/// Key under which a non-JSON model response is wrapped.
pub const TEXT_OUTPUT_KEY: &str = "TextOutput";

/// Namespace key seeded with the initiating variables of every flow.
pub const INPUT_KEY: &str = "input";

// ═══════════════════════════════════════════════════════════════
// Execution Timeouts
// ═══════════════════════════════════════════════════════════════

/// Timeout for a single language-model call
pub const MODEL_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for establishing HTTP connections
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ═══════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_distinguishable() {
        // Downstream code tells them apart by substring search
        assert!(!NO_DATA_SENTINEL.contains(JSON_VALUE_PREFIX));
        assert!(!NO_DATA_PLACEHOLDER.contains(NO_DATA_SENTINEL));
    }

    #[test]
    fn model_timeout_exceeds_connect_timeout() {
        assert!(MODEL_TIMEOUT > CONNECT_TIMEOUT);
    }
}
