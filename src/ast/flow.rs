//! Flow Definition - declarative description of a composite flow
//!
//! Parsed from the JSON body of a `flow`-kind knowledge item:
//!
//! ```json
//! {
//!   "Flow": [
//!     {"Name": "get_flights", "Key": "flights", "Order": 0, "Required": true},
//!     {"Name": "get_hotels", "Key": "hotels", "Source": "input", "Order": 1}
//!   ],
//!   "SystemPrompt": "You are a travel assistant. Flights: {{$flights}}",
//!   "UserPrompt": "{{$input.question}}",
//!   "Result": null
//! }
//! ```
//!
//! Items sharing an `Order` value form a stage; stages run in ascending
//! order with a barrier between them. Order 0 is always sequential.

use std::collections::BTreeMap;

use serde::Deserialize;
use smallvec::SmallVec;

use crate::error::WeftError;

/// One step of a flow: which knowledge item to run, where its input comes
/// from, and where its result lands in the namespace.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowItem {
    /// Knowledge-item name, resolved case-insensitively by the catalog
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    /// Namespace key for this item's result
    #[serde(rename = "Key", alias = "key")]
    pub key: String,
    /// Namespace entry fed in as input; absent entry skips the item
    #[serde(default, rename = "Source", alias = "source")]
    pub source: Option<String>,
    /// Execution-order integer; ties run concurrently, 0 is sequential
    #[serde(default, rename = "Order", alias = "order")]
    pub order: i64,
    /// Iterable flag: each input element is a separate invocation
    #[serde(default, rename = "IsArray", alias = "is_array")]
    pub is_array: bool,
    /// Aggregation key: per-element results keyed by this field's value
    #[serde(default, rename = "LoopKey", alias = "loop_key")]
    pub loop_key: Option<String>,
    /// Missing result after execution is fatal vs. a soft placeholder
    #[serde(default, rename = "Required", alias = "required")]
    pub required: bool,
    /// When set, an unresolvable knowledge-item name is an error instead of
    /// a silent skip
    #[serde(default, rename = "Strict", alias = "strict")]
    pub strict: bool,
    /// Post-processing system prompt, evaluated against the namespace right
    /// after the raw result is stored
    #[serde(default, rename = "SystemPrompt", alias = "system_prompt")]
    pub system_prompt: Option<String>,
    /// Post-processing user prompt
    #[serde(default, rename = "UserPrompt", alias = "user_prompt")]
    pub user_prompt: Option<String>,
}

impl FlowItem {
    /// Whether this item carries a post-processing prompt.
    pub fn has_post_prompt(&self) -> bool {
        self.system_prompt.is_some() || self.user_prompt.is_some()
    }

    /// The post-processing prompt text (system wins when both are set).
    pub fn post_prompt(&self) -> Option<&str> {
        self.system_prompt
            .as_deref()
            .or(self.user_prompt.as_deref())
    }
}

/// Stack-allocated stage: most stages hold 1-4 items
pub type StageItems<'a> = SmallVec<[&'a FlowItem; 4]>;

/// Declarative flow: ordered/parallel steps plus optional final prompts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowDefinition {
    /// The steps, in declaration order
    #[serde(default, rename = "Flow", alias = "flow")]
    pub items: Vec<FlowItem>,
    /// Final synthesis system prompt
    #[serde(default, rename = "SystemPrompt", alias = "system_prompt")]
    pub system_prompt: Option<String>,
    /// Final synthesis user prompt
    #[serde(default, rename = "UserPrompt", alias = "user_prompt")]
    pub user_prompt: Option<String>,
    /// Card prompt, preferred over the user prompt when present
    #[serde(default, rename = "AdaptiveCardPrompt", alias = "adaptive_card_prompt")]
    pub card_prompt: Option<String>,
    /// Namespace entry to return verbatim instead of calling the model
    #[serde(default, rename = "Result", alias = "result")]
    pub final_key: Option<String>,
}

impl FlowDefinition {
    /// Parse a serialized flow definition (the body of a `flow` knowledge item).
    pub fn parse(body: &str) -> Result<Self, WeftError> {
        serde_json::from_str(body).map_err(|e| WeftError::FlowParse {
            details: e.to_string(),
        })
    }

    /// Partition items into stages by execution order, ascending.
    ///
    /// Declaration order is preserved within each stage; that is the
    /// execution order for sequential stages.
    pub fn stages(&self) -> BTreeMap<i64, StageItems<'_>> {
        let mut stages: BTreeMap<i64, StageItems<'_>> = BTreeMap::new();
        for item in &self.items {
            stages.entry(item.order).or_default().push(item);
        }
        stages
    }
}
