//! Runtime: flow execution and model-output normalization

mod executor;
mod output;

pub use executor::FlowExecutor;
pub use output::{is_empty_result, parse_model_output, unwrap_single};
