//! Schema-guided data binding
//!
//! Reshapes arbitrary step payloads to a declared parameter skeleton:
//! parse the skeleton once ([`Skeleton::parse`]), then [`bind`] any payload
//! against it. See the submodules for matching and cast rules.

mod bind;
mod skeleton;

pub use bind::{bind, edit_distance};
pub use skeleton::{LeafType, Skeleton};
