//! Utilities: runtime constants and small shared helpers

mod constants;

pub use constants::*;

/// Lowercase a namespace / catalog key once at the boundary.
///
/// Returns a borrowed `&str` when the key is already lowercase, so the
/// common well-behaved case allocates nothing.
pub fn fold_key(key: &str) -> std::borrow::Cow<'_, str> {
    if key.chars().all(|c| !c.is_uppercase()) {
        std::borrow::Cow::Borrowed(key)
    } else {
        std::borrow::Cow::Owned(key.to_lowercase())
    }
}

/// Install the default tracing subscriber for host binaries and tests.
///
/// Filter comes from `RUST_LOG` (default `weft=info`). Safe to call more
/// than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("weft=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
