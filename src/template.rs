//! Template Resolution - `{{$path}}` and `{{$cond?then:else}}` substitution
//!
//! Single-pass resolution with Cow<str> for zero-alloc when no placeholders.
//! Substituted text is never re-scanned.
//!
//! Every resolved value is tagged with the `JSON:` prefix; a missing or
//! empty resolution becomes the `{NO_DATA_FOUND}` sentinel. Both tokens
//! are inspected by substring search downstream, so they must survive
//! verbatim through prompt construction.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::namespace::Namespace;
use crate::util::{JSON_VALUE_PREFIX, NO_DATA_SENTINEL};

/// Pre-compiled regex for {{$expression}} placeholders
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\$([^{}]+)\}\}").unwrap());

/// Check whether a text contains any `{{$...}}` placeholder.
///
/// Pure predicate supporting the pre-call short-circuit: a caller can skip
/// an expensive model call when a prompt still has unresolved data needs.
pub fn has_placeholders(text: &str) -> bool {
    PLACEHOLDER_RE.is_match(text)
}

/// Check whether a resolved text carries no real data at all: at least one
/// sentinel and no `JSON:`-tagged value.
pub fn is_all_no_data(text: &str) -> bool {
    text.contains(NO_DATA_SENTINEL) && !text.contains(JSON_VALUE_PREFIX)
}

/// Resolve all `{{$expr}}` placeholders against the namespace.
///
/// Returns Cow::Borrowed when no placeholders (zero allocation). Resolution
/// is left-to-right and single-pass; replacement text is not re-scanned.
///
/// Example: `{{$flights.cheapest.price}}` → `JSON:89`
/// Example: `{{$nickname?nickname:fullname}}` → the fallback path's value
pub fn resolve<'a>(template: &'a str, namespace: &Namespace) -> Cow<'a, str> {
    if !template.contains("{{$") {
        return Cow::Borrowed(template);
    }

    let mut result = String::with_capacity(template.len() + 64);
    let mut last_end = 0;

    for cap in PLACEHOLDER_RE.captures_iter(template) {
        let m = cap.get(0).expect("capture 0 always present");
        let expr = cap[1].trim();

        result.push_str(&template[last_end..m.start()]);
        result.push_str(&resolve_expr(expr, namespace));

        last_end = m.end();
    }

    result.push_str(&template[last_end..]);
    Cow::Owned(result)
}

/// Resolve one expression: a dotted path or a ternary conditional.
fn resolve_expr(expr: &str, namespace: &Namespace) -> String {
    // Ternary: split on first '?' and first ':' into exactly three parts
    if let Some((cond, branches)) = expr.split_once('?') {
        if let Some((then_path, else_path)) = branches.split_once(':') {
            let picked = if has_value(cond.trim(), namespace) {
                then_path.trim()
            } else {
                else_path.trim()
            };
            return render_path(picked, namespace);
        }
    }

    render_path(expr, namespace)
}

/// Whether a condition path resolves to a present, non-null, non-empty value.
fn has_value(path: &str, namespace: &Namespace) -> bool {
    match namespace.resolve_path(path) {
        Some(Value::Null) | None => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Render a path's value with the `JSON:` tag, or the absence sentinel.
fn render_path(path: &str, namespace: &Namespace) -> String {
    match namespace.resolve_path(path) {
        Some(Value::Null) | None => NO_DATA_SENTINEL.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => NO_DATA_SENTINEL.to_string(),
        Some(Value::String(s)) => format!("{JSON_VALUE_PREFIX}{s}"),
        Some(other) => format!("{JSON_VALUE_PREFIX}{other}"),
    }
}
