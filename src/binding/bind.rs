//! Schema-guided binding - reshape an arbitrary payload to a typed skeleton
//!
//! Field names are matched by minimum case-insensitive edit distance, so a
//! payload's `departureCity` satisfies a skeleton's `departure_city` without
//! an explicit mapping table. Casts that fail degrade to null; binding never
//! errors.

use serde_json::{Map, Number, Value};

use super::skeleton::{LeafType, Skeleton};

/// Bind a payload to a typed skeleton.
///
/// The result has the skeleton's structural shape; every typed leaf holds
/// the best-matching payload field cast to the declared type, or null.
pub fn bind(skeleton: &Skeleton, payload: &Value) -> Value {
    bind_node(skeleton, payload, None)
}

fn bind_node(skeleton: &Skeleton, payload: &Value, enclosing: Option<&str>) -> Value {
    match skeleton {
        Skeleton::Literal(value) => value.clone(),
        Skeleton::Typed { name, ty } => match_and_cast(name, payload, *ty),
        Skeleton::TypedArray { ty } => {
            let name = enclosing.unwrap_or_default();
            match payload {
                Value::Array(elements) => Value::Array(
                    elements
                        .iter()
                        .map(|element| match_and_cast(name, element, *ty))
                        .collect(),
                ),
                Value::Object(_) => Value::Array(vec![match_and_cast(name, payload, *ty)]),
                _ => Value::Array(Vec::new()),
            }
        }
        Skeleton::Object(entries) => {
            let mut out = Map::new();
            for (key, child) in entries {
                let scoped = descend(payload, key);
                out.insert(key.clone(), bind_node(child, scoped, Some(key)));
            }
            Value::Object(out)
        }
        Skeleton::Array(items) => match (items.as_slice(), payload) {
            // One template element, array payload: one bound value per element
            ([template], Value::Array(elements)) => Value::Array(
                elements
                    .iter()
                    .map(|element| bind_node(template, element, enclosing))
                    .collect(),
            ),
            _ => Value::Array(
                items
                    .iter()
                    .map(|item| bind_node(item, payload, enclosing))
                    .collect(),
            ),
        },
    }
}

/// Step into a payload field that exactly matches the skeleton key
/// (case-insensitively). Without a match the payload passes through
/// unchanged, leaving the fuzzy leaf match to do its work.
fn descend<'a>(payload: &'a Value, key: &str) -> &'a Value {
    if let Value::Object(map) = payload {
        for (field, value) in map {
            if field.eq_ignore_ascii_case(key) {
                return value;
            }
        }
    }
    payload
}

/// Find the payload field nearest to `name` and cast it.
fn match_and_cast(name: &str, payload: &Value, ty: LeafType) -> Value {
    let fields = flatten(payload);
    let mut best: Option<(&Value, usize)> = None;
    for (field, value) in &fields {
        let distance = edit_distance(name, field);
        // Strict less-than keeps the first-found field on ties
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((*value, distance));
        }
    }
    match best {
        Some((value, _)) => cast(value, ty),
        None => Value::Null,
    }
}

/// Flatten a payload into an ordered field list. An array of objects is
/// merged, later elements overwriting earlier fields on collision.
fn flatten(payload: &Value) -> Vec<(String, &Value)> {
    let mut fields: Vec<(String, &Value)> = Vec::new();
    match payload {
        Value::Object(map) => {
            for (key, value) in map {
                fields.push((key.clone(), value));
            }
        }
        Value::Array(elements) => {
            for element in elements {
                if let Value::Object(map) = element {
                    for (key, value) in map {
                        if let Some(slot) = fields.iter_mut().find(|(k, _)| k == key) {
                            slot.1 = value;
                        } else {
                            fields.push((key.clone(), value));
                        }
                    }
                }
            }
        }
        _ => {}
    }
    fields
}

/// Cast a matched value to the declared leaf type; failures yield null.
fn cast(value: &Value, ty: LeafType) -> Value {
    match ty {
        LeafType::String => match value {
            Value::String(s) => Value::String(s.trim().to_string()),
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            _ => Value::Null,
        },
        LeafType::Number => match value {
            Value::Number(n) => Value::Number(n.clone()),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|n| Value::Number(Number::from(n)))
                .unwrap_or(Value::Null),
            _ => Value::Null,
        },
        LeafType::Boolean => match value {
            Value::Bool(b) => Value::Bool(*b),
            Value::String(s) => s
                .trim()
                .parse::<bool>()
                .map(Value::Bool)
                .unwrap_or(Value::Null),
            _ => Value::Null,
        },
    }
}

/// Case-insensitive Levenshtein distance.
///
/// Full dynamic-programming matrix; skeleton field names and payload keys
/// are short, so the quadratic cost is irrelevant.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        matrix[0][j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[a.len()][b.len()]
}
