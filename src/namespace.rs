//! Namespace - per-invocation step-key → JSON value storage
//!
//! Single DashMap design with lock-free concurrent access. Keys are folded
//! to lowercase at the boundary so lookups are case-insensitive. Entries
//! are written once per key in the common case; post-processing may replace
//! an entry in place.
//!
//! Cloning a `Namespace` is shallow: parallel stage items share the same
//! underlying map through their child contexts.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::util::{fold_key, INPUT_KEY};

/// Case-insensitive mapping from step key to resolved JSON value.
///
/// Uses `Arc<Value>` so large step results clone in O(1).
#[derive(Clone, Default)]
pub struct Namespace {
    entries: Arc<DashMap<String, Arc<Value>>>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a namespace seeded with the initiating variables under `input`.
    pub fn seeded(input: Value) -> Self {
        let ns = Self::new();
        ns.insert(INPUT_KEY, input);
        ns
    }

    /// Store a value under a key (folded to lowercase).
    pub fn insert(&self, key: &str, value: Value) {
        self.entries
            .insert(fold_key(key).into_owned(), Arc::new(value));
    }

    /// Look up a value case-insensitively.
    pub fn get(&self, key: &str) -> Option<Arc<Value>> {
        self.entries.get(fold_key(key).as_ref()).map(|e| Arc::clone(e.value()))
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(fold_key(key).as_ref())
    }

    /// Resolve a dotted path: first segment is a namespace key
    /// (case-insensitive), the rest walks JSON object fields.
    ///
    /// Missing at any step yields `None`.
    pub fn resolve_path(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let root = self.get(segments.next()?)?;

        let mut value: &Value = &root;
        for segment in segments {
            value = match value {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(value.clone())
    }

    /// Snapshot the whole namespace as one JSON object.
    ///
    /// Keys come out in sorted order so snapshots are stable for tests
    /// and logging.
    pub fn snapshot(&self) -> Value {
        let mut map = Map::new();
        let mut pairs: Vec<(String, Arc<Value>)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        pairs.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (key, value) in pairs {
            map.insert(key, (*value).clone());
        }
        Value::Object(map)
    }

    /// Number of entries (for logging).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_and_get_case_insensitive() {
        let ns = Namespace::new();
        ns.insert("FlightInfo", json!({"gate": "A12"}));

        assert!(ns.contains("flightinfo"));
        assert!(ns.contains("FLIGHTINFO"));
        assert_eq!(*ns.get("FlightInfo").unwrap(), json!({"gate": "A12"}));
    }

    #[test]
    fn seeded_contains_input() {
        let ns = Namespace::seeded(json!({"city": "Paris"}));
        assert_eq!(*ns.get("input").unwrap(), json!({"city": "Paris"}));
    }

    #[test]
    fn resolve_path_walks_fields() {
        let ns = Namespace::new();
        ns.insert("weather", json!({"data": {"temp": {"celsius": 25}}}));

        assert_eq!(ns.resolve_path("weather.data.temp.celsius"), Some(json!(25)));
        assert_eq!(ns.resolve_path("Weather.data"), Some(json!({"temp": {"celsius": 25}})));
        assert_eq!(ns.resolve_path("weather.missing"), None);
        assert_eq!(ns.resolve_path("unknown.field"), None);
    }

    #[test]
    fn resolve_path_array_index() {
        let ns = Namespace::new();
        ns.insert("items", json!([{"name": "first"}, {"name": "second"}]));
        assert_eq!(ns.resolve_path("items.1.name"), Some(json!("second")));
        assert_eq!(ns.resolve_path("items.9.name"), None);
    }

    #[test]
    fn resolve_path_on_primitive_is_none() {
        let ns = Namespace::new();
        ns.insert("price", json!(42));
        assert_eq!(ns.resolve_path("price.currency"), None);
        assert_eq!(ns.resolve_path("price"), Some(json!(42)));
    }

    #[test]
    fn replace_in_place() {
        let ns = Namespace::new();
        ns.insert("summary", json!("raw"));
        ns.insert("summary", json!({"refined": true}));
        assert_eq!(*ns.get("summary").unwrap(), json!({"refined": true}));
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn snapshot_is_sorted_object() {
        let ns = Namespace::new();
        ns.insert("zeta", json!(1));
        ns.insert("alpha", json!(2));

        let snap = ns.snapshot();
        let keys: Vec<&String> = snap.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
    }

    #[test]
    fn clone_is_shallow() {
        let ns = Namespace::new();
        let cloned = ns.clone();
        ns.insert("written_by_original", json!(true));
        assert!(cloned.contains("written_by_original"));
    }

    #[test]
    fn concurrent_writes_distinct_keys() {
        use std::thread;

        let ns = Namespace::new();
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let ns = ns.clone();
                thread::spawn(move || ns.insert(&format!("step_{i}"), json!(i)))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(ns.len(), 32);
    }
}
