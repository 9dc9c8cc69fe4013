//! Typed skeleton - parsed shape of a step's expected parameters
//!
//! A skeleton is ordinary JSON where a fillable leaf is written as
//! `{"<name>": {"type": "string"}}` or `[{"type": "number"}]`. Everything
//! else is structural and preserved as-is.
//!
//! The wire form is parsed once into an explicit tree so the binder never
//! has to re-sniff "is this a typed leaf" mid-traversal.

use serde_json::Value;

/// Expected primitive type of a typed leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafType {
    String,
    Number,
    Boolean,
}

impl LeafType {
    /// Recognize a `"type"` tag value. Unknown tags are not leaf types.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "string" => Some(Self::String),
            "number" | "integer" => Some(Self::Number),
            "boolean" | "bool" => Some(Self::Boolean),
            _ => None,
        }
    }
}

/// One node of a parsed skeleton.
#[derive(Debug, Clone, PartialEq)]
pub enum Skeleton {
    /// Plain value copied through untouched
    Literal(Value),
    /// Object walked recursively, keys preserved
    Object(Vec<(String, Skeleton)>),
    /// Array walked recursively
    Array(Vec<Skeleton>),
    /// `{"<name>": {"type": …}}` - match `name` against the payload's fields
    Typed { name: String, ty: LeafType },
    /// `[{"type": …}]` - one cast value per payload element, matched against
    /// the enclosing field name
    TypedArray { ty: LeafType },
}

impl Skeleton {
    /// Parse a skeleton from its JSON wire form.
    pub fn parse(value: &Value) -> Self {
        Self::parse_node(value, None)
    }

    fn parse_node(value: &Value, enclosing: Option<&str>) -> Self {
        match value {
            Value::Object(map) => {
                // Bare annotation in field position: {"origin": {"type": "string"}}
                // arrives here as the value with enclosing = "origin".
                if let (Some(name), Some(ty)) = (enclosing, type_annotation(value)) {
                    return Self::Typed {
                        name: name.to_string(),
                        ty,
                    };
                }
                // Self-contained single-entry form
                if map.len() == 1 {
                    let (name, inner) = map.iter().next().expect("len checked");
                    if let Some(ty) = type_annotation(inner) {
                        return Self::Typed {
                            name: name.clone(),
                            ty,
                        };
                    }
                }
                Self::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), Self::parse_node(v, Some(k))))
                        .collect(),
                )
            }
            Value::Array(items) => {
                if items.len() == 1 {
                    if let Some(ty) = type_annotation(&items[0]) {
                        return Self::TypedArray { ty };
                    }
                }
                Self::Array(
                    items
                        .iter()
                        .map(|v| Self::parse_node(v, enclosing))
                        .collect(),
                )
            }
            other => Self::Literal(other.clone()),
        }
    }

    /// Whether any position in this skeleton is fillable.
    pub fn has_typed_leaves(&self) -> bool {
        match self {
            Self::Literal(_) => false,
            Self::Typed { .. } | Self::TypedArray { .. } => true,
            Self::Object(entries) => entries.iter().any(|(_, s)| s.has_typed_leaves()),
            Self::Array(items) => items.iter().any(Skeleton::has_typed_leaves),
        }
    }
}

/// `{"type": "<tag>"}` with a recognized tag, and nothing else.
fn type_annotation(value: &Value) -> Option<LeafType> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    LeafType::from_tag(map.get("type")?.as_str()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_single_entry_typed_leaf() {
        let sk = Skeleton::parse(&json!({"origin": {"type": "string"}}));
        assert_eq!(
            sk,
            Skeleton::Typed {
                name: "origin".into(),
                ty: LeafType::String
            }
        );
    }

    #[test]
    fn parse_multi_field_object_of_leaves() {
        let sk = Skeleton::parse(&json!({
            "origin": {"type": "string"},
            "seats": {"type": "number"}
        }));
        let Skeleton::Object(entries) = sk else {
            panic!("expected object")
        };
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|(_, s)| matches!(s, Skeleton::Typed { .. })));
    }

    #[test]
    fn parse_typed_array_leaf() {
        let sk = Skeleton::parse(&json!({"prices": [{"type": "number"}]}));
        let Skeleton::Object(entries) = sk else {
            panic!("expected object")
        };
        assert_eq!(
            entries[0].1,
            Skeleton::TypedArray {
                ty: LeafType::Number
            }
        );
    }

    #[test]
    fn parse_structural_array() {
        let sk = Skeleton::parse(&json!({"rows": [{"name": {"type": "string"}, "age": {"type": "number"}}]}));
        let Skeleton::Object(entries) = sk else {
            panic!("expected object")
        };
        let Skeleton::Array(items) = &entries[0].1 else {
            panic!("expected array")
        };
        assert!(matches!(items[0], Skeleton::Object(_)));
    }

    #[test]
    fn unknown_type_tag_is_structural() {
        let sk = Skeleton::parse(&json!({"x": {"type": "datetime"}}));
        assert!(!sk.has_typed_leaves());
    }

    #[test]
    fn literals_pass_through() {
        let sk = Skeleton::parse(&json!({"version": 2, "label": "fixed"}));
        let Skeleton::Object(ref entries) = sk else {
            panic!("expected object")
        };
        assert_eq!(entries[0], ("label".into(), Skeleton::Literal(json!("fixed"))));
        assert!(!sk.has_typed_leaves());
    }

    #[test]
    fn leaf_type_tags() {
        assert_eq!(LeafType::from_tag("String"), Some(LeafType::String));
        assert_eq!(LeafType::from_tag(" integer "), Some(LeafType::Number));
        assert_eq!(LeafType::from_tag("bool"), Some(LeafType::Boolean));
        assert_eq!(LeafType::from_tag("object"), None);
    }
}
