//! Decoding with unused-field tracking.
//!
//! The raw tree is decoded into the typed model, the model is serialized
//! back, and every raw object key that has no counterpart in the serialized
//! model is reported. Paths are dotted for object keys and bracketed for
//! array positions (`params.vm_groups[0].unknown_key`), in input order.

use std::io;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::DocumentError;

/// Decode `tree` into `T`, returning the paths of raw fields `T` has no
/// place for.
pub fn decode<T>(tree: &Value) -> Result<(T, Vec<String>), DocumentError>
where
    T: Serialize + DeserializeOwned,
{
    let typed = T::deserialize(tree).map_err(|e| DocumentError::malformed(e.to_string()))?;
    let mapped = serde_json::to_value(&typed).map_err(io::Error::from)?;
    let mut unused = Vec::new();
    collect(tree, &mapped, "", &mut unused);
    Ok((typed, unused))
}

fn collect(raw: &Value, mapped: &Value, path: &str, unused: &mut Vec<String>) {
    match (raw, mapped) {
        (Value::Object(raw), Value::Object(mapped)) => {
            for (key, raw_value) in raw {
                let field = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                match mapped.get(key) {
                    Some(mapped_value) => collect(raw_value, mapped_value, &field, unused),
                    None => unused.push(field),
                }
            }
        }
        (Value::Array(raw), Value::Array(mapped)) => {
            for (i, (raw_item, mapped_item)) in raw.iter().zip(mapped).enumerate() {
                collect(raw_item, mapped_item, &format!("{}[{}]", path, i), unused);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Outer {
        name: Option<String>,
        items: Option<Vec<Inner>>,
        inner: Option<Inner>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Inner {
        value: Option<i64>,
    }

    #[test]
    fn test_no_unused() {
        let (outer, unused) =
            decode::<Outer>(&json!({"name": "n", "items": [{"value": 1}], "inner": null}))
                .unwrap();
        assert_eq!(outer.name.as_deref(), Some("n"));
        assert!(unused.is_empty());
    }

    #[test]
    fn test_unused_paths_in_input_order() {
        let tree = json!({
            "extra_outer_field": 1,
            "items": [{"value": 1}, {"value": 2, "unknown_key": {"deep": true}}],
            "inner": {"extra_inner_field": "x", "value": 3},
            "name": "n"
        });
        let (outer, unused) = decode::<Outer>(&tree).unwrap();
        assert_eq!(
            unused,
            vec![
                "extra_outer_field",
                "items[1].unknown_key",
                "inner.extra_inner_field"
            ]
        );
        assert_eq!(
            outer,
            Outer {
                name: Some("n".to_string()),
                items: Some(vec![Inner { value: Some(1) }, Inner { value: Some(2) }]),
                inner: Some(Inner { value: Some(3) }),
            }
        );
    }

    #[test]
    fn test_type_mismatch() {
        let err = decode::<Outer>(&json!({"name": 5})).unwrap_err();
        assert!(matches!(err, DocumentError::MalformedInput(_)));
    }
}
