use serde_json::Value;

/// Deep-merge `overlay` into `base` and return the result.
///
/// Objects merge recursively key-by-key. Any non-object value, arrays
/// included, replaces the base value wholesale.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_arrays_replace_wholesale() {
        let merged = deep_merge(json!({"a": [1, 2]}), json!({"a": [3]}));
        assert_eq!(merged, json!({"a": [3]}));
    }

    #[test]
    fn test_nested_objects_merge_recursively() {
        let merged = deep_merge(
            json!({"outer": {"keep": 1, "replace": 2}}),
            json!({"outer": {"replace": 3, "add": 4}}),
        );
        assert_eq!(merged, json!({"outer": {"keep": 1, "replace": 3, "add": 4}}));
    }

    #[test]
    fn test_scalar_replaces_object() {
        let merged = deep_merge(json!({"a": {"deep": true}}), json!({"a": 7}));
        assert_eq!(merged, json!({"a": 7}));
    }

    #[test]
    fn test_disjoint_keys_union() {
        let merged = deep_merge(json!({"a": 1}), json!({"b": 2}));
        assert_eq!(merged, json!({"a": 1, "b": 2}));
    }
}
