use serde_json::Value;

/// Decode string values that are themselves JSON objects or arrays, at any
/// depth. Strings that only look like JSON are left untouched.
pub fn normalize_nested_json(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let trimmed = s.trim_start();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                match serde_json::from_str::<Value>(&s) {
                    Ok(parsed @ (Value::Object(_) | Value::Array(_))) => normalize_nested_json(parsed),
                    _ => Value::String(s),
                }
            } else {
                Value::String(s)
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_nested_json).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_nested_json(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_strings_decoded_recursively() {
        let input = json!({
            "filter": "{\"labels\": \"[\\\"bug\\\"]\"}",
            "items": ["[1, 2]", "plain"],
            "count": 3
        });
        let out = normalize_nested_json(input);
        assert_eq!(out["filter"], json!({"labels": ["bug"]}));
        assert_eq!(out["items"], json!([[1, 2], "plain"]));
        assert_eq!(out["count"], 3);
    }

    #[test]
    fn test_invalid_json_lookalike_kept() {
        let out = normalize_nested_json(json!({"title": "[WIP] fix login"}));
        assert_eq!(out["title"], "[WIP] fix login");
    }

    #[test]
    fn test_top_level_string_object_decoded() {
        let out = normalize_nested_json(json!("  {\"owner\": \"acme\"}"));
        assert_eq!(out, json!({"owner": "acme"}));
    }
}
