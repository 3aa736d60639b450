//! Cell stringification.

use serde_json::Value;

/// Converts a cell value to its display text.
///
/// `Null` renders as the empty string, never as a literal null marker.
/// Strings render without quotes; arrays join their elements with ", ";
/// anything else uses its compact JSON form.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(cell_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_is_empty() {
        assert_eq!(cell_text(&Value::Null), "");
    }

    #[test]
    fn test_string_unquoted() {
        assert_eq!(cell_text(&json!("vol0")), "vol0");
    }

    #[test]
    fn test_numbers_and_bools() {
        assert_eq!(cell_text(&json!(42)), "42");
        assert_eq!(cell_text(&json!(true)), "true");
    }

    #[test]
    fn test_array_joined() {
        assert_eq!(cell_text(&json!(["a", "b", 3])), "a, b, 3");
    }

    #[test]
    fn test_object_compact_json() {
        assert_eq!(cell_text(&json!({"k": 1})), "{\"k\":1}");
    }
}
