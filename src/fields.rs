//! Encoding of the list-ish job fields. `location`, `requirements` and
//! `tags` live in TEXT columns: lists are stored as JSON-array strings,
//! scalar strings are stored verbatim. A leading `[` is what marks a stored
//! value as a list on the way back out.

use serde_json::Value;

/// Storage encodings for the three list-ish fields of an incoming job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedFields {
    pub location: Option<String>,
    pub requirements: Option<String>,
    pub tags: Option<String>,
}

/// Encode incoming `location`/`requirements`/`tags` values for storage.
pub fn prepare(
    location: Option<&Value>,
    requirements: Option<&Value>,
    tags: Option<&Value>,
) -> PreparedFields {
    PreparedFields {
        location: encode_list_or_scalar(location),
        requirements: encode_list_or_scalar(requirements),
        tags: encode_tags(tags),
    }
}

fn encode_list_or_scalar(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(list @ Value::Array(_)) => Some(list.to_string()),
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn encode_tags(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(list @ Value::Array(_)) => Some(list.to_string()),
        // A lone scalar becomes a single-element list.
        Some(scalar) => Some(Value::Array(vec![scalar.clone()]).to_string()),
    }
}

/// Decode a stored `location`/`requirements` value back to its original shape:
/// an encoded list becomes a JSON array, anything else comes back as the raw
/// scalar string.
pub fn parse_list_or_scalar(stored: Option<&str>) -> Option<Value> {
    let stored = stored?;
    if stored.is_empty() {
        return None;
    }
    if stored.starts_with('[') {
        if let Ok(list) = serde_json::from_str::<Value>(stored) {
            return Some(list);
        }
    }
    Some(Value::String(stored.to_string()))
}

/// Decode stored tags. Always a list; `NULL` decodes to an empty one.
pub fn parse_tags(stored: Option<&str>) -> Vec<String> {
    let Some(stored) = stored else {
        return Vec::new();
    };
    match serde_json::from_str::<Value>(stored) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_round_trip() {
        let location = json!(["NYC", "Remote"]);
        let prepared = prepare(Some(&location), None, None);
        assert_eq!(
            parse_list_or_scalar(prepared.location.as_deref()),
            Some(location)
        );
        assert_eq!(prepared.requirements, None);
    }

    #[test]
    fn scalar_passes_through() {
        let location = json!("Berlin");
        let prepared = prepare(Some(&location), None, None);
        assert_eq!(prepared.location.as_deref(), Some("Berlin"));
        assert_eq!(
            parse_list_or_scalar(prepared.location.as_deref()),
            Some(location)
        );
    }

    #[test]
    fn scalar_tag_becomes_single_element_list() {
        let prepared = prepare(None, None, Some(&json!("x")));
        assert_eq!(parse_tags(prepared.tags.as_deref()), vec!["x".to_string()]);
    }

    #[test]
    fn missing_tags_decode_to_empty_list() {
        let prepared = prepare(None, None, None);
        assert_eq!(prepared.tags, None);
        assert!(parse_tags(prepared.tags.as_deref()).is_empty());
    }

    #[test]
    fn tag_list_preserves_order() {
        let tags = json!(["remote", "senior", "rust"]);
        let prepared = prepare(None, None, Some(&tags));
        assert_eq!(
            parse_tags(prepared.tags.as_deref()),
            vec!["remote", "senior", "rust"]
        );
    }
}
