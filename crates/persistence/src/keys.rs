//! Key escaping and path construction for the index documents.
//!
//! The document store uses `.` to traverse nested fields, so a literal `.`
//! inside a key (a feature ID like `sensor.1`) is replaced by [`FAKE_DOT`]
//! before segments are joined. `~` is escaped first so that escaping stays
//! reversible.

use serde_json::{Map, Value};

/// Replacement of a literal `.` inside a key.
pub const FAKE_DOT: &str = "~1";

/// Replacement of a literal `~` inside a key.
pub const FAKE_TILDE: &str = "~0";

/// Escapes one key for use as a document field name.
pub fn escape_key(key: &str) -> String {
    key.replace('~', FAKE_TILDE).replace('.', FAKE_DOT)
}

/// Reverses [`escape_key`].
pub fn unescape_key(key: &str) -> String {
    key.replace(FAKE_DOT, ".").replace(FAKE_TILDE, "~")
}

/// Joins path segments into a dotted document path.
///
/// Each segment has leading and trailing slashes removed, literal dots
/// escaped and inner slashes turned into dots.
///
/// ```
/// use thingsearch_persistence::keys::map_sort_key;
///
/// assert_eq!(
///     map_sort_key(&["features", "feature.1", "props", "acc/x.unit"]),
///     "features.feature~11.props.acc.x~1unit"
/// );
/// ```
pub fn map_sort_key<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .flat_map(|segment| segment.as_ref().trim_matches('/').split('/'))
        .filter(|part| !part.is_empty())
        .map(escape_key)
        .collect::<Vec<_>>()
        .join(".")
}

/// Escapes every object key of a JSON value, recursively.
pub fn escape_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (escape_key(key), escape_keys(value)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(escape_keys).collect()),
        other => other.clone(),
    }
}

/// Builds an anchored regex matching `key` and every key below it.
pub fn key_prefix_pattern(key: &str) -> String {
    format!("^{}(/|$)", regex::escape(key))
}

/// Builds an anchored regex matching a policy resource and its descendants.
///
/// A `*` in the feature ID position matches any feature, so
/// `thing:/features/*/properties/temp` covers that property of every feature.
/// Anywhere else `*` is a literal key. A resource ending in `/` (the root
/// `thing:/`) matches everything below it.
pub fn resource_prefix_pattern(resource: &str) -> String {
    let segments: Vec<&str> = resource.split('/').collect();
    let feature_wildcard = segments.len() > 2
        && segments[0] == "thing:"
        && segments[1] == "features"
        && segments[2] == "*";

    let body = segments
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            if index == 2 && feature_wildcard {
                "[^/]+".to_string()
            } else {
                regex::escape(segment)
            }
        })
        .collect::<Vec<_>>()
        .join("/");

    if resource.ends_with('/') {
        format!("^{}", body)
    } else {
        format!("^{}(/|$)", body)
    }
}

/// Returns the namespace part of a thing ID, or an empty string.
pub fn namespace_of(thing_id: &str) -> &str {
    thing_id
        .split_once(':')
        .map(|(namespace, _)| namespace)
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use regex::Regex;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_map_sort_key_fixtures() {
        assert_eq!(
            map_sort_key(&["features", "feature", "props", "acc"]),
            "features.feature.props.acc"
        );
        assert_eq!(
            map_sort_key(&["features", "feature.1", "props", "acc", "x"]),
            "features.feature~11.props.acc.x"
        );
        assert_eq!(
            map_sort_key(&["features", "feature.1", "props", "acc/x"]),
            "features.feature~11.props.acc.x"
        );
        assert_eq!(
            map_sort_key(&["features", "feature.1", "props", "acc/x.unit"]),
            "features.feature~11.props.acc.x~1unit"
        );
        assert_eq!(
            map_sort_key(&["features", "feature.1", "props", "acc.x/unit"]),
            "features.feature~11.props.acc~1x.unit"
        );
        assert_eq!(
            map_sort_key(&["features", "feature.1", "props", "acc.x/unit.y", "value"]),
            "features.feature~11.props.acc~1x.unit~1y.value"
        );
    }

    #[test]
    fn test_map_sort_key_strips_slashes() {
        assert_eq!(map_sort_key(&["attributes", "/a/b/"]), "attributes.a.b");
    }

    #[test]
    fn test_escape_is_reversible() {
        for key in ["plain", "a.b", "a~1b", "~", "~0.~1"] {
            assert_eq!(unescape_key(&escape_key(key)), key);
        }
        assert_eq!(escape_key("a~1.b"), "a~01~1b");
    }

    #[test]
    fn test_escape_keys_recursively() {
        let value = json!({"a.b": {"c.d": [ {"e.f": 1} ]}, "g": 2});
        assert_eq!(
            escape_keys(&value),
            json!({"a~1b": {"c~1d": [ {"e~1f": 1} ]}, "g": 2})
        );
    }

    #[test]
    fn test_key_prefix_pattern() {
        let re = Regex::new(&key_prefix_pattern("attributes/a.b")).unwrap();
        assert!(re.is_match("attributes/a.b"));
        assert!(re.is_match("attributes/a.b/c"));
        assert!(!re.is_match("attributes/a.bc"));
        assert!(!re.is_match("attributes/aXb"));
    }

    #[test]
    fn test_resource_prefix_pattern() {
        let root = Regex::new(&resource_prefix_pattern("thing:/")).unwrap();
        assert!(root.is_match("thing:/"));
        assert!(root.is_match("thing:/attributes/x"));

        let wildcard =
            Regex::new(&resource_prefix_pattern("thing:/features/*/properties/temp")).unwrap();
        assert!(wildcard.is_match("thing:/features/f1/properties/temp"));
        assert!(wildcard.is_match("thing:/features/f.2/properties/temp/unit"));
        assert!(!wildcard.is_match("thing:/features/a/b/properties/temp"));
        assert!(!wildcard.is_match("thing:/features/f1/properties/temperature"));
    }

    /// Only the feature ID position is a wildcard; other `*` keys are literal.
    #[test]
    fn test_literal_star_outside_feature_position() {
        assert_eq!(
            resource_prefix_pattern("thing:/attributes/*"),
            r"^thing:/attributes/\*(/|$)"
        );
        let literal = Regex::new(&resource_prefix_pattern("thing:/attributes/*")).unwrap();
        assert!(literal.is_match("thing:/attributes/*"));
        assert!(literal.is_match("thing:/attributes/*/x"));
        assert!(!literal.is_match("thing:/attributes/color"));

        let property =
            Regex::new(&resource_prefix_pattern("thing:/features/f1/properties/*")).unwrap();
        assert!(property.is_match("thing:/features/f1/properties/*"));
        assert!(!property.is_match("thing:/features/f1/properties/temp"));

        assert_eq!(
            resource_prefix_pattern("thing:/features/*/properties/temp"),
            "^thing:/features/[^/]+/properties/temp(/|$)"
        );
    }

    #[test]
    fn test_namespace_of() {
        assert_eq!(namespace_of("org.example:lamp"), "org.example");
        assert_eq!(namespace_of("no-namespace"), "");
    }
}
