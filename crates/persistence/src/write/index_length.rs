//! Enforcement of the maximum length of index entries.

use serde_json::Value;

use crate::error::{PersistenceError, PersistenceResult};

/// Keeps index entries of one thing within the store's key length limit.
///
/// The budget of an entry is the configured maximum minus the length of the
/// thing ID, which the store adds to every index key. String values that do
/// not fit are truncated on a character boundary; other values have a fixed
/// size and are kept as they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLengthRestrictionEnforcer {
    max_length: usize,
}

impl IndexLengthRestrictionEnforcer {
    /// Creates an enforcer for the entries of one thing.
    pub fn new(thing_id: &str, max_index_content_length: usize) -> Self {
        Self {
            max_length: max_index_content_length.saturating_sub(thing_id.len()),
        }
    }

    /// Returns the byte budget of a single entry.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Returns the value to index for `key`, truncated if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::IndexKeyTooLong`] if the key alone uses up
    /// the budget. The caller drops the entry.
    pub fn enforce(&self, key: &str, value: &Value) -> PersistenceResult<Value> {
        if key.len() >= self.max_length {
            return Err(PersistenceError::IndexKeyTooLong {
                key: key.to_string(),
                length: key.len(),
                max_length: self.max_length,
            });
        }

        let available = self.max_length - key.len();
        match value {
            Value::String(s) if s.len() > available => {
                let mut end = available;
                while !s.is_char_boundary(end) {
                    end -= 1;
                }
                Ok(Value::String(s[..end].to_string()))
            }
            other => Ok(other.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_budget_excludes_thing_id() {
        let enforcer = IndexLengthRestrictionEnforcer::new("ns:thing", 950);
        assert_eq!(enforcer.max_length(), 942);
    }

    #[test]
    fn test_short_values_are_kept() {
        let enforcer = IndexLengthRestrictionEnforcer::new("ns:t", 100);
        assert_eq!(enforcer.enforce("attributes/a", &json!("x")).unwrap(), json!("x"));
        assert_eq!(enforcer.enforce("attributes/a", &json!(12.5)).unwrap(), json!(12.5));
    }

    #[test]
    fn test_long_strings_are_truncated() {
        let enforcer = IndexLengthRestrictionEnforcer::new("ns:t", 24);
        // budget 20, key 12, 8 bytes left
        let value = enforcer
            .enforce("attributes/a", &json!("0123456789"))
            .unwrap();
        assert_eq!(value, json!("01234567"));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let enforcer = IndexLengthRestrictionEnforcer::new("", 14);
        // 3 bytes left; each umlaut takes 2
        let value = enforcer
            .enforce("attributes/", &json!("\u{e4}\u{e4}\u{e4}"))
            .unwrap();
        assert_eq!(value, json!("\u{e4}"));
    }

    #[test]
    fn test_key_exceeding_budget_is_rejected() {
        let enforcer = IndexLengthRestrictionEnforcer::new("ns:t", 10);
        let err = enforcer.enforce("attributes/long", &json!(1)).unwrap_err();
        assert!(matches!(err, PersistenceError::IndexKeyTooLong { .. }));
    }
}
