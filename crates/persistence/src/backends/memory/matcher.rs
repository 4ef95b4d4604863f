//! Evaluation of MongoDB-style filter documents against JSON documents.
//!
//! Only the operators the compiler and the write path emit are supported:
//! `$and`, `$or`, `$nor`, `$elemMatch`, `$eq`, `$ne`, `$gt`, `$gte`, `$lt`,
//! `$lte`, `$in`, `$nin`, `$regex` and `$exists`. Any other operator is an
//! error rather than a silent mismatch.

use std::cmp::Ordering;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{PersistenceError, PersistenceResult};

/// Returns `true` if `document` matches `filter`.
pub fn matches(document: &Value, filter: &Value) -> PersistenceResult<bool> {
    let Value::Object(clauses) = filter else {
        return Err(PersistenceError::backend(format!(
            "filter must be a document, got {}",
            filter
        )));
    };

    for (key, condition) in clauses {
        let matched = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses_of(key, condition)? {
                    if !matches(document, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in clauses_of(key, condition)? {
                    if matches(document, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$nor" => {
                let mut none = true;
                for clause in clauses_of(key, condition)? {
                    if matches(document, clause)? {
                        none = false;
                        break;
                    }
                }
                none
            }
            operator if operator.starts_with('$') => {
                return Err(unsupported(operator));
            }
            path => field_matches(&resolve_all(document, path), condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Returns `true` if one element of an array matches `condition`.
///
/// The condition is either a set of field operators applied to the element
/// itself, a query document applied to an element document, or a plain
/// value compared for equality.
pub fn element_matches(element: &Value, condition: &Value) -> PersistenceResult<bool> {
    match condition {
        Value::Object(map) if is_operator_document(map) => field_matches(&[element], condition),
        Value::Object(_) => match element {
            Value::Object(_) => matches(element, condition),
            _ => Ok(false),
        },
        literal => Ok(values_equal(element, literal)),
    }
}

/// Collects the values at a dotted path, descending into arrays of
/// documents along the way.
pub fn resolve_all<'a>(document: &'a Value, path: &str) -> Vec<&'a Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut values = Vec::new();
    collect(document, &segments, &mut values);
    values
}

fn collect<'a>(value: &'a Value, path: &[&str], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = path.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Value::Object(map) => {
            if let Some(child) = map.get(*head) {
                collect(child, rest, out);
            }
        }
        Value::Array(items) => {
            for item in items.iter().filter(|item| item.is_object()) {
                collect(item, path, out);
            }
        }
        _ => {}
    }
}

/// Returns the value at a dotted path without descending into arrays.
pub fn resolve_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

/// Compares two values of the same type; numbers compare numerically.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Total order over arbitrary values used for sorting.
///
/// Missing values sort first, then null, numbers, strings, documents,
/// arrays and booleans.
pub fn sort_order(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    let rank = |value: Option<&Value>| match value {
        None => 0,
        Some(Value::Null) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Object(_)) => 4,
        Some(Value::Array(_)) => 5,
        Some(Value::Bool(_)) => 6,
    };
    match (left, right) {
        (Some(a), Some(b)) => compare_values(a, b).unwrap_or_else(|| {
            rank(left)
                .cmp(&rank(right))
                .then_with(|| a.to_string().cmp(&b.to_string()))
        }),
        _ => rank(left).cmp(&rank(right)),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => compare_values(left, right) == Some(Ordering::Equal),
        _ => left == right,
    }
}

fn clauses_of<'a>(operator: &str, condition: &'a Value) -> PersistenceResult<&'a Vec<Value>> {
    condition.as_array().ok_or_else(|| {
        PersistenceError::backend(format!("{} requires an array of filters", operator))
    })
}

fn is_logical(key: &str) -> bool {
    matches!(key, "$and" | "$or" | "$nor")
}

fn is_operator_document(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|key| key.starts_with('$') && !is_logical(key))
}

fn unsupported(operator: &str) -> PersistenceError {
    PersistenceError::backend(format!("unsupported query operator {}", operator))
}

/// Values at a path plus the elements of array values.
fn expand<'a>(values: &[&'a Value]) -> Vec<&'a Value> {
    let mut expanded = Vec::new();
    for value in values {
        expanded.push(*value);
        if let Value::Array(items) = value {
            expanded.extend(items.iter());
        }
    }
    expanded
}

fn field_matches(values: &[&Value], condition: &Value) -> PersistenceResult<bool> {
    match condition {
        Value::Object(map) if is_operator_document(map) => {
            for (operator, argument) in map {
                if !operator_matches(values, operator, argument)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        literal => Ok(expand(values)
            .into_iter()
            .any(|value| values_equal(value, literal))),
    }
}

fn operator_matches(values: &[&Value], operator: &str, argument: &Value) -> PersistenceResult<bool> {
    let expanded = expand(values);
    let ordered = |accept: fn(Ordering) -> bool| {
        expanded
            .iter()
            .any(|value| compare_values(value, argument).is_some_and(accept))
    };

    let matched = match operator {
        "$eq" => expanded.iter().any(|value| values_equal(value, argument)),
        "$ne" => !expanded.iter().any(|value| values_equal(value, argument)),
        "$gt" => ordered(Ordering::is_gt),
        "$gte" => ordered(Ordering::is_ge),
        "$lt" => ordered(Ordering::is_lt),
        "$lte" => ordered(Ordering::is_le),
        "$in" | "$nin" => {
            let members = clauses_of(operator, argument)?;
            let found = expanded
                .iter()
                .any(|value| members.iter().any(|member| values_equal(value, member)));
            if operator == "$in" { found } else { !found }
        }
        "$regex" => {
            let pattern = argument.as_str().ok_or_else(|| {
                PersistenceError::backend("$regex requires a string pattern".to_string())
            })?;
            let regex = Regex::new(pattern).map_err(|e| {
                PersistenceError::backend(format!("invalid regex '{}': {}", pattern, e))
            })?;
            expanded
                .iter()
                .filter_map(|value| value.as_str())
                .any(|value| regex.is_match(value))
        }
        "$exists" => {
            let expected = argument.as_bool().ok_or_else(|| {
                PersistenceError::backend("$exists requires a boolean".to_string())
            })?;
            values.is_empty() != expected
        }
        "$elemMatch" => {
            let mut any = false;
            for element in values
                .iter()
                .filter_map(|value| value.as_array())
                .flatten()
            {
                if element_matches(element, argument)? {
                    any = true;
                    break;
                }
            }
            any
        }
        other => return Err(unsupported(other)),
    };
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn thing() -> Value {
        json!({
            "_id": "ns:t",
            "_namespace": "ns",
            "__internal": [
                {"k": "attributes/color", "v": "red"},
                {"k": "attributes/size", "v": 3},
                {"k": "features/id", "v": "lamp", "f": "lamp"},
                {"acl": "s1"}
            ],
            "attributes": {"color": "red", "tags": ["a", "b"]}
        })
    }

    #[test]
    fn test_elem_match_on_internal_entries() {
        let doc = thing();
        assert!(
            matches(
                &doc,
                &json!({"__internal": {"$elemMatch": {"k": "attributes/color", "v": {"$eq": "red"}}}})
            )
            .unwrap()
        );
        assert!(
            !matches(
                &doc,
                &json!({"__internal": {"$elemMatch": {"k": "attributes/color", "v": {"$eq": 3}}}})
            )
            .unwrap()
        );
    }

    #[test]
    fn test_numeric_comparison() {
        let doc = thing();
        assert!(
            matches(
                &doc,
                &json!({"__internal": {"$elemMatch": {"k": "attributes/size", "v": {"$gte": 2.5}}}})
            )
            .unwrap()
        );
        assert!(
            matches(
                &doc,
                &json!({"__internal": {"$elemMatch": {"k": "attributes/size", "v": {"$in": [3.0]}}}})
            )
            .unwrap()
        );
    }

    #[test]
    fn test_logical_operators() {
        let doc = thing();
        assert!(matches(&doc, &json!({"$or": [{"_id": "x"}, {"_namespace": "ns"}]})).unwrap());
        assert!(!matches(&doc, &json!({"$nor": [{"_namespace": "ns"}]})).unwrap());
        assert!(matches(&doc, &json!({"$and": []})).unwrap());
        assert!(!matches(&doc, &json!({"_id": {"$in": []}})).unwrap());
    }

    #[test]
    fn test_array_values_match_per_element() {
        let doc = thing();
        assert!(matches(&doc, &json!({"attributes.tags": "b"})).unwrap());
        assert!(matches(&doc, &json!({"attributes.tags": {"$regex": "^a$"}})).unwrap());
        assert!(!matches(&doc, &json!({"attributes.tags": {"$nin": ["a"]}})).unwrap());
    }

    #[test]
    fn test_exists() {
        let doc = thing();
        assert!(matches(&doc, &json!({"attributes.color": {"$exists": true}})).unwrap());
        assert!(matches(&doc, &json!({"attributes.shape": {"$exists": false}})).unwrap());
        assert!(
            matches(&doc, &json!({"__internal": {"$elemMatch": {"acl": {"$exists": true}}}}))
                .unwrap()
        );
    }

    #[test]
    fn test_element_conditions() {
        let entry = json!({"acl": "s1"});
        assert!(element_matches(&entry, &json!({"$or": [{"acl": "s1"}, {"gr": "s1"}]})).unwrap());
        assert!(element_matches(&json!(5), &json!({"$gt": 4})).unwrap());
        assert!(element_matches(&json!("x"), &json!("x")).unwrap());
    }

    #[test]
    fn test_unsupported_operator_is_an_error() {
        let result = matches(&thing(), &json!({"_id": {"$where": "true"}}));
        assert!(matches!(result, Err(PersistenceError::Backend { .. })));
    }

    #[test]
    fn test_sort_order_ranks_types() {
        assert_eq!(sort_order(None, Some(&json!(1))), Ordering::Less);
        assert_eq!(sort_order(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(sort_order(Some(&json!("a")), Some(&json!(10))), Ordering::Greater);
    }
}
