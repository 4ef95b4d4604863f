//! Compilation of criteria into MongoDB filter documents.
//!
//! | Expression | Filter |
//! |------------|--------|
//! | `Attribute` | `__internal $elemMatch {k: "attributes/<key>", v: <op>}` |
//! | `FeatureProperty` | `__internal $elemMatch {k: "features/properties/<p>", v: <op>}` |
//! | `FeatureIdProperty` | as above plus `f: <featureId>` |
//! | `ThingId` | `_id: <op>` |
//! | `Namespace` | `_namespace: <op>` |
//! | `Acl` | `__internal $elemMatch {acl: <op>}` |
//! | `GlobalRead` | `__internal $elemMatch {gr: <op>}` |

use serde_json::{Value, json};
use thingsearch_query::{
    Criteria, CriteriaVisitor, ExistsField, FieldExpression, FilterField, Literal, Predicate,
};

use crate::fields::{
    FIELD_ACL, FIELD_GRANTED, FIELD_ID, FIELD_INTERNAL, FIELD_INTERNAL_FEATURE_ID,
    FIELD_INTERNAL_KEY, FIELD_INTERNAL_VALUE, FIELD_NAMESPACE, KEY_ATTRIBUTES,
    KEY_FEATURE_PROPERTIES,
};
use crate::keys::key_prefix_pattern;

/// Compiles a criteria tree into a filter document.
pub fn compile_filter(criteria: &Criteria) -> Value {
    criteria.accept(&CreateBsonVisitor)
}

/// A filter document that matches no document at all.
pub fn match_nothing() -> Value {
    json!({ FIELD_ID: { "$in": [] } })
}

/// Converts a wildcard pattern into an anchored regex.
///
/// `*` matches any run of characters, `?` exactly one character.
pub fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');
    for c in pattern.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            other => regex.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    regex.push('$');
    regex
}

/// Internal key of a policy-restricted value expression.
fn internal_key(expression: &FieldExpression) -> Option<String> {
    match expression {
        FieldExpression::Attribute(key) => Some(format!("{KEY_ATTRIBUTES}{key}")),
        FieldExpression::FeatureProperty(property)
        | FieldExpression::FeatureIdProperty { property, .. } => {
            Some(format!("{KEY_FEATURE_PROPERTIES}{property}"))
        }
        _ => None,
    }
}

fn predicate_filter(predicate: &Predicate) -> Value {
    match predicate {
        Predicate::Eq(value) => json!({ "$eq": value.to_json() }),
        Predicate::Ne(value) => json!({ "$ne": value.to_json() }),
        Predicate::Gt(value) => json!({ "$gt": value.to_json() }),
        Predicate::Ge(value) => json!({ "$gte": value.to_json() }),
        Predicate::Lt(value) => json!({ "$lt": value.to_json() }),
        Predicate::Le(value) => json!({ "$lte": value.to_json() }),
        Predicate::Like(pattern) => json!({ "$regex": like_to_regex(pattern) }),
        Predicate::In(values) => {
            json!({ "$in": values.iter().map(Literal::to_json).collect::<Vec<_>>() })
        }
    }
}

fn elem_match(entry: Value) -> Value {
    json!({ FIELD_INTERNAL: { "$elemMatch": entry } })
}

/// Criteria visitor producing MongoDB filter documents.
struct CreateBsonVisitor;

impl CriteriaVisitor for CreateBsonVisitor {
    type Output = Value;

    fn visit_and(&self, children: Vec<Value>) -> Value {
        if children.is_empty() {
            json!({})
        } else {
            json!({ "$and": children })
        }
    }

    fn visit_or(&self, children: Vec<Value>) -> Value {
        if children.is_empty() {
            match_nothing()
        } else {
            json!({ "$or": children })
        }
    }

    fn visit_nor(&self, children: Vec<Value>) -> Value {
        if children.is_empty() {
            json!({})
        } else {
            json!({ "$nor": children })
        }
    }

    fn visit_any(&self) -> Value {
        json!({})
    }

    fn visit_exists(&self, field: &ExistsField) -> Value {
        let expression = field.expression();
        match expression {
            FieldExpression::Feature(feature_id) => {
                elem_match(json!({ FIELD_INTERNAL_FEATURE_ID: feature_id }))
            }
            FieldExpression::FeatureIdProperty { feature_id, .. } => {
                let key = internal_key(expression).unwrap_or_default();
                elem_match(json!({
                    FIELD_INTERNAL_KEY: { "$regex": key_prefix_pattern(&key) },
                    FIELD_INTERNAL_FEATURE_ID: feature_id,
                }))
            }
            FieldExpression::Attribute(_) | FieldExpression::FeatureProperty(_) => {
                let key = internal_key(expression).unwrap_or_default();
                elem_match(json!({ FIELD_INTERNAL_KEY: { "$regex": key_prefix_pattern(&key) } }))
            }
            FieldExpression::ThingId => json!({ FIELD_ID: { "$exists": true } }),
            FieldExpression::Namespace => json!({ FIELD_NAMESPACE: { "$exists": true } }),
            FieldExpression::Acl => elem_match(json!({ FIELD_ACL: { "$exists": true } })),
            FieldExpression::GlobalRead => {
                elem_match(json!({ FIELD_GRANTED: { "$exists": true } }))
            }
        }
    }

    fn visit_field(&self, field: &FilterField, predicate: &Predicate) -> Value {
        let expression = field.expression();
        let value = predicate_filter(predicate);
        match expression {
            FieldExpression::Attribute(_) | FieldExpression::FeatureProperty(_) => {
                let key = internal_key(expression).unwrap_or_default();
                elem_match(json!({ FIELD_INTERNAL_KEY: key, FIELD_INTERNAL_VALUE: value }))
            }
            FieldExpression::FeatureIdProperty { feature_id, .. } => {
                let key = internal_key(expression).unwrap_or_default();
                elem_match(json!({
                    FIELD_INTERNAL_KEY: key,
                    FIELD_INTERNAL_VALUE: value,
                    FIELD_INTERNAL_FEATURE_ID: feature_id,
                }))
            }
            // not filterable; compares the feature ID
            FieldExpression::Feature(_) => elem_match(json!({ FIELD_INTERNAL_FEATURE_ID: value })),
            FieldExpression::ThingId => json!({ FIELD_ID: value }),
            FieldExpression::Namespace => json!({ FIELD_NAMESPACE: value }),
            FieldExpression::Acl => elem_match(json!({ FIELD_ACL: value })),
            FieldExpression::GlobalRead => elem_match(json!({ FIELD_GRANTED: value })),
        }
    }
}

#[cfg(test)]
mod tests {
    use thingsearch_query::QueryFilterCriteriaFactory;

    use super::*;

    fn compile(filter: &str) -> Value {
        let criteria = QueryFilterCriteriaFactory::new()
            .filter_criteria(Some(filter))
            .unwrap();
        compile_filter(&criteria)
    }

    #[test]
    fn test_attribute_comparison() {
        assert_eq!(
            compile(r#"eq(attributes/color,"red")"#),
            json!({"__internal": {"$elemMatch": {"k": "attributes/color", "v": {"$eq": "red"}}}})
        );
    }

    #[test]
    fn test_feature_id_property_comparison() {
        assert_eq!(
            compile(r#"ge(features/sensor.1/properties/temp,20)"#),
            json!({"__internal": {"$elemMatch": {
                "k": "features/properties/temp",
                "v": {"$gte": 20},
                "f": "sensor.1"
            }}})
        );
    }

    #[test]
    fn test_thing_id_and_namespace() {
        assert_eq!(
            compile(r#"in(thingId,"a:1","a:2")"#),
            json!({"_id": {"$in": ["a:1", "a:2"]}})
        );
        assert_eq!(
            compile(r#"ne(_namespace,"a")"#),
            json!({"_namespace": {"$ne": "a"}})
        );
    }

    #[test]
    fn test_like_becomes_anchored_regex() {
        assert_eq!(
            compile(r#"like(thingId,"org.a:*x?")"#),
            json!({"_id": {"$regex": "^org\\.a:.*x.$"}})
        );
    }

    #[test]
    fn test_exists() {
        assert_eq!(
            compile("exists(features/lamp)"),
            json!({"__internal": {"$elemMatch": {"f": "lamp"}}})
        );
        assert_eq!(
            compile("exists(attributes/location)"),
            json!({"__internal": {"$elemMatch": {"k": {"$regex": "^attributes/location(/|$)"}}}})
        );
    }

    #[test]
    fn test_logical_combinators() {
        assert_eq!(
            compile(r#"and(eq(acl,"s1"),not(eq(_globalRead,"s2")))"#),
            json!({"$and": [
                {"__internal": {"$elemMatch": {"acl": {"$eq": "s1"}}}},
                {"$nor": [{"__internal": {"$elemMatch": {"gr": {"$eq": "s2"}}}}]}
            ]})
        );
    }

    #[test]
    fn test_empty_combinators() {
        assert_eq!(compile_filter(&Criteria::And(vec![])), json!({}));
        assert_eq!(compile_filter(&Criteria::Nor(vec![])), json!({}));
        assert_eq!(compile_filter(&Criteria::Or(vec![])), match_nothing());
        assert_eq!(compile_filter(&Criteria::Any), json!({}));
    }
}
