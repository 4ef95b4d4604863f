//! Construction of criteria trees from RQL filter strings.

use tracing::trace;

use crate::criteria::{Criteria, Literal, Predicate};
use crate::error::QueryResult;
use crate::expression::{FieldExpression, FilterField, ThingsFieldExpressionFactory};
use crate::rql::{CompareOp, RqlNode, RqlParser};

/// Builds [`Criteria`] from filter strings, resolving every field path.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryFilterCriteriaFactory {
    fields: ThingsFieldExpressionFactory,
}

impl QueryFilterCriteriaFactory {
    /// Creates a new factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a filter into a criteria tree.
    ///
    /// An absent or blank filter yields [`Criteria::Any`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::QueryError::InvalidFilterSyntax`] for malformed RQL
    /// and the resolver's errors for unknown or unsupported field paths.
    pub fn filter_criteria(&self, filter: Option<&str>) -> QueryResult<Criteria> {
        match filter.map(str::trim) {
            None | Some("") => Ok(Criteria::Any),
            Some(text) => {
                let node = RqlParser::parse_filter(text)?;
                trace!(filter = text, ast = ?node, "Parsed RQL filter");
                self.to_criteria(node)
            }
        }
    }

    /// Parses a filter and restricts it to things of the given namespaces.
    ///
    /// The result is `and(or(<namespace prefix of thingId>...), <filter>)`.
    pub fn filter_criteria_restricted_by_namespaces<I, S>(
        &self,
        filter: Option<&str>,
        namespaces: I,
    ) -> QueryResult<Criteria>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = self.filter_criteria(filter)?;
        let thing_id = FilterField::new(FieldExpression::ThingId)?;
        let namespace_criteria = namespaces
            .into_iter()
            .map(|namespace| {
                Criteria::field(
                    thing_id.clone(),
                    Predicate::Like(format!("{}:*", namespace.as_ref())),
                )
            })
            .collect();

        Ok(Criteria::And(vec![Criteria::Or(namespace_criteria), parsed]))
    }

    fn to_criteria(&self, node: RqlNode) -> QueryResult<Criteria> {
        Ok(match node {
            RqlNode::And(children) => Criteria::And(self.to_criteria_list(children)?),
            RqlNode::Or(children) => Criteria::Or(self.to_criteria_list(children)?),
            RqlNode::Not(child) => Criteria::not(self.to_criteria(*child)?),
            RqlNode::Exists { property } => Criteria::Exists(self.fields.exists_by(&property)?),
            RqlNode::In { property, values } => {
                Criteria::field(self.fields.filter_by(&property)?, Predicate::In(values))
            }
            RqlNode::Compare {
                op,
                property,
                value,
            } => Criteria::field(self.fields.filter_by(&property)?, predicate(op, value)),
        })
    }

    fn to_criteria_list(&self, nodes: Vec<RqlNode>) -> QueryResult<Vec<Criteria>> {
        nodes.into_iter().map(|node| self.to_criteria(node)).collect()
    }
}

fn predicate(op: CompareOp, value: Literal) -> Predicate {
    match op {
        CompareOp::Eq => Predicate::Eq(value),
        CompareOp::Ne => Predicate::Ne(value),
        CompareOp::Gt => Predicate::Gt(value),
        CompareOp::Ge => Predicate::Ge(value),
        CompareOp::Lt => Predicate::Lt(value),
        CompareOp::Le => Predicate::Le(value),
        // the parser only accepts string values for like
        CompareOp::Like => match value {
            Literal::String(pattern) => Predicate::Like(pattern),
            other => Predicate::Like(other.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;

    #[test]
    fn test_blank_filter_matches_everything() {
        let factory = QueryFilterCriteriaFactory::new();
        assert_eq!(factory.filter_criteria(None).unwrap(), Criteria::Any);
        assert_eq!(factory.filter_criteria(Some("  ")).unwrap(), Criteria::Any);
    }

    #[test]
    fn test_not_becomes_nor() {
        let factory = QueryFilterCriteriaFactory::new();
        let criteria = factory
            .filter_criteria(Some(r#"not(eq(attributes/a,1))"#))
            .unwrap();
        match criteria {
            Criteria::Nor(children) => {
                assert_eq!(children.len(), 1);
                assert!(matches!(children[0], Criteria::Field(_, Predicate::Eq(_))));
            }
            other => panic!("Expected nor, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_field_propagates() {
        let factory = QueryFilterCriteriaFactory::new();
        assert!(matches!(
            factory.filter_criteria(Some(r#"eq(foo,1)"#)),
            Err(QueryError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_unsupported_capability_propagates() {
        let factory = QueryFilterCriteriaFactory::new();
        assert!(matches!(
            factory.filter_criteria(Some(r#"eq(features/f,1)"#)),
            Err(QueryError::UnsupportedField { .. })
        ));
        assert!(matches!(
            factory.filter_criteria(Some(r#"exists(thingId)"#)),
            Err(QueryError::UnsupportedField { .. })
        ));
    }

    #[test]
    fn test_namespace_restriction() {
        let factory = QueryFilterCriteriaFactory::new();
        let criteria = factory
            .filter_criteria_restricted_by_namespaces(
                Some(r#"eq(attributes/color,"red")"#),
                ["org.a", "org.b"],
            )
            .unwrap();

        match criteria {
            Criteria::And(children) => {
                assert_eq!(children.len(), 2);
                match &children[0] {
                    Criteria::Or(namespaces) => {
                        assert_eq!(namespaces.len(), 2);
                        match &namespaces[1] {
                            Criteria::Field(field, Predicate::Like(pattern)) => {
                                assert_eq!(field.expression(), &FieldExpression::ThingId);
                                assert_eq!(pattern, "org.b:*");
                            }
                            other => panic!("Expected thingId like, got {:?}", other),
                        }
                    }
                    other => panic!("Expected or, got {:?}", other),
                }
                assert!(matches!(children[1], Criteria::Field(..)));
            }
            other => panic!("Expected and, got {:?}", other),
        }
    }
}
