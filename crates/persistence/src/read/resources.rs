//! Collection of the policy resources a criteria tree refers to.

use std::collections::BTreeSet;

use thingsearch_query::{Criteria, CriteriaVisitor, ExistsField, FilterField, Predicate};

/// Returns the policy resources of every policy-restricted field in the tree.
///
/// Fields without a resource, like `thingId`, contribute nothing.
pub fn referenced_resources(criteria: &Criteria) -> BTreeSet<String> {
    criteria.accept(&ResourceNamesVisitor)
}

struct ResourceNamesVisitor;

impl ResourceNamesVisitor {
    fn union(children: Vec<BTreeSet<String>>) -> BTreeSet<String> {
        children.into_iter().flatten().collect()
    }
}

impl CriteriaVisitor for ResourceNamesVisitor {
    type Output = BTreeSet<String>;

    fn visit_and(&self, children: Vec<Self::Output>) -> Self::Output {
        Self::union(children)
    }

    fn visit_or(&self, children: Vec<Self::Output>) -> Self::Output {
        Self::union(children)
    }

    fn visit_nor(&self, children: Vec<Self::Output>) -> Self::Output {
        Self::union(children)
    }

    fn visit_any(&self) -> Self::Output {
        BTreeSet::new()
    }

    fn visit_exists(&self, field: &ExistsField) -> Self::Output {
        field.expression().resource().into_iter().collect()
    }

    fn visit_field(&self, field: &FilterField, _predicate: &Predicate) -> Self::Output {
        field.expression().resource().into_iter().collect()
    }
}
