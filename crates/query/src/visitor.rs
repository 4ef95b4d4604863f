//! Compositional interpreters over the criteria tree.
//!
//! An interpreter implements [`CriteriaVisitor`] once per operation instead
//! of adding methods to [`Criteria`]. [`Criteria::accept`] evaluates every
//! child of `And`, `Or` and `Nor` before handing the results to the
//! combinator, so validating interpreters see every node even when the
//! combined result would not depend on it.

use crate::criteria::{Criteria, Predicate};
use crate::expression::{ExistsField, FilterField};

/// One interpretation of a criteria tree.
pub trait CriteriaVisitor {
    /// The result of interpreting a (sub)tree.
    type Output;

    /// Combines the results of the children of an `And` node.
    fn visit_and(&self, children: Vec<Self::Output>) -> Self::Output;

    /// Combines the results of the children of an `Or` node.
    fn visit_or(&self, children: Vec<Self::Output>) -> Self::Output;

    /// Combines the results of the children of a `Nor` node.
    fn visit_nor(&self, children: Vec<Self::Output>) -> Self::Output;

    /// Interprets the match-all node.
    fn visit_any(&self) -> Self::Output;

    /// Interprets an existence check.
    fn visit_exists(&self, field: &ExistsField) -> Self::Output;

    /// Interprets a field comparison.
    fn visit_field(&self, field: &FilterField, predicate: &Predicate) -> Self::Output;
}

impl Criteria {
    /// Interprets this tree with the given visitor.
    pub fn accept<V: CriteriaVisitor>(&self, visitor: &V) -> V::Output {
        match self {
            Criteria::And(children) => visitor.visit_and(visit_all(children, visitor)),
            Criteria::Or(children) => visitor.visit_or(visit_all(children, visitor)),
            Criteria::Nor(children) => visitor.visit_nor(visit_all(children, visitor)),
            Criteria::Any => visitor.visit_any(),
            Criteria::Exists(field) => visitor.visit_exists(field),
            Criteria::Field(field, predicate) => visitor.visit_field(field, predicate),
        }
    }
}

fn visit_all<V: CriteriaVisitor>(children: &[Criteria], visitor: &V) -> Vec<V::Output> {
    children.iter().map(|child| child.accept(visitor)).collect()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::criteria::Literal;
    use crate::expression::ThingsFieldExpressionFactory;

    /// Counts visited leaves and short-circuits nothing.
    struct LeafCounter {
        visited: Cell<usize>,
    }

    impl CriteriaVisitor for LeafCounter {
        type Output = bool;

        fn visit_and(&self, children: Vec<bool>) -> bool {
            children.into_iter().all(|c| c)
        }

        fn visit_or(&self, children: Vec<bool>) -> bool {
            children.into_iter().any(|c| c)
        }

        fn visit_nor(&self, children: Vec<bool>) -> bool {
            !children.into_iter().any(|c| c)
        }

        fn visit_any(&self) -> bool {
            self.visited.set(self.visited.get() + 1);
            true
        }

        fn visit_exists(&self, _field: &ExistsField) -> bool {
            self.visited.set(self.visited.get() + 1);
            false
        }

        fn visit_field(&self, _field: &FilterField, _predicate: &Predicate) -> bool {
            self.visited.set(self.visited.get() + 1);
            false
        }
    }

    #[test]
    fn test_every_child_is_visited() {
        let factory = ThingsFieldExpressionFactory::new();
        let tree = Criteria::Or(vec![
            Criteria::Any,
            Criteria::Exists(factory.exists_by("features/f").unwrap()),
            Criteria::And(vec![
                Criteria::Field(
                    factory.filter_by("thingId").unwrap(),
                    Predicate::Eq(Literal::from("ns:t")),
                ),
                Criteria::Any,
            ]),
        ]);

        let counter = LeafCounter {
            visited: Cell::new(0),
        };
        assert!(tree.accept(&counter));
        assert_eq!(counter.visited.get(), 4);
    }
}
