//! Rejection of negation for schema versions that require monotone filters.

use crate::criteria::{Criteria, Predicate};
use crate::error::{QueryError, QueryResult};
use crate::expression::{ExistsField, FilterField};
use crate::version::{NEGATION_FORBIDDEN_SINCE, SchemaVersion};
use crate::visitor::CriteriaVisitor;

/// Fails with [`QueryError::NegationNotAllowed`] iff `criteria` contains a
/// `Nor` node and `version` forbids negation.
pub fn ensure_monotonicity(criteria: &Criteria, version: SchemaVersion) -> QueryResult<()> {
    criteria.accept(&EnsureMonotonicity { version })
}

struct EnsureMonotonicity {
    version: SchemaVersion,
}

impl CriteriaVisitor for EnsureMonotonicity {
    type Output = QueryResult<()>;

    fn visit_and(&self, children: Vec<Self::Output>) -> Self::Output {
        children.into_iter().collect()
    }

    fn visit_or(&self, children: Vec<Self::Output>) -> Self::Output {
        children.into_iter().collect()
    }

    fn visit_nor(&self, children: Vec<Self::Output>) -> Self::Output {
        if self.version.forbids_negation() {
            return Err(QueryError::NegationNotAllowed {
                version: self.version,
                forbidden_since: NEGATION_FORBIDDEN_SINCE,
            });
        }
        children.into_iter().collect()
    }

    fn visit_any(&self) -> Self::Output {
        Ok(())
    }

    fn visit_exists(&self, _field: &ExistsField) -> Self::Output {
        Ok(())
    }

    fn visit_field(&self, _field: &FilterField, _predicate: &Predicate) -> Self::Output {
        Ok(())
    }
}
