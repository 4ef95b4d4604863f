//! Field expressions and the field path resolver.
//!
//! A field expression names one searchable part of a thing. The set of
//! variants is closed; every consumer matches on [`FieldExpression`]
//! exhaustively. Whether a variant may be filtered, tested for existence,
//! sorted or restricted by policy is declared by [`FieldExpression::supports`].
//!
//! # Path syntax
//!
//! | Path | Expression |
//! |------|------------|
//! | `thingId` | [`FieldExpression::ThingId`] |
//! | `_namespace` | [`FieldExpression::Namespace`] |
//! | `acl` | [`FieldExpression::Acl`] |
//! | `_globalRead` | [`FieldExpression::GlobalRead`] |
//! | `attributes/<key>` | [`FieldExpression::Attribute`] |
//! | `features/<featureId>` | [`FieldExpression::Feature`] |
//! | `features/*/properties/<property>` | [`FieldExpression::FeatureProperty`] |
//! | `features/<featureId>/properties/<property>` | [`FieldExpression::FeatureIdProperty`] |
//!
//! The first segment after `features/` is always the feature ID, so a
//! property path may itself contain slashes (`features/f/properties/a/b`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

/// Well-known name of the thing ID field.
pub const FIELD_THING_ID: &str = "thingId";
/// Well-known name of the namespace field.
pub const FIELD_NAMESPACE: &str = "_namespace";
/// Well-known name of the ACL field.
pub const FIELD_ACL: &str = "acl";
/// Well-known name of the global read field.
pub const FIELD_GLOBAL_READ: &str = "_globalRead";

/// Path prefix of attributes.
pub const ATTRIBUTES_PREFIX: &str = "attributes/";
/// Path prefix of features.
pub const FEATURES_PREFIX: &str = "features/";
/// Path segment introducing the properties of a feature.
pub const PROPERTIES_SEGMENT: &str = "properties/";
/// Feature ID placeholder matching any feature.
pub const ANY_FEATURE: &str = "*";

/// Prefix of every policy resource of a thing.
pub const THING_RESOURCE_PREFIX: &str = "thing:/";

/// The operations a field expression may take part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    /// Comparison against a literal (`eq`, `gt`, `like`, ...).
    Filter,
    /// Existence test (`exists`).
    Exists,
    /// Sort key.
    Sort,
    /// Read access is restricted per resource by the thing's policy.
    PolicyRestricted,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Filter => write!(f, "filtering"),
            Capability::Exists => write!(f, "existence checks"),
            Capability::Sort => write!(f, "sorting"),
            Capability::PolicyRestricted => write!(f, "policy restriction"),
        }
    }
}

/// A resolved reference to a searchable field of a thing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldExpression {
    /// An attribute, addressed by its slash-separated key.
    Attribute(String),
    /// A feature, addressed by its ID.
    Feature(String),
    /// A property of any feature.
    FeatureProperty(String),
    /// A property of one specific feature.
    FeatureIdProperty {
        /// The feature ID.
        feature_id: String,
        /// The slash-separated property path.
        property: String,
    },
    /// The ID of the thing.
    ThingId,
    /// The ACL subjects of a v1 thing.
    Acl,
    /// The subjects allowed to read at least one part of the thing.
    GlobalRead,
    /// The namespace of the thing.
    Namespace,
}

impl FieldExpression {
    /// Returns `true` if this expression supports the given capability.
    pub fn supports(&self, capability: Capability) -> bool {
        use Capability::*;

        match self {
            FieldExpression::Attribute(_) | FieldExpression::FeatureIdProperty { .. } => true,
            FieldExpression::Feature(_) => matches!(capability, Exists | PolicyRestricted),
            FieldExpression::FeatureProperty(_) => {
                matches!(capability, Filter | Exists | PolicyRestricted)
            }
            FieldExpression::ThingId => matches!(capability, Filter | Sort),
            FieldExpression::Acl | FieldExpression::GlobalRead | FieldExpression::Namespace => {
                capability == Filter
            }
        }
    }

    /// Fails with [`QueryError::UnsupportedField`] unless the capability is supported.
    pub fn require(&self, capability: Capability) -> QueryResult<()> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(QueryError::UnsupportedField {
                path: self.path(),
                capability,
            })
        }
    }

    /// Returns the canonical path of this expression.
    ///
    /// Resolving the returned path yields an equal expression.
    pub fn path(&self) -> String {
        match self {
            FieldExpression::Attribute(key) => format!("{ATTRIBUTES_PREFIX}{key}"),
            FieldExpression::Feature(feature_id) => format!("{FEATURES_PREFIX}{feature_id}"),
            FieldExpression::FeatureProperty(property) => {
                format!("{FEATURES_PREFIX}{ANY_FEATURE}/{PROPERTIES_SEGMENT}{property}")
            }
            FieldExpression::FeatureIdProperty {
                feature_id,
                property,
            } => format!("{FEATURES_PREFIX}{feature_id}/{PROPERTIES_SEGMENT}{property}"),
            FieldExpression::ThingId => FIELD_THING_ID.to_string(),
            FieldExpression::Acl => FIELD_ACL.to_string(),
            FieldExpression::GlobalRead => FIELD_GLOBAL_READ.to_string(),
            FieldExpression::Namespace => FIELD_NAMESPACE.to_string(),
        }
    }

    /// Returns the policy resource guarding this field, if it is policy restricted.
    ///
    /// A feature property of any feature yields a resource containing the
    /// `*` placeholder in place of the feature ID.
    pub fn resource(&self) -> Option<String> {
        if !self.supports(Capability::PolicyRestricted) {
            return None;
        }
        Some(format!("{THING_RESOURCE_PREFIX}{}", self.path()))
    }
}

impl fmt::Display for FieldExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// A field expression that is known to support filtering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterField(FieldExpression);

impl FilterField {
    /// Checks the filter capability and wraps the expression.
    pub fn new(expression: FieldExpression) -> QueryResult<Self> {
        expression.require(Capability::Filter)?;
        Ok(Self(expression))
    }

    /// Returns the wrapped expression.
    pub fn expression(&self) -> &FieldExpression {
        &self.0
    }
}

/// A field expression that is known to support existence checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExistsField(FieldExpression);

impl ExistsField {
    /// Checks the exists capability and wraps the expression.
    pub fn new(expression: FieldExpression) -> QueryResult<Self> {
        expression.require(Capability::Exists)?;
        Ok(Self(expression))
    }

    /// Returns the wrapped expression.
    pub fn expression(&self) -> &FieldExpression {
        &self.0
    }
}

/// A field expression that is known to support sorting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortField(FieldExpression);

impl SortField {
    /// Checks the sort capability and wraps the expression.
    pub fn new(expression: FieldExpression) -> QueryResult<Self> {
        expression.require(Capability::Sort)?;
        Ok(Self(expression))
    }

    /// Returns the wrapped expression.
    pub fn expression(&self) -> &FieldExpression {
        &self.0
    }
}

/// Resolves field paths of thing searches into [`FieldExpression`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThingsFieldExpressionFactory;

impl ThingsFieldExpressionFactory {
    /// Creates a new factory.
    pub fn new() -> Self {
        Self
    }

    /// Resolves a path into a field expression.
    ///
    /// Leading and trailing slashes are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownField`] if the path has no known shape.
    pub fn resolve(&self, path: &str) -> QueryResult<FieldExpression> {
        let normalized = path.trim_matches('/');
        let unknown = || QueryError::UnknownField {
            path: path.to_string(),
        };

        match normalized {
            FIELD_THING_ID => return Ok(FieldExpression::ThingId),
            FIELD_NAMESPACE => return Ok(FieldExpression::Namespace),
            FIELD_ACL => return Ok(FieldExpression::Acl),
            FIELD_GLOBAL_READ => return Ok(FieldExpression::GlobalRead),
            _ => {}
        }

        if let Some(key) = normalized.strip_prefix(ATTRIBUTES_PREFIX) {
            return if is_valid_pointer(key) {
                Ok(FieldExpression::Attribute(key.to_string()))
            } else {
                Err(unknown())
            };
        }

        let Some(rest) = normalized.strip_prefix(FEATURES_PREFIX) else {
            return Err(unknown());
        };

        let (feature_id, remainder) = match rest.split_once('/') {
            Some((feature_id, remainder)) => (feature_id, Some(remainder)),
            None => (rest, None),
        };
        if feature_id.is_empty() {
            return Err(unknown());
        }

        match remainder {
            None if feature_id == ANY_FEATURE => Err(unknown()),
            None => Ok(FieldExpression::Feature(feature_id.to_string())),
            Some(remainder) => {
                let property = remainder
                    .strip_prefix(PROPERTIES_SEGMENT)
                    .filter(|property| is_valid_pointer(property))
                    .ok_or_else(unknown)?;
                if feature_id == ANY_FEATURE {
                    Ok(FieldExpression::FeatureProperty(property.to_string()))
                } else {
                    Ok(FieldExpression::FeatureIdProperty {
                        feature_id: feature_id.to_string(),
                        property: property.to_string(),
                    })
                }
            }
        }
    }

    /// Resolves a path usable in a comparison.
    pub fn filter_by(&self, path: &str) -> QueryResult<FilterField> {
        FilterField::new(self.resolve(path)?)
    }

    /// Resolves a path usable in an existence check.
    pub fn exists_by(&self, path: &str) -> QueryResult<ExistsField> {
        ExistsField::new(self.resolve(path)?)
    }

    /// Resolves a path usable as a sort key.
    pub fn sort_by(&self, path: &str) -> QueryResult<SortField> {
        SortField::new(self.resolve(path)?)
    }
}

/// A pointer is valid if it is non-empty and has no empty segments.
fn is_valid_pointer(pointer: &str) -> bool {
    !pointer.is_empty() && pointer.split('/').all(|segment| !segment.is_empty())
}
