//! Field names of the persisted index documents.
//!
//! A thing index document looks like this:
//!
//! ```json
//! {
//!   "_id": "ns:thing",
//!   "_namespace": "ns",
//!   "_revision": 7,
//!   "_policyId": "ns:policy",
//!   "__internal": [
//!     {"k": "attributes/color", "v": "red"},
//!     {"k": "features/properties/temp", "v": 21.5, "f": "sensor.1"},
//!     {"k": "features/id", "v": "sensor.1", "f": "sensor.1"},
//!     {"acl": "subject-1"},
//!     {"gr": "subject-1"}
//!   ],
//!   "attributes": {"color": "red"},
//!   "features": {"sensor~11": {"properties": {"temp": 21.5}}}
//! }
//! ```
//!
//! A policy index entry looks like this:
//!
//! ```json
//! {
//!   "_id": "ns:thing:thing:/attributes/color",
//!   "_thingId": "ns:thing",
//!   "resource": "thing:/attributes/color",
//!   "gr": ["subject-1"],
//!   "rv": []
//! }
//! ```

/// Document ID; the thing ID or the policy entry ID.
pub const FIELD_ID: &str = "_id";
/// Namespace of the thing.
pub const FIELD_NAMESPACE: &str = "_namespace";
/// Revision of the last applied event.
pub const FIELD_REVISION: &str = "_revision";
/// ID of the policy governing a v2 thing.
pub const FIELD_POLICY_ID: &str = "_policyId";
/// Flat array of key/value entries used for filtering.
pub const FIELD_INTERNAL: &str = "__internal";
/// Key of an internal entry.
pub const FIELD_INTERNAL_KEY: &str = "k";
/// Value of an internal entry.
pub const FIELD_INTERNAL_VALUE: &str = "v";
/// Feature ID of an internal feature entry.
pub const FIELD_INTERNAL_FEATURE_ID: &str = "f";
/// ACL subject with read permission of a v1 thing.
pub const FIELD_ACL: &str = "acl";
/// Subjects granted read access; internal entry of a thing or array of a policy entry.
pub const FIELD_GRANTED: &str = "gr";
/// Subjects revoked read access in a policy entry.
pub const FIELD_REVOKED: &str = "rv";
/// Denormalized attributes.
pub const FIELD_ATTRIBUTES: &str = "attributes";
/// Denormalized features.
pub const FIELD_FEATURES: &str = "features";
/// Properties of a denormalized feature.
pub const FIELD_PROPERTIES: &str = "properties";

/// Thing ID of a policy entry.
pub const FIELD_THING_ID: &str = "_thingId";
/// Resource of a policy entry.
pub const FIELD_RESOURCE: &str = "resource";
/// Policy entries joined onto a thing document during a search.
pub const FIELD_POLICIES: &str = "_policies";

/// Key prefix of internal attribute entries.
pub const KEY_ATTRIBUTES: &str = "attributes/";
/// Key prefix of internal feature property entries.
pub const KEY_FEATURE_PROPERTIES: &str = "features/properties/";
/// Key of the internal entry marking the presence of a feature.
pub const KEY_FEATURE_ID: &str = "features/id";

/// Field produced by the `$count` stage.
pub const FIELD_COUNT: &str = "count";
