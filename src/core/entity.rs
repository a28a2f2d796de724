//! Entity traits defining the core abstraction for persisted records

use crate::core::field::FieldValue;
use chrono::{DateTime, Utc};

/// Base trait for every persisted record.
///
/// Identity is optional until the record has been stored; [`Entity::is_new`]
/// decides whether a save takes the insert or the update path. Records with
/// client-assigned keys override it.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Identifier type (`i64` for generated ids, `String` for natural keys)
    type Id: Clone + Send + Sync + std::fmt::Debug + std::fmt::Display + 'static;

    /// The plural resource name used in URLs (e.g., "members")
    fn resource_name() -> &'static str;

    /// The singular resource name (e.g., "member")
    fn resource_name_singular() -> &'static str;

    /// Get the identifier, if one has been assigned
    fn id(&self) -> Option<Self::Id>;

    /// Whether a save must insert this record
    fn is_new(&self) -> bool {
        self.id().is_none()
    }
}

/// Records carrying creation and modification timestamps.
///
/// Repositories call these on save; entities never set them themselves.
pub trait Auditable {
    fn mark_created(&mut self, now: DateTime<Utc>);

    fn mark_modified(&mut self, now: DateTime<Utc>);
}

/// Read access to fields by property path.
///
/// Paths use dots to reach into associations, e.g. `team.name`. Unknown paths
/// return `None`, which sorting and filtering report as an unknown property.
pub trait Probe {
    fn field_value(&self, path: &str) -> Option<FieldValue>;
}
