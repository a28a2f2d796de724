//! Item entity with a client-assigned key

use crate::core::{Auditable, Entity, FieldValue, Probe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An item keyed by an externally supplied string.
///
/// The key is always present, so newness is decided by the creation
/// timestamp: an item that was never saved has none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub created_datetime: Option<DateTime<Utc>>,
}

impl Item {
    pub const PROPERTIES: &'static [&'static str] = &["id", "created_datetime"];

    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_datetime: None,
        }
    }
}

impl Entity for Item {
    type Id = String;

    fn resource_name() -> &'static str {
        "items"
    }

    fn resource_name_singular() -> &'static str {
        "item"
    }

    fn id(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn is_new(&self) -> bool {
        self.created_datetime.is_none()
    }
}

impl Auditable for Item {
    fn mark_created(&mut self, now: DateTime<Utc>) {
        self.created_datetime = Some(now);
    }

    fn mark_modified(&mut self, _now: DateTime<Utc>) {}
}

impl Probe for Item {
    fn field_value(&self, path: &str) -> Option<FieldValue> {
        match path {
            "id" => Some(self.id.as_str().into()),
            "created_datetime" => Some(self.created_datetime.into()),
            _ => None,
        }
    }
}
