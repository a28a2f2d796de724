//! Team entity

use super::member::Member;
use crate::core::{Entity, FieldValue, Probe};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A team owning its members.
///
/// Saving a team saves every member in `members`; deleting it deletes them.
#[derive(Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl Team {
    pub const PROPERTIES: &'static [&'static str] = &["id", "name"];

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Same team without the member collection
    pub fn detached(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            members: Vec::new(),
        }
    }
}

impl PartialEq for Team {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            _ => std::ptr::eq(self, other),
        }
    }
}

// Only id and name: printing members would walk back into the team
impl fmt::Debug for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Team")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Team(id={}, name={})", id, self.name),
            None => write!(f, "Team(id=-, name={})", self.name),
        }
    }
}

impl Entity for Team {
    type Id = i64;

    fn resource_name() -> &'static str {
        "teams"
    }

    fn resource_name_singular() -> &'static str {
        "team"
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Probe for Team {
    fn field_value(&self, path: &str) -> Option<FieldValue> {
        match path {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            _ => None,
        }
    }
}
