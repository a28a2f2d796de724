//! Member entity

use super::team::Team;
use crate::core::{Auditable, Entity, ExampleProbe, FieldValue, Probe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A member, optionally belonging to one team.
///
/// Equality is identity-based: persisted members are equal when their ids
/// match, a transient member is only equal to itself.
#[derive(Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Option<i64>,
    pub username: String,
    #[serde(default)]
    pub age: i32,
    #[serde(default)]
    pub team_id: Option<i64>,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_modified_date: Option<DateTime<Utc>>,
}

impl Member {
    /// Properties usable in sorts and specifications
    pub const PROPERTIES: &'static [&'static str] = &[
        "id",
        "username",
        "age",
        "team.id",
        "team.name",
        "created_date",
        "last_modified_date",
    ];

    pub fn new(username: impl Into<String>) -> Self {
        Self::with_age(username, 0)
    }

    pub fn with_age(username: impl Into<String>, age: i32) -> Self {
        Self {
            id: None,
            username: username.into(),
            age,
            team_id: None,
            created_date: None,
            last_modified_date: None,
        }
    }

    /// Create a member already attached to `team`
    pub fn with_team(username: impl Into<String>, age: i32, team: &mut Team) -> Self {
        let mut member = Self::with_age(username, age);
        member.change_team(team);
        member
    }

    /// Point this member at `team` and add it to the team's collection.
    ///
    /// When the team is not persisted yet the reference is completed by the
    /// cascading save of the team.
    pub fn change_team(&mut self, team: &mut Team) {
        self.team_id = team.id;
        team.members.push(self.clone());
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            _ => std::ptr::eq(self, other),
        }
    }
}

impl Eq for Member {}

impl Hash for Member {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("age", &self.age)
            .finish()
    }
}

impl Entity for Member {
    type Id = i64;

    fn resource_name() -> &'static str {
        "members"
    }

    fn resource_name_singular() -> &'static str {
        "member"
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Auditable for Member {
    fn mark_created(&mut self, now: DateTime<Utc>) {
        self.created_date = Some(now);
        self.last_modified_date = Some(now);
    }

    fn mark_modified(&mut self, now: DateTime<Utc>) {
        self.last_modified_date = Some(now);
    }
}

impl Probe for Member {
    fn field_value(&self, path: &str) -> Option<FieldValue> {
        match path {
            "id" => Some(self.id.into()),
            "username" => Some(self.username.as_str().into()),
            "age" => Some(self.age.into()),
            "team.id" => Some(self.team_id.into()),
            "created_date" => Some(self.created_date.into()),
            "last_modified_date" => Some(self.last_modified_date.into()),
            _ => None,
        }
    }
}

impl ExampleProbe for Member {
    fn probe_paths() -> &'static [&'static str] {
        &[
            "id",
            "username",
            "age",
            "team.id",
            "created_date",
            "last_modified_date",
        ]
    }
}

/// A member read together with its team in one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberWithTeam {
    pub member: Member,
    pub team: Option<Team>,
}

impl MemberWithTeam {
    pub fn team_name(&self) -> Option<&str> {
        self.team.as_ref().map(|t| t.name.as_str())
    }
}

impl Probe for MemberWithTeam {
    fn field_value(&self, path: &str) -> Option<FieldValue> {
        match path {
            "team.name" => Some(self.team_name().map(str::to_string).into()),
            other => self.member.field_value(other),
        }
    }
}
