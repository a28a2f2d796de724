//! Partial views of members returned instead of full entities

use crate::entities::MemberWithTeam;
use serde::{Deserialize, Serialize};

/// Closed projection: only the username column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameOnly {
    pub username: String,
}

impl From<&MemberWithTeam> for UsernameOnly {
    fn from(row: &MemberWithTeam) -> Self {
        Self {
            username: row.member.username.clone(),
        }
    }
}

/// Class-based projection carrying the username
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameOnlyDto {
    username: String,
}

impl UsernameOnlyDto {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl From<&MemberWithTeam> for UsernameOnlyDto {
    fn from(row: &MemberWithTeam) -> Self {
        Self::new(row.member.username.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub name: String,
}

/// Username plus the name of the member's team, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedClosedProjection {
    pub username: String,
    pub team: Option<TeamInfo>,
}

impl From<&MemberWithTeam> for NestedClosedProjection {
    fn from(row: &MemberWithTeam) -> Self {
        Self {
            username: row.member.username.clone(),
            team: row.team_name().map(|name| TeamInfo {
                name: name.to_string(),
            }),
        }
    }
}

/// Member joined with its team name; only members that have a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDto {
    pub id: i64,
    pub username: String,
    pub team_name: Option<String>,
}

impl MemberDto {
    /// `None` for rows that were never persisted
    pub fn from_row(row: &MemberWithTeam) -> Option<Self> {
        Some(Self {
            id: row.member.id?,
            username: row.member.username.clone(),
            team_name: row.team_name().map(str::to_string),
        })
    }
}

/// Row shape of the native member/team projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProjection {
    pub id: i64,
    pub username: String,
    pub team_name: Option<String>,
}

impl From<MemberProjection> for MemberDto {
    fn from(row: MemberProjection) -> Self {
        Self {
            id: row.id,
            username: row.username,
            team_name: row.team_name,
        }
    }
}
