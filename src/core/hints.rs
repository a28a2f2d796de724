//! Locking and read-only hints attached to individual queries

use serde::{Deserialize, Serialize};

/// Row locking requested for a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    #[default]
    None,
    /// Shared lock: others may read but not write the rows
    PessimisticRead,
    /// Exclusive lock: others may neither lock nor write the rows
    PessimisticWrite,
}

impl LockMode {
    /// Row-locking clause appended to a PostgreSQL `SELECT`
    pub fn sql_suffix(&self) -> &'static str {
        match self {
            LockMode::None => "",
            LockMode::PessimisticRead => " FOR SHARE",
            LockMode::PessimisticWrite => " FOR UPDATE",
        }
    }
}

/// Per-query hints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryHints {
    pub read_only: bool,
    pub lock: LockMode,
}

impl QueryHints {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            lock: LockMode::None,
        }
    }

    pub fn lock(mode: LockMode) -> Self {
        Self {
            read_only: false,
            lock: mode,
        }
    }
}
