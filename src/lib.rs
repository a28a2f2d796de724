//! # datamap-rs
//!
//! Data access for members, teams and items, with an HTTP surface on top.
//!
//! ## Features
//!
//! - **Repositories**: CRUD plus derived member queries behind object-safe traits
//! - **Paging**: `Page` with a total count, `Slice` with a look-ahead row
//! - **Projections**: username-only, nested team and DTO views
//! - **Query hints**: read-only transactions and pessimistic write locks
//! - **Specifications**: composable predicates and query-by-example
//! - **Auditing**: created/modified timestamps stamped on save
//! - **Backends**: in-memory by default, PostgreSQL behind the `postgres` feature
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use datamap::prelude::*;
//!
//! let repositories = Repositories::in_memory();
//!
//! let mut team = Team::new("teamA");
//! Member::with_team("member1", 10, &mut team);
//! let team = repositories.teams.save(team).await?;
//!
//! let page = repositories
//!     .members
//!     .find_by_age(10, &PageRequest::of(0, 3).with_sort(Sort::by(Direction::Desc, ["username"])))
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod repository;
pub mod server;
pub mod storage;
pub mod telemetry;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        Auditable, DataError, DataResult, Direction, Entity, Example, ExampleMatcher, LockMode,
        Order, Page, PageParams, PageRequest, QueryHints, Slice, Sort, Specification,
        StringMatcher,
    };

    // === Entities ===
    pub use crate::entities::{Item, Member, MemberWithTeam, Team};

    // === Repositories ===
    pub use crate::repository::{
        CrudRepository, ItemRepository, MemberDto, MemberProjection, MemberRepository,
        MemberRepositoryExt, MemberSpecification, NestedClosedProjection, Repositories,
        TeamRepository, UsernameOnly, UsernameOnlyDto,
    };

    // === Storage ===
    pub use crate::storage::InMemoryStore;
    #[cfg(feature = "postgres")]
    pub use crate::storage::PostgresStore;

    // === Config ===
    pub use crate::config::{AppConfig, Backend};

    // === Server ===
    pub use crate::server::{AppState, RestExposure, ServerBuilder};
    pub use crate::telemetry::init_tracing;

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
}
