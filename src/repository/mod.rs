//! Repository contracts
//!
//! Every backend implements these traits for all three entities. The traits
//! are object-safe so the server can hold `Arc<dyn MemberRepository>`;
//! generic projections live in [`MemberRepositoryExt`], which is blanket
//! implemented for every member repository.

pub mod projection;
pub mod specification;

use crate::core::{DataResult, Entity, Example, Page, PageRequest, Slice, Sort, Specification};
use crate::entities::{Item, Member, MemberWithTeam, Team};
use async_trait::async_trait;
use std::sync::Arc;

pub use projection::{
    MemberDto, MemberProjection, NestedClosedProjection, TeamInfo, UsernameOnly, UsernameOnlyDto,
};
pub use specification::MemberSpecification;

/// Generic CRUD operations for one entity type
#[async_trait]
pub trait CrudRepository<T: Entity>: Send + Sync {
    /// Insert a new entity or update an existing one, returning the stored state
    async fn save(&self, entity: T) -> DataResult<T>;

    async fn save_all(&self, entities: Vec<T>) -> DataResult<Vec<T>> {
        let mut saved = Vec::with_capacity(entities.len());
        for entity in entities {
            saved.push(self.save(entity).await?);
        }
        Ok(saved)
    }

    async fn find_by_id(&self, id: &T::Id) -> DataResult<Option<T>>;

    async fn exists_by_id(&self, id: &T::Id) -> DataResult<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    /// All rows in id order
    async fn find_all(&self) -> DataResult<Vec<T>>;

    async fn find_all_sorted(&self, sort: &Sort) -> DataResult<Vec<T>>;

    async fn find_all_paged(&self, request: &PageRequest) -> DataResult<Page<T>>;

    async fn count(&self) -> DataResult<u64>;

    /// Delete a persisted entity; transient entities are ignored
    async fn delete(&self, entity: &T) -> DataResult<()> {
        match entity.id() {
            Some(id) => self.delete_by_id(&id).await,
            None => Ok(()),
        }
    }

    /// Deleting a missing id is a no-op
    async fn delete_by_id(&self, id: &T::Id) -> DataResult<()>;

    async fn delete_all(&self) -> DataResult<()>;
}

/// Member queries
///
/// Method names follow the derived-query naming convention
/// (`find_by_<property>_and_<property>_greater_than`), but each query is
/// written out by the backend.
#[async_trait]
pub trait MemberRepository: CrudRepository<Member> {
    async fn find_by_username_and_age_greater_than(
        &self,
        username: &str,
        age: i32,
    ) -> DataResult<Vec<Member>>;

    async fn find_by_username(&self, username: &str) -> DataResult<Vec<Member>>;

    /// Members matching both `username` and `age` exactly
    async fn find_user(&self, username: &str, age: i32) -> DataResult<Vec<Member>>;

    async fn find_username_list(&self) -> DataResult<Vec<String>>;

    /// Members that belong to a team, with the team name
    async fn find_member_dto(&self) -> DataResult<Vec<MemberDto>>;

    async fn find_by_names(&self, names: &[String]) -> DataResult<Vec<Member>>;

    async fn find_list_by_username(&self, username: &str) -> DataResult<Vec<Member>>;

    /// Exactly one member; `NotFound` when none, `NonUniqueResult` when several
    async fn find_member_by_username(&self, username: &str) -> DataResult<Member>;

    /// At most one member; `NonUniqueResult` when several
    async fn find_optional_by_username(&self, username: &str) -> DataResult<Option<Member>>;

    async fn find_by_age(&self, age: i32, request: &PageRequest) -> DataResult<Page<Member>>;

    /// Like [`find_by_age`](Self::find_by_age) without the count query
    async fn find_slice_by_age(&self, age: i32, request: &PageRequest)
    -> DataResult<Slice<Member>>;

    /// Offset/limit paging ordered by username descending
    async fn find_by_page(&self, age: i32, offset: u64, limit: u64) -> DataResult<Vec<Member>>;

    async fn total_count(&self, age: i32) -> DataResult<u64>;

    /// Add one year to every member aged `age` or older; returns affected rows.
    ///
    /// Bulk updates bypass auditing: `last_modified_date` is left untouched.
    async fn bulk_age_plus(&self, age: i32) -> DataResult<u64>;

    /// Every member with its team, loaded in one read
    async fn find_member_fetch_join(&self) -> DataResult<Vec<MemberWithTeam>>;

    async fn find_entity_graph_by_username(&self, username: &str)
    -> DataResult<Vec<MemberWithTeam>>;

    /// Read without holding row locks
    async fn find_read_only_by_username(&self, username: &str) -> DataResult<Option<Member>>;

    /// Read under an exclusive row lock.
    ///
    /// The lock is released when this call returns. To keep it across
    /// follow-up writes on Postgres, use
    /// `PostgresStore::find_lock_by_username_in` with a transaction you hold.
    async fn find_lock_by_username(&self, username: &str) -> DataResult<Vec<Member>>;

    async fn find_all_matching(&self, spec: &Specification<Member>) -> DataResult<Vec<Member>>;

    async fn find_all_by_example(&self, example: &Example<Member>) -> DataResult<Vec<Member>> {
        self.find_all_matching(&example.to_specification()).await
    }

    /// Source rows for projections
    async fn find_with_team_by_username(&self, username: &str)
    -> DataResult<Vec<MemberWithTeam>>;

    async fn find_by_native_query(&self, username: &str) -> DataResult<Option<Member>>;

    async fn find_by_native_projection(
        &self,
        request: &PageRequest,
    ) -> DataResult<Page<MemberProjection>>;
}

/// Projection queries generic over the returned shape
#[async_trait]
pub trait MemberRepositoryExt: MemberRepository {
    async fn find_projections_by_username<P>(&self, username: &str) -> DataResult<Vec<P>>
    where
        P: for<'a> From<&'a MemberWithTeam> + Send + 'static,
    {
        let rows = self.find_with_team_by_username(username).await?;
        Ok(rows.iter().map(P::from).collect())
    }
}

impl<R: MemberRepository + ?Sized> MemberRepositoryExt for R {}

#[async_trait]
pub trait TeamRepository: CrudRepository<Team> {
    async fn find_by_name(&self, name: &str) -> DataResult<Vec<Team>>;
}

pub trait ItemRepository: CrudRepository<Item> {}

/// Repository handles sharing one backend
#[derive(Clone)]
pub struct Repositories {
    pub members: Arc<dyn MemberRepository>,
    pub teams: Arc<dyn TeamRepository>,
    pub items: Arc<dyn ItemRepository>,
}

impl Repositories {
    pub fn from_store<S>(store: S) -> Self
    where
        S: MemberRepository + TeamRepository + ItemRepository + 'static,
    {
        let store = Arc::new(store);
        Self {
            members: store.clone(),
            teams: store.clone(),
            items: store,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_store(crate::storage::InMemoryStore::new())
    }
}

/// Exactly one row or the matching error
pub(crate) fn single<T>(entity_type: &str, key: &str, mut rows: Vec<T>) -> DataResult<T> {
    match rows.len() {
        0 => Err(crate::core::DataError::not_found(entity_type, key)),
        1 => Ok(rows.remove(0)),
        count => Err(crate::core::error::EntityError::NonUniqueResult {
            entity_type: entity_type.to_string(),
            count,
        }
        .into()),
    }
}

/// At most one row
pub(crate) fn optional<T>(entity_type: &str, mut rows: Vec<T>) -> DataResult<Option<T>> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(Some(rows.remove(0))),
        count => Err(crate::core::error::EntityError::NonUniqueResult {
            entity_type: entity_type.to_string(),
            count,
        }
        .into()),
    }
}
