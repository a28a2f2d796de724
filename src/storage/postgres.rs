//! PostgreSQL storage backend using sqlx.
//!
//! Provides `PostgresStore`, implementing every repository contract on top
//! of a `sqlx::PgPool`.
//!
//! # Feature flag
//!
//! This module is gated behind the `postgres` feature flag:
//! ```toml
//! [dependencies]
//! datamap-rs = { version = "0.1", features = ["postgres"] }
//! ```
//!
//! # Schema
//!
//! Tables `team`, `member` and `item` are created by the migrations in
//! `migrations/`. `member.team_id` references `team.id` with
//! `ON DELETE CASCADE`, so deleting a team removes its members.
//!
//! Specifications and sorts are compiled to SQL through a whitelisted
//! column map; every value is bound, never interpolated.

use crate::core::error::{EntityError, StorageError, ValidationError};
use crate::core::specification::Criterion;
use crate::core::{
    DataError, DataResult, Direction, Entity, FieldValue, LockMode, Page, PageRequest, QueryHints,
    Slice, Sort, Specification, window_bounds,
};
use crate::entities::{Item, Member, MemberWithTeam, Team};
use crate::repository::{
    CrudRepository, ItemRepository, MemberDto, MemberProjection, MemberRepository, TeamRepository,
    optional, single,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgExecutor, PgPoolOptions};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Row shapes
// ---------------------------------------------------------------------------

type MemberRow = (
    i64,
    String,
    i32,
    Option<i64>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
);

/// Member columns followed by the joined team name
type JoinedRow = (
    i64,
    String,
    i32,
    Option<i64>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    Option<String>,
);

const RETURNING_MEMBER: &str =
    "RETURNING id, username, age, team_id, created_date, last_modified_date";

const MEMBER_SELECT: &str = "SELECT m.id, m.username, m.age, m.team_id, m.created_date, m.last_modified_date FROM member m";

const JOINED_SELECT: &str = "SELECT m.id, m.username, m.age, m.team_id, m.created_date, m.last_modified_date, t.name \
     FROM member m LEFT JOIN team t ON t.id = m.team_id";

const JOINED_FROM: &str = "FROM member m LEFT JOIN team t ON t.id = m.team_id";

fn member_from_row(row: MemberRow) -> Member {
    let (id, username, age, team_id, created_date, last_modified_date) = row;
    Member {
        id: Some(id),
        username,
        age,
        team_id,
        created_date,
        last_modified_date,
    }
}

fn joined_from_row(row: JoinedRow) -> MemberWithTeam {
    let (id, username, age, team_id, created_date, last_modified_date, team_name) = row;
    let team = match (team_id, team_name) {
        (Some(team_id), Some(name)) => Some(Team {
            id: Some(team_id),
            name,
            members: Vec::new(),
        }),
        _ => None,
    };
    MemberWithTeam {
        member: member_from_row((id, username, age, team_id, created_date, last_modified_date)),
        team,
    }
}

// ---------------------------------------------------------------------------
// Criterion and sort compilation
// ---------------------------------------------------------------------------

/// Maps a property path to a qualified SQL column
type ColumnMap = fn(&str) -> Option<&'static str>;

fn member_column(path: &str) -> Option<&'static str> {
    match path {
        "id" => Some("m.id"),
        "username" => Some("m.username"),
        "age" => Some("m.age"),
        "team.id" => Some("m.team_id"),
        "team.name" => Some("t.name"),
        "created_date" => Some("m.created_date"),
        "last_modified_date" => Some("m.last_modified_date"),
        _ => None,
    }
}

fn team_column(path: &str) -> Option<&'static str> {
    match path {
        "id" => Some("t.id"),
        "name" => Some("t.name"),
        _ => None,
    }
}

fn item_column(path: &str) -> Option<&'static str> {
    match path {
        "id" => Some("i.id"),
        "created_datetime" => Some("i.created_datetime"),
        _ => None,
    }
}

fn resolve(columns: ColumnMap, entity_type: &str, path: &str) -> DataResult<&'static str> {
    columns(path).ok_or_else(|| {
        ValidationError::UnknownProperty {
            entity_type: entity_type.to_string(),
            property: path.to_string(),
        }
        .into()
    })
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &FieldValue) {
    match value {
        FieldValue::String(s) => {
            qb.push_bind(s.clone());
        }
        FieldValue::Integer(n) => {
            qb.push_bind(*n);
        }
        FieldValue::DateTime(dt) => {
            qb.push_bind(*dt);
        }
        FieldValue::Null => {
            qb.push("NULL");
        }
    }
}

fn push_criterion(
    qb: &mut QueryBuilder<'_, Postgres>,
    criterion: &Criterion,
    columns: ColumnMap,
    entity_type: &str,
) -> DataResult<()> {
    match criterion {
        Criterion::All => {
            qb.push("TRUE");
        }
        Criterion::Compare { path, op, value } => {
            let column = resolve(columns, entity_type, path)?;
            qb.push(column).push(" ").push(op.sql()).push(" ");
            push_value(qb, value);
        }
        Criterion::Like {
            path,
            pattern,
            ignore_case,
        } => {
            let column = resolve(columns, entity_type, path)?;
            qb.push(column)
                .push(if *ignore_case { " ILIKE " } else { " LIKE " })
                .push_bind(pattern.clone());
        }
        Criterion::In { path, values } => {
            let column = resolve(columns, entity_type, path)?;
            if values.is_empty() {
                qb.push("FALSE");
                return Ok(());
            }
            qb.push(column).push(" IN (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_value(qb, value);
            }
            qb.push(")");
        }
        Criterion::IsNull { path } => {
            let column = resolve(columns, entity_type, path)?;
            qb.push(column).push(" IS NULL");
        }
        Criterion::And(a, b) => {
            qb.push("(");
            push_criterion(qb, a, columns, entity_type)?;
            qb.push(" AND ");
            push_criterion(qb, b, columns, entity_type)?;
            qb.push(")");
        }
        Criterion::Or(a, b) => {
            qb.push("(");
            push_criterion(qb, a, columns, entity_type)?;
            qb.push(" OR ");
            push_criterion(qb, b, columns, entity_type)?;
            qb.push(")");
        }
        Criterion::Not(inner) => {
            qb.push("NOT (");
            push_criterion(qb, inner, columns, entity_type)?;
            qb.push(")");
        }
    }
    Ok(())
}

/// `ORDER BY` for `sort`, always ending with `tiebreak` for stable paging
fn push_order_by(
    qb: &mut QueryBuilder<'_, Postgres>,
    sort: &Sort,
    columns: ColumnMap,
    entity_type: &str,
    tiebreak: &str,
) -> DataResult<()> {
    qb.push(" ORDER BY ");
    for order in &sort.orders {
        let column = resolve(columns, entity_type, &order.property)?;
        qb.push(column).push(match order.direction {
            Direction::Asc => " ASC, ",
            Direction::Desc => " DESC, ",
        });
    }
    qb.push(tiebreak);
    Ok(())
}

fn push_window(qb: &mut QueryBuilder<'_, Postgres>, offset: u64, limit: u64) -> DataResult<()> {
    let (offset, limit) = window_bounds(offset, limit)?;
    qb.push(" LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    Ok(())
}

async fn select_by_username(
    tx: &mut Transaction<'_, Postgres>,
    username: &str,
    lock: LockMode,
) -> DataResult<Vec<Member>> {
    let sql = format!(
        "{} WHERE m.username = $1 ORDER BY m.id{}",
        MEMBER_SELECT,
        lock.sql_suffix()
    );
    tracing::debug!(sql = %sql, "Hinted read");

    let rows = sqlx::query_as::<_, MemberRow>(&sql)
        .bind(username)
        .fetch_all(&mut **tx)
        .await?;
    Ok(rows.into_iter().map(member_from_row).collect())
}

// ---------------------------------------------------------------------------
// Shared statements
// ---------------------------------------------------------------------------

async fn upsert_member<'e, E>(executor: E, member: Member) -> DataResult<Member>
where
    E: PgExecutor<'e>,
{
    let now = Utc::now();

    match member.id {
        None => {
            let sql = format!(
                "INSERT INTO member (username, age, team_id, created_date, last_modified_date) \
                 VALUES ($1, $2, $3, $4, $4) {}",
                RETURNING_MEMBER
            );
            let row = sqlx::query_as::<_, MemberRow>(&sql)
                .bind(&member.username)
                .bind(member.age)
                .bind(member.team_id)
                .bind(now)
                .fetch_one(executor)
                .await
                .map_err(|e| transient_team(e, member.team_id))?;
            Ok(member_from_row(row))
        }
        Some(id) => {
            let sql = format!(
                "UPDATE member SET username = $1, age = $2, team_id = $3, last_modified_date = $4 \
                 WHERE id = $5 {}",
                RETURNING_MEMBER
            );
            let row = sqlx::query_as::<_, MemberRow>(&sql)
                .bind(&member.username)
                .bind(member.age)
                .bind(member.team_id)
                .bind(now)
                .bind(id)
                .fetch_optional(executor)
                .await
                .map_err(|e| transient_team(e, member.team_id))?;
            row.map(member_from_row)
                .ok_or_else(|| DataError::not_found("member", id))
        }
    }
}

/// Report a foreign key violation with the offending team id
fn transient_team(err: sqlx::Error, team_id: Option<i64>) -> DataError {
    match DataError::from(err) {
        DataError::Entity(EntityError::TransientReference { .. }) => {
            EntityError::TransientReference {
                entity_type: "member".to_string(),
                target_type: "team".to_string(),
                target_id: team_id.map(|id| id.to_string()).unwrap_or_default(),
            }
            .into()
        }
        other => other,
    }
}

// ---------------------------------------------------------------------------
// PostgresStore
// ---------------------------------------------------------------------------

/// Repository backend backed by PostgreSQL.
///
/// # Example
///
/// ```rust,ignore
/// use datamap::storage::PostgresStore;
///
/// let store = PostgresStore::connect("postgres://localhost/datamap", 5).await?;
/// store.migrate().await?;
/// let repositories = Repositories::from_store(store);
/// ```
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> DataResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| StorageError::ConnectionError {
                backend: "PostgreSQL".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self::new(pool))
    }

    /// Apply the bundled migrations (idempotent)
    pub async fn migrate(&self) -> DataResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError {
                backend: "PostgreSQL".to_string(),
                message: format!("migration failed: {}", e),
            })?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_joined(
        &self,
        filter: &Criterion,
        sort: &Sort,
        window: Option<(u64, u64)>,
    ) -> DataResult<Vec<MemberWithTeam>> {
        let mut qb = QueryBuilder::<Postgres>::new(JOINED_SELECT);
        qb.push(" WHERE ");
        push_criterion(&mut qb, filter, member_column, "member")?;
        push_order_by(&mut qb, sort, member_column, "member", "m.id")?;
        if let Some((offset, limit)) = window {
            push_window(&mut qb, offset, limit)?;
        }
        tracing::debug!(sql = qb.sql(), "Member query");

        let rows = qb
            .build_query_as::<JoinedRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(joined_from_row).collect())
    }

    async fn count_joined(&self, filter: &Criterion) -> DataResult<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) ");
        qb.push(JOINED_FROM).push(" WHERE ");
        push_criterion(&mut qb, filter, member_column, "member")?;

        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    async fn page_joined(
        &self,
        filter: &Criterion,
        request: &PageRequest,
    ) -> DataResult<Page<MemberWithTeam>> {
        request.validate()?;
        let rows = self
            .fetch_joined(
                filter,
                request.sort(),
                Some((request.offset(), request.page_size())),
            )
            .await?;
        let total = self.count_joined(filter).await?;
        Ok(Page::new(rows, request, total))
    }

    /// Members by username inside a transaction shaped by `hints`
    async fn members_by_username_hinted(
        &self,
        username: &str,
        hints: QueryHints,
    ) -> DataResult<Vec<Member>> {
        let mut tx = self.pool.begin().await?;
        if hints.read_only {
            sqlx::query("SET TRANSACTION READ ONLY")
                .execute(&mut *tx)
                .await?;
        }
        let rows = select_by_username(&mut tx, username, hints.lock).await?;
        tx.commit().await?;
        Ok(rows)
    }

    /// Lock members by username inside a caller-held transaction.
    ///
    /// The `FOR UPDATE` locks stay in place until `tx` commits or rolls back,
    /// so writes issued through the same transaction see no concurrent change.
    pub async fn find_lock_by_username_in(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        username: &str,
    ) -> DataResult<Vec<Member>> {
        select_by_username(tx, username, LockMode::PessimisticWrite).await
    }

    async fn members_where(&self, clause: &str, username: &str) -> DataResult<Vec<Member>> {
        let sql = format!("{} WHERE {} ORDER BY m.id", MEMBER_SELECT, clause);
        let rows = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(username)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(member_from_row).collect())
    }

    /// Attach members to already loaded `(id, name)` team rows
    async fn with_members(&self, teams: Vec<(i64, String)>) -> DataResult<Vec<Team>> {
        let ids: Vec<i64> = teams.iter().map(|(id, _)| *id).collect();
        let sql = format!("{} WHERE m.team_id = ANY($1) ORDER BY m.id", MEMBER_SELECT);
        let rows = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

        let mut by_team: BTreeMap<i64, Vec<Member>> = BTreeMap::new();
        for member in rows.into_iter().map(member_from_row) {
            if let Some(team_id) = member.team_id {
                by_team.entry(team_id).or_default().push(member);
            }
        }

        Ok(teams
            .into_iter()
            .map(|(id, name)| Team {
                id: Some(id),
                name,
                members: by_team.remove(&id).unwrap_or_default(),
            })
            .collect())
    }

    async fn fetch_teams(
        &self,
        filter: &Criterion,
        sort: &Sort,
        window: Option<(u64, u64)>,
    ) -> DataResult<Vec<Team>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT t.id, t.name FROM team t WHERE ");
        push_criterion(&mut qb, filter, team_column, "team")?;
        push_order_by(&mut qb, sort, team_column, "team", "t.id")?;
        if let Some((offset, limit)) = window {
            push_window(&mut qb, offset, limit)?;
        }

        let rows = qb
            .build_query_as::<(i64, String)>()
            .fetch_all(&self.pool)
            .await?;
        self.with_members(rows).await
    }

    async fn fetch_items(
        &self,
        sort: &Sort,
        window: Option<(u64, u64)>,
    ) -> DataResult<Vec<Item>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT i.id, i.created_datetime FROM item i");
        push_order_by(&mut qb, sort, item_column, "item", "i.id")?;
        if let Some((offset, limit)) = window {
            push_window(&mut qb, offset, limit)?;
        }

        let rows = qb
            .build_query_as::<(String, DateTime<Utc>)>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, created)| Item {
                id,
                created_datetime: Some(created),
            })
            .collect())
    }
}

#[async_trait]
impl CrudRepository<Member> for PostgresStore {
    async fn save(&self, member: Member) -> DataResult<Member> {
        let saved = upsert_member(&self.pool, member).await?;
        tracing::debug!(member_id = ?saved.id, "Saved member");
        Ok(saved)
    }

    async fn find_by_id(&self, id: &i64) -> DataResult<Option<Member>> {
        let sql = format!("{} WHERE m.id = $1", MEMBER_SELECT);
        let row = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(member_from_row))
    }

    async fn find_all(&self) -> DataResult<Vec<Member>> {
        let sql = format!("{} ORDER BY m.id", MEMBER_SELECT);
        let rows = sqlx::query_as::<_, MemberRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(member_from_row).collect())
    }

    async fn find_all_sorted(&self, sort: &Sort) -> DataResult<Vec<Member>> {
        let rows = self.fetch_joined(&Criterion::All, sort, None).await?;
        Ok(rows.into_iter().map(|r| r.member).collect())
    }

    async fn find_all_paged(&self, request: &PageRequest) -> DataResult<Page<Member>> {
        Ok(self
            .page_joined(&Criterion::All, request)
            .await?
            .map(|r| r.member))
    }

    async fn count(&self) -> DataResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM member")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn delete_by_id(&self, id: &i64) -> DataResult<()> {
        sqlx::query("DELETE FROM member WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> DataResult<()> {
        sqlx::query("DELETE FROM member")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MemberRepository for PostgresStore {
    async fn find_by_username_and_age_greater_than(
        &self,
        username: &str,
        age: i32,
    ) -> DataResult<Vec<Member>> {
        let sql = format!(
            "{} WHERE m.username = $1 AND m.age > $2 ORDER BY m.id",
            MEMBER_SELECT
        );
        let rows = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(username)
            .bind(age)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(member_from_row).collect())
    }

    async fn find_by_username(&self, username: &str) -> DataResult<Vec<Member>> {
        self.members_where("m.username = $1", username).await
    }

    async fn find_user(&self, username: &str, age: i32) -> DataResult<Vec<Member>> {
        let sql = format!(
            "{} WHERE m.username = $1 AND m.age = $2 ORDER BY m.id",
            MEMBER_SELECT
        );
        let rows = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(username)
            .bind(age)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(member_from_row).collect())
    }

    async fn find_username_list(&self) -> DataResult<Vec<String>> {
        Ok(
            sqlx::query_scalar::<_, String>("SELECT m.username FROM member m ORDER BY m.id")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn find_member_dto(&self) -> DataResult<Vec<MemberDto>> {
        let rows = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT m.id, m.username, t.name FROM member m JOIN team t ON t.id = m.team_id ORDER BY m.id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, username, team_name)| MemberDto {
                id,
                username,
                team_name: Some(team_name),
            })
            .collect())
    }

    async fn find_by_names(&self, names: &[String]) -> DataResult<Vec<Member>> {
        let sql = format!("{} WHERE m.username = ANY($1) ORDER BY m.id", MEMBER_SELECT);
        let rows = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(names.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(member_from_row).collect())
    }

    async fn find_list_by_username(&self, username: &str) -> DataResult<Vec<Member>> {
        self.members_where("m.username = $1", username).await
    }

    async fn find_member_by_username(&self, username: &str) -> DataResult<Member> {
        let rows = self.members_where("m.username = $1", username).await?;
        single("member", username, rows)
    }

    async fn find_optional_by_username(&self, username: &str) -> DataResult<Option<Member>> {
        let rows = self.members_where("m.username = $1", username).await?;
        optional("member", rows)
    }

    async fn find_by_age(&self, age: i32, request: &PageRequest) -> DataResult<Page<Member>> {
        let filter = Specification::<Member>::eq("age", age);
        Ok(self
            .page_joined(filter.criterion(), request)
            .await?
            .map(|r| r.member))
    }

    async fn find_slice_by_age(
        &self,
        age: i32,
        request: &PageRequest,
    ) -> DataResult<Slice<Member>> {
        request.validate()?;
        let filter = Specification::<Member>::eq("age", age);
        let rows = self
            .fetch_joined(
                filter.criterion(),
                request.sort(),
                Some((request.offset(), request.page_size().saturating_add(1))),
            )
            .await?;
        Ok(Slice::from_overfetch(
            rows.into_iter().map(|r| r.member).collect(),
            request,
        ))
    }

    async fn find_by_page(&self, age: i32, offset: u64, limit: u64) -> DataResult<Vec<Member>> {
        let (offset, limit) = window_bounds(offset, limit)?;
        let sql = format!(
            "{} WHERE m.age = $1 ORDER BY m.username DESC, m.id OFFSET $2 LIMIT $3",
            MEMBER_SELECT
        );
        let rows = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(age)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(member_from_row).collect())
    }

    async fn total_count(&self, age: i32) -> DataResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM member WHERE age = $1")
            .bind(age)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn bulk_age_plus(&self, age: i32) -> DataResult<u64> {
        let result = sqlx::query("UPDATE member SET age = age + 1 WHERE age >= $1")
            .bind(age)
            .execute(&self.pool)
            .await?;
        tracing::debug!(affected = result.rows_affected(), "Bulk age update");
        Ok(result.rows_affected())
    }

    async fn find_member_fetch_join(&self) -> DataResult<Vec<MemberWithTeam>> {
        self.fetch_joined(&Criterion::All, &Sort::unsorted(), None)
            .await
    }

    async fn find_entity_graph_by_username(
        &self,
        username: &str,
    ) -> DataResult<Vec<MemberWithTeam>> {
        self.find_with_team_by_username(username).await
    }

    async fn find_read_only_by_username(&self, username: &str) -> DataResult<Option<Member>> {
        let rows = self
            .members_by_username_hinted(username, QueryHints::read_only())
            .await?;
        optional("member", rows)
    }

    async fn find_lock_by_username(&self, username: &str) -> DataResult<Vec<Member>> {
        self.members_by_username_hinted(username, QueryHints::lock(LockMode::PessimisticWrite))
            .await
    }

    async fn find_all_matching(&self, spec: &Specification<Member>) -> DataResult<Vec<Member>> {
        spec.validate("member", Member::PROPERTIES)?;
        let rows = self
            .fetch_joined(spec.criterion(), &Sort::unsorted(), None)
            .await?;
        Ok(rows.into_iter().map(|r| r.member).collect())
    }

    async fn find_with_team_by_username(
        &self,
        username: &str,
    ) -> DataResult<Vec<MemberWithTeam>> {
        let filter = Specification::<Member>::eq("username", username);
        self.fetch_joined(filter.criterion(), &Sort::unsorted(), None)
            .await
    }

    async fn find_by_native_query(&self, username: &str) -> DataResult<Option<Member>> {
        let rows = sqlx::query_as::<_, MemberRow>("SELECT * FROM member WHERE username = $1")
            .bind(username)
            .fetch_all(&self.pool)
            .await?;
        optional("member", rows.into_iter().map(member_from_row).collect())
    }

    async fn find_by_native_projection(
        &self,
        request: &PageRequest,
    ) -> DataResult<Page<MemberProjection>> {
        request.validate()?;
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT m.id, m.username, t.name AS team_name FROM member m LEFT JOIN team t ON t.id = m.team_id",
        );
        push_order_by(&mut qb, request.sort(), member_column, "member", "m.id")?;
        push_window(&mut qb, request.offset(), request.page_size())?;

        let rows = qb
            .build_query_as::<(i64, String, Option<String>)>()
            .fetch_all(&self.pool)
            .await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM member")
            .fetch_one(&self.pool)
            .await?;

        let content = rows
            .into_iter()
            .map(|(id, username, team_name)| MemberProjection {
                id,
                username,
                team_name,
            })
            .collect();
        Ok(Page::new(content, request, total as u64))
    }
}

#[async_trait]
impl CrudRepository<Team> for PostgresStore {
    async fn save(&self, mut team: Team) -> DataResult<Team> {
        let mut tx = self.pool.begin().await?;

        let id = match team.id {
            None => {
                sqlx::query_scalar::<_, i64>("INSERT INTO team (name) VALUES ($1) RETURNING id")
                    .bind(&team.name)
                    .fetch_one(&mut *tx)
                    .await?
            }
            Some(id) => sqlx::query_scalar::<_, i64>(
                "UPDATE team SET name = $1 WHERE id = $2 RETURNING id",
            )
            .bind(&team.name)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DataError::not_found("team", id))?,
        };
        team.id = Some(id);

        let members = std::mem::take(&mut team.members);
        for mut member in members {
            member.team_id = Some(id);
            team.members.push(upsert_member(&mut *tx, member).await?);
        }
        tx.commit().await?;

        tracing::debug!(team_id = id, members = team.members.len(), "Saved team");
        Ok(team)
    }

    async fn find_by_id(&self, id: &i64) -> DataResult<Option<Team>> {
        let filter = Specification::<Team>::eq("id", *id);
        let mut teams = self
            .fetch_teams(filter.criterion(), &Sort::unsorted(), None)
            .await?;
        Ok(teams.pop())
    }

    async fn find_all(&self) -> DataResult<Vec<Team>> {
        self.fetch_teams(&Criterion::All, &Sort::unsorted(), None)
            .await
    }

    async fn find_all_sorted(&self, sort: &Sort) -> DataResult<Vec<Team>> {
        self.fetch_teams(&Criterion::All, sort, None).await
    }

    async fn find_all_paged(&self, request: &PageRequest) -> DataResult<Page<Team>> {
        request.validate()?;
        let teams = self
            .fetch_teams(
                &Criterion::All,
                request.sort(),
                Some((request.offset(), request.page_size())),
            )
            .await?;
        let total = CrudRepository::<Team>::count(self).await?;
        Ok(Page::new(teams, request, total))
    }

    async fn count(&self) -> DataResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM team")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn delete_by_id(&self, id: &i64) -> DataResult<()> {
        sqlx::query("DELETE FROM team WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        tracing::debug!(team_id = id, "Deleted team and its members");
        Ok(())
    }

    async fn delete_all(&self) -> DataResult<()> {
        sqlx::query("DELETE FROM team").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl TeamRepository for PostgresStore {
    async fn find_by_name(&self, name: &str) -> DataResult<Vec<Team>> {
        let filter = Specification::<Team>::eq("name", name);
        self.fetch_teams(filter.criterion(), &Sort::unsorted(), None)
            .await
    }
}

#[async_trait]
impl CrudRepository<Item> for PostgresStore {
    async fn save(&self, item: Item) -> DataResult<Item> {
        if item.id.trim().is_empty() {
            return Err(ValidationError::FieldError {
                field: "id".to_string(),
                message: "item id must be assigned before saving".to_string(),
            }
            .into());
        }

        let row = if item.is_new() {
            sqlx::query_as::<_, (String, DateTime<Utc>)>(
                "INSERT INTO item (id, created_datetime) VALUES ($1, $2) \
                 ON CONFLICT (id) DO NOTHING RETURNING id, created_datetime",
            )
            .bind(&item.id)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| EntityError::AlreadyExists {
                entity_type: "item".to_string(),
                id: item.id.clone(),
            })?
        } else {
            sqlx::query_as::<_, (String, DateTime<Utc>)>(
                "SELECT id, created_datetime FROM item WHERE id = $1",
            )
            .bind(&item.id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DataError::not_found("item", &item.id))?
        };

        tracing::debug!(item_id = %row.0, "Saved item");
        Ok(Item {
            id: row.0,
            created_datetime: Some(row.1),
        })
    }

    async fn find_by_id(&self, id: &String) -> DataResult<Option<Item>> {
        let row = sqlx::query_as::<_, (String, DateTime<Utc>)>(
            "SELECT id, created_datetime FROM item WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, created)| Item {
            id,
            created_datetime: Some(created),
        }))
    }

    async fn find_all(&self) -> DataResult<Vec<Item>> {
        self.fetch_items(&Sort::unsorted(), None).await
    }

    async fn find_all_sorted(&self, sort: &Sort) -> DataResult<Vec<Item>> {
        self.fetch_items(sort, None).await
    }

    async fn find_all_paged(&self, request: &PageRequest) -> DataResult<Page<Item>> {
        request.validate()?;
        let items = self
            .fetch_items(
                request.sort(),
                Some((request.offset(), request.page_size())),
            )
            .await?;
        let total = CrudRepository::<Item>::count(self).await?;
        Ok(Page::new(items, request, total))
    }

    async fn count(&self) -> DataResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM item")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn delete_by_id(&self, id: &String) -> DataResult<()> {
        sqlx::query("DELETE FROM item WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> DataResult<()> {
        sqlx::query("DELETE FROM item").execute(&self.pool).await?;
        Ok(())
    }
}

impl ItemRepository for PostgresStore {}
