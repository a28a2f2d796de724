//! In-memory backend for tests, demos and the default server
//!
//! All tables live behind one `RwLock`, which makes every operation atomic
//! and lets a pessimistic lock hint be honoured by taking the write guard.

use crate::core::error::{EntityError, ValidationError};
use crate::core::{
    Auditable, DataError, DataResult, Direction, Entity, LockMode, Page, PageRequest, Probe,
    QueryHints, Slice, Sort, Specification, window_bounds,
};
use crate::entities::{Item, Member, MemberWithTeam, Team};
use crate::repository::{
    CrudRepository, ItemRepository, MemberDto, MemberProjection, MemberRepository, TeamRepository,
    optional, single,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    members: BTreeMap<i64, Member>,
    /// Stored without their member collection
    teams: BTreeMap<i64, Team>,
    items: BTreeMap<String, Item>,
    /// Shared by members and teams
    sequence: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    fn upsert_member(&mut self, mut member: Member) -> DataResult<Member> {
        if let Some(team_id) = member.team_id {
            if !self.teams.contains_key(&team_id) {
                return Err(EntityError::TransientReference {
                    entity_type: "member".to_string(),
                    target_type: "team".to_string(),
                    target_id: team_id.to_string(),
                }
                .into());
            }
        }

        let now = Utc::now();
        let id = match member.id {
            None => {
                let id = self.next_id();
                member.id = Some(id);
                member.mark_created(now);
                id
            }
            Some(id) => {
                let stored = self
                    .members
                    .get(&id)
                    .ok_or_else(|| DataError::not_found("member", id))?;
                member.created_date = stored.created_date;
                member.mark_modified(now);
                id
            }
        };

        self.members.insert(id, member.clone());
        Ok(member)
    }

    fn upsert_team(&mut self, mut team: Team) -> DataResult<Team> {
        // Check every cascaded row before writing anything
        if let Some(missing) = team
            .members
            .iter()
            .filter_map(|m| m.id)
            .find(|id| !self.members.contains_key(id))
        {
            return Err(DataError::not_found("member", missing));
        }

        let id = match team.id {
            None => self.next_id(),
            Some(id) if self.teams.contains_key(&id) => id,
            Some(id) => return Err(DataError::not_found("team", id)),
        };
        team.id = Some(id);
        self.teams.insert(id, team.detached());

        let members = std::mem::take(&mut team.members);
        for mut member in members {
            member.team_id = Some(id);
            team.members.push(self.upsert_member(member)?);
        }
        Ok(team)
    }

    fn remove_team(&mut self, id: i64) {
        if self.teams.remove(&id).is_some() {
            self.members.retain(|_, m| m.team_id != Some(id));
        }
    }

    fn with_members(&self, team: &Team) -> Team {
        let mut team = team.clone();
        team.members = self
            .members
            .values()
            .filter(|m| m.team_id == team.id)
            .cloned()
            .collect();
        team
    }

    fn join(&self, member: &Member) -> MemberWithTeam {
        MemberWithTeam {
            member: member.clone(),
            team: member
                .team_id
                .and_then(|id| self.teams.get(&id))
                .cloned(),
        }
    }

    fn joined<F>(&self, filter: F) -> Vec<MemberWithTeam>
    where
        F: Fn(&Member) -> bool,
    {
        self.members
            .values()
            .filter(|m| filter(m))
            .map(|m| self.join(m))
            .collect()
    }

    fn members_where<F>(&self, filter: F) -> Vec<Member>
    where
        F: Fn(&Member) -> bool,
    {
        self.members.values().filter(|m| filter(m)).cloned().collect()
    }
}

fn sorted<T: Probe>(
    mut rows: Vec<T>,
    sort: &Sort,
    entity_type: &str,
    allowed: &[&str],
) -> DataResult<Vec<T>> {
    sort.validate(entity_type, allowed)?;
    sort.apply(&mut rows);
    Ok(rows)
}

fn paged<T: Probe>(
    rows: Vec<T>,
    request: &PageRequest,
    entity_type: &str,
    allowed: &[&str],
) -> DataResult<Page<T>> {
    request.validate()?;
    let rows = sorted(rows, request.sort(), entity_type, allowed)?;
    Ok(Page::from_all(rows, request))
}

/// In-memory store implementing every repository contract
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> DataResult<RwLockReadGuard<'_, Tables>> {
        Ok(self.tables.read()?)
    }

    fn write(&self) -> DataResult<RwLockWriteGuard<'_, Tables>> {
        Ok(self.tables.write()?)
    }

    /// Any pessimistic lock holds the exclusive guard for the whole read
    fn members_by_username_hinted(
        &self,
        username: &str,
        hints: QueryHints,
    ) -> DataResult<Vec<Member>> {
        let filter = |m: &Member| m.username == username;
        if hints.lock == LockMode::None {
            return Ok(self.read()?.members_where(filter));
        }
        let tables = self.write()?;
        tracing::debug!(username, lock = ?hints.lock, "Reading members under write lock");
        Ok(tables.members_where(filter))
    }
}

#[async_trait]
impl CrudRepository<Member> for InMemoryStore {
    async fn save(&self, member: Member) -> DataResult<Member> {
        let saved = self.write()?.upsert_member(member)?;
        tracing::debug!(member_id = ?saved.id, "Saved member");
        Ok(saved)
    }

    async fn find_by_id(&self, id: &i64) -> DataResult<Option<Member>> {
        Ok(self.read()?.members.get(id).cloned())
    }

    async fn find_all(&self) -> DataResult<Vec<Member>> {
        Ok(self.read()?.members.values().cloned().collect())
    }

    async fn find_all_sorted(&self, sort: &Sort) -> DataResult<Vec<Member>> {
        let rows = self.read()?.joined(|_| true);
        let rows = sorted(rows, sort, "member", Member::PROPERTIES)?;
        Ok(rows.into_iter().map(|r| r.member).collect())
    }

    async fn find_all_paged(&self, request: &PageRequest) -> DataResult<Page<Member>> {
        let rows = self.read()?.joined(|_| true);
        Ok(paged(rows, request, "member", Member::PROPERTIES)?.map(|r| r.member))
    }

    async fn count(&self) -> DataResult<u64> {
        Ok(self.read()?.members.len() as u64)
    }

    async fn delete_by_id(&self, id: &i64) -> DataResult<()> {
        if self.write()?.members.remove(id).is_some() {
            tracing::debug!(member_id = id, "Deleted member");
        }
        Ok(())
    }

    async fn delete_all(&self) -> DataResult<()> {
        self.write()?.members.clear();
        Ok(())
    }
}

#[async_trait]
impl MemberRepository for InMemoryStore {
    async fn find_by_username_and_age_greater_than(
        &self,
        username: &str,
        age: i32,
    ) -> DataResult<Vec<Member>> {
        Ok(self
            .read()?
            .members_where(|m| m.username == username && m.age > age))
    }

    async fn find_by_username(&self, username: &str) -> DataResult<Vec<Member>> {
        Ok(self.read()?.members_where(|m| m.username == username))
    }

    async fn find_user(&self, username: &str, age: i32) -> DataResult<Vec<Member>> {
        Ok(self
            .read()?
            .members_where(|m| m.username == username && m.age == age))
    }

    async fn find_username_list(&self) -> DataResult<Vec<String>> {
        Ok(self
            .read()?
            .members
            .values()
            .map(|m| m.username.clone())
            .collect())
    }

    async fn find_member_dto(&self) -> DataResult<Vec<MemberDto>> {
        Ok(self
            .read()?
            .joined(|m| m.team_id.is_some())
            .iter()
            .filter(|r| r.team.is_some())
            .filter_map(MemberDto::from_row)
            .collect())
    }

    async fn find_by_names(&self, names: &[String]) -> DataResult<Vec<Member>> {
        Ok(self.read()?.members_where(|m| names.contains(&m.username)))
    }

    async fn find_list_by_username(&self, username: &str) -> DataResult<Vec<Member>> {
        self.find_by_username(username).await
    }

    async fn find_member_by_username(&self, username: &str) -> DataResult<Member> {
        let rows = self.read()?.members_where(|m| m.username == username);
        single("member", username, rows)
    }

    async fn find_optional_by_username(&self, username: &str) -> DataResult<Option<Member>> {
        let rows = self.read()?.members_where(|m| m.username == username);
        optional("member", rows)
    }

    async fn find_by_age(&self, age: i32, request: &PageRequest) -> DataResult<Page<Member>> {
        let rows = self.read()?.joined(|m| m.age == age);
        Ok(paged(rows, request, "member", Member::PROPERTIES)?.map(|r| r.member))
    }

    async fn find_slice_by_age(
        &self,
        age: i32,
        request: &PageRequest,
    ) -> DataResult<Slice<Member>> {
        request.validate()?;
        let rows = self.read()?.joined(|m| m.age == age);
        let rows = sorted(rows, request.sort(), "member", Member::PROPERTIES)?;
        let lookahead = request.page_size().saturating_add(1);
        let window = rows
            .into_iter()
            .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(lookahead).unwrap_or(usize::MAX))
            .map(|r| r.member)
            .collect();
        Ok(Slice::from_overfetch(window, request))
    }

    async fn find_by_page(&self, age: i32, offset: u64, limit: u64) -> DataResult<Vec<Member>> {
        let (offset, limit) = window_bounds(offset, limit)?;
        let mut rows = self.read()?.members_where(|m| m.age == age);
        Sort::by(Direction::Desc, ["username"]).apply(&mut rows);
        Ok(rows
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }

    async fn total_count(&self, age: i32) -> DataResult<u64> {
        Ok(self.read()?.members.values().filter(|m| m.age == age).count() as u64)
    }

    async fn bulk_age_plus(&self, age: i32) -> DataResult<u64> {
        let mut tables = self.write()?;
        let mut affected = 0;
        for member in tables.members.values_mut().filter(|m| m.age >= age) {
            member.age += 1;
            affected += 1;
        }
        tracing::debug!(affected, "Bulk age update");
        Ok(affected)
    }

    async fn find_member_fetch_join(&self) -> DataResult<Vec<MemberWithTeam>> {
        Ok(self.read()?.joined(|_| true))
    }

    async fn find_entity_graph_by_username(
        &self,
        username: &str,
    ) -> DataResult<Vec<MemberWithTeam>> {
        Ok(self.read()?.joined(|m| m.username == username))
    }

    async fn find_read_only_by_username(&self, username: &str) -> DataResult<Option<Member>> {
        let rows = self.members_by_username_hinted(username, QueryHints::read_only())?;
        optional("member", rows)
    }

    async fn find_lock_by_username(&self, username: &str) -> DataResult<Vec<Member>> {
        self.members_by_username_hinted(username, QueryHints::lock(LockMode::PessimisticWrite))
    }

    async fn find_all_matching(&self, spec: &Specification<Member>) -> DataResult<Vec<Member>> {
        spec.validate("member", Member::PROPERTIES)?;
        Ok(self
            .read()?
            .joined(|_| true)
            .into_iter()
            .filter(|r| spec.is_satisfied_by(r))
            .map(|r| r.member)
            .collect())
    }

    async fn find_with_team_by_username(
        &self,
        username: &str,
    ) -> DataResult<Vec<MemberWithTeam>> {
        Ok(self.read()?.joined(|m| m.username == username))
    }

    async fn find_by_native_query(&self, username: &str) -> DataResult<Option<Member>> {
        self.find_optional_by_username(username).await
    }

    async fn find_by_native_projection(
        &self,
        request: &PageRequest,
    ) -> DataResult<Page<MemberProjection>> {
        let rows = self.read()?.joined(|_| true);
        let page = paged(rows, request, "member", Member::PROPERTIES)?;
        Ok(page.map(|r| MemberProjection {
            id: r.member.id.unwrap_or_default(),
            team_name: r.team_name().map(str::to_string),
            username: r.member.username,
        }))
    }
}

#[async_trait]
impl CrudRepository<Team> for InMemoryStore {
    async fn save(&self, team: Team) -> DataResult<Team> {
        let saved = self.write()?.upsert_team(team)?;
        tracing::debug!(
            team_id = ?saved.id,
            members = saved.members.len(),
            "Saved team"
        );
        Ok(saved)
    }

    async fn find_by_id(&self, id: &i64) -> DataResult<Option<Team>> {
        let tables = self.read()?;
        Ok(tables.teams.get(id).map(|t| tables.with_members(t)))
    }

    async fn find_all(&self) -> DataResult<Vec<Team>> {
        let tables = self.read()?;
        Ok(tables.teams.values().map(|t| tables.with_members(t)).collect())
    }

    async fn find_all_sorted(&self, sort: &Sort) -> DataResult<Vec<Team>> {
        let teams = CrudRepository::<Team>::find_all(self).await?;
        sorted(teams, sort, "team", Team::PROPERTIES)
    }

    async fn find_all_paged(&self, request: &PageRequest) -> DataResult<Page<Team>> {
        let teams = CrudRepository::<Team>::find_all(self).await?;
        paged(teams, request, "team", Team::PROPERTIES)
    }

    async fn count(&self) -> DataResult<u64> {
        Ok(self.read()?.teams.len() as u64)
    }

    async fn delete_by_id(&self, id: &i64) -> DataResult<()> {
        self.write()?.remove_team(*id);
        tracing::debug!(team_id = id, "Deleted team and its members");
        Ok(())
    }

    async fn delete_all(&self) -> DataResult<()> {
        let mut tables = self.write()?;
        tables.teams.clear();
        tables.members.retain(|_, m| m.team_id.is_none());
        Ok(())
    }
}

#[async_trait]
impl TeamRepository for InMemoryStore {
    async fn find_by_name(&self, name: &str) -> DataResult<Vec<Team>> {
        let tables = self.read()?;
        Ok(tables
            .teams
            .values()
            .filter(|t| t.name == name)
            .map(|t| tables.with_members(t))
            .collect())
    }
}

#[async_trait]
impl CrudRepository<Item> for InMemoryStore {
    async fn save(&self, mut item: Item) -> DataResult<Item> {
        if item.id.trim().is_empty() {
            return Err(ValidationError::FieldError {
                field: "id".to_string(),
                message: "item id must be assigned before saving".to_string(),
            }
            .into());
        }

        let mut tables = self.write()?;
        let exists = tables.items.contains_key(&item.id);
        if item.is_new() {
            if exists {
                return Err(EntityError::AlreadyExists {
                    entity_type: "item".to_string(),
                    id: item.id,
                }
                .into());
            }
            item.mark_created(Utc::now());
        } else if !exists {
            return Err(DataError::not_found("item", &item.id));
        }

        tables.items.insert(item.id.clone(), item.clone());
        tracing::debug!(item_id = %item.id, "Saved item");
        Ok(item)
    }

    async fn find_by_id(&self, id: &String) -> DataResult<Option<Item>> {
        Ok(self.read()?.items.get(id).cloned())
    }

    async fn find_all(&self) -> DataResult<Vec<Item>> {
        Ok(self.read()?.items.values().cloned().collect())
    }

    async fn find_all_sorted(&self, sort: &Sort) -> DataResult<Vec<Item>> {
        let items = CrudRepository::<Item>::find_all(self).await?;
        sorted(items, sort, "item", Item::PROPERTIES)
    }

    async fn find_all_paged(&self, request: &PageRequest) -> DataResult<Page<Item>> {
        let items = CrudRepository::<Item>::find_all(self).await?;
        paged(items, request, "item", Item::PROPERTIES)
    }

    async fn count(&self) -> DataResult<u64> {
        Ok(self.read()?.items.len() as u64)
    }

    async fn delete_by_id(&self, id: &String) -> DataResult<()> {
        self.write()?.items.remove(id);
        Ok(())
    }

    async fn delete_all(&self) -> DataResult<()> {
        self.write()?.items.clear();
        Ok(())
    }
}

impl ItemRepository for InMemoryStore {}
