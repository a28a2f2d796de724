//! HTTP handlers for members, teams and items

use super::extractors::{MemberParam, ValidatedJson, parse_id};
use super::state::AppState;
use crate::core::error::RequestError;
use crate::core::{DataError, DataResult, Page, PageParams};
use crate::entities::{Item, Member, Team};
use crate::repository::{CrudRepository, MemberDto};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use validator::Validate;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MemberRequest {
    #[validate(length(min = 1, max = 255))]
    pub username: String,

    #[serde(default)]
    #[validate(range(min = 0, max = 200))]
    pub age: i32,

    #[serde(default)]
    pub team_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TeamMemberRequest {
    #[validate(length(min = 1, max = 255))]
    pub username: String,

    #[serde(default)]
    #[validate(range(min = 0, max = 200))]
    pub age: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTeamRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    /// Created together with the team
    #[serde(default)]
    #[validate(nested)]
    pub members: Vec<TeamMemberRequest>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    pub username: String,
    pub min_age: Option<i32>,
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

/// `GET /members/v1/{id}`: username of the member
pub async fn member_username_v1(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> DataResult<String> {
    let id = parse_id(&raw_id)?;
    let member = state
        .repositories
        .members
        .find_by_id(&id)
        .await?
        .ok_or_else(|| DataError::not_found("member", id))?;
    Ok(member.username)
}

/// `GET /members/v2/{id}`: same as v1, with the member resolved by the extractor
pub async fn member_username_v2(MemberParam(member): MemberParam) -> String {
    member.username
}

pub async fn list_members(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> DataResult<Json<Page<MemberDto>>> {
    let request = params.to_page_request(state.paging.default_size, state.paging.max_size)?;
    let page = state
        .repositories
        .members
        .find_by_native_projection(&request)
        .await?;
    Ok(Json(page.map(MemberDto::from)))
}

pub async fn create_member(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<MemberRequest>,
) -> DataResult<impl IntoResponse> {
    let mut member = Member::with_age(body.username, body.age);
    member.team_id = body.team_id;

    let saved = state.repositories.members.save(member).await?;
    tracing::info!(member_id = ?saved.id, "Member created");
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn get_member(MemberParam(member): MemberParam) -> Json<Member> {
    Json(member)
}

pub async fn update_member(
    State(state): State<AppState>,
    MemberParam(mut member): MemberParam,
    ValidatedJson(body): ValidatedJson<MemberRequest>,
) -> DataResult<Json<Member>> {
    member.username = body.username;
    member.age = body.age;
    member.team_id = body.team_id;

    let saved = state.repositories.members.save(member).await?;
    Ok(Json(saved))
}

pub async fn delete_member(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> DataResult<StatusCode> {
    let id = parse_id(&raw_id)?;
    let members = &state.repositories.members;
    if !members.exists_by_id(&id).await? {
        return Err(DataError::not_found("member", id));
    }
    members.delete_by_id(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /members/search?username=..[&min_age=..]`
pub async fn search_members(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> DataResult<Json<Vec<Member>>> {
    let members = &state.repositories.members;
    let found = match params.min_age {
        Some(age) => {
            members
                .find_by_username_and_age_greater_than(&params.username, age)
                .await?
        }
        None => members.find_by_username(&params.username).await?,
    };
    Ok(Json(found))
}

pub async fn members_by_age(
    State(state): State<AppState>,
    Path(raw_age): Path<String>,
    Query(params): Query<PageParams>,
) -> DataResult<Json<Page<Member>>> {
    let age = raw_age
        .parse::<i32>()
        .map_err(|_| RequestError::InvalidQuery {
            name: "age".to_string(),
            message: format!("'{}' is not a number", raw_age),
        })?;
    let request = params.to_page_request(state.paging.default_size, state.paging.max_size)?;
    let page = state
        .repositories
        .members
        .find_by_age(age, &request)
        .await?;
    Ok(Json(page))
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

pub async fn create_team(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<CreateTeamRequest>,
) -> DataResult<impl IntoResponse> {
    let mut team = Team::new(body.name);
    for member in body.members {
        Member::with_team(member.username, member.age, &mut team);
    }

    let saved = state.repositories.teams.save(team).await?;
    tracing::info!(
        team_id = ?saved.id,
        members = saved.members.len(),
        "Team created"
    );
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn get_team(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> DataResult<Json<Team>> {
    let id = parse_id(&raw_id)?;
    let team = state
        .repositories
        .teams
        .find_by_id(&id)
        .await?
        .ok_or_else(|| DataError::not_found("team", id))?;
    Ok(Json(team))
}

/// Deletes the team and every member in it
pub async fn delete_team(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> DataResult<StatusCode> {
    let id = parse_id(&raw_id)?;
    let teams = &state.repositories.teams;
    if !teams.exists_by_id(&id).await? {
        return Err(DataError::not_found("team", id));
    }
    teams.delete_by_id(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

pub async fn create_item(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<CreateItemRequest>,
) -> DataResult<impl IntoResponse> {
    let saved = state.repositories.items.save(Item::new(body.id)).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> DataResult<Json<Item>> {
    let item = state
        .repositories
        .items
        .find_by_id(&id)
        .await?
        .ok_or_else(|| DataError::not_found("item", &id))?;
    Ok(Json(item))
}
