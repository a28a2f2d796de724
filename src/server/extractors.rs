//! Axum extractors for ids, entities and validated bodies

use super::state::AppState;
use crate::core::DataError;
use crate::core::error::RequestError;
use crate::entities::Member;
use crate::repository::CrudRepository;
use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use validator::Validate;

/// Parse a numeric entity id taken from the path
pub fn parse_id(raw: &str) -> Result<i64, RequestError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| RequestError::InvalidEntityId {
            id: raw.to_string(),
        })
}

/// Member loaded from the `{id}` path segment.
///
/// Rejects with 400 when the id is not numeric and 404 when no member has it.
#[derive(Debug, Clone)]
pub struct MemberParam(pub Member);

impl FromRequestParts<AppState> for MemberParam {
    type Rejection = DataError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| RequestError::InvalidQuery {
                name: "id".to_string(),
                message: e.body_text(),
            })?;
        let id = parse_id(&raw)?;

        let member = state
            .repositories
            .members
            .find_by_id(&id)
            .await?
            .ok_or_else(|| DataError::not_found("member", id))?;
        Ok(MemberParam(member))
    }
}

/// JSON body that passed `validator` checks
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = DataError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| RequestError::InvalidBody {
                message: e.body_text(),
            })?;
        value.validate()?;
        Ok(Self(value))
    }
}
