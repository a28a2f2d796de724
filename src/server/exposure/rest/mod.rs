//! REST exposure of the repositories
//!
//! Turns an [`AppState`] into an Axum `Router` with health checks, the
//! member/team/item routes and an HTTP trace layer.

use crate::server::handlers;
use crate::server::state::AppState;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

/// REST API exposure implementation
pub struct RestExposure;

impl RestExposure {
    /// Build the REST router.
    ///
    /// `custom_routes` are merged after the state is attached, so they must
    /// carry their own state if they need any.
    pub fn build_router(state: AppState, custom_routes: Vec<Router>) -> Router {
        let mut app = Self::health_routes()
            .merge(Self::member_routes())
            .merge(Self::team_routes())
            .merge(Self::item_routes())
            .with_state(state);

        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }

        app.layer(TraceLayer::new_for_http())
    }

    fn health_routes() -> Router<AppState> {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    fn member_routes() -> Router<AppState> {
        Router::new()
            .route(
                "/members",
                get(handlers::list_members).post(handlers::create_member),
            )
            .route("/members/search", get(handlers::search_members))
            .route("/members/by-age/{age}", get(handlers::members_by_age))
            .route("/members/v1/{id}", get(handlers::member_username_v1))
            .route("/members/v2/{id}", get(handlers::member_username_v2))
            .route(
                "/members/{id}",
                get(handlers::get_member)
                    .put(handlers::update_member)
                    .delete(handlers::delete_member),
            )
    }

    fn team_routes() -> Router<AppState> {
        Router::new()
            .route("/teams", axum::routing::post(handlers::create_team))
            .route(
                "/teams/{id}",
                get(handlers::get_team).delete(handlers::delete_team),
            )
    }

    fn item_routes() -> Router<AppState> {
        Router::new()
            .route("/items", axum::routing::post(handlers::create_item))
            .route("/items/{id}", get(handlers::get_item))
    }

    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": "datamap-rs"
        }))
    }
}
