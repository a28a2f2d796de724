//! HTTP server exposing the repositories
//!
//! - `builder`: connects the configured backend, seeds members and serves
//! - `exposure`: route tables per protocol
//! - `extractors` and `handlers`: the request side of each route

pub mod builder;
pub mod exposure;
pub mod extractors;
pub mod handlers;
pub mod state;

pub use builder::ServerBuilder;
pub use exposure::RestExposure;
pub use extractors::{MemberParam, ValidatedJson};
pub use state::AppState;
