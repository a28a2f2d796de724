//! Shared handler state

use crate::config::PagingConfig;
use crate::repository::Repositories;

#[derive(Clone)]
pub struct AppState {
    pub repositories: Repositories,
    pub paging: PagingConfig,
}

impl AppState {
    pub fn new(repositories: Repositories, paging: PagingConfig) -> Self {
        Self {
            repositories,
            paging,
        }
    }
}
