//! ServerBuilder for fluent API to build HTTP servers

use super::exposure::RestExposure;
use super::state::AppState;
use crate::config::{AppConfig, Backend};
use crate::entities::Member;
use crate::repository::{CrudRepository, Repositories};
use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;

/// Builder for the member/team/item HTTP server
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(AppConfig::from_env()?)
///     .build()
///     .await?;
/// ```
pub struct ServerBuilder {
    config: AppConfig,
    repositories: Option<Repositories>,
    seed: Option<Vec<String>>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            repositories: None,
            seed: None,
            custom_routes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Use these repositories instead of connecting the configured backend
    pub fn with_repositories(mut self, repositories: Repositories) -> Self {
        self.repositories = Some(repositories);
        self
    }

    /// Replace the configured seed usernames
    pub fn seed_members<I, S>(mut self, usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seed = Some(usernames.into_iter().map(Into::into).collect());
        self
    }

    /// Add routes that are not part of the member/team/item surface
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Connect the repositories and seed them, without building routes
    pub async fn build_state(&mut self) -> Result<AppState> {
        let repositories = match self.repositories.take() {
            Some(repositories) => repositories,
            None => connect(&self.config).await?,
        };

        let seed = self
            .seed
            .take()
            .unwrap_or_else(|| self.config.seed.members.clone());
        seed_members(&repositories, &seed).await?;

        Ok(AppState::new(repositories, self.config.paging.clone()))
    }

    /// Build the final REST router
    pub async fn build(mut self) -> Result<Router> {
        let state = self.build_state().await?;
        let custom_routes = std::mem::take(&mut self.custom_routes);
        Ok(RestExposure::build_router(state, custom_routes))
    }

    /// Serve the application with graceful shutdown on SIGTERM or Ctrl+C
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build().await?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn connect(config: &AppConfig) -> Result<Repositories> {
    match config.datasource.backend {
        Backend::InMemory => {
            tracing::info!("Using in-memory storage");
            Ok(Repositories::in_memory())
        }
        #[cfg(feature = "postgres")]
        Backend::Postgres => {
            let url = config
                .datasource
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("datasource.url is required for postgres"))?;
            let store = crate::storage::PostgresStore::connect(
                url,
                config.datasource.max_connections,
            )
            .await?;
            store.migrate().await?;
            tracing::info!(
                max_connections = config.datasource.max_connections,
                "Connected to postgres"
            );
            Ok(Repositories::from_store(store))
        }
        #[cfg(not(feature = "postgres"))]
        Backend::Postgres => {
            anyhow::bail!("postgres backend requested but the `postgres` feature is disabled")
        }
    }
}

/// Create a member for every username that does not exist yet
async fn seed_members(repositories: &Repositories, usernames: &[String]) -> Result<()> {
    for username in usernames {
        if !repositories.members.find_by_username(username).await?.is_empty() {
            continue;
        }
        let saved = repositories.members.save(Member::new(username.as_str())).await?;
        tracing::info!(member_id = ?saved.id, username = %username, "Seeded member");
    }
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
