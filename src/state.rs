use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;

use crate::{
    config::Config,
    error::AppError,
    models::session::Session,
    remote::wordpress::WordPressClient,
    services::{
        attempts::AttemptRegistry,
        catalog::CatalogCache,
        results::{ResultStore, SyncTracker},
        session_manager::SessionManager,
    },
    storage::KeyValueStore,
    utils::jwt::TokenDecoder,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<SessionManager>,
    pub catalog: Arc<CatalogCache>,
    pub results: ResultStore,
    pub attempts: AttemptRegistry,
    pub sync_tracker: SyncTracker,
    pub remote: WordPressClient,
}

impl AppState {
    /// Wires every service on top of one storage backend.
    pub fn new(config: Config, store: Arc<dyn KeyValueStore>) -> Result<Self, AppError> {
        let remote = WordPressClient::new(
            &config.wp_api_base,
            Duration::from_secs(config.remote_timeout_secs),
        )?;
        let decoder = TokenDecoder::new(config.jwt_secret.clone());

        Ok(Self {
            sessions: Arc::new(SessionManager::new(store.clone(), decoder)),
            catalog: Arc::new(CatalogCache::new()),
            results: ResultStore::new(store),
            attempts: AttemptRegistry::new(),
            sync_tracker: SyncTracker::new(),
            remote,
            config,
        })
    }

    /// Full logout: session and storage, plus the in-memory attempt and sync state.
    pub async fn logout(&self) {
        self.sessions.logout().await;
        self.attempts.clear();
        self.sync_tracker.clear();
    }

    /// Pulls identity, entitlements and prices from WordPress.
    ///
    /// A token WordPress no longer accepts ends the session.
    pub async fn refresh_from_remote(&self) -> Result<Session, AppError> {
        let active = self
            .sessions
            .current()
            .await
            .ok_or_else(|| AppError::AuthError("Please log in first.".to_string()))?;

        match self.remote.get_user_data(&active.token).await {
            Ok(payload) => self.sessions.apply_payload(payload).await,
            Err(AppError::InvalidToken(msg)) => {
                tracing::warn!("WordPress rejected the session token: {}", msg);
                self.logout().await;
                Err(AppError::InvalidToken(msg))
            }
            Err(e) => Err(e),
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for ResultStore {
    fn from_ref(state: &AppState) -> Self {
        state.results.clone()
    }
}

impl FromRef<AppState> for WordPressClient {
    fn from_ref(state: &AppState) -> Self {
        state.remote.clone()
    }
}

impl FromRef<AppState> for Arc<CatalogCache> {
    fn from_ref(state: &AppState) -> Self {
        state.catalog.clone()
    }
}
