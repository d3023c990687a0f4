//! Token session manager.
//!
//! Owns the single active session: decoding the SSO token, persisting the
//! session to storage, restoring it at startup and evicting it on logout or
//! expiry. All mutation goes through this type; login, logout and the
//! background expiry check serialize on one async lock.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::{sync::Mutex, task::JoinHandle};

use crate::{
    error::AppError,
    models::{
        session::{ExamPrice, Session, TokenPayload},
        user::User,
    },
    storage::{self, KeyValueStore, keys},
    utils::jwt::{TokenDecoder, now_secs},
};

/// The session plus the bearer token it was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub session: Session,
    pub token: String,
}

pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    decoder: TokenDecoder,
    current: Mutex<Option<ActiveSession>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>, decoder: TokenDecoder) -> Self {
        Self {
            store,
            decoder,
            current: Mutex::new(None),
        }
    }

    pub async fn current(&self) -> Option<ActiveSession> {
        self.current.lock().await.clone()
    }

    /// Exchanges an SSO token for a session.
    ///
    /// A rejected token leaves the portal logged out. A token for another
    /// user replaces the previous session and its cached results; the same
    /// user logging in again keeps results that are not yet synced.
    pub async fn login_with_token(&self, token: &str) -> Result<Session, AppError> {
        self.login_at(token, now_secs()).await
    }

    pub async fn login_at(&self, token: &str, now_secs: i64) -> Result<Session, AppError> {
        let mut current = self.current.lock().await;

        let payload = match self.decoder.decode_unexpired(token, now_secs) {
            Ok(payload) => payload,
            Err(e) => {
                Self::clear(&self.store, &mut current).await;
                return Err(e);
            }
        };
        let same_user = current
            .as_ref()
            .is_some_and(|active| active.session.user.id == payload.user.id);
        if !same_user {
            Self::clear(&self.store, &mut current).await;
        }

        let token = token.trim().to_string();
        let session = Session::from_payload(payload);
        self.persist(&session, Some(&token)).await?;

        tracing::info!(
            "User {} logged in with {} entitlement(s)",
            session.user.id,
            session.paid_exam_ids.len()
        );
        *current = Some(ActiveSession {
            session: session.clone(),
            token,
        });
        Ok(session)
    }

    /// Runs `write` under the session lock if `user_id` is still signed in.
    ///
    /// Returns `None` without running it once that user has logged out or
    /// been replaced, so late remote responses cannot repopulate storage.
    pub async fn while_signed_in<F, Fut, T>(&self, user_id: &str, write: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let current = self.current.lock().await;
        let signed_in = current
            .as_ref()
            .is_some_and(|active| active.session.user.id == user_id);
        if !signed_in {
            return None;
        }
        Some(write().await)
    }

    /// Clears the session and every namespaced storage key. Idempotent.
    pub async fn logout(&self) {
        let mut current = self.current.lock().await;
        Self::clear(&self.store, &mut current).await;
    }

    /// Re-establishes the session from storage at startup.
    ///
    /// A stored token that no longer decodes or has expired forces a logout.
    pub async fn restore(&self) -> Option<Session> {
        let mut current = self.current.lock().await;

        let token = match self.store.get(keys::AUTH_TOKEN).await {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!("Failed to read stored token: {:?}", e);
                return None;
            }
        };

        match self.decoder.decode_unexpired(&token, now_secs()) {
            Ok(payload) => {
                let mut session = Session::from_payload(payload);
                // The stored profile may carry a newer name than the token.
                if let Ok(Some(user)) = storage::read_json::<User>(&*self.store, keys::USER).await {
                    if user.id == session.user.id {
                        session.user = user;
                    }
                }
                tracing::info!("Restored session of user {}", session.user.id);
                *current = Some(ActiveSession {
                    session: session.clone(),
                    token,
                });
                Some(session)
            }
            Err(e) => {
                tracing::warn!("Stored session is no longer valid, logging out: {}", e);
                Self::clear(&self.store, &mut current).await;
                None
            }
        }
    }

    /// Logs out when the stored token is expired, lacks `exp`, or fails to decode.
    ///
    /// Returns `true` when a logout happened.
    pub async fn check_expiry(&self, now_secs: i64) -> bool {
        let mut current = self.current.lock().await;

        let token = match self.store.get(keys::AUTH_TOKEN).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                if current.is_some() {
                    tracing::warn!("Session token vanished from storage, logging out");
                    Self::clear(&self.store, &mut current).await;
                    return true;
                }
                return false;
            }
            Err(e) => {
                tracing::error!("Failed to read stored token: {:?}", e);
                return false;
            }
        };

        let expired = match self.decoder.expiry(&token) {
            Ok(exp) => exp <= now_secs,
            Err(e) => {
                tracing::warn!("Stored token could not be decoded: {}", e);
                true
            }
        };

        if expired {
            tracing::info!("Session expired, forcing logout");
            Self::clear(&self.store, &mut current).await;
        }
        expired
    }

    /// Runs [`check_expiry`](Self::check_expiry) on a fixed interval.
    pub fn spawn_expiry_watcher(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                self.check_expiry(now_secs()).await;
            }
        })
    }

    /// Replaces identity, entitlements and prices with a fresh payload from WordPress.
    /// The token itself is kept.
    pub async fn apply_payload(&self, payload: TokenPayload) -> Result<Session, AppError> {
        let mut current = self.current.lock().await;
        let Some(active) = current.as_mut() else {
            return Err(AppError::AuthError("Please log in first.".to_string()));
        };
        if payload.user.id != active.session.user.id {
            return Err(AppError::InvalidToken(
                "Synced data belongs to a different user.".to_string(),
            ));
        }

        let mut session = Session::from_payload(payload);
        // The refreshed payload carries no claims; keep those of the token.
        session.issued_at = active.session.issued_at;
        session.expires_at = active.session.expires_at;

        self.persist(&session, None).await?;
        active.session = session.clone();
        Ok(session)
    }

    /// Stores the new display name after WordPress accepted it.
    pub async fn update_user_name(&self, name: &str) -> Result<User, AppError> {
        let mut current = self.current.lock().await;
        let Some(active) = current.as_mut() else {
            return Err(AppError::AuthError("Please log in first.".to_string()));
        };

        active.session.user.name = name.to_string();
        storage::write_json(&*self.store, keys::USER, &active.session.user).await?;
        Ok(active.session.user.clone())
    }

    async fn persist(&self, session: &Session, token: Option<&str>) -> Result<(), AppError> {
        let encode = |value: serde_json::Result<String>| {
            value.map_err(|e| AppError::InternalServerError(e.to_string()))
        };
        let paid: Vec<&String> = session.paid_exam_ids.iter().collect();
        let prices: &BTreeMap<String, ExamPrice> = &session.exam_prices;

        let mut entries = vec![
            (keys::USER.to_string(), encode(serde_json::to_string(&session.user))?),
            (keys::PAID_EXAM_IDS.to_string(), encode(serde_json::to_string(&paid))?),
            (keys::EXAM_PRICES.to_string(), encode(serde_json::to_string(prices))?),
        ];
        if let Some(token) = token {
            entries.push((keys::AUTH_TOKEN.to_string(), token.to_string()));
        }
        self.store.set_many(&entries).await
    }

    async fn clear(store: &Arc<dyn KeyValueStore>, current: &mut Option<ActiveSession>) {
        if let Some(active) = current.take() {
            tracing::info!("Logging out user {}", active.session.user.id);
        }
        match store.remove_prefix(keys::NAMESPACE).await {
            Ok(removed) if removed > 0 => tracing::debug!("Removed {} stored key(s)", removed),
            Ok(_) => {}
            Err(e) => tracing::error!("Failed to clear session storage: {:?}", e),
        }
    }
}
