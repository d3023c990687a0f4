//! Local result cache and its mirror on WordPress.
//!
//! The local write always happens first and never fails to the caller. The
//! remote push is best effort; on pull the remote copy wins per `testId`,
//! while results WordPress has not seen yet stay local until pushed.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::{
    error::AppError,
    models::test_result::{SyncStatus, TestResult},
    remote::wordpress::WordPressClient,
    services::session_manager::SessionManager,
    storage::{self, KeyValueStore, keys},
};

#[derive(Clone)]
pub struct ResultStore {
    store: Arc<dyn KeyValueStore>,
}

impl ResultStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// All cached results of a user, oldest first.
    pub async fn results_for_user(&self, user_id: &str) -> Vec<TestResult> {
        match storage::read_json::<Vec<TestResult>>(&*self.store, &keys::results(user_id)).await {
            Ok(results) => results.unwrap_or_default(),
            Err(e) => {
                tracing::error!("Failed to read results of user {}: {:?}", user_id, e);
                Vec::new()
            }
        }
    }

    pub async fn get_test_result(&self, user_id: &str, test_id: &str) -> Option<TestResult> {
        self.results_for_user(user_id)
            .await
            .into_iter()
            .find(|r| r.test_id == test_id)
    }

    /// Upserts by `test_id`. Storage failures are logged, never returned.
    pub async fn save_result(&self, user_id: &str, result: &TestResult) {
        let mut results = self.results_for_user(user_id).await;
        match results.iter_mut().find(|r| r.test_id == result.test_id) {
            Some(existing) => *existing = result.clone(),
            None => results.push(result.clone()),
        }

        if let Err(e) = self.write_all(user_id, &results).await {
            tracing::error!(
                "Failed to save result {} for user {}: {:?}",
                result.test_id,
                user_id,
                e
            );
        }
    }

    /// Most recent attempt per exam; equal timestamps keep the later-stored one.
    pub async fn latest_attempts(&self, user_id: &str) -> Vec<TestResult> {
        let mut latest: BTreeMap<String, TestResult> = BTreeMap::new();
        for result in self.results_for_user(user_id).await {
            let newer = latest
                .get(&result.exam_id)
                .is_none_or(|current| result.timestamp >= current.timestamp);
            if newer {
                latest.insert(result.exam_id.clone(), result);
            }
        }
        latest.into_values().collect()
    }

    /// Overwrites local entries with the remote ones, keyed by `test_id`.
    ///
    /// Returns the size of the merged cache.
    pub async fn merge_remote(
        &self,
        user_id: &str,
        remote: Vec<TestResult>,
    ) -> Result<usize, AppError> {
        let mut results = self.results_for_user(user_id).await;
        for incoming in remote {
            match results.iter_mut().find(|r| r.test_id == incoming.test_id) {
                Some(existing) => *existing = incoming,
                None => results.push(incoming),
            }
        }
        results.sort_by_key(|r| r.timestamp);
        self.write_all(user_id, &results).await?;
        Ok(results.len())
    }

    async fn write_all(&self, user_id: &str, results: &[TestResult]) -> Result<(), AppError> {
        storage::write_json(&*self.store, &keys::results(user_id), results).await
    }
}

/// Pushes one result to WordPress (`POST /submit-result`).
pub async fn sync_result(
    client: &WordPressClient,
    token: &str,
    result: &TestResult,
) -> Result<(), AppError> {
    client.submit_result(token, result).await?;
    tracing::info!("Result {} synced to WordPress", result.test_id);
    Ok(())
}

/// Pulls the authoritative results of the user and merges them into the cache.
///
/// The whole remote list is received before the cache is touched, and the
/// merge is dropped when `user_id` logged out while WordPress was answering.
pub async fn sync_results(
    client: &WordPressClient,
    sessions: &SessionManager,
    results: &ResultStore,
    token: &str,
    user_id: &str,
) -> Result<(usize, usize), AppError> {
    let remote = client.get_user_results(token).await?;
    let fetched = remote.len();
    let remote: Vec<TestResult> = remote
        .into_iter()
        .filter(|r| {
            let mine = r.user_id == user_id;
            if !mine {
                tracing::warn!("Dropping result {} of another user", r.test_id);
            }
            mine
        })
        .collect();

    let total = sessions
        .while_signed_in(user_id, || results.merge_remote(user_id, remote))
        .await
        .ok_or_else(|| {
            tracing::info!("User {} logged out during the pull, discarding it", user_id);
            AppError::AuthError("Logged out before the results arrived.".to_string())
        })??;
    tracing::info!("Pulled {} result(s) from WordPress, {} cached", fetched, total);
    Ok((fetched, total))
}

#[derive(Debug, Default)]
struct Statuses {
    // Bumped on every clear so pushes started before it can be ignored.
    generation: u64,
    by_test: HashMap<String, SyncStatus>,
}

/// Remembers how the remote push of each result went.
#[derive(Debug, Clone, Default)]
pub struct SyncTracker {
    inner: Arc<Mutex<Statuses>>,
}

impl SyncTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `test_id` pending and returns the generation to finish it in.
    pub fn begin(&self, test_id: &str) -> u64 {
        match self.inner.lock() {
            Ok(mut inner) => {
                inner.by_test.insert(test_id.to_string(), SyncStatus::Pending);
                inner.generation
            }
            Err(_) => 0,
        }
    }

    /// Records the outcome unless the tracker was cleared since [`begin`](Self::begin).
    pub fn finish(&self, generation: u64, test_id: &str, status: SyncStatus) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.generation != generation {
                tracing::debug!("Dropping sync status of {} from an ended session", test_id);
                return;
            }
            inner.by_test.insert(test_id.to_string(), status);
        }
    }

    pub fn status(&self, test_id: &str) -> Option<SyncStatus> {
        self.inner.lock().ok()?.by_test.get(test_id).cloned()
    }

    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.by_test.clear();
            inner.generation = inner.generation.wrapping_add(1);
        }
    }

    /// Spawns the push and records its outcome. Does not wait for it.
    pub fn spawn_push(
        &self,
        client: WordPressClient,
        token: String,
        result: TestResult,
    ) -> JoinHandle<()> {
        let generation = self.begin(&result.test_id);
        let tracker = self.clone();
        tokio::spawn(async move {
            let status = match sync_result(&client, &token, &result).await {
                Ok(()) => SyncStatus::Synced,
                Err(e) => {
                    tracing::warn!(
                        "Result {} saved locally, sync pending: {}",
                        result.test_id,
                        e.message()
                    );
                    SyncStatus::Failed {
                        message: e.message().to_string(),
                    }
                }
            };
            tracker.finish(generation, &result.test_id, status);
        })
    }
}
