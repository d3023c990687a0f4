//! Exam attempts: drawing questions, tracking the running attempt, and
//! turning a submission into a saved result.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rand::seq::SliceRandom;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        organization::{Exam, Organization},
        question::{PublicQuestion, Question},
        test_result::{AttemptResponse, SubmitAttemptResponse, SyncStatus, UserAnswer},
    },
    remote::wordpress::WordPressClient,
    services::{
        catalog::{find_exam, find_org, is_entitled},
        results::{ResultStore, SyncTracker},
        scoring::score_attempt,
        session_manager::ActiveSession,
    },
};

const BUNDLED_QUESTIONS: &str = include_str!("../../data/questions.json");

/// The question bank shipped with the binary, answer keys checked.
pub fn bundled_questions() -> Result<Vec<Question>, AppError> {
    let questions: Vec<Question> = serde_json::from_str(BUNDLED_QUESTIONS)
        .map_err(|e| AppError::ConfigError(format!("Bundled question bank is invalid: {}", e)))?;
    for q in &questions {
        q.validate().map_err(|e| {
            AppError::ConfigError(format!("Bundled question {} is invalid: {}", q.id, e))
        })?;
    }
    Ok(questions)
}

/// Shuffles the bank and keeps at most `count` questions.
pub fn draw_bundled(count: u32) -> Result<Vec<Question>, AppError> {
    let mut questions = bundled_questions()?;
    questions.shuffle(&mut rand::rng());
    questions.truncate(count as usize);
    Ok(questions)
}

/// Questions for one attempt of `exam`.
///
/// Exams with a Google Sheets source are served by WordPress; invalid rows
/// are dropped. Everything else comes from the bundled bank.
pub async fn draw_questions(
    client: &WordPressClient,
    token: &str,
    exam: &Exam,
) -> Result<Vec<Question>, AppError> {
    let source = exam.question_source_url.trim();
    let mut questions = if source.is_empty() {
        draw_bundled(exam.number_of_questions)?
    } else {
        client
            .questions_from_sheet(token, source, exam.number_of_questions)
            .await?
            .into_iter()
            .filter(|q| match q.validate() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Skipping sheet question {} of {}: {}", q.id, exam.id, e);
                    false
                }
            })
            .collect()
    };
    questions.truncate(exam.number_of_questions as usize);

    if questions.is_empty() {
        return Err(AppError::ConfigError(format!(
            "No questions available for exam '{}'",
            exam.id
        )));
    }
    Ok(questions)
}

/// An attempt in progress. Holds the answer keys until submission.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub attempt_id: String,
    pub user_id: String,
    pub org_id: String,
    pub exam: Exam,
    pub questions: Vec<Question>,
    /// Milliseconds since the Unix epoch.
    pub deadline: i64,
}

/// Attempts started but not yet submitted.
#[derive(Debug, Clone, Default)]
pub struct AttemptRegistry {
    attempts: Arc<Mutex<HashMap<String, Attempt>>>,
}

impl AttemptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        user_id: &str,
        org_id: &str,
        exam: &Exam,
        questions: Vec<Question>,
        now_ms: i64,
    ) -> Result<Attempt, AppError> {
        let attempt = Attempt {
            attempt_id: format!("attempt-{}", Uuid::new_v4().simple()),
            user_id: user_id.to_string(),
            org_id: org_id.to_string(),
            exam: exam.clone(),
            questions,
            deadline: now_ms + i64::from(exam.duration_minutes) * 60_000,
        };

        let mut attempts = self
            .attempts
            .lock()
            .map_err(|_| AppError::InternalServerError("Attempt registry poisoned".to_string()))?;
        attempts.insert(attempt.attempt_id.clone(), attempt.clone());
        Ok(attempt)
    }

    /// Removes and returns the attempt. Each attempt can be submitted once.
    pub fn take(&self, attempt_id: &str, user_id: &str) -> Result<Attempt, AppError> {
        let mut attempts = self
            .attempts
            .lock()
            .map_err(|_| AppError::InternalServerError("Attempt registry poisoned".to_string()))?;

        match attempts.get(attempt_id) {
            Some(attempt) if attempt.user_id == user_id => {}
            _ => {
                return Err(AppError::NotFound(format!(
                    "Attempt '{}' not found",
                    attempt_id
                )));
            }
        }
        attempts
            .remove(attempt_id)
            .ok_or_else(|| AppError::NotFound(format!("Attempt '{}' not found", attempt_id)))
    }

    pub fn len(&self) -> usize {
        self.attempts.lock().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.clear();
        }
    }
}

/// Starts an attempt: checks entitlement, draws questions, registers the attempt.
pub async fn start_attempt(
    active: &ActiveSession,
    orgs: &[Organization],
    org_id: &str,
    exam_id: &str,
    client: &WordPressClient,
    registry: &AttemptRegistry,
) -> Result<AttemptResponse, AppError> {
    let org = find_org(orgs, org_id)?;
    let exam = find_exam(org, exam_id)?;

    if !is_entitled(&active.session, exam) {
        return Err(AppError::Forbidden(format!(
            "You have not purchased '{}'.",
            exam.name
        )));
    }

    let questions = draw_questions(client, &active.token, exam).await?;
    let now_ms = chrono::Utc::now().timestamp_millis();
    let attempt = registry.register(&active.session.user.id, &org.id, exam, questions, now_ms)?;

    tracing::info!(
        "User {} started {} ({} question(s))",
        attempt.user_id,
        exam.id,
        attempt.questions.len()
    );

    Ok(AttemptResponse {
        attempt_id: attempt.attempt_id,
        exam_id: exam.id.clone(),
        questions: attempt.questions.iter().map(PublicQuestion::from).collect(),
        duration_minutes: exam.duration_minutes,
        expires_at: attempt.deadline,
    })
}

/// Scores a submission, saves it locally and starts the remote push.
///
/// Returns as soon as the local save is done; the push reports through the
/// sync tracker.
pub async fn submit_attempt(
    active: &ActiveSession,
    attempt_id: &str,
    answers: &[UserAnswer],
    registry: &AttemptRegistry,
    results: &ResultStore,
    tracker: &SyncTracker,
    client: &WordPressClient,
) -> Result<SubmitAttemptResponse, AppError> {
    let user_id = &active.session.user.id;
    let attempt = registry.take(attempt_id, user_id)?;

    let now_ms = chrono::Utc::now().timestamp_millis();
    if now_ms > attempt.deadline {
        tracing::warn!(
            "Attempt {} submitted {}s after its deadline",
            attempt_id,
            (now_ms - attempt.deadline) / 1000
        );
    }

    let result = score_attempt(user_id, &attempt.exam, &attempt.questions, answers);
    results.save_result(user_id, &result).await;
    tracing::info!(
        "Saved result {} for {}: {}%",
        result.test_id,
        attempt.exam.id,
        result.score
    );

    tracker.spawn_push(client.clone(), active.token.clone(), result.clone());

    Ok(SubmitAttemptResponse {
        result,
        sync: SyncStatus::Pending,
        message: "Result saved. Syncing with your account in the background.".to_string(),
    })
}
