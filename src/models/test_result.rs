// src/models/test_result.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::question::PublicQuestion;

/// One answer given by the candidate. `answer` is a 0-based option index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    pub question_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<u32>,
}

/// Per-question breakdown of a scored attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub question_id: i64,
    pub question: String,
    pub options: Vec<String>,
    /// 0-based, `-1` when unanswered.
    pub user_answer: i64,
    /// 0-based.
    pub correct_answer: i64,
}

/// A scored attempt. Immutable once created and keyed by `test_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_id: String,
    pub user_id: String,
    pub exam_id: String,
    #[serde(default)]
    pub answers: Vec<UserAnswer>,
    /// Percentage in `[0, 100]`, rounded to 2 decimals.
    pub score: f64,
    pub correct_count: u32,
    pub total_questions: u32,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub review: Vec<ReviewItem>,
}

/// Handed to the UI when an attempt starts.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResponse {
    pub attempt_id: String,
    pub exam_id: String,
    pub questions: Vec<PublicQuestion>,
    pub duration_minutes: u32,
    /// Milliseconds since the Unix epoch.
    pub expires_at: i64,
}

/// DTO for submitting an attempt.
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptRequest {
    #[validate(length(max = 1000))]
    pub answers: Vec<UserAnswer>,
}

/// State of the remote mirror of one result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed { message: String },
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptResponse {
    pub result: TestResult,
    /// `{"status": "pending" | "synced" | "failed", "message"?}`
    #[schema(value_type = Object)]
    pub sync: SyncStatus,
    pub message: String,
}

/// Outcome of pulling results from WordPress.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PullSummary {
    pub fetched: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_status_is_tagged() {
        let value = serde_json::to_value(SyncStatus::Failed {
            message: "timeout".to_string(),
        })
        .unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["message"], "timeout");
    }

    #[test]
    fn remote_result_without_review_deserializes() {
        let raw = serde_json::json!({
            "testId": "test-1",
            "userId": "7",
            "examId": "CPC-CERT-EXAM",
            "score": 80,
            "correctCount": 8,
            "totalQuestions": 10,
            "timestamp": 1_700_000_000_000i64
        });
        let result: TestResult = serde_json::from_value(raw).unwrap();
        assert_eq!(result.score, 80.0);
        assert!(result.review.is_empty());
    }
}
