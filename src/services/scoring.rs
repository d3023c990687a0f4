// src/services/scoring.rs

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{
    organization::Exam,
    question::Question,
    test_result::{ReviewItem, TestResult, UserAnswer},
};

/// Rounds to 2 decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Helper function to calculate score.
/// Returns (correct_count, score_percentage).
///
/// `answers` are 0-based option indexes, `correct_answer` is 1-based.
fn calculate_score(questions: &[Question], answers: &HashMap<i64, u32>) -> (u32, f64) {
    let total_questions = questions.len();
    if total_questions == 0 {
        return (0, 0.0);
    }

    let correct_count = questions
        .iter()
        .filter(|q| {
            answers
                .get(&q.id)
                .is_some_and(|answer| u64::from(*answer) + 1 == u64::from(q.correct_answer))
        })
        .count() as u32;

    let score = round2(correct_count as f64 / total_questions as f64 * 100.0);
    (correct_count, score)
}

/// Scores one attempt against the delivered questions.
///
/// Questions keep their delivered order. Unanswered questions count as wrong
/// and show up in the review with `user_answer = -1`. Only `test_id` and
/// `timestamp` differ between two runs over the same input.
pub fn score_attempt(
    user_id: &str,
    exam: &Exam,
    questions: &[Question],
    answers: &[UserAnswer],
) -> TestResult {
    let answer_map: HashMap<i64, u32> = answers
        .iter()
        .filter_map(|a| a.answer.map(|answer| (a.question_id, answer)))
        .collect();

    let (correct_count, score) = calculate_score(questions, &answer_map);

    let review = questions
        .iter()
        .map(|q| ReviewItem {
            question_id: q.id,
            question: q.question.clone(),
            options: q.options.clone(),
            user_answer: answer_map.get(&q.id).map_or(-1, |a| i64::from(*a)),
            correct_answer: i64::from(q.correct_answer) - 1,
        })
        .collect();

    TestResult {
        test_id: format!("test-{}", Uuid::new_v4().simple()),
        user_id: user_id.to_string(),
        exam_id: exam.id.clone(),
        answers: answers.to_vec(),
        score,
        correct_count,
        total_questions: questions.len() as u32,
        timestamp: chrono::Utc::now().timestamp_millis(),
        review,
    }
}
