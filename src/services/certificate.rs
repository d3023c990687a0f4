//! Certificate gate.
//!
//! A certificate is derived on demand from a stored result; nothing about it
//! is persisted. The rules, in order: the result must exist, its exam must
//! exist and not be a practice exam, the score must reach the pass mark
//! (administrators bypass the mark), and the exam's template must exist.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::{
    error::AppError,
    models::{
        certificate::CertificateData, organization::Organization, test_result::TestResult,
        user::User,
    },
    utils::html::render_certificate_body,
};

/// Test id that yields a canned certificate for previewing the layout.
pub const SAMPLE_TEST_ID: &str = "sample";

const SAMPLE_SCORE: f64 = 95.5;
const SAMPLE_TOTAL_QUESTIONS: u32 = 100;

/// `<first 4 chars of userId>-<first 6 hex digits of sha256(testId)>`.
pub fn certificate_number(user_id: &str, test_id: &str) -> String {
    let prefix: String = user_id.chars().take(4).collect();
    let digest = hex::encode(Sha256::digest(test_id.as_bytes()));
    format!("{}-{}", prefix, &digest[..6])
}

/// e.g. "March 5, 2025".
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%B %-d, %Y").to_string()
}

/// Builds the certificate for `test_id`, or explains why there is none.
///
/// `result` is the locally stored result for `test_id`, if any.
pub fn get_certificate(
    user: &User,
    test_id: &str,
    org: &Organization,
    result: Option<&TestResult>,
    now: DateTime<Utc>,
) -> Result<CertificateData, AppError> {
    if test_id == SAMPLE_TEST_ID {
        return sample_certificate(Some(user), org, now);
    }

    let result = result.ok_or_else(|| {
        AppError::NotFound(format!("Test result '{}' not found", test_id))
    })?;

    let exam = org.exam(&result.exam_id).ok_or_else(|| {
        AppError::NotFound(format!("Exam '{}' not found", result.exam_id))
    })?;

    if exam.is_practice {
        return Err(AppError::NotEligible(
            "Practice exams do not award certificates.".to_string(),
        ));
    }

    if result.score < exam.pass_score && !user.is_admin {
        return Err(AppError::NotEligible(format!(
            "A score of {}% is required to earn this certificate.",
            exam.pass_score
        )));
    }

    let template = org.template(&exam.certificate_template_id).ok_or_else(|| {
        AppError::NotFound(format!(
            "Certificate template '{}' not found",
            exam.certificate_template_id
        ))
    })?;

    if result.score < exam.pass_score {
        tracing::info!(
            "Admin {} issued certificate for failed result {}",
            user.id,
            test_id
        );
    }

    Ok(CertificateData {
        certificate_number: certificate_number(&result.user_id, &result.test_id),
        candidate_name: user.name.clone(),
        final_score: result.score,
        date: format_date(DateTime::from_timestamp_millis(result.timestamp).unwrap_or(now)),
        total_questions: result.total_questions,
        organization: org.clone(),
        template: template.clone(),
        body: render_certificate_body(&template.body, result.score),
    })
}

/// Canned certificate on the organization's first template. Needs no
/// session; without a named user the candidate is "Sample Candidate".
pub fn sample_certificate(
    user: Option<&User>,
    org: &Organization,
    now: DateTime<Utc>,
) -> Result<CertificateData, AppError> {
    let template = org.certificate_templates.first().ok_or_else(|| {
        AppError::NotFound(format!("Organization '{}' has no certificate templates", org.id))
    })?;

    let candidate_name = match user {
        Some(user) if !user.name.trim().is_empty() => user.name.clone(),
        _ => "Sample Candidate".to_string(),
    };

    Ok(CertificateData {
        certificate_number: format!("SAMPLE-{}", now.timestamp()),
        candidate_name,
        final_score: SAMPLE_SCORE,
        date: format_date(now),
        total_questions: SAMPLE_TOTAL_QUESTIONS,
        organization: org.clone(),
        template: template.clone(),
        body: render_certificate_body(&template.body, SAMPLE_SCORE),
    })
}
