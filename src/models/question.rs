// src/models/question.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// A multiple-choice question with its answer key.
///
/// `correct_answer` is 1-based, while user answers and review entries are
/// 0-based. The remote scoring format depends on this asymmetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_answer_key))]
pub struct Question {
    pub id: i64,

    #[validate(length(min = 1, max = 2000))]
    pub question: String,

    #[validate(length(equal = 4), custom(function = validate_options))]
    pub options: Vec<String>,

    pub correct_answer: u32,
}

fn validate_answer_key(question: &Question) -> Result<(), ValidationError> {
    let in_range = question.correct_answer >= 1
        && (question.correct_answer as usize) <= question.options.len();
    if !in_range {
        return Err(ValidationError::new("correct_answer_out_of_range"));
    }
    Ok(())
}

fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    for opt in options {
        if opt.trim().is_empty() {
            return Err(ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

/// DTO for sending a question to the UI (excludes the answer key).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub question: String,
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            question: q.question.clone(),
            options: q.options.clone(),
        }
    }
}

/// Body of the WordPress `/questions-from-sheet` endpoint.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SheetQuestionsRequest {
    #[validate(url)]
    pub sheet_url: String,
    #[validate(range(min = 1, max = 500))]
    pub count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct_answer: u32) -> Question {
        Question {
            id: 1,
            question: "What does 'CM' in ICD-10-CM stand for?".to_string(),
            options: vec![
                "Case Mix".to_string(),
                "Clinical Modification".to_string(),
                "Care Management".to_string(),
                "Chronic Morbidity".to_string(),
            ],
            correct_answer,
        }
    }

    #[test]
    fn answer_key_must_be_one_based_and_in_range() {
        assert!(question(1).validate().is_ok());
        assert!(question(4).validate().is_ok());
        assert!(question(0).validate().is_err());
        assert!(question(5).validate().is_err());
    }

    #[test]
    fn exactly_four_options_are_required() {
        let mut q = question(2);
        q.options.pop();
        assert!(q.validate().is_err());
    }

    #[test]
    fn public_question_hides_answer() {
        let value = serde_json::to_value(PublicQuestion::from(&question(2))).unwrap();
        assert!(value.get("correctAnswer").is_none());
        assert_eq!(value["options"].as_array().unwrap().len(), 4);
    }
}
