//! Submission validation
//!
//! Pure boundary validation: raw wire submissions are either rejected with a
//! descriptive message or normalized into typed category/difficulty values.
//! Nothing past this point ever sees a free-form category or difficulty
//! string.

use serde::Deserialize;

use crate::db::schemas::{Category, Difficulty};
use crate::types::{ApiError, Result};

/// Raw challenge submission as sent by the frontend
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub challenge_id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub difficulty: String,
    /// Whether the client's answer matched; absent counts as incorrect
    #[serde(default)]
    pub is_correct: bool,
}

/// A submission that passed validation
#[derive(Debug, Clone)]
pub struct NormalizedSubmission {
    pub challenge_id: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub is_correct: bool,
}

/// Validate a raw submission. No side effects.
pub fn validate(request: &SubmitRequest) -> Result<NormalizedSubmission> {
    if request.challenge_id.is_empty()
        || request.category.is_empty()
        || request.difficulty.is_empty()
    {
        return Err(ApiError::BadRequest(
            "Missing required fields: challengeId, category, difficulty".to_string(),
        ));
    }

    let category = Category::parse(&request.category).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid category. Must be one of: {}",
            valid_values(&Category::ALL.map(|c| c.as_str()))
        ))
    })?;

    let difficulty = Difficulty::parse(&request.difficulty).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid difficulty. Must be one of: {}",
            valid_values(&Difficulty::ALL.map(|d| d.as_str()))
        ))
    })?;

    Ok(NormalizedSubmission {
        challenge_id: request.challenge_id.clone(),
        category,
        difficulty,
        is_correct: request.is_correct,
    })
}

fn valid_values(names: &[&str]) -> String {
    names.join(", ")
}
