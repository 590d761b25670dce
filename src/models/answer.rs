// src/models/answer.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'answers' table.
///
/// A question may carry zero or many correct answers; the scoring model
/// explicitly supports multi-correct questions.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub question_id: i64,
    pub answer: String,
    pub is_correct: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for adding an answer to a question of a Draft quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAnswerRequest {
    pub question_id: i64,
    #[validate(length(min = 1, max = 500))]
    pub answer: String,
    #[serde(default)]
    pub is_correct: bool,
}
