// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'quizzes' table.
///
/// The owner (`created_by`) is fixed at creation; lifecycle is carried by
/// the `status_id` reference into `quiz_statuses`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub created_by: i64,
    pub status_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a new quiz. Always starts in Draft.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be between 1 and 100 characters."))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// DTO for transitioning a quiz to a named status.
#[derive(Debug, Deserialize)]
pub struct SetQuizStatusRequest {
    pub quiz_id: i64,
    pub status: String,
}
