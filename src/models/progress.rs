// src/models/progress.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::engine::Scorecard;

/// Represents the 'user_quiz_progress' table.
///
/// Created when the assigned user accepts the quiz, deleted (with all
/// answered-question history) when they decline. `last_answered_question_id`
/// is purely a sequencing cursor, not a correctness signal.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserQuizProgress {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub last_answered_question_id: Option<i64>,
    pub score: i64,
    pub completed: bool,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'answered_questions' table: one row per distinct
/// (progress, question, answer) triple, enforced by a UNIQUE constraint.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub id: i64,
    pub progress_id: i64,
    pub question_id: i64,
    pub answer_id: i64,
    pub answered_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for recording a selected answer.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub question_id: i64,
    pub answer_id: i64,
}

/// Response body for a recorded answer; `is_correct` is resolved from the
/// selected answer row.
#[derive(Debug, Serialize)]
pub struct AnsweredQuestionResponse {
    pub id: i64,
    pub progress_id: i64,
    pub question_id: i64,
    pub answer_id: i64,
    pub is_correct: bool,
    pub answered_at: chrono::DateTime<chrono::Utc>,
}

/// A participant's own progress view for one quiz.
#[derive(Debug, Serialize)]
pub struct ProgressSummary {
    pub quiz: String,
    #[serde(flatten)]
    pub scorecard: Scorecard,
}

/// One roster row in the creator's score view: a participant's aggregation.
#[derive(Debug, Serialize)]
pub struct ScoreRosterEntry {
    pub user: String,
    #[serde(flatten)]
    pub scorecard: Scorecard,
}
