// src/models/assignment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'assigned_quizzes' table.
///
/// At most one row per (user, quiz) pair, enforced by a UNIQUE constraint.
/// `accepted` starts false and is toggled by the assigned user.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AssignedQuiz {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub accepted: bool,
}

/// DTO for assigning a quiz to a user.
#[derive(Debug, Deserialize)]
pub struct AssignQuizRequest {
    pub quiz_id: i64,
    pub user_id: i64,
}

/// DTO for accepting or declining an assignment.
#[derive(Debug, Deserialize)]
pub struct SetAcceptedRequest {
    pub quiz_id: i64,
    pub accepted: bool,
}
