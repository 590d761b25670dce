// src/handlers/assignment.rs
//
// Assignment ledger: linking users to published quizzes and the
// accept/decline gate that creates or destroys progress.

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    error::{AppError, is_unique_violation},
    guard,
    models::assignment::{AssignQuizRequest, AssignedQuiz, SetAcceptedRequest},
    utils::jwt::Claims,
};

/// Assigns a quiz to a user.
///
/// The quiz must not be in Draft. At most one assignment per (user, quiz)
/// pair; the UNIQUE constraint makes the duplicate check race-free, so two
/// concurrent calls cannot both succeed.
/// Creator only.
pub async fn assign_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AssignQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    guard::require_role(&pool, &claims, "Creator").await?;

    let quiz_status: Option<(String,)> = sqlx::query_as(
        "SELECT s.name FROM quizzes q
         JOIN quiz_statuses s ON s.id = q.status_id
         WHERE q.id = ?",
    )
    .bind(payload.quiz_id)
    .fetch_optional(&pool)
    .await?;
    let (status_name,) =
        quiz_status.ok_or(AppError::NotFound("Quiz does not exist.".to_string()))?;

    let user_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
        .bind(payload.user_id)
        .fetch_optional(&pool)
        .await?;
    if user_exists.is_none() {
        return Err(AppError::NotFound("User does not exist.".to_string()));
    }

    if status_name == "Draft" {
        return Err(AppError::BadRequest(
            "Quiz is still in draft status.".to_string(),
        ));
    }

    let assignment: AssignedQuiz = sqlx::query_as(
        "INSERT INTO assigned_quizzes (user_id, quiz_id, accepted)
         VALUES (?, ?, 0)
         RETURNING id, user_id, quiz_id, accepted",
    )
    .bind(payload.user_id)
    .bind(payload.quiz_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("User already assigned to the quiz.".to_string())
        } else {
            tracing::error!("Failed to assign quiz: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(assignment)))
}

/// Lists the caller's assignment rows.
pub async fn get_assigned_quizzes(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guard::principal_id(&claims)?;

    let assignments: Vec<AssignedQuiz> = sqlx::query_as(
        "SELECT id, user_id, quiz_id, accepted
         FROM assigned_quizzes WHERE user_id = ? ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list assignments: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(assignments))
}

/// Accepts or declines an assignment, by the assigned user themself.
///
/// Accepting creates the progress record (score 0, not completed).
/// Declining deletes it and, by cascade, the whole answered-question
/// history; this wipe is deliberate and non-recoverable. Both paths update
/// the `accepted` flag inside the same transaction.
pub async fn set_accepted_status(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SetAcceptedRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guard::principal_id(&claims)?;

    let quiz_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM quizzes WHERE id = ?")
        .bind(payload.quiz_id)
        .fetch_optional(&pool)
        .await?;
    if quiz_exists.is_none() {
        return Err(AppError::NotFound("Quiz does not exist.".to_string()));
    }

    let mut tx = pool.begin().await?;

    let assignment_id: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM assigned_quizzes WHERE user_id = ? AND quiz_id = ?",
    )
    .bind(user_id)
    .bind(payload.quiz_id)
    .fetch_optional(&mut *tx)
    .await?;
    let assignment_id = assignment_id.ok_or(AppError::NotFound(
        "User is not assigned to the quiz.".to_string(),
    ))?;

    if payload.accepted {
        sqlx::query(
            "INSERT INTO user_quiz_progress (user_id, quiz_id, score, completed, started_at)
             VALUES (?, ?, 0, 0, ?)",
        )
        .bind(user_id)
        .bind(payload.quiz_id)
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("User has already accepted this quiz.".to_string())
            } else {
                tracing::error!("Failed to create progress: {:?}", e);
                AppError::from(e)
            }
        })?;
    } else {
        let deleted = sqlx::query(
            "DELETE FROM user_quiz_progress WHERE user_id = ? AND quiz_id = ?",
        )
        .bind(user_id)
        .bind(payload.quiz_id)
        .execute(&mut *tx)
        .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::BadRequest(
                "User has not started the quiz.".to_string(),
            ));
        }
    }

    sqlx::query("UPDATE assigned_quizzes SET accepted = ? WHERE id = ?")
        .bind(payload.accepted)
        .bind(assignment_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(json!({"message": "Accepted status updated successfully."})))
}
