// src/handlers/quiz.rs
//
// Quiz authoring store: quiz creation, question/answer authoring while in
// Draft, and the validated status transition.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    guard,
    models::{
        answer::{Answer, CreateAnswerRequest},
        question::{CreateQuestionRequest, Question},
        quiz::{CreateQuizRequest, Quiz, SetQuizStatusRequest},
    },
    utils::jwt::Claims,
};

/// Creates a new quiz in Draft status, owned by the caller.
/// Creator only.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guard::require_role(&pool, &claims, "Creator").await?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let draft_id: Option<i64> =
        sqlx::query_scalar("SELECT id FROM quiz_statuses WHERE name = 'Draft'")
            .fetch_optional(&pool)
            .await?;
    let draft_id = draft_id.ok_or_else(|| {
        AppError::InternalServerError("Draft status is not seeded".to_string())
    })?;

    let now = chrono::Utc::now();
    let quiz: Quiz = sqlx::query_as(
        "INSERT INTO quizzes (created_by, status_id, title, description, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)
         RETURNING id, created_by, status_id, title, description, created_at, updated_at",
    )
    .bind(user_id)
    .bind(draft_id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Adds a question to a quiz. The quiz must still be in Draft.
/// Creator only.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    guard::require_role(&pool, &claims, "Creator").await?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

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

    if status_name != "Draft" {
        return Err(AppError::BadRequest(
            "Questions can only be added to quizzes in Draft status.".to_string(),
        ));
    }

    let now = chrono::Utc::now();
    let question: Question = sqlx::query_as(
        "INSERT INTO questions (quiz_id, question, created_at, updated_at)
         VALUES (?, ?, ?, ?)
         RETURNING id, quiz_id, question, created_at, updated_at",
    )
    .bind(payload.quiz_id)
    .bind(&payload.question)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Adds an answer to a question. The owning quiz must be the caller's and
/// still in Draft.
/// Creator only; ownership enforced through the question→quiz→owner chain.
pub async fn create_answer(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guard::require_role(&pool, &claims, "Creator").await?;

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let quiz_id: Option<i64> = sqlx::query_scalar("SELECT quiz_id FROM questions WHERE id = ?")
        .bind(payload.question_id)
        .fetch_optional(&pool)
        .await?;
    let quiz_id = quiz_id.ok_or(AppError::NotFound("Question does not exist.".to_string()))?;

    let quiz = guard::require_quiz_owner(&pool, user_id, quiz_id).await?;

    let status_name: String = sqlx::query_scalar("SELECT name FROM quiz_statuses WHERE id = ?")
        .bind(quiz.status_id)
        .fetch_one(&pool)
        .await?;

    if status_name != "Draft" {
        return Err(AppError::BadRequest(
            "Answers can only be added to questions in Draft status.".to_string(),
        ));
    }

    let now = chrono::Utc::now();
    let answer: Answer = sqlx::query_as(
        "INSERT INTO answers (question_id, answer, is_correct, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)
         RETURNING id, question_id, answer, is_correct, created_at, updated_at",
    )
    .bind(payload.question_id)
    .bind(&payload.answer)
    .bind(payload.is_correct)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create answer: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(answer)))
}

/// Transitions a quiz to a named status.
///
/// Publishing validates that every question has at least one answer and
/// reports the full list of offending question ids. Other transitions are
/// unconstrained.
/// Creator only.
pub async fn set_quiz_status(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SetQuizStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    guard::require_role(&pool, &claims, "Creator").await?;

    let quiz_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM quizzes WHERE id = ?")
        .bind(payload.quiz_id)
        .fetch_optional(&pool)
        .await?;
    if quiz_exists.is_none() {
        return Err(AppError::NotFound("Quiz does not exist.".to_string()));
    }

    let status_id: Option<i64> = sqlx::query_scalar("SELECT id FROM quiz_statuses WHERE name = ?")
        .bind(&payload.status)
        .fetch_optional(&pool)
        .await?;
    let status_id = status_id.ok_or(AppError::BadRequest("Status does not exist.".to_string()))?;

    if payload.status == "Published" {
        let unanswered: Vec<i64> = sqlx::query_scalar(
            "SELECT q.id FROM questions q
             LEFT JOIN answers a ON a.question_id = q.id
             WHERE q.quiz_id = ?
             GROUP BY q.id
             HAVING COUNT(a.id) = 0
             ORDER BY q.id",
        )
        .bind(payload.quiz_id)
        .fetch_all(&pool)
        .await?;

        if !unanswered.is_empty() {
            return Err(AppError::BadRequest(format!(
                "The Questions with IDs {:?} do not have answers. \
                 Please add answers to all questions before publishing the quiz.",
                unanswered
            )));
        }
    }

    sqlx::query("UPDATE quizzes SET status_id = ?, updated_at = ? WHERE id = ?")
        .bind(status_id)
        .bind(chrono::Utc::now())
        .bind(payload.quiz_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update quiz status: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(json!({"message": "Quiz status updated successfully."})))
}

/// Lists the quizzes owned by the caller.
/// Creator only.
pub async fn get_user_quizzes(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guard::require_role(&pool, &claims, "Creator").await?;

    let quizzes: Vec<Quiz> = sqlx::query_as(
        "SELECT id, created_by, status_id, title, description, created_at, updated_at
         FROM quizzes WHERE created_by = ? ORDER BY id DESC",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(quizzes))
}

/// Lists a quiz's questions in presentation (creation) order.
///
/// Creator only. Whether any Creator may view or only the owner is a
/// configured boundary (`QUESTIONS_VIEW_OWNER_ONLY`); the default mirrors
/// the historical any-Creator behavior.
pub async fn get_questions_by_quiz(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guard::require_role(&pool, &claims, "Creator").await?;

    if config.questions_view_owner_only {
        guard::require_quiz_owner(&pool, user_id, quiz_id).await?;
    } else {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM quizzes WHERE id = ?")
            .bind(quiz_id)
            .fetch_optional(&pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound("Quiz does not exist.".to_string()));
        }
    }

    let questions: Vec<Question> = sqlx::query_as(
        "SELECT id, quiz_id, question, created_at, updated_at
         FROM questions WHERE quiz_id = ?
         ORDER BY created_at, id",
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(questions))
}

/// Lists a question's answers for a participant.
///
/// The quiz must be Published and the caller must hold a progress row for
/// it, i.e. have accepted the assignment.
pub async fn get_answers_by_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guard::principal_id(&claims)?;

    let question: Option<(i64, String)> = sqlx::query_as(
        "SELECT q.quiz_id, s.name
         FROM questions q
         JOIN quizzes qz ON qz.id = q.quiz_id
         JOIN quiz_statuses s ON s.id = qz.status_id
         WHERE q.id = ?",
    )
    .bind(question_id)
    .fetch_optional(&pool)
    .await?;

    let (quiz_id, status_name) =
        question.ok_or(AppError::NotFound("Question does not exist.".to_string()))?;

    if status_name != "Published" {
        return Err(AppError::BadRequest("Quiz is not published.".to_string()));
    }

    let progress: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM user_quiz_progress WHERE user_id = ? AND quiz_id = ?",
    )
    .bind(user_id)
    .bind(quiz_id)
    .fetch_optional(&pool)
    .await?;

    if progress.is_none() {
        return Err(AppError::Forbidden(
            "User does not have access to the question.".to_string(),
        ));
    }

    let answers: Vec<Answer> = sqlx::query_as(
        "SELECT id, question_id, answer, is_correct, created_at, updated_at
         FROM answers WHERE question_id = ? ORDER BY id",
    )
    .bind(question_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(answers))
}
