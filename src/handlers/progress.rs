// src/handlers/progress.rs
//
// Progress engine endpoints: answer recording with its idempotency rule,
// next-question sequencing, and the read-side score aggregation.

use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    engine::{self, AnswerChoice},
    error::{AppError, is_foreign_key_violation},
    guard,
    models::{
        progress::{
            AnsweredQuestion, AnsweredQuestionResponse, ProgressSummary, ScoreRosterEntry,
            SubmitAnswerRequest, UserQuizProgress,
        },
        question::Question,
        quiz::Quiz,
    },
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct QuizQuery {
    pub quiz_id: i64,
}

/// Records the caller's selected answer for a question.
///
/// Idempotent on the (progress, question, answer) triple: resubmitting an
/// already-recorded choice returns the existing row with 200 instead of
/// creating a duplicate, but still advances the sequencing cursor. A fresh
/// row answers 201. The insert-or-ignore plus re-select runs inside one
/// transaction against the UNIQUE constraint, so concurrent submissions of
/// the same triple cannot produce two rows.
pub async fn submit_answer(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guard::principal_id(&claims)?;

    let quiz_id: Option<i64> = sqlx::query_scalar("SELECT quiz_id FROM questions WHERE id = ?")
        .bind(payload.question_id)
        .fetch_optional(&pool)
        .await?;
    let quiz_id = quiz_id.ok_or(AppError::NotFound("Question does not exist.".to_string()))?;

    let is_correct: Option<bool> = sqlx::query_scalar("SELECT is_correct FROM answers WHERE id = ?")
        .bind(payload.answer_id)
        .fetch_optional(&pool)
        .await?;
    let is_correct = is_correct.ok_or(AppError::NotFound("Answer does not exist.".to_string()))?;

    let mut tx = pool.begin().await?;

    // A missing progress row means the caller has no access path to the
    // question. Fail closed. Checked inside the transaction so a concurrent
    // decline cannot slip between the check and the insert.
    let progress_id: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM user_quiz_progress WHERE user_id = ? AND quiz_id = ?",
    )
    .bind(user_id)
    .bind(quiz_id)
    .fetch_optional(&mut *tx)
    .await?;
    let progress_id = progress_id.ok_or(AppError::Forbidden(
        "User does not have access to the question.".to_string(),
    ))?;

    let inserted = sqlx::query(
        "INSERT INTO answered_questions (progress_id, question_id, answer_id, answered_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(progress_id, question_id, answer_id) DO NOTHING",
    )
    .bind(progress_id)
    .bind(payload.question_id)
    .bind(payload.answer_id)
    .bind(chrono::Utc::now())
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        // The progress row can still vanish under a decline racing this
        // insert; the dangling reference surfaces as an FK failure.
        if is_foreign_key_violation(&e) {
            AppError::Forbidden("User does not have access to the question.".to_string())
        } else {
            AppError::from(e)
        }
    })?;
    let created = inserted.rows_affected() == 1;

    let row: AnsweredQuestion = sqlx::query_as(
        "SELECT id, progress_id, question_id, answer_id, answered_at
         FROM answered_questions
         WHERE progress_id = ? AND question_id = ? AND answer_id = ?",
    )
    .bind(progress_id)
    .bind(payload.question_id)
    .bind(payload.answer_id)
    .fetch_one(&mut *tx)
    .await?;

    // The cursor advances even on an idempotent resubmission.
    sqlx::query("UPDATE user_quiz_progress SET last_answered_question_id = ? WHERE id = ?")
        .bind(payload.question_id)
        .bind(progress_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(AnsweredQuestionResponse {
            id: row.id,
            progress_id: row.progress_id,
            question_id: row.question_id,
            answer_id: row.answer_id,
            is_correct,
            answered_at: row.answered_at,
        }),
    ))
}

/// Returns the next question for the caller's progress on a quiz, or the
/// quiz-completed message once no unanswered question remains after the
/// cursor. Completion is persisted when first detected.
pub async fn get_next_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<QuizQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guard::principal_id(&claims)?;

    let quiz_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM quizzes WHERE id = ?")
        .bind(params.quiz_id)
        .fetch_optional(&pool)
        .await?;
    if quiz_exists.is_none() {
        return Err(AppError::NotFound("Quiz does not exist.".to_string()));
    }

    let progress: Option<UserQuizProgress> = sqlx::query_as(
        "SELECT id, user_id, quiz_id, last_answered_question_id, score, completed,
                started_at, completed_at
         FROM user_quiz_progress WHERE user_id = ? AND quiz_id = ?",
    )
    .bind(user_id)
    .bind(params.quiz_id)
    .fetch_optional(&pool)
    .await?;
    let progress = progress.ok_or(AppError::Forbidden(
        "User does not have access to the quiz.".to_string(),
    ))?;

    let questions: Vec<Question> = sqlx::query_as(
        "SELECT id, quiz_id, question, created_at, updated_at
         FROM questions WHERE quiz_id = ?
         ORDER BY created_at, id",
    )
    .bind(params.quiz_id)
    .fetch_all(&pool)
    .await?;

    let answered: HashSet<i64> = sqlx::query_scalar(
        "SELECT DISTINCT question_id FROM answered_questions WHERE progress_id = ?",
    )
    .bind(progress.id)
    .fetch_all(&pool)
    .await?
    .into_iter()
    .collect();

    // A deleted question nulls the cursor reference; restart from the top.
    let cursor = progress
        .last_answered_question_id
        .and_then(|id| questions.iter().find(|q| q.id == id));

    match engine::next_question(&questions, cursor, &answered) {
        Some(question) => Ok(Json(question.clone()).into_response()),
        None => {
            sqlx::query(
                "UPDATE user_quiz_progress
                 SET completed = 1, completed_at = COALESCE(completed_at, ?)
                 WHERE id = ?",
            )
            .bind(chrono::Utc::now())
            .bind(progress.id)
            .execute(&pool)
            .await?;

            Ok(Json(json!({"message": "Quiz completed."})).into_response())
        }
    }
}

/// The caller's own progress and score aggregation for a quiz.
pub async fn get_participant_progress(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<QuizQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guard::principal_id(&claims)?;

    let title: Option<String> = sqlx::query_scalar("SELECT title FROM quizzes WHERE id = ?")
        .bind(params.quiz_id)
        .fetch_optional(&pool)
        .await?;
    let title = title.ok_or(AppError::NotFound("Quiz does not exist.".to_string()))?;

    let progress_id: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM user_quiz_progress WHERE user_id = ? AND quiz_id = ?",
    )
    .bind(user_id)
    .bind(params.quiz_id)
    .fetch_optional(&pool)
    .await?;
    let progress_id = progress_id.ok_or(AppError::Forbidden(
        "User does not have access to the quiz.".to_string(),
    ))?;

    let (total_questions, choices) = quiz_aggregation_inputs(&pool, params.quiz_id).await?;
    let scorecard = progress_scorecard(&pool, progress_id, total_questions, &choices).await?;

    Ok(Json(ProgressSummary {
        quiz: title,
        scorecard,
    }))
}

/// Per-participant score roster for a quiz.
/// Creator only, and only for the owning creator.
pub async fn get_quiz_scores(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = guard::require_role(&pool, &claims, "Creator").await?;

    let quiz: Option<Quiz> = sqlx::query_as(
        "SELECT id, created_by, status_id, title, description, created_at, updated_at
         FROM quizzes WHERE id = ?",
    )
    .bind(quiz_id)
    .fetch_optional(&pool)
    .await?;
    let quiz = quiz.ok_or(AppError::NotFound("Quiz does not exist.".to_string()))?;

    if quiz.created_by != user_id {
        return Err(AppError::Forbidden(
            "You do not have permission to view this quiz.".to_string(),
        ));
    }

    let (total_questions, choices) = quiz_aggregation_inputs(&pool, quiz_id).await?;

    let progresses: Vec<(i64, String)> = sqlx::query_as(
        "SELECT p.id, u.username
         FROM user_quiz_progress p
         JOIN users u ON u.id = p.user_id
         WHERE p.quiz_id = ?
         ORDER BY p.id",
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await?;

    let mut scores = Vec::with_capacity(progresses.len());
    for (progress_id, username) in progresses {
        let scorecard = progress_scorecard(&pool, progress_id, total_questions, &choices).await?;
        scores.push(ScoreRosterEntry {
            user: username,
            scorecard,
        });
    }

    Ok(Json(scores))
}

/// Fetches the quiz-wide aggregation inputs: the question count and every
/// (question, answer) pair with its correctness flag.
async fn quiz_aggregation_inputs(
    pool: &SqlitePool,
    quiz_id: i64,
) -> Result<(i64, Vec<AnswerChoice>), AppError> {
    let total_questions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE quiz_id = ?")
        .bind(quiz_id)
        .fetch_one(pool)
        .await?;

    let choices: Vec<AnswerChoice> = sqlx::query_as(
        "SELECT a.question_id, a.id AS answer_id, a.is_correct
         FROM answers a
         JOIN questions q ON q.id = a.question_id
         WHERE q.quiz_id = ?",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    Ok((total_questions, choices))
}

/// Computes one progress record's scorecard from its selections.
async fn progress_scorecard(
    pool: &SqlitePool,
    progress_id: i64,
    total_questions: i64,
    choices: &[AnswerChoice],
) -> Result<engine::Scorecard, AppError> {
    let selections: HashSet<(i64, i64)> = sqlx::query_as(
        "SELECT question_id, answer_id FROM answered_questions WHERE progress_id = ?",
    )
    .bind(progress_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .collect();

    let answered_questions: HashSet<i64> =
        selections.iter().map(|(question_id, _)| *question_id).collect();

    Ok(engine::scorecard(
        total_questions,
        choices,
        &selections,
        &answered_questions,
    ))
}
