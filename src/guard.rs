// src/guard.rs
//
// Access-control guard: explicit capability checks invoked at the top of
// each handler, instead of role middleware. Anonymous callers never reach
// these; the bearer-token middleware already rejected them with 401.

use sqlx::SqlitePool;

use crate::{error::AppError, models::quiz::Quiz, utils::jwt::Claims};

/// Extracts the authenticated user id from the verified claims.
pub fn principal_id(claims: &Claims) -> Result<i64, AppError> {
    claims
        .sub
        .parse()
        .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))
}

/// Role-based check: the principal's profile role name must equal
/// `required_role` exactly. No hierarchy, no rank comparison.
///
/// Fails closed: a missing profile row is Forbidden, not Not-Found.
/// Returns the caller's user id on success.
pub async fn require_role(
    pool: &SqlitePool,
    claims: &Claims,
    required_role: &str,
) -> Result<i64, AppError> {
    let user_id = principal_id(claims)?;

    let profile: Option<(Option<String>,)> = sqlx::query_as(
        "SELECT r.name
         FROM user_profiles p
         LEFT JOIN roles r ON r.id = p.role_id
         WHERE p.user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match profile {
        None => Err(AppError::Forbidden("User profile does not exist.".to_string())),
        Some((role_name,)) if role_name.as_deref() == Some(required_role) => Ok(user_id),
        Some(_) => Err(AppError::Forbidden(
            "You do not have permission to perform this action.".to_string(),
        )),
    }
}

/// Ownership check: the quiz must exist and be owned by `user_id`.
/// Required in addition to the role check for answer-authoring mutations.
pub async fn require_quiz_owner(
    pool: &SqlitePool,
    user_id: i64,
    quiz_id: i64,
) -> Result<Quiz, AppError> {
    let quiz: Option<Quiz> = sqlx::query_as(
        "SELECT id, created_by, status_id, title, description, created_at, updated_at
         FROM quizzes WHERE id = ?",
    )
    .bind(quiz_id)
    .fetch_optional(pool)
    .await?;

    let quiz = quiz.ok_or(AppError::NotFound("Quiz does not exist.".to_string()))?;

    if quiz.created_by != user_id {
        return Err(AppError::Forbidden(
            "You do not have permission to perform this action.".to_string(),
        ));
    }

    Ok(quiz)
}
