// src/handlers/reference.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    guard,
    models::{
        role::{QuizStatus, Role},
        user::UserListItem,
    },
    utils::jwt::Claims,
};

/// Lists the available quiz lifecycle statuses.
pub async fn get_quiz_statuses(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let statuses: Vec<QuizStatus> =
        sqlx::query_as("SELECT id, name, description FROM quiz_statuses ORDER BY id")
            .fetch_all(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list quiz statuses: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

    Ok(Json(statuses))
}

/// Lists the available user roles.
pub async fn get_available_roles(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let roles: Vec<Role> =
        sqlx::query_as("SELECT id, name, description, rank FROM roles ORDER BY rank, id")
            .fetch_all(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list roles: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

    Ok(Json(roles))
}

/// Lists all users with their resolved role names.
/// Creator only.
pub async fn get_all_users(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    guard::require_role(&pool, &claims, "Creator").await?;

    let users: Vec<UserListItem> = sqlx::query_as(
        "SELECT u.id, u.username, r.name AS role_name
         FROM users u
         LEFT JOIN user_profiles p ON p.user_id = u.id
         LEFT JOIN roles r ON r.id = p.role_id
         ORDER BY u.id",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}
