// src/models/role.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'roles' table. Shared reference data.
///
/// `rank` is display/filtering metadata only; authorization compares role
/// names for exact equality and never consults it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub rank: i64,
}

/// Represents the 'quiz_statuses' table. Shared reference data.
///
/// Statuses are rows rather than an enum so new lifecycle states can be
/// added without a schema change. Draft, Published and Closed are seeded.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizStatus {
    pub id: i64,
    pub name: String,
    pub description: String,
}
