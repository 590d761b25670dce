// src/seed.rs

use sqlx::SqlitePool;

/// Idempotently inserts the reference rows the domain rules key on by name.
///
/// Roles and statuses are modeled as data rows rather than enums so new ones
/// can be added without a schema change; these are the canonical instances.
pub async fn seed_reference_data(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let roles = [
        ("Creator", "Can author, publish and assign quizzes.", 1),
        ("Participant", "Can accept assignments and answer questions.", 100),
    ];

    for (name, description, rank) in roles {
        sqlx::query(
            "INSERT INTO roles (name, description, rank) VALUES (?, ?, ?)
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(name)
        .bind(description)
        .bind(rank)
        .execute(pool)
        .await?;
    }

    let statuses = [
        ("Draft", "Being authored; questions and answers may change."),
        ("Published", "Visible to participants and assignable."),
        ("Closed", "No longer open for participation."),
    ];

    for (name, description) in statuses {
        sqlx::query(
            "INSERT INTO quiz_statuses (name, description) VALUES (?, ?)
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;
    }

    Ok(())
}
