//! Project and assignment database operations

use kwicmark_common::{Error, Project, Result};
use sqlx::{Row, SqlitePool};

/// Create a project, returning the new id
pub async fn create(pool: &SqlitePool, name: &str, instructions: Option<&str>) -> Result<i64> {
    let result = sqlx::query("INSERT INTO projects (name, instructions) VALUES (?, ?)")
        .bind(name)
        .bind(instructions)
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Fetch a project by id
pub async fn get(pool: &SqlitePool, project_id: i64) -> Result<Project> {
    let row = sqlx::query("SELECT id, name, instructions FROM projects WHERE id = ?")
        .bind(project_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("project {}", project_id)))?;

    Ok(Project {
        id: row.get("id"),
        name: row.get("name"),
        instructions: row.get("instructions"),
    })
}

/// Assign a user to a project (idempotent)
pub async fn assign_user(pool: &SqlitePool, user_id: i64, project_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO user_projects (user_id, project_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(project_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Verify that a user is assigned to a project
///
/// Access by a non-assigned user is a hard rejection, not a silent
/// empty result.
pub async fn ensure_assigned(pool: &SqlitePool, user_id: i64, project_id: i64) -> Result<()> {
    let assigned: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM user_projects WHERE user_id = ? AND project_id = ?)",
    )
    .bind(user_id)
    .bind(project_id)
    .fetch_one(pool)
    .await?;

    if assigned {
        Ok(())
    } else {
        Err(Error::Unauthorized(format!(
            "user {} is not assigned to project {}",
            user_id, project_id
        )))
    }
}
