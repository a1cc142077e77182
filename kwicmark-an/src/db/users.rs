//! User database operations

use kwicmark_common::{Error, Result, Role, User};
use sqlx::{Row, SqlitePool};

/// Create a user, returning the new id
pub async fn create(pool: &SqlitePool, username: &str, role: Role) -> Result<i64> {
    let result = sqlx::query("INSERT INTO users (username, role) VALUES (?, ?)")
        .bind(username)
        .bind(role.as_str())
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Look a user up by username
pub async fn get_by_username(pool: &SqlitePool, username: &str) -> Result<User> {
    let row = sqlx::query("SELECT id, username, role FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("user '{}'", username)))?;

    let role: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        role: Role::from_str(&role)?,
    })
}
