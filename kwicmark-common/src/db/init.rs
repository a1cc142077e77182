//! Database initialization
//!
//! Creates the SQLite pool and the Kwicmark schema on first run. All
//! schema functions are idempotent (CREATE TABLE IF NOT EXISTS), so
//! init can be called on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers while an annotator writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_users_table(&pool).await?;
    create_projects_table(&pool).await?;
    create_user_projects_table(&pool).await?;
    create_snippets_table(&pool).await?;
    create_annotations_table(&pool).await?;
    create_final_decisions_table(&pool).await?;

    Ok(pool)
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL CHECK (role IN ('annotator', 'superannotator')),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_projects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            instructions TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_user_projects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_projects (
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (user_id, project_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the snippets table
///
/// Snippets are immutable once imported. The AUTOINCREMENT id doubles
/// as the cursor iteration order within a project.
async fn create_snippets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS snippets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            content TEXT NOT NULL,
            highlight TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_snippets_project ON snippets(project_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the annotations table
///
/// UNIQUE(user_id, snippet_id) enforces at most one decision per
/// annotator per snippet; `record` upserts against this constraint.
async fn create_annotations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS annotations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            snippet_id INTEGER NOT NULL REFERENCES snippets(id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            decision INTEGER NOT NULL CHECK (decision IN (0, 1)),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (user_id, snippet_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_annotations_snippet ON annotations(snippet_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the final_decisions table
///
/// snippet_id is the primary key: at most one adjudicated decision per
/// snippet, and repeated resolution overwrites instead of accumulating.
async fn create_final_decisions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS final_decisions (
            snippet_id INTEGER PRIMARY KEY REFERENCES snippets(id) ON DELETE CASCADE,
            decision INTEGER NOT NULL CHECK (decision IN (0, 1)),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("kwicmark.db"))
            .await
            .expect("init should succeed");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        for expected in [
            "annotations",
            "final_decisions",
            "projects",
            "snippets",
            "user_projects",
            "users",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
        }
    }

    #[tokio::test]
    async fn init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("kwicmark.db");
        let pool = init_database(&db_path).await.unwrap();
        drop(pool);
        init_database(&db_path).await.expect("re-init should succeed");
    }

    #[tokio::test]
    async fn annotations_unique_per_user_snippet() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("kwicmark.db")).await.unwrap();

        sqlx::query("INSERT INTO users (username, role) VALUES ('alice', 'annotator')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO projects (name) VALUES ('p')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO snippets (project_id, content) VALUES (1, 'text')")
            .execute(&pool)
            .await
            .unwrap();

        sqlx::query("INSERT INTO annotations (snippet_id, user_id, decision) VALUES (1, 1, 1)")
            .execute(&pool)
            .await
            .unwrap();
        let dup = sqlx::query(
            "INSERT INTO annotations (snippet_id, user_id, decision) VALUES (1, 1, 0)",
        )
        .execute(&pool)
        .await;
        assert!(dup.is_err(), "duplicate (user, snippet) must be rejected");
    }
}
