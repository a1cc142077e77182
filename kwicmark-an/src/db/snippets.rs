//! Snippet store operations
//!
//! Snippets are ordered by id within a project; that order is the
//! cursor's iteration order.

use kwicmark_common::{Result, Snippet};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

fn snippet_from_row(row: &sqlx::sqlite::SqliteRow) -> Snippet {
    Snippet {
        id: row.get("id"),
        project_id: row.get("project_id"),
        content: row.get("content"),
        highlight: row.get("highlight"),
    }
}

/// All snippets of a project, ordered by id
pub async fn list_by_project(pool: &SqlitePool, project_id: i64) -> Result<Vec<Snippet>> {
    let rows = sqlx::query(
        "SELECT id, project_id, content, highlight FROM snippets WHERE project_id = ? ORDER BY id",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(snippet_from_row).collect())
}

/// Look up one snippet by (project, id)
pub async fn get(pool: &SqlitePool, project_id: i64, snippet_id: i64) -> Result<Option<Snippet>> {
    let row = sqlx::query(
        "SELECT id, project_id, content, highlight FROM snippets WHERE project_id = ? AND id = ?",
    )
    .bind(project_id)
    .bind(snippet_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(snippet_from_row))
}

/// Look up a snippet by id alone, when the project is not yet known
pub async fn get_by_id(pool: &SqlitePool, snippet_id: i64) -> Result<Option<Snippet>> {
    let row = sqlx::query("SELECT id, project_id, content, highlight FROM snippets WHERE id = ?")
        .bind(snippet_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(snippet_from_row))
}

/// Smallest and largest snippet id in a project, or None if the
/// project has no snippets
pub async fn min_max_id(pool: &SqlitePool, project_id: i64) -> Result<Option<(i64, i64)>> {
    let row = sqlx::query(
        "SELECT MIN(id) AS min_id, MAX(id) AS max_id FROM snippets WHERE project_id = ?",
    )
    .bind(project_id)
    .fetch_one(pool)
    .await?;

    let min_id: Option<i64> = row.get("min_id");
    let max_id: Option<i64> = row.get("max_id");
    Ok(min_id.zip(max_id))
}

/// First snippet of the project with id >= the given id
///
/// Snippet ids auto-increment across all projects, so a project's id
/// range can have interior gaps; this resolves a gap when moving
/// forward.
pub async fn first_at_or_after(
    pool: &SqlitePool,
    project_id: i64,
    snippet_id: i64,
) -> Result<Option<Snippet>> {
    let row = sqlx::query(
        r#"
        SELECT id, project_id, content, highlight
        FROM snippets
        WHERE project_id = ? AND id >= ?
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(project_id)
    .bind(snippet_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(snippet_from_row))
}

/// Last snippet of the project with id <= the given id
pub async fn last_at_or_before(
    pool: &SqlitePool,
    project_id: i64,
    snippet_id: i64,
) -> Result<Option<Snippet>> {
    let row = sqlx::query(
        r#"
        SELECT id, project_id, content, highlight
        FROM snippets
        WHERE project_id = ? AND id <= ?
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(project_id)
    .bind(snippet_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(snippet_from_row))
}

/// Total snippet count for a project
pub async fn total_count(pool: &SqlitePool, project_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM snippets WHERE project_id = ?")
        .bind(project_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Insert a snippet inside an import transaction, returning the new id
pub async fn insert(
    tx: &mut Transaction<'_, Sqlite>,
    project_id: i64,
    content: &str,
    highlight: Option<&str>,
) -> Result<i64> {
    let result = sqlx::query("INSERT INTO snippets (project_id, content, highlight) VALUES (?, ?, ?)")
        .bind(project_id)
        .bind(content)
        .bind(highlight)
        .execute(&mut **tx)
        .await?;

    Ok(result.last_insert_rowid())
}
