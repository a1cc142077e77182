//! Annotation ledger operations
//!
//! At most one decision per annotator per snippet: `record` upserts
//! against the UNIQUE(user_id, snippet_id) constraint, so a duplicate
//! form post replaces rather than double-counts.

use kwicmark_common::{Annotation, Decision, Result, Snippet};
use sqlx::{Row, SqlitePool};

/// One ledger entry scoped to a project
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub user_id: i64,
    pub username: String,
    pub snippet_id: i64,
    pub decision: Decision,
}

/// A ledger entry joined with its snippet's content text, for the
/// duplicate-content consistency check
#[derive(Debug, Clone)]
pub struct ContentEntry {
    pub user_id: i64,
    pub username: String,
    pub content: String,
    pub decision: Decision,
}

/// Record a decision for (annotator, snippet); replaces any prior
/// decision by the same annotator
pub async fn record(
    pool: &SqlitePool,
    user_id: i64,
    snippet_id: i64,
    decision: Decision,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO annotations (snippet_id, user_id, decision)
        VALUES (?, ?, ?)
        ON CONFLICT(user_id, snippet_id) DO UPDATE SET
            decision = excluded.decision,
            created_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(snippet_id)
    .bind(user_id)
    .bind(decision.as_i64())
    .execute(pool)
    .await?;

    Ok(())
}

/// This annotator's ledger row for a snippet, if any
pub async fn get_for(
    pool: &SqlitePool,
    user_id: i64,
    snippet_id: i64,
) -> Result<Option<Annotation>> {
    let row = sqlx::query(
        r#"
        SELECT id, snippet_id, user_id, decision, created_at
        FROM annotations
        WHERE user_id = ? AND snippet_id = ?
        "#,
    )
    .bind(user_id)
    .bind(snippet_id)
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        Ok(Annotation {
            id: row.get("id"),
            snippet_id: row.get("snippet_id"),
            user_id: row.get("user_id"),
            decision: Decision::from_i64(row.get("decision"))?,
            created_at: row.get("created_at"),
        })
    })
    .transpose()
}

/// How many snippets of a project this user has annotated
pub async fn count_for_user(pool: &SqlitePool, user_id: i64, project_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM annotations
        WHERE user_id = ?
          AND snippet_id IN (SELECT id FROM snippets WHERE project_id = ?)
        "#,
    )
    .bind(user_id)
    .bind(project_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// First snippet (by id) of a project this user has not yet annotated
pub async fn first_unannotated(
    pool: &SqlitePool,
    user_id: i64,
    project_id: i64,
) -> Result<Option<Snippet>> {
    let row = sqlx::query(
        r#"
        SELECT s.id, s.project_id, s.content, s.highlight
        FROM snippets s
        LEFT JOIN annotations a ON s.id = a.snippet_id AND a.user_id = ?
        WHERE s.project_id = ? AND a.id IS NULL
        ORDER BY s.id
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(project_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Snippet {
        id: row.get("id"),
        project_id: row.get("project_id"),
        content: row.get("content"),
        highlight: row.get("highlight"),
    }))
}

/// All ledger entries for a project with annotator usernames, ordered
/// by (snippet, annotator)
pub async fn all_for_project(pool: &SqlitePool, project_id: i64) -> Result<Vec<LedgerEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT a.user_id, u.username, a.snippet_id, a.decision
        FROM annotations a
        JOIN users u ON a.user_id = u.id
        JOIN snippets s ON a.snippet_id = s.id
        WHERE s.project_id = ?
        ORDER BY a.snippet_id, a.user_id
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(LedgerEntry {
                user_id: row.get("user_id"),
                username: row.get("username"),
                snippet_id: row.get("snippet_id"),
                decision: Decision::from_i64(row.get("decision"))?,
            })
        })
        .collect()
}

/// All ledger entries for a project joined with snippet content text
pub async fn all_with_content(pool: &SqlitePool, project_id: i64) -> Result<Vec<ContentEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT a.user_id, u.username, s.content, a.decision
        FROM annotations a
        JOIN users u ON a.user_id = u.id
        JOIN snippets s ON a.snippet_id = s.id
        WHERE s.project_id = ?
        ORDER BY a.user_id, s.id
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(ContentEntry {
                user_id: row.get("user_id"),
                username: row.get("username"),
                content: row.get("content"),
                decision: Decision::from_i64(row.get("decision"))?,
            })
        })
        .collect()
}

/// Distinct annotators with at least one annotation in the project,
/// ordered by user id
pub async fn annotator_ids(pool: &SqlitePool, project_id: i64) -> Result<Vec<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT a.user_id
        FROM annotations a
        JOIN snippets s ON a.snippet_id = s.id
        WHERE s.project_id = ?
        ORDER BY a.user_id
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Decision pairs over the snippets both raters annotated in a project
pub async fn paired_decisions(
    pool: &SqlitePool,
    project_id: i64,
    rater_a: i64,
    rater_b: i64,
) -> Result<Vec<(Decision, Decision)>> {
    let rows = sqlx::query(
        r#"
        SELECT a1.decision AS decision_a, a2.decision AS decision_b
        FROM snippets s
        JOIN annotations a1 ON s.id = a1.snippet_id AND a1.user_id = ?
        JOIN annotations a2 ON s.id = a2.snippet_id AND a2.user_id = ?
        WHERE s.project_id = ?
        ORDER BY s.id
        "#,
    )
    .bind(rater_a)
    .bind(rater_b)
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok((
                Decision::from_i64(row.get("decision_a"))?,
                Decision::from_i64(row.get("decision_b"))?,
            ))
        })
        .collect()
}
