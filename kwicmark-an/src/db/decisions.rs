//! Final decision store operations

use kwicmark_common::{Decision, FinalDecision, Result};
use sqlx::{Row, SqlitePool};

/// Record the adjudicated decision for a snippet; repeated resolution
/// overwrites the prior decision
pub async fn resolve(pool: &SqlitePool, snippet_id: i64, decision: Decision) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO final_decisions (snippet_id, decision)
        VALUES (?, ?)
        ON CONFLICT(snippet_id) DO UPDATE SET
            decision = excluded.decision,
            created_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(snippet_id)
    .bind(decision.as_i64())
    .execute(pool)
    .await?;

    Ok(())
}

/// The adjudicated decision for a snippet, if any
pub async fn get(pool: &SqlitePool, snippet_id: i64) -> Result<Option<Decision>> {
    let value: Option<i64> =
        sqlx::query_scalar("SELECT decision FROM final_decisions WHERE snippet_id = ?")
            .bind(snippet_id)
            .fetch_optional(pool)
            .await?;

    value.map(Decision::from_i64).transpose()
}

/// All adjudicated decisions for a project, ordered by snippet id
pub async fn all_for_project(pool: &SqlitePool, project_id: i64) -> Result<Vec<FinalDecision>> {
    let rows = sqlx::query(
        r#"
        SELECT fd.snippet_id, fd.decision
        FROM final_decisions fd
        JOIN snippets s ON fd.snippet_id = s.id
        WHERE s.project_id = ?
        ORDER BY fd.snippet_id
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(FinalDecision {
                snippet_id: row.get("snippet_id"),
                decision: Decision::from_i64(row.get("decision"))?,
            })
        })
        .collect()
}
