//! Bulk JSON import and export
//!
//! Import consumes an array of `{content, kwic}` records, one snippet
//! each with `highlight = kwic`; a null or absent `kwic` imports a
//! snippet without a highlight. Decoding is otherwise strict and the
//! inserts run in a single transaction: a malformed record anywhere
//! rejects the whole file with nothing imported. Export emits the
//! pretty-printed annotation state; only snippets round-trip back
//! through import.

use crate::adjudication::final_decision;
use crate::db::{annotations, decisions, projects, snippets};
use kwicmark_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::info;

/// One record of the import format
#[derive(Debug, Deserialize)]
pub struct ImportRecord {
    pub content: String,
    /// Highlighted span; null or absent imports a snippet without one
    #[serde(default)]
    pub kwic: Option<String>,
}

/// One record of the export format
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportRecord {
    pub id: i64,
    pub content: String,
    pub kwic: Option<String>,
    /// Recorded decisions as 0/1, ordered by annotator id
    pub annotations: Vec<i64>,
    /// Explicit adjudication, else the unanimous decision, else null
    pub final_decision: Option<bool>,
}

/// Import snippets from a JSON file into a project
///
/// Returns the number of snippets created. All-or-nothing: a decode
/// failure or insert error rolls the transaction back.
pub async fn import_json(pool: &SqlitePool, project_id: i64, path: &Path) -> Result<usize> {
    // Reject imports into projects that don't exist
    projects::get(pool, project_id).await?;

    let raw = std::fs::read_to_string(path)?;
    let records: Vec<ImportRecord> = serde_json::from_str(&raw)
        .map_err(|e| Error::InvalidInput(format!("invalid import data: {}", e)))?;

    let mut tx = pool.begin().await?;
    for record in &records {
        snippets::insert(&mut tx, project_id, &record.content, record.kwic.as_deref()).await?;
    }
    tx.commit().await?;

    info!(
        "Imported {} snippets into project {}",
        records.len(),
        project_id
    );
    Ok(records.len())
}

/// Gather the export records for a project
pub async fn export_records(pool: &SqlitePool, project_id: i64) -> Result<Vec<ExportRecord>> {
    let snippet_list = snippets::list_by_project(pool, project_id).await?;
    let entries = annotations::all_for_project(pool, project_id).await?;
    let resolved: HashMap<i64, kwicmark_common::Decision> =
        decisions::all_for_project(pool, project_id)
            .await?
            .into_iter()
            .map(|fd| (fd.snippet_id, fd.decision))
            .collect();

    // Decisions per snippet keyed by annotator id; BTreeMap fixes the
    // export order
    let mut by_snippet: BTreeMap<i64, BTreeMap<i64, kwicmark_common::Decision>> = BTreeMap::new();
    for entry in entries {
        by_snippet
            .entry(entry.snippet_id)
            .or_default()
            .insert(entry.user_id, entry.decision);
    }

    Ok(snippet_list
        .into_iter()
        .map(|snippet| {
            let decisions: Vec<_> = by_snippet
                .remove(&snippet.id)
                .map(|m| m.into_values().collect())
                .unwrap_or_default();
            let explicit = resolved.get(&snippet.id).copied();
            let final_decision = final_decision(explicit, &decisions).map(|d| d.as_bool());

            ExportRecord {
                id: snippet.id,
                content: snippet.content,
                kwic: snippet.highlight,
                annotations: decisions.iter().map(|d| d.as_i64()).collect(),
                final_decision,
            }
        })
        .collect())
}

/// Export a project's snippets, annotations, and final decisions to a
/// pretty-printed JSON file
///
/// Returns the number of snippets exported.
pub async fn export_json(pool: &SqlitePool, project_id: i64, path: &Path) -> Result<usize> {
    let records = export_records(pool, project_id).await?;

    let json = serde_json::to_string_pretty(&records)
        .map_err(|e| Error::Internal(format!("failed to serialize export: {}", e)))?;
    std::fs::write(path, json)?;

    info!(
        "Exported {} snippets from project {} to {}",
        records.len(),
        project_id,
        path.display()
    );
    Ok(records.len())
}
