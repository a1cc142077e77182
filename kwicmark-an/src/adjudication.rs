//! Adjudication resolver
//!
//! Finds snippets whose annotators disagree, walks them through a
//! superannotator review queue, and records the authoritative final
//! decision. The queue is a materialized snapshot with an explicit
//! `refresh`; it does not silently go stale across a long session.

use crate::db::{annotations, decisions, projects, snippets};
use kwicmark_common::{Decision, Error, Result, Role, Snippet, User};
use sqlx::SqlitePool;
use std::collections::BTreeMap;

/// A snippet whose annotations are not unanimous
#[derive(Debug, Clone)]
pub struct Disagreement {
    pub snippet: Snippet,
    /// Annotator username -> decision
    pub annotations: BTreeMap<String, Decision>,
}

/// Snippets with inter-annotator disagreement, ordered by snippet id
///
/// A snippet qualifies when more than one distinct decision appears
/// among its annotations.
pub async fn disagreements(pool: &SqlitePool, project_id: i64) -> Result<Vec<Disagreement>> {
    let snippets = snippets::list_by_project(pool, project_id).await?;
    let entries = annotations::all_for_project(pool, project_id).await?;

    let mut by_snippet: BTreeMap<i64, BTreeMap<String, Decision>> = BTreeMap::new();
    for entry in entries {
        by_snippet
            .entry(entry.snippet_id)
            .or_default()
            .insert(entry.username, entry.decision);
    }

    Ok(snippets
        .into_iter()
        .filter_map(|snippet| {
            let annotations = by_snippet.remove(&snippet.id)?;
            let mut values = annotations.values();
            let first = *values.next()?;
            if values.any(|&d| d != first) {
                Some(Disagreement {
                    snippet,
                    annotations,
                })
            } else {
                None
            }
        })
        .collect())
}

/// Record the superannotator's decision for a snippet (overwrites any
/// prior resolution)
pub async fn resolve(pool: &SqlitePool, snippet_id: i64, decision: Decision) -> Result<()> {
    decisions::resolve(pool, snippet_id, decision).await
}

/// Record a final decision on behalf of a user
///
/// The operational entry point: the user must hold the superannotator
/// role and be assigned to the snippet's project.
pub async fn resolve_for(
    pool: &SqlitePool,
    user: &User,
    snippet_id: i64,
    decision: Decision,
) -> Result<()> {
    if user.role != Role::Superannotator {
        return Err(Error::Unauthorized(format!(
            "user {} is not a superannotator",
            user.username
        )));
    }

    let snippet = snippets::get_by_id(pool, snippet_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("snippet {}", snippet_id)))?;
    projects::ensure_assigned(pool, user.id, snippet.project_id).await?;

    resolve(pool, snippet_id, decision).await
}

/// Final decision precedence: explicit adjudication, else the unanimous
/// annotator decision (including the single-annotator case), else
/// undecided
pub fn final_decision(explicit: Option<Decision>, annotations: &[Decision]) -> Option<Decision> {
    if explicit.is_some() {
        return explicit;
    }
    let first = *annotations.first()?;
    if annotations.iter().all(|&d| d == first) {
        Some(first)
    } else {
        None
    }
}

/// Materialized review queue over a project's disagreements
///
/// The index is clamped to [0, len-1]; walking off either end stays on
/// the boundary. The snapshot is fixed until `refresh` re-materializes
/// it and re-clamps the index.
#[derive(Debug, Clone)]
pub struct ReviewQueue {
    project_id: i64,
    items: Vec<Disagreement>,
    index: usize,
    /// Bumped on every refresh so a UI can tell snapshots apart
    version: u64,
}

impl ReviewQueue {
    /// Materialize the disagreement snapshot for a project
    pub async fn load(pool: &SqlitePool, project_id: i64) -> Result<Self> {
        let items = disagreements(pool, project_id).await?;
        Ok(Self {
            project_id,
            items,
            index: 0,
            version: 0,
        })
    }

    pub fn project_id(&self) -> i64 {
        self.project_id
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current position as (index, total); index is meaningless when
    /// the queue is empty
    pub fn position(&self) -> (usize, usize) {
        (self.index, self.items.len())
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// The disagreement under review, if any remain
    pub fn current(&self) -> Option<&Disagreement> {
        self.items.get(self.index)
    }

    /// The current snippet's explicit final decision, if one was
    /// already recorded
    pub async fn current_resolution(&self, pool: &SqlitePool) -> Result<Option<Decision>> {
        match self.current() {
            Some(item) => decisions::get(pool, item.snippet.id).await,
            None => Ok(None),
        }
    }

    pub fn next(&mut self) {
        self.index += 1;
        self.clamp();
    }

    pub fn prev(&mut self) {
        self.index = self.index.saturating_sub(1);
        self.clamp();
    }

    /// Record a final decision for the current snippet, then advance
    pub async fn resolve_then_advance(
        &mut self,
        pool: &SqlitePool,
        decision: Decision,
    ) -> Result<()> {
        let snippet_id = self
            .current()
            .map(|item| item.snippet.id)
            .ok_or_else(|| Error::NotFound("no disagreement under review".to_string()))?;

        resolve(pool, snippet_id, decision).await?;
        self.next();
        Ok(())
    }

    /// Re-materialize the snapshot and re-clamp the index, picking up
    /// disagreements created since the snapshot was taken
    pub async fn refresh(&mut self, pool: &SqlitePool) -> Result<()> {
        self.items = disagreements(pool, self.project_id).await?;
        self.version += 1;
        self.clamp();
        Ok(())
    }

    fn clamp(&mut self) {
        if !self.items.is_empty() && self.index > self.items.len() - 1 {
            self.index = self.items.len() - 1;
        }
        if self.items.is_empty() {
            self.index = 0;
        }
    }
}
