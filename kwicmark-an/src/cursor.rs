//! Navigation cursor
//!
//! Per-(user, project) stateful pointer over a project's snippet ids
//! with next/prev/jump/submit-then-advance movement. The cursor id is
//! always clamped to the project's [min_id, max_id] range after any
//! movement; running off either end is never an error. Progress is
//! recomputed fresh on every view.

use crate::db::{annotations, projects, snippets};
use crate::session::CursorSessions;
use kwicmark_common::{Decision, Error, Result, Snippet};
use sqlx::SqlitePool;

/// A cursor movement requested by the annotator
#[derive(Debug, Clone, Copy)]
pub enum Move {
    Next,
    Prev,
    /// Set the cursor id directly; no bounds pre-check, the resolve
    /// step clamps
    Jump(i64),
    /// Record a decision for the current snippet, then advance
    Submit(Decision),
}

/// Annotation progress for one user in one project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub annotated: i64,
    pub total: i64,
}

/// The resolved snippet shown to the annotator
#[derive(Debug, Clone)]
pub struct SnippetView {
    pub snippet: Snippet,
    /// This annotator's recorded decision for the snippet, if any
    pub decision: Option<Decision>,
    pub progress: Progress,
}

impl SnippetView {
    pub fn is_annotated(&self) -> bool {
        self.decision.is_some()
    }
}

/// Outcome of a cursor step
#[derive(Debug, Clone)]
pub enum CursorView {
    Snippet(SnippetView),
    /// Terminal display state: the project has no snippets, or a plain
    /// visit found nothing left to annotate
    Exhausted(Progress),
}

/// Advance the cursor and resolve the snippet to display
///
/// `action` is `None` on first visit or plain redisplay. A first visit
/// initializes the cursor to the first unannotated snippet; if every
/// snippet is already annotated the view is `Exhausted`, not an error.
pub async fn step(
    pool: &SqlitePool,
    sessions: &CursorSessions,
    user_id: i64,
    project_id: i64,
    action: Option<Move>,
) -> Result<CursorView> {
    projects::ensure_assigned(pool, user_id, project_id).await?;

    let mut current = match sessions.get(user_id, project_id).await {
        Some(id) => id,
        None => match annotations::first_unannotated(pool, user_id, project_id).await? {
            Some(snippet) => snippet.id,
            // Everything already annotated (or nothing to annotate). A
            // plain visit is terminal, but an explicit move still
            // navigates over the recorded work: seed from the first
            // snippet and let the clamp/resolve path run.
            None => {
                if action.is_none() {
                    return Ok(CursorView::Exhausted(
                        progress(pool, user_id, project_id).await?,
                    ));
                }
                match snippets::min_max_id(pool, project_id).await? {
                    Some((min_id, _)) => min_id,
                    None => {
                        return Ok(CursorView::Exhausted(
                            progress(pool, user_id, project_id).await?,
                        ))
                    }
                }
            }
        },
    };

    let mut backward = false;
    match action {
        None => {}
        Some(Move::Next) => current += 1,
        Some(Move::Prev) => {
            current -= 1;
            backward = true;
        }
        Some(Move::Jump(id)) => current = id,
        Some(Move::Submit(decision)) => {
            annotations::record(pool, user_id, current, decision).await?;
            current += 1;
        }
    }

    // Clamp to the project's id range, then resolve; interior id gaps
    // resolve to the nearest snippet in the direction of travel
    let Some((min_id, max_id)) = snippets::min_max_id(pool, project_id).await? else {
        return Ok(CursorView::Exhausted(Progress { annotated: 0, total: 0 }));
    };
    current = current.clamp(min_id, max_id);

    let snippet = match snippets::get(pool, project_id, current).await? {
        Some(snippet) => snippet,
        None => {
            let nearest = if backward {
                snippets::last_at_or_before(pool, project_id, current).await?
            } else {
                snippets::first_at_or_after(pool, project_id, current).await?
            };
            // The clamp guarantees a snippet exists on this side
            nearest.ok_or_else(|| {
                Error::Internal(format!(
                    "no snippet resolvable at id {} in project {}",
                    current, project_id
                ))
            })?
        }
    };

    sessions.set(user_id, project_id, snippet.id).await;

    let decision = annotations::get_for(pool, user_id, snippet.id)
        .await?
        .map(|a| a.decision);
    let progress = progress(pool, user_id, project_id).await?;

    Ok(CursorView::Snippet(SnippetView {
        snippet,
        decision,
        progress,
    }))
}

/// Fresh (annotated, total) counts for one user in one project
pub async fn progress(pool: &SqlitePool, user_id: i64, project_id: i64) -> Result<Progress> {
    Ok(Progress {
        annotated: annotations::count_for_user(pool, user_id, project_id).await?,
        total: snippets::total_count(pool, project_id).await?,
    })
}
