//! Consistency checker
//!
//! Projects may expose an annotator to the same snippet text more than
//! once (distinct snippet rows with identical content). An annotator is
//! consistent on such a group when every decision in it is identical.

use crate::db::annotations;
use kwicmark_common::{Decision, Result};
use sqlx::SqlitePool;
use std::collections::BTreeMap;

/// Per-annotator consistency over duplicate-content groups
#[derive(Debug, Clone)]
pub struct ConsistencyReport {
    pub user_id: i64,
    pub username: String,
    /// Annotations in duplicate-content groups (group size > 1)
    pub total: usize,
    /// Of those, annotations in groups where every decision agrees
    pub consistent: usize,
}

impl ConsistencyReport {
    /// consistent/total in [0, 1]; an annotator with no repeated
    /// content exposure is fully consistent by convention
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.consistent as f64 / self.total as f64
        }
    }
}

/// Consistency ratios for every annotator with annotations in the
/// project, ordered by user id
pub async fn consistency(pool: &SqlitePool, project_id: i64) -> Result<Vec<ConsistencyReport>> {
    let entries = annotations::all_with_content(pool, project_id).await?;

    // Group decisions by (annotator, content text), keeping usernames
    // for the report
    let mut usernames: BTreeMap<i64, String> = BTreeMap::new();
    let mut groups: BTreeMap<(i64, String), Vec<Decision>> = BTreeMap::new();
    for entry in entries {
        usernames.entry(entry.user_id).or_insert(entry.username);
        groups
            .entry((entry.user_id, entry.content))
            .or_default()
            .push(entry.decision);
    }

    let mut reports: BTreeMap<i64, ConsistencyReport> = usernames
        .into_iter()
        .map(|(user_id, username)| {
            (
                user_id,
                ConsistencyReport {
                    user_id,
                    username,
                    total: 0,
                    consistent: 0,
                },
            )
        })
        .collect();

    for ((user_id, _content), decisions) in groups {
        if decisions.len() < 2 {
            continue;
        }
        if let Some(report) = reports.get_mut(&user_id) {
            report.total += decisions.len();
            if decisions.iter().all(|&d| d == decisions[0]) {
                report.consistent += decisions.len();
            }
        }
    }

    Ok(reports.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(total: usize, consistent: usize) -> ConsistencyReport {
        ConsistencyReport {
            user_id: 1,
            username: "u".into(),
            total,
            consistent,
        }
    }

    #[test]
    fn no_duplicate_exposure_is_fully_consistent() {
        assert_eq!(report(0, 0).ratio(), 1.0);
    }

    #[test]
    fn mixed_group_scores_zero() {
        // Content seen three times with decisions [1, 1, 0]: the whole
        // group of three counts as inconsistent
        assert_eq!(report(3, 0).ratio(), 0.0);
    }

    #[test]
    fn ratio_is_fraction_of_group_sizes() {
        assert_eq!(report(5, 2).ratio(), 0.4);
    }
}
