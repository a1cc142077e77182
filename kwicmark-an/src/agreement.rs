//! Agreement engine: Cohen's Kappa
//!
//! Chance-corrected inter-rater agreement over the snippets a pair of
//! annotators both decided. Kappa is a tagged outcome rather than a raw
//! float so the degenerate expected-agreement-of-one case can never
//! leak out as NaN or infinity.

use crate::db::annotations;
use kwicmark_common::{Decision, Result};
use sqlx::SqlitePool;

/// Why a kappa value is undefined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KappaUndefined {
    /// The two raters share no co-annotated snippets (n = 0)
    NoOverlap,
    /// Expected agreement is 1 but observed agreement is not, which
    /// cannot arise from a consistent contingency table; guarded so a
    /// bad input never divides by zero
    DegenerateMarginals,
}

/// Cohen's Kappa as a tagged outcome
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kappa {
    Value(f64),
    Undefined(KappaUndefined),
}

impl Kappa {
    pub fn value(&self) -> Option<f64> {
        match self {
            Kappa::Value(v) => Some(*v),
            Kappa::Undefined(_) => None,
        }
    }
}

/// Kappa from the co-annotated count `n`, the per-rater yes counts
/// `n1`/`n2`, and the both-yes count `n12`
///
/// Observed agreement po counts agreement on yes AND agreement on no:
/// `po = (n12 + (n - n1 - n2 + n12)) / n`. Expected agreement is
/// `pe = p1*p2 + (1-p1)*(1-p2)`. On [0,1] marginals pe reaches 1 only
/// when both raters are constant in the same direction (n1 = n2 = 0 or
/// n1 = n2 = n), so degeneracy is detected on the integer counts, not
/// by comparing floats. When pe = 1 and po = 1 the raters agree
/// everywhere and kappa is reported as 1.0.
pub fn kappa_from_marginals(n: i64, n1: i64, n2: i64, n12: i64) -> Kappa {
    if n == 0 {
        return Kappa::Undefined(KappaUndefined::NoOverlap);
    }

    let agree_yes = n12;
    let agree_no = n - n1 - n2 + n12;
    let po = (agree_yes + agree_no) as f64 / n as f64;

    if (n1 == 0 && n2 == 0) || (n1 == n && n2 == n) {
        if po == 1.0 {
            return Kappa::Value(1.0);
        }
        return Kappa::Undefined(KappaUndefined::DegenerateMarginals);
    }

    let p1 = n1 as f64 / n as f64;
    let p2 = n2 as f64 / n as f64;
    let pe = p1 * p2 + (1.0 - p1) * (1.0 - p2);

    Kappa::Value((po - pe) / (1.0 - pe))
}

/// 2×2 contingency table of (decision_a, decision_b) counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContingencyTable {
    /// counts[a][b], indexed no = 0 / yes = 1
    counts: [[i64; 2]; 2],
}

impl ContingencyTable {
    pub fn from_pairs(pairs: &[(Decision, Decision)]) -> Self {
        let mut table = Self::default();
        for &(a, b) in pairs {
            table.counts[a.as_i64() as usize][b.as_i64() as usize] += 1;
        }
        table
    }

    pub fn count(&self, a: Decision, b: Decision) -> i64 {
        self.counts[a.as_i64() as usize][b.as_i64() as usize]
    }

    /// Co-annotated snippet count
    pub fn n(&self) -> i64 {
        self.counts[0][0] + self.counts[0][1] + self.counts[1][0] + self.counts[1][1]
    }

    /// Rater A's yes count (row marginal)
    pub fn n1(&self) -> i64 {
        self.counts[1][0] + self.counts[1][1]
    }

    /// Rater B's yes count (column marginal)
    pub fn n2(&self) -> i64 {
        self.counts[0][1] + self.counts[1][1]
    }

    /// Both-yes count
    pub fn n12(&self) -> i64 {
        self.counts[1][1]
    }

    /// Kappa derived from the table: observed agreement from the
    /// diagonal cells, expected agreement from the row/column marginals.
    /// Must agree exactly with [`kappa_from_marginals`] on the table's
    /// own marginals.
    pub fn kappa(&self) -> Kappa {
        let n = self.n();
        if n == 0 {
            return Kappa::Undefined(KappaUndefined::NoOverlap);
        }

        let diagonal = self.counts[0][0] + self.counts[1][1];
        let po = diagonal as f64 / n as f64;

        let row_yes = self.n1();
        let col_yes = self.n2();
        if (row_yes == 0 && col_yes == 0) || (row_yes == n && col_yes == n) {
            if po == 1.0 {
                return Kappa::Value(1.0);
            }
            return Kappa::Undefined(KappaUndefined::DegenerateMarginals);
        }

        let p1 = row_yes as f64 / n as f64;
        let p2 = col_yes as f64 / n as f64;
        let pe = p1 * p2 + (1.0 - p1) * (1.0 - p2);

        Kappa::Value((po - pe) / (1.0 - pe))
    }
}

/// Pairwise agreement between two raters in a project
#[derive(Debug, Clone)]
pub struct PairwiseReport {
    pub rater_a: i64,
    pub rater_b: i64,
    pub table: ContingencyTable,
    pub kappa: Kappa,
}

impl PairwiseReport {
    pub fn n(&self) -> i64 {
        self.table.n()
    }
}

/// Project-level agreement
#[derive(Debug, Clone)]
pub enum ProjectKappa {
    /// Fewer than two distinct raters have annotations in the project;
    /// a distinct "not applicable" outcome, not an error and not zero
    NotEnoughRaters,
    Computed {
        /// All unordered rater pairs, including those with no overlap
        pairs: Vec<PairwiseReport>,
        /// Arithmetic mean of the defined pairwise kappas; None when no
        /// pair has both overlap and a defined kappa
        mean: Option<f64>,
    },
}

/// Pairwise Cohen's Kappa for two raters over one project
pub async fn pairwise_kappa(
    pool: &SqlitePool,
    project_id: i64,
    rater_a: i64,
    rater_b: i64,
) -> Result<PairwiseReport> {
    let pairs = annotations::paired_decisions(pool, project_id, rater_a, rater_b).await?;
    let table = ContingencyTable::from_pairs(&pairs);
    let kappa = table.kappa();

    Ok(PairwiseReport {
        rater_a,
        rater_b,
        table,
        kappa,
    })
}

/// Project-level kappa: mean pairwise kappa over all unordered pairs of
/// raters who annotated anything in the project
pub async fn project_kappa(pool: &SqlitePool, project_id: i64) -> Result<ProjectKappa> {
    let raters = annotations::annotator_ids(pool, project_id).await?;
    if raters.len() < 2 {
        return Ok(ProjectKappa::NotEnoughRaters);
    }

    let mut pairs = Vec::new();
    for i in 0..raters.len() - 1 {
        for j in i + 1..raters.len() {
            pairs.push(pairwise_kappa(pool, project_id, raters[i], raters[j]).await?);
        }
    }

    let values: Vec<f64> = pairs.iter().filter_map(|p| p.kappa.value()).collect();
    let mean = if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    };

    Ok(ProjectKappa::Computed { pairs, mean })
}
