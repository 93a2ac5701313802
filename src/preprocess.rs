//! Descriptive checks run on an input before fitting.

use std::collections::BTreeMap;

use faer::Mat;

use crate::input::SeqLogitInput;
use crate::utils::usize_to_f64;

/// Observation and event counts of one stratum level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StratumCounts {
    pub level: u64,
    pub n_rows: usize,
    pub n_events: usize,
}

impl StratumCounts {
    /// Event share of the level, `0` when it has no rows.
    #[must_use]
    pub fn event_rate(&self) -> f64 {
        if self.n_rows == 0 {
            0.0
        } else {
            usize_to_f64(self.n_events) / usize_to_f64(self.n_rows)
        }
    }
}

/// Counts of a binary outcome, overall and per stratum level.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOutcomeDiagnostics {
    pub n_rows: usize,
    pub n_events: usize,
    pub event_rate: f64,
    /// One entry per level in model order; declared but unobserved levels
    /// report zero rows.
    pub strata: Vec<StratumCounts>,
}

impl BinaryOutcomeDiagnostics {
    /// Levels without observations, which fitting rejects.
    #[must_use]
    pub fn empty_levels(&self) -> Vec<u64> {
        self.strata
            .iter()
            .filter(|counts| counts.n_rows == 0)
            .map(|counts| counts.level)
            .collect()
    }

    /// Levels whose outcome never varies.
    #[must_use]
    pub fn separated_levels(&self) -> Vec<u64> {
        self.strata
            .iter()
            .filter(|counts| counts.n_rows > 0 && (counts.n_events == 0 || counts.n_events == counts.n_rows))
            .map(|counts| counts.level)
            .collect()
    }
}

/// Count rows and events (`y == 1`) overall and per stratum level.
#[must_use]
pub fn outcome_diagnostics(input: &SeqLogitInput) -> BinaryOutcomeDiagnostics {
    let mut per_level: BTreeMap<u64, (usize, usize)> = input
        .levels()
        .into_iter()
        .map(|level| (level, (0, 0)))
        .collect();
    let rows = input.outcome.nrows().min(input.strata.len());
    let mut n_events = 0;
    for row in 0..rows {
        let event = usize::from(input.outcome[(row, 0)] == 1.0);
        n_events += event;
        let entry = per_level.entry(input.strata[row]).or_default();
        entry.0 += 1;
        entry.1 += event;
    }

    let strata = input
        .levels()
        .into_iter()
        .map(|level| {
            let (n_rows, n_events) = per_level.get(&level).copied().unwrap_or_default();
            StratumCounts {
                level,
                n_rows,
                n_events,
            }
        })
        .collect();
    let event_rate = if rows > 0 {
        usize_to_f64(n_events) / usize_to_f64(rows)
    } else {
        0.0
    };

    BinaryOutcomeDiagnostics {
        n_rows: rows,
        n_events,
        event_rate,
        strata,
    }
}

/// Whether `column` of `x` spans more than `tolerance`.
#[must_use]
pub fn column_has_variation(x: &Mat<f64>, column: usize, tolerance: f64) -> bool {
    if column >= x.ncols() || x.nrows() < 2 {
        return false;
    }
    let (min, max) = (0..x.nrows()).fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), row| {
        let value = x[(row, column)];
        (min.min(value), max.max(value))
    });
    (max - min).abs() > tolerance.abs()
}

/// Remove constant (intercept-like) columns from a fixed-effect design.
///
/// Stratum intercepts already absorb any constant shift, so a constant
/// column would make the fixed-effect block collinear with them. Returns the
/// reduced design and the indices of the kept columns.
#[must_use]
pub fn drop_constant_columns(x: &Mat<f64>, tolerance: f64) -> (Mat<f64>, Vec<usize>) {
    let kept = (0..x.ncols())
        .filter(|&column| column_has_variation(x, column, tolerance))
        .collect::<Vec<_>>();
    let reduced = Mat::from_fn(x.nrows(), kept.len(), |row, col| x[(row, kept[col])]);
    (reduced, kept)
}
