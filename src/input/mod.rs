//! # Model inputs
//!
//! Defines the prepared numeric input for sequential logit models: a binary
//! response column, a fixed-effects design without intercept, stratum labels,
//! and an optional covariate for the smooth term.
//!
//! # Examples
//!
//! ```
//! use faer::Mat;
//! use sequential_logit_dpm::SeqLogitInput;
//!
//! let outcome = Mat::from_fn(4, 1, |i, _| if i % 2 == 0 { 1.0 } else { 0.0 });
//! let x_fixed = Mat::from_fn(4, 1, |i, _| if i < 2 { -0.5 } else { 0.5 });
//! let input = SeqLogitInput::new(outcome, x_fixed, vec![1, 1, 2, 2]);
//!
//! assert!(input.validate().is_ok());
//! assert_eq!(input.levels(), vec![1, 2]);
//! ```
//!
//! ```
//! use faer::Mat;
//! use sequential_logit_dpm::SeqLogitInput;
//!
//! let outcome = Mat::from_fn(3, 1, |_i, _| 2.0);
//! let x_fixed = Mat::<f64>::zeros(3, 0);
//! let input = SeqLogitInput::new(outcome, x_fixed, vec![1, 1, 2]);
//!
//! assert!(input.validate().is_err());
//! ```

use std::collections::BTreeSet;

use faer::Mat;
use thiserror::Error;

use crate::utils::matrix_is_finite;

pub mod sequential;

pub use sequential::{SequentialExpansion, SequentialExpansionError, expand_transitions};

/// Errors returned when validating model inputs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SeqLogitInputError {
    #[error("outcome must be a single column matrix")]
    InvalidOutcomeShape,
    #[error("input must contain at least one observation")]
    NoObservations,
    #[error("fixed-effects design rows ({rows}) must match outcome rows ({len})")]
    DimensionMismatch { rows: usize, len: usize },
    #[error("strata length ({len}) must match outcome rows ({rows})")]
    InvalidStrataLength { len: usize, rows: usize },
    #[error("spline covariate length ({len}) must match outcome rows ({rows})")]
    InvalidSplineCovariateLength { len: usize, rows: usize },
    #[error("fixed-effects design contains non-finite values")]
    NonFiniteDesign,
    #[error("outcome contains non-finite values")]
    NonFiniteOutcome,
    #[error("outcome must be binary (0 or 1); found {value} at row {row}")]
    NonBinaryOutcome { row: usize, value: f64 },
    #[error("spline covariate contains non-finite values")]
    NonFiniteSplineCovariate,
    #[error("declared strata levels contain duplicate label {level}")]
    DuplicateStratumLevel { level: u64 },
    #[error("stratum label {label} at row {row} is not a declared level")]
    UndeclaredStratum { row: usize, label: u64 },
}

/// Prepared numeric input for a sequential logit model.
///
/// `x_fixed` must not carry an intercept column: intercepts enter through the
/// stratum-level random effects (and, for smooth models, the spline basis).
#[derive(Debug, Clone)]
pub struct SeqLogitInput {
    pub outcome: Mat<f64>,
    pub x_fixed: Mat<f64>,
    pub strata: Vec<u64>,
    pub strata_levels: Option<Vec<u64>>,
    pub spline_covariate: Option<Vec<f64>>,
}

impl SeqLogitInput {
    #[must_use]
    pub const fn new(outcome: Mat<f64>, x_fixed: Mat<f64>, strata: Vec<u64>) -> Self {
        Self {
            outcome,
            x_fixed,
            strata,
            strata_levels: None,
            spline_covariate: None,
        }
    }

    /// Declare the full stratum level set, in reference-first order.
    ///
    /// Levels declared here but absent from `strata` are reported as empty
    /// strata when a model is fitted.
    #[must_use]
    pub fn with_strata_levels(mut self, levels: Vec<u64>) -> Self {
        self.strata_levels = Some(levels);
        self
    }

    #[must_use]
    pub fn with_spline_covariate(self, covariate: Vec<f64>) -> Self {
        Self {
            spline_covariate: Some(covariate),
            ..self
        }
    }

    #[must_use]
    pub fn n_observations(&self) -> usize {
        self.outcome.nrows()
    }

    #[must_use]
    pub fn n_fixed(&self) -> usize {
        self.x_fixed.ncols()
    }

    /// Ordered stratum levels: declared order when levels were declared,
    /// otherwise ascending label order. The first level is the reference level.
    #[must_use]
    pub fn levels(&self) -> Vec<u64> {
        self.strata_levels.as_ref().map_or_else(
            || {
                self.strata
                    .iter()
                    .copied()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            },
            Clone::clone,
        )
    }

    /// Validate shapes and values of outcome and design only.
    ///
    /// # Errors
    ///
    /// Returns `SeqLogitInputError` if core inputs are malformed.
    pub fn validate_core(&self) -> Result<(), SeqLogitInputError> {
        if self.outcome.ncols() != 1 {
            return Err(SeqLogitInputError::InvalidOutcomeShape);
        }
        let rows = self.outcome.nrows();
        if rows == 0 {
            return Err(SeqLogitInputError::NoObservations);
        }
        if self.x_fixed.nrows() != rows {
            return Err(SeqLogitInputError::DimensionMismatch {
                rows: self.x_fixed.nrows(),
                len: rows,
            });
        }
        if !matrix_is_finite(&self.x_fixed) {
            return Err(SeqLogitInputError::NonFiniteDesign);
        }
        if !matrix_is_finite(&self.outcome) {
            return Err(SeqLogitInputError::NonFiniteOutcome);
        }
        if let Some(row) = (0..rows).find(|&row| {
            let value = self.outcome[(row, 0)];
            value != 0.0 && value != 1.0
        }) {
            return Err(SeqLogitInputError::NonBinaryOutcome {
                row,
                value: self.outcome[(row, 0)],
            });
        }
        Ok(())
    }

    /// Validate shapes and values for outcome, design, strata, and spline covariate.
    ///
    /// # Errors
    ///
    /// Returns `SeqLogitInputError` if inputs are malformed.
    pub fn validate(&self) -> Result<(), SeqLogitInputError> {
        self.validate_core()?;
        let rows = self.outcome.nrows();
        if self.strata.len() != rows {
            return Err(SeqLogitInputError::InvalidStrataLength {
                len: self.strata.len(),
                rows,
            });
        }
        if let Some(levels) = &self.strata_levels {
            let mut seen = BTreeSet::new();
            for level in levels {
                if !seen.insert(*level) {
                    return Err(SeqLogitInputError::DuplicateStratumLevel { level: *level });
                }
            }
            if let Some((row, label)) = self
                .strata
                .iter()
                .copied()
                .enumerate()
                .find(|(_, label)| !seen.contains(label))
            {
                return Err(SeqLogitInputError::UndeclaredStratum { row, label });
            }
        }
        if let Some(covariate) = &self.spline_covariate {
            if covariate.len() != rows {
                return Err(SeqLogitInputError::InvalidSplineCovariateLength {
                    len: covariate.len(),
                    rows,
                });
            }
            if covariate.iter().any(|value| !value.is_finite()) {
                return Err(SeqLogitInputError::NonFiniteSplineCovariate);
            }
        }
        Ok(())
    }
}
