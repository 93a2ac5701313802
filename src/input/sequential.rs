//! Continuation-ratio expansion of ordinal outcomes.
//!
//! A sequential logit model treats an ordinal outcome with `K` categories as a
//! chain of `K - 1` binary transitions. A unit that ends in category `c` passed
//! transitions `0..c` and, unless `c` is the last category, failed transition
//! `c`. Each attempted transition becomes one binary row, and the transition
//! index becomes the stratum label so that every transition receives its own
//! random intercept.

use faer::Mat;
use thiserror::Error;

use super::SeqLogitInput;

/// Errors returned by [`expand_transitions`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SequentialExpansionError {
    #[error("sequential expansion requires at least two categories; found {0}")]
    TooFewCategories(usize),
    #[error("outcome {value} at unit {unit} is outside 0..{categories}")]
    OutcomeOutOfRange {
        unit: usize,
        value: usize,
        categories: usize,
    },
    #[error("covariate rows ({rows}) must match the number of units ({units})")]
    CovariateRowMismatch { rows: usize, units: usize },
    #[error("spline covariate length ({len}) must match the number of units ({units})")]
    SplineCovariateLengthMismatch { len: usize, units: usize },
}

/// Person-transition data produced by [`expand_transitions`].
#[derive(Debug, Clone)]
pub struct SequentialExpansion {
    /// Binary model input with one row per attempted transition.
    pub input: SeqLogitInput,
    /// Source unit index for every expanded row.
    pub person: Vec<usize>,
    /// Transition index for every expanded row.
    pub transition: Vec<usize>,
}

/// Expand ordinal outcomes into sequential binary transitions.
///
/// Stratum levels are declared as `0..categories - 1`, so a transition that no
/// unit reaches shows up as an empty stratum when a model is fitted.
///
/// # Errors
///
/// Returns `SequentialExpansionError` for fewer than two categories, outcomes
/// outside `0..categories`, or covariates whose length does not match.
pub fn expand_transitions(
    ordinal_outcome: &[usize],
    categories: usize,
    covariates: &Mat<f64>,
    spline_covariate: Option<&[f64]>,
) -> Result<SequentialExpansion, SequentialExpansionError> {
    if categories < 2 {
        return Err(SequentialExpansionError::TooFewCategories(categories));
    }
    let units = ordinal_outcome.len();
    if covariates.nrows() != units {
        return Err(SequentialExpansionError::CovariateRowMismatch {
            rows: covariates.nrows(),
            units,
        });
    }
    if let Some(values) = spline_covariate
        && values.len() != units
    {
        return Err(SequentialExpansionError::SplineCovariateLengthMismatch {
            len: values.len(),
            units,
        });
    }
    if let Some((unit, value)) = ordinal_outcome
        .iter()
        .copied()
        .enumerate()
        .find(|(_, value)| *value >= categories)
    {
        return Err(SequentialExpansionError::OutcomeOutOfRange {
            unit,
            value,
            categories,
        });
    }

    let last_transition = categories - 2;
    let mut person = Vec::new();
    let mut transition = Vec::new();
    let mut response = Vec::new();
    for (unit, &category) in ordinal_outcome.iter().enumerate() {
        for step in 0..=category.min(last_transition) {
            person.push(unit);
            transition.push(step);
            response.push(if category > step { 1.0 } else { 0.0 });
        }
    }

    let rows = person.len();
    let outcome = Mat::from_fn(rows, 1, |row, _| response[row]);
    let x_fixed = Mat::from_fn(rows, covariates.ncols(), |row, col| {
        covariates[(person[row], col)]
    });
    let strata = transition.iter().map(|&step| step_label(step)).collect();
    let levels = (0..=last_transition).map(step_label).collect();

    let mut input = SeqLogitInput::new(outcome, x_fixed, strata).with_strata_levels(levels);
    if let Some(values) = spline_covariate {
        input = input.with_spline_covariate(person.iter().map(|&unit| values[unit]).collect());
    }

    Ok(SequentialExpansion {
        input,
        person,
        transition,
    })
}

fn step_label(step: usize) -> u64 {
    u64::try_from(step).unwrap_or(u64::MAX)
}
