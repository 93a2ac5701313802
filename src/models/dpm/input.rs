//! Prepared per-run view of a validated input.

use std::collections::BTreeMap;

use crate::input::SeqLogitInput;
use crate::utils::column_to_vec;

use super::spline::SplineBasis;
use super::types::{DpmError, DpmMethod, SplineConfig};

/// Rows belonging to one stratum level with a free intercept.
#[derive(Debug, Clone)]
pub(crate) struct LevelRows {
    pub level: u64,
    pub rows: Vec<usize>,
}

/// Prepared input view reused by sampler components.
#[derive(Debug, Clone)]
pub(crate) struct DpmPreparedInput<'a> {
    pub input: &'a SeqLogitInput,
    pub outcome: Vec<f64>,
    /// `y - 1/2` per observation.
    pub kappa: Vec<f64>,
    /// All levels in model order.
    pub levels: Vec<u64>,
    /// Levels whose intercept is sampled, in model order.
    pub free_levels: Vec<LevelRows>,
    /// Index into `free_levels` for every row; `None` for reference rows.
    pub row_free_level: Vec<Option<usize>>,
    pub reference_level: Option<u64>,
    pub spline: Option<SplineBasis>,
}

impl DpmPreparedInput<'_> {
    #[must_use]
    pub(crate) fn n_observations(&self) -> usize {
        self.outcome.len()
    }

    #[must_use]
    pub(crate) const fn n_random(&self) -> usize {
        self.free_levels.len()
    }

    #[must_use]
    pub(crate) fn n_spline(&self) -> usize {
        self.spline.as_ref().map_or(0, SplineBasis::dimension)
    }
}

/// Validate the input and group rows by stratum level.
///
/// # Errors
///
/// Returns `DpmError` if the input is malformed, a declared level has no
/// observations, or a spline variant lacks a usable covariate.
pub(crate) fn prepare_input(
    input: &SeqLogitInput,
    method: DpmMethod,
    spline_config: SplineConfig,
) -> Result<DpmPreparedInput<'_>, DpmError> {
    input.validate()?;

    let levels = input.levels();
    let mut grouped: BTreeMap<u64, Vec<usize>> =
        levels.iter().map(|&level| (level, Vec::new())).collect();
    for (row, label) in input.strata.iter().copied().enumerate() {
        grouped.entry(label).or_default().push(row);
    }
    if let Some(&level) = levels
        .iter()
        .find(|level| grouped.get(level).is_none_or(Vec::is_empty))
    {
        return Err(DpmError::EmptyStratum { level });
    }

    let (reference_level, spline) = if method.uses_spline() {
        if levels.len() < 2 {
            return Err(DpmError::TooFewStrataForSpline {
                found: levels.len(),
            });
        }
        let covariate = input
            .spline_covariate
            .as_deref()
            .ok_or(DpmError::MissingSplineCovariate)?;
        (
            Some(levels[0]),
            Some(SplineBasis::new(covariate, spline_config)?),
        )
    } else {
        (None, None)
    };

    let mut row_free_level = vec![None; input.n_observations()];
    let mut free_levels = Vec::with_capacity(levels.len());
    for &level in &levels {
        if Some(level) == reference_level {
            continue;
        }
        let rows = grouped.remove(&level).unwrap_or_default();
        for &row in &rows {
            row_free_level[row] = Some(free_levels.len());
        }
        free_levels.push(LevelRows { level, rows });
    }

    let outcome = column_to_vec(&input.outcome);
    let kappa = outcome.iter().map(|y| y - 0.5).collect();
    Ok(DpmPreparedInput {
        input,
        outcome,
        kappa,
        levels,
        free_levels,
        row_free_level,
        reference_level,
        spline,
    })
}

#[cfg(test)]
mod tests {
    use faer::Mat;

    use super::*;

    fn input(strata: Vec<u64>) -> SeqLogitInput {
        let n = strata.len();
        SeqLogitInput::new(
            Mat::from_fn(n, 1, |i, _| if i % 2 == 0 { 1.0 } else { 0.0 }),
            Mat::from_fn(n, 1, |i, _| if i % 3 == 0 { 0.5 } else { -0.5 }),
            strata,
        )
    }

    #[test]
    fn baseline_keeps_every_level() {
        let data = input(vec![7, 3, 7, 3, 5]);
        let prepared = prepare_input(&data, DpmMethod::DpMixture, SplineConfig::default())
            .expect("input should be valid");
        assert_eq!(prepared.levels, vec![3, 5, 7]);
        assert_eq!(prepared.n_random(), 3);
        assert_eq!(prepared.free_levels[2].rows, vec![0, 2]);
        assert_eq!(prepared.row_free_level[4], Some(1));
        assert_eq!(prepared.kappa[0], 0.5);
        assert_eq!(prepared.kappa[1], -0.5);
        assert!(prepared.reference_level.is_none());
    }

    #[test]
    fn spline_variant_drops_reference_level() {
        let data = input(vec![1, 2, 1, 2, 1, 2])
            .with_spline_covariate(vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
        let config = SplineConfig {
            inner_knots: 2,
            degree: 2,
            difference_order: 1,
        };
        let prepared =
            prepare_input(&data, DpmMethod::BaselineSpline, config).expect("input should be valid");
        assert_eq!(prepared.reference_level, Some(1));
        assert_eq!(prepared.n_random(), 1);
        assert_eq!(prepared.free_levels[0].level, 2);
        assert_eq!(prepared.row_free_level[0], None);
        assert_eq!(prepared.row_free_level[1], Some(0));
        assert_eq!(prepared.n_spline(), 5);
    }

    #[test]
    fn declared_but_unobserved_level_is_empty_stratum() {
        let data = input(vec![0, 0, 1, 1]).with_strata_levels(vec![0, 1, 2]);
        let err = prepare_input(&data, DpmMethod::Baseline, SplineConfig::default())
            .expect_err("empty level should fail");
        assert!(matches!(err, DpmError::EmptyStratum { level: 2 }));
    }

    #[test]
    fn spline_variant_requires_covariate_and_two_levels() {
        let data = input(vec![0, 1, 0, 1]);
        assert!(matches!(
            prepare_input(&data, DpmMethod::DpMixtureSpline, SplineConfig::default()),
            Err(DpmError::MissingSplineCovariate)
        ));

        let single = input(vec![4, 4, 4]).with_spline_covariate(vec![0.0, 1.0, 2.0]);
        assert!(matches!(
            prepare_input(&single, DpmMethod::BaselineSpline, SplineConfig::default()),
            Err(DpmError::TooFewStrataForSpline { found: 1 })
        ));
    }
}
