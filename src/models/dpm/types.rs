//! Core public types for the DP-mixture sequential logit module.

use std::fmt;
use std::str::FromStr;

use super::criteria::InformationCriteria;
use super::posterior::{DpmPosteriorSamples, DpmPosteriorSummary};
use super::priors::DpmPriorConfig;
use super::spline::SplineBasis;
use crate::inference::{InferenceError, McmcSchedule};
use crate::input::SeqLogitInputError;
use thiserror::Error;

/// Errors returned by configuration, validation, dispatch, and sampling.
#[derive(Debug, Error)]
pub enum DpmError {
    #[error(transparent)]
    InvalidInput(#[from] SeqLogitInputError),
    #[error(transparent)]
    InvalidSchedule(#[from] InferenceError),
    #[error("unsupported method `{0}`; expected one of baseline, baseline+spline, dp-mixture, dp-mixture+spline")]
    UnsupportedMethod(String),
    #[error("stratum level {level} has no observations")]
    EmptyStratum { level: u64 },
    #[error("spline models require at least two stratum levels; found {found}")]
    TooFewStrataForSpline { found: usize },
    #[error("spline models require a spline covariate in the input")]
    MissingSplineCovariate,
    #[error("spline covariate must span a non-degenerate range")]
    DegenerateSplineCovariate,
    #[error("invalid prior configuration")]
    InvalidPriorConfig,
    #[error("invalid spline configuration")]
    InvalidSplineConfig,
    #[error("{block} precision matrix is not positive definite (smallest eigenvalue {min_eigenvalue})")]
    NotPositiveDefinite {
        block: &'static str,
        min_eigenvalue: f64,
    },
    #[error("eigendecomposition of the {block} precision matrix failed")]
    EigendecompositionFailed { block: &'static str },
    #[error("{distribution} parameter must be positive and finite; found {value}")]
    NonPositiveParameter {
        distribution: &'static str,
        value: f64,
    },
    #[error("Polya-Gamma tilt must be finite; found {0}")]
    NonFiniteTilt(f64),
    #[error("linear predictor is not finite at row {row}")]
    NonFiniteLinearPredictor { row: usize },
    #[error("posterior draws are required")]
    EmptyPosterior,
    #[error("method comparison requires at least one method")]
    NoMethods,
    #[error("sampler worker for {0} panicked")]
    WorkerPanicked(DpmMethod),
}

/// Model variant selected by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DpmMethod {
    /// Gaussian random intercepts (a single mixture component), no smooth term.
    Baseline,
    /// Gaussian random intercepts plus a P-spline term.
    BaselineSpline,
    /// Dirichlet-process mixture random intercepts, no smooth term.
    DpMixture,
    /// Dirichlet-process mixture random intercepts plus a P-spline term.
    DpMixtureSpline,
}

impl DpmMethod {
    pub const ALL: [Self; 4] = [
        Self::Baseline,
        Self::BaselineSpline,
        Self::DpMixture,
        Self::DpMixtureSpline,
    ];

    /// Method tag accepted by [`FromStr`].
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::BaselineSpline => "baseline+spline",
            Self::DpMixture => "dp-mixture",
            Self::DpMixtureSpline => "dp-mixture+spline",
        }
    }

    #[must_use]
    pub const fn uses_spline(self) -> bool {
        matches!(self, Self::BaselineSpline | Self::DpMixtureSpline)
    }

    #[must_use]
    pub const fn uses_mixture(self) -> bool {
        matches!(self, Self::DpMixture | Self::DpMixtureSpline)
    }
}

impl fmt::Display for DpmMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DpmMethod {
    type Err = DpmError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.tag() == tag)
            .ok_or_else(|| DpmError::UnsupportedMethod(tag.to_owned()))
    }
}

/// P-spline basis parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplineConfig {
    /// Number of equally spaced interior knots.
    pub inner_knots: usize,
    /// Polynomial degree of the B-spline basis.
    pub degree: usize,
    /// Order of the difference penalty.
    pub difference_order: usize,
}

impl Default for SplineConfig {
    fn default() -> Self {
        Self {
            inner_knots: 20,
            degree: 3,
            difference_order: 2,
        }
    }
}

impl SplineConfig {
    /// Number of basis functions: `inner_knots + degree + 1`.
    #[must_use]
    pub const fn basis_dimension(self) -> usize {
        self.inner_knots + self.degree + 1
    }

    /// Whether the basis is non-trivial and the penalty has positive rank.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.degree >= 1
            && self.difference_order >= 1
            && self.difference_order < self.basis_dimension()
    }
}

/// Sampler schedule and run controls.
#[derive(Debug, Clone, Copy)]
pub struct DpmFitOptions {
    /// Retained posterior draws `R`.
    pub draws: usize,
    /// Discarded initial iterations.
    pub burn_in: usize,
    /// Keep every `thinning`-th iteration after burn-in.
    pub thinning: usize,
    /// RNG seed for reproducibility.
    pub seed: u64,
    /// Emit periodic progress through the `log` facade.
    pub verbose: bool,
    /// Iterations between progress records; defaults to a tenth of the run.
    pub progress_interval: Option<usize>,
}

impl Default for DpmFitOptions {
    fn default() -> Self {
        Self {
            draws: 1_000,
            burn_in: 1_000,
            thinning: 1,
            seed: 42,
            verbose: false,
            progress_interval: None,
        }
    }
}

impl DpmFitOptions {
    #[must_use]
    pub const fn schedule(self) -> McmcSchedule {
        McmcSchedule {
            draws: self.draws,
            burn_in: self.burn_in,
            thinning: self.thinning,
        }
    }

    /// # Errors
    ///
    /// Returns `DpmError` if the schedule is invalid.
    pub fn validate(self) -> Result<(), DpmError> {
        self.schedule().validate()?;
        Ok(())
    }

    /// Total sampler iterations `draws * thinning + burn_in`.
    #[must_use]
    pub const fn total_iterations(self) -> usize {
        self.schedule().total_iterations()
    }

    pub(crate) fn effective_progress_interval(self) -> usize {
        self.progress_interval
            .unwrap_or_else(|| self.total_iterations() / 10)
            .max(1)
    }
}

/// Full sampler configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct DpmSamplerConfig {
    pub fit_options: DpmFitOptions,
    pub prior_config: DpmPriorConfig,
    pub spline_config: SplineConfig,
}

impl DpmSamplerConfig {
    /// # Errors
    ///
    /// Returns `DpmError` if any configuration block is invalid.
    pub fn validate(self) -> Result<(), DpmError> {
        self.fit_options.validate()?;
        if !self.prior_config.is_valid() {
            return Err(DpmError::InvalidPriorConfig);
        }
        if !self.spline_config.is_valid() {
            return Err(DpmError::InvalidSplineConfig);
        }
        Ok(())
    }
}

/// Sampler bookkeeping returned with every fit.
#[derive(Debug, Clone, Copy, Default)]
pub struct DpmSamplerDiagnostics {
    pub iterations_completed: usize,
    pub retained_draws: usize,
    /// Number of mixture components `H` actually used.
    pub components: usize,
}

/// Running posterior summaries accumulated during sampling.
///
/// All per-observation vectors are arithmetic means over the retained draws,
/// computed online. `loglik_draws` holds the total log-likelihood of every
/// retained draw.
#[derive(Debug, Clone, Default)]
pub struct DpmRunningSummaries {
    /// Posterior mean of the linear predictor.
    pub eta_hat: Vec<f64>,
    /// Posterior mean of the response probability.
    pub prob_hat: Vec<f64>,
    /// Posterior mean of the per-observation log-density.
    pub log_pdf_hat: Vec<f64>,
    /// Posterior mean of the per-observation likelihood.
    pub exp_lppd: Vec<f64>,
    /// Total log-likelihood per retained draw.
    pub loglik_draws: Vec<f64>,
}

/// Completed sampler output.
#[derive(Debug, Clone)]
pub struct DpmFit {
    pub method: DpmMethod,
    pub samples: DpmPosteriorSamples,
    pub summaries: DpmRunningSummaries,
    /// Observed 0/1 responses the summaries refer to.
    pub outcome: Vec<f64>,
    /// Raw coefficient count `p_Fix + p_RF + p_spline`.
    pub n_parameters: usize,
    /// Stratum levels in model order; the first one is the reference level.
    pub levels: Vec<u64>,
    /// Level whose intercept is pinned at zero (spline variants only).
    pub reference_level: Option<u64>,
    /// Evaluated basis and penalty (spline variants only).
    pub spline_basis: Option<SplineBasis>,
    pub diagnostics: DpmSamplerDiagnostics,
}

impl DpmFit {
    /// Intercept of every stratum level for one retained draw, in `levels` order.
    ///
    /// The reference level of spline variants reports `0.0`. Returns `None`
    /// when `draw_index` is past the last retained draw.
    #[must_use]
    pub fn level_intercepts(&self, draw_index: usize) -> Option<Vec<f64>> {
        let draw = self.samples.draws.get(draw_index)?;
        let intercepts = if self.reference_level.is_some() {
            std::iter::once(0.0)
                .chain(draw.beta_random.iter().copied())
                .collect()
        } else {
            draw.beta_random.clone()
        };
        Some(intercepts)
    }
}

/// Output report bundling diagnostics, summaries, and information criteria.
#[derive(Debug, Clone)]
pub struct DpmReport {
    pub method: DpmMethod,
    pub diagnostics: DpmSamplerDiagnostics,
    pub posterior_summary: Option<DpmPosteriorSummary>,
    pub criteria: InformationCriteria,
}

/// Information criteria of one method in a comparison.
#[derive(Debug, Clone, Copy)]
pub struct MethodCriteria {
    pub method: DpmMethod,
    pub criteria: InformationCriteria,
}
