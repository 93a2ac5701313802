#![forbid(unsafe_code)]

//! # `sequential_logit_dpm`
//!
//! Gibbs sampling for Bayesian hierarchical sequential logistic regression with
//! a Dirichlet-process mixture prior on stratum intercepts and an optional
//! P-spline term, plus DIC/WAIC model comparison.
//!
//! Ordinal outcomes are expanded into binary continuation rows with
//! [`expand_transitions`]; each transition becomes a stratum whose intercept
//! is clustered by the mixture prior.

pub mod inference;
pub mod input;
pub mod models;
pub mod preprocess;
pub mod utils;

pub use inference::{InferenceError, McmcSchedule, RunningMean};
pub use input::{
    SeqLogitInput, SeqLogitInputError, SequentialExpansion, SequentialExpansionError,
    expand_transitions,
};
pub use preprocess::{
    BinaryOutcomeDiagnostics, StratumCounts, column_has_variation, drop_constant_columns,
    outcome_diagnostics,
};

pub use models::dpm::{
    DpmError, DpmFit, DpmFitOptions, DpmMethod, DpmPosteriorDraw, DpmPosteriorSamples,
    DpmPosteriorSummary, DpmPriorConfig, DpmReport, DpmRunningSummaries, DpmSamplerConfig,
    DpmSamplerDiagnostics, InformationCriteria, MethodCriteria, MixingSummary, ParameterSummary,
    SplineBasis, SplineConfig, autocorrelation, compare_methods, compute_information_criteria,
    effective_sample_size, fit, fit_method, fit_report, mixing_summary, sample_dirichlet,
    summarize_posterior,
};
