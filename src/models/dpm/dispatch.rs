//! Method dispatch, reports, and multi-method comparison.

use crate::input::SeqLogitInput;

use super::criteria::compute_information_criteria;
use super::input::prepare_input;
use super::posterior::summarize_posterior;
use super::sampler::run_chain;
use super::types::{
    DpmError, DpmFit, DpmMethod, DpmReport, DpmSamplerConfig, DpmSamplerDiagnostics,
    MethodCriteria,
};

/// Fit one model variant.
///
/// Gaussian-intercept variants collapse the mixture to a single component;
/// DP-mixture variants use `config.prior_config.components`. Input validation,
/// including the empty-stratum check, completes before the first iteration.
///
/// # Errors
///
/// Returns `DpmError` if the configuration or input is invalid, or if the
/// sampler hits a numeric degeneracy.
pub fn fit(
    input: &SeqLogitInput,
    method: DpmMethod,
    config: DpmSamplerConfig,
) -> Result<DpmFit, DpmError> {
    config.validate()?;
    let prior = if method.uses_mixture() {
        config.prior_config
    } else {
        config.prior_config.single_component()
    };
    let prepared = prepare_input(input, method, config.spline_config)?;
    log::debug!(
        "{method}: {} observations, {} fixed effects, {} free intercepts, {} spline coefficients, H = {}",
        prepared.n_observations(),
        input.n_fixed(),
        prepared.n_random(),
        prepared.n_spline(),
        prior.components
    );

    let result = run_chain(&prepared, method, prior, config.fit_options)?;
    let n_parameters = input.n_fixed() + prepared.n_random() + prepared.n_spline();
    let diagnostics = DpmSamplerDiagnostics {
        iterations_completed: result.iterations_completed,
        retained_draws: result.samples.len(),
        components: prior.components,
    };
    Ok(DpmFit {
        method,
        samples: result.samples,
        summaries: result.summaries,
        outcome: prepared.outcome,
        n_parameters,
        levels: prepared.levels,
        reference_level: prepared.reference_level,
        spline_basis: prepared.spline,
        diagnostics,
    })
}

/// Fit the variant named by `tag` (`baseline`, `baseline+spline`,
/// `dp-mixture` or `dp-mixture+spline`).
///
/// # Errors
///
/// Returns `DpmError::UnsupportedMethod` for any other tag, and any error of
/// [`fit`] otherwise.
pub fn fit_method(
    input: &SeqLogitInput,
    tag: &str,
    config: DpmSamplerConfig,
) -> Result<DpmFit, DpmError> {
    fit(input, tag.parse()?, config)
}

/// Bundle diagnostics, posterior summaries, and information criteria.
///
/// # Errors
///
/// Returns `DpmError::EmptyPosterior` if the fit holds no retained draws.
pub fn fit_report(fit: &DpmFit) -> Result<DpmReport, DpmError> {
    let criteria = compute_information_criteria(fit)?;
    Ok(DpmReport {
        method: fit.method,
        diagnostics: fit.diagnostics,
        posterior_summary: (!fit.samples.is_empty()).then(|| summarize_posterior(&fit.samples)),
        criteria,
    })
}

/// Fit each method as an independent chain on its own thread and return
/// their information criteria in request order.
///
/// The chain for `methods[i]` is seeded with `seed + i`.
///
/// # Errors
///
/// Returns `DpmError::NoMethods` for an empty request and the first failing
/// run's error otherwise.
pub fn compare_methods(
    input: &SeqLogitInput,
    config: DpmSamplerConfig,
    methods: &[DpmMethod],
) -> Result<Vec<MethodCriteria>, DpmError> {
    if methods.is_empty() {
        return Err(DpmError::NoMethods);
    }
    config.validate()?;

    let fits = std::thread::scope(|scope| {
        let handles = methods
            .iter()
            .enumerate()
            .map(|(index, &method)| {
                let mut method_config = config;
                let index_u64 = u64::try_from(index).unwrap_or(u64::MAX);
                method_config.fit_options.seed = config.fit_options.seed.wrapping_add(index_u64);
                (method, scope.spawn(move || fit(input, method, method_config)))
            })
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|(method, handle)| {
                handle
                    .join()
                    .map_err(|_| DpmError::WorkerPanicked(method))?
            })
            .collect::<Result<Vec<_>, DpmError>>()
    })?;

    fits.iter()
        .map(|fit| {
            Ok(MethodCriteria {
                method: fit.method,
                criteria: compute_information_criteria(fit)?,
            })
        })
        .collect()
}
