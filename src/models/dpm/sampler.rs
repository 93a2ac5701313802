//! Gibbs engine for the sequential logit model with DP-mixture intercepts.
//!
//! One iteration runs the conditional updates in a fixed order:
//!
//! 1. Pólya-Gamma augmentation `omega_i ~ PG(1, eta_i)`
//! 2. spline coefficients (smooth variants)
//! 3. smoothing precision `lambda` (smooth variants)
//! 4. fixed effects
//! 5. free stratum intercepts
//! 6. shared component precision `tau`
//! 7. component means `theta`
//! 8. component weights `nu`
//! 9. component assignments `S` (skipped when `H = 1`)
//!
//! Retained iterations snapshot the state and fold the per-observation
//! predictor, probability, log-density and likelihood into running means.

use faer::Mat;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::input::DpmPreparedInput;
use super::likelihood::{bernoulli_log_density, logistic_stable};
use super::linalg::{quadratic_form, sample_gaussian_canonical, transpose_times, weighted_cross_product};
use super::polya_gamma::sample_polya_gamma;
use super::posterior::{DpmPosteriorDraw, DpmPosteriorSamples};
use super::priors::{DpmPriorConfig, log_normal_density_precision};
use super::random::{sample_categorical, sample_dirichlet, sample_gamma, sample_standard_normal};
use super::types::{DpmError, DpmFitOptions, DpmMethod, DpmRunningSummaries};
use crate::inference::RunningMean;
use crate::utils::{dot_row, usize_to_f64};

/// Mutable chain state, owned by one sampler run.
#[derive(Debug, Clone)]
struct ChainState {
    omega: Vec<f64>,
    beta_fixed: Vec<f64>,
    beta_random: Vec<f64>,
    beta_spline: Vec<f64>,
    clusters: Vec<usize>,
    cluster_means: Vec<f64>,
    weights: Vec<f64>,
    tau: f64,
    lambda: Option<f64>,
    /// `X_Fix beta_Fix` per row.
    fixed_part: Vec<f64>,
    /// `B beta_spline` per row; zeros without a smooth term.
    spline_part: Vec<f64>,
}

impl ChainState {
    fn initialize(context: &SamplerContext<'_>) -> Self {
        let n = context.prepared.n_observations();
        let components = context.prior.components;
        let mut weights = vec![0.0; components];
        weights[0] = 1.0;
        Self {
            omega: vec![0.0; n],
            beta_fixed: vec![0.0; context.prepared.input.n_fixed()],
            beta_random: vec![0.0; context.prepared.n_random()],
            beta_spline: vec![0.0; context.prepared.n_spline()],
            clusters: vec![0; context.prepared.n_random()],
            cluster_means: vec![0.0; components],
            weights,
            tau: context.prior.tau_prior_mean(),
            lambda: context
                .prepared
                .spline
                .as_ref()
                .map(|_| context.prior.lambda_prior_mean()),
            fixed_part: vec![0.0; n],
            spline_part: vec![0.0; n],
        }
    }

    fn random_part(&self, context: &SamplerContext<'_>, row: usize) -> f64 {
        context.prepared.row_free_level[row].map_or(0.0, |level| self.beta_random[level])
    }

    fn linear_predictor(&self, context: &SamplerContext<'_>, row: usize) -> f64 {
        self.fixed_part[row] + self.random_part(context, row) + self.spline_part[row]
    }

    fn snapshot(&self) -> DpmPosteriorDraw {
        DpmPosteriorDraw {
            beta_fixed: self.beta_fixed.clone(),
            beta_random: self.beta_random.clone(),
            beta_spline: self.beta_spline.clone(),
            clusters: self.clusters.clone(),
            cluster_means: self.cluster_means.clone(),
            weights: self.weights.clone(),
            tau: self.tau,
            lambda: self.lambda,
        }
    }
}

struct SamplerContext<'a> {
    prepared: &'a DpmPreparedInput<'a>,
    prior: DpmPriorConfig,
    method: DpmMethod,
}

/// Online summaries folded in at every retained iteration.
struct RunningAccumulators {
    eta: RunningMean,
    prob: RunningMean,
    log_pdf: RunningMean,
    likelihood: RunningMean,
    loglik_draws: Vec<f64>,
    eta_buffer: Vec<f64>,
    prob_buffer: Vec<f64>,
    log_pdf_buffer: Vec<f64>,
    likelihood_buffer: Vec<f64>,
}

impl RunningAccumulators {
    fn new(n: usize, draws: usize) -> Self {
        Self {
            eta: RunningMean::new(n),
            prob: RunningMean::new(n),
            log_pdf: RunningMean::new(n),
            likelihood: RunningMean::new(n),
            loglik_draws: Vec::with_capacity(draws),
            eta_buffer: vec![0.0; n],
            prob_buffer: vec![0.0; n],
            log_pdf_buffer: vec![0.0; n],
            likelihood_buffer: vec![0.0; n],
        }
    }

    fn record(&mut self, context: &SamplerContext<'_>, state: &ChainState) {
        for row in 0..context.prepared.n_observations() {
            let eta = state.linear_predictor(context, row);
            let log_pdf = bernoulli_log_density(context.prepared.outcome[row], eta);
            self.eta_buffer[row] = eta;
            self.prob_buffer[row] = logistic_stable(eta);
            self.log_pdf_buffer[row] = log_pdf;
            self.likelihood_buffer[row] = log_pdf.exp();
        }
        self.eta.update(&self.eta_buffer);
        self.prob.update(&self.prob_buffer);
        self.log_pdf.update(&self.log_pdf_buffer);
        self.likelihood.update(&self.likelihood_buffer);
        self.loglik_draws.push(self.log_pdf_buffer.iter().sum());
    }

    fn finish(self) -> DpmRunningSummaries {
        DpmRunningSummaries {
            eta_hat: self.eta.into_values(),
            prob_hat: self.prob.into_values(),
            log_pdf_hat: self.log_pdf.into_values(),
            exp_lppd: self.likelihood.into_values(),
            loglik_draws: self.loglik_draws,
        }
    }
}

/// Output of one completed chain.
pub(crate) struct SamplingResult {
    pub samples: DpmPosteriorSamples,
    pub summaries: DpmRunningSummaries,
    pub iterations_completed: usize,
}

/// Run one chain on a prepared input.
///
/// `prior.components` is used as given; callers collapse it to one component
/// for Gaussian-intercept variants.
///
/// # Errors
///
/// Returns `DpmError` on any numeric degeneracy: a non-finite linear
/// predictor, a non-positive-definite precision, or non-positive Gamma or
/// Dirichlet parameters.
pub(crate) fn run_chain(
    prepared: &DpmPreparedInput<'_>,
    method: DpmMethod,
    prior: DpmPriorConfig,
    options: DpmFitOptions,
) -> Result<SamplingResult, DpmError> {
    let context = SamplerContext {
        prepared,
        prior,
        method,
    };
    let schedule = options.schedule();
    let total = schedule.total_iterations();
    let progress_interval = options.effective_progress_interval();
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut state = ChainState::initialize(&context);
    let mut accumulators = RunningAccumulators::new(prepared.n_observations(), options.draws);
    let mut draws = Vec::with_capacity(options.draws);

    for iteration in 1..=total {
        update_omega(&context, &mut rng, &mut state)?;
        if prepared.spline.is_some() {
            update_spline_block(&context, &mut rng, &mut state)?;
            update_lambda(&context, &mut rng, &mut state)?;
        }
        update_fixed_block(&context, &mut rng, &mut state)?;
        update_random_intercepts(&context, &mut rng, &mut state);
        update_tau(&context, &mut rng, &mut state)?;
        update_cluster_means(&context, &mut rng, &mut state);
        update_weights(&context, &mut rng, &mut state)?;
        update_clusters(&context, &mut rng, &mut state);

        if schedule.retention_index(iteration).is_some() {
            accumulators.record(&context, &state);
            draws.push(state.snapshot());
        }

        if iteration == schedule.burn_in && schedule.burn_in > 0 {
            log::debug!("{}: burn-in complete after {iteration} iterations", context.method);
        }
        if options.verbose && iteration.is_multiple_of(progress_interval) {
            log::info!(
                "{}: iteration {iteration}/{total}, retained {} draws, tau {:.4}",
                context.method,
                draws.len(),
                state.tau
            );
        }
    }

    if options.verbose {
        log::info!(
            "{}: finished {total} iterations with {} retained draws",
            context.method,
            draws.len()
        );
    }

    Ok(SamplingResult {
        samples: DpmPosteriorSamples { draws },
        summaries: accumulators.finish(),
        iterations_completed: total,
    })
}

fn update_omega(
    context: &SamplerContext<'_>,
    rng: &mut StdRng,
    state: &mut ChainState,
) -> Result<(), DpmError> {
    for row in 0..context.prepared.n_observations() {
        let eta = state.linear_predictor(context, row);
        if !eta.is_finite() {
            return Err(DpmError::NonFiniteLinearPredictor { row });
        }
        state.omega[row] = sample_polya_gamma(rng, eta)?;
    }
    Ok(())
}

/// `kappa_i - omega_i * offset_i` with `offset` the predictor minus one block.
fn working_residual(
    context: &SamplerContext<'_>,
    state: &ChainState,
    offset: impl Fn(usize) -> f64,
) -> Vec<f64> {
    (0..context.prepared.n_observations())
        .map(|row| state.omega[row].mul_add(-offset(row), context.prepared.kappa[row]))
        .collect()
}

fn update_spline_block(
    context: &SamplerContext<'_>,
    rng: &mut StdRng,
    state: &mut ChainState,
) -> Result<(), DpmError> {
    let (Some(spline), Some(lambda)) = (context.prepared.spline.as_ref(), state.lambda) else {
        return Ok(());
    };
    let residual = working_residual(context, state, |row| {
        state.fixed_part[row] + state.random_part(context, row)
    });
    let mut precision = weighted_cross_product(&spline.basis, &state.omega);
    add_scaled(&mut precision, &spline.penalty, lambda);
    let linear = transpose_times(&spline.basis, &residual);
    state.beta_spline = sample_gaussian_canonical(rng, &precision, &linear, "spline")?;
    for row in 0..context.prepared.n_observations() {
        state.spline_part[row] = dot_row(&spline.basis, row, &state.beta_spline);
    }
    Ok(())
}

fn update_lambda(
    context: &SamplerContext<'_>,
    rng: &mut StdRng,
    state: &mut ChainState,
) -> Result<(), DpmError> {
    let Some(spline) = context.prepared.spline.as_ref() else {
        return Ok(());
    };
    let shape = 0.5_f64.mul_add(usize_to_f64(spline.penalty_rank()), context.prior.lambda_shape);
    let rate = 0.5_f64.mul_add(
        quadratic_form(&spline.penalty, &state.beta_spline),
        context.prior.lambda_rate,
    );
    state.lambda = Some(sample_gamma(rng, shape, rate)?);
    Ok(())
}

fn update_fixed_block(
    context: &SamplerContext<'_>,
    rng: &mut StdRng,
    state: &mut ChainState,
) -> Result<(), DpmError> {
    let design = &context.prepared.input.x_fixed;
    if design.ncols() == 0 {
        return Ok(());
    }
    let residual = working_residual(context, state, |row| {
        state.random_part(context, row) + state.spline_part[row]
    });
    let mut precision = weighted_cross_product(design, &state.omega);
    for index in 0..design.ncols() {
        precision[(index, index)] += context.prior.fixed_precision;
    }
    let linear = transpose_times(design, &residual);
    state.beta_fixed = sample_gaussian_canonical(rng, &precision, &linear, "fixed effects")?;
    for row in 0..context.prepared.n_observations() {
        state.fixed_part[row] = dot_row(design, row, &state.beta_fixed);
    }
    Ok(())
}

fn update_random_intercepts(
    context: &SamplerContext<'_>,
    rng: &mut StdRng,
    state: &mut ChainState,
) {
    for (level, level_rows) in context.prepared.free_levels.iter().enumerate() {
        let mut omega_sum = 0.0;
        let mut residual_sum = 0.0;
        for &row in &level_rows.rows {
            let offset = state.fixed_part[row] + state.spline_part[row];
            omega_sum += state.omega[row];
            residual_sum += state.omega[row].mul_add(-offset, context.prepared.kappa[row]);
        }
        let precision = omega_sum + state.tau;
        let cluster_mean = state.cluster_means[state.clusters[level]];
        let mean = state.tau.mul_add(cluster_mean, residual_sum) / precision;
        state.beta_random[level] = mean + sample_standard_normal(rng) / precision.sqrt();
    }
}

fn update_tau(
    context: &SamplerContext<'_>,
    rng: &mut StdRng,
    state: &mut ChainState,
) -> Result<(), DpmError> {
    let squared_deviation = state
        .beta_random
        .iter()
        .zip(&state.clusters)
        .map(|(beta, &cluster)| {
            let centered = beta - state.cluster_means[cluster];
            centered * centered
        })
        .sum::<f64>();
    let shape = 0.5_f64.mul_add(usize_to_f64(state.beta_random.len()), context.prior.tau_shape);
    let rate = 0.5_f64.mul_add(squared_deviation, context.prior.tau_rate);
    state.tau = sample_gamma(rng, shape, rate)?;
    Ok(())
}

/// Occupancy counts and intercept sums per component.
fn component_occupancy(clusters: &[usize], intercepts: &[f64], components: usize) -> (Vec<usize>, Vec<f64>) {
    let mut counts = vec![0_usize; components];
    let mut sums = vec![0.0; components];
    for (&cluster, &value) in clusters.iter().zip(intercepts) {
        counts[cluster] += 1;
        sums[cluster] += value;
    }
    (counts, sums)
}

fn update_cluster_means(context: &SamplerContext<'_>, rng: &mut StdRng, state: &mut ChainState) {
    let components = context.prior.components;
    let (counts, sums) = component_occupancy(&state.clusters, &state.beta_random, components);
    for component in 0..components {
        let (precision, mean) = if counts[component] > 0 {
            let precision = usize_to_f64(counts[component])
                .mul_add(state.tau, context.prior.theta_precision);
            (precision, state.tau * sums[component] / precision)
        } else {
            log::trace!("component {component} is empty; drawing its mean from the prior");
            (context.prior.theta_precision, 0.0)
        };
        state.cluster_means[component] = mean + sample_standard_normal(rng) / precision.sqrt();
    }
}

fn update_weights(
    context: &SamplerContext<'_>,
    rng: &mut StdRng,
    state: &mut ChainState,
) -> Result<(), DpmError> {
    let components = context.prior.components;
    if components == 1 {
        state.weights[0] = 1.0;
        return Ok(());
    }
    let (counts, _) = component_occupancy(&state.clusters, &state.beta_random, components);
    let pseudo_count = 1.0 / usize_to_f64(components);
    let concentration = counts
        .iter()
        .map(|&count| pseudo_count + usize_to_f64(count))
        .collect::<Vec<_>>();
    state.weights = sample_dirichlet(rng, &concentration)?;
    Ok(())
}

/// Normalized assignment probabilities `nu_h N(value; theta_h, 1/tau)`,
/// computed in log space and shifted by the maximum before exponentiating.
fn assignment_probabilities(value: f64, weights: &[f64], means: &[f64], tau: f64) -> Vec<f64> {
    let log_weights = weights
        .iter()
        .zip(means)
        .map(|(&weight, &mean)| weight.ln() + log_normal_density_precision(value, mean, tau))
        .collect::<Vec<_>>();
    let max = log_weights
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let mut probabilities = log_weights
        .iter()
        .map(|log_weight| (log_weight - max).exp())
        .collect::<Vec<_>>();
    let total = probabilities.iter().sum::<f64>();
    probabilities.iter_mut().for_each(|probability| *probability /= total);
    probabilities
}

fn update_clusters(context: &SamplerContext<'_>, rng: &mut StdRng, state: &mut ChainState) {
    if context.prior.components == 1 {
        return;
    }
    for level in 0..state.beta_random.len() {
        let probabilities = assignment_probabilities(
            state.beta_random[level],
            &state.weights,
            &state.cluster_means,
            state.tau,
        );
        state.clusters[level] = sample_categorical(rng, &probabilities);
    }
}

fn add_scaled(target: &mut Mat<f64>, source: &Mat<f64>, scale: f64) {
    for j in 0..target.ncols() {
        for i in 0..target.nrows() {
            target[(i, j)] = scale.mul_add(source[(i, j)], target[(i, j)]);
        }
    }
}
