use faer::Mat;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use sequential_logit_dpm::{
    DpmError, DpmFitOptions, DpmMethod, DpmPriorConfig, DpmSamplerConfig, InferenceError,
    SeqLogitInput, SeqLogitInputError, SplineConfig, fit, fit_report, mixing_summary,
    outcome_diagnostics,
};

fn usize_to_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}

fn logistic(value: f64) -> f64 {
    if value >= 0.0 {
        1.0 / (1.0 + (-value).exp())
    } else {
        let exp_value = value.exp();
        exp_value / (1.0 + exp_value)
    }
}

fn sample_standard_normal(rng: &mut StdRng) -> f64 {
    let u1 = (1.0_f64 - rng.random::<f64>()).max(f64::MIN_POSITIVE);
    let u2 = rng.random::<f64>();
    (-2.0_f64 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Simulate a binary panel whose stratum intercepts are `intercepts[level]`.
fn simulate_strata(
    rows_per_level: usize,
    intercepts: &[f64],
    beta: [f64; 2],
    seed: u64,
) -> SeqLogitInput {
    let levels = intercepts.len();
    let nrows = rows_per_level * levels;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut design = Vec::with_capacity(nrows * 2);
    let mut outcome = Vec::with_capacity(nrows);
    let mut strata = Vec::with_capacity(nrows);
    for row in 0..nrows {
        let level = row % levels;
        let x0 = sample_standard_normal(&mut rng);
        let x1 = sample_standard_normal(&mut rng);
        let eta = beta[1].mul_add(x1, beta[0].mul_add(x0, intercepts[level]));
        outcome.push(if rng.random::<f64>() < logistic(eta) {
            1.0
        } else {
            0.0
        });
        design.push([x0, x1]);
        strata.push(u64::try_from(level).unwrap_or(u64::MAX));
    }

    SeqLogitInput::new(
        Mat::from_fn(nrows, 1, |row, _| outcome[row]),
        Mat::from_fn(nrows, 2, |row, col| design[row][col]),
        strata,
    )
}

fn sampler_config(draws: usize, burn_in: usize, components: usize) -> DpmSamplerConfig {
    DpmSamplerConfig {
        fit_options: DpmFitOptions {
            draws,
            burn_in,
            thinning: 1,
            seed: 17,
            ..DpmFitOptions::default()
        },
        prior_config: DpmPriorConfig {
            components,
            ..DpmPriorConfig::default()
        },
        spline_config: SplineConfig::default(),
    }
}

#[test]
fn baseline_recovers_fixed_effects_and_intercepts() {
    let truth = [1.0, -0.75];
    let intercepts = [-0.8, 0.6];
    let input = simulate_strata(1_000, &intercepts, truth, 42);
    let fit = fit(&input, DpmMethod::Baseline, sampler_config(300, 200, 1))
        .expect("fit should succeed");
    let report = fit_report(&fit).expect("report should build");
    let summary = report.posterior_summary.expect("summary should exist");

    for (estimate, expected) in summary.beta_fixed.iter().zip(truth) {
        assert!(
            (estimate.mean - expected).abs() < 0.25,
            "fixed effect {} vs {expected}",
            estimate.mean
        );
        assert!(estimate.q025 < estimate.q975);
    }
    for (estimate, expected) in summary.beta_random.iter().zip(intercepts) {
        assert!(
            (estimate.mean - expected).abs() < 0.35,
            "intercept {} vs {expected}",
            estimate.mean
        );
    }
    assert!(report.criteria.p_dic > 0.0);
    assert!(report.criteria.p_dic < 10.0);
}

#[test]
fn mixture_keeps_well_separated_intercepts_apart() {
    let intercepts = [-2.0, 2.0, -2.0, 2.0, -2.0, 2.0, -2.0, 2.0, -2.0, 2.0];
    let input = simulate_strata(200, &intercepts, [0.5, 0.5], 8);
    let fit = fit(&input, DpmMethod::DpMixture, sampler_config(300, 300, 5))
        .expect("fit should succeed");

    let summary = fit_report(&fit)
        .expect("report should build")
        .posterior_summary
        .expect("summary should exist");
    assert!(summary.mean_occupied_components >= 1.0);
    for (estimate, expected) in summary.beta_random.iter().zip(intercepts) {
        assert!(
            estimate.mean * expected > 1.0,
            "intercept {} vs {expected}",
            estimate.mean
        );
    }
}

#[test]
fn smooth_variant_tracks_a_nonlinear_effect() {
    let n = 1_200;
    let mut rng = StdRng::seed_from_u64(5);
    let covariate = (0..n)
        .map(|row| usize_to_f64(row) / usize_to_f64(n - 1) * 6.0)
        .collect::<Vec<_>>();
    let strata = (0..n).map(|row| u64::from(row % 3 == 0)).collect::<Vec<_>>();
    let x = Mat::from_fn(n, 1, |_, _| sample_standard_normal(&mut rng));
    let outcome = Mat::from_fn(n, 1, |row, _| {
        let eta = 1.5 * covariate[row].sin() + 0.5 * x[(row, 0)];
        if rng.random::<f64>() < logistic(eta) {
            1.0
        } else {
            0.0
        }
    });
    let input = SeqLogitInput::new(outcome, x, strata).with_spline_covariate(covariate.clone());

    let mut config = sampler_config(200, 200, 1);
    config.spline_config = SplineConfig {
        inner_knots: 10,
        degree: 3,
        difference_order: 2,
    };
    let fit = fit(&input, DpmMethod::BaselineSpline, config).expect("fit should succeed");

    // Mean predictor near the peak of sin exceeds the one near its trough.
    let eta_at = |target: f64| {
        let rows = (0..n)
            .filter(|&row| (covariate[row] - target).abs() < 0.3)
            .collect::<Vec<_>>();
        rows.iter().map(|&row| fit.summaries.eta_hat[row]).sum::<f64>() / usize_to_f64(rows.len())
    };
    assert!(eta_at(std::f64::consts::FRAC_PI_2) > eta_at(3.0 * std::f64::consts::FRAC_PI_2) + 1.0);

    let mixing = mixing_summary(&fit.samples);
    assert!(mixing.ess_lambda.is_some_and(|ess| ess >= 1.0));
    assert!(mixing.min_ess_spline.is_some());
}

#[test]
fn invalid_inputs_and_configs_fail_before_sampling() {
    let input = simulate_strata(10, &[0.0, 1.0], [1.0, 1.0], 1);

    let mut non_binary = input.clone();
    non_binary.outcome[(3, 0)] = 0.5;
    assert!(matches!(
        fit(&non_binary, DpmMethod::Baseline, sampler_config(10, 0, 1)),
        Err(DpmError::InvalidInput(SeqLogitInputError::NonBinaryOutcome { row: 3, .. }))
    ));

    let mut non_finite = input.clone();
    non_finite.x_fixed[(0, 1)] = f64::NAN;
    assert!(matches!(
        fit(&non_finite, DpmMethod::DpMixture, sampler_config(10, 0, 2)),
        Err(DpmError::InvalidInput(SeqLogitInputError::NonFiniteDesign))
    ));

    assert!(matches!(
        fit(&input, DpmMethod::Baseline, sampler_config(0, 0, 1)),
        Err(DpmError::InvalidSchedule(InferenceError::InvalidDraws))
    ));
    assert!(matches!(
        fit(&input, DpmMethod::DpMixture, sampler_config(10, 0, 0)),
        Err(DpmError::InvalidPriorConfig)
    ));

    let constant = input.clone().with_spline_covariate(vec![1.0; 20]);
    assert!(matches!(
        fit(&constant, DpmMethod::BaselineSpline, sampler_config(10, 0, 1)),
        Err(DpmError::DegenerateSplineCovariate)
    ));
}

#[test]
fn overflowing_design_stops_the_chain_with_an_error() {
    let mut input = simulate_strata(20, &[0.0, 1.0], [0.5, 0.5], 6);
    input.x_fixed[(4, 0)] = 1.0e200;

    // X' Omega X overflows to infinity in the first fixed-effects update.
    let result = fit(&input, DpmMethod::Baseline, sampler_config(10, 5, 1));
    assert!(matches!(
        result,
        Err(DpmError::NotPositiveDefinite {
            block: "fixed effects",
            ..
        })
    ));
}

#[test]
fn zero_burn_in_retains_from_the_first_iteration() {
    let input = simulate_strata(30, &[0.0, 0.5, -0.5], [0.3, 0.0], 4);
    let mut config = sampler_config(12, 0, 3);
    config.fit_options.thinning = 4;
    config.fit_options.verbose = true;
    config.fit_options.progress_interval = Some(5);
    let fit = fit(&input, DpmMethod::DpMixture, config).expect("fit should succeed");

    assert_eq!(fit.samples.len(), 12);
    assert_eq!(fit.diagnostics.iterations_completed, 48);
    assert_eq!(fit.summaries.loglik_draws.len(), 12);
}

#[test]
fn diagnostics_flag_separated_strata() {
    let input = SeqLogitInput::new(
        Mat::from_fn(6, 1, |row, _| if row < 3 { 1.0 } else { 0.0 }),
        Mat::from_fn(6, 1, |row, _| usize_to_f64(row)),
        vec![0, 0, 0, 1, 1, 1],
    );
    let diagnostics = outcome_diagnostics(&input);
    assert_eq!(diagnostics.separated_levels(), vec![0, 1]);

    // Separation does not break the sampler: the priors keep every block proper.
    let fit = fit(&input, DpmMethod::Baseline, sampler_config(20, 5, 1))
        .expect("fit should succeed");
    assert!(fit.samples.draws.iter().all(|draw| draw.beta_random.iter().all(|value| value.is_finite())));
}
