//! Mixing diagnostics for single-chain posterior draws.

use super::posterior::{DpmPosteriorDraw, DpmPosteriorSamples};
use crate::utils::usize_to_f64;

/// Sample autocorrelation of `series` at `lag`; `0` when undefined.
#[must_use]
pub fn autocorrelation(series: &[f64], lag: usize) -> f64 {
    if series.is_empty() || lag >= series.len() {
        return 0.0;
    }

    let mean = series.iter().sum::<f64>() / usize_to_f64(series.len());
    let denominator = series
        .iter()
        .map(|value| {
            let centered = value - mean;
            centered * centered
        })
        .sum::<f64>();
    if denominator <= 0.0 {
        return 0.0;
    }

    let numerator = series
        .iter()
        .zip(&series[lag..])
        .map(|(head, tail)| (head - mean) * (tail - mean))
        .sum::<f64>();
    numerator / denominator
}

/// Effective sample size with the autocorrelation sum truncated at the
/// first non-positive lag.
#[must_use]
pub fn effective_sample_size(series: &[f64]) -> f64 {
    let n = series.len();
    if n < 2 {
        return usize_to_f64(n);
    }

    let mut rho_sum = 0.0;
    for lag in 1..n {
        let rho = autocorrelation(series, lag);
        if rho <= 0.0 {
            break;
        }
        rho_sum += rho;
    }

    usize_to_f64(n) / (2.0f64.mul_add(rho_sum, 1.0)).max(1.0)
}

/// Minimum effective sample size per parameter block.
///
/// Blocks absent from the fit report `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixingSummary {
    pub min_ess_fixed: Option<f64>,
    pub min_ess_random: Option<f64>,
    pub min_ess_spline: Option<f64>,
    pub ess_tau: Option<f64>,
    pub ess_lambda: Option<f64>,
}

/// Effective sample sizes of every stored block.
#[must_use]
pub fn mixing_summary(samples: &DpmPosteriorSamples) -> MixingSummary {
    let Some(first) = samples.draws.first() else {
        return MixingSummary {
            min_ess_fixed: None,
            min_ess_random: None,
            min_ess_spline: None,
            ess_tau: None,
            ess_lambda: None,
        };
    };

    let block_minimum = |len: usize, block: fn(&DpmPosteriorDraw) -> &[f64]| {
        (0..len)
            .map(|index| effective_sample_size(&samples.trace(block, index)))
            .reduce(f64::min)
    };
    let tau = samples.draws.iter().map(|draw| draw.tau).collect::<Vec<_>>();
    let lambda = samples
        .draws
        .iter()
        .filter_map(|draw| draw.lambda)
        .collect::<Vec<_>>();

    MixingSummary {
        min_ess_fixed: block_minimum(first.beta_fixed.len(), |draw| &draw.beta_fixed),
        min_ess_random: block_minimum(first.beta_random.len(), |draw| &draw.beta_random),
        min_ess_spline: block_minimum(first.beta_spline.len(), |draw| &draw.beta_spline),
        ess_tau: Some(effective_sample_size(&tau)),
        ess_lambda: (!lambda.is_empty()).then(|| effective_sample_size(&lambda)),
    }
}
