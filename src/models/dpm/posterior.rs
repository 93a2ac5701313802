//! Posterior storage and summaries for DP-mixture sequential logit fits.

use crate::utils::{percentile, usize_to_f64};

/// A single retained Gibbs draw.
#[derive(Debug, Clone)]
pub struct DpmPosteriorDraw {
    pub beta_fixed: Vec<f64>,
    /// Free stratum intercepts (reference level excluded in spline variants).
    pub beta_random: Vec<f64>,
    /// Spline coefficients; empty for variants without a smooth term.
    pub beta_spline: Vec<f64>,
    /// Mixture component of every free stratum level.
    pub clusters: Vec<usize>,
    /// Component means `theta`.
    pub cluster_means: Vec<f64>,
    /// Component weights `nu`.
    pub weights: Vec<f64>,
    /// Shared component precision.
    pub tau: f64,
    /// Smoothing precision; `None` without a smooth term.
    pub lambda: Option<f64>,
}

impl DpmPosteriorDraw {
    /// Number of components holding at least one level.
    #[must_use]
    pub fn occupied_components(&self) -> usize {
        let mut occupied = vec![false; self.weights.len().max(1)];
        for &cluster in &self.clusters {
            if let Some(slot) = occupied.get_mut(cluster) {
                *slot = true;
            }
        }
        occupied.into_iter().filter(|&flag| flag).count()
    }
}

/// Posterior draw collection in retention order.
#[derive(Debug, Clone, Default)]
pub struct DpmPosteriorSamples {
    pub draws: Vec<DpmPosteriorDraw>,
}

impl DpmPosteriorSamples {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.draws.len()
    }

    /// Trace of one coefficient of a block selected by `block`.
    #[must_use]
    pub fn trace(&self, block: impl Fn(&DpmPosteriorDraw) -> &[f64], index: usize) -> Vec<f64> {
        self.draws.iter().map(|draw| block(draw)[index]).collect()
    }
}

/// Scalar posterior summary statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub q025: f64,
    pub q50: f64,
    pub q975: f64,
}

/// Posterior summary for every stored block.
#[derive(Debug, Clone, Default)]
pub struct DpmPosteriorSummary {
    pub beta_fixed: Vec<ParameterSummary>,
    pub beta_random: Vec<ParameterSummary>,
    pub beta_spline: Vec<ParameterSummary>,
    pub tau: Option<ParameterSummary>,
    pub lambda: Option<ParameterSummary>,
    /// Average number of occupied mixture components.
    pub mean_occupied_components: f64,
    pub draw_count: usize,
}

/// Compute posterior summaries for all stored parameter blocks.
#[must_use]
pub fn summarize_posterior(samples: &DpmPosteriorSamples) -> DpmPosteriorSummary {
    let draw_count = samples.len();
    let Some(first) = samples.draws.first() else {
        return DpmPosteriorSummary {
            draw_count,
            ..DpmPosteriorSummary::default()
        };
    };

    let summarize_block = |len: usize, block: fn(&DpmPosteriorDraw) -> &[f64]| {
        (0..len)
            .map(|index| summarize_scalar(&samples.trace(block, index)))
            .collect::<Vec<_>>()
    };

    let tau_values: Vec<f64> = samples.draws.iter().map(|draw| draw.tau).collect();
    let lambda_values: Vec<f64> = samples.draws.iter().filter_map(|draw| draw.lambda).collect();
    let occupied = samples
        .draws
        .iter()
        .map(|draw| usize_to_f64(draw.occupied_components()))
        .sum::<f64>();

    DpmPosteriorSummary {
        beta_fixed: summarize_block(first.beta_fixed.len(), |draw| &draw.beta_fixed),
        beta_random: summarize_block(first.beta_random.len(), |draw| &draw.beta_random),
        beta_spline: summarize_block(first.beta_spline.len(), |draw| &draw.beta_spline),
        tau: Some(summarize_scalar(&tau_values)),
        lambda: (!lambda_values.is_empty()).then(|| summarize_scalar(&lambda_values)),
        mean_occupied_components: occupied / usize_to_f64(draw_count),
        draw_count,
    }
}

#[must_use]
fn summarize_scalar(values: &[f64]) -> ParameterSummary {
    if values.is_empty() {
        return ParameterSummary::default();
    }

    let n = usize_to_f64(values.len());
    let mean = values.iter().sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|value| {
            let centered = value - mean;
            centered * centered
        })
        .sum::<f64>()
        / n;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    ParameterSummary {
        mean,
        std_dev: variance.sqrt(),
        q025: percentile(&sorted, 0.025),
        q50: percentile(&sorted, 0.5),
        q975: percentile(&sorted, 0.975),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn draw(beta: f64, clusters: Vec<usize>, lambda: Option<f64>) -> DpmPosteriorDraw {
        DpmPosteriorDraw {
            beta_fixed: vec![beta],
            beta_random: vec![beta, -beta],
            beta_spline: Vec::new(),
            clusters,
            cluster_means: vec![0.0, 1.0, 2.0],
            weights: vec![0.5, 0.3, 0.2],
            tau: 1.0 + beta,
            lambda,
        }
    }

    #[test]
    fn summarize_empty_samples() {
        let summary = summarize_posterior(&DpmPosteriorSamples::default());
        assert_eq!(summary.draw_count, 0);
        assert!(summary.beta_fixed.is_empty());
        assert!(summary.tau.is_none());
        assert!(summary.lambda.is_none());
    }

    #[test]
    fn summarize_non_empty_samples() {
        let samples = DpmPosteriorSamples {
            draws: vec![draw(0.0, vec![0, 0], None), draw(2.0, vec![0, 2], None)],
        };

        let summary = summarize_posterior(&samples);
        assert_eq!(summary.draw_count, 2);
        assert_eq!(summary.beta_random.len(), 2);
        assert!(summary.beta_spline.is_empty());
        assert_relative_eq!(summary.beta_fixed[0].mean, 1.0);
        assert_relative_eq!(summary.beta_random[1].mean, -1.0);
        assert_relative_eq!(summary.beta_fixed[0].std_dev, 1.0);
        assert_relative_eq!(summary.tau.map_or(f64::NAN, |tau| tau.q50), 2.0);
        assert_relative_eq!(summary.mean_occupied_components, 1.5);
        assert!(summary.lambda.is_none());
    }

    #[test]
    fn lambda_summary_present_for_smooth_fits() {
        let samples = DpmPosteriorSamples {
            draws: vec![draw(0.0, vec![0, 0], Some(4.0)), draw(1.0, vec![1, 1], Some(6.0))],
        };
        let summary = summarize_posterior(&samples);
        assert_relative_eq!(summary.lambda.map_or(f64::NAN, |lambda| lambda.mean), 5.0);
    }
}
