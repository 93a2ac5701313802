//! Prior specifications and log-density helpers.

/// Hyperparameters for the DP-mixture sequential logit prior set.
///
/// - `beta_Fix ~ N(0, fixed_precision^-1 I)`
/// - `beta_RF[l] | S, theta, tau ~ N(theta[S_l], 1 / tau)`
/// - `theta[h] ~ N(0, 1 / theta_precision)`
/// - `tau ~ Gamma(tau_shape, tau_rate)`
/// - `nu ~ Dirichlet(1/H, ..., 1/H)` over `components = H` clusters
/// - `lambda ~ Gamma(lambda_shape, lambda_rate)` for the spline smoothing precision
#[derive(Debug, Clone, Copy)]
pub struct DpmPriorConfig {
    /// Ridge precision `P_Fix_const` on every fixed-effect coefficient.
    pub fixed_precision: f64,
    /// Gamma shape `a_tau` of the shared cluster precision.
    pub tau_shape: f64,
    /// Gamma rate `b_tau` of the shared cluster precision.
    pub tau_rate: f64,
    /// Prior precision `tau_mu` of the cluster means.
    pub theta_precision: f64,
    /// Truncation level `H` of the mixture.
    pub components: usize,
    /// Gamma shape `a_lambda` of the smoothing precision.
    pub lambda_shape: f64,
    /// Gamma rate `b_lambda` of the smoothing precision.
    pub lambda_rate: f64,
}

impl Default for DpmPriorConfig {
    fn default() -> Self {
        Self {
            fixed_precision: 0.01,
            tau_shape: 1.0,
            tau_rate: 1.0,
            theta_precision: 0.01,
            components: 10,
            lambda_shape: 1.0,
            lambda_rate: 0.005,
        }
    }
}

impl DpmPriorConfig {
    /// Whether all prior hyperparameters are numerically valid.
    #[must_use]
    pub fn is_valid(self) -> bool {
        positive_finite(self.fixed_precision)
            && positive_finite(self.tau_shape)
            && positive_finite(self.tau_rate)
            && positive_finite(self.theta_precision)
            && self.components > 0
            && positive_finite(self.lambda_shape)
            && positive_finite(self.lambda_rate)
    }

    /// Copy with the mixture collapsed to a single Gaussian component.
    #[must_use]
    pub const fn single_component(self) -> Self {
        Self {
            components: 1,
            ..self
        }
    }

    /// Prior mean of the cluster precision, used as its initial value.
    #[must_use]
    pub fn tau_prior_mean(self) -> f64 {
        self.tau_shape / self.tau_rate
    }

    /// Prior mean of the smoothing precision, used as its initial value.
    #[must_use]
    pub fn lambda_prior_mean(self) -> f64 {
        self.lambda_shape / self.lambda_rate
    }
}

fn positive_finite(value: f64) -> bool {
    value > 0.0 && value.is_finite()
}

/// Log-density of `Normal(mean, 1 / precision)`.
#[must_use]
pub fn log_normal_density_precision(value: f64, mean: f64, precision: f64) -> f64 {
    if precision <= 0.0 {
        return f64::NEG_INFINITY;
    }
    let centered = value - mean;
    0.5 * (precision.ln() - std::f64::consts::TAU.ln() - precision * centered * centered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn prior_defaults_are_valid() {
        assert!(DpmPriorConfig::default().is_valid());
    }

    #[test]
    fn zero_components_are_invalid() {
        let prior = DpmPriorConfig {
            components: 0,
            ..DpmPriorConfig::default()
        };
        assert!(!prior.is_valid());
        assert_eq!(prior.single_component().components, 1);
    }

    #[test]
    fn normal_density_peaks_at_mean() {
        let at_mean = log_normal_density_precision(1.0, 1.0, 4.0);
        assert_relative_eq!(
            at_mean,
            0.5 * (4.0f64.ln() - std::f64::consts::TAU.ln()),
            epsilon = 1.0e-12
        );
        assert!(log_normal_density_precision(2.0, 1.0, 4.0) < at_mean);
    }
}
