//! Bernoulli-logit likelihood helpers.

/// Stable logistic transform.
#[must_use]
pub fn logistic_stable(value: f64) -> f64 {
    if value >= 0.0 {
        let z = (-value).exp();
        1.0 / (1.0 + z)
    } else {
        let z = value.exp();
        z / (1.0 + z)
    }
}

/// Stable `ln(1 + e^x)`.
#[must_use]
pub fn softplus(value: f64) -> f64 {
    if value > 0.0 {
        value + (-value).exp().ln_1p()
    } else {
        value.exp().ln_1p()
    }
}

/// Bernoulli log-density of `outcome` under linear predictor `eta`.
///
/// `ln p = -softplus(-eta)` and `ln(1 - p) = -softplus(eta)`.
#[must_use]
pub fn bernoulli_log_density(outcome: f64, eta: f64) -> f64 {
    if outcome > 0.5 {
        -softplus(-eta)
    } else {
        -softplus(eta)
    }
}

/// Total Bernoulli log-likelihood over paired outcomes and predictors.
#[must_use]
pub fn total_log_likelihood(outcomes: &[f64], eta: &[f64]) -> f64 {
    outcomes
        .iter()
        .zip(eta)
        .map(|(&y, &value)| bernoulli_log_density(y, value))
        .sum()
}
