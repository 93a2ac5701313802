//! DIC and WAIC from the streamed running summaries.

use super::likelihood::total_log_likelihood;
use super::types::{DpmError, DpmFit};
use crate::utils::mean;

/// Model-comparison statistics of one fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InformationCriteria {
    pub dic: f64,
    /// Effective number of parameters under DIC.
    pub p_dic: f64,
    pub waic: f64,
    /// Effective number of parameters under WAIC.
    pub p_waic: f64,
    /// Log-likelihood at the posterior-mean linear predictor.
    pub loglik_at_mean: f64,
    /// Raw coefficient count `p_Fix + p_RF + p_spline`.
    pub n_parameters: usize,
}

/// Compute DIC and WAIC without revisiting the stored draws.
///
/// - `p_DIC = 2 (loglik(eta_hat) - mean(loglik_draws))`
/// - `DIC = -2 loglik(eta_hat) + 2 p_DIC`
/// - `p_WAIC = 2 Σ_i (ln exp_lppd_i - log_pdf_hat_i)`
/// - `WAIC = Σ_i ln exp_lppd_i - p_WAIC`
///
/// # Errors
///
/// Returns `DpmError::EmptyPosterior` if the fit holds no retained draws.
pub fn compute_information_criteria(fit: &DpmFit) -> Result<InformationCriteria, DpmError> {
    let summaries = &fit.summaries;
    if summaries.loglik_draws.is_empty() {
        return Err(DpmError::EmptyPosterior);
    }

    let loglik_at_mean = total_log_likelihood(&fit.outcome, &summaries.eta_hat);
    let p_dic = 2.0 * (loglik_at_mean - mean(&summaries.loglik_draws));
    let dic = (-2.0_f64).mul_add(loglik_at_mean, 2.0 * p_dic);

    let lppd = summaries.exp_lppd.iter().map(|value| value.ln()).sum::<f64>();
    let p_waic = 2.0
        * summaries
            .exp_lppd
            .iter()
            .zip(&summaries.log_pdf_hat)
            .map(|(likelihood, log_pdf)| likelihood.ln() - log_pdf)
            .sum::<f64>();
    let waic = lppd - p_waic;

    Ok(InformationCriteria {
        dic,
        p_dic,
        waic,
        p_waic,
        loglik_at_mean,
        n_parameters: fit.n_parameters,
    })
}
