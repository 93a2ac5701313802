//! Exact `PG(1, z)` sampling.
//!
//! Devroye's alternating-series sampler as adapted by Polson, Scott and Windle
//! (2013): propose `X = 4 * omega` from a mixture of a truncated exponential
//! (right of `TRUNCATION`) and a truncated inverse Gaussian (left of it), then
//! accept or reject by squeezing the Jacobi density series between its partial
//! sums. The accepted draw is exact; no moment matching or series truncation is
//! involved.

use std::f64::consts::{FRAC_2_PI, PI, SQRT_2};

use rand::RngExt;
use rand::rngs::StdRng;
use statrs::function::erf::erfc;

use super::random::{sample_standard_exponential, sample_standard_normal};
use super::types::DpmError;

const TRUNCATION: f64 = 0.64;
const PI_SQ_OVER_8: f64 = PI * PI / 8.0;
const MAX_SERIES_TERMS: usize = 1_000;

/// Draw `omega ~ PG(1, tilt)`.
///
/// # Errors
///
/// Returns `DpmError::NonFiniteTilt` if `tilt` is NaN or infinite.
pub fn sample_polya_gamma(rng: &mut StdRng, tilt: f64) -> Result<f64, DpmError> {
    if !tilt.is_finite() {
        return Err(DpmError::NonFiniteTilt(tilt));
    }
    let z = 0.5 * tilt.abs();
    let fz = 0.5_f64.mul_add(z * z, PI_SQ_OVER_8);
    let left_mass = exponential_mixture_mass(z, fz);

    loop {
        let x = if rng.random::<f64>() < left_mass {
            TRUNCATION + sample_standard_exponential(rng) / fz
        } else {
            sample_truncated_inverse_gaussian(rng, z)
        };

        let mut partial = series_coefficient(0, x);
        let threshold = rng.random::<f64>() * partial;
        for n in 1..=MAX_SERIES_TERMS {
            if n % 2 == 1 {
                partial -= series_coefficient(n, x);
                if threshold <= partial {
                    return Ok(0.25 * x);
                }
            } else {
                partial += series_coefficient(n, x);
                if threshold > partial {
                    break;
                }
            }
        }
    }
}

/// Mean of `PG(1, tilt)`: `tanh(tilt / 2) / (2 tilt)`, `1/4` at zero.
#[must_use]
pub fn polya_gamma_mean(tilt: f64) -> f64 {
    if tilt.abs() < 1.0e-8 {
        0.25
    } else {
        (0.5 * tilt).tanh() / (2.0 * tilt)
    }
}

/// Piecewise coefficient `a_n(x)` of the Jacobi density series.
fn series_coefficient(n: usize, x: f64) -> f64 {
    let k = n_to_f64(n) + 0.5;
    if x > TRUNCATION {
        PI * k * (-0.5 * k * k * PI * PI * x).exp()
    } else {
        (FRAC_2_PI / x).powf(1.5) * PI * k * (-2.0 * k * k / x).exp()
    }
}

/// Probability of proposing from the exponential tail rather than the
/// truncated inverse Gaussian.
fn exponential_mixture_mass(z: f64, fz: f64) -> f64 {
    let root_inv_t = (1.0 / TRUNCATION).sqrt();
    let b = root_inv_t * TRUNCATION.mul_add(z, -1.0);
    let a = -root_inv_t * TRUNCATION.mul_add(z, 1.0);

    let x0 = fz.ln() + fz * TRUNCATION;
    let xb = x0 - z + log_standard_normal_cdf(b);
    let xa = x0 + z + log_standard_normal_cdf(a);
    let q_over_p = 4.0 / PI * (xb.exp() + xa.exp());
    1.0 / (1.0 + q_over_p)
}

/// Inverse Gaussian with mean `1 / z` and unit shape, truncated to `(0, TRUNCATION)`.
fn sample_truncated_inverse_gaussian(rng: &mut StdRng, z: f64) -> f64 {
    if 1.0 / TRUNCATION > z {
        // Mean beyond the truncation point: inverse chi-square proposal with
        // an exponential-tilt acceptance step.
        loop {
            let x = loop {
                let e1 = sample_standard_exponential(rng);
                let e2 = sample_standard_exponential(rng);
                if e1 * e1 <= 2.0 * e2 / TRUNCATION {
                    let root = e1.mul_add(TRUNCATION, 1.0);
                    break TRUNCATION / (root * root);
                }
            };
            let alpha = (-0.5 * z * z * x).exp();
            if rng.random::<f64>() <= alpha {
                return x;
            }
        }
    }

    let mu = 1.0 / z;
    loop {
        let y = {
            let normal = sample_standard_normal(rng);
            normal * normal
        };
        let half_mu = 0.5 * mu;
        let mu_y = mu * y;
        let mut x = half_mu.mul_add(mu_y, mu) - half_mu * mu_y.mul_add(mu_y, 4.0 * mu_y).sqrt();
        if rng.random::<f64>() > mu / (mu + x) {
            x = mu * mu / x;
        }
        if x < TRUNCATION {
            return x;
        }
    }
}

fn log_standard_normal_cdf(value: f64) -> f64 {
    (0.5 * erfc(-value / SQRT_2)).ln()
}

fn n_to_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}
