//! Random-variate primitives driven by a caller-owned `StdRng`.

use rand::RngExt;
use rand::rngs::StdRng;

use super::types::DpmError;

/// Standard normal variate (Box-Muller).
pub fn sample_standard_normal(rng: &mut StdRng) -> f64 {
    let u1 = (1.0_f64 - rng.random::<f64>()).max(f64::MIN_POSITIVE);
    let u2 = rng.random::<f64>();
    (-2.0_f64 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// `Exponential(1)` variate.
pub fn sample_standard_exponential(rng: &mut StdRng) -> f64 {
    -(1.0_f64 - rng.random::<f64>()).max(f64::MIN_POSITIVE).ln()
}

/// `Gamma(shape, rate)` variate (Marsaglia-Tsang, boosted for `shape < 1`).
///
/// # Errors
///
/// Returns `DpmError::NonPositiveParameter` unless both parameters are
/// positive and finite.
pub fn sample_gamma(rng: &mut StdRng, shape: f64, rate: f64) -> Result<f64, DpmError> {
    check_positive("gamma shape", shape)?;
    check_positive("gamma rate", rate)?;
    Ok(sample_gamma_unit_rate(rng, shape) / rate)
}

fn sample_gamma_unit_rate(rng: &mut StdRng, shape: f64) -> f64 {
    if shape < 1.0 {
        let u = (1.0_f64 - rng.random::<f64>()).max(f64::MIN_POSITIVE);
        return sample_gamma_unit_rate(rng, shape + 1.0) * u.powf(1.0 / shape);
    }

    let shape_minus_third = shape - (1.0 / 3.0);
    let coeff = (1.0 / (9.0 * shape_minus_third)).sqrt();
    loop {
        let standard_normal = sample_standard_normal(rng);
        let one_plus_coeff_noise = coeff.mul_add(standard_normal, 1.0);
        if one_plus_coeff_noise <= 0.0 {
            continue;
        }
        let cubic_term = one_plus_coeff_noise * one_plus_coeff_noise * one_plus_coeff_noise;
        let uniform = rng.random::<f64>();
        if uniform
            < (0.0331 * standard_normal * standard_normal * standard_normal)
                .mul_add(-standard_normal, 1.0)
        {
            return shape_minus_third * cubic_term;
        }
        if uniform.ln()
            < (0.5 * standard_normal).mul_add(
                standard_normal,
                shape_minus_third * (1.0 - cubic_term + cubic_term.ln()),
            )
        {
            return shape_minus_third * cubic_term;
        }
    }
}

/// One draw on the simplex from `Dirichlet(concentration)`.
///
/// Built from independent unit-rate Gamma variates normalized by their sum.
///
/// # Errors
///
/// Returns `DpmError::NonPositiveParameter` if the concentration vector is
/// empty or holds a non-positive entry.
pub fn sample_dirichlet(rng: &mut StdRng, concentration: &[f64]) -> Result<Vec<f64>, DpmError> {
    if concentration.is_empty() {
        return Err(DpmError::NonPositiveParameter {
            distribution: "dirichlet dimension",
            value: 0.0,
        });
    }
    for &alpha in concentration {
        check_positive("dirichlet concentration", alpha)?;
    }

    let mut gammas = concentration
        .iter()
        .map(|&alpha| sample_gamma_unit_rate(rng, alpha))
        .collect::<Vec<_>>();
    let total = gammas.iter().sum::<f64>();
    if !(total > 0.0 && total.is_finite()) {
        // Every shape was tiny enough for all draws to underflow; put the mass
        // on the largest concentration.
        let largest = concentration
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(index, _)| index);
        gammas.iter_mut().for_each(|value| *value = 0.0);
        gammas[largest] = 1.0;
        return Ok(gammas);
    }
    gammas.iter_mut().for_each(|value| *value /= total);
    Ok(gammas)
}

/// Categorical draw from non-negative weights that need not be normalized.
///
/// Returns the last index with positive weight if rounding leaves the uniform
/// beyond the cumulative sum.
pub fn sample_categorical(rng: &mut StdRng, weights: &[f64]) -> usize {
    let total = weights.iter().sum::<f64>();
    let target = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for (index, weight) in weights.iter().enumerate() {
        cumulative += weight;
        if target < cumulative {
            return index;
        }
    }
    weights
        .iter()
        .rposition(|weight| *weight > 0.0)
        .unwrap_or(0)
}

fn check_positive(distribution: &'static str, value: f64) -> Result<(), DpmError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(DpmError::NonPositiveParameter {
            distribution,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn gamma_mean_matches_shape_over_rate() {
        let mut rng = StdRng::seed_from_u64(7);
        for (shape, rate) in [(0.4, 2.0), (3.0, 0.5)] {
            let n: u32 = 40_000;
            let mean = (0..n)
                .map(|_| sample_gamma(&mut rng, shape, rate).expect("valid gamma"))
                .sum::<f64>()
                / f64::from(n);
            let expected = shape / rate;
            assert!(
                (mean - expected).abs() / expected < 0.03,
                "Gamma({shape}, {rate}) mean {mean}, expected {expected}"
            );
        }
    }

    #[test]
    fn gamma_rejects_non_positive_parameters() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            sample_gamma(&mut rng, 0.0, 1.0),
            Err(DpmError::NonPositiveParameter { .. })
        ));
        assert!(matches!(
            sample_gamma(&mut rng, 1.0, f64::NAN),
            Err(DpmError::NonPositiveParameter { .. })
        ));
    }

    #[test]
    fn dirichlet_draws_lie_on_the_simplex() {
        let mut rng = StdRng::seed_from_u64(11);
        let concentrations: [&[f64]; 4] = [
            &[1.0],
            &[0.1, 0.1, 0.1, 0.1, 0.1],
            &[2.5, 0.2, 7.0],
            &[1.0e-3, 1.0e-3, 5.0],
        ];
        for concentration in concentrations {
            for _ in 0..200 {
                let draw = sample_dirichlet(&mut rng, concentration).expect("valid dirichlet");
                assert_eq!(draw.len(), concentration.len());
                assert!(draw.iter().all(|value| *value >= 0.0));
                assert!((draw.iter().sum::<f64>() - 1.0).abs() < 1.0e-12);
            }
        }
    }

    #[test]
    fn dirichlet_rejects_non_positive_concentration() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(sample_dirichlet(&mut rng, &[1.0, 0.0]).is_err());
        assert!(sample_dirichlet(&mut rng, &[]).is_err());
    }

    #[test]
    fn single_component_dirichlet_is_degenerate() {
        let mut rng = StdRng::seed_from_u64(5);
        let draw = sample_dirichlet(&mut rng, &[1.0 + 12.0]).expect("valid dirichlet");
        assert!((draw[0] - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn categorical_respects_zero_weights() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..500 {
            let index = sample_categorical(&mut rng, &[0.0, 2.0, 0.0, 1.0]);
            assert!(index == 1 || index == 3);
        }
    }

    #[test]
    fn standard_normal_has_unit_variance() {
        let mut rng = StdRng::seed_from_u64(13);
        let n: u32 = 50_000;
        let draws = (0..n)
            .map(|_| sample_standard_normal(&mut rng))
            .collect::<Vec<_>>();
        let mean = draws.iter().sum::<f64>() / f64::from(n);
        let variance = draws.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / f64::from(n);
        assert!(mean.abs() < 0.02);
        assert!((variance - 1.0).abs() < 0.03);
    }
}
