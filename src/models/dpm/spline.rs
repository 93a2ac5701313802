//! Equally spaced B-spline bases and difference penalties for P-splines.

use faer::Mat;

use super::types::{DpmError, SplineConfig};
use crate::utils::usize_to_f64;

/// Evaluated P-spline design for one covariate.
#[derive(Debug, Clone)]
pub struct SplineBasis {
    /// `n x p_spline` basis matrix evaluated at the observed covariate.
    pub basis: Mat<f64>,
    /// Extended knot vector of length `p_spline + degree + 1`.
    pub knots: Vec<f64>,
    /// Difference penalty `DᵗD` (`p_spline x p_spline`).
    pub penalty: Mat<f64>,
    pub degree: usize,
    pub difference_order: usize,
}

impl SplineBasis {
    /// Build the basis and penalty for `covariate`.
    ///
    /// # Errors
    ///
    /// Returns `DpmError::InvalidSplineConfig` for an unusable configuration
    /// and `DpmError::DegenerateSplineCovariate` when the covariate is empty,
    /// non-finite, or constant.
    pub fn new(covariate: &[f64], config: SplineConfig) -> Result<Self, DpmError> {
        if !config.is_valid() {
            return Err(DpmError::InvalidSplineConfig);
        }
        if covariate.is_empty() || covariate.iter().any(|value| !value.is_finite()) {
            return Err(DpmError::DegenerateSplineCovariate);
        }
        let lower = covariate.iter().copied().fold(f64::INFINITY, f64::min);
        let upper = covariate.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if upper - lower <= f64::EPSILON * upper.abs().max(1.0) {
            return Err(DpmError::DegenerateSplineCovariate);
        }

        let knots = equally_spaced_knots(lower, upper, config.inner_knots, config.degree);
        let basis = bspline_basis(covariate, &knots, config.degree);
        let penalty = difference_penalty(config.basis_dimension(), config.difference_order);
        Ok(Self {
            basis,
            knots,
            penalty,
            degree: config.degree,
            difference_order: config.difference_order,
        })
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.basis.ncols()
    }

    /// Rank of `DᵗD`, i.e. `p_spline - difference_order`.
    #[must_use]
    pub fn penalty_rank(&self) -> usize {
        self.dimension().saturating_sub(self.difference_order)
    }

    /// Basis rows at new covariate values, clamped to the boundary knots.
    #[must_use]
    pub fn evaluate(&self, values: &[f64]) -> Mat<f64> {
        bspline_basis(values, &self.knots, self.degree)
    }
}

/// Extended knots `lower + (k - degree) * h`, with `inner_knots + 1` segments
/// of width `h` covering `[lower, upper]`.
#[must_use]
pub fn equally_spaced_knots(lower: f64, upper: f64, inner_knots: usize, degree: usize) -> Vec<f64> {
    let segments = inner_knots + 1;
    let width = (upper - lower) / usize_to_f64(segments);
    (0..=segments + 2 * degree)
        .map(|k| {
            let offset = usize_to_f64(k) - usize_to_f64(degree);
            offset.mul_add(width, lower)
        })
        .collect()
}

/// Evaluate the `knots.len() - degree - 1` B-splines of `degree` at `values`.
///
/// Knots must be equally spaced. Values outside the boundary knots are
/// clamped, and the upper boundary belongs to the last segment.
#[must_use]
pub fn bspline_basis(values: &[f64], knots: &[f64], degree: usize) -> Mat<f64> {
    let n_basis = knots.len().saturating_sub(degree + 1);
    let mut basis = Mat::<f64>::zeros(values.len(), n_basis);
    if n_basis == 0 {
        return basis;
    }
    let segments = n_basis - degree;
    let lower = knots[degree];
    let upper = knots[degree + segments];
    let width = (upper - lower) / usize_to_f64(segments);

    let mut local = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    for (row, &raw) in values.iter().enumerate() {
        let x = raw.clamp(lower, upper);
        let span = degree + segment_index((x - lower) / width, segments);

        // Cox-de Boor triangle over the non-zero functions span-degree..=span.
        local[0] = 1.0;
        for j in 1..=degree {
            left[j] = x - knots[span + 1 - j];
            right[j] = knots[span + j] - x;
            let mut saved = 0.0;
            for r in 0..j {
                let temp = local[r] / (right[r + 1] + left[j - r]);
                local[r] = right[r + 1].mul_add(temp, saved);
                saved = left[j - r] * temp;
            }
            local[j] = saved;
        }
        for (offset, value) in local.iter().enumerate() {
            basis[(row, span - degree + offset)] = *value;
        }
    }
    basis
}

fn segment_index(scaled: f64, segments: usize) -> usize {
    let mut index = 0;
    while index + 1 < segments && usize_to_f64(index + 1) <= scaled {
        index += 1;
    }
    index
}

/// Difference operator `D` of the given order (`(dim - order) x dim`).
#[must_use]
pub fn difference_matrix(dim: usize, order: usize) -> Mat<f64> {
    let mut current = Mat::<f64>::from_fn(dim, dim, |i, j| if i == j { 1.0 } else { 0.0 });
    for _ in 0..order {
        let rows = current.nrows();
        if rows == 0 {
            break;
        }
        current = Mat::from_fn(rows - 1, dim, |i, j| current[(i + 1, j)] - current[(i, j)]);
    }
    current
}

/// Penalty `DᵗD` for a difference operator of the given order.
#[must_use]
pub fn difference_penalty(dim: usize, order: usize) -> Mat<f64> {
    let difference = difference_matrix(dim, order);
    Mat::from_fn(dim, dim, |i, j| {
        (0..difference.nrows())
            .map(|k| difference[(k, i)] * difference[(k, j)])
            .sum()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dpm::linalg::quadratic_form;
    use approx::assert_relative_eq;

    fn grid(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| usize_to_f64(i) / usize_to_f64(n - 1) * 4.0 - 1.0)
            .collect()
    }

    #[test]
    fn basis_has_expected_dimension_and_partition_of_unity() {
        let config = SplineConfig::default();
        let covariate = grid(101);
        let spline = SplineBasis::new(&covariate, config).expect("valid covariate");
        assert_eq!(spline.dimension(), config.basis_dimension());
        assert_eq!(spline.knots.len(), config.basis_dimension() + config.degree + 1);
        assert_eq!(spline.penalty_rank(), config.basis_dimension() - 2);

        for row in 0..covariate.len() {
            let total = (0..spline.dimension())
                .map(|col| spline.basis[(row, col)])
                .sum::<f64>();
            assert_relative_eq!(total, 1.0, epsilon = 1.0e-12);
            for col in 0..spline.dimension() {
                assert!(spline.basis[(row, col)] >= -1.0e-14);
            }
        }
    }

    #[test]
    fn boundary_points_touch_outer_functions() {
        let config = SplineConfig {
            inner_knots: 3,
            degree: 2,
            difference_order: 1,
        };
        let spline = SplineBasis::new(&[0.0, 1.0], config).expect("valid covariate");
        let last = spline.dimension() - 1;
        assert!(spline.basis[(0, 0)] > 0.0);
        assert_relative_eq!(spline.basis[(0, last)], 0.0);
        assert!(spline.basis[(1, last)] > 0.0);
        assert_relative_eq!(spline.basis[(1, 0)], 0.0);
    }

    #[test]
    fn evaluation_clamps_to_boundary_knots() {
        let spline = SplineBasis::new(&grid(20), SplineConfig::default()).expect("valid covariate");
        let outside = spline.evaluate(&[-10.0, 10.0]);
        let boundary = spline.evaluate(&[-1.0, 3.0]);
        for col in 0..spline.dimension() {
            assert_relative_eq!(outside[(0, col)], boundary[(0, col)]);
            assert_relative_eq!(outside[(1, col)], boundary[(1, col)]);
        }
    }

    #[test]
    fn constant_covariate_is_rejected() {
        assert!(matches!(
            SplineBasis::new(&[2.0; 10], SplineConfig::default()),
            Err(DpmError::DegenerateSplineCovariate)
        ));
        assert!(matches!(
            SplineBasis::new(&[], SplineConfig::default()),
            Err(DpmError::DegenerateSplineCovariate)
        ));
    }

    #[test]
    fn second_difference_matrix_coefficients() {
        let difference = difference_matrix(4, 2);
        assert_eq!(difference.nrows(), 2);
        let first_row = (0..4).map(|j| difference[(0, j)]).collect::<Vec<_>>();
        assert_eq!(first_row, vec![1.0, -2.0, 1.0, 0.0]);
    }

    #[test]
    fn penalty_annihilates_low_order_polynomials() {
        let dim = 8;
        let penalty = difference_penalty(dim, 2);
        let constant = vec![3.0; dim];
        let linear = (0..dim).map(usize_to_f64).collect::<Vec<_>>();
        let quadratic = linear.iter().map(|value| value * value).collect::<Vec<_>>();
        assert_relative_eq!(quadratic_form(&penalty, &constant), 0.0, epsilon = 1.0e-10);
        assert_relative_eq!(quadratic_form(&penalty, &linear), 0.0, epsilon = 1.0e-10);
        // Every second difference of k² equals 2.
        assert_relative_eq!(
            quadratic_form(&penalty, &quadratic),
            4.0 * usize_to_f64(dim - 2),
            epsilon = 1.0e-9
        );
    }
}
