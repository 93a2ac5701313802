//! Dense linear algebra for the conjugate Gaussian blocks.

use faer::{Mat, Side};
use rand::rngs::StdRng;

use super::random::sample_standard_normal;
use super::types::DpmError;
use crate::utils::matrix_is_finite;

/// `Xᵗ diag(weights) X`.
#[must_use]
pub fn weighted_cross_product(design: &Mat<f64>, weights: &[f64]) -> Mat<f64> {
    let cols = design.ncols();
    let mut product = Mat::<f64>::zeros(cols, cols);
    for row in 0..design.nrows() {
        let weight = weights[row];
        for i in 0..cols {
            let scaled = weight * design[(row, i)];
            if scaled == 0.0 {
                continue;
            }
            for j in 0..=i {
                product[(i, j)] += scaled * design[(row, j)];
            }
        }
    }
    for i in 0..cols {
        for j in 0..i {
            product[(j, i)] = product[(i, j)];
        }
    }
    product
}

/// `Xᵗ v`.
#[must_use]
pub fn transpose_times(design: &Mat<f64>, values: &[f64]) -> Vec<f64> {
    (0..design.ncols())
        .map(|col| {
            (0..design.nrows())
                .map(|row| design[(row, col)] * values[row])
                .sum()
        })
        .collect()
}

/// `βᵗ A β` for a square `A`.
#[must_use]
pub fn quadratic_form(matrix: &Mat<f64>, coefficients: &[f64]) -> f64 {
    let mut total = 0.0;
    for (i, beta_i) in coefficients.iter().enumerate() {
        for (j, beta_j) in coefficients.iter().enumerate() {
            total += beta_i * matrix[(i, j)] * beta_j;
        }
    }
    total
}

/// Eigendecomposition of a symmetric positive-definite precision matrix.
#[derive(Debug, Clone)]
pub struct PrecisionEigen {
    eigenvalues: Vec<f64>,
    eigenvectors: Mat<f64>,
}

impl PrecisionEigen {
    /// Decompose `precision`, symmetrizing it first.
    ///
    /// # Errors
    ///
    /// Returns `DpmError::NotPositiveDefinite` if the matrix has non-finite
    /// entries or a non-positive eigenvalue, and
    /// `DpmError::EigendecompositionFailed` if the solver does not converge.
    pub fn new(precision: &Mat<f64>, block: &'static str) -> Result<Self, DpmError> {
        if !matrix_is_finite(precision) {
            return Err(DpmError::NotPositiveDefinite {
                block,
                min_eigenvalue: f64::NAN,
            });
        }
        let dim = precision.nrows();
        let symmetric = Mat::from_fn(dim, dim, |i, j| {
            0.5 * (precision[(i, j)] + precision[(j, i)])
        });
        let eig = symmetric
            .as_ref()
            .self_adjoint_eigen(Side::Lower)
            .map_err(|_| DpmError::EigendecompositionFailed { block })?;

        let diag = eig.S();
        let eigenvalues = (0..diag.dim()).map(|idx| diag[idx]).collect::<Vec<_>>();
        let min_eigenvalue = eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
        if !(min_eigenvalue > 0.0 && eigenvalues.iter().all(|value| value.is_finite())) {
            return Err(DpmError::NotPositiveDefinite {
                block,
                min_eigenvalue,
            });
        }

        let vectors = eig.U();
        let eigenvectors = Mat::from_fn(vectors.nrows(), vectors.ncols(), |i, j| vectors[(i, j)]);
        Ok(Self {
            eigenvalues,
            eigenvectors,
        })
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.eigenvalues.len()
    }

    /// `U f(Λ) Uᵗ` for a scalar map `f` of the eigenvalues.
    fn spectral_map(&self, f: impl Fn(f64) -> f64) -> Mat<f64> {
        let dim = self.dim();
        let scaled = self.eigenvalues.iter().map(|&value| f(value)).collect::<Vec<_>>();
        Mat::from_fn(dim, dim, |i, j| {
            (0..dim)
                .map(|k| self.eigenvectors[(i, k)] * scaled[k] * self.eigenvectors[(j, k)])
                .sum()
        })
    }

    /// Symmetric inverse square root `Q^{-1/2}`.
    #[must_use]
    pub fn inverse_root(&self) -> Mat<f64> {
        self.spectral_map(|value| 1.0 / value.sqrt())
    }

    /// Solve `Q x = rhs`.
    #[must_use]
    pub fn solve(&self, rhs: &[f64]) -> Vec<f64> {
        let dim = self.dim();
        let projected = (0..dim)
            .map(|k| {
                (0..dim)
                    .map(|i| self.eigenvectors[(i, k)] * rhs[i])
                    .sum::<f64>()
                    / self.eigenvalues[k]
            })
            .collect::<Vec<_>>();
        (0..dim)
            .map(|i| {
                (0..dim)
                    .map(|k| self.eigenvectors[(i, k)] * projected[k])
                    .sum()
            })
            .collect()
    }
}

/// Draw from `N(Q⁻¹ b, Q⁻¹)` given the precision `Q` and linear term `b`.
///
/// The draw is `Q⁻¹ b + Q^{-1/2} z` with `z` standard normal, where both the
/// solve and the symmetric root come from one eigendecomposition of `Q`.
///
/// # Errors
///
/// Returns `DpmError` if `Q` is not positive definite.
pub fn sample_gaussian_canonical(
    rng: &mut StdRng,
    precision: &Mat<f64>,
    linear: &[f64],
    block: &'static str,
) -> Result<Vec<f64>, DpmError> {
    let dim = precision.nrows();
    if dim == 0 {
        return Ok(Vec::new());
    }
    let eigen = PrecisionEigen::new(precision, block)?;
    let mean = eigen.solve(linear);
    let root = eigen.inverse_root();
    let noise = (0..dim)
        .map(|_| sample_standard_normal(rng))
        .collect::<Vec<_>>();
    Ok((0..dim)
        .map(|i| mean[i] + (0..dim).map(|j| root[(i, j)] * noise[j]).sum::<f64>())
        .collect())
}
