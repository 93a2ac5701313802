//! Reusable inference and MCMC utility types.

use thiserror::Error;

use crate::utils::usize_to_f64;

/// Errors for generic MCMC schedules.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InferenceError {
    #[error("retained draw count must be positive")]
    InvalidDraws,
    #[error("thinning interval must be positive")]
    InvalidThinning,
}

/// Generic MCMC schedule expressed in retained draws.
///
/// The chain runs `draws * thinning + burn_in` iterations. After the burn-in,
/// every `thinning`-th iteration is retained, so exactly `draws` states are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct McmcSchedule {
    pub draws: usize,
    pub burn_in: usize,
    pub thinning: usize,
}

impl Default for McmcSchedule {
    fn default() -> Self {
        Self {
            draws: 1_000,
            burn_in: 1_000,
            thinning: 1,
        }
    }
}

impl McmcSchedule {
    /// # Errors
    ///
    /// Returns `InferenceError` if schedule values are invalid.
    pub const fn validate(self) -> Result<(), InferenceError> {
        if self.draws == 0 {
            return Err(InferenceError::InvalidDraws);
        }
        if self.thinning == 0 {
            return Err(InferenceError::InvalidThinning);
        }
        Ok(())
    }

    /// Total number of sampler iterations implied by this schedule.
    #[must_use]
    pub const fn total_iterations(self) -> usize {
        self.draws * self.thinning + self.burn_in
    }

    /// Retained-draw counter `k` (1-based) for a 1-based `iteration`, or `None`
    /// when the iteration is discarded.
    #[must_use]
    pub const fn retention_index(self, iteration: usize) -> Option<usize> {
        if iteration <= self.burn_in || self.thinning == 0 {
            return None;
        }
        let after_burn_in = iteration - self.burn_in;
        if after_burn_in % self.thinning == 0 {
            Some(after_burn_in / self.thinning)
        } else {
            None
        }
    }
}

/// Online arithmetic mean of equally sized vectors.
///
/// Uses the recurrence `mean_k = ((k - 1) * mean_{k-1} + x_k) / k`, so the full
/// history never has to be stored.
#[derive(Debug, Clone, Default)]
pub struct RunningMean {
    values: Vec<f64>,
    count: usize,
}

impl RunningMean {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
            count: 0,
        }
    }

    /// Fold one more observation into the running mean.
    ///
    /// # Panics
    ///
    /// Panics if `next` has a different length than the accumulator.
    pub fn update(&mut self, next: &[f64]) {
        assert_eq!(
            next.len(),
            self.values.len(),
            "running mean length mismatch"
        );
        self.count += 1;
        let k = usize_to_f64(self.count);
        for (mean, value) in self.values.iter_mut().zip(next) {
            *mean = (k - 1.0).mul_add(*mean, *value) / k;
        }
    }

    /// Number of observations folded in so far.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}
