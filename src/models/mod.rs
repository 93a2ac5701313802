//! # Models
//!
//! Bayesian sequential logit models for ordinal transitions.

pub mod dpm;
