//! # Minimum-Variance Allocation
//!
//! $$
//! \min_{\mathbf{w}} \sqrt{\mathbf{w}^\top \Sigma \mathbf{w}}
//! \quad \text{s.t.}\quad \textstyle\sum_i w_i = 1,\
//! \sigma_p(\mathbf{w}) \le \sigma_{\max},\ 0 \le w_i \le w_{\max}
//! $$
//!
//! Markowitz allocation: minimize portfolio volatility under a budget
//! constraint, a caller-supplied volatility ceiling and a per-asset cap.

use impl_new_derive::ImplNew;

use crate::error::AllocError;
use crate::moments::covariance_matrix;
use crate::moments::quad_form;
use crate::returns::ReturnsMatrix;
use crate::solver::Constraint;
use crate::solver::Objective;
use crate::solver::SolverConfig;
use crate::solver::minimize;
use crate::types::Allocation;
use crate::types::validate_weight_cap;

/// Portfolio volatility `sqrt(w' Σ w)`.
#[derive(ImplNew, Clone, Debug)]
pub struct PortfolioVolatility {
  /// Sample covariance of the asset returns.
  pub cov: Vec<Vec<f64>>,
}

impl PortfolioVolatility {
  /// Volatility of the portfolio with weights `w`.
  pub fn volatility(&self, w: &[f64]) -> f64 {
    quad_form(&self.cov, w).max(0.0).sqrt()
  }
}

impl Objective for PortfolioVolatility {
  fn value(&self, w: &[f64]) -> f64 {
    self.volatility(w)
  }
}

/// Minimum-variance weights under a volatility ceiling and per-asset cap.
///
/// Solver non-convergence surfaces as
/// `OptimizationFailure("Optimization failed.")`.
pub fn markowitz(
  returns: &ReturnsMatrix,
  risk_level: f64,
  max_weight: f64,
) -> Result<Allocation, AllocError> {
  validate_weight_cap(max_weight)?;

  let n = returns.asset_count();
  let objective = PortfolioVolatility::new(covariance_matrix(returns));
  let ceiling = objective.clone();

  let constraints = vec![
    Constraint::equality(|w: &[f64]| w.iter().sum::<f64>() - 1.0),
    Constraint::inequality(move |w: &[f64]| risk_level - ceiling.volatility(w)),
  ];
  let bounds = vec![(0.0, max_weight); n];
  let initial = vec![1.0 / n as f64; n];

  let weights = minimize(
    &objective,
    &initial,
    &bounds,
    &constraints,
    &SolverConfig::default(),
  )
  .map_err(|err| match err {
    AllocError::ConvergenceFailure { .. } => {
      AllocError::OptimizationFailure("Optimization failed.".to_string())
    }
    other => other,
  })?;

  Ok(Allocation::from_weights(returns.tickers(), &weights))
}
