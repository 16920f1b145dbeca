//! # Risk-Parity Allocation
//!
//! $$
//! \min_{\mathbf{w}} \sum_i
//! \left(\frac{w_i (\Sigma \mathbf{w})_i}{\mathbf{w}^\top \Sigma \mathbf{w}}
//! - \tfrac{1}{N}\right)^2
//! \quad \text{s.t.}\quad \textstyle\sum_i w_i = 1,\ 0 \le w_i \le w_{\max}
//! $$
//!
//! Equal-risk-contribution allocation: every asset contributes the same
//! share of total portfolio variance.

use impl_new_derive::ImplNew;

use crate::error::AllocError;
use crate::moments::estimate;
use crate::moments::mat_vec;
use crate::returns::ReturnsMatrix;
use crate::solver::Constraint;
use crate::solver::Objective;
use crate::solver::SolverConfig;
use crate::solver::minimize;
use crate::types::Allocation;
use crate::types::validate_weight_cap;

/// Portfolio variance below this floor makes the contribution ratio
/// undefined; the objective returns [`DEGENERATE_PENALTY`] instead.
const VARIANCE_GUARD: f64 = 1e-12;

/// Objective value charged for a degenerate weight vector.
const DEGENERATE_PENALTY: f64 = 1e6;

/// Squared deviation of per-asset risk contributions from the equal share
/// `1/N`.
#[derive(ImplNew, Clone, Debug)]
pub struct RiskContributionSpread {
  /// Sample covariance of the asset returns.
  pub cov: Vec<Vec<f64>>,
}

impl Objective for RiskContributionSpread {
  fn value(&self, w: &[f64]) -> f64 {
    let n = w.len();
    let sigma_w = mat_vec(&self.cov, w);
    let port_var: f64 = w.iter().zip(sigma_w.iter()).map(|(a, b)| a * b).sum();
    if port_var.abs() < VARIANCE_GUARD {
      return DEGENERATE_PENALTY;
    }

    let target = 1.0 / n as f64;
    w.iter()
      .zip(sigma_w.iter())
      .map(|(&wi, &si)| {
        let contribution = wi * si / port_var;
        (contribution - target) * (contribution - target)
      })
      .sum()
  }
}

/// Equal-risk-contribution weights under a per-asset cap.
///
/// A zero-variance asset is fatal here; solver non-convergence surfaces as
/// `OptimizationFailure("Risk parity optimization failed.")`.
pub fn risk_parity(returns: &ReturnsMatrix, max_weight: f64) -> Result<Allocation, AllocError> {
  validate_weight_cap(max_weight)?;

  let (cov, _corr) = estimate(returns)?;
  let n = returns.asset_count();
  let objective = RiskContributionSpread::new(cov);

  let constraints = vec![Constraint::equality(|w: &[f64]| {
    w.iter().sum::<f64>() - 1.0
  })];
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
      AllocError::OptimizationFailure("Risk parity optimization failed.".to_string())
    }
    other => other,
  })?;

  Ok(Allocation::from_weights(returns.tickers(), &weights))
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  fn symmetric_pair() -> ReturnsMatrix {
    ReturnsMatrix::new(
      vec!["AAA".to_string(), "BBB".to_string()],
      vec![
        vec![0.01, -0.01, 0.01, -0.01],
        vec![0.01, 0.01, -0.01, -0.01],
      ],
    )
    .unwrap()
  }

  /// Two uncorrelated assets, the second with twice the volatility.
  fn uneven_pair() -> ReturnsMatrix {
    ReturnsMatrix::new(
      vec!["AAA".to_string(), "BBB".to_string()],
      vec![
        vec![0.01, -0.01, 0.01, -0.01],
        vec![0.02, 0.02, -0.02, -0.02],
      ],
    )
    .unwrap()
  }

  #[test]
  fn symmetric_assets_split_evenly() {
    let allocation = risk_parity(&symmetric_pair(), 1.0).unwrap();

    assert_abs_diff_eq!(allocation.weight("AAA").unwrap(), 0.5, epsilon = 1e-4);
    assert_abs_diff_eq!(allocation.weight("BBB").unwrap(), 0.5, epsilon = 1e-4);
    assert_abs_diff_eq!(allocation.total(), 1.0, epsilon = 1e-4);
  }

  #[test]
  fn weights_scale_with_inverse_volatility() {
    // Uncorrelated two-asset risk parity equalizes w_i * sigma_i, so the
    // half-volatility asset carries two thirds of the budget.
    let allocation = risk_parity(&uneven_pair(), 1.0).unwrap();

    assert_abs_diff_eq!(
      allocation.weight("AAA").unwrap(),
      2.0 / 3.0,
      epsilon = 1e-3
    );
    assert_abs_diff_eq!(
      allocation.weight("BBB").unwrap(),
      1.0 / 3.0,
      epsilon = 1e-3
    );
  }

  #[test]
  fn zero_variance_asset_is_degenerate() {
    let returns = ReturnsMatrix::new(
      vec!["AAA".to_string(), "FLAT".to_string()],
      vec![vec![0.01, -0.01, 0.02], vec![0.004, 0.004, 0.004]],
    )
    .unwrap();

    let result = risk_parity(&returns, 1.0);
    assert!(matches!(result, Err(AllocError::DegenerateInput(_))));
  }

  #[test]
  fn degenerate_weight_vector_is_penalised_not_divided() {
    let objective = RiskContributionSpread::new(vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
    assert_eq!(objective.value(&[0.5, 0.5]), DEGENERATE_PENALTY);
  }
}
