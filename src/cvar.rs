//! # CVaR Allocation
//!
//! $$
//! \operatorname{CVaR}_\alpha(\mathbf{w}) =
//! \mathbb{E}\left[R_p \mid R_p \le q_{1-\alpha}(R_p)\right]
//! $$
//!
//! Uryasev-style allocation over the empirical tail: minimize the negated
//! mean of historical portfolio returns at or below the `(1-α)` percentile.

use impl_new_derive::ImplNew;
use statrs::statistics::Data;
use statrs::statistics::OrderStatistics;
use statrs::statistics::Statistics;
use tracing::debug;

use crate::error::AllocError;
use crate::returns::ReturnsMatrix;
use crate::solver::Constraint;
use crate::solver::Objective;
use crate::solver::SolverConfig;
use crate::solver::minimize;
use crate::types::Allocation;
use crate::types::validate_weight_cap;

/// Confidence level of the tail estimate.
pub const CVAR_CONFIDENCE: f64 = 0.95;

/// Objective value charged when no tail observations exist.
const EMPTY_TAIL_PENALTY: f64 = 1e6;

/// Negated mean of the historical portfolio returns at or below the
/// empirical `(1-α)` percentile.
#[derive(ImplNew, Clone, Debug)]
pub struct TailLossObjective {
  /// Asset-major aligned return series.
  pub series: Vec<Vec<f64>>,
  /// Confidence level α.
  pub alpha: f64,
}

impl Objective for TailLossObjective {
  fn value(&self, w: &[f64]) -> f64 {
    let t = self.series.first().map(|s| s.len()).unwrap_or(0);
    if t == 0 {
      return EMPTY_TAIL_PENALTY;
    }

    let port: Vec<f64> = (0..t)
      .map(|k| {
        self
          .series
          .iter()
          .zip(w.iter())
          .map(|(xs, &wi)| wi * xs[k])
          .sum()
      })
      .collect();

    let percentile = ((1.0 - self.alpha) * 100.0).round() as usize;
    let mut data = Data::new(port.clone());
    let threshold = data.percentile(percentile);

    let tail: Vec<f64> = port.into_iter().filter(|r| *r <= threshold).collect();
    if tail.is_empty() {
      return EMPTY_TAIL_PENALTY;
    }

    -tail.iter().mean()
  }
}

/// Tail-loss-minimizing weights under a per-asset cap.
///
/// `risk_level` is accepted for interface symmetry with the Markowitz entry
/// point and does not constrain the tail objective. Solver non-convergence
/// surfaces as `OptimizationFailure("CVaR optimization failed.")`.
pub fn cvar(
  returns: &ReturnsMatrix,
  risk_level: f64,
  max_weight: f64,
) -> Result<Allocation, AllocError> {
  validate_weight_cap(max_weight)?;
  debug!(risk_level, "tail-loss allocation; the ceiling is advisory here");

  let n = returns.asset_count();
  let objective = TailLossObjective::new(returns.series().to_vec(), CVAR_CONFIDENCE);

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
      AllocError::OptimizationFailure("CVaR optimization failed.".to_string())
    }
    other => other,
  })?;

  Ok(Allocation::from_weights(returns.tickers(), &weights))
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  /// Three assets over eight observations; CCC carries one crash date.
  fn crash_prone_triple() -> ReturnsMatrix {
    ReturnsMatrix::new(
      vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()],
      vec![
        vec![0.010, -0.012, 0.008, -0.006, 0.012, -0.010, 0.009, -0.011],
        vec![0.008, -0.010, 0.012, -0.008, 0.010, -0.012, 0.011, -0.009],
        vec![0.020, 0.025, -0.300, 0.022, 0.018, 0.024, 0.020, 0.019],
      ],
    )
    .unwrap()
  }

  #[test]
  fn crash_prone_asset_is_underweighted() {
    let allocation = cvar(&crash_prone_triple(), 0.2, 1.0).unwrap();

    let crashy = allocation.weight("CCC").unwrap();
    assert!(
      crashy < 0.15,
      "crash-prone asset kept weight {crashy}, equal weight is 0.333"
    );
    assert_abs_diff_eq!(allocation.total(), 1.0, epsilon = 1e-4);
  }

  #[test]
  fn risk_level_does_not_change_the_result() {
    let low = cvar(&crash_prone_triple(), 0.01, 1.0).unwrap();
    let high = cvar(&crash_prone_triple(), 100.0, 1.0).unwrap();

    assert_eq!(low, high);
  }

  #[test]
  fn empty_series_hits_the_tail_penalty() {
    let objective = TailLossObjective::new(vec![], CVAR_CONFIDENCE);
    assert_eq!(objective.value(&[]), EMPTY_TAIL_PENALTY);
  }

  #[test]
  fn tail_objective_prefers_milder_tails() {
    let returns = crash_prone_triple();
    let objective = TailLossObjective::new(returns.series().to_vec(), CVAR_CONFIDENCE);

    let with_crash = objective.value(&[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]);
    let without_crash = objective.value(&[0.5, 0.5, 0.0]);
    assert!(without_crash < with_crash);
  }
}
