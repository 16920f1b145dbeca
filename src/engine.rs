//! # Allocation Engine
//!
//! $$
//! \mathbf{w}^\* = \operatorname{Allocate}(\text{strategy}, R, \sigma_{\max}, w_{\max})
//! $$
//!
//! Dispatch from a [`Strategy`] to the four allocation entry points, plus a
//! small configured engine for embedders that hold one strategy fixed.

use tracing::debug;

use crate::cvar::cvar;
use crate::error::AllocError;
use crate::hrp::hrp;
use crate::markowitz::markowitz;
use crate::returns::ReturnsMatrix;
use crate::risk_parity::risk_parity;
use crate::types::Allocation;
use crate::types::Strategy;

/// Runtime configuration for [`AllocationEngine`].
#[derive(Clone, Debug)]
pub struct AllocationConfig {
  /// Strategy used by [`AllocationEngine::allocate`].
  pub strategy: Strategy,
  /// Volatility ceiling for Markowitz; advisory for CVaR; unused elsewhere.
  pub risk_level: f64,
  /// Per-asset weight cap in `(0, 1]`.
  pub max_weight: f64,
}

impl Default for AllocationConfig {
  fn default() -> Self {
    Self {
      strategy: Strategy::Markowitz,
      risk_level: 0.25,
      max_weight: 1.0,
    }
  }
}

/// Single entry-point engine over the four allocation strategies.
#[derive(Clone, Debug)]
pub struct AllocationEngine {
  config: AllocationConfig,
}

impl AllocationEngine {
  /// Construct a new engine with explicit configuration.
  pub fn new(config: AllocationConfig) -> Self {
    Self { config }
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &AllocationConfig {
    &self.config
  }

  /// Allocate weights for `returns` under the configured strategy.
  pub fn allocate(&self, returns: &ReturnsMatrix) -> Result<Allocation, AllocError> {
    allocate_with_strategy(
      self.config.strategy,
      returns,
      self.config.risk_level,
      self.config.max_weight,
    )
  }
}

/// Dispatch to the selected strategy entry point.
pub fn allocate_with_strategy(
  strategy: Strategy,
  returns: &ReturnsMatrix,
  risk_level: f64,
  max_weight: f64,
) -> Result<Allocation, AllocError> {
  debug!(
    ?strategy,
    risk_level,
    max_weight,
    assets = returns.asset_count(),
    observations = returns.observation_count(),
    "allocation requested"
  );

  match strategy {
    Strategy::Markowitz => markowitz(returns, risk_level, max_weight),
    Strategy::RiskParity => risk_parity(returns, max_weight),
    Strategy::Hrp => hrp(returns, max_weight),
    Strategy::Cvar => cvar(returns, risk_level, max_weight),
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  fn sample_returns() -> ReturnsMatrix {
    ReturnsMatrix::new(
      vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()],
      vec![
        vec![0.010, -0.011, 0.012, -0.009, 0.011, -0.010, 0.009, -0.012],
        vec![0.012, 0.010, -0.011, -0.009, 0.011, 0.012, -0.010, -0.011],
        vec![0.015, -0.014, -0.016, 0.015, 0.014, -0.015, -0.014, 0.016],
      ],
    )
    .unwrap()
  }

  #[test]
  fn every_strategy_covers_all_tickers_and_sums_to_one() {
    let returns = sample_returns();
    let strategies = [
      Strategy::Markowitz,
      Strategy::RiskParity,
      Strategy::Hrp,
      Strategy::Cvar,
    ];

    for strategy in strategies {
      let allocation = allocate_with_strategy(strategy, &returns, 0.5, 0.9).unwrap();

      assert_eq!(allocation.len(), 3, "{strategy:?} dropped a ticker");
      for ticker in returns.tickers() {
        let w = allocation
          .weight(ticker)
          .unwrap_or_else(|| panic!("{strategy:?} lost {ticker}"));
        assert!(w >= -1e-9, "{strategy:?} made {ticker} negative: {w}");
        assert!(w <= 0.9 + 1e-6, "{strategy:?} broke the cap on {ticker}: {w}");
      }
      assert_abs_diff_eq!(allocation.total(), 1.0, epsilon = 1e-4);
    }
  }

  #[test]
  fn engine_dispatches_its_configured_strategy() {
    let engine = AllocationEngine::new(AllocationConfig {
      strategy: Strategy::Hrp,
      risk_level: 0.5,
      max_weight: 1.0,
    });

    let direct = hrp(&sample_returns(), 1.0).unwrap();
    let via_engine = engine.allocate(&sample_returns()).unwrap();
    assert_eq!(direct, via_engine);
  }

  #[test]
  fn default_config_is_markowitz() {
    let config = AllocationConfig::default();
    assert_eq!(config.strategy, Strategy::Markowitz);
    assert!(config.max_weight > 0.0 && config.max_weight <= 1.0);
  }
}
