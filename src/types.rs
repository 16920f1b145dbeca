//! # Allocation Types
//!
//! $$
//! \mathbf{w} \in [0, w_{\max}]^N,\quad \textstyle\sum_i w_i \approx 1
//! $$
//!
//! Shared enums and result containers for the allocation strategies.

use std::str::FromStr;

use crate::error::AllocError;

/// Supported allocation strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
  /// Volatility-minimizing weights under a volatility ceiling.
  Markowitz,
  /// Equalized per-asset risk contributions.
  RiskParity,
  /// Hierarchical risk parity over a correlation-distance tree.
  Hrp,
  /// Empirical tail-loss (CVaR) minimization.
  Cvar,
}

impl FromStr for Strategy {
  type Err = AllocError;

  fn from_str(s: &str) -> Result<Self, AllocError> {
    match s.to_ascii_lowercase().as_str() {
      "markowitz" => Ok(Self::Markowitz),
      "risk_parity" => Ok(Self::RiskParity),
      "hrp" => Ok(Self::Hrp),
      "cvar" => Ok(Self::Cvar),
      other => Err(AllocError::UnsupportedMethod(other.to_string())),
    }
  }
}

/// Final per-ticker allocation, ordered as the input columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Allocation {
  /// `(ticker, weight)` pairs in input column order, weights rounded to six
  /// decimal digits.
  pub weights: Vec<(String, f64)>,
}

impl Allocation {
  pub(crate) fn from_weights(tickers: &[String], raw: &[f64]) -> Self {
    let weights = tickers
      .iter()
      .zip(raw.iter())
      .map(|(ticker, &w)| (ticker.clone(), round6(w)))
      .collect();
    Self { weights }
  }

  /// Weight for `ticker`, if allocated.
  pub fn weight(&self, ticker: &str) -> Option<f64> {
    self
      .weights
      .iter()
      .find(|(t, _)| t == ticker)
      .map(|(_, w)| *w)
  }

  /// Sum of all weights.
  pub fn total(&self) -> f64 {
    self.weights.iter().map(|(_, w)| w).sum()
  }

  /// Number of allocated assets.
  pub fn len(&self) -> usize {
    self.weights.len()
  }

  /// True when no assets are allocated.
  pub fn is_empty(&self) -> bool {
    self.weights.is_empty()
  }
}

fn round6(x: f64) -> f64 {
  (x * 1e6).round() / 1e6
}

/// Per-asset weight cap must lie in `(0, 1]`.
pub(crate) fn validate_weight_cap(max_weight: f64) -> Result<(), AllocError> {
  if !max_weight.is_finite() || max_weight <= 0.0 || max_weight > 1.0 {
    return Err(AllocError::MalformedInput(format!(
      "max_weight must lie in (0, 1], got {max_weight}"
    )));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strategy_parses_the_four_known_names() {
    assert_eq!("markowitz".parse::<Strategy>().unwrap(), Strategy::Markowitz);
    assert_eq!(
      "risk_parity".parse::<Strategy>().unwrap(),
      Strategy::RiskParity
    );
    assert_eq!("HRP".parse::<Strategy>().unwrap(), Strategy::Hrp);
    assert_eq!("cvar".parse::<Strategy>().unwrap(), Strategy::Cvar);
  }

  #[test]
  fn strategy_rejects_unknown_names() {
    let result = "kelly".parse::<Strategy>();
    assert!(matches!(result, Err(AllocError::UnsupportedMethod(_))));
  }

  #[test]
  fn weights_are_rounded_to_six_decimals() {
    let allocation = Allocation::from_weights(
      &["AAA".to_string(), "BBB".to_string()],
      &[0.333_333_4999, 0.666_666_5001],
    );

    assert_eq!(allocation.weight("AAA"), Some(0.333333));
    assert_eq!(allocation.weight("BBB"), Some(0.666667));
    assert!((allocation.total() - 1.0).abs() < 1e-4);
  }

  #[test]
  fn weight_lookup_misses_unknown_tickers() {
    let allocation = Allocation::from_weights(&["AAA".to_string(), "BBB".to_string()], &[0.5, 0.5]);
    assert_eq!(allocation.weight("CCC"), None);
    assert_eq!(allocation.len(), 2);
  }

  #[test]
  fn weight_cap_range_is_enforced() {
    assert!(validate_weight_cap(0.5).is_ok());
    assert!(validate_weight_cap(1.0).is_ok());
    assert!(matches!(
      validate_weight_cap(0.0),
      Err(AllocError::MalformedInput(_))
    ));
    assert!(matches!(
      validate_weight_cap(1.5),
      Err(AllocError::MalformedInput(_))
    ));
  }
}
