//! # Returns Matrix
//!
//! $$
//! R \in \mathbb{R}^{T \times N},\quad N \ge 2,\ T \ge 2
//! $$
//!
//! Validated container for aligned historical return series, one column per
//! asset. All allocation entry points consume this type; validation happens
//! once, at construction.

use crate::error::AllocError;

/// Immutable matrix of historical returns keyed by ticker.
///
/// Stored asset-major: `series[i]` is the full return history of
/// `tickers[i]`. All series have equal length, every value is finite, and
/// there are at least two assets and two observations.
#[derive(Clone, Debug)]
pub struct ReturnsMatrix {
  tickers: Vec<String>,
  series: Vec<Vec<f64>>,
}

impl ReturnsMatrix {
  /// Build from per-asset return series.
  pub fn new(tickers: Vec<String>, series: Vec<Vec<f64>>) -> Result<Self, AllocError> {
    if tickers.len() != series.len() {
      return Err(AllocError::MalformedInput(format!(
        "{} tickers for {} return series",
        tickers.len(),
        series.len()
      )));
    }
    if tickers.is_empty() {
      return Err(AllocError::MalformedInput("no assets supplied".to_string()));
    }

    for (i, ticker) in tickers.iter().enumerate() {
      if ticker.is_empty() {
        return Err(AllocError::MalformedInput(format!(
          "empty ticker at column {i}"
        )));
      }
      if tickers[..i].contains(ticker) {
        return Err(AllocError::MalformedInput(format!(
          "duplicate ticker {ticker}"
        )));
      }
    }

    let len = series[0].len();
    if len == 0 {
      return Err(AllocError::MalformedInput(
        "no observations supplied".to_string(),
      ));
    }
    for (ticker, xs) in tickers.iter().zip(series.iter()) {
      if xs.len() != len {
        return Err(AllocError::MalformedInput(format!(
          "return series for {ticker} has length {}, expected {len}",
          xs.len()
        )));
      }
      if xs.iter().any(|x| !x.is_finite()) {
        return Err(AllocError::MalformedInput(format!(
          "non-numeric return value for {ticker}"
        )));
      }
    }

    if tickers.len() < 2 {
      return Err(AllocError::DegenerateInput(
        "at least two assets are required".to_string(),
      ));
    }
    if len < 2 {
      return Err(AllocError::DegenerateInput(
        "at least two observations are required".to_string(),
      ));
    }

    Ok(Self { tickers, series })
  }

  /// Build from row-major observations (one row per date), the shape of a
  /// tabular returns file.
  pub fn from_rows(tickers: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, AllocError> {
    let n = tickers.len();
    for (t, row) in rows.iter().enumerate() {
      if row.len() != n {
        return Err(AllocError::MalformedInput(format!(
          "row {t} has {} values, expected {n}",
          row.len()
        )));
      }
    }

    let mut series = vec![Vec::with_capacity(rows.len()); n];
    for row in &rows {
      for (i, &x) in row.iter().enumerate() {
        series[i].push(x);
      }
    }

    Self::new(tickers, series)
  }

  /// Number of assets (columns).
  pub fn asset_count(&self) -> usize {
    self.tickers.len()
  }

  /// Number of aligned observations (rows).
  pub fn observation_count(&self) -> usize {
    self.series[0].len()
  }

  /// Asset identifiers in input order.
  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  /// Asset-major return series, aligned with [`ReturnsMatrix::tickers`].
  pub fn series(&self) -> &[Vec<f64>] {
    &self.series
  }

  /// Historical portfolio return per observation under weights `w`.
  pub fn portfolio_returns(&self, w: &[f64]) -> Vec<f64> {
    let t = self.observation_count();
    (0..t)
      .map(|k| {
        self
          .series
          .iter()
          .zip(w.iter())
          .map(|(xs, &wi)| wi * xs[k])
          .sum()
      })
      .collect()
  }
}
