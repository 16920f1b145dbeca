//! # Moment Estimation
//!
//! $$
//! \Sigma_{ij} = \operatorname{Cov}(r_i, r_j),\qquad
//! \rho_{ij} = \frac{\Sigma_{ij}}{\sigma_i \sigma_j},\qquad
//! d_{ij} = \sqrt{\tfrac{1}{2}(1-\rho_{ij})}
//! $$
//!
//! Covariance, correlation and correlation-distance matrices derived from a
//! [`ReturnsMatrix`], plus the small dense linear algebra shared by the
//! strategies.

use statrs::statistics::Statistics;

use crate::error::AllocError;
use crate::returns::ReturnsMatrix;

/// Variances at or below this floor are treated as zero.
const VARIANCE_FLOOR: f64 = 1e-12;

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
  a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub(crate) fn mat_vec(mat: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
  mat.iter().map(|row| dot(row, v)).collect()
}

pub(crate) fn quad_form(mat: &[Vec<f64>], w: &[f64]) -> f64 {
  dot(w, &mat_vec(mat, w))
}

/// Unbiased sample covariance matrix across the aligned return series.
pub fn covariance_matrix(returns: &ReturnsMatrix) -> Vec<Vec<f64>> {
  let series = returns.series();
  let n = series.len();
  let mut cov = vec![vec![0.0; n]; n];

  for i in 0..n {
    cov[i][i] = series[i].iter().variance();
    for j in (i + 1)..n {
      let c = series[i].iter().covariance(series[j].iter());
      cov[i][j] = c;
      cov[j][i] = c;
    }
  }

  cov
}

/// Correlation matrix from a covariance matrix.
///
/// The diagonal is set to exactly 1.0 and off-diagonal entries are clamped
/// to `[-1, 1]`. Fails with [`AllocError::DegenerateInput`] when any asset
/// has zero variance.
pub fn correlation_matrix(cov: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, AllocError> {
  let n = cov.len();

  for (i, row) in cov.iter().enumerate() {
    if row[i] <= VARIANCE_FLOOR {
      return Err(AllocError::DegenerateInput(format!(
        "asset at column {i} has zero variance"
      )));
    }
  }

  let mut corr = vec![vec![0.0; n]; n];
  for i in 0..n {
    corr[i][i] = 1.0;
    let si = cov[i][i].sqrt();
    for j in (i + 1)..n {
      let sj = cov[j][j].sqrt();
      let r = (cov[i][j] / (si * sj)).clamp(-1.0, 1.0);
      corr[i][j] = r;
      corr[j][i] = r;
    }
  }

  Ok(corr)
}

/// Correlation-distance matrix `sqrt(0.5 * (1 - corr))`, diagonal forced to
/// 0.0.
pub fn distance_matrix(corr: &[Vec<f64>]) -> Vec<Vec<f64>> {
  let n = corr.len();
  let mut dist = vec![vec![0.0; n]; n];

  for i in 0..n {
    for j in 0..n {
      dist[i][j] = if i == j {
        0.0
      } else {
        (0.5 * (1.0 - corr[i][j])).max(0.0).sqrt()
      };
    }
  }

  dist
}

/// Covariance and correlation matrices in one pass.
pub fn estimate(returns: &ReturnsMatrix) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>), AllocError> {
  let cov = covariance_matrix(returns);
  let corr = correlation_matrix(&cov)?;
  Ok((cov, corr))
}
