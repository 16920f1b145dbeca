//! # Hierarchical Risk Parity
//!
//! $$
//! d_{ij} = \sqrt{\tfrac{1}{2}(1-\rho_{ij})},\qquad
//! \alpha = 1 - \frac{V_{\text{left}}}{V_{\text{left}} + V_{\text{right}}}
//! $$
//!
//! Lopez de Prado's allocation: single-linkage clustering over the
//! correlation distance yields a leaf order, which is bisected recursively
//! with capital split inversely to each half's cluster variance. Closed
//! form, deterministic, never touches the solver.

use tracing::debug;

use crate::error::AllocError;
use crate::moments::distance_matrix;
use crate::moments::estimate;
use crate::returns::ReturnsMatrix;
use crate::types::Allocation;
use crate::types::validate_weight_cap;

/// Hierarchical-risk-parity weights.
///
/// `max_weight` is validated for contract symmetry with the solver-based
/// strategies; the bisection itself allocates cap-free, since clamping a
/// share would break the sum-to-one invariant.
pub fn hrp(returns: &ReturnsMatrix, max_weight: f64) -> Result<Allocation, AllocError> {
  validate_weight_cap(max_weight)?;
  debug!(max_weight, "hierarchical allocation; the cap is advisory here");

  let (cov, corr) = estimate(returns)?;
  let dist = distance_matrix(&corr);
  let order = single_linkage_order(&dist);

  let mut weights = vec![1.0; returns.asset_count()];
  bisect(&order, &cov, &mut weights);

  Ok(Allocation::from_weights(returns.tickers(), &weights))
}

/// Leaf order from a single-linkage merge pass over the distance matrix.
///
/// Clusters keep their members in merge order; the pair at minimum distance
/// merges first, and cluster-to-cluster distance is the minimum pairwise
/// member distance. The surviving cluster's member list is the leaf
/// permutation of the merge tree.
fn single_linkage_order(dist: &[Vec<f64>]) -> Vec<usize> {
  let n = dist.len();
  if n <= 1 {
    return (0..n).collect();
  }

  let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
  let mut d = dist.to_vec();
  let mut active = vec![true; n];

  for _ in 0..(n - 1) {
    let mut min_d = f64::INFINITY;
    let mut merge = (0, 1);

    for i in 0..n {
      if !active[i] {
        continue;
      }
      for j in (i + 1)..n {
        if active[j] && d[i][j] < min_d {
          min_d = d[i][j];
          merge = (i, j);
        }
      }
    }

    let (keep, drop) = merge;
    let absorbed = std::mem::take(&mut members[drop]);
    members[keep].extend(absorbed);
    active[drop] = false;

    for k in 0..n {
      if active[k] && k != keep {
        d[keep][k] = d[keep][k].min(d[drop][k]);
        d[k][keep] = d[keep][k];
      }
    }
  }

  let root = active.iter().position(|&a| a).unwrap_or(0);
  members[root].clone()
}

/// Split shares inversely to cluster variance, then recurse into the
/// halves. A singleton keeps its accumulated share.
fn bisect(order: &[usize], cov: &[Vec<f64>], weights: &mut [f64]) {
  if order.len() <= 1 {
    return;
  }

  let mid = order.len() / 2;
  let (left, right) = order.split_at(mid);

  let left_var = cluster_variance(left, cov);
  let right_var = cluster_variance(right, cov);
  let total = left_var + right_var;
  let split = if total > 1e-30 {
    1.0 - left_var / total
  } else {
    0.5
  };

  for &i in left {
    weights[i] *= split;
  }
  for &i in right {
    weights[i] *= 1.0 - split;
  }

  bisect(left, cov, weights);
  bisect(right, cov, weights);
}

/// Variance of the inverse-variance-weighted portfolio restricted to
/// `indices`.
fn cluster_variance(indices: &[usize], cov: &[Vec<f64>]) -> f64 {
  let inv_vars: Vec<f64> = indices.iter().map(|&i| 1.0 / cov[i][i]).collect();
  let total: f64 = inv_vars.iter().sum();
  let w: Vec<f64> = inv_vars.iter().map(|&v| v / total).collect();

  let mut var = 0.0;
  for (a, &ia) in indices.iter().enumerate() {
    for (b, &ib) in indices.iter().enumerate() {
      var += w[a] * w[b] * cov[ia][ib];
    }
  }
  var
}
