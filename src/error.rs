//! # Errors
//!
//! $$
//! \text{result} \in \{\mathbf{w}^\*\} \cup \{\text{typed failure}\}
//! $$
//!
//! Failure taxonomy shared by all allocation entry points.

use thiserror::Error;

/// Errors produced by the allocation core and its boundary contract.
///
/// `MalformedInput`, `DegenerateInput` and `UnsupportedMethod` describe bad
/// requests; `ConvergenceFailure` and `OptimizationFailure` describe solver
/// outcomes on well-formed inputs.
#[derive(Debug, Error)]
pub enum AllocError {
  /// Input cannot form a valid returns matrix, or a parameter is out of its
  /// contractual range.
  #[error("malformed returns input: {0}")]
  MalformedInput(String),

  /// Structurally valid input that is statistically unusable: zero-variance
  /// asset, or too few assets/observations.
  #[error("degenerate returns input: {0}")]
  DegenerateInput(String),

  /// Strategy identifier is not one of the known strategies.
  #[error("unsupported allocation method: {0}")]
  UnsupportedMethod(String),

  /// The constrained solver exhausted its budget without reaching a feasible
  /// stationary point. Carries no partial weights.
  #[error("solver failed to converge after {iterations} iterations (constraint violation {violation:.3e})")]
  ConvergenceFailure {
    /// Inner iterations spent across all penalty stages.
    iterations: u64,
    /// Worst constraint or bound violation at the final iterate.
    violation: f64,
  },

  /// A strategy could not produce a weight vector.
  #[error("{0}")]
  OptimizationFailure(String),
}
