//! # Constrained Minimization
//!
//! $$
//! \min_{\mathbf{w}} f(\mathbf{w})
//! \quad \text{s.t.}\quad g(\mathbf{w}) = 0,\ h(\mathbf{w}) \ge 0,\
//! \ell_i \le w_i \le u_i
//! $$
//!
//! Generic constrained minimizer shared by the solver-based strategies.
//! Constraints and bounds are folded into a quadratic penalty whose weight
//! grows over a sequence of stages; each stage is minimized with a
//! quasi-Newton descent over centrally-differenced gradients, with a
//! Nelder-Mead pass covering non-smooth objectives. Callers supply no
//! derivatives. The solver has no knowledge of portfolio semantics.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::Gradient;
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::neldermead::NelderMead;
use argmin::solver::quasinewton::LBFGS;
use tracing::debug;

use crate::error::AllocError;

/// Scalar objective over a candidate weight vector; lower is better.
pub trait Objective {
  /// Objective value at `w`.
  fn value(&self, w: &[f64]) -> f64;
}

/// Constraint sense.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
  /// `g(w) = 0` at a feasible point.
  Equality,
  /// `h(w) >= 0` at a feasible point.
  Inequality,
}

/// A single scalar constraint over the weight vector.
pub struct Constraint {
  kind: ConstraintKind,
  eval: Box<dyn Fn(&[f64]) -> f64 + Send + Sync>,
}

impl Constraint {
  /// Equality constraint `g(w) = 0`.
  pub fn equality(eval: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) -> Self {
    Self {
      kind: ConstraintKind::Equality,
      eval: Box::new(eval),
    }
  }

  /// Inequality constraint `h(w) >= 0`.
  pub fn inequality(eval: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) -> Self {
    Self {
      kind: ConstraintKind::Inequality,
      eval: Box::new(eval),
    }
  }

  /// Non-negative feasibility residual at `w`; zero when satisfied.
  fn residual(&self, w: &[f64]) -> f64 {
    let v = (self.eval)(w);
    match self.kind {
      ConstraintKind::Equality => v.abs(),
      ConstraintKind::Inequality => (-v).max(0.0),
    }
  }
}

/// Tuning knobs for [`minimize`].
#[derive(Clone, Debug)]
pub struct SolverConfig {
  /// Worst feasibility violation accepted at convergence.
  pub constraint_tolerance: f64,
  /// Relative objective change below which a feasible iterate is final.
  pub objective_tolerance: f64,
  /// Number of penalty continuation stages.
  pub max_stages: usize,
  /// Iteration cap for each inner descent.
  pub inner_iterations: u64,
  /// Penalty weight of the first stage.
  pub initial_penalty: f64,
  /// Multiplicative penalty growth between stages.
  pub penalty_growth: f64,
}

impl Default for SolverConfig {
  fn default() -> Self {
    Self {
      constraint_tolerance: 1e-7,
      objective_tolerance: 1e-6,
      max_stages: 12,
      inner_iterations: 400,
      initial_penalty: 10.0,
      penalty_growth: 10.0,
    }
  }
}

/// Central-difference step for gradient estimation.
const FD_STEP: f64 = 1e-6;

struct PenalisedProblem<'a> {
  objective: &'a dyn Objective,
  constraints: &'a [Constraint],
  bounds: &'a [(f64, f64)],
  penalty: f64,
}

impl PenalisedProblem<'_> {
  fn merit(&self, w: &[f64]) -> f64 {
    let mut excess = 0.0;
    for c in self.constraints {
      let r = c.residual(w);
      excess += r * r;
    }
    for (&(lo, hi), &wi) in self.bounds.iter().zip(w.iter()) {
      let out = (lo - wi).max(0.0) + (wi - hi).max(0.0);
      excess += out * out;
    }
    self.objective.value(w) + self.penalty * excess
  }
}

impl CostFunction for PenalisedProblem<'_> {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, w: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    Ok(self.merit(w))
  }
}

impl Gradient for PenalisedProblem<'_> {
  type Param = Vec<f64>;
  type Gradient = Vec<f64>;

  fn gradient(&self, w: &Self::Param) -> Result<Self::Gradient, argmin::core::Error> {
    let mut grad = vec![0.0; w.len()];
    let mut probe = w.clone();
    for i in 0..w.len() {
      probe[i] = w[i] + FD_STEP;
      let up = self.merit(&probe);
      probe[i] = w[i] - FD_STEP;
      let down = self.merit(&probe);
      probe[i] = w[i];
      grad[i] = (up - down) / (2.0 * FD_STEP);
    }
    Ok(grad)
  }
}

/// Worst constraint or bound violation at `w`.
fn violation(constraints: &[Constraint], bounds: &[(f64, f64)], w: &[f64]) -> f64 {
  let mut worst = 0.0_f64;
  for c in constraints {
    worst = worst.max(c.residual(w));
  }
  for (&(lo, hi), &wi) in bounds.iter().zip(w.iter()) {
    worst = worst.max(lo - wi).max(wi - hi);
  }
  worst
}

fn quasi_newton_descent(
  problem: PenalisedProblem<'_>,
  from: Vec<f64>,
  iters: u64,
) -> Option<(Vec<f64>, f64, u64)> {
  let linesearch = MoreThuenteLineSearch::new();
  let solver = LBFGS::new(linesearch, 7);

  match Executor::new(problem, solver)
    .configure(|state| state.param(from).max_iters(iters))
    .run()
  {
    Ok(res) => {
      let spent = res.state.iter;
      let cost = res.state.best_cost;
      res.state.best_param.map(|p| (p, cost, spent))
    }
    Err(_) => None,
  }
}

fn simplex_descent(
  problem: PenalisedProblem<'_>,
  from: &[f64],
  iters: u64,
) -> Option<(Vec<f64>, f64, u64)> {
  let mut simplex = Vec::with_capacity(from.len() + 1);
  simplex.push(from.to_vec());
  for i in 0..from.len() {
    let mut vertex = from.to_vec();
    vertex[i] += 0.05;
    simplex.push(vertex);
  }

  let solver = match NelderMead::new(simplex).with_sd_tolerance(1e-10) {
    Ok(solver) => solver,
    Err(_) => return None,
  };

  match Executor::new(problem, solver)
    .configure(|state| state.max_iters(iters))
    .run()
  {
    Ok(res) => {
      let spent = res.state.iter;
      let cost = res.state.best_cost;
      res.state.best_param.map(|p| (p, cost, spent))
    }
    Err(_) => None,
  }
}

/// Minimize `objective` over `initial.len()` weights subject to box bounds
/// and equality/inequality constraints.
///
/// Converges when the worst violation drops below the constraint tolerance
/// and the objective stalls between stages; returns
/// [`AllocError::ConvergenceFailure`] once the stage budget is exhausted,
/// with no partial weights.
pub fn minimize(
  objective: &dyn Objective,
  initial: &[f64],
  bounds: &[(f64, f64)],
  constraints: &[Constraint],
  config: &SolverConfig,
) -> Result<Vec<f64>, AllocError> {
  let mut current = initial.to_vec();
  let mut previous_value = objective.value(&current);
  let mut penalty = config.initial_penalty;
  let mut spent = 0_u64;

  for stage in 0..config.max_stages {
    let seed = PenalisedProblem {
      objective,
      constraints,
      bounds,
      penalty,
    };
    let mut best = (current.clone(), seed.merit(&current));

    let descent = quasi_newton_descent(
      PenalisedProblem {
        objective,
        constraints,
        bounds,
        penalty,
      },
      current.clone(),
      config.inner_iterations,
    );
    if let Some((param, cost, iters)) = descent {
      spent += iters;
      if cost.is_finite() && cost < best.1 {
        best = (param, cost);
      }
    }

    let polish = simplex_descent(
      PenalisedProblem {
        objective,
        constraints,
        bounds,
        penalty,
      },
      &best.0,
      config.inner_iterations,
    );
    if let Some((param, cost, iters)) = polish {
      spent += iters;
      if cost.is_finite() && cost < best.1 {
        best = (param, cost);
      }
    }

    current = best.0;

    let value = objective.value(&current);
    let feasibility = violation(constraints, bounds, &current);
    debug!(
      stage,
      penalty,
      value,
      violation = feasibility,
      "penalty stage complete"
    );

    if feasibility <= config.constraint_tolerance
      && (previous_value - value).abs() <= config.objective_tolerance * (1.0 + value.abs())
    {
      for (wi, &(lo, hi)) in current.iter_mut().zip(bounds.iter()) {
        *wi = wi.clamp(lo, hi);
      }
      return Ok(current);
    }

    previous_value = value;
    penalty *= config.penalty_growth;
  }

  Err(AllocError::ConvergenceFailure {
    iterations: spent,
    violation: violation(constraints, bounds, &current),
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  struct Paraboloid {
    target: Vec<f64>,
  }

  impl Objective for Paraboloid {
    fn value(&self, w: &[f64]) -> f64 {
      w.iter()
        .zip(self.target.iter())
        .map(|(wi, ti)| (wi - ti) * (wi - ti))
        .sum()
    }
  }

  struct NegativeFirst;

  impl Objective for NegativeFirst {
    fn value(&self, w: &[f64]) -> f64 {
      -w[0]
    }
  }

  fn budget() -> Constraint {
    Constraint::equality(|w: &[f64]| w.iter().sum::<f64>() - 1.0)
  }

  #[test]
  fn solves_equality_constrained_quadratic() {
    let objective = Paraboloid {
      target: vec![0.2, 0.8],
    };
    let bounds = vec![(0.0, 1.0); 2];
    let constraints = vec![budget()];

    let w = minimize(
      &objective,
      &[0.5, 0.5],
      &bounds,
      &constraints,
      &SolverConfig::default(),
    )
    .unwrap();

    assert_abs_diff_eq!(w[0], 0.2, epsilon = 1e-4);
    assert_abs_diff_eq!(w[1], 0.8, epsilon = 1e-4);
    assert_abs_diff_eq!(w[0] + w[1], 1.0, epsilon = 1e-4);
  }

  #[test]
  fn active_box_bound_is_respected() {
    let objective = NegativeFirst;
    let bounds = vec![(0.0, 0.6), (0.0, 1.0)];
    let constraints = vec![budget()];

    let w = minimize(
      &objective,
      &[0.5, 0.5],
      &bounds,
      &constraints,
      &SolverConfig::default(),
    )
    .unwrap();

    assert!(w[0] <= 0.6 + 1e-6);
    assert_abs_diff_eq!(w[0], 0.6, epsilon = 1e-3);
    assert_abs_diff_eq!(w[0] + w[1], 1.0, epsilon = 1e-4);
  }

  #[test]
  fn infeasible_inequality_fails_to_converge() {
    let objective = Paraboloid {
      target: vec![0.5, 0.5],
    };
    let bounds = vec![(0.0, 1.0); 2];
    let constraints = vec![budget(), Constraint::inequality(|_w: &[f64]| -1.0)];

    let result = minimize(
      &objective,
      &[0.5, 0.5],
      &bounds,
      &constraints,
      &SolverConfig::default(),
    );

    assert!(matches!(
      result,
      Err(AllocError::ConvergenceFailure { .. })
    ));
  }

  #[test]
  fn optimal_start_converges_immediately() {
    let objective = Paraboloid {
      target: vec![0.5, 0.5],
    };
    let bounds = vec![(0.0, 1.0); 2];
    let constraints = vec![budget()];

    let w = minimize(
      &objective,
      &[0.5, 0.5],
      &bounds,
      &constraints,
      &SolverConfig::default(),
    )
    .unwrap();

    assert_abs_diff_eq!(w[0], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(w[1], 0.5, epsilon = 1e-6);
  }
}
