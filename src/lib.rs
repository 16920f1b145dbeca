//! # portopt
//!
//! $$
//! \mathbf{w}^\* = \arg\min_{\mathbf{w} \in [0, w_{\max}]^N,\ \sum w_i = 1}
//! \operatorname{Risk}(\mathbf{w})
//! $$
//!
//! Portfolio allocation from historical asset returns under four criteria:
//! minimum variance (Markowitz), equal risk contribution (risk parity),
//! hierarchical risk parity (HRP) and empirical conditional value-at-risk
//! (Uryasev CVaR). Every entry point is a pure function from a validated
//! [`ReturnsMatrix`] and scalar parameters to a per-ticker [`Allocation`]
//! or a typed [`AllocError`].

pub mod cvar;
pub mod engine;
pub mod error;
pub mod hrp;
pub mod markowitz;
pub mod moments;
pub mod returns;
pub mod risk_parity;
pub mod solver;
pub mod types;

pub use cvar::CVAR_CONFIDENCE;
pub use cvar::TailLossObjective;
pub use cvar::cvar;
pub use engine::AllocationConfig;
pub use engine::AllocationEngine;
pub use engine::allocate_with_strategy;
pub use error::AllocError;
pub use hrp::hrp;
pub use markowitz::PortfolioVolatility;
pub use markowitz::markowitz;
pub use moments::correlation_matrix;
pub use moments::covariance_matrix;
pub use moments::distance_matrix;
pub use moments::estimate;
pub use returns::ReturnsMatrix;
pub use risk_parity::RiskContributionSpread;
pub use risk_parity::risk_parity;
pub use solver::Constraint;
pub use solver::ConstraintKind;
pub use solver::Objective;
pub use solver::SolverConfig;
pub use solver::minimize;
pub use types::Allocation;
pub use types::Strategy;
