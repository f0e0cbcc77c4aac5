//! # Allocation RS
//!
//! $$
//! \mathbf{w}^\* = \arg\min_{\mathbf{w}\in\Delta^{n-1}} f(\mathbf{w})
//! $$
//!
//! Risk-based portfolio weight allocation. Takes a table of historical asset
//! returns and produces long-only weights summing to one under one of several
//! classical objectives (minimum variance, risk parity, maximum
//! diversification, equal weight, mean-variance, target max-drawdown,
//! target risk).

pub mod allocation;

pub use allocation::error::AllocationError;
pub use allocation::returns::ReturnTable;
pub use allocation::solve_weights;
pub use allocation::solve_weights_with;
pub use allocation::solvers::SolverConfig;
pub use allocation::types::Allocation;
pub use allocation::types::Objective;
