//! # Allocation
//!
//! $$
//! \min_{\mathbf{w}} f(\mathbf{w}) \quad \text{s.t.} \quad \sum_i w_i = 1,\; 0 \le w_i \le 1
//! $$
//!
//! Portfolio weight allocation over a table of historical returns. The
//! covariance matrix and the risk/drawdown budgets are derived once per call;
//! `equal_weight` is closed form and never touches the solver.

pub mod error;
pub mod returns;
pub mod risk;
pub mod solvers;
pub mod types;

pub use error::AllocationError;
pub use returns::ReturnTable;
pub use risk::drawdown_budget;
pub use risk::max_drawdown;
pub use risk::risk_budget;
pub use solvers::SolverConfig;
pub use types::Allocation;
pub use types::Objective;
pub use types::DUST_THRESHOLD;

use error::Result;

/// Solve portfolio weights for `objective` with per-objective solver
/// defaults. With `trim_dust`, weights below [`DUST_THRESHOLD`] are dropped
/// and the survivors rescaled to sum to one.
pub fn solve_weights(
  returns: &ReturnTable,
  objective: Objective,
  trim_dust: bool,
) -> Result<Allocation> {
  solve_weights_with(
    returns,
    objective,
    trim_dust,
    &SolverConfig::for_objective(objective),
  )
}

/// Solve portfolio weights with an explicit solver configuration.
pub fn solve_weights_with(
  returns: &ReturnTable,
  objective: Objective,
  trim_dust: bool,
  config: &SolverConfig,
) -> Result<Allocation> {
  let n = returns.n_assets();

  let weights = match objective {
    Objective::EqualWeight => vec![1.0 / n as f64; n],
    Objective::MinVariance => {
      let cov = returns.covariance()?;
      solvers::solve_min_variance(&cov, config)
    }
    Objective::RiskParity => {
      let cov = returns.covariance()?;
      solvers::solve_risk_parity(&cov, config)
    }
    Objective::MaxDiversification => {
      let cov = returns.covariance()?;
      solvers::solve_max_diversification(&cov, config)
    }
    Objective::MeanVariance => {
      let cov = returns.covariance()?;
      solvers::solve_mean_variance(&returns.column_means(), &cov, config)
    }
    Objective::TargetMaxDrawdown => {
      let budget = drawdown_budget(returns);
      solvers::solve_target_drawdown(returns, &returns.column_means(), budget, config)
    }
    Objective::TargetRisk => {
      let cov = returns.covariance()?;
      let budget = risk_budget(returns);
      solvers::solve_target_risk(&returns.column_means(), &cov, budget, config)
    }
  };

  let allocation = Allocation::new(returns.assets().to_vec(), weights);
  if trim_dust {
    Ok(allocation.trim_dust(DUST_THRESHOLD))
  } else {
    Ok(allocation)
  }
}
