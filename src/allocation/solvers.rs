//! # Allocation Solvers
//!
//! $$
//! \min_{\mathbf{w}\in\Delta^{n-1}} f(\mathbf{w}) + \lambda (g(\mathbf{w}) - b)^2
//! $$
//!
//! One constrained solver per objective. The long-only simplex is enforced
//! exactly by softmax reparameterization; budget targets enter as quadratic
//! penalties. Non-convergence is reported through a diagnostic and the best
//! weights seen are still returned.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::TerminationReason;
use argmin::core::TerminationStatus;
use argmin::solver::neldermead::NelderMead;
use impl_new_derive::ImplNew;
use ndarray::Array1;
use ndarray::Array2;
use tracing::warn;

use super::returns::ReturnTable;
use super::risk::annualized_return;
use super::risk::max_drawdown;
use super::risk::portfolio_variance;
use super::risk::risk_contributions;
use super::risk::RETURN_ANNUALIZATION;
use super::risk::VARIANCE_ANNUALIZATION;
use super::types::Objective;

/// Iteration and tolerance settings for the simplex solvers.
#[derive(ImplNew, Clone, Copy, Debug)]
pub struct SolverConfig {
  /// Iteration cap for the Nelder-Mead executor.
  pub max_iters: u64,
  /// Standard-deviation tolerance across simplex vertices.
  pub sd_tolerance: f64,
  /// Weight of the quadratic penalty tying target objectives to their budget.
  pub constraint_penalty: f64,
}

impl Default for SolverConfig {
  fn default() -> Self {
    Self {
      max_iters: 1000,
      sd_tolerance: 1e-25,
      constraint_penalty: 100.0,
    }
  }
}

impl SolverConfig {
  /// Per-objective defaults. The drawdown target runs at a relaxed tolerance;
  /// everything else keeps the tight default.
  pub fn for_objective(objective: Objective) -> Self {
    match objective {
      Objective::TargetMaxDrawdown => Self {
        sd_tolerance: 1e-5,
        ..Self::default()
      },
      _ => Self::default(),
    }
  }
}

fn softmax(x: &[f64]) -> Vec<f64> {
  if x.is_empty() {
    return Vec::new();
  }

  let max_x = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<f64> = x.iter().map(|&v| (v - max_x).exp()).collect();
  let sum: f64 = exps.iter().sum();

  if sum < 1e-15 {
    vec![1.0 / x.len() as f64; x.len()]
  } else {
    exps.iter().map(|&e| e / sum).collect()
  }
}

fn minimize_on_simplex<C>(
  objective: &'static str,
  cost: C,
  n: usize,
  config: &SolverConfig,
) -> Vec<f64>
where
  C: CostFunction<Param = Vec<f64>, Output = f64>,
{
  let x0 = vec![0.0; n];
  let mut simplex = Vec::with_capacity(n + 1);
  simplex.push(x0.clone());
  for i in 0..n {
    let mut point = x0.clone();
    point[i] = 1.0;
    simplex.push(point);
  }

  match NelderMead::new(simplex).with_sd_tolerance(config.sd_tolerance) {
    Ok(solver) => {
      match Executor::new(cost, solver)
        .configure(|state| state.max_iters(config.max_iters))
        .run()
      {
        Ok(res) => {
          match &res.state.termination_status {
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
            | TerminationStatus::Terminated(TerminationReason::TargetCostReached) => {}
            status => {
              let status = format!("{status:?}");
              warn!(
                objective,
                %status,
                "solver stopped before converging; keeping best weights seen"
              );
            }
          }
          let best_x = res.state.best_param.unwrap_or(x0);
          softmax(&best_x)
        }
        Err(err) => {
          warn!(objective, error = %err, "solver failed; falling back to equal weights");
          vec![1.0 / n as f64; n]
        }
      }
    }
    Err(err) => {
      warn!(objective, error = %err, "solver failed; falling back to equal weights");
      vec![1.0 / n as f64; n]
    }
  }
}

/// Minimum-variance weights.
pub fn solve_min_variance(cov: &Array2<f64>, config: &SolverConfig) -> Vec<f64> {
  struct MinVarianceCost {
    cov: Array2<f64>,
  }

  impl CostFunction for MinVarianceCost {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
      let w = Array1::from_vec(softmax(x));
      Ok(portfolio_variance(&w, &self.cov))
    }
  }

  let cost = MinVarianceCost { cov: cov.clone() };
  minimize_on_simplex("min_variance", cost, cov.nrows(), config)
}

/// Risk-parity weights: squared deviation of each risk contribution from the
/// mean contribution.
pub fn solve_risk_parity(cov: &Array2<f64>, config: &SolverConfig) -> Vec<f64> {
  struct RiskParityCost {
    cov: Array2<f64>,
  }

  impl CostFunction for RiskParityCost {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
      let w = Array1::from_vec(softmax(x));
      let rc = risk_contributions(&w, &self.cov);
      let mean_rc = rc.mean().unwrap_or(0.0);
      Ok(rc.iter().map(|c| (c - mean_rc).powi(2)).sum())
    }
  }

  let cost = RiskParityCost { cov: cov.clone() };
  minimize_on_simplex("risk_parity", cost, cov.nrows(), config)
}

/// Maximum-diversification weights, minimizing the reciprocal ratio
/// `sqrt(w' Sigma w) / (w . diag(Sigma))`.
pub fn solve_max_diversification(cov: &Array2<f64>, config: &SolverConfig) -> Vec<f64> {
  struct MaxDiversificationCost {
    cov: Array2<f64>,
  }

  impl CostFunction for MaxDiversificationCost {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
      let w = Array1::from_vec(softmax(x));
      let den = w.dot(&self.cov.diag());
      if den.abs() < 1e-15 {
        return Ok(1e10);
      }

      Ok(portfolio_variance(&w, &self.cov).max(0.0).sqrt() / den)
    }
  }

  let cost = MaxDiversificationCost { cov: cov.clone() };
  minimize_on_simplex("max_diversification", cost, cov.nrows(), config)
}

/// Mean-variance weights, minimizing the negative annualized return over
/// annualized volatility ratio.
pub fn solve_mean_variance(
  mean_returns: &Array1<f64>,
  cov: &Array2<f64>,
  config: &SolverConfig,
) -> Vec<f64> {
  struct MeanVarianceCost {
    mean_returns: Array1<f64>,
    cov: Array2<f64>,
  }

  impl CostFunction for MeanVarianceCost {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
      let w = Array1::from_vec(softmax(x));
      let port_variance = RETURN_ANNUALIZATION * portfolio_variance(&w, &self.cov);
      if port_variance < 1e-30 {
        return Ok(1e10);
      }

      Ok(-annualized_return(&w, &self.mean_returns) / port_variance.sqrt())
    }
  }

  let cost = MeanVarianceCost {
    mean_returns: mean_returns.clone(),
    cov: cov.clone(),
  };
  minimize_on_simplex("mean_var", cost, cov.nrows(), config)
}

/// Return-maximizing weights holding annualized portfolio variance at the
/// supplied budget.
pub fn solve_target_risk(
  mean_returns: &Array1<f64>,
  cov: &Array2<f64>,
  budget: f64,
  config: &SolverConfig,
) -> Vec<f64> {
  struct TargetRiskCost {
    mean_returns: Array1<f64>,
    cov: Array2<f64>,
    budget: f64,
    penalty: f64,
  }

  impl CostFunction for TargetRiskCost {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
      let w = Array1::from_vec(softmax(x));
      let gap = VARIANCE_ANNUALIZATION * portfolio_variance(&w, &self.cov) - self.budget;
      Ok(-annualized_return(&w, &self.mean_returns) + self.penalty * gap * gap)
    }
  }

  let cost = TargetRiskCost {
    mean_returns: mean_returns.clone(),
    cov: cov.clone(),
    budget,
    penalty: config.constraint_penalty,
  };
  minimize_on_simplex("target_risk", cost, cov.nrows(), config)
}

/// Return-maximizing weights holding the portfolio maximum drawdown at the
/// supplied budget.
pub fn solve_target_drawdown(
  table: &ReturnTable,
  mean_returns: &Array1<f64>,
  budget: f64,
  config: &SolverConfig,
) -> Vec<f64> {
  struct TargetDrawdownCost {
    table: ReturnTable,
    mean_returns: Array1<f64>,
    budget: f64,
    penalty: f64,
  }

  impl CostFunction for TargetDrawdownCost {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
      let w = softmax(x);
      let gap = max_drawdown(&self.table.weighted_series(&w)) - self.budget;
      let w = Array1::from_vec(w);
      Ok(-annualized_return(&w, &self.mean_returns) + self.penalty * gap * gap)
    }
  }

  let n = table.n_assets();
  let cost = TargetDrawdownCost {
    table: table.clone(),
    mean_returns: mean_returns.clone(),
    budget,
    penalty: config.constraint_penalty,
  };
  minimize_on_simplex("target_maxdown", cost, n, config)
}

#[cfg(test)]
mod tests {
  use ndarray::array;
  use tracing_test::traced_test;

  use super::*;

  fn diagonal_cov(variances: &[f64]) -> Array2<f64> {
    let n = variances.len();
    let mut cov = Array2::zeros((n, n));
    for (i, &v) in variances.iter().enumerate() {
      cov[[i, i]] = v;
    }
    cov
  }

  #[test]
  fn min_variance_equalizes_identical_uncorrelated_assets() {
    let cov = diagonal_cov(&[0.0004, 0.0004, 0.0004]);
    let w = solve_min_variance(&cov, &SolverConfig::default());

    assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    for &wi in &w {
      assert!((wi - 1.0 / 3.0).abs() < 0.05, "weight {wi} far from 1/3");
    }
  }

  #[test]
  fn risk_parity_scales_inverse_to_volatility() {
    // sigma_b = 2 sigma_a on a diagonal covariance: w_a = 2/3, w_b = 1/3.
    let cov = diagonal_cov(&[0.0001, 0.0004]);
    let w = solve_risk_parity(&cov, &SolverConfig::default());

    assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!((w[0] - 2.0 / 3.0).abs() < 0.05, "w_a = {}", w[0]);
    assert!((w[1] - 1.0 / 3.0).abs() < 0.05, "w_b = {}", w[1]);
  }

  #[test]
  fn max_diversification_equalizes_identical_uncorrelated_assets() {
    let cov = diagonal_cov(&[0.0004, 0.0004, 0.0004]);
    let w = solve_max_diversification(&cov, &SolverConfig::default());

    for &wi in &w {
      assert!((wi - 1.0 / 3.0).abs() < 0.05, "weight {wi} far from 1/3");
    }
  }

  #[test]
  fn mean_variance_prefers_the_dominating_asset() {
    let mu = array![0.003, -0.001];
    let cov = array![[0.0001, 0.0001], [0.0001, 0.0001]];
    let w = solve_mean_variance(&mu, &cov, &SolverConfig::default());

    assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!(w[0] >= 0.5, "dominating asset got {}", w[0]);
  }

  #[test]
  fn target_risk_stays_on_the_simplex() {
    let mu = array![0.002, 0.0005];
    let cov = diagonal_cov(&[0.0004, 0.0001]);
    let budget = 0.4 * VARIANCE_ANNUALIZATION * 0.0004;
    let w = solve_target_risk(&mu, &cov, budget, &SolverConfig::default());

    assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!(w.iter().all(|&wi| (0.0..=1.0).contains(&wi)));
  }

  #[test]
  fn solvers_are_deterministic() {
    let mu = array![0.002, 0.0005, 0.001];
    let cov = diagonal_cov(&[0.0004, 0.0001, 0.0002]);

    let first = solve_mean_variance(&mu, &cov, &SolverConfig::default());
    let second = solve_mean_variance(&mu, &cov, &SolverConfig::default());
    assert_eq!(first, second);
  }

  #[traced_test]
  #[test]
  fn starved_solver_reports_and_still_returns_weights() {
    let cov = diagonal_cov(&[0.0004, 0.0001, 0.0002]);
    let config = SolverConfig::new(3, 1e-25, 100.0);
    let w = solve_min_variance(&cov, &config);

    assert_eq!(w.len(), 3);
    assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!(logs_contain("stopped before converging"));
  }
}
