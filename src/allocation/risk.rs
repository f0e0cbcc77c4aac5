//! # Risk Measures
//!
//! $$
//! \operatorname{mdd} = \max_{j \le i} \frac{C_j - C_i}{C_j},
//! \qquad C_t = \prod_{s \le t}(1 + r_s)
//! $$
//!
//! Covariance-based portfolio risk, drawdown on cumulative return curves, and
//! the budgets used by the target objectives.

use ndarray::Array1;
use ndarray::Array2;

use super::returns::ReturnTable;

/// Annualization factor for mean returns.
pub const RETURN_ANNUALIZATION: f64 = 252.0;

/// Annualization factor for return variances.
pub const VARIANCE_ANNUALIZATION: f64 = 250.0;

/// Fraction of the riskiest asset's annualized variance granted to the
/// target-risk objective.
pub const RISK_BUDGET_FRACTION: f64 = 0.4;

/// Fraction of the deepest per-asset drawdown granted to the target-drawdown
/// objective.
pub const DRAWDOWN_BUDGET_FRACTION: f64 = 0.3;

/// Portfolio variance `w' Sigma w`.
pub fn portfolio_variance(weights: &Array1<f64>, cov: &Array2<f64>) -> f64 {
  weights.dot(&cov.dot(weights))
}

/// Per-asset risk contributions `w_i (Sigma w)_i`.
pub fn risk_contributions(weights: &Array1<f64>, cov: &Array2<f64>) -> Array1<f64> {
  weights * &cov.dot(weights)
}

/// Annualized portfolio mean return.
pub fn annualized_return(weights: &Array1<f64>, mean_returns: &Array1<f64>) -> f64 {
  RETURN_ANNUALIZATION * weights.dot(mean_returns)
}

/// Maximum drawdown of a periodic return series: the largest peak-to-trough
/// fractional decline of the cumulative product of `1 + r`. Zero for a
/// monotonically non-decreasing curve.
pub fn max_drawdown(returns: &[f64]) -> f64 {
  if returns.is_empty() {
    return 0.0;
  }

  let mut curve = Vec::with_capacity(returns.len());
  let mut acc = 1.0;
  for &r in returns {
    acc *= 1.0 + r;
    curve.push(acc);
  }

  // Deepest point below the running peak, first occurrence on ties.
  let mut running_peak = f64::NEG_INFINITY;
  let mut max_gap = f64::NEG_INFINITY;
  let mut trough = 0;
  for (i, &v) in curve.iter().enumerate() {
    running_peak = running_peak.max(v);
    let gap = running_peak - v;
    if gap > max_gap {
      max_gap = gap;
      trough = i;
    }
  }
  if trough == 0 {
    return 0.0;
  }

  let mut peak = 0;
  for i in 1..trough {
    if curve[i] > curve[peak] {
      peak = i;
    }
  }

  (curve[peak] - curve[trough]) / curve[peak]
}

/// Annualized variance budget: a fraction of the riskiest asset's annualized
/// variance. Columns whose variance is undefined are skipped.
pub fn risk_budget(table: &ReturnTable) -> f64 {
  let max_variance = table
    .column_variances()
    .iter()
    .filter(|v| v.is_finite())
    .fold(0.0_f64, |m, &v| m.max(v));

  RISK_BUDGET_FRACTION * VARIANCE_ANNUALIZATION * max_variance
}

/// Drawdown budget: a fraction of the deepest per-asset maximum drawdown,
/// measured over the rows where every asset has an observation.
pub fn drawdown_budget(table: &ReturnTable) -> f64 {
  let complete = table.complete_rows();
  let mut deepest = 0.0_f64;
  for column in complete.columns() {
    deepest = deepest.max(max_drawdown(&column.to_vec()));
  }

  DRAWDOWN_BUDGET_FRACTION * deepest
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;
  use ndarray::array;

  use super::*;

  #[test]
  fn drawdown_of_monotone_series_is_zero() {
    assert_eq!(max_drawdown(&[0.01, 0.0, 0.02, 0.005]), 0.0);
    assert_eq!(max_drawdown(&[]), 0.0);
  }

  #[test]
  fn drawdown_matches_peak_to_trough_decline() {
    // Curve: 1.1, 0.55, 0.66 -> decline from 1.1 to 0.55 is 50%.
    assert_relative_eq!(max_drawdown(&[0.1, -0.5, 0.2]), 0.5, max_relative = 1e-12);
  }

  #[test]
  fn drawdown_uses_deepest_gap_not_first() {
    // Two dips; the second is deeper: 1.2, 1.08, 1.296, 0.7776.
    let dd = max_drawdown(&[0.2, -0.1, 0.2, -0.4]);
    assert_relative_eq!(dd, (1.296 - 0.7776) / 1.296, max_relative = 1e-10);
  }

  #[test]
  fn portfolio_variance_and_contributions_agree() {
    let cov = array![[0.04, 0.01], [0.01, 0.09]];
    let w = array![0.5, 0.5];

    let var = portfolio_variance(&w, &cov);
    let rc = risk_contributions(&w, &cov);
    assert_relative_eq!(var, 0.0375, max_relative = 1e-12);
    assert_relative_eq!(rc.sum(), var, max_relative = 1e-12);
    assert_relative_eq!(rc[0], 0.0125, max_relative = 1e-12);
    assert_relative_eq!(rc[1], 0.025, max_relative = 1e-12);
  }

  #[test]
  fn risk_budget_scales_largest_column_variance() {
    let table = ReturnTable::from_columns(vec![
      ("a".to_string(), vec![0.01, -0.01, 0.01, -0.01]),
      ("b".to_string(), vec![0.02, -0.02, 0.02, -0.02]),
    ])
    .unwrap();

    let var_b = table.column_variances()[1];
    assert_relative_eq!(
      risk_budget(&table),
      0.4 * 250.0 * var_b,
      max_relative = 1e-12
    );
  }

  #[test]
  fn drawdown_budget_uses_complete_rows_only() {
    let table = ReturnTable::from_columns(vec![
      ("a".to_string(), vec![0.1, -0.5, 0.2, f64::NAN]),
      ("b".to_string(), vec![0.01, 0.01, 0.01, 0.01]),
    ])
    .unwrap();

    // Complete rows are the first three; asset a loses 50% there.
    assert_relative_eq!(drawdown_budget(&table), 0.3 * 0.5, max_relative = 1e-12);
  }
}
