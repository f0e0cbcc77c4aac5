//! # Allocation Types
//!
//! $$
//! \sum_i w_i = 1, \qquad 0 \le w_i \le 1
//! $$
//!
//! Objective selection and the weight-vector output type.

use std::fmt::Display;
use std::str::FromStr;

use super::error::AllocationError;

/// Weights strictly below this threshold are dropped by
/// [`Allocation::trim_dust`] and the survivors rescaled to sum to one.
pub const DUST_THRESHOLD: f64 = 1e-4;

/// Supported allocation objectives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Objective {
  /// Minimize portfolio variance.
  MinVariance,
  /// Equalize per-asset risk contributions.
  RiskParity,
  /// Maximize the diversification ratio.
  MaxDiversification,
  /// Uniform weights, no optimization.
  EqualWeight,
  /// Maximize the annualized return/volatility ratio.
  MeanVariance,
  /// Maximize annualized return at a fixed drawdown budget.
  TargetMaxDrawdown,
  /// Maximize annualized return at a fixed variance budget.
  TargetRisk,
}

impl FromStr for Objective {
  type Err = AllocationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "min_variance" | "min-variance" => Ok(Self::MinVariance),
      "risk_parity" | "risk-parity" => Ok(Self::RiskParity),
      "max_diversification" | "max-diversification" => Ok(Self::MaxDiversification),
      "equal_weight" | "equal-weight" => Ok(Self::EqualWeight),
      "mean_var" | "mean-var" => Ok(Self::MeanVariance),
      "target_maxdown" | "target-maxdown" => Ok(Self::TargetMaxDrawdown),
      "target_risk" | "target-risk" => Ok(Self::TargetRisk),
      _ => Err(AllocationError::UnknownObjective(s.to_string())),
    }
  }
}

impl Display for Objective {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Objective::MinVariance => write!(f, "min_variance"),
      Objective::RiskParity => write!(f, "risk_parity"),
      Objective::MaxDiversification => write!(f, "max_diversification"),
      Objective::EqualWeight => write!(f, "equal_weight"),
      Objective::MeanVariance => write!(f, "mean_var"),
      Objective::TargetMaxDrawdown => write!(f, "target_maxdown"),
      Objective::TargetRisk => write!(f, "target_risk"),
    }
  }
}

/// Portfolio weights keyed by asset identifier, in table column order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Allocation {
  assets: Vec<String>,
  weights: Vec<f64>,
}

impl Allocation {
  pub(crate) fn new(assets: Vec<String>, weights: Vec<f64>) -> Self {
    debug_assert_eq!(assets.len(), weights.len());
    Self { assets, weights }
  }

  /// Asset identifiers in table column order.
  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  /// Weights aligned with [`Allocation::assets`].
  pub fn weights(&self) -> &[f64] {
    &self.weights
  }

  /// Weight for a single asset, `None` if absent.
  pub fn weight(&self, asset: &str) -> Option<f64> {
    self
      .assets
      .iter()
      .position(|a| a == asset)
      .map(|i| self.weights[i])
  }

  /// Sum of all weights.
  pub fn total(&self) -> f64 {
    self.weights.iter().sum()
  }

  /// Number of assets carrying a weight.
  pub fn len(&self) -> usize {
    self.assets.len()
  }

  /// True when no asset carries a weight.
  pub fn is_empty(&self) -> bool {
    self.assets.is_empty()
  }

  /// Drop weights strictly below `threshold` and rescale the survivors to
  /// sum to one. Trims to empty when no weight survives.
  pub fn trim_dust(&self, threshold: f64) -> Self {
    let kept: Vec<(String, f64)> = self
      .assets
      .iter()
      .zip(self.weights.iter())
      .filter(|(_, w)| **w >= threshold)
      .map(|(a, w)| (a.clone(), *w))
      .collect();

    let mass: f64 = kept.iter().map(|(_, w)| w).sum();
    if mass <= 0.0 {
      return Self::default();
    }

    let (assets, weights): (Vec<String>, Vec<f64>) = kept
      .into_iter()
      .map(|(a, w)| (a, w / mass))
      .unzip();
    Self { assets, weights }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn objective_parses_canonical_names() {
    assert_eq!("min_variance".parse::<Objective>().unwrap(), Objective::MinVariance);
    assert_eq!("risk_parity".parse::<Objective>().unwrap(), Objective::RiskParity);
    assert_eq!("equal_weight".parse::<Objective>().unwrap(), Objective::EqualWeight);
    assert_eq!("mean_var".parse::<Objective>().unwrap(), Objective::MeanVariance);
    assert_eq!("target_maxdown".parse::<Objective>().unwrap(), Objective::TargetMaxDrawdown);
    assert_eq!("target_risk".parse::<Objective>().unwrap(), Objective::TargetRisk);
  }

  #[test]
  fn objective_rejects_unknown_names() {
    let err = "bogus".parse::<Objective>().unwrap_err();
    assert!(matches!(err, AllocationError::UnknownObjective(name) if name == "bogus"));
  }

  #[test]
  fn objective_display_round_trips() {
    for objective in [
      Objective::MinVariance,
      Objective::RiskParity,
      Objective::MaxDiversification,
      Objective::EqualWeight,
      Objective::MeanVariance,
      Objective::TargetMaxDrawdown,
      Objective::TargetRisk,
    ] {
      assert_eq!(objective.to_string().parse::<Objective>().unwrap(), objective);
    }
  }

  #[test]
  fn trim_dust_drops_small_weights_and_rescales() {
    let allocation = Allocation::new(
      vec!["a".to_string(), "b".to_string(), "c".to_string()],
      vec![0.6, 0.39995, 0.00005],
    );

    let trimmed = allocation.trim_dust(DUST_THRESHOLD);
    assert_eq!(trimmed.assets(), ["a".to_string(), "b".to_string()]);
    assert!((trimmed.total() - 1.0).abs() < 1e-12);
    assert!(trimmed.weights().iter().all(|&w| w >= DUST_THRESHOLD));
    assert!(trimmed.weight("c").is_none());
  }

  #[test]
  fn trim_dust_with_no_survivors_is_empty() {
    let allocation = Allocation::new(
      vec!["a".to_string(), "b".to_string()],
      vec![0.00001, 0.00002],
    );

    let trimmed = allocation.trim_dust(DUST_THRESHOLD);
    assert!(trimmed.is_empty());
  }

  #[test]
  fn weight_lookup_by_asset() {
    let allocation = Allocation::new(vec!["a".to_string(), "b".to_string()], vec![0.25, 0.75]);

    assert_eq!(allocation.weight("b"), Some(0.75));
    assert_eq!(allocation.weight("z"), None);
    assert_eq!(allocation.len(), 2);
  }
}
