//! # Return Table
//!
//! $$
//! \Sigma_{ij} = \operatorname{cov}(r_i, r_j)
//! $$
//!
//! Historical return input and the column statistics derived from it. Rows
//! are time periods, columns are assets; missing observations are `NAN`.
//! Covariance uses the full sample when the table is complete and falls back
//! to pairwise-complete observations when it is not.

use ndarray::Array1;
use ndarray::Array2;
use ndarray_stats::CorrelationExt;

use super::error::AllocationError;
use super::error::Result;

/// Immutable table of periodic fractional returns.
#[derive(Clone, Debug)]
pub struct ReturnTable {
  assets: Vec<String>,
  values: Array2<f64>,
}

impl ReturnTable {
  /// Build a table from an asset list and a periods-by-assets value matrix.
  pub fn new(assets: Vec<String>, values: Array2<f64>) -> Result<Self> {
    if assets.len() != values.ncols() {
      return Err(AllocationError::ShapeMismatch {
        assets: assets.len(),
        columns: values.ncols(),
      });
    }
    if assets.is_empty() || values.nrows() == 0 {
      return Err(AllocationError::EmptyTable);
    }
    for (i, asset) in assets.iter().enumerate() {
      if assets[..i].contains(asset) {
        return Err(AllocationError::DuplicateAsset(asset.clone()));
      }
    }

    Ok(Self { assets, values })
  }

  /// Build a table from per-asset return columns of equal length.
  pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
    let n_periods = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
    for (asset, column) in &columns {
      if column.len() != n_periods {
        return Err(AllocationError::RaggedColumn {
          asset: asset.clone(),
          expected: n_periods,
          actual: column.len(),
        });
      }
    }

    let n_assets = columns.len();
    let mut values = Array2::zeros((n_periods, n_assets));
    let mut assets = Vec::with_capacity(n_assets);
    for (j, (asset, column)) in columns.into_iter().enumerate() {
      for (t, r) in column.into_iter().enumerate() {
        values[[t, j]] = r;
      }
      assets.push(asset);
    }

    Self::new(assets, values)
  }

  /// Asset identifiers in column order.
  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  /// Number of asset columns.
  pub fn n_assets(&self) -> usize {
    self.values.ncols()
  }

  /// Number of period rows.
  pub fn n_periods(&self) -> usize {
    self.values.nrows()
  }

  /// Raw periods-by-assets value matrix.
  pub fn values(&self) -> &Array2<f64> {
    &self.values
  }

  /// Per-column mean over present observations.
  pub fn column_means(&self) -> Array1<f64> {
    Array1::from_iter(self.values.columns().into_iter().map(|column| {
      let mut sum = 0.0;
      let mut count = 0usize;
      for &r in column {
        if r.is_finite() {
          sum += r;
          count += 1;
        }
      }
      if count == 0 { f64::NAN } else { sum / count as f64 }
    }))
  }

  /// Per-column sample variance over present observations, `NAN` when fewer
  /// than two are present.
  pub fn column_variances(&self) -> Array1<f64> {
    Array1::from_iter(self.values.columns().into_iter().map(|column| {
      let present: Vec<f64> = column.iter().copied().filter(|r| r.is_finite()).collect();
      if present.len() < 2 {
        return f64::NAN;
      }

      let mean = present.iter().sum::<f64>() / present.len() as f64;
      let mut acc = 0.0;
      for r in &present {
        let d = r - mean;
        acc += d * d;
      }
      acc / (present.len() - 1) as f64
    }))
  }

  /// Covariance matrix of the asset columns (sample, ddof 1). Entries with
  /// fewer than two common observations are `NAN`.
  pub fn covariance(&self) -> Result<Array2<f64>> {
    if self.n_periods() >= 2 && self.values.iter().all(|r| r.is_finite()) {
      return self
        .values
        .t()
        .cov(1.0)
        .map_err(|e| AllocationError::Covariance(e.to_string()));
    }

    Ok(self.pairwise_covariance())
  }

  fn pairwise_covariance(&self) -> Array2<f64> {
    let n = self.n_assets();
    let mut cov = Array2::from_elem((n, n), f64::NAN);

    for i in 0..n {
      for j in i..n {
        let xi = self.values.column(i);
        let xj = self.values.column(j);
        let pairs: Vec<(f64, f64)> = xi
          .iter()
          .zip(xj.iter())
          .filter(|(a, b)| a.is_finite() && b.is_finite())
          .map(|(a, b)| (*a, *b))
          .collect();
        if pairs.len() < 2 {
          continue;
        }

        let mi = pairs.iter().map(|(a, _)| a).sum::<f64>() / pairs.len() as f64;
        let mj = pairs.iter().map(|(_, b)| b).sum::<f64>() / pairs.len() as f64;
        let mut acc = 0.0;
        for (a, b) in &pairs {
          acc += (a - mi) * (b - mj);
        }
        let c = acc / (pairs.len() - 1) as f64;
        cov[[i, j]] = c;
        cov[[j, i]] = c;
      }
    }

    cov
  }

  /// Weighted per-period portfolio return series. Missing observations
  /// contribute zero to their period.
  pub fn weighted_series(&self, weights: &[f64]) -> Vec<f64> {
    self
      .values
      .rows()
      .into_iter()
      .map(|row| {
        row
          .iter()
          .zip(weights.iter())
          .filter(|(r, _)| r.is_finite())
          .map(|(r, w)| r * w)
          .sum()
      })
      .collect()
  }

  /// Rows where every asset has an observation, in original order.
  pub fn complete_rows(&self) -> Array2<f64> {
    let complete: Vec<f64> = self
      .values
      .rows()
      .into_iter()
      .filter(|row| row.iter().all(|r| r.is_finite()))
      .flat_map(|row| row.to_vec())
      .collect();

    let n_rows = complete.len() / self.n_assets();
    Array2::from_shape_vec((n_rows, self.n_assets()), complete)
      .unwrap_or_else(|_| Array2::zeros((0, self.n_assets())))
  }
}
