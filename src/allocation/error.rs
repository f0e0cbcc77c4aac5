//! # Allocation Errors
//!
//! $$
//! \text{input} \notin \text{domain} \implies \text{error}
//! $$
//!
//! Typed input errors for table construction and objective selection.

use thiserror::Error;

/// Result type for allocation operations.
pub type Result<T> = std::result::Result<T, AllocationError>;

/// Errors raised on invalid inputs. Numerical non-convergence is not an
/// error; the solver reports it through a diagnostic and returns the best
/// weights it reached.
#[derive(Debug, Error)]
pub enum AllocationError {
  /// Return table has no asset columns or no rows.
  #[error("return table must contain at least one asset column and one period row")]
  EmptyTable,

  /// Asset identifier appears more than once.
  #[error("duplicate asset identifier `{0}` in return table")]
  DuplicateAsset(String),

  /// Return columns have unequal lengths.
  #[error("return column `{asset}` has {actual} rows, expected {expected}")]
  RaggedColumn {
    /// Asset whose column length differs.
    asset: String,
    /// Row count of the first column.
    expected: usize,
    /// Row count of the offending column.
    actual: usize,
  },

  /// Asset identifier count does not match the value matrix shape.
  #[error("{assets} asset identifiers for a matrix with {columns} columns")]
  ShapeMismatch {
    /// Number of asset identifiers supplied.
    assets: usize,
    /// Number of columns in the value matrix.
    columns: usize,
  },

  /// Objective name is not one of the supported kinds.
  #[error(
    "unknown objective `{0}`, expected one of min_variance/risk_parity/max_diversification/equal_weight/mean_var/target_maxdown/target_risk"
  )]
  UnknownObjective(String),

  /// Covariance computation failed structurally.
  #[error("covariance computation failed: {0}")]
  Covariance(String),
}
