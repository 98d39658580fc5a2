//! The row oracle: read-only access to encoded rows and model errors.

use crate::error::OracleError;
use crate::predicate::FeaturePredicate;

/// One row matched by a scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanRow {
    pub row: u32,
    /// Per-row model error: 0/1 misprediction or squared residual.
    pub error: f64,
}

pub type ScanIter<'a> = Box<dyn Iterator<Item = Result<ScanRow, OracleError>> + Send + 'a>;

/// Data source a search runs against. Must stay immutable for the duration
/// of a search; `Sync` so levels can be evaluated in parallel.
pub trait RowOracle: Sync {
    fn row_count(&self) -> Result<usize, OracleError>;

    /// Indicator columns available as predicates, in a stable order.
    fn predicates(&self) -> Result<Vec<FeaturePredicate>, OracleError>;

    /// Rows whose indicator columns are all set, in ascending row order.
    fn scan(&self, columns: &[u32]) -> Result<ScanIter<'_>, OracleError>;

    /// Mean per-row error over the whole dataset.
    fn baseline_error(&self) -> Result<f64, OracleError>;

    fn baseline_size(&self) -> Result<usize, OracleError> {
        self.row_count()
    }
}

impl<O: RowOracle + ?Sized> RowOracle for &O {
    fn row_count(&self) -> Result<usize, OracleError> {
        (**self).row_count()
    }

    fn predicates(&self) -> Result<Vec<FeaturePredicate>, OracleError> {
        (**self).predicates()
    }

    fn scan(&self, columns: &[u32]) -> Result<ScanIter<'_>, OracleError> {
        (**self).scan(columns)
    }

    fn baseline_error(&self) -> Result<f64, OracleError> {
        (**self).baseline_error()
    }

    fn baseline_size(&self) -> Result<usize, OracleError> {
        (**self).baseline_size()
    }
}
