//! Materialization: one oracle scan turned into exact slice statistics.

use crate::error::OracleError;
use crate::oracle::RowOracle;
use crate::predicate::AttrKey;
use crate::slice::SliceStats;

pub fn materialize<O: RowOracle + ?Sized>(
    oracle: &O,
    key: &AttrKey,
) -> Result<SliceStats, OracleError> {
    let mut stats = SliceStats::default();
    for row in oracle.scan(key.columns())? {
        let row = row?;
        if !row.error.is_finite() || row.error < 0.0 {
            tracing::warn!(
                row = row.row,
                error = row.error,
                columns = ?key.columns(),
                "rejected row error while materializing slice"
            );
            return Err(OracleError::InvalidRowError {
                row: row.row,
                value: row.error,
            });
        }
        stats.size += 1;
        stats.error_sum += row.error;
        stats.max_error = stats.max_error.max(row.error);
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{ScanIter, ScanRow};
    use crate::predicate::FeaturePredicate;

    /// Two columns over four rows, errors given per row.
    struct Fixed {
        errors: Vec<f64>,
    }

    impl RowOracle for Fixed {
        fn row_count(&self) -> Result<usize, OracleError> {
            Ok(self.errors.len())
        }

        fn predicates(&self) -> Result<Vec<FeaturePredicate>, OracleError> {
            Ok(vec![FeaturePredicate::new("even", 0), FeaturePredicate::new("low", 1)])
        }

        fn scan(&self, columns: &[u32]) -> Result<ScanIter<'_>, OracleError> {
            let columns = columns.to_vec();
            Ok(Box::new(self.errors.iter().enumerate().filter_map(
                move |(row, &error)| {
                    let even = row % 2 == 0;
                    let low = row < 2;
                    let keep = columns.iter().all(|&c| if c == 0 { even } else { low });
                    keep.then_some(Ok(ScanRow {
                        row: row as u32,
                        error,
                    }))
                },
            )))
        }

        fn baseline_error(&self) -> Result<f64, OracleError> {
            Ok(self.errors.iter().sum::<f64>() / self.errors.len() as f64)
        }
    }

    #[test]
    fn folds_size_mean_and_max() {
        let oracle = Fixed {
            errors: vec![0.5, 1.0, 0.25, 0.0],
        };
        let stats = materialize(&oracle, &AttrKey::single(0)).unwrap();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.error_sum, 0.75);
        assert_eq!(stats.max_error, 0.5);
        assert_eq!(stats.error(), 0.375);

        let both = materialize(&oracle, &AttrKey::from_columns([0, 1])).unwrap();
        assert_eq!(both.size, 1);
        assert_eq!(both.error(), 0.5);
    }

    #[test]
    fn rejects_negative_row_error() {
        let oracle = Fixed {
            errors: vec![0.5, -1.0, 0.25, 0.0],
        };
        let err = materialize(&oracle, &AttrKey::single(1)).unwrap_err();
        assert!(matches!(err, OracleError::InvalidRowError { row: 1, .. }));
    }

    #[test]
    fn rejects_non_finite_row_error() {
        let oracle = Fixed {
            errors: vec![0.5, 0.0, f64::INFINITY, 0.0],
        };
        assert!(materialize(&oracle, &AttrKey::single(1)).is_ok());
        let err = materialize(&oracle, &AttrKey::single(0)).unwrap_err();
        assert!(matches!(err, OracleError::InvalidRowError { row: 2, .. }));
    }
}
