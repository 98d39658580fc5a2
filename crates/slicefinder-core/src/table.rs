//! In-memory row oracle over one-hot indicator columns.
//!
//! Each indicator column is stored as a Roaring bitmap of the rows where it
//! is set, so a slice scan is a bitmap intersection (smallest bitmap first)
//! followed by a lookup of the per-row errors.
//!
//! `PreparedTable` is the JSON form of an already encoded dataset:
//!
//! ```json
//! {
//!   "loss": "misclassification",
//!   "predicates": ["sex_F", "sex_M", "age_3"],
//!   "rows": [
//!     { "active": [0, 2], "target": 1, "prediction": 0 },
//!     { "active": [1], "error": 0.0 }
//!   ]
//! }
//! ```

use std::path::Path;

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::oracle::{RowOracle, ScanIter, ScanRow};
use crate::predicate::FeaturePredicate;

// ============================================================================
// Loss kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    /// Regression: squared residual.
    #[default]
    Squared,
    /// Classification: 1 for a wrong label, 0 otherwise.
    Misclassification,
}

impl LossKind {
    pub fn row_error(self, target: f64, prediction: f64) -> f64 {
        match self {
            LossKind::Squared => {
                let residual = prediction - target;
                residual * residual
            }
            LossKind::Misclassification => {
                if prediction == target {
                    0.0
                } else {
                    1.0
                }
            }
        }
    }
}

// ============================================================================
// TableOracle
// ============================================================================

#[derive(Debug, Clone)]
pub struct TableOracle {
    predicates: Vec<FeaturePredicate>,
    columns: Vec<RoaringBitmap>,
    errors: Vec<f64>,
    loss: LossKind,
    baseline_error: f64,
}

impl TableOracle {
    pub fn builder<S: Into<String>>(names: impl IntoIterator<Item = S>) -> TableBuilder {
        TableBuilder::new(names)
    }

    pub fn loss(&self) -> LossKind {
        self.loss
    }

    /// Number of rows where `column` is set.
    pub fn coverage(&self, column: u32) -> Option<u64> {
        self.columns.get(column as usize).map(RoaringBitmap::len)
    }

    pub fn row_error(&self, row: u32) -> Option<f64> {
        self.errors.get(row as usize).copied()
    }

    fn bitmap(&self, column: u32) -> Result<&RoaringBitmap, OracleError> {
        self.columns
            .get(column as usize)
            .ok_or(OracleError::ColumnOutOfRange {
                column,
                columns: self.columns.len(),
            })
    }

    /// Rows where every column in `columns` is set.
    pub fn rows_matching(&self, columns: &[u32]) -> Result<RoaringBitmap, OracleError> {
        let mut bitmaps = columns
            .iter()
            .map(|&c| self.bitmap(c))
            .collect::<Result<Vec<_>, _>>()?;
        bitmaps.sort_by_key(|b| b.len());

        let Some((first, rest)) = bitmaps.split_first() else {
            let mut all = RoaringBitmap::new();
            all.insert_range(0..self.errors.len() as u32);
            return Ok(all);
        };
        let mut out = (*first).clone();
        for bitmap in rest {
            if out.is_empty() {
                break;
            }
            out &= *bitmap;
        }
        Ok(out)
    }
}

impl RowOracle for TableOracle {
    fn row_count(&self) -> Result<usize, OracleError> {
        Ok(self.errors.len())
    }

    fn predicates(&self) -> Result<Vec<FeaturePredicate>, OracleError> {
        Ok(self.predicates.clone())
    }

    fn scan(&self, columns: &[u32]) -> Result<ScanIter<'_>, OracleError> {
        let rows = self.rows_matching(columns)?;
        let errors = &self.errors;
        Ok(Box::new(rows.into_iter().map(move |row| {
            Ok(ScanRow {
                row,
                error: errors[row as usize],
            })
        })))
    }

    fn baseline_error(&self) -> Result<f64, OracleError> {
        Ok(self.baseline_error)
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug, Clone)]
pub struct TableBuilder {
    names: Vec<String>,
    columns: Vec<RoaringBitmap>,
    errors: Vec<f64>,
    loss: LossKind,
}

impl TableBuilder {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let columns = vec![RoaringBitmap::new(); names.len()];
        Self {
            names,
            columns,
            errors: Vec::new(),
            loss: LossKind::default(),
        }
    }

    pub fn loss(mut self, loss: LossKind) -> Self {
        self.loss = loss;
        self
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add a row from a ground-truth target and the model's prediction.
    pub fn push_observation(
        &mut self,
        active: &[u32],
        target: f64,
        prediction: f64,
    ) -> Result<u32, OracleError> {
        let error = self.loss.row_error(target, prediction);
        self.push_error(active, error)
    }

    /// Add a row with a precomputed error.
    pub fn push_error(&mut self, active: &[u32], error: f64) -> Result<u32, OracleError> {
        let row = u32::try_from(self.errors.len())
            .map_err(|_| OracleError::Malformed("more than u32::MAX rows".to_string()))?;
        if !error.is_finite() || error < 0.0 {
            return Err(OracleError::InvalidRowError { row, value: error });
        }
        for &column in active {
            let bitmap = self
                .columns
                .get_mut(column as usize)
                .ok_or(OracleError::ColumnOutOfRange {
                    column,
                    columns: self.names.len(),
                })?;
            bitmap.insert(row);
        }
        self.errors.push(error);
        Ok(row)
    }

    pub fn build(self) -> TableOracle {
        let baseline_error = if self.errors.is_empty() {
            0.0
        } else {
            self.errors.iter().sum::<f64>() / self.errors.len() as f64
        };
        let predicates = self
            .names
            .into_iter()
            .enumerate()
            .map(|(column, name)| FeaturePredicate::new(name, column as u32))
            .collect();

        TableOracle {
            predicates,
            columns: self.columns,
            errors: self.errors,
            loss: self.loss,
            baseline_error,
        }
    }
}

// ============================================================================
// Prepared (serialized) tables
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreparedRow {
    Observed {
        active: Vec<u32>,
        target: f64,
        prediction: f64,
    },
    Error {
        active: Vec<u32>,
        error: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedTable {
    #[serde(default)]
    pub loss: LossKind,
    pub predicates: Vec<String>,
    pub rows: Vec<PreparedRow>,
}

impl PreparedTable {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, OracleError> {
        let bytes = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, OracleError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn into_oracle(self) -> Result<TableOracle, OracleError> {
        let mut seen = std::collections::HashSet::new();
        for name in &self.predicates {
            if !seen.insert(name.as_str()) {
                return Err(OracleError::Malformed(format!(
                    "predicate name `{name}` is listed more than once"
                )));
            }
        }

        let mut builder = TableBuilder::new(self.predicates).loss(self.loss);
        for row in self.rows {
            match row {
                PreparedRow::Observed {
                    active,
                    target,
                    prediction,
                } => builder.push_observation(&active, target, prediction)?,
                PreparedRow::Error { active, error } => builder.push_error(&active, error)?,
            };
        }
        Ok(builder.build())
    }
}
