//! Feature predicates and canonical attribute-set keys.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::OracleError;

/// Name of the conjunction marker used in slice names.
pub const CONJUNCTION: &str = " && ";

/// One one-hot indicator column: `row[column] == 1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeaturePredicate {
    pub name: String,
    pub column: u32,
}

impl FeaturePredicate {
    pub fn new(name: impl Into<String>, column: u32) -> Self {
        Self {
            name: name.into(),
            column,
        }
    }
}

// ============================================================================
// Attribute-set keys
// ============================================================================

/// Canonical identity of a slice: the sorted, duplicate-free list of the
/// indicator columns it conjoins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrKey(Vec<u32>);

impl AttrKey {
    pub fn single(column: u32) -> Self {
        Self(vec![column])
    }

    pub fn from_columns(columns: impl IntoIterator<Item = u32>) -> Self {
        let mut columns: Vec<u32> = columns.into_iter().collect();
        columns.sort_unstable();
        columns.dedup();
        Self(columns)
    }

    pub fn columns(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of columns present in both keys.
    pub fn shared_with(&self, other: &AttrKey) -> usize {
        let (mut i, mut j, mut shared) = (0, 0, 0);
        while i < self.0.len() && j < other.0.len() {
            match self.0[i].cmp(&other.0[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    shared += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        shared
    }

    pub fn union(&self, other: &AttrKey) -> AttrKey {
        let mut out = Vec::with_capacity(self.0.len() + other.0.len());
        let (mut i, mut j) = (0, 0);
        while i < self.0.len() && j < other.0.len() {
            match self.0[i].cmp(&other.0[j]) {
                std::cmp::Ordering::Less => {
                    out.push(self.0[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    out.push(other.0[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    out.push(self.0[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        out.extend_from_slice(&self.0[i..]);
        out.extend_from_slice(&other.0[j..]);
        AttrKey(out)
    }
}

// ============================================================================
// Predicate catalog
// ============================================================================

/// The ordered predicate list of a dataset, indexed by column.
#[derive(Debug, Clone, Default)]
pub struct PredicateCatalog {
    predicates: Vec<FeaturePredicate>,
    by_column: AHashMap<u32, usize>,
}

impl PredicateCatalog {
    pub fn new(predicates: Vec<FeaturePredicate>) -> Result<Self, OracleError> {
        let mut by_column = AHashMap::with_capacity(predicates.len());
        for (pos, predicate) in predicates.iter().enumerate() {
            if by_column.insert(predicate.column, pos).is_some() {
                return Err(OracleError::DuplicateColumn(predicate.column));
            }
        }
        Ok(Self {
            predicates,
            by_column,
        })
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeaturePredicate> {
        self.predicates.iter()
    }

    pub fn get(&self, column: u32) -> Option<&FeaturePredicate> {
        self.by_column.get(&column).map(|&pos| &self.predicates[pos])
    }

    /// Names of the key's predicates in column order.
    pub fn attribute_names(&self, key: &AttrKey) -> Vec<String> {
        key.columns()
            .iter()
            .map(|&column| match self.get(column) {
                Some(p) => p.name.clone(),
                None => format!("#{column}"),
            })
            .collect()
    }

    /// Deterministic display name, e.g. `sex_F && age_3`.
    pub fn slice_name(&self, key: &AttrKey) -> String {
        self.attribute_names(key).join(CONJUNCTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_order_insensitive() {
        assert_eq!(
            AttrKey::from_columns([3, 1, 2, 1]),
            AttrKey::from_columns([1, 2, 3])
        );
    }

    #[test]
    fn shared_and_union() {
        let a = AttrKey::from_columns([1, 2, 5]);
        let b = AttrKey::from_columns([2, 5, 7]);
        assert_eq!(a.shared_with(&b), 2);
        assert_eq!(a.union(&b), AttrKey::from_columns([1, 2, 5, 7]));
        assert_eq!(a.shared_with(&AttrKey::single(9)), 0);
    }

    #[test]
    fn catalog_rejects_duplicate_columns() {
        let err = PredicateCatalog::new(vec![
            FeaturePredicate::new("a", 0),
            FeaturePredicate::new("b", 0),
        ])
        .unwrap_err();
        assert!(matches!(err, OracleError::DuplicateColumn(0)));
    }

    #[test]
    fn slice_name_follows_column_order() {
        let catalog = PredicateCatalog::new(vec![
            FeaturePredicate::new("zeta", 0),
            FeaturePredicate::new("alpha", 4),
        ])
        .unwrap();
        let key = AttrKey::from_columns([4, 0]);
        assert_eq!(catalog.slice_name(&key), "zeta && alpha");
    }
}
