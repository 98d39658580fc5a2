//! Slice records and the per-search slice arena.
//!
//! Slices are stored by index; parent links are `SliceId`s into the same
//! arena. Parents always live on a strictly earlier level, so the links never
//! form cycles and the arena owns every record.

use std::collections::BTreeSet;

use ahash::AHashMap;

use crate::predicate::AttrKey;

/// Handle of a slice inside a `SliceArena`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SliceId(u32);

impl SliceId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Exact statistics of a materialized slice.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SliceStats {
    pub size: usize,
    pub error_sum: f64,
    pub max_error: f64,
}

impl SliceStats {
    /// Mean row error; 0 for an empty slice.
    pub fn error(&self) -> f64 {
        if self.size == 0 {
            0.0
        } else {
            // Rounding in the sum must not push the mean past the max.
            (self.error_sum / self.size as f64).min(self.max_error)
        }
    }
}

/// Scan-free bounds of a slice.
///
/// `max_upper` bounds the largest single row error and `sum_upper` the total
/// error mass; both only shrink under conjunction, which is what makes
/// `e_upper = min(max_upper, sum_upper / s_lower)` hold for every descendant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceBounds {
    pub s_upper: usize,
    pub s_lower: usize,
    pub max_upper: f64,
    pub sum_upper: f64,
    pub e_upper: f64,
    pub c_upper: f64,
}

impl SliceBounds {
    /// Bounds pinned to measured statistics. `c_upper` is the exact score.
    pub fn exact(stats: &SliceStats, score: f64) -> Self {
        Self {
            s_upper: stats.size,
            s_lower: stats.size,
            max_upper: stats.max_error,
            sum_upper: stats.error_sum,
            e_upper: stats.error(),
            c_upper: score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SliceState {
    /// Created by the lattice, not yet evaluated.
    Pending,
    /// `s_upper` below the size significance floor; never scanned.
    PrunedBySize,
    /// `c_upper` below the register floor; never scanned.
    PrunedByScore,
    Materialized { stats: SliceStats, score: f64 },
}

#[derive(Debug, Clone)]
pub struct Slice {
    pub key: AttrKey,
    pub name: String,
    pub level: usize,
    /// Lattice parents; empty for level 1 (the implicit root).
    pub parents: BTreeSet<SliceId>,
    /// The pair that first produced this attribute set.
    pub origin: Option<(SliceId, SliceId)>,
    /// Bounds computed from parents before any scan.
    pub bounds: Option<SliceBounds>,
    pub state: SliceState,
}

impl Slice {
    pub fn new(key: AttrKey, name: String, level: usize) -> Self {
        Self {
            key,
            name,
            level,
            parents: BTreeSet::new(),
            origin: None,
            bounds: None,
            state: SliceState::Pending,
        }
    }

    pub fn stats(&self) -> Option<&SliceStats> {
        match &self.state {
            SliceState::Materialized { stats, .. } => Some(stats),
            _ => None,
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self.state {
            SliceState::Materialized { score, .. } => Some(score),
            _ => None,
        }
    }

    pub fn is_materialized(&self) -> bool {
        matches!(self.state, SliceState::Materialized { .. })
    }

    /// Bounds this slice contributes when it acts as a parent: exact values
    /// once materialized, the scan-free bounds otherwise.
    pub fn parent_bounds(&self) -> Option<SliceBounds> {
        match &self.state {
            SliceState::Materialized { stats, score } => Some(SliceBounds::exact(stats, *score)),
            _ => self.bounds,
        }
    }
}

// ============================================================================
// Arena
// ============================================================================

/// All slices reached during one search, deduplicated by attribute set.
#[derive(Debug, Default)]
pub struct SliceArena {
    slices: Vec<Slice>,
    index: AHashMap<AttrKey, SliceId>,
}

impl SliceArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn get(&self, id: SliceId) -> &Slice {
        &self.slices[id.index()]
    }

    pub fn get_mut(&mut self, id: SliceId) -> &mut Slice {
        &mut self.slices[id.index()]
    }

    pub fn lookup(&self, key: &AttrKey) -> Option<SliceId> {
        self.index.get(key).copied()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Slice> {
        self.slices.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SliceId, &Slice)> {
        self.slices
            .iter()
            .enumerate()
            .map(|(i, s)| (SliceId(i as u32), s))
    }

    /// Return the slice registered for `key`, inserting `make()` when
    /// the key is new. The flag is `true` when a slice was inserted.
    pub fn lookup_or_insert_with(
        &mut self,
        key: &AttrKey,
        make: impl FnOnce() -> Slice,
    ) -> (SliceId, bool) {
        if let Some(id) = self.index.get(key) {
            return (*id, false);
        }
        let slice = make();
        debug_assert_eq!(&slice.key, key);
        let id = SliceId(self.slices.len() as u32);
        self.index.insert(key.clone(), id);
        self.slices.push(slice);
        (id, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slice_error_is_zero() {
        let stats = SliceStats {
            size: 0,
            error_sum: 0.0,
            max_error: 0.0,
        };
        assert_eq!(stats.error(), 0.0);
    }

    #[test]
    fn arena_dedups_by_key() {
        let mut arena = SliceArena::new();
        let key = AttrKey::from_columns([2, 1]);
        let (a, inserted_a) =
            arena.lookup_or_insert_with(&key, || Slice::new(key.clone(), "x".into(), 2));
        let same = AttrKey::from_columns([1, 2]);
        let (b, inserted_b) =
            arena.lookup_or_insert_with(&same, || Slice::new(same.clone(), "y".into(), 2));

        assert!(inserted_a);
        assert!(!inserted_b);
        assert_eq!(a, b);
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.get(a).name, "x");
    }

    #[test]
    fn materialized_parent_bounds_are_exact() {
        let mut slice = Slice::new(AttrKey::single(0), "a".into(), 1);
        let stats = SliceStats {
            size: 40,
            error_sum: 10.0,
            max_error: 1.0,
        };
        slice.state = SliceState::Materialized { stats, score: 1.2 };
        let bounds = slice.parent_bounds().unwrap();
        assert_eq!(bounds.s_upper, 40);
        assert_eq!(bounds.s_lower, 40);
        assert_eq!(bounds.sum_upper, 10.0);
        assert_eq!(bounds.max_upper, 1.0);
        assert_eq!(bounds.e_upper, 0.25);
    }
}
