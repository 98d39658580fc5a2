//! Level generation over the slice lattice.
//!
//! Level `L` slices are built by joining pairs of surviving level `L - 1`
//! slices that share exactly `L - 2` attributes, i.e. differ by one attribute
//! each. Other pairs would not produce a slice of `L` attributes and are
//! discarded without touching the data. Joins that reach an attribute set
//! already created on this level only add their parent pair to that slice.

use crate::predicate::{AttrKey, PredicateCatalog};
use crate::slice::{Slice, SliceArena, SliceId};

/// A pair of level `L - 1` slices forms a level `L` slice.
pub fn is_valid_join(a: &AttrKey, b: &AttrKey, level: usize) -> bool {
    level >= 2 && a.len() == level - 1 && b.len() == level - 1 && a.shared_with(b) == level - 2
}

/// What one level's join pass produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelCandidates {
    pub level: usize,
    /// Newly created slices, in creation order.
    pub fresh: Vec<SliceId>,
    /// Pairs considered.
    pub pairs: usize,
    /// Pairs rejected by the join validity check.
    pub nonsense: usize,
    /// Valid pairs whose attribute set already existed on this level.
    pub merged: usize,
}

/// Join every unordered pair of `survivors` (level `level - 1`) into
/// level `level` slices registered in `arena`.
pub fn generate_level(
    arena: &mut SliceArena,
    catalog: &PredicateCatalog,
    survivors: &[SliceId],
    level: usize,
) -> LevelCandidates {
    let mut out = LevelCandidates {
        level,
        ..LevelCandidates::default()
    };

    for (i, &left) in survivors.iter().enumerate() {
        for &right in &survivors[i + 1..] {
            out.pairs += 1;

            let key = {
                let (a, b) = (&arena.get(left).key, &arena.get(right).key);
                if !is_valid_join(a, b, level) {
                    out.nonsense += 1;
                    continue;
                }
                a.union(b)
            };

            let (id, inserted) = arena.lookup_or_insert_with(&key, || {
                let mut slice = Slice::new(key.clone(), catalog.slice_name(&key), level);
                slice.origin = Some((left, right));
                slice
            });

            let slice = arena.get_mut(id);
            slice.parents.insert(left);
            slice.parents.insert(right);

            if inserted {
                out.fresh.push(id);
            } else {
                out.merged += 1;
            }
        }
    }

    tracing::debug!(
        level,
        pairs = out.pairs,
        nonsense = out.nonsense,
        merged = out.merged,
        fresh = out.fresh.len(),
        "generated lattice level"
    );
    out
}
