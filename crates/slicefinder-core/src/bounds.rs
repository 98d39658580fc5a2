//! Scan-free bounds on a slice's size, error and score.
//!
//! A slice is the conjunction of its parents' predicates, so its rows are a
//! subset of every parent's rows:
//!
//! - `s_upper = min(parent.s_upper)`
//! - `s_lower = max(N - Σ(N - parent.s_lower), 1)`: each parent excludes at
//!   most `N - parent.s_lower` rows
//! - `max_upper = min(parent.max_upper)`, `sum_upper = min(parent.sum_upper)`
//! - `e_upper = min(max_upper, sum_upper / s_lower)`
//! - `c_upper = score(e_upper, s_upper)`
//!
//! Materialized parents contribute their exact values
//! (see [`Slice::parent_bounds`](crate::slice::Slice::parent_bounds)).
//! Parents must be bounded before any child is, so levels are processed in
//! increasing order.

use crate::score::Scorer;
use crate::slice::SliceBounds;

pub fn size_upper<'a>(parents: impl IntoIterator<Item = &'a SliceBounds>) -> Option<usize> {
    parents.into_iter().map(|p| p.s_upper).min()
}

pub fn size_lower<'a>(
    parents: impl IntoIterator<Item = &'a SliceBounds>,
    total_rows: usize,
) -> usize {
    let excluded: usize = parents
        .into_iter()
        .map(|p| total_rows.saturating_sub(p.s_lower))
        .sum();
    total_rows.saturating_sub(excluded).max(1)
}

pub fn error_upper(max_upper: f64, sum_upper: f64, s_lower: usize) -> f64 {
    max_upper.min(sum_upper / s_lower.max(1) as f64)
}

/// Bound a slice from its parents' bounds. `None` when `parents` is empty.
pub fn derive(parents: &[SliceBounds], total_rows: usize, scorer: &Scorer) -> Option<SliceBounds> {
    let s_upper = size_upper(parents)?;
    let s_lower = size_lower(parents, total_rows);
    let max_upper = parents
        .iter()
        .map(|p| p.max_upper)
        .fold(f64::INFINITY, f64::min);
    let sum_upper = parents
        .iter()
        .map(|p| p.sum_upper)
        .fold(f64::INFINITY, f64::min);
    let e_upper = error_upper(max_upper, sum_upper, s_lower);

    Some(SliceBounds {
        s_upper,
        s_lower,
        max_upper,
        sum_upper,
        e_upper,
        c_upper: scorer.upper(e_upper, s_upper),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::SliceStats;
    use approx::assert_relative_eq;

    fn exact(size: usize, error_sum: f64, max_error: f64) -> SliceBounds {
        let stats = SliceStats {
            size,
            error_sum,
            max_error,
        };
        SliceBounds::exact(&stats, 0.0)
    }

    #[test]
    fn size_bounds_from_two_parents() {
        let parents = [exact(500, 50.0, 1.0), exact(250, 200.0, 1.0)];
        assert_eq!(size_upper(&parents), Some(250));
        // 1000 - (500 + 750) < 1
        assert_eq!(size_lower(&parents, 1000), 1);

        let big = [exact(900, 0.0, 0.0), exact(800, 0.0, 0.0)];
        assert_eq!(size_lower(&big, 1000), 700);
    }

    #[test]
    fn error_bound_takes_tighter_of_max_and_mass() {
        // mass 20 over at least 100 rows: mean <= 0.2 even though max is 1
        assert_relative_eq!(error_upper(1.0, 20.0, 100), 0.2);
        assert_relative_eq!(error_upper(0.1, 20.0, 100), 0.1);
    }

    #[test]
    fn derive_combines_components() {
        let scorer = Scorer::new(0.5, 0.25, 1000);
        let parents = [exact(900, 90.0, 0.5), exact(800, 400.0, 1.0)];
        let bounds = derive(&parents, 1000, &scorer).unwrap();

        assert_eq!(bounds.s_upper, 800);
        assert_eq!(bounds.s_lower, 700);
        assert_relative_eq!(bounds.max_upper, 0.5);
        assert_relative_eq!(bounds.sum_upper, 90.0);
        assert_relative_eq!(bounds.e_upper, 90.0 / 700.0);
        assert_relative_eq!(bounds.c_upper, scorer.score(90.0 / 700.0, 800));
    }

    #[test]
    fn derive_without_parents_is_undefined() {
        let scorer = Scorer::new(0.5, 0.25, 10);
        assert!(derive(&[], 10, &scorer).is_none());
    }
}
