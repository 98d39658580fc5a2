//! Property-based tests for slice search over randomized synthetic tables.
//!
//! 1. Pruning is sound: every scanned slice scores at most its `c_upper`
//! 2. The register floor never decreases
//! 3. Reported slices are significant and correctly scored
//! 4. Searches are deterministic

use proptest::prelude::*;
use slicefinder_core::*;

// ============================================================================
// Strategies
// ============================================================================

#[derive(Debug, Clone)]
struct Synthetic {
    predicates: usize,
    /// Per row: indicator bitmask and error.
    rows: Vec<(u8, f64)>,
}

impl Synthetic {
    fn oracle(&self) -> TableOracle {
        let names: Vec<String> = (0..self.predicates).map(|i| format!("f{i}")).collect();
        let mut builder = TableOracle::builder(names);
        for &(mask, error) in &self.rows {
            let active: Vec<u32> = (0..self.predicates as u32)
                .filter(|bit| mask & (1 << bit) != 0)
                .collect();
            builder.push_error(&active, error).unwrap();
        }
        // Guarantees a positive baseline.
        builder.push_error(&[], 1.0).unwrap();
        builder.build()
    }
}

fn synthetic() -> impl Strategy<Value = Synthetic> {
    (2usize..=6).prop_flat_map(|predicates| {
        let row = (0u8..(1 << predicates), prop_oneof![Just(0.0), 0.0f64..=1.0]);
        proptest::collection::vec(row, 10..80).prop_map(move |rows| Synthetic { predicates, rows })
    })
}

fn search_config() -> impl Strategy<Value = SearchConfig> {
    (
        1usize..=5,
        1.0f64..10.0,
        0.0f64..=1.0,
        0.0f64..2.0,
        any::<bool>(),
    )
        .prop_map(|(k, alpha, w, admit_threshold, all_parents)| SearchConfig {
            k,
            alpha,
            w,
            admit_threshold,
            bound_parents: if all_parents {
                BoundParents::All
            } else {
                BoundParents::Origin
            },
            ..SearchConfig::default()
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn score_bound_dominates_every_scanned_slice(data in synthetic(), cfg in search_config()) {
        let outcome = search(&data.oracle(), &cfg).unwrap();

        for (_, slice) in outcome.arena.iter() {
            let (Some(bounds), Some(stats), Some(score)) = (slice.bounds, slice.stats(), slice.score()) else {
                continue;
            };
            prop_assert!(bounds.c_upper + 1e-9 >= score, "{}: {} < {}", slice.name, bounds.c_upper, score);
            prop_assert!(stats.size <= bounds.s_upper);
            prop_assert!(stats.error() <= bounds.e_upper + 1e-9);
            if stats.size > 0 {
                prop_assert!(bounds.s_lower <= stats.size);
            }
        }
    }

    #[test]
    fn floor_never_decreases(data in synthetic(), cfg in search_config()) {
        let outcome = search(&data.oracle(), &cfg).unwrap();
        let history = &outcome.stats.floor_history;
        prop_assert!(history.windows(2).all(|w| w[0] <= w[1]), "{:?}", history);
    }

    #[test]
    fn reported_slices_are_significant_and_rescored(data in synthetic(), cfg in search_config()) {
        let oracle = data.oracle();
        let outcome = search(&oracle, &cfg).unwrap();
        let rows = oracle.row_count().unwrap();
        let scorer = Scorer::new(cfg.w, oracle.baseline_error().unwrap(), rows);

        prop_assert!(outcome.slices.len() <= cfg.k);
        prop_assert!(outcome.slices.windows(2).all(|w| w[0].score >= w[1].score));

        for slice in &outcome.slices {
            prop_assert!(slice.size as f64 >= rows as f64 / cfg.alpha);
            prop_assert!(slice.score.is_finite());

            let key = outcome.arena.iter()
                .find(|(_, s)| s.name == slice.name)
                .map(|(_, s)| s.key.clone())
                .unwrap();
            let stats = slicefinder_core::materialize::materialize(&oracle, &key).unwrap();
            prop_assert_eq!(stats.size, slice.size);
            prop_assert!((scorer.score(stats.error(), stats.size) - slice.score).abs() < 1e-9);
        }
    }

    #[test]
    fn search_is_deterministic(data in synthetic(), cfg in search_config()) {
        let oracle = data.oracle();
        let first = search(&oracle, &cfg).unwrap();
        let second = search(&oracle, &cfg).unwrap();
        prop_assert_eq!(first.slices, second.slices);
        prop_assert_eq!(first.stats.floor_history, second.stats.floor_history);
    }

    #[test]
    fn parallel_levels_reach_the_same_scores(data in synthetic(), cfg in search_config()) {
        let oracle = data.oracle();
        let sequential = search(&oracle, &cfg).unwrap();
        let parallel = search(&oracle, &SearchConfig { parallel: true, ..cfg }).unwrap();

        let scores = |o: &SearchOutcome| o.slices.iter().map(|s| s.score).collect::<Vec<_>>();
        prop_assert_eq!(scores(&sequential), scores(&parallel));
    }
}
