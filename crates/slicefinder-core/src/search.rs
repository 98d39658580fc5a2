//! Level-wise slice search.
//!
//! 1. Level 1: one slice per predicate, always materialized. Slices scoring
//!    above `admit_threshold` with `size >= rows / alpha` seed the register.
//! 2. Level L > 1: join the survivors of level L - 1 (see [`crate::lattice`]),
//!    bound every fresh slice from its parents, prune it when `s_upper` is
//!    below the size floor or `c_upper` is below the register floor,
//!    otherwise scan it and offer it to the register.
//! 3. Stop when a level yields no fresh slice, every attribute is used, the
//!    depth limit is hit or the cancel flag is raised.
//!
//! State is consistent at every level boundary, which is where aborts and
//! depth limits take effect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;

use crate::bounds;
use crate::config::{BoundParents, SearchConfig};
use crate::error::SearchError;
use crate::lattice::{generate_level, LevelCandidates};
use crate::materialize::materialize;
use crate::oracle::RowOracle;
use crate::predicate::{AttrKey, FeaturePredicate, PredicateCatalog};
use crate::score::Scorer;
use crate::slice::{Slice, SliceArena, SliceBounds, SliceId, SliceState, SliceStats};
use crate::top_k::{Offer, TopK};

// ============================================================================
// Inputs and outputs
// ============================================================================

/// Dataset-level facts a search is scored against.
#[derive(Debug, Clone)]
pub struct SearchContext {
    pub catalog: PredicateCatalog,
    pub total_rows: usize,
    pub baseline_error: f64,
}

impl SearchContext {
    pub fn new(
        predicates: Vec<FeaturePredicate>,
        baseline_error: f64,
        total_rows: usize,
    ) -> Result<Self, SearchError> {
        Ok(Self {
            catalog: PredicateCatalog::new(predicates)?,
            total_rows,
            baseline_error,
        })
    }

    pub fn from_oracle<O: RowOracle + ?Sized>(oracle: &O) -> Result<Self, SearchError> {
        Self::new(
            oracle.predicates()?,
            oracle.baseline_error()?,
            oracle.baseline_size()?,
        )
    }
}

/// One reported slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceReport {
    pub name: String,
    pub attributes: Vec<String>,
    pub level: usize,
    pub score: f64,
    pub size: usize,
    pub error: f64,
    pub max_error: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LevelStats {
    pub level: usize,
    pub pairs: usize,
    pub nonsense: usize,
    pub merged: usize,
    /// Slices created on this level.
    pub candidates: usize,
    pub size_pruned: usize,
    pub score_pruned: usize,
    pub materialized: usize,
    pub empty: usize,
    pub offered: usize,
    pub admitted: usize,
    /// Slices carried into the next level's joins.
    pub survivors: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchStats {
    pub total_rows: usize,
    pub baseline_error: f64,
    pub levels: Vec<LevelStats>,
    /// Register floor after every offer.
    pub floor_history: Vec<f64>,
    pub aborted: bool,
    pub depth_limited: bool,
}

impl SearchStats {
    pub fn materialized(&self) -> usize {
        self.levels.iter().map(|l| l.materialized).sum()
    }

    pub fn pruned(&self) -> usize {
        self.levels
            .iter()
            .map(|l| l.size_pruned + l.score_pruned)
            .sum()
    }
}

#[derive(Debug)]
pub struct SearchOutcome {
    /// Best first; equal scores keep admission order.
    pub slices: Vec<SliceReport>,
    pub stats: SearchStats,
    /// Every slice the search created, for auditing bounds against scores.
    pub arena: SliceArena,
}

impl SearchOutcome {
    pub fn names(&self) -> Vec<&str> {
        self.slices.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Run a search with the oracle's own predicates, baseline and row count.
pub fn search<O: RowOracle + ?Sized>(
    oracle: &O,
    config: &SearchConfig,
) -> Result<SearchOutcome, SearchError> {
    Searcher::new(oracle, config.clone()).run()
}

// ============================================================================
// Searcher
// ============================================================================

enum Verdict {
    PrunedBySize(SliceBounds),
    PrunedByScore(SliceBounds),
    Materialized {
        bounds: SliceBounds,
        stats: SliceStats,
        score: f64,
        offer: Option<Offer>,
    },
}

pub struct Searcher<'a, O: RowOracle + ?Sized> {
    oracle: &'a O,
    config: SearchConfig,
    context: Option<SearchContext>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a, O: RowOracle + ?Sized> Searcher<'a, O> {
    pub fn new(oracle: &'a O, config: SearchConfig) -> Self {
        Self {
            oracle,
            config,
            context: None,
            cancel: None,
        }
    }

    /// Score against an explicit predicate list, baseline and row count
    /// instead of asking the oracle.
    pub fn with_context(mut self, context: SearchContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Checked between levels; raising it ends the search with the results
    /// of the last completed level.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    pub fn run(mut self) -> Result<SearchOutcome, SearchError> {
        self.config.validate()?;
        let context = match self.context.take() {
            Some(context) => context,
            None => SearchContext::from_oracle(self.oracle)?,
        };
        if context.total_rows == 0 {
            return Err(SearchError::EmptyDataset);
        }
        if !context.baseline_error.is_finite() || context.baseline_error <= 0.0 {
            return Err(SearchError::DegenerateBaseline(context.baseline_error));
        }

        tracing::info!(
            rows = context.total_rows,
            predicates = context.catalog.len(),
            baseline_error = context.baseline_error,
            k = self.config.k,
            alpha = self.config.alpha,
            w = self.config.w,
            "starting slice search"
        );

        let scorer = Scorer::new(self.config.w, context.baseline_error, context.total_rows);
        let top_k = Mutex::new(TopK::new(self.config.k));
        let mut arena = SliceArena::new();
        let mut stats = SearchStats {
            total_rows: context.total_rows,
            baseline_error: context.baseline_error,
            ..SearchStats::default()
        };

        let (mut survivors, first) = self.first_level(&context, &scorer, &mut arena, &top_k)?;
        stats.levels.push(first);

        let mut level = 1;
        while level < context.catalog.len() {
            if self.config.max_level.is_some_and(|max| level >= max) {
                stats.depth_limited = true;
                break;
            }
            if self.cancelled() {
                tracing::warn!(level, "slice search aborted between levels");
                stats.aborted = true;
                break;
            }

            let candidates = generate_level(&mut arena, &context.catalog, &survivors, level + 1);
            if candidates.fresh.is_empty() {
                break;
            }
            let (next, level_stats) =
                self.next_level(&context, &scorer, &mut arena, &top_k, candidates)?;
            tracing::info!(
                level = level_stats.level,
                candidates = level_stats.candidates,
                materialized = level_stats.materialized,
                pruned = level_stats.size_pruned + level_stats.score_pruned,
                admitted = level_stats.admitted,
                floor = top_k.lock().floor(),
                "level complete"
            );
            stats.levels.push(level_stats);
            survivors = next;
            level += 1;
        }

        let top_k = top_k.into_inner();
        stats.floor_history = top_k.floor_history().to_vec();
        let slices = top_k
            .members()
            .iter()
            .filter_map(|m| report(&arena, &context.catalog, m.id))
            .collect::<Vec<_>>();

        tracing::info!(
            found = slices.len(),
            slices_created = arena.len(),
            materialized = stats.materialized(),
            pruned = stats.pruned(),
            "slice search finished"
        );

        Ok(SearchOutcome {
            slices,
            stats,
            arena,
        })
    }

    /// Map `f` over `items`, on the rayon pool when configured.
    fn map_items<T, R, F>(&self, items: &[T], f: F) -> Result<Vec<R>, SearchError>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R, SearchError> + Sync + Send,
    {
        if self.config.parallel {
            items.par_iter().map(f).collect()
        } else {
            items.iter().map(f).collect()
        }
    }

    fn first_level(
        &self,
        context: &SearchContext,
        scorer: &Scorer,
        arena: &mut SliceArena,
        top_k: &Mutex<TopK>,
    ) -> Result<(Vec<SliceId>, LevelStats), SearchError> {
        let min_size = self.config.min_size(context.total_rows);
        let predicates: Vec<&FeaturePredicate> = context.catalog.iter().collect();
        let measured = self.map_items(&predicates, |p| {
            Ok(materialize(self.oracle, &AttrKey::single(p.column))?)
        })?;

        let mut level = LevelStats {
            level: 1,
            candidates: predicates.len(),
            ..LevelStats::default()
        };
        let mut survivors = Vec::new();

        for (predicate, slice_stats) in predicates.into_iter().zip(measured) {
            let key = AttrKey::single(predicate.column);
            let (id, _) = arena.lookup_or_insert_with(&key, || {
                Slice::new(key.clone(), predicate.name.clone(), 1)
            });
            let score = scorer.score(slice_stats.error(), slice_stats.size);
            let slice = arena.get_mut(id);
            slice.bounds = Some(SliceBounds::exact(&slice_stats, score));
            slice.state = SliceState::Materialized {
                stats: slice_stats,
                score,
            };

            level.materialized += 1;
            if slice_stats.size == 0 {
                level.empty += 1;
            }
            let significant = slice_stats.size as f64 >= min_size;
            if significant {
                survivors.push(id);
            }
            if significant && score > self.config.admit_threshold {
                level.offered += 1;
                if top_k.lock().offer(id, score).admitted() {
                    level.admitted += 1;
                }
            }

            tracing::debug!(
                slice = %predicate.name,
                size = slice_stats.size,
                error = slice_stats.error(),
                score,
                "materialized level-1 slice"
            );
        }

        level.survivors = survivors.len();
        tracing::info!(
            predicates = level.candidates,
            seeded = level.admitted,
            survivors = level.survivors,
            "level 1 complete"
        );
        Ok((survivors, level))
    }

    fn next_level(
        &self,
        context: &SearchContext,
        scorer: &Scorer,
        arena: &mut SliceArena,
        top_k: &Mutex<TopK>,
        candidates: LevelCandidates,
    ) -> Result<(Vec<SliceId>, LevelStats), SearchError> {
        let min_size = self.config.min_size(context.total_rows);
        let verdicts = {
            let arena: &SliceArena = arena;
            self.map_items(&candidates.fresh, |&id| {
                self.evaluate(arena, scorer, top_k, min_size, context.total_rows, id)
            })?
        };

        let mut level = LevelStats {
            level: candidates.level,
            pairs: candidates.pairs,
            nonsense: candidates.nonsense,
            merged: candidates.merged,
            candidates: candidates.fresh.len(),
            ..LevelStats::default()
        };
        let mut survivors = Vec::new();

        for (&id, verdict) in candidates.fresh.iter().zip(verdicts) {
            let slice = arena.get_mut(id);
            match verdict {
                Verdict::PrunedBySize(bounds) => {
                    level.size_pruned += 1;
                    slice.bounds = Some(bounds);
                    slice.state = SliceState::PrunedBySize;
                }
                Verdict::PrunedByScore(bounds) => {
                    level.score_pruned += 1;
                    slice.bounds = Some(bounds);
                    slice.state = SliceState::PrunedByScore;
                    survivors.push(id);
                }
                Verdict::Materialized {
                    bounds,
                    stats,
                    score,
                    offer,
                } => {
                    level.materialized += 1;
                    if stats.size == 0 {
                        level.empty += 1;
                    }
                    if let Some(offer) = offer {
                        level.offered += 1;
                        if offer.admitted() {
                            level.admitted += 1;
                        }
                    }
                    slice.bounds = Some(bounds);
                    slice.state = SliceState::Materialized { stats, score };
                    if stats.size as f64 >= min_size {
                        survivors.push(id);
                    }
                }
            }
        }

        level.survivors = survivors.len();
        Ok((survivors, level))
    }

    fn evaluate(
        &self,
        arena: &SliceArena,
        scorer: &Scorer,
        top_k: &Mutex<TopK>,
        min_size: f64,
        total_rows: usize,
        id: SliceId,
    ) -> Result<Verdict, SearchError> {
        let slice = arena.get(id);
        let parents: Vec<SliceId> = match (self.config.bound_parents, slice.origin) {
            (BoundParents::Origin, Some((left, right))) => vec![left, right],
            _ => slice.parents.iter().copied().collect(),
        };
        let parent_bounds: Vec<SliceBounds> = parents
            .iter()
            .filter_map(|&p| arena.get(p).parent_bounds())
            .collect();
        let bounds = bounds::derive(&parent_bounds, total_rows, scorer)
            .ok_or_else(|| SearchError::UnboundedParents(slice.name.clone()))?;

        if (bounds.s_upper as f64) < min_size {
            tracing::debug!(
                slice = %slice.name,
                s_upper = bounds.s_upper,
                min_size,
                "pruned by size bound"
            );
            return Ok(Verdict::PrunedBySize(bounds));
        }

        let floor = top_k.lock().floor();
        if bounds.c_upper < floor {
            tracing::debug!(
                slice = %slice.name,
                c_upper = bounds.c_upper,
                floor,
                "pruned by score bound"
            );
            return Ok(Verdict::PrunedByScore(bounds));
        }

        let stats = materialize(self.oracle, &slice.key)?;
        let score = scorer.score(stats.error(), stats.size);
        let offer = if stats.size as f64 >= min_size {
            Some(top_k.lock().offer(id, score))
        } else {
            None
        };

        tracing::debug!(
            slice = %slice.name,
            s_upper = bounds.s_upper,
            s_lower = bounds.s_lower,
            e_upper = bounds.e_upper,
            c_upper = bounds.c_upper,
            size = stats.size,
            score,
            floor,
            "materialized slice"
        );

        Ok(Verdict::Materialized {
            bounds,
            stats,
            score,
            offer,
        })
    }
}

fn report(arena: &SliceArena, catalog: &PredicateCatalog, id: SliceId) -> Option<SliceReport> {
    let slice = arena.get(id);
    let (stats, score) = match slice.state {
        SliceState::Materialized { stats, score } => (stats, score),
        _ => return None,
    };
    Some(SliceReport {
        name: slice.name.clone(),
        attributes: catalog.attribute_names(&slice.key),
        level: slice.level,
        score,
        size: stats.size,
        error: stats.error(),
        max_error: stats.max_error,
    })
}
