//! Slicefinder: top-K slices where a trained model underperforms
//!
//! A *slice* is a conjunction of one-hot feature predicates (`sex_F && age_3`).
//! The search walks the slice lattice level by level, looking for slices that
//! are both disproportionately erroneous and large enough to matter:
//!
//! 1. **Row oracle**: read-only access to indicator columns and per-row model
//!    errors (`oracle`, with the bitmap-backed `table` implementation)
//! 2. **Bounds**: scan-free upper/lower bounds on a slice's size, error and
//!    score, derived from its parents (`bounds`)
//! 3. **Lattice**: pairwise joins of the previous level, deduplicated by
//!    attribute set (`lattice`, `slice`)
//! 4. **Top-K register**: the best slices so far; its floor drives pruning
//!    (`top_k`)
//!
//! Only slices whose score bound can still beat the register floor are
//! scanned (`materialize`).
//!
//! ## Module Organization
//!
//! - `search`: the level-wise driver and its outcome/report types
//! - `config`: search parameters (`k`, `alpha`, `w`, admit threshold)
//! - `error`: configuration, oracle and search errors

pub mod bounds;
pub mod config;
pub mod error;
pub mod lattice;
pub mod materialize;
pub mod oracle;
pub mod predicate;
pub mod score;
pub mod search;
pub mod slice;
pub mod table;
pub mod top_k;

pub use config::{BoundParents, SearchConfig};
pub use error::{ConfigError, OracleError, SearchError};
pub use oracle::{RowOracle, ScanIter, ScanRow};
pub use predicate::{AttrKey, FeaturePredicate, PredicateCatalog};
pub use score::Scorer;
pub use search::{
    search, LevelStats, SearchContext, SearchOutcome, SearchStats, Searcher, SliceReport,
};
pub use slice::{Slice, SliceArena, SliceBounds, SliceId, SliceState, SliceStats};
pub use table::{LossKind, PreparedRow, PreparedTable, TableBuilder, TableOracle};
pub use top_k::{Offer, TopK};
