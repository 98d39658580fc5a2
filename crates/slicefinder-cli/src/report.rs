//! Text and JSON rendering of search outcomes.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use slicefinder_core::{SearchConfig, SearchOutcome, SearchStats, SliceReport};

#[derive(Serialize)]
struct JsonReport<'a> {
    config: &'a SearchConfig,
    slices: &'a [SliceReport],
    stats: &'a SearchStats,
}

pub fn to_json(outcome: &SearchOutcome, config: &SearchConfig) -> Result<String> {
    Ok(serde_json::to_string_pretty(&JsonReport {
        config,
        slices: &outcome.slices,
        stats: &outcome.stats,
    })?)
}

pub fn render_slices(slices: &[SliceReport]) -> String {
    let mut out = String::new();
    if slices.is_empty() {
        out.push_str(&format!(
            "  {}\n",
            "no slice met the admission criteria".yellow()
        ));
        return out;
    }

    out.push_str(&format!(
        "  {:>4}  {:>8}  {:>8}  {:>10}  {}\n",
        "rank", "score", "size", "error", "slice"
    ));
    for (rank, slice) in slices.iter().enumerate() {
        let score = format!("{:>8.4}", slice.score);
        let score = if slice.score > 1.0 {
            score.red().bold()
        } else {
            score.normal()
        };
        out.push_str(&format!(
            "  {:>4}  {}  {:>8}  {:>10.4}  {}\n",
            rank + 1,
            score,
            slice.size,
            slice.error,
            slice.name.cyan()
        ));
    }
    out
}

pub fn render_levels(stats: &SearchStats) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {:>5}  {:>10}  {:>8}  {:>8}  {:>12}  {:>8}\n",
        "level", "candidates", "nonsense", "pruned", "materialized", "admitted"
    ));
    for level in &stats.levels {
        out.push_str(&format!(
            "  {:>5}  {:>10}  {:>8}  {:>8}  {:>12}  {:>8}\n",
            level.level,
            level.candidates,
            level.nonsense,
            level.size_pruned + level.score_pruned,
            level.materialized,
            level.admitted
        ));
    }
    if stats.aborted {
        out.push_str(&format!("  {}\n", "search aborted between levels".yellow()));
    }
    if stats.depth_limited {
        out.push_str(&format!(
            "  {}\n",
            "stopped at the configured max level".yellow()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SliceReport {
        SliceReport {
            name: "sex_F && age_3".into(),
            attributes: vec!["sex_F".into(), "age_3".into()],
            level: 2,
            score: 1.75,
            size: 120,
            error: 0.4,
            max_error: 1.0,
        }
    }

    #[test]
    fn renders_one_line_per_slice() {
        colored::control::set_override(false);
        let text = render_slices(&[sample()]);
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("sex_F && age_3"));
        assert!(text.contains("1.7500"));
    }

    #[test]
    fn empty_result_is_explained() {
        colored::control::set_override(false);
        assert!(render_slices(&[]).contains("no slice"));
    }

    #[test]
    fn level_table_flags_aborts() {
        colored::control::set_override(false);
        let stats = SearchStats {
            aborted: true,
            levels: vec![slicefinder_core::LevelStats {
                level: 1,
                candidates: 4,
                materialized: 4,
                ..Default::default()
            }],
            ..Default::default()
        };
        let text = render_levels(&stats);
        assert!(text.contains("aborted"));
        assert_eq!(text.lines().count(), 3);
    }
}
