//! Slice scoring.
//!
//! `score = w * (error / baseline_error) + (1 - w) * (size / total_rows)`
//!
//! The score is non-decreasing in both error and size, so feeding it upper
//! bounds on both yields an upper bound on the score.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scorer {
    w: f64,
    baseline_error: f64,
    total_rows: f64,
}

impl Scorer {
    /// `baseline_error` and `total_rows` must be positive; `search` checks
    /// both before building a scorer.
    pub fn new(w: f64, baseline_error: f64, total_rows: usize) -> Self {
        Self {
            w,
            baseline_error,
            total_rows: total_rows as f64,
        }
    }

    pub fn score(&self, error: f64, size: usize) -> f64 {
        self.w * (error / self.baseline_error) + (1.0 - self.w) * (size as f64 / self.total_rows)
    }

    /// Score bound `c_upper` from an error bound and a size bound.
    pub fn upper(&self, e_upper: f64, s_upper: usize) -> f64 {
        self.score(e_upper, s_upper)
    }
}
