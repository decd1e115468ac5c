//! Per-scanline filter selection heuristics.
//!
//! A heuristic guesses which filter type will make a scanline compress
//! best. No heuristic wins on every image, which is why the trial search
//! runs several of them and keeps whichever produced the smallest stream.
//!
//! Heuristics are identified by a small integer id so trial parameters
//! stay stable and printable:
//!
//! | id | heuristic |
//! |----|-----------|
//! | 0  | always None |
//! | 1  | always Sub |
//! | 2  | always Up |
//! | 3  | always Average |
//! | 4  | always Paeth |
//! | 5  | minimum sum of absolute values (the classic libpng choice) |
//! | 6  | fewest distinct byte values |
//! | 7  | lowest Shannon entropy |
//! | 8  | fewest runs of repeated bytes |
//! | 9  | lowest mean square |

use std::fmt;

use super::filter::{encode_filter, FilterType};
use crate::error::{Error, Result};

/// A filter selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterHeuristic {
    /// Always use the same filter type (ids 0-4).
    Fixed(FilterType),
    /// Minimize the sum of filtered bytes read as signed magnitudes.
    MinSum,
    /// Minimize the number of distinct byte values across this and the previous filtered row.
    UniqueSymbols,
    /// Minimize the Shannon entropy of this and the previous filtered row.
    Entropy,
    /// Minimize the number of runs of identical bytes.
    RunCount,
    /// Minimize the mean of squared signed byte values.
    MeanSquare,
}

impl FilterHeuristic {
    /// Highest valid heuristic id.
    pub const MAX_ID: u8 = 9;

    /// Heuristic used when optimization is off.
    pub const NONE: FilterHeuristic = FilterHeuristic::Fixed(FilterType::None);

    /// Look up a heuristic by id.
    pub fn from_id(id: u8) -> Result<Self> {
        Ok(match id {
            0..=4 => FilterHeuristic::Fixed(FilterType::ALL[id as usize]),
            5 => FilterHeuristic::MinSum,
            6 => FilterHeuristic::UniqueSymbols,
            7 => FilterHeuristic::Entropy,
            8 => FilterHeuristic::RunCount,
            9 => FilterHeuristic::MeanSquare,
            _ => return Err(Error::UnknownFilterHeuristic(id)),
        })
    }

    /// Stable id of this heuristic.
    pub const fn id(self) -> u8 {
        match self {
            FilterHeuristic::Fixed(filter) => filter as u8,
            FilterHeuristic::MinSum => 5,
            FilterHeuristic::UniqueSymbols => 6,
            FilterHeuristic::Entropy => 7,
            FilterHeuristic::RunCount => 8,
            FilterHeuristic::MeanSquare => 9,
        }
    }

    /// True if the heuristic inspects scanline content.
    pub const fn is_adaptive(self) -> bool {
        !matches!(self, FilterHeuristic::Fixed(_))
    }

    /// Pick the filter type for `curr`.
    ///
    /// * `last` - filter chosen for the previous scanline (None for the first)
    /// * `prev` - previous unfiltered scanline, zeros for the first
    /// * `scratch` - buffer the size of a scanline; contents are clobbered
    /// * `prev_filtered` - bytes actually written for the previous scanline
    pub fn choose_filter_type(
        self,
        last: FilterType,
        curr: &[u8],
        prev: &[u8],
        scratch: &mut [u8],
        prev_filtered: &[u8],
        bpp: usize,
    ) -> FilterType {
        if let FilterHeuristic::Fixed(filter) = self {
            return filter;
        }

        let prev_hist = if self.uses_previous_row() {
            histogram(prev_filtered)
        } else {
            [0u32; 256]
        };

        let mut best = FilterType::None;
        let mut best_score = f64::INFINITY;
        let mut last_score = f64::INFINITY;

        for filter in FilterType::ALL {
            let candidate: &[u8] = if filter == FilterType::None {
                curr
            } else {
                encode_filter(curr, prev, scratch, bpp, filter);
                &*scratch
            };
            let score = self.score(filter.as_byte(), candidate, &prev_hist);
            if filter == last {
                last_score = score;
            }
            if score < best_score {
                best = filter;
                best_score = score;
            }
        }

        if best != last && self.prefers_last(best_score, last_score) {
            last
        } else {
            best
        }
    }

    fn uses_previous_row(self) -> bool {
        matches!(
            self,
            FilterHeuristic::UniqueSymbols | FilterHeuristic::Entropy
        )
    }

    /// Switching filters every row tends to hurt the deflate dictionary, so
    /// the symbol-statistics heuristics keep the previous filter when the
    /// winner is only marginally better.
    fn prefers_last(self, best_score: f64, last_score: f64) -> bool {
        match self {
            FilterHeuristic::UniqueSymbols => last_score - best_score < 8.0,
            FilterHeuristic::Entropy => last_score - best_score < 1.0 / 32.0,
            _ => false,
        }
    }

    /// Lower is better.
    fn score(self, filter_byte: u8, data: &[u8], prev_hist: &[u32; 256]) -> f64 {
        match self {
            FilterHeuristic::Fixed(_) => 0.0,
            FilterHeuristic::MinSum => data
                .iter()
                .map(|&b| (b as i8).unsigned_abs() as u64)
                .sum::<u64>() as f64,
            FilterHeuristic::UniqueSymbols => {
                let mut hist = histogram(data);
                hist[filter_byte as usize] += 1;
                (0..256).filter(|&i| hist[i] + prev_hist[i] > 0).count() as f64
            }
            FilterHeuristic::Entropy => {
                let mut hist = histogram(data);
                hist[filter_byte as usize] += 1;
                let total = (data.len() * 2 + 1) as f64;
                let mut entropy = 0.0;
                for (&c, &p) in hist.iter().zip(prev_hist.iter()) {
                    let n = c + p;
                    if n != 0 {
                        let prob = n as f64 / total;
                        entropy -= prob * prob.log2();
                    }
                }
                entropy
            }
            FilterHeuristic::RunCount => {
                let mut runs = 1u64;
                let mut current = filter_byte;
                for &b in data {
                    if b != current {
                        runs += 1;
                        current = b;
                    }
                }
                runs as f64
            }
            FilterHeuristic::MeanSquare => {
                if data.is_empty() {
                    return 0.0;
                }
                let sum: u64 = data
                    .iter()
                    .map(|&b| {
                        let v = (b as i8) as i64;
                        (v * v) as u64
                    })
                    .sum();
                sum as f64 / data.len() as f64
            }
        }
    }
}

impl fmt::Display for FilterHeuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

fn histogram(data: &[u8]) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &b in data {
        hist[b as usize] += 1;
    }
    hist
}
