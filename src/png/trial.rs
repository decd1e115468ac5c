//! Trial search over deflate levels, strategies and filter heuristics.
//!
//! Every combination in a [`TrialSet`] compresses the same scanlines. Trials
//! share a [`SizeBound`] holding the smallest finished size so far; a trial
//! whose output grows past it gives up early. The winner is the first
//! combination, in enumeration order, whose size equals the final bound, so
//! the result does not depend on scheduling.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use super::deflater::{DeflateOutcome, ScanlineDeflater};
use super::heuristic::FilterHeuristic;
use super::scanline::Scanlines;
use super::OptimizationLevel;
use crate::compress::DeflateStrategy;
use crate::error::{Error, Result};

/// Retained output across all trials may not exceed this many input bytes.
///
/// Sized so a 1024x1024 RGBA image keeps its output for 16 trials.
pub const RETAIN_BUDGET: u64 = 64 << 20;

const DEFLATE_LEVELS: [&[u8]; 6] = [
    &[9],
    &[9],
    &[9],
    &[9, 8],
    &[9, 8, 7, 6],
    &[9, 8, 7, 6, 5, 4, 3, 2, 1],
];

const STRATEGIES: [&[DeflateStrategy]; 6] = [
    &[DeflateStrategy::Default],
    &[DeflateStrategy::Default],
    &[DeflateStrategy::Default, DeflateStrategy::Filtered],
    &[DeflateStrategy::Default, DeflateStrategy::Filtered],
    &[DeflateStrategy::Default, DeflateStrategy::Filtered],
    &[
        DeflateStrategy::Default,
        DeflateStrategy::Filtered,
        DeflateStrategy::HuffmanOnly,
    ],
];

const HEURISTICS: [&[u8]; 6] = [
    &[0],
    &[0, 6],
    &[0, 5, 7],
    &[0, 5, 6, 7, 8],
    &[0, 1, 2, 5, 6, 7, 8],
    &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
];

/// Smallest compressed size seen so far, shared by concurrent trials.
///
/// Only ever decreases.
#[derive(Debug)]
pub struct SizeBound(AtomicU64);

impl SizeBound {
    /// A bound no trial can exceed.
    pub const fn unbounded() -> Self {
        Self(AtomicU64::new(u64::MAX))
    }

    /// A bound starting at `size`.
    pub const fn new(size: u64) -> Self {
        Self(AtomicU64::new(size))
    }

    /// Current bound.
    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Lower the bound to `size` if it is strictly smaller.
    ///
    /// Returns true if the bound changed.
    pub fn offer(&self, size: u64) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (size < current).then_some(size)
            })
            .is_ok()
    }
}

impl Default for SizeBound {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// One point in the search space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrialParameters {
    /// Deflate level, 1-9.
    pub level: u8,
    /// Deflate strategy.
    pub strategy: DeflateStrategy,
    /// Filter heuristic.
    pub heuristic: FilterHeuristic,
}

impl fmt::Display for TrialParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "zc = {} zs = {} f = {}",
            self.level,
            self.strategy.id(),
            self.heuristic
        )
    }
}

/// Outcome of one trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialResult {
    /// Parameters the trial ran with.
    pub params: TrialParameters,
    /// Compressed size, or `None` if the trial aborted.
    pub size: Option<u64>,
    /// Compressed bytes, if they were retained.
    pub data: Option<Vec<u8>>,
}

impl TrialResult {
    fn from_outcome(params: TrialParameters, outcome: DeflateOutcome) -> Self {
        match outcome {
            DeflateOutcome::Completed { size, data } => Self {
                params,
                size: Some(size),
                data,
            },
            DeflateOutcome::Aborted => Self {
                params,
                size: None,
                data: None,
            },
        }
    }
}

/// The parameter ranges whose cross-product is searched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialSet {
    levels: Vec<u8>,
    strategies: Vec<DeflateStrategy>,
    heuristics: Vec<FilterHeuristic>,
}

impl TrialSet {
    /// Build a set from deflate levels, strategies and heuristic ids.
    ///
    /// Values are searched in the order given.
    pub fn new(levels: &[u8], strategies: &[DeflateStrategy], heuristic_ids: &[u8]) -> Result<Self> {
        if let Some(&bad) = levels.iter().find(|l| !(1..=9).contains(*l)) {
            return Err(Error::InvalidCompressionLevel(bad));
        }
        let heuristics = heuristic_ids
            .iter()
            .map(|&id| FilterHeuristic::from_id(id))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            levels: levels.to_vec(),
            strategies: strategies.to_vec(),
            heuristics,
        })
    }

    /// The preset set for an optimization level.
    pub fn for_level(level: OptimizationLevel) -> Self {
        let i = level.get() as usize;
        Self {
            levels: DEFLATE_LEVELS[i].to_vec(),
            strategies: STRATEGIES[i].to_vec(),
            heuristics: HEURISTICS[i]
                .iter()
                .filter_map(|&id| FilterHeuristic::from_id(id).ok())
                .collect(),
        }
    }

    /// Number of trials.
    pub fn len(&self) -> usize {
        self.levels.len() * self.strategies.len() * self.heuristics.len()
    }

    /// True if the cross-product is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every combination: levels outermost, heuristics innermost.
    pub fn parameters(&self) -> Vec<TrialParameters> {
        let mut params = Vec::with_capacity(self.len());
        for &level in &self.levels {
            for &strategy in &self.strategies {
                for &heuristic in &self.heuristics {
                    params.push(TrialParameters {
                        level,
                        strategy,
                        heuristic,
                    });
                }
            }
        }
        params
    }
}

/// Result of a trial search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Winning parameters.
    pub params: TrialParameters,
    /// The winner's zlib stream.
    pub data: Vec<u8>,
    /// Number of trials run.
    pub trials: usize,
    /// Number of trials that stopped early.
    pub aborted: usize,
}

/// Run every trial in `set` over `scanlines` and return the smallest result.
///
/// `bpp` is the filter stride and `threads` the worker pool size. Fails with
/// [`Error::EmptyTrialSet`] if there is nothing to try.
pub fn search(set: &TrialSet, scanlines: &Scanlines, bpp: usize, threads: usize) -> Result<SearchOutcome> {
    search_with_budget(set, scanlines, bpp, threads, RETAIN_BUDGET)
}

/// [`search`] with an explicit retain budget. Over budget, trials only
/// count their output and the winner is compressed a second time.
pub(crate) fn search_with_budget(
    set: &TrialSet,
    scanlines: &Scanlines,
    bpp: usize,
    threads: usize,
    retain_budget: u64,
) -> Result<SearchOutcome> {
    let params = set.parameters();
    let trials = params.len();

    match params.as_slice() {
        [] => Err(Error::EmptyTrialSet),
        &[only] => {
            let result = run_trial(only, scanlines, bpp, &SizeBound::unbounded(), true)?;
            let data = result.data.ok_or_else(|| no_winner("single trial produced no output"))?;
            Ok(SearchOutcome {
                params: only,
                data,
                trials: 1,
                aborted: 0,
            })
        }
        _ => {
            let retain = (scanlines.total_len() as u64).saturating_mul(trials as u64) <= retain_budget;
            debug!(
                trials,
                bytes = scanlines.total_len(),
                retain,
                "starting trial search"
            );

            let bound = SizeBound::unbounded();
            let results = run_all(&params, threads, |p| run_trial(p, scanlines, bpp, &bound, retain))?;

            let best = bound.get();
            let aborted = results.iter().filter(|r| r.size.is_none()).count();
            let winner = results
                .into_iter()
                .find(|r| r.size == Some(best))
                .ok_or_else(|| no_winner("no trial completed"))?;

            let data = match winner.data {
                Some(data) => data,
                None => {
                    debug!(params = %winner.params, "recompressing winner");
                    run_trial(winner.params, scanlines, bpp, &SizeBound::unbounded(), true)?
                        .data
                        .ok_or_else(|| no_winner("winner produced no output"))?
                }
            };

            Ok(SearchOutcome {
                params: winner.params,
                data,
                trials,
                aborted,
            })
        }
    }
}

fn run_trial(
    params: TrialParameters,
    scanlines: &Scanlines,
    bpp: usize,
    bound: &SizeBound,
    retain: bool,
) -> Result<TrialResult> {
    let outcome = ScanlineDeflater::new(params).compress(scanlines, bpp, bound, retain)?;
    let result = TrialResult::from_outcome(params, outcome);
    match result.size {
        Some(size) => {
            bound.offer(size);
            debug!(%params, size, "trial finished");
        }
        None => debug!(%params, "trial aborted"),
    }
    Ok(result)
}

#[cfg(feature = "parallel")]
fn run_all<F>(params: &[TrialParameters], threads: usize, job: F) -> Result<Vec<TrialResult>>
where
    F: Fn(TrialParameters) -> Result<TrialResult> + Sync,
{
    use rayon::prelude::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .map_err(|e| Error::WorkerPool(format!("failed to create thread pool: {e}")))?;

    // Collecting keeps results in enumeration order regardless of which
    // worker finishes first.
    catch_unwind(AssertUnwindSafe(|| {
        pool.install(|| params.par_iter().map(|&p| job(p)).collect())
    }))
    .map_err(|_| Error::WorkerPool("a trial worker panicked".to_string()))?
}

#[cfg(not(feature = "parallel"))]
fn run_all<F>(params: &[TrialParameters], _threads: usize, job: F) -> Result<Vec<TrialResult>>
where
    F: Fn(TrialParameters) -> Result<TrialResult> + Sync,
{
    params.iter().map(|&p| job(p)).collect()
}

fn no_winner(msg: &str) -> Error {
    Error::CompressionError(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::png::analyze::analyze;
    use crate::png::filter::FilterType;
    use crate::png::scanline;
    use flate2::read::ZlibDecoder;
    use std::io::Read;
    use std::sync::Arc;
    use std::thread;

    fn image(width: u32, height: u32) -> (Scanlines, usize) {
        let pixels: Vec<u32> = (0..width * height)
            .map(|i| {
                let x = i % width;
                let y = i / width;
                0xFF000000 | (x * 5 & 0xFF) << 16 | (y * 9 & 0xFF) << 8 | ((x + y) * 3 & 0xFF)
            })
            .collect();
        let info = analyze(&pixels);
        (
            scanline::build(&pixels, width, height, &info).unwrap(),
            info.filter_bpp(),
        )
    }

    #[test]
    fn test_size_bound_only_decreases() {
        let bound = SizeBound::unbounded();
        assert!(bound.offer(100));
        assert!(!bound.offer(100));
        assert!(!bound.offer(150));
        assert!(bound.offer(42));
        assert_eq!(bound.get(), 42);
    }

    #[test]
    fn test_size_bound_concurrent_minimum() {
        let bound = Arc::new(SizeBound::unbounded());
        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let bound = Arc::clone(&bound);
                thread::spawn(move || {
                    for i in 0..1000u64 {
                        bound.offer(10_000 + (i * 7919 + t * 104_729) % 5000);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(bound.get(), 10_000);
    }

    #[test]
    fn test_level_presets_trial_counts() {
        let counts: Vec<usize> = (0..=5)
            .map(|l| TrialSet::for_level(OptimizationLevel::new(l).unwrap()).len())
            .collect();
        assert_eq!(counts, vec![1, 2, 6, 20, 56, 270]);
    }

    #[test]
    fn test_enumeration_order() {
        let set = TrialSet::new(&[9, 8], &[DeflateStrategy::Default, DeflateStrategy::Filtered], &[0, 5])
            .unwrap();
        let params = set.parameters();
        assert_eq!(params.len(), 8);
        assert_eq!(params[0].to_string(), "zc = 9 zs = 0 f = 0");
        assert_eq!(params[1].to_string(), "zc = 9 zs = 0 f = 5");
        assert_eq!(params[2].to_string(), "zc = 9 zs = 1 f = 0");
        assert_eq!(params[4].to_string(), "zc = 8 zs = 0 f = 0");
        assert_eq!(params[7].to_string(), "zc = 8 zs = 1 f = 5");
    }

    #[test]
    fn test_new_validates_inputs() {
        assert!(matches!(
            TrialSet::new(&[0], &[DeflateStrategy::Default], &[0]),
            Err(Error::InvalidCompressionLevel(0))
        ));
        assert!(matches!(
            TrialSet::new(&[9], &[DeflateStrategy::Default], &[12]),
            Err(Error::UnknownFilterHeuristic(12))
        ));
    }

    #[test]
    fn test_empty_set_fails() {
        let (lines, bpp) = image(8, 8);
        let set = TrialSet::new(&[9], &[], &[0, 5]).unwrap();
        assert!(set.is_empty());
        assert!(matches!(search(&set, &lines, bpp, 2), Err(Error::EmptyTrialSet)));
    }

    #[test]
    fn test_single_trial_runs_inline() {
        let (lines, bpp) = image(20, 20);
        let set = TrialSet::for_level(OptimizationLevel::OFF);
        let outcome = search(&set, &lines, bpp, 4).unwrap();
        assert_eq!(outcome.trials, 1);
        assert_eq!(outcome.aborted, 0);
        assert_eq!(outcome.params.heuristic, FilterHeuristic::NONE);
        assert_eq!(outcome.params.level, 9);
    }

    #[test]
    fn test_winner_is_global_minimum() {
        let (lines, bpp) = image(48, 40);
        let set = TrialSet::for_level(OptimizationLevel::new(3).unwrap());
        let outcome = search(&set, &lines, bpp, 4).unwrap();

        let sizes: Vec<u64> = set
            .parameters()
            .into_iter()
            .map(|p| {
                match ScanlineDeflater::new(p)
                    .compress(&lines, bpp, &SizeBound::unbounded(), false)
                    .unwrap()
                {
                    DeflateOutcome::Completed { size, .. } => size,
                    DeflateOutcome::Aborted => unreachable!(),
                }
            })
            .collect();
        let best = *sizes.iter().min().unwrap();
        let first = sizes.iter().position(|&s| s == best).unwrap();

        assert_eq!(outcome.data.len() as u64, best);
        assert_eq!(outcome.params, set.parameters()[first]);
    }

    #[test]
    fn test_thread_count_does_not_change_result() {
        let (lines, bpp) = image(64, 48);
        let set = TrialSet::for_level(OptimizationLevel::new(2).unwrap());
        let one = search(&set, &lines, bpp, 1).unwrap();
        let many = search(&set, &lines, bpp, 8).unwrap();
        assert_eq!(one.params, many.params);
        assert_eq!(one.data, many.data);
    }

    #[test]
    fn test_over_budget_recompresses_winner() {
        let (lines, bpp) = image(64, 48);
        let set = TrialSet::for_level(OptimizationLevel::new(3).unwrap());
        let budget = lines.total_len() as u64 * set.len() as u64;

        let retained = search_with_budget(&set, &lines, bpp, 4, budget).unwrap();
        for threads in [1, 4] {
            let counted = search_with_budget(&set, &lines, bpp, threads, 0).unwrap();
            assert_eq!(counted.params, retained.params, "{threads} threads");
            assert_eq!(counted.data, retained.data, "{threads} threads");
            assert_eq!(counted.trials, 20);
        }

        let mut inflated = Vec::new();
        ZlibDecoder::new(&retained.data[..])
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated.len(), lines.rows() * (lines.row_len() + 1));
    }

    #[test]
    fn test_custom_set_with_fixed_filter() {
        let (lines, bpp) = image(16, 16);
        let set = TrialSet::new(&[6], &[DeflateStrategy::Rle, DeflateStrategy::Fixed], &[4]).unwrap();
        let outcome = search(&set, &lines, bpp, 2).unwrap();
        assert_eq!(outcome.trials, 2);
        assert_eq!(
            outcome.params.heuristic,
            FilterHeuristic::Fixed(FilterType::Paeth)
        );
    }
}
