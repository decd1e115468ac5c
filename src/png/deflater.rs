//! Filters and compresses one image under a single parameter set.

use super::filter::{encode_filter, FilterType};
use super::scanline::Scanlines;
use super::trial::{SizeBound, TrialParameters};
use crate::compress::DeflateStream;
use crate::error::Result;

/// How a compression pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeflateOutcome {
    /// The whole image was compressed.
    Completed {
        /// zlib stream size in bytes.
        size: u64,
        /// The stream itself, when output was retained.
        data: Option<Vec<u8>>,
    },
    /// Output exceeded the size bound and the pass stopped early.
    Aborted,
}

/// Compresses scanlines with one (level, strategy, heuristic) combination.
#[derive(Debug, Clone, Copy)]
pub struct ScanlineDeflater {
    params: TrialParameters,
}

impl ScanlineDeflater {
    /// Create a deflater for `params`.
    pub fn new(params: TrialParameters) -> Self {
        Self { params }
    }

    /// Parameters this deflater runs with.
    pub fn params(&self) -> TrialParameters {
        self.params
    }

    /// Filter and compress every row of `scanlines`.
    ///
    /// `bpp` is the filter stride in bytes. After each row, and again once
    /// the stream is finished, the running output size is checked against
    /// `bound`; exceeding it ends the pass with [`DeflateOutcome::Aborted`].
    /// The bound is only read here; publishing a finished size is left to
    /// the caller.
    pub fn compress(
        &self,
        scanlines: &Scanlines,
        bpp: usize,
        bound: &SizeBound,
        retain_output: bool,
    ) -> Result<DeflateOutcome> {
        let TrialParameters {
            level,
            strategy,
            heuristic,
        } = self.params;
        let row_len = scanlines.row_len();
        let track_filtered = heuristic.is_adaptive();

        let zeros = vec![0u8; row_len];
        let mut prev: &[u8] = &zeros;
        let mut prev_filtered = vec![0u8; row_len];
        let mut scratch = vec![0u8; row_len];
        // Filter type byte followed by the row.
        let mut row = vec![0u8; row_len + 1];
        let mut last = FilterType::None;

        let mut stream = DeflateStream::new(level, strategy, retain_output)?;

        for curr in scanlines.iter() {
            let filter = heuristic.choose_filter_type(
                last,
                curr,
                prev,
                &mut scratch,
                &prev_filtered,
                bpp,
            );

            row[0] = filter.as_byte();
            encode_filter(curr, prev, &mut row[1..], bpp, filter);
            stream.write(&row)?;

            if stream.total_out() > bound.get() {
                return Ok(DeflateOutcome::Aborted);
            }

            if track_filtered {
                prev_filtered.copy_from_slice(&row[1..]);
            }
            prev = curr;
            last = filter;
        }

        let finished = stream.finish()?;
        if finished.total_out > bound.get() {
            return Ok(DeflateOutcome::Aborted);
        }
        Ok(DeflateOutcome::Completed {
            size: finished.total_out,
            data: finished.data,
        })
    }
}
