//! Streaming zlib/DEFLATE compression with a running output count.
//!
//! The trial search feeds scanlines into a [`DeflateStream`] one row at a
//! time and polls [`DeflateStream::total_out`] between rows, so the stream
//! must expose how many compressed bytes it has emitted so far. The heavy
//! lifting is done by `miniz_oxide`, which also gives access to the zlib
//! strategies (filtered, Huffman-only, RLE, fixed) that the higher
//! optimization levels search over.

use miniz_oxide::deflate::core::{
    compress, create_comp_flags_from_zip_params, CompressionStrategy, CompressorOxide,
    TDEFLFlush, TDEFLStatus,
};

use crate::error::{Error, Result};

/// zlib window size; positive values make miniz write the zlib header and Adler-32 trailer.
const ZLIB_WINDOW_BITS: i32 = 15;

/// Size of the staging buffer compressed bytes pass through.
const OUT_BUF_SIZE: usize = 32 * 1024;

/// DEFLATE match-selection strategy, numbered as in zlib.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeflateStrategy {
    /// Normal LZ77 + Huffman (`Z_DEFAULT_STRATEGY`).
    Default,
    /// Bias against short matches, suited to filtered image data (`Z_FILTERED`).
    Filtered,
    /// Huffman coding only, no string matching (`Z_HUFFMAN_ONLY`).
    HuffmanOnly,
    /// Matches restricted to distance one (`Z_RLE`).
    Rle,
    /// Static Huffman blocks only (`Z_FIXED`).
    Fixed,
}

impl DeflateStrategy {
    /// All strategies in zlib numbering order.
    pub const ALL: [DeflateStrategy; 5] = [
        DeflateStrategy::Default,
        DeflateStrategy::Filtered,
        DeflateStrategy::HuffmanOnly,
        DeflateStrategy::Rle,
        DeflateStrategy::Fixed,
    ];

    /// zlib strategy number.
    pub const fn id(self) -> u8 {
        match self {
            DeflateStrategy::Default => 0,
            DeflateStrategy::Filtered => 1,
            DeflateStrategy::HuffmanOnly => 2,
            DeflateStrategy::Rle => 3,
            DeflateStrategy::Fixed => 4,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    fn miniz(self) -> CompressionStrategy {
        match self {
            DeflateStrategy::Default => CompressionStrategy::Default,
            DeflateStrategy::Filtered => CompressionStrategy::Filtered,
            DeflateStrategy::HuffmanOnly => CompressionStrategy::HuffmanOnly,
            DeflateStrategy::Rle => CompressionStrategy::RLE,
            DeflateStrategy::Fixed => CompressionStrategy::Fixed,
        }
    }
}

/// Result of a completed stream.
#[derive(Debug)]
pub struct FinishedStream {
    /// Total compressed size including zlib header and trailer.
    pub total_out: u64,
    /// The compressed bytes, if the stream was created with `retain_output`.
    pub data: Option<Vec<u8>>,
}

/// A zlib stream that is fed incrementally and counts what it emits.
///
/// When created without `retain_output` the compressed bytes are counted
/// and dropped, which is how size-only trials avoid holding memory.
pub struct DeflateStream {
    compressor: Box<CompressorOxide>,
    buffer: Vec<u8>,
    output: Option<Vec<u8>>,
    total_out: u64,
}

impl DeflateStream {
    /// Create a stream for deflate `level` (1-9) and `strategy`.
    pub fn new(level: u8, strategy: DeflateStrategy, retain_output: bool) -> Result<Self> {
        if !(1..=9).contains(&level) {
            return Err(Error::InvalidCompressionLevel(level));
        }
        let flags = create_comp_flags_from_zip_params(
            level as i32,
            ZLIB_WINDOW_BITS,
            strategy.miniz() as i32,
        );
        Ok(Self {
            compressor: Box::new(CompressorOxide::new(flags)),
            buffer: vec![0u8; OUT_BUF_SIZE],
            output: retain_output.then(Vec::new),
            total_out: 0,
        })
    }

    /// Compressed bytes emitted so far.
    #[inline]
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Feed `input` into the compressor.
    pub fn write(&mut self, mut input: &[u8]) -> Result<()> {
        loop {
            let (status, consumed, produced) = compress(
                &mut self.compressor,
                input,
                &mut self.buffer,
                TDEFLFlush::None,
            );
            check_status(status)?;
            self.drain(produced);
            input = &input[consumed..];

            if input.is_empty() && produced < self.buffer.len() {
                return Ok(());
            }
            if consumed == 0 && produced == 0 {
                return Err(Error::CompressionError(
                    "deflate stream made no progress".to_string(),
                ));
            }
        }
    }

    /// Flush remaining output and write the zlib trailer.
    pub fn finish(mut self) -> Result<FinishedStream> {
        loop {
            let (status, _, produced) =
                compress(&mut self.compressor, &[], &mut self.buffer, TDEFLFlush::Finish);
            check_status(status)?;
            self.drain(produced);
            if status == TDEFLStatus::Done {
                break;
            }
        }
        Ok(FinishedStream {
            total_out: self.total_out,
            data: self.output,
        })
    }

    fn drain(&mut self, produced: usize) {
        self.total_out += produced as u64;
        if let Some(out) = self.output.as_mut() {
            out.extend_from_slice(&self.buffer[..produced]);
        }
    }
}

fn check_status(status: TDEFLStatus) -> Result<()> {
    match status {
        TDEFLStatus::Okay | TDEFLStatus::Done => Ok(()),
        other => Err(Error::CompressionError(format!(
            "deflate failed with status {:?}",
            other
        ))),
    }
}
