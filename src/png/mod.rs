//! PNG encoder implementation.
//!
//! Encoding runs in four steps: [`analyze`] the pixels to pick a color type
//! and bit depth, build the raw [`Scanlines`], [`trial::search`] the filter
//! and deflate parameter grid for the smallest IDAT, then frame everything
//! as PNG chunks.

pub mod analyze;
pub mod chunk;
pub mod deflater;
pub mod filter;
pub mod heuristic;
pub mod scanline;
pub mod trial;

use std::borrow::Cow;
use std::fmt;
use std::io::Write;

use tracing::info;

use crate::color::{flatten_color, ColorType};
use crate::error::{Error, Result};

pub use analyze::{analyze, ImageAnalysis, PaletteEntry};
pub use deflater::{DeflateOutcome, ScanlineDeflater};
pub use filter::FilterType;
pub use heuristic::FilterHeuristic;
pub use scanline::Scanlines;
pub use trial::{SearchOutcome, SizeBound, TrialParameters, TrialResult, TrialSet};

use chunk::ChunkWriter;

/// Maximum supported image dimension.
const MAX_DIMENSION: u32 = 1 << 24; // 16 million pixels

/// How hard the encoder searches, from 0 (one trial) to 5 (270 trials).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OptimizationLevel(u8);

impl OptimizationLevel {
    /// A single trial: deflate level 9, no filtering.
    pub const OFF: OptimizationLevel = OptimizationLevel(0);
    /// The default level (6 trials).
    pub const DEFAULT: OptimizationLevel = OptimizationLevel(2);
    /// The exhaustive level.
    pub const MAX: OptimizationLevel = OptimizationLevel(5);

    /// Validate a numeric level.
    pub fn new(level: u8) -> Result<Self> {
        if level <= Self::MAX.0 {
            Ok(Self(level))
        } else {
            Err(Error::InvalidOptimizationLevel(level))
        }
    }

    /// The numeric level.
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for OptimizationLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for OptimizationLevel {
    type Error = Error;

    fn try_from(level: u8) -> Result<Self> {
        Self::new(level)
    }
}

/// PNG encoding options.
#[derive(Debug, Clone, Default)]
pub struct PngOptions {
    /// Selects the preset trial set.
    pub optimization_level: OptimizationLevel,
    /// Premultiply and un-premultiply every pixel before encoding. Output
    /// stays straight alpha but shows what a premultiplied renderer would,
    /// and often compresses better.
    pub flatten_translucent: bool,
    /// Worker pool size; `None` uses the available hardware parallelism.
    pub threads: Option<usize>,
    /// Explicit trial set, overriding `optimization_level`.
    pub trial_set: Option<TrialSet>,
}

impl PngOptions {
    /// One trial, fastest.
    pub fn fast() -> Self {
        Self::with_level(OptimizationLevel::OFF)
    }

    /// The default search (level 2).
    pub fn balanced() -> Self {
        Self::with_level(OptimizationLevel::DEFAULT)
    }

    /// Exhaustive search (level 5); slowest.
    pub fn max_compression() -> Self {
        Self::with_level(OptimizationLevel::MAX)
    }

    /// Options for a given optimization level.
    pub fn with_level(optimization_level: OptimizationLevel) -> Self {
        Self {
            optimization_level,
            ..Self::default()
        }
    }

    /// Search `set` instead of the level preset.
    pub fn with_trial_set(mut self, set: TrialSet) -> Self {
        self.trial_set = Some(set);
        self
    }

    /// The trial set these options search.
    pub fn trials(&self) -> TrialSet {
        match &self.trial_set {
            Some(set) => set.clone(),
            None => TrialSet::for_level(self.optimization_level),
        }
    }

    fn worker_threads(&self) -> usize {
        self.threads
            .filter(|&n| n > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
    }
}

/// Everything needed to write the PNG, after the trial search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    /// Image width.
    pub width: u32,
    /// Image height.
    pub height: u32,
    /// Bits per sample.
    pub bit_depth: u8,
    /// PNG color type.
    pub color_type: ColorType,
    /// PLTE data, for palette images.
    pub palette: Option<Vec<u8>>,
    /// tRNS data, for translucent palette images.
    pub transparency: Option<Vec<u8>>,
    /// IDAT payload (a zlib stream).
    pub idat: Vec<u8>,
}

impl CompressedImage {
    /// Write signature, IHDR, PLTE, tRNS, IDAT and IEND to `writer`.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<W> {
        let mut out = ChunkWriter::new(writer);
        out.write_signature()?;
        out.write_chunk(&chunk::IHDR, &self.ihdr_data())?;
        if let Some(palette) = &self.palette {
            out.write_chunk(&chunk::PLTE, palette)?;
        }
        if let Some(alpha) = &self.transparency {
            out.write_chunk(&chunk::TRNS, alpha)?;
        }
        out.write_chunk(&chunk::IDAT, &self.idat)?;
        out.write_chunk(&chunk::IEND, &[])?;
        out.finish()
    }

    /// Size of the PNG file this image serializes to.
    pub fn encoded_len(&self) -> usize {
        let chunk = |len: usize| chunk::CHUNK_OVERHEAD + len;
        chunk::PNG_SIGNATURE.len()
            + chunk(13)
            + self.palette.as_ref().map_or(0, |p| chunk(p.len()))
            + self.transparency.as_ref().map_or(0, |t| chunk(t.len()))
            + chunk(self.idat.len())
            + chunk(0)
    }

    fn ihdr_data(&self) -> [u8; 13] {
        let mut data = [0u8; 13];
        data[0..4].copy_from_slice(&self.width.to_be_bytes());
        data[4..8].copy_from_slice(&self.height.to_be_bytes());
        data[8] = self.bit_depth;
        data[9] = self.color_type.png_color_type();
        // Compression, filter and interlace methods are all 0.
        data
    }
}

/// What the encoder decided for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Color analysis of the (possibly flattened) input.
    pub analysis: ImageAnalysis,
    /// Winning trial parameters.
    pub params: TrialParameters,
    /// IDAT payload size in bytes.
    pub idat_size: usize,
    /// Number of trials run.
    pub trials: usize,
    /// Number of trials that stopped early.
    pub aborted_trials: usize,
}

impl fmt::Display for EncodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n  Params: {}, IDAT size = {}",
            self.analysis, self.params, self.idat_size
        )
    }
}

/// Encode ARGB pixels as PNG with default options.
///
/// # Arguments
/// * `pixels` - Non-premultiplied `0xAARRGGBB` pixels, row-major
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
///
/// # Returns
/// Complete PNG file as bytes.
pub fn encode(pixels: &[u32], width: u32, height: u32) -> Result<Vec<u8>> {
    encode_with_options(pixels, width, height, &PngOptions::default())
}

/// Encode ARGB pixels as PNG with custom options.
pub fn encode_with_options(
    pixels: &[u32],
    width: u32,
    height: u32,
    options: &PngOptions,
) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    encode_into(&mut output, pixels, width, height, options)?;
    Ok(output)
}

/// Encode ARGB pixels as PNG into a caller-provided buffer.
///
/// The `output` buffer will be cleared before writing. This API allows callers
/// to reuse an allocation across multiple encodes.
pub fn encode_into(
    output: &mut Vec<u8>,
    pixels: &[u32],
    width: u32,
    height: u32,
    options: &PngOptions,
) -> Result<EncodeSummary> {
    let (image, summary) = compress(pixels, width, height, options)?;
    output.clear();
    output.reserve(image.encoded_len());
    image.write_to(&mut *output)?;
    Ok(summary)
}

/// Encode ARGB pixels as PNG and write the file to `writer`.
///
/// Nothing is written until the trial search has finished. If writing fails
/// part way the sink holds a truncated file.
pub fn encode_to_writer<W: Write>(
    writer: W,
    pixels: &[u32],
    width: u32,
    height: u32,
    options: &PngOptions,
) -> Result<EncodeSummary> {
    let (image, summary) = compress(pixels, width, height, options)?;
    image.write_to(writer)?;
    Ok(summary)
}

/// Analyze and compress an image without serializing it.
pub fn compress(
    pixels: &[u32],
    width: u32,
    height: u32,
    options: &PngOptions,
) -> Result<(CompressedImage, EncodeSummary)> {
    validate(pixels, width, height)?;

    let pixels: Cow<'_, [u32]> = if options.flatten_translucent {
        Cow::Owned(pixels.iter().map(|&p| flatten_color(p)).collect())
    } else {
        Cow::Borrowed(pixels)
    };

    let analysis = analyze(&pixels);
    let lines = scanline::build(&pixels, width, height, &analysis)?;
    drop(pixels);

    let set = options.trials();
    let outcome = trial::search(&set, &lines, analysis.filter_bpp(), options.worker_threads())?;

    let summary = EncodeSummary {
        analysis,
        params: outcome.params,
        idat_size: outcome.data.len(),
        trials: outcome.trials,
        aborted_trials: outcome.aborted,
    };
    info!(
        width,
        height,
        analysis = %summary.analysis,
        params = %summary.params,
        idat_size = summary.idat_size,
        aborted = summary.aborted_trials,
        "compressed image"
    );

    let analysis = &summary.analysis;
    let image = CompressedImage {
        width,
        height,
        bit_depth: analysis.bit_depth,
        color_type: analysis.color_type,
        palette: (analysis.color_type == ColorType::Palette).then(|| analysis.plte_data()),
        transparency: analysis.trns_data(),
        idat: outcome.data,
    };
    Ok((image, summary))
}

fn validate(pixels: &[u32], width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }

    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(Error::ImageTooLarge {
            width,
            height,
            max: MAX_DIMENSION,
        });
    }

    let expected = width as usize * height as usize;
    if pixels.len() != expected {
        return Err(Error::InvalidDataLength {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}
