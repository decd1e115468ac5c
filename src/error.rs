//! Error types for the pngopt library.

use std::fmt;
use std::io;

use crate::color::ColorType;

/// Result type alias for pngopt operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while optimizing and writing a PNG.
#[derive(Debug)]
pub enum Error {
    /// Invalid image dimensions (zero width or height).
    InvalidDimensions {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },
    /// Pixel data length doesn't match `width * height`.
    InvalidDataLength {
        /// Expected number of pixels.
        expected: usize,
        /// Actual number of pixels provided.
        actual: usize,
    },
    /// Image dimensions exceed maximum supported size.
    ImageTooLarge {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
        /// Maximum supported dimension.
        max: u32,
    },
    /// Invalid deflate level (must be 1-9).
    InvalidCompressionLevel(u8),
    /// Invalid optimization level (must be 0-5).
    InvalidOptimizationLevel(u8),
    /// Filter heuristic id outside 0-9.
    UnknownFilterHeuristic(u8),
    /// The bit depth cannot be used with the color type.
    UnsupportedBitDepth {
        /// Color type the scanlines were being built for.
        color_type: ColorType,
        /// Requested bit depth.
        bit_depth: u8,
    },
    /// A pixel color has no entry in the palette the analysis built.
    MissingPaletteColor(u32),
    /// The trial parameter cross-product was empty.
    EmptyTrialSet,
    /// The worker pool could not run the trial search to completion.
    WorkerPool(String),
    /// Internal compression error.
    CompressionError(String),
    /// Writing the container failed.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidDimensions { width, height } => {
                write!(f, "Invalid image dimensions: {}x{}", width, height)
            }
            Error::InvalidDataLength { expected, actual } => {
                write!(
                    f,
                    "Invalid pixel data length: expected {} pixels, got {}",
                    expected, actual
                )
            }
            Error::ImageTooLarge { width, height, max } => {
                write!(
                    f,
                    "Image {}x{} exceeds maximum dimension {}",
                    width, height, max
                )
            }
            Error::InvalidCompressionLevel(level) => {
                write!(f, "Invalid deflate level {}: must be 1-9", level)
            }
            Error::InvalidOptimizationLevel(level) => {
                write!(f, "Invalid optimization level {}: must be 0-5", level)
            }
            Error::UnknownFilterHeuristic(id) => {
                write!(f, "No such filter heuristic {}", id)
            }
            Error::UnsupportedBitDepth {
                color_type,
                bit_depth,
            } => {
                write!(
                    f,
                    "Bit depth {} not supported with color type {:?}",
                    bit_depth, color_type
                )
            }
            Error::MissingPaletteColor(color) => {
                write!(f, "Palette lookup failed: color {:#010x} not in palette", color)
            }
            Error::EmptyTrialSet => write!(f, "No compression trials to run"),
            Error::WorkerPool(msg) => write!(f, "Trial search aborted: {}", msg),
            Error::CompressionError(msg) => write!(f, "Compression error: {}", msg),
            Error::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
