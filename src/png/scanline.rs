//! Raw scanline construction.
//!
//! Converts ARGB pixels into the unfiltered bytes of each PNG row for the
//! color type and bit depth picked by [`analyze`](super::analyze::analyze).

use std::collections::HashMap;

use super::analyze::ImageAnalysis;
use crate::color::{alpha, blue, green, red, ColorType};
use crate::error::{Error, Result};

/// Unfiltered image rows, stored contiguously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scanlines {
    data: Vec<u8>,
    row_len: usize,
    rows: usize,
}

impl Scanlines {
    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Bytes per row, excluding the filter type byte.
    #[inline]
    pub fn row_len(&self) -> usize {
        self.row_len
    }

    /// Total bytes across all rows.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.data.len()
    }

    /// Iterate over rows top to bottom.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        // Zero-width rows cannot come out of `build`, but chunks(0) panics.
        self.data.chunks(self.row_len.max(1))
    }

    /// A single row.
    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.row_len..(y + 1) * self.row_len]
    }
}

/// Build the scanlines for a `width` x `height` image.
///
/// Fails with [`Error::UnsupportedBitDepth`] if the analysis pairs a color
/// type with a bit depth this encoder cannot write.
pub fn build(pixels: &[u32], width: u32, height: u32, info: &ImageAnalysis) -> Result<Scanlines> {
    let color_type = info.color_type;
    let bit_depth = info.bit_depth;
    if !color_type.supports_bit_depth(bit_depth) {
        return Err(Error::UnsupportedBitDepth {
            color_type,
            bit_depth,
        });
    }

    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    let expected = width as usize * height as usize;
    if pixels.len() != expected {
        return Err(Error::InvalidDataLength {
            expected,
            actual: pixels.len(),
        });
    }

    let width = width as usize;
    let rows = height as usize;
    let row_len = info.scanline_len(width as u32);
    let mut data = Vec::with_capacity(row_len * rows);

    let index: HashMap<u32, u8> = info
        .palette
        .iter()
        .enumerate()
        .map(|(i, e)| (e.color, i as u8))
        .collect();
    let lookup = |pixel: u32| -> Result<u8> {
        index
            .get(&pixel)
            .copied()
            .ok_or(Error::MissingPaletteColor(pixel))
    };

    for row in pixels.chunks_exact(width) {
        match (color_type, bit_depth) {
            (ColorType::Palette, 4) => {
                for pair in row.chunks(2) {
                    let hi = lookup(pair[0])?;
                    // Odd widths leave the low nibble of the last byte zero.
                    let lo = match pair.get(1) {
                        Some(&p) => lookup(p)?,
                        None => 0,
                    };
                    data.push((hi & 0x0F) << 4 | (lo & 0x0F));
                }
            }
            (ColorType::Palette, _) => {
                for &p in row {
                    data.push(lookup(p)?);
                }
            }
            // Gray pixels have equal channels; blue stands in for all three.
            (ColorType::Grayscale, _) => data.extend(row.iter().map(|&p| blue(p))),
            (ColorType::GrayscaleAlpha, _) => {
                for &p in row {
                    data.extend_from_slice(&[blue(p), alpha(p)]);
                }
            }
            (ColorType::Rgb, _) => {
                for &p in row {
                    data.extend_from_slice(&[red(p), green(p), blue(p)]);
                }
            }
            (ColorType::Rgba, _) => {
                for &p in row {
                    data.extend_from_slice(&[red(p), green(p), blue(p), alpha(p)]);
                }
            }
        }
    }

    debug_assert_eq!(data.len(), row_len * rows);
    Ok(Scanlines {
        data,
        row_len,
        rows,
    })
}
