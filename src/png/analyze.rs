//! Pixel analysis: picks the PNG color type and bit depth for an image.
//!
//! A single pass over the ARGB pixels records whether the image uses color,
//! whether it is opaque, which alpha values occur, and (up to a cap) the set
//! of distinct colors. A rough size model then decides whether a palette is
//! worth its PLTE/tRNS overhead.

use std::collections::HashMap;
use std::fmt;

use super::chunk::CHUNK_OVERHEAD;
use crate::color::{alpha, blue, green, red, ColorType};

/// Largest palette a PNG can carry.
pub const MAX_PALETTE_SIZE: usize = 256;

/// Largest palette that fits in 4-bit indices.
pub const MAX_PALETTE_SIZE_4BIT: usize = 16;

/// Assumed deflate ratio when comparing palette and direct encodings.
const COMPRESSION_ESTIMATE: f64 = 0.5;

/// A distinct color found in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    /// Non-premultiplied `0xAARRGGBB` color.
    pub color: u32,
    /// Number of pixels with this color.
    pub count: u64,
    /// Sum of the pixel indices where the color occurs.
    pub position_sum: u64,
}

/// Result of analyzing a pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAnalysis {
    /// Bits per sample: 4 or 8.
    pub bit_depth: u8,
    /// Chosen PNG color type.
    pub color_type: ColorType,
    /// True if every pixel has alpha 255.
    pub is_opaque: bool,
    /// True if any pixel has differing red, green and blue.
    pub is_color: bool,
    /// Number of distinct alpha values in the image.
    pub distinct_alphas: u16,
    /// Palette sorted by unsigned ARGB value. Empty unless the color type is
    /// [`ColorType::Palette`].
    pub palette: Vec<PaletteEntry>,
}

/// Analyze `pixels` and decide how to encode them.
pub fn analyze(pixels: &[u32]) -> ImageAnalysis {
    let mut is_color = false;
    let mut is_opaque = true;
    let mut alphas = [false; 256];
    let mut colors: HashMap<u32, PaletteEntry> = HashMap::with_capacity(MAX_PALETTE_SIZE + 1);

    for (i, &pixel) in pixels.iter().enumerate() {
        let a = alpha(pixel);
        if a != 0xFF {
            is_opaque = false;
        }
        let (r, g, b) = (red(pixel), green(pixel), blue(pixel));
        if r != g || r != b {
            is_color = true;
        }
        alphas[a as usize] = true;

        // One entry past the limit is enough to know a palette is impossible.
        if colors.len() <= MAX_PALETTE_SIZE {
            let entry = colors.entry(pixel).or_insert(PaletteEntry {
                color: pixel,
                count: 0,
                position_sum: 0,
            });
            entry.count += 1;
            entry.position_sum = entry.position_sum.saturating_add(i as u64);
        }
    }

    let distinct_alphas = alphas.iter().filter(|&&seen| seen).count() as u16;
    let palette_size = colors.len();
    let use_palette = palette_size <= MAX_PALETTE_SIZE_4BIT
        || (palette_size <= MAX_PALETTE_SIZE
            && palette_is_cheaper(pixels.len(), palette_size, is_color, is_opaque));

    let (bit_depth, color_type) = if use_palette && palette_size <= MAX_PALETTE_SIZE_4BIT {
        (4, ColorType::Palette)
    } else if !is_color && is_opaque {
        (8, ColorType::Grayscale)
    } else if use_palette {
        (8, ColorType::Palette)
    } else if !is_color {
        (8, ColorType::GrayscaleAlpha)
    } else if is_opaque {
        (8, ColorType::Rgb)
    } else {
        (8, ColorType::Rgba)
    };

    let palette = if color_type == ColorType::Palette {
        let mut entries: Vec<PaletteEntry> = colors.into_values().collect();
        entries.sort_unstable_by_key(|e| e.color);
        entries
    } else {
        Vec::new()
    };

    ImageAnalysis {
        bit_depth,
        color_type,
        is_opaque,
        is_color,
        distinct_alphas,
        palette,
    }
}

/// Compare the estimated size of an 8-bit palette image against the direct
/// encoding, charging the palette for its PLTE chunk (and a full tRNS chunk
/// when the image is translucent).
fn palette_is_cheaper(pixel_count: usize, palette_size: usize, is_color: bool, is_opaque: bool) -> bool {
    let mut palette_bytes = palette_size * 3 + CHUNK_OVERHEAD;
    if !is_opaque {
        palette_bytes += palette_size + CHUNK_OVERHEAD;
    }

    let index_bits = if palette_size <= MAX_PALETTE_SIZE_4BIT { 4 } else { 8 };
    let direct_bits = match (is_color, is_opaque) {
        (true, true) => 24,
        (true, false) => 32,
        (false, true) => 8,
        (false, false) => 16,
    };
    let length = pixel_count * index_bits / 8;
    let direct_length = pixel_count * direct_bits / 8;

    (palette_bytes as f64 + length as f64 * COMPRESSION_ESTIMATE)
        < direct_length as f64 * COMPRESSION_ESTIMATE
}

/// Alpha bytes for a tRNS chunk.
///
/// Covers the leading entries with alpha below 255. If a translucent entry
/// follows an opaque one the prefix rule cannot describe the palette, so
/// every entry's alpha is returned.
pub fn transparency_table(palette: &[u32]) -> Vec<u8> {
    let mut count = 0;
    let mut opaque_seen = false;
    for &color in palette {
        if alpha(color) < 0xFF {
            if opaque_seen {
                count = palette.len();
                break;
            }
            count += 1;
        } else {
            opaque_seen = true;
        }
    }
    palette[..count].iter().map(|&c| alpha(c)).collect()
}

impl ImageAnalysis {
    /// Bits used by one pixel in a scanline.
    #[inline]
    pub fn bits_per_pixel(&self) -> usize {
        self.bit_depth as usize * self.color_type.channels()
    }

    /// Filter stride: bytes per complete pixel, rounded up to at least one.
    #[inline]
    pub fn filter_bpp(&self) -> usize {
        self.bits_per_pixel().div_ceil(8).max(1)
    }

    /// Length in bytes of one unfiltered scanline.
    #[inline]
    pub fn scanline_len(&self, width: u32) -> usize {
        (width as usize * self.bits_per_pixel()).div_ceil(8)
    }

    /// Palette colors in index order.
    pub fn palette_colors(&self) -> Vec<u32> {
        self.palette.iter().map(|e| e.color).collect()
    }

    /// PLTE chunk data: RGB triples in palette order.
    pub fn plte_data(&self) -> Vec<u8> {
        self.palette
            .iter()
            .flat_map(|e| [red(e.color), green(e.color), blue(e.color)])
            .collect()
    }

    /// tRNS chunk data, present only for translucent palette images.
    pub fn trns_data(&self) -> Option<Vec<u8>> {
        if self.color_type == ColorType::Palette && !self.is_opaque {
            Some(transparency_table(&self.palette_colors()))
        } else {
            None
        }
    }

    fn alpha_summary(&self) -> String {
        if self.is_opaque {
            "opaque".to_string()
        } else {
            format!("{} alphas", self.distinct_alphas)
        }
    }
}

impl fmt::Display for ImageAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Color type: ")?;
        match self.color_type {
            ColorType::Palette => write!(
                f,
                "{}-bit color, {} colors, {}",
                self.bit_depth,
                self.palette.len(),
                self.alpha_summary()
            ),
            ColorType::Grayscale => write!(f, "Grayscale, opaque"),
            ColorType::GrayscaleAlpha => write!(f, "Grayscale, {}", self.alpha_summary()),
            ColorType::Rgb => write!(f, "Full color, opaque"),
            ColorType::Rgba => write!(f, "Full color, {}", self.alpha_summary()),
        }
    }
}
