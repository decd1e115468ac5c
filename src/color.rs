//! Color type definitions and ARGB pixel helpers.
//!
//! Pixels enter the encoder as packed, non-premultiplied `0xAARRGGBB`
//! values. The helpers here convert to and from byte-oriented RGBA and
//! implement the premultiply/unpremultiply flattening used by
//! [`crate::png::PngOptions::flatten_translucent`].

/// PNG color types produced by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ColorType {
    /// Grayscale, 1 sample per pixel.
    Grayscale = 0,
    /// RGB, 3 samples per pixel.
    Rgb = 2,
    /// Palette indices, 1 sample per pixel.
    Palette = 3,
    /// Grayscale with alpha, 2 samples per pixel.
    GrayscaleAlpha = 4,
    /// RGB with alpha, 4 samples per pixel.
    Rgba = 6,
}

impl ColorType {
    /// Returns the number of samples per pixel for this color type.
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            ColorType::Grayscale | ColorType::Palette => 1,
            ColorType::GrayscaleAlpha => 2,
            ColorType::Rgb => 3,
            ColorType::Rgba => 4,
        }
    }

    /// Returns the PNG IHDR color type value.
    #[inline]
    pub const fn png_color_type(self) -> u8 {
        self as u8
    }

    /// Returns true if `bit_depth` is one this encoder can write for the color type.
    ///
    /// Only palette images may use 4-bit samples; everything else is 8-bit.
    #[inline]
    pub const fn supports_bit_depth(self, bit_depth: u8) -> bool {
        match self {
            ColorType::Palette => bit_depth == 4 || bit_depth == 8,
            _ => bit_depth == 8,
        }
    }
}

/// Alpha component of an ARGB color.
#[inline]
pub const fn alpha(argb: u32) -> u8 {
    (argb >> 24) as u8
}

/// Red component of an ARGB color.
#[inline]
pub const fn red(argb: u32) -> u8 {
    (argb >> 16) as u8
}

/// Green component of an ARGB color.
#[inline]
pub const fn green(argb: u32) -> u8 {
    (argb >> 8) as u8
}

/// Blue component of an ARGB color.
#[inline]
pub const fn blue(argb: u32) -> u8 {
    argb as u8
}

/// Pack components into an ARGB color.
#[inline]
pub const fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Convert RGBA8 bytes (as produced by most decoders) into ARGB pixels.
///
/// Trailing bytes that do not form a whole pixel are ignored.
pub fn argb_from_rgba8(rgba: &[u8]) -> Vec<u32> {
    rgba.chunks_exact(4)
        .map(|p| pack_argb(p[3], p[0], p[1], p[2]))
        .collect()
}

/// Convert ARGB pixels back into RGBA8 bytes.
pub fn rgba8_from_argb(argb: &[u32]) -> Vec<u8> {
    argb.iter()
        .flat_map(|&p| [red(p), green(p), blue(p), alpha(p)])
        .collect()
}

/// Convert an ARGB color to premultiplied ARGB.
#[inline]
pub fn premultiply(argb: u32) -> u32 {
    let a = alpha(argb) as u32;
    match a {
        0 => 0,
        255 => argb,
        _ => {
            let mul = |c: u8| ((a * c as u32 + 127) / 255) as u8;
            pack_argb(a as u8, mul(red(argb)), mul(green(argb)), mul(blue(argb)))
        }
    }
}

/// Convert a premultiplied ARGB color back to straight ARGB.
#[inline]
pub fn unpremultiply(argb: u32) -> u32 {
    let a = alpha(argb) as u32;
    match a {
        0 => 0,
        255 => argb,
        _ => {
            let div = |c: u8| (255 * c as u32 / a).min(255) as u8;
            pack_argb(a as u8, div(red(argb)), div(green(argb)), div(blue(argb)))
        }
    }
}

/// Premultiply then unpremultiply a color.
///
/// The result is what a premultiplied-alpha renderer would actually
/// display, stored back in straight form. Fully transparent pixels all
/// collapse to `0x00000000`, which usually compresses better.
#[inline]
pub fn flatten_color(argb: u32) -> u32 {
    unpremultiply(premultiply(argb))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_color_type_values() {
        assert_eq!(ColorType::Grayscale.png_color_type(), 0);
        assert_eq!(ColorType::Rgb.png_color_type(), 2);
        assert_eq!(ColorType::Palette.png_color_type(), 3);
        assert_eq!(ColorType::GrayscaleAlpha.png_color_type(), 4);
        assert_eq!(ColorType::Rgba.png_color_type(), 6);
    }

    #[test]
    fn test_supported_bit_depths() {
        assert!(ColorType::Palette.supports_bit_depth(4));
        assert!(ColorType::Palette.supports_bit_depth(8));
        assert!(!ColorType::Rgb.supports_bit_depth(4));
        assert!(!ColorType::Grayscale.supports_bit_depth(16));
        assert!(ColorType::Rgba.supports_bit_depth(8));
    }

    #[test]
    fn test_rgba8_roundtrip() {
        let rgba = [1u8, 2, 3, 4, 250, 251, 252, 253];
        let argb = argb_from_rgba8(&rgba);
        assert_eq!(argb, vec![0x04010203, 0xFDFAFBFC]);
        assert_eq!(rgba8_from_argb(&argb), rgba.to_vec());
    }

    #[test]
    fn test_flatten_transparent_is_zero() {
        assert_eq!(flatten_color(0x00FF_FFFF), 0);
        assert_eq!(flatten_color(0x0012_3456), 0);
    }

    #[test]
    fn test_flatten_opaque_unchanged() {
        assert_eq!(flatten_color(0xFF12_3456), 0xFF12_3456);
    }

    #[test]
    fn test_flatten_half_alpha() {
        // a=128, r=255: premul = (128*255+127)/255 = 128, unpremul = 255*128/128 = 255
        // g=1: premul = (128+127)/255 = 1, unpremul = 255/128 = 1
        // b=3: premul = (384+127)/255 = 2, unpremul = 510/128 = 3
        assert_eq!(flatten_color(0x80FF_0103), 0x80FF_0103);
        // g=2: premul = (256+127)/255 = 1, unpremul = 1
        assert_eq!(green(flatten_color(0x8000_0200)), 1);
    }

    #[test]
    fn test_flatten_preserves_alpha() {
        for a in [1u8, 7, 64, 128, 200, 254] {
            for c in [0u8, 1, 33, 127, 128, 255] {
                let flat = flatten_color(pack_argb(a, c, c / 2, 255 - c));
                assert_eq!(alpha(flat), a, "a={a} c={c}");
            }
        }
    }

    #[test]
    fn test_flatten_merges_low_alpha_colors() {
        // At alpha 1 every channel premultiplies to 0 or 1.
        assert_eq!(flatten_color(0x0110_2030), flatten_color(0x0111_2131));
    }
}
