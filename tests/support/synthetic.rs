//! Synthetic test image generation.
//!
//! Generates deterministic ARGB (`0xAARRGGBB`) patterns for controlled
//! testing of the encoder. All functions produce reproducible output
//! suitable for regression testing.

#![allow(dead_code)]

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Pack components into an ARGB pixel.
pub fn argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Generate a solid color image.
pub fn solid(width: u32, height: u32, color: u32) -> Vec<u32> {
    vec![color; (width * height) as usize]
}

/// Generate an opaque horizontal gray ramp (left to right).
pub fn gray_ramp(width: u32, height: u32) -> Vec<u32> {
    let mut pixels = Vec::with_capacity((width * height) as usize);
    for _y in 0..height {
        for x in 0..width {
            let v = ((x * 255) / (width - 1).max(1)) as u8;
            pixels.push(argb(0xFF, v, v, v));
        }
    }
    pixels
}

/// Generate an opaque gray image where every pixel has its own value:
/// pixel `i` is gray level `i mod 256`.
pub fn gray_sequence(width: u32, height: u32) -> Vec<u32> {
    (0..width * height)
        .map(|i| {
            let v = i as u8;
            argb(0xFF, v, v, v)
        })
        .collect()
}

/// Generate an RGB gradient (red horizontal, green vertical, blue diagonal).
pub fn gradient_rgb(width: u32, height: u32) -> Vec<u32> {
    let mut pixels = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let r = ((x * 255) / width.max(1)) as u8;
            let g = ((y * 255) / height.max(1)) as u8;
            let b = (((x + y) * 127) / (width + height).max(1)) as u8;
            pixels.push(argb(0xFF, r, g, b));
        }
    }
    pixels
}

/// Generate a gradient whose alpha falls off from left to right.
pub fn gradient_rgba(width: u32, height: u32) -> Vec<u32> {
    gradient_rgb(width, height)
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            let x = i as u32 % width;
            let a = 255 - ((x * 255) / width.max(1)) as u8;
            (p & 0x00FF_FFFF) | (a as u32) << 24
        })
        .collect()
}

/// Generate opaque random noise (seeded).
pub fn noise(width: u32, height: u32, seed: u64) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..width * height)
        .map(|_| 0xFF00_0000 | rng.gen_range(0..0x0100_0000u32))
        .collect()
}

/// Generate noise drawn from a fixed random palette of `colors` entries.
///
/// When `translucent` is set roughly a quarter of the palette gets a
/// random alpha below 255.
pub fn palette_noise(width: u32, height: u32, colors: usize, translucent: bool, seed: u64) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let palette: Vec<u32> = (0..colors)
        .map(|i| {
            let alpha = if translucent && i % 4 == 0 {
                rng.gen_range(0..255u32)
            } else {
                255
            };
            alpha << 24 | rng.gen_range(0..0x0100_0000u32)
        })
        .collect();
    (0..width * height)
        .map(|_| palette[rng.gen_range(0..colors)])
        .collect()
}

/// Generate a checkerboard pattern of two colors with square cells.
pub fn checkerboard(width: u32, height: u32, cell: u32, a: u32, b: u32) -> Vec<u32> {
    let mut pixels = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let even = ((x / cell) + (y / cell)) % 2 == 0;
            pixels.push(if even { a } else { b });
        }
    }
    pixels
}
