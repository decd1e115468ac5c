//! # pngopt
//!
//! An optimizing PNG encoder.
//!
//! Given a non-premultiplied ARGB32 pixel buffer, `pngopt` picks the
//! narrowest color type and bit depth that represents the image losslessly,
//! then searches a grid of scanline filter heuristics and DEFLATE
//! parameters in parallel, keeping whichever combination produces the
//! smallest IDAT payload.
//!
//! ## Features
//!
//! - **Five color types**: 8-bit grayscale, grayscale+alpha, RGB, RGBA and
//!   4/8-bit palette (with a compact tRNS table)
//! - **Trial search** over deflate levels, deflate strategies and ten
//!   filter heuristics, pruned by a shared best-size bound
//! - **Deterministic output** regardless of worker-pool size
//! - Optional parallel trials via the `parallel` feature (on by default)
//!
//! ## Example
//!
//! ```rust
//! use pngopt::png::{self, PngOptions};
//!
//! // 2x1 image: opaque red, opaque blue (ARGB)
//! let pixels = [0xFFFF_0000u32, 0xFF00_00FF];
//! let bytes = png::encode(&pixels, 2, 1).unwrap();
//! assert_eq!(&bytes[1..4], b"PNG");
//!
//! let smallest = png::encode_with_options(&pixels, 2, 1, &PngOptions::max_compression()).unwrap();
//! assert!(smallest.len() <= bytes.len());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod color;
pub mod compress;
pub mod error;
pub mod png;

pub use color::ColorType;
pub use error::{Error, Result};
