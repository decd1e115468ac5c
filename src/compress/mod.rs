//! Checksums and the streaming DEFLATE front end used by the trial search.

pub mod crc32;
pub mod deflate;

pub use crc32::{crc32, Crc32};
pub use deflate::{DeflateStrategy, DeflateStream};
