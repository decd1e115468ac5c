//! PNG chunk framing.

use std::io::Write;

use crate::compress::crc32::Crc32;
use crate::error::Result;

/// PNG file signature (magic bytes).
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Bytes a chunk adds around its data: length, type and CRC.
pub const CHUNK_OVERHEAD: usize = 12;

/// Image header.
pub const IHDR: [u8; 4] = *b"IHDR";
/// Palette.
pub const PLTE: [u8; 4] = *b"PLTE";
/// Palette transparency.
pub const TRNS: [u8; 4] = *b"tRNS";
/// Image data.
pub const IDAT: [u8; 4] = *b"IDAT";
/// Image trailer.
pub const IEND: [u8; 4] = *b"IEND";

/// Writes a PNG stream chunk by chunk to any [`Write`] sink.
pub struct ChunkWriter<W: Write> {
    inner: W,
    crc: Crc32,
}

impl<W: Write> ChunkWriter<W> {
    /// Wrap `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            crc: Crc32::new(),
        }
    }

    /// Write the 8-byte PNG signature.
    pub fn write_signature(&mut self) -> Result<()> {
        self.inner.write_all(&PNG_SIGNATURE)?;
        Ok(())
    }

    /// Write one chunk.
    pub fn write_chunk(&mut self, chunk_type: &[u8; 4], data: &[u8]) -> Result<()> {
        self.crc.reset();
        self.crc.update(chunk_type);
        self.crc.update(data);

        self.inner.write_all(&(data.len() as u32).to_be_bytes())?;
        self.inner.write_all(chunk_type)?;
        self.inner.write_all(data)?;
        self.inner.write_all(&self.crc.value().to_be_bytes())?;
        Ok(())
    }

    /// Flush and return the sink.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
