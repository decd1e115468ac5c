//! CRC-32 as used by PNG chunks (CRC-32/ISO-HDLC).
//!
//! Reflected polynomial 0xEDB88320, register preset to all ones and
//! complemented on output.

const POLYNOMIAL: u32 = 0xEDB8_8320;

/// Byte-at-a-time lookup table, computed at compile time.
static CRC_TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLYNOMIAL
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Calculate the CRC-32 of `data` in one call.
#[inline]
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(data);
    crc.finalize()
}

/// Incremental CRC-32 register.
///
/// A chunk CRC covers the type and data fields, which are fed separately.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    crc: u32,
}

impl Crc32 {
    /// Create a register preset to all ones.
    pub const fn new() -> Self {
        Self { crc: 0xFFFF_FFFF }
    }

    /// Reset the register for the next chunk.
    #[inline]
    pub fn reset(&mut self) {
        self.crc = 0xFFFF_FFFF;
    }

    /// Feed more bytes into the register.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        let mut crc = self.crc;
        for &byte in data {
            crc = (crc >> 8) ^ CRC_TABLE[((crc ^ byte as u32) & 0xFF) as usize];
        }
        self.crc = crc;
    }

    /// Current CRC value (complemented register). Does not consume the register.
    #[inline]
    pub fn value(&self) -> u32 {
        self.crc ^ 0xFFFF_FFFF
    }

    /// Finalize and return the CRC value.
    #[inline]
    pub fn finalize(self) -> u32 {
        self.value()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}
