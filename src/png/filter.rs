//! PNG scanline filters.
//!
//! PNG uses filtering to improve compression by exploiting correlations
//! between adjacent pixels. Each filter predicts a byte from its left,
//! upper and upper-left neighbours and stores the difference modulo 256.
//! Bytes left of the first pixel and the row above the first scanline are
//! treated as zero.

/// Filter type bytes as defined by the PNG specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum FilterType {
    /// Raw bytes.
    #[default]
    None = 0,
    /// Difference from the left byte.
    Sub = 1,
    /// Difference from the byte above.
    Up = 2,
    /// Difference from the floored mean of left and above.
    Average = 3,
    /// Difference from the Paeth predictor.
    Paeth = 4,
}

impl FilterType {
    /// All filter types in PNG numbering order.
    pub const ALL: [FilterType; 5] = [
        FilterType::None,
        FilterType::Sub,
        FilterType::Up,
        FilterType::Average,
        FilterType::Paeth,
    ];

    /// The byte written in front of a filtered scanline.
    #[inline]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    #[cfg(test)]
    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.get(byte as usize).copied()
    }
}

/// Filter `curr` into `out` given the unfiltered previous scanline `prev`.
///
/// `prev` must be all zeros for the first scanline. `out` is overwritten and
/// must be the same length as `curr`.
pub fn encode_filter(curr: &[u8], prev: &[u8], out: &mut [u8], bpp: usize, filter: FilterType) {
    debug_assert_eq!(curr.len(), prev.len());
    debug_assert_eq!(curr.len(), out.len());
    let lead = bpp.min(curr.len());

    match filter {
        FilterType::None => out.copy_from_slice(curr),
        FilterType::Sub => {
            out[..lead].copy_from_slice(&curr[..lead]);
            for i in lead..curr.len() {
                out[i] = curr[i].wrapping_sub(curr[i - bpp]);
            }
        }
        FilterType::Up => {
            for ((o, &c), &p) in out.iter_mut().zip(curr).zip(prev) {
                *o = c.wrapping_sub(p);
            }
        }
        FilterType::Average => {
            for i in 0..lead {
                out[i] = curr[i].wrapping_sub(prev[i] >> 1);
            }
            for i in lead..curr.len() {
                let avg = ((curr[i - bpp] as u16 + prev[i] as u16) >> 1) as u8;
                out[i] = curr[i].wrapping_sub(avg);
            }
        }
        FilterType::Paeth => {
            // With a = c = 0 the predictor always picks b.
            for i in 0..lead {
                out[i] = curr[i].wrapping_sub(prev[i]);
            }
            for i in lead..curr.len() {
                let predicted = paeth_predictor(curr[i - bpp], prev[i], prev[i - bpp]);
                out[i] = curr[i].wrapping_sub(predicted);
            }
        }
    }
}

/// Paeth predictor function.
///
/// Returns whichever of `a` (left), `b` (above) or `c` (upper left) is
/// closest to `a + b - c`, breaking ties in the order a, b, c.
#[inline]
pub fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

#[cfg(test)]
pub(crate) fn decode_filter(filtered: &[u8], prev: &[u8], bpp: usize, filter: FilterType) -> Vec<u8> {
    let mut out = vec![0u8; filtered.len()];
    for i in 0..filtered.len() {
        let left = if i >= bpp { out[i - bpp] } else { 0 };
        let above = prev[i];
        let upper_left = if i >= bpp { prev[i - bpp] } else { 0 };
        let predicted = match filter {
            FilterType::None => 0,
            FilterType::Sub => left,
            FilterType::Up => above,
            FilterType::Average => ((left as u16 + above as u16) / 2) as u8,
            FilterType::Paeth => paeth_predictor(left, above, upper_left),
        };
        out[i] = filtered[i].wrapping_add(predicted);
    }
    out
}
