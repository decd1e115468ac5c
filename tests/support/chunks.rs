//! Minimal PNG chunk reader for tests.
//!
//! Independent of the encoder's own framing code so tests can check it.

#![allow(dead_code)]

use std::io::Read;

use flate2::read::ZlibDecoder;
use flate2::Crc;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// One parsed chunk.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub kind: [u8; 4],
    pub data: Vec<u8>,
    pub crc: u32,
}

impl Chunk {
    pub fn kind_str(&self) -> &str {
        std::str::from_utf8(&self.kind).unwrap()
    }
}

/// IHDR fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: u8,
    pub compression: u8,
    pub filter: u8,
    pub interlace: u8,
}

/// Split a PNG file into chunks. Panics on malformed input.
pub fn parse(png: &[u8]) -> Vec<Chunk> {
    assert_eq!(&png[..8], &PNG_SIGNATURE, "bad signature");
    let mut chunks = Vec::new();
    let mut pos = 8;
    while pos < png.len() {
        let len = u32::from_be_bytes(png[pos..pos + 4].try_into().unwrap()) as usize;
        let kind: [u8; 4] = png[pos + 4..pos + 8].try_into().unwrap();
        let data = png[pos + 8..pos + 8 + len].to_vec();
        let crc = u32::from_be_bytes(png[pos + 8 + len..pos + 12 + len].try_into().unwrap());
        chunks.push(Chunk { kind, data, crc });
        pos += 12 + len;
    }
    assert_eq!(pos, png.len(), "trailing bytes after last chunk");
    chunks
}

/// Chunk type names in file order.
pub fn kinds(png: &[u8]) -> Vec<String> {
    parse(png).iter().map(|c| c.kind_str().to_string()).collect()
}

/// Find the first chunk of a type.
pub fn find(png: &[u8], kind: &[u8; 4]) -> Option<Chunk> {
    parse(png).into_iter().find(|c| &c.kind == kind)
}

/// Parse the IHDR chunk.
pub fn header(png: &[u8]) -> Header {
    let ihdr = find(png, b"IHDR").expect("missing IHDR");
    let d = &ihdr.data;
    assert_eq!(d.len(), 13);
    Header {
        width: u32::from_be_bytes(d[0..4].try_into().unwrap()),
        height: u32::from_be_bytes(d[4..8].try_into().unwrap()),
        bit_depth: d[8],
        color_type: d[9],
        compression: d[10],
        filter: d[11],
        interlace: d[12],
    }
}

/// Inflate the concatenated IDAT payload.
pub fn inflate_idat(png: &[u8]) -> Vec<u8> {
    let idat: Vec<u8> = parse(png)
        .into_iter()
        .filter(|c| &c.kind == b"IDAT")
        .flat_map(|c| c.data)
        .collect();
    let mut raw = Vec::new();
    ZlibDecoder::new(&idat[..]).read_to_end(&mut raw).unwrap();
    raw
}

/// CRC-32 from flate2, independent of the encoder's own table.
pub fn reference_crc(bytes: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(bytes);
    crc.sum()
}

/// Reverse PNG filtering on an inflated IDAT stream.
pub fn unfilter(raw: &[u8], row_len: usize, bpp: usize) -> Vec<Vec<u8>> {
    assert_eq!(raw.len() % (row_len + 1), 0, "stream is not whole rows");
    let mut prev = vec![0u8; row_len];
    let mut rows = Vec::new();
    for line in raw.chunks(row_len + 1) {
        let filter = line[0];
        let mut row = line[1..].to_vec();
        for i in 0..row_len {
            let a = if i >= bpp { row[i - bpp] as i16 } else { 0 };
            let b = prev[i] as i16;
            let c = if i >= bpp { prev[i - bpp] as i16 } else { 0 };
            let predicted = match filter {
                0 => 0,
                1 => a,
                2 => b,
                3 => (a + b) / 2,
                4 => {
                    let p = a + b - c;
                    let (pa, pb, pc) = ((p - a).abs(), (p - b).abs(), (p - c).abs());
                    if pa <= pb && pa <= pc {
                        a
                    } else if pb <= pc {
                        b
                    } else {
                        c
                    }
                }
                other => panic!("invalid filter type {other}"),
            };
            row[i] = row[i].wrapping_add(predicted as u8);
        }
        prev = row.clone();
        rows.push(row);
    }
    rows
}
