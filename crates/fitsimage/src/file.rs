//! Reading and writing single-image FITS container files.
//!
//! The write layout is a data-less primary HDU followed by one IMAGE
//! extension carrying the pixel grid, so written images always live at unit
//! index 1. Reading walks the HDU chain by computing each data segment's
//! length from its own header.

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use std::fs;
use std::path::Path;

use bytemuck::pod_collect_to_vec;

use crate::block::{pad_data, padded_byte_len, BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::header::{
    header_byte_len, kw, parse_header_blocks, serialize_header, Card, Header,
};
use crate::pixels::{PixelData, Pixels};
use crate::value::Value;

/// One container unit: a header plus its pixel grid.
#[derive(Debug, Clone)]
pub struct Unit {
    pub header: Header,
    pub pixels: Pixels,
}

/// Structural keywords re-emitted by the writer; user headers never
/// contribute their stale copies.
const STRUCTURAL_KEYWORDS: [&str; 9] = [
    "SIMPLE", "XTENSION", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "PCOUNT", "GCOUNT", "EXTEND",
];

fn bytes_per_pixel(bitpix: i64) -> Result<usize> {
    match bitpix {
        8 => Ok(1),
        16 => Ok(2),
        32 => Ok(4),
        64 => Ok(8),
        -32 => Ok(4),
        -64 => Ok(8),
        other => Err(Error::InvalidBitpix(other)),
    }
}

/// Raw (unpadded) data segment length implied by a unit's header.
fn data_byte_len(header: &Header) -> Result<usize> {
    let bitpix = header.get_i64("BITPIX")?;
    let naxis = header.get_i64("NAXIS")?;
    if naxis == 0 {
        return Ok(0);
    }

    let mut elements: usize = 1;
    for axis in 1..=naxis {
        let key = format!("NAXIS{axis}");
        let len = header.get_i64(&key)?;
        if len < 0 {
            return Err(Error::InvalidHeader("negative axis length"));
        }
        elements *= len as usize;
    }

    // Extension HDUs may carry a parameter count and group count.
    let pcount = match header.get_i64("PCOUNT") {
        Ok(v) => v.max(0) as usize,
        Err(Error::KeyNotFound(_)) => 0,
        Err(e) => return Err(e),
    };
    let gcount = match header.get_i64("GCOUNT") {
        Ok(v) => v.max(1) as usize,
        Err(Error::KeyNotFound(_)) => 1,
        Err(e) => return Err(e),
    };

    Ok(bytes_per_pixel(bitpix)? * gcount * (pcount + elements))
}

fn decode_pixels(raw: &[u8], bitpix: i64, rows: usize, cols: usize) -> Result<Pixels> {
    let data = match bitpix {
        8 => PixelData::U8(raw.to_vec()),
        16 => {
            let mut pixels: Vec<i16> = pod_collect_to_vec(raw);
            for v in &mut pixels {
                *v = i16::from_be(*v);
            }
            PixelData::I16(pixels)
        }
        32 => {
            let mut pixels: Vec<i32> = pod_collect_to_vec(raw);
            for v in &mut pixels {
                *v = i32::from_be(*v);
            }
            PixelData::I32(pixels)
        }
        64 => {
            let mut pixels: Vec<i64> = pod_collect_to_vec(raw);
            for v in &mut pixels {
                *v = i64::from_be(*v);
            }
            PixelData::I64(pixels)
        }
        -32 => {
            let mut pixels: Vec<f32> = pod_collect_to_vec(raw);
            for v in &mut pixels {
                *v = f32::from_bits(u32::from_be(v.to_bits()));
            }
            PixelData::F32(pixels)
        }
        -64 => {
            let mut pixels: Vec<f64> = pod_collect_to_vec(raw);
            for v in &mut pixels {
                *v = f64::from_bits(u64::from_be(v.to_bits()));
            }
            PixelData::F64(pixels)
        }
        other => return Err(Error::InvalidBitpix(other)),
    };
    Pixels::new(rows, cols, data)
}

fn encode_pixels(pixels: &Pixels) -> Vec<u8> {
    let raw = match pixels.data() {
        PixelData::U8(v) => v.clone(),
        PixelData::I16(v) => {
            let mut buf = Vec::with_capacity(v.len() * 2);
            for x in v {
                buf.extend_from_slice(&x.to_be_bytes());
            }
            buf
        }
        PixelData::I32(v) => {
            let mut buf = Vec::with_capacity(v.len() * 4);
            for x in v {
                buf.extend_from_slice(&x.to_be_bytes());
            }
            buf
        }
        PixelData::I64(v) => {
            let mut buf = Vec::with_capacity(v.len() * 8);
            for x in v {
                buf.extend_from_slice(&x.to_be_bytes());
            }
            buf
        }
        PixelData::F32(v) => {
            let mut buf = Vec::with_capacity(v.len() * 4);
            for x in v {
                buf.extend_from_slice(&x.to_be_bytes());
            }
            buf
        }
        PixelData::F64(v) => {
            let mut buf = Vec::with_capacity(v.len() * 8);
            for x in v {
                buf.extend_from_slice(&x.to_be_bytes());
            }
            buf
        }
    };
    pad_data(&raw)
}

/// Read unit `index` (0-based HDU position) from the container at `path`.
///
/// Fails with [`Error::FileNotFound`] when the path does not exist,
/// [`Error::UnitNotFound`] when the file holds fewer units, and
/// [`Error::InvalidHeader`] when the addressed unit is not a 2-D image.
pub fn read_unit(path: impl AsRef<Path>, index: usize) -> Result<Unit> {
    let bytes = fs::read(path)?;

    let mut offset = 0;
    let mut unit_idx = 0;
    while bytes.len() >= offset + BLOCK_SIZE {
        let rest = &bytes[offset..];
        let header_len = header_byte_len(rest)?;
        let header = Header::from_cards(parse_header_blocks(rest)?);
        let raw_len = data_byte_len(&header)?;

        if unit_idx == index {
            if let Ok(xtension) = header.get_str("XTENSION") {
                if xtension.trim_end() != "IMAGE" {
                    return Err(Error::InvalidHeader("unit is not an image"));
                }
            }
            if header.get_i64("NAXIS")? != 2 {
                return Err(Error::InvalidHeader("unit is not a 2-D image"));
            }
            let rows = header.get_i64("NAXIS2")? as usize;
            let cols = header.get_i64("NAXIS1")? as usize;
            let data_start = offset + header_len;
            if bytes.len() < data_start + raw_len {
                return Err(Error::UnexpectedEof);
            }
            let pixels = decode_pixels(
                &bytes[data_start..data_start + raw_len],
                header.get_i64("BITPIX")?,
                rows,
                cols,
            )?;
            return Ok(Unit { header, pixels });
        }

        offset += header_len + padded_byte_len(raw_len);
        unit_idx += 1;
    }

    Err(Error::UnitNotFound(index))
}

fn value_card(keyword: &[u8], value: Value, comment: &str) -> Card {
    Card {
        keyword: kw(keyword),
        value: Some(value),
        comment: if comment.is_empty() {
            None
        } else {
            Some(String::from(comment))
        },
    }
}

fn primary_stub_cards() -> Vec<Card> {
    vec![
        value_card(b"SIMPLE", Value::Logical(true), "conforms to FITS standard"),
        value_card(b"BITPIX", Value::Integer(8), "array data type"),
        value_card(b"NAXIS", Value::Integer(0), "number of array dimensions"),
        value_card(b"EXTEND", Value::Logical(true), ""),
    ]
}

fn extension_cards(pixels: &Pixels, header: &Header) -> Vec<Card> {
    let (rows, cols) = pixels.shape();
    let mut cards = vec![
        value_card(b"XTENSION", Value::String(String::from("IMAGE")), "Image extension"),
        value_card(b"BITPIX", Value::Integer(pixels.bitpix()), "array data type"),
        value_card(b"NAXIS", Value::Integer(2), "number of array dimensions"),
        value_card(b"NAXIS1", Value::Integer(cols as i64), ""),
        value_card(b"NAXIS2", Value::Integer(rows as i64), ""),
        value_card(b"PCOUNT", Value::Integer(0), "number of parameters"),
        value_card(b"GCOUNT", Value::Integer(1), "number of groups"),
    ];
    cards.extend(header.to_cards(&STRUCTURAL_KEYWORDS));
    cards
}

/// Write a single-unit container: a data-less primary HDU plus one IMAGE
/// extension holding `pixels` and `header`.
///
/// Fails with [`Error::FileExists`] when `path` exists and `overwrite` is
/// false. The written file reads back via [`read_unit`] at index 1.
pub fn write_unit(
    path: impl AsRef<Path>,
    pixels: &Pixels,
    header: &Header,
    overwrite: bool,
) -> Result<()> {
    let path = path.as_ref();
    if path.exists() && !overwrite {
        return Err(Error::FileExists);
    }

    let mut out = serialize_header(&primary_stub_cards());
    out.extend_from_slice(&serialize_header(&extension_cards(pixels, header)));
    out.extend_from_slice(&encode_pixels(pixels));

    fs::write(path, out)?;
    Ok(())
}
