//! Predictor reversal for Flate/LZW streams.
//!
//! Cross-reference streams almost always use PNG Up prediction, so this
//! matters for bootstrap: the xref stream itself cannot be read without it.
//! Supports TIFF predictor 2 and PNG predictors 10-15 (per-row tag byte).

use crate::error::{Error, Result};

/// Parameters from /DecodeParms relevant to prediction.
#[derive(Debug, Clone)]
pub struct DecodeParams {
    /// 1 = none, 2 = TIFF, 10-15 = PNG
    pub predictor: i64,
    /// Samples per row
    pub columns: usize,
    /// Color components per sample
    pub colors: usize,
    /// Bits per component
    pub bits_per_component: usize,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            columns: 1,
            colors: 1,
            bits_per_component: 8,
        }
    }
}

impl DecodeParams {
    fn sample_bytes_per_row(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component).div_ceil(8)
    }

    fn bytes_per_pixel(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8).max(1)
    }
}

/// Reverse the declared predictor.
pub fn apply_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => reverse_tiff(data, params),
        10..=15 => reverse_png(data, params),
        other => Err(Error::Decode(format!("unsupported predictor {}", other))),
    }
}

fn reverse_tiff(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    let row_len = params.sample_bytes_per_row();
    if row_len == 0 || data.len() % row_len != 0 {
        return Err(Error::Decode(format!(
            "TIFF predictor: data length {} not a multiple of row size {}",
            data.len(),
            row_len
        )));
    }

    let bpp = params.bytes_per_pixel();
    let mut out = Vec::with_capacity(data.len());
    for row in data.chunks(row_len) {
        let row_start = out.len();
        for (i, &b) in row.iter().enumerate() {
            let left = if i >= bpp { out[row_start + i - bpp] } else { 0 };
            out.push(b.wrapping_add(left));
        }
    }
    Ok(out)
}

fn reverse_png(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    let pixel_len = params.sample_bytes_per_row();
    let row_len = pixel_len + 1; // leading per-row filter tag
    if pixel_len == 0 || data.len() % row_len != 0 {
        return Err(Error::Decode(format!(
            "PNG predictor: data length {} not a multiple of row size {}",
            data.len(),
            row_len
        )));
    }

    let bpp = params.bytes_per_pixel();
    let rows = data.len() / row_len;
    let mut out: Vec<u8> = Vec::with_capacity(rows * pixel_len);

    for r in 0..rows {
        let row = &data[r * row_len..(r + 1) * row_len];
        let tag = row[0];
        let encoded = &row[1..];
        let row_start = out.len();

        for (i, &b) in encoded.iter().enumerate() {
            let left = if i >= bpp { out[row_start + i - bpp] } else { 0 };
            let up = if r > 0 { out[row_start - pixel_len + i] } else { 0 };
            let up_left = if r > 0 && i >= bpp {
                out[row_start - pixel_len + i - bpp]
            } else {
                0
            };

            let predicted = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => (((left as u16) + (up as u16)) / 2) as u8,
                4 => paeth(left, up, up_left),
                other => {
                    return Err(Error::Decode(format!("PNG predictor: bad row tag {}", other)))
                },
            };
            out.push(b.wrapping_add(predicted));
        }
    }

    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let (a, b, c) = (a as i16, b as i16, c as i16);
    let p = a + b - c;
    let (pa, pb, pc) = ((p - a).abs(), (p - b).abs(), (p - c).abs());
    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}
