use serde::{Deserialize, Serialize};

/// Errors raised when constructing an image from a raw buffer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageBufferError {
    #[error("invalid image buffer length (expected {expected} samples, got {got})")]
    InvalidLength { expected: usize, got: usize },
    #[error("invalid image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
}

fn checked_len(width: usize, height: usize, got: usize) -> Result<(), ImageBufferError> {
    let expected = width
        .checked_mul(height)
        .ok_or(ImageBufferError::InvalidDimensions { width, height })?;
    if expected != got {
        return Err(ImageBufferError::InvalidLength { expected, got });
    }
    Ok(())
}

/// 8-bit single-channel image, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0)
    }

    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageBufferError> {
        checked_len(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.width + x] = v;
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

/// Sample depth of a raw sensor buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitDepth {
    Eight,
    Sixteen,
}

impl BitDepth {
    pub fn bits(self) -> u32 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
        }
    }

    /// Largest representable sample, `2^bits - 1`.
    pub fn max_value(self) -> u32 {
        (1u32 << self.bits()) - 1
    }
}

/// Single-channel raw sensor image. Samples are stored widened to `u16`;
/// `depth` remembers the pixel format they came from.
#[derive(Clone, Debug, PartialEq)]
pub struct RawImage {
    pub width: usize,
    pub height: usize,
    pub depth: BitDepth,
    pub data: Vec<u16>,
}

impl RawImage {
    pub fn from_u8(width: usize, height: usize, data: &[u8]) -> Result<Self, ImageBufferError> {
        checked_len(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            depth: BitDepth::Eight,
            data: data.iter().map(|&v| v as u16).collect(),
        })
    }

    pub fn from_u16(width: usize, height: usize, data: Vec<u16>) -> Result<Self, ImageBufferError> {
        checked_len(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            depth: BitDepth::Sixteen,
            data,
        })
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u16 {
        self.data[y * self.width + x]
    }

    pub fn max_value(&self) -> u32 {
        self.depth.max_value()
    }

    /// Samples divided by the bit-depth maximum, in `[0, 1]`.
    pub fn normalized(&self) -> FloatImage {
        let scale = 1.0 / self.max_value() as f32;
        FloatImage {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| v as f32 * scale).collect(),
        }
    }

    /// Drop the low bits so the image fits in 8 bits.
    pub fn to_gray8(&self) -> GrayImage {
        let shift = self.depth.bits() - 8;
        GrayImage {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| (v >> shift) as u8).collect(),
        }
    }
}

/// Single-channel float image (normalized raw data).
#[derive(Clone, Debug, PartialEq)]
pub struct FloatImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl FloatImage {
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        self.data[y * self.width + x] = v;
    }
}

/// Three-channel linear-light image, values nominally in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<[f32; 3]>,
}

impl RgbImage {
    pub fn filled(width: usize, height: usize, value: [f32; 3]) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [f32; 3] {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: [f32; 3]) {
        self.data[y * self.width + x] = v;
    }

    /// Quantize to interleaved 8-bit RGB (clamped).
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.data
            .iter()
            .flat_map(|px| px.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect()
    }
}
