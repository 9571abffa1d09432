//! Owned pixel buffers with a checked `width * height == len` invariant.

use rgb::{RGB, RGBA};

use crate::error::QuantizeError;

/// A row-major grid of pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer<P> {
    width: usize,
    height: usize,
    pixels: Vec<P>,
}

pub type RgbBuffer = PixelBuffer<RGB<u8>>;
pub type RgbaBuffer = PixelBuffer<RGBA<u8>>;

impl<P> PixelBuffer<P> {
    pub fn new(width: usize, height: usize, pixels: Vec<P>) -> Result<Self, QuantizeError> {
        if width == 0 || height == 0 {
            return Err(QuantizeError::ZeroDimension);
        }
        if width.checked_mul(height) != Some(pixels.len()) {
            return Err(QuantizeError::DimensionMismatch {
                len: pixels.len(),
                width,
                height,
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[P] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<P> {
        self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

impl RgbBuffer {
    /// Build from tightly packed RGB bytes.
    pub fn from_rgb_bytes(width: usize, height: usize, bytes: &[u8]) -> Result<Self, QuantizeError> {
        if bytes.len() % 3 != 0 {
            return Err(QuantizeError::DimensionMismatch {
                len: bytes.len(),
                width,
                height,
            });
        }
        let pixels = bytes
            .chunks_exact(3)
            .map(|c| RGB::new(c[0], c[1], c[2]))
            .collect();
        Self::new(width, height, pixels)
    }

    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 3);
        for p in &self.pixels {
            out.extend_from_slice(&[p.r, p.g, p.b]);
        }
        out
    }
}

impl RgbaBuffer {
    /// Build from tightly packed RGBA bytes.
    pub fn from_rgba_bytes(
        width: usize,
        height: usize,
        bytes: &[u8],
    ) -> Result<Self, QuantizeError> {
        if bytes.len() % 4 != 0 {
            return Err(QuantizeError::DimensionMismatch {
                len: bytes.len(),
                width,
                height,
            });
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|c| RGBA::new(c[0], c[1], c[2], c[3]))
            .collect();
        Self::new(width, height, pixels)
    }

    /// Accepts 3- or 4-channel packed bytes; RGB input is treated as opaque.
    pub fn from_packed(
        width: usize,
        height: usize,
        bytes: &[u8],
        has_alpha: bool,
    ) -> Result<Self, QuantizeError> {
        if has_alpha {
            return Self::from_rgba_bytes(width, height, bytes);
        }
        let rgb = RgbBuffer::from_rgb_bytes(width, height, bytes)?;
        let pixels = rgb
            .pixels
            .iter()
            .map(|p| RGBA::new(p.r, p.g, p.b, 255))
            .collect();
        Self::new(width, height, pixels)
    }

    pub fn has_transparency(&self) -> bool {
        self.pixels.iter().any(|p| p.a != 255)
    }

    /// Flatten onto an opaque white background.
    pub fn composite_on_white(&self) -> RgbBuffer {
        PixelBuffer {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().map(|&p| composite_on_white(p)).collect(),
        }
    }
}

/// `c * a + 255 * (1 - a)` with `a` in `[0, 1]`, rounded half up.
#[inline]
pub fn composite_on_white(p: RGBA<u8>) -> RGB<u8> {
    if p.a == 255 {
        return RGB::new(p.r, p.g, p.b);
    }
    let a = p.a as f32 / 255.0;
    let blend = |c: u8| (c as f32 * a + 255.0 * (1.0 - a) + 0.5) as u8;
    RGB::new(blend(p.r), blend(p.g), blend(p.b))
}
