#![forbid(unsafe_code)]

//! Bulk WebP conversion.
//!
//! Static WebP images are re-encoded as JPEG and animated ones as looping
//! GIFs. The palette side is a small quantization engine: an [`octree`] and a
//! [`median_cut`] quantizer, exact-match [`remap`]ping and Floyd-Steinberg
//! [`dither`]ing. [`convert`] handles one file with an atomic replace, and
//! [`batch`] fans a directory tree out over a worker pool.

pub mod batch;
pub mod classify;
pub mod convert;
pub mod decode;
pub mod dither;
pub mod error;
pub mod gif_assembler;
pub mod histogram;
pub mod jpeg;
pub mod median_cut;
pub mod octree;
pub mod palette;
pub mod pixel;
pub mod remap;

pub use batch::{RunStatistics, process_directory};
pub use classify::{ContainerInfo, WebPKind};
pub use convert::{ConversionResult, ProcessOptions, convert_file};
pub use dither::DitherMode;
pub use error::{ConvertError, ErrorKind, QuantizeError};
pub use gif_assembler::PalettePolicy;
pub use histogram::Histogram;
pub use palette::Palette;
pub use pixel::{PixelBuffer, RgbBuffer, RgbaBuffer};

use rgb::RGB;

/// Palette construction algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quantizer {
    /// Tree reduction; the palette is padded with black to `max_colors`.
    #[default]
    Octree,
    /// Recursive bucket splitting on the widest channel; never padded.
    MedianCut,
}

impl std::fmt::Display for Quantizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Octree => f.write_str("octree"),
            Self::MedianCut => f.write_str("median-cut"),
        }
    }
}

/// Configuration for palette quantization.
#[derive(Debug, Clone)]
pub struct QuantizeConfig {
    /// Maximum number of palette colors (1..=256).
    pub max_colors: u32,
    /// Palette construction algorithm.
    pub quantizer: Quantizer,
    /// Dithering mode.
    pub dither: DitherMode,
}

impl Default for QuantizeConfig {
    fn default() -> Self {
        Self {
            max_colors: 256,
            quantizer: Quantizer::Octree,
            dither: DitherMode::None,
        }
    }
}

impl QuantizeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_colors(mut self, n: u32) -> Self {
        self.max_colors = n;
        self
    }

    pub fn quantizer(mut self, quantizer: Quantizer) -> Self {
        self.quantizer = quantizer;
        self
    }

    pub fn dither(mut self, mode: DitherMode) -> Self {
        self.dither = mode;
        self
    }
}

/// Quantization result.
#[derive(Debug, Clone)]
pub struct QuantizeResult {
    palette: Palette,
    indices: Vec<u8>,
}

impl QuantizeResult {
    /// Palette entries, including any black padding.
    pub fn palette(&self) -> &[[u8; 3]] {
        self.palette.entries()
    }

    /// The palette index for each pixel.
    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// Number of colors in the palette.
    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }

    pub fn as_palette(&self) -> &Palette {
        &self.palette
    }

    pub fn into_parts(self) -> (Palette, Vec<u8>) {
        (self.palette, self.indices)
    }
}

/// Quantize an RGB image to a palette of at most `config.max_colors` entries.
///
/// Images that already use no more than `max_colors` distinct colors skip
/// the quantizer and get those colors back verbatim, in the same order the
/// full octree walk would produce them.
pub fn quantize(
    pixels: &[RGB<u8>],
    width: usize,
    height: usize,
    config: &QuantizeConfig,
) -> Result<QuantizeResult, QuantizeError> {
    validate_inputs(pixels.len(), width, height, config)?;
    let max_colors = config.max_colors as usize;

    let palette = match histogram::detect_exact_palette(pixels, max_colors) {
        Some(colors) => {
            log::debug!("exact palette: {} distinct colors", colors.len());
            exact_palette(colors, max_colors, config.quantizer)
        }
        None => match config.quantizer {
            Quantizer::Octree => {
                octree::build_palette(&Histogram::from_pixels(pixels), max_colors)
            }
            Quantizer::MedianCut => median_cut::build_palette(pixels, max_colors),
        },
    };

    let indices = map_pixels(pixels, width, height, &palette, config.dither);
    Ok(QuantizeResult { palette, indices })
}

/// Convenience wrapper over [`quantize`] for an owned buffer.
pub fn quantize_buffer(
    image: &RgbBuffer,
    config: &QuantizeConfig,
) -> Result<QuantizeResult, QuantizeError> {
    quantize(image.pixels(), image.width(), image.height(), config)
}

/// Build a palette from an accumulated histogram, e.g. across every frame
/// of an animation.
pub fn palette_from_histogram(
    hist: &Histogram,
    config: &QuantizeConfig,
) -> Result<Palette, QuantizeError> {
    check_max_colors(config)?;
    if hist.is_empty() {
        return Err(QuantizeError::ZeroDimension);
    }
    let max_colors = config.max_colors as usize;
    if let Some(colors) = hist.distinct_colors(max_colors) {
        return Ok(exact_palette(colors, max_colors, config.quantizer));
    }
    Ok(match config.quantizer {
        Quantizer::Octree => octree::build_palette(hist, max_colors),
        Quantizer::MedianCut => median_cut::build_palette(&hist.expand(), max_colors),
    })
}

/// Map an image onto an existing palette.
pub fn remap_with_palette(
    pixels: &[RGB<u8>],
    width: usize,
    height: usize,
    palette: &Palette,
    dither: DitherMode,
) -> Result<Vec<u8>, QuantizeError> {
    check_dimensions(pixels.len(), width, height)?;
    Ok(map_pixels(pixels, width, height, palette, dither))
}

fn map_pixels(
    pixels: &[RGB<u8>],
    width: usize,
    height: usize,
    palette: &Palette,
    dither: DitherMode,
) -> Vec<u8> {
    match dither {
        DitherMode::None => remap::remap_pixels(pixels, palette),
        DitherMode::FloydSteinberg => dither::dither_image(pixels, width, height, palette),
    }
}

fn exact_palette(mut colors: Vec<RGB<u8>>, max_colors: usize, quantizer: Quantizer) -> Palette {
    colors.sort_by_key(|&c| octree::morton_key(c));
    let entries: Vec<[u8; 3]> = colors.iter().map(|c| [c.r, c.g, c.b]).collect();
    match quantizer {
        Quantizer::Octree => Palette::padded(entries, max_colors),
        Quantizer::MedianCut => Palette::new(entries),
    }
}

fn check_dimensions(pixel_count: usize, width: usize, height: usize) -> Result<(), QuantizeError> {
    if width == 0 || height == 0 {
        return Err(QuantizeError::ZeroDimension);
    }
    if width.checked_mul(height) != Some(pixel_count) {
        return Err(QuantizeError::DimensionMismatch {
            len: pixel_count,
            width,
            height,
        });
    }
    Ok(())
}

fn check_max_colors(config: &QuantizeConfig) -> Result<(), QuantizeError> {
    if config.max_colors < 1 || config.max_colors > 256 {
        return Err(QuantizeError::InvalidMaxColors(config.max_colors));
    }
    Ok(())
}

fn validate_inputs(
    pixel_count: usize,
    width: usize,
    height: usize,
    config: &QuantizeConfig,
) -> Result<(), QuantizeError> {
    check_dimensions(pixel_count, width, height)?;
    check_max_colors(config)
}
