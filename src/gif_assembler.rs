//! Animated WebP to GIF assembly.
//!
//! Each composited frame is flattened onto white, quantized, and written as
//! one GIF image block preceded by a Graphics Control Extension. By default
//! every frame gets its own local color table; [`PalettePolicy::Shared`]
//! instead builds one global table from all frames.

use std::borrow::Cow;
use std::io::Write;

use gif::{DisposalMethod, Encoder, Frame, Repeat};

use crate::decode::FrameReader;
use crate::dither::DitherMode;
use crate::error::ConvertError;
use crate::histogram::Histogram;
use crate::palette::Palette;
use crate::{QuantizeConfig, Quantizer};

/// GIF color tables hold at most 256 entries.
const GIF_MAX_COLORS: u32 = 256;
/// Used when the source duration rounds below one centisecond.
const DEFAULT_DELAY_CS: u16 = 10;

/// How frames are assigned color tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PalettePolicy {
    /// One local table per frame, quantized from that frame alone.
    #[default]
    PerFrame,
    /// One global table built from the combined histogram of all frames.
    Shared,
}

/// Disposal hint carried into the Graphics Control Extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposal {
    /// Let the viewer decide.
    #[default]
    Unspecified,
    Keep,
    Background,
    Previous,
}

impl From<Disposal> for DisposalMethod {
    fn from(d: Disposal) -> Self {
        match d {
            Disposal::Unspecified => DisposalMethod::Any,
            Disposal::Keep => DisposalMethod::Keep,
            Disposal::Background => DisposalMethod::Background,
            Disposal::Previous => DisposalMethod::Previous,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssemblerOptions {
    pub quantizer: Quantizer,
    pub dither: DitherMode,
    pub policy: PalettePolicy,
}

impl AssemblerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quantizer(mut self, quantizer: Quantizer) -> Self {
        self.quantizer = quantizer;
        self
    }

    pub fn dither(mut self, dither: DitherMode) -> Self {
        self.dither = dither;
        self
    }

    pub fn policy(mut self, policy: PalettePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn quantize_config(&self) -> QuantizeConfig {
        QuantizeConfig::new()
            .max_colors(GIF_MAX_COLORS)
            .quantizer(self.quantizer)
            .dither(self.dither)
    }
}

/// What was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationSummary {
    pub width: u16,
    pub height: u16,
    pub frames: u32,
}

/// Milliseconds to GIF centiseconds: `ms / 10`, with anything under one
/// centisecond replaced by the 10cs default.
pub fn frame_delay_cs(duration_ms: u32) -> u16 {
    match duration_ms / 10 {
        0 => DEFAULT_DELAY_CS,
        cs => u16::try_from(cs).unwrap_or(u16::MAX),
    }
}

fn gif_error(e: gif::EncodingError) -> ConvertError {
    ConvertError::encode("GIF", e)
}

/// Convert an animated WebP into a looping GIF written to `writer`.
///
/// Any failure aborts the whole animation; callers are expected to discard
/// whatever partial output reached `writer`.
pub fn assemble_gif<W: Write>(
    webp: &[u8],
    writer: W,
    options: &AssemblerOptions,
) -> Result<AnimationSummary, ConvertError> {
    let frames = FrameReader::new(webp)?;
    if frames.frame_count() == 0 {
        return Err(ConvertError::EmptyAnimation);
    }
    let (Ok(width), Ok(height)) = (
        u16::try_from(frames.canvas_width()),
        u16::try_from(frames.canvas_height()),
    ) else {
        return Err(ConvertError::encode(
            "GIF",
            format!(
                "canvas {}x{} exceeds the 65535 pixel limit",
                frames.canvas_width(),
                frames.canvas_height()
            ),
        ));
    };

    let shared = match options.policy {
        PalettePolicy::PerFrame => None,
        PalettePolicy::Shared => Some(shared_palette(webp, options)?),
    };
    let global_table = shared.as_ref().map(Palette::to_rgb_bytes).unwrap_or_default();

    let mut encoder = Encoder::new(writer, width, height, &global_table).map_err(gif_error)?;
    encoder.set_repeat(Repeat::Infinite).map_err(gif_error)?;

    let config = options.quantize_config();
    let mut written = 0u32;
    for frame in frames {
        let frame = frame?;
        let rgb = frame.image.composite_on_white();

        let (local_table, indices) = match &shared {
            Some(palette) => {
                let indices = crate::remap_with_palette(
                    rgb.pixels(),
                    rgb.width(),
                    rgb.height(),
                    palette,
                    options.dither,
                )?;
                (None, indices)
            }
            None => {
                let result = crate::quantize_buffer(&rgb, &config)?;
                let (palette, indices) = result.into_parts();
                (Some(palette.to_rgb_bytes()), indices)
            }
        };

        let delay = frame_delay_cs(frame.duration_ms);
        log::debug!(
            "frame {}: {}ms -> {}cs, {} palette entries",
            frame.index,
            frame.duration_ms,
            delay,
            local_table
                .as_ref()
                .map_or(global_table.len(), |t| t.len())
                / 3
        );

        let gif_frame = Frame {
            width,
            height,
            delay,
            dispose: frame.disposal.into(),
            interlaced: false,
            palette: local_table,
            buffer: Cow::Owned(indices),
            ..Default::default()
        };
        encoder.write_frame(&gif_frame).map_err(gif_error)?;
        written += 1;
    }

    if written == 0 {
        return Err(ConvertError::EmptyAnimation);
    }
    encoder
        .into_inner()
        .map_err(|e| ConvertError::encode("GIF", e))?;

    Ok(AnimationSummary {
        width,
        height,
        frames: written,
    })
}

/// In-memory variant of [`assemble_gif`].
pub fn assemble_gif_to_vec(
    webp: &[u8],
    options: &AssemblerOptions,
) -> Result<Vec<u8>, ConvertError> {
    let mut out = Vec::new();
    assemble_gif(webp, &mut out, options)?;
    Ok(out)
}

/// First pass for [`PalettePolicy::Shared`]: histogram every frame.
fn shared_palette(webp: &[u8], options: &AssemblerOptions) -> Result<Palette, ConvertError> {
    let mut hist = Histogram::new();
    for frame in FrameReader::new(webp)? {
        hist.add_pixels(frame?.image.composite_on_white().pixels());
    }
    if hist.is_empty() {
        return Err(ConvertError::EmptyAnimation);
    }
    let palette = crate::palette_from_histogram(&hist, &options.quantize_config())?;
    log::debug!(
        "shared palette: {} distinct colors over {} pixels -> {} entries",
        hist.len(),
        hist.total(),
        palette.used_len()
    );
    Ok(palette)
}
