use jpeg_encoder::{ColorType, Encoder, SamplingFactor};

use crate::error::ConvertError;
use crate::pixel::RgbBuffer;

/// Accepted JPEG quality range.
pub const QUALITY_RANGE: std::ops::RangeInclusive<u8> = 1..=100;

pub fn check_quality(quality: u8) -> Result<(), ConvertError> {
    if !QUALITY_RANGE.contains(&quality) {
        return Err(ConvertError::Validation(format!(
            "quality must be between 1 and 100, got {quality}"
        )));
    }
    Ok(())
}

/// Encode an opaque RGB image as baseline (or progressive) JPEG.
///
/// Chroma is never subsampled and Huffman tables are always optimized,
/// whatever the quality.
pub fn encode_jpeg(
    image: &RgbBuffer,
    quality: u8,
    progressive: bool,
) -> Result<Vec<u8>, ConvertError> {
    check_quality(quality)?;
    let (Ok(width), Ok(height)) = (u16::try_from(image.width()), u16::try_from(image.height()))
    else {
        return Err(ConvertError::encode(
            "JPEG",
            format!(
                "{}x{} exceeds the 65535 pixel limit",
                image.width(),
                image.height()
            ),
        ));
    };

    let mut out = Vec::new();
    let mut encoder = Encoder::new(&mut out, quality);
    encoder.set_sampling_factor(SamplingFactor::F_1_1);
    encoder.set_optimized_huffman_tables(true);
    encoder.set_progressive(progressive);
    encoder
        .encode(&image.to_rgb_bytes(), width, height, ColorType::Rgb)
        .map_err(|e| ConvertError::encode("JPEG", e))?;
    Ok(out)
}
