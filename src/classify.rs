use std::fmt;
use std::path::Path;

use crate::decode;
use crate::error::ConvertError;

/// Which encode path a WebP file takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebPKind {
    Static,
    Animated,
    Unknown,
}

impl WebPKind {
    /// Extension of the converted file.
    pub fn output_extension(self) -> Option<&'static str> {
        match self {
            Self::Static => Some("jpg"),
            Self::Animated => Some("gif"),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for WebPKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Static => "static",
            Self::Animated => "animated",
            Self::Unknown => "unknown",
        })
    }
}

/// Container-level facts read from the WebP header chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerInfo {
    pub kind: WebPKind,
    pub width: u32,
    pub height: u32,
    /// 1 for still images.
    pub frame_count: u32,
    pub has_alpha: bool,
}

/// Cheap `RIFF....WEBP` signature test.
pub fn has_webp_signature(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP"
}

/// Read container flags. An animation flag with a zero frame count still
/// classifies as animated; the assembler rejects it later.
pub fn inspect(bytes: &[u8]) -> Result<ContainerInfo, image_webp::DecodingError> {
    let decoder = decode::open(bytes)?;
    let (width, height) = decoder.dimensions();
    let animated = decoder.is_animated();
    Ok(ContainerInfo {
        kind: if animated {
            WebPKind::Animated
        } else {
            WebPKind::Static
        },
        width,
        height,
        frame_count: if animated { decoder.num_frames() } else { 1 },
        has_alpha: decoder.has_alpha(),
    })
}

/// Label `bytes` without failing; unreadable containers are `Unknown`.
pub fn classify(bytes: &[u8]) -> WebPKind {
    if !has_webp_signature(bytes) {
        return WebPKind::Unknown;
    }
    inspect(bytes).map_or(WebPKind::Unknown, |info| info.kind)
}

/// Like [`inspect`], reporting failures against `path`.
pub fn inspect_file(path: &Path, bytes: &[u8]) -> Result<ContainerInfo, ConvertError> {
    if !has_webp_signature(bytes) {
        return Err(ConvertError::Classification {
            path: path.to_path_buf(),
            reason: "missing RIFF/WEBP signature".into(),
        });
    }
    inspect(bytes).map_err(|e| ConvertError::Classification {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn still(width: u32, height: u32) -> Vec<u8> {
        let rgb = vec![200u8; (width * height * 3) as usize];
        let mut out = Vec::new();
        image_webp::WebPEncoder::new(&mut out)
            .encode(&rgb, width, height, image_webp::ColorType::Rgb8)
            .unwrap();
        out
    }

    #[test]
    fn still_image_is_static() {
        let bytes = still(3, 5);
        assert_eq!(classify(&bytes), WebPKind::Static);
        let info = inspect(&bytes).unwrap();
        assert_eq!((info.width, info.height, info.frame_count), (3, 5, 1));
    }

    #[test]
    fn non_webp_is_unknown() {
        assert_eq!(classify(b"GIF89a"), WebPKind::Unknown);
        assert_eq!(classify(b"RIFF\0\0\0\0WAVEfmt "), WebPKind::Unknown);
    }

    #[test]
    fn truncated_container_is_unknown() {
        let bytes = still(4, 4);
        assert_eq!(classify(&bytes[..16]), WebPKind::Unknown);
        let err = inspect_file(Path::new("x.webp"), &bytes[..16]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Classification);
    }

    #[test]
    fn kinds_map_to_extensions() {
        assert_eq!(WebPKind::Static.output_extension(), Some("jpg"));
        assert_eq!(WebPKind::Animated.output_extension(), Some("gif"));
        assert_eq!(WebPKind::Unknown.output_extension(), None);
        assert_eq!(WebPKind::Animated.to_string(), "animated");
    }
}
