use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Precondition violations rejected at the quantizer's public boundary.
///
/// The algorithms themselves are total over any non-empty pixel buffer; these
/// only describe inputs that never reach them.
#[derive(Debug, Error)]
pub enum QuantizeError {
    #[error("image dimensions cannot be zero")]
    ZeroDimension,

    #[error("pixel buffer length {len} does not match dimensions {width}x{height}")]
    DimensionMismatch {
        len: usize,
        width: usize,
        height: usize,
    },

    #[error("max_colors must be between 1 and 256, got {0}")]
    InvalidMaxColors(u32),
}

/// Coarse classification of a [`ConvertError`], used for reporting and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Classification,
    Decode,
    Encode,
    FileSystem,
    InconsistentReplace,
    Traversal,
}

/// Errors raised while converting a single file or walking a batch.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConvertError {
    /// Options rejected before any I/O took place.
    #[error("invalid options: {0}")]
    Validation(String),

    /// The container could not be read as a WebP file.
    #[error("cannot classify {path}: {reason}")]
    Classification { path: PathBuf, reason: String },

    #[error("WebP decode failed: {0}")]
    Decode(#[from] image_webp::DecodingError),

    /// The decoder produced a buffer that does not describe a valid image.
    #[error("decoded image is unusable: {0}")]
    Pixels(#[from] QuantizeError),

    #[error("animated WebP contains no frames")]
    EmptyAnimation,

    #[error("{format} encode failed: {reason}")]
    Encode {
        format: &'static str,
        reason: String,
    },

    #[error("I/O error on {path}: {source}")]
    FileSystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("temporary output {0} is missing or empty")]
    EmptyOutput(PathBuf),

    /// The original was deleted but the converted output could not be moved
    /// into place. The converted data only exists at `temp`.
    #[error(
        "original {original} was deleted but {temp} could not be renamed to {output}: {source}"
    )]
    InconsistentReplace {
        original: PathBuf,
        temp: PathBuf,
        output: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot walk directory {path}: {source}")]
    Traversal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("worker pool failure: {0}")]
    WorkerPool(String),
}

impl ConvertError {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn encode(format: &'static str, reason: impl ToString) -> Self {
        Self::Encode {
            format,
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Classification { .. } => ErrorKind::Classification,
            Self::Decode(_) | Self::Pixels(_) | Self::EmptyAnimation => ErrorKind::Decode,
            Self::Encode { .. } => ErrorKind::Encode,
            Self::FileSystem { .. } | Self::EmptyOutput(_) | Self::WorkerPool(_) => {
                ErrorKind::FileSystem
            }
            Self::InconsistentReplace { .. } => ErrorKind::InconsistentReplace,
            Self::Traversal { .. } => ErrorKind::Traversal,
        }
    }

    /// True when the filesystem was left in a state that needs manual repair.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InconsistentReplace { .. })
    }
}
