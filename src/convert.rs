//! Single-file conversion with atomic replacement of the source.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::classify::{self, WebPKind};
use crate::decode;
use crate::dither::DitherMode;
use crate::error::ConvertError;
use crate::gif_assembler::{self, AssemblerOptions, PalettePolicy};
use crate::jpeg;
use crate::Quantizer;

/// Options shared by every file in a run.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// JPEG quality, 1..=100.
    pub quality: u8,
    /// Worker threads for batch runs; 1 or less runs sequentially.
    pub workers: usize,
    pub quantizer: Quantizer,
    pub palette_policy: PalettePolicy,
    pub dither: DitherMode,
    /// Emit progressive rather than baseline JPEG.
    pub progressive: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            quality: 100,
            workers: 1,
            quantizer: Quantizer::Octree,
            palette_policy: PalettePolicy::PerFrame,
            dither: DitherMode::None,
            progressive: false,
        }
    }
}

impl ProcessOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn quantizer(mut self, quantizer: Quantizer) -> Self {
        self.quantizer = quantizer;
        self
    }

    pub fn palette_policy(mut self, policy: PalettePolicy) -> Self {
        self.palette_policy = policy;
        self
    }

    pub fn dither(mut self, dither: DitherMode) -> Self {
        self.dither = dither;
        self
    }

    pub fn progressive(mut self, progressive: bool) -> Self {
        self.progressive = progressive;
        self
    }

    pub fn validate(&self) -> Result<(), ConvertError> {
        jpeg::check_quality(self.quality)?;
        if self.workers == 0 {
            return Err(ConvertError::Validation(
                "worker count must be at least 1".into(),
            ));
        }
        Ok(())
    }

    fn assembler_options(&self) -> AssemblerOptions {
        AssemblerOptions::new()
            .quantizer(self.quantizer)
            .dither(self.dither)
            .policy(self.palette_policy)
    }
}

/// Outcome of converting one file.
#[derive(Debug)]
pub struct ConversionResult {
    pub source: PathBuf,
    pub kind: WebPKind,
    /// Final output path on success.
    pub output: Option<PathBuf>,
    pub error: Option<ConvertError>,
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_fatal(&self) -> bool {
        self.error.as_ref().is_some_and(ConvertError::is_fatal)
    }
}

/// `photo.webp` becomes `photo.jpg` or `photo.gif` in the same directory.
pub fn output_path(source: &Path, kind: WebPKind) -> Option<PathBuf> {
    kind.output_extension().map(|ext| source.with_extension(ext))
}

/// `<output>.tmp`, next to the output.
pub fn temp_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".tmp");
    output.with_file_name(name)
}

/// Decode a still WebP, flatten it onto white and encode it as JPEG.
pub fn encode_static_jpeg(
    webp: &[u8],
    quality: u8,
    progressive: bool,
) -> Result<Vec<u8>, ConvertError> {
    jpeg::check_quality(quality)?;
    let rgba = decode::decode_still(webp)?;
    let rgb = rgba.composite_on_white();
    jpeg::encode_jpeg(&rgb, quality, progressive)
}

/// Convert one file, folding any failure into the result.
pub fn convert_file(path: &Path, options: &ProcessOptions) -> ConversionResult {
    let mut kind = WebPKind::Unknown;
    let outcome = try_convert_file(path, options, &mut kind);
    match outcome {
        Ok(output) => ConversionResult {
            source: path.to_path_buf(),
            kind,
            output: Some(output),
            error: None,
        },
        Err(err) => ConversionResult {
            source: path.to_path_buf(),
            kind,
            output: None,
            error: Some(err),
        },
    }
}

fn try_convert_file(
    path: &Path,
    options: &ProcessOptions,
    kind: &mut WebPKind,
) -> Result<PathBuf, ConvertError> {
    options.validate()?;

    let bytes = fs::read(path).map_err(|e| ConvertError::fs(path, e))?;
    let info = classify::inspect_file(path, &bytes)?;
    *kind = info.kind;
    let output = output_path(path, info.kind).ok_or_else(|| ConvertError::Classification {
        path: path.to_path_buf(),
        reason: "unrecognized WebP layout".into(),
    })?;
    log::debug!(
        "{}: {} {}x{}, {} frame(s), alpha={}",
        path.display(),
        info.kind,
        info.width,
        info.height,
        info.frame_count,
        info.has_alpha
    );

    match info.kind {
        WebPKind::Animated => {
            let assembler = options.assembler_options();
            replace_atomically(path, &output, |file| {
                let mut writer = BufWriter::new(file);
                let summary = gif_assembler::assemble_gif(&bytes, &mut writer, &assembler)?;
                writer.flush()?;
                log::debug!("{}: wrote {} GIF frames", path.display(), summary.frames);
                Ok(())
            })?
        }
        _ => {
            let jpeg = encode_static_jpeg(&bytes, options.quality, options.progressive)?;
            replace_atomically(path, &output, |file| {
                file.write_all(&jpeg)?;
                Ok(())
            })?
        }
    }

    log::info!("converted {} -> {}", path.display(), output.display());
    Ok(output)
}

/// Failures inside the writer callback: either an encoder error or an I/O
/// error on the temp file.
#[derive(Debug)]
pub enum WriteError {
    Convert(ConvertError),
    Io(io::Error),
}

impl From<ConvertError> for WriteError {
    fn from(e: ConvertError) -> Self {
        Self::Convert(e)
    }
}

impl From<io::Error> for WriteError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

fn discard(temp: &Path) {
    match fs::remove_file(temp) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("could not remove {}: {e}", temp.display()),
    }
}

/// Write through `<output>.tmp`, then swap it in for `source`.
///
/// Until `source` is deleted every failure removes the temp file and leaves
/// `source` untouched. A failed rename after the delete is reported as
/// [`ConvertError::InconsistentReplace`]; the converted data is then only in
/// the temp file.
pub fn replace_atomically<F>(source: &Path, output: &Path, write: F) -> Result<(), ConvertError>
where
    F: FnOnce(&mut File) -> Result<(), WriteError>,
{
    let temp = temp_path(output);
    let written = File::create(&temp)
        .map_err(WriteError::Io)
        .and_then(|mut file| {
            write(&mut file)?;
            file.sync_all()?;
            Ok(())
        });
    if let Err(e) = written {
        discard(&temp);
        return Err(match e {
            WriteError::Convert(e) => e,
            WriteError::Io(e) => ConvertError::fs(&temp, e),
        });
    }

    match fs::metadata(&temp) {
        Ok(meta) if meta.len() > 0 => {}
        Ok(_) => {
            discard(&temp);
            return Err(ConvertError::EmptyOutput(temp));
        }
        Err(e) => {
            discard(&temp);
            return Err(ConvertError::fs(&temp, e));
        }
    }

    if let Err(e) = fs::remove_file(source) {
        discard(&temp);
        return Err(ConvertError::fs(source, e));
    }

    if let Err(source_err) = fs::rename(&temp, output) {
        log::error!(
            "{} was removed but {} could not be moved into place: {source_err}",
            source.display(),
            temp.display()
        );
        return Err(ConvertError::InconsistentReplace {
            original: source.to_path_buf(),
            temp,
            output: output.to_path_buf(),
            source: source_err,
        });
    }
    Ok(())
}
