use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use webp2gifjpeg::{DitherMode, PalettePolicy, ProcessOptions, Quantizer, process_directory};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum QuantizerArg {
    Octree,
    MedianCut,
}

impl From<QuantizerArg> for Quantizer {
    fn from(q: QuantizerArg) -> Self {
        match q {
            QuantizerArg::Octree => Quantizer::Octree,
            QuantizerArg::MedianCut => Quantizer::MedianCut,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "webp2gifjpeg")]
#[command(
    about = "Replace WebP files in place: animated ones become GIF, static ones JPEG",
    long_about = None
)]
struct Args {
    /// Directory to scan recursively
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// JPEG quality (1-100)
    #[arg(short, long, default_value = "100")]
    quality: u8,

    /// Number of worker threads (default: available cores)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Palette algorithm for GIF frames
    #[arg(long, value_enum, default_value = "octree")]
    quantizer: QuantizerArg,

    /// Build one palette for the whole animation instead of one per frame
    #[arg(long)]
    shared_palette: bool,

    /// Floyd-Steinberg dither GIF frames
    #[arg(long)]
    dither: bool,

    /// Write progressive JPEGs
    #[arg(long)]
    progressive: bool,
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let meta = std::fs::metadata(&args.dir)
        .with_context(|| format!("cannot access {}", args.dir.display()))?;
    anyhow::ensure!(meta.is_dir(), "{} is not a directory", args.dir.display());

    let workers = args.workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    let options = ProcessOptions::new()
        .quality(args.quality)
        .workers(workers)
        .quantizer(args.quantizer.into())
        .palette_policy(if args.shared_palette {
            PalettePolicy::Shared
        } else {
            PalettePolicy::PerFrame
        })
        .dither(if args.dither {
            DitherMode::FloydSteinberg
        } else {
            DitherMode::None
        })
        .progressive(args.progressive);

    let stats = process_directory(&args.dir, &options)
        .with_context(|| format!("failed to process {}", args.dir.display()))?;

    println!(
        "Total: {}  Static: {}  Animated: {}  Errors: {}",
        stats.processed, stats.static_count, stats.animated_count, stats.errors
    );
    if stats.fatal > 0 {
        log::error!(
            "{} file(s) lost their original without the output being moved into place; see the .tmp files",
            stats.fatal
        );
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
