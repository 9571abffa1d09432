//! Directory walk plus a fixed worker pool.
//!
//! Discovery is sequential and aborts on the first traversal error. Jobs are
//! then run either inline or on a rayon pool; results flow over a channel to
//! a single aggregator thread that owns the statistics.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use crate::classify::WebPKind;
use crate::convert::{self, ConversionResult, ProcessOptions};
use crate::error::ConvertError;

/// Totals for one run. Every discovered file lands in exactly one of
/// `static_count`, `animated_count` or `errors`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatistics {
    /// Files converted successfully.
    pub processed: usize,
    pub static_count: usize,
    pub animated_count: usize,
    pub errors: usize,
    /// Failures that left a deleted original behind.
    pub fatal: usize,
}

impl RunStatistics {
    pub fn record(&mut self, result: &ConversionResult) {
        match &result.error {
            None => {
                self.processed += 1;
                match result.kind {
                    WebPKind::Animated => self.animated_count += 1,
                    _ => self.static_count += 1,
                }
            }
            Some(err) => {
                self.errors += 1;
                if err.is_fatal() {
                    self.fatal += 1;
                }
            }
        }
    }

    pub fn total(&self) -> usize {
        self.processed + self.errors
    }
}

/// Case-insensitive `.webp` extension check.
pub fn is_webp(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("webp"))
}

/// Recursively collect `.webp` regular files under `root`.
///
/// Entries are visited in name order so runs are reproducible. Symlinks are
/// not followed.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    let traversal = |path: &Path, source| ConvertError::Traversal {
        path: path.to_path_buf(),
        source,
    };

    while let Some(dir) = pending.pop() {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| traversal(&dir, e))? {
            let entry = entry.map_err(|e| traversal(&dir, e))?;
            let file_type = entry.file_type().map_err(|e| traversal(&entry.path(), e))?;
            entries.push((entry.path(), file_type));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut subdirs = Vec::new();
        for (path, file_type) in entries {
            if file_type.is_dir() {
                subdirs.push(path);
            } else if file_type.is_file() && is_webp(&path) {
                found.push(path);
            }
        }
        // Reverse so the stack pops subdirectories in name order.
        pending.extend(subdirs.into_iter().rev());
    }
    Ok(found)
}

/// Owns the running totals and reports per-file progress.
struct Aggregator {
    stats: RunStatistics,
    total: usize,
}

impl Aggregator {
    fn new(total: usize) -> Self {
        Self {
            stats: RunStatistics::default(),
            total,
        }
    }

    fn record(&mut self, result: &ConversionResult) {
        self.stats.record(result);
        let n = self.stats.total();
        match &result.error {
            None => log::info!(
                "[{n}/{}] {} ({})",
                self.total,
                result.source.display(),
                result.kind
            ),
            Some(err) if err.is_fatal() => log::error!(
                "[{n}/{}] {}: {err}",
                self.total,
                result.source.display()
            ),
            Some(err) => log::warn!(
                "[{n}/{}] {}: {err}",
                self.total,
                result.source.display()
            ),
        }
    }
}

/// Convert every WebP file below `root`.
///
/// Options are validated before the directory is touched. Per-file failures
/// are counted, never propagated; only traversal and pool setup errors abort.
pub fn process_directory(
    root: &Path,
    options: &ProcessOptions,
) -> Result<RunStatistics, ConvertError> {
    options.validate()?;
    let jobs = discover(root)?;
    if jobs.is_empty() {
        log::info!("no WebP files found under {}", root.display());
        return Ok(RunStatistics::default());
    }
    log::info!("found {} WebP file(s) under {}", jobs.len(), root.display());
    process_files(jobs, options)
}

/// Run an explicit job list.
pub fn process_files(
    jobs: Vec<PathBuf>,
    options: &ProcessOptions,
) -> Result<RunStatistics, ConvertError> {
    let workers = options.workers.min(jobs.len());
    let stats = if workers <= 1 {
        run_sequential(jobs, options)
    } else {
        run_parallel(jobs, options, workers)?
    };
    log::info!(
        "done: {} converted ({} static, {} animated), {} failed",
        stats.processed,
        stats.static_count,
        stats.animated_count,
        stats.errors
    );
    Ok(stats)
}

fn run_sequential(jobs: Vec<PathBuf>, options: &ProcessOptions) -> RunStatistics {
    let mut aggregator = Aggregator::new(jobs.len());
    for path in &jobs {
        aggregator.record(&convert::convert_file(path, options));
    }
    aggregator.stats
}

fn run_parallel(
    jobs: Vec<PathBuf>,
    options: &ProcessOptions,
    workers: usize,
) -> Result<RunStatistics, ConvertError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("webp-worker-{i}"))
        .build()
        .map_err(|e| ConvertError::WorkerPool(e.to_string()))?;

    let total = jobs.len();
    let (results, results_iter) = mpsc::sync_channel::<ConversionResult>(workers * 2);
    let aggregator = thread::Builder::new()
        .name("webp-aggregator".into())
        .spawn(move || {
            let mut aggregator = Aggregator::new(total);
            for result in results_iter {
                aggregator.record(&result);
            }
            aggregator.stats
        })
        .map_err(|e| ConvertError::WorkerPool(e.to_string()))?;

    log::debug!("running {total} jobs on {workers} workers");
    pool.scope(|s| {
        for path in jobs {
            let results = results.clone();
            s.spawn(move |_| {
                let result = convert::convert_file(&path, options);
                // The receiver only goes away if the aggregator panicked.
                let _ = results.send(result);
            });
        }
    });
    drop(results);

    aggregator
        .join()
        .map_err(|_| ConvertError::WorkerPool("aggregator thread panicked".into()))
}
