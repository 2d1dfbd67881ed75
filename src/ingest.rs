//! Message file discovery and parallel decoding

use crate::decoder::{decode_file, DecodedMessage};
use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use walkdir::WalkDir;

/// A candidate message file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MessageFile {
    /// Size in bytes (first so the derived ordering sorts by size)
    pub size: u64,
    pub path: PathBuf,
}

/// Result of decoding a batch of files
#[derive(Debug, Default)]
pub struct DecodeOutcome {
    /// Decoded messages in input file order
    pub messages: Vec<DecodedMessage>,
    /// One `"Error parsing <path>: <reason>"` line per dropped file
    pub errors: Vec<String>,
    pub elapsed: Duration,
}

impl DecodeOutcome {
    pub fn files_processed(&self) -> usize {
        self.messages.len() + self.errors.len()
    }
}

/// Recursively collect files with the given extension, sorted by (size, path)
///
/// Extension matching is case-insensitive. Unreadable entries are skipped
/// with a warning.
pub fn discover_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<MessageFile>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        bail!("Input directory not found: {}", dir.display());
    }
    let extension = extension.trim_start_matches('.');

    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension));
        if !matches {
            continue;
        }

        let size = entry
            .metadata()
            .with_context(|| format!("Failed to stat {}", entry.path().display()))?
            .len();
        files.push(MessageFile {
            size,
            path: entry.into_path(),
        });
    }

    files.sort();
    info!(count = files.len(), dir = %dir.display(), "discovered message files");
    Ok(files)
}

/// Decode files on a dedicated pool of `workers` threads
///
/// Output order follows input order regardless of which worker finishes
/// first, so repeated runs over the same files feed identical sequences to
/// aggregation.
pub fn decode_files(files: &[MessageFile], workers: usize) -> Result<DecodeOutcome> {
    let start = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("hl7-decode-{i}"))
        .build()
        .context("Failed to build decoder thread pool")?;

    info!(files = files.len(), workers, "decoding message files");

    let results: Vec<std::result::Result<DecodedMessage, String>> = pool.install(|| {
        files
            .par_iter()
            .map(|file| {
                decode_file(&file.path)
                    .map_err(|e| format!("Error parsing {}: {}", file.path.display(), e))
            })
            .collect()
    });

    let mut outcome = DecodeOutcome::default();
    for result in results {
        match result {
            Ok(message) => outcome.messages.push(message),
            Err(error) => {
                warn!("{}", error);
                outcome.errors.push(error);
            }
        }
    }
    outcome.elapsed = start.elapsed();

    info!(
        decoded = outcome.messages.len(),
        failed = outcome.errors.len(),
        "Decoded {} messages in {:.2}s",
        outcome.messages.len(),
        outcome.elapsed.as_secs_f64()
    );
    Ok(outcome)
}
