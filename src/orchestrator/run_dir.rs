//! Run directory naming and lookup
//!
//! Run directories are named `run_<preset>_<YYYYMMDD_HHMMSS>`. The timestamp
//! sorts lexicographically, so the latest run is the greatest name.

use chrono::{DateTime, Local, NaiveDateTime};
use std::io;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Directory name for a run of `preset_key` started at `started`
pub fn run_dir_name(preset_key: &str, started: DateTime<Local>) -> String {
    format!("run_{}_{}", preset_key, started.format(TIMESTAMP_FORMAT))
}

/// Returns true if `name` is a run directory of exactly `preset_key`
///
/// `run_site_b_20240101_000000` belongs to preset `site_b`, not `site`.
pub fn is_run_dir_of(name: &str, preset_key: &str) -> bool {
    name.strip_prefix("run_")
        .and_then(|rest| rest.strip_prefix(preset_key))
        .and_then(|rest| rest.strip_prefix('_'))
        .map(|stamp| NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_ok())
        .unwrap_or(false)
}

/// Existing run directories of `preset_key`, oldest first
pub fn existing_run_dirs(output_dir: &Path, preset_key: &str) -> io::Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(output_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_run_dir_of(name, preset_key) {
                dirs.push(entry.path());
            }
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Latest existing run directory of `preset_key`
pub fn latest_run_dir(output_dir: &Path, preset_key: &str) -> io::Result<Option<PathBuf>> {
    Ok(existing_run_dirs(output_dir, preset_key)?.pop())
}

/// Creates a fresh run directory for `preset_key`
pub fn create_run_dir(output_dir: &Path, preset_key: &str) -> io::Result<PathBuf> {
    let path = output_dir.join(run_dir_name(preset_key, Local::now()));
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

/// Removes every run directory of `preset_key`, returning how many were removed
pub fn remove_run_dirs(output_dir: &Path, preset_key: &str) -> io::Result<usize> {
    let dirs = existing_run_dirs(output_dir, preset_key)?;
    for dir in &dirs {
        tracing::info!("Removing existing run directory {}", dir.display());
        std::fs::remove_dir_all(dir)?;
    }
    Ok(dirs.len())
}
