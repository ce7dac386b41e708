use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::CodegenError;
use crate::paths::derive_cache_path;

/// Separator between output paths in a record. A record read as a whole is a
/// CMake list.
pub const RECORD_SEPARATOR: &str = ";";

/// Persistent per-file output records, one file per source file holding the
/// generated artifact paths joined with `;` (empty when there are none).
///
/// External build tooling reads these to learn what a file produces without
/// running the parser. Reads are fail-safe: a missing or unreadable record is
/// a miss and the caller re-analyzes. Writes propagate their errors.
#[derive(Debug)]
pub struct OutputCache {
    /// Records already read or written during this run, by record path
    memory_cache: DashMap<PathBuf, Vec<PathBuf>>,
    cache_dir: PathBuf,
    source_root: PathBuf,
}

impl OutputCache {
    pub fn new(cache_dir: impl AsRef<Path>, source_root: impl AsRef<Path>) -> Self {
        Self {
            memory_cache: DashMap::new(),
            cache_dir: cache_dir.as_ref().to_path_buf(),
            source_root: source_root.as_ref().to_path_buf(),
        }
    }

    /// Location of the record for `file`.
    pub fn record_path(&self, file: &Path) -> PathBuf {
        derive_cache_path(&self.cache_dir, file, &self.source_root)
    }

    /// Recorded outputs of `file`, in production order, if a record exists.
    pub fn read(&self, file: &Path) -> Option<Vec<PathBuf>> {
        let record_path = self.record_path(file);

        if let Some(entry) = self.memory_cache.get(&record_path) {
            return Some(entry.value().clone());
        }

        let data = match fs::read_to_string(&record_path) {
            Ok(data) => data,
            Err(err) => {
                debug!(path = %record_path.display(), "no usable cache record: {err}");
                return None;
            }
        };
        let outputs = parse_record(&data);
        self.memory_cache.insert(record_path, outputs.clone());
        Some(outputs)
    }

    /// Stores the output list for `file`, creating directories as needed.
    pub fn write(&self, file: &Path, outputs: &[PathBuf]) -> Result<(), CodegenError> {
        let record_path = self.record_path(file);
        if let Some(dir) = record_path.parent() {
            fs::create_dir_all(dir).map_err(|e| CodegenError::fs(dir, e))?;
        }
        fs::write(&record_path, format_record(outputs))
            .map_err(|e| CodegenError::fs(&record_path, e))?;

        debug!(path = %record_path.display(), outputs = outputs.len(), "wrote cache record");
        self.memory_cache.insert(record_path, outputs.to_vec());
        Ok(())
    }
}

fn format_record(outputs: &[PathBuf]) -> String {
    outputs
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join(RECORD_SEPARATOR)
}

fn parse_record(data: &str) -> Vec<PathBuf> {
    data.trim_end_matches(['\r', '\n'])
        .split(RECORD_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}
