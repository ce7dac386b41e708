//! Build orchestration: deciding which files to analyze, writing artifacts and
//! keeping the per-file output cache current.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rayon::prelude::*;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::analyzer::extract::analyze_file;
use crate::cache::OutputCache;
use crate::config::CodegenConfig;
use crate::emit::{write_aggregate, write_artifact, Emitter};
use crate::error::CodegenError;
use crate::parser::ParserAdapter;
use crate::paths::derive_output_path;

/// Decides whether a file's outputs must be recomputed.
pub trait RegenStrategy: Sync {
    fn is_stale(&self, file: &Path, artifact: &Path) -> bool;

    /// Whether a file that no longer declares enums loses its old artifact.
    fn prunes_stale_outputs(&self) -> bool;
}

/// One file per invocation, driven by an external build system. There is no
/// record of the last run at this granularity, so every call re-analyzes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleFile;

impl RegenStrategy for SingleFile {
    fn is_stale(&self, _file: &Path, _artifact: &Path) -> bool {
        true
    }

    fn prunes_stale_outputs(&self) -> bool {
        false
    }
}

/// Whole-project regeneration into one aggregate file. The aggregate's
/// modification time marks the last run.
///
/// A file that is older than the last run but has no artifact is stale, unless
/// its output record shows it produced nothing when last analyzed.
#[derive(Debug)]
pub struct BatchRegen {
    pub force: bool,
    pub last_regen: Option<SystemTime>,
    records: Option<OutputCache>,
}

impl BatchRegen {
    pub fn new(aggregate: &Path, force: bool) -> Self {
        BatchRegen {
            force,
            last_regen: modified(aggregate),
            records: None,
        }
    }

    /// Keeps per-file output records in `cache`, so files without enums are
    /// not re-parsed on every run.
    pub fn with_records(mut self, cache: OutputCache) -> Self {
        self.records = Some(cache);
        self
    }

    fn recorded_without_outputs(&self, file: &Path, source: Option<SystemTime>) -> bool {
        let Some(cache) = &self.records else {
            return false;
        };
        !needs_regen(false, source, modified(&cache.record_path(file)))
            && cache.read(file).is_some_and(|outputs| outputs.is_empty())
    }

    fn record(&self, file: &Path, outcome: &FileOutcome) -> Result<(), CodegenError> {
        match (&self.records, outcome) {
            (Some(cache), FileOutcome::Generated(artifact)) => cache.write(file, &[artifact.clone()]),
            (Some(cache), FileOutcome::NoEnums(_)) => cache.write(file, &[]),
            _ => Ok(()),
        }
    }
}

impl RegenStrategy for BatchRegen {
    fn is_stale(&self, file: &Path, artifact: &Path) -> bool {
        let source = modified(file);
        if needs_regen(self.force, source, self.last_regen) {
            return true;
        }
        !artifact.is_file() && !self.recorded_without_outputs(file, source)
    }

    fn prunes_stale_outputs(&self) -> bool {
        true
    }
}

/// Re-run when forced, when nothing was generated before, or when the source
/// changed after the last generation. Unknown source times count as changed.
pub fn needs_regen(force: bool, source: Option<SystemTime>, last_regen: Option<SystemTime>) -> bool {
    match (source, last_regen) {
        _ if force => true,
        (Some(source), Some(last)) => source > last,
        _ => true,
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// What processing one file amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Analyzed and the artifact was (re)written.
    Generated(PathBuf),
    /// Up to date; the existing artifact is reused without parsing.
    Current(PathBuf),
    /// Analyzed, no enums. Carries the artifact deleted as stale, if any.
    NoEnums(Option<PathBuf>),
}

impl FileOutcome {
    pub fn artifact(&self) -> Option<&Path> {
        match self {
            FileOutcome::Generated(path) | FileOutcome::Current(path) => Some(path),
            FileOutcome::NoEnums(_) => None,
        }
    }
}

/// Everything a single file needs: configuration and the two collaborators.
pub struct Build<'a> {
    config: &'a CodegenConfig,
    parser: &'a dyn ParserAdapter,
    emitter: &'a dyn Emitter,
}

impl<'a> Build<'a> {
    /// Fails on incomplete configuration before anything is parsed.
    pub fn new(
        config: &'a CodegenConfig,
        parser: &'a dyn ParserAdapter,
        emitter: &'a dyn Emitter,
    ) -> Result<Self, CodegenError> {
        config.validate()?;
        Ok(Build {
            config,
            parser,
            emitter,
        })
    }

    pub fn output_path(&self, file: &Path) -> PathBuf {
        derive_output_path(file, &self.config.source_root, &self.config.output_root)
    }

    /// Brings the artifact of `file` up to date. `stale` comes from the
    /// strategy, computed up front so batches can check timestamps in parallel.
    pub fn process(
        &self,
        file: &Path,
        stale: bool,
        strategy: &dyn RegenStrategy,
    ) -> Result<FileOutcome, CodegenError> {
        let artifact = self.output_path(file);
        if !stale {
            debug!(path = %file.display(), "up to date");
            return Ok(if artifact.is_file() {
                FileOutcome::Current(artifact)
            } else {
                FileOutcome::NoEnums(None)
            });
        }

        let source = analyze_file(self.parser, file, &self.config.environment)?;
        if !source.has_enums() {
            if strategy.prunes_stale_outputs() && artifact.is_file() {
                fs::remove_file(&artifact).map_err(|e| CodegenError::fs(&artifact, e))?;
                debug!(path = %artifact.display(), "removed stale artifact");
                return Ok(FileOutcome::NoEnums(Some(artifact)));
            }
            return Ok(FileOutcome::NoEnums(None));
        }

        let text = self
            .emitter
            .render(&source.enums, source.path(), &source.forward_declares.children)?;
        write_artifact(&artifact, &text)?;
        info!(path = %artifact.display(), enums = source.enums.len(), "generated");
        Ok(FileOutcome::Generated(artifact))
    }
}

/// Analyzes `file` and writes its artifact. Files without enums produce nothing.
#[tracing::instrument(skip_all, fields(path = %file.display()))]
pub fn generate(
    file: &Path,
    config: &CodegenConfig,
    parser: &dyn ParserAdapter,
    emitter: &dyn Emitter,
) -> Result<FileOutcome, CodegenError> {
    Build::new(config, parser, emitter)?.process(file, true, &SingleFile)
}

/// Outputs `file` would produce, in order; empty when it declares no enums.
///
/// With a `cache_dir` the list is also recorded for external tooling.
#[tracing::instrument(skip_all, fields(path = %file.display()))]
pub fn get_output_files(
    file: &Path,
    config: &CodegenConfig,
    parser: &dyn ParserAdapter,
    cache_dir: Option<&Path>,
) -> Result<Vec<PathBuf>, CodegenError> {
    config.validate()?;
    let outputs = analyze_outputs(file, config, parser)?;
    if let Some(cache_dir) = cache_dir {
        OutputCache::new(cache_dir, &config.source_root).write(file, &outputs)?;
    }
    Ok(outputs)
}

/// Answers from the cache record when it is newer than the source, otherwise
/// re-analyzes and refreshes the record.
pub fn cached_output_files(
    file: &Path,
    config: &CodegenConfig,
    parser: &dyn ParserAdapter,
    cache: &OutputCache,
) -> Result<Vec<PathBuf>, CodegenError> {
    config.validate()?;
    let record_time = modified(&cache.record_path(file));
    if !needs_regen(false, modified(file), record_time) {
        if let Some(outputs) = cache.read(file) {
            debug!(path = %file.display(), "answered from cache");
            return Ok(outputs);
        }
    }
    let outputs = analyze_outputs(file, config, parser)?;
    cache.write(file, &outputs)?;
    Ok(outputs)
}

fn analyze_outputs(
    file: &Path,
    config: &CodegenConfig,
    parser: &dyn ParserAdapter,
) -> Result<Vec<PathBuf>, CodegenError> {
    let source = analyze_file(parser, file, &config.environment)?;
    Ok(if source.has_enums() {
        vec![derive_output_path(file, &config.source_root, &config.output_root)]
    } else {
        Vec::new()
    })
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Artifacts included by the aggregate file, in input order
    pub outputs: Vec<PathBuf>,
    pub regenerated: usize,
    pub reused: usize,
    pub removed: usize,
    /// Inputs that did not exist
    pub missing: usize,
}

/// Regenerates stale inputs and rewrites the aggregate file including every
/// artifact.
#[tracing::instrument(skip_all, fields(files = files.len()))]
pub fn run_batch(
    files: &[PathBuf],
    aggregate: &Path,
    strategy: &BatchRegen,
    build: &Build<'_>,
) -> Result<BatchReport, CodegenError> {
    info!(
        "Codegen input: {}",
        files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>().join(" ")
    );
    info!("Build dir: {}", build.config.output_root.display());

    let mut report = BatchReport::default();
    let existing: Vec<&PathBuf> = files.iter().filter(|f| f.is_file()).collect();
    report.missing = files.len() - existing.len();

    let config = build.config;
    let stale: Vec<bool> = existing
        .par_iter()
        .map(|file| {
            let artifact = derive_output_path(file, &config.source_root, &config.output_root);
            strategy.is_stale(file, &artifact)
        })
        .collect();

    for (file, stale) in existing.into_iter().zip(stale) {
        let outcome = build.process(file, stale, strategy)?;
        if stale {
            strategy.record(file, &outcome)?;
        }
        match outcome {
            FileOutcome::Generated(path) => {
                report.regenerated += 1;
                report.outputs.push(path);
            }
            FileOutcome::Current(path) => {
                report.reused += 1;
                report.outputs.push(path);
            }
            FileOutcome::NoEnums(removed) => {
                report.removed += usize::from(removed.is_some());
            }
        }
    }

    write_aggregate(aggregate, &report.outputs)?;
    info!(
        regenerated = report.regenerated,
        reused = report.reused,
        removed = report.removed,
        "wrote {}",
        aggregate.display()
    );
    Ok(report)
}

/// C++ sources and headers under `root`, skipping generated files and build
/// directories. Sorted for a stable aggregate.
pub fn find_all_source_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        let p = entry.path();
        if !p.is_file() {
            continue;
        }
        let relative = p.strip_prefix(root).unwrap_or(p);
        if relative.components().any(|c| {
            let s = c.as_os_str();
            s == ".git" || s == "build" || s == "target"
        }) {
            continue;
        }
        let generated = p
            .file_name()
            .is_some_and(|n| n.to_string_lossy().contains("_codegen"));
        if generated {
            continue;
        }
        if let Some(ext) = p.extension() {
            if ext == "cpp" || ext == "hpp" || ext == "h" {
                out.push(p.to_path_buf());
            }
        }
    }
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn force_always_regenerates() {
        let now = SystemTime::now();
        assert!(needs_regen(true, Some(now - Duration::from_secs(60)), Some(now)));
    }

    #[test]
    fn newer_source_regenerates() {
        let now = SystemTime::now();
        assert!(needs_regen(false, Some(now), Some(now - Duration::from_secs(60))));
        assert!(!needs_regen(false, Some(now - Duration::from_secs(60)), Some(now)));
        assert!(!needs_regen(false, Some(now), Some(now)));
    }

    #[test]
    fn no_previous_run_regenerates() {
        assert!(needs_regen(false, Some(SystemTime::now()), None));
        assert!(needs_regen(false, None, Some(SystemTime::now())));
    }

    #[test]
    fn single_file_is_always_stale() {
        assert!(SingleFile.is_stale(Path::new("a.hpp"), Path::new("out/a_hpp_codegen.cpp")));
        assert!(!SingleFile.prunes_stale_outputs());
    }

    #[test]
    fn batch_without_aggregate_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.hpp");
        fs::write(&source, "enum E { A };").unwrap();
        let strategy = BatchRegen::new(&dir.path().join("missing.cpp"), false);
        assert!(strategy.last_regen.is_none());
        assert!(strategy.is_stale(&source, Path::new("unused")));
    }

    #[test]
    fn batch_with_missing_artifact_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.hpp");
        fs::write(&source, "enum E { A };").unwrap();
        let aggregate = dir.path().join("auto_codegen.cpp");
        fs::write(&aggregate, "").unwrap();
        fs::File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(3600))
            .unwrap();
        let artifact = dir.path().join("a_hpp_codegen.cpp");

        let strategy = BatchRegen::new(&aggregate, false);
        assert!(strategy.is_stale(&source, &artifact));
        fs::write(&artifact, "").unwrap();
        assert!(!strategy.is_stale(&source, &artifact));
    }

    #[test]
    fn recorded_empty_output_counts_as_current() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src/a.hpp");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, "struct S {};").unwrap();
        fs::File::options()
            .write(true)
            .open(&source)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(3600))
            .unwrap();
        let aggregate = dir.path().join("auto_codegen.cpp");
        fs::write(&aggregate, "").unwrap();
        let cache = OutputCache::new(dir.path().join("cache"), dir.path().join("src"));
        cache.write(&source, &[]).unwrap();

        let strategy = BatchRegen::new(&aggregate, false).with_records(cache);
        assert!(!strategy.is_stale(&source, &dir.path().join("a_hpp_codegen.cpp")));
    }

    #[test]
    fn discovers_sources_and_skips_generated() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("game")).unwrap();
        fs::create_dir_all(root.join("build")).unwrap();
        for name in ["a.cpp", "game/b.hpp", "game/c.h", "notes.txt", "a_cpp_codegen.cpp", "build/d.hpp"] {
            fs::write(root.join(name), "").unwrap();
        }
        let found: Vec<_> = find_all_source_files(root)
            .into_iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            found,
            vec![PathBuf::from("a.cpp"), PathBuf::from("game/b.hpp"), PathBuf::from("game/c.h")]
        );
    }
}
