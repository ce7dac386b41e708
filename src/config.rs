//! Per-invocation configuration. Nothing here is global; every entry point
//! takes the values it needs explicitly.

use std::path::{Path, PathBuf};

use crate::error::CodegenError;

/// Flags passed to the parser for every file.
///
/// Standard and builtin includes are disabled: parsing is much faster and the
/// extractor only looks at declarations in the file itself. Project headers
/// still resolve through the include paths.
pub const BASE_COMPILER_ARGS: &[&str] = &[
    "-x",
    "c++",
    "-std=c++17",
    "-nobuiltininc",
    "-nostdinc",
    "-nostdinc++",
    "-DIS_CODEGEN_SCRIPT=1",
];

/// Compilation environment handed to the parser adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileEnvironment {
    pub include_paths: Vec<PathBuf>,
}

impl CompileEnvironment {
    pub fn new(include_paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            include_paths: include_paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Full argument vector: the fixed flags followed by one `-I` per include path.
    pub fn compiler_args(&self) -> Vec<String> {
        BASE_COMPILER_ARGS
            .iter()
            .map(|s| s.to_string())
            .chain(
                self.include_paths
                    .iter()
                    .map(|p| format!("-I{}", p.display())),
            )
            .collect()
    }
}

/// Paths every operation needs.
#[derive(Debug, Clone, Default)]
pub struct CodegenConfig {
    /// Location of the libclang shared library.
    pub parser_library: PathBuf,
    /// Root that source paths are made relative to.
    pub source_root: PathBuf,
    /// Root that generated artifacts are written under.
    pub output_root: PathBuf,
    pub environment: CompileEnvironment,
}

impl CodegenConfig {
    /// Rejects configurations missing a required path. Runs before any parsing.
    pub fn validate(&self) -> Result<(), CodegenError> {
        if is_blank(&self.parser_library) {
            return Err(CodegenError::MissingConfiguration("parser library path"));
        }
        if is_blank(&self.source_root) {
            return Err(CodegenError::MissingConfiguration("source root"));
        }
        if is_blank(&self.output_root) {
            return Err(CodegenError::MissingConfiguration("output root"));
        }
        Ok(())
    }
}

fn is_blank(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> CodegenConfig {
        CodegenConfig {
            parser_library: PathBuf::from("/usr/lib/libclang.so"),
            source_root: PathBuf::from("src"),
            output_root: PathBuf::from("out"),
            environment: CompileEnvironment::default(),
        }
    }

    #[test]
    fn compiler_args_append_include_paths() {
        let env = CompileEnvironment::new(["include", "third_party/include"]);
        let args = env.compiler_args();
        assert_eq!(&args[..BASE_COMPILER_ARGS.len()], BASE_COMPILER_ARGS);
        assert_eq!(args[args.len() - 2], "-Iinclude");
        assert_eq!(args[args.len() - 1], "-Ithird_party/include");
    }

    #[test]
    fn complete_config_validates() {
        assert!(complete().validate().is_ok());
    }

    #[test]
    fn missing_paths_are_rejected() {
        let mut cfg = complete();
        cfg.parser_library = PathBuf::new();
        assert!(matches!(
            cfg.validate(),
            Err(CodegenError::MissingConfiguration("parser library path"))
        ));

        let mut cfg = complete();
        cfg.source_root = PathBuf::new();
        assert!(matches!(
            cfg.validate(),
            Err(CodegenError::MissingConfiguration("source root"))
        ));

        let mut cfg = complete();
        cfg.output_root = PathBuf::new();
        assert!(matches!(
            cfg.validate(),
            Err(CodegenError::MissingConfiguration("output root"))
        ));
    }
}
