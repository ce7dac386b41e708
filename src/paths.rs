//! Deterministic locations for generated artifacts and cache records.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Suffix appended to every generated artifact name.
pub const CODEGEN_SUFFIX: &str = "_codegen.cpp";

/// Extension of per-file output cache records.
pub const CACHE_RECORD_EXT: &str = ".outputs";

/// `output_root / <dir of file relative to source_root> / <stem>_<ext>_codegen.cpp`.
///
/// Keeping the original extension in the name stops `a.h` and `a.hpp` from
/// writing to the same artifact.
pub fn derive_output_path(file: &Path, source_root: &Path, output_root: &Path) -> PathBuf {
    let relative = relative_to(file, source_root);
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = relative
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut out = output_root.to_path_buf();
    if let Some(dir) = relative.parent().filter(|d| !d.as_os_str().is_empty()) {
        out.push(dir);
    }
    out.push(format!("{stem}_{ext}{CODEGEN_SUFFIX}"));
    out
}

/// `cache_dir / <file relative to source_root>.outputs`.
pub fn derive_cache_path(cache_dir: &Path, file: &Path, source_root: &Path) -> PathBuf {
    let mut name: OsString = relative_to(file, source_root).into_os_string();
    name.push(CACHE_RECORD_EXT);
    normalize(&cache_dir.join(name))
}

/// Lexical path from `base` to `path`, with `..` segments when `path` lies
/// outside `base`. When only one side is absolute both are resolved against
/// the current directory first.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let (path, base) = if path.is_absolute() == base.is_absolute() {
        (normalize(path), normalize(base))
    } else {
        (normalize(&absolute(path)), normalize(&absolute(base)))
    };

    let path: Vec<Component> = path.components().collect();
    let base: Vec<Component> = base.components().collect();
    let common = path
        .iter()
        .zip(&base)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base.len() {
        out.push("..");
    }
    for component in &path[common..] {
        out.push(component);
    }
    out
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Resolves `.` and `..` without touching the file system.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_for_top_level_file() {
        assert_eq!(
            derive_output_path(Path::new("src/foo.hpp"), Path::new("src"), Path::new("out")),
            PathBuf::from("out/foo_hpp_codegen.cpp")
        );
    }

    #[test]
    fn output_path_keeps_relative_directory() {
        assert_eq!(
            derive_output_path(
                Path::new("src/game/actor/state.h"),
                Path::new("src"),
                Path::new("build/codegen")
            ),
            PathBuf::from("build/codegen/game/actor/state_h_codegen.cpp")
        );
    }

    #[test]
    fn extensions_never_collide() {
        let root = Path::new("src");
        let out = Path::new("out");
        let h = derive_output_path(Path::new("src/a.h"), root, out);
        let hpp = derive_output_path(Path::new("src/a.hpp"), root, out);
        let cpp = derive_output_path(Path::new("src/a.cpp"), root, out);
        assert_ne!(h, hpp);
        assert_ne!(hpp, cpp);
        assert_eq!(cpp, PathBuf::from("out/a_cpp_codegen.cpp"));
    }

    #[test]
    fn file_without_extension() {
        assert_eq!(
            derive_output_path(Path::new("src/Makefile"), Path::new("src"), Path::new("out")),
            PathBuf::from("out/Makefile__codegen.cpp")
        );
    }

    #[test]
    fn absolute_paths_resolve_against_each_other() {
        assert_eq!(
            derive_output_path(
                Path::new("/repo/src/core/types.hpp"),
                Path::new("/repo/src"),
                Path::new("/repo/out")
            ),
            PathBuf::from("/repo/out/core/types_hpp_codegen.cpp")
        );
    }

    #[test]
    fn mixed_absolute_and_relative() {
        let cwd = std::env::current_dir().unwrap();
        let file = cwd.join("src/foo.hpp");
        assert_eq!(
            derive_output_path(&file, Path::new("src"), Path::new("out")),
            PathBuf::from("out/foo_hpp_codegen.cpp")
        );
    }

    #[test]
    fn relative_to_walks_out_of_base() {
        assert_eq!(
            relative_to(Path::new("lib/x.hpp"), Path::new("src")),
            PathBuf::from("../lib/x.hpp")
        );
        assert_eq!(
            relative_to(Path::new("./src/./a/../b.hpp"), Path::new("src")),
            PathBuf::from("b.hpp")
        );
    }

    #[test]
    fn cache_path_mirrors_source_layout() {
        assert_eq!(
            derive_cache_path(Path::new("cache"), Path::new("src/game/actor.hpp"), Path::new("src")),
            PathBuf::from("cache/game/actor.hpp.outputs")
        );
    }
}
