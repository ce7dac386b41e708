use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::analyzer::forward::ForwardDeclareNode;

/// Value used when no constant looks like an error sentinel.
pub const DEFAULT_ERROR_VALUE: i64 = -1;

/// Leading characters stripped from constant names (`eRed`, `kMaxSize`).
const NAME_PREFIXES: &[char] = &['e', 'k'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumConstant {
    pub name: String,
    pub normalized_name: String,
    pub qualified_name: String,
    pub value: i64,
}

impl EnumConstant {
    pub fn new(name: &str, qualified_name: String, value: i64) -> Self {
        EnumConstant {
            name: name.to_string(),
            normalized_name: normalize_name(name).to_string(),
            qualified_name,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumDescriptor {
    pub name: String,
    pub qualified_name: String,
    pub underlying_type: String,
    /// In declaration order.
    pub constants: Vec<EnumConstant>,
    pub error_value: i64,
}

impl EnumDescriptor {
    pub fn new(
        name: &str,
        qualified_name: String,
        underlying_type: String,
        constants: Vec<EnumConstant>,
    ) -> Self {
        let error_value = select_error_value(&constants);
        EnumDescriptor {
            name: name.to_string(),
            qualified_name,
            underlying_type,
            constants,
            error_value,
        }
    }
}

/// Strips one reserved prefix character when the next character is not
/// lowercase: `eFoo` → `Foo`, `kBar` → `Bar`, `eof` → `eof`.
pub fn normalize_name(name: &str) -> &str {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(first), Some(second)) if NAME_PREFIXES.contains(&first) && !second.is_lowercase() => {
            &name[first.len_utf8()..]
        }
        _ => name,
    }
}

fn error_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)invalid|unknown").expect("static pattern"))
}

/// First constant that reads as an error sentinel: a normalized name mentioning
/// "invalid" or "unknown", or the value -1. Defaults to -1.
pub fn select_error_value(constants: &[EnumConstant]) -> i64 {
    constants
        .iter()
        .find(|c| c.value == -1 || error_name_pattern().is_match(&c.normalized_name))
        .map(|c| c.value)
        .unwrap_or(DEFAULT_ERROR_VALUE)
}

/// Where a file stands in the incremental build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    NotAnalyzed,
    NoEnums,
    WithEnums,
}

/// Analysis results for one source file; lives for a single request.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub enums: Vec<EnumDescriptor>,
    pub forward_declares: ForwardDeclareNode,
    pub registered: HashSet<String>,
    pub state: FileState,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SourceFile {
            path: path.into(),
            enums: Vec::new(),
            forward_declares: ForwardDeclareNode::root(),
            registered: HashSet::new(),
            state: FileState::NotAnalyzed,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records `qualified_name`; false when it was already registered.
    pub fn register(&mut self, qualified_name: &str) -> bool {
        self.registered.insert(qualified_name.to_string())
    }

    pub fn has_enums(&self) -> bool {
        !self.enums.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(name: &str, value: i64) -> EnumConstant {
        EnumConstant::new(name, format!("E::{name}"), value)
    }

    #[test]
    fn normalization_strips_at_most_one_prefix() {
        assert_eq!(normalize_name("eFoo"), "Foo");
        assert_eq!(normalize_name("kBar"), "Bar");
        assert_eq!(normalize_name("Baz"), "Baz");
        assert_eq!(normalize_name("eof"), "eof");
        assert_eq!(normalize_name("eeFoo"), "eeFoo");
        assert_eq!(normalize_name("ekFoo"), "ekFoo");
        assert_eq!(normalize_name("kE"), "E");
        assert_eq!(normalize_name("k2D"), "2D");
        assert_eq!(normalize_name("e_Value"), "_Value");
        assert_eq!(normalize_name("e"), "e");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn error_value_matched_by_name() {
        let constants = vec![constant("Unknown", -1), constant("A", 0), constant("B", 1)];
        assert_eq!(select_error_value(&constants), -1);

        let constants = vec![constant("A", 0), constant("eInvalidState", 7), constant("B", 8)];
        assert_eq!(select_error_value(&constants), 7);
    }

    #[test]
    fn error_value_matched_by_minus_one() {
        let constants = vec![constant("A", 0), constant("None", -1)];
        assert_eq!(select_error_value(&constants), -1);
    }

    #[test]
    fn first_match_wins() {
        let constants = vec![constant("Unknown", 100), constant("Invalid", 200)];
        assert_eq!(select_error_value(&constants), 100);
    }

    #[test]
    fn error_value_defaults_to_minus_one() {
        let constants = vec![constant("A", 0), constant("B", 1)];
        assert_eq!(select_error_value(&constants), DEFAULT_ERROR_VALUE);
        assert_eq!(select_error_value(&[]), DEFAULT_ERROR_VALUE);
    }

    #[test]
    fn registration_is_idempotent() {
        let mut file = SourceFile::new("a.hpp");
        assert!(file.register("NS::E"));
        assert!(!file.register("NS::E"));
        assert!(file.register("NS::F"));
        assert_eq!(file.state, FileState::NotAnalyzed);
    }
}
