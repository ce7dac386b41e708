//! Rendering of analysis results into C++ source text.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::analyzer::forward::ForwardDeclareNode;
use crate::analyzer::metadata::EnumDescriptor;
use crate::error::CodegenError;
use crate::paths::normalize;

/// Turns the enums of one file into generated text.
///
/// Implementations receive everything they need; the build layer does not
/// care what syntax comes out.
pub trait Emitter {
    fn render(
        &self,
        enums: &[EnumDescriptor],
        source: &Path,
        forward_declares: &[ForwardDeclareNode],
    ) -> Result<String, CodegenError>;
}

/// Header providing the `TEnumReflection` template the tables specialize.
pub const REFLECTION_HEADER: &str = "codegen/EnumReflection.h";

/// Emits `TEnumReflection<T>` name tables and error values.
#[derive(Debug, Clone)]
pub struct ReflectionEmitter {
    pub header: String,
}

impl Default for ReflectionEmitter {
    fn default() -> Self {
        ReflectionEmitter {
            header: REFLECTION_HEADER.to_string(),
        }
    }
}

impl Emitter for ReflectionEmitter {
    fn render(
        &self,
        enums: &[EnumDescriptor],
        source: &Path,
        forward_declares: &[ForwardDeclareNode],
    ) -> Result<String, CodegenError> {
        let mut out = String::new();
        write_reflection(&mut out, &self.header, enums, source, forward_declares)
            .map_err(|e| CodegenError::Render(e.to_string()))?;
        Ok(out)
    }
}

fn write_reflection(
    out: &mut String,
    header: &str,
    enums: &[EnumDescriptor],
    source: &Path,
    forward_declares: &[ForwardDeclareNode],
) -> std::fmt::Result {
    writeln!(out, "// Generated from {}. Do not edit.", include_path(source))?;
    writeln!(out, "#include <{header}>")?;
    writeln!(out)?;
    for declaration in forward_declares {
        out.push_str(&declaration.render(0));
    }

    for descriptor in enums {
        let ty = &descriptor.qualified_name;
        writeln!(out)?;
        writeln!(out, "template<> const CEnumNameMap TEnumReflection<{ty}>::skNameMap = {{")?;
        for constant in &descriptor.constants {
            writeln!(out, "\t{{ (int) {}, \"{}\" }},", constant.value, constant.normalized_name)?;
        }
        writeln!(out, "}};")?;
        writeln!(
            out,
            "template<> const int TEnumReflection<{ty}>::skErrorValue = (int) {};",
            descriptor.error_value
        )?;
    }
    Ok(())
}

/// Emits the analysis result as JSON, for inspecting what a file declares.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEmitter;

#[derive(Serialize)]
struct AnalysisOut<'a> {
    source: String,
    enums: &'a [EnumDescriptor],
    forward_declares: &'a [ForwardDeclareNode],
}

impl Emitter for JsonEmitter {
    fn render(
        &self,
        enums: &[EnumDescriptor],
        source: &Path,
        forward_declares: &[ForwardDeclareNode],
    ) -> Result<String, CodegenError> {
        let out = AnalysisOut {
            source: include_path(source),
            enums,
            forward_declares,
        };
        serde_json::to_string_pretty(&out).map_err(|e| CodegenError::Render(e.to_string()))
    }
}

/// Forward slashes regardless of platform, as `#include` expects.
fn include_path(path: &Path) -> String {
    normalize(path).to_string_lossy().replace('\\', "/")
}

/// Writes a generated file, creating its directory first.
pub fn write_artifact(path: &Path, text: &str) -> Result<(), CodegenError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| CodegenError::fs(dir, e))?;
    }
    fs::write(path, text).map_err(|e| CodegenError::fs(path, e))
}

/// Text of the batch aggregate file: one `#include` per artifact.
pub fn render_aggregate(artifacts: &[PathBuf]) -> String {
    let mut out = String::new();
    out.push_str("#pragma warning( push )\n");
    // C4146: unary minus applied to unsigned type
    out.push_str("#pragma warning( disable : 4146 )\n");
    for artifact in artifacts {
        out.push_str(&format!("#include \"{}\"\n", include_path(artifact)));
    }
    out.push_str("#pragma warning( pop )\n");
    out
}

pub fn write_aggregate(path: &Path, artifacts: &[PathBuf]) -> Result<(), CodegenError> {
    write_artifact(path, &render_aggregate(artifacts))
}
