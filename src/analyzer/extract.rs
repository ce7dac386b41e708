use std::path::Path;

use tracing::{debug, trace};

use super::metadata::{EnumConstant, EnumDescriptor, FileState, SourceFile};
use super::qualify::qualified_name;
use crate::config::CompileEnvironment;
use crate::error::CodegenError;
use crate::parser::{dump_tree, is_in_file, NodeId, NodeKind, ParserAdapter, SyntaxTree};

/// Walks one syntax tree and fills a [`SourceFile`] with the enums declared
/// in it.
struct EnumExtractor<'a> {
    tree: &'a SyntaxTree,
    file: SourceFile,
}

impl<'a> EnumExtractor<'a> {
    fn visit_children(&mut self, id: NodeId) -> Result<(), CodegenError> {
        let tree = self.tree;
        for child in tree.children(id) {
            let node = tree.node(child);
            // declarations pulled in through #include are not ours
            if !is_in_file(node, &self.file.path) {
                continue;
            }
            match (node.kind, node.name()) {
                (NodeKind::EnumDecl, Some(_)) => self.visit_enum(child)?,
                // anonymous enums cannot be named from generated code
                (NodeKind::EnumDecl, None) => {}
                _ => self.visit_children(child)?,
            }
        }
        Ok(())
    }

    fn visit_enum(&mut self, id: NodeId) -> Result<(), CodegenError> {
        let tree = self.tree;
        let qualified = qualified_name(tree, id)?;
        // `enum class E { .. } var;` reports the declaration twice
        if !self.file.register(&qualified) {
            trace!(name = %qualified, "enum already registered");
            return Ok(());
        }

        let node = tree.node(id);
        let name = node.name().unwrap_or_default();
        let underlying_type = node.underlying_type.clone().unwrap_or_else(|| "int".to_string());

        let mut constants = Vec::new();
        for child in tree.children(id) {
            let constant = tree.node(child);
            if constant.kind != NodeKind::EnumConstantDecl {
                continue;
            }
            constants.push(EnumConstant::new(
                constant.name().unwrap_or_default(),
                qualified_name(tree, child)?,
                constant.enum_value.unwrap_or_default(),
            ));
        }

        debug!(name = %qualified, constants = constants.len(), "found enum");
        self.file
            .forward_declares
            .insert_enum(tree, id, &underlying_type)?;
        self.file
            .enums
            .push(EnumDescriptor::new(name, qualified, underlying_type, constants));
        Ok(())
    }
}

/// Collects the enums declared in `path` from an already parsed tree.
pub fn extract_enums(tree: &SyntaxTree, path: &Path) -> Result<SourceFile, CodegenError> {
    let mut extractor = EnumExtractor {
        tree,
        file: SourceFile::new(path),
    };
    extractor.visit_children(tree.root())?;

    let mut file = extractor.file;
    file.state = if file.has_enums() {
        FileState::WithEnums
    } else {
        FileState::NoEnums
    };
    Ok(file)
}

/// Parses and analyzes one file.
///
/// A file the parser rejects comes back with no enums; only errors that are
/// not file-scoped are returned.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn analyze_file(
    parser: &dyn ParserAdapter,
    path: &Path,
    env: &CompileEnvironment,
) -> Result<SourceFile, CodegenError> {
    let tree = match parser.parse(path, env) {
        Ok(tree) => tree,
        Err(err) if err.is_file_scoped() => {
            tracing::warn!("{err}");
            let mut file = SourceFile::new(path);
            file.state = FileState::NoEnums;
            return Ok(file);
        }
        Err(err) => return Err(err),
    };
    trace!("\n{}", dump_tree(&tree, path));
    extract_enums(&tree, path)
}
