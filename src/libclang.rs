//! [`ParserAdapter`] backed by libclang.
//!
//! The shared library is loaded at runtime from the configured path, so the
//! binary itself does not link against any particular LLVM install.

use std::collections::HashMap;
use std::path::Path;

use clang::{Clang, Entity, EntityKind, Index};
use tracing::debug;

use crate::config::CompileEnvironment;
use crate::error::CodegenError;
use crate::parser::{NodeId, NodeKind, ParserAdapter, SyntaxNode, SyntaxTree};

/// Owns the loaded libclang instance. Only one may exist per process, and the
/// library stays loaded until the parser is dropped.
pub struct ClangParser {
    clang: Clang,
}

impl ClangParser {
    /// Loads libclang from `library`, either the library file or its directory.
    pub fn new(library: impl AsRef<Path>) -> Result<Self, CodegenError> {
        let library = library.as_ref();
        // clang-sys resolves the runtime library through LIBCLANG_PATH
        std::env::set_var("LIBCLANG_PATH", library);
        let clang = Clang::new().map_err(|reason| CodegenError::ParserUnavailable {
            path: library.to_path_buf(),
            reason,
        })?;
        debug!(library = %library.display(), "loaded libclang");
        Ok(ClangParser { clang })
    }
}

impl ParserAdapter for ClangParser {
    fn parse(&self, file: &Path, env: &CompileEnvironment) -> Result<SyntaxTree, CodegenError> {
        let failure = |reason: String| CodegenError::ParseFailure {
            path: file.to_path_buf(),
            reason,
        };

        let index = Index::new(&self.clang, false, false);
        let unit = index
            .parser(file)
            .arguments(&env.compiler_args())
            .skip_function_bodies(true)
            .parse()
            .map_err(|e| failure(e.to_string()))?;

        let mut lowering = Lowering {
            tree: SyntaxTree::new(file),
            ids: HashMap::new(),
        };
        let root_entity = unit.get_entity();
        lowering.ids.insert(root_entity, lowering.tree.root());
        lowering.lower_children(root_entity, lowering.tree.root());
        lowering.link_semantic_parents();
        debug!(path = %file.display(), nodes = lowering.tree.len(), "parsed translation unit");
        Ok(lowering.tree)
    }
}

fn node_kind(kind: EntityKind) -> NodeKind {
    match kind {
        EntityKind::TranslationUnit => NodeKind::TranslationUnit,
        EntityKind::Namespace => NodeKind::Namespace,
        EntityKind::ClassDecl => NodeKind::ClassDecl,
        EntityKind::StructDecl => NodeKind::StructDecl,
        EntityKind::EnumDecl => NodeKind::EnumDecl,
        EntityKind::EnumConstantDecl => NodeKind::EnumConstantDecl,
        _ => NodeKind::Other,
    }
}

/// Copies a libclang cursor tree into an owned [`SyntaxTree`].
struct Lowering<'tu> {
    tree: SyntaxTree,
    ids: HashMap<Entity<'tu>, NodeId>,
}

impl<'tu> Lowering<'tu> {
    fn convert(entity: Entity<'tu>) -> SyntaxNode {
        let kind = node_kind(entity.get_kind());
        let name = entity.get_name();
        let mut node = SyntaxNode::new(kind, name.as_deref());
        node.display_name = entity.get_display_name();

        if let Some(location) = entity.get_location() {
            let location = location.get_file_location();
            if let Some(file) = location.file {
                node = node.in_file(file.get_path(), location.line);
            }
        }

        match kind {
            NodeKind::EnumConstantDecl => {
                node.enum_value = entity.get_enum_constant_value().map(|(signed, _)| signed);
            }
            NodeKind::EnumDecl => {
                node.underlying_type = entity
                    .get_enum_underlying_type()
                    .map(|ty| ty.get_canonical_type().get_display_name());
            }
            _ => {}
        }
        node
    }

    fn lower_children(&mut self, entity: Entity<'tu>, parent: NodeId) {
        for child in entity.get_children() {
            let id = self.tree.push(parent, Self::convert(child));
            self.ids.insert(child, id);
            self.lower_children(child, id);
        }
    }

    fn link_semantic_parents(&mut self) {
        let entities: Vec<(Entity<'tu>, NodeId)> = self.ids.iter().map(|(e, id)| (*e, *id)).collect();
        for (entity, id) in entities {
            if id == self.tree.root() {
                continue;
            }
            let parent = entity.get_semantic_parent().map(|p| self.intern(p));
            self.tree.set_semantic_parent(id, parent);
        }
    }

    /// Id for `entity`, adding it (and its own scope chain) as detached nodes
    /// when the lexical walk never reached it.
    fn intern(&mut self, entity: Entity<'tu>) -> NodeId {
        if let Some(id) = self.ids.get(&entity) {
            return *id;
        }
        let id = self.tree.push_detached(Self::convert(entity));
        self.ids.insert(entity, id);
        let parent = entity.get_semantic_parent().map(|p| self.intern(p));
        self.tree.set_semantic_parent(id, parent);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_is_unavailable() {
        let err = ClangParser::new("/nonexistent/libclang.so").err().unwrap();
        assert!(matches!(err, CodegenError::ParserUnavailable { .. }));
        assert!(!err.is_file_scoped());
    }
}
