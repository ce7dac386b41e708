use crate::error::CodegenError;
use crate::parser::{NodeId, NodeKind, SyntaxTree};

pub const SCOPE_SEPARATOR: &str = "::";

/// Name of `id` prefixed by every named enclosing scope, outermost first.
///
/// Anonymous scopes are walked through without adding a segment.
pub fn qualified_name(tree: &SyntaxTree, id: NodeId) -> Result<String, CodegenError> {
    let node = tree.node(id);
    let mut segments = vec![node.name().unwrap_or_default()];

    for scope in scope_chain(tree, id)? {
        if let Some(name) = tree.node(scope).name() {
            segments.push(name);
        }
    }
    segments.reverse();
    Ok(segments.join(SCOPE_SEPARATOR))
}

/// Semantic ancestors of `id`, nearest first, excluding the translation unit.
///
/// Fails when the chain runs out before reaching a translation unit.
pub fn scope_chain(tree: &SyntaxTree, id: NodeId) -> Result<Vec<NodeId>, CodegenError> {
    let mut chain = Vec::new();
    let mut current = tree.node(id).semantic_parent;
    loop {
        let Some(parent) = current else {
            return Err(CodegenError::MalformedScopeChain {
                name: tree.node(id).name().unwrap_or("<anonymous>").to_string(),
            });
        };
        let node = tree.node(parent);
        if node.kind == NodeKind::TranslationUnit {
            return Ok(chain);
        }
        if chain.len() > tree.len() {
            // a cycle; the arena cannot hold a deeper legitimate chain
            return Err(CodegenError::MalformedScopeChain {
                name: tree.node(id).name().unwrap_or("<anonymous>").to_string(),
            });
        }
        chain.push(parent);
        current = node.semantic_parent;
    }
}
