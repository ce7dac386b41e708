use std::fmt::Write as _;
use std::path::{Path, PathBuf};


use crate::config::CompileEnvironment;
use crate::error::CodegenError;

/// The declaration kinds the analyzer distinguishes. Everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    TranslationUnit,
    Namespace,
    ClassDecl,
    StructDecl,
    EnumDecl,
    EnumConstantDecl,
    Other,
}

/// Index of a node inside its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    /// Spelling; `None` for anonymous declarations.
    pub name: Option<String>,
    pub display_name: Option<String>,
    /// File the declaration was read from; `None` for builtins and the root.
    pub file: Option<PathBuf>,
    pub line: u32,
    pub children: Vec<NodeId>,
    pub semantic_parent: Option<NodeId>,
    /// Value of an enum constant.
    pub enum_value: Option<i64>,
    /// Canonical spelling of an enum's underlying integer type.
    pub underlying_type: Option<String>,
}

impl SyntaxNode {
    pub fn new(kind: NodeKind, name: Option<&str>) -> Self {
        let name = name.filter(|n| !n.is_empty()).map(str::to_string);
        SyntaxNode {
            kind,
            display_name: name.clone(),
            name,
            file: None,
            line: 0,
            children: Vec::new(),
            semantic_parent: None,
            enum_value: None,
            underlying_type: None,
        }
    }

    pub fn in_file(mut self, file: impl Into<PathBuf>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = line;
        self
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.enum_value = Some(value);
        self
    }

    pub fn with_underlying_type(mut self, ty: &str) -> Self {
        self.underlying_type = Some(ty.to_string());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Arena holding one parsed translation unit.
///
/// Lexical structure lives in `children`; `semantic_parent` links point at the
/// enclosing scope, which differs from the lexical parent for out-of-line
/// definitions.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
}

impl SyntaxTree {
    /// Creates a tree holding only the translation-unit root.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.to_string_lossy().into_owned();
        SyntaxTree {
            nodes: vec![SyntaxNode::new(NodeKind::TranslationUnit, Some(&name))],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.0]
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0].children.iter().copied()
    }

    /// Appends `node` as the last lexical child of `parent`. The semantic
    /// parent defaults to `parent` unless the node already names one.
    pub fn push(&mut self, parent: NodeId, mut node: SyntaxNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.semantic_parent.get_or_insert(parent);
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Adds a node that is not reachable through `children`, e.g. a scope that
    /// only appears as somebody's semantic parent.
    pub fn push_detached(&mut self, node: SyntaxNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn set_semantic_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.nodes[id.0].semantic_parent = parent;
    }
}

/// Produces syntax trees from source files.
pub trait ParserAdapter {
    /// Parses `file`. `Err(ParseFailure)` when no tree could be produced.
    fn parse(&self, file: &Path, env: &CompileEnvironment) -> Result<SyntaxTree, CodegenError>;
}

/// Whether a node's location lies in `file`. Parsers may report the path in
/// a longer form than the one requested, so a suffix match is enough.
pub fn is_in_file(node: &SyntaxNode, file: &Path) -> bool {
    match &node.file {
        Some(location) => location == file || location.ends_with(strip_cur_dir(file)),
        None => false,
    }
}

fn strip_cur_dir(path: &Path) -> &Path {
    path.strip_prefix(".").unwrap_or(path)
}

pub trait Visitor {
    /// Returns whether to descend into the node's children.
    fn enter(&mut self, _tree: &SyntaxTree, _id: NodeId) -> bool {
        true
    }
    fn exit(&mut self, _tree: &SyntaxTree, _id: NodeId) {}
}

pub fn traverse(tree: &SyntaxTree, id: NodeId, visitor: &mut dyn Visitor) {
    if visitor.enter(tree, id) {
        for child in tree.children(id) {
            traverse(tree, child, visitor);
        }
    }
    visitor.exit(tree, id);
}

struct TreePrinter<'a> {
    file: &'a Path,
    depth: usize,
    out: String,
}

impl Visitor for TreePrinter<'_> {
    fn enter(&mut self, tree: &SyntaxTree, id: NodeId) -> bool {
        let node = tree.node(id);
        if id != tree.root() && !is_in_file(node, self.file) {
            return false;
        }
        let _ = writeln!(
            self.out,
            "{}{} ({:?})",
            "  ".repeat(self.depth),
            node.display_name.as_deref().unwrap_or(""),
            node.kind
        );
        self.depth += 1;
        true
    }

    fn exit(&mut self, tree: &SyntaxTree, id: NodeId) {
        if id == tree.root() || is_in_file(tree.node(id), self.file) {
            self.depth -= 1;
        }
    }
}

/// Indented listing of the nodes declared in `file`, for debugging.
pub fn dump_tree(tree: &SyntaxTree, file: &Path) -> String {
    let mut printer = TreePrinter {
        file,
        depth: 0,
        out: String::new(),
    };
    traverse(tree, tree.root(), &mut printer);
    printer.out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_links_children_and_semantic_parent() {
        let mut tree = SyntaxTree::new("a.hpp");
        let ns = tree.push(tree.root(), SyntaxNode::new(NodeKind::Namespace, Some("NS")));
        let e = tree.push(ns, SyntaxNode::new(NodeKind::EnumDecl, Some("E")));
        assert_eq!(tree.children(tree.root()).collect::<Vec<_>>(), vec![ns]);
        assert_eq!(tree.node(e).semantic_parent, Some(ns));
        assert_eq!(tree.node(ns).semantic_parent, Some(tree.root()));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn empty_names_are_anonymous() {
        let node = SyntaxNode::new(NodeKind::EnumDecl, Some(""));
        assert_eq!(node.name(), None);
    }

    #[test]
    fn location_matching_accepts_longer_paths() {
        let node = SyntaxNode::new(NodeKind::EnumDecl, Some("E")).in_file("/work/src/a.hpp", 3);
        assert!(is_in_file(&node, Path::new("src/a.hpp")));
        assert!(is_in_file(&node, Path::new("./src/a.hpp")));
        assert!(!is_in_file(&node, Path::new("src/b.hpp")));
        assert!(!is_in_file(&SyntaxNode::new(NodeKind::Other, None), Path::new("src/a.hpp")));
    }

    #[test]
    fn dump_skips_included_nodes() {
        let mut tree = SyntaxTree::new("a.hpp");
        let root = tree.root();
        tree.push(root, SyntaxNode::new(NodeKind::EnumDecl, Some("Outside")).in_file("b.hpp", 1));
        let ns = tree.push(root, SyntaxNode::new(NodeKind::Namespace, Some("NS")).in_file("a.hpp", 1));
        tree.push(ns, SyntaxNode::new(NodeKind::EnumDecl, Some("Inside")).in_file("a.hpp", 2));

        let dump = dump_tree(&tree, Path::new("a.hpp"));
        assert!(dump.contains("  NS (Namespace)"));
        assert!(dump.contains("    Inside (EnumDecl)"));
        assert!(!dump.contains("Outside"));
    }
}
