//! Forward-declaration tree: the minimal nest of scope and enum stubs that lets
//! generated code name an enum without including the header declaring it.

use std::fmt::Write as _;

use serde::Serialize;

use crate::analyzer::qualify::scope_chain;
use crate::error::CodegenError;
use crate::parser::{NodeId, NodeKind, SyntaxTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeclKind {
    Namespace,
    Struct,
    Enum,
}

impl DeclKind {
    pub fn keyword(self) -> &'static str {
        match self {
            DeclKind::Namespace => "namespace",
            DeclKind::Struct => "struct",
            DeclKind::Enum => "enum",
        }
    }

    /// Classes and structs are both stubbed as `struct`.
    fn from_scope(kind: NodeKind) -> Option<Self> {
        match kind {
            NodeKind::Namespace => Some(DeclKind::Namespace),
            NodeKind::ClassDecl | NodeKind::StructDecl => Some(DeclKind::Struct),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardDeclareNode {
    pub kind: DeclKind,
    /// Empty only for the per-file root.
    pub name: String,
    pub underlying_type: Option<String>,
    pub children: Vec<ForwardDeclareNode>,
}

impl ForwardDeclareNode {
    pub fn root() -> Self {
        ForwardDeclareNode {
            kind: DeclKind::Namespace,
            name: String::new(),
            underlying_type: None,
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    /// Child keyed by `(kind, name)`, created at the end if missing.
    pub fn child(&mut self, kind: DeclKind, name: &str, underlying_type: Option<&str>) -> &mut Self {
        let index = match self
            .children
            .iter()
            .position(|c| c.kind == kind && c.name == name)
        {
            Some(index) => index,
            None => {
                self.children.push(ForwardDeclareNode {
                    kind,
                    name: name.to_string(),
                    underlying_type: underlying_type.map(str::to_string),
                    children: Vec::new(),
                });
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    /// Registers the scope chain of enum `id` and the enum leaf itself.
    ///
    /// Anonymous scopes are left out since a stub cannot reopen them.
    pub fn insert_enum(
        &mut self,
        tree: &SyntaxTree,
        id: NodeId,
        underlying_type: &str,
    ) -> Result<(), CodegenError> {
        let mut chain = scope_chain(tree, id)?;
        chain.reverse();

        let mut declaration = self;
        for scope in chain {
            let node = tree.node(scope);
            let (Some(kind), Some(name)) = (DeclKind::from_scope(node.kind), node.name()) else {
                continue;
            };
            declaration = declaration.child(kind, name, None);
        }

        let name = tree.node(id).name().unwrap_or_default();
        let underlying = Some(underlying_type).filter(|t| !t.is_empty());
        declaration.child(DeclKind::Enum, name, underlying);
        Ok(())
    }

    /// C++ text for this node and its children, tab-indented from `depth`.
    pub fn render(&self, depth: usize) -> String {
        let mut out = String::new();
        self.render_into(&mut out, depth);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        if self.is_root() {
            for child in &self.children {
                child.render_into(out, depth);
            }
            return;
        }

        let indent = "\t".repeat(depth);
        let suffix = self
            .underlying_type
            .as_deref()
            .map(|t| format!(" : {t}"))
            .unwrap_or_default();
        if self.children.is_empty() {
            let _ = writeln!(out, "{indent}{} {}{suffix};", self.kind.keyword(), self.name);
            return;
        }

        let _ = writeln!(out, "{indent}{} {}{suffix} {{", self.kind.keyword(), self.name);
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
        let close = if self.kind == DeclKind::Struct { "};" } else { "}" };
        let _ = writeln!(out, "{indent}{close}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SyntaxNode;

    #[test]
    fn shared_namespace_is_merged() {
        let mut tree = SyntaxTree::new("a.hpp");
        let ns = tree.push(tree.root(), SyntaxNode::new(NodeKind::Namespace, Some("NS")));
        let a = tree.push(ns, SyntaxNode::new(NodeKind::EnumDecl, Some("A")));
        let b = tree.push(ns, SyntaxNode::new(NodeKind::EnumDecl, Some("B")));

        let mut root = ForwardDeclareNode::root();
        root.insert_enum(&tree, a, "int").unwrap();
        root.insert_enum(&tree, b, "unsigned char").unwrap();

        assert_eq!(root.children.len(), 1);
        let ns_node = &root.children[0];
        assert_eq!((ns_node.kind, ns_node.name.as_str()), (DeclKind::Namespace, "NS"));
        let leaves: Vec<_> = ns_node.children.iter().map(|c| (c.kind, c.name.as_str())).collect();
        assert_eq!(leaves, vec![(DeclKind::Enum, "A"), (DeclKind::Enum, "B")]);
        assert_eq!(ns_node.children[1].underlying_type.as_deref(), Some("unsigned char"));
    }

    #[test]
    fn class_and_struct_map_to_struct() {
        let mut tree = SyntaxTree::new("a.hpp");
        let ns = tree.push(tree.root(), SyntaxNode::new(NodeKind::Namespace, Some("Game")));
        let class = tree.push(ns, SyntaxNode::new(NodeKind::ClassDecl, Some("Actor")));
        let e = tree.push(class, SyntaxNode::new(NodeKind::EnumDecl, Some("State")));

        let mut root = ForwardDeclareNode::root();
        root.insert_enum(&tree, e, "int").unwrap();
        assert_eq!(root.children[0].children[0].kind, DeclKind::Struct);
        assert_eq!(root.children[0].children[0].children[0].name, "State");
    }

    #[test]
    fn top_level_enum_hangs_off_root() {
        let mut tree = SyntaxTree::new("a.hpp");
        let e = tree.push(tree.root(), SyntaxNode::new(NodeKind::EnumDecl, Some("Color")));
        let mut root = ForwardDeclareNode::root();
        root.insert_enum(&tree, e, "int").unwrap();
        assert_eq!(root.render(0), "enum Color : int;\n");
    }

    #[test]
    fn namespace_and_struct_with_same_name_stay_distinct() {
        let mut root = ForwardDeclareNode::root();
        root.child(DeclKind::Namespace, "X", None);
        root.child(DeclKind::Struct, "X", None);
        root.child(DeclKind::Namespace, "X", None);
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn renders_nested_stubs() {
        let mut tree = SyntaxTree::new("a.hpp");
        let ns = tree.push(tree.root(), SyntaxNode::new(NodeKind::Namespace, Some("Game")));
        let class = tree.push(ns, SyntaxNode::new(NodeKind::ClassDecl, Some("Actor")));
        let state = tree.push(class, SyntaxNode::new(NodeKind::EnumDecl, Some("State")));
        let team = tree.push(ns, SyntaxNode::new(NodeKind::EnumDecl, Some("Team")));

        let mut root = ForwardDeclareNode::root();
        root.insert_enum(&tree, state, "int").unwrap();
        root.insert_enum(&tree, team, "unsigned int").unwrap();

        let expected = "namespace Game {\n\
                        \tstruct Actor {\n\
                        \t\tenum State : int;\n\
                        \t};\n\
                        \tenum Team : unsigned int;\n\
                        }\n";
        assert_eq!(root.render(0), expected);
    }
}
