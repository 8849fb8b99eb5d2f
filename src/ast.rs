//! Arena-based model of a resolved Kotlin-like syntax tree.
//!
//! The engine never parses source text. A frontend (or a test fixture)
//! assembles an [`Ast`] through [`AstBuilder`] and attaches resolution data
//! separately via [`crate::semantics::SemanticModel`]. Nodes are addressed by
//! [`NodeId`] so both structures can reference the same tree without sharing
//! ownership.

use serde::{Deserialize, Serialize};

/// Index of a node inside an [`Ast`] arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(pub u32);

/// Source range of a node, 1-based lines and columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl TextRange {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// A whole-line range, handy for synthetic fixtures.
    pub fn line(line: u32) -> Self {
        Self {
            start_line: line,
            start_col: 1,
            end_line: line,
            end_col: 200,
        }
    }

    /// Whether the two ranges share at least one position.
    pub fn overlaps(&self, other: &TextRange) -> bool {
        let starts_before_other_ends = (self.start_line, self.start_col)
            <= (other.end_line, other.end_col);
        let other_starts_before_self_ends = (other.start_line, other.start_col)
            <= (self.end_line, self.end_col);
        starts_before_other_ends && other_starts_before_self_ends
    }
}

/// One entry of a string template: either literal text or an interpolated
/// expression (`"a${x}b"` has three entries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplateEntry {
    Literal(String),
    Expression(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Plus,
    Minus,
    Mul,
    Div,
    Eq,
    NotEq,
    Lt,
    Gt,
}

/// A resolved annotation entry on a declaration or scope.
///
/// `class_args` carries the class-literal arguments of the annotation, e.g.
/// `@OptIn(DelicateCoroutinesApi::class)` has `type_fqn = "kotlin.OptIn"` and
/// `class_args = ["kotlinx.coroutines.DelicateCoroutinesApi"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub type_fqn: String,
    pub class_args: Vec<String>,
}

impl Annotation {
    pub fn simple(type_fqn: impl Into<String>) -> Self {
        Self {
            type_fqn: type_fqn.into(),
            class_args: Vec::new(),
        }
    }

    pub fn with_class_arg(type_fqn: impl Into<String>, class_arg: impl Into<String>) -> Self {
        Self {
            type_fqn: type_fqn.into(),
            class_args: vec![class_arg.into()],
        }
    }
}

/// Structural shape of a node. Child links live inside the variants; parent
/// links are filled in by [`AstBuilder::build`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    File {
        items: Vec<NodeId>,
    },
    Block {
        statements: Vec<NodeId>,
    },
    FunctionDecl {
        name: String,
        body: Option<NodeId>,
    },
    Lambda {
        params: Vec<NodeId>,
        body: Option<NodeId>,
    },
    Param {
        name: String,
    },
    /// `val`/`var` declaration. `mutable == false` is an immutable binding.
    Property {
        name: String,
        mutable: bool,
        initializer: Option<NodeId>,
    },
    /// Invocation. `callee` is the textual callee name; the resolved identity
    /// lives in the semantic model, never here.
    Call {
        callee: String,
        receiver: Option<NodeId>,
        args: Vec<NodeId>,
        lambda_arg: Option<NodeId>,
    },
    NameRef {
        name: String,
    },
    StringLiteral {
        value: String,
    },
    IntLiteral {
        value: i64,
    },
    BoolLiteral {
        value: bool,
    },
    NullLiteral,
    StringTemplate {
        entries: Vec<TemplateEntry>,
    },
    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Paren {
        inner: NodeId,
    },
    Cast {
        operand: NodeId,
        type_fqn: String,
    },
    If {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub range: TextRange,
    pub parent: Option<NodeId>,
    pub annotations: Vec<Annotation>,
}

/// Immutable, fully linked syntax tree for one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ast {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Ast {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn range(&self, id: NodeId) -> TextRange {
        self.node(id).range
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn annotations(&self, id: NodeId) -> &[Annotation] {
        &self.node(id).annotations
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Child nodes in source order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        children_of(&self.node(id).kind)
    }

    /// Iterative walk from `id`'s parent up to the file root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            ast: self,
            next: self.parent(id),
        }
    }

    /// Whether the node's value is discarded, i.e. it appears directly as a
    /// statement of a block (or at file top level) rather than inside an
    /// enclosing expression.
    pub fn is_used_as_statement(&self, id: NodeId) -> bool {
        match self.parent(id) {
            Some(parent) => matches!(
                self.kind(parent),
                NodeKind::File { .. } | NodeKind::Block { .. }
            ),
            None => false,
        }
    }

    /// Nearest enclosing call expression, if any.
    pub fn enclosing_call(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .find(|&anc| matches!(self.kind(anc), NodeKind::Call { .. }))
    }

    /// Pre-order depth-first listing of the subtree rooted at `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut children = self.children(current);
            children.reverse();
            stack.extend(children);
        }
        out
    }
}

pub struct Ancestors<'a> {
    ast: &'a Ast,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.ast.parent(current);
        Some(current)
    }
}

fn children_of(kind: &NodeKind) -> Vec<NodeId> {
    match kind {
        NodeKind::File { items } => items.clone(),
        NodeKind::Block { statements } => statements.clone(),
        NodeKind::FunctionDecl { body, .. } => body.iter().copied().collect(),
        NodeKind::Lambda { params, body } => {
            let mut out = params.clone();
            out.extend(body.iter().copied());
            out
        }
        NodeKind::Property { initializer, .. } => initializer.iter().copied().collect(),
        NodeKind::Call {
            receiver,
            args,
            lambda_arg,
            ..
        } => {
            let mut out: Vec<NodeId> = receiver.iter().copied().collect();
            out.extend(args.iter().copied());
            out.extend(lambda_arg.iter().copied());
            out
        }
        NodeKind::StringTemplate { entries } => entries
            .iter()
            .filter_map(|e| match e {
                TemplateEntry::Expression(id) => Some(*id),
                TemplateEntry::Literal(_) => None,
            })
            .collect(),
        NodeKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
        NodeKind::Paren { inner } => vec![*inner],
        NodeKind::Cast { operand, .. } => vec![*operand],
        NodeKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let mut out = vec![*condition, *then_branch];
            out.extend(else_branch.iter().copied());
            out
        }
        NodeKind::Param { .. }
        | NodeKind::NameRef { .. }
        | NodeKind::StringLiteral { .. }
        | NodeKind::IntLiteral { .. }
        | NodeKind::BoolLiteral { .. }
        | NodeKind::NullLiteral => Vec::new(),
    }
}

/// Incremental construction of an [`Ast`].
///
/// Each created node gets a synthetic one-line range (line = creation order),
/// which keeps fixtures terse; frontends with real positions override them via
/// [`AstBuilder::set_range`]. Parent links are derived once in
/// [`AstBuilder::build`].
#[derive(Debug, Default)]
pub struct AstBuilder {
    nodes: Vec<Node>,
}

impl AstBuilder {
    pub fn new() -> Self {
        let mut builder = Self { nodes: Vec::new() };
        builder.push(NodeKind::File { items: Vec::new() });
        builder
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let line = self.nodes.len() as u32 + 1;
        self.nodes.push(Node {
            kind,
            range: TextRange::line(line),
            parent: None,
            annotations: Vec::new(),
        });
        id
    }

    pub fn string_lit(&mut self, value: impl Into<String>) -> NodeId {
        self.push(NodeKind::StringLiteral {
            value: value.into(),
        })
    }

    pub fn int_lit(&mut self, value: i64) -> NodeId {
        self.push(NodeKind::IntLiteral { value })
    }

    pub fn bool_lit(&mut self, value: bool) -> NodeId {
        self.push(NodeKind::BoolLiteral { value })
    }

    pub fn null_lit(&mut self) -> NodeId {
        self.push(NodeKind::NullLiteral)
    }

    pub fn string_template(&mut self, entries: Vec<TemplateEntry>) -> NodeId {
        self.push(NodeKind::StringTemplate { entries })
    }

    pub fn name_ref(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeKind::NameRef { name: name.into() })
    }

    /// Immutable `val` declaration.
    pub fn val(&mut self, name: impl Into<String>, initializer: NodeId) -> NodeId {
        self.push(NodeKind::Property {
            name: name.into(),
            mutable: false,
            initializer: Some(initializer),
        })
    }

    /// Reassignable `var` declaration.
    pub fn var(&mut self, name: impl Into<String>, initializer: Option<NodeId>) -> NodeId {
        self.push(NodeKind::Property {
            name: name.into(),
            mutable: true,
            initializer,
        })
    }

    pub fn call(
        &mut self,
        callee: impl Into<String>,
        receiver: Option<NodeId>,
        args: Vec<NodeId>,
        lambda_arg: Option<NodeId>,
    ) -> NodeId {
        self.push(NodeKind::Call {
            callee: callee.into(),
            receiver,
            args,
            lambda_arg,
        })
    }

    pub fn param(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeKind::Param { name: name.into() })
    }

    pub fn lambda(&mut self, params: Vec<NodeId>, body: Option<NodeId>) -> NodeId {
        self.push(NodeKind::Lambda { params, body })
    }

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Block { statements })
    }

    pub fn function(&mut self, name: impl Into<String>, body: Option<NodeId>) -> NodeId {
        self.push(NodeKind::FunctionDecl {
            name: name.into(),
            body,
        })
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.push(NodeKind::Binary { op, lhs, rhs })
    }

    pub fn paren(&mut self, inner: NodeId) -> NodeId {
        self.push(NodeKind::Paren { inner })
    }

    pub fn cast(&mut self, operand: NodeId, type_fqn: impl Into<String>) -> NodeId {
        self.push(NodeKind::Cast {
            operand,
            type_fqn: type_fqn.into(),
        })
    }

    pub fn if_expr(
        &mut self,
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    ) -> NodeId {
        self.push(NodeKind::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    pub fn annotate(&mut self, id: NodeId, annotation: Annotation) {
        self.nodes[id.0 as usize].annotations.push(annotation);
    }

    pub fn set_range(&mut self, id: NodeId, range: TextRange) {
        self.nodes[id.0 as usize].range = range;
    }

    /// Append a top-level item to the file root.
    pub fn add_item(&mut self, id: NodeId) {
        if let NodeKind::File { items } = &mut self.nodes[0].kind {
            items.push(id);
        }
    }

    /// Finalize: derive parent links from the child links and freeze the tree.
    pub fn build(self) -> Ast {
        let mut nodes = self.nodes;
        let links: Vec<(NodeId, Vec<NodeId>)> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), children_of(&node.kind)))
            .collect();
        for (parent, children) in links {
            for child in children {
                nodes[child.0 as usize].parent = Some(parent);
            }
        }
        Ast {
            nodes,
            root: NodeId(0),
        }
    }
}
