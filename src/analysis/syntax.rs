//! Closed syntax tree for the parts of C# the checks reason about.
//!
//! The tree-sitter CST is lowered into these types once per file. Nodes the
//! checks do not care about are kept as `Other` variants so that nested
//! invocations and throws are still visited.

use super::Span;

/// A lowered C# compilation unit.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File path as given to the parser.
    pub path: String,
    /// Full source text.
    pub source: String,
    /// `using` namespaces at file scope (aliases and `using static` excluded).
    pub usings: Vec<String>,
    /// All type declarations, nested types included, in document order.
    pub types: Vec<TypeDecl>,
    /// Whether tree-sitter reported syntax errors.
    pub has_errors: bool,
}

impl SourceFile {
    /// Text covered by a span.
    pub fn text(&self, span: &Span) -> &str {
        self.source.get(span.start_byte..span.end_byte).unwrap_or("")
    }

    /// Leading whitespace of the line containing `offset`.
    pub fn line_indent(&self, offset: usize) -> &str {
        let line_start = self.line_start(offset);
        let rest = &self.source[line_start..];
        let len = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        &rest[..len]
    }

    /// Byte offset of the start of the line containing `offset`.
    pub fn line_start(&self, offset: usize) -> usize {
        let offset = offset.min(self.source.len());
        self.source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0)
    }

    /// Iterate over every member of every type.
    pub fn members(&self) -> impl Iterator<Item = (&TypeDecl, &MemberDecl)> {
        self.types
            .iter()
            .flat_map(|t| t.members.iter().map(move |m| (t, m)))
    }

    /// Find the member whose declaration starts at `start_byte`.
    pub fn member_at(&self, start_byte: usize) -> Option<(&TypeDecl, &MemberDecl)> {
        self.members().find(|(_, m)| m.span.start_byte == start_byte)
    }
}

/// Kind of type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Record,
    Enum,
}

/// A class, struct, interface, record or enum declaration.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    /// Enclosing namespace (empty for the global namespace).
    pub namespace: String,
    /// Index of the enclosing type in `SourceFile::types`, for nested types.
    pub outer: Option<usize>,
    /// `using` namespaces in effect for this declaration, innermost first.
    pub usings: Vec<String>,
    /// Base list entries as written.
    pub bases: Vec<String>,
    pub members: Vec<MemberDecl>,
    pub span: Span,
}

/// Visibility of a member as written (or implied).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Protected,
    Internal,
    Private,
}

/// Kind of member declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Method,
    Constructor,
    Destructor,
    Operator,
    Property,
    Indexer,
    Event,
    Field,
}

impl MemberKind {
    /// Members whose contracts can be scoped per accessor.
    pub fn has_accessors(&self) -> bool {
        matches!(
            self,
            MemberKind::Property | MemberKind::Indexer | MemberKind::Event
        )
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            MemberKind::Method | MemberKind::Constructor | MemberKind::Destructor | MemberKind::Operator
        )
    }
}

/// A declared parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Option<String>,
    /// Has a default value.
    pub optional: bool,
    /// `params` array.
    pub variadic: bool,
}

/// Accessor kinds of properties, indexers and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    Get,
    Set,
    Init,
    Add,
    Remove,
}

#[derive(Debug, Clone)]
pub struct AccessorDecl {
    pub kind: AccessorKind,
    pub body: Option<Body>,
    pub span: Span,
}

/// An executable body.
#[derive(Debug, Clone)]
pub enum Body {
    Block(Block),
    /// `=> expr`; the span covers the arrow clause.
    Arrow(Expr, Span),
}

impl Body {
    pub fn span(&self) -> Span {
        match self {
            Body::Block(block) => block.span,
            Body::Arrow(_, span) => *span,
        }
    }
}

/// The `///` block directly above a declaration.
#[derive(Debug, Clone)]
pub struct DocBlock {
    /// Raw lines, indentation and `///` prefixes included, joined by `\n`.
    pub text: String,
    /// Byte offset of the first line start.
    pub start_byte: usize,
    /// Byte offset just past the last line (before its newline).
    pub end_byte: usize,
}

/// A member of a type.
#[derive(Debug, Clone)]
pub struct MemberDecl {
    pub name: String,
    pub kind: MemberKind,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    /// `IFoo.Bar` explicit implementation target as written.
    pub explicit_interface: Option<String>,
    /// Return type for methods, value type for properties, fields and events.
    pub ty: Option<String>,
    pub params: Vec<Param>,
    pub body: Option<Body>,
    pub accessors: Vec<AccessorDecl>,
    pub doc: Option<DocBlock>,
    /// Whole declaration, attributes included.
    pub span: Span,
    pub name_span: Span,
    /// Where substitution violations are reported.
    pub report_span: Span,
    /// Leading whitespace of the declaration line.
    pub indent: String,
}

impl MemberDecl {
    pub fn accessor(&self, kind: AccessorKind) -> Option<&AccessorDecl> {
        self.accessors.iter().find(|a| a.kind == kind)
    }

    pub fn has_getter(&self) -> bool {
        self.accessor(AccessorKind::Get).is_some()
            || (self.kind.has_accessors()
                && self.kind != MemberKind::Event
                && matches!(self.body, Some(Body::Arrow(..))))
    }

    pub fn has_setter(&self) -> bool {
        self.accessor(AccessorKind::Set).is_some() || self.accessor(AccessorKind::Init).is_some()
    }

    /// Whether the declared return type is `void`.
    pub fn returns_void(&self) -> bool {
        matches!(self.ty.as_deref(), None | Some("void"))
    }

    /// Minimum and maximum accepted argument counts; `None` max means unbounded.
    pub fn arity_range(&self) -> (usize, Option<usize>) {
        let required = self
            .params
            .iter()
            .filter(|p| !p.optional && !p.variadic)
            .count();
        if self.params.iter().any(|p| p.variadic) {
            (required, None)
        } else {
            (required, Some(self.params.len()))
        }
    }
}

/// A `{ ... }` block.
#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// A local variable introduced by a declaration.
#[derive(Debug, Clone)]
pub struct LocalVar {
    pub name: String,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Block(Block),
    Expr(Expr),
    /// `ty` is `None` for `var`.
    Local {
        ty: Option<String>,
        vars: Vec<LocalVar>,
    },
    Return(Option<Expr>),
    /// `None` is a bare rethrow.
    Throw(Option<Expr>),
    If {
        cond: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        update: Vec<Expr>,
        body: Box<Stmt>,
    },
    Foreach {
        ty: Option<String>,
        var: Option<String>,
        iter: Expr,
        body: Box<Stmt>,
    },
    Try(TryStmt),
    Switch {
        value: Expr,
        sections: Vec<SwitchSection>,
    },
    Break,
    Continue,
    Goto,
    YieldBreak,
    Yield(Expr),
    Using {
        decl: Option<Box<Stmt>>,
        exprs: Vec<Expr>,
        body: Box<Stmt>,
    },
    Labeled(Box<Stmt>),
    LocalFunction {
        name: String,
        body: Option<Body>,
    },
    Empty,
    /// lock, checked, unsafe, fixed and anything unrecognised.
    Other {
        exprs: Vec<Expr>,
        stmts: Vec<Stmt>,
    },
}

#[derive(Debug, Clone)]
pub struct TryStmt {
    pub block: Block,
    pub catches: Vec<CatchClause>,
    pub finally: Option<Block>,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    /// Declared exception type, `None` for `catch { }`.
    pub ty: Option<String>,
    pub var: Option<String>,
    pub filter: Option<Expr>,
    pub block: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SwitchSection {
    pub has_default: bool,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    Bool(bool),
    Null,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Simple,
    Add,
    Subtract,
    /// Any other compound assignment, `??=` included.
    Compound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Increment,
    Decrement,
    Not,
    Other,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Name(String),
    This,
    Base,
    Literal(Literal),
    Member {
        target: Box<Expr>,
        name: String,
    },
    Invoke {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `ty` is `None` for target-typed `new()`. In `init`, an assignment to
    /// a bare name sets a member of the created object.
    New {
        ty: Option<String>,
        args: Vec<Expr>,
        init: Vec<Expr>,
    },
    Throw(Box<Expr>),
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Cast {
        ty: String,
        expr: Box<Expr>,
    },
    As {
        expr: Box<Expr>,
        ty: String,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Paren(Box<Expr>),
    Lambda {
        params: Vec<String>,
        body: Box<Body>,
    },
    ElementAccess {
        target: Box<Expr>,
        args: Vec<Expr>,
    },
    Other(Vec<Expr>),
}

impl Expr {
    /// Strip redundant parentheses.
    pub fn unparen(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) => inner.unparen(),
            _ => self,
        }
    }

    /// Evaluate a boolean constant condition.
    pub fn constant_bool(&self) -> Option<bool> {
        match &self.unparen().kind {
            ExprKind::Literal(Literal::Bool(b)) => Some(*b),
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => operand.constant_bool().map(|b| !b),
            _ => None,
        }
    }
}
