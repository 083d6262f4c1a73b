//! C# front end using tree-sitter.
//!
//! Lowering is kind-driven and tolerant: unknown or ERROR nodes fall back to
//! `Other` variants that keep their children, so a partially parsed file still
//! yields every invocation and throw it contains.

use std::collections::HashSet;
use std::path::Path;

use tree_sitter::{Language, Node, Parser};

use super::syntax::*;
use super::{LanguageAnalyzer, ParsedFile, Span};

const MODIFIER_KEYWORDS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "abstract", "virtual", "override",
    "sealed", "async", "extern", "unsafe", "new", "readonly", "partial", "const", "volatile",
];

pub struct CSharpAnalyzer {
    language: Language,
}

impl CSharpAnalyzer {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_c_sharp::LANGUAGE.into(),
        }
    }

    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }
}

impl Default for CSharpAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for CSharpAnalyzer {
    fn language_id(&self) -> &'static str {
        "csharp"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["cs"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> anyhow::Result<ParsedFile> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse {}", path.display()))?;

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: path.to_string_lossy().to_string(),
        })
    }

    fn lower(&self, parsed: &ParsedFile) -> SourceFile {
        let root = parsed.tree.root_node();
        let mut lowerer = Lowerer {
            parsed,
            types: Vec::new(),
        };
        let usings = lowerer.collect_usings(root);
        lowerer.lower_declarations(root, "", &usings, None);

        SourceFile {
            path: parsed.path.clone(),
            source: parsed.source_str().to_string(),
            usings,
            types: lowerer.types,
            has_errors: root.has_error(),
        }
    }
}

/// Parse and lower C# source text held in memory.
pub fn parse_source(path: &str, source: &str) -> anyhow::Result<SourceFile> {
    CSharpAnalyzer::new().load(Path::new(path), source.as_bytes())
}

// =============================================================================
// Node helpers
// =============================================================================

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

fn all_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn children_by_field<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

fn child_of_kind<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    named_children(node)
        .into_iter()
        .find(|c| kinds.contains(&c.kind()))
}

fn is_statement_kind(kind: &str) -> bool {
    kind == "block" || kind.ends_with("_statement")
}

fn is_type_declaration(kind: &str) -> bool {
    matches!(
        kind,
        "class_declaration"
            | "struct_declaration"
            | "interface_declaration"
            | "record_declaration"
            | "record_struct_declaration"
            | "enum_declaration"
    )
}

fn join_namespace(outer: &str, inner: &str) -> String {
    if outer.is_empty() {
        inner.to_string()
    } else {
        format!("{}.{}", outer, inner)
    }
}

fn strip_global(name: &str) -> &str {
    name.strip_prefix("global::").unwrap_or(name)
}

struct Lowerer<'a> {
    parsed: &'a ParsedFile,
    types: Vec<TypeDecl>,
}

impl<'a> Lowerer<'a> {
    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(&self.parsed.source).unwrap_or("")
    }

    fn field_text(&self, node: Node, field: &str) -> Option<String> {
        node.child_by_field_name(field)
            .map(|n| self.text(n).trim().to_string())
    }

    // -------------------------------------------------------------------------
    // Declarations
    // -------------------------------------------------------------------------

    /// Namespaces imported by `using` directives directly inside `container`.
    fn collect_usings(&self, container: Node) -> Vec<String> {
        let mut usings = Vec::new();
        for child in named_children(container) {
            if child.kind() != "using_directive" {
                continue;
            }
            let tokens = all_children(child);
            let is_alias = tokens.iter().any(|t| t.kind() == "=");
            let is_static = tokens.iter().any(|t| t.kind() == "static");
            if is_alias || is_static {
                continue;
            }
            if let Some(name) = named_children(child).last() {
                let name = strip_global(self.text(*name).trim());
                if !name.is_empty() {
                    usings.push(name.to_string());
                }
            }
        }
        usings
    }

    fn lower_declarations(
        &mut self,
        container: Node,
        namespace: &str,
        usings: &[String],
        outer: Option<usize>,
    ) {
        // A file-scoped namespace applies to every following sibling.
        let mut current_ns = namespace.to_string();
        let mut current_usings = usings.to_vec();

        for child in named_children(container) {
            let kind = child.kind();
            match kind {
                "namespace_declaration" => {
                    let name = self.field_text(child, "name").unwrap_or_default();
                    let ns = join_namespace(&current_ns, strip_global(&name));
                    if let Some(body) = child
                        .child_by_field_name("body")
                        .or_else(|| child_of_kind(child, &["declaration_list"]))
                    {
                        let mut inner = self.collect_usings(body);
                        inner.extend(current_usings.iter().cloned());
                        self.lower_declarations(body, &ns, &inner, outer);
                    }
                }
                "file_scoped_namespace_declaration" => {
                    let name = self.field_text(child, "name").unwrap_or_default();
                    current_ns = join_namespace(&current_ns, strip_global(&name));
                    let mut inner = self.collect_usings(child);
                    inner.extend(current_usings.iter().cloned());
                    current_usings = inner;
                    self.lower_declarations(child, &current_ns, &current_usings, outer);
                }
                "declaration_list" => {
                    self.lower_declarations(child, &current_ns, &current_usings, outer);
                }
                k if is_type_declaration(k) => {
                    self.lower_type(child, &current_ns, &current_usings, outer);
                }
                _ => {}
            }
        }
    }

    fn lower_type(&mut self, node: Node, namespace: &str, usings: &[String], outer: Option<usize>) {
        let kind = match node.kind() {
            "class_declaration" => TypeKind::Class,
            "struct_declaration" | "record_struct_declaration" => TypeKind::Struct,
            "interface_declaration" => TypeKind::Interface,
            "record_declaration" => TypeKind::Record,
            _ => TypeKind::Enum,
        };
        let name = self.field_text(node, "name").unwrap_or_default();

        let mut bases = Vec::new();
        if let Some(base_list) = child_of_kind(node, &["base_list"]) {
            for base in named_children(base_list) {
                let ty = if base.kind() == "primary_constructor_base_type" {
                    named_children(base).first().map(|n| self.text(*n))
                } else if base.kind() == "argument_list" {
                    None
                } else {
                    Some(self.text(base))
                };
                if let Some(ty) = ty {
                    bases.push(ty.trim().to_string());
                }
            }
        }

        let index = self.types.len();
        self.types.push(TypeDecl {
            name,
            kind,
            namespace: namespace.to_string(),
            outer,
            usings: usings.to_vec(),
            bases,
            members: Vec::new(),
            span: Span::from_node(node),
        });

        if kind == TypeKind::Enum {
            return;
        }

        let body = node
            .child_by_field_name("body")
            .filter(|b| b.kind() == "declaration_list")
            .or_else(|| child_of_kind(node, &["declaration_list"]));
        let Some(body) = body else {
            return;
        };

        let mut members = Vec::new();
        for child in named_children(body) {
            if is_type_declaration(child.kind()) {
                self.lower_type(child, namespace, usings, Some(index));
                continue;
            }
            self.lower_member(child, kind, &mut members);
        }
        self.types[index].members = members;
    }

    fn modifiers(&self, node: Node) -> HashSet<String> {
        let mut found = HashSet::new();
        for child in all_children(node) {
            if child.kind() == "modifier" {
                found.insert(self.text(child).trim().to_string());
            } else if !child.is_named() && MODIFIER_KEYWORDS.contains(&child.kind()) {
                found.insert(child.kind().to_string());
            }
        }
        found
    }

    fn lower_member(&mut self, node: Node, owner_kind: TypeKind, out: &mut Vec<MemberDecl>) {
        let kind = match node.kind() {
            "method_declaration" => MemberKind::Method,
            "constructor_declaration" => MemberKind::Constructor,
            "destructor_declaration" => MemberKind::Destructor,
            "operator_declaration" | "conversion_operator_declaration" => MemberKind::Operator,
            "property_declaration" => MemberKind::Property,
            "indexer_declaration" => MemberKind::Indexer,
            "event_declaration" => MemberKind::Event,
            "event_field_declaration" => {
                self.lower_field_like(node, MemberKind::Event, owner_kind, out);
                return;
            }
            "field_declaration" => {
                self.lower_field_like(node, MemberKind::Field, owner_kind, out);
                return;
            }
            _ => return,
        };

        let modifiers = self.modifiers(node);
        let explicit_interface = child_of_kind(node, &["explicit_interface_specifier"]).map(|n| {
            self.text(n)
                .trim()
                .trim_end_matches('.')
                .trim()
                .to_string()
        });

        let name_node = node.child_by_field_name("name");
        let name = match kind {
            MemberKind::Indexer => "this".to_string(),
            MemberKind::Destructor => format!(
                "~{}",
                name_node.map(|n| self.text(n)).unwrap_or_default()
            ),
            MemberKind::Operator => {
                let op = node
                    .child_by_field_name("operator")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_else(|| "conversion".to_string());
                format!("operator {}", op)
            }
            _ => name_node
                .map(|n| self.text(n).trim().to_string())
                .unwrap_or_default(),
        };

        let ty = node
            .child_by_field_name("returns")
            .or_else(|| node.child_by_field_name("type"))
            .map(|n| self.text(n).trim().to_string());

        let params = node
            .child_by_field_name("parameters")
            .or_else(|| child_of_kind(node, &["parameter_list", "bracketed_parameter_list"]))
            .map(|list| self.lower_params(list))
            .unwrap_or_default();

        let accessors = node
            .child_by_field_name("accessors")
            .or_else(|| child_of_kind(node, &["accessor_list"]))
            .map(|list| self.lower_accessors(list))
            .unwrap_or_default();

        let body = if kind.has_accessors() {
            node.child_by_field_name("value")
                .filter(|v| v.kind() == "arrow_expression_clause")
                .or_else(|| child_of_kind(node, &["arrow_expression_clause"]))
                .map(|arrow| self.lower_arrow(arrow))
        } else {
            self.lower_function_body(node)
        };

        let span = Span::from_node(node);
        let name_span = name_node.map(Span::from_node).unwrap_or(span);
        let is_abstract = modifiers.contains("abstract")
            || (owner_kind == TypeKind::Interface
                && body.is_none()
                && accessors.iter().all(|a| a.body.is_none()));
        out.push(MemberDecl {
            name,
            kind,
            visibility: visibility_of(&modifiers, owner_kind, explicit_interface.is_some()),
            is_static: modifiers.contains("static"),
            is_abstract,
            explicit_interface,
            ty,
            params,
            body,
            accessors,
            doc: self.doc_block(span.start_byte),
            report_span: self.report_span(node, name_span),
            span,
            name_span,
            indent: self.indent_of(span.start_byte),
        });
    }

    fn lower_field_like(
        &mut self,
        node: Node,
        kind: MemberKind,
        owner_kind: TypeKind,
        out: &mut Vec<MemberDecl>,
    ) {
        let modifiers = self.modifiers(node);
        let Some(decl) = child_of_kind(node, &["variable_declaration"]) else {
            return;
        };
        let ty = self.field_text(decl, "type");
        let span = Span::from_node(node);
        for declarator in named_children(decl) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let name_node = declarator
                .child_by_field_name("name")
                .or_else(|| child_of_kind(declarator, &["identifier"]));
            let Some(name_node) = name_node else {
                continue;
            };
            let name_span = Span::from_node(name_node);
            out.push(MemberDecl {
                name: self.text(name_node).trim().to_string(),
                kind,
                visibility: visibility_of(&modifiers, owner_kind, false),
                is_static: modifiers.contains("static") || modifiers.contains("const"),
                is_abstract: false,
                explicit_interface: None,
                ty: ty.clone(),
                params: Vec::new(),
                body: None,
                accessors: Vec::new(),
                doc: self.doc_block(span.start_byte),
                span,
                name_span,
                report_span: name_span,
                indent: self.indent_of(span.start_byte),
            });
        }
    }

    fn lower_params(&self, list: Node) -> Vec<Param> {
        named_children(list)
            .into_iter()
            .filter(|p| p.kind() == "parameter")
            .map(|p| {
                let tokens = all_children(p);
                Param {
                    name: self.field_text(p, "name").unwrap_or_default(),
                    ty: self.field_text(p, "type"),
                    optional: tokens.iter().any(|t| {
                        t.kind() == "=" || t.kind() == "equals_value_clause"
                    }),
                    variadic: tokens.iter().any(|t| {
                        t.kind() == "params" || self.text(*t).trim() == "params"
                    }),
                }
            })
            .collect()
    }

    fn lower_accessors(&self, list: Node) -> Vec<AccessorDecl> {
        let mut accessors = Vec::new();
        for node in named_children(list) {
            if node.kind() != "accessor_declaration" {
                continue;
            }
            let keyword = node
                .child_by_field_name("name")
                .map(|n| self.text(n).trim().to_string())
                .or_else(|| {
                    all_children(node)
                        .into_iter()
                        .map(|c| self.text(c).trim().to_string())
                        .find(|t| matches!(t.as_str(), "get" | "set" | "init" | "add" | "remove"))
                });
            let kind = match keyword.as_deref() {
                Some("get") => AccessorKind::Get,
                Some("set") => AccessorKind::Set,
                Some("init") => AccessorKind::Init,
                Some("add") => AccessorKind::Add,
                Some("remove") => AccessorKind::Remove,
                _ => continue,
            };
            accessors.push(AccessorDecl {
                kind,
                body: self.lower_function_body(node),
                span: Span::from_node(node),
            });
        }
        accessors
    }

    fn lower_function_body(&self, node: Node) -> Option<Body> {
        let body = node.child_by_field_name("body").or_else(|| {
            named_children(node)
                .into_iter()
                .find(|c| matches!(c.kind(), "block" | "arrow_expression_clause"))
        })?;
        match body.kind() {
            "block" => Some(Body::Block(self.lower_block(body))),
            "arrow_expression_clause" => Some(self.lower_arrow(body)),
            _ => None,
        }
    }

    fn lower_arrow(&self, arrow: Node) -> Body {
        let span = Span::from_node(arrow);
        let expr = named_children(arrow)
            .first()
            .map(|e| self.lower_expr(*e))
            .unwrap_or(Expr {
                kind: ExprKind::Other(Vec::new()),
                span,
            });
        Body::Arrow(expr, span)
    }

    /// Trailing `;` of the declaration if present, otherwise the name token.
    fn report_span(&self, node: Node, name_span: Span) -> Span {
        match all_children(node).last() {
            Some(last) if last.kind() == ";" => Span::from_node(*last),
            _ => name_span,
        }
    }

    fn indent_of(&self, offset: usize) -> String {
        let source = self.parsed.source_str();
        let line_start = source[..offset.min(source.len())]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        source[line_start..]
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect()
    }

    /// Collect the contiguous `///` lines directly above `offset`.
    fn doc_block(&self, offset: usize) -> Option<DocBlock> {
        let source = self.parsed.source_str();
        let mut line_start = source[..offset.min(source.len())]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);

        let mut first: Option<usize> = None;
        let mut last_end: Option<usize> = None;
        while line_start > 0 {
            let prev_end = line_start - 1;
            let prev_start = source[..prev_end].rfind('\n').map(|i| i + 1).unwrap_or(0);
            let line = &source[prev_start..prev_end];
            if !line.trim_start().starts_with("///") {
                break;
            }
            if last_end.is_none() {
                last_end = Some(prev_end);
            }
            first = Some(prev_start);
            line_start = prev_start;
        }

        let (start, end) = (first?, last_end?);
        Some(DocBlock {
            text: source[start..end].to_string(),
            start_byte: start,
            end_byte: end,
        })
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    fn lower_block(&self, node: Node) -> Block {
        Block {
            stmts: named_children(node)
                .into_iter()
                .map(|s| self.lower_stmt(s))
                .collect(),
            span: Span::from_node(node),
        }
    }

    fn lower_boxed(&self, node: Option<Node>, parent: Node) -> Box<Stmt> {
        Box::new(match node {
            Some(n) => self.lower_stmt(n),
            None => Stmt {
                kind: StmtKind::Empty,
                span: Span::from_node(parent),
            },
        })
    }

    fn lower_stmt(&self, node: Node) -> Stmt {
        let span = Span::from_node(node);
        let kind = match node.kind() {
            "block" => StmtKind::Block(self.lower_block(node)),
            "expression_statement" => match named_children(node).first() {
                Some(e) => StmtKind::Expr(self.lower_expr(*e)),
                None => StmtKind::Empty,
            },
            "local_declaration_statement" => match child_of_kind(node, &["variable_declaration"]) {
                Some(decl) => self.lower_variable_declaration(decl),
                None => self.lower_other_stmt(node),
            },
            "return_statement" => {
                StmtKind::Return(named_children(node).first().map(|e| self.lower_expr(*e)))
            }
            "throw_statement" => {
                StmtKind::Throw(named_children(node).first().map(|e| self.lower_expr(*e)))
            }
            "if_statement" => {
                let cond = self.lower_expr_field(node, "condition");
                let then = self.lower_boxed(node.child_by_field_name("consequence"), node);
                let otherwise = node.child_by_field_name("alternative").map(|alt| {
                    let alt = if alt.kind() == "else_clause" {
                        named_children(alt).first().copied().unwrap_or(alt)
                    } else {
                        alt
                    };
                    Box::new(self.lower_stmt(alt))
                });
                StmtKind::If {
                    cond,
                    then,
                    otherwise,
                }
            }
            "while_statement" => StmtKind::While {
                cond: self.lower_expr_field(node, "condition"),
                body: self.lower_boxed(node.child_by_field_name("body"), node),
            },
            "do_statement" => StmtKind::DoWhile {
                body: self.lower_boxed(node.child_by_field_name("body"), node),
                cond: self.lower_expr_field(node, "condition"),
            },
            "for_statement" => {
                let init = children_by_field(node, "initializer")
                    .into_iter()
                    .map(|i| {
                        if i.kind() == "variable_declaration" {
                            Stmt {
                                kind: self.lower_variable_declaration(i),
                                span: Span::from_node(i),
                            }
                        } else {
                            Stmt {
                                kind: StmtKind::Expr(self.lower_expr(i)),
                                span: Span::from_node(i),
                            }
                        }
                    })
                    .collect();
                StmtKind::For {
                    init,
                    cond: node
                        .child_by_field_name("condition")
                        .map(|c| self.lower_expr(c)),
                    update: children_by_field(node, "update")
                        .into_iter()
                        .map(|u| self.lower_expr(u))
                        .collect(),
                    body: self.lower_boxed(node.child_by_field_name("body"), node),
                }
            }
            "foreach_statement" => StmtKind::Foreach {
                ty: self
                    .field_text(node, "type")
                    .filter(|t| t != "var"),
                var: node
                    .child_by_field_name("left")
                    .filter(|l| l.kind() == "identifier")
                    .map(|l| self.text(l).to_string()),
                iter: self.lower_expr_field(node, "right"),
                body: self.lower_boxed(node.child_by_field_name("body"), node),
            },
            "try_statement" => StmtKind::Try(self.lower_try(node)),
            "switch_statement" => self.lower_switch(node),
            "break_statement" => StmtKind::Break,
            "continue_statement" => StmtKind::Continue,
            "goto_statement" => StmtKind::Goto,
            "yield_statement" => {
                let is_break = all_children(node).iter().any(|c| c.kind() == "break");
                match named_children(node).first() {
                    Some(e) if !is_break => StmtKind::Yield(self.lower_expr(*e)),
                    _ => StmtKind::YieldBreak,
                }
            }
            "using_statement" => {
                let body_node = node.child_by_field_name("body").or_else(|| {
                    named_children(node)
                        .into_iter()
                        .rev()
                        .find(|c| is_statement_kind(c.kind()))
                });
                let mut decl = None;
                let mut exprs = Vec::new();
                for child in named_children(node) {
                    if Some(child) == body_node {
                        continue;
                    }
                    if child.kind() == "variable_declaration" {
                        decl = Some(Box::new(Stmt {
                            kind: self.lower_variable_declaration(child),
                            span: Span::from_node(child),
                        }));
                    } else {
                        exprs.push(self.lower_expr(child));
                    }
                }
                StmtKind::Using {
                    decl,
                    exprs,
                    body: self.lower_boxed(body_node, node),
                }
            }
            "labeled_statement" => match named_children(node)
                .into_iter()
                .find(|c| is_statement_kind(c.kind()))
            {
                Some(inner) => StmtKind::Labeled(Box::new(self.lower_stmt(inner))),
                None => StmtKind::Empty,
            },
            "local_function_statement" => StmtKind::LocalFunction {
                name: self.field_text(node, "name").unwrap_or_default(),
                body: self.lower_function_body(node),
            },
            "empty_statement" => StmtKind::Empty,
            _ => self.lower_other_stmt(node),
        };
        Stmt { kind, span }
    }

    fn lower_other_stmt(&self, node: Node) -> StmtKind {
        let mut exprs = Vec::new();
        let mut stmts = Vec::new();
        for child in named_children(node) {
            if is_statement_kind(child.kind()) {
                stmts.push(self.lower_stmt(child));
            } else {
                exprs.push(self.lower_expr(child));
            }
        }
        StmtKind::Other { exprs, stmts }
    }

    fn lower_variable_declaration(&self, decl: Node) -> StmtKind {
        let ty = self
            .field_text(decl, "type")
            .filter(|t| t != "var");
        let mut vars = Vec::new();
        for declarator in named_children(decl) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let name_node = declarator
                .child_by_field_name("name")
                .or_else(|| child_of_kind(declarator, &["identifier"]));
            let mut init = None;
            for child in named_children(declarator) {
                if Some(child) == name_node
                    || matches!(child.kind(), "bracketed_argument_list" | "tuple_pattern")
                {
                    continue;
                }
                let value = if child.kind() == "equals_value_clause" {
                    named_children(child).first().copied()
                } else {
                    Some(child)
                };
                init = value.map(|v| self.lower_expr(v));
            }
            vars.push(LocalVar {
                name: name_node
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default(),
                init,
            });
        }
        StmtKind::Local { ty, vars }
    }

    fn lower_try(&self, node: Node) -> TryStmt {
        let block = node
            .child_by_field_name("body")
            .or_else(|| child_of_kind(node, &["block"]))
            .map(|b| self.lower_block(b))
            .unwrap_or(Block {
                stmts: Vec::new(),
                span: Span::from_node(node),
            });

        let mut catches = Vec::new();
        let mut finally = None;
        for child in named_children(node) {
            match child.kind() {
                "catch_clause" => catches.push(self.lower_catch(child)),
                "finally_clause" => {
                    finally = child_of_kind(child, &["block"]).map(|b| self.lower_block(b));
                }
                _ => {}
            }
        }
        TryStmt {
            block,
            catches,
            finally,
        }
    }

    fn lower_catch(&self, node: Node) -> CatchClause {
        let declaration = child_of_kind(node, &["catch_declaration"]);
        let ty = declaration.and_then(|d| {
            self.field_text(d, "type")
                .or_else(|| named_children(d).first().map(|n| self.text(*n).to_string()))
        });
        let var = declaration.and_then(|d| self.field_text(d, "name"));
        let filter = child_of_kind(node, &["catch_filter_clause"]).map(|f| {
            match named_children(f).first() {
                Some(e) => self.lower_expr(*e),
                None => Expr {
                    kind: ExprKind::Other(Vec::new()),
                    span: Span::from_node(f),
                },
            }
        });
        let block = node
            .child_by_field_name("body")
            .or_else(|| child_of_kind(node, &["block"]))
            .map(|b| self.lower_block(b))
            .unwrap_or(Block {
                stmts: Vec::new(),
                span: Span::from_node(node),
            });
        CatchClause {
            ty,
            var,
            filter,
            block,
            span: Span::from_node(node),
        }
    }

    fn lower_switch(&self, node: Node) -> StmtKind {
        let value = node
            .child_by_field_name("value")
            .or_else(|| node.child_by_field_name("expression"))
            .map(|v| self.lower_expr(v))
            .unwrap_or(Expr {
                kind: ExprKind::Other(Vec::new()),
                span: Span::from_node(node),
            });

        let mut sections = Vec::new();
        let body = node
            .child_by_field_name("body")
            .or_else(|| child_of_kind(node, &["switch_body"]));
        if let Some(body) = body {
            for section in named_children(body) {
                if section.kind() != "switch_section" {
                    continue;
                }
                let has_default = all_children(section).iter().any(|c| {
                    c.kind() == "default" || c.kind() == "default_switch_label"
                });
                let stmts = named_children(section)
                    .into_iter()
                    .filter(|c| is_statement_kind(c.kind()))
                    .map(|c| self.lower_stmt(c))
                    .collect();
                sections.push(SwitchSection { has_default, stmts });
            }
        }
        StmtKind::Switch { value, sections }
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    fn lower_expr_field(&self, node: Node, field: &str) -> Expr {
        match node.child_by_field_name(field) {
            Some(e) => self.lower_expr(e),
            None => Expr {
                kind: ExprKind::Other(Vec::new()),
                span: Span::from_node(node),
            },
        }
    }

    fn boxed(&self, node: Node, field: &str) -> Box<Expr> {
        Box::new(self.lower_expr_field(node, field))
    }

    fn lower_args(&self, list: Option<Node>) -> Vec<Expr> {
        let Some(list) = list else {
            return Vec::new();
        };
        named_children(list)
            .into_iter()
            .filter_map(|arg| {
                let value = if arg.kind() == "argument" {
                    named_children(arg).last().copied()
                } else {
                    Some(arg)
                };
                value.map(|v| self.lower_expr(v))
            })
            .collect()
    }

    fn simple_name(&self, node: Node) -> String {
        if node.kind() == "generic_name" {
            if let Some(id) = child_of_kind(node, &["identifier"]) {
                return self.text(id).to_string();
            }
        }
        self.text(node).trim().to_string()
    }

    /// Operator text between two operand nodes.
    fn operator_between(&self, node: Node, left: Node, right: Node) -> String {
        if let Some(op) = node.child_by_field_name("operator") {
            return self.text(op).trim().to_string();
        }
        let source = self.parsed.source_str();
        source
            .get(left.end_byte()..right.start_byte())
            .unwrap_or("")
            .trim()
            .to_string()
    }

    fn lower_expr(&self, node: Node) -> Expr {
        let span = Span::from_node(node);
        let kind = match node.kind() {
            "identifier" => ExprKind::Name(self.text(node).trim().to_string()),
            "generic_name" | "predefined_type" | "qualified_name" | "alias_qualified_name" => {
                ExprKind::Name(self.simple_name(node))
            }
            "this_expression" | "this" => ExprKind::This,
            "base_expression" | "base" => ExprKind::Base,
            "boolean_literal" => ExprKind::Literal(Literal::Bool(self.text(node).trim() == "true")),
            "null_literal" => ExprKind::Literal(Literal::Null),
            k if k.ends_with("_literal") => ExprKind::Literal(Literal::Other),
            "member_access_expression" => {
                let target = node
                    .child_by_field_name("expression")
                    .map(|e| self.lower_expr(e))
                    .unwrap_or(Expr {
                        kind: ExprKind::Other(Vec::new()),
                        span,
                    });
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.simple_name(n))
                    .unwrap_or_default();
                ExprKind::Member {
                    target: Box::new(target),
                    name,
                }
            }
            "conditional_access_expression" => self.lower_conditional_access(node),
            "invocation_expression" => ExprKind::Invoke {
                callee: self.boxed(node, "function"),
                args: self.lower_args(
                    node.child_by_field_name("arguments")
                        .or_else(|| child_of_kind(node, &["argument_list"])),
                ),
            },
            "object_creation_expression" => ExprKind::New {
                ty: self.field_text(node, "type"),
                args: self.lower_args(
                    node.child_by_field_name("arguments")
                        .or_else(|| child_of_kind(node, &["argument_list"])),
                ),
                init: self.lower_initializer(node),
            },
            "implicit_object_creation_expression" => ExprKind::New {
                ty: None,
                args: self.lower_args(child_of_kind(node, &["argument_list"])),
                init: self.lower_initializer(node),
            },
            "throw_expression" => match named_children(node).first() {
                Some(e) => ExprKind::Throw(Box::new(self.lower_expr(*e))),
                None => ExprKind::Other(Vec::new()),
            },
            "assignment_expression" => {
                match (node.child_by_field_name("left"), node.child_by_field_name("right")) {
                    (Some(left), Some(right)) => {
                        let op = match self.operator_between(node, left, right).as_str() {
                            "=" => AssignOp::Simple,
                            "+=" => AssignOp::Add,
                            "-=" => AssignOp::Subtract,
                            _ => AssignOp::Compound,
                        };
                        ExprKind::Assign {
                            op,
                            target: Box::new(self.lower_expr(left)),
                            value: Box::new(self.lower_expr(right)),
                        }
                    }
                    _ => self.lower_other_expr(node),
                }
            }
            "prefix_unary_expression" | "postfix_unary_expression" => {
                match named_children(node).first() {
                    Some(operand) => {
                        let full = self.text(node);
                        let inner = self.text(*operand);
                        let op_text = full.replacen(inner, "", 1);
                        let op = match op_text.trim() {
                            "++" => UnaryOp::Increment,
                            "--" => UnaryOp::Decrement,
                            "!" => UnaryOp::Not,
                            _ => UnaryOp::Other,
                        };
                        ExprKind::Unary {
                            op,
                            operand: Box::new(self.lower_expr(*operand)),
                        }
                    }
                    None => ExprKind::Other(Vec::new()),
                }
            }
            "binary_expression" => ExprKind::Binary {
                lhs: self.boxed(node, "left"),
                rhs: self.boxed(node, "right"),
            },
            "cast_expression" => ExprKind::Cast {
                ty: self.field_text(node, "type").unwrap_or_default(),
                expr: self.boxed(node, "value"),
            },
            "as_expression" => {
                let children = named_children(node);
                match (children.first(), children.get(1)) {
                    (Some(expr), Some(ty)) => ExprKind::As {
                        expr: Box::new(self.lower_expr(*expr)),
                        ty: self.text(*ty).trim().to_string(),
                    },
                    _ => self.lower_other_expr(node),
                }
            }
            "conditional_expression" => ExprKind::Conditional {
                cond: self.boxed(node, "condition"),
                then: self.boxed(node, "consequence"),
                otherwise: self.boxed(node, "alternative"),
            },
            "parenthesized_expression" => match named_children(node).first() {
                Some(inner) => ExprKind::Paren(Box::new(self.lower_expr(*inner))),
                None => ExprKind::Other(Vec::new()),
            },
            "lambda_expression" | "anonymous_method_expression" => self.lower_lambda(node),
            "element_access_expression" => ExprKind::ElementAccess {
                target: self.boxed(node, "expression"),
                args: self.lower_args(
                    node.child_by_field_name("subscript")
                        .or_else(|| child_of_kind(node, &["bracketed_argument_list"])),
                ),
            },
            _ => self.lower_other_expr(node),
        };
        Expr { kind, span }
    }

    fn lower_other_expr(&self, node: Node) -> ExprKind {
        ExprKind::Other(
            named_children(node)
                .into_iter()
                .filter(|c| !is_statement_kind(c.kind()))
                .map(|c| self.lower_expr(c))
                .collect(),
        )
    }

    fn lower_conditional_access(&self, node: Node) -> ExprKind {
        let children = named_children(node);
        let target = node
            .child_by_field_name("condition")
            .or_else(|| children.first().copied());
        let binding = children
            .iter()
            .find(|c| c.kind() == "member_binding_expression")
            .copied();
        match (target, binding) {
            (Some(target), Some(binding)) => {
                let name = binding
                    .child_by_field_name("name")
                    .or_else(|| named_children(binding).last().copied())
                    .map(|n| self.simple_name(n))
                    .unwrap_or_default();
                ExprKind::Member {
                    target: Box::new(self.lower_expr(target)),
                    name,
                }
            }
            _ => self.lower_other_expr(node),
        }
    }

    /// Items of an object or collection initializer. `Prop = value` lowers to
    /// an assignment whose target names a member of the created object.
    fn lower_initializer(&self, node: Node) -> Vec<Expr> {
        let Some(init) = node
            .child_by_field_name("initializer")
            .or_else(|| child_of_kind(node, &["initializer_expression"]))
        else {
            return Vec::new();
        };
        named_children(init)
            .into_iter()
            .map(|item| self.lower_expr(item))
            .collect()
    }

    fn lower_lambda(&self, node: Node) -> ExprKind {
        let mut params = Vec::new();
        if let Some(p) = node.child_by_field_name("parameters") {
            if p.kind() == "identifier" {
                params.push(self.text(p).to_string());
            } else {
                params.extend(self.lower_params(p).into_iter().map(|p| p.name));
            }
        } else if let Some(list) = child_of_kind(node, &["parameter_list"]) {
            params.extend(self.lower_params(list).into_iter().map(|p| p.name));
        }

        let body_node = node.child_by_field_name("body").or_else(|| {
            named_children(node)
                .into_iter()
                .find(|c| c.kind() == "block")
        });
        let body = match body_node {
            Some(b) if b.kind() == "block" => Body::Block(self.lower_block(b)),
            Some(b) => Body::Arrow(self.lower_expr(b), Span::from_node(b)),
            None => Body::Block(Block {
                stmts: Vec::new(),
                span: Span::from_node(node),
            }),
        };
        ExprKind::Lambda {
            params,
            body: Box::new(body),
        }
    }
}

fn visibility_of(modifiers: &HashSet<String>, owner: TypeKind, explicit: bool) -> Visibility {
    if modifiers.contains("public") {
        Visibility::Public
    } else if modifiers.contains("protected") {
        Visibility::Protected
    } else if modifiers.contains("internal") {
        Visibility::Internal
    } else if modifiers.contains("private") || explicit {
        Visibility::Private
    } else if owner == TypeKind::Interface {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_loads() {
        let analyzer = CSharpAnalyzer::new();
        assert!(analyzer.create_parser().is_ok(), "grammar ABI not supported by tree-sitter");
        let file = parse_source("P.cs", "class P { void M() { } }").unwrap();
        assert!(!file.has_errors);
        assert_eq!(file.types[0].members[0].name, "M");
    }

    const SAMPLE: &str = r#"using System;
using System.IO;

namespace Demo.App
{
    public interface IReader
    {
        /// <exception cref="IOException"></exception>
        string Read(string path);
    }

    public class Reader : Base, IReader
    {
        /// <summary>
        /// Reads.
        /// </summary>
        public string Read(string path)
        {
            try
            {
                return File.ReadAllText(path);
            }
            catch (FileNotFoundException e) when (e.Message != null)
            {
                throw;
            }
        }

        public int Count { get; set; }

        public int Twice => Count * 2;

        public event EventHandler Changed;

        private Reader() { }
    }
}
"#;

    #[test]
    fn test_lowers_types_and_members() {
        let file = parse_source("Reader.cs", SAMPLE).unwrap();
        assert_eq!(file.usings, vec!["System", "System.IO"]);
        assert_eq!(file.types.len(), 2);

        let iface = &file.types[0];
        assert_eq!(iface.name, "IReader");
        assert_eq!(iface.kind, TypeKind::Interface);
        assert_eq!(iface.namespace, "Demo.App");
        assert_eq!(iface.members[0].visibility, Visibility::Public);
        assert!(iface.members[0].is_abstract);

        let class = &file.types[1];
        assert_eq!(class.bases, vec!["Base", "IReader"]);
        let names: Vec<_> = class.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Read", "Count", "Twice", "Changed", "Reader"]);
        assert_eq!(class.members[4].kind, MemberKind::Constructor);
        assert_eq!(class.members[4].visibility, Visibility::Private);
        assert_eq!(class.members[3].kind, MemberKind::Event);
    }

    #[test]
    fn test_doc_block_and_indent() {
        let file = parse_source("Reader.cs", SAMPLE).unwrap();
        let read = &file.types[1].members[0];
        let doc = read.doc.as_ref().unwrap();
        assert!(doc.text.starts_with("        /// <summary>"));
        assert!(doc.text.ends_with("/// </summary>"));
        assert_eq!(read.indent, "        ");
        assert!(file.types[1].members[1].doc.is_none());
    }

    #[test]
    fn test_lowers_try_catch_with_filter() {
        let file = parse_source("Reader.cs", SAMPLE).unwrap();
        let read = &file.types[1].members[0];
        let Some(Body::Block(block)) = &read.body else {
            panic!("expected block body");
        };
        let StmtKind::Try(try_stmt) = &block.stmts[0].kind else {
            panic!("expected try");
        };
        assert_eq!(try_stmt.catches.len(), 1);
        let catch = &try_stmt.catches[0];
        assert_eq!(catch.ty.as_deref(), Some("FileNotFoundException"));
        assert_eq!(catch.var.as_deref(), Some("e"));
        assert!(catch.filter.is_some());
        assert!(matches!(catch.block.stmts[0].kind, StmtKind::Throw(None)));
    }

    #[test]
    fn test_properties_and_accessors() {
        let file = parse_source("Reader.cs", SAMPLE).unwrap();
        let count = &file.types[1].members[1];
        assert!(count.has_getter());
        assert!(count.has_setter());
        let twice = &file.types[1].members[2];
        assert!(matches!(twice.body, Some(Body::Arrow(..))));
        assert!(twice.has_getter());
        assert!(!twice.has_setter());
    }

    #[test]
    fn test_assignment_and_increment_operators() {
        let src = r#"class C {
    void M() {
        a.B = 1;
        a.B += 2;
        a.B++;
        --a.B;
    }
}"#;
        let file = parse_source("C.cs", src).unwrap();
        let Some(Body::Block(block)) = &file.types[0].members[0].body else {
            panic!("expected block body");
        };
        let ops: Vec<_> = block
            .stmts
            .iter()
            .map(|s| match &s.kind {
                StmtKind::Expr(Expr {
                    kind: ExprKind::Assign { op, .. },
                    ..
                }) => format!("{:?}", op),
                StmtKind::Expr(Expr {
                    kind: ExprKind::Unary { op, .. },
                    ..
                }) => format!("{:?}", op),
                other => format!("{:?}", other),
            })
            .collect();
        assert_eq!(ops, vec!["Simple", "Add", "Increment", "Decrement"]);
    }

    #[test]
    fn test_file_scoped_namespace() {
        let src = "using System;\nnamespace Demo;\n\npublic class A { }\n";
        let file = parse_source("A.cs", src).unwrap();
        assert_eq!(file.types.len(), 1);
        assert_eq!(file.types[0].namespace, "Demo");
    }
}
