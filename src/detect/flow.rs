//! Exception flow through one executable body.
//!
//! The analyzer walks a body once and records, for every statement, which
//! exception types can leave it without a matching catch clause. Callee
//! contributions come from the callee's declared contract; explicit `throw`
//! statements and expressions contribute their static type.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::reachability;
use crate::analysis::syntax::{
    AssignOp, Block, Body, CatchClause, Expr, ExprKind, MemberKind, Param, Stmt, StmtKind,
    TryStmt, UnaryOp,
};
use crate::analysis::Span;
use crate::contract::{AccessorScope, ContractExtractor};
use crate::semantic::{MemberId, SemanticModel, TypeId};

/// An exception type that escapes a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Escape {
    pub ty: TypeId,
    /// Innermost enclosing statement, or the expression body.
    pub location: Span,
    /// The throw, call or access that raised it.
    pub node: Span,
}

/// `event += handler` or `event -= handler` with a method-group handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub event: MemberId,
    pub handler: MemberId,
    /// The handler expression.
    pub span: Span,
}

#[derive(Debug, Default)]
pub struct FlowResult {
    /// Ordered by location, then type; one entry per (location, type).
    pub escapes: Vec<Escape>,
    pub subscriptions: Vec<Subscription>,
}

/// Exception types grouped by escape location, in location order.
pub fn group_by_location(escapes: &[Escape]) -> BTreeMap<Span, Vec<TypeId>> {
    let mut grouped: BTreeMap<Span, Vec<TypeId>> = BTreeMap::new();
    for escape in escapes {
        grouped.entry(escape.location).or_default().push(escape.ty);
    }
    grouped
}

/// A catch clause as seen from inside its protected block.
struct Handler {
    /// `None` for a typeless catch or an unresolved type.
    ty: Option<TypeId>,
    typed: bool,
    filtered: bool,
    rethrows: bool,
}

type Scope = HashMap<String, Option<TypeId>>;

pub struct FlowAnalyzer<'a> {
    model: &'a SemanticModel,
    extractor: ContractExtractor<'a>,
    owner: TypeId,
    scopes: Vec<Scope>,
    statements: Vec<Span>,
    /// Catch lists of every try whose protected block encloses the walk.
    handlers: Vec<Vec<Handler>>,
    /// Types of the enclosing catch clauses, innermost last.
    catches: Vec<Option<TypeId>>,
    body_location: Option<Span>,
    reachable: bool,
    escapes: BTreeMap<(Span, TypeId), Span>,
    subscriptions: Vec<Subscription>,
}

impl<'a> FlowAnalyzer<'a> {
    pub fn new(model: &'a SemanticModel, owner: TypeId) -> Self {
        Self {
            model,
            extractor: ContractExtractor::new(model),
            owner,
            scopes: vec![Scope::new()],
            statements: Vec::new(),
            handlers: Vec::new(),
            catches: Vec::new(),
            body_location: None,
            reachable: true,
            escapes: BTreeMap::new(),
            subscriptions: Vec::new(),
        }
    }

    /// Analyze a body whose parameters are `params`.
    pub fn analyze(mut self, body: &Body, params: &[Param]) -> FlowResult {
        for param in params {
            let ty = param
                .ty
                .as_deref()
                .and_then(|t| self.model.resolve_type(t, self.owner));
            self.declare(&param.name, ty);
        }
        // A setter's implicit parameter.
        self.declare("value", None);

        match body {
            Body::Block(block) => self.visit_block(block),
            Body::Arrow(expr, span) => {
                self.body_location = Some(*span);
                self.visit_expr(expr, AccessorScope::Get);
            }
        }

        FlowResult {
            escapes: self
                .escapes
                .into_iter()
                .map(|((location, ty), node)| Escape { ty, location, node })
                .collect(),
            subscriptions: self.subscriptions,
        }
    }

    // -------------------------------------------------------------------------
    // Bookkeeping
    // -------------------------------------------------------------------------

    fn declare(&mut self, name: &str, ty: Option<TypeId>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    fn local(&self, name: &str) -> Option<Option<TypeId>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn location(&self) -> Option<Span> {
        self.statements.last().copied().or(self.body_location)
    }

    fn is_caught(&self, ty: TypeId) -> bool {
        self.handlers.iter().any(|catches| {
            catches.iter().any(|handler| {
                if handler.filtered {
                    return false;
                }
                match handler.ty {
                    Some(caught) => self.model.is_subtype(ty, caught),
                    None => !handler.typed && !handler.rethrows,
                }
            })
        })
    }

    fn contribute(&mut self, ty: TypeId, node: Span) {
        if self.is_caught(ty) {
            return;
        }
        let Some(location) = self.location() else {
            return;
        };
        self.escapes.entry((location, ty)).or_insert(node);
    }

    fn contribute_member(&mut self, member: MemberId, scope: AccessorScope, node: Span) {
        let declared = self.extractor.declared_exceptions(member, true, scope);
        for ty in declared {
            self.contribute(ty, node);
        }
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    fn visit_block(&mut self, block: &Block) {
        self.scopes.push(Scope::new());
        self.visit_stmts(&block.stmts);
        self.scopes.pop();
    }

    fn visit_stmts(&mut self, stmts: &[Stmt]) {
        let outer = self.reachable;
        for stmt in stmts {
            self.visit_stmt(stmt);
            if self.reachable && !reachability::can_complete(stmt) {
                self.reachable = false;
            }
        }
        self.reachable = outer;
    }

    /// Visit a statement with reachability forced to `reachable && cond`.
    fn visit_branch(&mut self, stmt: &Stmt, reachable: bool) {
        let outer = self.reachable;
        self.reachable = outer && reachable;
        self.visit_stmt(stmt);
        self.reachable = outer;
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        self.statements.push(stmt.span);
        let get = AccessorScope::Get;

        match &stmt.kind {
            StmtKind::Block(block) => self.visit_block(block),
            StmtKind::Expr(expr) | StmtKind::Yield(expr) => self.visit_expr(expr, get),
            StmtKind::Local { ty, vars } => {
                let declared = ty
                    .as_deref()
                    .and_then(|t| self.model.resolve_type(t, self.owner));
                for var in vars {
                    let mut var_ty = declared;
                    if let Some(init) = &var.init {
                        self.visit_expr(init, get);
                        if ty.is_none() {
                            var_ty = self.static_type(init);
                        }
                    }
                    self.declare(&var.name, var_ty);
                }
            }
            StmtKind::Return(expr) => {
                if let Some(expr) = expr {
                    self.visit_expr(expr, get);
                }
            }
            StmtKind::Throw(expr) => {
                if let Some(expr) = expr {
                    self.visit_expr(expr, get);
                }
                if self.reachable {
                    match expr {
                        Some(expr) => self.add_thrown(expr, stmt.span),
                        None => self.add_rethrow(stmt.span),
                    }
                }
            }
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                self.visit_expr(cond, get);
                let constant = cond.constant_bool();
                self.visit_branch(then, constant != Some(false));
                if let Some(otherwise) = otherwise {
                    self.visit_branch(otherwise, constant != Some(true));
                }
            }
            StmtKind::While { cond, body } => {
                self.visit_expr(cond, get);
                self.visit_branch(body, cond.constant_bool() != Some(false));
            }
            StmtKind::DoWhile { body, cond } => {
                self.visit_stmt(body);
                self.visit_expr(cond, get);
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                self.scopes.push(Scope::new());
                for stmt in init {
                    self.visit_stmt(stmt);
                }
                if let Some(cond) = cond {
                    self.visit_expr(cond, get);
                }
                for expr in update {
                    self.visit_expr(expr, get);
                }
                let runs = cond.as_ref().map(|c| c.constant_bool()) != Some(Some(false));
                self.visit_branch(body, runs);
                self.scopes.pop();
            }
            StmtKind::Foreach { ty, var, iter, body } => {
                self.visit_expr(iter, get);
                self.scopes.push(Scope::new());
                if let Some(var) = var {
                    let var_ty = ty
                        .as_deref()
                        .filter(|t| *t != "var")
                        .and_then(|t| self.model.resolve_type(t, self.owner));
                    self.declare(var, var_ty);
                }
                self.visit_stmt(body);
                self.scopes.pop();
            }
            StmtKind::Try(try_stmt) => self.visit_try(try_stmt),
            StmtKind::Switch { value, sections } => {
                self.visit_expr(value, get);
                self.scopes.push(Scope::new());
                for section in sections {
                    self.visit_stmts(&section.stmts);
                }
                self.scopes.pop();
            }
            StmtKind::Using { decl, exprs, body } => {
                self.scopes.push(Scope::new());
                if let Some(decl) = decl {
                    self.visit_stmt(decl);
                }
                for expr in exprs {
                    self.visit_expr(expr, get);
                }
                self.visit_stmt(body);
                self.scopes.pop();
            }
            StmtKind::Labeled(inner) => {
                // Assume some goto targets the label.
                let outer = self.reachable;
                self.reachable = true;
                self.visit_stmt(inner);
                self.reachable = outer;
            }
            StmtKind::LocalFunction { body, .. } => {
                if let Some(body) = body {
                    self.visit_nested_body(body, &[]);
                }
            }
            StmtKind::Other { exprs, stmts } => {
                for expr in exprs {
                    self.visit_expr(expr, get);
                }
                self.scopes.push(Scope::new());
                self.visit_stmts(stmts);
                self.scopes.pop();
            }
            StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Goto
            | StmtKind::YieldBreak
            | StmtKind::Empty => {}
        }

        self.statements.pop();
    }

    fn visit_try(&mut self, try_stmt: &TryStmt) {
        let handlers = try_stmt
            .catches
            .iter()
            .map(|clause| self.handler_for(clause))
            .collect();
        self.handlers.push(handlers);
        self.visit_block(&try_stmt.block);
        self.handlers.pop();

        for clause in &try_stmt.catches {
            let caught = clause
                .ty
                .as_deref()
                .and_then(|t| self.model.resolve_type(t, self.owner));
            self.scopes.push(Scope::new());
            if let Some(var) = &clause.var {
                self.declare(var, caught);
            }
            if let Some(filter) = &clause.filter {
                self.visit_expr(filter, AccessorScope::Get);
            }
            self.catches.push(caught);
            self.visit_block(&clause.block);
            self.catches.pop();
            self.scopes.pop();
        }

        if let Some(finally) = &try_stmt.finally {
            self.visit_block(finally);
        }
    }

    fn handler_for(&self, clause: &CatchClause) -> Handler {
        let ty = clause.ty.as_deref().and_then(|t| {
            let resolved = self.model.resolve_type(t, self.owner);
            if resolved.is_none() {
                debug!(catch_type = %t, "unresolved catch type never matches");
            }
            resolved
        });
        Handler {
            ty,
            typed: clause.ty.is_some(),
            filtered: clause.filter.is_some(),
            rethrows: reachability::contains_rethrow(&clause.block),
        }
    }

    /// Lambda and local-function bodies run in the enclosing statement's context.
    fn visit_nested_body(&mut self, body: &Body, params: &[String]) {
        let outer = self.reachable;
        self.reachable = true;
        self.scopes.push(Scope::new());
        for param in params {
            self.declare(param, None);
        }
        match body {
            Body::Block(block) => self.visit_block(block),
            Body::Arrow(expr, _) => self.visit_expr(expr, AccessorScope::Get),
        }
        self.scopes.pop();
        self.reachable = outer;
    }

    // -------------------------------------------------------------------------
    // Throws
    // -------------------------------------------------------------------------

    fn add_thrown(&mut self, expr: &Expr, node: Span) {
        let thrown = match &expr.unparen().kind {
            ExprKind::New { ty: Some(ty), .. } => self.model.resolve_type(ty, self.owner),
            _ => self.static_type(expr),
        };
        match thrown {
            Some(ty) => self.contribute(ty, node),
            None => debug!(span = %expr.span, "thrown expression has no known type"),
        }
    }

    /// A bare `throw;` rethrows the type of every enclosing typed catch.
    fn add_rethrow(&mut self, node: Span) {
        let rethrown: Vec<TypeId> = self.catches.iter().flatten().copied().collect();
        for ty in rethrown {
            self.contribute(ty, node);
        }
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    fn visit_expr(&mut self, expr: &Expr, access: AccessorScope) {
        let get = AccessorScope::Get;
        match &expr.kind {
            ExprKind::Name(name) => {
                if self.local(name).is_none() {
                    let owner = self.owner;
                    self.contribute_property(owner, name, access, expr.span);
                }
            }
            ExprKind::Member { target, name } => {
                self.visit_expr(target, get);
                if let Some(ty) = self.static_type(target) {
                    self.contribute_property(ty, name, access, expr.span);
                }
            }
            ExprKind::Invoke { callee, args } => {
                match &callee.kind {
                    ExprKind::Name(_) => {}
                    ExprKind::Member { target, .. } => self.visit_expr(target, get),
                    _ => self.visit_expr(callee, get),
                }
                if let Some(method) = self.resolve_invocation(callee, args.len()) {
                    self.contribute_member(method, AccessorScope::None, expr.span);
                }
                for arg in args {
                    self.visit_expr(arg, get);
                }
            }
            ExprKind::New { ty, args, init } => {
                let created = ty
                    .as_deref()
                    .and_then(|t| self.model.resolve_type(t, self.owner));
                let ctor = created.and_then(|t| self.model.find_constructor(t, args.len()));
                if let Some(ctor) = ctor {
                    self.contribute_member(ctor, AccessorScope::None, expr.span);
                }
                for arg in args {
                    self.visit_expr(arg, get);
                }
                for item in init {
                    self.visit_initializer_item(created, item);
                }
            }
            ExprKind::Throw(thrown) => {
                self.visit_expr(thrown, get);
                self.add_thrown(thrown, expr.span);
            }
            ExprKind::Assign { op, target, value } => {
                if matches!(op, AssignOp::Add | AssignOp::Subtract) {
                    self.record_subscription(target, value);
                }
                let target_access = match op {
                    AssignOp::Simple => AccessorScope::Set,
                    _ => AccessorScope::Both,
                };
                self.visit_expr(target, target_access);
                self.visit_expr(value, get);
            }
            ExprKind::Unary { op, operand } => {
                let operand_access = match op {
                    UnaryOp::Increment | UnaryOp::Decrement => AccessorScope::Both,
                    UnaryOp::Not | UnaryOp::Other => get,
                };
                self.visit_expr(operand, operand_access);
            }
            ExprKind::ElementAccess { target, args } => {
                self.visit_expr(target, get);
                let indexer = self
                    .static_type(target)
                    .and_then(|t| self.model.find_indexer(t, args.len()));
                if let Some(indexer) = indexer {
                    self.contribute_member(indexer, access, expr.span);
                }
                for arg in args {
                    self.visit_expr(arg, get);
                }
            }
            ExprKind::Paren(inner) => self.visit_expr(inner, access),
            ExprKind::Lambda { params, body } => self.visit_nested_body(body, params),
            ExprKind::Binary { lhs, rhs } => {
                self.visit_expr(lhs, get);
                self.visit_expr(rhs, get);
            }
            ExprKind::Cast { expr: inner, .. } | ExprKind::As { expr: inner, .. } => {
                self.visit_expr(inner, get)
            }
            ExprKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                self.visit_expr(cond, get);
                self.visit_expr(then, get);
                self.visit_expr(otherwise, get);
            }
            ExprKind::Other(children) => {
                for child in children {
                    self.visit_expr(child, get);
                }
            }
            ExprKind::This | ExprKind::Base | ExprKind::Literal(_) => {}
        }
    }

    /// `Prop = value` inside `new T { ... }` writes `Prop` on the created `T`.
    fn visit_initializer_item(&mut self, created: Option<TypeId>, item: &Expr) {
        match &item.kind {
            ExprKind::Assign {
                op: AssignOp::Simple,
                target,
                value,
            } => {
                match (&target.kind, created) {
                    (ExprKind::Name(name), Some(ty)) => {
                        self.contribute_property(ty, name, AccessorScope::Set, item.span)
                    }
                    (ExprKind::Name(_), None) => {}
                    _ => self.visit_expr(target, AccessorScope::Set),
                }
                self.visit_expr(value, AccessorScope::Get);
            }
            _ => self.visit_expr(item, AccessorScope::Get),
        }
    }

    fn contribute_property(&mut self, ty: TypeId, name: &str, access: AccessorScope, node: Span) {
        let Some(member) = self.model.find_value_member(ty, name) else {
            return;
        };
        if self.model.member(member).kind == MemberKind::Property {
            self.contribute_member(member, access, node);
        }
    }

    fn resolve_invocation(&self, callee: &Expr, args: usize) -> Option<MemberId> {
        match &callee.unparen().kind {
            ExprKind::Name(name) => self.model.find_method(self.owner, name, args),
            ExprKind::Member { target, name } => {
                let ty = self.static_type(target)?;
                self.model.find_method(ty, name, args)
            }
            _ => None,
        }
    }

    /// The method a method-group expression names.
    fn resolve_method_group(&self, expr: &Expr) -> Option<MemberId> {
        match &expr.unparen().kind {
            ExprKind::Name(name) if self.local(name).is_none() => {
                self.model.find_method_group(self.owner, name)
            }
            ExprKind::Member { target, name } => {
                let ty = self.static_type(target)?;
                self.model.find_method_group(ty, name)
            }
            // new EventHandler(OnChanged)
            ExprKind::New { args, .. } if args.len() == 1 => self.resolve_method_group(&args[0]),
            _ => None,
        }
    }

    fn record_subscription(&mut self, target: &Expr, value: &Expr) {
        let event = match &target.unparen().kind {
            ExprKind::Name(name) if self.local(name).is_none() => {
                self.model.find_value_member(self.owner, name)
            }
            ExprKind::Member { target, name } => self
                .static_type(target)
                .and_then(|t| self.model.find_value_member(t, name)),
            _ => None,
        };
        let Some(event) = event.filter(|e| self.model.member(*e).kind == MemberKind::Event) else {
            return;
        };
        if let Some(handler) = self.resolve_method_group(value) {
            self.subscriptions.push(Subscription {
                event,
                handler,
                span: value.span,
            });
        }
    }

    // -------------------------------------------------------------------------
    // Static typing
    // -------------------------------------------------------------------------

    /// Best-effort static type of an expression.
    fn static_type(&self, expr: &Expr) -> Option<TypeId> {
        match &expr.kind {
            ExprKind::Name(name) => {
                if let Some(local) = self.local(name) {
                    return local;
                }
                match self.model.find_value_member(self.owner, name) {
                    Some(member) => self.model.member(member).value_type,
                    None => self.model.resolve_type(name, self.owner),
                }
            }
            ExprKind::This => Some(self.owner),
            ExprKind::Base => self.model.ty(self.owner).base,
            ExprKind::Member { target, name } => {
                if let Some(ty) = self.static_type(target) {
                    if let Some(member) = self.model.find_value_member(ty, name) {
                        return self.model.member(member).value_type;
                    }
                    let nested = format!("{}.{}", self.model.ty(ty).full_name, name);
                    if let Some(nested) = self.model.lookup(&nested) {
                        return Some(nested);
                    }
                }
                dotted_name(expr).and_then(|n| self.model.resolve_type(&n, self.owner))
            }
            ExprKind::Invoke { callee, args } => self
                .resolve_invocation(callee, args.len())
                .and_then(|m| self.model.member(m).value_type),
            ExprKind::New { ty: Some(ty), .. } => self.model.resolve_type(ty, self.owner),
            ExprKind::Cast { ty, .. } | ExprKind::As { ty, .. } => {
                self.model.resolve_type(ty, self.owner)
            }
            ExprKind::Paren(inner) => self.static_type(inner),
            ExprKind::Conditional {
                then, otherwise, ..
            } => self.static_type(then).or_else(|| self.static_type(otherwise)),
            ExprKind::ElementAccess { target, args } => self
                .static_type(target)
                .and_then(|t| self.model.find_indexer(t, args.len()))
                .and_then(|m| self.model.member(m).value_type),
            ExprKind::Assign { value, .. } => self.static_type(value),
            _ => None,
        }
    }
}

/// `a.b.c` written as a plain dotted name.
fn dotted_name(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Name(name) => Some(name.clone()),
        ExprKind::Member { target, name } => {
            dotted_name(target).map(|prefix| format!("{}.{}", prefix, name))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parse_source;
    use crate::analysis::syntax::{AccessorKind, SourceFile};

    struct Fixture {
        file: SourceFile,
        model: SemanticModel,
    }

    impl Fixture {
        fn new(src: &str) -> Self {
            let file = parse_source("Test.cs", src).unwrap();
            let model = SemanticModel::build(std::slice::from_ref(&file));
            Self { file, model }
        }

        /// Escapes of `ty.member`, rendered as (line, type name).
        fn escapes(&self, ty: &str, member: &str) -> Vec<(usize, String)> {
            self.result(ty, member, None)
                .escapes
                .iter()
                .map(|e| (e.location.start_line, self.model.ty(e.ty).name.clone()))
                .collect()
        }

        fn result(&self, ty: &str, member: &str, accessor: Option<AccessorKind>) -> FlowResult {
            let (decl_idx, decl) = self
                .file
                .types
                .iter()
                .enumerate()
                .find(|(_, t)| t.name == ty)
                .unwrap();
            let owner = self.model.source_type(0, decl_idx).unwrap();
            let m = decl.members.iter().find(|m| m.name == member).unwrap();
            let body = match accessor {
                Some(kind) => m.accessor(kind).unwrap().body.as_ref().unwrap(),
                None => m.body.as_ref().unwrap(),
            };
            FlowAnalyzer::new(&self.model, owner).analyze(body, &m.params)
        }
    }

    #[test]
    fn test_uncaught_throw() {
        let f = Fixture::new(
            r#"using System;
class C
{
    void M()
    {
        throw new Exception();
    }
}"#,
        );
        assert_eq!(f.escapes("C", "M"), vec![(6, "Exception".to_string())]);
    }

    #[test]
    fn test_catch_requires_supertype() {
        let f = Fixture::new(
            r#"using System;
class C
{
    void Narrow()
    {
        try { throw new Exception(); } catch (FieldAccessException) { }
    }
    void Wide()
    {
        try { throw new FieldAccessException(); } catch (Exception) { }
    }
    void Filtered()
    {
        try { throw new FieldAccessException(); } catch (Exception e) when (e != null) { }
    }
}"#,
        );
        assert_eq!(f.escapes("C", "Narrow"), vec![(6, "Exception".to_string())]);
        assert!(f.escapes("C", "Wide").is_empty());
        assert_eq!(
            f.escapes("C", "Filtered"),
            vec![(14, "FieldAccessException".to_string())]
        );
    }

    #[test]
    fn test_rethrow_reports_catch_type() {
        let f = Fixture::new(
            r#"using System;
class C
{
    void M()
    {
        try
        {
            Work();
        }
        catch (FieldAccessException)
        {
            throw;
        }
    }
    void Work() { }
}"#,
        );
        assert_eq!(
            f.escapes("C", "M"),
            vec![(12, "FieldAccessException".to_string())]
        );
    }

    #[test]
    fn test_nested_rethrow_reports_every_enclosing_catch() {
        let f = Fixture::new(
            r#"using System;
using System.IO;
class C
{
    void M()
    {
        try { Work(); }
        catch (IOException)
        {
            try { Work(); }
            catch (FileNotFoundException)
            {
                throw;
            }
        }
    }
    void Work() { }
}"#,
        );
        let mut got = f.escapes("C", "M");
        got.sort();
        assert_eq!(
            got,
            vec![
                (13, "FileNotFoundException".to_string()),
                (13, "IOException".to_string())
            ]
        );
    }

    #[test]
    fn test_catch_all_with_rethrow_does_not_handle() {
        let f = Fixture::new(
            r#"using System;
class C
{
    void Rethrows()
    {
        try { throw new TimeoutException(); } catch { Log(); throw; }
    }
    void Swallows()
    {
        try { throw new TimeoutException(); } catch { Log(); }
    }
    void Log() { }
}"#,
        );
        assert_eq!(
            f.escapes("C", "Rethrows"),
            vec![(6, "TimeoutException".to_string())]
        );
        assert!(f.escapes("C", "Swallows").is_empty());
    }

    #[test]
    fn test_unreachable_throw_is_ignored() {
        let f = Fixture::new(
            r#"using System;
class C
{
    int M()
    {
        return 1;
        throw new Exception();
    }
    void N()
    {
        if (false) { throw new Exception(); }
    }
}"#,
        );
        assert!(f.escapes("C", "M").is_empty());
        assert!(f.escapes("C", "N").is_empty());
    }

    #[test]
    fn test_callee_contracts() {
        let f = Fixture::new(
            r#"using System;
using System.IO;
class Repo
{
    /// <exception cref="IOException"></exception>
    public Repo() { }

    /// <exception cref="TimeoutException"></exception>
    /// <exception cref="InvalidOperationException">Ignore.</exception>
    public void Save() { }
}
class Service
{
    private Repo repo;

    void Run()
    {
        var r = new Repo();
        r.Save();
        repo.Save();
    }

    void Lambda()
    {
        Action a = () => repo.Save();
    }
}"#,
        );
        assert_eq!(
            f.escapes("Service", "Run"),
            vec![
                (18, "IOException".to_string()),
                (19, "TimeoutException".to_string()),
                (20, "TimeoutException".to_string())
            ]
        );
        assert_eq!(
            f.escapes("Service", "Lambda"),
            vec![(25, "TimeoutException".to_string())]
        );
    }

    #[test]
    fn test_property_access_kinds() {
        let f = Fixture::new(
            r#"using System;
class Gauge
{
    /// <exception cref="InvalidOperationException">Get.</exception>
    /// <exception cref="TimeoutException">Set.</exception>
    public int Level { get { return 0; } set { } }
}
class User
{
    void Read(Gauge g) { var x = g.Level; }
    void Write(Gauge g) { g.Level = 3; }
    void Bump(Gauge g) { g.Level++; }
}"#,
        );
        assert_eq!(
            f.escapes("User", "Read"),
            vec![(10, "InvalidOperationException".to_string())]
        );
        assert_eq!(
            f.escapes("User", "Write"),
            vec![(11, "TimeoutException".to_string())]
        );
        let mut bump = f.escapes("User", "Bump");
        bump.sort();
        assert_eq!(
            bump,
            vec![
                (12, "InvalidOperationException".to_string()),
                (12, "TimeoutException".to_string())
            ]
        );
    }

    #[test]
    fn test_object_initializer_writes_created_type() {
        let f = Fixture::new(
            r#"using System;
class Gauge
{
    /// <exception cref="TimeoutException">Set.</exception>
    public int Level { get { return 0; } set { } }
}
class User
{
    int Level { get; set; }

    void Create()
    {
        var g = new Gauge { Level = 3 };
    }

    void Untyped()
    {
        Gauge g = new() { Level = 3 };
    }
}"#,
        );
        assert_eq!(
            f.escapes("User", "Create"),
            vec![(13, "TimeoutException".to_string())]
        );
        assert!(f.escapes("User", "Untyped").is_empty());
    }

    #[test]
    fn test_thrown_variable_uses_static_type() {
        let f = Fixture::new(
            r#"using System;
class C
{
    void M(TimeoutException error)
    {
        throw error;
    }
}"#,
        );
        assert_eq!(
            f.escapes("C", "M"),
            vec![(6, "TimeoutException".to_string())]
        );
    }

    #[test]
    fn test_expression_body_location() {
        let f = Fixture::new(
            r#"using System;
class C
{
    int Value => throw new InvalidOperationException();
}"#,
        );
        let result = f.result("C", "Value", None);
        assert_eq!(result.escapes.len(), 1);
        assert_eq!(result.escapes[0].location.start_line, 4);
        assert_ne!(result.escapes[0].location, result.escapes[0].node);
    }

    #[test]
    fn test_event_subscription_recorded() {
        let f = Fixture::new(
            r#"using System;
class Source
{
    public event EventHandler Changed;
}
class Listener
{
    void Attach(Source s)
    {
        s.Changed += OnChanged;
        s.Changed += (o, e) => { };
    }
    void OnChanged(object sender, EventArgs e) { }
}"#,
        );
        let result = f.result("Listener", "Attach", None);
        assert_eq!(result.subscriptions.len(), 1);
        let handler = result.subscriptions[0].handler;
        assert_eq!(f.model.member(handler).name, "OnChanged");
    }
}
