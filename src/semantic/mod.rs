//! Symbol table for one analysis pass.
//!
//! The model is built once from every lowered file plus the prelude and is
//! immutable afterwards, so it can be shared across rayon workers.
//!
//! Type references are resolved the way C# name lookup roughly does it:
//! nested types, then the namespace chain, then `using` imports, and finally a
//! unique simple-name match across everything known.

mod prelude;

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::analysis::syntax::{MemberKind, SourceFile, TypeKind, Visibility};
use crate::contract::DocComment;

pub use prelude::{keyword_alias, PRELUDE_TYPES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub usize);

/// Where a member is declared in the lowered sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclRef {
    pub file: usize,
    pub ty: usize,
    pub member: usize,
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub full_name: String,
    pub namespace: String,
    pub kind: TypeKind,
    pub base: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub members: Vec<MemberId>,
    pub outer: Option<TypeId>,
    pub usings: Vec<String>,
    pub from_source: bool,
}

#[derive(Debug, Clone)]
pub struct MemberInfo {
    pub name: String,
    pub kind: MemberKind,
    pub owner: TypeId,
    pub visibility: Visibility,
    pub is_static: bool,
    pub param_count: usize,
    pub arity: (usize, Option<usize>),
    /// Return type for methods, value type otherwise.
    pub value_type: Option<TypeId>,
    pub explicit_interface: Option<TypeId>,
    pub has_getter: bool,
    pub has_setter: bool,
    pub doc: Option<DocComment>,
    pub decl: DeclRef,
}

impl MemberInfo {
    pub fn accepts_args(&self, count: usize) -> bool {
        let (min, max) = self.arity;
        count >= min && max.map_or(true, |max| count <= max)
    }
}

/// Immutable symbol table.
#[derive(Debug, Default)]
pub struct SemanticModel {
    types: Vec<TypeInfo>,
    members: Vec<MemberInfo>,
    by_full_name: HashMap<String, TypeId>,
    by_simple_name: HashMap<String, Vec<TypeId>>,
    source_types: HashMap<(usize, usize), TypeId>,
    source_members: HashMap<DeclRef, MemberId>,
}

/// Normalize a written type reference for lookup.
///
/// Strips `global::`, generic arguments (`<..>` or cref-style `{..}`),
/// nullable markers and array ranks.
pub fn normalize_type_name(raw: &str) -> Option<String> {
    let mut name = raw.trim();
    name = name.strip_prefix("global::").unwrap_or(name);
    if let Some(idx) = name.find(|c| c == '<' || c == '{' || c == '[' || c == '(') {
        name = &name[..idx];
    }
    let name = name.trim().trim_end_matches('?').trim();
    if name.is_empty() {
        None
    } else {
        Some(name.split_whitespace().collect())
    }
}

fn parent_namespace(ns: &str) -> &str {
    ns.rfind('.').map(|i| &ns[..i]).unwrap_or("")
}

impl SemanticModel {
    /// Build the model from lowered sources.
    pub fn build(files: &[SourceFile]) -> Self {
        let mut model = SemanticModel::default();

        for (full_name, _) in PRELUDE_TYPES.iter() {
            let namespace = parent_namespace(full_name).to_string();
            let name = full_name.rsplit('.').next().unwrap_or(*full_name).to_string();
            model.add_type(TypeInfo {
                name,
                full_name: full_name.to_string(),
                namespace,
                kind: TypeKind::Class,
                base: None,
                interfaces: Vec::new(),
                members: Vec::new(),
                outer: None,
                usings: Vec::new(),
                from_source: false,
            });
        }
        for (full_name, parent) in PRELUDE_TYPES.iter() {
            let (Some(id), Some(parent)) = (model.lookup(full_name), parent) else {
                continue;
            };
            model.types[id.0].base = model.lookup(parent);
        }

        // Declare source types first so bases can refer to any of them.
        for (file_idx, file) in files.iter().enumerate() {
            for (decl_idx, decl) in file.types.iter().enumerate() {
                let outer = decl
                    .outer
                    .and_then(|o| model.source_types.get(&(file_idx, o)).copied());
                let full_name = match outer {
                    Some(o) => format!("{}.{}", model.types[o.0].full_name, decl.name),
                    None if decl.namespace.is_empty() => decl.name.clone(),
                    None => format!("{}.{}", decl.namespace, decl.name),
                };

                // Partial declarations merge into one type.
                let existing = model
                    .by_full_name
                    .get(&full_name)
                    .copied()
                    .filter(|id| model.types[id.0].from_source);
                let id = match existing {
                    Some(id) => id,
                    None => model.add_type(TypeInfo {
                        name: decl.name.clone(),
                        full_name,
                        namespace: decl.namespace.clone(),
                        kind: decl.kind,
                        base: None,
                        interfaces: Vec::new(),
                        members: Vec::new(),
                        outer,
                        usings: decl.usings.clone(),
                        from_source: true,
                    }),
                };
                model.source_types.insert((file_idx, decl_idx), id);
            }
        }

        for (file_idx, file) in files.iter().enumerate() {
            for (decl_idx, decl) in file.types.iter().enumerate() {
                let Some(&id) = model.source_types.get(&(file_idx, decl_idx)) else {
                    continue;
                };
                for base in &decl.bases {
                    let Some(resolved) = model.resolve_type(base, id) else {
                        debug!(base = %base, ty = %decl.name, "unresolved base type");
                        continue;
                    };
                    if resolved == id {
                        continue;
                    }
                    let is_interface = model.types[resolved.0].kind == TypeKind::Interface;
                    if is_interface || decl.kind == TypeKind::Interface {
                        if !model.types[id.0].interfaces.contains(&resolved) {
                            model.types[id.0].interfaces.push(resolved);
                        }
                    } else if model.types[id.0].base.is_none() {
                        model.types[id.0].base = Some(resolved);
                    }
                }
            }
        }

        for (file_idx, file) in files.iter().enumerate() {
            for (decl_idx, decl) in file.types.iter().enumerate() {
                let Some(&owner) = model.source_types.get(&(file_idx, decl_idx)) else {
                    continue;
                };
                for (member_idx, member) in decl.members.iter().enumerate() {
                    let decl_ref = DeclRef {
                        file: file_idx,
                        ty: decl_idx,
                        member: member_idx,
                    };
                    let value_type = member
                        .ty
                        .as_deref()
                        .and_then(|t| model.resolve_type(t, owner));
                    let explicit_interface = member
                        .explicit_interface
                        .as_deref()
                        .and_then(|t| model.resolve_type(t, owner));
                    let info = MemberInfo {
                        name: member.name.clone(),
                        kind: member.kind,
                        owner,
                        visibility: member.visibility,
                        is_static: member.is_static,
                        param_count: member.params.len(),
                        arity: member.arity_range(),
                        value_type,
                        explicit_interface,
                        has_getter: member.has_getter(),
                        has_setter: member.has_setter(),
                        doc: member.doc.as_ref().map(|d| DocComment::parse(&d.text)),
                        decl: decl_ref,
                    };
                    let id = MemberId(model.members.len());
                    model.members.push(info);
                    model.types[owner.0].members.push(id);
                    model.source_members.insert(decl_ref, id);
                }
            }
        }

        debug!(
            types = model.types.len(),
            members = model.members.len(),
            "semantic model built"
        );
        model
    }

    fn add_type(&mut self, info: TypeInfo) -> TypeId {
        let id = TypeId(self.types.len());
        self.by_full_name.insert(info.full_name.clone(), id);
        self.by_simple_name
            .entry(info.name.clone())
            .or_default()
            .push(id);
        self.types.push(info);
        id
    }

    pub fn ty(&self, id: TypeId) -> &TypeInfo {
        &self.types[id.0]
    }

    pub fn member(&self, id: MemberId) -> &MemberInfo {
        &self.members[id.0]
    }

    /// Look up a type by its fully qualified name.
    pub fn lookup(&self, full_name: &str) -> Option<TypeId> {
        self.by_full_name.get(full_name).copied()
    }

    /// The model type for a declaration in `files[file].types[decl]`.
    pub fn source_type(&self, file: usize, decl: usize) -> Option<TypeId> {
        self.source_types.get(&(file, decl)).copied()
    }

    /// The model member for a member declaration.
    pub fn source_member(&self, decl: DeclRef) -> Option<MemberId> {
        self.source_members.get(&decl).copied()
    }

    /// Resolve a written type reference from inside `context`.
    pub fn resolve_type(&self, raw: &str, context: TypeId) -> Option<TypeId> {
        let name = normalize_type_name(raw)?;
        if let Some(alias) = keyword_alias(&name) {
            return self.lookup(alias);
        }

        // Nested types of the context and its outer types.
        let mut current = Some(context);
        let mut guard = HashSet::new();
        while let Some(t) = current {
            if !guard.insert(t) {
                break;
            }
            let info = self.ty(t);
            if let Some(id) = self.lookup(&format!("{}.{}", info.full_name, name)) {
                return Some(id);
            }
            current = info.outer;
        }

        let ctx = self.ty(context);
        let mut ns = ctx.namespace.as_str();
        loop {
            let candidate = if ns.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", ns, name)
            };
            if let Some(id) = self.lookup(&candidate) {
                return Some(id);
            }
            if ns.is_empty() {
                break;
            }
            ns = parent_namespace(ns);
        }

        for using in &ctx.usings {
            if let Some(id) = self.lookup(&format!("{}.{}", using, name)) {
                return Some(id);
            }
        }

        self.resolve_unique_simple(&name)
    }

    /// Resolve a name without any scope: fully qualified, or a unique simple name.
    pub fn resolve_global(&self, raw: &str) -> Option<TypeId> {
        let name = normalize_type_name(raw)?;
        if let Some(alias) = keyword_alias(&name) {
            return self.lookup(alias);
        }
        self.lookup(&name)
            .or_else(|| self.resolve_unique_simple(&name))
    }

    fn resolve_unique_simple(&self, name: &str) -> Option<TypeId> {
        if name.contains('.') {
            return None;
        }
        match self.by_simple_name.get(name).map(Vec::as_slice) {
            Some([only]) => Some(*only),
            Some(candidates) => {
                // Prefer a single source type over prelude types of the same name.
                let source: Vec<_> = candidates
                    .iter()
                    .filter(|id| self.ty(**id).from_source)
                    .collect();
                match source.as_slice() {
                    [only] => Some(**only),
                    _ => None,
                }
            }
            None => None,
        }
    }

    // -------------------------------------------------------------------------
    // Hierarchy
    // -------------------------------------------------------------------------

    /// The type followed by its base classes, nearest first.
    pub fn ancestors(&self, ty: TypeId) -> Vec<TypeId> {
        let mut chain = Vec::new();
        let mut current = Some(ty);
        while let Some(t) = current {
            if chain.contains(&t) {
                break;
            }
            chain.push(t);
            current = self.ty(t).base;
        }
        chain
    }

    /// Nominal subsumption: `sub` is `sup` or derives from it.
    pub fn is_subtype(&self, sub: TypeId, sup: TypeId) -> bool {
        self.ancestors(sub).contains(&sup)
    }

    /// Whether any type in `set` subsumes `ty`.
    pub fn is_covered<'a, I>(&self, ty: TypeId, set: I) -> bool
    where
        I: IntoIterator<Item = &'a TypeId>,
    {
        set.into_iter().any(|sup| self.is_subtype(ty, *sup))
    }

    /// Every interface implemented by the type or its base classes,
    /// inherited interfaces included.
    pub fn all_interfaces(&self, ty: TypeId) -> Vec<TypeId> {
        let mut result = Vec::new();
        let mut queue: VecDeque<TypeId> = VecDeque::new();
        for t in self.ancestors(ty) {
            queue.extend(self.ty(t).interfaces.iter().copied());
        }
        while let Some(i) = queue.pop_front() {
            if result.contains(&i) {
                continue;
            }
            result.push(i);
            queue.extend(self.ty(i).interfaces.iter().copied());
        }
        result
    }

    /// Types searched for member lookup, in order.
    fn lookup_chain(&self, ty: TypeId) -> Vec<TypeId> {
        if self.ty(ty).kind == TypeKind::Interface {
            let mut chain = vec![ty];
            chain.extend(self.all_interfaces(ty));
            chain
        } else {
            self.ancestors(ty)
        }
    }

    fn members_named<'a>(&'a self, ty: TypeId, name: &'a str) -> impl Iterator<Item = MemberId> + 'a {
        self.lookup_chain(ty).into_iter().flat_map(move |t| {
            self.ty(t)
                .members
                .iter()
                .copied()
                .filter(move |m| self.member(*m).name == name)
                .collect::<Vec<_>>()
        })
    }

    /// A method by name, preferring one that accepts `args` arguments.
    pub fn find_method(&self, ty: TypeId, name: &str, args: usize) -> Option<MemberId> {
        let candidates: Vec<_> = self
            .members_named(ty, name)
            .filter(|m| self.member(*m).kind == MemberKind::Method)
            .collect();
        candidates
            .iter()
            .copied()
            .find(|m| self.member(*m).accepts_args(args))
            .or_else(|| candidates.first().copied())
    }

    /// Any method with this name, regardless of arity.
    pub fn find_method_group(&self, ty: TypeId, name: &str) -> Option<MemberId> {
        self.members_named(ty, name)
            .find(|m| self.member(*m).kind == MemberKind::Method)
    }

    /// A property, field or event by name.
    pub fn find_value_member(&self, ty: TypeId, name: &str) -> Option<MemberId> {
        self.members_named(ty, name).find(|m| {
            matches!(
                self.member(*m).kind,
                MemberKind::Property | MemberKind::Field | MemberKind::Event
            )
        })
    }

    /// The indexer of a type, preferring one with `args` parameters.
    pub fn find_indexer(&self, ty: TypeId, args: usize) -> Option<MemberId> {
        let candidates: Vec<_> = self
            .members_named(ty, "this")
            .filter(|m| self.member(*m).kind == MemberKind::Indexer)
            .collect();
        candidates
            .iter()
            .copied()
            .find(|m| self.member(*m).param_count == args)
            .or_else(|| candidates.first().copied())
    }

    /// A constructor declared on the type itself.
    pub fn find_constructor(&self, ty: TypeId, args: usize) -> Option<MemberId> {
        let candidates: Vec<_> = self
            .ty(ty)
            .members
            .iter()
            .copied()
            .filter(|m| self.member(*m).kind == MemberKind::Constructor && !self.member(*m).is_static)
            .collect();
        candidates
            .iter()
            .copied()
            .find(|m| self.member(*m).accepts_args(args))
            .or_else(|| candidates.first().copied())
    }

    fn same_signature(&self, a: MemberId, b: MemberId) -> bool {
        let (a, b) = (self.member(a), self.member(b));
        a.name == b.name && a.kind == b.kind && a.param_count == b.param_count
    }

    /// The nearest base-class member this member overrides or hides.
    pub fn base_member(&self, member: MemberId) -> Option<MemberId> {
        let info = self.member(member);
        if info.is_static || info.kind == MemberKind::Constructor {
            return None;
        }
        self.ancestors(info.owner)
            .into_iter()
            .skip(1)
            .flat_map(|t| self.ty(t).members.clone())
            .find(|m| !self.member(*m).is_static && self.same_signature(*m, member))
    }

    /// Interface members this member implements.
    pub fn implemented_interface_members(&self, member: MemberId) -> Vec<MemberId> {
        let info = self.member(member);
        if info.is_static
            || info.kind == MemberKind::Constructor
            || self.ty(info.owner).kind == TypeKind::Interface
        {
            return Vec::new();
        }

        let interfaces = match info.explicit_interface {
            Some(iface) => {
                let mut chain = vec![iface];
                chain.extend(self.all_interfaces(iface));
                chain
            }
            None if info.visibility == Visibility::Public => self.all_interfaces(info.owner),
            None => return Vec::new(),
        };

        let mut result = Vec::new();
        for iface in interfaces {
            let found = self
                .ty(iface)
                .members
                .iter()
                .copied()
                .find(|m| self.same_signature(*m, member));
            if let Some(found) = found {
                result.push(found);
                if info.explicit_interface.is_some() {
                    break;
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parse_source;

    fn model(src: &str) -> SemanticModel {
        let file = parse_source("Test.cs", src).unwrap();
        SemanticModel::build(&[file])
    }

    #[test]
    fn test_normalize_type_name() {
        assert_eq!(normalize_type_name("global::System.Exception").as_deref(), Some("System.Exception"));
        assert_eq!(normalize_type_name("List<int>").as_deref(), Some("List"));
        assert_eq!(normalize_type_name("List{T}").as_deref(), Some("List"));
        assert_eq!(normalize_type_name("Foo?").as_deref(), Some("Foo"));
        assert_eq!(normalize_type_name("int[]").as_deref(), Some("int"));
        assert_eq!(normalize_type_name("  "), None);
    }

    #[test]
    fn test_prelude_subsumption() {
        let m = SemanticModel::build(&[]);
        let exception = m.lookup("System.Exception").unwrap();
        let fae = m.lookup("System.FieldAccessException").unwrap();
        let arg_null = m.lookup("System.ArgumentNullException").unwrap();
        let arg = m.lookup("System.ArgumentException").unwrap();
        assert!(m.is_subtype(fae, exception));
        assert!(m.is_subtype(arg_null, arg));
        assert!(!m.is_subtype(exception, fae));
        assert!(m.is_subtype(fae, fae));
    }

    #[test]
    fn test_resolution_through_usings_and_namespaces() {
        let m = model(
            r#"using System.IO;
namespace App.Core
{
    class MyError : IOException { }
    class Outer
    {
        class Inner { }
    }
}
namespace App.Core.Sub
{
    class User { }
}"#,
        );
        let user = m.lookup("App.Core.Sub.User").unwrap();
        let outer = m.lookup("App.Core.Outer").unwrap();
        assert_eq!(m.resolve_type("MyError", user), m.lookup("App.Core.MyError"));
        assert_eq!(m.resolve_type("Inner", outer), m.lookup("App.Core.Outer.Inner"));
        assert_eq!(
            m.resolve_type("System.Exception", user),
            m.lookup("System.Exception")
        );

        let my_error = m.lookup("App.Core.MyError").unwrap();
        let io = m.lookup("System.IO.IOException").unwrap();
        assert_eq!(m.ty(my_error).base, Some(io));
        assert!(m.is_subtype(my_error, m.lookup("System.Exception").unwrap()));
    }

    #[test]
    fn test_base_and_interface_counterparts() {
        let m = model(
            r#"interface IShape { int Area(int scale); int Sides { get; } }
class Shape { public virtual int Area(int scale) { return 0; } }
class Square : Shape, IShape
{
    public override int Area(int scale) { return 1; }
    public int Sides { get { return 4; } }
    public int Area() { return 2; }
}"#,
        );
        let square = m.lookup("Square").unwrap();
        let area = m.find_method(square, "Area", 1).unwrap();
        let base = m.base_member(area).unwrap();
        assert_eq!(m.ty(m.member(base).owner).name, "Shape");

        let ifaces = m.implemented_interface_members(area);
        assert_eq!(ifaces.len(), 1);
        assert_eq!(m.ty(m.member(ifaces[0]).owner).name, "IShape");

        let no_args = m.find_method(square, "Area", 0).unwrap();
        assert!(m.base_member(no_args).is_none());

        let sides = m.find_value_member(square, "Sides").unwrap();
        assert_eq!(m.implemented_interface_members(sides).len(), 1);
    }

    #[test]
    fn test_explicit_interface_implementation() {
        let m = model(
            r#"interface IRunner { void Run(); }
class Runner : IRunner { void IRunner.Run() { } }"#,
        );
        let runner = m.lookup("Runner").unwrap();
        let run = m.find_method(runner, "Run", 0).unwrap();
        assert!(m.member(run).explicit_interface.is_some());
        assert_eq!(m.implemented_interface_members(run).len(), 1);
    }
}
