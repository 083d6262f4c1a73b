//! Declared-exception sets for members.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use super::AccessorScope;
use crate::semantic::{MemberId, SemanticModel, TypeId};

/// Resolves the exceptions a member declares, following `<inheritdoc/>`.
#[derive(Clone, Copy)]
pub struct ContractExtractor<'a> {
    model: &'a SemanticModel,
}

impl<'a> ContractExtractor<'a> {
    pub fn new(model: &'a SemanticModel) -> Self {
        Self { model }
    }

    /// Exceptions declared by `member` for the given accessor scope.
    ///
    /// With `ignore_marked`, entries marked `Ignore.` are left out. Accessor
    /// tags only count on properties, indexers and events; elsewhere every
    /// entry is unscoped. Absent or malformed blocks declare nothing.
    pub fn declared_exceptions(
        &self,
        member: MemberId,
        ignore_marked: bool,
        scope: AccessorScope,
    ) -> BTreeSet<TypeId> {
        let mut declared = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut worklist = vec![member];

        while let Some(current) = worklist.pop() {
            if !visited.insert(current) {
                continue;
            }
            let info = self.model.member(current);
            let Some(doc) = info.doc.as_ref().filter(|d| d.well_formed) else {
                continue;
            };
            let scoped = info.kind.has_accessors();

            for entry in &doc.entries {
                if ignore_marked && entry.ignored {
                    continue;
                }
                let tag = if scoped { entry.accessor } else { None };
                if !scope.admits(tag) {
                    continue;
                }
                match self.model.resolve_type(entry.type_ref(), info.owner) {
                    Some(ty) => {
                        declared.insert(ty);
                    }
                    None => {
                        debug!(
                            cref = %entry.cref,
                            member = %info.name,
                            "unresolved exception cref"
                        );
                    }
                }
            }

            if doc.inherit {
                worklist.extend(self.model.base_member(current));
                worklist.extend(self.model.implemented_interface_members(current));
            }
        }

        declared
    }

    /// Whether `ty` is covered by something the member declares.
    pub fn declares(
        &self,
        member: MemberId,
        ty: TypeId,
        ignore_marked: bool,
        scope: AccessorScope,
    ) -> bool {
        let declared = self.declared_exceptions(member, ignore_marked, scope);
        self.model.is_covered(ty, &declared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parse_source;

    fn build(src: &str) -> SemanticModel {
        let file = parse_source("Test.cs", src).unwrap();
        SemanticModel::build(&[file])
    }

    /// Simple names, sorted. Id order follows declaration order, not names.
    fn names(model: &SemanticModel, set: &BTreeSet<TypeId>) -> Vec<String> {
        let mut names: Vec<String> = set.iter().map(|t| model.ty(*t).name.clone()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_plain_method_declarations() {
        let model = build(
            r#"using System;
using System.IO;
class Store
{
    /// <summary>Loads.</summary>
    /// <exception cref="IOException">Disk trouble.</exception>
    /// <exception cref="InvalidOperationException">Ignore. Not open.</exception>
    /// <exception cref="NoSuchType">Dropped.</exception>
    public void Load() { }
}"#,
        );
        let store = model.lookup("Store").unwrap();
        let load = model.find_method(store, "Load", 0).unwrap();
        let extractor = ContractExtractor::new(&model);

        let all = extractor.declared_exceptions(load, false, AccessorScope::None);
        assert_eq!(names(&model, &all), vec!["IOException", "InvalidOperationException"]);

        let unignored = extractor.declared_exceptions(load, true, AccessorScope::None);
        assert_eq!(names(&model, &unignored), vec!["IOException"]);
    }

    #[test]
    fn test_accessor_scoped_entries() {
        let model = build(
            r#"using System;
class Gauge
{
    /// <exception cref="InvalidOperationException">Get. Not ready.</exception>
    /// <exception cref="ArgumentException">Set. Bad value.</exception>
    /// <exception cref="TimeoutException">Slow.</exception>
    public int Level { get { return 0; } set { } }

    /// <exception cref="TimeoutException">Get. Looks like a tag.</exception>
    public void Poll() { }
}"#,
        );
        let gauge = model.lookup("Gauge").unwrap();
        let level = model.find_value_member(gauge, "Level").unwrap();
        let extractor = ContractExtractor::new(&model);

        let get = extractor.declared_exceptions(level, false, AccessorScope::Get);
        assert_eq!(names(&model, &get), vec!["InvalidOperationException"]);
        let set = extractor.declared_exceptions(level, false, AccessorScope::Set);
        assert_eq!(names(&model, &set), vec!["ArgumentException"]);
        let both = extractor.declared_exceptions(level, false, AccessorScope::Both);
        assert_eq!(both.len(), 2);
        let none = extractor.declared_exceptions(level, false, AccessorScope::None);
        assert_eq!(none.len(), 3);

        // Tags on a plain method are ignored, so a Get query finds nothing.
        let poll = model.find_method(gauge, "Poll", 0).unwrap();
        assert!(extractor
            .declared_exceptions(poll, false, AccessorScope::Get)
            .is_empty());
        assert_eq!(
            extractor
                .declared_exceptions(poll, false, AccessorScope::None)
                .len(),
            1
        );
    }

    #[test]
    fn test_inheritdoc_unions_base_and_interfaces() {
        let model = build(
            r#"using System;
using System.IO;
interface IReader
{
    /// <exception cref="IOException"></exception>
    void Read();
}
class BaseReader
{
    /// <exception cref="TimeoutException"></exception>
    public virtual void Read() { }
}
class Reader : BaseReader, IReader
{
    /// <inheritdoc/>
    public override void Read() { }
}"#,
        );
        let reader = model.lookup("Reader").unwrap();
        let read = model.find_method(reader, "Read", 0).unwrap();
        let extractor = ContractExtractor::new(&model);
        let declared = extractor.declared_exceptions(read, false, AccessorScope::None);
        let got = names(&model, &declared);
        assert_eq!(got, vec!["IOException", "TimeoutException"]);
    }

    #[test]
    fn test_malformed_block_declares_nothing() {
        let model = build(
            r#"using System;
class Broken
{
    /// <exception cref="TimeoutException">Slow.
    public void Run() { }
}"#,
        );
        let broken = model.lookup("Broken").unwrap();
        let run = model.find_method(broken, "Run", 0).unwrap();
        let extractor = ContractExtractor::new(&model);
        assert!(extractor
            .declared_exceptions(run, false, AccessorScope::None)
            .is_empty());
    }

    #[test]
    fn test_declares_uses_subsumption() {
        let model = build(
            r#"using System;
class Api
{
    /// <exception cref="ArgumentException"></exception>
    public void Call(string s) { }
}"#,
        );
        let api = model.lookup("Api").unwrap();
        let call = model.find_method(api, "Call", 1).unwrap();
        let null = model.lookup("System.ArgumentNullException").unwrap();
        let io = model.lookup("System.IO.IOException").unwrap();
        let extractor = ContractExtractor::new(&model);
        assert!(extractor.declares(call, null, false, AccessorScope::None));
        assert!(!extractor.declares(call, io, false, AccessorScope::None));
    }
}
