//! Reference search and classification over a [`SymbolModel`] snapshot.

use std::collections::BTreeSet;

use carry_core::{FileId, TextRange};
use carry_java::{CallSite, MethodId, Qualifier, SymbolModel, TypeName};

/// A call site of one of the searched methods.
///
/// References are evidence read from one model snapshot; their ranges are stale as soon as any
/// edit from the same snapshot has been applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    pub callee: MethodId,
    pub file: FileId,
    /// Qualifier (if any) through the method name.
    pub range: TextRange,
    pub name_range: TextRange,
    pub caller: Option<MethodId>,
    pub caller_type: TypeName,
    pub qualifier: Option<Qualifier>,
}

impl Reference {
    fn from_site(callee: &MethodId, site: &CallSite) -> Self {
        Reference {
            callee: callee.clone(),
            file: site.file.clone(),
            range: site.range,
            name_range: site.name_range,
            caller: site.containing_method.clone(),
            caller_type: site.containing_type.clone(),
            qualifier: site.qualifier.clone(),
        }
    }

    /// `true` if the call sits in a method that belongs to `methods`.
    pub fn caller_in(&self, methods: &BTreeSet<MethodId>) -> bool {
        self.caller.as_ref().is_some_and(|c| methods.contains(c))
    }
}

/// Where the code containing a reference ends up once the move-set has moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallerPlacement {
    /// The caller moves along with the callee.
    Moving,
    /// The caller already lives in the target type or a type nested in it.
    InTarget,
    /// The caller stays where it is, outside the target type.
    Elsewhere,
}

pub fn classify(
    model: &dyn SymbolModel,
    reference: &Reference,
    move_set: &BTreeSet<MethodId>,
    target: &TypeName,
) -> CallerPlacement {
    if reference.caller_in(move_set) {
        CallerPlacement::Moving
    } else if model.is_within(&reference.caller_type, target) {
        CallerPlacement::InTarget
    } else {
        CallerPlacement::Elsewhere
    }
}

/// Every call site project-wide whose target is one of `methods`, in file and offset order.
pub fn find_references_of(model: &dyn SymbolModel, methods: &BTreeSet<MethodId>) -> Vec<Reference> {
    let mut refs: Vec<Reference> = methods
        .iter()
        .flat_map(|method| {
            model
                .find_method_references(method)
                .into_iter()
                .map(move |site| Reference::from_site(method, site))
        })
        .collect();
    refs.sort_by(|a, b| {
        a.file
            .cmp(&b.file)
            .then_with(|| a.range.start.cmp(&b.range.start))
    });
    refs
}

/// Types other than `source` and `target` whose instance methods the moving code calls.
pub fn find_external_types_referenced_in_methods(
    model: &dyn SymbolModel,
    move_set: &BTreeSet<MethodId>,
    source: &TypeName,
    target: &TypeName,
) -> BTreeSet<TypeName> {
    move_set
        .iter()
        .flat_map(|method| model.calls_in(method))
        .filter_map(|call| call.target.as_ref())
        .filter(|callee| &callee.owner != source && &callee.owner != target)
        .filter(|callee| model.method(callee).is_some_and(|decl| !decl.is_static))
        .map(|callee| callee.owner.clone())
        .collect()
}

/// A type a method depends on, expressed as the import that makes it visible.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UsedType {
    /// A fully qualified type.
    Qualified(String),
    /// A name only resolvable through an on-demand import (`java.util.*`).
    OnDemand(String),
}

impl UsedType {
    pub fn import_path(&self) -> &str {
        match self {
            UsedType::Qualified(path) | UsedType::OnDemand(path) => path,
        }
    }
}

/// Types mentioned by `method`: return, parameter and thrown types, type arguments, local
/// variable types, casts and constructor calls.
pub fn collect_used_types(model: &dyn SymbolModel, method: &MethodId) -> BTreeSet<UsedType> {
    let mut used = BTreeSet::new();
    for mention in model.type_mentions(method) {
        match &mention.qualified {
            Some(qualified) => {
                used.insert(UsedType::Qualified(qualified.clone()));
            }
            None => used.extend(
                mention
                    .wildcard_candidates
                    .iter()
                    .map(|path| UsedType::OnDemand(path.clone())),
            ),
        }
    }
    used
}

#[cfg(test)]
mod tests {
    use super::*;
    use carry_java::JavaIndex;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn index(files: &[(&str, &str)]) -> JavaIndex {
        let files: BTreeMap<FileId, String> = files
            .iter()
            .map(|(path, text)| (FileId::new(*path), text.to_string()))
            .collect();
        JavaIndex::new(&files)
    }

    fn m(owner: &str, name: &str) -> MethodId {
        MethodId::new(TypeName::new(owner), name, Vec::new())
    }

    const A: &str = "class A {
    B b;
    void run() { helper(); b.work(); Util.log(); }
    void helper() {}
}
";
    const B: &str = "class B {
    void work() {}
    void call(A a) { a.helper(); }
    class Inner { void go(A a) { a.helper(); } }
}
";
    const UTIL: &str = "class Util { static void log() {} }\n";

    #[test]
    fn references_are_classified_by_caller_placement() {
        let index = index(&[("A.java", A), ("B.java", B), ("Util.java", UTIL)]);
        let helper = m("A", "helper");
        let refs = find_references_of(&index, &BTreeSet::from([helper.clone()]));
        assert_eq!(refs.len(), 3);

        let move_set = BTreeSet::from([m("A", "run"), helper]);
        let target = TypeName::new("B");
        let placements: Vec<CallerPlacement> = refs
            .iter()
            .map(|r| classify(&index, r, &move_set, &target))
            .collect();
        assert_eq!(
            placements,
            vec![
                CallerPlacement::Moving,
                CallerPlacement::InTarget,
                CallerPlacement::InTarget
            ]
        );
        assert_eq!(
            classify(&index, &refs[1], &move_set, &TypeName::new("Util")),
            CallerPlacement::Elsewhere
        );
        assert_eq!(refs[1].qualifier.as_ref().unwrap().text, "a");
    }

    #[test]
    fn external_types_skip_static_calls_and_both_endpoints() {
        let index = index(&[("A.java", A), ("B.java", B), ("Util.java", UTIL)]);
        let move_set = BTreeSet::from([m("A", "run"), m("A", "helper")]);
        let source = TypeName::new("A");
        let external = find_external_types_referenced_in_methods(
            &index,
            &move_set,
            &source,
            &TypeName::new("Util"),
        );
        assert_eq!(external, BTreeSet::from([TypeName::new("B")]));
        let none = find_external_types_referenced_in_methods(
            &index,
            &move_set,
            &source,
            &TypeName::new("B"),
        );
        assert!(none.is_empty());
    }

    #[test]
    fn used_types_include_imports_and_on_demand_candidates() {
        let text = "package p;

import java.io.IOException;
import java.util.*;
import q.Model;

class A {
    List<Model> load(String path) throws IOException { return new ArrayList<>(); }
}
";
        let model = "package q;\npublic class Model {}\n";
        let index = index(&[("p/A.java", text), ("q/Model.java", model)]);
        let load = MethodId::new(TypeName::new("p.A"), "load", vec!["String".into()]);
        let used = collect_used_types(&index, &load);
        assert_eq!(
            used,
            BTreeSet::from([
                UsedType::Qualified("java.io.IOException".into()),
                UsedType::Qualified("q.Model".into()),
                UsedType::OnDemand("java.util.*".into()),
            ])
        );
    }
}
