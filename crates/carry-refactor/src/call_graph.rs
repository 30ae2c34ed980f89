//! Intra-type call graph.

use std::collections::{BTreeMap, BTreeSet};

use carry_java::{MethodId, SymbolModel, TypeName};

/// Directed graph of calls between the methods of a single type.
///
/// Only statically resolved calls whose target is declared on the subject type become edges;
/// calls into other types and unresolved calls are left out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallGraph {
    subject: TypeName,
    edges: BTreeMap<MethodId, BTreeSet<MethodId>>,
}

impl CallGraph {
    pub fn build(model: &dyn SymbolModel, subject: &TypeName) -> Self {
        let mut edges = BTreeMap::new();
        for method in model.methods_of(subject) {
            let callees: BTreeSet<MethodId> = model
                .calls_in(&method.id)
                .into_iter()
                .filter_map(|call| call.target.clone())
                .filter(|target| &target.owner == subject)
                .collect();
            edges.insert(method.id.clone(), callees);
        }
        tracing::trace!(
            target: "carry.refactor",
            ty = %subject,
            methods = edges.len(),
            edges = edges.values().map(BTreeSet::len).sum::<usize>(),
            "built call graph"
        );
        CallGraph {
            subject: subject.clone(),
            edges,
        }
    }

    pub fn subject(&self) -> &TypeName {
        &self.subject
    }

    /// Direct callees of `method` on the subject type.
    pub fn callees(&self, method: &MethodId) -> impl Iterator<Item = &MethodId> {
        self.edges.get(method).into_iter().flatten()
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodId> {
        self.edges.keys()
    }

    /// Depth-first closure of `root` under the call relation, `root` first, in discovery order.
    pub fn reachable_from(&self, root: &MethodId) -> Vec<MethodId> {
        let mut visited = BTreeSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(method) = stack.pop() {
            if !visited.insert(method.clone()) {
                continue;
            }
            // Reverse so the first callee is explored first.
            let mut next: Vec<&MethodId> = self
                .callees(&method)
                .filter(|m| !visited.contains(*m))
                .collect();
            next.reverse();
            stack.extend(next.into_iter().cloned());
            order.push(method);
        }
        order
    }
}
