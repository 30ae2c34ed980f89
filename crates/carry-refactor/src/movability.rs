//! Movable method group computation.
//!
//! The candidate group is the closure of the root under the intra-type call graph. A candidate
//! is movable when every caller of it is a movable member of the group; callers in other types,
//! in field initializers or outside the group pin it to its declaring type. The root is always
//! movable.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use carry_java::{MethodId, SymbolModel, TypeName};
use serde::Serialize;

use crate::call_graph::CallGraph;

/// Why a candidate has to stay in its declaring type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StayReason {
    /// Called from another type.
    ExternalCaller { ty: TypeName },
    /// Called by a method of the same type that is not part of the group.
    CallerOutsideGroup { caller: MethodId },
    /// Called from a field initializer or an initializer block.
    Initializer,
    /// Called by a group member that stays.
    CallerStays { caller: MethodId },
    /// Abstract or otherwise bodiless.
    NoBody,
}

impl fmt::Display for StayReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StayReason::ExternalCaller { ty } => write!(f, "called from {ty}"),
            StayReason::CallerOutsideGroup { caller } => {
                write!(f, "called by {caller}, which is not moved")
            }
            StayReason::Initializer => f.write_str("called from an initializer"),
            StayReason::CallerStays { caller } => write!(f, "called by {caller}, which stays"),
            StayReason::NoBody => f.write_str("has no body"),
        }
    }
}

/// Result of the movability analysis: every method reachable from the root, mapped to whether
/// it can move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MovabilityMap {
    root: MethodId,
    entries: BTreeMap<MethodId, bool>,
    reasons: BTreeMap<MethodId, StayReason>,
    /// Discovery order of the closure, root first.
    order: Vec<MethodId>,
}

impl MovabilityMap {
    pub fn root(&self) -> &MethodId {
        &self.root
    }

    pub fn get(&self, method: &MethodId) -> Option<bool> {
        self.entries.get(method).copied()
    }

    pub fn contains(&self, method: &MethodId) -> bool {
        self.entries.contains_key(method)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (&MethodId, bool)> + '_ {
        self.order.iter().map(|m| (m, self.entries[m]))
    }

    pub fn reason(&self, method: &MethodId) -> Option<&StayReason> {
        self.reasons.get(method)
    }

    pub fn move_set(&self) -> BTreeSet<MethodId> {
        self.select(true)
    }

    pub fn stay_set(&self) -> BTreeSet<MethodId> {
        self.select(false)
    }

    fn select(&self, movable: bool) -> BTreeSet<MethodId> {
        self.entries
            .iter()
            .filter(|(_, m)| **m == movable)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// Computes the movable group of `root` against the call graph of its declaring type.
pub fn compute_group(model: &dyn SymbolModel, root: &MethodId) -> MovabilityMap {
    let graph = CallGraph::build(model, &root.owner);
    compute_group_with(model, &graph, root)
}

/// Like [`compute_group`], reusing an already built graph of `root`'s declaring type.
pub fn compute_group_with(
    model: &dyn SymbolModel,
    graph: &CallGraph,
    root: &MethodId,
) -> MovabilityMap {
    let order = graph.reachable_from(root);
    let mut analysis = Analysis {
        model,
        group: order.iter().cloned().collect(),
        cache: BTreeMap::from([(root.clone(), true)]),
        reasons: BTreeMap::new(),
    };
    for method in &order {
        analysis.can_move(method);
    }
    analysis.settle(&order, root);

    let map = MovabilityMap {
        root: root.clone(),
        entries: analysis.cache,
        reasons: analysis.reasons,
        order,
    };
    tracing::debug!(
        target: "carry.refactor",
        root = %root,
        group = map.len(),
        movable = map.move_set().len(),
        "computed movable group"
    );
    map
}

struct Analysis<'m> {
    model: &'m dyn SymbolModel,
    group: BTreeSet<MethodId>,
    cache: BTreeMap<MethodId, bool>,
    reasons: BTreeMap<MethodId, StayReason>,
}

impl Analysis<'_> {
    fn can_move(&mut self, method: &MethodId) -> bool {
        if let Some(&known) = self.cache.get(method) {
            return known;
        }
        // Assume movable while the callers are examined so call cycles terminate.
        self.cache.insert(method.clone(), true);
        let verdict = self.check(method);
        let movable = verdict.is_none();
        if let Some(reason) = verdict {
            tracing::trace!(target: "carry.refactor", method = %method, %reason, "method stays");
            self.reasons.insert(method.clone(), reason);
        }
        self.cache.insert(method.clone(), movable);
        movable
    }

    fn check(&mut self, method: &MethodId) -> Option<StayReason> {
        let model = self.model;
        if model
            .method(method)
            .is_some_and(|decl| decl.body_range.is_none())
        {
            return Some(StayReason::NoBody);
        }
        for site in model.find_method_references(method) {
            if site.containing_type != method.owner {
                return Some(StayReason::ExternalCaller {
                    ty: site.containing_type.clone(),
                });
            }
            let Some(caller) = &site.containing_method else {
                return Some(StayReason::Initializer);
            };
            if caller == method {
                continue;
            }
            if !self.group.contains(caller) {
                return Some(StayReason::CallerOutsideGroup {
                    caller: caller.clone(),
                });
            }
            if !self.can_move(caller) {
                return Some(StayReason::CallerStays {
                    caller: caller.clone(),
                });
            }
        }
        None
    }

    /// A method certified while one of its callers was still assumed movable may depend on a
    /// caller that later failed. Falsify until no movable method has a staying group caller.
    fn settle(&mut self, order: &[MethodId], root: &MethodId) {
        let model = self.model;
        loop {
            let mut changed = false;
            for method in order.iter().filter(|m| *m != root) {
                if !self.cache[method] {
                    continue;
                }
                let staying_caller = model
                    .find_method_references(method)
                    .into_iter()
                    .filter_map(|site| site.containing_method.as_ref())
                    .find(|caller| self.cache.get(*caller) == Some(&false));
                if let Some(caller) = staying_caller {
                    self.cache.insert(method.clone(), false);
                    self.reasons.insert(
                        method.clone(),
                        StayReason::CallerStays {
                            caller: caller.clone(),
                        },
                    );
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }
}
