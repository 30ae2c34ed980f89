//! Move-method refactoring for carry.
//!
//! [`move_method`] relocates a method to another type together with every helper that only it
//! uses. Helpers that are still called from elsewhere stay behind and are reached through a
//! field; call sites across the workspace are rewritten, fields are injected where code needs
//! a receiver, and imports and unused fields are tidied up. The result is a single
//! [`carry_core::WorkspaceEdit`] plus a [`MoveReport`].

mod call_graph;
mod imports;
mod inject;
mod layout;
mod movability;
mod mover;
mod preview;
mod references;
mod report;
mod rewrite;
mod transaction;
mod visibility;

pub use call_graph::CallGraph;
pub use inject::{FieldInjector, InjectedField};
pub use movability::{compute_group, compute_group_with, MovabilityMap, StayReason};
pub use mover::{
    analyze_method, move_method, move_method_with, MoveMethodError, MoveMethodParams,
    MoveOptions, MoveOutcome,
};
pub use preview::{generate_preview, FilePreview, RefactoringPreview};
pub use references::{
    classify, collect_used_types, find_external_types_referenced_in_methods, find_references_of,
    CallerPlacement, Reference, UsedType,
};
pub use report::{Conflict, MoveReport, StayedMethod};
pub use rewrite::{requalified_call_edit, unqualified_call_edit, ReferenceRewriter};
pub use transaction::{EditBatch, Transaction};
pub use visibility::{required_visibility, FieldVisibility, ParseFieldVisibilityError};
