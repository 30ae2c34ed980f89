use std::fmt;

use carry_core::{FileId, TextRange};
use carry_java::{FieldId, MethodId, TypeName};
use serde::Serialize;

use crate::inject::InjectedField;
use crate::movability::StayReason;

/// A site the move could not handle mechanically. Conflicts are reported, never fatal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Conflict {
    /// A call whose receiver expression is too complex to rewrite.
    UnrewritableCallSite {
        file: FileId,
        range: TextRange,
        callee: MethodId,
        qualifier: String,
    },
    /// A call in moved code whose target could not be determined.
    UnresolvedCall {
        file: FileId,
        range: TextRange,
        method: MethodId,
        name: String,
    },
    /// `this` or `super` used as a value in moved code.
    ReceiverUse {
        file: FileId,
        range: TextRange,
        method: MethodId,
    },
}

impl Conflict {
    pub fn file(&self) -> &FileId {
        match self {
            Conflict::UnrewritableCallSite { file, .. }
            | Conflict::UnresolvedCall { file, .. }
            | Conflict::ReceiverUse { file, .. } => file,
        }
    }

    pub fn range(&self) -> TextRange {
        match self {
            Conflict::UnrewritableCallSite { range, .. }
            | Conflict::UnresolvedCall { range, .. }
            | Conflict::ReceiverUse { range, .. } => *range,
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::UnrewritableCallSite {
                file,
                range,
                callee,
                qualifier,
            } => write!(
                f,
                "{file}@{}: call to {callee} through `{qualifier}` was left unchanged",
                range.start
            ),
            Conflict::UnresolvedCall {
                file,
                range,
                method,
                name,
            } => write!(
                f,
                "{file}@{}: call to `{name}` in {method} could not be resolved",
                range.start
            ),
            Conflict::ReceiverUse {
                file,
                range,
                method,
            } => write!(
                f,
                "{file}@{}: {method} passes `this` or `super` as a value",
                range.start
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StayedMethod {
    pub method: MethodId,
    pub reason: StayReason,
}

/// Summary of a completed move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MoveReport {
    pub root: MethodId,
    pub target: TypeName,
    /// Methods moved along with the root, in declaration order.
    pub helpers: Vec<MethodId>,
    pub stayed: Vec<StayedMethod>,
    pub injected_fields: Vec<InjectedField>,
    pub removed_fields: Vec<FieldId>,
    pub conflicts: Vec<Conflict>,
}

impl MoveReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

impl fmt::Display for MoveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Moved {} to {} with {}.",
            self.root,
            self.target,
            plural(self.helpers.len(), "helper method")
        )?;
        for helper in &self.helpers {
            writeln!(f, "  + {}", helper.signature())?;
        }
        if !self.stayed.is_empty() {
            writeln!(
                f,
                "{} stayed in {} because they are still referenced from outside the moved group:",
                plural(self.stayed.len(), "method"),
                self.root.owner.simple_name()
            )?;
            for stayed in &self.stayed {
                writeln!(f, "  - {}: {}", stayed.method.signature(), stayed.reason)?;
            }
        }
        for field in &self.injected_fields {
            writeln!(
                f,
                "Added field {}.{} of type {}.",
                field.owner.simple_name(),
                field.name,
                field.ty.simple_name()
            )?;
        }
        for field in &self.removed_fields {
            writeln!(f, "Removed unused field {field}.")?;
        }
        if !self.conflicts.is_empty() {
            writeln!(f, "{}:", plural(self.conflicts.len(), "conflict"))?;
            for conflict in &self.conflicts {
                writeln!(f, "  ! {conflict}")?;
            }
        }
        Ok(())
    }
}
