//! Core shared types for carry.
//!
//! File identifiers, byte ranges and the canonical [`WorkspaceEdit`] every
//! refactoring produces, plus a handful of text helpers used when code is
//! re-emitted into another declaration.

mod edit;
mod text;

pub use edit::{
    apply_text_edits, apply_workspace_edit, EditError, FileId, TextEdit, TextRange, WorkspaceEdit,
};
pub use text::{
    decapitalize, dedent_block, expand_to_lines, indent_block, line_indent, LineCol, LineIndex,
};
