//! Java symbol model for carry.
//!
//! [`SymbolModel`] is the read-only view the refactorings consume: declarations, call
//! expressions with their statically bound targets, and a project-wide reference index.
//! [`JavaIndex`] implements it over source text parsed with `tree-sitter-java`. It does not
//! type-check; it resolves what a declaration-level reading of the sources allows and leaves
//! the rest unresolved.

mod body;
mod index;
mod model;
mod names;
mod syntax;

pub use index::JavaIndex;
pub use names::is_valid_identifier;
pub use model::{
    CallSite, FieldDecl, FieldId, FieldUsage, FileHeader, ImportDecl, MethodDecl, MethodId, Param,
    Qualifier, QualifierShape, SymbolModel, TypeDecl, TypeKind, TypeMention, TypeName, Visibility,
};
