//! Call-site and field-access rewriting.
//!
//! A reference either becomes a plain unqualified call, because caller and callee end up in
//! the same type, or is routed through a receiver that the caller's future home can see: a
//! field of the callee's type (injected when missing) or, for static members, the type name.

use carry_core::{FileId, TextEdit, TextRange};
use carry_java::{FieldUsage, Qualifier, QualifierShape, SymbolModel, TypeName};

use crate::imports::type_reference;
use crate::inject::FieldInjector;
use crate::references::Reference;
use crate::report::Conflict;
use crate::transaction::EditBatch;
use crate::visibility::FieldVisibility;

/// Edit that drops the qualifier of a call. `None` for calls that are already unqualified.
pub fn unqualified_call_edit(reference: &Reference) -> Result<Option<TextEdit>, Conflict> {
    let Some(qualifier) = &reference.qualifier else {
        return Ok(None);
    };
    if !qualifier.is_rewritable() {
        return Err(unrewritable(reference, qualifier));
    }
    Ok(Some(TextEdit::delete(
        reference.file.clone(),
        TextRange::new(qualifier.range.start, reference.name_range.start),
    )))
}

/// Edit that makes `receiver` the qualifier of a call. `None` if it already is.
pub fn requalified_call_edit(
    reference: &Reference,
    receiver: &str,
) -> Result<Option<TextEdit>, Conflict> {
    match &reference.qualifier {
        Some(qualifier) if !qualifier.is_rewritable() => Err(unrewritable(reference, qualifier)),
        Some(qualifier) => Ok(requalify(&reference.file, qualifier, receiver)),
        None => Ok(Some(TextEdit::insert(
            reference.file.clone(),
            reference.name_range.start,
            format!("{receiver}."),
        ))),
    }
}

fn requalify(file: &FileId, qualifier: &Qualifier, receiver: &str) -> Option<TextEdit> {
    (qualifier.text != receiver)
        .then(|| TextEdit::replace(file.clone(), qualifier.range, receiver))
}

fn unrewritable(reference: &Reference, qualifier: &Qualifier) -> Conflict {
    Conflict::UnrewritableCallSite {
        file: reference.file.clone(),
        range: reference.range,
        callee: reference.callee.clone(),
        qualifier: qualifier.text.clone(),
    }
}

/// Applies the rewriting policies against one model snapshot, staging into one batch.
pub struct ReferenceRewriter<'a> {
    model: &'a dyn SymbolModel,
    batch: &'a mut EditBatch,
    injector: &'a mut FieldInjector,
    field_visibility: FieldVisibility,
    conflicts: Vec<Conflict>,
}

impl<'a> ReferenceRewriter<'a> {
    pub fn new(
        model: &'a dyn SymbolModel,
        batch: &'a mut EditBatch,
        injector: &'a mut FieldInjector,
        field_visibility: FieldVisibility,
    ) -> Self {
        ReferenceRewriter {
            model,
            batch,
            injector,
            field_visibility,
            conflicts: Vec::new(),
        }
    }

    /// Caller and callee share a type after the move: call without a qualifier.
    pub fn rewrite_to_internal_call(&mut self, reference: &Reference) -> bool {
        match unqualified_call_edit(reference) {
            Ok(edit) => {
                self.log(reference, "internal call");
                self.batch.extend(edit);
                true
            }
            Err(conflict) => self.conflict(conflict),
        }
    }

    /// The call will run in `holder` while the callee lives in `home`: route it through a
    /// field of `home` on `holder`, or through the type name for static callees.
    pub fn rewrite_through_receiver(
        &mut self,
        reference: &Reference,
        holder: &TypeName,
        home: &TypeName,
    ) -> bool {
        if let Some(qualifier) = &reference.qualifier {
            if !qualifier.is_rewritable() {
                let conflict = unrewritable(reference, qualifier);
                return self.conflict(conflict);
            }
        }
        let is_static = self
            .model
            .method(&reference.callee)
            .is_some_and(|decl| decl.is_static);
        let Some(receiver) = self.receiver(holder, home, is_static) else {
            return false;
        };
        match requalified_call_edit(reference, &receiver) {
            Ok(edit) => {
                self.log(reference, &receiver);
                self.batch.extend(edit);
                true
            }
            Err(conflict) => self.conflict(conflict),
        }
    }

    /// Same as [`rewrite_through_receiver`](Self::rewrite_through_receiver) for an unqualified
    /// or `this.`-qualified field access. Other accesses are left alone.
    pub fn rewrite_field_access(
        &mut self,
        usage: &FieldUsage,
        holder: &TypeName,
        home: &TypeName,
    ) -> bool {
        let shape = usage.qualifier.as_ref().map(|q| q.shape);
        if !matches!(shape, None | Some(QualifierShape::This)) {
            return false;
        }
        let is_static = self
            .model
            .field(&usage.field)
            .is_some_and(|decl| decl.is_static);
        let Some(receiver) = self.receiver(holder, home, is_static) else {
            return false;
        };
        let edit = match &usage.qualifier {
            Some(qualifier) => requalify(&usage.file, qualifier, &receiver),
            None => Some(TextEdit::insert(
                usage.file.clone(),
                usage.name_range.start,
                format!("{receiver}."),
            )),
        };
        tracing::debug!(
            target: "carry.refactor",
            field = %usage.field,
            file = %usage.file,
            offset = usage.name_range.start,
            %receiver,
            "rewrote field access"
        );
        self.batch.extend(edit);
        true
    }

    /// Points an unqualified or `this.`-qualified field access at the `field_type` field of
    /// `holder`, injecting that field when missing.
    pub fn rewrite_field_to_own(
        &mut self,
        usage: &FieldUsage,
        holder: &TypeName,
        field_type: &TypeName,
    ) -> bool {
        let shape = usage.qualifier.as_ref().map(|q| q.shape);
        if !matches!(shape, None | Some(QualifierShape::This)) {
            return false;
        }
        self.injector.inject_field_if_needed(
            self.model,
            self.batch,
            holder,
            field_type,
            self.field_visibility,
        );
        let Some(name) = self.injector.field_for(self.model, holder, field_type) else {
            return false;
        };
        if name != usage.field.name {
            self.batch
                .push(TextEdit::replace(usage.file.clone(), usage.name_range, name.as_str()));
        }
        tracing::debug!(
            target: "carry.refactor",
            field = %usage.field,
            file = %usage.file,
            offset = usage.name_range.start,
            to = %name,
            "redirected field access"
        );
        true
    }

    pub fn into_conflicts(self) -> Vec<Conflict> {
        self.conflicts
    }

    fn receiver(&mut self, holder: &TypeName, home: &TypeName, is_static: bool) -> Option<String> {
        if is_static {
            let (text, import) = type_reference(self.model, holder, home);
            if let Some(path) = import {
                let file = self.model.type_decl(holder)?.file.clone();
                self.batch.add_import(self.model, &file, &path);
            }
            return Some(text);
        }
        self.injector.inject_field_if_needed(
            self.model,
            self.batch,
            holder,
            home,
            self.field_visibility,
        );
        self.injector.field_for(self.model, holder, home)
    }

    fn conflict(&mut self, conflict: Conflict) -> bool {
        tracing::warn!(target: "carry.refactor", %conflict, "left site unchanged");
        self.conflicts.push(conflict);
        false
    }

    fn log(&self, reference: &Reference, receiver: &str) {
        tracing::debug!(
            target: "carry.refactor",
            callee = %reference.callee,
            file = %reference.file,
            offset = reference.range.start,
            receiver,
            "rewrote call site"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carry_core::apply_text_edits;
    use carry_java::MethodId;
    use pretty_assertions::assert_eq;

    fn reference(text: &str, call: &str, qualifier: Option<(&str, QualifierShape)>) -> Reference {
        let start = text.find(call).unwrap();
        let name = call.rsplit('.').next().unwrap().trim();
        let name_start = text[start..].rfind(name).unwrap() + start;
        let name_end = text[name_start..].find('(').unwrap() + name_start;
        Reference {
            callee: MethodId::new(TypeName::new("Order"), "total", Vec::new()),
            file: FileId::new("A.java"),
            range: TextRange::new(start, name_end),
            name_range: TextRange::new(name_start, name_end),
            caller: None,
            caller_type: TypeName::new("A"),
            qualifier: qualifier.map(|(q, shape)| Qualifier {
                text: q.to_string(),
                range: TextRange::new(start, start + q.len()),
                shape,
            }),
        }
    }

    fn apply(text: &str, edit: Option<TextEdit>) -> String {
        apply_text_edits(text, &edit.into_iter().collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn qualifiers_are_dropped_for_internal_calls() {
        let text = "x = order . total();";
        let r = reference(text, "order . total", Some(("order", QualifierShape::Simple)));
        assert_eq!(apply(text, unqualified_call_edit(&r).unwrap()), "x = total();");

        let text = "x = total();";
        let r = reference(text, "total", None);
        assert_eq!(unqualified_call_edit(&r), Ok(None));
    }

    #[test]
    fn receivers_replace_or_prefix_the_qualifier() {
        let text = "x = this.total();";
        let r = reference(text, "this.total", Some(("this", QualifierShape::This)));
        let edit = requalified_call_edit(&r, "invoice").unwrap();
        assert_eq!(apply(text, edit), "x = invoice.total();");

        let text = "x = total();";
        let r = reference(text, "total", None);
        let edit = requalified_call_edit(&r, "Invoice").unwrap();
        assert_eq!(apply(text, edit), "x = Invoice.total();");

        let text = "x = invoice.total();";
        let r = reference(text, "invoice.total", Some(("invoice", QualifierShape::Simple)));
        assert_eq!(requalified_call_edit(&r, "invoice"), Ok(None));
    }

    #[test]
    fn compound_qualifiers_are_conflicts() {
        let text = "x = current().total();";
        let r = reference(text, "current().total", Some(("current()", QualifierShape::Compound)));
        assert!(matches!(
            unqualified_call_edit(&r),
            Err(Conflict::UnrewritableCallSite { ref qualifier, .. }) if qualifier == "current()"
        ));
        assert!(requalified_call_edit(&r, "invoice").is_err());
    }
}
