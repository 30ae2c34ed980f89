use std::collections::{BTreeMap, BTreeSet};

use carry_core::{decapitalize, line_indent, TextEdit};
use carry_java::{is_valid_identifier, SymbolModel, TypeName};
use serde::Serialize;

use crate::imports::type_reference;
use crate::layout::member_indent;
use crate::transaction::EditBatch;
use crate::visibility::FieldVisibility;

/// A field created by the refactoring.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InjectedField {
    pub owner: TypeName,
    pub name: String,
    pub ty: TypeName,
}

/// Ensures types own a field of another type, creating it at most once.
///
/// Injections staged in the current batch are remembered until [`FieldInjector::settle`] is
/// called after the batch has been flushed; from then on the model itself reports the field.
#[derive(Debug, Default)]
pub struct FieldInjector {
    pending: BTreeMap<(TypeName, TypeName), String>,
    at_body_start: BTreeSet<TypeName>,
    injected: Vec<InjectedField>,
}

impl FieldInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of a field of `field_type` declared on `owner`, existing or staged.
    pub fn field_for(
        &self,
        model: &dyn SymbolModel,
        owner: &TypeName,
        field_type: &TypeName,
    ) -> Option<String> {
        let fields = model.fields_of(owner);
        let existing = fields
            .iter()
            .filter(|f| model.resolve_type(owner, &f.ty).as_ref() == Some(field_type))
            .min_by_key(|f| f.is_static);
        existing.map(|f| f.id.name.clone()).or_else(|| {
            self.pending
                .get(&(owner.clone(), field_type.clone()))
                .cloned()
        })
    }

    /// Adds a `field_type` field to `owner` unless one exists. Returns `true` if a field was
    /// staged.
    pub fn inject_field_if_needed(
        &mut self,
        model: &dyn SymbolModel,
        batch: &mut EditBatch,
        owner: &TypeName,
        field_type: &TypeName,
        visibility: FieldVisibility,
    ) -> bool {
        if self.field_for(model, owner, field_type).is_some() {
            return false;
        }
        let Some(decl) = model.type_decl(owner) else {
            return false;
        };
        let Some(text) = model.file_text(&decl.file) else {
            return false;
        };

        let name = self.free_name(model, owner, field_type);
        let (type_text, import) = type_reference(model, owner, field_type);
        let declaration = format!("{} {type_text} {name};", visibility.modifiers());

        let anchor = model
            .fields_of(owner)
            .into_iter()
            .filter(|f| !f.is_static)
            .last()
            .map(|f| f.statement_range);
        let edit = match anchor {
            Some(statement) => {
                let indent = line_indent(text, statement.start);
                TextEdit::insert(
                    decl.file.clone(),
                    statement.end,
                    format!("\n{indent}{declaration}"),
                )
            }
            None => {
                let indent = member_indent(text, decl.body_range);
                // Later injections at the same spot append below the first one.
                let lead = if self.at_body_start.insert(owner.clone()) { "\n" } else { "" };
                TextEdit::insert(
                    decl.file.clone(),
                    decl.body_range.start,
                    format!("{lead}{indent}{declaration}\n"),
                )
            }
        };
        batch.push(edit);
        if let Some(path) = import {
            batch.add_import(model, &decl.file, &path);
        }

        tracing::debug!(
            target: "carry.refactor",
            owner = %owner,
            field = %name,
            ty = %field_type,
            "injected field"
        );
        self.pending
            .insert((owner.clone(), field_type.clone()), name.clone());
        self.injected.push(InjectedField {
            owner: owner.clone(),
            name,
            ty: field_type.clone(),
        });
        true
    }

    /// Forgets staged injections once their batch is part of the model.
    pub fn settle(&mut self) {
        self.pending.clear();
        self.at_body_start.clear();
    }

    /// Every field injected so far, in injection order.
    pub fn injected(&self) -> &[InjectedField] {
        &self.injected
    }

    fn free_name(
        &self,
        model: &dyn SymbolModel,
        owner: &TypeName,
        field_type: &TypeName,
    ) -> String {
        let base = decapitalize(field_type.simple_name());
        let taken = |name: &str| {
            model.fields_of(owner).iter().any(|f| f.id.name == name)
                || self
                    .pending
                    .iter()
                    .any(|((o, _), n)| o == owner && n == name)
        };
        if is_valid_identifier(&base) && !taken(&base) {
            return base;
        }
        (2..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;
    use carry_core::FileId;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn files(entries: &[(&str, &str)]) -> BTreeMap<FileId, String> {
        entries
            .iter()
            .map(|(path, text)| (FileId::new(*path), text.to_string()))
            .collect()
    }

    const ORDER: &str = "package shop;

public class Order {
    public int total() { return 1; }
}
";

    #[test]
    fn injection_is_idempotent_within_and_across_batches() {
        let report = "package reports;

public class Report {
    private static final int PAGES = 2;
    private String title;

    void print() {}
}
";
        let mut tx = Transaction::new(&files(&[
            ("shop/Order.java", ORDER),
            ("reports/Report.java", report),
        ]));
        let owner = TypeName::new("reports.Report");
        let order = TypeName::new("shop.Order");
        let mut injector = FieldInjector::new();

        let mut batch = EditBatch::new();
        let model = tx.model();
        let visibility = FieldVisibility::PrivateFinal;
        assert!(injector.inject_field_if_needed(model, &mut batch, &owner, &order, visibility));
        assert!(!injector.inject_field_if_needed(model, &mut batch, &owner, &order, visibility));
        assert_eq!(batch.edits().len(), 2);
        tx.flush(batch, "inject").unwrap();
        injector.settle();

        let mut batch = EditBatch::new();
        let model = tx.model();
        let visibility = FieldVisibility::Public;
        assert!(!injector.inject_field_if_needed(model, &mut batch, &owner, &order, visibility));
        assert!(batch.is_empty());
        assert_eq!(
            injector.field_for(tx.model(), &owner, &order).as_deref(),
            Some("order")
        );
        assert_eq!(injector.injected().len(), 1);

        assert_eq!(
            tx.files()[&FileId::new("reports/Report.java")],
            "package reports;

import shop.Order;

public class Report {
    private static final int PAGES = 2;
    private String title;
    private final Order order;

    void print() {}
}
"
        );
    }

    #[test]
    fn fields_go_to_the_top_of_bodies_without_instance_fields() {
        let invoice = "package shop;\n\nclass Invoice {\n    void print() {}\n}\n";
        let mut tx = Transaction::new(&files(&[
            ("shop/Order.java", ORDER),
            ("shop/Invoice.java", invoice),
        ]));
        let owner = TypeName::new("shop.Invoice");
        let order = TypeName::new("shop.Order");
        let mut injector = FieldInjector::new();
        let mut batch = EditBatch::new();
        let visibility = FieldVisibility::Private;
        injector.inject_field_if_needed(tx.model(), &mut batch, &owner, &order, visibility);
        injector.inject_field_if_needed(tx.model(), &mut batch, &owner, &owner, visibility);
        tx.flush(batch, "inject").unwrap();
        assert_eq!(
            tx.files()[&FileId::new("shop/Invoice.java")],
            "package shop;

class Invoice {
    private Order order;
    private Invoice invoice;

    void print() {}
}
"
        );
    }

    #[test]
    fn existing_fields_of_the_type_are_reused_and_names_never_clash() {
        let invoice = "package shop;

class Invoice {
    Order current;
    String order;
}
";
        let tx = Transaction::new(&files(&[
            ("shop/Order.java", ORDER),
            ("shop/Invoice.java", invoice),
        ]));
        let owner = TypeName::new("shop.Invoice");
        let mut injector = FieldInjector::new();
        let order = TypeName::new("shop.Order");
        assert_eq!(
            injector.field_for(tx.model(), &owner, &order).as_deref(),
            Some("current")
        );

        let mut batch = EditBatch::new();
        let missing = TypeName::new("shop.Missing");
        let other = TypeName::new("shop.Other");
        let visibility = FieldVisibility::Private;
        let model = tx.model();
        assert!(!injector.inject_field_if_needed(model, &mut batch, &missing, &other, visibility));
        assert_eq!(injector.free_name(tx.model(), &owner, &order), "order2");
    }
}
