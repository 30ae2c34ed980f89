use std::collections::BTreeMap;

use carry_core::FileId;
use carry_java::{JavaIndex, MethodId, QualifierShape, SymbolModel, TypeName, Visibility};
use pretty_assertions::assert_eq;

fn index(files: &[(&str, &str)]) -> JavaIndex {
    let files: BTreeMap<FileId, String> = files
        .iter()
        .map(|(path, text)| (FileId::new(*path), text.to_string()))
        .collect();
    JavaIndex::new(&files)
}

fn method(owner: &str, name: &str, params: &[&str]) -> MethodId {
    MethodId::new(
        TypeName::new(owner),
        name,
        params.iter().map(|p| p.to_string()).collect(),
    )
}

const ORDER: &str = r#"package com.acme;

import java.util.List;
import java.util.Map;

public class Order {
    private int rate = 3;
    private List<Line> lines;

    public int total() {
        return base() + tax();
    }

    private int tax() {
        int rate = 2;
        return rate + this.rate;
    }

    int base() { return lines.size(); }

    static class Line {}
}
"#;

const INVOICE: &str = r#"package com.acme;

public class Invoice {
    private final Order order = new Order();

    public int amount() {
        Order local = order;
        return order.total() + local.total() + current().total() + new Order().total();
    }

    Order current() { return order; }
}
"#;

#[test]
fn declarations_are_indexed_in_order() {
    let index = index(&[("src/Order.java", ORDER)]);
    let order = TypeName::new("com.acme.Order");
    let names: Vec<String> = index
        .methods_of(&order)
        .iter()
        .map(|m| m.id.name.clone())
        .collect();
    assert_eq!(names, vec!["total", "tax", "base"]);

    let fields: Vec<(String, String)> = index
        .fields_of(&order)
        .iter()
        .map(|f| (f.id.name.clone(), f.ty.clone()))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("rate".to_string(), "int".to_string()),
            ("lines".to_string(), "List<Line>".to_string())
        ]
    );

    let tax = index.method(&method("com.acme.Order", "tax", &[])).unwrap();
    assert_eq!(tax.visibility, Visibility::Private);
    let base = index.method(&method("com.acme.Order", "base", &[])).unwrap();
    assert_eq!(base.visibility, Visibility::Package);
    assert!(base.visibility_range.is_none());

    let line = index
        .type_decl(&TypeName::new("com.acme.Order.Line"))
        .unwrap();
    assert_eq!(line.outer, Some(order.clone()));
    assert!(index.is_within(&line.name, &order));
}

#[test]
fn intra_type_calls_resolve_to_their_targets() {
    let index = index(&[("src/Order.java", ORDER)]);
    let targets: Vec<Option<MethodId>> = index
        .calls_in(&method("com.acme.Order", "total", &[]))
        .iter()
        .map(|c| c.target.clone())
        .collect();
    assert_eq!(
        targets,
        vec![
            Some(method("com.acme.Order", "base", &[])),
            Some(method("com.acme.Order", "tax", &[])),
        ]
    );
}

#[test]
fn receivers_resolve_through_fields_locals_calls_and_constructors() {
    let index = index(&[("src/Order.java", ORDER), ("src/Invoice.java", INVOICE)]);
    let total = method("com.acme.Order", "total", &[]);
    let refs = index.find_method_references(&total);
    let qualifiers: Vec<(String, QualifierShape)> = refs
        .iter()
        .map(|r| {
            let q = r.qualifier.as_ref().unwrap();
            (q.text.clone(), q.shape)
        })
        .collect();
    assert_eq!(
        qualifiers,
        vec![
            ("order".to_string(), QualifierShape::Simple),
            ("local".to_string(), QualifierShape::Simple),
            ("current()".to_string(), QualifierShape::Compound),
            ("new Order()".to_string(), QualifierShape::Compound),
        ]
    );
    for site in refs {
        assert_eq!(site.containing_type, TypeName::new("com.acme.Invoice"));
        assert_eq!(
            site.containing_method,
            Some(method("com.acme.Invoice", "amount", &[]))
        );
        let text = index.file_text(&site.file).unwrap();
        assert!(site.range.slice(text).ends_with("total"));
    }
}

#[test]
fn unclosed_types_are_skipped_without_losing_the_workspace() {
    let index = index(&[
        ("src/Order.java", ORDER),
        ("src/Invoice.java", INVOICE),
        ("src/Draft.java", "package com.acme;\nclass Draft {"),
    ]);
    assert!(index.type_decl(&TypeName::new("com.acme.Draft")).is_none());
    assert!(index.type_decl(&TypeName::new("com.acme.Invoice")).is_some());
    let total = method("com.acme.Order", "total", &[]);
    assert_eq!(index.find_method_references(&total).len(), 4);
}

#[test]
fn field_usages_respect_local_shadowing() {
    let index = index(&[("src/Order.java", ORDER), ("src/Invoice.java", INVOICE)]);
    let rate = carry_java::FieldId::new(TypeName::new("com.acme.Order"), "rate");
    let usages = index.find_field_references(&rate);
    assert_eq!(usages.len(), 1);
    assert_eq!(usages[0].qualifier.as_ref().unwrap().shape, QualifierShape::This);

    let lines = carry_java::FieldId::new(TypeName::new("com.acme.Order"), "lines");
    assert_eq!(index.find_field_references(&lines).len(), 1);

    let order_field = carry_java::FieldId::new(TypeName::new("com.acme.Invoice"), "order");
    let in_amount = index
        .field_usages_in(&method("com.acme.Invoice", "amount", &[]))
        .into_iter()
        .filter(|u| u.field == order_field)
        .count();
    assert_eq!(in_amount, 2);
}

#[test]
fn overloads_resolve_by_arity_and_ambiguity_stays_unresolved() {
    let text = r#"class Calc {
    int add(int a) { return a; }
    int add(int a, int b) { return a + b; }
    int pick(String s) { return 0; }
    int pick(Object o) { return 1; }
    int sum(int... xs) { return 0; }

    int run() {
        return add(1) + add(1, 2) + pick("x") + sum() + sum(1, 2, 3);
    }
}
"#;
    let index = index(&[("Calc.java", text)]);
    let targets: Vec<Option<String>> = index
        .calls_in(&method("Calc", "run", &[]))
        .iter()
        .map(|c| c.target.as_ref().map(|t| t.signature()))
        .collect();
    assert_eq!(
        targets,
        vec![
            Some("add(int)".to_string()),
            Some("add(int, int)".to_string()),
            None,
            Some("sum(int[])".to_string()),
            Some("sum(int[])".to_string()),
        ]
    );
    assert_eq!(index.unresolved_calls().count(), 1);
}

#[test]
fn inherited_and_static_imported_methods_resolve() {
    let base = "package p;\npublic class Base { protected void hook() {} }\n";
    let util = "package q;
public class Util { public static int twice(int x) { return 2 * x; } }
";
    let child = r#"package p;

import static q.Util.twice;

public class Child extends Base {
    void run() { hook(); super.hook(); twice(3); }
}
"#;
    let index = index(&[("p/Base.java", base), ("q/Util.java", util), ("p/Child.java", child)]);
    let child_ty = index.type_decl(&TypeName::new("p.Child")).unwrap();
    assert_eq!(child_ty.superclass, Some(TypeName::new("p.Base")));

    let targets: Vec<Option<MethodId>> = index
        .calls_in(&method("p.Child", "run", &[]))
        .iter()
        .map(|c| c.target.clone())
        .collect();
    assert_eq!(
        targets,
        vec![
            Some(method("p.Base", "hook", &[])),
            Some(method("p.Base", "hook", &[])),
            Some(method("q.Util", "twice", &["int"])),
        ]
    );
}

#[test]
fn type_mentions_resolve_to_import_candidates() {
    let order_only = index(&[("src/Order.java", ORDER)]);
    let mentions = order_only.type_mentions(&method("com.acme.Order", "base", &[]));
    assert!(mentions.is_empty());

    let text = r#"package com.acme.report;

import java.io.IOException;
import java.util.*;
import com.acme.Order;

class Report {
    List<Order> load(Order seed) throws IOException {
        return new ArrayList<>();
    }
}
"#;
    let index = index(&[("src/Order.java", ORDER), ("src/Report.java", text)]);
    let mentions = index.type_mentions(&method("com.acme.report.Report", "load", &["Order"]));
    let resolved: Vec<(String, Option<String>, bool)> = mentions
        .iter()
        .map(|m| (m.name.clone(), m.qualified.clone(), m.in_project))
        .collect();
    assert_eq!(
        resolved,
        vec![
            ("List".to_string(), None, false),
            ("Order".to_string(), Some("com.acme.Order".to_string()), true),
            ("Order".to_string(), Some("com.acme.Order".to_string()), true),
            ("IOException".to_string(), Some("java.io.IOException".to_string()), false),
            ("ArrayList".to_string(), None, false),
        ]
    );
    assert_eq!(mentions[0].wildcard_candidates, vec!["java.util.*".to_string()]);
}

#[test]
fn unused_imports_include_duplicates() {
    let text = r#"package a;

import java.util.List;
import java.util.Map;
import java.util.List;
import java.io.*;

class A { List<String> xs; }
"#;
    let index = index(&[("A.java", text)]);
    let unused: Vec<String> = index
        .unused_imports(&FileId::new("A.java"))
        .into_iter()
        .map(|i| i.path)
        .collect();
    assert_eq!(unused, vec!["java.util.Map".to_string(), "java.util.List".to_string()]);
}

#[test]
fn bare_this_is_reported_as_a_receiver_use() {
    let text = "class A { void register(Registry r) { r.add(this); } }";
    let index = index(&[("A.java", text)]);
    assert_eq!(
        index
            .receiver_uses(&method("A", "register", &["Registry"]))
            .len(),
        1
    );
}
