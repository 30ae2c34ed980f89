//! Statement-level facts read from a syntax subtree: call expressions with their receiver
//! chains, identifier uses that may denote fields, local variable declarations, type mentions
//! and uses of `this`/`super` as values.

use carry_core::TextRange;
use tree_sitter::Node;

use crate::names::is_capitalized;
use crate::syntax::{
    base_type_name, compact, find_named_child, is_comment, named_children, node_range, node_text,
};

/// One link of a receiver chain, read left to right.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Segment {
    This,
    Super,
    Name(String),
    Call { name: String, arg_count: usize },
    New(String),
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RawQualifier {
    pub segments: Vec<Segment>,
    pub range: TextRange,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RawCall {
    pub name: String,
    pub name_range: TextRange,
    pub qualifier: Option<RawQualifier>,
    pub arg_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RawName {
    pub name: String,
    pub range: TextRange,
    pub qualifier: Option<RawQualifier>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct BodyFacts {
    /// `(name, declared type)` of every local variable declared in the subtree. Lambda
    /// parameters without a declared type get `var`.
    pub locals: Vec<(String, String)>,
    pub calls: Vec<RawCall>,
    pub names: Vec<RawName>,
    pub type_mentions: Vec<(String, TextRange)>,
    pub receiver_uses: Vec<TextRange>,
}

/// Analyzes the subtree rooted at `node`.
pub(crate) fn analyze(text: &str, node: Node<'_>) -> BodyFacts {
    let mut walker = Walker {
        text,
        facts: BodyFacts::default(),
    };
    walker.visit(node);
    walker.facts
}

/// Type mentions in `decl` outside the `skip` subtrees (used for declaration headers).
pub(crate) fn header_mentions<'t>(
    text: &str,
    decl: Node<'t>,
    skip: &[Node<'t>],
) -> Vec<(String, TextRange)> {
    let mut out = Vec::new();
    collect_mentions(text, decl, skip, &mut out);
    out
}

/// A capitalized identifier that is not selected from something else (`a.B`).
fn is_mention(text: &str, node: Node<'_>) -> bool {
    matches!(node.kind(), "identifier" | "type_identifier")
        && is_capitalized(node_text(text, node))
        && node.prev_sibling().map_or(true, |prev| prev.kind() != ".")
}

fn collect_mentions<'t>(
    text: &str,
    node: Node<'t>,
    skip: &[Node<'t>],
    out: &mut Vec<(String, TextRange)>,
) {
    if is_comment(node) || skip.contains(&node) {
        return;
    }
    if is_mention(text, node) {
        out.push((node_text(text, node).to_string(), node_range(node)));
    }
    for child in named_children(node) {
        collect_mentions(text, child, skip, out);
    }
}

/// Whether a `this` or `super` node selects a member or a constructor instead of being passed
/// around as a value.
fn serves_as_receiver(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        "method_invocation" | "explicit_constructor_invocation" => true,
        // `Outer.this` is itself the value unless something is selected from it.
        "field_access" if parent.child_by_field_name("field") == Some(node) => {
            serves_as_receiver(parent)
        }
        "field_access" => true,
        _ => false,
    }
}

fn argument_count(arguments: Node<'_>) -> usize {
    named_children(arguments)
        .into_iter()
        .filter(|arg| !is_comment(*arg))
        .count()
}

struct Walker<'s> {
    text: &'s str,
    facts: BodyFacts,
}

impl Walker<'_> {
    fn text_of(&self, node: Node<'_>) -> String {
        node_text(self.text, node).to_string()
    }

    fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "identifier" => self.name(node),
            "type_identifier" => self.mention(node),
            "this" | "super" => {
                if !serves_as_receiver(node) {
                    self.facts.receiver_uses.push(node_range(node));
                }
            }
            "method_invocation" => self.call(node),
            "field_access" => self.field_access(node),
            "local_variable_declaration" | "field_declaration" | "constant_declaration" => {
                self.declaration(node)
            }
            "variable_declarator" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.visit(value);
                }
            }
            "formal_parameter"
            | "spread_parameter"
            | "catch_formal_parameter"
            | "enhanced_for_statement"
            | "resource" => self.binding(node),
            "lambda_expression" => self.lambda(node),
            "instanceof_expression" => {
                let name = node.child_by_field_name("name");
                if let (Some(name), Some(ty)) = (name, node.child_by_field_name("right")) {
                    let local = (self.text_of(name), compact(node_text(self.text, ty)));
                    self.facts.locals.push(local);
                }
                self.visit_except(node, name);
            }
            "method_reference" => self.method_reference(node),
            "labeled_statement" => {
                let label = find_named_child(node, "identifier");
                self.visit_except(node, label);
            }
            "break_statement" | "continue_statement" => {}
            "marker_annotation" | "annotation" => {
                if let Some(name) = node.child_by_field_name("name") {
                    collect_mentions(self.text, name, &[], &mut self.facts.type_mentions);
                }
                if let Some(arguments) = node.child_by_field_name("arguments") {
                    self.visit(arguments);
                }
            }
            "scoped_identifier" => {
                collect_mentions(self.text, node, &[], &mut self.facts.type_mentions);
            }
            "element_value_pair" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.visit(value);
                }
            }
            // Members of local and anonymous classes: their bodies count, their names do not.
            "method_declaration"
            | "constructor_declaration"
            | "compact_constructor_declaration"
            | "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "annotation_type_declaration"
            | "enum_constant" => {
                let name = node.child_by_field_name("name");
                self.visit_except(node, name);
            }
            "class_literal" => self.visit_except(node, None),
            kind if kind.ends_with("comment") || kind.ends_with("literal") => {}
            _ => self.visit_except(node, None),
        }
    }

    fn visit_except<'t>(&mut self, node: Node<'t>, skip: Option<Node<'t>>) {
        for child in named_children(node) {
            if Some(child) != skip {
                self.visit(child);
            }
        }
    }

    fn mention(&mut self, node: Node<'_>) {
        if is_mention(self.text, node) {
            let mention = (self.text_of(node), node_range(node));
            self.facts.type_mentions.push(mention);
        }
    }

    fn name(&mut self, node: Node<'_>) {
        self.mention(node);
        let name = RawName {
            name: self.text_of(node),
            range: node_range(node),
            qualifier: None,
        };
        self.facts.names.push(name);
    }

    fn call(&mut self, node: Node<'_>) {
        let object = node.child_by_field_name("object");
        let name = node.child_by_field_name("name");
        if let Some(object) = object {
            self.visit(object);
        }
        if let Some(name) = name {
            if object.is_none() {
                self.mention(name);
            }
            let call = RawCall {
                name: self.text_of(name),
                name_range: node_range(name),
                qualifier: object.map(|object| self.qualifier(object)),
                arg_count: node
                    .child_by_field_name("arguments")
                    .map_or(0, argument_count),
            };
            self.facts.calls.push(call);
        }
        for child in named_children(node) {
            if Some(child) != object && Some(child) != name {
                self.visit(child);
            }
        }
    }

    fn field_access(&mut self, node: Node<'_>) {
        let object = node.child_by_field_name("object");
        let field = node.child_by_field_name("field");
        if let Some(object) = object {
            self.visit(object);
        }
        match field {
            Some(field) if field.kind() == "identifier" => {
                let name = RawName {
                    name: self.text_of(field),
                    range: node_range(field),
                    qualifier: object.map(|object| self.qualifier(object)),
                };
                self.facts.names.push(name);
            }
            Some(field) => self.visit(field),
            None => {}
        }
        for child in named_children(node) {
            if Some(child) != object && Some(child) != field {
                self.visit(child);
            }
        }
    }

    fn declaration(&mut self, node: Node<'_>) {
        let ty = node
            .child_by_field_name("type")
            .map(|ty| compact(node_text(self.text, ty)));
        for child in named_children(node) {
            if child.kind() != "variable_declarator" {
                self.visit(child);
                continue;
            }
            if let (Some(name), Some(ty)) = (child.child_by_field_name("name"), &ty) {
                let dims = child
                    .child_by_field_name("dimensions")
                    .map(|dims| compact(node_text(self.text, dims)))
                    .unwrap_or_default();
                let local = (self.text_of(name), format!("{ty}{dims}"));
                self.facts.locals.push(local);
            }
            self.visit(child);
        }
    }

    /// Parameters, catch parameters, enhanced-for variables and resources.
    fn binding(&mut self, node: Node<'_>) {
        let name = node.child_by_field_name("name").or_else(|| {
            find_named_child(node, "variable_declarator")
                .and_then(|declarator| declarator.child_by_field_name("name"))
        });
        if let (Some(name), Some(ty)) = (name, self.binding_type(node)) {
            let local = (self.text_of(name), ty);
            self.facts.locals.push(local);
        }
        self.visit_except(node, name);
    }

    fn binding_type(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            "catch_formal_parameter" => {
                let catch_type = find_named_child(node, "catch_type")?;
                let alternatives: Vec<Node<'_>> = named_children(catch_type)
                    .into_iter()
                    .filter(|alt| !is_comment(*alt))
                    .collect();
                match alternatives.as_slice() {
                    [only] => Some(compact(node_text(self.text, *only))),
                    _ => Some(compact(node_text(self.text, catch_type))),
                }
            }
            "spread_parameter" => {
                let ty = named_children(node).into_iter().find(|child| {
                    !is_comment(*child)
                        && !matches!(child.kind(), "modifiers" | "variable_declarator")
                })?;
                Some(format!("{}...", compact(node_text(self.text, ty))))
            }
            _ => {
                let ty = node.child_by_field_name("type")?;
                let dims = node
                    .child_by_field_name("dimensions")
                    .map(|dims| compact(node_text(self.text, dims)))
                    .unwrap_or_default();
                Some(format!("{}{dims}", compact(node_text(self.text, ty))))
            }
        }
    }

    fn lambda(&mut self, node: Node<'_>) {
        if let Some(params) = node.child_by_field_name("parameters") {
            let inferred = match params.kind() {
                "identifier" => vec![params],
                "inferred_parameters" => named_children(params)
                    .into_iter()
                    .filter(|param| param.kind() == "identifier")
                    .collect(),
                _ => {
                    self.visit(params);
                    Vec::new()
                }
            };
            for param in inferred {
                let local = (self.text_of(param), "var".to_string());
                self.facts.locals.push(local);
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit(body);
        }
    }

    /// `Type::name` and `expr::name`: the receiver counts, the method name does not.
    fn method_reference(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        let mut after_colons = false;
        for child in children {
            if child.kind() == "::" {
                after_colons = true;
            } else if !(after_colons && child.kind() == "identifier") && child.is_named() {
                self.visit(child);
            }
        }
    }

    fn qualifier(&self, object: Node<'_>) -> RawQualifier {
        let mut segments = Vec::new();
        self.segments(object, &mut segments);
        RawQualifier {
            segments,
            range: node_range(object),
        }
    }

    fn segments(&self, node: Node<'_>, out: &mut Vec<Segment>) {
        let segment = match node.kind() {
            "this" => Segment::This,
            "super" => Segment::Super,
            "identifier" => Segment::Name(self.text_of(node)),
            "field_access" => {
                let object = node.child_by_field_name("object");
                match (object, node.child_by_field_name("field")) {
                    (Some(object), Some(field)) => {
                        self.segments(object, out);
                        match field.kind() {
                            "identifier" => Segment::Name(self.text_of(field)),
                            "this" => Segment::This,
                            _ => Segment::Other,
                        }
                    }
                    _ => Segment::Other,
                }
            }
            "method_invocation" => match node.child_by_field_name("name") {
                Some(name) => {
                    if let Some(object) = node.child_by_field_name("object") {
                        self.segments(object, out);
                    }
                    Segment::Call {
                        name: self.text_of(name),
                        arg_count: node
                            .child_by_field_name("arguments")
                            .map_or(0, argument_count),
                    }
                }
                None => Segment::Other,
            },
            "object_creation_expression" => match node.child_by_field_name("type") {
                Some(ty) => {
                    let ty = compact(node_text(self.text, ty));
                    Segment::New(base_type_name(&ty).to_string())
                }
                None => Segment::Other,
            },
            _ => Segment::Other,
        };
        out.push(segment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;
    use pretty_assertions::assert_eq;

    /// Facts of `statements` used as the body of a method.
    fn facts(statements: &str) -> BodyFacts {
        let text = format!("class T {{\n    void t() {{\n        {statements}\n    }}\n}}\n");
        let mut file = parse(&text);
        let mut ty = file.types.remove(0);
        let method = ty.methods.remove(0);
        method.body.unwrap_or_default()
    }

    fn call_shapes(facts: &BodyFacts) -> Vec<(String, Option<Vec<Segment>>, usize)> {
        facts
            .calls
            .iter()
            .map(|c| {
                (
                    c.name.clone(),
                    c.qualifier.as_ref().map(|q| q.segments.clone()),
                    c.arg_count,
                )
            })
            .collect()
    }

    #[test]
    fn calls_capture_receiver_chains() {
        let f = facts("int r = order.total() + this.tax(1, 2) + helper() + a.b().c(x(1), y);");
        assert_eq!(
            call_shapes(&f),
            vec![
                ("total".into(), Some(vec![Segment::Name("order".into())]), 0),
                ("tax".into(), Some(vec![Segment::This]), 2),
                ("helper".into(), None, 0),
                ("b".into(), Some(vec![Segment::Name("a".into())]), 0),
                (
                    "c".into(),
                    Some(vec![
                        Segment::Name("a".into()),
                        Segment::Call {
                            name: "b".into(),
                            arg_count: 0
                        }
                    ]),
                    2
                ),
                ("x".into(), None, 1),
            ]
        );
    }

    #[test]
    fn qualifier_range_covers_the_receiver() {
        let f = facts("x = getOrder().total();");
        let total = f.calls.iter().find(|c| c.name == "total").unwrap();
        let q = total.qualifier.as_ref().unwrap();
        assert_eq!(q.range.end - q.range.start, "getOrder()".len());
        assert_eq!(
            q.segments,
            vec![Segment::Call {
                name: "getOrder".into(),
                arg_count: 0
            }]
        );
    }

    #[test]
    fn constructor_calls_become_new_segments() {
        let f = facts("new Invoice(order).print();");
        assert_eq!(
            call_shapes(&f),
            vec![("print".into(), Some(vec![Segment::New("Invoice".into())]), 0)]
        );
        assert_eq!(f.type_mentions[0].0, "Invoice");
    }

    #[test]
    fn generic_arguments_and_lambdas_do_not_split_arguments() {
        let f = facts("put(new HashMap<String, Integer>(), () -> a > b);");
        assert_eq!(f.calls[0].arg_count, 2);
    }

    #[test]
    fn locals_are_collected_with_their_types() {
        let f = facts(
            "int n = 0;
        List<Order> all = load();
        for (Order o : all) {}
        try { } catch (IOException e) { }
        if (x < y && z > w) {}
        all.forEach(each -> each.ship());",
        );
        assert_eq!(
            f.locals,
            vec![
                ("n".to_string(), "int".to_string()),
                ("all".to_string(), "List<Order>".to_string()),
                ("o".to_string(), "Order".to_string()),
                ("e".to_string(), "IOException".to_string()),
                ("each".to_string(), "var".to_string()),
            ]
        );
    }

    #[test]
    fn anonymous_class_methods_are_not_calls() {
        let f = facts("run(new Runnable() { public void run() { tick(); } });");
        let names: Vec<&str> = f.calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["run", "tick"]);
    }

    #[test]
    fn bare_this_is_a_receiver_use() {
        let f = facts("register(this); this.x = 1; super.go(); Runnable r = this::go;");
        assert_eq!(f.receiver_uses.len(), 2);
    }

    #[test]
    fn names_record_field_candidates() {
        let f = facts("return rate * this.base + other.rate;");
        let names: Vec<(&str, bool)> = f
            .names
            .iter()
            .map(|n| (n.name.as_str(), n.qualifier.is_some()))
            .collect();
        assert_eq!(
            names,
            vec![("rate", false), ("base", true), ("other", false), ("rate", true)]
        );
    }

    #[test]
    fn labels_and_method_reference_names_are_not_field_candidates() {
        let f = facts("outer: for (;;) { break outer; } run(order::total);");
        assert!(f
            .names
            .iter()
            .all(|n| n.name != "outer" && n.name != "total"));
        assert_eq!(f.calls.len(), 1);
    }

    #[test]
    fn class_literals_and_casts_mention_their_types() {
        let f = facts("Object o = (Order) load(Invoice.class);");
        let mentions: Vec<&str> = f.type_mentions.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(mentions, vec!["Object", "Order", "Invoice"]);
    }
}
