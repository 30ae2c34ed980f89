//! Declaration-level extraction from a `tree-sitter-java` syntax tree.
//!
//! Recognises the package clause, imports and (possibly nested) type declarations with their
//! fields, methods, constructors and initializer blocks. Statement bodies are summarised by
//! [`crate::body`] while the tree is alive, so nothing parsed here borrows from it.
//!
//! Declarations whose braces do not close are skipped; the rest of the file is still read.

use std::cell::RefCell;
use std::collections::HashSet;

use carry_core::{expand_to_lines, TextRange};
use tree_sitter::{Node, Parser, Tree};

use crate::body::{self, BodyFacts};
use crate::model::{ImportDecl, Param, TypeKind, Visibility};

thread_local! {
    static JAVA_PARSER: RefCell<Result<Parser, String>> = RefCell::new({
        let mut parser = Parser::new();
        match parser.set_language(tree_sitter_java::language()) {
            Ok(()) => Ok(parser),
            Err(_) => Err("tree-sitter-java language load failed".to_string()),
        }
    });
}

fn parse_java(source: &str) -> Result<Tree, String> {
    JAVA_PARSER.with(|parser_cell| {
        let mut parser = parser_cell
            .try_borrow_mut()
            .map_err(|_| "tree-sitter parser is already in use".to_string())?;
        let parser = match parser.as_mut() {
            Ok(parser) => parser,
            Err(err) => return Err(err.clone()),
        };
        parser
            .parse(source, None)
            .ok_or_else(|| "tree-sitter failed to produce a syntax tree".to_string())
    })
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Modifiers {
    pub visibility: Visibility,
    pub visibility_range: Option<TextRange>,
    /// Offset of the first modifier keyword, or of the first token after annotations.
    pub start: usize,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_default: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct ParsedMethod {
    pub name: String,
    pub name_range: TextRange,
    pub is_constructor: bool,
    pub modifiers: Modifiers,
    pub return_type: Option<String>,
    pub params: Vec<Param>,
    pub throws: Vec<String>,
    /// Declaration range including a leading doc comment.
    pub range: TextRange,
    /// Type mentions in annotations, signature and `throws` clause.
    pub header_mentions: Vec<(String, TextRange)>,
    pub body: Option<BodyFacts>,
    /// Body range including the braces.
    pub body_range: Option<TextRange>,
}

#[derive(Clone, Debug)]
pub(crate) struct ParsedField {
    pub name: String,
    pub name_range: TextRange,
    pub ty: String,
    pub modifiers: Modifiers,
    pub declarator_range: TextRange,
    pub statement_range: TextRange,
    pub declarator_count: usize,
    pub initializer: Option<BodyFacts>,
}

#[derive(Clone, Debug)]
pub(crate) struct ParsedType {
    pub name: String,
    pub kind: TypeKind,
    pub outer: Option<usize>,
    pub is_static: bool,
    pub extends: Vec<String>,
    pub implements: Vec<String>,
    pub range: TextRange,
    /// Range strictly inside the body braces.
    pub body_range: TextRange,
    pub methods: Vec<ParsedMethod>,
    pub fields: Vec<ParsedField>,
    /// Instance and static initializer blocks and enum constant arguments and bodies.
    pub initializers: Vec<BodyFacts>,
    pub nested: Vec<usize>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ParsedFile {
    pub package: Option<String>,
    pub package_range: Option<TextRange>,
    pub imports: Vec<ImportDecl>,
    pub types: Vec<ParsedType>,
    /// Identifiers outside the package clause and imports.
    pub identifiers: HashSet<String>,
}

/// Parses `text`. Never fails: a file tree-sitter cannot read yields no declarations.
pub(crate) fn parse(text: &str) -> ParsedFile {
    let tree = match parse_java(text) {
        Ok(tree) => tree,
        Err(err) => {
            tracing::warn!(target: "carry.java", error = %err, "failed to parse java source");
            return ParsedFile::default();
        }
    };
    let mut extractor = Extractor {
        text,
        file: ParsedFile::default(),
    };
    extractor.program(tree.root_node());
    extractor.file
}

pub(crate) fn node_text<'a>(source: &'a str, node: Node<'_>) -> &'a str {
    &source[node.byte_range()]
}

pub(crate) fn node_range(node: Node<'_>) -> TextRange {
    TextRange::new(node.start_byte(), node.end_byte())
}

pub(crate) fn is_comment(node: Node<'_>) -> bool {
    node.kind().ends_with("comment")
}

pub(crate) fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    children
}

/// Find the first named child with the given kind.
pub(crate) fn find_named_child<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let result = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == kind);
    result
}

fn modifier_node(node: Node<'_>) -> Option<Node<'_>> {
    node.child_by_field_name("modifiers")
        .or_else(|| find_named_child(node, "modifiers"))
}

/// Range strictly inside the braces of `body`; `None` unless both braces are really there.
fn inner_range(body: Node<'_>) -> Option<TextRange> {
    let mut cursor = body.walk();
    let braces: Vec<Node<'_>> = body
        .children(&mut cursor)
        .filter(|child| matches!(child.kind(), "{" | "}") && !child.is_missing())
        .collect();
    let open = braces.first().filter(|open| open.kind() == "{")?;
    let close = braces.last().filter(|close| close.kind() == "}")?;
    (open.end_byte() <= close.start_byte())
        .then(|| TextRange::new(open.end_byte(), close.start_byte()))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Source text of a type or name without whitespace, except a single space where two words
/// (or a wildcard or bound and a word) would otherwise run together.
pub(crate) fn compact(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space
            && out.ends_with(|c: char| is_word_char(c) || c == '?' || c == '&')
            && (is_word_char(ch) || ch == '&')
        {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }
    out
}

const TYPE_DECLARATIONS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
    "annotation_type_declaration",
];

fn collect_identifiers(text: &str, node: Node<'_>, out: &mut HashSet<String>) {
    match node.kind() {
        "package_declaration" | "import_declaration" => {}
        "identifier" | "type_identifier" => {
            out.insert(node_text(text, node).to_string());
        }
        _ => {
            for child in named_children(node) {
                collect_identifiers(text, child, out);
            }
        }
    }
}

struct Extractor<'s> {
    text: &'s str,
    file: ParsedFile,
}

impl Extractor<'_> {
    fn compact_text(&self, node: Node<'_>) -> String {
        compact(node_text(self.text, node))
    }

    fn program(&mut self, root: Node<'_>) {
        for child in named_children(root) {
            match child.kind() {
                "package_declaration" => {
                    let name = named_children(child)
                        .into_iter()
                        .find(|n| matches!(n.kind(), "identifier" | "scoped_identifier"));
                    if let Some(name) = name {
                        self.file.package = Some(self.compact_text(name));
                        self.file.package_range = Some(node_range(child));
                    }
                }
                "import_declaration" => self.import(child),
                kind if TYPE_DECLARATIONS.contains(&kind) => self.type_decl(child, None),
                _ => {}
            }
        }
        collect_identifiers(self.text, root, &mut self.file.identifiers);
    }

    fn import(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        let Some(name) = children
            .iter()
            .find(|n| matches!(n.kind(), "identifier" | "scoped_identifier"))
        else {
            return;
        };
        let is_static = children.iter().any(|n| n.kind() == "static");
        let is_wildcard = children.iter().any(|n| n.kind() == "asterisk");
        let mut path = self.compact_text(*name);
        if is_wildcard {
            path.push_str(".*");
        }
        self.file.imports.push(ImportDecl {
            path,
            is_static,
            is_wildcard,
            range: expand_to_lines(self.text, node_range(node)),
        });
    }

    /// Start of `node` widened over a comment block on the lines directly above it, so doc
    /// comments travel with their member.
    fn leading_start(&self, node: Node<'_>) -> usize {
        let mut comments = Vec::new();
        let mut prev = node.prev_sibling();
        while let Some(sibling) = prev.filter(|sibling| is_comment(*sibling)) {
            comments.push(sibling);
            prev = sibling.prev_sibling();
        }
        let prev_end = prev.map_or(0, |prev| prev.end_byte());
        comments
            .iter()
            .rev()
            .find(|comment| {
                prev_end == 0 || self.text[prev_end..comment.start_byte()].contains('\n')
            })
            .map_or(node.start_byte(), |comment| comment.start_byte())
    }

    fn modifiers(&self, node: Node<'_>) -> Modifiers {
        let mut mods = Modifiers {
            start: node.start_byte(),
            ..Modifiers::default()
        };
        let Some(list) = modifier_node(node) else {
            return mods;
        };
        let mut cursor = list.walk();
        let children: Vec<Node<'_>> = list.children(&mut cursor).collect();
        let mut first_keyword = None;
        for child in children {
            if child.is_named() {
                continue;
            }
            first_keyword.get_or_insert(child.start_byte());
            match child.kind() {
                "public" | "protected" | "private" => {
                    mods.visibility = match child.kind() {
                        "public" => Visibility::Public,
                        "protected" => Visibility::Protected,
                        _ => Visibility::Private,
                    };
                    mods.visibility_range = Some(node_range(child));
                }
                "static" => mods.is_static = true,
                "final" => mods.is_final = true,
                "abstract" => mods.is_abstract = true,
                "default" => mods.is_default = true,
                _ => {}
            }
        }
        mods.start = first_keyword.unwrap_or_else(|| {
            let mut next = list.next_sibling();
            while let Some(sibling) = next.filter(|sibling| is_comment(*sibling)) {
                next = sibling.next_sibling();
            }
            next.map_or(list.end_byte(), |next| next.start_byte())
        });
        mods
    }

    /// Types named by a `superclass`, `super_interfaces` or `extends_interfaces` clause.
    fn clause_types(&self, clause: Option<Node<'_>>) -> Vec<String> {
        let Some(clause) = clause else {
            return Vec::new();
        };
        let list = find_named_child(clause, "type_list").unwrap_or(clause);
        named_children(list)
            .into_iter()
            .filter(|ty| !is_comment(*ty))
            .map(|ty| self.compact_text(ty))
            .collect()
    }

    fn type_decl(&mut self, node: Node<'_>, outer: Option<usize>) {
        let kind = match node.kind() {
            "class_declaration" => TypeKind::Class,
            "interface_declaration" => TypeKind::Interface,
            "enum_declaration" => TypeKind::Enum,
            "record_declaration" => TypeKind::Record,
            "annotation_type_declaration" => TypeKind::Annotation,
            _ => return,
        };
        let (Some(name), Some(body)) = (
            node.child_by_field_name("name"),
            node.child_by_field_name("body"),
        ) else {
            return;
        };
        let Some(body_range) = inner_range(body) else {
            tracing::debug!(
                target: "carry.java",
                ty = node_text(self.text, name),
                "skipping type declaration without a closing brace"
            );
            return;
        };

        let mods = self.modifiers(node);
        let interfaces = node
            .child_by_field_name("interfaces")
            .or_else(|| find_named_child(node, "super_interfaces"));
        let (extends, implements) = match kind {
            TypeKind::Interface => (
                self.clause_types(find_named_child(node, "extends_interfaces")),
                Vec::new(),
            ),
            TypeKind::Annotation => (Vec::new(), Vec::new()),
            _ => (
                self.clause_types(node.child_by_field_name("superclass")),
                self.clause_types(interfaces),
            ),
        };

        let ty_idx = self.file.types.len();
        self.file.types.push(ParsedType {
            name: node_text(self.text, name).to_string(),
            kind,
            outer,
            is_static: mods.is_static || (outer.is_some() && kind != TypeKind::Class),
            extends,
            implements,
            range: TextRange::new(self.leading_start(node), node.end_byte()),
            body_range,
            methods: Vec::new(),
            fields: Vec::new(),
            initializers: Vec::new(),
            nested: Vec::new(),
        });
        if let Some(outer) = outer {
            self.file.types[outer].nested.push(ty_idx);
        }
        self.members(ty_idx, body);
    }

    fn members(&mut self, ty_idx: usize, body: Node<'_>) {
        let mut members = Vec::new();
        for child in named_children(body) {
            match child.kind() {
                "enum_constant" => {
                    let parts = [
                        child.child_by_field_name("arguments"),
                        child.child_by_field_name("body"),
                    ];
                    for part in parts.into_iter().flatten() {
                        let facts = body::analyze(self.text, part);
                        self.file.types[ty_idx].initializers.push(facts);
                    }
                }
                "enum_body_declarations" => members.extend(named_children(child)),
                _ => members.push(child),
            }
        }

        for member in members {
            match member.kind() {
                "field_declaration" | "constant_declaration" => self.field(ty_idx, member),
                "method_declaration" | "annotation_type_element_declaration" => {
                    self.method(ty_idx, member, false)
                }
                "constructor_declaration" | "compact_constructor_declaration" => {
                    self.method(ty_idx, member, true)
                }
                "block" | "static_initializer" => {
                    let block = if member.kind() == "block" {
                        Some(member)
                    } else {
                        find_named_child(member, "block")
                    };
                    if let Some(block) = block {
                        let facts = body::analyze(self.text, block);
                        self.file.types[ty_idx].initializers.push(facts);
                    }
                }
                kind if TYPE_DECLARATIONS.contains(&kind) => self.type_decl(member, Some(ty_idx)),
                _ => {}
            }
        }
    }

    fn method(&mut self, ty_idx: usize, node: Node<'_>, is_constructor: bool) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let block = node.child_by_field_name("body");
        if block.is_some_and(|block| inner_range(block).is_none()) {
            tracing::debug!(
                target: "carry.java",
                method = node_text(self.text, name),
                "skipping method without a closing brace"
            );
            return;
        }

        let dims = node
            .child_by_field_name("dimensions")
            .map(|dims| self.compact_text(dims))
            .unwrap_or_default();
        let return_type = if is_constructor {
            None
        } else {
            node.child_by_field_name("type")
                .map(|ty| format!("{}{dims}", self.compact_text(ty)))
        };
        let params = node
            .child_by_field_name("parameters")
            .map(|params| self.params(params))
            .unwrap_or_default();
        let throws: Vec<String> = find_named_child(node, "throws")
            .map(|throws| {
                named_children(throws)
                    .into_iter()
                    .filter(|ty| !is_comment(*ty))
                    .map(|ty| self.compact_text(ty))
                    .collect()
            })
            .unwrap_or_default();
        let skip: Vec<Node<'_>> = [Some(name), block].into_iter().flatten().collect();

        let method = ParsedMethod {
            name: node_text(self.text, name).to_string(),
            name_range: node_range(name),
            is_constructor,
            modifiers: self.modifiers(node),
            return_type,
            params,
            throws,
            range: TextRange::new(self.leading_start(node), node.end_byte()),
            header_mentions: body::header_mentions(self.text, node, &skip),
            body: block.map(|block| body::analyze(self.text, block)),
            body_range: block.map(node_range),
        };
        self.file.types[ty_idx].methods.push(method);
    }

    fn params(&self, list: Node<'_>) -> Vec<Param> {
        let mut params = Vec::new();
        for param in named_children(list) {
            let (ty, name) = match param.kind() {
                "formal_parameter" => {
                    let (Some(ty), Some(name)) = (
                        param.child_by_field_name("type"),
                        param.child_by_field_name("name"),
                    ) else {
                        continue;
                    };
                    let dims = param
                        .child_by_field_name("dimensions")
                        .map(|dims| self.compact_text(dims))
                        .unwrap_or_default();
                    (format!("{}{dims}", self.compact_text(ty)), name)
                }
                "spread_parameter" => {
                    let ty = named_children(param).into_iter().find(|child| {
                        !is_comment(*child)
                            && !matches!(child.kind(), "modifiers" | "variable_declarator")
                    });
                    let name = find_named_child(param, "variable_declarator")
                        .and_then(|declarator| declarator.child_by_field_name("name"));
                    let (Some(ty), Some(name)) = (ty, name) else {
                        continue;
                    };
                    (format!("{}...", self.compact_text(ty)), name)
                }
                // Receiver parameters (`Foo this`) and comments.
                _ => continue,
            };
            params.push(Param {
                ty,
                name: node_text(self.text, name).to_string(),
            });
        }
        params
    }

    fn field(&mut self, ty_idx: usize, node: Node<'_>) {
        let Some(ty) = node.child_by_field_name("type") else {
            return;
        };
        let ty = self.compact_text(ty);
        let modifiers = self.modifiers(node);
        let declarators: Vec<Node<'_>> = named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "variable_declarator")
            .collect();
        let statement_range = TextRange::new(self.leading_start(node), node.end_byte());
        let declarator_count = declarators.len();
        for declarator in declarators {
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            let dims = declarator
                .child_by_field_name("dimensions")
                .map(|dims| self.compact_text(dims))
                .unwrap_or_default();
            let field = ParsedField {
                name: node_text(self.text, name).to_string(),
                name_range: node_range(name),
                ty: format!("{ty}{dims}"),
                modifiers: modifiers.clone(),
                declarator_range: node_range(declarator),
                statement_range,
                declarator_count,
                initializer: declarator
                    .child_by_field_name("value")
                    .map(|value| body::analyze(self.text, value)),
            };
            self.file.types[ty_idx].fields.push(field);
        }
    }
}

/// Erases a declared type for signature comparison: generic arguments and qualification are
/// dropped, varargs become arrays.
pub(crate) fn erase_type(ty: &str) -> String {
    let mut out = String::with_capacity(ty.len());
    let mut depth = 0usize;
    for ch in ty.chars() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if depth == 0 && !c.is_whitespace() => out.push(c),
            _ => {}
        }
    }
    let out = out.replace("...", "[]");
    let (base, dims) = match out.find('[') {
        Some(idx) => out.split_at(idx),
        None => (out.as_str(), ""),
    };
    let simple = base.rsplit('.').next().unwrap_or(base);
    format!("{simple}{dims}")
}

/// The raw type name without generic arguments or array dimensions (`java.util.List`).
pub(crate) fn base_type_name(ty: &str) -> &str {
    let end = ty.find(['<', '[']).unwrap_or(ty.len());
    ty[..end].trim()
}
