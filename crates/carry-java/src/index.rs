use std::collections::{BTreeMap, HashMap, HashSet};

use carry_core::{FileId, TextRange};

use crate::body::{BodyFacts, RawCall, RawName, RawQualifier, Segment};
use crate::model::{
    CallSite, FieldDecl, FieldId, FieldUsage, FileHeader, ImportDecl, MethodDecl, MethodId,
    Qualifier, QualifierShape, SymbolModel, TypeDecl, TypeKind, TypeMention,
    TypeName, Visibility,
};
use crate::names::is_primitive;
use crate::syntax::{self, base_type_name, erase_type, ParsedFile, ParsedType};

/// A [`SymbolModel`] built from Java source text.
///
/// Building is best effort: unparseable regions are skipped and unresolvable calls are kept
/// with `target: None`. Indexing never fails.
#[derive(Debug, Default)]
pub struct JavaIndex {
    files: BTreeMap<FileId, IndexedFile>,
    types: BTreeMap<TypeName, TypeDecl>,
    methods: BTreeMap<MethodId, MethodDecl>,
    fields: BTreeMap<FieldId, FieldDecl>,
    calls: Vec<CallSite>,
    usages: Vec<FieldUsage>,
    mentions: HashMap<MethodId, Vec<TypeMention>>,
    receiver_uses: HashMap<MethodId, Vec<TextRange>>,
    calls_by_method: HashMap<MethodId, Vec<usize>>,
    usages_by_method: HashMap<MethodId, Vec<usize>>,
    method_refs: HashMap<MethodId, Vec<usize>>,
    field_refs: HashMap<FieldId, Vec<usize>>,
}

#[derive(Debug)]
struct IndexedFile {
    text: String,
    header: FileHeader,
    /// Identifiers outside the package clause and imports.
    identifiers: HashSet<String>,
}

struct PendingFile<'t> {
    file: FileId,
    text: &'t str,
    parsed: ParsedFile,
    /// Qualified name per parsed type; `None` for duplicates.
    types: Vec<Option<TypeName>>,
    /// Method id per parsed method, per parsed type; `None` for duplicates.
    methods: Vec<Vec<Option<MethodId>>>,
}

enum Lookup {
    Found(MethodId),
    Ambiguous,
    Missing,
}

impl Lookup {
    fn found(self) -> Option<MethodId> {
        match self {
            Lookup::Found(id) => Some(id),
            Lookup::Ambiguous | Lookup::Missing => None,
        }
    }
}

struct Scope<'s> {
    file: &'s FileId,
    ty: &'s TypeName,
    locals: &'s HashMap<String, String>,
}

#[derive(Default)]
struct FileAnalysis {
    calls: Vec<CallSite>,
    usages: Vec<FieldUsage>,
    mentions: Vec<(MethodId, Vec<TypeMention>)>,
    receiver_uses: Vec<(MethodId, Vec<TextRange>)>,
}

fn is_varargs(method: &MethodDecl) -> bool {
    method.params.last().is_some_and(|p| p.ty.ends_with("..."))
}

fn arity_matches(method: &MethodDecl, arg_count: usize) -> bool {
    let declared = method.params.len();
    if is_varargs(method) {
        arg_count + 1 >= declared
    } else {
        declared == arg_count
    }
}

fn qualifier_from(text: &str, raw: &RawQualifier) -> Qualifier {
    let shape = match raw.segments.as_slice() {
        [Segment::This] => QualifierShape::This,
        [Segment::Super] => QualifierShape::Super,
        [Segment::Name(_)] => QualifierShape::Simple,
        _ => QualifierShape::Compound,
    };
    Qualifier {
        text: raw.range.slice(text).to_string(),
        range: raw.range,
        shape,
    }
}

impl JavaIndex {
    /// Indexes every file of `files`.
    pub fn new(files: &BTreeMap<FileId, String>) -> Self {
        let mut index = JavaIndex::default();

        let mut pending = Vec::with_capacity(files.len());
        for (file, text) in files {
            let parsed = syntax::parse(text);
            let (types, methods) = index.declare_file(file, text, &parsed);
            pending.push(PendingFile {
                file: file.clone(),
                text: text.as_str(),
                parsed,
                types,
                methods,
            });
        }

        for file in &pending {
            for (name, superclass, interfaces) in index.resolve_supertypes(file) {
                if let Some(decl) = index.types.get_mut(&name) {
                    decl.superclass = superclass;
                    decl.interfaces = interfaces;
                }
            }
        }

        for file in &pending {
            let analysis = index.analyze_file(file);
            index.record(analysis);
        }

        tracing::debug!(
            target: "carry.java",
            files = index.files.len(),
            types = index.types.len(),
            methods = index.methods.len(),
            calls = index.calls.len(),
            unresolved = index.calls.iter().filter(|c| c.target.is_none()).count(),
            "indexed workspace"
        );
        index
    }

    fn declare_file(
        &mut self,
        file: &FileId,
        text: &str,
        parsed: &ParsedFile,
    ) -> (Vec<Option<TypeName>>, Vec<Vec<Option<MethodId>>>) {
        let header = FileHeader {
            package: parsed.package.clone(),
            package_range: parsed.package_range,
            imports: parsed.imports.clone(),
        };
        let identifiers = parsed.identifiers.clone();
        self.files.insert(
            file.clone(),
            IndexedFile {
                text: text.to_string(),
                header,
                identifiers,
            },
        );

        let mut type_names: Vec<Option<TypeName>> = Vec::with_capacity(parsed.types.len());
        let mut method_ids = Vec::with_capacity(parsed.types.len());
        for parsed_ty in &parsed.types {
            let qualified = match (parsed_ty.outer, &parsed.package) {
                (Some(outer), _) => match &type_names[outer] {
                    Some(outer) => format!("{outer}.{}", parsed_ty.name),
                    None => {
                        type_names.push(None);
                        method_ids.push(Vec::new());
                        continue;
                    }
                },
                (None, Some(package)) => format!("{package}.{}", parsed_ty.name),
                (None, None) => parsed_ty.name.clone(),
            };
            let name = TypeName::new(qualified);
            if self.types.contains_key(&name) {
                tracing::debug!(
                    target: "carry.java",
                    ty = %name,
                    %file,
                    "duplicate type declaration ignored"
                );
                type_names.push(None);
                method_ids.push(Vec::new());
                continue;
            }

            let outer = parsed_ty.outer.and_then(|idx| type_names[idx].clone());
            let (methods, ids) = self.declare_methods(file, &name, parsed_ty);
            let fields = self.declare_fields(file, &name, parsed_ty);
            if let Some(outer) = &outer {
                if let Some(decl) = self.types.get_mut(outer) {
                    decl.nested.push(name.clone());
                }
            }
            self.types.insert(
                name.clone(),
                TypeDecl {
                    name: name.clone(),
                    kind: parsed_ty.kind,
                    file: file.clone(),
                    package: parsed.package.clone(),
                    outer,
                    is_static: parsed_ty.is_static,
                    superclass: None,
                    interfaces: Vec::new(),
                    range: parsed_ty.range,
                    body_range: parsed_ty.body_range,
                    methods,
                    fields,
                    nested: Vec::new(),
                },
            );
            type_names.push(Some(name));
            method_ids.push(ids);
        }

        (type_names, method_ids)
    }

    fn declare_methods(
        &mut self,
        file: &FileId,
        owner: &TypeName,
        parsed_ty: &ParsedType,
    ) -> (Vec<MethodId>, Vec<Option<MethodId>>) {
        let interface_like = matches!(parsed_ty.kind, TypeKind::Interface | TypeKind::Annotation);
        let mut declared = Vec::new();
        let mut ids = Vec::with_capacity(parsed_ty.methods.len());
        for method in &parsed_ty.methods {
            let params = method.params.iter().map(|p| erase_type(&p.ty)).collect();
            let id = MethodId::new(owner.clone(), method.name.clone(), params);
            if self.methods.contains_key(&id) {
                tracing::debug!(
                    target: "carry.java",
                    method = %id,
                    "duplicate method signature ignored"
                );
                ids.push(None);
                continue;
            }
            let mods = &method.modifiers;
            let visibility = if interface_like && mods.visibility_range.is_none() {
                Visibility::Public
            } else {
                mods.visibility
            };
            self.methods.insert(
                id.clone(),
                MethodDecl {
                    id: id.clone(),
                    file: file.clone(),
                    visibility,
                    visibility_range: mods.visibility_range,
                    modifiers_start: mods.start,
                    is_static: mods.is_static,
                    is_abstract: mods.is_abstract || (interface_like && method.body.is_none()),
                    is_constructor: method.is_constructor,
                    return_type: method.return_type.clone(),
                    params: method.params.clone(),
                    throws: method.throws.clone(),
                    name_range: method.name_range,
                    range: method.range,
                    body_range: method.body_range,
                },
            );
            declared.push(id.clone());
            ids.push(Some(id));
        }
        (declared, ids)
    }

    fn declare_fields(
        &mut self,
        file: &FileId,
        owner: &TypeName,
        parsed_ty: &ParsedType,
    ) -> Vec<FieldId> {
        let interface_like = matches!(parsed_ty.kind, TypeKind::Interface | TypeKind::Annotation);
        let mut declared = Vec::new();
        for field in &parsed_ty.fields {
            let id = FieldId::new(owner.clone(), field.name.clone());
            if self.fields.contains_key(&id) {
                continue;
            }
            let mods = &field.modifiers;
            self.fields.insert(
                id.clone(),
                FieldDecl {
                    id: id.clone(),
                    file: file.clone(),
                    ty: field.ty.clone(),
                    visibility: if interface_like {
                        Visibility::Public
                    } else {
                        mods.visibility
                    },
                    visibility_range: mods.visibility_range,
                    modifiers_start: mods.start,
                    is_static: mods.is_static || interface_like,
                    is_final: mods.is_final || interface_like,
                    name_range: field.name_range,
                    declarator_range: field.declarator_range,
                    statement_range: field.statement_range,
                    declarator_count: field.declarator_count,
                },
            );
            declared.push(id);
        }
        declared
    }

    fn resolve_supertypes(
        &self,
        pending: &PendingFile<'_>,
    ) -> Vec<(TypeName, Option<TypeName>, Vec<TypeName>)> {
        let mut out = Vec::new();
        for (idx, parsed_ty) in pending.parsed.types.iter().enumerate() {
            let Some(name) = &pending.types[idx] else {
                continue;
            };
            let resolve_all = |texts: &[String]| -> Vec<TypeName> {
                texts
                    .iter()
                    .filter_map(|t| {
                        self.resolve_type_name(&pending.file, Some(name), base_type_name(t))
                    })
                    .filter(|t| t != name)
                    .collect()
            };
            let (superclass, interfaces) = match parsed_ty.kind {
                TypeKind::Interface | TypeKind::Annotation => {
                    (None, resolve_all(&parsed_ty.extends))
                }
                _ => (
                    resolve_all(&parsed_ty.extends).into_iter().next(),
                    resolve_all(&parsed_ty.implements),
                ),
            };
            out.push((name.clone(), superclass, interfaces));
        }
        out
    }

    /// Resolves a simple or dotted type name as seen from `context` in `file`. Only types
    /// declared in the workspace resolve.
    fn resolve_type_name(
        &self,
        file: &FileId,
        context: Option<&TypeName>,
        name: &str,
    ) -> Option<TypeName> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        if let Some((head, rest)) = name.split_once('.') {
            let direct = TypeName::new(name);
            if self.types.contains_key(&direct) {
                return Some(direct);
            }
            let head = self.resolve_type_name(file, context, head)?;
            let member = TypeName::new(format!("{head}.{rest}"));
            return self.types.contains_key(&member).then_some(member);
        }

        let mut current = context.cloned();
        while let Some(ty) = current {
            if ty.simple_name() == name {
                return Some(ty);
            }
            let member = TypeName::new(format!("{ty}.{name}"));
            if self.types.contains_key(&member) {
                return Some(member);
            }
            current = self.types.get(&ty).and_then(|decl| decl.outer.clone());
        }

        let header = &self.files.get(file)?.header;
        let single = header
            .imports
            .iter()
            .find(|i| !i.is_static && i.imported_name() == Some(name));
        if let Some(import) = single {
            let ty = TypeName::new(import.path.clone());
            return self.types.contains_key(&ty).then_some(ty);
        }

        let same_package = match &header.package {
            Some(package) => TypeName::new(format!("{package}.{name}")),
            None => TypeName::new(name),
        };
        if self.types.contains_key(&same_package) {
            return Some(same_package);
        }

        header
            .imports
            .iter()
            .filter(|i| i.is_wildcard && !i.is_static)
            .map(|i| TypeName::new(format!("{}.{name}", i.path.trim_end_matches(".*"))))
            .find(|ty| self.types.contains_key(ty))
    }

    /// Resolves a declared type (`List<Order>`, `Order[]`, `int`) to a workspace type. Arrays and
    /// primitives have no members of interest and never resolve.
    fn resolve_type_text(&self, file: &FileId, context: &TypeName, text: &str) -> Option<TypeName> {
        if text.contains('[') || text.ends_with("...") {
            return None;
        }
        let base = base_type_name(text);
        if is_primitive(base) || base == "var" {
            return None;
        }
        self.resolve_type_name(file, Some(context), base)
    }

    fn lookup_method(&self, ty: &TypeName, name: &str, arg_count: usize) -> Lookup {
        let mut visited = HashSet::new();
        let mut stack = vec![ty.clone()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(decl) = self.types.get(&current) else {
                continue;
            };
            let candidates: Vec<&MethodDecl> = decl
                .methods
                .iter()
                .filter_map(|id| self.methods.get(id))
                .filter(|m| !m.is_constructor && m.id.name == name && arity_matches(m, arg_count))
                .collect();
            match candidates.as_slice() {
                [] => {}
                [only] => return Lookup::Found(only.id.clone()),
                many => {
                    let exact: Vec<&&MethodDecl> = many
                        .iter()
                        .filter(|m| m.params.len() == arg_count && !is_varargs(m))
                        .collect();
                    return match exact.as_slice() {
                        [only] => Lookup::Found(only.id.clone()),
                        _ => Lookup::Ambiguous,
                    };
                }
            }
            // Superclass members shadow interface defaults, so it is searched first.
            stack.extend(decl.interfaces.iter().rev().cloned());
            stack.extend(decl.superclass.clone());
        }
        Lookup::Missing
    }

    fn lookup_field(&self, ty: &TypeName, name: &str) -> Option<FieldId> {
        let mut visited = HashSet::new();
        let mut stack = vec![ty.clone()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Some(decl) = self.types.get(&current) else {
                continue;
            };
            let id = FieldId::new(current.clone(), name);
            if self.fields.contains_key(&id) {
                return Some(id);
            }
            stack.extend(decl.interfaces.iter().rev().cloned());
            stack.extend(decl.superclass.clone());
        }
        None
    }

    /// Field lookup through the lexically enclosing types.
    fn field_in_scope(&self, ty: &TypeName, name: &str) -> Option<FieldId> {
        let mut current = Some(ty.clone());
        while let Some(ty) = current {
            if let Some(field) = self.lookup_field(&ty, name) {
                return Some(field);
            }
            current = self.types.get(&ty).and_then(|decl| decl.outer.clone());
        }
        None
    }

    fn field_type(&self, field: &FieldId) -> Option<TypeName> {
        let decl = self.fields.get(field)?;
        self.resolve_type_text(&decl.file, &field.owner, &decl.ty)
    }

    fn return_type(&self, method: &MethodId) -> Option<TypeName> {
        let decl = self.methods.get(method)?;
        let text = decl.return_type.as_deref()?;
        self.resolve_type_text(&decl.file, &method.owner, text)
    }

    fn resolve_unqualified_call(
        &self,
        scope: &Scope<'_>,
        name: &str,
        arg_count: usize,
    ) -> Option<MethodId> {
        let mut current = Some(scope.ty.clone());
        while let Some(ty) = current {
            match self.lookup_method(&ty, name, arg_count) {
                Lookup::Found(id) => return Some(id),
                Lookup::Ambiguous => return None,
                Lookup::Missing => {}
            }
            current = self.types.get(&ty).and_then(|decl| decl.outer.clone());
        }

        let header = &self.files.get(scope.file)?.header;
        header
            .imports
            .iter()
            .filter(|i| i.is_static)
            .filter_map(|import| {
                let (owner, member) = import.path.rsplit_once('.')?;
                (import.is_wildcard || member == name).then(|| TypeName::new(owner))
            })
            .filter(|owner| self.types.contains_key(owner))
            .find_map(|owner| self.lookup_method(&owner, name, arg_count).found())
    }

    /// Static type of a receiver chain.
    fn resolve_chain(&self, scope: &Scope<'_>, segments: &[Segment]) -> Option<TypeName> {
        let (first, rest) = segments.split_first()?;
        let mut current = match first {
            Segment::This => scope.ty.clone(),
            Segment::Super => self.types.get(scope.ty)?.superclass.clone()?,
            Segment::Name(name) => {
                if let Some(ty) = scope.locals.get(name) {
                    self.resolve_type_text(scope.file, scope.ty, ty)?
                } else if let Some(field) = self.field_in_scope(scope.ty, name) {
                    self.field_type(&field)?
                } else {
                    self.resolve_type_name(scope.file, Some(scope.ty), name)?
                }
            }
            Segment::Call { name, arg_count } => {
                let method = self.resolve_unqualified_call(scope, name, *arg_count)?;
                self.return_type(&method)?
            }
            Segment::New(name) => self.resolve_type_name(scope.file, Some(scope.ty), name)?,
            Segment::Other => return None,
        };

        for segment in rest {
            current = match segment {
                Segment::Name(name) => match self.lookup_field(&current, name) {
                    Some(field) => self.field_type(&field)?,
                    None => {
                        let member = TypeName::new(format!("{current}.{name}"));
                        self.types.contains_key(&member).then_some(member)?
                    }
                },
                Segment::Call { name, arg_count } => {
                    let method = self.lookup_method(&current, name, *arg_count).found()?;
                    self.return_type(&method)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    fn resolve_call(&self, scope: &Scope<'_>, call: &RawCall) -> Option<MethodId> {
        match &call.qualifier {
            None => self.resolve_unqualified_call(scope, &call.name, call.arg_count),
            Some(qualifier) => {
                let receiver = self.resolve_chain(scope, &qualifier.segments)?;
                self.lookup_method(&receiver, &call.name, call.arg_count)
                    .found()
            }
        }
    }

    fn resolve_field_use(&self, scope: &Scope<'_>, name: &RawName) -> Option<FieldId> {
        match &name.qualifier {
            None => {
                if scope.locals.contains_key(&name.name) {
                    return None;
                }
                self.field_in_scope(scope.ty, &name.name)
            }
            Some(qualifier) => {
                let receiver = self.resolve_chain(scope, &qualifier.segments)?;
                self.lookup_field(&receiver, &name.name)
            }
        }
    }

    fn resolve_mention(
        &self,
        file: &FileId,
        owner: &TypeName,
        name: String,
        range: TextRange,
    ) -> TypeMention {
        if let Some(ty) = self.resolve_type_name(file, Some(owner), &name) {
            return TypeMention {
                name,
                range,
                qualified: Some(ty.0),
                in_project: true,
                wildcard_candidates: Vec::new(),
            };
        }
        let header = self.files.get(file).map(|f| &f.header);
        let imported = header.and_then(|h| {
            h.imports
                .iter()
                .find(|i| !i.is_static && i.imported_name() == Some(name.as_str()))
        });
        if let Some(import) = imported {
            return TypeMention {
                name,
                range,
                qualified: Some(import.path.clone()),
                in_project: false,
                wildcard_candidates: Vec::new(),
            };
        }
        let wildcard_candidates = header
            .map(|h| {
                h.imports
                    .iter()
                    .filter(|i| i.is_wildcard && !i.is_static)
                    .map(|i| i.path.clone())
                    .collect()
            })
            .unwrap_or_default();
        TypeMention {
            name,
            range,
            qualified: None,
            in_project: false,
            wildcard_candidates,
        }
    }

    fn collect_sites(
        &self,
        scope: &Scope<'_>,
        text: &str,
        containing: Option<&MethodId>,
        facts: &BodyFacts,
        out: &mut FileAnalysis,
    ) {
        for call in &facts.calls {
            let target = self.resolve_call(scope, call);
            let qualifier = call.qualifier.as_ref().map(|q| qualifier_from(text, q));
            let start = qualifier
                .as_ref()
                .map_or(call.name_range.start, |q| q.range.start);
            out.calls.push(CallSite {
                file: scope.file.clone(),
                name: call.name.clone(),
                name_range: call.name_range,
                range: TextRange::new(start, call.name_range.end),
                arg_count: call.arg_count,
                qualifier,
                target,
                containing_method: containing.cloned(),
                containing_type: scope.ty.clone(),
            });
        }
        for name in &facts.names {
            let Some(field) = self.resolve_field_use(scope, name) else {
                continue;
            };
            out.usages.push(FieldUsage {
                field,
                file: scope.file.clone(),
                name_range: name.range,
                qualifier: name.qualifier.as_ref().map(|q| qualifier_from(text, q)),
                containing_method: containing.cloned(),
                containing_type: scope.ty.clone(),
            });
        }
    }

    fn analyze_file(&self, pending: &PendingFile<'_>) -> FileAnalysis {
        let mut out = FileAnalysis::default();
        let no_locals = HashMap::new();

        for (ty_idx, parsed_ty) in pending.parsed.types.iter().enumerate() {
            let Some(owner) = &pending.types[ty_idx] else {
                continue;
            };

            for (m_idx, method) in parsed_ty.methods.iter().enumerate() {
                let Some(id) = &pending.methods[ty_idx][m_idx] else {
                    continue;
                };
                let mut mentions = method.header_mentions.clone();
                if let Some(facts) = &method.body {
                    let mut locals: HashMap<String, String> = method
                        .params
                        .iter()
                        .map(|p| (p.name.clone(), p.ty.clone()))
                        .collect();
                    locals.extend(facts.locals.iter().cloned());
                    let scope = Scope {
                        file: &pending.file,
                        ty: owner,
                        locals: &locals,
                    };
                    self.collect_sites(&scope, pending.text, Some(id), facts, &mut out);
                    mentions.extend(facts.type_mentions.iter().cloned());
                    if !facts.receiver_uses.is_empty() {
                        out.receiver_uses
                            .push((id.clone(), facts.receiver_uses.clone()));
                    }
                }
                let resolved = mentions
                    .into_iter()
                    .map(|(name, range)| self.resolve_mention(&pending.file, owner, name, range))
                    .collect();
                out.mentions.push((id.clone(), resolved));
            }

            let scope = Scope {
                file: &pending.file,
                ty: owner,
                locals: &no_locals,
            };
            let initializers = parsed_ty
                .fields
                .iter()
                .filter_map(|f| f.initializer.as_ref())
                .chain(parsed_ty.initializers.iter());
            for facts in initializers {
                self.collect_sites(&scope, pending.text, None, facts, &mut out);
            }
        }

        out
    }

    fn record(&mut self, analysis: FileAnalysis) {
        for call in analysis.calls {
            let idx = self.calls.len();
            if let Some(target) = &call.target {
                self.method_refs.entry(target.clone()).or_default().push(idx);
            }
            if let Some(method) = &call.containing_method {
                self.calls_by_method
                    .entry(method.clone())
                    .or_default()
                    .push(idx);
            }
            self.calls.push(call);
        }
        for usage in analysis.usages {
            let idx = self.usages.len();
            self.field_refs
                .entry(usage.field.clone())
                .or_default()
                .push(idx);
            if let Some(method) = &usage.containing_method {
                self.usages_by_method
                    .entry(method.clone())
                    .or_default()
                    .push(idx);
            }
            self.usages.push(usage);
        }
        self.mentions.extend(analysis.mentions);
        self.receiver_uses.extend(analysis.receiver_uses);
    }

    /// Call sites whose target could not be resolved, in file order.
    pub fn unresolved_calls(&self) -> impl Iterator<Item = &CallSite> {
        self.calls.iter().filter(|c| c.target.is_none())
    }
}

impl SymbolModel for JavaIndex {
    fn files(&self) -> Vec<FileId> {
        self.files.keys().cloned().collect()
    }

    fn file_text(&self, file: &FileId) -> Option<&str> {
        self.files.get(file).map(|f| f.text.as_str())
    }

    fn file_header(&self, file: &FileId) -> Option<&FileHeader> {
        self.files.get(file).map(|f| &f.header)
    }

    fn unused_imports(&self, file: &FileId) -> Vec<ImportDecl> {
        let Some(entry) = self.files.get(file) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        entry
            .header
            .imports
            .iter()
            .filter(|import| {
                if !seen.insert((import.is_static, import.path.as_str())) {
                    return true;
                }
                match import.imported_name() {
                    Some(name) => !entry.identifiers.contains(name),
                    None => false,
                }
            })
            .cloned()
            .collect()
    }

    fn type_decl(&self, name: &TypeName) -> Option<&TypeDecl> {
        self.types.get(name)
    }

    fn types(&self) -> Vec<&TypeDecl> {
        self.types.values().collect()
    }

    fn method(&self, id: &MethodId) -> Option<&MethodDecl> {
        self.methods.get(id)
    }

    fn field(&self, id: &FieldId) -> Option<&FieldDecl> {
        self.fields.get(id)
    }

    fn calls_in(&self, method: &MethodId) -> Vec<&CallSite> {
        self.calls_by_method
            .get(method)
            .map(|ids| ids.iter().map(|&idx| &self.calls[idx]).collect())
            .unwrap_or_default()
    }

    fn field_usages_in(&self, method: &MethodId) -> Vec<&FieldUsage> {
        self.usages_by_method
            .get(method)
            .map(|ids| ids.iter().map(|&idx| &self.usages[idx]).collect())
            .unwrap_or_default()
    }

    fn find_method_references(&self, method: &MethodId) -> Vec<&CallSite> {
        self.method_refs
            .get(method)
            .map(|ids| ids.iter().map(|&idx| &self.calls[idx]).collect())
            .unwrap_or_default()
    }

    fn find_field_references(&self, field: &FieldId) -> Vec<&FieldUsage> {
        self.field_refs
            .get(field)
            .map(|ids| ids.iter().map(|&idx| &self.usages[idx]).collect())
            .unwrap_or_default()
    }

    fn type_mentions(&self, method: &MethodId) -> Vec<&TypeMention> {
        self.mentions
            .get(method)
            .map(|mentions| mentions.iter().collect())
            .unwrap_or_default()
    }

    fn receiver_uses(&self, method: &MethodId) -> Vec<TextRange> {
        self.receiver_uses.get(method).cloned().unwrap_or_default()
    }

    fn resolve_type(&self, context: &TypeName, text: &str) -> Option<TypeName> {
        let decl = self.types.get(context)?;
        self.resolve_type_text(&decl.file, context, text)
    }
}
