//! Move-method orchestration.
//!
//! A move runs as a fixed sequence of phases over one [`Transaction`]. Every phase reads the
//! current snapshot, stages a batch and flushes it before the next phase reads again, so no
//! phase ever works from offsets another phase has already invalidated.

use std::collections::{BTreeMap, BTreeSet};

use carry_core::{
    apply_text_edits, dedent_block, expand_to_lines, indent_block, EditError, FileId, TextEdit,
    TextRange, WorkspaceEdit,
};
use carry_java::{
    FieldId, FieldUsage, JavaIndex, MethodId, QualifierShape, SymbolModel, TypeKind, TypeName,
    Visibility,
};
use regex::Regex;
use thiserror::Error;

use crate::imports::{import_needed, unused_import_edits};
use crate::inject::FieldInjector;
use crate::layout::{insert_before_close, member_deletion_range, member_indent, merge_ranges};
use crate::movability::{compute_group, MovabilityMap};
use crate::references::{
    classify, collect_used_types, find_external_types_referenced_in_methods, find_references_of,
    CallerPlacement, Reference, UsedType,
};
use crate::report::{Conflict, MoveReport, StayedMethod};
use crate::rewrite::ReferenceRewriter;
use crate::transaction::{EditBatch, Transaction};
use crate::visibility::{modifier_edit, required_visibility, FieldVisibility};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveMethodParams {
    /// Qualified or simple name of the type declaring the method.
    pub source_type: String,
    /// `name`, or `name(Type, Type)` to pick one overload.
    pub method: String,
    pub target_type: String,
    /// Modifiers of fields the move has to add.
    pub field_visibility: FieldVisibility,
}

/// Optional clean-up phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveOptions {
    /// Remove imports the move left unused in the source and target files.
    pub normalize_imports: bool,
    /// Remove fields of touched types that lost their last reference.
    pub collect_unused_fields: bool,
}

impl Default for MoveOptions {
    fn default() -> Self {
        MoveOptions {
            normalize_imports: true,
            collect_unused_fields: true,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoveMethodError {
    #[error("type '{0}' not found")]
    TypeNotFound(String),
    #[error("type name '{name}' is ambiguous: {}", candidates.join(", "))]
    AmbiguousType {
        name: String,
        candidates: Vec<String>,
    },
    #[error("malformed method selector '{0}'")]
    InvalidSelector(String),
    #[error("method '{method}' not found in '{ty}'")]
    MethodNotFound { ty: TypeName, method: String },
    #[error("method '{method}' is ambiguous in '{ty}': {}", candidates.join(", "))]
    AmbiguousMethod {
        ty: TypeName,
        method: String,
        candidates: Vec<String>,
    },
    #[error("source and target are the same type '{0}'")]
    SameType(TypeName),
    #[error("'{0}' is a constructor")]
    Constructor(MethodId),
    #[error("'{0}' has no body")]
    NoBody(MethodId),
    #[error("target type '{0}' is an interface")]
    InterfaceTarget(TypeName),
    #[error("'{ty}' already declares {signature}")]
    NameCollision { ty: TypeName, signature: String },
    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Result of a successful move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The moved methods as they were declared on the source type, in declaration order.
    pub moved: Vec<MethodId>,
    pub stayed: Vec<StayedMethod>,
    /// One full-file replacement per changed file.
    pub edit: WorkspaceEdit,
    pub report: MoveReport,
}

/// Moves a method, and every helper only it needs, from one type to another.
pub fn move_method(
    files: &BTreeMap<FileId, String>,
    params: MoveMethodParams,
) -> Result<MoveOutcome, MoveMethodError> {
    move_method_with(files, params, &MoveOptions::default())
}

pub fn move_method_with(
    files: &BTreeMap<FileId, String>,
    params: MoveMethodParams,
    options: &MoveOptions,
) -> Result<MoveOutcome, MoveMethodError> {
    let mut tx = Transaction::new(files);
    let plan = Plan::analyze(tx.model(), &params)?;
    let conflicts = analysis_conflicts(tx.model(), &plan.moved);
    let mut mover = Mover {
        plan,
        field_visibility: params.field_visibility,
        injector: FieldInjector::new(),
        conflicts,
        touched: BTreeSet::new(),
        gc_candidates: BTreeSet::new(),
        outside_callers: BTreeMap::new(),
        external_types: BTreeSet::new(),
        removed_fields: Vec::new(),
    };

    mover.rewrite_incoming(&mut tx)?;
    mover.rewrite_outgoing(&mut tx)?;
    mover.inject_dependencies(&mut tx)?;
    mover.add_imports(&mut tx)?;
    mover.transplant(&mut tx)?;
    if options.collect_unused_fields {
        mover.collect_unused_fields(&mut tx)?;
    }
    if options.normalize_imports {
        mover.normalize_imports(&mut tx)?;
    }

    let outcome = mover.finish(tx);
    tracing::info!(
        target: "carry.refactor",
        root = %outcome.report.root,
        target_type = %outcome.report.target,
        moved = outcome.moved.len(),
        stayed = outcome.stayed.len(),
        conflicts = outcome.report.conflicts.len(),
        files = outcome.edit.files().len(),
        "moved method"
    );
    Ok(outcome)
}

/// Runs only the movability analysis for `method` of `source_type`.
pub fn analyze_method(
    files: &BTreeMap<FileId, String>,
    source_type: &str,
    method: &str,
) -> Result<MovabilityMap, MoveMethodError> {
    let index = JavaIndex::new(files);
    let source = find_type(&index, source_type)?;
    let root = select_method(&index, &source, method)?;
    Ok(compute_group(&index, &root))
}

/// Validated input plus the movability partition.
struct Plan {
    root: MethodId,
    source: TypeName,
    target: TypeName,
    group: MovabilityMap,
    move_set: BTreeSet<MethodId>,
    stay_set: BTreeSet<MethodId>,
    /// `move_set` in declaration order.
    moved: Vec<MethodId>,
}

impl Plan {
    fn analyze(
        model: &dyn SymbolModel,
        params: &MoveMethodParams,
    ) -> Result<Self, MoveMethodError> {
        let source = find_type(model, &params.source_type)?;
        let target = find_type(model, &params.target_type)?;
        let root = select_method(model, &source, &params.method)?;
        if source == target {
            return Err(MoveMethodError::SameType(source));
        }
        if let Some(decl) = model.method(&root) {
            if decl.is_constructor {
                return Err(MoveMethodError::Constructor(root));
            }
            if decl.body_range.is_none() {
                return Err(MoveMethodError::NoBody(root));
            }
        }
        if model
            .type_decl(&target)
            .is_some_and(|decl| matches!(decl.kind, TypeKind::Interface | TypeKind::Annotation))
        {
            return Err(MoveMethodError::InterfaceTarget(target));
        }

        let group = compute_group(model, &root);
        let move_set = group.move_set();
        let stay_set = group.stay_set();
        let moved: Vec<MethodId> = model
            .methods_of(&source)
            .into_iter()
            .map(|decl| decl.id.clone())
            .filter(|id| move_set.contains(id))
            .collect();
        if let Some(clash) = moved
            .iter()
            .find(|id| model.method(&id.with_owner(target.clone())).is_some())
        {
            return Err(MoveMethodError::NameCollision {
                ty: target,
                signature: clash.signature(),
            });
        }

        tracing::debug!(
            target: "carry.refactor",
            root = %root,
            target_type = %target,
            moving = move_set.len(),
            staying = stay_set.len(),
            "planned move"
        );
        Ok(Plan {
            root,
            source,
            target,
            group,
            move_set,
            stay_set,
            moved,
        })
    }
}

struct Mover {
    plan: Plan,
    field_visibility: FieldVisibility,
    injector: FieldInjector,
    conflicts: Vec<Conflict>,
    /// Types whose fields may lose their last reference: every caller type, source and target.
    touched: BTreeSet<TypeName>,
    /// Every field of a touched type.
    gc_candidates: BTreeSet<FieldId>,
    /// Types that call a moved method from code that does not move.
    outside_callers: BTreeMap<MethodId, BTreeSet<TypeName>>,
    /// Types besides source and target whose instance methods the moved code calls.
    external_types: BTreeSet<TypeName>,
    removed_fields: Vec<FieldId>,
}

impl Mover {
    /// Calls into the move-set: co-moved and target callers call directly, everyone else
    /// through a field of the target type.
    fn rewrite_incoming(&mut self, tx: &mut Transaction) -> Result<(), EditError> {
        let model = tx.model();
        let refs = find_references_of(model, &self.plan.move_set);
        self.touched.extend(refs.iter().map(|r| r.caller_type.clone()));
        self.touched.insert(self.plan.source.clone());
        self.touched.insert(self.plan.target.clone());
        self.gc_candidates = fields_of_types(model, &self.touched);

        let mut batch = EditBatch::new();
        let mut rewriter =
            ReferenceRewriter::new(model, &mut batch, &mut self.injector, self.field_visibility);
        for reference in &refs {
            let placement = classify(model, reference, &self.plan.move_set, &self.plan.target);
            if placement != CallerPlacement::Moving {
                self.outside_callers
                    .entry(reference.callee.clone())
                    .or_default()
                    .insert(reference.caller_type.clone());
            }
            match placement {
                CallerPlacement::Moving | CallerPlacement::InTarget => {
                    rewriter.rewrite_to_internal_call(reference);
                }
                CallerPlacement::Elsewhere => {
                    rewriter.rewrite_through_receiver(
                        reference,
                        &reference.caller_type,
                        &self.plan.target,
                    );
                }
            }
        }
        self.conflicts.extend(rewriter.into_conflicts());
        self.flush(tx, batch, "rewrite-incoming")
    }

    /// Moved code calling methods that stay, or reading fields of the source type: route it
    /// through a source-typed field of the target and widen what the target cannot see.
    fn rewrite_outgoing(&mut self, tx: &mut Transaction) -> Result<(), EditError> {
        let model = tx.model();
        let source = &self.plan.source;
        let target = &self.plan.target;
        self.external_types =
            find_external_types_referenced_in_methods(model, &self.plan.move_set, source, target);
        let needed = required_visibility(model, target, source);

        let refs: Vec<Reference> = find_references_of(model, &self.plan.stay_set)
            .into_iter()
            .filter(|r| r.caller_in(&self.plan.move_set))
            .collect();
        let usages: Vec<&FieldUsage> = self
            .plan
            .moved
            .iter()
            .flat_map(|method| model.field_usages_in(method))
            .filter(|usage| &usage.field.owner == source)
            .filter(|usage| {
                external_field_type(model, &usage.field, &self.external_types).is_none()
            })
            .collect();

        let mut batch = EditBatch::new();
        let mut rewriter =
            ReferenceRewriter::new(model, &mut batch, &mut self.injector, self.field_visibility);
        for reference in &refs {
            rewriter.rewrite_through_receiver(reference, target, source);
        }
        let mut fields = BTreeSet::new();
        for usage in usages {
            if rewriter.rewrite_field_access(usage, target, source) {
                fields.insert(usage.field.clone());
            }
        }
        self.conflicts.extend(rewriter.into_conflicts());

        let methods: BTreeSet<&MethodId> = refs.iter().map(|r| &r.callee).collect();
        for decl in methods.into_iter().filter_map(|m| model.method(m)) {
            batch.extend(widen_edit(
                model,
                &decl.file,
                decl.visibility,
                decl.visibility_range,
                decl.modifiers_start,
                needed,
            ));
        }
        for decl in fields.iter().filter_map(|f| model.field(f)) {
            batch.extend(widen_edit(
                model,
                &decl.file,
                decl.visibility,
                decl.visibility_range,
                decl.modifiers_start,
                needed,
            ));
        }
        self.flush(tx, batch, "rewrite-outgoing")
    }

    /// Gives the target a field of every other type the moved code calls into, and points
    /// moved accesses of source fields of those types at the target's own field.
    fn inject_dependencies(&mut self, tx: &mut Transaction) -> Result<(), EditError> {
        let model = tx.model();
        let target = &self.plan.target;
        let mut batch = EditBatch::new();
        for ty in &self.external_types {
            self.injector.inject_field_if_needed(
                model,
                &mut batch,
                target,
                ty,
                self.field_visibility,
            );
        }

        let usages: Vec<(&FieldUsage, TypeName)> = self
            .plan
            .moved
            .iter()
            .flat_map(|method| model.field_usages_in(method))
            .filter(|usage| usage.field.owner == self.plan.source)
            .filter_map(|usage| {
                external_field_type(model, &usage.field, &self.external_types)
                    .map(|ty| (usage, ty))
            })
            .collect();
        let mut rewriter =
            ReferenceRewriter::new(model, &mut batch, &mut self.injector, self.field_visibility);
        for (usage, ty) in &usages {
            rewriter.rewrite_field_to_own(usage, target, ty);
        }
        self.conflicts.extend(rewriter.into_conflicts());
        self.flush(tx, batch, "inject-dependencies")
    }

    fn add_imports(&mut self, tx: &mut Transaction) -> Result<(), EditError> {
        let model = tx.model();
        let Some(file) = model.type_decl(&self.plan.target).map(|d| d.file.clone()) else {
            return Ok(());
        };
        let used: BTreeSet<UsedType> = self
            .plan
            .moved
            .iter()
            .flat_map(|method| collect_used_types(model, method))
            .collect();
        let mut batch = EditBatch::new();
        for used in used
            .iter()
            .filter(|used| import_needed(model, &self.plan.target, used))
        {
            batch.add_import(model, &file, used.import_path());
        }
        self.flush(tx, batch, "add-imports")
    }

    /// Copies the moved methods to the end of the target body, then deletes the originals.
    fn transplant(&mut self, tx: &mut Transaction) -> Result<(), EditError> {
        let model = tx.model();
        let (Some(source_decl), Some(target_decl)) = (
            model.type_decl(&self.plan.source),
            model.type_decl(&self.plan.target),
        ) else {
            return Ok(());
        };
        let (Some(source_text), Some(target_text)) = (
            model.file_text(&source_decl.file),
            model.file_text(&target_decl.file),
        ) else {
            return Ok(());
        };

        let indent = member_indent(target_text, target_decl.body_range);
        let mut blocks = Vec::with_capacity(self.plan.moved.len());
        let mut deletions = Vec::with_capacity(self.plan.moved.len());
        for decl in self.plan.moved.iter().filter_map(|m| model.method(m)) {
            let lines = expand_to_lines(source_text, decl.range);
            let visibility = self.moved_visibility(model, &decl.id, decl.visibility);
            let local: Vec<TextEdit> = modifier_edit(
                &decl.file,
                source_text,
                decl.visibility_range,
                decl.modifiers_start,
                visibility,
            )
            .map(|edit| {
                let range = TextRange::new(
                    edit.range.start - lines.start,
                    edit.range.end - lines.start,
                );
                TextEdit::replace(edit.file, range, edit.replacement)
            })
            .into_iter()
            .collect();
            let text = apply_text_edits(lines.slice(source_text), &local)?;
            let mut block = indent_block(&dedent_block(&text), &indent);
            if !block.ends_with('\n') {
                block.push('\n');
            }
            blocks.push(block);
            deletions.push(member_deletion_range(source_text, decl.range));
        }
        if blocks.is_empty() {
            return Ok(());
        }

        let mut batch = EditBatch::new();
        let (at, insertion) =
            insert_before_close(target_text, target_decl.body_range, &blocks.join("\n"));
        batch.push(TextEdit::insert(target_decl.file.clone(), at, insertion));
        for range in merge_ranges(source_text, deletions).into_iter().rev() {
            batch.push(TextEdit::delete(source_decl.file.clone(), range));
        }
        self.flush(tx, batch, "transplant")
    }

    /// Deletes fields of touched types that the move left without references, until no more
    /// become unreferenced.
    fn collect_unused_fields(&mut self, tx: &mut Transaction) -> Result<(), EditError> {
        let mut candidates = self.gc_candidates.clone();
        candidates.extend(
            self.injector
                .injected()
                .iter()
                .map(|field| FieldId::new(field.owner.clone(), field.name.clone())),
        );
        loop {
            let model = tx.model();
            let dead: BTreeSet<FieldId> = candidates
                .iter()
                .filter(|field| model.field(field).is_some())
                .filter(|field| model.find_field_references(field).is_empty())
                .cloned()
                .collect();
            if dead.is_empty() {
                return Ok(());
            }
            let mut batch = EditBatch::new();
            batch.extend(field_deletions(model, &dead));
            self.flush(tx, batch, "collect-fields")?;
            candidates.retain(|field| !dead.contains(field));
            self.removed_fields.extend(dead);
        }
    }

    fn normalize_imports(&mut self, tx: &mut Transaction) -> Result<(), EditError> {
        let model = tx.model();
        let files: BTreeSet<FileId> = [&self.plan.source, &self.plan.target]
            .into_iter()
            .filter_map(|ty| model.type_decl(ty).map(|d| d.file.clone()))
            .collect();
        let mut batch = EditBatch::new();
        for file in &files {
            batch.extend(unused_import_edits(model, file));
        }
        self.flush(tx, batch, "normalize-imports")
    }

    fn flush(
        &mut self,
        tx: &mut Transaction,
        batch: EditBatch,
        phase: &'static str,
    ) -> Result<(), EditError> {
        tx.flush(batch, phase)?;
        self.injector.settle();
        Ok(())
    }

    /// Least visibility every outside caller needs. Without outside callers the root keeps its
    /// own and helpers become private.
    fn moved_visibility(
        &self,
        model: &dyn SymbolModel,
        method: &MethodId,
        declared: Visibility,
    ) -> Visibility {
        match self.outside_callers.get(method) {
            Some(callers) if !callers.is_empty() => callers
                .iter()
                .map(|caller| required_visibility(model, caller, &self.plan.target))
                .fold(Visibility::Private, Visibility::widen),
            _ if method == &self.plan.root => declared,
            _ => Visibility::Private,
        }
    }

    fn finish(self, tx: Transaction) -> MoveOutcome {
        let Mover {
            plan,
            injector,
            conflicts,
            removed_fields,
            ..
        } = self;
        let stayed: Vec<StayedMethod> = plan
            .group
            .iter()
            .filter(|(_, movable)| !movable)
            .filter_map(|(method, _)| {
                plan.group.reason(method).map(|reason| StayedMethod {
                    method: method.clone(),
                    reason: reason.clone(),
                })
            })
            .collect();
        // Injected fields that were collected again are not worth reporting.
        let injected_fields = injector
            .injected()
            .iter()
            .filter(|field| {
                !removed_fields
                    .iter()
                    .any(|r| r.owner == field.owner && r.name == field.name)
            })
            .cloned()
            .collect();
        let removed_fields = removed_fields
            .into_iter()
            .filter(|r| {
                !injector
                    .injected()
                    .iter()
                    .any(|field| r.owner == field.owner && r.name == field.name)
            })
            .collect();
        let report = MoveReport {
            root: plan.root.clone(),
            target: plan.target.clone(),
            helpers: plan
                .moved
                .iter()
                .filter(|m| **m != plan.root)
                .cloned()
                .collect(),
            stayed: stayed.clone(),
            injected_fields,
            removed_fields,
            conflicts,
        };
        MoveOutcome {
            moved: plan.moved,
            stayed,
            edit: tx.commit(),
            report,
        }
    }
}

fn fields_of_types(model: &dyn SymbolModel, types: &BTreeSet<TypeName>) -> BTreeSet<FieldId> {
    types
        .iter()
        .flat_map(|ty| model.fields_of(ty))
        .map(|field| field.id.clone())
        .collect()
}

/// The declared type of instance field `field`, if it is one of `external`.
fn external_field_type(
    model: &dyn SymbolModel,
    field: &FieldId,
    external: &BTreeSet<TypeName>,
) -> Option<TypeName> {
    let decl = model.field(field)?;
    if decl.is_static {
        return None;
    }
    model
        .resolve_type(&field.owner, &decl.ty)
        .filter(|ty| external.contains(ty))
}

fn widen_edit(
    model: &dyn SymbolModel,
    file: &FileId,
    current: Visibility,
    visibility_range: Option<TextRange>,
    modifiers_start: usize,
    needed: Visibility,
) -> Option<TextEdit> {
    if current >= needed {
        return None;
    }
    let text = model.file_text(file)?;
    modifier_edit(file, text, visibility_range, modifiers_start, needed)
}

/// Deletes `dead` fields: whole statements when every declarator goes, otherwise only the
/// dead declarators.
fn field_deletions(model: &dyn SymbolModel, dead: &BTreeSet<FieldId>) -> Vec<TextEdit> {
    let mut statements: BTreeMap<(FileId, TextRange), Vec<&FieldId>> = BTreeMap::new();
    for field in dead {
        if let Some(decl) = model.field(field) {
            statements
                .entry((decl.file.clone(), decl.statement_range))
                .or_default()
                .push(field);
        }
    }

    let mut deletions: BTreeMap<FileId, Vec<TextRange>> = BTreeMap::new();
    let mut edits = Vec::new();
    for ((file, statement), fields) in statements {
        let Some(text) = model.file_text(&file) else {
            continue;
        };
        let owner = &fields[0].owner;
        let mut declarators: Vec<_> = model
            .fields_of(owner)
            .into_iter()
            .filter(|decl| decl.statement_range == statement)
            .collect();
        let count = declarators.first().map_or(0, |d| d.declarator_count);
        if fields.len() >= count {
            deletions
                .entry(file)
                .or_default()
                .push(member_deletion_range(text, statement));
            continue;
        }
        declarators.sort_by_key(|decl| decl.declarator_range.start);
        let (Some(first), Some(last)) = (declarators.first(), declarators.last()) else {
            continue;
        };
        let kept: Vec<&str> = declarators
            .iter()
            .filter(|decl| !dead.contains(&decl.id))
            .map(|decl| decl.declarator_range.slice(text))
            .collect();
        edits.push(TextEdit::replace(
            file,
            TextRange::new(first.declarator_range.start, last.declarator_range.end),
            kept.join(", "),
        ));
    }
    for (file, ranges) in deletions {
        let Some(text) = model.file_text(&file) else {
            continue;
        };
        edits.extend(
            merge_ranges(text, ranges)
                .into_iter()
                .map(|range| TextEdit::delete(file.clone(), range)),
        );
    }
    edits
}

/// Calls the move cannot vouch for and receivers it cannot rebind, inside the moved bodies.
fn analysis_conflicts(model: &dyn SymbolModel, moved: &[MethodId]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for method in moved {
        for call in model.calls_in(method) {
            let implicit = call.qualifier.as_ref().map_or(true, |q| {
                matches!(q.shape, QualifierShape::This | QualifierShape::Super)
            });
            if call.target.is_none() && implicit {
                conflicts.push(Conflict::UnresolvedCall {
                    file: call.file.clone(),
                    range: call.range,
                    method: method.clone(),
                    name: call.name.clone(),
                });
            }
        }
        if let Some(decl) = model.method(method) {
            conflicts.extend(model.receiver_uses(method).into_iter().map(|range| {
                Conflict::ReceiverUse {
                    file: decl.file.clone(),
                    range,
                    method: method.clone(),
                }
            }));
        }
    }
    for conflict in &conflicts {
        tracing::warn!(target: "carry.refactor", %conflict, "moved code needs review");
    }
    conflicts
}

/// Looks a type up by qualified name, or by any unique dotted suffix of one.
fn find_type(model: &dyn SymbolModel, name: &str) -> Result<TypeName, MoveMethodError> {
    let name = name.trim();
    let exact = TypeName::new(name);
    if model.type_decl(&exact).is_some() {
        return Ok(exact);
    }
    let suffix = format!(".{name}");
    let mut candidates: Vec<TypeName> = model
        .types()
        .into_iter()
        .filter(|decl| decl.name.as_str().ends_with(&suffix))
        .map(|decl| decl.name.clone())
        .collect();
    match candidates.len() {
        0 => Err(MoveMethodError::TypeNotFound(name.to_string())),
        1 => Ok(candidates.remove(0)),
        _ => Err(MoveMethodError::AmbiguousType {
            name: name.to_string(),
            candidates: candidates.iter().map(ToString::to_string).collect(),
        }),
    }
}

fn select_method(
    model: &dyn SymbolModel,
    ty: &TypeName,
    selector: &str,
) -> Result<MethodId, MoveMethodError> {
    let re = Regex::new(r"^\s*([A-Za-z_$][\w$]*)\s*(?:\((.*)\))?\s*$").expect("valid regex");
    let caps = re
        .captures(selector)
        .ok_or_else(|| MoveMethodError::InvalidSelector(selector.to_string()))?;
    let name = &caps[1];
    let params: Option<Vec<String>> = caps
        .get(2)
        .map(|m| split_params(m.as_str()).into_iter().map(erase).collect());

    let candidates: Vec<&MethodId> = model
        .methods_of(ty)
        .into_iter()
        .map(|decl| &decl.id)
        .filter(|id| id.name == name)
        .filter(|id| params.as_ref().map_or(true, |p| &id.params == p))
        .collect();
    match candidates.as_slice() {
        [] => Err(MoveMethodError::MethodNotFound {
            ty: ty.clone(),
            method: selector.trim().to_string(),
        }),
        [only] => Ok((*only).clone()),
        many => Err(MoveMethodError::AmbiguousMethod {
            ty: ty.clone(),
            method: selector.trim().to_string(),
            candidates: many.iter().map(|id| id.signature()).collect(),
        }),
    }
}

/// Splits a parameter list at top-level commas.
fn split_params(list: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in list.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                params.push(&list[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    params.push(&list[start..]);
    params.retain(|p| !p.trim().is_empty());
    params
}

/// `java.util.List<String>` → `List`, `int...` → `int[]`.
fn erase(ty: &str) -> String {
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
    let (base, dims) = out.split_at(out.find('[').unwrap_or(out.len()));
    format!("{}{dims}", base.rsplit('.').next().unwrap_or(base))
}
