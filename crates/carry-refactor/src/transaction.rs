use std::collections::BTreeMap;

use carry_core::{EditError, FileId, TextEdit, TextRange, WorkspaceEdit};
use carry_java::{JavaIndex, SymbolModel};

use crate::imports::{import_edit, is_imported};

/// Edits staged against one model snapshot.
///
/// All reads that produce a batch must happen before the batch is flushed; ranges in the batch
/// refer to the snapshot they were read from.
#[derive(Debug, Default)]
pub struct EditBatch {
    edits: Vec<TextEdit>,
    /// Per file: the slot of its import edit in `edits` and the paths it adds.
    imports: BTreeMap<FileId, (usize, Vec<String>)>,
}

impl EditBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edit: TextEdit) {
        self.edits.push(edit);
    }

    /// Stages `import path;` in `file` once per batch; returns `false` if it is already there
    /// or already staged. All imports staged for one file land as a single block.
    pub fn add_import(&mut self, model: &dyn SymbolModel, file: &FileId, path: &str) -> bool {
        if is_imported(model, file, path) {
            return false;
        }
        let mut paths = match self.imports.get(file) {
            Some((_, staged)) if staged.iter().any(|p| p == path) => return false,
            Some((_, staged)) => staged.clone(),
            None => Vec::new(),
        };
        paths.push(path.to_string());
        let Some(edit) = import_edit(model, file, &paths) else {
            return false;
        };
        match self.imports.get_mut(file) {
            Some((slot, staged)) => {
                self.edits[*slot] = edit;
                *staged = paths;
            }
            None => {
                self.imports.insert(file.clone(), (self.edits.len(), paths));
                self.edits.push(edit);
            }
        }
        true
    }

    pub fn edits(&self) -> &[TextEdit] {
        &self.edits
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

impl Extend<TextEdit> for EditBatch {
    fn extend<I: IntoIterator<Item = TextEdit>>(&mut self, iter: I) {
        self.edits.extend(iter);
    }
}

/// In-memory working copy of the workspace that a move edits phase by phase.
///
/// Every [`flush`](Transaction::flush) applies one batch and re-indexes. The caller's files are
/// never touched: [`commit`](Transaction::commit) hands back a [`WorkspaceEdit`] and dropping
/// the transaction discards all work.
#[derive(Debug)]
pub struct Transaction {
    original: BTreeMap<FileId, String>,
    files: BTreeMap<FileId, String>,
    index: JavaIndex,
}

impl Transaction {
    pub fn new(files: &BTreeMap<FileId, String>) -> Self {
        Transaction {
            original: files.clone(),
            files: files.clone(),
            index: JavaIndex::new(files),
        }
    }

    /// The current snapshot.
    pub fn model(&self) -> &JavaIndex {
        &self.index
    }

    pub fn files(&self) -> &BTreeMap<FileId, String> {
        &self.files
    }

    /// Applies `batch` to the working copy and re-indexes it.
    pub fn flush(&mut self, batch: EditBatch, phase: &'static str) -> Result<(), EditError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut edit = WorkspaceEdit::new(batch.edits);
        edit.normalize()?;
        tracing::debug!(
            target: "carry.refactor",
            phase,
            edits = edit.edits.len(),
            files = edit.files().len(),
            "flushing edit batch"
        );
        self.files = edit.apply_to(&self.files)?;
        self.index = JavaIndex::new(&self.files);
        Ok(())
    }

    /// One full-file replacement per file that differs from the starting point.
    pub fn commit(self) -> WorkspaceEdit {
        let edits = self
            .files
            .into_iter()
            .filter_map(|(file, text)| {
                let before = self.original.get(&file)?;
                (before != &text).then(|| {
                    TextEdit::replace(file, TextRange::new(0, before.len()), text)
                })
            })
            .collect();
        WorkspaceEdit::new(edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn files() -> BTreeMap<FileId, String> {
        BTreeMap::from([
            (FileId::new("A.java"), "class A { void a() {} }\n".to_string()),
            (FileId::new("B.java"), "class B {}\n".to_string()),
        ])
    }

    #[test]
    fn flush_reindexes_and_commit_replaces_changed_files() {
        let original = files();
        let mut tx = Transaction::new(&original);
        let a = FileId::new("A.java");

        let mut batch = EditBatch::new();
        batch.push(TextEdit::insert(a.clone(), 22, "void b() {} "));
        tx.flush(batch, "test").unwrap();
        assert_eq!(tx.model().methods_of(&carry_java::TypeName::new("A")).len(), 2);

        let edit = tx.commit();
        assert_eq!(edit.files(), vec![&a]);
        let applied = edit.apply_to(&original).unwrap();
        assert_eq!(applied[&a], "class A { void a() {} void b() {} }\n");
    }

    #[test]
    fn overlapping_batches_fail_without_touching_the_working_copy() {
        let mut tx = Transaction::new(&files());
        let a = FileId::new("A.java");
        let mut batch = EditBatch::new();
        batch.push(TextEdit::replace(a.clone(), TextRange::new(0, 5), "x"));
        batch.push(TextEdit::replace(a.clone(), TextRange::new(3, 7), "y"));
        assert!(matches!(
            tx.flush(batch, "test"),
            Err(EditError::OverlappingEdits { .. })
        ));
        assert_eq!(tx.files()[&a], "class A { void a() {} }\n");
        assert!(tx.commit().is_empty());
    }

    #[test]
    fn imports_are_staged_once_per_file() {
        let tx = Transaction::new(&files());
        let mut batch = EditBatch::new();
        let b = FileId::new("B.java");
        assert!(batch.add_import(tx.model(), &b, "java.util.List"));
        assert!(!batch.add_import(tx.model(), &b, "java.util.List"));
        assert!(batch.add_import(tx.model(), &b, "java.util.Map"));
        assert_eq!(batch.edits().len(), 1);
    }

    #[test]
    fn imports_staged_for_a_bare_file_apply_as_one_block() {
        let mut tx = Transaction::new(&files());
        let b = FileId::new("B.java");
        let mut batch = EditBatch::new();
        batch.push(TextEdit::insert(b.clone(), 9, "int n; "));
        batch.add_import(tx.model(), &b, "java.util.List");
        batch.add_import(tx.model(), &b, "java.util.Map");
        tx.flush(batch, "test").unwrap();
        assert_eq!(
            tx.files()[&b],
            "import java.util.List;\nimport java.util.Map;\n\nclass B {int n; }\n"
        );
    }
}
