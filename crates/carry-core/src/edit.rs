use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier for a workspace file.
///
/// This is the path of the file relative to the workspace root, using `/` separators.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub String);

impl FileId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A half-open text range `[start, end)` in UTF-8 byte offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "invalid range: {start}..{end}");
        Self { start, end }
    }

    pub fn empty(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    pub fn contains(self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Returns `true` if `other` lies entirely within `self`.
    pub fn contains_range(self, other: TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn intersects(self, other: TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The part of `text` this range covers.
    pub fn slice(self, text: &str) -> &str {
        &text[self.start..self.end]
    }
}

/// A single file edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub file: FileId,
    pub range: TextRange,
    pub replacement: String,
}

impl TextEdit {
    pub fn insert(file: FileId, offset: usize, text: impl Into<String>) -> Self {
        Self {
            file,
            range: TextRange::empty(offset),
            replacement: text.into(),
        }
    }

    pub fn replace(file: FileId, range: TextRange, text: impl Into<String>) -> Self {
        Self {
            file,
            range,
            replacement: text.into(),
        }
    }

    pub fn delete(file: FileId, range: TextRange) -> Self {
        Self {
            file,
            range,
            replacement: String::new(),
        }
    }
}

/// A set of edits across potentially multiple files.
///
/// The edits are expected to be normalized (sorted, deduplicated, non-overlapping)
/// before being applied.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceEdit {
    pub edits: Vec<TextEdit>,
}

impl WorkspaceEdit {
    pub fn new(edits: Vec<TextEdit>) -> Self {
        Self { edits }
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Files touched by this edit, in deterministic order.
    pub fn files(&self) -> Vec<&FileId> {
        let mut files: Vec<&FileId> = self.edits.iter().map(|e| &e.file).collect();
        files.sort();
        files.dedup();
        files
    }

    /// Returns edits grouped by file in deterministic order.
    pub fn edits_by_file(&self) -> BTreeMap<&FileId, Vec<&TextEdit>> {
        let mut map: BTreeMap<&FileId, Vec<&TextEdit>> = BTreeMap::new();
        for edit in &self.edits {
            map.entry(&edit.file).or_default().push(edit);
        }
        for edits in map.values_mut() {
            edits.sort_by(|a, b| {
                a.range
                    .start
                    .cmp(&b.range.start)
                    .then_with(|| a.range.end.cmp(&b.range.end))
                    .then_with(|| a.replacement.cmp(&b.replacement))
            });
        }
        map
    }

    /// Normalize edits (sort, deduplicate, and validate non-overlap).
    ///
    /// Inserts at the same offset are merged in the order they were staged.
    pub fn normalize(&mut self) -> Result<(), EditError> {
        // Stable sort so same-offset inserts keep their staging order.
        self.edits.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.range.start.cmp(&b.range.start))
                .then_with(|| a.range.end.cmp(&b.range.end))
        });

        let mut merged: Vec<TextEdit> = Vec::with_capacity(self.edits.len());
        for edit in self.edits.drain(..) {
            if let Some(last) = merged.last_mut() {
                if last.file == edit.file && last.range == edit.range {
                    if last.replacement == edit.replacement {
                        continue;
                    }
                    if last.range.is_empty() {
                        last.replacement.push_str(&edit.replacement);
                        continue;
                    }
                    return Err(EditError::OverlappingEdits {
                        file: edit.file,
                        first: last.range,
                        second: edit.range,
                    });
                }
            }
            merged.push(edit);
        }

        self.edits = merged;

        let mut current_file: Option<&FileId> = None;
        let mut prev: Option<TextRange> = None;
        for edit in &self.edits {
            if current_file.map(|f| f != &edit.file).unwrap_or(true) {
                current_file = Some(&edit.file);
                prev = None;
            }

            if let Some(prev_range) = prev {
                if edit.range.start < prev_range.end {
                    return Err(EditError::OverlappingEdits {
                        file: edit.file.clone(),
                        first: prev_range,
                        second: edit.range,
                    });
                }
            }

            prev = Some(edit.range);
        }

        Ok(())
    }

    /// Apply this edit to an in-memory snapshot, returning the updated snapshot.
    ///
    /// The input snapshot is left untouched, so a failure never leaves a partially edited
    /// workspace behind.
    pub fn apply_to(
        &self,
        files: &BTreeMap<FileId, String>,
    ) -> Result<BTreeMap<FileId, String>, EditError> {
        apply_workspace_edit(files, self)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("overlapping edits in {file}: {first:?} overlaps {second:?}")]
    OverlappingEdits {
        file: FileId,
        first: TextRange,
        second: TextRange,
    },
    #[error("text edit range {range:?} is outside the file bounds (len={len}) in {file}")]
    OutOfBounds {
        file: FileId,
        range: TextRange,
        len: usize,
    },
    #[error("text edit offset {offset} is not on a UTF-8 character boundary in {file}")]
    InvalidUtf8Boundary { file: FileId, offset: usize },
    #[error("unknown file {0}")]
    UnknownFile(FileId),
}

/// Apply a set of edits to `original` and return the modified text.
///
/// The input edits must be non-overlapping and valid for the `original` text.
pub fn apply_text_edits(original: &str, edits: &[TextEdit]) -> Result<String, EditError> {
    if edits.is_empty() {
        return Ok(original.to_string());
    }

    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by(|a, b| {
        b.range
            .start
            .cmp(&a.range.start)
            .then_with(|| b.range.end.cmp(&a.range.end))
    });

    let mut out = original.to_string();
    for edit in sorted {
        let len = out.len();
        if edit.range.end > len || edit.range.start > edit.range.end {
            return Err(EditError::OutOfBounds {
                file: edit.file.clone(),
                range: edit.range,
                len,
            });
        }
        for offset in [edit.range.start, edit.range.end] {
            if !out.is_char_boundary(offset) {
                return Err(EditError::InvalidUtf8Boundary {
                    file: edit.file.clone(),
                    offset,
                });
            }
        }

        out.replace_range(edit.range.start..edit.range.end, &edit.replacement);
    }

    Ok(out)
}

/// Apply a [`WorkspaceEdit`] to a snapshot of file contents.
pub fn apply_workspace_edit(
    files: &BTreeMap<FileId, String>,
    edit: &WorkspaceEdit,
) -> Result<BTreeMap<FileId, String>, EditError> {
    let mut normalized = edit.clone();
    normalized.normalize()?;

    let mut out = files.clone();
    for (file, edits) in normalized.edits_by_file() {
        let original = files
            .get(file)
            .ok_or_else(|| EditError::UnknownFile(file.clone()))?;
        let owned: Vec<TextEdit> = edits.into_iter().cloned().collect();
        let updated = apply_text_edits(original, &owned)?;
        out.insert(file.clone(), updated);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn file() -> FileId {
        FileId::new("A.java")
    }

    #[test]
    fn normalize_merges_inserts_in_staging_order() {
        let mut edit = WorkspaceEdit::new(vec![
            TextEdit::insert(file(), 3, "b"),
            TextEdit::insert(file(), 3, "a"),
            TextEdit::insert(file(), 3, "b"),
        ]);
        edit.normalize().unwrap();
        assert_eq!(edit.edits, vec![TextEdit::insert(file(), 3, "ba")]);
    }

    #[test]
    fn normalize_rejects_overlaps() {
        let mut edit = WorkspaceEdit::new(vec![
            TextEdit::replace(file(), TextRange::new(0, 4), "x"),
            TextEdit::replace(file(), TextRange::new(2, 6), "y"),
        ]);
        let err = edit.normalize().unwrap_err();
        assert!(matches!(err, EditError::OverlappingEdits { .. }));
    }

    #[test]
    fn insert_at_end_of_deleted_range_is_not_an_overlap() {
        let mut edit = WorkspaceEdit::new(vec![
            TextEdit::delete(file(), TextRange::new(0, 4)),
            TextEdit::insert(file(), 4, "!"),
        ]);
        edit.normalize().unwrap();
        let out = apply_text_edits("abcdef", &edit.edits).unwrap();
        assert_eq!(out, "!ef");
    }

    #[test]
    fn apply_workspace_edit_keeps_input_untouched_on_error() {
        let mut files = BTreeMap::new();
        files.insert(file(), "abc".to_string());
        let edit = WorkspaceEdit::new(vec![TextEdit::replace(
            file(),
            TextRange::new(1, 10),
            "x",
        )]);
        let err = apply_workspace_edit(&files, &edit).unwrap_err();
        assert!(matches!(err, EditError::OutOfBounds { len: 3, .. }));
        assert_eq!(files[&file()], "abc");
    }

    #[test]
    fn apply_workspace_edit_reports_unknown_files() {
        let files = BTreeMap::new();
        let edit = WorkspaceEdit::new(vec![TextEdit::insert(file(), 0, "x")]);
        assert_eq!(
            apply_workspace_edit(&files, &edit).unwrap_err(),
            EditError::UnknownFile(file())
        );
    }
}
