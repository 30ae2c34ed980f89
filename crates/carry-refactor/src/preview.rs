use std::collections::BTreeMap;

use carry_core::{apply_workspace_edit, EditError, FileId, WorkspaceEdit};
use serde::Serialize;
use similar::{ChangeTag, TextDiff};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FilePreview {
    pub file: FileId,
    pub original: String,
    pub modified: String,
    pub unified_diff: String,
    pub added_lines: usize,
    pub removed_lines: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RefactoringPreview {
    pub total_files: usize,
    pub files: Vec<FilePreview>,
}

impl RefactoringPreview {
    /// All file diffs, concatenated in file order.
    pub fn unified_diff(&self) -> String {
        self.files
            .iter()
            .map(|file| file.unified_diff.as_str())
            .collect()
    }
}

/// Unified diffs for every file `edit` changes, computed against `original_files`.
pub fn generate_preview(
    original_files: &BTreeMap<FileId, String>,
    edit: &WorkspaceEdit,
) -> Result<RefactoringPreview, EditError> {
    let modified_files = apply_workspace_edit(original_files, edit)?;

    let mut files = Vec::new();
    for file in edit.files() {
        let original = original_files.get(file).map(String::as_str).unwrap_or("");
        let modified = modified_files.get(file).map(String::as_str).unwrap_or("");
        if original == modified {
            continue;
        }

        let diff = TextDiff::from_lines(original, modified);
        let (mut added_lines, mut removed_lines) = (0, 0);
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => added_lines += 1,
                ChangeTag::Delete => removed_lines += 1,
                ChangeTag::Equal => {}
            }
        }
        let unified_diff = diff
            .unified_diff()
            .context_radius(3)
            .header(&format!("a/{file}"), &format!("b/{file}"))
            .to_string();

        files.push(FilePreview {
            file: file.clone(),
            original: original.to_string(),
            modified: modified.to_string(),
            unified_diff,
            added_lines,
            removed_lines,
        });
    }

    Ok(RefactoringPreview {
        total_files: files.len(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use carry_core::{TextEdit, TextRange};
    use pretty_assertions::assert_eq;

    #[test]
    fn preview_diffs_only_changed_files() {
        let files = BTreeMap::from([
            (FileId::new("A.java"), "class A {\n    int x;\n}\n".to_string()),
            (FileId::new("B.java"), "class B {}\n".to_string()),
        ]);
        let edit = WorkspaceEdit::new(vec![
            TextEdit::replace(FileId::new("A.java"), TextRange::new(18, 19), "y"),
            TextEdit::replace(FileId::new("B.java"), TextRange::new(0, 5), "class"),
        ]);
        let preview = generate_preview(&files, &edit).unwrap();
        assert_eq!(preview.total_files, 1);
        let file = &preview.files[0];
        assert_eq!(file.file, FileId::new("A.java"));
        assert_eq!((file.added_lines, file.removed_lines), (1, 1));
        assert_eq!(
            file.unified_diff,
            "--- a/A.java\n+++ b/A.java\n@@ -1,3 +1,3 @@\n \
             class A {\n-    int x;\n+    int y;\n }\n"
        );
        assert_eq!(preview.unified_diff(), file.unified_diff);
    }

    #[test]
    fn edits_to_unknown_files_fail() {
        let edit = WorkspaceEdit::new(vec![TextEdit::insert(FileId::new("C.java"), 0, "x")]);
        assert_eq!(
            generate_preview(&BTreeMap::new(), &edit),
            Err(EditError::UnknownFile(FileId::new("C.java")))
        );
    }
}
