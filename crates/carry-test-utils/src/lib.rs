//! Utilities shared by carry tests.
//!
//! Inline workspaces are built with [`files`]; on-disk fixtures are loaded with
//! [`load_fixture_dir`] and compared with [`assert_fixture_transformed`]. Set `BLESS=1` to
//! rewrite the expected fixture directory from the actual output.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Component, Path};

use carry_core::{FileId, WorkspaceEdit};
use walkdir::WalkDir;

/// Builds a workspace snapshot from `(path, text)` pairs.
pub fn files(entries: &[(&str, &str)]) -> BTreeMap<FileId, String> {
    entries
        .iter()
        .map(|(path, text)| (FileId::new(*path), text.to_string()))
        .collect()
}

/// Applies `edit` to `files`, panicking on invalid edits.
pub fn apply(files: &BTreeMap<FileId, String>, edit: &WorkspaceEdit) -> BTreeMap<FileId, String> {
    edit.apply_to(files)
        .unwrap_or_else(|err| panic!("edit does not apply: {err}"))
}

/// Loads every file under `dir`, keyed by its `/`-separated path relative to `dir`.
pub fn load_fixture_dir(dir: &Path) -> BTreeMap<FileId, String> {
    let mut out = BTreeMap::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry
            .unwrap_or_else(|err| panic!("fixture dir {} unreadable: {err}", dir.display()));
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .expect("walkdir yields paths below its root");
        let id = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let text = fs::read_to_string(entry.path())
            .unwrap_or_else(|err| panic!("failed to read {}: {err}", entry.path().display()));
        out.insert(FileId::new(id), text);
    }
    out
}

/// Loads `before`, runs `transform` over it and compares the result with `after`.
pub fn assert_fixture_transformed(
    before: &Path,
    after: &Path,
    transform: impl FnOnce(&BTreeMap<FileId, String>) -> BTreeMap<FileId, String>,
) {
    let files = transform(&load_fixture_dir(before));

    if !after.exists() {
        if bless_enabled() {
            bless_fixture_dir(after, &files);
            return;
        }
        panic!(
            "missing expected fixture dir {} (run with `BLESS=1` to write it)",
            after.display()
        );
    }

    let expected = load_fixture_dir(after);
    if files != expected {
        if bless_enabled() {
            bless_fixture_dir(after, &files);
            return;
        }
        pretty_assertions::assert_eq!(files, expected);
    }
}

fn bless_enabled() -> bool {
    let Ok(val) = env::var("BLESS") else {
        return false;
    };
    let val = val.trim().to_ascii_lowercase();
    !(val.is_empty() || val == "0" || val == "false")
}

fn bless_fixture_dir(dir: &Path, files: &BTreeMap<FileId, String>) {
    if dir.exists() {
        fs::remove_dir_all(dir).unwrap_or_else(|err| {
            panic!("failed to remove fixture dir {}: {err}", dir.display())
        });
    }
    for (id, text) in files {
        let rel = Path::new(id.as_str());
        assert!(
            rel.components().all(|c| matches!(c, Component::Normal(_))),
            "fixture paths must be plain relative paths: {id}"
        );
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap_or_else(|err| {
                panic!("failed to create fixture dir {}: {err}", parent.display())
            });
        }
        fs::write(&path, text)
            .unwrap_or_else(|err| panic!("failed to write fixture {}: {err}", path.display()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_dirs_load_with_slash_separated_ids() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("shop")).unwrap();
        fs::write(dir.path().join("shop/Order.java"), "class Order {}\n").unwrap();
        fs::write(dir.path().join("Main.java"), "class Main {}\n").unwrap();

        let loaded = load_fixture_dir(dir.path());
        assert_eq!(
            loaded,
            files(&[
                ("Main.java", "class Main {}\n"),
                ("shop/Order.java", "class Order {}\n"),
            ])
        );
    }

    #[test]
    fn transformed_fixtures_compare_against_the_expected_dir() {
        let before = tempfile::tempdir().unwrap();
        let after = tempfile::tempdir().unwrap();
        fs::write(before.path().join("A.java"), "class A {}\n").unwrap();
        fs::write(after.path().join("A.java"), "final class A {}\n").unwrap();

        assert_fixture_transformed(before.path(), after.path(), |files| {
            files
                .iter()
                .map(|(id, text)| (id.clone(), format!("final {text}")))
                .collect()
        });
    }
}
