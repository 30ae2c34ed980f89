use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use carry_core::FileId;
use walkdir::WalkDir;

/// Every `.java` file under a root, keyed by its `/`-separated path relative to that root.
pub(crate) struct JavaWorkspace {
    pub(crate) root: PathBuf,
    pub(crate) files: BTreeMap<FileId, String>,
}

impl JavaWorkspace {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let root = if path.is_file() {
            path.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf()
        } else {
            path.to_path_buf()
        };
        anyhow::ensure!(root.is_dir(), "{} is not a directory", root.display());

        let mut files = BTreeMap::new();
        for entry in WalkDir::new(&root).follow_links(true).sort_by_file_name() {
            let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
            if !entry.file_type().is_file() || !is_java_file(entry.path()) {
                continue;
            }
            let text = fs::read_to_string(entry.path())
                .with_context(|| format!("failed to read {}", entry.path().display()))?;
            files.insert(file_id(&root, entry.path())?, text);
        }
        tracing::debug!(
            target: "carry.cli",
            root = %root.display(),
            files = files.len(),
            "loaded java sources"
        );
        Ok(JavaWorkspace { root, files })
    }

    pub(crate) fn path_of(&self, file: &FileId) -> PathBuf {
        self.root.join(file.as_str())
    }

    /// Replaces the contents of `changed` files on disk, one atomic rename per file.
    pub(crate) fn write(&self, changed: &BTreeMap<FileId, String>) -> Result<()> {
        for (file, text) in changed {
            let path = self.path_of(file);
            atomic_write(&path, text.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::debug!(target: "carry.cli", path = %path.display(), "wrote file");
        }
        Ok(())
    }
}

fn file_id(root: &Path, path: &Path) -> Result<FileId> {
    let rel = path
        .strip_prefix(root)
        .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;
    let id = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    Ok(FileId::new(id))
}

fn is_java_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("java"))
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_java_sources_with_relative_ids() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src/shop")).unwrap();
        fs::write(temp.path().join("src/shop/Order.java"), "class Order {}\n").unwrap();
        fs::write(temp.path().join("README.md"), "# shop\n").unwrap();

        let ws = JavaWorkspace::load(temp.path()).unwrap();
        assert_eq!(
            ws.files.keys().collect::<Vec<_>>(),
            vec![&FileId::new("src/shop/Order.java")]
        );
    }

    #[test]
    fn writes_replace_files_in_place() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("A.java"), "class A {}\n").unwrap();
        let ws = JavaWorkspace::load(temp.path()).unwrap();

        let changed = BTreeMap::from([(FileId::new("A.java"), "final class A {}\n".to_string())]);
        ws.write(&changed).unwrap();
        assert_eq!(
            fs::read_to_string(temp.path().join("A.java")).unwrap(),
            "final class A {}\n"
        );
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }
}
