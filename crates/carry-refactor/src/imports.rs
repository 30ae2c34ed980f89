//! Import list maintenance.

use carry_core::{FileId, TextEdit, TextRange};
use carry_java::{SymbolModel, TypeName};

use crate::references::UsedType;

fn package_of(path: &str) -> &str {
    path.rsplit_once('.').map_or("", |(package, _)| package)
}

fn is_implicit(path: &str) -> bool {
    path.strip_prefix("java.lang.")
        .is_some_and(|rest| !rest.contains('.'))
}

/// Source text for a reference to `ty` written inside `context`, plus the import that makes it
/// resolve when one is needed.
///
/// Falls back to the qualified name when the simple name already means something else there.
pub(crate) fn type_reference(
    model: &dyn SymbolModel,
    context: &TypeName,
    ty: &TypeName,
) -> (String, Option<String>) {
    let simple = ty.simple_name().to_string();
    match model.resolve_type(context, &simple) {
        Some(resolved) if &resolved == ty => return (simple, None),
        Some(_) => return (ty.to_string(), None),
        None => {}
    }
    let clashes = model
        .type_decl(context)
        .and_then(|decl| model.file_header(&decl.file))
        .is_some_and(|header| {
            header.imports.iter().any(|import| {
                !import.is_static
                    && import.imported_name() == Some(simple.as_str())
                    && import.path != ty.as_str()
            })
        });
    if clashes {
        (ty.to_string(), None)
    } else {
        (simple, Some(ty.to_string()))
    }
}

/// Whether code moved into `context` needs an import for `used`.
pub(crate) fn import_needed(model: &dyn SymbolModel, context: &TypeName, used: &UsedType) -> bool {
    let Some(decl) = model.type_decl(context) else {
        return false;
    };
    let package = decl.package.as_deref().unwrap_or("");
    let imports = model
        .file_header(&decl.file)
        .map(|h| h.imports.as_slice())
        .unwrap_or_default();
    let path = used.import_path();
    if imports.iter().any(|i| !i.is_static && i.path == path) {
        return false;
    }
    match used {
        UsedType::OnDemand(path) => path.trim_end_matches(".*") != package,
        UsedType::Qualified(path) => {
            if is_implicit(path) {
                return false;
            }
            let ty = TypeName::new(path.clone());
            match model.type_decl(&ty) {
                Some(used_decl) => match &used_decl.outer {
                    Some(outer) => !model.is_within(context, outer),
                    None => used_decl.package.as_deref().unwrap_or("") != package,
                },
                None => package_of(path) != package,
            }
        }
    }
}

/// Whether `file` already carries the single-type import `path`.
pub(crate) fn is_imported(model: &dyn SymbolModel, file: &FileId, path: &str) -> bool {
    model
        .file_header(file)
        .is_some_and(|header| header.imports.iter().any(|i| !i.is_static && i.path == path))
}

/// One edit adding an `import` line for each of `paths` to `file`, after the last import or
/// else after the package clause. `None` if the file already imports all of them.
pub(crate) fn import_edit(
    model: &dyn SymbolModel,
    file: &FileId,
    paths: &[String],
) -> Option<TextEdit> {
    let header = model.file_header(file)?;
    let lines: String = paths
        .iter()
        .filter(|path| !is_imported(model, file, path))
        .map(|path| format!("import {path};\n"))
        .collect();
    if lines.is_empty() {
        return None;
    }
    let edit = match (header.imports.last(), header.package_range) {
        (Some(last), _) => {
            let text = model.file_text(file)?;
            let prefix = if text[..last.range.end].ends_with('\n') { "" } else { "\n" };
            TextEdit::insert(file.clone(), last.range.end, format!("{prefix}{lines}"))
        }
        (None, Some(package)) => TextEdit::insert(
            file.clone(),
            package.end,
            format!("\n\n{}", lines.trim_end_matches('\n')),
        ),
        (None, None) => TextEdit::insert(file.clone(), 0, format!("{lines}\n")),
    };
    Some(edit)
}

/// Deletions for every unused import of `file`.
///
/// When the whole import list goes, the blank line that separated it from the declarations
/// goes with it.
pub(crate) fn unused_import_edits(model: &dyn SymbolModel, file: &FileId) -> Vec<TextEdit> {
    let (Some(header), Some(text)) = (model.file_header(file), model.file_text(file)) else {
        return Vec::new();
    };
    let unused = model.unused_imports(file);
    let mut ranges: Vec<TextRange> = unused.iter().map(|i| i.range).collect();
    if !unused.is_empty() && unused.len() == header.imports.len() {
        if let Some(last) = ranges.iter_mut().max_by_key(|r| r.end) {
            let rest = &text[last.end..];
            let blank = rest.len() - rest.trim_start_matches([' ', '\t']).len();
            if rest[blank..].starts_with('\n') {
                last.end += blank + 1;
            }
        }
    }
    ranges
        .into_iter()
        .map(|range| TextEdit::delete(file.clone(), range))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use carry_core::apply_text_edits;
    use carry_java::JavaIndex;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn index(files: &[(&str, &str)]) -> JavaIndex {
        let files: BTreeMap<FileId, String> = files
            .iter()
            .map(|(path, text)| (FileId::new(*path), text.to_string()))
            .collect();
        JavaIndex::new(&files)
    }

    const ORDER: &str = "package shop;

public class Order {
    public static class Line {}
}
";

    #[test]
    fn type_references_import_only_when_needed() {
        let billing = "package billing;\n\nclass Invoice {}\n";
        let local = "package shop;\n\nclass Cart {}\n";
        let index = index(&[
            ("shop/Order.java", ORDER),
            ("billing/Invoice.java", billing),
            ("shop/Cart.java", local),
        ]);
        let order = TypeName::new("shop.Order");
        assert_eq!(
            type_reference(&index, &TypeName::new("billing.Invoice"), &order),
            ("Order".to_string(), Some("shop.Order".to_string()))
        );
        assert_eq!(
            type_reference(&index, &TypeName::new("shop.Cart"), &order),
            ("Order".to_string(), None)
        );
        assert_eq!(
            type_reference(&index, &TypeName::new("shop.Cart"), &TypeName::new("shop.Order.Line")),
            ("Line".to_string(), Some("shop.Order.Line".to_string()))
        );
    }

    #[test]
    fn clashing_simple_names_stay_qualified() {
        let billing = "package billing;\n\nimport legacy.Order;\n\nclass Invoice {}\n";
        let index = index(&[("shop/Order.java", ORDER), ("billing/Invoice.java", billing)]);
        assert_eq!(
            type_reference(&index, &TypeName::new("billing.Invoice"), &TypeName::new("shop.Order")),
            ("shop.Order".to_string(), None)
        );
    }

    #[test]
    fn import_needs_follow_package_and_nesting() {
        let billing = "package billing;\n\nimport java.util.List;\n\nclass Invoice {}\n";
        let index = index(&[("shop/Order.java", ORDER), ("billing/Invoice.java", billing)]);
        let invoice = TypeName::new("billing.Invoice");
        let needed = |used: UsedType| import_needed(&index, &invoice, &used);
        assert!(!needed(UsedType::Qualified("java.lang.String".into())));
        assert!(!needed(UsedType::Qualified("java.util.List".into())));
        assert!(needed(UsedType::Qualified("java.util.Map".into())));
        assert!(needed(UsedType::Qualified("shop.Order".into())));
        assert!(needed(UsedType::Qualified("shop.Order.Line".into())));
        assert!(needed(UsedType::OnDemand("java.io.*".into())));
        assert!(!needed(UsedType::OnDemand("billing.*".into())));
    }

    fn paths(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn imports_go_after_the_last_import_or_the_package() {
        let with_imports = "package a;\n\nimport java.util.List;\n\nclass A {}\n";
        let bare = "package a;\n\nclass B {}\n";
        let index = index(&[("A.java", with_imports), ("B.java", bare)]);

        let a = FileId::new("A.java");
        let edit = import_edit(&index, &a, &paths(&["java.util.Map"])).unwrap();
        assert_eq!(
            apply_text_edits(with_imports, &[edit]).unwrap(),
            "package a;\n\nimport java.util.List;\nimport java.util.Map;\n\nclass A {}\n"
        );
        assert!(import_edit(&index, &a, &paths(&["java.util.List"])).is_none());

        let edit = import_edit(&index, &FileId::new("B.java"), &paths(&["java.util.Map"])).unwrap();
        assert_eq!(
            apply_text_edits(bare, &[edit]).unwrap(),
            "package a;\n\nimport java.util.Map;\n\nclass B {}\n"
        );
    }

    #[test]
    fn several_imports_into_a_file_without_imports_stay_contiguous() {
        let bare = "package a;\n\nclass B {}\n";
        let no_package = "class C {}\n";
        let index = index(&[("B.java", bare), ("C.java", no_package)]);
        let wanted = paths(&["java.util.List", "java.util.Map"]);

        let edit = import_edit(&index, &FileId::new("B.java"), &wanted).unwrap();
        assert_eq!(
            apply_text_edits(bare, &[edit]).unwrap(),
            "package a;\n\nimport java.util.List;\nimport java.util.Map;\n\nclass B {}\n"
        );
        let edit = import_edit(&index, &FileId::new("C.java"), &wanted).unwrap();
        assert_eq!(
            apply_text_edits(no_package, &[edit]).unwrap(),
            "import java.util.List;\nimport java.util.Map;\n\nclass C {}\n"
        );
    }

    #[test]
    fn removing_every_import_removes_the_separator() {
        let text = "package a;\n\nimport java.util.List;\nimport java.util.Map;\n\nclass A {}\n";
        let index = index(&[("A.java", text)]);
        let edits = unused_import_edits(&index, &FileId::new("A.java"));
        assert_eq!(
            apply_text_edits(text, &edits).unwrap(),
            "package a;\n\nclass A {}\n"
        );
    }
}
