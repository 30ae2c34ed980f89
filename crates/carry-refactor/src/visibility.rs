use std::fmt;
use std::str::FromStr;

use carry_core::{FileId, TextEdit, TextRange};
use carry_java::{SymbolModel, TypeName, Visibility};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access policy applied to fields the refactoring injects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldVisibility {
    #[default]
    #[serde(alias = "private final", alias = "private_final")]
    PrivateFinal,
    Private,
    #[serde(alias = "public final", alias = "public_final")]
    PublicFinal,
    Public,
}

impl FieldVisibility {
    pub const ALL: [FieldVisibility; 4] = [
        FieldVisibility::PrivateFinal,
        FieldVisibility::Private,
        FieldVisibility::PublicFinal,
        FieldVisibility::Public,
    ];

    /// Modifier text written in front of an injected field declaration.
    pub fn modifiers(self) -> &'static str {
        match self {
            FieldVisibility::PrivateFinal => "private final",
            FieldVisibility::Private => "private",
            FieldVisibility::PublicFinal => "public final",
            FieldVisibility::Public => "public",
        }
    }

    pub fn visibility(self) -> Visibility {
        match self {
            FieldVisibility::PrivateFinal | FieldVisibility::Private => Visibility::Private,
            FieldVisibility::PublicFinal | FieldVisibility::Public => Visibility::Public,
        }
    }

    pub fn is_final(self) -> bool {
        matches!(
            self,
            FieldVisibility::PrivateFinal | FieldVisibility::PublicFinal
        )
    }

    fn as_str(self) -> &'static str {
        match self {
            FieldVisibility::PrivateFinal => "private-final",
            FieldVisibility::Private => "private",
            FieldVisibility::PublicFinal => "public-final",
            FieldVisibility::Public => "public",
        }
    }
}

impl fmt::Display for FieldVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown field visibility '{0}' (expected private-final, private, public-final or public)")]
pub struct ParseFieldVisibilityError(pub String);

impl FromStr for FieldVisibility {
    type Err = ParseFieldVisibilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        FieldVisibility::ALL
            .into_iter()
            .find(|v| v.as_str() == normalized)
            .ok_or_else(|| ParseFieldVisibilityError(s.to_string()))
    }
}

fn top_level(model: &dyn SymbolModel, ty: &TypeName) -> TypeName {
    let mut current = ty.clone();
    while let Some(outer) = model.type_decl(&current).and_then(|d| d.outer.clone()) {
        current = outer;
    }
    current
}

/// Least visibility a member declared on `owner` needs so code in `from` can call it.
pub fn required_visibility(
    model: &dyn SymbolModel,
    from: &TypeName,
    owner: &TypeName,
) -> Visibility {
    if top_level(model, from) == top_level(model, owner) {
        return Visibility::Private;
    }
    let package = |ty: &TypeName| model.type_decl(ty).map(|d| d.package.clone());
    match (package(from), package(owner)) {
        (Some(a), Some(b)) if a == b => Visibility::Package,
        _ => Visibility::Public,
    }
}

/// Edit turning the access modifier of a declaration into `to`.
///
/// `visibility_range` is the current keyword (absent for package-private) and
/// `modifiers_start` the offset where a new keyword goes. Returns `None` when nothing changes.
pub(crate) fn modifier_edit(
    file: &FileId,
    text: &str,
    visibility_range: Option<TextRange>,
    modifiers_start: usize,
    to: Visibility,
) -> Option<TextEdit> {
    match (visibility_range, to.keyword()) {
        (Some(range), Some(keyword)) => {
            (range.slice(text) != keyword).then(|| TextEdit::replace(file.clone(), range, keyword))
        }
        (Some(range), None) => {
            let trailing = text[range.end..].len() - text[range.end..].trim_start().len();
            Some(TextEdit::delete(
                file.clone(),
                TextRange::new(range.start, range.end + trailing),
            ))
        }
        (None, Some(keyword)) => Some(TextEdit::insert(
            file.clone(),
            modifiers_start,
            format!("{keyword} "),
        )),
        (None, None) => None,
    }
}
