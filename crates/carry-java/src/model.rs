use std::fmt;

use carry_core::{FileId, TextRange};
use serde::{Deserialize, Serialize};

/// Fully qualified name of a type declaration (`com.acme.Order`, `com.acme.Order.Line`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeName(pub String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last dotted segment of the name.
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structural method identity: owner + name + erased parameter types.
///
/// Stays stable across re-indexing as long as the declaration's signature is unchanged.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MethodId {
    pub owner: TypeName,
    pub name: String,
    pub params: Vec<String>,
}

impl MethodId {
    pub fn new(owner: TypeName, name: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            owner,
            name: name.into(),
            params,
        }
    }

    /// The same signature declared on another type.
    pub fn with_owner(&self, owner: TypeName) -> Self {
        Self {
            owner,
            name: self.name.clone(),
            params: self.params.clone(),
        }
    }

    /// `name(A, B)` without the owner.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.params.join(", "))
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.owner.simple_name(), self.signature())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldId {
    pub owner: TypeName,
    pub name: String,
}

impl FieldId {
    pub fn new(owner: TypeName, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner.simple_name(), self.name)
    }
}

/// Java access levels, ordered from most to least restrictive.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    Private,
    #[default]
    Package,
    Protected,
    Public,
}

impl Visibility {
    /// The modifier keyword, or `None` for package-private.
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Visibility::Private => Some("private"),
            Visibility::Package => None,
            Visibility::Protected => Some("protected"),
            Visibility::Public => Some("public"),
        }
    }

    /// The wider of the two levels.
    pub fn widen(self, other: Visibility) -> Visibility {
        self.max(other)
    }

    /// The narrower of the two levels.
    pub fn narrow(self, other: Visibility) -> Visibility {
        self.min(other)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword().unwrap_or("package-private"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: TypeName,
    pub kind: TypeKind,
    pub file: FileId,
    /// Dotted package of the containing file; `None` for the default package.
    pub package: Option<String>,
    /// Lexically enclosing type for nested declarations.
    pub outer: Option<TypeName>,
    pub is_static: bool,
    pub superclass: Option<TypeName>,
    pub interfaces: Vec<TypeName>,
    /// Range of the whole declaration including modifiers.
    pub range: TextRange,
    /// Range strictly inside the body braces.
    pub body_range: TextRange,
    /// Methods and constructors in declaration order.
    pub methods: Vec<MethodId>,
    /// Fields in declaration order.
    pub fields: Vec<FieldId>,
    pub nested: Vec<TypeName>,
}

impl TypeDecl {
    pub fn simple_name(&self) -> &str {
        self.name.simple_name()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub ty: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDecl {
    pub id: MethodId,
    pub file: FileId,
    pub visibility: Visibility,
    /// Range of the explicit access modifier keyword, if any.
    pub visibility_range: Option<TextRange>,
    /// Offset where modifiers start (after annotations); a new modifier is inserted here.
    pub modifiers_start: usize,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_constructor: bool,
    pub return_type: Option<String>,
    pub params: Vec<Param>,
    pub throws: Vec<String>,
    pub name_range: TextRange,
    /// Whole declaration, including a leading doc comment and annotations.
    pub range: TextRange,
    /// The body including its braces; `None` for abstract and interface methods.
    pub body_range: Option<TextRange>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDecl {
    pub id: FieldId,
    pub file: FileId,
    pub ty: String,
    pub visibility: Visibility,
    pub visibility_range: Option<TextRange>,
    pub modifiers_start: usize,
    pub is_static: bool,
    pub is_final: bool,
    pub name_range: TextRange,
    /// The declarator: name plus optional initializer.
    pub declarator_range: TextRange,
    /// The whole declaration statement, including modifiers and the trailing `;`.
    pub statement_range: TextRange,
    /// Number of declarators sharing the statement (`int a, b;` has two).
    pub declarator_count: usize,
}

/// Shape of a call receiver expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualifierShape {
    /// `this.m()`
    This,
    /// `super.m()`
    Super,
    /// A single identifier: a variable, field or type name.
    Simple,
    /// Anything else: chains, calls, casts, array accesses.
    Compound,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualifier {
    pub text: String,
    pub range: TextRange,
    pub shape: QualifierShape,
}

impl Qualifier {
    pub fn is_rewritable(&self) -> bool {
        !matches!(self.shape, QualifierShape::Compound)
    }
}

/// A method call expression together with its resolved target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallSite {
    pub file: FileId,
    pub name: String,
    pub name_range: TextRange,
    /// Range of the method expression: qualifier (if any) through the method name.
    pub range: TextRange,
    pub arg_count: usize,
    pub qualifier: Option<Qualifier>,
    /// Statically bound target; `None` when the call could not be resolved unambiguously.
    pub target: Option<MethodId>,
    pub containing_method: Option<MethodId>,
    pub containing_type: TypeName,
}

/// A read or write of a field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldUsage {
    pub field: FieldId,
    pub file: FileId,
    /// Range of the field name token.
    pub name_range: TextRange,
    pub qualifier: Option<Qualifier>,
    pub containing_method: Option<MethodId>,
    pub containing_type: TypeName,
}

/// A type name mentioned by a declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeMention {
    pub name: String,
    pub range: TextRange,
    /// Fully qualified name, when resolvable through the project or a single-type import.
    pub qualified: Option<String>,
    /// Whether the resolved type is declared in the workspace.
    pub in_project: bool,
    /// On-demand imports of the declaring file that may provide the name.
    pub wildcard_candidates: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDecl {
    /// The imported name without `import`/`static`/`;` (`java.util.List`, `java.util.*`).
    pub path: String,
    pub is_static: bool,
    pub is_wildcard: bool,
    /// Statement range extended over its line, so deleting it leaves no blank line.
    pub range: TextRange,
}

impl ImportDecl {
    /// The simple name the import brings into scope (`List` for `java.util.List`).
    pub fn imported_name(&self) -> Option<&str> {
        if self.is_wildcard {
            return None;
        }
        self.path.rsplit('.').next()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileHeader {
    pub package: Option<String>,
    pub package_range: Option<TextRange>,
    pub imports: Vec<ImportDecl>,
}

/// Read-only view of a program's declarations, call expressions and reference index.
///
/// The refactoring core only consumes this trait; [`crate::JavaIndex`] is the implementation
/// backed by Java source text.
pub trait SymbolModel {
    /// All known workspace files, in deterministic order.
    fn files(&self) -> Vec<FileId>;

    fn file_text(&self, file: &FileId) -> Option<&str>;

    fn file_header(&self, file: &FileId) -> Option<&FileHeader>;

    /// Imports of `file` that nothing in the file refers to (duplicates included).
    fn unused_imports(&self, file: &FileId) -> Vec<ImportDecl>;

    fn type_decl(&self, name: &TypeName) -> Option<&TypeDecl>;

    /// All declared types, in deterministic order.
    fn types(&self) -> Vec<&TypeDecl>;

    fn method(&self, id: &MethodId) -> Option<&MethodDecl>;

    fn field(&self, id: &FieldId) -> Option<&FieldDecl>;

    /// Call expressions syntactically nested in the body of `method`.
    fn calls_in(&self, method: &MethodId) -> Vec<&CallSite>;

    /// Field usages inside the body of `method`.
    fn field_usages_in(&self, method: &MethodId) -> Vec<&FieldUsage>;

    /// Project-wide search for call sites statically bound to `method`.
    fn find_method_references(&self, method: &MethodId) -> Vec<&CallSite>;

    /// Project-wide search for usages of `field`.
    fn find_field_references(&self, field: &FieldId) -> Vec<&FieldUsage>;

    /// Type names mentioned by the declaration of `method` (signature, throws clause, body).
    fn type_mentions(&self, method: &MethodId) -> Vec<&TypeMention>;

    /// Ranges where `this` or `super` is used as a value inside `method`.
    fn receiver_uses(&self, method: &MethodId) -> Vec<TextRange>;

    /// Resolve a source-level type reference as seen from inside `context`.
    fn resolve_type(&self, context: &TypeName, text: &str) -> Option<TypeName>;

    /// Methods declared on `ty` (not inherited), in declaration order.
    fn methods_of(&self, ty: &TypeName) -> Vec<&MethodDecl> {
        self.type_decl(ty)
            .map(|decl| decl.methods.iter().filter_map(|m| self.method(m)).collect())
            .unwrap_or_default()
    }

    /// Fields declared on `ty`, in declaration order.
    fn fields_of(&self, ty: &TypeName) -> Vec<&FieldDecl> {
        self.type_decl(ty)
            .map(|decl| decl.fields.iter().filter_map(|f| self.field(f)).collect())
            .unwrap_or_default()
    }

    /// `true` if `inner` is `outer` or is lexically nested inside it.
    fn is_within(&self, inner: &TypeName, outer: &TypeName) -> bool {
        let mut current = Some(inner.clone());
        while let Some(ty) = current {
            if &ty == outer {
                return true;
            }
            current = self.type_decl(&ty).and_then(|decl| decl.outer.clone());
        }
        false
    }
}
