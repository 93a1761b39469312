// Shared intermediate representation
//
// Every language front-end converges on these types. They are created once
// per scan and treated as read-only afterwards; relationships and diagrams
// are derived from them on demand.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Source language of a file or entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Php,
    JavaScript,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Php => "php",
            Language::JavaScript => "javascript",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Path relative to the scanned root
    pub path: PathBuf,
    pub language: Language,
    /// Raw import/use/require statements, unresolved
    pub imports: Vec<Import>,
}

/// An import statement as written in the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    /// Module, namespace or path being imported
    pub module: String,
    /// Specific names imported (for `from x import y` and JS specifiers)
    pub names: Vec<ImportedName>,
    pub kind: ImportKind,
    pub line: usize,
}

impl Import {
    /// Create a simple `import x` style import
    pub fn simple(module: &str, line: usize) -> Self {
        Self {
            module: module.to_string(),
            names: Vec::new(),
            kind: ImportKind::Direct,
            line,
        }
    }

    /// Create a `from x import y` style import
    pub fn from_import(module: &str, names: Vec<ImportedName>, line: usize) -> Self {
        Self {
            module: module.to_string(),
            names,
            kind: ImportKind::From,
            line,
        }
    }

    /// Create a relative import
    pub fn relative(module: &str, names: Vec<ImportedName>, level: usize, line: usize) -> Self {
        Self {
            module: module.to_string(),
            names,
            kind: ImportKind::Relative { level },
            line,
        }
    }

    /// Create a file path import (`require`, `include`)
    pub fn path(path: &str, line: usize) -> Self {
        Self {
            module: path.to_string(),
            names: Vec::new(),
            kind: ImportKind::Path,
            line,
        }
    }
}

/// A single imported name with optional alias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportedName {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: None,
        }
    }

    pub fn with_alias(name: &str, alias: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: Some(alias.to_string()),
        }
    }

    /// Get the name as used in code (alias if present, otherwise original)
    pub fn used_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Kind of import statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// `import x`, PHP `use A\B`
    Direct,
    /// `from x import y`, JS `import { y } from "x"`
    From,
    /// `from . import y` or `from ..x import y`
    Relative { level: usize },
    /// PHP `require`/`include` of a literal path
    Path,
}

/// What a class-like declaration is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    Trait,
    Enum,
}

impl ClassKind {
    /// Mermaid annotation for non-plain classes
    pub fn annotation(&self) -> Option<&'static str> {
        match self {
            ClassKind::Class => None,
            ClassKind::Interface => Some("interface"),
            ClassKind::Trait => Some("trait"),
            ClassKind::Enum => Some("enumeration"),
        }
    }
}

/// Member visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    /// Parse a PHP/TS visibility keyword
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.trim().to_ascii_lowercase().as_str() {
            "public" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }

    /// Mermaid visibility marker
    pub fn symbol(&self) -> char {
        match self {
            Visibility::Public => '+',
            Visibility::Protected => '#',
            Visibility::Private => '-',
        }
    }
}

/// Whether an attribute belongs to instances or the class itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeScope {
    #[default]
    Instance,
    Static,
}

/// A function or method parameter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_hint: Option<String>,
    pub default: Option<String>,
}

impl Parameter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_hint: None,
            default: None,
        }
    }

    pub fn typed(name: &str, type_hint: &str) -> Self {
        Self {
            name: name.to_string(),
            type_hint: Some(type_hint.to_string()),
            default: None,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(t) = &self.type_hint {
            write!(f, ": {}", t)?;
        }
        if let Some(d) = &self.default {
            write!(f, " = {}", d)?;
        }
        Ok(())
    }
}

/// A free function or a method
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CodeFunction {
    pub name: String,
    pub docstring: Option<String>,
    /// Declared order, receiver already stripped
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    /// Declaring class, `None` for free functions
    pub class_name: Option<String>,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_async: bool,
    pub is_generator: bool,
    pub is_arrow: bool,
    /// Owning object literal for JS object methods
    pub object_name: Option<String>,
    /// Declaring PHP namespace of a free function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub decorators: Vec<String>,
    pub file_path: PathBuf,
    pub line: usize,
}

/// A field or property
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub type_hint: Option<String>,
    pub scope: AttributeScope,
    pub visibility: Visibility,
    pub line: usize,
}

/// A class constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub value: Option<String>,
    pub line: usize,
}

/// An enum case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    pub value: Option<String>,
}

/// Facts specific to some class kinds or languages
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassExtension {
    pub namespace: Option<String>,
    /// Interfaces named in an `implements` clause
    pub implements: Vec<String>,
    /// Traits pulled in with `use`
    pub uses: Vec<String>,
    pub constants: Vec<Constant>,
    pub enum_members: Vec<EnumMember>,
    pub is_abstract: bool,
}

/// A class, interface, trait or enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeClass {
    pub name: String,
    pub qualified_name: String,
    pub docstring: Option<String>,
    pub language: Language,
    pub file_path: PathBuf,
    pub line: usize,
    pub methods: Vec<CodeFunction>,
    pub attributes: Vec<Attribute>,
    /// Unresolved names, `extends` followed by `implements`
    pub base_classes: Vec<String>,
    pub kind: ClassKind,
    pub extension: ClassExtension,
}

impl CodeClass {
    pub fn new(name: &str, language: Language, file_path: PathBuf, line: usize) -> Self {
        Self {
            name: name.to_string(),
            qualified_name: name.to_string(),
            docstring: None,
            language,
            file_path,
            line,
            methods: Vec::new(),
            attributes: Vec::new(),
            base_classes: Vec::new(),
            kind: ClassKind::Class,
            extension: ClassExtension::default(),
        }
    }

    pub fn with_kind(mut self, kind: ClassKind) -> Self {
        self.kind = kind;
        self
    }
}

/// A unified entity produced by the adapter
#[derive(Debug, Clone, PartialEq)]
pub enum UnifiedEntity {
    Class(CodeClass),
    Function(CodeFunction),
}

/// Relationship kinds between classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Inheritance,
    Implementation,
    Composition,
    Aggregation,
    Dependency,
    TraitUsage,
}

impl RelationshipKind {
    /// Default edge label
    pub fn label(&self) -> &'static str {
        match self {
            RelationshipKind::Inheritance => "extends",
            RelationshipKind::Implementation => "implements",
            RelationshipKind::Composition => "contains",
            RelationshipKind::Aggregation => "has",
            RelationshipKind::Dependency => "uses",
            RelationshipKind::TraitUsage => "uses trait",
        }
    }

    /// Mermaid class-diagram arrow
    pub fn arrow(&self) -> &'static str {
        match self {
            RelationshipKind::Inheritance => "<|--",
            RelationshipKind::Implementation => "<|..",
            RelationshipKind::Composition => "*--",
            RelationshipKind::Aggregation => "o--",
            RelationshipKind::Dependency => "-->",
            RelationshipKind::TraitUsage => "..>",
        }
    }
}

/// A directed, typed fact between two classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub source: String,
    pub target: String,
    pub kind: RelationshipKind,
    pub label: String,
}

impl RelationshipEdge {
    pub fn new(source: &str, target: &str, kind: RelationshipKind) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            kind,
            label: kind.label().to_string(),
        }
    }
}

/// File-level dependency kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Import,
    Inherit,
    Uses,
}

/// A file-to-file dependency (paths relative to the scanned root)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
    pub kind: DependencyKind,
}

/// An explicitly declared module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Dotted module name
    pub name: String,
    pub path: Option<PathBuf>,
}

/// One step in an externally supplied interaction trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStep {
    #[serde(default = "default_flow_source")]
    pub source: String,
    #[serde(default = "default_flow_target")]
    pub target: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub response: Option<String>,
}

fn default_flow_source() -> String {
    "User".to_string()
}

fn default_flow_target() -> String {
    "System".to_string()
}

/// An ordered interaction trace used for sequence diagrams
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Flow {
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub steps: Vec<FlowStep>,
}

/// A file the scan could not use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// The complete structural model of a scanned tree
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectModel {
    pub classes: Vec<CodeClass>,
    pub functions: Vec<CodeFunction>,
    pub dependencies: Vec<DependencyEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<ModuleInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Vec<RelationshipEdge>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flows: Option<BTreeMap<String, Flow>>,
    #[serde(default)]
    pub units: Vec<SourceUnit>,
    #[serde(default)]
    pub parse_failures: Vec<ParseFailure>,
}

impl ProjectModel {
    /// Find a class by its bare name
    pub fn class(&self, name: &str) -> Option<&CodeClass> {
        self.classes.iter().find(|c| c.name == name)
    }
}

/// Strip namespace, module path and generic arguments from a type or class reference
pub fn bare_name(reference: &str) -> &str {
    let reference = reference.trim().trim_start_matches('?');
    let end = reference
        .find(|c: char| c == '<' || c == '[' || c == '(')
        .unwrap_or(reference.len());
    let head = &reference[..end];
    head.rsplit(|c| c == '\\' || c == '.' || c == ':')
        .next()
        .unwrap_or(head)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name() {
        assert_eq!(bare_name("BaseClass"), "BaseClass");
        assert_eq!(bare_name("models.base.BaseClass"), "BaseClass");
        assert_eq!(bare_name("App\\Models\\User"), "User");
        assert_eq!(bare_name("\\Countable"), "Countable");
        assert_eq!(bare_name("Generic[T]"), "Generic");
        assert_eq!(bare_name("Repository<User>"), "Repository");
        assert_eq!(bare_name("?Logger"), "Logger");
    }

    #[test]
    fn test_relationship_kind_rendering() {
        assert_eq!(RelationshipKind::Inheritance.arrow(), "<|--");
        assert_eq!(RelationshipKind::Composition.label(), "contains");
        assert_eq!(RelationshipKind::TraitUsage.arrow(), "..>");
    }

    #[test]
    fn test_visibility_from_keyword() {
        assert_eq!(Visibility::from_keyword("private"), Some(Visibility::Private));
        assert_eq!(Visibility::from_keyword("Protected"), Some(Visibility::Protected));
        assert_eq!(Visibility::from_keyword("static"), None);
        assert_eq!(Visibility::Protected.symbol(), '#');
    }

    #[test]
    fn test_flow_step_defaults() {
        let step: FlowStep = serde_json::from_str(r#"{"message": "login"}"#).unwrap();
        assert_eq!(step.source, "User");
        assert_eq!(step.target, "System");
        assert!(step.response.is_none());
    }

    #[test]
    fn test_parameter_display() {
        let mut param = Parameter::typed("limit", "int");
        param.default = Some("10".to_string());
        assert_eq!(param.to_string(), "limit: int = 10");
    }

    #[test]
    fn test_model_skips_absent_optionals() {
        let model = ProjectModel::default();
        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains("\"classes\""));
        assert!(!json.contains("\"relationships\""));
    }
}
