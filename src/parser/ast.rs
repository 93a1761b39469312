// Language-native syntax fragments
//
// Each front-end produces one of these per file. They keep the shape of the
// source grammar; mapping onto the shared model happens in the unification
// adapter.

use crate::model::{Import, Language};
use crate::parser::js_document::JsDocument;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The closed set of per-language fragments
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxFragment {
    Python(PyModule),
    Php(PhpFile),
    Js(JsFile),
}

impl SyntaxFragment {
    pub fn language(&self) -> Language {
        match self {
            SyntaxFragment::Python(_) => Language::Python,
            SyntaxFragment::Php(_) => Language::Php,
            SyntaxFragment::Js(_) => Language::JavaScript,
        }
    }

    pub fn imports(&self) -> &[Import] {
        match self {
            SyntaxFragment::Python(m) => &m.imports,
            SyntaxFragment::Php(f) => &f.imports,
            SyntaxFragment::Js(f) => &f.imports,
        }
    }
}

// ---------------------------------------------------------------------------
// Python
// ---------------------------------------------------------------------------

/// A parsed Python module
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PyModule {
    pub path: PathBuf,
    pub docstring: Option<String>,
    pub imports: Vec<Import>,
    /// Module-scope classes only
    pub classes: Vec<PyClass>,
    /// Module-scope functions only
    pub functions: Vec<PyFunction>,
}

/// A module-scope class definition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PyClass {
    pub name: String,
    pub docstring: Option<String>,
    /// Dotted base references as written
    pub bases: Vec<String>,
    pub decorators: Vec<String>,
    pub methods: Vec<PyFunction>,
    /// Direct class-body assignments
    pub class_attributes: Vec<PyAssignment>,
    /// Receiver assignments inside `__init__`
    pub instance_attributes: Vec<PyAssignment>,
    pub line: usize,
}

/// An assignment target with its optional annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PyAssignment {
    pub name: String,
    pub annotation: Option<String>,
    /// False for bare annotations such as `x: int`
    pub has_value: bool,
    pub line: usize,
}

/// A `def` at module or class scope
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PyFunction {
    pub name: String,
    pub docstring: Option<String>,
    /// All declared parameters, receiver included
    pub parameters: Vec<PyParameter>,
    pub return_type: Option<String>,
    pub decorators: Vec<String>,
    pub is_async: bool,
    pub is_generator: bool,
    pub line: usize,
}

impl PyFunction {
    /// Check whether a decorator with this final dotted segment is present
    pub fn has_decorator(&self, name: &str) -> bool {
        self.decorators
            .iter()
            .any(|d| d == name || d.rsplit('.').next() == Some(name))
    }
}

/// Python parameter flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PyParameterKind {
    #[default]
    Regular,
    /// `*args`
    Args,
    /// `**kwargs`
    Kwargs,
}

/// A declared Python parameter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PyParameter {
    pub name: String,
    pub annotation: Option<String>,
    pub default: Option<String>,
    pub kind: PyParameterKind,
}

impl PyParameter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// PHP
// ---------------------------------------------------------------------------

/// A parsed PHP file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PhpFile {
    pub path: PathBuf,
    pub imports: Vec<Import>,
    pub declarations: Vec<PhpDeclaration>,
    pub functions: Vec<PhpFunction>,
}

/// Kind keyword used to declare a PHP type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PhpDeclarationKind {
    #[default]
    Class,
    Interface,
    Trait,
    Enum,
}

/// A class, interface, trait or enum declaration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PhpDeclaration {
    pub kind: PhpDeclarationKind,
    pub name: String,
    pub namespace: Option<String>,
    pub docblock: Option<String>,
    pub extends: Vec<String>,
    pub implements: Vec<String>,
    pub traits: Vec<String>,
    pub methods: Vec<PhpFunction>,
    pub properties: Vec<PhpProperty>,
    pub constants: Vec<PhpConstant>,
    pub cases: Vec<PhpEnumCase>,
    pub is_abstract: bool,
    pub is_final: bool,
    pub line: usize,
}

impl PhpDeclaration {
    /// `namespace\name`, or the bare name outside a namespace
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => format!("{}\\{}", ns, self.name),
            _ => self.name.clone(),
        }
    }
}

/// A method or free function
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PhpFunction {
    pub name: String,
    pub namespace: Option<String>,
    pub docblock: Option<String>,
    pub visibility: Option<String>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub parameters: Vec<PhpParameter>,
    pub return_type: Option<String>,
    pub line: usize,
}

/// A formal parameter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PhpParameter {
    /// Without the leading `$`
    pub name: String,
    pub type_hint: Option<String>,
    pub default: Option<String>,
    pub variadic: bool,
    /// Visibility keyword of a promoted constructor parameter
    pub promoted: Option<String>,
}

/// A property declaration element
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PhpProperty {
    pub name: String,
    pub type_hint: Option<String>,
    pub visibility: Option<String>,
    pub is_static: bool,
    pub default: Option<String>,
    pub line: usize,
}

/// A class constant
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PhpConstant {
    pub name: String,
    pub value: Option<String>,
    pub line: usize,
}

/// An enum `case`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PhpEnumCase {
    pub name: String,
    pub value: Option<String>,
}

// ---------------------------------------------------------------------------
// JavaScript / TypeScript
// ---------------------------------------------------------------------------

/// A JS/TS file as reported by the external parser
#[derive(Debug, Clone, PartialEq)]
pub struct JsFile {
    pub path: PathBuf,
    pub is_typescript: bool,
    pub document: JsDocument,
    /// Imports lifted out of the document
    pub imports: Vec<Import>,
}
