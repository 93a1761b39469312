// Wire contract of the external JS/TS parser
//
// The bundled script prints one JSON document per file. Every field is
// optional on the wire; absent values fall back to their defaults.

use crate::error::Result;
use crate::model::{Import, ImportKind, ImportedName};
use serde::{Deserialize, Serialize};

/// Farthest a block comment may end above a declaration and still document it
pub const DOC_COMMENT_MAX_DISTANCE: usize = 3;

/// Top-level document emitted for one file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsDocument {
    pub classes: Vec<JsClass>,
    pub functions: Vec<JsFunction>,
    pub imports: Vec<JsImport>,
    /// Kept opaque; only counted
    pub exports: Vec<serde_json::Value>,
    pub comments: Vec<JsComment>,
}

/// A class, TS interface or TS enum
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsClass {
    pub name: String,
    pub is_interface: bool,
    pub is_enum: bool,
    pub is_abstract: bool,
    pub super_class: Option<String>,
    pub implements: Vec<String>,
    /// Interface `extends` list
    pub extends: Vec<String>,
    pub methods: Vec<JsMethod>,
    pub properties: Vec<JsProperty>,
    pub enum_members: Vec<JsEnumMember>,
    pub decorators: Vec<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsMethod {
    pub name: String,
    /// `constructor`, `method`, `get` or `set`
    pub kind: String,
    pub is_static: bool,
    pub is_private: bool,
    pub is_abstract: bool,
    pub is_async: bool,
    pub is_generator: bool,
    pub parameters: Vec<JsParameter>,
    pub return_type: Option<String>,
    pub line: usize,
}

impl Default for JsMethod {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: "method".to_string(),
            is_static: false,
            is_private: false,
            is_abstract: false,
            is_async: false,
            is_generator: false,
            parameters: Vec::new(),
            return_type: None,
            line: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_hint: Option<String>,
    pub default: Option<String>,
    pub is_rest: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsProperty {
    pub name: String,
    pub is_static: bool,
    pub is_private: bool,
    pub is_readonly: bool,
    #[serde(rename = "type")]
    pub type_hint: Option<String>,
    pub value: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JsEnumMember {
    pub name: String,
    pub value: Option<String>,
}

/// A free function, arrow function or object-literal method
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsFunction {
    pub name: String,
    pub is_async: bool,
    pub is_generator: bool,
    pub is_arrow: bool,
    pub is_object_method: bool,
    pub object_name: Option<String>,
    pub parameters: Vec<JsParameter>,
    pub return_type: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JsImport {
    pub source: String,
    pub line: usize,
    pub specifiers: Vec<JsImportSpecifier>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JsImportSpecifier {
    /// `default`, `namespace` or `named`
    pub kind: String,
    pub local: String,
    pub imported: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsCommentKind {
    #[default]
    Block,
    Line,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsComment {
    pub kind: JsCommentKind,
    /// Comment text without the `/*` and `*/` delimiters
    pub value: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl JsDocument {
    /// Decode the parser's standard output
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Cleaned text of the nearest block comment ending at most
    /// `DOC_COMMENT_MAX_DISTANCE` lines above `line`
    pub fn doc_comment_for(&self, line: usize) -> Option<String> {
        let mut closest: Option<(usize, &JsComment)> = None;

        for comment in &self.comments {
            if comment.kind != JsCommentKind::Block || comment.end_line >= line {
                continue;
            }
            let distance = line - comment.end_line;
            if distance > DOC_COMMENT_MAX_DISTANCE {
                continue;
            }
            if closest.map_or(true, |(best, _)| distance < best) {
                closest = Some((distance, comment));
            }
        }

        closest
            .map(|(_, c)| clean_jsdoc(&c.value))
            .filter(|doc| !doc.is_empty())
    }

    /// Imports in the shared model shape
    pub fn model_imports(&self) -> Vec<Import> {
        self.imports
            .iter()
            .filter(|i| !i.source.is_empty())
            .map(|i| {
                let names: Vec<ImportedName> = i
                    .specifiers
                    .iter()
                    .map(|s| {
                        let imported = match s.kind.as_str() {
                            "default" => "default",
                            "namespace" => "*",
                            _ => s.imported.as_deref().unwrap_or(&s.local),
                        };
                        if imported == s.local {
                            ImportedName::new(imported)
                        } else {
                            ImportedName::with_alias(imported, &s.local)
                        }
                    })
                    .collect();
                let kind = if names.is_empty() {
                    ImportKind::Direct
                } else {
                    ImportKind::From
                };
                Import {
                    module: i.source.clone(),
                    names,
                    kind,
                    line: i.line,
                }
            })
            .collect()
    }
}

/// Strip comment markers, leading asterisks and `@tag` lines from a
/// JSDoc body
pub fn clean_jsdoc(comment: &str) -> String {
    comment
        .trim()
        .trim_start_matches("/**")
        .trim_start_matches("/*")
        .trim_end_matches("*/")
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .filter(|line| !line.is_empty() && !line.starts_with('@'))
        .collect::<Vec<_>>()
        .join(" ")
}
