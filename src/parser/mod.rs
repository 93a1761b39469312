// Language front-ends: one file of native syntax in, one fragment out

pub mod ast;
mod javascript;
pub mod js_document;
mod php;
mod python;

pub use ast::*;
pub use javascript::{JavaScriptParser, JsToolchain};
pub use php::PhpParser;
pub use python::PythonParser;

use crate::error::Result;
use crate::model::Language;
use std::path::Path;

/// Result of parsing one file. A failure carries the reason and never
/// aborts the surrounding scan.
pub type ParseOutcome = Result<SyntaxFragment>;

/// A per-language parser for single files
pub trait Frontend {
    fn language(&self) -> Language;

    /// Parse one file from disk
    fn parse(&mut self, path: &Path) -> ParseOutcome;
}

/// Read a source file, tolerating invalid UTF-8 sequences
pub(crate) fn read_source(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
