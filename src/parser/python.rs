// Python front-end using tree-sitter

use crate::error::{Error, Result};
use crate::model::{Import, ImportKind, ImportedName, Language};
use crate::parser::ast::*;
use crate::parser::{read_source, Frontend, ParseOutcome};
use std::path::Path;
use tree_sitter::{Node, Parser};

/// Parser for Python source files
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    /// Create a new Python parser
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::LANGUAGE.into();
        parser
            .set_language(&language)
            .map_err(|e| Error::backend(format!("Failed to set Python language: {}", e)))?;
        Ok(Self { parser })
    }

    /// Parse Python source code
    pub fn parse_source(&mut self, source: &str, path: &Path) -> Result<PyModule> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| Error::parse(path, "tree-sitter returned no tree"))?;

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error_line(&root).unwrap_or(1);
            return Err(Error::parse(path, format!("syntax error near line {}", line)));
        }

        let src = source.as_bytes();
        let mut module = PyModule {
            path: path.to_path_buf(),
            docstring: block_docstring(&root, src),
            ..PyModule::default()
        };

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "import_statement" => {
                    module.imports.extend(parse_import(&child, src));
                }
                "import_from_statement" => {
                    if let Some(import) = parse_import_from(&child, src) {
                        module.imports.push(import);
                    }
                }
                "class_definition" => {
                    if let Some(class) = parse_class(&child, src, Vec::new()) {
                        module.classes.push(class);
                    }
                }
                "function_definition" => {
                    if let Some(func) = parse_function(&child, src, Vec::new()) {
                        module.functions.push(func);
                    }
                }
                "decorated_definition" => {
                    let decorators = extract_decorators(&child, src);
                    if let Some(def) = child.child_by_field_name("definition") {
                        match def.kind() {
                            "class_definition" => {
                                if let Some(class) = parse_class(&def, src, decorators) {
                                    module.classes.push(class);
                                }
                            }
                            "function_definition" => {
                                if let Some(func) = parse_function(&def, src, decorators) {
                                    module.functions.push(func);
                                }
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(module)
    }
}

impl Frontend for PythonParser {
    fn language(&self) -> Language {
        Language::Python
    }

    fn parse(&mut self, path: &Path) -> ParseOutcome {
        let source = read_source(path)?;
        self.parse_source(&source, path).map(SyntaxFragment::Python)
    }
}

fn text<'a>(node: &Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn line_of(node: &Node) -> usize {
    node.start_position().row + 1
}

fn first_error_line(node: &Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(line_of(node));
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            if let Some(line) = first_error_line(&child) {
                return Some(line);
            }
        }
    }
    None
}

/// Docstring of a module or block: a leading bare string statement
fn block_docstring(block: &Node, source: &[u8]) -> Option<String> {
    let mut cursor = block.walk();
    let first = block
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.named_child(0)?;
    if expr.kind() != "string" {
        return None;
    }
    let doc = clean_docstring(&string_literal_content(text(&expr, source)));
    if doc.is_empty() {
        None
    } else {
        Some(doc)
    }
}

/// Strip prefix letters and quotes from a string literal
fn string_literal_content(literal: &str) -> String {
    let body = literal.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= quote.len() * 2 && body.starts_with(quote) && body.ends_with(quote) {
            return body[quote.len()..body.len() - quote.len()].to_string();
        }
    }
    body.to_string()
}

/// Dedent a docstring the way `inspect.cleandoc` does
pub(crate) fn clean_docstring(raw: &str) -> String {
    let expanded = raw.replace('\t', "        ");
    let lines: Vec<&str> = expanded.lines().collect();
    if lines.is_empty() {
        return String::new();
    }

    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<String> = Vec::with_capacity(lines.len());
    cleaned.push(lines[0].trim().to_string());
    for line in lines.iter().skip(1) {
        cleaned.push(strip_margin(line, margin).trim_end().to_string());
    }

    while cleaned.first().is_some_and(|l| l.is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|l| l.is_empty()) {
        cleaned.pop();
    }
    cleaned.join("\n")
}

/// Drop up to `margin` leading whitespace chars
fn strip_margin(line: &str, margin: usize) -> &str {
    match line
        .char_indices()
        .take_while(|(_, c)| c.is_whitespace())
        .nth(margin)
    {
        Some((offset, _)) => &line[offset..],
        None => line.trim_start(),
    }
}

/// Parse `import x`, `import x as y`, `import a, b`
fn parse_import(node: &Node, source: &[u8]) -> Vec<Import> {
    let line = line_of(node);
    let mut imports = Vec::new();

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "dotted_name" => {
                let module = text(&child, source);
                let mut import = Import::simple(module, line);
                import.names.push(ImportedName::new(module));
                imports.push(import);
            }
            "aliased_import" => {
                let name = child
                    .child_by_field_name("name")
                    .map(|n| text(&n, source))
                    .unwrap_or("");
                if name.is_empty() {
                    continue;
                }
                let mut import = Import::simple(name, line);
                match child.child_by_field_name("alias") {
                    Some(alias) => import
                        .names
                        .push(ImportedName::with_alias(name, text(&alias, source))),
                    None => import.names.push(ImportedName::new(name)),
                }
                imports.push(import);
            }
            _ => {}
        }
    }

    imports
}

/// Parse `from x import y`, including relative forms
fn parse_import_from(node: &Node, source: &[u8]) -> Option<Import> {
    let line = line_of(node);
    let mut module = String::new();
    let mut names = Vec::new();
    let mut relative_level = 0;
    let mut seen_import_keyword = false;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "relative_import" => {
                let mut inner_cursor = child.walk();
                for inner in child.children(&mut inner_cursor) {
                    match inner.kind() {
                        "import_prefix" => {
                            relative_level = text(&inner, source).chars().filter(|c| *c == '.').count();
                        }
                        "dotted_name" => {
                            module = text(&inner, source).to_string();
                        }
                        _ => {}
                    }
                }
            }
            "dotted_name" => {
                let name = text(&child, source);
                if !seen_import_keyword {
                    module = name.to_string();
                } else {
                    names.push(ImportedName::new(name));
                }
            }
            "import" => {
                seen_import_keyword = true;
            }
            "wildcard_import" => {
                names.push(ImportedName::new("*"));
            }
            "aliased_import" => {
                let name = child.child_by_field_name("name").map(|n| text(&n, source));
                let alias = child.child_by_field_name("alias").map(|n| text(&n, source));
                match (name, alias) {
                    (Some(n), Some(a)) => names.push(ImportedName::with_alias(n, a)),
                    (Some(n), None) => names.push(ImportedName::new(n)),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    if module.is_empty() && relative_level == 0 {
        return None;
    }

    let kind = if relative_level > 0 {
        ImportKind::Relative {
            level: relative_level,
        }
    } else {
        ImportKind::From
    };

    Some(Import {
        module,
        names,
        kind,
        line,
    })
}

/// Parse a class definition at module scope
fn parse_class(node: &Node, source: &[u8], decorators: Vec<String>) -> Option<PyClass> {
    let name = node.child_by_field_name("name").map(|n| text(&n, source))?;
    if name.is_empty() {
        return None;
    }

    let mut class = PyClass {
        name: name.to_string(),
        decorators,
        line: line_of(node),
        ..PyClass::default()
    };

    if let Some(args) = node.child_by_field_name("superclasses") {
        class.bases = extract_bases(&args, source);
    }

    if let Some(body) = node.child_by_field_name("body") {
        class.docstring = block_docstring(&body, source);
        parse_class_body(&body, source, &mut class);
    }

    Some(class)
}

/// Base class references reconstructed as dotted chains
fn extract_bases(node: &Node, source: &[u8]) -> Vec<String> {
    let mut bases = Vec::new();
    let mut cursor = node.walk();

    for child in node.named_children(&mut cursor) {
        let reference = match child.kind() {
            "identifier" | "attribute" => Some(child),
            // Generic[T], typing.Generic[T]
            "subscript" => child.child_by_field_name("value"),
            _ => None,
        };
        if let Some(reference) = reference {
            let dotted: String = text(&reference, source)
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            if !dotted.is_empty() {
                bases.push(dotted);
            }
        }
    }

    bases
}

/// Collect methods and attributes from the class block
fn parse_class_body(body: &Node, source: &[u8], class: &mut PyClass) {
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        match child.kind() {
            "expression_statement" => {
                if let Some(assignment) = child.named_child(0).filter(|n| n.kind() == "assignment") {
                    for attr in class_assignment_targets(&assignment, source) {
                        push_unique(&mut class.class_attributes, attr);
                    }
                }
            }
            "function_definition" => {
                add_method(&child, source, Vec::new(), class);
            }
            "decorated_definition" => {
                let decorators = extract_decorators(&child, source);
                if let Some(def) = child
                    .child_by_field_name("definition")
                    .filter(|d| d.kind() == "function_definition")
                {
                    add_method(&def, source, decorators, class);
                }
            }
            _ => {}
        }
    }
}

fn add_method(node: &Node, source: &[u8], decorators: Vec<String>, class: &mut PyClass) {
    let Some(method) = parse_function(node, source, decorators) else {
        return;
    };

    if method.name == "__init__" {
        if let (Some(receiver), Some(body)) = (
            method.parameters.first().map(|p| p.name.clone()),
            node.child_by_field_name("body"),
        ) {
            let mut found = Vec::new();
            collect_receiver_assignments(&body, &receiver, source, &mut found);
            for attr in found {
                push_unique(&mut class.instance_attributes, attr);
            }
        }
    }

    class.methods.push(method);
}

fn push_unique(attrs: &mut Vec<PyAssignment>, attr: PyAssignment) {
    if !attrs.iter().any(|a| a.name == attr.name) {
        attrs.push(attr);
    }
}

/// `x = 1`, `x: int = 1`, `x: int`, `a = b = 1`
fn class_assignment_targets(assignment: &Node, source: &[u8]) -> Vec<PyAssignment> {
    let mut targets = Vec::new();
    let mut current = Some(*assignment);

    while let Some(node) = current {
        if node.kind() != "assignment" {
            break;
        }
        if let Some(left) = node.child_by_field_name("left") {
            if left.kind() == "identifier" {
                targets.push(PyAssignment {
                    name: text(&left, source).to_string(),
                    annotation: node.child_by_field_name("type").map(|t| text(&t, source).to_string()),
                    has_value: node.child_by_field_name("right").is_some(),
                    line: line_of(&node),
                });
            }
        }
        current = node.child_by_field_name("right");
    }

    targets
}

/// Walk the constructor body for `<receiver>.name = ...` assignments,
/// skipping nested scopes.
fn collect_receiver_assignments(
    node: &Node,
    receiver: &str,
    source: &[u8],
    out: &mut Vec<PyAssignment>,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "function_definition" | "class_definition" | "lambda" | "decorated_definition" => {}
            "assignment" => {
                if let Some(left) = child.child_by_field_name("left") {
                    let annotation = child
                        .child_by_field_name("type")
                        .map(|t| text(&t, source).to_string());
                    for target in receiver_targets(&left, receiver, source) {
                        out.push(PyAssignment {
                            name: target,
                            annotation: annotation.clone(),
                            has_value: child.child_by_field_name("right").is_some(),
                            line: line_of(&child),
                        });
                    }
                }
                collect_receiver_assignments(&child, receiver, source, out);
            }
            _ => collect_receiver_assignments(&child, receiver, source, out),
        }
    }
}

fn receiver_targets(left: &Node, receiver: &str, source: &[u8]) -> Vec<String> {
    match left.kind() {
        "attribute" => {
            let object = left.child_by_field_name("object");
            let attribute = left.child_by_field_name("attribute");
            match (object, attribute) {
                (Some(obj), Some(attr)) if obj.kind() == "identifier" && text(&obj, source) == receiver => {
                    vec![text(&attr, source).to_string()]
                }
                _ => Vec::new(),
            }
        }
        "pattern_list" | "tuple_pattern" | "list_pattern" => {
            let mut names = Vec::new();
            let mut cursor = left.walk();
            for item in left.named_children(&mut cursor) {
                names.extend(receiver_targets(&item, receiver, source));
            }
            names
        }
        _ => Vec::new(),
    }
}

/// Parse a function definition node
fn parse_function(node: &Node, source: &[u8], decorators: Vec<String>) -> Option<PyFunction> {
    let name = node.child_by_field_name("name").map(|n| text(&n, source))?;
    if name.is_empty() {
        return None;
    }

    let mut func = PyFunction {
        name: name.to_string(),
        decorators,
        is_async: has_async_keyword(node),
        line: line_of(node),
        ..PyFunction::default()
    };

    if let Some(params) = node.child_by_field_name("parameters") {
        func.parameters = parse_parameters(&params, source);
    }
    if let Some(ret) = node.child_by_field_name("return_type") {
        func.return_type = Some(text(&ret, source).to_string());
    }
    if let Some(body) = node.child_by_field_name("body") {
        func.docstring = block_docstring(&body, source);
        func.is_generator = contains_yield(&body);
    }

    Some(func)
}

/// Check if a function_definition node has an async keyword
fn has_async_keyword(node: &Node) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == "async");
    found
}

fn contains_yield(node: &Node) -> bool {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "yield" => return true,
            "function_definition" | "class_definition" | "lambda" | "decorated_definition" => {}
            _ => {
                if contains_yield(&child) {
                    return true;
                }
            }
        }
    }
    false
}

/// Decorator names without `@` or call arguments
fn extract_decorators(node: &Node, source: &[u8]) -> Vec<String> {
    let mut decorators = Vec::new();
    let mut cursor = node.walk();

    for child in node.named_children(&mut cursor) {
        if child.kind() == "decorator" {
            let dec = text(&child, source).trim_start_matches('@');
            let dec = match dec.find('(') {
                Some(idx) => &dec[..idx],
                None => dec,
            };
            decorators.push(dec.trim().to_string());
        }
    }

    decorators
}

/// Parse function parameters in declared order
fn parse_parameters(node: &Node, source: &[u8]) -> Vec<PyParameter> {
    let mut params = Vec::new();
    let mut cursor = node.walk();

    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => {
                params.push(PyParameter::new(text(&child, source)));
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                if let Some(param) = splat_parameter(&child, source) {
                    params.push(param);
                }
            }
            "typed_parameter" => {
                let annotation = child
                    .child_by_field_name("type")
                    .map(|t| text(&t, source).to_string());
                let mut inner_cursor = child.walk();
                let target = child
                    .named_children(&mut inner_cursor)
                    .find(|n| n.kind() != "type");
                let param = match target {
                    Some(t) if t.kind() == "identifier" => Some(PyParameter::new(text(&t, source))),
                    Some(t) => splat_parameter(&t, source),
                    None => None,
                };
                if let Some(mut param) = param {
                    param.annotation = annotation;
                    params.push(param);
                }
            }
            "default_parameter" | "typed_default_parameter" => {
                let Some(name) = child.child_by_field_name("name") else {
                    continue;
                };
                let mut param = PyParameter::new(text(&name, source));
                param.annotation = child
                    .child_by_field_name("type")
                    .map(|t| text(&t, source).to_string());
                param.default = child
                    .child_by_field_name("value")
                    .map(|v| text(&v, source).to_string());
                params.push(param);
            }
            _ => {}
        }
    }

    params
}

fn splat_parameter(node: &Node, source: &[u8]) -> Option<PyParameter> {
    let mut cursor = node.walk();
    let ident = node
        .named_children(&mut cursor)
        .find(|n| n.kind() == "identifier")?;
    let mut param = PyParameter::new(text(&ident, source));
    param.kind = if node.kind() == "list_splat_pattern" {
        PyParameterKind::Args
    } else {
        PyParameterKind::Kwargs
    };
    Some(param)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> PyModule {
        let mut parser = PythonParser::new().unwrap();
        parser.parse_source(source, Path::new("test.py")).unwrap()
    }

    #[test]
    fn test_parser_new() {
        assert!(PythonParser::new().is_ok());
    }

    #[test]
    fn test_empty_file() {
        let module = parse("");
        assert!(module.classes.is_empty());
        assert!(module.functions.is_empty());
    }

    #[test]
    fn test_syntax_error_is_failure() {
        let mut parser = PythonParser::new().unwrap();
        let result = parser.parse_source("class Broken(:\n    pass\n", Path::new("broken.py"));
        assert!(matches!(result, Err(Error::Parse { .. })));
    }

    #[test]
    fn test_module_docstring() {
        let module = parse("\"\"\"Module docstring.\"\"\"\n");
        assert_eq!(module.docstring, Some("Module docstring.".to_string()));
    }

    #[test]
    fn test_simple_import() {
        let module = parse("import os");
        assert_eq!(module.imports.len(), 1);
        assert_eq!(module.imports[0].module, "os");
        assert_eq!(module.imports[0].kind, ImportKind::Direct);
    }

    #[test]
    fn test_import_with_alias() {
        let module = parse("import numpy as np");
        assert_eq!(module.imports.len(), 1);
        assert_eq!(module.imports[0].names[0].used_name(), "np");
    }

    #[test]
    fn test_multiple_direct_imports() {
        let module = parse("import os, sys");
        let modules: Vec<_> = module.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(modules, vec!["os", "sys"]);
    }

    #[test]
    fn test_from_import() {
        let module = parse("from base import BaseClass");
        assert_eq!(module.imports.len(), 1);
        assert_eq!(module.imports[0].module, "base");
        assert_eq!(module.imports[0].kind, ImportKind::From);
        assert_eq!(module.imports[0].names[0].name, "BaseClass");
    }

    #[test]
    fn test_relative_import() {
        let module = parse("from ..utils import helper");
        assert_eq!(module.imports.len(), 1);
        assert_eq!(module.imports[0].kind, ImportKind::Relative { level: 2 });
        assert_eq!(module.imports[0].module, "utils");
    }

    #[test]
    fn test_function_with_params() {
        let module = parse("def greet(name: str, age: int = 0, *args, **kwargs) -> str:\n    pass\n");
        let func = &module.functions[0];
        assert_eq!(func.name, "greet");
        let names: Vec<_> = func.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "age", "args", "kwargs"]);
        assert_eq!(func.parameters[0].annotation, Some("str".to_string()));
        assert_eq!(func.parameters[1].default, Some("0".to_string()));
        assert_eq!(func.parameters[2].kind, PyParameterKind::Args);
        assert_eq!(func.parameters[3].kind, PyParameterKind::Kwargs);
        assert_eq!(func.return_type, Some("str".to_string()));
    }

    #[test]
    fn test_async_and_generator() {
        let module = parse("async def fetch(url):\n    pass\n\ndef numbers():\n    yield 1\n");
        assert!(module.functions[0].is_async);
        assert!(!module.functions[0].is_generator);
        assert!(module.functions[1].is_generator);
    }

    #[test]
    fn test_nested_yield_does_not_mark_outer() {
        let module = parse("def outer():\n    def inner():\n        yield 1\n    return inner\n");
        assert!(!module.functions[0].is_generator);
    }

    #[test]
    fn test_class_with_bases() {
        let module = parse("class ChildClass(BaseClass, pkg.Mixin, Generic[T], metaclass=Meta):\n    pass\n");
        assert_eq!(module.classes.len(), 1);
        assert_eq!(module.classes[0].bases, vec!["BaseClass", "pkg.Mixin", "Generic"]);
    }

    #[test]
    fn test_nested_classes_not_cataloged() {
        let module = parse("class Outer:\n    class Inner:\n        pass\n\ndef f():\n    class Local:\n        pass\n");
        assert_eq!(module.classes.len(), 1);
        assert_eq!(module.classes[0].name, "Outer");
    }

    #[test]
    fn test_class_attributes_and_instance_attributes() {
        let source = r#"
class Order:
    """An order."""
    TAX_RATE = 0.2
    items: list

    def __init__(self, customer: "Customer"):
        self.customer: Customer = customer
        self.total = 0
        if customer:
            self.note = None
        def helper():
            self.hidden = 1

    def add(self, item):
        self.later = item
"#;
        let module = parse(source);
        let class = &module.classes[0];
        assert_eq!(class.docstring, Some("An order.".to_string()));

        let class_attrs: Vec<_> = class.class_attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(class_attrs, vec!["TAX_RATE", "items"]);
        assert_eq!(class.class_attributes[1].annotation, Some("list".to_string()));
        assert!(class.class_attributes[0].has_value);
        assert!(!class.class_attributes[1].has_value);

        let instance: Vec<_> = class.instance_attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(instance, vec!["customer", "total", "note"]);
        assert_eq!(class.instance_attributes[0].annotation, Some("Customer".to_string()));
    }

    #[test]
    fn test_decorated_methods() {
        let source = "class A:\n    @staticmethod\n    def make():\n        pass\n\n    @abc.abstractmethod\n    def run(self):\n        pass\n";
        let module = parse(source);
        let methods = &module.classes[0].methods;
        assert_eq!(methods.len(), 2);
        assert!(methods[0].has_decorator("staticmethod"));
        assert!(methods[1].has_decorator("abstractmethod"));
    }

    #[test]
    fn test_clean_docstring_dedents() {
        let raw = "Summary line.\n\n        Details here.\n          Indented more.\n    ";
        assert_eq!(
            clean_docstring(raw),
            "Summary line.\n\nDetails here.\n  Indented more."
        );
    }

    #[test]
    fn test_clean_docstring_multibyte_indent() {
        let raw = "Summary.\n\n    body\n   \u{a0}more\n  \u{3000}  deeper\n    ";
        assert_eq!(clean_docstring(raw), "Summary.\n\nbody\nmore\n deeper");

        let module = parse("def f():\n    \"\"\"Summary.\n\n    body\n   \u{a0}more\n    \"\"\"\n    pass\n");
        assert_eq!(module.functions[0].docstring.as_deref(), Some("Summary.\n\nbody\nmore"));
    }

    #[test]
    fn test_string_literal_prefixes() {
        assert_eq!(string_literal_content("r\"\"\"raw\"\"\""), "raw");
        assert_eq!(string_literal_content("'single'"), "single");
    }
}
