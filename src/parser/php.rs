// PHP front-end using tree-sitter

use crate::error::{Error, Result};
use crate::model::{Import, ImportedName, Language};
use crate::parser::ast::*;
use crate::parser::{read_source, Frontend, ParseOutcome};
use std::path::Path;
use tree_sitter::{Node, Parser};

/// Parser for PHP source files
pub struct PhpParser {
    parser: Parser,
}

impl PhpParser {
    /// Create a new PHP parser
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_php::LANGUAGE_PHP.into();
        parser
            .set_language(&language)
            .map_err(|e| Error::backend(format!("Failed to set PHP language: {}", e)))?;
        Ok(Self { parser })
    }

    /// Parse PHP source code
    pub fn parse_source(&mut self, source: &str, path: &Path) -> Result<PhpFile> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| Error::parse(path, "tree-sitter returned no tree"))?;

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error_line(&root).unwrap_or(1);
            return Err(Error::parse(path, format!("syntax error near line {}", line)));
        }

        let mut file = PhpFile {
            path: path.to_path_buf(),
            ..PhpFile::default()
        };

        let mut walker = Walker {
            source: source.as_bytes(),
            namespace: None,
            file: &mut file,
        };
        walker.visit_statements(&root);
        collect_path_imports(&root, source.as_bytes(), &mut file.imports);

        Ok(file)
    }
}

impl Frontend for PhpParser {
    fn language(&self) -> Language {
        Language::Php
    }

    fn parse(&mut self, path: &Path) -> ParseOutcome {
        let source = read_source(path)?;
        self.parse_source(&source, path).map(SyntaxFragment::Php)
    }
}

/// Statement-level traversal carrying the active namespace
struct Walker<'a, 'f> {
    source: &'a [u8],
    namespace: Option<String>,
    file: &'f mut PhpFile,
}

impl Walker<'_, '_> {
    fn visit_statements(&mut self, parent: &Node) {
        let mut cursor = parent.walk();
        for child in parent.named_children(&mut cursor) {
            match child.kind() {
                "namespace_definition" => self.visit_namespace(&child),
                "namespace_use_declaration" => {
                    let imports = parse_use_declaration(&child, self.source);
                    self.file.imports.extend(imports);
                }
                "class_declaration" => self.visit_declaration(&child, PhpDeclarationKind::Class),
                "interface_declaration" => {
                    self.visit_declaration(&child, PhpDeclarationKind::Interface)
                }
                "trait_declaration" => self.visit_declaration(&child, PhpDeclarationKind::Trait),
                "enum_declaration" => self.visit_declaration(&child, PhpDeclarationKind::Enum),
                "function_definition" => {
                    if let Some(mut func) = parse_function_like(&child, self.source) {
                        func.namespace = self.namespace.clone();
                        self.file.functions.push(func);
                    }
                }
                _ => {}
            }
        }
    }

    /// `namespace X;` applies to following siblings, `namespace X { }` to its body
    fn visit_namespace(&mut self, node: &Node) {
        let name = node
            .child_by_field_name("name")
            .map(|n| text(&n, self.source).trim_start_matches('\\').to_string())
            .filter(|n| !n.is_empty());

        match node.child_by_field_name("body") {
            Some(body) => {
                let previous = std::mem::replace(&mut self.namespace, name);
                self.visit_statements(&body);
                self.namespace = previous;
            }
            None => self.namespace = name,
        }
    }

    fn visit_declaration(&mut self, node: &Node, kind: PhpDeclarationKind) {
        if let Some(mut decl) = parse_declaration(node, kind, self.source) {
            decl.namespace = self.namespace.clone();
            self.file.declarations.push(decl);
        }
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

fn is_name(node: &Node) -> bool {
    matches!(node.kind(), "name" | "qualified_name" | "namespace_name")
}

fn names_in(node: &Node, source: &[u8]) -> Vec<String> {
    let mut cursor = node.walk();
    let names: Vec<String> = node
        .named_children(&mut cursor)
        .filter(is_name)
        .map(|n| text(&n, source).to_string())
        .collect();
    names
}

fn has_child_kind(node: &Node, kind: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == kind);
    found
}

fn type_text(node: &Node, source: &[u8]) -> Option<String> {
    let ty = node.child_by_field_name("type").or_else(|| {
        let mut cursor = node.walk();
        let found = node
            .named_children(&mut cursor)
            .find(|c| c.kind().ends_with("_type"));
        found
    })?;
    let hint = text(&ty, source).trim();
    if hint.is_empty() {
        None
    } else {
        Some(hint.to_string())
    }
}

/// Nearest preceding `/** */` comment, cleaned of markers
fn docblock(node: &Node, source: &[u8]) -> Option<String> {
    let prev = node.prev_named_sibling()?;
    if prev.kind() != "comment" {
        return None;
    }
    let raw = text(&prev, source);
    if !raw.starts_with("/**") {
        return None;
    }
    let doc = clean_docblock(raw);
    if doc.is_empty() {
        None
    } else {
        Some(doc)
    }
}

/// Strip `/**`, `*/` and the leading asterisk of each line
pub(crate) fn clean_docblock(raw: &str) -> String {
    let body = raw
        .trim()
        .trim_start_matches('/')
        .trim_start_matches('*')
        .trim_end_matches('/')
        .trim_end_matches('*');

    body.lines()
        .map(|line| {
            let line = line.trim_start();
            let line = line.strip_prefix('*').unwrap_or(line);
            line.strip_prefix(' ').unwrap_or(line).trim_end()
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// `use A\B;`, `use A\B as C;`, `use A\{B, C as D};`
fn parse_use_declaration(node: &Node, source: &[u8]) -> Vec<Import> {
    let line = line_of(node);
    let mut imports = Vec::new();
    let mut prefix: Option<String> = None;

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "namespace_name" | "qualified_name" | "name" => {
                prefix = Some(text(&child, source).trim_matches('\\').to_string());
            }
            "namespace_use_clause" => {
                if let Some(import) = use_clause(&child, None, source, line) {
                    imports.push(import);
                }
            }
            "namespace_use_group" => {
                let mut group_cursor = child.walk();
                for clause in child.named_children(&mut group_cursor) {
                    if let Some(import) = use_clause(&clause, prefix.as_deref(), source, line) {
                        imports.push(import);
                    }
                }
            }
            _ => {}
        }
    }

    imports
}

fn use_clause(clause: &Node, prefix: Option<&str>, source: &[u8], line: usize) -> Option<Import> {
    let mut cursor = clause.walk();
    let children: Vec<Node> = clause.named_children(&mut cursor).collect();

    let target = children.iter().find(|c| is_name(c))?;
    let written = text(target, source).trim_start_matches('\\');
    let full = match prefix {
        Some(p) if !p.is_empty() => format!("{}\\{}", p, written),
        _ => written.to_string(),
    };

    let alias = clause
        .child_by_field_name("alias")
        .map(|a| text(&a, source).to_string())
        .or_else(|| {
            children
                .iter()
                .find(|c| c.kind() == "namespace_aliasing_clause")
                .and_then(|c| c.named_child(0))
                .map(|a| text(&a, source).to_string())
        })
        .or_else(|| {
            // `B as C` without an aliasing node: the second name is the alias
            children
                .iter()
                .filter(|c| c.kind() == "name")
                .nth(if target.kind() == "name" { 1 } else { 0 })
                .filter(|_| has_child_kind(clause, "as"))
                .map(|a| text(a, source).to_string())
        });

    let mut import = Import::simple(&full, line);
    import.names.push(match alias {
        Some(a) => ImportedName::with_alias(&full, &a),
        None => ImportedName::new(&full),
    });
    Some(import)
}

/// `require`/`include` family with a literal string argument, anywhere in the file
fn collect_path_imports(node: &Node, source: &[u8], imports: &mut Vec<Import>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "require_expression"
            | "require_once_expression"
            | "include_expression"
            | "include_once_expression" => {
                let literal = child
                    .named_child(0)
                    .filter(|n| matches!(n.kind(), "string" | "encapsed_string"))
                    .map(|n| string_literal(text(&n, source)));
                if let Some(path) = literal.filter(|p| !p.is_empty()) {
                    imports.push(Import::path(&path, line_of(&child)));
                }
            }
            _ => collect_path_imports(&child, source, imports),
        }
    }
}

fn string_literal(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .to_string()
}

fn parse_declaration(node: &Node, kind: PhpDeclarationKind, source: &[u8]) -> Option<PhpDeclaration> {
    let name = node.child_by_field_name("name").map(|n| text(&n, source))?;
    if name.is_empty() {
        return None;
    }

    let mut decl = PhpDeclaration {
        kind,
        name: name.to_string(),
        docblock: docblock(node, source),
        is_abstract: has_child_kind(node, "abstract_modifier"),
        is_final: has_child_kind(node, "final_modifier"),
        line: line_of(node),
        ..PhpDeclaration::default()
    };

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "base_clause" => decl.extends.extend(names_in(&child, source)),
            "class_interface_clause" => decl.implements.extend(names_in(&child, source)),
            _ => {}
        }
    }

    if let Some(body) = node.child_by_field_name("body") {
        parse_body(&body, source, &mut decl);
    }

    Some(decl)
}

fn parse_body(body: &Node, source: &[u8], decl: &mut PhpDeclaration) {
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        match member.kind() {
            "method_declaration" => {
                if let Some(method) = parse_function_like(&member, source) {
                    decl.methods.push(method);
                }
            }
            "property_declaration" => {
                decl.properties.extend(parse_property_declaration(&member, source));
            }
            "const_declaration" => {
                decl.constants.extend(parse_const_declaration(&member, source));
            }
            "use_declaration" => {
                decl.traits.extend(names_in(&member, source));
            }
            "enum_case" => {
                if let Some(case) = parse_enum_case(&member, source) {
                    decl.cases.push(case);
                }
            }
            _ => {}
        }
    }
}

/// Methods and free functions share one shape
fn parse_function_like(node: &Node, source: &[u8]) -> Option<PhpFunction> {
    let name = node.child_by_field_name("name").map(|n| text(&n, source))?;
    if name.is_empty() {
        return None;
    }

    let mut func = PhpFunction {
        name: name.to_string(),
        docblock: docblock(node, source),
        line: line_of(node),
        ..PhpFunction::default()
    };

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "visibility_modifier" => func.visibility = Some(text(&child, source).to_lowercase()),
            "static_modifier" => func.is_static = true,
            "abstract_modifier" => func.is_abstract = true,
            _ => {}
        }
    }

    if let Some(params) = node.child_by_field_name("parameters") {
        func.parameters = parse_parameters(&params, source);
    }
    if let Some(ret) = node.child_by_field_name("return_type") {
        func.return_type = Some(text(&ret, source).trim_start_matches(':').trim().to_string());
    }

    Some(func)
}

fn parse_parameters(node: &Node, source: &[u8]) -> Vec<PhpParameter> {
    let mut params = Vec::new();
    let mut cursor = node.walk();

    for child in node.named_children(&mut cursor) {
        let variadic = match child.kind() {
            "simple_parameter" | "property_promotion_parameter" => false,
            "variadic_parameter" => true,
            _ => continue,
        };

        let name_node = child.child_by_field_name("name").or_else(|| {
            let mut inner = child.walk();
            let found = child
                .named_children(&mut inner)
                .find(|c| c.kind() == "variable_name");
            found
        });
        let Some(name_node) = name_node else {
            continue;
        };

        let promoted = if child.kind() == "property_promotion_parameter" {
            let visibility = child
                .child_by_field_name("visibility")
                .map(|v| text(&v, source).to_lowercase())
                .unwrap_or_else(|| "public".to_string());
            Some(visibility)
        } else {
            None
        };

        params.push(PhpParameter {
            name: text(&name_node, source).trim_start_matches('$').to_string(),
            type_hint: type_text(&child, source),
            default: child
                .child_by_field_name("default_value")
                .map(|d| text(&d, source).to_string()),
            variadic,
            promoted,
        });
    }

    params
}

fn parse_property_declaration(node: &Node, source: &[u8]) -> Vec<PhpProperty> {
    let mut visibility = None;
    let mut is_static = false;
    let type_hint = type_text(node, source);

    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();

    for child in &children {
        match child.kind() {
            "visibility_modifier" => visibility = Some(text(child, source).to_lowercase()),
            "static_modifier" => is_static = true,
            _ => {}
        }
    }

    children
        .iter()
        .filter(|c| c.kind() == "property_element")
        .filter_map(|element| {
            let mut inner = element.walk();
            let name = element
                .named_children(&mut inner)
                .find(|c| c.kind() == "variable_name")?;
            let default = element
                .child_by_field_name("default_value")
                .or_else(|| {
                    let mut init_cursor = element.walk();
                    let init = element
                        .named_children(&mut init_cursor)
                        .find(|c| c.kind() == "property_initializer");
                    init.and_then(|i| i.named_child(0))
                })
                .map(|d| text(&d, source).to_string());

            Some(PhpProperty {
                name: text(&name, source).trim_start_matches('$').to_string(),
                type_hint: type_hint.clone(),
                visibility: visibility.clone(),
                is_static,
                default,
                line: line_of(element),
            })
        })
        .collect()
}

fn parse_const_declaration(node: &Node, source: &[u8]) -> Vec<PhpConstant> {
    let mut constants = Vec::new();
    let mut cursor = node.walk();

    for element in node.named_children(&mut cursor) {
        if element.kind() != "const_element" {
            continue;
        }
        let mut inner = element.walk();
        let parts: Vec<Node> = element.named_children(&mut inner).collect();
        let Some(name) = parts.iter().find(|p| p.kind() == "name") else {
            continue;
        };
        let value = parts
            .iter()
            .find(|p| p.id() != name.id())
            .map(|v| text(v, source).to_string());
        constants.push(PhpConstant {
            name: text(name, source).to_string(),
            value,
            line: line_of(&element),
        });
    }

    constants
}

fn parse_enum_case(node: &Node, source: &[u8]) -> Option<PhpEnumCase> {
    let name = node.child_by_field_name("name").or_else(|| {
        let mut cursor = node.walk();
        let found = node.named_children(&mut cursor).find(|c| c.kind() == "name");
        found
    })?;
    let value = node.child_by_field_name("value").or_else(|| {
        let mut cursor = node.walk();
        let found = node
            .named_children(&mut cursor)
            .find(|c| c.id() != name.id() && c.kind() != "comment");
        found
    });

    Some(PhpEnumCase {
        name: text(&name, source).to_string(),
        value: value.map(|v| text(&v, source).to_string()),
    })
}
