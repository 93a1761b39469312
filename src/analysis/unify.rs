// IR unification adapter
//
// Maps each language's fragment onto the shared model. Concepts without a
// first-class field (traits, constants, interface/enum-ness, namespaces)
// land on `CodeClass::kind` and `ClassExtension`.

use crate::model::*;
use crate::parser::js_document::{JsClass, JsDocument, JsFunction, JsMethod, JsParameter};
use crate::parser::{
    JsFile, PhpDeclaration, PhpDeclarationKind, PhpFile, PhpFunction, PhpParameter, PyClass,
    PyFunction, PyModule, PyParameter, PyParameterKind, SyntaxFragment,
};
use std::path::Path;

/// Map one fragment onto unified entities. `rel_path` is the file path
/// relative to the scanned root.
pub fn unify(fragment: &SyntaxFragment, rel_path: &Path) -> Vec<UnifiedEntity> {
    match fragment {
        SyntaxFragment::Python(module) => unify_python(module, rel_path),
        SyntaxFragment::Php(file) => unify_php(file, rel_path),
        SyntaxFragment::Js(file) => unify_js(file, rel_path),
    }
}

/// Convert a relative file path to a dotted module name
pub fn path_to_module_name(rel_path: &Path) -> String {
    let mut parts: Vec<String> = rel_path
        .iter()
        .filter_map(|s| s.to_str())
        .map(|s| s.to_string())
        .collect();

    if let Some(last) = parts.last_mut() {
        if let Some(idx) = last.rfind('.') {
            if idx > 0 {
                last.truncate(idx);
            }
        }
    }

    if parts.last().map(String::as_str) == Some("__init__") {
        parts.pop();
    }

    parts.join(".")
}

fn qualify(module: &str, name: &str) -> String {
    if module.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", module, name)
    }
}

// ---------------------------------------------------------------------------
// Python
// ---------------------------------------------------------------------------

/// Any leading underscore, dunders included, is private
fn python_visibility(name: &str) -> Visibility {
    if name.starts_with('_') {
        Visibility::Private
    } else {
        Visibility::Public
    }
}

fn python_parameter(param: &PyParameter) -> Parameter {
    let name = match param.kind {
        PyParameterKind::Regular => param.name.clone(),
        PyParameterKind::Args => format!("*{}", param.name),
        PyParameterKind::Kwargs => format!("**{}", param.name),
    };
    Parameter {
        name,
        type_hint: param.annotation.clone(),
        default: param.default.clone(),
    }
}

fn python_function(func: &PyFunction, class_name: Option<&str>, rel_path: &Path) -> CodeFunction {
    let is_staticmethod = func.has_decorator("staticmethod");
    let strip_receiver = class_name.is_some()
        && !is_staticmethod
        && func
            .parameters
            .first()
            .is_some_and(|p| p.kind == PyParameterKind::Regular);

    let parameters = func
        .parameters
        .iter()
        .skip(usize::from(strip_receiver))
        .map(python_parameter)
        .collect();

    CodeFunction {
        name: func.name.clone(),
        docstring: func.docstring.clone(),
        parameters,
        return_type: func.return_type.clone(),
        class_name: class_name.map(str::to_string),
        visibility: python_visibility(&func.name),
        is_static: is_staticmethod || func.has_decorator("classmethod"),
        is_abstract: func.has_decorator("abstractmethod"),
        is_async: func.is_async,
        is_generator: func.is_generator,
        decorators: func.decorators.clone(),
        file_path: rel_path.to_path_buf(),
        line: func.line,
        ..CodeFunction::default()
    }
}

fn python_class(class: &PyClass, module: &str, rel_path: &Path) -> CodeClass {
    let mut unified = CodeClass::new(&class.name, Language::Python, rel_path.to_path_buf(), class.line);
    unified.qualified_name = qualify(module, &class.name);
    unified.docstring = class.docstring.clone();
    unified.base_classes = class.bases.clone();
    unified.methods = class
        .methods
        .iter()
        .map(|m| python_function(m, Some(&class.name), rel_path))
        .collect();

    for assignment in &class.class_attributes {
        unified.attributes.push(Attribute {
            name: assignment.name.clone(),
            type_hint: assignment.annotation.clone(),
            scope: AttributeScope::Static,
            visibility: python_visibility(&assignment.name),
            line: assignment.line,
        });
    }
    for assignment in &class.instance_attributes {
        if let Some(existing) = unified.attributes.iter_mut().find(|a| a.name == assignment.name) {
            // A bare annotation assigned in the constructor is a typed instance field
            let annotation_only = class
                .class_attributes
                .iter()
                .any(|c| c.name == assignment.name && !c.has_value);
            if annotation_only {
                existing.scope = AttributeScope::Instance;
                if existing.type_hint.is_none() {
                    existing.type_hint = assignment.annotation.clone();
                }
            }
            continue;
        }
        unified.attributes.push(Attribute {
            name: assignment.name.clone(),
            type_hint: assignment.annotation.clone(),
            scope: AttributeScope::Instance,
            visibility: python_visibility(&assignment.name),
            line: assignment.line,
        });
    }

    unified.extension.is_abstract = unified.methods.iter().any(|m| m.is_abstract)
        || class.bases.iter().any(|b| matches!(bare_name(b), "ABC" | "ABCMeta"));

    unified
}

fn unify_python(module: &PyModule, rel_path: &Path) -> Vec<UnifiedEntity> {
    let module_name = path_to_module_name(rel_path);
    let classes = module
        .classes
        .iter()
        .map(|c| UnifiedEntity::Class(python_class(c, &module_name, rel_path)));
    let functions = module
        .functions
        .iter()
        .map(|f| UnifiedEntity::Function(python_function(f, None, rel_path)));
    classes.chain(functions).collect()
}

// ---------------------------------------------------------------------------
// PHP
// ---------------------------------------------------------------------------

fn php_visibility(keyword: Option<&str>) -> Visibility {
    keyword.and_then(Visibility::from_keyword).unwrap_or_default()
}

fn php_parameter(param: &PhpParameter) -> Parameter {
    Parameter {
        name: if param.variadic {
            format!("...{}", param.name)
        } else {
            param.name.clone()
        },
        type_hint: param.type_hint.clone(),
        default: param.default.clone(),
    }
}

fn php_function(func: &PhpFunction, class_name: Option<&str>, in_interface: bool, rel_path: &Path) -> CodeFunction {
    CodeFunction {
        name: func.name.clone(),
        docstring: func.docblock.clone(),
        parameters: func.parameters.iter().map(php_parameter).collect(),
        return_type: func.return_type.clone(),
        class_name: class_name.map(str::to_string),
        visibility: php_visibility(func.visibility.as_deref()),
        is_static: func.is_static,
        is_abstract: func.is_abstract || in_interface,
        namespace: if class_name.is_none() {
            func.namespace.clone()
        } else {
            None
        },
        file_path: rel_path.to_path_buf(),
        line: func.line,
        ..CodeFunction::default()
    }
}

fn php_class(decl: &PhpDeclaration, rel_path: &Path) -> CodeClass {
    let kind = match decl.kind {
        PhpDeclarationKind::Class => ClassKind::Class,
        PhpDeclarationKind::Interface => ClassKind::Interface,
        PhpDeclarationKind::Trait => ClassKind::Trait,
        PhpDeclarationKind::Enum => ClassKind::Enum,
    };
    let in_interface = kind == ClassKind::Interface;

    let mut unified =
        CodeClass::new(&decl.name, Language::Php, rel_path.to_path_buf(), decl.line).with_kind(kind);
    unified.qualified_name = decl.full_name();
    unified.docstring = decl.docblock.clone();
    unified.base_classes = decl.extends.iter().chain(&decl.implements).cloned().collect();
    unified.methods = decl
        .methods
        .iter()
        .map(|m| php_function(m, Some(&decl.name), in_interface, rel_path))
        .collect();

    for property in &decl.properties {
        unified.attributes.push(Attribute {
            name: property.name.clone(),
            type_hint: property.type_hint.clone(),
            scope: if property.is_static {
                AttributeScope::Static
            } else {
                AttributeScope::Instance
            },
            visibility: php_visibility(property.visibility.as_deref()),
            line: property.line,
        });
    }

    // Constructor property promotion
    if let Some(ctor) = decl.methods.iter().find(|m| m.name.eq_ignore_ascii_case("__construct")) {
        for param in ctor.parameters.iter().filter(|p| p.promoted.is_some()) {
            if unified.attributes.iter().any(|a| a.name == param.name) {
                continue;
            }
            unified.attributes.push(Attribute {
                name: param.name.clone(),
                type_hint: param.type_hint.clone(),
                scope: AttributeScope::Instance,
                visibility: php_visibility(param.promoted.as_deref()),
                line: ctor.line,
            });
        }
    }

    unified.extension = ClassExtension {
        namespace: decl.namespace.clone(),
        implements: decl.implements.clone(),
        uses: decl.traits.clone(),
        constants: decl
            .constants
            .iter()
            .map(|c| Constant {
                name: c.name.clone(),
                value: c.value.clone(),
                line: c.line,
            })
            .collect(),
        enum_members: decl
            .cases
            .iter()
            .map(|c| EnumMember {
                name: c.name.clone(),
                value: c.value.clone(),
            })
            .collect(),
        is_abstract: decl.is_abstract,
    };

    unified
}

fn unify_php(file: &PhpFile, rel_path: &Path) -> Vec<UnifiedEntity> {
    let classes = file
        .declarations
        .iter()
        .map(|d| UnifiedEntity::Class(php_class(d, rel_path)));
    let functions = file
        .functions
        .iter()
        .map(|f| UnifiedEntity::Function(php_function(f, None, false, rel_path)));
    classes.chain(functions).collect()
}

// ---------------------------------------------------------------------------
// JavaScript / TypeScript
// ---------------------------------------------------------------------------

fn js_parameter(param: &JsParameter) -> Parameter {
    Parameter {
        name: if param.is_rest {
            format!("...{}", param.name)
        } else {
            param.name.clone()
        },
        type_hint: param.type_hint.clone(),
        default: param.default.clone(),
    }
}

fn js_method(method: &JsMethod, class_name: &str, doc: &JsDocument, rel_path: &Path) -> CodeFunction {
    CodeFunction {
        name: method.name.clone(),
        docstring: doc.doc_comment_for(method.line),
        parameters: method.parameters.iter().map(js_parameter).collect(),
        return_type: method.return_type.clone(),
        class_name: Some(class_name.to_string()),
        visibility: if method.is_private {
            Visibility::Private
        } else {
            Visibility::Public
        },
        is_static: method.is_static,
        is_abstract: method.is_abstract,
        is_async: method.is_async,
        is_generator: method.is_generator,
        file_path: rel_path.to_path_buf(),
        line: method.line,
        ..CodeFunction::default()
    }
}

fn js_function(func: &JsFunction, doc: &JsDocument, rel_path: &Path) -> CodeFunction {
    CodeFunction {
        name: func.name.clone(),
        docstring: doc.doc_comment_for(func.line),
        parameters: func.parameters.iter().map(js_parameter).collect(),
        return_type: func.return_type.clone(),
        is_async: func.is_async,
        is_generator: func.is_generator,
        is_arrow: func.is_arrow,
        object_name: if func.is_object_method {
            func.object_name.clone()
        } else {
            None
        },
        file_path: rel_path.to_path_buf(),
        line: func.line,
        ..CodeFunction::default()
    }
}

fn js_class(class: &JsClass, module: &str, doc: &JsDocument, rel_path: &Path) -> CodeClass {
    let kind = if class.is_interface {
        ClassKind::Interface
    } else if class.is_enum {
        ClassKind::Enum
    } else {
        ClassKind::Class
    };

    let mut unified =
        CodeClass::new(&class.name, Language::JavaScript, rel_path.to_path_buf(), class.line)
            .with_kind(kind);
    unified.qualified_name = qualify(module, &class.name);
    unified.docstring = doc.doc_comment_for(class.line);
    unified.base_classes = class
        .super_class
        .iter()
        .chain(&class.extends)
        .chain(&class.implements)
        .cloned()
        .collect();
    unified.methods = class
        .methods
        .iter()
        .map(|m| js_method(m, &class.name, doc, rel_path))
        .collect();
    unified.attributes = class
        .properties
        .iter()
        .map(|p| Attribute {
            name: p.name.clone(),
            type_hint: p.type_hint.clone(),
            scope: if p.is_static {
                AttributeScope::Static
            } else {
                AttributeScope::Instance
            },
            visibility: if p.is_private {
                Visibility::Private
            } else {
                Visibility::Public
            },
            line: p.line,
        })
        .collect();
    unified.extension = ClassExtension {
        implements: class.implements.clone(),
        enum_members: class
            .enum_members
            .iter()
            .map(|m| EnumMember {
                name: m.name.clone(),
                value: m.value.clone(),
            })
            .collect(),
        is_abstract: class.is_abstract,
        ..ClassExtension::default()
    };

    unified
}

fn unify_js(file: &JsFile, rel_path: &Path) -> Vec<UnifiedEntity> {
    let module = path_to_module_name(rel_path);
    let doc = &file.document;
    let classes = doc
        .classes
        .iter()
        .map(|c| UnifiedEntity::Class(js_class(c, &module, doc, rel_path)));
    let functions = doc
        .functions
        .iter()
        .map(|f| UnifiedEntity::Function(js_function(f, doc, rel_path)));
    classes.chain(functions).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{JavaScriptParser, PhpParser, PythonParser};

    fn classes(entities: Vec<UnifiedEntity>) -> Vec<CodeClass> {
        entities
            .into_iter()
            .filter_map(|e| match e {
                UnifiedEntity::Class(c) => Some(c),
                UnifiedEntity::Function(_) => None,
            })
            .collect()
    }

    fn python(source: &str, rel: &str) -> Vec<UnifiedEntity> {
        let mut parser = PythonParser::new().unwrap();
        let module = parser.parse_source(source, Path::new(rel)).unwrap();
        unify(&SyntaxFragment::Python(module), Path::new(rel))
    }

    fn php(source: &str) -> Vec<UnifiedEntity> {
        let mut parser = PhpParser::new().unwrap();
        let file = parser.parse_source(source, Path::new("src/test.php")).unwrap();
        unify(&SyntaxFragment::Php(file), Path::new("src/test.php"))
    }

    #[test]
    fn test_path_to_module_name() {
        assert_eq!(path_to_module_name(Path::new("src/main.py")), "src.main");
        assert_eq!(path_to_module_name(Path::new("src/__init__.py")), "src");
        assert_eq!(path_to_module_name(Path::new("utils.py")), "utils");
        assert_eq!(path_to_module_name(Path::new("web/app.component.ts")), "web.app.component");
    }

    #[test]
    fn test_python_receiver_and_modifiers() {
        let source = r#"
class Shape:
    def area(self, scale: float = 1.0) -> float:
        pass

    @staticmethod
    def unit(size):
        pass

    @classmethod
    def create(cls, *args, **kwargs):
        pass

    @abstractmethod
    def _draw(self):
        pass

    def __repr__(self):
        pass
"#;
        let shape = &classes(python(source, "geo/shape.py"))[0];
        assert_eq!(shape.qualified_name, "geo.shape.Shape");

        let area = &shape.methods[0];
        assert_eq!(area.parameters.len(), 1);
        assert_eq!(area.parameters[0].to_string(), "scale: float = 1.0");
        assert_eq!(area.class_name.as_deref(), Some("Shape"));

        let unit = &shape.methods[1];
        assert!(unit.is_static);
        assert_eq!(unit.parameters[0].name, "size");

        let create = &shape.methods[2];
        assert!(create.is_static);
        let names: Vec<_> = create.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["*args", "**kwargs"]);

        let draw = &shape.methods[3];
        assert!(draw.is_abstract);
        assert_eq!(draw.visibility, Visibility::Private);
        assert!(shape.extension.is_abstract);

        assert_eq!(shape.methods[4].name, "__repr__");
        assert_eq!(shape.methods[4].visibility, Visibility::Private);
    }

    #[test]
    fn test_python_attributes() {
        let source = r#"
class Order:
    count = 0
    customer: "Customer"
    registry: dict

    def __init__(self, customer):
        self.customer = customer
        self._lines = []
"#;
        let order = &classes(python(source, "order.py"))[0];
        let attrs: Vec<_> = order
            .attributes
            .iter()
            .map(|a| (a.name.as_str(), a.scope, a.visibility))
            .collect();
        assert_eq!(
            attrs,
            vec![
                ("count", AttributeScope::Static, Visibility::Public),
                ("customer", AttributeScope::Instance, Visibility::Public),
                ("registry", AttributeScope::Static, Visibility::Public),
                ("_lines", AttributeScope::Instance, Visibility::Private),
            ]
        );
        assert_eq!(order.attributes[1].type_hint.as_deref(), Some("\"Customer\""));
        assert_eq!(order.attributes[2].type_hint.as_deref(), Some("dict"));
    }

    #[test]
    fn test_python_free_functions() {
        let entities = python("def run(self, x):\n    pass\n", "main.py");
        match &entities[0] {
            UnifiedEntity::Function(f) => {
                assert!(f.class_name.is_none());
                assert_eq!(f.parameters.len(), 2);
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_php_kinds_and_extension() {
        let source = r#"<?php
namespace App;

interface Shape { public function area(): float; }
trait Loggable {}
enum Color { case Red; case Blue; }

class Square implements Shape
{
    use Loggable;
    const SIDES = 4;

    public function __construct(private float $side) {}

    public function area(): float { return $this->side ** 2; }
}
"#;
        let all = classes(php(source));
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].kind, ClassKind::Interface);
        assert!(all[0].methods[0].is_abstract);
        assert_eq!(all[1].kind, ClassKind::Trait);
        assert_eq!(all[2].kind, ClassKind::Enum);
        assert_eq!(all[2].extension.enum_members.len(), 2);

        let square = &all[3];
        assert_eq!(square.qualified_name, "App\\Square");
        assert_eq!(square.base_classes, vec!["Shape"]);
        assert_eq!(square.extension.implements, vec!["Shape"]);
        assert_eq!(square.extension.uses, vec!["Loggable"]);
        assert_eq!(square.extension.namespace.as_deref(), Some("App"));
        assert_eq!(square.extension.constants[0].name, "SIDES");

        let side = &square.attributes[0];
        assert_eq!(side.name, "side");
        assert_eq!(side.visibility, Visibility::Private);
        assert_eq!(side.type_hint.as_deref(), Some("float"));
    }

    #[test]
    fn test_js_document_unification() {
        let doc = JsDocument::from_json(
            r#"{
            "classes": [
                {"name": "Repo", "isInterface": true, "extends": ["Reader"], "line": 5,
                 "methods": [{"name": "find", "isAbstract": true, "parameters": [{"name": "id", "type": "string"}], "line": 6}]},
                {"name": "Status", "isEnum": true, "enumMembers": [{"name": "Active", "value": "1"}], "line": 9},
                {"name": "SqlRepo", "superClass": "BaseRepo", "implements": ["Repo"], "line": 12,
                 "properties": [{"name": "pool", "isPrivate": true, "type": "Pool", "line": 13}],
                 "methods": [{"name": "find", "parameters": [{"name": "ids", "isRest": true}], "line": 14}]}
            ],
            "functions": [
                {"name": "handler", "isArrow": true, "isAsync": true, "line": 20},
                {"name": "save", "isObjectMethod": true, "objectName": "api", "line": 25}
            ],
            "comments": [{"kind": "block", "value": "* Repository contract ", "startLine": 3, "endLine": 4}]
        }"#,
        )
        .unwrap();
        let file = JavaScriptParser::fragment(Path::new("web/repo.ts"), doc);
        let entities = unify(&SyntaxFragment::Js(file), Path::new("web/repo.ts"));
        assert_eq!(entities.len(), 5);

        let all = classes(entities.clone());
        assert_eq!(all[0].kind, ClassKind::Interface);
        assert_eq!(all[0].docstring.as_deref(), Some("Repository contract"));
        assert_eq!(all[0].base_classes, vec!["Reader"]);
        assert_eq!(all[1].kind, ClassKind::Enum);
        assert_eq!(all[2].base_classes, vec!["BaseRepo", "Repo"]);
        assert_eq!(all[2].attributes[0].visibility, Visibility::Private);
        assert_eq!(all[2].methods[0].parameters[0].name, "...ids");

        match (&entities[3], &entities[4]) {
            (UnifiedEntity::Function(handler), UnifiedEntity::Function(save)) => {
                assert!(handler.is_arrow && handler.is_async);
                assert_eq!(save.object_name.as_deref(), Some("api"));
            }
            other => panic!("expected functions, got {:?}", other),
        }
    }
}
