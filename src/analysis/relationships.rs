// Relationship detection between unified classes
//
// Edges are inferred from base lists, attribute types and member signatures.
// The global inheritance pass sees every class; per-language detectors only
// see classes declared in files carrying their extensions. Output order
// follows class iteration order, so repeated runs are byte-identical.

use crate::analysis::discovery::has_extension;
use crate::config::Config;
use crate::model::{bare_name, CodeClass, Language, RelationshipEdge, RelationshipKind};
use std::collections::{HashMap, HashSet};

/// Generic containers whose last type argument is the element type
const COLLECTION_TYPES: &[&str] = &[
    "List", "list", "Sequence", "MutableSequence", "Set", "set", "FrozenSet", "frozenset",
    "Iterable", "Iterator", "Collection", "Array", "array", "ReadonlyArray", "Dict", "dict",
    "Mapping", "Map", "Record",
];

/// Type names meaning "no value" inside a union
const NULL_TYPES: &[&str] = &["None", "null", "undefined", "void"];

/// Ordered edge list that merges exact (source, target, kind) duplicates
#[derive(Debug, Default)]
pub struct EdgeSet {
    edges: Vec<RelationshipEdge>,
    seen: HashSet<(String, String, RelationshipKind)>,
}

impl EdgeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge; self edges and exact duplicates are ignored
    pub fn add(&mut self, source: &str, target: &str, kind: RelationshipKind) -> bool {
        if source == target {
            return false;
        }
        let key = (source.to_string(), target.to_string(), kind);
        if !self.seen.insert(key) {
            return false;
        }
        self.edges.push(RelationshipEdge::new(source, target, kind));
        true
    }

    fn push(&mut self, edge: &RelationshipEdge) {
        let key = (edge.source.clone(), edge.target.clone(), edge.kind);
        if edge.source != edge.target && self.seen.insert(key) {
            self.edges.push(edge.clone());
        }
    }

    /// Whether any edge joins the pair, in either direction
    pub fn links(&self, a: &str, b: &str) -> bool {
        self.edges
            .iter()
            .any(|e| (e.source == a && e.target == b) || (e.source == b && e.target == a))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn into_edges(self) -> Vec<RelationshipEdge> {
        self.edges
    }
}

/// Name lookup over the class set being analysed
pub struct ClassIndex<'a> {
    classes: &'a [CodeClass],
    by_name: HashMap<&'a str, Vec<usize>>,
}

impl<'a> ClassIndex<'a> {
    pub fn new(classes: &'a [CodeClass]) -> Self {
        let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, class) in classes.iter().enumerate() {
            by_name.entry(class.name.as_str()).or_default().push(idx);
        }
        Self { classes, by_name }
    }

    /// First class other than `from` whose name equals the reference's bare name
    pub fn resolve(&self, reference: &str, from: usize) -> Option<&'a CodeClass> {
        let name = bare_name(reference);
        self.by_name
            .get(name)?
            .iter()
            .find(|&&idx| idx != from)
            .map(|&idx| &self.classes[idx])
    }
}

/// A detector scoped to one language's files
pub trait LanguageDetector {
    fn language(&self) -> Language;

    fn extensions(&self) -> &[String];

    /// Add edges for `scoped`, a list of (index, class) pairs from the full set
    fn detect(&self, scoped: &[(usize, &CodeClass)], index: &ClassIndex<'_>, edges: &mut EdgeSet);
}

/// Python: composition and aggregation from annotated attributes
pub struct PythonDetector {
    extensions: Vec<String>,
}

impl LanguageDetector for PythonDetector {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn detect(&self, scoped: &[(usize, &CodeClass)], index: &ClassIndex<'_>, edges: &mut EdgeSet) {
        for &(idx, class) in scoped {
            member_edges(idx, class, index, edges);
        }
    }
}

/// PHP: implementation, trait usage, then typed properties
pub struct PhpDetector {
    extensions: Vec<String>,
}

impl LanguageDetector for PhpDetector {
    fn language(&self) -> Language {
        Language::Php
    }

    fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn detect(&self, scoped: &[(usize, &CodeClass)], index: &ClassIndex<'_>, edges: &mut EdgeSet) {
        for &(idx, class) in scoped {
            implementation_edges(idx, class, index, edges);
            for used in &class.extension.uses {
                if let Some(t) = index.resolve(used, idx) {
                    edges.add(&class.name, &t.name, RelationshipKind::TraitUsage);
                }
            }
            member_edges(idx, class, index, edges);
        }
    }
}

/// JS/TS: implementation plus typed properties
pub struct JavaScriptDetector {
    extensions: Vec<String>,
}

impl LanguageDetector for JavaScriptDetector {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn detect(&self, scoped: &[(usize, &CodeClass)], index: &ClassIndex<'_>, edges: &mut EdgeSet) {
        for &(idx, class) in scoped {
            implementation_edges(idx, class, index, edges);
            member_edges(idx, class, index, edges);
        }
    }
}

fn implementation_edges(idx: usize, class: &CodeClass, index: &ClassIndex<'_>, edges: &mut EdgeSet) {
    for iface in &class.extension.implements {
        if let Some(target) = index.resolve(iface, idx) {
            edges.add(&target.name, &class.name, RelationshipKind::Implementation);
        }
    }
}

/// Composition for single-valued attributes, aggregation for collections
fn member_edges(idx: usize, class: &CodeClass, index: &ClassIndex<'_>, edges: &mut EdgeSet) {
    for attr in &class.attributes {
        let Some(hint) = attr.type_hint.as_deref() else {
            continue;
        };
        let Some(ty) = unwrap_optional(hint) else {
            continue;
        };

        if let Some(element) = collection_element(ty) {
            if let Some(part) = index.resolve(element, idx) {
                edges.add(&class.name, &part.name, RelationshipKind::Aggregation);
            }
        } else if let Some(part) = index.resolve(ty, idx) {
            edges.add(&class.name, &part.name, RelationshipKind::Composition);
        }
    }
}

/// Strip quotes, `Optional[..]`, `?T` and null members of a union
pub fn unwrap_optional(hint: &str) -> Option<&str> {
    let mut ty = hint.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    ty = ty.strip_prefix('?').unwrap_or(ty).trim();

    if let Some(inner) = ty
        .strip_prefix("Optional[")
        .or_else(|| ty.strip_prefix("typing.Optional["))
        .and_then(|rest| rest.strip_suffix(']'))
    {
        return unwrap_optional(inner);
    }

    let parts = split_top_level(ty, '|');
    if parts.len() > 1 {
        let mut remaining = parts
            .into_iter()
            .map(str::trim)
            .filter(|p| !NULL_TYPES.contains(p));
        let first = remaining.next()?;
        return if remaining.next().is_none() {
            unwrap_optional(first)
        } else {
            None
        };
    }

    if ty.is_empty() {
        None
    } else {
        Some(ty)
    }
}

/// Element type of a collection annotation, if it is one
pub fn collection_element(ty: &str) -> Option<&str> {
    let ty = ty.trim();
    if let Some(element) = ty.strip_suffix("[]") {
        return Some(element.trim());
    }

    let open = ty.find(|c| c == '<' || c == '[')?;
    let close = match &ty[open..open + 1] {
        "<" => '>',
        _ => ']',
    };
    if !ty.ends_with(close) {
        return None;
    }
    if !COLLECTION_TYPES.contains(&bare_name(&ty[..open])) {
        return None;
    }

    let inner = &ty[open + 1..ty.len() - 1];
    let last = split_top_level(inner, ',').pop()?.trim();
    unwrap_optional(last)
}

/// Split on a separator outside of brackets
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '<' | '[' | '(' | '{' => depth += 1,
            '>' | ']' | ')' | '}' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Merges the global inheritance pass with the per-language detectors
pub struct RelationshipDetector {
    detectors: Vec<Box<dyn LanguageDetector>>,
}

impl RelationshipDetector {
    pub fn new(config: &Config) -> Self {
        Self {
            detectors: vec![
                Box::new(PythonDetector {
                    extensions: config.python.extensions.clone(),
                }),
                Box::new(PhpDetector {
                    extensions: config.php.extensions.clone(),
                }),
                Box::new(JavaScriptDetector {
                    extensions: config.javascript.extensions.clone(),
                }),
            ],
        }
    }

    /// Detect all relationships for a class set
    pub fn detect(&self, classes: &[CodeClass]) -> Vec<RelationshipEdge> {
        self.detect_with_hints(classes, &[])
    }

    /// Detect relationships, merging caller-supplied edges before the
    /// dependency pass
    pub fn detect_with_hints(
        &self,
        classes: &[CodeClass],
        hints: &[RelationshipEdge],
    ) -> Vec<RelationshipEdge> {
        let index = ClassIndex::new(classes);
        let mut edges = EdgeSet::new();

        for (idx, class) in classes.iter().enumerate() {
            for base in &class.base_classes {
                if class.extension.implements.iter().any(|i| i == base) {
                    continue;
                }
                if let Some(parent) = index.resolve(base, idx) {
                    edges.add(&parent.name, &class.name, RelationshipKind::Inheritance);
                }
            }
        }

        for detector in &self.detectors {
            let scoped: Vec<(usize, &CodeClass)> = classes
                .iter()
                .enumerate()
                .filter(|(_, c)| has_extension(&c.file_path, detector.extensions()))
                .collect();
            if scoped.is_empty() {
                continue;
            }
            let before = edges.len();
            detector.detect(&scoped, &index, &mut edges);
            tracing::debug!(
                "{} detector: {} classes, {} new edges",
                detector.language(),
                scoped.len(),
                edges.len() - before
            );
        }

        for hint in hints {
            edges.push(hint);
        }

        dependency_edges(classes, &index, &mut edges);
        edges.into_edges()
    }
}

impl Default for RelationshipDetector {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

/// Signature references that are not already covered by a stronger edge
fn dependency_edges(classes: &[CodeClass], index: &ClassIndex<'_>, edges: &mut EdgeSet) {
    for (idx, class) in classes.iter().enumerate() {
        let mut targets: Vec<&str> = Vec::new();
        for method in &class.methods {
            let hints = method
                .parameters
                .iter()
                .filter_map(|p| p.type_hint.as_deref())
                .chain(method.return_type.as_deref());
            for hint in hints {
                let Some(ty) = unwrap_optional(hint) else {
                    continue;
                };
                let ty = collection_element(ty).unwrap_or(ty);
                if let Some(used) = index.resolve(ty, idx) {
                    if !targets.contains(&used.name.as_str()) {
                        targets.push(&used.name);
                    }
                }
            }
        }

        for target in targets {
            if !edges.links(&class.name, target) {
                edges.add(&class.name, target, RelationshipKind::Dependency);
            }
        }
    }
}
