// Diagram synthesis
//
// Projects the model and its relationship edges into Mermaid text. Every
// emission path iterates Vecs or BTreeMaps only, so the same model and
// settings always produce byte-identical output.

use crate::analysis::imports::is_stdlib;
use crate::analysis::unify::path_to_module_name;
use crate::config::DiagramConfig;
use crate::model::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

/// Kind of diagram a descriptor holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramKind {
    Class,
    Module,
    Sequence,
}

/// One bounded, serialised diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramDescriptor {
    pub id: String,
    pub kind: DiagramKind,
    pub name: String,
    /// Classes, modules or participants drawn
    pub entities: Vec<String>,
    /// Fenced Mermaid block
    pub body: String,
}

impl DiagramDescriptor {
    pub fn new(id: String, kind: DiagramKind, name: String, entities: Vec<String>, body: String) -> Self {
        Self {
            id,
            kind,
            name,
            entities,
            body,
        }
    }

    /// File name used when the diagram is written to disk
    pub fn file_name(&self) -> String {
        format!("{}.md", self.id)
    }

    /// Standalone Markdown document
    pub fn to_markdown(&self) -> String {
        format!("# {}\n\n{}\n", self.name, self.body)
    }
}

/// Diagram generator for creating Mermaid diagrams
pub struct DiagramGenerator {
    /// Class count above which class diagrams are partitioned
    max_classes: usize,
    /// Methods shown per class before silent truncation
    max_methods: usize,
    include_private: bool,
    include_external: bool,
    /// Layout direction for module graphs (TD, LR, BT, RL)
    direction: String,
}

impl DiagramGenerator {
    pub fn new() -> Self {
        Self::from_config(&DiagramConfig::default())
    }

    pub fn from_config(config: &DiagramConfig) -> Self {
        Self {
            max_classes: config.max_classes,
            max_methods: config.max_methods,
            include_private: config.include_private,
            include_external: config.include_external,
            direction: config.direction.clone(),
        }
    }

    pub fn with_max_classes(mut self, max: usize) -> Self {
        self.max_classes = max;
        self
    }

    pub fn with_max_methods(mut self, max: usize) -> Self {
        self.max_methods = max;
        self
    }

    pub fn with_include_private(mut self, include: bool) -> Self {
        self.include_private = include;
        self
    }

    pub fn with_include_external(mut self, include: bool) -> Self {
        self.include_external = include;
        self
    }

    pub fn with_direction(mut self, dir: &str) -> Self {
        self.direction = dir.to_string();
        self
    }

    /// Every diagram the model supports: class, module, then one per flow
    pub fn generate_all(&self, model: &ProjectModel) -> Vec<DiagramDescriptor> {
        let edges = model.relationships.as_deref().unwrap_or_default();
        let mut diagrams = self.class_diagrams(&model.classes, edges);
        diagrams.push(self.module_diagram(model));
        if let Some(flows) = &model.flows {
            for name in flows.keys() {
                diagrams.push(self.sequence_diagram(flows, name));
            }
        }
        dedupe_ids(&mut diagrams);
        diagrams
    }

    // -----------------------------------------------------------------------
    // Class diagrams
    // -----------------------------------------------------------------------

    /// Class diagrams for a class set, partitioned when it exceeds the
    /// threshold. Non-overview diagrams never hold more than the threshold.
    pub fn class_diagrams(&self, classes: &[CodeClass], edges: &[RelationshipEdge]) -> Vec<DiagramDescriptor> {
        let limit = self.max_classes.max(1);
        let all: Vec<&CodeClass> = classes.iter().collect();

        if all.len() <= limit {
            return vec![DiagramDescriptor::new(
                "class-diagram".to_string(),
                DiagramKind::Class,
                "Class Diagram".to_string(),
                class_names(&all),
                self.render_class_diagram(&all, edges, true),
            )];
        }

        let mut partitions = partition(&all, |c| package_key(&c.file_path));
        if partitions.len() < 2 {
            partitions = partition(&all, |c| path_to_module_name(&c.file_path));
        }
        let fold_singletons = partitions.len() >= 2;

        let mut diagrams = vec![DiagramDescriptor::new(
            "class-overview".to_string(),
            DiagramKind::Class,
            "Class Overview".to_string(),
            class_names(&all),
            self.render_class_diagram(&all, edges, false),
        )];

        for (key, members) in &partitions {
            if fold_singletons && members.len() == 1 {
                continue;
            }
            let chunks: Vec<&[&CodeClass]> = members.chunks(limit).collect();
            for (i, chunk) in chunks.iter().enumerate() {
                let (id, name) = if chunks.len() == 1 {
                    (format!("class-{}", slug(key)), format!("Classes: {}", key))
                } else {
                    (
                        format!("class-{}-{}", slug(key), i + 1),
                        format!("Classes: {} ({}/{})", key, i + 1, chunks.len()),
                    )
                };
                diagrams.push(DiagramDescriptor::new(
                    id,
                    DiagramKind::Class,
                    name,
                    class_names(chunk),
                    self.render_class_diagram(chunk, edges, true),
                ));
            }
        }

        diagrams
    }

    /// Render one class diagram. Edges are limited to pairs inside `classes`;
    /// `members` false draws bare class names only.
    pub fn render_class_diagram(&self, classes: &[&CodeClass], edges: &[RelationshipEdge], members: bool) -> String {
        if classes.is_empty() {
            return "```mermaid\nclassDiagram\n  class NoClasses\n```".to_string();
        }

        let names: HashSet<&str> = classes.iter().map(|c| c.name.as_str()).collect();
        let inside: Vec<&RelationshipEdge> = edges
            .iter()
            .filter(|e| names.contains(e.source.as_str()) && names.contains(e.target.as_str()))
            .collect();
        let implemented: HashSet<(&str, &str)> = inside
            .iter()
            .filter(|e| e.kind == RelationshipKind::Implementation)
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();

        let mut lines = vec!["```mermaid".to_string(), "classDiagram".to_string()];

        for edge in &inside {
            if edge.kind == RelationshipKind::Inheritance
                && implemented.contains(&(edge.source.as_str(), edge.target.as_str()))
            {
                continue;
            }
            lines.push(format!(
                "  {} {} {} : {}",
                sanitize_class_name(&edge.source),
                edge.kind.arrow(),
                sanitize_class_name(&edge.target),
                edge.label
            ));
        }

        for class in classes {
            if members {
                self.render_class_block(class, &mut lines);
            } else {
                lines.push(format!("  class {}", sanitize_class_name(&class.name)));
            }
        }

        lines.push("```".to_string());
        lines.join("\n")
    }

    fn render_class_block(&self, class: &CodeClass, lines: &mut Vec<String>) {
        lines.push(format!("  class {} {{", sanitize_class_name(&class.name)));

        let annotation = class
            .kind
            .annotation()
            .or(class.extension.is_abstract.then_some("abstract"));
        if let Some(annotation) = annotation {
            lines.push(format!("    <<{}>>", annotation));
        }

        for attr in class.attributes.iter().filter(|a| self.visible(a.visibility)) {
            let mut line = format!("    {}{}", attr.visibility.symbol(), attr.name);
            if let Some(t) = &attr.type_hint {
                line.push_str(&format!(" : {}", sanitize_type(t)));
            }
            if attr.scope == AttributeScope::Static {
                line.push('$');
            }
            lines.push(line);
        }

        let methods = class
            .methods
            .iter()
            .filter(|m| self.visible(m.visibility))
            .take(self.max_methods);
        for method in methods {
            let params: Vec<&str> = method.parameters.iter().map(|p| p.name.as_str()).collect();
            let mut line = format!(
                "    {}{}({})",
                method.visibility.symbol(),
                method.name,
                params.join(", ")
            );
            if let Some(ret) = &method.return_type {
                line.push_str(&format!(" : {}", sanitize_type(ret)));
            }
            if method.is_abstract {
                line.push('*');
            } else if method.is_static {
                line.push('$');
            }
            lines.push(line);
        }

        lines.push("  }".to_string());
    }

    fn visible(&self, visibility: Visibility) -> bool {
        self.include_private || visibility != Visibility::Private
    }

    // -----------------------------------------------------------------------
    // Module diagrams
    // -----------------------------------------------------------------------

    /// File dependency graph grouped by top-level package
    pub fn module_diagram(&self, model: &ProjectModel) -> DiagramDescriptor {
        let names = self.module_names(model);

        let mut edges: Vec<(&str, &str)> = Vec::new();
        for dep in &model.dependencies {
            let (Some(source), Some(target)) = (names.get(&dep.source), names.get(&dep.target)) else {
                continue;
            };
            if source != target && !edges.contains(&(source.as_str(), target.as_str())) {
                edges.push((source.as_str(), target.as_str()));
            }
        }

        let mut modules: Vec<&str> = match &model.modules {
            Some(explicit) if !explicit.is_empty() => explicit.iter().map(|m| m.name.as_str()).collect(),
            _ => names.values().map(String::as_str).collect(),
        };
        modules.sort_unstable();
        modules.dedup();

        if !self.include_external {
            modules.retain(|m| !is_external(m));
        }
        edges.retain(|(s, t)| modules.binary_search(s).is_ok() && modules.binary_search(t).is_ok());

        let body = self.render_module_diagram(&modules, &edges);
        DiagramDescriptor::new(
            "module-dependencies".to_string(),
            DiagramKind::Module,
            "Module Dependencies".to_string(),
            modules.iter().map(|m| m.to_string()).collect(),
            body,
        )
    }

    /// Dotted module names for every file path referenced by a dependency
    fn module_names(&self, model: &ProjectModel) -> BTreeMap<String, String> {
        let mut paths: Vec<&str> = Vec::new();
        for dep in &model.dependencies {
            for p in [dep.source.as_str(), dep.target.as_str()] {
                if !paths.contains(&p) {
                    paths.push(p);
                }
            }
        }

        let explicit: Vec<&ModuleInfo> = model.modules.iter().flatten().collect();
        let ancestor = common_ancestor(&paths);

        paths
            .into_iter()
            .map(|p| {
                let declared = explicit
                    .iter()
                    .find(|m| m.path.as_deref().map(|mp| mp == Path::new(p)).unwrap_or(false));
                let name = match declared {
                    Some(m) => m.name.clone(),
                    None => dotted_module(p, &ancestor),
                };
                (p.to_string(), name)
            })
            .collect()
    }

    /// Render a module graph from sorted module names and ordered edges
    pub fn render_module_diagram(&self, modules: &[&str], edges: &[(&str, &str)]) -> String {
        if modules.is_empty() {
            return format!("```mermaid\ngraph {}\n  NoModules[No modules found]\n```", self.direction);
        }

        let mut packages: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for module in modules {
            packages.entry(package_name(module)).or_default().push(module);
        }

        let mut lines = vec!["```mermaid".to_string(), format!("graph {}", self.direction)];
        for (package, members) in &packages {
            lines.push(format!("  subgraph {}", clean_id(package)));
            for module in members {
                let label = module.rsplit('.').next().unwrap_or(module);
                lines.push(format!("    {}[{}]", clean_id(module), label));
            }
            lines.push("  end".to_string());
        }
        for (source, target) in edges {
            lines.push(format!("  {} --> {}", clean_id(source), clean_id(target)));
        }
        lines.push("```".to_string());
        lines.join("\n")
    }

    // -----------------------------------------------------------------------
    // Sequence diagrams
    // -----------------------------------------------------------------------

    /// Sequence diagram for a named flow
    pub fn sequence_diagram(&self, flows: &BTreeMap<String, Flow>, name: &str) -> DiagramDescriptor {
        let flow = flows.get(name);
        let participants = flow.map(flow_participants).unwrap_or_default();
        DiagramDescriptor::new(
            format!("sequence-{}", slug(name)),
            DiagramKind::Sequence,
            format!("Sequence: {}", name),
            participants,
            render_sequence(name, flow),
        )
    }
}

impl Default for DiagramGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a flow as call/response pairs
pub fn render_sequence(name: &str, flow: Option<&Flow>) -> String {
    let Some(flow) = flow else {
        return format!(
            "```mermaid\nsequenceDiagram\n  Note over System: Flow '{}' not found\n```",
            name
        );
    };

    let mut lines = vec!["```mermaid".to_string(), "sequenceDiagram".to_string()];
    for participant in flow_participants(flow) {
        lines.push(format!("  participant {}", participant));
    }

    for (i, step) in flow.steps.iter().enumerate() {
        lines.push(format!("  {}->>+{}: {}", step.source, step.target, step.message));
        match &step.response {
            Some(response) if !response.is_empty() => {
                lines.push(format!("  {}-->>-{}: {}", step.target, step.source, response));
            }
            _ => {
                let later = flow.steps[i + 1..]
                    .iter()
                    .any(|s| s.source == step.target || s.target == step.target);
                if !later {
                    lines.push(format!("  deactivate {}", step.target));
                }
            }
        }
    }

    lines.push("```".to_string());
    lines.join("\n")
}

/// Declared participants, or first appearance order when none are declared
fn flow_participants(flow: &Flow) -> Vec<String> {
    if !flow.participants.is_empty() {
        return flow.participants.clone();
    }
    let mut seen: Vec<String> = Vec::new();
    for step in &flow.steps {
        for name in [&step.source, &step.target] {
            if !seen.contains(name) {
                seen.push(name.clone());
            }
        }
    }
    seen
}

/// Suffix `-2`, `-3`, ... onto ids already taken, so no two diagrams share a file
fn dedupe_ids(diagrams: &mut [DiagramDescriptor]) {
    let mut taken: BTreeSet<String> = BTreeSet::new();
    for diagram in diagrams.iter_mut() {
        let mut id = diagram.id.clone();
        let mut n = 1;
        while taken.contains(&id) {
            n += 1;
            id = format!("{}-{}", diagram.id, n);
        }
        taken.insert(id.clone());
        diagram.id = id;
    }
}

fn class_names(classes: &[&CodeClass]) -> Vec<String> {
    classes.iter().map(|c| c.name.clone()).collect()
}

/// Group classes by key; partitions come out sorted, members keep input order
fn partition<'a, F>(classes: &[&'a CodeClass], key: F) -> BTreeMap<String, Vec<&'a CodeClass>>
where
    F: Fn(&CodeClass) -> String,
{
    let mut groups: BTreeMap<String, Vec<&'a CodeClass>> = BTreeMap::new();
    for &class in classes {
        groups.entry(key(class)).or_default().push(class);
    }
    groups
}

/// Dotted directory of a relative file path, `root` at the top level
fn package_key(path: &Path) -> String {
    let dirs: Vec<&str> = path
        .parent()
        .map(|p| p.iter().filter_map(|s| s.to_str()).collect())
        .unwrap_or_default();
    if dirs.is_empty() {
        "root".to_string()
    } else {
        dirs.join(".")
    }
}

/// Longest shared directory prefix of slash-separated paths
fn common_ancestor(paths: &[&str]) -> Vec<String> {
    let mut dirs = paths.iter().map(|p| {
        let mut parts: Vec<&str> = p.split('/').collect();
        parts.pop();
        parts
    });
    let Some(mut common) = dirs.next() else {
        return Vec::new();
    };
    for parts in dirs {
        let shared = common
            .iter()
            .zip(&parts)
            .take_while(|(a, b)| a == b)
            .count();
        common.truncate(shared);
    }
    common.into_iter().map(str::to_string).collect()
}

fn dotted_module(path: &str, ancestor: &[String]) -> String {
    let parts: Vec<&str> = path.split('/').skip(ancestor.len()).collect();
    path_to_module_name(Path::new(&parts.join("/")))
}

/// First dotted component, or `root` for top-level modules
fn package_name(module: &str) -> &str {
    match module.split_once('.') {
        Some((head, _)) => head,
        None => "root",
    }
}

fn is_external(module: &str) -> bool {
    is_stdlib(module.split('.').next().unwrap_or(module))
}

/// Sanitize a string for use as a Mermaid node ID
fn clean_id(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Sanitize a class name for Mermaid class diagrams
fn sanitize_class_name(s: &str) -> String {
    bare_name(s)
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Mermaid writes generics as `~T~`
fn sanitize_type(t: &str) -> String {
    t.replace(['<', '>'], "~")
}

fn slug(s: &str) -> String {
    let mut out = String::new();
    for c in s.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}
