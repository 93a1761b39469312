// Diagram index: what was drawn, where it lives, and which entities it shows

use crate::error::Result;
use crate::output::diagrams::{DiagramDescriptor, DiagramKind};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.md.tera");

/// One indexed diagram
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    pub name: String,
    /// Relative to the `diagrams` directory
    pub path: String,
    pub entities: Vec<String>,
}

#[derive(Serialize)]
struct Section<'a> {
    title: &'static str,
    entries: &'a [IndexEntry],
}

/// Navigation index over generated diagrams
#[derive(Debug, Clone)]
pub struct DiagramIndex {
    output_dir: PathBuf,
    class_diagrams: Vec<IndexEntry>,
    module_diagrams: Vec<IndexEntry>,
    sequence_diagrams: Vec<IndexEntry>,
}

impl DiagramIndex {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            class_diagrams: Vec::new(),
            module_diagrams: Vec::new(),
            sequence_diagrams: Vec::new(),
        }
    }

    pub fn add_class_diagram(&mut self, name: &str, path: &str, classes: Vec<String>) {
        self.class_diagrams.push(entry(name, path, classes));
    }

    pub fn add_module_diagram(&mut self, name: &str, path: &str, modules: Vec<String>) {
        self.module_diagrams.push(entry(name, path, modules));
    }

    pub fn add_sequence_diagram(&mut self, name: &str, path: &str, flow: &str) {
        self.sequence_diagrams.push(entry(name, path, vec![flow.to_string()]));
    }

    /// Index a descriptor under its own file name
    pub fn add(&mut self, diagram: &DiagramDescriptor) {
        let path = diagram.file_name();
        match diagram.kind {
            DiagramKind::Class => self.add_class_diagram(&diagram.name, &path, diagram.entities.clone()),
            DiagramKind::Module => self.add_module_diagram(&diagram.name, &path, diagram.entities.clone()),
            DiagramKind::Sequence => {
                let flow = diagram.name.strip_prefix("Sequence: ").unwrap_or(&diagram.name);
                self.add_sequence_diagram(&diagram.name, &path, flow);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.class_diagrams.len() + self.module_diagrams.len() + self.sequence_diagrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Diagrams that draw the given class, module or flow
    pub fn diagrams_for(&self, entity: &str) -> Vec<&IndexEntry> {
        self.class_diagrams
            .iter()
            .chain(&self.module_diagrams)
            .chain(&self.sequence_diagrams)
            .filter(|e| e.entities.iter().any(|n| n == entity))
            .collect()
    }

    /// Render the Markdown index; empty sections are left out
    pub fn render(&self) -> Result<String> {
        let sections: Vec<Section> = [
            ("Class Diagrams", &self.class_diagrams),
            ("Module Diagrams", &self.module_diagrams),
            ("Sequence Diagrams", &self.sequence_diagrams),
        ]
        .into_iter()
        .filter(|(_, entries)| !entries.is_empty())
        .map(|(title, entries)| Section {
            title,
            entries: entries.as_slice(),
        })
        .collect();

        let mut tera = Tera::default();
        tera.add_raw_template("index.md", INDEX_TEMPLATE)?;
        let mut context = Context::new();
        context.insert("sections", &sections);
        Ok(tera.render("index.md", &context)?)
    }

    /// Write `diagrams/index.md` under the output directory
    pub fn save(&self) -> Result<PathBuf> {
        let dir = self.output_dir.join("diagrams");
        fs::create_dir_all(&dir)?;
        let path = dir.join("index.md");
        fs::write(&path, self.render()?)?;
        Ok(path)
    }
}

fn entry(name: &str, path: &str, entities: Vec<String>) -> IndexEntry {
    IndexEntry {
        name: name.to_string(),
        path: path.to_string(),
        entities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(dir: &Path) -> DiagramIndex {
        let mut index = DiagramIndex::new(dir);
        index.add_class_diagram("Class Overview", "class-overview.md", vec!["User".into(), "Order".into()]);
        index.add_class_diagram("Classes: shop", "class-shop.md", vec!["Order".into()]);
        index.add_sequence_diagram("Sequence: login", "sequence-login.md", "login");
        index
    }

    #[test]
    fn test_render_skips_empty_sections() {
        let dir = TempDir::new().unwrap();
        let markdown = sample(dir.path()).render().unwrap();
        assert_eq!(
            markdown,
            "# Diagram Index\n\n## Class Diagrams\n\n- [Class Overview](class-overview.md)\n- [Classes: shop](class-shop.md)\n\n## Sequence Diagrams\n\n- [Sequence: login](sequence-login.md)\n\n"
        );
        assert!(!markdown.contains("Module Diagrams"));
    }

    #[test]
    fn test_lookup_by_entity() {
        let dir = TempDir::new().unwrap();
        let index = sample(dir.path());
        let names: Vec<_> = index.diagrams_for("Order").iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Class Overview", "Classes: shop"]);
        assert_eq!(index.diagrams_for("login").len(), 1);
        assert!(index.diagrams_for("Missing").is_empty());
    }

    #[test]
    fn test_add_descriptor() {
        let dir = TempDir::new().unwrap();
        let mut index = DiagramIndex::new(dir.path());
        index.add(&DiagramDescriptor::new(
            "module-dependencies".into(),
            DiagramKind::Module,
            "Module Dependencies".into(),
            vec!["app.main".into()],
            String::new(),
        ));
        index.add(&DiagramDescriptor::new(
            "sequence-checkout".into(),
            DiagramKind::Sequence,
            "Sequence: checkout".into(),
            vec!["User".into()],
            String::new(),
        ));
        assert_eq!(index.len(), 2);
        assert_eq!(index.diagrams_for("app.main")[0].path, "module-dependencies.md");
        assert_eq!(index.diagrams_for("checkout").len(), 1);

        index.add(&DiagramDescriptor::new(
            "sequence-user-login-2".into(),
            DiagramKind::Sequence,
            "Sequence: user-login".into(),
            Vec::new(),
            String::new(),
        ));
        assert_eq!(index.diagrams_for("user-login")[0].path, "sequence-user-login-2.md");
    }

    #[test]
    fn test_save_writes_index() {
        let dir = TempDir::new().unwrap();
        let path = sample(dir.path()).save().unwrap();
        assert_eq!(path, dir.path().join("diagrams").join("index.md"));
        assert!(fs::read_to_string(path).unwrap().starts_with("# Diagram Index"));
    }
}
