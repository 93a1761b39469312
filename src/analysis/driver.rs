// Per-language project drivers
//
// A driver pushes each discovered file through one front-end, records the
// outcome, and turns resolved imports into file-level dependency edges.
// Failures stay per file: they are logged once and recorded, never raised.

use crate::analysis::imports::ImportResolver;
use crate::analysis::unify::unify;
use crate::model::*;
use crate::parser::Frontend;
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Everything accumulated over one scan
#[derive(Debug, Default)]
pub struct ScanAccumulator {
    pub units: Vec<SourceUnit>,
    pub classes: Vec<CodeClass>,
    pub functions: Vec<CodeFunction>,
    pub dependencies: Vec<DependencyEdge>,
    pub failures: Vec<ParseFailure>,
    seen_edges: HashSet<(String, String, DependencyKind)>,
}

impl ScanAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file dependency; self edges and duplicates are dropped
    pub fn add_dependency(&mut self, source: &str, target: &str, kind: DependencyKind) {
        if source == target {
            return;
        }
        if self
            .seen_edges
            .insert((source.to_string(), target.to_string(), kind))
        {
            self.dependencies.push(DependencyEdge {
                source: source.to_string(),
                target: target.to_string(),
                kind,
            });
        }
    }
}

/// Path relative to the root with forward slashes
pub fn relative_path(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

/// Display form of a relative path used in dependency edges
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Drives one language's files through its front-end
pub struct LanguageDriver<'a> {
    root: &'a Path,
    resolver: &'a ImportResolver,
}

impl<'a> LanguageDriver<'a> {
    pub fn new(root: &'a Path, resolver: &'a ImportResolver) -> Self {
        Self { root, resolver }
    }

    /// Parse every file, in order, into the accumulator
    pub fn run(
        &self,
        frontend: &mut dyn Frontend,
        files: &[PathBuf],
        progress: Option<&ProgressBar>,
        acc: &mut ScanAccumulator,
    ) {
        let language = frontend.language();
        debug!("Driving {} {} files", files.len(), language);

        for file in files {
            let rel = relative_path(self.root, file);
            if let Some(pb) = progress {
                pb.set_message(path_key(&rel));
            }

            match frontend.parse(file) {
                Ok(fragment) => {
                    let imports = fragment.imports().to_vec();
                    for entity in unify(&fragment, &rel) {
                        match entity {
                            UnifiedEntity::Class(c) => acc.classes.push(c),
                            UnifiedEntity::Function(f) => acc.functions.push(f),
                        }
                    }

                    let source = path_key(&rel);
                    for target in self.resolver.local_targets(language, &imports, file) {
                        let target = path_key(&relative_path(self.root, &target));
                        acc.add_dependency(&source, &target, DependencyKind::Import);
                    }

                    acc.units.push(SourceUnit {
                        path: rel,
                        language,
                        imports,
                    });
                }
                Err(e) => {
                    warn!("Skipping {}: {}", rel.display(), e);
                    acc.failures.push(ParseFailure {
                        path: rel,
                        reason: e.to_string(),
                    });
                }
            }

            if let Some(pb) = progress {
                pb.inc(1);
            }
        }
    }
}

/// Add `inherit` and `uses` edges for references that resolve to a class
/// declared in another file
pub fn structural_dependencies(acc: &mut ScanAccumulator) {
    let mut pending = Vec::new();

    for class in &acc.classes {
        let source = path_key(&class.file_path);
        let edges = class
            .base_classes
            .iter()
            .map(|b| (b, DependencyKind::Inherit))
            .chain(class.extension.uses.iter().map(|t| (t, DependencyKind::Uses)));

        for (reference, kind) in edges {
            let name = bare_name(reference);
            let target = acc.classes.iter().find(|c| {
                c.name == name
                    && c.file_path != class.file_path
                    && (kind != DependencyKind::Uses || c.kind == ClassKind::Trait)
            });
            match target {
                Some(t) => pending.push((source.clone(), path_key(&t.file_path), kind)),
                None => debug!("Unresolved reference {} in {}", reference, source),
            }
        }
    }

    for (source, target, kind) in pending {
        acc.add_dependency(&source, &target, kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::parser::{ParseOutcome, PythonParser};
    use std::fs;
    use tempfile::TempDir;

    /// Front-end that fails on files whose name contains "broken"
    struct Flaky(PythonParser);

    impl Frontend for Flaky {
        fn language(&self) -> Language {
            Language::Python
        }

        fn parse(&mut self, path: &Path) -> ParseOutcome {
            if path.to_string_lossy().contains("broken") {
                return Err(Error::parse(path, "simulated failure"));
            }
            self.0.parse(path)
        }
    }

    fn write(root: &Path, rel: &str, source: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, source).unwrap();
        path
    }

    #[test]
    fn test_driver_collects_classes_and_imports() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let base = write(root, "base.py", "class BaseClass:\n    pass\n");
        let child = write(
            root,
            "child.py",
            "from base import BaseClass\n\nclass ChildClass(BaseClass):\n    pass\n",
        );

        let resolver = ImportResolver::new(root.to_path_buf());
        let driver = LanguageDriver::new(root, &resolver);
        let mut parser = PythonParser::new().unwrap();
        let mut acc = ScanAccumulator::new();
        driver.run(&mut parser, &[base, child], None, &mut acc);

        assert_eq!(acc.classes.len(), 2);
        assert_eq!(acc.units.len(), 2);
        assert_eq!(acc.classes[1].file_path, PathBuf::from("child.py"));
        assert_eq!(
            acc.dependencies,
            vec![DependencyEdge {
                source: "child.py".to_string(),
                target: "base.py".to_string(),
                kind: DependencyKind::Import,
            }]
        );

        structural_dependencies(&mut acc);
        assert_eq!(acc.dependencies.len(), 2);
        assert_eq!(acc.dependencies[1].kind, DependencyKind::Inherit);
    }

    #[test]
    fn test_failures_are_isolated() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let good = write(root, "good.py", "class Good:\n    pass\n");
        let broken = write(root, "broken.py", "class Broken:\n    pass\n");
        let invalid = write(root, "invalid.py", "class (:\n");

        let resolver = ImportResolver::new(root.to_path_buf());
        let driver = LanguageDriver::new(root, &resolver);
        let mut frontend = Flaky(PythonParser::new().unwrap());
        let mut acc = ScanAccumulator::new();
        driver.run(&mut frontend, &[broken, good, invalid], None, &mut acc);

        assert_eq!(acc.classes.len(), 1);
        assert_eq!(acc.classes[0].name, "Good");
        let failed: Vec<_> = acc.failures.iter().map(|f| f.path.clone()).collect();
        assert_eq!(failed, vec![PathBuf::from("broken.py"), PathBuf::from("invalid.py")]);
        assert!(acc.failures[0].reason.contains("simulated failure"));
    }

    #[test]
    fn test_dependency_dedup() {
        let mut acc = ScanAccumulator::new();
        acc.add_dependency("a.py", "b.py", DependencyKind::Import);
        acc.add_dependency("a.py", "b.py", DependencyKind::Import);
        acc.add_dependency("a.py", "b.py", DependencyKind::Inherit);
        acc.add_dependency("a.py", "a.py", DependencyKind::Import);
        assert_eq!(acc.dependencies.len(), 2);
    }

    #[test]
    fn test_uses_edges_target_traits_only() {
        let mut acc = ScanAccumulator::new();
        let t = CodeClass::new("Loggable", Language::Php, PathBuf::from("src/Loggable.php"), 3)
            .with_kind(ClassKind::Trait);
        let mut c = CodeClass::new("Service", Language::Php, PathBuf::from("src/Service.php"), 5);
        c.extension.uses = vec!["Loggable".to_string(), "Missing".to_string()];
        acc.classes = vec![t, c];

        structural_dependencies(&mut acc);
        assert_eq!(
            acc.dependencies,
            vec![DependencyEdge {
                source: "src/Service.php".to_string(),
                target: "src/Loggable.php".to_string(),
                kind: DependencyKind::Uses,
            }]
        );
    }
}
