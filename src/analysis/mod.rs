// Analysis pipeline: discovery, per-language drivers, unification and
// relationship detection

pub mod discovery;
pub mod driver;
pub mod imports;
pub mod relationships;
pub mod unify;

pub use discovery::FileDiscovery;
pub use driver::{LanguageDriver, ScanAccumulator};
pub use imports::{ImportResolver, ImportType, ResolvedImport};
pub use relationships::RelationshipDetector;

use crate::config::{Config, LanguageScope};
use crate::error::{Error, Result};
use crate::model::{Language, ProjectModel};
use crate::parser::{Frontend, JavaScriptParser, PhpParser, PythonParser};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Builds a fresh [`ProjectModel`] for a source tree
pub struct ProjectScanner {
    config: Config,
    verbose: bool,
}

impl ProjectScanner {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            verbose: false,
        }
    }

    /// Show a progress bar while parsing
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scan a root directory. Only an unreadable root is fatal; individual
    /// files and whole front-ends fail soft.
    pub fn scan(&self, root: &Path) -> Result<ProjectModel> {
        let root = root
            .canonicalize()
            .map_err(|_| Error::PathNotFound(root.to_path_buf()))?;
        if !root.is_dir() {
            return Err(Error::PathNotFound(root));
        }

        let discovery = FileDiscovery::new(
            &root,
            &self.config.scan.exclude_dirs,
            &self.config.scan.exclude_files,
        )?;
        let resolver = ImportResolver::new(root.clone())
            .with_js_extensions(&self.config.javascript.extensions);

        // Discover everything first so the progress bar knows its length
        let mut plan: Vec<(Box<dyn Frontend>, Vec<PathBuf>)> = Vec::new();
        for language in [Language::Python, Language::Php, Language::JavaScript] {
            let Some(scope) = self.scope(language) else {
                continue;
            };
            let files = discovery.discover(scope)?;
            if files.is_empty() {
                continue;
            }
            match self.frontend(language) {
                Ok(frontend) => plan.push((frontend, files)),
                Err(e) => warn!(
                    "{} front-end disabled, skipping {} files: {}",
                    language,
                    files.len(),
                    e
                ),
            }
        }

        let total: usize = plan.iter().map(|(_, files)| files.len()).sum();
        let progress = self.verbose.then(|| {
            let pb = ProgressBar::new(total as u64);
            if let Ok(style) =
                ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        });

        let driver = LanguageDriver::new(&root, &resolver);
        let mut acc = ScanAccumulator::new();
        for (mut frontend, files) in plan {
            driver.run(frontend.as_mut(), &files, progress.as_ref(), &mut acc);
        }
        if let Some(pb) = progress {
            pb.finish_with_message("Parsing complete");
        }

        driver::structural_dependencies(&mut acc);
        let relationships = RelationshipDetector::new(&self.config).detect(&acc.classes);

        info!(
            "Scanned {} files: {} classes, {} functions, {} failures",
            acc.units.len() + acc.failures.len(),
            acc.classes.len(),
            acc.functions.len(),
            acc.failures.len()
        );

        Ok(ProjectModel {
            classes: acc.classes,
            functions: acc.functions,
            dependencies: acc.dependencies,
            modules: None,
            relationships: Some(relationships),
            flows: None,
            units: acc.units,
            parse_failures: acc.failures,
        })
    }

    fn scope(&self, language: Language) -> Option<LanguageScope<'_>> {
        match language {
            Language::Python if self.config.python.enabled => Some(self.config.python.scope()),
            Language::Php if self.config.php.enabled => Some(self.config.php.scope()),
            Language::JavaScript if self.config.javascript.enabled => {
                Some(self.config.javascript.scope())
            }
            _ => None,
        }
    }

    fn frontend(&self, language: Language) -> Result<Box<dyn Frontend>> {
        let frontend: Box<dyn Frontend> = match language {
            Language::Python => Box::new(PythonParser::new()?),
            Language::Php => Box::new(PhpParser::new()?),
            Language::JavaScript => Box::new(JavaScriptParser::from_config(&self.config.javascript)?),
        };
        Ok(frontend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, source: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, source).unwrap();
    }

    fn offline_config() -> Config {
        let mut config = Config::default();
        config.javascript.runtime = "archscribe-no-such-runtime".to_string();
        config
    }

    #[test]
    fn test_missing_root() {
        let scanner = ProjectScanner::new(Config::default());
        let err = scanner.scan(Path::new("/nonexistent/archscribe")).unwrap_err();
        assert!(matches!(err, Error::PathNotFound(_)));
    }

    #[test]
    fn test_mixed_project_scan() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "py/base.py", "class Base:\n    pass\n");
        write(dir.path(), "py/child.py", "from .base import Base\n\nclass Child(Base):\n    pass\n");
        write(
            dir.path(),
            "php/Greeter.php",
            "<?php\ntrait Greets {}\nclass Greeter { use Greets; }\n",
        );

        let model = ProjectScanner::new(offline_config()).scan(dir.path()).unwrap();
        let names: Vec<_> = model.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Base", "Child", "Greets", "Greeter"]);
        assert_eq!(model.units.len(), 3);

        let relationships = model.relationships.unwrap();
        assert_eq!(relationships.len(), 2);
        assert!(model
            .dependencies
            .iter()
            .any(|d| d.source == "py/child.py" && d.target == "py/base.py"));
    }

    #[test]
    fn test_unavailable_js_toolchain_disables_front_end() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "app.js", "class App {}\n");
        write(dir.path(), "main.py", "class Main:\n    pass\n");

        let model = ProjectScanner::new(offline_config()).scan(dir.path()).unwrap();
        assert_eq!(model.classes.len(), 1);
        assert!(model.parse_failures.is_empty());
    }

    #[test]
    fn test_disabled_language_is_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "main.py", "class Main:\n    pass\n");

        let mut config = offline_config();
        config.python.enabled = false;
        let model = ProjectScanner::new(config).scan(dir.path()).unwrap();
        assert!(model.classes.is_empty());
    }
}
