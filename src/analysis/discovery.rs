// Source file discovery
//
// Directory exclusion compares whole path segments, so excluding `tests`
// prunes `pkg/tests/` at any depth but keeps a root-level `tests.py`.
// File exclusion matches globs against the basename only.

use crate::config::LanguageScope;
use crate::error::Result;
use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Walks a project root and yields files for one language at a time
pub struct FileDiscovery {
    root: PathBuf,
    exclude_dirs: Vec<String>,
    exclude_files: Vec<Pattern>,
}

impl FileDiscovery {
    /// Build a discovery pass from shared exclusions
    pub fn new(root: &Path, exclude_dirs: &[String], exclude_files: &[String]) -> Result<Self> {
        let exclude_files = exclude_files
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            root: root.to_path_buf(),
            exclude_dirs: exclude_dirs.to_vec(),
            exclude_files,
        })
    }

    /// Files under the root carrying one of the scope's extensions, sorted
    pub fn discover(&self, scope: LanguageScope<'_>) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded_dir(e, scope.exclude_dirs));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !has_extension(path, scope.extensions) || self.is_excluded_file(path) {
                continue;
            }

            files.push(path.to_path_buf());
        }

        Ok(files)
    }

    fn is_excluded_dir(&self, entry: &DirEntry, language_dirs: &[String]) -> bool {
        if !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        self.exclude_dirs
            .iter()
            .chain(language_dirs)
            .any(|d| d.as_str() == name)
    }

    fn is_excluded_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.exclude_files.iter().any(|p| p.matches(name))
    }
}

/// Check a file name against dotted extensions such as `.py`
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|ext| name.len() > ext.len() && name.ends_with(ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_segment_exclusion_keeps_similar_names() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "tests.py");
        touch(dir.path(), "app/tests/test_models.py");
        touch(dir.path(), "tests/test_root.py");
        touch(dir.path(), "app/mytests/helper.py");
        touch(dir.path(), "app/models.py");

        let config = Config::default();
        let discovery = FileDiscovery::new(dir.path(), &["tests".to_string()], &[]).unwrap();
        let files = discovery.discover(config.python.scope()).unwrap();

        assert_eq!(
            relative(dir.path(), &files),
            vec!["app/models.py", "app/mytests/helper.py", "tests.py"]
        );
    }

    #[test]
    fn test_language_default_dirs_are_pruned() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "main.py");
        touch(dir.path(), "__pycache__/main.py");
        touch(dir.path(), "venv/lib/site.py");

        let config = Config::default();
        let discovery = FileDiscovery::new(dir.path(), &[], &[]).unwrap();
        let files = discovery.discover(config.python.scope()).unwrap();
        assert_eq!(relative(dir.path(), &files), vec!["main.py"]);
    }

    #[test]
    fn test_file_globs_match_basename() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/user.php");
        touch(dir.path(), "src/user_test.php");
        touch(dir.path(), "src/readme.md");

        let config = Config::default();
        let discovery =
            FileDiscovery::new(dir.path(), &[], &["*_test.php".to_string()]).unwrap();
        let files = discovery.discover(config.php.scope()).unwrap();
        assert_eq!(relative(dir.path(), &files), vec!["src/user.php"]);
    }

    #[test]
    fn test_missing_root_is_error() {
        let config = Config::default();
        let discovery = FileDiscovery::new(Path::new("/nonexistent/archscribe-root"), &[], &[]).unwrap();
        assert!(discovery.discover(config.python.scope()).is_err());
    }

    #[test]
    fn test_has_extension() {
        let exts = vec![".ts".to_string(), ".tsx".to_string()];
        assert!(has_extension(Path::new("a/b.ts"), &exts));
        assert!(has_extension(Path::new("b.tsx"), &exts));
        assert!(!has_extension(Path::new("b.js"), &exts));
        assert!(!has_extension(Path::new(".ts"), &exts));
    }
}
