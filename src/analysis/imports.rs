// Import resolution
//
// Maps raw import statements onto files under the project root:
// - Python: dotted modules to `a/b.py` or `a/b/__init__.py`, relative levels
// - JS/TS: relative sources, then extensions, then `index` files
// - PHP: namespaces with PSR-4 style prefix dropping, literal require paths
//
// Anything that does not land on an existing file is dropped.

use crate::model::{Import, ImportKind, Language};
use std::path::{Component, Path, PathBuf};

/// Top-level Python standard library modules
const PYTHON_STDLIB: &[&str] = &[
    "abc", "argparse", "array", "ast", "asyncio", "atexit", "base64", "bisect",
    "builtins", "bz2", "calendar", "cmath", "codecs", "collections", "concurrent",
    "configparser", "contextlib", "contextvars", "copy", "csv", "ctypes",
    "dataclasses", "datetime", "decimal", "difflib", "dis", "email", "enum",
    "errno", "fnmatch", "fractions", "functools", "gc", "getpass", "gettext",
    "glob", "gzip", "hashlib", "heapq", "hmac", "html", "http", "importlib",
    "inspect", "io", "ipaddress", "itertools", "json", "keyword", "locale",
    "logging", "lzma", "math", "mimetypes", "multiprocessing", "numbers",
    "operator", "os", "pathlib", "pickle", "platform", "pprint", "queue",
    "random", "re", "secrets", "select", "shlex", "shutil", "signal", "socket",
    "sqlite3", "ssl", "stat", "statistics", "string", "struct", "subprocess",
    "sys", "tempfile", "textwrap", "threading", "time", "timeit", "tomllib",
    "traceback", "types", "typing", "typing_extensions", "unittest", "urllib",
    "uuid", "warnings", "weakref", "xml", "zipfile", "zlib", "__future__",
];

/// Check if a dotted module name belongs to the Python standard library
pub fn is_stdlib(module: &str) -> bool {
    let top_level = module.split('.').next().unwrap_or(module);
    PYTHON_STDLIB.contains(&top_level)
}

/// Classification of an import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportType {
    /// Python standard library module
    Stdlib,
    /// Resolved to a file under the project root
    Local,
    /// Not found under the root
    Unresolved,
}

/// Result of resolving an import
#[derive(Debug, Clone)]
pub struct ResolvedImport {
    pub import: Import,
    pub import_type: ImportType,
    /// Absolute path of the target file for local imports
    pub resolved_path: Option<PathBuf>,
}

/// Resolves imports of any supported language against one project root
pub struct ImportResolver {
    project_root: PathBuf,
    js_extensions: Vec<String>,
}

impl ImportResolver {
    pub fn new(project_root: PathBuf) -> Self {
        Self {
            project_root,
            js_extensions: Vec::new(),
        }
    }

    /// Extensions tried for extension-less JS/TS sources
    pub fn with_js_extensions(mut self, extensions: &[String]) -> Self {
        self.js_extensions = extensions.to_vec();
        self
    }

    pub fn root(&self) -> &Path {
        &self.project_root
    }

    /// Resolve one import written in `current_file`
    pub fn resolve(&self, language: Language, import: &Import, current_file: &Path) -> ResolvedImport {
        if language == Language::Python
            && !matches!(import.kind, ImportKind::Relative { .. })
            && is_stdlib(&import.module)
        {
            return ResolvedImport {
                import: import.clone(),
                import_type: ImportType::Stdlib,
                resolved_path: None,
            };
        }

        let resolved_path = match language {
            Language::Python => self.resolve_python(import, current_file),
            Language::JavaScript => self.resolve_js(import, current_file),
            Language::Php => self.resolve_php(import, current_file),
        }
        .filter(|p| p.starts_with(&self.project_root));

        ResolvedImport {
            import: import.clone(),
            import_type: if resolved_path.is_some() {
                ImportType::Local
            } else {
                ImportType::Unresolved
            },
            resolved_path,
        }
    }

    /// Resolve all imports of a file, keeping local ones only
    pub fn local_targets(&self, language: Language, imports: &[Import], current_file: &Path) -> Vec<PathBuf> {
        imports
            .iter()
            .map(|imp| self.resolve(language, imp, current_file))
            .filter(|r| r.import_type == ImportType::Local)
            .filter_map(|r| r.resolved_path)
            .collect()
    }

    fn resolve_python(&self, import: &Import, current_file: &Path) -> Option<PathBuf> {
        match import.kind {
            ImportKind::Relative { level } => {
                // level 1 is the current package
                let mut base_dir = current_file.parent()?.to_path_buf();
                for _ in 1..level {
                    base_dir = base_dir.parent()?.to_path_buf();
                }

                if import.module.is_empty() {
                    // `from . import x` may name sibling modules
                    import
                        .names
                        .iter()
                        .find_map(|n| find_module_file(&base_dir.join(&n.name)))
                        .or_else(|| find_module_file(&base_dir))
                } else {
                    find_module_file(&base_dir.join(import.module.replace('.', "/")))
                }
            }
            _ => {
                let module_path = self.project_root.join(import.module.replace('.', "/"));
                find_module_file(&module_path)
            }
        }
    }

    fn resolve_js(&self, import: &Import, current_file: &Path) -> Option<PathBuf> {
        let source = import.module.as_str();
        if !source.starts_with('.') {
            return None;
        }

        let base = normalize(&current_file.parent()?.join(source));
        if base.is_file() {
            return Some(base);
        }

        let base_str = base.to_string_lossy();
        for ext in &self.js_extensions {
            let candidate = PathBuf::from(format!("{}{}", base_str, ext));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        for ext in &self.js_extensions {
            let candidate = base.join(format!("index{}", ext));
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        None
    }

    fn resolve_php(&self, import: &Import, current_file: &Path) -> Option<PathBuf> {
        match import.kind {
            ImportKind::Path => {
                let relative = current_file.parent().map(|dir| normalize(&dir.join(&import.module)));
                relative
                    .filter(|p| p.is_file())
                    .or_else(|| {
                        let from_root = normalize(&self.project_root.join(import.module.trim_start_matches('/')));
                        Some(from_root).filter(|p| p.is_file())
                    })
            }
            _ => {
                let segments: Vec<&str> = import
                    .module
                    .split('\\')
                    .filter(|s| !s.is_empty())
                    .collect();

                // App\Models\User -> App/Models/User.php, Models/User.php, User.php
                (0..segments.len()).find_map(|skip| {
                    let candidate = self
                        .project_root
                        .join(format!("{}.php", segments[skip..].join("/")));
                    Some(candidate).filter(|p| p.is_file())
                })
            }
        }
    }
}

/// Find the actual file for a Python module path
fn find_module_file(module_path: &Path) -> Option<PathBuf> {
    let py_file = module_path.with_extension("py");
    if py_file.is_file() {
        return Some(py_file);
    }

    let init_file = module_path.join("__init__.py");
    if init_file.is_file() {
        return Some(init_file);
    }

    None
}

/// Lexically resolve `.` and `..` components
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImportedName;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/__init__.py");
        touch(dir.path(), "src/main.py");
        touch(dir.path(), "src/utils/__init__.py");
        touch(dir.path(), "src/utils/helpers.py");
        touch(dir.path(), "web/app.js");
        touch(dir.path(), "web/models/user.ts");
        touch(dir.path(), "web/components/index.tsx");
        touch(dir.path(), "app/Models/User.php");
        touch(dir.path(), "lib/helpers.php");
        dir
    }

    fn resolver(dir: &TempDir) -> ImportResolver {
        let exts: Vec<String> = [".js", ".jsx", ".ts", ".tsx"].iter().map(|s| s.to_string()).collect();
        ImportResolver::new(dir.path().to_path_buf()).with_js_extensions(&exts)
    }

    #[test]
    fn test_stdlib_detection() {
        assert!(is_stdlib("os"));
        assert!(is_stdlib("os.path"));
        assert!(is_stdlib("collections.abc"));
        assert!(!is_stdlib("numpy"));
        assert!(!is_stdlib("models"));
    }

    #[test]
    fn test_python_stdlib_import() {
        let dir = project();
        let resolved = resolver(&dir).resolve(
            Language::Python,
            &Import::simple("os", 1),
            &dir.path().join("src/main.py"),
        );
        assert_eq!(resolved.import_type, ImportType::Stdlib);
        assert!(resolved.resolved_path.is_none());
    }

    #[test]
    fn test_python_absolute_and_package() {
        let dir = project();
        let r = resolver(&dir);
        let from = dir.path().join("src/main.py");

        let module = r.resolve(Language::Python, &Import::simple("src.utils.helpers", 1), &from);
        assert_eq!(module.resolved_path, Some(dir.path().join("src/utils/helpers.py")));

        let package = r.resolve(Language::Python, &Import::simple("src.utils", 1), &from);
        assert_eq!(package.resolved_path, Some(dir.path().join("src/utils/__init__.py")));
    }

    #[test]
    fn test_python_relative() {
        let dir = project();
        let r = resolver(&dir);

        let import = Import::relative("utils", vec![ImportedName::new("helpers")], 1, 1);
        let resolved = r.resolve(Language::Python, &import, &dir.path().join("src/main.py"));
        assert_eq!(resolved.import_type, ImportType::Local);

        let sibling = Import::relative("", vec![ImportedName::new("main")], 2, 1);
        let resolved = r.resolve(
            Language::Python,
            &sibling,
            &dir.path().join("src/utils/helpers.py"),
        );
        assert_eq!(resolved.resolved_path, Some(dir.path().join("src/main.py")));
    }

    #[test]
    fn test_python_unknown_is_unresolved() {
        let dir = project();
        let resolved = resolver(&dir).resolve(
            Language::Python,
            &Import::simple("requests", 1),
            &dir.path().join("src/main.py"),
        );
        assert_eq!(resolved.import_type, ImportType::Unresolved);
    }

    #[test]
    fn test_js_extension_and_index() {
        let dir = project();
        let r = resolver(&dir);
        let from = dir.path().join("web/app.js");

        let user = r.resolve(Language::JavaScript, &Import::simple("./models/user", 1), &from);
        assert_eq!(user.resolved_path, Some(dir.path().join("web/models/user.ts")));

        let components = r.resolve(Language::JavaScript, &Import::simple("./components", 1), &from);
        assert_eq!(components.resolved_path, Some(dir.path().join("web/components/index.tsx")));

        let bare = r.resolve(Language::JavaScript, &Import::simple("react", 1), &from);
        assert_eq!(bare.import_type, ImportType::Unresolved);
    }

    #[test]
    fn test_js_parent_directory() {
        let dir = project();
        let resolved = resolver(&dir).resolve(
            Language::JavaScript,
            &Import::simple("../app.js", 1),
            &dir.path().join("web/models/user.ts"),
        );
        assert_eq!(resolved.resolved_path, Some(dir.path().join("web/app.js")));
    }

    #[test]
    fn test_php_namespace_prefix_dropping() {
        let dir = project();
        let resolved = resolver(&dir).resolve(
            Language::Php,
            &Import::simple("Vendor\\app\\Models\\User", 1),
            &dir.path().join("index.php"),
        );
        assert_eq!(resolved.resolved_path, Some(dir.path().join("app/Models/User.php")));
    }

    #[test]
    fn test_php_require_paths() {
        let dir = project();
        let r = resolver(&dir);

        let relative = r.resolve(
            Language::Php,
            &Import::path("../lib/helpers.php", 1),
            &dir.path().join("app/index.php"),
        );
        assert_eq!(relative.resolved_path, Some(dir.path().join("lib/helpers.php")));

        let from_root = r.resolve(
            Language::Php,
            &Import::path("lib/helpers.php", 1),
            &dir.path().join("app/Models/User.php"),
        );
        assert_eq!(from_root.resolved_path, Some(dir.path().join("lib/helpers.php")));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
    }
}
