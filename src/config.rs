use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "archscribe.toml";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub project: ProjectConfig,
    pub scan: ScanConfig,
    pub python: PythonConfig,
    pub php: PhpConfig,
    pub javascript: JavaScriptConfig,
    pub diagrams: DiagramConfig,
    pub output: OutputConfig,
}

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    pub description: Option<String>,
}

/// Exclusions shared by every language driver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory names; a file is skipped when any path segment equals one of these
    pub exclude_dirs: Vec<String>,
    /// Globs matched against the file basename
    pub exclude_files: Vec<String>,
}

/// Python discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonConfig {
    pub enabled: bool,
    pub extensions: Vec<String>,
    pub exclude_dirs: Vec<String>,
}

/// PHP discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhpConfig {
    pub enabled: bool,
    pub extensions: Vec<String>,
    pub exclude_dirs: Vec<String>,
}

/// Borrowed view of one language's discovery settings
#[derive(Debug, Clone, Copy)]
pub struct LanguageScope<'a> {
    pub extensions: &'a [String],
    pub exclude_dirs: &'a [String],
}

/// JS/TS discovery plus the external toolchain used to parse it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JavaScriptConfig {
    pub enabled: bool,
    pub extensions: Vec<String>,
    pub exclude_dirs: Vec<String>,
    pub runtime: String,
    pub package_manager: String,
    pub parser_dir: Option<PathBuf>,
    pub auto_install: bool,
    pub probe_timeout_secs: u64,
    pub install_timeout_secs: u64,
}

/// Diagram settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    pub enabled: bool,
    /// Class count above which class diagrams are partitioned
    pub max_classes: usize,
    pub max_methods: usize,
    pub include_private: bool,
    pub include_external: bool,
    pub direction: String,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub write_model: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "Untitled Project".to_string(),
            description: None,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extensions: strings(&[".py"]),
            exclude_dirs: strings(&[
                "__pycache__",
                ".git",
                "venv",
                ".venv",
                ".tox",
                ".eggs",
                "node_modules",
            ]),
        }
    }
}

impl PythonConfig {
    pub fn scope(&self) -> LanguageScope<'_> {
        LanguageScope {
            extensions: &self.extensions,
            exclude_dirs: &self.exclude_dirs,
        }
    }
}

impl Default for PhpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extensions: strings(&[".php"]),
            exclude_dirs: strings(&["vendor", "node_modules", ".git"]),
        }
    }
}

impl PhpConfig {
    pub fn scope(&self) -> LanguageScope<'_> {
        LanguageScope {
            extensions: &self.extensions,
            exclude_dirs: &self.exclude_dirs,
        }
    }
}

impl Default for JavaScriptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extensions: strings(&[".js", ".jsx", ".ts", ".tsx"]),
            exclude_dirs: strings(&["node_modules", "dist", "build", "coverage", ".git"]),
            runtime: "node".to_string(),
            package_manager: "npm".to_string(),
            parser_dir: None,
            auto_install: true,
            probe_timeout_secs: 2,
            install_timeout_secs: 300,
        }
    }
}

impl JavaScriptConfig {
    pub fn scope(&self) -> LanguageScope<'_> {
        LanguageScope {
            extensions: &self.extensions,
            exclude_dirs: &self.exclude_dirs,
        }
    }

    /// Where the bundled parser script lives; falls back to the user cache dir
    pub fn resolved_parser_dir(&self) -> PathBuf {
        if let Some(dir) = &self.parser_dir {
            return dir.clone();
        }
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("archscribe")
            .join("js-parser")
    }
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_classes: 20,
            max_methods: 5,
            include_private: false,
            include_external: false,
            direction: "TD".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./archscribe-docs"),
            write_model: true,
        }
    }
}

/// Overrides collected from the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub output: Option<PathBuf>,
    pub exclude_dirs: Vec<String>,
    pub exclude_files: Vec<String>,
    pub max_classes: Option<usize>,
    pub max_methods: Option<usize>,
    pub include_private: bool,
    pub include_external: bool,
    pub no_diagrams: bool,
    pub no_python: bool,
    pub no_php: bool,
    pub no_javascript: bool,
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file, or return defaults when the file is missing
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Merge CLI arguments into config (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: CliOverrides) {
        if let Some(out) = cli.output {
            self.output.directory = out;
        }
        self.scan.exclude_dirs.extend(cli.exclude_dirs);
        self.scan.exclude_files.extend(cli.exclude_files);

        if let Some(n) = cli.max_classes {
            self.diagrams.max_classes = n;
        }
        if let Some(n) = cli.max_methods {
            self.diagrams.max_methods = n;
        }
        if cli.include_private {
            self.diagrams.include_private = true;
        }
        if cli.include_external {
            self.diagrams.include_external = true;
        }
        if cli.no_diagrams {
            self.diagrams.enabled = false;
        }
        if cli.no_python {
            self.python.enabled = false;
        }
        if cli.no_php {
            self.php.enabled = false;
        }
        if cli.no_javascript {
            self.javascript.enabled = false;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.diagrams.max_classes == 0 {
            return Err(Error::config_validation("diagram max_classes must be at least 1"));
        }

        if self.javascript.probe_timeout_secs == 0 {
            return Err(Error::config_validation(
                "javascript probe_timeout_secs must be at least 1",
            ));
        }

        let extensions = self
            .python
            .extensions
            .iter()
            .chain(&self.php.extensions)
            .chain(&self.javascript.extensions);
        for ext in extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(Error::config_validation(format!(
                    "extension '{}' must start with a dot",
                    ext
                )));
            }
        }

        for pattern in &self.scan.exclude_files {
            glob::Pattern::new(pattern)?;
        }

        Ok(())
    }
}
