// JavaScript/TypeScript front-end backed by an external JS runtime

use crate::config::JavaScriptConfig;
use crate::error::{Error, Result};
use crate::model::Language;
use crate::parser::ast::*;
use crate::parser::js_document::JsDocument;
use crate::parser::{Frontend, ParseOutcome};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;
use tracing::{debug, info};
use wait_timeout::ChildExt;

const PARSER_SCRIPT: &str = include_str!("../../scripts/js_parser.js");
const PARSER_PACKAGE: &str = include_str!("../../scripts/package.json");

const SCRIPT_NAME: &str = "js_parser.js";
const PACKAGE_NAME: &str = "package.json";

/// Node modules the script needs at runtime
const REQUIRED_MODULES: [&str; 2] = ["@babel/parser", "@babel/traverse"];

/// Check whether a path has a TypeScript extension
pub fn is_typescript_path(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("ts" | "tsx" | "mts" | "cts")
    )
}

/// A verified JS runtime plus an installed parser directory
#[derive(Debug, Clone)]
pub struct JsToolchain {
    runtime: PathBuf,
    parser_dir: PathBuf,
}

impl JsToolchain {
    /// Locate the runtime, materialise the parser script and make sure its
    /// dependencies resolve, installing them when allowed.
    pub fn probe(config: &JavaScriptConfig) -> Result<Self> {
        let probe_timeout = Duration::from_secs(config.probe_timeout_secs);

        let runtime = which::which(&config.runtime).map_err(|e| {
            Error::toolchain(format!("{} not found on PATH: {}", config.runtime, e))
        })?;

        let mut version = Command::new(&runtime);
        version.arg("--version");
        let (status, stdout) = run_bounded(version, probe_timeout, true)?;
        if !status.success() {
            return Err(Error::toolchain(format!(
                "{} --version exited with {}",
                config.runtime, status
            )));
        }
        debug!("JS runtime {} {}", runtime.display(), stdout.trim());

        let parser_dir = config.resolved_parser_dir();
        materialize(&parser_dir)?;

        let toolchain = Self { runtime, parser_dir };
        if toolchain.modules_resolvable(probe_timeout)? {
            return Ok(toolchain);
        }

        if !config.auto_install {
            return Err(Error::toolchain(format!(
                "parser dependencies missing in {} and auto_install is off",
                toolchain.parser_dir.display()
            )));
        }

        toolchain.install(config)?;
        if toolchain.modules_resolvable(probe_timeout)? {
            Ok(toolchain)
        } else {
            Err(Error::toolchain(format!(
                "parser dependencies still unresolved after install in {}",
                toolchain.parser_dir.display()
            )))
        }
    }

    pub fn runtime(&self) -> &Path {
        &self.runtime
    }

    pub fn script(&self) -> PathBuf {
        self.parser_dir.join(SCRIPT_NAME)
    }

    fn modules_resolvable(&self, timeout: Duration) -> Result<bool> {
        let check: String = REQUIRED_MODULES
            .iter()
            .map(|m| format!("require.resolve('{}');", m))
            .collect();

        let mut cmd = Command::new(&self.runtime);
        cmd.arg("-e").arg(check).current_dir(&self.parser_dir);
        let (status, _) = run_bounded(cmd, timeout, false)?;
        Ok(status.success())
    }

    fn install(&self, config: &JavaScriptConfig) -> Result<()> {
        let manager = which::which(&config.package_manager).map_err(|e| {
            Error::toolchain(format!(
                "{} not found on PATH: {}",
                config.package_manager, e
            ))
        })?;

        info!(
            "Installing JS parser dependencies with {} in {}",
            config.package_manager,
            self.parser_dir.display()
        );

        let mut cmd = Command::new(manager);
        cmd.arg("install").current_dir(&self.parser_dir);
        let (status, _) = run_bounded(
            cmd,
            Duration::from_secs(config.install_timeout_secs),
            false,
        )?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::toolchain(format!(
                "{} install exited with {}",
                config.package_manager, status
            )))
        }
    }

    /// Run the parser script on one file. No timeout applies here.
    pub fn parse_file(&self, path: &Path, typescript: bool) -> Result<JsDocument> {
        let mut cmd = Command::new(&self.runtime);
        cmd.arg(self.script()).arg(path);
        if typescript {
            cmd.arg("--typescript");
        }

        let output = cmd.stdin(Stdio::null()).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.lines().next().unwrap_or("parser exited with an error");
            return Err(Error::parse(path, reason.trim()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        JsDocument::from_json(&stdout)
            .map_err(|e| Error::parse(path, format!("malformed parser output: {}", e)))
    }
}

/// Write the bundled script and manifest, leaving identical files untouched
fn materialize(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    for (name, contents) in [(SCRIPT_NAME, PARSER_SCRIPT), (PACKAGE_NAME, PARSER_PACKAGE)] {
        let target = dir.join(name);
        let current = fs::read_to_string(&target).ok();
        if current.as_deref() != Some(contents) {
            fs::write(&target, contents)?;
        }
    }
    Ok(())
}

/// Spawn a command and wait at most `timeout` for it, killing it on expiry
fn run_bounded(mut cmd: Command, timeout: Duration, capture: bool) -> Result<(ExitStatus, String)> {
    cmd.stdin(Stdio::null()).stderr(Stdio::null());
    cmd.stdout(if capture { Stdio::piped() } else { Stdio::null() });

    let program = cmd.get_program().to_string_lossy().into_owned();
    let mut child = cmd.spawn()?;

    match child.wait_timeout(timeout)? {
        Some(status) => {
            let mut stdout = String::new();
            if let Some(mut out) = child.stdout.take() {
                out.read_to_string(&mut stdout).ok();
            }
            Ok((status, stdout))
        }
        None => {
            let _ = child.kill();
            let _ = child.wait();
            Err(Error::toolchain(format!(
                "{} timed out after {:?}",
                program, timeout
            )))
        }
    }
}

/// JS/TS front-end
pub struct JavaScriptParser {
    toolchain: JsToolchain,
}

impl JavaScriptParser {
    pub fn new(toolchain: JsToolchain) -> Self {
        Self { toolchain }
    }

    /// Probe the toolchain described by the config
    pub fn from_config(config: &JavaScriptConfig) -> Result<Self> {
        Ok(Self::new(JsToolchain::probe(config)?))
    }

    /// Wrap a decoded document as a syntax fragment
    pub fn fragment(path: &Path, document: JsDocument) -> JsFile {
        JsFile {
            path: path.to_path_buf(),
            is_typescript: is_typescript_path(path),
            imports: document.model_imports(),
            document,
        }
    }
}

impl Frontend for JavaScriptParser {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn parse(&mut self, path: &Path) -> ParseOutcome {
        let document = self.toolchain.parse_file(path, is_typescript_path(path))?;
        Ok(SyntaxFragment::Js(Self::fragment(path, document)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_typescript_detection() {
        assert!(is_typescript_path(Path::new("src/app.ts")));
        assert!(is_typescript_path(Path::new("src/App.TSX")));
        assert!(!is_typescript_path(Path::new("src/app.js")));
        assert!(!is_typescript_path(Path::new("src/app.jsx")));
        assert!(!is_typescript_path(Path::new("Makefile")));
    }

    #[test]
    fn test_materialize_writes_bundled_files() {
        let dir = TempDir::new().unwrap();
        let parser_dir = dir.path().join("nested").join("js-parser");

        materialize(&parser_dir).unwrap();
        let script = fs::read_to_string(parser_dir.join(SCRIPT_NAME)).unwrap();
        assert!(script.contains("@babel/parser"));
        let manifest = fs::read_to_string(parser_dir.join(PACKAGE_NAME)).unwrap();
        assert!(manifest.contains("@babel/traverse"));

        // second call is a no-op
        materialize(&parser_dir).unwrap();
    }

    #[test]
    fn test_probe_missing_runtime() {
        let dir = TempDir::new().unwrap();
        let config = JavaScriptConfig {
            runtime: "archscribe-no-such-runtime".to_string(),
            parser_dir: Some(dir.path().to_path_buf()),
            ..JavaScriptConfig::default()
        };
        let err = JsToolchain::probe(&config).unwrap_err();
        assert!(matches!(err, Error::Toolchain(_)));
    }

    #[test]
    fn test_fragment_lifts_imports() {
        let doc = JsDocument::from_json(
            r#"{"imports": [{"source": "./models/user", "line": 1,
                 "specifiers": [{"kind": "named", "local": "User", "imported": "User"}]}]}"#,
        )
        .unwrap();
        let file = JavaScriptParser::fragment(Path::new("src/service.ts"), doc);
        assert!(file.is_typescript);
        assert_eq!(file.imports.len(), 1);
        assert_eq!(file.imports[0].module, "./models/user");
    }
}
