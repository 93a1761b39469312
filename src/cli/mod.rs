//! CLI module for Archscribe

mod args;

pub use args::{Args, Command};

use crate::analysis::ProjectScanner;
use crate::config::{CliOverrides, Config, DEFAULT_CONFIG_FILE};
use crate::error::{Error, Result};
use crate::model::{Flow, ProjectModel};
use crate::output::{DiagramGenerator, DiagramIndex};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run the CLI application
pub fn run() -> ExitCode {
    let args = Args::parse_args();
    init_tracing(args.command.verbose());

    match execute(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise warn, or debug when verbose
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn execute(args: Args) -> Result<()> {
    match args.command {
        Command::Analyze {
            path,
            output,
            config,
            exclude_dirs,
            exclude_files,
            flows,
            max_classes,
            max_methods,
            include_private,
            include_external,
            no_diagrams,
            no_python,
            no_php,
            no_javascript,
            json,
            verbose,
        } => {
            let config_path = config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            let mut cfg = Config::load_or_default(&config_path)?;
            cfg.merge_cli(CliOverrides {
                output,
                exclude_dirs,
                exclude_files,
                max_classes,
                max_methods,
                include_private,
                include_external,
                no_diagrams,
                no_python,
                no_php,
                no_javascript,
            });
            cfg.validate()?;

            if !path.exists() {
                return Err(Error::PathNotFound(path));
            }

            info!("Analyzing {}", path.display());
            info!("Output: {}", cfg.output.directory.display());

            let scanner = ProjectScanner::new(cfg.clone()).with_verbose(verbose);
            let mut model = scanner.scan(&path)?;
            if let Some(flows_path) = &flows {
                model.flows = Some(load_flows(flows_path)?);
            }

            let written = write_outputs(&cfg, &model)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&model)?);
                return Ok(());
            }

            println!(
                "{}: {} files, {} classes, {} functions, {} dependencies",
                project_name(&cfg, &path),
                model.units.len(),
                model.classes.len(),
                model.functions.len(),
                model.dependencies.len()
            );

            if !model.parse_failures.is_empty() {
                println!("\nParse failures ({}):", model.parse_failures.len());
                for failure in model.parse_failures.iter().take(5) {
                    println!("  {}: {}", failure.path.display(), failure.reason);
                }
                if model.parse_failures.len() > 5 {
                    println!("  ... and {} more", model.parse_failures.len() - 5);
                }
            }

            if written > 0 {
                println!("Wrote {} diagrams", written);
            }
            println!("Output written to: {}", cfg.output.directory.display());
            Ok(())
        }

        Command::Version => {
            println!("archscribe {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Read a JSON object of flow name to flow record
pub fn load_flows(path: &Path) -> Result<BTreeMap<String, Flow>> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Write `model.json`, the diagram files and their index. Returns the
/// number of diagrams written.
pub fn write_outputs(cfg: &Config, model: &ProjectModel) -> Result<usize> {
    let out = &cfg.output.directory;
    fs::create_dir_all(out)?;

    if cfg.output.write_model {
        fs::write(out.join("model.json"), serde_json::to_string_pretty(model)?)?;
    }

    if !cfg.diagrams.enabled {
        return Ok(0);
    }

    let generator = DiagramGenerator::from_config(&cfg.diagrams);
    let diagrams = generator.generate_all(model);
    let dir = out.join("diagrams");
    fs::create_dir_all(&dir)?;

    let mut index = DiagramIndex::new(out);
    for diagram in &diagrams {
        fs::write(dir.join(diagram.file_name()), diagram.to_markdown())?;
        index.add(diagram);
    }
    let index_path = index.save()?;
    info!("Diagram index written to {}", index_path.display());

    Ok(diagrams.len())
}

/// Project name from config, falling back to the root directory name
fn project_name(cfg: &Config, root: &Path) -> String {
    if cfg.project.name == "Untitled Project" || cfg.project.name.is_empty() {
        root.canonicalize()
            .ok()
            .and_then(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .unwrap_or_else(|| "Project".to_string())
    } else {
        cfg.project.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CodeClass;
    use crate::model::Language;
    use tempfile::TempDir;

    #[test]
    fn test_load_flows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flows.json");
        fs::write(
            &path,
            r#"{"login": {"steps": [{"target": "Auth", "message": "submit"}]}}"#,
        )
        .unwrap();

        let flows = load_flows(&path).unwrap();
        let login = &flows["login"];
        assert_eq!(login.steps[0].source, "User");
        assert_eq!(login.steps[0].target, "Auth");
    }

    #[test]
    fn test_load_flows_rejects_bad_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flows.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(load_flows(&path), Err(Error::Json(_))));
    }

    #[test]
    fn test_write_outputs() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.output.directory = dir.path().join("docs");

        let model = ProjectModel {
            classes: vec![CodeClass::new("User", Language::Python, PathBuf::from("user.py"), 1)],
            ..ProjectModel::default()
        };
        let written = write_outputs(&cfg, &model).unwrap();
        assert_eq!(written, 2);

        let docs = dir.path().join("docs");
        assert!(docs.join("model.json").exists());
        assert!(docs.join("diagrams/class-diagram.md").exists());
        assert!(docs.join("diagrams/module-dependencies.md").exists());
        let index = fs::read_to_string(docs.join("diagrams/index.md")).unwrap();
        assert!(index.contains("- [Class Diagram](class-diagram.md)"));
    }

    #[test]
    fn test_write_outputs_without_diagrams() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.output.directory = dir.path().to_path_buf();
        cfg.diagrams.enabled = false;

        assert_eq!(write_outputs(&cfg, &ProjectModel::default()).unwrap(), 0);
        assert!(!dir.path().join("diagrams").exists());
    }
}
