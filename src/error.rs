use std::path::PathBuf;
use thiserror::Error;

/// Archscribe error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    ConfigValidation(String),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("Directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Toolchain unavailable: {0}")]
    Toolchain(String),

    #[error("Parser backend error: {0}")]
    Backend(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Archscribe operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a config validation error
    pub fn config_validation(msg: impl Into<String>) -> Self {
        Error::ConfigValidation(msg.into())
    }

    /// Create a parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a toolchain error
    pub fn toolchain(msg: impl Into<String>) -> Self {
        Error::Toolchain(msg.into())
    }

    /// Create a parser backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Error::Backend(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_path_not_found_display() {
        let err = Error::PathNotFound(PathBuf::from("/some/path"));
        assert_eq!(err.to_string(), "Path not found: /some/path");
    }

    #[test]
    fn test_parse_error_display() {
        let err = Error::parse("/foo/bar.php", "unexpected token");
        assert!(err.to_string().contains("/foo/bar.php"));
        assert!(err.to_string().contains("unexpected token"));
    }

    #[test]
    fn test_config_validation_display() {
        let err = Error::config_validation("max_classes must be at least 1");
        assert_eq!(
            err.to_string(),
            "Config validation error: max_classes must be at least 1"
        );
    }

    #[test]
    fn test_toolchain_error() {
        let err = Error::toolchain("node not found on PATH");
        assert_eq!(err.to_string(), "Toolchain unavailable: node not found on PATH");
    }

    #[test]
    fn test_backend_error() {
        let err = Error::backend("incompatible grammar version");
        assert_eq!(err.to_string(), "Parser backend error: incompatible grammar version");
    }

    #[test]
    fn test_other_error() {
        let err = Error::other("something went wrong");
        assert_eq!(err.to_string(), "something went wrong");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
