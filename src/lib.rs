//! Archscribe - reverse-engineer source trees into architecture diagrams
//!
//! Parses Python, PHP and JavaScript/TypeScript projects into one shared
//! structural model, infers relationships between classes, and renders the
//! result as bounded, deterministic Mermaid diagrams.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod parser;

// Re-export main types
pub use analysis::{ProjectScanner, RelationshipDetector};
pub use config::Config;
pub use error::{Error, Result};
pub use model::*;
pub use output::{DiagramDescriptor, DiagramGenerator, DiagramIndex, DiagramKind};
