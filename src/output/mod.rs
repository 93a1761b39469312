// Output generation: Mermaid diagrams and the diagram index

pub mod diagrams;
pub mod index;

pub use diagrams::*;
pub use index::*;
