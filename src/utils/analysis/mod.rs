//! Repository analysis: import graph, code density and file scoring

pub mod density;
pub mod dependencies;
pub mod graph;
pub mod rank;

pub use density::{DensityAnalyzer, LineClassifier, LineStats, StructuralDensity, create_density_analyzer};
pub use dependencies::{FileIndex, ImportSpec, build_dependency_graph, scan_imports};
pub use graph::DependencyGraph;
pub use rank::FileScorer;
