//! Utility modules for reposift
//!
//! - `analysis/` - import graph, density and scoring
//! - `summary/` - reduced representations of large files

pub mod analysis;
pub mod binary;
pub mod lang;
pub mod summary;
pub mod syntax;

pub use analysis::{DependencyGraph, FileScorer};
pub use summary::Summarizer;
