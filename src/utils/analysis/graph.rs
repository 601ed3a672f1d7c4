use std::collections::{BTreeMap, BTreeSet};

/// File-level import graph keyed by repository-relative paths.
///
/// An edge `a -> b` means `a` imports `b` and `b` resolved to a file that
/// exists in the repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph {
    edges: BTreeMap<String, Vec<String>>,
    /// Importing files, keyed by the file name of what they import
    importers_by_name: BTreeMap<String, BTreeSet<String>>,
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, path: impl Into<String>) {
        self.edges.entry(path.into()).or_default();
    }

    /// Adds `from -> to`. Self edges and duplicates are dropped.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let (from, to) = (from.into(), to.into());
        if from == to {
            return;
        }
        self.add_node(to.clone());
        let targets = self.edges.entry(from.clone()).or_default();
        if targets.contains(&to) {
            return;
        }
        self.importers_by_name
            .entry(file_name(&to).to_string())
            .or_default()
            .insert(from);
        targets.push(to);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.edges.contains_key(path)
    }

    pub fn edges_from(&self, path: &str) -> &[String] {
        self.edges.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    pub fn out_degree(&self, path: &str) -> usize {
        self.edges_from(path).len()
    }

    /// Other files with an edge to `path`.
    ///
    /// Besides exact matches, an edge to any file with the same file name
    /// also counts. This over-counts common names such as `index.ts`.
    pub fn in_degree(&self, path: &str) -> usize {
        self.importers_by_name
            .get(file_name(path))
            .map(|importers| importers.len() - usize::from(importers.contains(path)))
            .unwrap_or(0)
    }

    /// `min(1, log2(in + out + 1) / 5)`
    pub fn connectivity(&self, path: &str) -> f64 {
        let degree = self.in_degree(path) + self.out_degree(path);
        ((degree as f64 + 1.0).log2() / 5.0).min(1.0)
    }
}
