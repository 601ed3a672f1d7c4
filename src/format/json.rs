//! JSON output format
//!
//! Entries are buffered and the document is written once by the footer, so
//! the output is always a single valid object.

use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{Formatter, HeaderContext, drop_reason};
use crate::core::types::{FileRecord, NamedEntity};
use crate::fs::relative_path_str;

#[derive(Serialize)]
struct FileEntry {
    path: String,
    byte_size: u64,
    line_count: usize,
    summarized: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    entities: Vec<NamedEntity>,
    content: String,
}

#[derive(Serialize)]
struct DroppedEntry {
    path: String,
    byte_size: u64,
    reason: String,
}

#[derive(Serialize, Default)]
struct Document {
    root: String,
    total_files: usize,
    directory_structure: Vec<String>,
    files: Vec<FileEntry>,
    dropped_files: Vec<DroppedEntry>,
}

#[derive(Default)]
pub struct JsonFormatter {
    document: Document,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Formatter for JsonFormatter {
    fn write_header(&mut self, _output: &mut dyn Write, context: HeaderContext) -> Result<()> {
        self.document.root = context.root.display().to_string();
        self.document.total_files = context.total_files;
        Ok(())
    }

    fn write_directory_structure(
        &mut self,
        _output: &mut dyn Write,
        files: &[PathBuf],
        repo_root: &Path,
    ) -> Result<()> {
        self.document.directory_structure = files.iter().map(|p| relative_path_str(repo_root, p)).collect();
        Ok(())
    }

    fn write_record(&mut self, _output: &mut dyn Write, record: &FileRecord, repo_root: &Path) -> Result<()> {
        self.document.files.push(FileEntry {
            path: relative_path_str(repo_root, &record.path),
            byte_size: record.byte_size,
            line_count: record.line_count,
            summarized: record.summarized,
            entities: record.entities.clone(),
            content: record.text().into_owned(),
        });
        Ok(())
    }

    fn write_footer(&mut self, output: &mut dyn Write, dropped: &[&FileRecord], repo_root: &Path) -> Result<()> {
        self.document.dropped_files = dropped
            .iter()
            .map(|record| DroppedEntry {
                path: relative_path_str(repo_root, &record.path),
                byte_size: record.byte_size,
                reason: drop_reason(record),
            })
            .collect();
        let document = std::mem::take(&mut self.document);
        serde_json::to_writer_pretty(&mut *output, &document)?;
        writeln!(output)?;
        Ok(())
    }
}
