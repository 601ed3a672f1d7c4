//! Output formats for scan results

pub mod json;
pub mod plain;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::types::{FileRecord, SkipReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

/// Values known before any file is written
#[derive(Debug, Clone, Copy)]
pub struct HeaderContext<'a> {
    pub root: &'a Path,
    pub total_files: usize,
}

pub trait Formatter {
    fn write_header(&mut self, output: &mut dyn Write, context: HeaderContext) -> Result<()>;

    fn write_directory_structure(
        &mut self,
        output: &mut dyn Write,
        files: &[PathBuf],
        repo_root: &Path,
    ) -> Result<()>;

    /// Writes one processed record. `record.content` is emitted as is, so
    /// summarized records show their summary.
    fn write_record(&mut self, output: &mut dyn Write, record: &FileRecord, repo_root: &Path) -> Result<()>;

    /// Closes the document, listing records that were skipped or failed.
    fn write_footer(&mut self, output: &mut dyn Write, dropped: &[&FileRecord], repo_root: &Path) -> Result<()>;
}

pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Plain => Box::new(plain::PlainFormatter),
        OutputFormat::Json => Box::new(json::JsonFormatter::new()),
    }
}

/// Short reason a record carries no content.
pub fn drop_reason(record: &FileRecord) -> String {
    if let Some(error) = &record.error {
        return format!("error: {}", error);
    }
    let reason = match record.skip_reason {
        Some(SkipReason::Binary) => "binary",
        Some(SkipReason::TooLarge) => "too large",
        Some(SkipReason::NotAFile) => "not a file",
        None => return "skipped".to_string(),
    };
    format!("skipped: {}", reason)
}

/// Writes `records` as one document. Processed records come out in path
/// order, followed by the dropped ones.
pub fn write_records(
    formatter: &mut dyn Formatter,
    output: &mut dyn Write,
    records: &[FileRecord],
    repo_root: &Path,
) -> Result<()> {
    let mut kept: Vec<&FileRecord> = records.iter().filter(|r| r.processed).collect();
    kept.sort_by(|a, b| a.path.cmp(&b.path));
    let mut dropped: Vec<&FileRecord> = records.iter().filter(|r| !r.processed).collect();
    dropped.sort_by(|a, b| a.path.cmp(&b.path));

    formatter.write_header(
        output,
        HeaderContext {
            root: repo_root,
            total_files: records.len(),
        },
    )?;
    let paths: Vec<PathBuf> = kept.iter().map(|r| r.path.clone()).collect();
    formatter.write_directory_structure(output, &paths, repo_root)?;
    for record in kept {
        formatter.write_record(output, record, repo_root)?;
    }
    formatter.write_footer(output, &dropped, repo_root)
}
