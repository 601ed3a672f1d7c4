//! Plain text output format

use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{Formatter, HeaderContext, drop_reason};
use crate::core::types::FileRecord;
use crate::fs::relative_path_str;

pub struct PlainFormatter;

impl Formatter for PlainFormatter {
    fn write_header(&mut self, output: &mut dyn Write, context: HeaderContext) -> Result<()> {
        writeln!(output, "=== REPOSITORY: {} ===", context.root.display())?;
        writeln!(output, "Files: {}", context.total_files)?;
        writeln!(output)?;
        Ok(())
    }

    fn write_directory_structure(
        &mut self,
        output: &mut dyn Write,
        files: &[PathBuf],
        repo_root: &Path,
    ) -> Result<()> {
        writeln!(output, "=== DIRECTORY STRUCTURE ===")?;
        for path in files {
            writeln!(output, "{}", relative_path_str(repo_root, path))?;
        }
        writeln!(output)?;
        Ok(())
    }

    fn write_record(&mut self, output: &mut dyn Write, record: &FileRecord, repo_root: &Path) -> Result<()> {
        let relative = relative_path_str(repo_root, &record.path);
        if record.summarized {
            writeln!(output, "--- {} (summary) ---", relative)?;
        } else {
            writeln!(output, "--- {} ---", relative)?;
        }
        writeln!(output, "{}", record.text())?;
        writeln!(output)?;
        Ok(())
    }

    fn write_footer(&mut self, output: &mut dyn Write, dropped: &[&FileRecord], repo_root: &Path) -> Result<()> {
        if !dropped.is_empty() {
            writeln!(output, "=== DROPPED FILES ===")?;
            for record in dropped {
                writeln!(
                    output,
                    "{} ({})",
                    relative_path_str(repo_root, &record.path),
                    drop_reason(record)
                )?;
            }
        }
        Ok(())
    }
}
