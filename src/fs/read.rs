//! File content reading
//!
//! Small files are read through a buffer sized from their metadata, large
//! ones through a memory map. Both return the same fully materialized bytes.

use memmap2::Mmap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStrategy {
    Buffered,
    Mapped,
}

/// Reader owned by one worker, reused for every file it handles.
#[derive(Debug, Clone, Copy)]
pub struct FileReader {
    mmap_threshold: u64,
}

impl FileReader {
    pub fn new(mmap_threshold: u64) -> Self {
        Self { mmap_threshold }
    }

    pub fn strategy_for(&self, size: u64) -> ReadStrategy {
        if size > 0 && size >= self.mmap_threshold {
            ReadStrategy::Mapped
        } else {
            ReadStrategy::Buffered
        }
    }

    /// Reads `path`, whose size was `size` when it was stat'ed.
    pub fn read(&self, path: &Path, size: u64) -> io::Result<Vec<u8>> {
        match self.strategy_for(size) {
            ReadStrategy::Buffered => read_buffered(path, size),
            ReadStrategy::Mapped => read_mapped(path),
        }
    }
}

/// Reads a whole file into a buffer allocated once from `size_hint`.
/// A file that grew since it was stat'ed is still read to the end.
pub fn read_buffered(path: &Path, size_hint: u64) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut content = Vec::with_capacity(usize::try_from(size_hint).unwrap_or(0));
    file.read_to_end(&mut content)?;
    Ok(content)
}

/// Reads a whole file through a read-only memory map.
pub fn read_mapped(path: &Path) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(Vec::new());
    }
    // SAFETY: the map is read-only and copied out before it is dropped. A
    // concurrent truncation by another process can still fault, as with any mmap.
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(mmap.to_vec())
}

/// Counts lines: a trailing partial line counts, an empty input has none.
pub fn count_lines(content: &[u8]) -> usize {
    if content.is_empty() {
        return 0;
    }
    let newlines = content.iter().filter(|&&b| b == b'\n').count();
    if content.ends_with(b"\n") {
        newlines
    } else {
        newlines + 1
    }
}
