use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Bytes sampled from the start of a file by the binary heuristic.
pub const BINARY_SAMPLE_SIZE: usize = 8192;

/// Checks if the buffer contains binary data.
/// Uses a simple heuristic: looks for null bytes in the first 8KB.
pub fn is_binary(content: &[u8]) -> bool {
    let check_len = content.len().min(BINARY_SAMPLE_SIZE);
    content[..check_len].contains(&0)
}

/// Samples the first 8KB of a file without reading the rest.
pub fn file_is_binary(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    let mut sample = [0u8; BINARY_SAMPLE_SIZE];
    let mut filled = 0;
    while filled < sample.len() {
        let n = file.read(&mut sample[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(is_binary(&sample[..filled]))
}
