//! Reader for the header and point records of pcd (point cloud data) files.
//!
//! The analysis is a single pass over the file:
//!
//!  1. [lexer] splits the header region into lines, up to the `DATA` line.
//!  2. [header] interprets the directives (`FIELDS`, `SIZE`, `COUNT`, ...).
//!  3. [layout] computes the size of a point record and the offset of each field.
//!  4. [decode] decodes a few sample records, if the payload is uncompressed binary.
//!  5. [report] collects the results, together with notes on anything that was missing.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::Path;

use log::debug;

use crate::io::PcdError;

pub mod decode;
pub mod header;
pub mod layout;
pub mod lexer;
pub mod report;

pub use report::{Note, PcdReport};

pub const DEFAULT_SAMPLE_LIMIT: u64 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeOptions {
    /// Maximum number of point records to decode.
    /// The number of points declared in the header limits this further.
    pub sample_limit: u64,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        AnalyzeOptions {
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }
}

/// Analyzes the pcd data in `rd`, which holds `file_size` bytes in total.
pub fn analyze(
    mut rd: impl BufRead + Seek,
    file_size: u64,
    options: &AnalyzeOptions,
) -> Result<PcdReport, PcdError> {
    let header = lexer::read_header_lines(&mut rd)?;
    Ok(PcdReport::build(rd, file_size, header, options.sample_limit))
}

fn analyze_open_file(
    file: &mut File,
    path: &Path,
    options: &AnalyzeOptions,
) -> Result<PcdReport, PcdError> {
    let file_size = file.metadata().map_err(|e| PcdError::open(path, e))?.len();
    debug!("Analyzing {} ({} bytes)", path.display(), file_size);
    analyze(BufReader::new(file), file_size, options)
}

#[cfg(not(feature = "file-lock"))]
pub fn analyze_file(path: &Path, options: &AnalyzeOptions) -> Result<PcdReport, PcdError> {
    let mut file = File::open(path).map_err(|e| PcdError::open(path, e))?;
    analyze_open_file(&mut file, path, options)
}

/// Like the unlocked variant, but holds a lock on the file while reading,
/// so that a file that is still being written is not read.
#[cfg(feature = "file-lock")]
pub fn analyze_file(path: &Path, options: &AnalyzeOptions) -> Result<PcdReport, PcdError> {
    use file_locker::FileLock;
    let mut lock = FileLock::new(path)
        .blocking(true)
        .lock()
        .map_err(|e| PcdError::open(path, e))?;
    let report = analyze_open_file(&mut lock.file, path, options);
    lock.unlock()?;
    report
}
