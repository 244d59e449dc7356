use std::io::BufRead;

use log::{debug, warn};
use serde::Serialize;

/// Header lines that terminate the header region.
pub const DATA_SENTINELS: [&str; 3] = ["DATA binary_compressed", "DATA binary", "DATA ascii"];

/// The header region of a pcd file, as split into lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderLines {
    /// Trimmed header lines, in file order. Includes the `DATA` line, if there was one.
    pub lines: Vec<String>,

    /// Byte position right after the last consumed line.
    /// If the header was terminated, this is where the data segment starts.
    pub data_start: u64,

    /// True, if one of the [DATA_SENTINELS] was found before the end of the file.
    pub terminated: bool,
}

/// Reads header lines until (and including) the `DATA` line.
///
/// Bytes that are not valid utf-8 are replaced, so a header with some garbage in it
/// is still split into lines. Reaching the end of the stream before any `DATA` line
/// is not an error: the returned header is simply not [HeaderLines::terminated].
///
/// After this call, the reader is positioned at the first byte of the data segment
/// (or at the end of the stream).
pub fn read_header_lines(mut rd: impl BufRead) -> std::io::Result<HeaderLines> {
    let mut lines = Vec::new();
    let mut consumed = 0_u64;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let len = rd.read_until(b'\n', &mut buf)?;
        if len == 0 {
            warn!(
                "Reached end of file after {} header lines without finding a DATA line.",
                lines.len()
            );
            return Ok(HeaderLines {
                lines,
                data_start: consumed,
                terminated: false,
            });
        }
        consumed += len as u64;

        let line = String::from_utf8_lossy(&buf).trim().to_string();
        let is_sentinel = DATA_SENTINELS.contains(&line.as_str());
        lines.push(line);
        if is_sentinel {
            debug!(
                "Header has {} lines, data starts at byte {}",
                lines.len(),
                consumed
            );
            return Ok(HeaderLines {
                lines,
                data_start: consumed,
                terminated: true,
            });
        }
    }
}
