//! Lock-safe reads of logs that another process is still appending to.
//!
//! Tail reads go through a private snapshot copy so the game client never
//! waits on us and we never see a half-flushed view. The scratch file is a
//! [`tempfile::NamedTempFile`] and is removed when it drops, including on
//! every error path.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::debug;

use crate::config::reader::REVERSE_CHUNK_BYTES;

/// Most recent complete lines of a log, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogTail {
    pub lines: Vec<String>,
    /// Offset just past the newest complete line
    pub end_offset: u64,
    /// Size of the snapshot
    pub file_len: u64,
}

/// Open a file for reading without denying writes, renames or deletes to
/// the process that owns it.
pub fn open_shared(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true);

    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        use windows::Win32::Storage::FileSystem::{
            FILE_SHARE_DELETE, FILE_SHARE_READ, FILE_SHARE_WRITE,
        };
        options.share_mode((FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE).0);
    }

    options.open(path)
}

/// Snapshot `path` and return up to `max_lines` complete lines at or after
/// `start_offset`, newest first.
///
/// A trailing line without a newline is still being written and is left for
/// the next read. If `start_offset` lies past the end of the file the whole
/// file is read.
pub fn snapshot_tail(path: &Path, max_lines: usize, start_offset: u64) -> io::Result<LogTail> {
    let mut source = open_shared(path)?;
    let mut scratch = tempfile::Builder::new()
        .prefix("biomewatch-")
        .suffix(".log")
        .tempfile()?;

    let copied = io::copy(&mut source, scratch.as_file_mut())?;
    drop(source);

    let start = if start_offset > copied { 0 } else { start_offset };
    let file = scratch.as_file_mut();
    read_lines_backwards(file, start, copied, max_lines)
}

/// Up to `max_lines` most recent complete lines, newest first.
///
/// Any I/O failure yields an empty list: the caller simply sees no new data
/// this cycle.
pub fn read_recent_lines(path: &Path, max_lines: usize) -> Vec<String> {
    match snapshot_tail(path, max_lines, 0) {
        Ok(tail) => tail.lines,
        Err(e) => {
            debug!("Failed to read {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Read at most `max_bytes` from the start of a file as lossy UTF-8.
pub fn read_prefix(path: &Path, max_bytes: usize) -> io::Result<String> {
    let file = open_shared(path)?;
    let mut buf = Vec::with_capacity(max_bytes.min(64 * 1024));
    file.take(max_bytes as u64).read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn read_lines_backwards<R: Read + Seek>(
    reader: &mut R,
    start: u64,
    len: u64,
    max_lines: usize,
) -> io::Result<LogTail> {
    let mut tail = LogTail {
        lines: Vec::new(),
        end_offset: start,
        file_len: len,
    };
    if max_lines == 0 || len <= start {
        return Ok(tail);
    }

    let mut pos = len;
    // Pieces of the line being assembled, latest bytes first
    let mut partial: Vec<Vec<u8>> = Vec::new();
    let mut seen_newline = false;

    while pos > start {
        let chunk_start = pos.saturating_sub(REVERSE_CHUNK_BYTES as u64).max(start);
        let mut chunk = vec![0u8; (pos - chunk_start) as usize];
        reader.seek(SeekFrom::Start(chunk_start))?;
        reader.read_exact(&mut chunk)?;
        pos = chunk_start;

        // Bytes already in `partial` hold no newlines
        while let Some(idx) = chunk.iter().rposition(|&b| b == b'\n') {
            partial.push(chunk.split_off(idx + 1));
            chunk.truncate(idx);
            let line = join_partial(&mut partial);

            if seen_newline {
                tail.lines.push(decode_line(&line));
                if tail.lines.len() >= max_lines {
                    return Ok(tail);
                }
            } else {
                // Bytes after the last newline are an unfinished line
                seen_newline = true;
                tail.end_offset = pos + idx as u64 + 1;
            }
        }
        partial.push(chunk);
    }

    if seen_newline {
        tail.lines.push(decode_line(&join_partial(&mut partial)));
    }

    Ok(tail)
}

fn join_partial(partial: &mut Vec<Vec<u8>>) -> Vec<u8> {
    partial.drain(..).rev().flatten().collect()
}

fn decode_line(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_suffix('\r').unwrap_or(&*text).to_string()
}
