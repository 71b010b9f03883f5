//! Streaming mbox boundary scanner.
//!
//! Reads the file once, line by line, through a large buffer and yields one
//! [`RawMessage`] per `From ` delimiter. Only the header block of each
//! message is kept; bodies are skipped over, never buffered.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{MboxError, Result};

/// Size of the internal read buffer (1 MB for fast sequential reads on modern SSDs).
pub const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Default cap on the header block kept per message (64 KB).
pub const MAX_HEADER_SIZE: usize = 64 * 1024;

/// Bytes of a single line kept for inspection; the rest is only counted.
const MAX_LINE_KEEP: usize = 16 * 1024;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// One message boundary found by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Offset of the delimiter line.
    pub offset: u64,
    /// Bytes from `offset` to the next delimiter or EOF.
    pub length: u64,
    /// The delimiter line, BOM and line terminator stripped.
    pub envelope: Vec<u8>,
    /// Header lines between the delimiter and the first blank line.
    pub header_block: Vec<u8>,
    /// Set when the header block hit the size cap and was cut short.
    pub header_truncated: bool,
}

struct Pending {
    offset: u64,
    envelope: Vec<u8>,
    header_block: Vec<u8>,
    in_headers: bool,
    truncated: bool,
}

impl Pending {
    fn close(self, end: u64) -> RawMessage {
        RawMessage {
            offset: self.offset,
            length: end - self.offset,
            envelope: self.envelope,
            header_block: self.header_block,
            header_truncated: self.truncated,
        }
    }
}

/// Forward-only iterator over the messages of an mbox stream.
///
/// A delimiter is a `From <sender> <timestamp>` line at the start of the
/// stream or directly after a blank line. Bytes before the first delimiter
/// are counted as preamble and belong to no message. A message still open
/// when the stream ends is closed at EOF.
pub struct MboxScanner<R: BufRead> {
    reader: R,
    path: PathBuf,
    max_header_size: usize,
    line: Vec<u8>,
    offset: u64,
    preamble: u64,
    pending: Option<Pending>,
    prev_line_blank: bool,
    first_line: bool,
    done: bool,
}

impl<R: BufRead> MboxScanner<R> {
    /// Scan an arbitrary buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            path: PathBuf::from("<stream>"),
            max_header_size: MAX_HEADER_SIZE,
            line: Vec::with_capacity(4096),
            offset: 0,
            preamble: 0,
            pending: None,
            prev_line_blank: true,
            first_line: true,
            done: false,
        }
    }

    /// Path reported in I/O errors.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_max_header_size(mut self, max: usize) -> Self {
        self.max_header_size = max;
        self
    }

    /// Bytes seen before the first delimiter.
    pub fn preamble_len(&self) -> u64 {
        self.preamble
    }

    /// Read the next line into `self.line` (capped), returning its full
    /// length and whether it is blank. `None` at EOF.
    fn next_line(&mut self) -> std::io::Result<Option<(u64, bool)>> {
        self.line.clear();
        let mut len: u64 = 0;
        let mut blank = true;

        loop {
            let (consumed, found_newline) = {
                let buf = self.reader.fill_buf()?;
                if buf.is_empty() {
                    break;
                }
                let (chunk, found) = match memchr_newline(buf) {
                    Some(pos) => (&buf[..=pos], true),
                    None => (buf, false),
                };
                let keep = MAX_LINE_KEEP
                    .saturating_sub(self.line.len())
                    .min(chunk.len());
                self.line.extend_from_slice(&chunk[..keep]);
                blank &= is_blank_line(chunk);
                (chunk.len(), found)
            };
            self.reader.consume(consumed);
            len += consumed as u64;
            if found_newline {
                break;
            }
        }

        Ok((len > 0).then_some((len, blank)))
    }

    fn step(&mut self) -> std::io::Result<Option<RawMessage>> {
        loop {
            let Some((line_len, blank)) = self.next_line()? else {
                self.done = true;
                let end = self.offset;
                return Ok(self.pending.take().map(|p| p.close(end)));
            };

            let line_start = self.offset;
            let at_boundary = self.first_line || self.prev_line_blank;
            let separator = is_mbox_separator(&self.line, self.first_line);

            self.first_line = false;
            self.prev_line_blank = blank;
            self.offset += line_len;

            if separator && at_boundary {
                let envelope = envelope_text(&self.line, line_start == 0);
                let next = Pending {
                    offset: line_start,
                    envelope,
                    header_block: Vec::new(),
                    in_headers: true,
                    truncated: false,
                };
                if self.pending.is_none() && self.preamble > 0 {
                    warn!(
                        bytes = self.preamble,
                        "Skipping data before the first 'From ' delimiter"
                    );
                }
                if let Some(done) = self.pending.replace(next) {
                    return Ok(Some(done.close(line_start)));
                }
                continue;
            }

            if separator {
                debug!(
                    offset = line_start,
                    "'From ' line without preceding blank line treated as body"
                );
            }

            match self.pending.as_mut() {
                None => self.preamble += line_len,
                Some(p) if p.in_headers => {
                    if blank {
                        p.in_headers = false;
                    } else if p.truncated {
                        // Nothing after the cut is kept, even lines that would fit
                    } else if p.header_block.len() + self.line.len() <= self.max_header_size {
                        p.header_block.extend_from_slice(&self.line);
                    } else {
                        p.truncated = true;
                        warn!(
                            offset = p.offset,
                            max_size = self.max_header_size,
                            "Header block exceeds maximum size, truncating"
                        );
                    }
                }
                Some(_) => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for MboxScanner<R> {
    type Item = Result<RawMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(msg) => msg.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(MboxError::io(&self.path, e)))
            }
        }
    }
}

/// File-backed entry point to the scanner.
pub struct MboxParser {
    path: PathBuf,
    file_size: u64,
    buffer_size: usize,
    max_header_size: usize,
}

impl MboxParser {
    /// Create a parser for the given mbox file.
    ///
    /// Verifies that the file exists and is readable, but does NOT validate
    /// that it is actually an mbox.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MboxError::FileNotFound(path.clone())
            } else {
                MboxError::io(&path, e)
            }
        })?;
        Ok(Self {
            path,
            file_size: metadata.len(),
            buffer_size: READ_BUFFER_SIZE,
            max_header_size: MAX_HEADER_SIZE,
        })
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(4096);
        self
    }

    pub fn with_max_header_size(mut self, max: usize) -> Self {
        self.max_header_size = max;
        self
    }

    /// Total size of the underlying file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Path to the mbox file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file and start a fresh forward scan.
    pub fn scan(&self) -> Result<MboxScanner<BufReader<File>>> {
        let file = File::open(&self.path).map_err(|e| MboxError::io(&self.path, e))?;
        let reader = BufReader::with_capacity(self.buffer_size, file);
        Ok(MboxScanner::new(reader)
            .with_path(&self.path)
            .with_max_header_size(self.max_header_size))
    }

    /// Read a single message at the given offset and length.
    ///
    /// Uses `seek` to jump directly to the message without scanning the file.
    pub fn read_message_at(path: impl AsRef<Path>, offset: u64, length: u64) -> Result<Vec<u8>> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| MboxError::io(path, e))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| MboxError::io(path, e))?;
        let mut buffer = vec![0u8; length as usize];
        file.read_exact(&mut buffer)
            .map_err(|e| MboxError::io(path, e))?;
        Ok(buffer)
    }
}

/// Fast newline search (equivalent to memchr for `\n`).
#[inline]
fn memchr_newline(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

/// Check whether a line has the shape of an mbox delimiter:
/// `From `, a sender token, then a tail containing at least one digit.
///
/// A UTF-8 BOM is tolerated on the first line of the file only.
pub fn is_mbox_separator(line: &[u8], first_line: bool) -> bool {
    let line = if first_line {
        line.strip_prefix(UTF8_BOM).unwrap_or(line)
    } else {
        line
    };
    let Some(rest) = line.strip_prefix(b"From ") else {
        return false;
    };
    let rest = trim_line_end(rest);
    let rest = match rest.iter().position(|b| !b.is_ascii_whitespace()) {
        Some(start) => &rest[start..],
        None => return false,
    };
    let sender_end = rest
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(rest.len());
    let tail = &rest[sender_end..];
    sender_end > 0 && tail.iter().any(u8::is_ascii_digit)
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
pub fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|&b| b != b'\n' && b != b'\r')
        .map_or(0, |p| p + 1);
    &line[..end]
}

fn envelope_text(line: &[u8], at_file_start: bool) -> Vec<u8> {
    let line = if at_file_start {
        line.strip_prefix(UTF8_BOM).unwrap_or(line)
    } else {
        line
    };
    trim_line_end(line).to_vec()
}
