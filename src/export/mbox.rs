//! Year filter: copy every message dated in a given year into a new mbox file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::is_same_file;
use crate::error::{MboxError, Result};
use crate::index::mailbox::{DateDiagnostic, MailboxIndex};
use crate::model::address::EmailAddress;
use crate::model::mail::MessageRecord;
use crate::parser::mbox::is_mbox_separator;
use crate::store::reader::MboxStore;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Sender used in reconstructed delimiter lines when `From:` has no address.
pub const FALLBACK_SENDER: &str = "MAILER-DAEMON";

/// Statistics returned by a year extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitReport {
    pub year: i32,
    pub output: PathBuf,
    /// Messages examined.
    pub scanned: usize,
    /// Messages written.
    pub matched: usize,
    /// Messages skipped because their date could not be resolved.
    pub unparsed: usize,
    pub bytes_written: u64,
    /// One entry per written message when `debug` was requested.
    pub diagnostics: Vec<DateDiagnostic>,
}

/// Write every message whose date falls in `year` to `output`, in file order.
///
/// Each message starts with its original delimiter line (or a reconstructed
/// one) and is followed by a blank line, so the output is a valid mbox. The
/// output file is created or truncated; it may not be the source file.
pub fn extract_year(
    index: &MailboxIndex,
    year: i32,
    output: &Path,
    debug: bool,
) -> Result<SplitReport> {
    if is_same_file(index.path(), output) {
        return Err(MboxError::InvalidArgument(format!(
            "output {} is the source mailbox",
            output.display()
        )));
    }

    let mut store = MboxStore::open(index.path())?;
    let file = File::create(output).map_err(|e| MboxError::io(output, e))?;
    let mut out = BufWriter::new(file);

    let mut report = SplitReport {
        year,
        output: output.to_path_buf(),
        scanned: 0,
        matched: 0,
        unparsed: 0,
        bytes_written: 0,
        diagnostics: Vec::new(),
    };

    for record in index.records() {
        report.scanned += 1;
        let Some(date) = record.date.date() else {
            report.unparsed += 1;
            continue;
        };
        if date.year() != year {
            continue;
        }

        let raw = store.read_message(record)?;
        report.bytes_written +=
            write_message(&mut out, record, &raw).map_err(|e| MboxError::io(output, e))?;
        report.matched += 1;

        if debug {
            let diag = DateDiagnostic::from(record);
            debug!(
                index = diag.index,
                raw = diag.raw.as_deref().unwrap_or(""),
                strategy = diag.strategy_name(),
                "Matched message"
            );
            report.diagnostics.push(diag);
        }
    }
    out.flush().map_err(|e| MboxError::io(output, e))?;

    info!(
        year,
        scanned = report.scanned,
        matched = report.matched,
        unparsed = report.unparsed,
        bytes = report.bytes_written,
        "Year extraction finished"
    );
    Ok(report)
}

/// Write one message with a valid delimiter and a trailing blank line.
fn write_message<W: Write>(out: &mut W, record: &MessageRecord, raw: &[u8]) -> std::io::Result<u64> {
    let raw = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);
    let first_line_end = raw
        .iter()
        .position(|&b| b == b'\n')
        .map_or(raw.len(), |p| p + 1);

    let mut written = 0u64;
    if !is_mbox_separator(&raw[..first_line_end], false) {
        let line = envelope_line(record);
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
        written += line.len() as u64 + 1;
    }
    out.write_all(raw)?;
    written += raw.len() as u64;

    let tail: &[u8] = if raw.ends_with(b"\n\n") || raw.ends_with(b"\r\n\r\n") || raw.is_empty() {
        b""
    } else if raw.ends_with(b"\n") {
        b"\n"
    } else {
        b"\n\n"
    };
    out.write_all(tail)?;
    written += tail.len() as u64;
    Ok(written)
}

/// Build a `From <sender> <asctime>` delimiter line for a message.
pub fn envelope_line(record: &MessageRecord) -> String {
    let addr = EmailAddress::parse(record.from());
    let sender = if addr.is_envelope_safe() {
        addr.address.as_str()
    } else {
        FALLBACK_SENDER
    };
    let stamp = record.date.date().map_or_else(
        || "Thu Jan  1 00:00:00 1970".to_string(),
        |d| d.format("%a %b %e %H:%M:%S %Y"),
    );
    format!("From {sender} {stamp}")
}
