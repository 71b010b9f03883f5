//! Index construction: scan, extract headers and normalize dates in one pass.

use std::path::Path;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{MboxError, Result};
use crate::index::mailbox::{DateDiagnostic, MailboxIndex};
use crate::model::mail::{HeaderName, MessageRecord};
use crate::parser::date::{DateNormalizer, DateWindow};
use crate::parser::header::extract_headers;
use crate::parser::mbox::{MboxParser, RawMessage, MAX_HEADER_SIZE, READ_BUFFER_SIZE};

/// Bytes between two progress callbacks.
pub const PROGRESS_INTERVAL: u64 = 4 * 1024 * 1024;

/// Tunables for an index build.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub buffer_size: usize,
    pub max_header_size: usize,
    pub window: DateWindow,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            buffer_size: READ_BUFFER_SIZE,
            max_header_size: MAX_HEADER_SIZE,
            window: DateWindow::default(),
        }
    }
}

impl IndexOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            buffer_size: config.performance.read_buffer_size,
            max_header_size: config.performance.max_header_size,
            window: DateWindow::up_to_now(config.dates.min_year, config.dates.years_ahead),
        }
    }
}

/// Build the index for an mbox file in a single forward pass.
///
/// `progress` is called with `(bytes_done, bytes_total)` roughly every
/// [`PROGRESS_INTERVAL`] bytes and once more at the end.
///
/// An empty file yields an empty index; a non-empty file without a single
/// delimiter fails with [`MboxError::NoMessages`].
pub fn build_index(
    mbox_path: &Path,
    options: &IndexOptions,
    progress: Option<&dyn Fn(u64, u64)>,
) -> Result<MailboxIndex> {
    info!(path = %mbox_path.display(), "Building index");

    let parser = MboxParser::new(mbox_path)?
        .with_buffer_size(options.buffer_size)
        .with_max_header_size(options.max_header_size);
    let total = parser.file_size();
    let normalizer = DateNormalizer::new(options.window);

    let mut scanner = parser.scan()?;
    let mut records: Vec<MessageRecord> = Vec::new();
    let mut next_report = PROGRESS_INTERVAL;

    for raw in scanner.by_ref() {
        let raw = raw?;
        let end = raw.offset + raw.length;
        records.push(to_record(records.len(), raw, &normalizer));

        if let Some(cb) = progress {
            if end >= next_report {
                cb(end, total);
                next_report = end + PROGRESS_INTERVAL;
            }
        }
    }
    if let Some(cb) = progress {
        cb(total, total);
    }

    let preamble = scanner.preamble_len();
    if records.is_empty() && total > 0 {
        return Err(MboxError::NoMessages(mbox_path.to_path_buf()));
    }

    let index = MailboxIndex::new(mbox_path, total, preamble, records);
    info!(
        messages = index.size(),
        unparsed_dates = index.unparsed_count(),
        preamble_bytes = preamble,
        "Index built"
    );
    Ok(index)
}

/// Resolve dates for the first `n` messages only, without building an index.
///
/// The scan stops as soon as `n` messages have been seen.
pub fn sample_dates(
    mbox_path: &Path,
    options: &IndexOptions,
    n: usize,
) -> Result<Vec<DateDiagnostic>> {
    let parser = MboxParser::new(mbox_path)?
        .with_buffer_size(options.buffer_size)
        .with_max_header_size(options.max_header_size);
    let normalizer = DateNormalizer::new(options.window);

    let diagnostics = parser
        .scan()?
        .take(n)
        .enumerate()
        .map(|(i, raw)| raw.map(|raw| DateDiagnostic::from(&to_record(i, raw, &normalizer))))
        .collect::<Result<Vec<_>>>()?;
    debug!(requested = n, sampled = diagnostics.len(), "Sampled dates");
    Ok(diagnostics)
}

/// Turn one scanned message into an index record.
pub fn to_record(index: usize, raw: RawMessage, normalizer: &DateNormalizer) -> MessageRecord {
    let extracted = extract_headers(&raw.header_block, &raw.envelope);
    let date = normalizer.resolve(
        extracted.headers.get(HeaderName::Date),
        extracted.received_date.as_deref(),
        extracted.envelope_date.as_deref(),
    );
    MessageRecord {
        index,
        offset: raw.offset,
        length: raw.length,
        headers: extracted.headers,
        date,
    }
}
