//! Export a single message verbatim.
//!
//! The written file holds exactly the message's byte range from the source
//! (delimiter line, headers and body, unmodified).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use super::is_same_file;
use crate::error::{MboxError, Result};
use crate::model::mail::MessageRecord;
use crate::store::reader::MboxStore;

/// Write one message to `dest`.
///
/// When `dest` is an existing directory a file name is generated inside it
/// (see [`eml_filename`]); otherwise `dest` is the file to create or
/// truncate. Parent directories are not created. Any path that resolves
/// to the source mailbox is rejected before anything is written.
///
/// Returns the path of the written file.
pub fn export_eml(store: &mut MboxStore, record: &MessageRecord, dest: &Path) -> Result<PathBuf> {
    let path = if dest.is_dir() {
        dest.join(eml_filename(record))
    } else {
        dest.to_path_buf()
    };
    if is_same_file(&path, store.path()) {
        return Err(MboxError::InvalidArgument(format!(
            "refusing to overwrite the source mailbox {}",
            path.display()
        )));
    }

    let file = File::create(&path).map_err(|e| MboxError::io(&path, e))?;
    let mut out = BufWriter::new(file);
    let written = store.copy_message(record, &mut out)?;
    out.flush().map_err(|e| MboxError::io(&path, e))?;

    info!(path = %path.display(), bytes = written, index = record.index, "Message exported");
    Ok(path)
}

/// Generate a sanitized filename for an export.
///
/// Format: `{date}_{from}_{subject}.eml`, truncated to 200 chars.
pub fn eml_filename(record: &MessageRecord) -> String {
    let date = record
        .date
        .date()
        .map_or_else(|| "undated".to_string(), |d| d.format("%Y%m%d_%H%M%S"));
    let from = sanitize_filename_part(&sender_address(record.from()), 30);
    let subject = sanitize_filename_part(record.subject(), 80);

    let name = format!("{date}_{from}_{subject}.eml");
    if name.chars().count() > 200 {
        let stem: String = name.chars().take(196).collect();
        format!("{stem}.eml")
    } else {
        name
    }
}

fn sender_address(from: &str) -> String {
    crate::model::address::EmailAddress::parse(from).address
}

/// Sanitize a string for use in filenames.
///
/// Replaces invalid characters with `_` and truncates to `max_len`.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mail::{HeaderName, Headers, MailDate, NormalizedDate};
    use crate::parser::date::Strategy;
    use chrono::NaiveDate;

    fn record() -> MessageRecord {
        let mut headers = Headers::default();
        headers.set(HeaderName::From, "Alice <alice@example.com>");
        headers.set(HeaderName::Subject, "Re: plans/ideas");
        MessageRecord {
            index: 3,
            offset: 0,
            length: 0,
            headers,
            date: NormalizedDate::Parsed {
                date: MailDate::Day(NaiveDate::from_ymd_opt(2023, 6, 1).unwrap()),
                strategy: Strategy::Iso8601,
            },
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename_part("hello world", 20), "hello_world");
        assert_eq!(
            sanitize_filename_part("user@example.com", 30),
            "user@example.com"
        );
        assert_eq!(sanitize_filename_part("a/b\\c:d*e", 20), "a_b_c_d_e");
        assert_eq!(sanitize_filename_part("", 20), "unknown");
    }

    #[test]
    fn test_eml_filename() {
        assert_eq!(
            eml_filename(&record()),
            "20230601_000000_alice@example.com_Re__plans_ideas.eml"
        );
        let mut undated = record();
        undated.date = NormalizedDate::Unparsed;
        assert!(eml_filename(&undated).starts_with("undated_"));
    }
}
