//! Header block extraction: unfolding, name matching and RFC 2047 decoding.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tracing::warn;

use crate::model::mail::{HeaderName, Headers};

/// Base64 engine for encoded-words, which often drop their padding.
const ENCODED_WORD_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Output of the header extractor for one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedHeaders {
    /// The five recognized headers.
    pub headers: Headers,
    /// Timestamp part (after the last `;`) of the last `Received:` header.
    pub received_date: Option<String>,
    /// Timestamp tail of the `From ` delimiter line.
    pub envelope_date: Option<String>,
}

/// Parse a header block and its delimiter line.
///
/// Never fails: lines without a colon are skipped, unknown headers are
/// dropped, and when a header repeats the last occurrence wins.
pub fn extract_headers(header_block: &[u8], envelope: &[u8]) -> ExtractedHeaders {
    let text = decode_header_bytes(header_block);
    let mut out = ExtractedHeaders {
        envelope_date: envelope_timestamp(&decode_header_bytes(envelope)),
        ..Default::default()
    };

    for (name, value) in unfold_headers(&text) {
        if name.eq_ignore_ascii_case("received") {
            out.received_date = received_timestamp(&value);
            continue;
        }
        let Some(header) = HeaderName::parse(&name) else {
            continue;
        };
        let value = match header {
            HeaderName::Date => value,
            _ => decode_encoded_words(&value),
        };
        out.headers.set(header, value);
    }

    out
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Join continuation lines (leading space or tab) onto the previous header.
///
/// Returns `(name, value)` pairs in source order.
fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                let piece = line.trim();
                if !piece.is_empty() {
                    if !last.1.is_empty() {
                        last.1.push(' ');
                    }
                    last.1.push_str(piece);
                }
            }
        } else if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            if !name.is_empty() && !name.contains(char::is_whitespace) {
                result.push((name.to_string(), value.trim().to_string()));
            }
        }
    }

    result
}

/// `"from mx.example.com by ...; Thu, 01 Jun 2023 09:15:33 -0700"` → the date part.
fn received_timestamp(value: &str) -> Option<String> {
    let (_, stamp) = value.rsplit_once(';')?;
    let stamp = stamp.trim();
    (!stamp.is_empty()).then(|| stamp.to_string())
}

/// `"From user@host Thu Jun  1 09:15:33 2023"` → `"Thu Jun  1 09:15:33 2023"`.
fn envelope_timestamp(envelope: &str) -> Option<String> {
    let rest = envelope.strip_prefix("From ")?.trim_start();
    let (_, tail) = rest.split_once(char::is_whitespace)?;
    let tail = tail.trim();
    (!tail.is_empty()).then(|| tail.to_string())
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// If decoding fails for any token, the original text is preserved.
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        // Whitespace between two adjacent encoded-words is dropped (RFC 2047 §6.2)
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];
        match decode_one_word(after_start) {
            Some((text, consumed)) => {
                result.push_str(&text);
                remaining = &after_start[consumed..];
                last_was_encoded = true;
            }
            None => {
                result.push_str("=?");
                remaining = after_start;
                last_was_encoded = false;
            }
        }
    }

    result.push_str(remaining);
    result
}

/// Decode `charset?encoding?text?=`; returns the text and the bytes consumed.
fn decode_one_word(s: &str) -> Option<(String, usize)> {
    let (charset, rest) = s.split_once('?')?;
    let (encoding, rest) = rest.split_once('?')?;
    let end = rest.find("?=")?;
    let encoded = &rest[..end];
    if charset.is_empty() || charset.contains(char::is_whitespace) {
        return None;
    }

    let bytes = match encoding {
        "B" | "b" => ENCODED_WORD_B64.decode(encoded.trim()).ok()?,
        "Q" | "q" => decode_q_encoding(encoded),
        _ => return None,
    };

    let consumed = charset.len() + 1 + encoding.len() + 1 + end + 2;
    Some((decode_charset(charset, &bytes), consumed))
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' => {
                let byte = bytes
                    .get(i + 1..i + 3)
                    .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                match byte {
                    Some(byte) => {
                        result.push(byte);
                        i += 3;
                    }
                    None => {
                        result.push(b'=');
                        i += 1;
                    }
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Decode bytes using a named charset (RFC 2231 language suffix ignored).
fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    let label = charset.split('*').next().unwrap_or(charset);
    if label.eq_ignore_ascii_case("utf-8") || label.eq_ignore_ascii_case("utf8") {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    match encoding_rs::Encoding::for_label(label.as_bytes()) {
        Some(encoding) => {
            let (decoded, _, _) = encoding.decode(bytes);
            decoded.into_owned()
        }
        None => {
            warn!(charset = label, "Unknown charset, falling back to UTF-8 lossy");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}
