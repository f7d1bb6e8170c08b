//! Delimited-file parsing with encoding and delimiter auto-detection.
//!
//! Converts source rows into [`RawRecord`]s. No validation happens here;
//! every cell survives as an untyped string so rejected records can be
//! reproduced verbatim in the invalid-records sink.
//!
//! Two layouts are recognized:
//!
//! - plain header files (first line is the header row), delimiter one of
//!   `; , TAB |`, encoding utf-8 / iso-8859-1 / windows-1252;
//! - the pipe-delimited hospital feed, whose first row is
//!   `|H|Customer_Name|…` and whose data rows are marked `|D|…`. The
//!   header record is checked against the expected layout; a mismatch is
//!   logged but does not abort the batch.

use std::path::Path;

use tracing::warn;

use crate::error::{CsvError, CsvResult};
use crate::models::RawRecord;

/// Expected header record of the pipe-delimited feed.
const EXPECTED_PIPE_HEADER: &str =
    "|H|Customer_Name|Customer_Id|Open_Date|Last_Consulted_Date|Vaccination_Id|Dr_Name|State|Country|DOB|Is_Active";

/// Result of parsing one input file, with detection metadata.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed rows in file order.
    pub records: Vec<RawRecord>,
    /// Detected encoding.
    pub encoding: String,
    /// Detected delimiter.
    pub delimiter: char,
    /// Column headers (marker cells already stripped for the pipe feed).
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _, _) = chardet::detect(bytes);

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to a string using the specified encoding.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => Ok(String::from_utf8_lossy(bytes).to_string()),
        "iso-8859-1" | "latin-1" | "latin1" => {
            Ok(encoding_rs::ISO_8859_15.decode(bytes).0.to_string())
        }
        "windows-1252" | "cp1252" => Ok(encoding_rs::WINDOWS_1252.decode(bytes).0.to_string()),
        // Fallback: UTF-8 with lossy conversion.
        _ => Ok(String::from_utf8_lossy(bytes).to_string()),
    }
}

/// Detect the delimiter by counting occurrences in the first line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse an input file with auto-detection of encoding and delimiter.
pub fn parse_file<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes)
}

/// Parse raw bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes(bytes: &[u8]) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    parse_content(&content, delimiter, encoding)
}

/// Parse decoded content with an explicit delimiter.
pub fn parse_content(content: &str, delimiter: char, encoding: String) -> CsvResult<ParseResult> {
    let mut lines = content.lines();

    let header_line = lines.next().ok_or(CsvError::EmptyFile)?;
    let pipe_feed = header_line.starts_with("|H|");

    if pipe_feed && header_line.trim_end_matches('|') != EXPECTED_PIPE_HEADER {
        warn!(
            expected = EXPECTED_PIPE_HEADER,
            received = header_line,
            "header record does not match expected layout"
        );
    }

    let headers = split_row(header_line, delimiter, pipe_feed);
    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut records = Vec::new();

    for (line_idx, line) in lines.enumerate() {
        let line_num = line_idx + 2; // 1-based, after the header

        if line.trim().is_empty() {
            continue;
        }
        // The pipe feed marks data rows with |D|; anything else (trailer
        // records, repeated headers) is not data.
        if pipe_feed && !line.starts_with("|D|") {
            continue;
        }

        let values = split_row(line, delimiter, pipe_feed);
        let mut record = RawRecord::new(line_num);

        for (i, header) in headers.iter().enumerate() {
            let value = values.get(i).map(String::as_str).unwrap_or("");
            record.push(header.clone(), value);
        }

        records.push(record);
    }

    Ok(ParseResult {
        records,
        encoding,
        delimiter,
        headers,
    })
}

/// Split one row into trimmed, unquoted cells.
///
/// For the pipe feed the leading empty cell and the `H`/`D` record marker
/// are stripped so headers and values line up with the canonical columns.
fn split_row(line: &str, delimiter: char, pipe_feed: bool) -> Vec<String> {
    let cells = line
        .split(delimiter)
        .map(|s| s.trim().trim_matches('"').to_string());

    if pipe_feed {
        cells.skip(2).collect()
    } else {
        cells.collect()
    }
}
