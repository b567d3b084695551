use crate::domain::model::{Record, RecordSet};
use crate::utils::error::{ApiError, Result};
use crate::utils::slug::sanitize_key;
use csv::{ReaderBuilder, StringRecord};
use std::borrow::Cow;
use std::str::FromStr;

/// Source parsers selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Tsv,
}

impl SourceFormat {
    pub fn delimiter(self) -> u8 {
        match self {
            SourceFormat::Csv => b',',
            SourceFormat::Tsv => b'\t',
        }
    }

    pub fn parse(self, raw: &str, has_header_row: bool) -> Result<RecordSet> {
        parse_delimited(raw, self.delimiter(), has_header_row)
    }
}

impl FromStr for SourceFormat {
    type Err = ApiError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "tsv" => Ok(SourceFormat::Tsv),
            _ => Err(ApiError::UnsupportedSourceFormat {
                format: name.to_string(),
            }),
        }
    }
}

/// Decode fetched bytes as UTF-8, falling back to ISO-8859-1 when they are
/// not valid UTF-8.
pub fn decode_source(raw: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(raw) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            tracing::debug!("Source is not UTF-8, decoding {} bytes as ISO-8859-1", raw.len());
            Cow::Owned(raw.iter().map(|&b| b as char).collect())
        }
    }
}

pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

pub fn parse_csv(raw: &str, has_header_row: bool) -> Result<RecordSet> {
    parse_delimited(raw, b',', has_header_row)
}

/// Parse delimited text into records, one per non-blank line.
///
/// Quoted fields may contain the delimiter and line breaks. Cells beyond
/// the header width are dropped, short lines yield only the cells present.
pub fn parse_delimited(raw: &str, delimiter: u8, has_header_row: bool) -> Result<RecordSet> {
    let text = normalize_line_endings(raw);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut lines = Vec::new();
    for row in reader.records() {
        let row = row?;
        if !is_blank_line(&row) {
            lines.push(row);
        }
    }

    let mut lines = lines.into_iter();
    let headers: Vec<String> = if has_header_row {
        match lines.next() {
            Some(header_line) => header_line
                .iter()
                .enumerate()
                .map(|(idx, header)| field_name(header, idx))
                .collect(),
            None => return Ok(Vec::new()),
        }
    } else {
        // 沒有標題列時依第一列欄位數產生 field-1, field-2, ...
        let width = lines.as_slice().first().map_or(0, StringRecord::len);
        (0..width)
            .map(|idx| field_name(&format!("field-{}", idx + 1), idx))
            .collect()
    };

    let records: RecordSet = lines
        .map(|line| {
            headers
                .iter()
                .zip(line.iter())
                .map(|(header, value)| (header.as_str(), value))
                .collect::<Record>()
        })
        .collect();

    tracing::debug!(
        "Parsed {} records with {} fields",
        records.len(),
        headers.len()
    );
    Ok(records)
}

fn is_blank_line(row: &StringRecord) -> bool {
    row.is_empty() || (row.len() == 1 && row[0].is_empty())
}

fn field_name(header: &str, idx: usize) -> String {
    let key = sanitize_key(header);
    if key.is_empty() {
        format!("field_{}", idx + 1)
    } else {
        key
    }
}
