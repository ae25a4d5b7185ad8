use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{}", unsupported_message(.spreadsheet))]
    UnsupportedFormat { spreadsheet: bool },

    #[error("Failed to read file: {0}")]
    Unreadable(String),

    #[error("File is empty")]
    EmptyFile,

    #[error("No headers found in file")]
    NoHeaders,
}

fn unsupported_message(spreadsheet: &bool) -> &'static str {
    if *spreadsheet {
        "Excel files (.xlsx/.xls) are not yet supported. Please use CSV format."
    } else {
        "Unsupported file format. Please use CSV files."
    }
}

/// One CSV data line keyed by header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRow {
    values: BTreeMap<String, String>,
}

impl ParsedRow {
    pub fn insert(&mut self, column: &str, value: String) {
        self.values.insert(column.to_string(), value);
    }

    /// Exact header match first, then a case-insensitive trimmed match so a
    /// `Name` header satisfies a `name` lookup the same way the column
    /// checker accepts it.
    pub fn get(&self, column: &str) -> Option<&str> {
        if let Some(v) = self.values.get(column) {
            return Some(v.as_str());
        }
        let wanted = column.trim().to_lowercase();
        self.values
            .iter()
            .find(|(k, _)| k.trim().to_lowercase() == wanted)
            .map(|(_, v)| v.as_str())
    }

    /// Value for `column`, or "" when the column is absent.
    pub fn value(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    #[cfg(test)]
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParsedRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileParseResult {
    pub success: bool,
    pub headers: Vec<String>,
    pub row_count: usize,
    pub rows: Vec<ParsedRow>,
    pub error: Option<ParseError>,
}

impl FileParseResult {
    fn parsed(headers: Vec<String>, rows: Vec<ParsedRow>) -> Self {
        Self {
            success: true,
            headers,
            row_count: rows.len(),
            rows,
            error: None,
        }
    }

    fn failed(error: ParseError) -> Self {
        Self {
            success: false,
            headers: Vec::new(),
            row_count: 0,
            rows: Vec::new(),
            error: Some(error),
        }
    }

    /// First `limit` rows, for display before submitting.
    pub fn preview(&self, limit: usize) -> &[ParsedRow] {
        &self.rows[..self.rows.len().min(limit)]
    }

    pub fn summary(&self) -> String {
        match &self.error {
            Some(e) => e.to_string(),
            None => format!(
                "File parsed successfully: {} rows detected with {} columns",
                self.row_count,
                self.headers.len()
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Only `.csv` is accepted; spreadsheets get their own message.
pub fn check_extension(file_path: &Path) -> Result<(), ParseError> {
    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => Ok(()),
        "xlsx" | "xls" => Err(ParseError::UnsupportedFormat { spreadsheet: true }),
        _ => Err(ParseError::UnsupportedFormat { spreadsheet: false }),
    }
}

pub fn parse_file(file_path: &Path) -> FileParseResult {
    if let Err(e) = check_extension(file_path) {
        return FileParseResult::failed(e);
    }
    match read_text(file_path) {
        Ok(text) => parse_csv_text(&text),
        Err(e) => FileParseResult::failed(e),
    }
}

pub fn parse_csv_text(text: &str) -> FileParseResult {
    match parse_records(text) {
        Ok((headers, rows)) => {
            debug!(rows = rows.len(), columns = headers.len(), "parsed csv text");
            FileParseResult::parsed(headers, rows)
        }
        Err(e) => FileParseResult::failed(e),
    }
}

fn read_text(file_path: &Path) -> Result<String, ParseError> {
    let bytes = std::fs::read(file_path).map_err(|e| ParseError::Unreadable(e.to_string()))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| ParseError::Unreadable("file is not valid UTF-8 text".to_string()))?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

fn parse_records(text: &str) -> Result<(Vec<String>, Vec<ParsedRow>), ParseError> {
    let lines: Vec<&str> = split_lines(text)
        .filter(|line| !line.trim().is_empty())
        .collect();
    let Some((header_line, data_lines)) = lines.split_first() else {
        return Err(ParseError::EmptyFile);
    };

    let headers = tokenize_line(header_line);
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ParseError::NoHeaders);
    }

    let mut rows = Vec::with_capacity(data_lines.len());
    for line in data_lines {
        let values = tokenize_line(line);
        if values.is_empty() {
            continue;
        }
        let mut row = ParsedRow::default();
        for (i, header) in headers.iter().enumerate() {
            row.insert(header, values.get(i).cloned().unwrap_or_default());
        }
        rows.push(row);
    }
    Ok((headers, rows))
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// Physical lines, split on `\n` / `\r\n`. Quote state never spans lines,
/// so an unbalanced `"` can only affect the line it sits on.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line))
}

/// `"` toggles quoted mode, `""` inside quotes is a literal quote, `,`
/// outside quotes separates fields. Fields are trimmed. Quoted mode ends
/// with the line.
pub fn tokenize_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}
