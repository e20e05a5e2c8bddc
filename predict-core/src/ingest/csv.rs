//! CSV reader for uploaded tables
//!
//! RFC 4180 quoting: fields may be wrapped in double quotes, `""` inside a
//! quoted field is a literal quote, and quoted fields may span lines.
//! Blank lines are skipped. Short rows are padded with empty cells, long
//! rows are rejected.

use std::collections::{HashMap, HashSet};

use super::Table;
use crate::error::IngestError;

/// Parse CSV text into a raw (uncleaned) table. The first record is the header.
pub fn parse_csv(text: &str) -> Result<Table, IngestError> {
    let mut records = split_records(text)?.into_iter();

    let (_, header) = records.next().ok_or(IngestError::Empty)?;
    let columns = dedupe_columns(header);
    let width = columns.len();

    let mut rows = Vec::new();
    for (line, mut row) in records {
        if row.len() > width {
            return Err(IngestError::RaggedRow {
                line,
                expected: width,
                found: row.len(),
            });
        }
        row.resize(width, String::new());
        rows.push(row);
    }

    Ok(Table { columns, rows })
}

/// Repeated header names get a `.N` suffix so every column stays addressable.
/// A suffix never reuses a name that appears in the header or was already
/// generated.
fn dedupe_columns(header: Vec<String>) -> Vec<String> {
    let names: Vec<String> = header.iter().map(|name| name.trim().to_string()).collect();
    let reserved: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut taken: HashSet<String> = HashSet::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        if taken.insert(name.clone()) {
            columns.push(name.clone());
            continue;
        }

        let count = counts.entry(name.as_str()).or_insert(0);
        loop {
            *count += 1;
            let candidate = format!("{}.{}", name, count);
            if !reserved.contains(candidate.as_str()) && taken.insert(candidate.clone()) {
                columns.push(candidate);
                break;
            }
        }
    }
    columns
}

/// Split text into records, each tagged with the line it starts on
fn split_records(text: &str) -> Result<Vec<(usize, Vec<String>)>, IngestError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut records = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quote_start = 0;
    let mut line = 1;
    let mut row_start = 1;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_start = line;
            }
            ',' => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\r' | '\n' => {
                row.push(std::mem::take(&mut field));
                push_record(&mut records, row_start, std::mem::take(&mut row));
                line += 1;
                row_start = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(IngestError::UnterminatedQuote(quote_start));
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        push_record(&mut records, row_start, row);
    }

    Ok(records)
}

fn push_record(records: &mut Vec<(usize, Vec<String>)>, line: usize, row: Vec<String>) {
    // Blank line
    if row.len() == 1 && row[0].trim().is_empty() {
        return;
    }
    records.push((line, row));
}
