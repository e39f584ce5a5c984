use serde::{Deserialize, Serialize};

use crate::import::ImportError;

/// Header row plus data rows, cells trimmed, no type information.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CsvGrid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsvDialect {
    /// Split on newlines and commas; a comma inside a value misaligns the row.
    #[default]
    Naive,
    /// Quote-aware parsing through the `csv` crate.
    Quoted,
}

pub fn parse(text: &str, dialect: CsvDialect) -> Result<CsvGrid, ImportError> {
    match dialect {
        CsvDialect::Naive => Ok(parse_naive(text)),
        CsvDialect::Quoted => parse_quoted(text),
    }
}

pub fn parse_naive(text: &str) -> CsvGrid {
    let mut lines = text.split('\n');
    let headers = lines.next().map(split_cells).unwrap_or_else(|| vec![String::new()]);
    let rows = lines
        .filter(|line| !line.trim().is_empty())
        .map(split_cells)
        .collect();
    CsvGrid { headers, rows }
}

pub fn parse_quoted(text: &str) -> Result<CsvGrid, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let headers = match records.next() {
        Some(record) => record?.iter().map(str::to_string).collect(),
        None => vec![String::new()],
    };
    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        // whitespace-only line; empty lines never reach here
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(CsvGrid { headers, rows })
}

fn split_cells(line: &str) -> Vec<String> {
    line.split(',').map(|cell| cell.trim().to_string()).collect()
}
