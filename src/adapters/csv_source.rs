use crate::domain::model::Row;
use crate::utils::error::{RelayError, Result};
use std::io::Read;
use std::path::Path;

/// Reads the CSV export of a worksheet. The first record is the header;
/// blank header cells drop their column and fully blank records are skipped.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<Row>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = csv_reader.records();

    let headers: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(|h| h.trim().to_string()).collect(),
        None => {
            return Err(RelayError::ParseError {
                message: "File must contain headers and at least one data row".to_string(),
            })
        }
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let mut row = Row::new();
        for (index, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = record.get(index).map(str::trim).unwrap_or("");
            row.push(header.clone(), value);
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(RelayError::ParseError {
            message: "No valid data rows found in the file".to_string(),
        });
    }

    tracing::debug!("Parsed {} rows with {} columns", rows.len(), headers.len());
    Ok(rows)
}

pub fn read_rows_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Row>> {
    let file = std::fs::File::open(&path)?;
    read_rows(file)
}
