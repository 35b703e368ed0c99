//! JSON and CSV record ingestion.
//!
//! Batch ingestion never aborts on a single bad item: each row or array
//! element either normalizes into a record or contributes an itemized
//! error, and the report carries both.

use papershelf_domain::{normalize_record, PaperRecord, ParseError};
use serde_json::Value;

/// Itemized outcome of ingesting one file.
#[derive(Clone, Debug, Default)]
pub struct IngestReport {
    pub records: Vec<PaperRecord>,
    /// One entry per skipped item: position plus reason.
    pub errors: Vec<String>,
}

impl IngestReport {
    pub fn summary(&self) -> String {
        format!(
            "{} imported, {} skipped",
            self.records.len(),
            self.errors.len()
        )
    }
}

/// Ingest a JSON file: either an array of records or a single object.
///
/// An unreadable file is a [`ParseError`]; individual bad elements are
/// skipped and itemized in the report.
pub fn ingest_json(content: &str) -> Result<IngestReport, ParseError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| ParseError::UnrecognizedShape(format!("invalid JSON: {}", e)))?;

    let mut report = IngestReport::default();
    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                match normalize_record(item) {
                    Ok(record) => report.records.push(record),
                    Err(e) => report.errors.push(format!("record {}: {}", index, e)),
                }
            }
        }
        object @ Value::Object(_) => match normalize_record(&object) {
            Ok(record) => report.records.push(record),
            Err(e) => report.errors.push(format!("record 0: {}", e)),
        },
        other => {
            return Err(ParseError::UnrecognizedShape(format!(
                "expected object or array at top level, got {}",
                type_name(&other)
            )))
        }
    }
    Ok(report)
}

/// Ingest a CSV file with a header row. Each row is mapped through the
/// same normalization as JSON input, so the header names may use any
/// recognized spelling.
pub fn ingest_csv(content: &str) -> Result<IngestReport, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ParseError::UnrecognizedShape(format!("invalid CSV header: {}", e)))?
        .clone();

    let mut report = IngestReport::default();
    for (index, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                report.errors.push(format!("row {}: {}", index + 1, e));
                continue;
            }
        };

        if row.len() != headers.len() {
            report.errors.push(format!(
                "row {}: {} fields, expected {}",
                index + 1,
                row.len(),
                headers.len()
            ));
            continue;
        }

        let mut object = serde_json::Map::new();
        for (header, field) in headers.iter().zip(row.iter()) {
            if !field.is_empty() {
                object.insert(header.to_string(), Value::String(field.to_string()));
            }
        }

        match normalize_record(&Value::Object(object)) {
            Ok(record) => report.records.push(record),
            Err(e) => report.errors.push(format!("row {}: {}", index + 1, e)),
        }
    }
    Ok(report)
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
