//! Normalization of external record shapes.
//!
//! Input files spell the same field several ways (`venue` vs `journal`,
//! `researchArea` vs `category`, author string vs author array). This
//! module maps every recognized shape onto the canonical [`PaperRecord`];
//! anything else is a [`ParseError`], not a best-effort guess.

use crate::paper::{derive_h_index, new_paper_id, PaperRecord, PdfRef};
use serde_json::Value;
use thiserror::Error;

/// A record that could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unrecognized record shape: {0}")]
    UnrecognizedShape(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

/// Normalize one parsed JSON value into a canonical record.
///
/// `h_index` is always derived from `citations` here, regardless of what
/// the input carries.
pub fn normalize_record(value: &Value) -> Result<PaperRecord, ParseError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ParseError::UnrecognizedShape(shape_name(value)))?;

    let title = first_string(obj, &["title", "name"])
        .ok_or(ParseError::MissingField("title"))?;

    let authors = authors_field(obj)?;

    let year = first_value(obj, &["year", "publicationYear", "publication_year"])
        .map(parse_year)
        .transpose()?
        .ok_or(ParseError::MissingField("year"))?;

    let venue = first_string(obj, &["venue", "journal"]).unwrap_or_default();

    let citations = first_value(obj, &["citations", "citationCount", "citation_count"])
        .map(|v| parse_count(v, "citations"))
        .transpose()?
        .unwrap_or(0);
    let downloads = first_value(obj, &["downloads", "downloadCount", "download_count"])
        .map(|v| parse_count(v, "downloads"))
        .transpose()?
        .unwrap_or(0);

    let keywords = match obj.get("keywords").or_else(|| obj.get("tags")) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => split_list(s),
        Some(other) => {
            return Err(ParseError::InvalidValue {
                field: "keywords",
                message: format!("expected array or string, got {}", shape_name(other)),
            })
        }
        None => Vec::new(),
    };

    let id = first_string(obj, &["id", "paperId", "paper_id"])
        .filter(|s| !s.is_empty())
        .unwrap_or_else(new_paper_id);

    Ok(PaperRecord {
        id,
        title,
        authors,
        year,
        venue,
        research_area: first_string(obj, &["researchArea", "research_area", "category"])
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "General".to_string()),
        methodology: first_string(obj, &["methodology", "method"]).unwrap_or_default(),
        study_type: first_string(obj, &["studyType", "study_type"]).unwrap_or_default(),
        keywords,
        citations,
        downloads,
        h_index: derive_h_index(citations),
        abstract_text: first_string(obj, &["abstract", "abstract_text", "summary"])
            .unwrap_or_default(),
        doi: first_string(obj, &["doi", "DOI"]).unwrap_or_default(),
        pdf: pdf_field(obj),
        thumbnail: first_string(obj, &["thumbnail"]).filter(|s| !s.is_empty()),
        original_thumbnail: first_string(obj, &["originalThumbnail", "original_thumbnail"])
            .filter(|s| !s.is_empty()),
    })
}

fn shape_name(v: &Value) -> String {
    match v {
        Value::Null => "null".into(),
        Value::Bool(_) => "boolean".into(),
        Value::Number(_) => "number".into(),
        Value::String(_) => "string".into(),
        Value::Array(_) => "array".into(),
        Value::Object(_) => "object".into(),
    }
}

fn first_value<'a>(
    obj: &'a serde_json::Map<String, Value>,
    keys: &[&str],
) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

fn first_string(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    first_value(obj, keys).and_then(|v| match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Authors arrive as an array of strings or a single delimited string.
fn authors_field(obj: &serde_json::Map<String, Value>) -> Result<Vec<String>, ParseError> {
    match first_value(obj, &["authors", "author"]) {
        Some(Value::Array(items)) => Ok(items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()),
        Some(Value::String(s)) => Ok(split_list(s)),
        Some(other) => Err(ParseError::InvalidValue {
            field: "authors",
            message: format!("expected array or string, got {}", shape_name(other)),
        }),
        None => Ok(Vec::new()),
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn parse_year(v: &Value) -> Result<i32, ParseError> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .and_then(|y| i32::try_from(y).ok())
            .ok_or_else(|| ParseError::InvalidValue {
                field: "year",
                message: format!("not a valid integer: {}", n),
            }),
        Value::String(s) => s.trim().parse().map_err(|_| ParseError::InvalidValue {
            field: "year",
            message: format!("not an integer: {:?}", s),
        }),
        other => Err(ParseError::InvalidValue {
            field: "year",
            message: format!("expected number, got {}", shape_name(other)),
        }),
    }
}

fn parse_count(v: &Value, field: &'static str) -> Result<u32, ParseError> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .and_then(|c| u32::try_from(c).ok())
            .ok_or_else(|| ParseError::InvalidValue {
                field,
                message: format!("not a valid non-negative integer: {}", n),
            }),
        Value::String(s) => s.trim().parse().map_err(|_| ParseError::InvalidValue {
            field,
            message: format!("not a non-negative integer: {:?}", s),
        }),
        other => Err(ParseError::InvalidValue {
            field,
            message: format!("expected number, got {}", shape_name(other)),
        }),
    }
}

fn pdf_field(obj: &serde_json::Map<String, Value>) -> PdfRef {
    match first_string(obj, &["pdfUrl", "pdf_url", "pdf"]) {
        Some(s) if s.starts_with("http://") || s.starts_with("https://") => PdfRef::Cdn(s),
        Some(s) if s.starts_with("data:") => PdfRef::Inline(s),
        _ => PdfRef::None,
    }
}
