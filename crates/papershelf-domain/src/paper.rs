//! Paper record domain model

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Reference to a paper's PDF content.
///
/// Exactly one representation is active at a time. `Session` references
/// are transient handles into a blob arena and are invalid after restart.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PdfRef {
    /// No PDF attached (placeholder).
    #[default]
    None,
    /// Self-contained base64-encoded PDF bytes.
    Inline(String),
    /// Session-scoped blob-arena key. Invalidated on restart.
    Session(String),
    /// External content-delivery URL.
    Cdn(String),
}

impl PdfRef {
    /// Whether this reference carries resolvable PDF content.
    pub fn is_present(&self) -> bool {
        !matches!(self, PdfRef::None)
    }
}

/// A paper (the central catalog entity).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Unique identifier, immutable after creation.
    pub id: String,
    pub title: String,
    /// Ordered author list.
    pub authors: Vec<String>,
    pub year: i32,
    /// Venue or journal name.
    pub venue: String,
    #[serde(default = "default_research_area")]
    pub research_area: String,
    #[serde(default)]
    pub methodology: String,
    #[serde(default)]
    pub study_type: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub citations: u32,
    #[serde(default)]
    pub downloads: u32,
    /// Derived: `citations / 3`, recomputed on every structured edit.
    #[serde(default)]
    pub h_index: u32,
    #[serde(default)]
    pub abstract_text: String,
    #[serde(default)]
    pub doi: String,
    #[serde(default)]
    pub pdf: PdfRef,
    /// Current thumbnail (inline-encoded raster image), user-overridable.
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// System-generated first-page preview, restorable after override.
    #[serde(default)]
    pub original_thumbnail: Option<String>,
}

fn default_research_area() -> String {
    "General".to_string()
}

impl PaperRecord {
    /// Create a new record with required fields; everything else empty.
    pub fn new(title: String, authors: Vec<String>, year: i32, venue: String) -> Self {
        Self {
            id: new_paper_id(),
            title,
            authors,
            year,
            venue,
            research_area: default_research_area(),
            methodology: String::new(),
            study_type: String::new(),
            keywords: Vec::new(),
            citations: 0,
            downloads: 0,
            h_index: 0,
            abstract_text: String::new(),
            doi: String::new(),
            pdf: PdfRef::None,
            thumbnail: None,
            original_thumbnail: None,
        }
    }

    /// Text searched by the free-text filter predicate.
    pub fn search_text(&self) -> String {
        let mut text = String::with_capacity(
            self.title.len() + self.abstract_text.len() + 64,
        );
        text.push_str(&self.title);
        text.push(' ');
        text.push_str(&self.authors.join(" "));
        text.push(' ');
        text.push_str(&self.abstract_text);
        text.push(' ');
        text.push_str(&self.keywords.join(" "));
        text.to_lowercase()
    }
}

/// Derive the h-index proxy from a citation count.
pub fn derive_h_index(citations: u32) -> u32 {
    citations / 3
}

/// Generate a fresh paper id: millisecond timestamp plus a random suffix.
pub fn new_paper_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("p{}-{}", millis, &suffix[..8])
}

/// Lightweight projection of a record: metadata only, no binaries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaperMeta {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: i32,
    pub venue: String,
    pub research_area: String,
    pub methodology: String,
    pub study_type: String,
    pub keywords: Vec<String>,
    pub citations: u32,
    pub downloads: u32,
    pub h_index: u32,
    pub doi: String,
}

impl From<&PaperRecord> for PaperMeta {
    fn from(r: &PaperRecord) -> Self {
        Self {
            id: r.id.clone(),
            title: r.title.clone(),
            authors: r.authors.clone(),
            year: r.year,
            venue: r.venue.clone(),
            research_area: r.research_area.clone(),
            methodology: r.methodology.clone(),
            study_type: r.study_type.clone(),
            keywords: r.keywords.clone(),
            citations: r.citations,
            downloads: r.downloads,
            h_index: r.h_index,
            doi: r.doi.clone(),
        }
    }
}
