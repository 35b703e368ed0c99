//! Capacity-bounded fallback store.
//!
//! A single serialized-JSON text file standing in when the record store
//! is unavailable. Holds a simplified copy of the metadata: PDF payloads
//! are always stripped before saving and thumbnails over
//! [`THUMBNAIL_CHAR_LIMIT`] encoded characters are dropped, so the file
//! stays within its total-capacity ceiling.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use papershelf_domain::{PaperRecord, PdfRef};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Thumbnails above this many encoded characters are dropped on save.
pub const THUMBNAIL_CHAR_LIMIT: usize = 50_000;

/// Default total-capacity ceiling in encoded characters.
pub const DEFAULT_CAPACITY: usize = 5_000_000;

/// File-backed, capacity-bounded store of simplified records.
pub struct FallbackStore {
    path: PathBuf,
    capacity: usize,
}

/// Storage-usage breakdown for the quota remediation report.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FallbackUsage {
    pub records: usize,
    pub total_chars: usize,
    pub thumbnail_chars: usize,
    pub capacity: usize,
}

impl FallbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
        }
    }

    /// Load the saved payload. Absent file means no payload, not an error.
    pub fn load(&self) -> Result<Option<Vec<PaperRecord>>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Storage(format!("fallback read: {}", e))),
        };
        let records: Vec<PaperRecord> = serde_json::from_str(&text)
            .map_err(|e| StoreError::Storage(format!("fallback parse: {}", e)))?;
        Ok(Some(records))
    }

    /// Save a simplified copy of the records.
    ///
    /// Fails with [`StoreError::QuotaExceeded`] before writing anything
    /// when the serialized payload exceeds the capacity ceiling.
    pub fn save(&self, records: &[PaperRecord]) -> Result<(), StoreError> {
        let simplified: Vec<PaperRecord> = records.iter().map(simplify).collect();
        let text = serde_json::to_string(&simplified)
            .map_err(|e| StoreError::Storage(format!("fallback serialize: {}", e)))?;

        if text.len() > self.capacity {
            tracing::warn!(
                used = text.len(),
                limit = self.capacity,
                "fallback store quota exceeded"
            );
            return Err(StoreError::QuotaExceeded {
                used: text.len(),
                limit: self.capacity,
            });
        }

        fs::write(&self.path, text)
            .map_err(|e| StoreError::Storage(format!("fallback write: {}", e)))
    }

    /// Remove the payload entirely.
    pub fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Storage(format!("fallback clear: {}", e))),
        }
    }

    /// Usage breakdown of the current payload, for the remediation report
    /// shown when the quota is exceeded.
    pub fn usage_report(&self) -> Result<FallbackUsage, StoreError> {
        let records = self.load()?.unwrap_or_default();
        let total_chars = serde_json::to_string(&records)
            .map(|t| t.len())
            .unwrap_or(0);
        let thumbnail_chars = records
            .iter()
            .filter_map(|r| r.thumbnail.as_ref())
            .map(|t| t.len())
            .sum();
        Ok(FallbackUsage {
            records: records.len(),
            total_chars,
            thumbnail_chars,
            capacity: self.capacity,
        })
    }
}

/// Strip the binary payload and oversized thumbnails from a record.
fn simplify(record: &PaperRecord) -> PaperRecord {
    let mut copy = record.clone();
    copy.pdf = match &record.pdf {
        // CDN references are plain URLs, safe to keep.
        PdfRef::Cdn(url) => PdfRef::Cdn(url.clone()),
        _ => PdfRef::None,
    };
    if copy
        .thumbnail
        .as_ref()
        .is_some_and(|t| t.len() > THUMBNAIL_CHAR_LIMIT)
    {
        copy.thumbnail = None;
    }
    if copy
        .original_thumbnail
        .as_ref()
        .is_some_and(|t| t.len() > THUMBNAIL_CHAR_LIMIT)
    {
        copy.original_thumbnail = None;
    }
    copy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str) -> PaperRecord {
        let mut r = PaperRecord::new(
            "Sample".to_string(),
            vec!["Author".to_string()],
            2020,
            "Venue".to_string(),
        );
        r.id = id.to_string();
        r
    }

    #[test]
    fn absent_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FallbackStore::new(dir.path().join("fallback.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_load_clear_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FallbackStore::new(dir.path().join("fallback.json"));

        store.save(&[sample("p1"), sample("p2")]).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.len(), 2);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn save_strips_pdf_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = FallbackStore::new(dir.path().join("fallback.json"));

        let mut inline = sample("p1");
        inline.pdf = PdfRef::Inline("AAAA".repeat(100));
        let mut cdn = sample("p2");
        cdn.pdf = PdfRef::Cdn("https://cdn.example/u/r@v1/p2.pdf".to_string());

        store.save(&[inline, cdn]).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded[0].pdf, PdfRef::None);
        assert!(matches!(loaded[1].pdf, PdfRef::Cdn(_)));
    }

    #[test]
    fn oversized_thumbnails_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = FallbackStore::new(dir.path().join("fallback.json"));

        let mut big = sample("p1");
        big.thumbnail = Some("x".repeat(THUMBNAIL_CHAR_LIMIT + 1));
        let mut small = sample("p2");
        small.thumbnail = Some("y".repeat(100));

        store.save(&[big, small]).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert!(loaded[0].thumbnail.is_none());
        assert!(loaded[1].thumbnail.is_some());
    }

    #[test]
    fn quota_exceeded_leaves_previous_payload_intact() {
        let dir = tempfile::tempdir().unwrap();
        let store = FallbackStore::with_capacity(dir.path().join("fallback.json"), 2_000);

        store.save(&[sample("p1")]).unwrap();

        let mut fat = sample("p2");
        fat.abstract_text = "long ".repeat(1_000);
        let err = store.save(&[fat]).unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { .. }));

        // Prior payload survives the failed save.
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded[0].id, "p1");
    }

    #[test]
    fn usage_report_counts_thumbnails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FallbackStore::new(dir.path().join("fallback.json"));
        let mut r = sample("p1");
        r.thumbnail = Some("t".repeat(500));
        store.save(&[r]).unwrap();

        let usage = store.usage_report().unwrap();
        assert_eq!(usage.records, 1);
        assert_eq!(usage.thumbnail_chars, 500);
        assert!(usage.total_chars > 500);
    }
}
