use papershelf_domain::PaperRecord;

/// The trait all record-store backends implement.
///
/// A `put` of a record together with a binary is best-effort: the record
/// row and the blob are written in the same logical scope but NOT
/// atomically. A failure on one side is surfaced to the caller and does
/// not roll back the other side. This is the documented contract, not an
/// oversight.
pub trait RecordStore: Send + Sync {
    /// Persist a record, and its PDF bytes when present.
    fn put(&self, record: &PaperRecord, binary: Option<&[u8]>) -> Result<(), StoreError>;

    /// All persisted records, thumbnails rejoined.
    fn get_all(&self) -> Result<Vec<PaperRecord>, StoreError>;

    /// PDF bytes for a record, if stored.
    fn get_binary(&self, id: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Persist a thumbnail image (inline-encoded) for a record. `None`
    /// clears the stored thumbnail.
    fn put_thumbnail(&self, id: &str, image: Option<&str>) -> Result<(), StoreError>;

    /// Thumbnail for a record, if stored.
    fn get_thumbnail(&self, id: &str) -> Result<Option<String>, StoreError>;

    /// Remove a record with its binary and thumbnail.
    fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The persistent store failed to initialize. Non-fatal: callers fall
    /// back to the fallback store.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// A single record or binary write failed. Batch operations log this
    /// and continue.
    #[error("write failed for {id}: {message}")]
    Write { id: String, message: String },

    /// The fallback store's capacity ceiling was exceeded. Triggers a
    /// user-visible storage-usage report.
    #[error("fallback store quota exceeded: {used} of {limit} encoded characters")]
    QuotaExceeded { used: usize, limit: usize },

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        let err = StoreError::QuotaExceeded {
            used: 6_000_000,
            limit: 5_000_000,
        };
        assert!(err.to_string().contains("quota exceeded"));
        assert!(err.to_string().contains("6000000"));

        let err = StoreError::Write {
            id: "p1".into(),
            message: "disk full".into(),
        };
        assert!(err.to_string().contains("p1"));
    }
}
