//! One-shot fallback-to-record-store migration.
//!
//! Runs at startup only when the record store initialized successfully
//! and the in-memory collection came from the fallback store. Best-effort:
//! a per-record failure is logged and counted, never halts the loop.
//! Partial success is the expected terminal state.

use papershelf_domain::{new_paper_id, PaperRecord};

use crate::fallback::FallbackStore;
use crate::store::{RecordStore, StoreError};

/// Outcome of a migration pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated: usize,
    pub failed: usize,
}

/// Copy every record into the record store; assign ids where absent and
/// carry thumbnails along. Returns per-pass counters.
pub fn migrate_records(
    records: &mut [PaperRecord],
    store: &dyn RecordStore,
) -> MigrationReport {
    let mut report = MigrationReport::default();

    for record in records.iter_mut() {
        if record.id.is_empty() {
            record.id = new_paper_id();
        }

        if let Err(e) = store.put(record, None) {
            tracing::warn!(paper = %record.id, error = %e, "migration: record put failed");
            report.failed += 1;
            continue;
        }

        if let Some(thumbnail) = &record.thumbnail {
            if let Err(e) = store.put_thumbnail(&record.id, Some(thumbnail)) {
                // Record made it; thumbnail loss is tolerated.
                tracing::warn!(paper = %record.id, error = %e, "migration: thumbnail put failed");
            }
        }

        report.migrated += 1;
    }

    tracing::info!(
        migrated = report.migrated,
        failed = report.failed,
        "fallback migration complete"
    );
    report
}

/// Full startup routine: migrate, then clear the fallback payload when at
/// least one record made it across.
pub fn migrate_from_fallback(
    records: &mut [PaperRecord],
    store: &dyn RecordStore,
    fallback: &FallbackStore,
) -> Result<MigrationReport, StoreError> {
    let report = migrate_records(records, store);
    if report.migrated > 0 {
        fallback.clear()?;
    }
    Ok(report)
}
