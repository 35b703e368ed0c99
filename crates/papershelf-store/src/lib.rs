//! Persistence for the papershelf literature catalog.
//!
//! Three pieces: the [`RecordStore`] trait with its SQLite implementation,
//! the capacity-bounded [`FallbackStore`] used when the record store is
//! unavailable, and the [`BlobArena`] holding decoded binaries behind
//! explicitly released references. The one-shot fallback-to-store
//! migration lives in [`migrate`].

pub mod arena;
pub mod fallback;
pub mod migrate;
pub mod sqlite;
pub mod store;

pub use arena::BlobArena;
pub use fallback::{FallbackStore, FallbackUsage, THUMBNAIL_CHAR_LIMIT};
pub use migrate::{migrate_from_fallback, MigrationReport};
pub use sqlite::SqlitePaperStore;
pub use store::{RecordStore, StoreError};
