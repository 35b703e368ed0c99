//! Catalog service for the papershelf literature catalog.
//!
//! Owns the in-memory collection and every mutation path; persists
//! through the record store (preferred) or the fallback store. The
//! catalog is an explicitly constructed context object passed to whoever
//! needs it; there is no ambient instance.

pub mod catalog;
pub mod error;
pub mod ingest;

pub use catalog::{
    Catalog, CatalogSources, Facets, LoadOrigin, Page, SortKey, PAGE_SIZE,
};
pub use error::CatalogError;
pub use ingest::{ingest_csv, ingest_json, IngestReport};
