//! Static import: the mirror of the bundle exporter.
//!
//! Probes a deployed bundle, lists paper metadata, lazily loads one
//! per-paper file per id (memoized), and decodes inline binaries into
//! blob-arena references. Decoded references are released by
//! [`StaticImport::clear_cache`]; dropping the importer without clearing
//! releases them too, since the arena lives inside it.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use papershelf_domain::{PaperMeta, PaperRecord, PdfRef};
use papershelf_store::BlobArena;

use crate::bundle::{decode_inline, BundleIndex, PaperListing};
use crate::error::PublishError;

/// Read access to a deployed bundle's file set.
pub trait BundleSource {
    /// Read a file by bundle-relative path; `None` when absent.
    fn read(&self, path: &str) -> Result<Option<String>, PublishError>;
}

/// Directory-backed bundle source.
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BundleSource for DirSource {
    fn read(&self, path: &str) -> Result<Option<String>, PublishError> {
        match fs::read_to_string(self.root.join(path)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PublishError::Io(e)),
        }
    }
}

/// Lazy reader over a deployed bundle.
pub struct StaticImport<S: BundleSource> {
    source: S,
    index: BundleIndex,
    metas: Option<Vec<PaperMeta>>,
    /// Memo table: one fetch per id. `None` records a confirmed absence.
    records: HashMap<String, Option<PaperRecord>>,
    arena: BlobArena,
}

impl<S: BundleSource> StaticImport<S> {
    /// Probe for the index file. An absent bundle reports unavailable
    /// (`Ok(None)`), not an error.
    pub fn initialize(source: S) -> Result<Option<Self>, PublishError> {
        let Some(text) = source.read("index.json")? else {
            tracing::debug!("no static bundle present");
            return Ok(None);
        };
        let index: BundleIndex =
            serde_json::from_str(&text).map_err(|e| PublishError::Bundle {
                path: "index.json".to_string(),
                message: e.to_string(),
            })?;
        Ok(Some(Self {
            source,
            index,
            metas: None,
            records: HashMap::new(),
            arena: BlobArena::new(),
        }))
    }

    pub fn index(&self) -> &BundleIndex {
        &self.index
    }

    /// The metadata listing, fetched once and cached.
    pub fn all_papers(&mut self) -> Result<&[PaperMeta], PublishError> {
        if self.metas.is_none() {
            let text = self.source.read("papers.json")?.ok_or_else(|| {
                PublishError::Bundle {
                    path: "papers.json".to_string(),
                    message: "missing from bundle".to_string(),
                }
            })?;
            let listing: PaperListing =
                serde_json::from_str(&text).map_err(|e| PublishError::Bundle {
                    path: "papers.json".to_string(),
                    message: e.to_string(),
                })?;
            self.metas = Some(listing.papers);
        }
        Ok(self.metas.as_deref().unwrap_or_default())
    }

    /// Load one paper's full record, fetching its file at most once.
    ///
    /// An inline binary is decoded into an arena reference and the inline
    /// copy discarded, bounding resident memory to one decoded copy. CDN
    /// references pass through untouched.
    pub fn paper_data(&mut self, id: &str) -> Result<Option<&PaperRecord>, PublishError> {
        if !self.records.contains_key(id) {
            let fetched = match self.source.read(&format!("papers/{}.json", id))? {
                Some(text) => {
                    let mut record: PaperRecord =
                        serde_json::from_str(&text).map_err(|e| PublishError::Bundle {
                            path: format!("papers/{}.json", id),
                            message: e.to_string(),
                        })?;
                    if let PdfRef::Inline(encoded) = &record.pdf {
                        let bytes = decode_inline(encoded)?;
                        let key = self.arena.insert(bytes);
                        record.pdf = PdfRef::Session(key);
                    }
                    Some(record)
                }
                None => None,
            };
            self.records.insert(id.to_string(), fetched);
        }
        Ok(self.records.get(id).and_then(|r| r.as_ref()))
    }

    /// Resolve a session reference produced by [`Self::paper_data`].
    pub fn binary(&self, key: &str) -> Option<&[u8]> {
        self.arena.get(key)
    }

    /// Live decoded references (diagnostics).
    pub fn resident_blobs(&self) -> usize {
        self.arena.len()
    }

    /// Release every decoded reference, then drop the memo table.
    pub fn clear_cache(&mut self) {
        self.arena.release_all();
        self.records.clear();
    }
}
