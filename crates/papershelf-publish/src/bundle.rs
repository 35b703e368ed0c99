//! Static export bundle: a deployable snapshot of the catalog.
//!
//! Layout consumed by the static importer (and by the deployed site):
//! `index.json`, `papers.json`, `thumbnails.json`, and `papers/<id>.json`
//! per record. Exactly one of {inline binary, CDN reference} is present
//! per record, never both.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use papershelf_domain::{PaperMeta, PaperRecord, PdfRef};

use crate::error::PublishError;

/// Bundle format version.
pub const BUNDLE_VERSION: u32 = 1;

/// Content-delivery base serving uploaded release assets.
pub const CDN_BASE: &str = "https://cdn.jsdelivr.net/gh";

/// Placeholder tag rendered before the release tag is known. A bundle
/// still carrying it is not final.
pub const TAG_PENDING: &str = "undefined";

/// The deterministic content-delivery URL for one paper's PDF.
pub fn cdn_url(owner: &str, repo: &str, tag: &str, id: &str) -> String {
    format!("{}/{}/{}@{}/{}.pdf", CDN_BASE, owner, repo, tag, id)
}

/// `index.json`: category map plus sorted facet lists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleIndex {
    pub version: u32,
    pub total_papers: usize,
    /// Research area label to paper ids, in collection order.
    pub categories: BTreeMap<String, Vec<String>>,
    /// Distinct years, descending.
    pub years: Vec<i32>,
    /// Distinct venues, ascending.
    pub venues: Vec<String>,
    /// Distinct keywords, ascending.
    pub keywords: Vec<String>,
}

/// `papers.json`: the lightweight metadata listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaperListing {
    pub version: u32,
    pub total_papers: usize,
    pub papers: Vec<PaperMeta>,
}

/// `thumbnails.json`: id to inline image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailMap {
    pub version: u32,
    pub thumbnails: BTreeMap<String, String>,
}

/// A PDF queued for upload to the hosted-release API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseAsset {
    /// Always `<id>.pdf`, matching the CDN naming scheme.
    pub name: String,
    pub data: Vec<u8>,
}

/// Hosted-release destination for queued binaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostedTarget {
    pub owner: String,
    pub repo: String,
    /// Known release tag; `None` renders the pending placeholder.
    pub tag: Option<String>,
}

/// Export options.
#[derive(Clone, Debug, Default)]
pub struct ExportOptions {
    /// When set, binaries are queued as release assets and `pdf`
    /// references are rewritten to content-delivery URLs instead of
    /// being inlined.
    pub hosted: Option<HostedTarget>,
}

/// The derived, non-authoritative snapshot.
#[derive(Clone, Debug)]
pub struct Bundle {
    pub index: BundleIndex,
    pub listing: PaperListing,
    pub thumbnails: ThumbnailMap,
    /// Full per-paper records, keyed by id.
    pub records: BTreeMap<String, PaperRecord>,
    /// Binaries queued for the hosted release (hosted mode only).
    pub assets: Vec<ReleaseAsset>,
}

impl Bundle {
    /// Rewrite every pending CDN reference to carry the release tag.
    pub fn finalize_tag(&mut self, tag: &str) {
        let ids: Vec<String> = self.records.keys().cloned().collect();
        self.finalize_tag_for(&ids, tag);
    }

    /// Rewrite pending CDN references for the given ids only, leaving the
    /// rest unchanged.
    pub fn finalize_tag_for(&mut self, ids: &[String], tag: &str) {
        let pending = format!("@{}/", TAG_PENDING);
        let resolved = format!("@{}/", tag);
        for id in ids {
            if let Some(record) = self.records.get_mut(id) {
                if let PdfRef::Cdn(u) = &record.pdf {
                    if u.contains(&pending) {
                        record.pdf = PdfRef::Cdn(u.replace(&pending, &resolved));
                    }
                }
            }
        }
    }

    /// A bundle is final once no record still points at the pending tag.
    pub fn is_final(&self) -> bool {
        let pending = format!("@{}/", TAG_PENDING);
        !self.records.values().any(|r| match &r.pdf {
            PdfRef::Cdn(u) => u.contains(&pending),
            _ => false,
        })
    }
}

/// Build the export bundle from the in-memory collection.
///
/// `binary_for` resolves a paper id to its PDF bytes (record store or
/// blob arena); records whose `pdf` is inline are decoded as a second
/// source. Session references never export.
pub fn build_bundle(
    records: &[PaperRecord],
    mut binary_for: impl FnMut(&str) -> Option<Vec<u8>>,
    options: &ExportOptions,
) -> Result<Bundle, PublishError> {
    let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut years: BTreeSet<i32> = BTreeSet::new();
    let mut venues: BTreeSet<String> = BTreeSet::new();
    let mut keywords: BTreeSet<String> = BTreeSet::new();
    let mut thumbnails = BTreeMap::new();
    let mut out_records = BTreeMap::new();
    let mut assets = Vec::new();

    for record in records {
        categories
            .entry(record.research_area.clone())
            .or_default()
            .push(record.id.clone());
        years.insert(record.year);
        if !record.venue.is_empty() {
            venues.insert(record.venue.clone());
        }
        for kw in &record.keywords {
            keywords.insert(kw.clone());
        }
        if let Some(thumbnail) = &record.thumbnail {
            thumbnails.insert(record.id.clone(), thumbnail.clone());
        }

        let bytes = match binary_for(&record.id) {
            Some(bytes) => Some(bytes),
            None => match &record.pdf {
                PdfRef::Inline(encoded) => Some(decode_inline(encoded)?),
                _ => None,
            },
        };

        let mut exported = record.clone();
        exported.pdf = match (&options.hosted, bytes) {
            (Some(target), Some(bytes)) => {
                assets.push(ReleaseAsset {
                    name: format!("{}.pdf", record.id),
                    data: bytes,
                });
                let tag = target.tag.as_deref().unwrap_or(TAG_PENDING);
                PdfRef::Cdn(cdn_url(&target.owner, &target.repo, tag, &record.id))
            }
            (None, Some(bytes)) => PdfRef::Inline(BASE64.encode(&bytes)),
            (_, None) => match &record.pdf {
                PdfRef::Cdn(u) => PdfRef::Cdn(u.clone()),
                _ => PdfRef::None,
            },
        };
        out_records.insert(record.id.clone(), exported);
    }

    let metas: Vec<PaperMeta> = records.iter().map(PaperMeta::from).collect();

    Ok(Bundle {
        index: BundleIndex {
            version: BUNDLE_VERSION,
            total_papers: records.len(),
            categories,
            years: years.into_iter().rev().collect(),
            venues: venues.into_iter().collect(),
            keywords: keywords.into_iter().collect(),
        },
        listing: PaperListing {
            version: BUNDLE_VERSION,
            total_papers: records.len(),
            papers: metas,
        },
        thumbnails: ThumbnailMap {
            version: BUNDLE_VERSION,
            thumbnails,
        },
        records: out_records,
        assets,
    })
}

/// Decode an inline binary, with or without a `data:` URL prefix.
pub(crate) fn decode_inline(encoded: &str) -> Result<Vec<u8>, PublishError> {
    let payload = match encoded.split_once("base64,") {
        Some((_, rest)) => rest,
        None => encoded,
    };
    BASE64
        .decode(payload.trim())
        .map_err(|e| PublishError::Decode(e.to_string()))
}

/// Write the bundle's file set under `dir`.
pub fn write_to_dir(bundle: &Bundle, dir: &Path) -> Result<(), PublishError> {
    fs::create_dir_all(dir.join("papers"))?;
    fs::write(
        dir.join("index.json"),
        serde_json::to_string_pretty(&bundle.index)?,
    )?;
    fs::write(
        dir.join("papers.json"),
        serde_json::to_string_pretty(&bundle.listing)?,
    )?;
    fs::write(
        dir.join("thumbnails.json"),
        serde_json::to_string_pretty(&bundle.thumbnails)?,
    )?;
    for (id, record) in &bundle.records {
        fs::write(
            dir.join("papers").join(format!("{}.json", id)),
            serde_json::to_string_pretty(record)?,
        )?;
    }
    tracing::info!(
        papers = bundle.records.len(),
        assets = bundle.assets.len(),
        dir = %dir.display(),
        "bundle written"
    );
    Ok(())
}
