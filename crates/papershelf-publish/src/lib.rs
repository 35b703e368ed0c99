//! Static bundle export/import and hosted-release publishing.
//!
//! The export side serializes the catalog into a deployable file set
//! (`index.json`, `papers.json`, `thumbnails.json`, one file per paper)
//! and can queue PDF binaries as release assets served through a CDN.
//! The import side is its mirror: probe a deployed bundle, list papers,
//! lazily load per-paper records, and resolve binary references.

pub mod bundle;
pub mod deploy;
pub mod error;
pub mod import;
pub mod release;

pub use bundle::{
    build_bundle, cdn_url, write_to_dir, Bundle, BundleIndex, ExportOptions, HostedTarget,
    PaperListing, ReleaseAsset, ThumbnailMap, BUNDLE_VERSION, CDN_BASE, TAG_PENDING,
};
pub use deploy::{deploy, DeployOutcome};
pub use error::PublishError;
pub use import::{BundleSource, DirSource, StaticImport};
pub use release::{
    upload_assets, Release, ReleaseApi, ReleaseClient, UploadOutcome, UPLOAD_DELAY,
};
