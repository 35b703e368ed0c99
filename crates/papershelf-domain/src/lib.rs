//! Domain models for the papershelf literature catalog.
//!
//! Pure data types and pure functions only: records, normalization of
//! external record shapes, validation, and filtering. No I/O.

pub mod filter;
pub mod normalize;
pub mod paper;
pub mod validation;

pub use filter::FilterState;
pub use normalize::{normalize_record, ParseError};
pub use paper::{derive_h_index, new_paper_id, PaperMeta, PaperRecord, PdfRef};
pub use validation::{validate_record, FieldError};
