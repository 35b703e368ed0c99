use papershelf_domain::{FieldError, ParseError};
use papershelf_store::StoreError;

/// Errors from catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// An edit was rejected; the prior in-memory state is untouched.
    #[error("validation failed: {}", field_list(.0))]
    Validation(Vec<FieldError>),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

fn field_list(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
