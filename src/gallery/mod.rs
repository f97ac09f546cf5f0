//! The gallery core: upload and deletion coordinators plus the grouped
//! read-only projection of the photo catalog.
//!
//! The coordinators own the one invariant that matters in this system:
//! a catalog record exists if and only if the media store holds the
//! bytes it points at. Creation writes bytes first and compensates if
//! the record cannot follow; deletion removes the record first so a
//! crash can only strand an orphaned object, never a dangling record.

mod assemble;
mod delete;
mod upload;

pub use assemble::{list_grouped, GalleryGroup, PhotoView};
pub use delete::remove;
pub use upload::{submit, Upload};

use thiserror::Error;

use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("No file uploaded or file type not supported.")]
    NoFileProvided,

    #[error("Invalid date: {0} (expected YYYY-MM-DD)")]
    InvalidCategory(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Photo not found")]
    NotFound,

    #[error("Not authorized")]
    NotAuthorized,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
