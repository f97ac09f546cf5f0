//! Deletion coordinator.
//!
//! Removal runs in the inverse order of creation: the catalog record
//! goes first, then the backing object. A crash between the two leaves
//! an orphaned object on disk, never a record pointing at nothing.

use tracing::{error, info};

use super::GalleryError;
use crate::db::{DbPool, Photo};
use crate::storage::MediaStore;

/// Delete a photo on behalf of `user_id`. Only the owner may delete;
/// everyone else learns nothing beyond "not authorized".
pub async fn remove(
    pool: &DbPool,
    store: &MediaStore,
    user_id: &str,
    photo_id: &str,
) -> Result<(), GalleryError> {
    let photo: Option<Photo> = sqlx::query_as("SELECT * FROM photos WHERE id = ?")
        .bind(photo_id)
        .fetch_optional(pool)
        .await?;

    let photo = photo.ok_or(GalleryError::NotFound)?;

    if photo.user_id != user_id {
        return Err(GalleryError::NotAuthorized);
    }

    let result = sqlx::query("DELETE FROM photos WHERE id = ?")
        .bind(photo_id)
        .execute(pool)
        .await?;

    // Someone else won a concurrent delete of the same row
    if result.rows_affected() == 0 {
        return Err(GalleryError::NotFound);
    }

    // Record is gone; failing to remove the bytes now only strands an
    // orphaned object. Log it for the operator instead of failing an
    // operation that already took effect.
    if let Err(e) = store.delete(&photo.filename).await {
        error!(
            filename = %photo.filename,
            "Orphaned object left in store after catalog delete: {}",
            e
        );
    }

    info!(photo_id = %photo_id, user_id = %user_id, "Photo deleted");
    Ok(())
}
