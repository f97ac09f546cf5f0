//! Upload coordinator.
//!
//! Ordering is the whole point here: bytes are committed to the media
//! store before the catalog record is written, and a failed record
//! write triggers a best-effort delete of the now-orphaned object. The
//! compensating delete is logged, never re-raised, so the caller always
//! sees the original failure.

use chrono::{NaiveDate, Utc};
use tracing::{error, info};
use uuid::Uuid;

use super::GalleryError;
use crate::db::{DbPool, Photo};
use crate::storage::MediaStore;

/// An incoming file payload as extracted from the multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Accept an upload on behalf of `user_id`: validate, store the bytes,
/// then record the photo in the catalog. `category` defaults to today.
pub async fn submit(
    pool: &DbPool,
    store: &MediaStore,
    user_id: &str,
    payload: Option<Upload>,
    category: Option<String>,
) -> Result<Photo, GalleryError> {
    let payload = match payload {
        Some(p) if !p.bytes.is_empty() => p,
        _ => return Err(GalleryError::NoFileProvided),
    };

    let category = match category.filter(|c| !c.is_empty()) {
        Some(c) => {
            if NaiveDate::parse_from_str(&c, "%Y-%m-%d").is_err() {
                return Err(GalleryError::InvalidCategory(c));
            }
            c
        }
        None => Utc::now().format("%Y-%m-%d").to_string(),
    };

    let object = store.put(&payload.bytes, &payload.mime).await?;

    let photo = Photo {
        id: Uuid::new_v4().to_string(),
        filename: object.filename,
        path: object.public_path,
        category,
        upload_date: Utc::now().to_rfc3339(),
        user_id: user_id.to_string(),
    };

    let inserted = sqlx::query(
        "INSERT INTO photos (id, filename, path, category, upload_date, user_id) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&photo.id)
    .bind(&photo.filename)
    .bind(&photo.path)
    .bind(&photo.category)
    .bind(&photo.upload_date)
    .bind(&photo.user_id)
    .execute(pool)
    .await;

    if let Err(e) = inserted {
        error!("Failed to record photo in catalog: {}", e);
        // The object is already durable; remove it so the store and the
        // catalog stay consistent. If even that fails, leave a trail for
        // the operator and still report the original failure.
        if let Err(cleanup) = store.delete(&photo.filename).await {
            error!(
                filename = %photo.filename,
                "Orphaned object left in store after failed catalog write: {}",
                cleanup
            );
        }
        return Err(GalleryError::Database(e));
    }

    info!(photo_id = %photo.id, user_id = %user_id, "Photo uploaded");
    Ok(photo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::testutil::{fixture, object_count, photo_count, MAX_BYTES};
    use crate::storage::StoreError;

    fn jpeg_payload() -> Option<Upload> {
        Some(Upload {
            bytes: b"\xff\xd8\xff\xe0 fake jpeg".to_vec(),
            mime: "image/jpeg".to_string(),
        })
    }

    #[tokio::test]
    async fn test_submit_records_object_and_metadata_together() {
        let (pool, store, tmp, user) = fixture().await;

        let photo = submit(&pool, &store, &user.id, jpeg_payload(), None)
            .await
            .unwrap();

        assert!(tmp.path().join(&photo.filename).is_file());
        assert_eq!(photo_count(&pool).await, 1);
        assert_eq!(photo.path, format!("/uploads/{}", photo.filename));
        assert_eq!(photo.user_id, user.id);
    }

    #[tokio::test]
    async fn test_submit_defaults_category_to_today() {
        let (pool, store, _tmp, user) = fixture().await;

        let photo = submit(&pool, &store, &user.id, jpeg_payload(), None)
            .await
            .unwrap();
        let today = Utc::now().format("%Y-%m-%d").to_string();
        assert_eq!(photo.category, today);
    }

    #[tokio::test]
    async fn test_submit_accepts_explicit_category() {
        let (pool, store, _tmp, user) = fixture().await;

        let photo = submit(
            &pool,
            &store,
            &user.id,
            jpeg_payload(),
            Some("2024-01-02".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(photo.category, "2024-01-02");
    }

    #[tokio::test]
    async fn test_submit_rejects_malformed_category() {
        let (pool, store, tmp, user) = fixture().await;

        let err = submit(
            &pool,
            &store,
            &user.id,
            jpeg_payload(),
            Some("last tuesday".to_string()),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, GalleryError::InvalidCategory(_)));
        assert_eq!(photo_count(&pool).await, 0);
        assert_eq!(object_count(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_submit_without_payload() {
        let (pool, store, _tmp, user) = fixture().await;

        let err = submit(&pool, &store, &user.id, None, None).await.unwrap_err();
        assert!(matches!(err, GalleryError::NoFileProvided));

        let empty = Some(Upload {
            bytes: Vec::new(),
            mime: "image/png".to_string(),
        });
        let err = submit(&pool, &store, &user.id, empty, None).await.unwrap_err();
        assert!(matches!(err, GalleryError::NoFileProvided));
    }

    #[tokio::test]
    async fn test_unsupported_type_leaves_no_trace() {
        let (pool, store, tmp, user) = fixture().await;

        let payload = Some(Upload {
            bytes: b"just text".to_vec(),
            mime: "text/plain".to_string(),
        });
        let err = submit(&pool, &store, &user.id, payload, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GalleryError::Store(StoreError::UnsupportedType(_))
        ));
        assert_eq!(photo_count(&pool).await, 0);
        assert_eq!(object_count(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_oversized_upload_leaves_no_trace() {
        let (pool, store, tmp, user) = fixture().await;

        let payload = Some(Upload {
            bytes: vec![0u8; (MAX_BYTES + 1) as usize],
            mime: "image/png".to_string(),
        });
        let err = submit(&pool, &store, &user.id, payload, None)
            .await
            .unwrap_err();

        assert!(matches!(err, GalleryError::Store(StoreError::TooLarge { .. })));
        assert_eq!(photo_count(&pool).await, 0);
        assert_eq!(object_count(tmp.path()), 0);
    }

    #[tokio::test]
    async fn test_failed_catalog_write_compensates_stored_object() {
        let (pool, store, tmp, user) = fixture().await;

        // Force the catalog write to fail after the object write succeeds
        sqlx::query("DROP TABLE photos").execute(&pool).await.unwrap();

        let err = submit(&pool, &store, &user.id, jpeg_payload(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, GalleryError::Database(_)));
        // The compensating delete removed the orphaned object
        assert_eq!(object_count(tmp.path()), 0);
    }
}
