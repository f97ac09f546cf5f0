//! Grouped gallery projection.
//!
//! Read-only view over the catalog: photos bucketed by category date,
//! newest category first. Within a group photos keep their catalog
//! order (most recent upload first), which stays stable between reads.

use super::GalleryError;
use crate::db::{DbPool, Photo};

/// One photo as the gallery renders it.
#[derive(Debug, Clone)]
pub struct PhotoView {
    pub id: String,
    pub path: String,
    pub filename: String,
    /// Whether the delete button is rendered. Any authenticated viewer
    /// sees it; ownership is enforced when the delete is submitted.
    pub can_delete: bool,
}

#[derive(Debug, Clone)]
pub struct GalleryGroup {
    pub category: String,
    pub photos: Vec<PhotoView>,
}

/// Assemble the gallery for a viewer. Never mutates the catalog.
pub async fn list_grouped(
    pool: &DbPool,
    viewer_authenticated: bool,
) -> Result<Vec<GalleryGroup>, GalleryError> {
    let photos: Vec<Photo> = sqlx::query_as("SELECT * FROM photos ORDER BY upload_date DESC")
        .fetch_all(pool)
        .await?;

    let mut groups: Vec<GalleryGroup> = Vec::new();
    for photo in photos {
        let view = PhotoView {
            id: photo.id,
            path: photo.path,
            filename: photo.filename,
            can_delete: viewer_authenticated,
        };
        match groups.iter_mut().find(|g| g.category == photo.category) {
            Some(group) => group.photos.push(view),
            None => groups.push(GalleryGroup {
                category: photo.category,
                photos: vec![view],
            }),
        }
    }

    // Categories are YYYY-MM-DD, so a lexicographic sort is a date sort
    groups.sort_by(|a, b| b.category.cmp(&a.category));

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::testutil::fixture;
    use crate::gallery::upload::{submit, Upload};
    use crate::storage::MediaStore;

    async fn upload_on(pool: &DbPool, store: &MediaStore, user_id: &str, category: &str) {
        let payload = Some(Upload {
            bytes: b"img".to_vec(),
            mime: "image/jpeg".to_string(),
        });
        submit(pool, store, user_id, payload, Some(category.to_string()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_groups_newest_category_first() {
        let (pool, store, _tmp, user) = fixture().await;
        upload_on(&pool, &store, &user.id, "2024-01-01").await;
        upload_on(&pool, &store, &user.id, "2024-01-02").await;
        upload_on(&pool, &store, &user.id, "2024-01-01").await;

        let groups = list_grouped(&pool, false).await.unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category, "2024-01-02");
        assert_eq!(groups[1].category, "2024-01-01");
        assert_eq!(groups[0].photos.len(), 1);
        assert_eq!(groups[1].photos.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_affordance_follows_authentication() {
        let (pool, store, _tmp, user) = fixture().await;
        upload_on(&pool, &store, &user.id, "2024-03-10").await;

        let anon = list_grouped(&pool, false).await.unwrap();
        assert!(!anon[0].photos[0].can_delete);

        let authed = list_grouped(&pool, true).await.unwrap();
        assert!(authed[0].photos[0].can_delete);
    }

    #[tokio::test]
    async fn test_empty_catalog_yields_no_groups() {
        let (pool, _store, _tmp, _user) = fixture().await;
        let groups = list_grouped(&pool, true).await.unwrap();
        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn test_group_order_is_stable_across_reads() {
        let (pool, store, _tmp, user) = fixture().await;
        upload_on(&pool, &store, &user.id, "2024-02-01").await;
        upload_on(&pool, &store, &user.id, "2024-02-01").await;

        let first = list_grouped(&pool, false).await.unwrap();
        let second = list_grouped(&pool, false).await.unwrap();

        let ids = |groups: &[GalleryGroup]| {
            groups[0]
                .photos
                .iter()
                .map(|p| p.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), ids(&second));
    }
}
