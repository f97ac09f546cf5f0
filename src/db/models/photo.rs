//! Photo catalog record.
//!
//! One row per stored photo. `filename` is the server-generated object
//! name in the media store, `path` the public URL it is served at, and
//! `category` the YYYY-MM-DD grouping key used by the gallery view.
//! A row must never outlive the object it points at; creation and
//! deletion go through the coordinators in `crate::gallery`.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Photo {
    pub id: String,
    pub filename: String,
    pub path: String,
    pub category: String,
    pub upload_date: String,
    pub user_id: String,
}
