pub mod auth;
pub mod config;
pub mod db;
pub mod gallery;
pub mod storage;
pub mod ui;
pub mod utils;

pub use db::DbPool;

use config::Config;
use storage::MediaStore;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub store: MediaStore,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, store: MediaStore) -> Self {
        Self { config, db, store }
    }
}
