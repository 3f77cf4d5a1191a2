pub mod api;
pub mod config;
pub mod db;
pub mod notifications;
pub mod storage;

pub use db::DbPool;

use std::sync::Arc;

use config::Config;
use notifications::Mailer;
use storage::AssetStore;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub assets: Arc<dyn AssetStore>,
    pub mailer: Mailer,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, assets: Arc<dyn AssetStore>) -> Self {
        let mailer = Mailer::new(config.email.clone());
        Self {
            config,
            db,
            assets,
            mailer,
        }
    }
}
