use std::sync::Arc;

use common::storage::BlobStore;

use crate::config::AppConfig;
use crate::store::ProjectStore;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub projects: Arc<dyn ProjectStore>,
    pub blob_store: Arc<dyn BlobStore>,
}
