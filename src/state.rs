use std::sync::Arc;

use crate::auth::AuthState;
use crate::config::AppConfig;
use crate::ports::{BlobStore, Store};
use crate::sync::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub auth: AuthState,
    pub store: Arc<dyn Store>,
    pub blobs: Arc<dyn BlobStore>,
    pub rooms: Arc<SessionRegistry>,
}
