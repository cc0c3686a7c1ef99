use astra_core::{AppConfig, ChatSessionStore, FileRegistry, RegistryError, ResponseResolver, UserStore};
use std::sync::Arc;

/// Shared application state: one explicitly constructed store of each kind,
/// built at process start and handed to handlers by axum.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<UserStore>,
    pub registry: Arc<FileRegistry>,
    pub chat: Arc<ChatSessionStore>,
    pub resolver: Arc<ResponseResolver>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self, RegistryError> {
        let registry = Arc::new(
            FileRegistry::open(config.upload_dir.clone(), config.max_file_size).await?,
        );
        let resolver = Arc::new(ResponseResolver::from_config(&config, registry.clone()));
        Ok(Self {
            config: Arc::new(config),
            users: Arc::new(UserStore::new()),
            registry,
            chat: Arc::new(ChatSessionStore::new()),
            resolver,
        })
    }
}
