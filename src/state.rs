use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;
use crate::database::{DatabaseError, DatabaseManager, DocumentStore};
use crate::identity::{IdentityProvider, LocalIdentityProvider};
use crate::storage::{ObjectStorage, StorageError};
use crate::upload::{StorageTransport, UploadAdapter};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("JWT_SECRET must be set outside development")]
    MissingSecret,
}

/// Shared handles for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub storage: ObjectStorage,
    pub identity: Arc<dyn IdentityProvider>,
    pub uploads: UploadAdapter,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn DocumentStore>,
        storage: ObjectStorage,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let uploads = UploadAdapter::from_config(Arc::new(StorageTransport::new(storage.clone())), &config.upload);
        Self {
            config,
            store,
            storage,
            identity,
            uploads,
        }
    }

    /// Open the configured database and storage and wire the local identity provider.
    pub async fn from_config(config: Arc<AppConfig>) -> Result<Self, StartupError> {
        if config.security.jwt_secret.is_empty() {
            return Err(StartupError::MissingSecret);
        }

        let store = DatabaseManager::open(&config.database).await?;
        let storage = ObjectStorage::from_config(&config.storage).await?;
        let identity = Arc::new(LocalIdentityProvider::from_config(store.clone(), &config));

        tracing::info!(
            database = store.backend_name(),
            storage = ?storage.backend(),
            "Application state ready"
        );
        Ok(Self::new(config, store, storage, identity))
    }
}
