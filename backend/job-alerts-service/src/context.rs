//! Process-wide handles shared by every handler invocation.

use firebase_shared::{FCMClient, FirestoreClient, ServiceAccountKey};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{Config, PushBackend, StoreBackend};
use crate::error::{AppError, Result};
use crate::services::push_sender::{FcmDispatcher, LogOnlyDispatcher, PushDispatcher};
use crate::store::{DocumentStore, FirestoreStore, InMemoryDocumentStore};

/// Document store, push dispatcher and config, built once at startup and
/// handed to handlers by `Arc`.
///
/// Nothing here needs explicit teardown: the HTTP clients inside are
/// reference counted and released when the last clone drops at exit.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn DocumentStore>,
    pub push: Arc<dyn PushDispatcher>,
    pub config: Arc<Config>,
}

impl AppContext {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        push: Arc<dyn PushDispatcher>,
        config: Config,
    ) -> Self {
        Self {
            store,
            push,
            config: Arc::new(config),
        }
    }

    /// Wire production or local backends according to `config`
    pub fn from_config(config: Config) -> Result<Self> {
        let firebase = &config.firebase;

        let credentials = match &firebase.credentials_path {
            Some(path) => Some(
                ServiceAccountKey::from_file(path).map_err(|e| AppError::Config(e.to_string()))?,
            ),
            None => None,
        };

        let store: Arc<dyn DocumentStore> = match firebase.store_backend {
            StoreBackend::Memory => {
                warn!("Using in-memory document store; data is lost on restart");
                Arc::new(InMemoryDocumentStore::new())
            }
            StoreBackend::Firestore => {
                let client = match (&firebase.emulator_host, &credentials) {
                    (Some(host), _) => {
                        info!(emulator_host = %host, "Using Firestore emulator");
                        FirestoreClient::emulator(
                            firebase.project_id.clone(),
                            firebase.database_id.clone(),
                            host,
                        )
                    }
                    (None, Some(credentials)) => FirestoreClient::new(
                        firebase.project_id.clone(),
                        firebase.database_id.clone(),
                        credentials.clone(),
                    ),
                    (None, None) => {
                        return Err(AppError::Config(
                            "Firestore store requires GOOGLE_APPLICATION_CREDENTIALS or FIRESTORE_EMULATOR_HOST"
                                .to_string(),
                        ))
                    }
                };
                Arc::new(FirestoreStore::new(Arc::new(client)))
            }
        };

        let push: Arc<dyn PushDispatcher> = match (firebase.push_backend, credentials) {
            (PushBackend::Fcm, Some(credentials)) => Arc::new(FcmDispatcher::new(Arc::new(
                FCMClient::new(firebase.project_id.clone(), credentials),
            ))),
            (PushBackend::Fcm, None) => {
                warn!("FCM credentials not configured, push notifications will only be logged");
                Arc::new(LogOnlyDispatcher)
            }
            (PushBackend::Log, _) => Arc::new(LogOnlyDispatcher),
        };

        info!(
            project_id = %firebase.project_id,
            store_backend = ?firebase.store_backend,
            push_backend = ?firebase.push_backend,
            "Application context initialized"
        );

        Ok(Self::new(store, push, config))
    }

    /// Called once before exit. There is nothing to flush or close.
    pub fn shutdown(&self) {
        info!("Application context released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_context_builds_without_credentials() {
        let ctx = AppContext::from_config(Config::local()).unwrap();
        assert_eq!(ctx.config.notifications.new_jobs_topic, "all_users");
        ctx.shutdown();
    }

    #[test]
    fn test_firestore_without_credentials_is_rejected() {
        let mut config = Config::local();
        config.firebase.store_backend = StoreBackend::Firestore;
        assert!(matches!(
            AppContext::from_config(config),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_missing_credentials_file_is_rejected() {
        let mut config = Config::local();
        config.firebase.credentials_path = Some("/nonexistent/key.json".to_string());
        assert!(matches!(
            AppContext::from_config(config),
            Err(AppError::Config(_))
        ));
    }
}
