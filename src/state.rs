use crate::auth::{AuthError, AuthState};
use crate::config::AppConfig;
use crate::db::Store;
use crate::documents::DocumentService;
use crate::notifications::NotificationService;
use crate::push::{self, PushQueue};
use crate::realtime::RealtimeHub;
use crate::templates;

use askama::Template as _;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub auth: AuthState,
    pub store: Store,
    pub documents: DocumentService,
    pub notifications: NotificationService,
    /// VAPID public key when push is fully configured.
    pub push_public_key: Option<String>,
    pub service_worker: String,
    pub manifest: String,
}

impl AppState {
    pub fn new(config: AppConfig, store: Store, push: PushQueue) -> Result<Self, AuthError> {
        let auth = AuthState::from_config(&config)?;
        let hub = RealtimeHub::default();
        let notifications = NotificationService::new(store.clone(), hub, push);
        let documents = DocumentService::new(config.root.clone(), store.clone(), notifications.clone());
        let push_public_key = match push::load_vapid_config(&config) {
            push::VapidConfigStatus::Ready(vapid) => Some(vapid.public_key),
            _ => None,
        };
        let service_worker = templates::ServiceWorkerTemplate {
            app_name: &config.app_name,
        }
        .render()
        .unwrap_or_else(|err| {
            tracing::error!("failed to render service worker: {err}");
            String::new()
        });
        let manifest = templates::ManifestTemplate {
            app_name: &config.app_name,
        }
        .render()
        .unwrap_or_else(|err| {
            tracing::error!("failed to render manifest: {err}");
            String::new()
        });

        Ok(Self {
            config,
            auth,
            store,
            documents,
            notifications,
            push_public_key,
            service_worker,
            manifest,
        })
    }
}
