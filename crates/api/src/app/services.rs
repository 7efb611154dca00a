use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use storefront_infra::notification::{
    EventPublisher, LoggingNotificationSink, NotificationSink, NotificationWorker, StorefrontBus,
    WorkerHandle,
};
use storefront_infra::{AppConfig, InMemoryStore, PostgresStore, Store, Storefront};

/// Everything the handlers need, shared behind an `Arc`.
pub struct AppServices {
    pub storefront: Storefront,
    pub bus: Arc<StorefrontBus>,
    pub config: AppConfig,
}

impl AppServices {
    /// Services over the in-memory store (tests/dev).
    pub fn in_memory(config: AppConfig) -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()), config)
    }

    /// Pick the store from configuration: Postgres when `DATABASE_URL` is set,
    /// in-memory otherwise. The Postgres schema is created on startup.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let Some(url) = config.database_url.clone() else {
            info!("DATABASE_URL not set; using in-memory store");
            return Ok(Self::in_memory(config));
        };

        let store = PostgresStore::connect(&url, config.database_max_connections)
            .await
            .context("failed to connect to postgres")?;
        store.migrate().await.context("failed to create schema")?;
        info!(max_connections = config.database_max_connections, "using postgres store");
        Ok(Self::with_store(Arc::new(store), config))
    }

    pub fn with_store(store: Arc<dyn Store>, config: AppConfig) -> Self {
        let bus = Arc::new(StorefrontBus::new());
        let storefront = Storefront::new(store, EventPublisher::new(bus.clone()), &config);
        Self {
            storefront,
            bus,
            config,
        }
    }

    /// Start the notification worker with the logging sink, unless disabled.
    pub fn spawn_notifications(&self) -> std::io::Result<Option<WorkerHandle>> {
        if !self.config.notifications.enabled {
            info!("notifications disabled");
            return Ok(None);
        }
        let sink: Arc<dyn NotificationSink> =
            Arc::new(LoggingNotificationSink::new(self.config.notifications.from.clone()));
        NotificationWorker::spawn(&self.bus, sink).map(Some)
    }
}
