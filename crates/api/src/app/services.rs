use std::sync::Arc;

use aurum_infra::{
    InventoryService, LogMailer, Mailer, MemoryStorage, OrderService, PgStorage, Storage,
};
use aurum_inventory::OversellPolicy;

/// Service wiring shared by every request handler.
pub struct AppServices {
    storage: Arc<dyn Storage>,
    orders: OrderService,
    inventory: InventoryService,
}

impl AppServices {
    pub fn with_storage(storage: Arc<dyn Storage>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            orders: OrderService::new(storage.clone(), mailer),
            inventory: InventoryService::new(storage.clone()),
            storage,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn orders(&self) -> &OrderService {
        &self.orders
    }

    pub fn inventory(&self) -> &InventoryService {
        &self.inventory
    }
}

/// Pick a backend from the environment: Postgres when `DATABASE_URL` is set,
/// in-memory otherwise (dev/test).
pub async fn build_services() -> AppServices {
    let policy = oversell_policy_from_env();
    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);

    match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let storage = PgStorage::connect(&database_url, policy)
                .await
                .expect("failed to connect to Postgres");
            tracing::info!("using Postgres storage backend");
            AppServices::with_storage(Arc::new(storage), mailer)
        }
        Err(_) => {
            tracing::info!("DATABASE_URL not set; using in-memory storage backend");
            AppServices::with_storage(Arc::new(MemoryStorage::with_policy(policy)), mailer)
        }
    }
}

fn oversell_policy_from_env() -> OversellPolicy {
    match std::env::var("OVERSELL_POLICY") {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(policy = %raw, "unknown OVERSELL_POLICY value; defaulting to reject");
            OversellPolicy::Reject
        }),
        Err(_) => OversellPolicy::Reject,
    }
}
