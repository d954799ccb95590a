use std::sync::Arc;

use aurum_catalog::Product;
use aurum_core::ProductId;
use aurum_inventory::{AdjustInventory, MovementRecord};

use crate::storage::{Storage, StoreResult};

/// Admin-facing inventory operations: manual adjustments, ledger queries,
/// low-stock detection, and the rebuild-from-ledger repair.
pub struct InventoryService {
    storage: Arc<dyn Storage>,
}

impl InventoryService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Manual stock correction. The reason is mandatory and lands in the
    /// ledger row verbatim.
    pub async fn adjust(&self, request: AdjustInventory) -> StoreResult<i64> {
        let movement = request.movement()?;
        let new_level = self
            .storage
            .adjust_stock(
                request.product_id,
                movement,
                Some(request.reason.clone()),
                None,
            )
            .await?;
        tracing::info!(
            product_id = %request.product_id,
            delta = request.delta,
            new_level,
            "inventory adjusted"
        );
        Ok(new_level)
    }

    pub async fn movements(&self, product_id: ProductId) -> StoreResult<Vec<MovementRecord>> {
        self.storage.movements(product_id).await
    }

    pub async fn low_stock(&self) -> StoreResult<Vec<Product>> {
        self.storage.low_stock_products().await
    }

    /// Rewrite the materialized stock level from the ledger sum.
    pub async fn rebuild(&self, product_id: ProductId) -> StoreResult<i64> {
        let rebuilt = self.storage.rebuild_stock(product_id).await?;
        tracing::info!(%product_id, rebuilt, "stock rebuilt from ledger");
        Ok(rebuilt)
    }
}
