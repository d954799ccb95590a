use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aurum_core::{Entity, ProductId, UserId, WishlistItemId};

/// One wishlist row: a (user, product) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: WishlistItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}

impl Entity for WishlistItem {
    type Id = WishlistItemId;

    fn id(&self) -> &WishlistItemId {
        &self.id
    }
}

/// Add-to-wishlist request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWishlistItem {
    pub user_id: UserId,
    pub product_id: ProductId,
}
