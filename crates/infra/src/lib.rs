//! Infrastructure layer: persistence backends, services, external seams.

pub mod notify;
pub mod services;
pub mod storage;

#[cfg(test)]
mod integration_tests;

pub use notify::{LogMailer, Mailer};
pub use services::{InventoryService, OrderService};
pub use storage::{
    AdminStats, CartLine, MemoryStorage, OrderFilter, OrderPage, OrderWithItems, PgStorage,
    Storage, StoreError, StoreResult, WishlistLine,
};
