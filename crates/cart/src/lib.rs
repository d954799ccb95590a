//! `aurum-cart` — shopping cart and wishlist rows.

pub mod cart;
pub mod wishlist;

pub use cart::{CartItem, NewCartItem, ensure_quantity};
pub use wishlist::{NewWishlistItem, WishlistItem};
