//! Aggregates module
pub mod cart;
pub mod order;
pub mod product;

pub use cart::{Cart, CartLineItem, DesignPlacement};
pub use order::{LastOrder, OrderSummary};
pub use product::{Product, ProductCard};
