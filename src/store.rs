//! Cart store: the owned cart plus its persistence
//!
//! The stored cart is the source of truth. It is read once when the store is
//! created and rewritten in full after every mutation. A mutation is applied to
//! a copy of the cart and only becomes visible once the write succeeds.

use tracing::{debug, warn};

use crate::domain::aggregates::{Cart, CartLineItem, DesignPlacement, LastOrder};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::SizeQuantities;
use crate::storage::{load_json, save_json, Storage, CART_KEY, LAST_ORDER_KEY};
use crate::Result;

pub struct CartStore<S> {
    cart: Cart,
    storage: S,
    events: Vec<DomainEvent>,
}

impl<S: Storage> CartStore<S> {
    /// Restores the persisted cart. Unreadable state starts an empty cart.
    pub fn load(storage: S) -> Self {
        let items = match load_json::<Vec<CartLineItem>>(&storage, CART_KEY) {
            Ok(items) => items.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable stored cart");
                Vec::new()
            }
        };
        debug!(lines = items.len(), "Cart restored");
        Self { cart: Cart::from_items(items), storage, events: vec![] }
    }

    pub fn cart(&self) -> &Cart { &self.cart }
    pub fn storage(&self) -> &S { &self.storage }

    pub fn add(&mut self, item: CartLineItem) -> Result<usize> {
        self.commit(|cart| Ok(cart.add_item(item)))
    }

    pub fn remove(&mut self, product_id: &str, color: Option<&str>, designs: Option<&[DesignPlacement]>) -> Result<usize> {
        self.commit(|cart| Ok(cart.remove(product_id, color, designs)))
    }

    pub fn update_quantity(&mut self, product_id: &str, sizes: SizeQuantities) -> Result<()> {
        self.commit(|cart| cart.update_quantity(product_id, sizes))
    }

    pub fn clear(&mut self) -> Result<()> {
        self.commit(|cart| {
            cart.clear();
            Ok(())
        })
    }

    /// Records the completed order for the success page and empties the cart.
    /// If the emptied cart cannot be written, the previous last order is restored.
    pub fn complete_order(&mut self, order_id: &str) -> Result<LastOrder> {
        let last = LastOrder::from_cart(order_id, &self.cart);
        let previous = self.storage.get(LAST_ORDER_KEY)?;
        save_json(&self.storage, LAST_ORDER_KEY, &last)?;
        if let Err(e) = self.clear() {
            let restored = match previous {
                Some(raw) => self.storage.set(LAST_ORDER_KEY, &raw),
                None => self.storage.remove(LAST_ORDER_KEY),
            };
            if let Err(restore_err) = restored {
                warn!(error = %restore_err, order_id, "Failed to restore previous last order");
            }
            return Err(e);
        }
        self.events.push(DomainEvent::Order(OrderEvent::Completed { order_id: order_id.to_string() }));
        Ok(last)
    }

    pub fn last_order(&self) -> Option<LastOrder> {
        load_json(&self.storage, LAST_ORDER_KEY).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring unreadable last order");
            None
        })
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn commit<T>(&mut self, change: impl FnOnce(&mut Cart) -> Result<T>) -> Result<T> {
        let mut next = self.cart.clone();
        let out = change(&mut next)?;
        save_json(&self.storage, CART_KEY, next.items())?;
        self.events.extend(next.take_events());
        self.cart = next;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::CartEvent;
    use crate::storage::{FileStorage, MemoryStorage};
    use crate::StorefrontError;
    use rust_decimal::Decimal;

    /// Memory storage whose writes to `failing_key` (or to every key) fail.
    #[derive(Default)]
    struct FailingWrites {
        inner: MemoryStorage,
        failing_key: Option<&'static str>,
    }

    impl Storage for FailingWrites {
        fn get(&self, key: &str) -> Result<Option<String>> { self.inner.get(key) }
        fn set(&self, key: &str, value: &str) -> Result<()> {
            match self.failing_key {
                Some(k) if k != key => self.inner.set(key, value),
                _ => Err(StorefrontError::Storage("disk full".into())),
            }
        }
        fn remove(&self, key: &str) -> Result<()> { self.inner.remove(key) }
    }

    fn item(product_id: &str, size: &str, count: u32) -> CartLineItem {
        let mut item = CartLineItem::new(product_id, "black", Decimal::from(467));
        item.size_quantities = SizeQuantities::new().with(size, count);
        item
    }

    #[test]
    fn test_every_mutation_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CartStore::load(FileStorage::open(dir.path()).unwrap());
        store.add(item("P1", "S", 2)).unwrap();
        store.add(item("P1", "M", 1)).unwrap();
        store.add(item("P2", "L", 4)).unwrap();

        let reopened = CartStore::load(FileStorage::open(dir.path()).unwrap());
        assert_eq!(reopened.cart().line_count(), 2);
        assert_eq!(reopened.cart().items()[0].size_quantities, SizeQuantities::new().with("S", 2).with("M", 1));

        store.remove("P1", None, None).unwrap();
        store.update_quantity("P2", SizeQuantities::new().with("L", 1)).unwrap();
        let reopened = CartStore::load(FileStorage::open(dir.path()).unwrap());
        assert_eq!(reopened.cart().line_count(), 1);
        assert_eq!(reopened.cart().total_pieces(), 1);
    }

    #[test]
    fn test_corrupt_cart_starts_empty() {
        let storage = MemoryStorage::new();
        storage.set(CART_KEY, "{\"oops\":").unwrap();
        let store = CartStore::load(storage);
        assert!(store.cart().is_empty());
    }

    #[test]
    fn test_update_unknown_item_leaves_storage_untouched() {
        let mut store = CartStore::load(MemoryStorage::new());
        assert!(store.update_quantity("nope", SizeQuantities::new()).is_err());
        assert_eq!(store.storage().get(CART_KEY).unwrap(), None);
    }

    #[test]
    fn test_failed_write_leaves_cart_unchanged() {
        let mut store = CartStore::load(FailingWrites::default());
        assert!(matches!(store.add(item("P1", "S", 1)), Err(StorefrontError::Storage(_))));
        assert!(store.cart().is_empty());
        assert!(store.take_events().is_empty());
    }

    #[test]
    fn test_failed_write_keeps_existing_lines() {
        let storage = FailingWrites { failing_key: Some(CART_KEY), ..Default::default() };
        storage.inner.set(CART_KEY, &serde_json::to_string(&[item("P1", "S", 2)]).unwrap()).unwrap();
        let mut store = CartStore::load(storage);
        assert!(store.remove("P1", None, None).is_err());
        assert!(store.update_quantity("P1", SizeQuantities::new().with("S", 9)).is_err());
        assert!(store.clear().is_err());
        assert_eq!(store.cart().total_pieces(), 2);
    }

    #[test]
    fn test_failed_cart_write_rolls_back_completed_order() {
        let storage = FailingWrites { failing_key: Some(CART_KEY), ..Default::default() };
        storage.inner.set(CART_KEY, &serde_json::to_string(&[item("P1", "S", 2)]).unwrap()).unwrap();
        let mut store = CartStore::load(storage);
        assert!(store.complete_order("ord-1").is_err());
        assert_eq!(store.cart().line_count(), 1);
        assert_eq!(store.last_order(), None);
        assert!(store.take_events().is_empty());
    }

    #[test]
    fn test_complete_order_clears_cart() {
        let mut store = CartStore::load(MemoryStorage::new());
        store.add(item("P1", "S", 3)).unwrap();
        let last = store.complete_order("ord-1").unwrap();
        assert_eq!(last.pieces, 3);
        assert!(store.cart().is_empty());
        assert_eq!(store.last_order().map(|o| o.order_id), Some("ord-1".to_string()));
        assert_eq!(store.storage().get(CART_KEY).unwrap().as_deref(), Some("[]"));

        let events = store.take_events();
        assert!(matches!(events.first(), Some(DomainEvent::Cart(CartEvent::LineAdded { .. }))));
        assert!(events.contains(&DomainEvent::Cart(CartEvent::Cleared)));
        assert_eq!(events.last(), Some(&DomainEvent::Order(OrderEvent::Completed { order_id: "ord-1".into() })));
    }
}
