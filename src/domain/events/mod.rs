//! Domain events
use crate::domain::value_objects::SizeQuantities;

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Cart(CartEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CartEvent {
    LineAdded { product_id: String, line: usize },
    LineMerged { product_id: String, line: usize, sizes: SizeQuantities },
    LinesRemoved { product_id: String, count: usize },
    QuantityUpdated { product_id: String, sizes: SizeQuantities },
    Cleared,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    Completed { order_id: String },
}
