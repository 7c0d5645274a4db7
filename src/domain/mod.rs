//! Domain layer: cart and order aggregates, pricing services, value objects
pub mod aggregates;
pub mod events;
pub mod services;
pub mod value_objects;
