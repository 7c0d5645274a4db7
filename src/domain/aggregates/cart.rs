//! Cart Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::SizeQuantities;
use crate::StorefrontError;

/// A design applied at one print placement (front, back, sleeve, ...)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignPlacement {
    pub placement: String,
    pub design_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: String,
    /// Legacy id field written by older clients; matched by `update_quantity`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub design_selections: Vec<DesignPlacement>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub size_quantities: SizeQuantities,
    #[serde(default)]
    pub unit_price: Decimal,
    #[serde(default)]
    pub color_label: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// Two lines are the same line iff every field of the key matches.
#[derive(Debug, PartialEq, Eq)]
pub struct LineKey<'a> {
    product_id: &'a str,
    color: &'a str,
    designs: &'a [DesignPlacement],
    color_label: &'a str,
    gender: &'a str,
}

impl CartLineItem {
    pub fn new(product_id: impl Into<String>, color: impl Into<String>, unit_price: Decimal) -> Self {
        Self {
            product_id: product_id.into(), id: None, design_selections: vec![], color: color.into(),
            size_quantities: SizeQuantities::default(), unit_price, color_label: String::new(),
            gender: String::new(), display_name: String::new(), images: vec![], description: String::new(),
        }
    }

    pub fn key(&self) -> LineKey<'_> {
        LineKey {
            product_id: &self.product_id,
            color: &self.color,
            designs: &self.design_selections,
            color_label: &self.color_label,
            gender: &self.gender,
        }
    }

    fn matches_id(&self, product_id: &str) -> bool {
        self.product_id == product_id || self.id.as_deref() == Some(product_id)
    }

    pub fn pieces(&self) -> u32 { self.size_quantities.total() }

    /// Clamped to `Decimal::MAX` on overflow.
    pub fn line_total(&self) -> Decimal {
        self.unit_price.checked_mul(Decimal::from(self.pieces())).unwrap_or_else(|| {
            warn!(product_id = %self.product_id, unit_price = %self.unit_price, "Cart line total overflows");
            Decimal::MAX
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct Cart {
    items: Vec<CartLineItem>,
    events: Vec<DomainEvent>,
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    pub fn from_items(items: Vec<CartLineItem>) -> Self { Self { items, events: vec![] } }

    pub fn items(&self) -> &[CartLineItem] { &self.items }
    pub fn line_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn total_pieces(&self) -> u32 { self.items.iter().fold(0u32, |acc, i| acc.saturating_add(i.pieces())) }

    /// Clamped to `Decimal::MAX` on overflow.
    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.line_total()))
            .unwrap_or_else(|| {
                warn!(lines = self.items.len(), "Cart subtotal overflows");
                Decimal::MAX
            })
    }

    /// Merges into the line with the same key, or appends a new line.
    /// Returns the index of the affected line.
    pub fn add_item(&mut self, item: CartLineItem) -> usize {
        if let Some(idx) = self.items.iter().position(|i| i.key() == item.key()) {
            let existing = &mut self.items[idx];
            existing.size_quantities.merge(&item.size_quantities);
            let sizes = existing.size_quantities.clone();
            self.raise_event(DomainEvent::Cart(CartEvent::LineMerged { product_id: item.product_id, line: idx, sizes }));
            idx
        } else {
            let product_id = item.product_id.clone();
            self.items.push(item);
            let line = self.items.len() - 1;
            self.raise_event(DomainEvent::Cart(CartEvent::LineAdded { product_id, line }));
            line
        }
    }

    /// With both `color` and `designs`, removes only the exact line; otherwise
    /// removes every line of the product. Returns the number of lines removed.
    pub fn remove(&mut self, product_id: &str, color: Option<&str>, designs: Option<&[DesignPlacement]>) -> usize {
        let before = self.items.len();
        match (color, designs) {
            (Some(color), Some(designs)) => self.items.retain(|i| {
                !(i.product_id == product_id && i.color == color && i.design_selections.as_slice() == designs)
            }),
            _ => self.items.retain(|i| i.product_id != product_id),
        }
        let count = before - self.items.len();
        if count > 0 {
            self.raise_event(DomainEvent::Cart(CartEvent::LinesRemoved { product_id: product_id.to_string(), count }));
        }
        count
    }

    /// Replaces the size map of the first line whose primary or legacy id matches.
    pub fn update_quantity(&mut self, product_id: &str, sizes: SizeQuantities) -> Result<(), StorefrontError> {
        let item = self.items.iter_mut().find(|i| i.matches_id(product_id))
            .ok_or_else(|| StorefrontError::ItemNotFound(product_id.to_string()))?;
        item.size_quantities = sizes.clone();
        self.raise_event(DomainEvent::Cart(CartEvent::QuantityUpdated { product_id: product_id.to_string(), sizes }));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.raise_event(DomainEvent::Cart(CartEvent::Cleared));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}
