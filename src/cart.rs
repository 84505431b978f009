//! Customer cart.
//!
//! A cart belongs to one session and one pickup point at a time; switching the
//! point empties it. Quantities are capped by the stock level the caller read
//! for that point. Persistence is explicit through [`Cart::to_json`] and
//! [`Cart::from_json`]; nothing is saved implicitly.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::inventory::{DeductionLine, StockLevel};
use crate::pricing::{round_money, PriceQuote};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("Select a pickup point first")]
    NoPointSelected,

    #[error("Quantity must be positive")]
    InvalidQuantity,

    #[error("Malformed cart: {0}")]
    Malformed(String),
}

/// One product in the cart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: u32,
}

/// Result of putting items in the cart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Line now holds `quantity`
    Added { quantity: u32 },
    /// Request exceeded stock; line holds all that is available
    Capped { quantity: u32 },
    /// Nothing available at this point
    Unavailable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    point_id: Option<Uuid>,
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_point(point_id: Uuid) -> Self {
        Self {
            point_id: Some(point_id),
            lines: Vec::new(),
        }
    }

    pub fn point_id(&self) -> Option<Uuid> {
        self.point_id
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Select a pickup point; returns `true` when the cart had to be emptied
    pub fn select_point(&mut self, point_id: Uuid) -> bool {
        if self.point_id == Some(point_id) {
            return false;
        }
        let cleared = !self.lines.is_empty();
        self.point_id = Some(point_id);
        self.lines.clear();
        cleared
    }

    /// Add `quantity` to a product's line
    pub fn add(
        &mut self,
        product_id: Uuid,
        quantity: u32,
        stock: &StockLevel,
    ) -> Result<AddOutcome, CartError> {
        let current = self.quantity_of(product_id);
        self.set_quantity(product_id, current.saturating_add(quantity), stock)
    }

    /// Set a product's line to `quantity`; zero removes it
    pub fn set_quantity(
        &mut self,
        product_id: Uuid,
        quantity: u32,
        stock: &StockLevel,
    ) -> Result<AddOutcome, CartError> {
        if self.point_id.is_none() {
            return Err(CartError::NoPointSelected);
        }
        if quantity == 0 {
            self.remove(product_id);
            return Ok(AddOutcome::Added { quantity: 0 });
        }

        let limit = stock.purchasable();
        if limit == 0 {
            self.remove(product_id);
            return Ok(AddOutcome::Unavailable);
        }

        let granted = quantity.min(limit);
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = granted,
            None => self.lines.push(CartLine {
                product_id,
                quantity: granted,
            }),
        }

        if granted < quantity {
            Ok(AddOutcome::Capped { quantity: granted })
        } else {
            Ok(AddOutcome::Added { quantity: granted })
        }
    }

    pub fn remove(&mut self, product_id: Uuid) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn quantity_of(&self, product_id: Uuid) -> u32 {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map_or(0, |l| l.quantity)
    }

    /// Total at the given quotes; `None` if any line has no quote
    pub fn total(&self, quotes: &HashMap<Uuid, PriceQuote>) -> Option<Decimal> {
        let mut total = Decimal::ZERO;
        for line in &self.lines {
            total += quotes.get(&line.product_id)?.line_total(line.quantity);
        }
        Some(round_money(total, 2))
    }

    /// Lines to deduct from stock at order confirmation
    pub fn deduction_lines(&self) -> Vec<DeductionLine> {
        self.lines
            .iter()
            .map(|l| DeductionLine {
                product_id: l.product_id,
                quantity: l.quantity,
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String, CartError> {
        serde_json::to_string(self).map_err(|e| CartError::Malformed(e.to_string()))
    }

    /// Restore a saved cart, dropping empty and duplicate lines
    pub fn from_json(raw: &str) -> Result<Self, CartError> {
        let mut cart: Cart =
            serde_json::from_str(raw).map_err(|e| CartError::Malformed(e.to_string()))?;
        cart.normalize();
        Ok(cart)
    }

    /// Merge duplicate product lines and drop zero quantities
    pub fn normalize(&mut self) {
        let mut merged: Vec<CartLine> = Vec::with_capacity(self.lines.len());
        for line in self.lines.drain(..) {
            if line.quantity == 0 {
                continue;
            }
            match merged.iter_mut().find(|m| m.product_id == line.product_id) {
                Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
                None => merged.push(line),
            }
        }
        self.lines = merged;
    }
}
