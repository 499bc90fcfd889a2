//! The cart state machine.
//!
//! A [`Cart`] is an ordered list of [`CartLine`]s, one per product, in the
//! order products were first added. All quantity arithmetic lives here so the
//! invariants hold no matter which store or host drives the cart:
//!
//! - at most one line per product id
//! - every stored line has `quantity >= 1`; a line whose quantity would drop
//!   to zero or below is removed instead
//! - prices are never negative
//! - line order is insertion order and survives serialization
//!
//! The serialized form is a bare JSON array of lines, the same blob the
//! web storefront kept under `corewellCart`, so carts written by older clients
//! (numeric prices) still load.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::ProductId;
use super::price::round_currency;

/// Errors produced by cart operations that indicate caller misuse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The position does not address an existing line.
    #[error("no cart line at index {index} (cart has {len} lines)")]
    IndexOutOfBounds {
        /// Requested position.
        index: usize,
        /// Number of lines at the time of the call.
        len: usize,
    },

    /// The catalog has no product with this id.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),
}

/// One product entry in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Stable product identifier, unique within a cart.
    pub id: ProductId,
    /// Display label copied from the catalog when the line was created.
    pub name: String,
    /// Unit price copied from the catalog when the line was created.
    pub price: Decimal,
    /// Always at least one.
    pub quantity: u32,
}

impl CartLine {
    /// Create a line with quantity one.
    #[must_use]
    pub fn new(id: ProductId, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            quantity: 1,
        }
    }

    /// Unit price times quantity, unrounded.
    ///
    /// Saturates at `Decimal::MAX` rather than overflowing.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }
}

/// Outcome of [`Cart::adjust_quantity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuantityChange {
    /// The line is still present with this quantity.
    Updated {
        /// Quantity after the adjustment.
        quantity: u32,
    },
    /// The quantity reached zero or below and the line was dropped.
    Removed(CartLine),
}

/// Ordered, deduplicated collection of cart lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Line at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&CartLine> {
        self.lines.get(index)
    }

    /// Position of the line for `id`, if any.
    #[must_use]
    pub fn position(&self, id: &ProductId) -> Option<usize> {
        self.lines.iter().position(|line| &line.id == id)
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// `true` when the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Increment the line for `id`, or append a new line with quantity one.
    ///
    /// Returns the position of the affected line. `name` and `price` are only
    /// used when a new line is created; an existing line keeps the values it
    /// was added with.
    pub fn increment_or_push(
        &mut self,
        id: ProductId,
        name: impl Into<String>,
        price: Decimal,
    ) -> usize {
        if let Some(index) = self.position(&id) {
            if let Some(line) = self.lines.get_mut(index) {
                line.quantity = line.quantity.saturating_add(1);
            }
            return index;
        }
        self.lines.push(CartLine::new(id, name, price));
        self.lines.len() - 1
    }

    /// Apply a signed `delta` to the quantity of the line at `index`.
    ///
    /// A result of zero or below removes the line, shifting later lines down
    /// by one.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::IndexOutOfBounds`] if `index` is not a valid
    /// position. The cart is unchanged in that case.
    pub fn adjust_quantity(&mut self, index: usize, delta: i64) -> Result<QuantityChange, CartError> {
        let len = self.lines.len();
        let line = self
            .lines
            .get_mut(index)
            .ok_or(CartError::IndexOutOfBounds { index, len })?;

        let next = i64::from(line.quantity).saturating_add(delta);
        if next <= 0 {
            return Ok(QuantityChange::Removed(self.lines.remove(index)));
        }

        line.quantity = u32::try_from(next).unwrap_or(u32::MAX);
        Ok(QuantityChange::Updated {
            quantity: line.quantity,
        })
    }

    /// Remove the line at `index` regardless of its quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::IndexOutOfBounds`] if `index` is not a valid
    /// position. The cart is unchanged in that case.
    pub fn remove_at(&mut self, index: usize) -> Result<CartLine, CartError> {
        if index >= self.lines.len() {
            return Err(CartError::IndexOutOfBounds {
                index,
                len: self.lines.len(),
            });
        }
        Ok(self.lines.remove(index))
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of `price * quantity`, rounded to two decimal places.
    ///
    /// Saturates at `Decimal::MAX` rather than overflowing.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        let sum = self
            .lines
            .iter()
            .map(CartLine::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add);
        round_currency(sum)
    }

    /// Fold `other` into this cart.
    ///
    /// Lines already present keep their position, name and price and gain the
    /// other cart's quantity. Lines only present in `other` are appended in
    /// `other`'s order.
    pub fn merge_from(&mut self, other: &Self) {
        for incoming in &other.lines {
            match self.position(&incoming.id) {
                Some(index) => {
                    if let Some(line) = self.lines.get_mut(index) {
                        line.quantity = line.quantity.saturating_add(incoming.quantity);
                    }
                }
                None => self.lines.push(incoming.clone()),
            }
        }
    }
}

impl From<Vec<CartLine>> for Cart {
    /// Build a cart from raw lines, restoring the invariants.
    ///
    /// Zero-quantity and negative-price lines are dropped and repeated ids
    /// are folded into the first occurrence.
    fn from(raw: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        let valid = raw
            .into_iter()
            .filter(|line| line.quantity > 0 && line.price >= Decimal::ZERO);
        for line in valid {
            match cart.position(&line.id) {
                Some(index) => {
                    if let Some(existing) = cart.lines.get_mut(index) {
                        existing.quantity = existing.quantity.saturating_add(line.quantity);
                    }
                }
                None => cart.lines.push(line),
            }
        }
        cart
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartLine;
    type IntoIter = std::slice::Iter<'a, CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}
