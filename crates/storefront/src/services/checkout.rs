//! Checkout: turn the signed-in user's cart into an order.

use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use corewell_core::{
    Cart, CurrencyCode, DocumentId, OrderDraft, Price, ShippingDetails, collections,
};

use crate::cart::CartStore;
use crate::documents::{DocumentStore, StoreError, create_as};
use crate::error::add_breadcrumb;

/// Errors that can occur when placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Orders are tied to an account.
    #[error("sign in before completing your order")]
    SignInRequired,

    /// Nothing to order.
    #[error("cart is empty")]
    EmptyCart,

    /// Full name or address left blank.
    #[error("shipping {0} is required")]
    MissingShipping(&'static str),

    /// The order could not be written.
    #[error("failed to create order: {0}")]
    Store(#[from] StoreError),
}

impl CheckoutError {
    /// Whether the caller can fix this by changing their input.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReceipt {
    /// Generated id of the `orders` document.
    pub order_id: DocumentId,
    /// Amount charged, rounded to cents.
    pub total: Decimal,
    /// Units ordered across all lines.
    pub item_count: u64,
}

/// One rendered line of an order summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub name: String,
    pub quantity: u32,
    /// Unit price times quantity.
    pub line_total: Price,
}

/// What the customer is about to order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    /// One entry per cart line, in cart order.
    pub lines: Vec<SummaryLine>,
    /// Sum of the line totals, rounded to cents.
    pub total: Price,
}

impl OrderSummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl From<&Cart> for OrderSummary {
    fn from(cart: &Cart) -> Self {
        let lines = cart
            .lines()
            .iter()
            .map(|line| SummaryLine {
                name: line.name.clone(),
                quantity: line.quantity,
                line_total: Price::new(line.line_total(), CurrencyCode::default()),
            })
            .collect();
        Self {
            lines,
            total: Price::new(cart.total_price(), CurrencyCode::default()),
        }
    }
}

impl fmt::Display for OrderSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lines.is_empty() {
            return writeln!(f, "Your cart is empty.");
        }
        for line in &self.lines {
            writeln!(f, "{} × {} – {}", line.name, line.quantity, line.line_total)?;
        }
        write!(f, "Total: {}", self.total)
    }
}

/// Place an order for the cart's signed-in user.
///
/// The order document is written first; only once it exists is the cart
/// cleared, locally and remotely, with the remote clear awaited.
///
/// # Errors
///
/// Returns `CheckoutError::SignInRequired`, `EmptyCart` or `MissingShipping`
/// before anything is written, and `CheckoutError::Store` if the order cannot
/// be created. The cart is untouched on every error.
#[instrument(skip_all)]
pub async fn place_order(
    store: &mut CartStore,
    documents: &dyn DocumentStore,
    shipping: ShippingDetails,
) -> Result<OrderReceipt, CheckoutError> {
    let user_id = store
        .identity()
        .map(|identity| identity.uid.clone())
        .ok_or(CheckoutError::SignInRequired)?;
    if store.cart().is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    let shipping = ShippingDetails {
        fullname: shipping.fullname.trim().to_owned(),
        address: shipping.address.trim().to_owned(),
    };
    if shipping.fullname.is_empty() {
        return Err(CheckoutError::MissingShipping("fullname"));
    }
    if shipping.address.is_empty() {
        return Err(CheckoutError::MissingShipping("address"));
    }

    let draft = OrderDraft {
        user_id: user_id.clone(),
        items: store.cart().clone(),
        total: store.total_price(),
        shipping,
    };
    let item_count = store.total_count();

    let order_id = create_as(documents, collections::ORDERS, &draft)
        .await
        .inspect_err(|e| {
            error!(user_id = %user_id, error = %e, "Failed to create order");
            sentry::capture_error(e);
        })?;

    store.clear();
    let flushed = store.outbox().flush().await;
    if flushed.dropped > 0 {
        warn!(user_id = %user_id, order_id = %order_id, "Order placed but remote cart was not cleared");
    }

    info!(user_id = %user_id, order_id = %order_id, total = %draft.total, "Order placed");
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));

    Ok(OrderReceipt {
        order_id,
        total: draft.total,
        item_count,
    })
}
