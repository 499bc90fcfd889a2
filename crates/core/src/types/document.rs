//! Payloads written to the remote document store.
//!
//! Field names are camelCase on the wire. Creation timestamps are not part of
//! these types: the document store stamps `createdAt` itself when a document
//! is created with an auto-assigned id.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::Cart;
use super::email::Email;
use super::id::UserId;

/// Collection names used by the storefront.
pub mod collections {
    /// One document per identity, keyed by the identity's uid.
    pub const CARTS: &str = "carts";
    /// Placed orders (auto id).
    pub const ORDERS: &str = "orders";
    /// Retailers asking to stock the range (auto id).
    pub const STOCKIST_REQUESTS: &str = "stockistRequests";
    /// Subscription sign-ups (auto id).
    pub const SUBSCRIPTIONS: &str = "subscriptions";
    /// Credentials for the local identity provider, keyed by normalized email.
    pub const ACCOUNTS: &str = "accounts";
}

/// The per-identity cart document, `carts/<uid>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartDocument {
    /// Full ordered line sequence; every write replaces it wholesale.
    #[serde(default)]
    pub items: Cart,
}

impl From<Cart> for CartDocument {
    fn from(items: Cart) -> Self {
        Self { items }
    }
}

/// Shipping details captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    /// Recipient name as typed; stored under `fullname`.
    pub fullname: String,
    /// Free-form delivery address.
    pub address: String,
}

/// An order ready to be written to `orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    /// The signed-in buyer.
    pub user_id: UserId,
    /// Cart lines at the moment the order was placed.
    pub items: Cart,
    /// Rounded cart total, in rand.
    pub total: Decimal,
    pub shipping: ShippingDetails,
}

/// A retailer's request to stock the range. No sign-in required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockistRequest {
    /// Contact person.
    pub name: String,
    /// Where the reply goes.
    pub email: Email,
    /// Store or pharmacy name.
    pub company: String,
    /// What the retailer wants to discuss; never blank.
    pub message: String,
}

/// A signed-in user's subscription sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    /// The subscribing account.
    pub user_id: UserId,
    /// Plan label, e.g. `General Subscription`.
    pub plan: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::id::ProductId;

    #[test]
    fn test_cart_document_shape() {
        let mut cart = Cart::new();
        cart.increment_or_push(ProductId::new("iron-boost"), "Iron Boost", Decimal::new(5_999, 2));
        let json = serde_json::to_value(CartDocument::from(cart)).unwrap();
        assert!(json["items"].is_array());
        assert_eq!(json["items"][0]["id"], "iron-boost");
    }

    #[test]
    fn test_cart_document_missing_items_is_empty() {
        let doc: CartDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.items.is_empty());
    }

    #[test]
    fn test_order_draft_uses_camel_case() {
        let draft = OrderDraft {
            user_id: UserId::new("u1"),
            items: Cart::new(),
            total: Decimal::ZERO,
            shipping: ShippingDetails {
                fullname: "Thandi Nkosi".to_string(),
                address: "12 Long Street, Cape Town".to_string(),
            },
        };
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["shipping"]["fullname"], "Thandi Nkosi");
    }
}
