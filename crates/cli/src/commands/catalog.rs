//! Product listing.

use corewell_core::{CurrencyCode, Price};

use super::Context;

/// Print every product with its id and price.
pub fn list(ctx: &Context) {
    for product in ctx.state.catalog().products() {
        let price = Price::new(product.price, CurrencyCode::default());
        println!("{:<16} {:<20} {price}", product.id.as_str(), product.name);
    }
}
