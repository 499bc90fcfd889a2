//! Cart commands.

use rust_decimal::Decimal;

use corewell_core::{CurrencyCode, Price, ProductId, QuantityChange};
use corewell_storefront::error::AppError;

use super::Context;

fn zar(amount: Decimal) -> Price {
    Price::new(amount, CurrencyCode::default())
}

/// Print lines with their positions, then the totals.
pub fn show(ctx: &Context) {
    if ctx.cart.cart().is_empty() {
        println!("Your cart is empty.");
        return;
    }
    for (index, line) in ctx.cart.lines().iter().enumerate() {
        println!(
            "[{index}] {} × {} – {}",
            line.name,
            line.quantity,
            zar(line.line_total())
        );
    }
    println!(
        "{} item(s), total {}",
        ctx.cart.total_count(),
        zar(ctx.cart.total_price())
    );
}

/// Add one unit of `id`.
pub fn add(ctx: &mut Context, id: &str) -> Result<(), AppError> {
    let catalog = ctx.state.catalog();
    let line = ctx.cart.add_or_increment(&ProductId::new(id), catalog)?;
    println!("Added {} (now {} in cart)", line.name, line.quantity);
    Ok(())
}

/// Change the quantity of the line at `index` by `delta`.
pub fn update(ctx: &mut Context, index: usize, delta: i64) -> Result<(), AppError> {
    match ctx.cart.set_quantity(index, delta)? {
        QuantityChange::Updated { quantity } => println!("Quantity is now {quantity}"),
        QuantityChange::Removed(line) => println!("Removed {}", line.name),
    }
    Ok(())
}

/// Remove the line at `index`.
pub fn remove(ctx: &mut Context, index: usize) -> Result<(), AppError> {
    let line = ctx.cart.remove_at(index)?;
    println!("Removed {}", line.name);
    Ok(())
}

/// Empty the cart.
pub fn clear(ctx: &mut Context) {
    ctx.cart.clear();
    println!("Cart cleared");
}
