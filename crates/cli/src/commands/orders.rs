//! Checkout and lead capture commands.

use corewell_core::ShippingDetails;
use corewell_storefront::error::AppError;
use corewell_storefront::services::auth::IdentityProvider;
use corewell_storefront::services::checkout::{OrderSummary, place_order};
use corewell_storefront::services::leads::{
    StockistForm, subscribe as subscribe_plan, submit_stockist_request,
};

use super::Context;

/// Print the order summary and place the order.
pub async fn checkout(ctx: &mut Context, fullname: String, address: String) -> Result<(), AppError> {
    println!("{}", OrderSummary::from(ctx.cart.cart()));

    let receipt = place_order(
        &mut ctx.cart,
        ctx.state.documents(),
        ShippingDetails { fullname, address },
    )
    .await?;
    println!(
        "Thank you for your order! Order {} ({} item(s)).",
        receipt.order_id, receipt.item_count
    );
    Ok(())
}

/// Submit a stockist request.
pub async fn stockist(
    ctx: &Context,
    name: String,
    email: String,
    company: String,
    message: String,
) -> Result<(), AppError> {
    let form = StockistForm {
        name,
        email,
        company,
        message,
    };
    submit_stockist_request(ctx.state.documents(), &form).await?;
    println!("Thank you! We will contact you soon.");
    Ok(())
}

/// Subscribe the signed-in account.
pub async fn subscribe(ctx: &Context, plan: Option<&str>) -> Result<(), AppError> {
    let identity = ctx.state.identity().current();
    subscribe_plan(ctx.state.documents(), identity.as_ref(), plan).await?;
    println!("Subscription created! Thank you for subscribing.");
    Ok(())
}
