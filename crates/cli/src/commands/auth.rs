//! Account commands.

use secrecy::SecretString;

use corewell_storefront::error::AppError;
use corewell_storefront::services::auth::IdentityProvider;

use super::Context;

/// Create an account, sign in and switch to its cart.
pub async fn register(
    ctx: &mut Context,
    email: &str,
    password: String,
    confirm: String,
) -> Result<(), AppError> {
    let identity = ctx
        .state
        .identity()
        .register(email, &SecretString::from(password), &SecretString::from(confirm))
        .await?;
    ctx.sync_identity().await?;
    println!("Registered and signed in as {}", identity.email);
    Ok(())
}

/// Sign in and switch to the account's cart.
pub async fn login(ctx: &mut Context, email: &str, password: String) -> Result<(), AppError> {
    let identity = ctx
        .state
        .identity()
        .sign_in(email, &SecretString::from(password))
        .await?;
    ctx.sync_identity().await?;
    println!(
        "Signed in as {} ({} item(s) in cart)",
        identity.email,
        ctx.cart.total_count()
    );
    Ok(())
}

/// Sign out, keeping the cart on this machine.
pub async fn logout(ctx: &mut Context) -> Result<(), AppError> {
    ctx.state.identity().sign_out();
    ctx.sync_identity().await?;
    println!("Signed out");
    Ok(())
}

/// Print the signed-in account.
pub fn whoami(ctx: &Context) {
    match ctx.state.identity().current() {
        Some(identity) => println!("{} ({})", identity.email, identity.uid),
        None => println!("Not signed in"),
    }
}
