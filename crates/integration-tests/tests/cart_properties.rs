//! Cart behaviour across sequences of operations.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use corewell_core::{Cart, CartError, ProductId};
use corewell_integration_tests::TestContext;
use corewell_storefront::cache::LocalCache;
use corewell_storefront::cart::LoginPolicy;
use corewell_storefront::models::keys;

fn cached_cart(ctx: &TestContext) -> Cart {
    serde_json::from_str(&ctx.cache.get(keys::CART).unwrap().unwrap()).unwrap()
}

// =============================================================================
// Add / Increment
// =============================================================================

#[test]
fn test_repeated_adds_make_one_line() {
    let ctx = TestContext::new(LoginPolicy::Replace);
    let mut store = ctx.cart_store();

    for n in 1..=7u32 {
        store
            .add_or_increment(&ProductId::new("colon-cleanse"), ctx.state.catalog())
            .unwrap();
        assert_eq!(store.lines().len(), 1);
        assert_eq!(store.lines()[0].quantity, n);
    }
}

#[test]
fn test_glow_boost_twice() {
    let ctx = TestContext::new(LoginPolicy::Replace);
    let mut store = ctx.cart_store();
    ctx.add_all(&mut store, &["glow-boost", "glow-boost"]);

    assert_eq!(store.lines().len(), 1);
    assert_eq!(store.lines()[0].quantity, 2);
    assert_eq!(store.total_price(), Decimal::new(11_998, 2));
    assert_eq!(store.total_count(), 2);
}

#[test]
fn test_many_additions_total_exactly() {
    let ctx = TestContext::new(LoginPolicy::Replace);
    let mut store = ctx.cart_store();
    for _ in 0..1_000 {
        ctx.add_all(&mut store, &["iron-boost"]);
    }
    assert_eq!(store.total_price(), Decimal::new(5_999_000, 2));
}

// =============================================================================
// Quantity / Removal
// =============================================================================

#[test]
fn test_quantity_to_zero_shifts_following_lines() {
    let ctx = TestContext::new(LoginPolicy::Replace);
    let mut store = ctx.cart_store();
    ctx.add_all(&mut store, &["glow-boost", "colon-cleanse", "colon-cleanse", "iron-boost"]);

    store.set_quantity(1, -5).unwrap();

    let ids: Vec<_> = store.lines().iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, ["glow-boost", "iron-boost"]);
    assert_eq!(cached_cart(&ctx).len(), 2);
}

#[test]
fn test_total_count_tracks_quantities() {
    let ctx = TestContext::new(LoginPolicy::Replace);
    let mut store = ctx.cart_store();
    ctx.add_all(&mut store, &["glow-boost", "iron-boost", "iron-boost"]);
    store.set_quantity(0, 4).unwrap();
    store.set_quantity(1, -1).unwrap();

    let sum: u64 = store.lines().iter().map(|l| u64::from(l.quantity)).sum();
    assert_eq!(store.total_count(), sum);
    assert_eq!(store.total_count(), 6);
}

#[test]
fn test_double_remove_fails_cleanly() {
    let ctx = TestContext::new(LoginPolicy::Replace);
    let mut store = ctx.cart_store();
    ctx.add_all(&mut store, &["glow-boost", "iron-boost"]);

    store.remove_at(1).unwrap();
    let err = store.remove_at(1).unwrap_err();
    assert_eq!(err, CartError::IndexOutOfBounds { index: 1, len: 1 });
    assert_eq!(store.lines().len(), 1);
    assert_eq!(cached_cart(&ctx), store.cart().clone());
}

#[test]
fn test_clear_three_lines() {
    let ctx = TestContext::new(LoginPolicy::Replace);
    let mut store = ctx.cart_store();
    ctx.add_all(&mut store, &["glow-boost", "colon-cleanse", "iron-boost"]);

    store.clear();

    assert_eq!(store.total_count(), 0);
    assert_eq!(store.lines().len(), 0);
    assert_eq!(ctx.cache.get(keys::CART).unwrap().as_deref(), Some("[]"));
}

// =============================================================================
// Local Cache
// =============================================================================

#[test]
fn test_reload_gives_identical_sequence() {
    let ctx = TestContext::new(LoginPolicy::Replace);
    let mut store = ctx.cart_store();
    ctx.add_all(&mut store, &["iron-boost", "glow-boost", "iron-boost"]);
    store.set_quantity(1, 2).unwrap();

    let reloaded = ctx.cart_store();
    assert_eq!(reloaded.lines(), store.lines());
}

#[test]
fn test_legacy_numeric_prices_load() {
    let ctx = TestContext::new(LoginPolicy::Replace);
    ctx.cache
        .set(
            keys::CART,
            r#"[{"id":"glow-boost","name":"Glow Boost","price":59.99,"quantity":2}]"#,
        )
        .unwrap();

    let store = ctx.cart_store();
    assert_eq!(store.total_price(), Decimal::new(11_998, 2));
}

#[test]
fn test_corrupt_cache_starts_empty() {
    let ctx = TestContext::new(LoginPolicy::Replace);
    ctx.cache.set(keys::CART, "[{\"id\":").unwrap();
    assert!(ctx.cart_store().cart().is_empty());
}
