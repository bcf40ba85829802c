//! Order commitment tests: amount selection, conditional stock decrement,
//! all-or-nothing rollback and status transitions.

mod common;

use chrono::{Duration, Utc};
use common::{seed_product, seed_user, setup};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use storefront_api::{
    entities::{Order, OrderStatus, Product},
    errors::ServiceError,
    services::carts::CartLineInput,
    services::coupons::CreateCouponInput,
};
use uuid::Uuid;

fn line(product_id: Uuid, count: i32) -> CartLineInput {
    CartLineInput {
        product_id,
        count,
        color: Some("black".to_string()),
    }
}

#[tokio::test]
async fn cash_order_decrements_stock_and_increments_sold() {
    let ctx = setup().await;
    let user_id = seed_user(&ctx, "stock@example.com").await;
    let product = seed_product(&ctx, "Speaker", dec!(45.00), 10).await;

    ctx.carts
        .replace_cart(user_id, vec![line(product.id, 3)])
        .await
        .unwrap();

    let committed = ctx.orders.create_cash_order(user_id, false).await.unwrap();

    assert_eq!(committed.order.payment_amount, dec!(135.00));
    assert_eq!(committed.order.order_status, OrderStatus::CashOnDelivery);
    assert_eq!(committed.order.payment_status, OrderStatus::CashOnDelivery);
    assert_eq!(committed.order.payment_method, "COD");
    assert_eq!(committed.order.payment_currency, "usd");
    assert_eq!(committed.items.len(), 1);
    assert_eq!(committed.items[0].count, 3);
    // The price actually charged is snapshotted per line
    assert_eq!(committed.items[0].unit_price, dec!(45.00));
    assert_eq!(committed.items[0].color.as_deref(), Some("black"));

    let after = Product::find_by_id(product.id)
        .one(&*ctx.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.quantity, 7);
    assert_eq!(after.sold, 3);
}

#[tokio::test]
async fn coupon_applied_charges_discounted_total() {
    let ctx = setup().await;
    let user_id = seed_user(&ctx, "codcoupon@example.com").await;
    let product = seed_product(&ctx, "Blender", dec!(100.00), 5).await;

    ctx.carts
        .replace_cart(user_id, vec![line(product.id, 1)])
        .await
        .unwrap();
    ctx.coupons
        .create_coupon(CreateCouponInput {
            name: "QUARTER".to_string(),
            expiry: Utc::now() + Duration::days(1),
            discount: dec!(25),
        })
        .await
        .unwrap();
    ctx.carts.apply_coupon(user_id, "QUARTER").await.unwrap();

    let committed = ctx.orders.create_cash_order(user_id, true).await.unwrap();
    assert_eq!(committed.order.payment_amount, dec!(75.00));
}

#[tokio::test]
async fn coupon_flag_without_discount_falls_back_to_cart_total() {
    let ctx = setup().await;
    let user_id = seed_user(&ctx, "noflag@example.com").await;
    let product = seed_product(&ctx, "Kettle", dec!(60.00), 5).await;

    ctx.carts
        .replace_cart(user_id, vec![line(product.id, 1)])
        .await
        .unwrap();

    // couponApplied=true but no discount was ever applied to the cart
    let committed = ctx.orders.create_cash_order(user_id, true).await.unwrap();
    assert_eq!(committed.order.payment_amount, dec!(60.00));
}

#[tokio::test]
async fn insufficient_stock_aborts_the_whole_order() {
    let ctx = setup().await;
    let user_id = seed_user(&ctx, "oversell@example.com").await;
    let plenty = seed_product(&ctx, "Cable", dec!(5.00), 100).await;
    let scarce = seed_product(&ctx, "Rare Vinyl", dec!(80.00), 2).await;

    ctx.carts
        .replace_cart(
            user_id,
            vec![line(plenty.id, 10), line(scarce.id, 3)],
        )
        .await
        .unwrap();

    let err = ctx.orders.create_cash_order(user_id, false).await.unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    // All-or-nothing: the first line's decrement rolled back too and no
    // order row survived
    let untouched = Product::find_by_id(plenty.id)
        .one(&*ctx.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.quantity, 100);
    assert_eq!(untouched.sold, 0);

    assert!(Order::find().all(&*ctx.db).await.unwrap().is_empty());
}

#[tokio::test]
async fn order_without_cart_is_rejected() {
    let ctx = setup().await;
    let user_id = seed_user(&ctx, "ordernocart@example.com").await;

    let err = ctx.orders.create_cash_order(user_id, false).await.unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));
}

#[tokio::test]
async fn cart_survives_order_commitment() {
    let ctx = setup().await;
    let user_id = seed_user(&ctx, "keepcart@example.com").await;
    let product = seed_product(&ctx, "Puzzle", dec!(20.00), 9).await;

    ctx.carts
        .replace_cart(user_id, vec![line(product.id, 1)])
        .await
        .unwrap();
    ctx.orders.create_cash_order(user_id, false).await.unwrap();

    // Committing does not clear the cart; that stays an explicit operation
    assert!(ctx.carts.get_cart(user_id).await.unwrap().is_some());
}

#[tokio::test]
async fn status_update_moves_both_statuses() {
    let ctx = setup().await;
    let user_id = seed_user(&ctx, "status@example.com").await;
    let product = seed_product(&ctx, "Globe", dec!(35.00), 3).await;

    ctx.carts
        .replace_cart(user_id, vec![line(product.id, 1)])
        .await
        .unwrap();
    let committed = ctx.orders.create_cash_order(user_id, false).await.unwrap();

    let updated = ctx
        .orders
        .update_order_status(committed.order.id, OrderStatus::Dispatched)
        .await
        .unwrap();
    assert_eq!(updated.order_status, OrderStatus::Dispatched);
    assert_eq!(updated.payment_status, OrderStatus::Dispatched);
}

#[tokio::test]
async fn status_update_on_missing_order_is_not_found() {
    let ctx = setup().await;

    let err = ctx
        .orders
        .update_order_status(Uuid::new_v4(), OrderStatus::Processing)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn admin_listing_paginates_across_users() {
    let ctx = setup().await;
    let product = seed_product(&ctx, "Poster", dec!(12.00), 30).await;

    for i in 0..3 {
        let user_id = seed_user(&ctx, &format!("buyer-{}@example.com", i)).await;
        ctx.carts
            .replace_cart(user_id, vec![line(product.id, 1)])
            .await
            .unwrap();
        ctx.orders.create_cash_order(user_id, false).await.unwrap();
    }

    let (first_page, total) = ctx.orders.list_orders(1, 2).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(first_page.len(), 2);

    let (second_page, _) = ctx.orders.list_orders(2, 2).await.unwrap();
    assert_eq!(second_page.len(), 1);
}

#[tokio::test]
async fn users_see_their_own_orders_newest_first() {
    let ctx = setup().await;
    let user_id = seed_user(&ctx, "history@example.com").await;
    let product = seed_product(&ctx, "Mug", dec!(8.00), 50).await;

    for _ in 0..2 {
        ctx.carts
            .replace_cart(user_id, vec![line(product.id, 1)])
            .await
            .unwrap();
        ctx.orders.create_cash_order(user_id, false).await.unwrap();
    }

    let orders = ctx.orders.get_orders_for_user(user_id).await.unwrap();
    assert_eq!(orders.len(), 2);
    assert!(orders[0].order.created_at >= orders[1].order.created_at);
    assert_eq!(orders[0].items.len(), 1);

    let err = ctx
        .orders
        .get_orders_for_user(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}
