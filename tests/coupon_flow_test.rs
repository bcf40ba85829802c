//! Coupon validation and application tests: expiry handling, discount
//! arithmetic and the admin CRUD surface.

mod common;

use chrono::{Duration, Utc};
use common::{seed_product, seed_user, setup};
use rust_decimal_macros::dec;
use storefront_api::{
    errors::ServiceError,
    services::carts::CartLineInput,
    services::coupons::{CreateCouponInput, UpdateCouponInput},
};

async fn cart_of(ctx: &common::TestCtx, email: &str, total_price: rust_decimal::Decimal) -> uuid::Uuid {
    let user_id = seed_user(ctx, email).await;
    let product = seed_product(ctx, &format!("Product for {}", email), total_price, 100).await;
    ctx.carts
        .replace_cart(
            user_id,
            vec![CartLineInput {
                product_id: product.id,
                count: 1,
                color: None,
            }],
        )
        .await
        .expect("cart builds");
    user_id
}

#[tokio::test]
async fn valid_coupon_computes_discounted_total() {
    let ctx = setup().await;
    let user_id = cart_of(&ctx, "discount@example.com", dec!(100.00)).await;

    ctx.coupons
        .create_coupon(CreateCouponInput {
            name: "summer20".to_string(),
            expiry: Utc::now() + Duration::days(7),
            discount: dec!(20),
        })
        .await
        .unwrap();

    // Lookup is case-normalised
    let updated = ctx.carts.apply_coupon(user_id, "Summer20").await.unwrap();
    assert_eq!(updated.total_after_discount, Some(dec!(80.00)));
    assert_eq!(updated.cart_total, dec!(100.00));
}

#[tokio::test]
async fn discount_rounds_to_two_decimals() {
    let ctx = setup().await;
    let user_id = cart_of(&ctx, "rounding@example.com", dec!(59.97)).await;

    ctx.coupons
        .create_coupon(CreateCouponInput {
            name: "FIFTEEN".to_string(),
            expiry: Utc::now() + Duration::days(1),
            discount: dec!(15),
        })
        .await
        .unwrap();

    let updated = ctx.carts.apply_coupon(user_id, "FIFTEEN").await.unwrap();
    // 59.97 - 8.9955 = 50.9745 -> 50.97
    assert_eq!(updated.total_after_discount, Some(dec!(50.97)));
}

#[tokio::test]
async fn reapplying_recomputes_the_same_total() {
    let ctx = setup().await;
    let user_id = cart_of(&ctx, "idempotent@example.com", dec!(240.00)).await;

    ctx.coupons
        .create_coupon(CreateCouponInput {
            name: "TEN".to_string(),
            expiry: Utc::now() + Duration::days(1),
            discount: dec!(10),
        })
        .await
        .unwrap();

    let first = ctx.carts.apply_coupon(user_id, "TEN").await.unwrap();
    let second = ctx.carts.apply_coupon(user_id, "TEN").await.unwrap();
    assert_eq!(first.total_after_discount, second.total_after_discount);
    assert_eq!(second.total_after_discount, Some(dec!(216.00)));
}

#[tokio::test]
async fn expired_coupon_is_rejected() {
    let ctx = setup().await;
    let user_id = cart_of(&ctx, "expired@example.com", dec!(50.00)).await;

    ctx.coupons
        .create_coupon(CreateCouponInput {
            name: "OLD".to_string(),
            expiry: Utc::now() - Duration::days(1),
            discount: dec!(50),
        })
        .await
        .unwrap();

    let err = ctx.carts.apply_coupon(user_id, "OLD").await.unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(msg) if msg.contains("expired")));
}

#[tokio::test]
async fn unknown_coupon_is_not_found() {
    let ctx = setup().await;
    let user_id = cart_of(&ctx, "unknown@example.com", dec!(50.00)).await;

    let err = ctx.carts.apply_coupon(user_id, "NOPE").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn coupon_requires_an_existing_cart() {
    let ctx = setup().await;
    let user_id = seed_user(&ctx, "cartless@example.com").await;

    ctx.coupons
        .create_coupon(CreateCouponInput {
            name: "LONELY".to_string(),
            expiry: Utc::now() + Duration::days(1),
            discount: dec!(5),
        })
        .await
        .unwrap();

    let err = ctx.carts.apply_coupon(user_id, "LONELY").await.unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));
}

#[tokio::test]
async fn duplicate_coupon_name_conflicts() {
    let ctx = setup().await;

    let input = |name: &str| CreateCouponInput {
        name: name.to_string(),
        expiry: Utc::now() + Duration::days(1),
        discount: dec!(5),
    };

    ctx.coupons.create_coupon(input("WELCOME")).await.unwrap();
    // Same name, different casing: stored upper-cased, so it collides
    let err = ctx.coupons.create_coupon(input("welcome")).await.unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn coupon_crud_round_trip() {
    let ctx = setup().await;

    let created = ctx
        .coupons
        .create_coupon(CreateCouponInput {
            name: "spring".to_string(),
            expiry: Utc::now() + Duration::days(30),
            discount: dec!(25),
        })
        .await
        .unwrap();
    assert_eq!(created.name, "SPRING");

    let updated = ctx
        .coupons
        .update_coupon(
            created.id,
            UpdateCouponInput {
                discount: Some(dec!(30)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.discount, dec!(30));
    assert_eq!(updated.name, "SPRING");

    assert_eq!(ctx.coupons.list_coupons().await.unwrap().len(), 1);

    ctx.coupons.delete_coupon(created.id).await.unwrap();
    let err = ctx.coupons.get_coupon(created.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}
