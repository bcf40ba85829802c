//! Shared test harness: an in-memory SQLite database migrated through the
//! embedded migrator, with the storefront services wired on top. No
//! external services are required.
#![allow(dead_code)]

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use storefront_api::{
    entities::{product, user, ProductModel},
    events::EventSender,
    migrator::Migrator,
    services::{CartService, CatalogService, CouponService, OrderService},
};
use tokio::sync::mpsc;
use uuid::Uuid;

pub struct TestCtx {
    pub db: Arc<DatabaseConnection>,
    pub carts: CartService,
    pub catalog: CatalogService,
    pub coupons: CouponService,
    pub orders: OrderService,
}

pub async fn setup() -> TestCtx {
    // A single pooled connection keeps every query on the same in-memory
    // database.
    let mut opts = ConnectOptions::new("sqlite::memory:".to_owned());
    opts.max_connections(1).min_connections(1);

    let db = Database::connect(opts).await.expect("connect sqlite");
    Migrator::up(&db, None).await.expect("run migrations");

    let (tx, mut rx) = mpsc::channel(64);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });

    let db = Arc::new(db);
    let events = Arc::new(EventSender::new(tx));
    let coupons = CouponService::new(db.clone(), events.clone());

    TestCtx {
        carts: CartService::new(db.clone(), events.clone(), Arc::new(coupons.clone())),
        catalog: CatalogService::new(db.clone(), events.clone()),
        coupons,
        orders: OrderService::new(db.clone(), events),
        db,
    }
}

pub async fn seed_user(ctx: &TestCtx, email: &str) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();
    user::ActiveModel {
        id: Set(id),
        email: Set(email.to_string()),
        first_name: Set("Test".to_string()),
        last_name: Set("Shopper".to_string()),
        role: Set("user".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&*ctx.db)
    .await
    .expect("insert user");
    id
}

pub async fn seed_product(
    ctx: &TestCtx,
    title: &str,
    price: Decimal,
    quantity: i32,
) -> ProductModel {
    let now = Utc::now();
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_string()),
        slug: Set(title.to_lowercase().replace(' ', "-")),
        description: Set(None),
        price: Set(price),
        category: Set(None),
        brand: Set(None),
        color: Set(None),
        quantity: Set(quantity),
        sold: Set(0),
        total_rating: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&*ctx.db)
    .await
    .expect("insert product")
}
