pub mod carts;
pub mod common;
pub mod coupons;
pub mod orders;
pub mod products;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<crate::services::catalog::CatalogService>,
    pub cart: Arc<crate::services::carts::CartService>,
    pub coupon: Arc<crate::services::coupons::CouponService>,
    pub order: Arc<crate::services::orders::OrderService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let catalog = Arc::new(crate::services::catalog::CatalogService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let coupon = Arc::new(crate::services::coupons::CouponService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let cart = Arc::new(crate::services::carts::CartService::new(
            db_pool.clone(),
            event_sender.clone(),
            coupon.clone(),
        ));
        let order = Arc::new(crate::services::orders::OrderService::new(
            db_pool,
            event_sender,
        ));

        Self {
            catalog,
            cart,
            coupon,
            order,
        }
    }
}
