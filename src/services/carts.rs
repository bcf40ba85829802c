use crate::{
    entities::{cart, cart_item, Cart, CartItem, CartItemModel, CartModel, Product, User},
    errors::ServiceError,
    events::{Event, EventSender},
    services::coupons::CouponService,
};
use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Cart assembly service.
///
/// Builds per-user cart snapshots with server-resolved unit prices and
/// applies coupon discounts. At most one cart exists per user; the store
/// enforces this with a unique index on the owning-user column, so a
/// concurrent double-create degrades to a conflict instead of a duplicate.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    coupon_service: Arc<CouponService>,
}

/// Requested cart line as sent by the client. The price is deliberately
/// absent: unit prices are resolved from the catalog at assembly time.
#[derive(Debug, Clone, Deserialize)]
pub struct CartLineInput {
    pub product_id: Uuid,
    pub count: i32,
    pub color: Option<String>,
}

/// Cart with its line items
#[derive(Debug, Serialize)]
pub struct CartWithItems {
    pub cart: CartModel,
    pub items: Vec<CartItemModel>,
}

/// Result of the toggle operation: a fresh cart was built, or the existing
/// one was deleted and returned.
#[derive(Debug, Serialize)]
pub enum CartToggleOutcome {
    Created(CartWithItems),
    Cleared(CartWithItems),
}

/// Discounted total as persisted on the cart: two decimal places, midpoints
/// rounded away from zero.
pub(crate) fn discounted_total(cart_total: Decimal, discount_percent: Decimal) -> Decimal {
    (cart_total - cart_total * discount_percent / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl CartService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        coupon_service: Arc<CouponService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            coupon_service,
        }
    }

    /// Build-or-clear toggle.
    ///
    /// If the user already has a cart, that cart is deleted and returned,
    /// ignoring `lines` entirely; otherwise a new cart is assembled from
    /// `lines`. First call creates, second call clears.
    #[instrument(skip(self, lines))]
    pub async fn toggle_cart(
        &self,
        user_id: Uuid,
        lines: Vec<CartLineInput>,
    ) -> Result<CartToggleOutcome, ServiceError> {
        let txn = self.db.begin().await?;

        ensure_user_exists(&txn, user_id).await?;

        if let Some(existing) = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
        {
            let snapshot = delete_cart(&txn, existing).await?;
            txn.commit().await?;

            self.event_sender
                .send_or_log(Event::CartCleared(snapshot.cart.id))
                .await;
            info!("Toggled cart off for user {}", user_id);
            return Ok(CartToggleOutcome::Cleared(snapshot));
        }

        let built = build_cart(&txn, user_id, &lines).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartCreated(built.cart.id))
            .await;
        info!(
            "Built cart {} for user {} ({} lines)",
            built.cart.id,
            user_id,
            built.items.len()
        );
        Ok(CartToggleOutcome::Created(built))
    }

    /// Replace the user's cart with a freshly assembled one.
    ///
    /// Unlike the toggle, an existing cart does not short-circuit: it is
    /// dropped and the new line list takes its place atomically.
    #[instrument(skip(self, lines))]
    pub async fn replace_cart(
        &self,
        user_id: Uuid,
        lines: Vec<CartLineInput>,
    ) -> Result<CartWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        ensure_user_exists(&txn, user_id).await?;

        if let Some(existing) = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
        {
            delete_cart(&txn, existing).await?;
        }

        let built = build_cart(&txn, user_id, &lines).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartReplaced(built.cart.id))
            .await;
        Ok(built)
    }

    /// Delete the user's cart, returning the deleted snapshot, or `None`
    /// when there was nothing to clear.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: Uuid) -> Result<Option<CartWithItems>, ServiceError> {
        let txn = self.db.begin().await?;

        let Some(existing) = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
        else {
            return Ok(None);
        };

        let snapshot = delete_cart(&txn, existing).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartCleared(snapshot.cart.id))
            .await;
        info!("Cleared cart for user {}", user_id);
        Ok(Some(snapshot))
    }

    /// The user's current cart with items, if any.
    pub async fn get_cart(&self, user_id: Uuid) -> Result<Option<CartWithItems>, ServiceError> {
        let Some(found) = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
        else {
            return Ok(None);
        };

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(found.id))
            .all(&*self.db)
            .await?;

        Ok(Some(CartWithItems { cart: found, items }))
    }

    /// Apply a named coupon to the user's cart.
    ///
    /// Computes `total_after_discount` from the current `cart_total` and
    /// persists it; reapplying the same valid coupon recomputes the same
    /// value.
    #[instrument(skip(self))]
    pub async fn apply_coupon(
        &self,
        user_id: Uuid,
        coupon_code: &str,
    ) -> Result<CartModel, ServiceError> {
        let coupon = self.coupon_service.validate(coupon_code).await?;

        let user_cart = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::BadRequest("User does not have a cart".to_string())
            })?;

        let total_after_discount = discounted_total(user_cart.cart_total, coupon.discount);

        let cart_id = user_cart.id;
        let mut active: cart::ActiveModel = user_cart.into();
        active.total_after_discount = Set(Some(total_after_discount));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CouponApplied {
                cart_id,
                coupon_id: coupon.id,
            })
            .await;

        info!(
            "Applied coupon {} to cart {}: {} -> {}",
            coupon.name, cart_id, updated.cart_total, total_after_discount
        );
        Ok(updated)
    }
}

async fn ensure_user_exists<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<(), ServiceError> {
    User::find_by_id(user_id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
}

/// Assemble and persist a cart from the requested lines.
///
/// Every product must resolve; a single miss aborts the whole build with no
/// partial write (the caller's transaction rolls back on error).
async fn build_cart<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    lines: &[CartLineInput],
) -> Result<CartWithItems, ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::BadRequest(
            "Cart items are required".to_string(),
        ));
    }

    let cart_id = Uuid::new_v4();
    let now = Utc::now();

    let mut cart_total = Decimal::ZERO;
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        if line.count <= 0 {
            return Err(ServiceError::BadRequest(
                "Line item count must be positive".to_string(),
            ));
        }

        let product = Product::find_by_id(line.product_id)
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::BadRequest(format!("Product {} does not exist", line.product_id))
            })?;

        cart_total += product.price * Decimal::from(line.count);
        items.push(cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            cart_id: Set(cart_id),
            product_id: Set(product.id),
            count: Set(line.count),
            color: Set(line.color.clone()),
            unit_price: Set(product.price),
            created_at: Set(now),
            updated_at: Set(now),
        });
    }

    let new_cart = cart::ActiveModel {
        id: Set(cart_id),
        user_id: Set(user_id),
        cart_total: Set(cart_total),
        total_after_discount: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let inserted = match new_cart.insert(conn).await {
        Ok(model) => model,
        Err(e) => {
            return Err(match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(
                    "A cart already exists for this user".to_string(),
                ),
                _ => e.into(),
            })
        }
    };

    let mut inserted_items = Vec::with_capacity(items.len());
    for item in items {
        inserted_items.push(item.insert(conn).await?);
    }

    Ok(CartWithItems {
        cart: inserted,
        items: inserted_items,
    })
}

/// Delete a cart and its items, returning the deleted snapshot.
async fn delete_cart<C: ConnectionTrait>(
    conn: &C,
    existing: CartModel,
) -> Result<CartWithItems, ServiceError> {
    let items = CartItem::find()
        .filter(cart_item::Column::CartId.eq(existing.id))
        .all(conn)
        .await?;

    CartItem::delete_many()
        .filter(cart_item::Column::CartId.eq(existing.id))
        .exec(conn)
        .await?;
    Cart::delete_by_id(existing.id).exec(conn).await?;

    Ok(CartWithItems {
        cart: existing,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn discount_is_percentage_of_cart_total() {
        assert_eq!(discounted_total(dec!(100.00), dec!(20)), dec!(80.00));
        assert_eq!(discounted_total(dec!(100.00), dec!(0)), dec!(100.00));
        assert_eq!(discounted_total(dec!(100.00), dec!(100)), dec!(0.00));
    }

    #[test]
    fn discount_rounds_to_two_decimal_places() {
        // 59.97 * 15% = 8.9955 -> 50.9745 rounds to 50.97
        assert_eq!(discounted_total(dec!(59.97), dec!(15)), dec!(50.97));
        // midpoint rounds away from zero: 10.005 -> 10.01
        assert_eq!(discounted_total(dec!(20.01), dec!(50)), dec!(10.01));
    }

    #[test]
    fn discount_is_deterministic_over_cart_total() {
        let first = discounted_total(dec!(249.90), dec!(12.5));
        let second = discounted_total(dec!(249.90), dec!(12.5));
        assert_eq!(first, second);
    }

    #[test]
    fn line_totals_accumulate() {
        let lines = [(dec!(19.99), 3), (dec!(5.00), 2)];
        let total: Decimal = lines
            .iter()
            .map(|(price, count)| *price * Decimal::from(*count))
            .sum();
        assert_eq!(total, dec!(69.97));
    }
}
