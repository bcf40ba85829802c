use crate::{
    entities::{
        cart, cart_item, order, order_item, product, Cart, CartItem, CartModel, Order, OrderItem,
        OrderItemModel, OrderModel, OrderStatus, Product, User,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Order commitment and lifecycle service.
///
/// Converts the caller's cart into an immutable order. The stock mutation
/// runs inside the same transaction as the order insert, one conditional
/// decrement per line: a line whose product no longer has enough stock
/// aborts the whole order, so `quantity` can never go negative.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// Order with its line snapshots
#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

/// Currency recorded on generated payment intents
const PAYMENT_CURRENCY: &str = "usd";

/// The amount charged at checkout: the discounted total when a coupon was
/// applied and a discount is present on the cart, the raw total otherwise.
pub(crate) fn final_amount(cart: &CartModel, coupon_applied: bool) -> Decimal {
    match (coupon_applied, cart.total_after_discount) {
        (true, Some(discounted)) => discounted,
        _ => cart.cart_total,
    }
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Commit the user's cart as a cash-on-delivery order.
    #[instrument(skip(self))]
    pub async fn create_cash_order(
        &self,
        user_id: Uuid,
        coupon_applied: bool,
    ) -> Result<OrderWithItems, ServiceError> {
        let txn = self.db.begin().await?;

        let user_cart = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::BadRequest("User does not have a cart".to_string())
            })?;

        let cart_items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(user_cart.id))
            .all(&txn)
            .await?;
        if cart_items.is_empty() {
            return Err(ServiceError::InvalidOperation("Cart is empty".to_string()));
        }

        let amount = final_amount(&user_cart, coupon_applied);
        let order_id = Uuid::new_v4();
        let now = Utc::now();

        let new_order = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user_id),
            order_status: Set(OrderStatus::CashOnDelivery),
            payment_id: Set(Uuid::new_v4().to_string()),
            payment_method: Set("COD".to_string()),
            payment_amount: Set(amount),
            payment_status: Set(OrderStatus::CashOnDelivery),
            payment_currency: Set(PAYMENT_CURRENCY.to_string()),
            payment_created: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created_order = new_order.insert(&txn).await?;

        let mut created_items = Vec::with_capacity(cart_items.len());
        for line in &cart_items {
            // Conditional decrement: only succeeds while enough stock
            // remains. Zero rows affected means a concurrent checkout or an
            // oversized request won the stock; the whole order aborts.
            let update = Product::update_many()
                .col_expr(
                    product::Column::Quantity,
                    Expr::col(product::Column::Quantity).sub(line.count),
                )
                .col_expr(
                    product::Column::Sold,
                    Expr::col(product::Column::Sold).add(line.count),
                )
                .filter(product::Column::Id.eq(line.product_id))
                .filter(product::Column::Quantity.gte(line.count))
                .exec(&txn)
                .await?;

            if update.rows_affected == 0 {
                return Err(ServiceError::InsufficientStock(format!(
                    "Product {} does not have {} units in stock",
                    line.product_id, line.count
                )));
            }

            let snapshot = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                count: Set(line.count),
                color: Set(line.color.clone()),
                unit_price: Set(line.unit_price),
                created_at: Set(now),
            };
            created_items.push(snapshot.insert(&txn).await?);
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(order_id))
            .await;
        info!(
            "Created cash order {} for user {} (amount {})",
            order_id, user_id, amount
        );

        Ok(OrderWithItems {
            order: created_order,
            items: created_items,
        })
    }

    /// All orders belonging to a user, newest first, with line snapshots.
    pub async fn get_orders_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<OrderWithItems>, ServiceError> {
        User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;

        let orders = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .find_with_related(OrderItem)
            .all(&*self.db)
            .await?;

        Ok(orders
            .into_iter()
            .map(|(found, items)| OrderWithItems {
                order: found,
                items,
            })
            .collect())
    }

    /// Paginated listing across all users (admin surface).
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let paginator = Order::find()
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((data, total))
    }

    /// Advance an order's status.
    ///
    /// Membership in the status enumeration is enforced at the type level;
    /// `order_status` and `payment_status` move together in one row update.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let existing = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = existing.order_status;

        let mut active: order::ActiveModel = existing.into();
        active.order_status = Set(new_status);
        active.payment_status = Set(new_status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
            })
            .await;

        info!(
            "Order {} status {} -> {}",
            order_id, old_status, new_status
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cart_with(total: Decimal, discounted: Option<Decimal>) -> CartModel {
        let now = Utc::now();
        CartModel {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            cart_total: total,
            total_after_discount: discounted,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn final_amount_prefers_discount_when_coupon_applied() {
        let cart = cart_with(dec!(100.00), Some(dec!(80.00)));
        assert_eq!(final_amount(&cart, true), dec!(80.00));
    }

    #[test]
    fn final_amount_ignores_discount_without_coupon_flag() {
        let cart = cart_with(dec!(100.00), Some(dec!(80.00)));
        assert_eq!(final_amount(&cart, false), dec!(100.00));
    }

    #[test]
    fn final_amount_falls_back_when_no_discount_present() {
        let cart = cart_with(dec!(42.50), None);
        assert_eq!(final_amount(&cart, true), dec!(42.50));
    }
}
