use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Committed order.
///
/// Immutable after creation except for the status pair; the payment_*
/// columns flatten the payment-intent summary generated at checkout.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_status: OrderStatus,
    /// Generated payment token, unique per checkout
    pub payment_id: String,
    pub payment_method: String,
    pub payment_amount: Decimal,
    pub payment_status: OrderStatus,
    pub payment_currency: String,
    pub payment_created: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Order status lifecycle.
///
/// Status updates reject any value outside this set and advance
/// `order_status` and `payment_status` together.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "not_processed")]
    NotProcessed,
    #[sea_orm(string_value = "cash_on_delivery")]
    CashOnDelivery,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "dispatched")]
    Dispatched,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "delivered")]
    Delivered,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn order_status_round_trips_through_serde() {
        let json = serde_json::to_string(&OrderStatus::CashOnDelivery).unwrap();
        assert_eq!(json, "\"cash_on_delivery\"");
        let parsed: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, OrderStatus::CashOnDelivery);
    }

    #[test]
    fn order_status_rejects_unknown_values() {
        let parsed = serde_json::from_str::<OrderStatus>("\"refunded\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn order_status_parses_from_str() {
        assert_eq!(
            OrderStatus::from_str("dispatched").unwrap(),
            OrderStatus::Dispatched
        );
        assert!(OrderStatus::from_str("unknown").is_err());
    }
}
