use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Catalog product
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display title
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product title must be between 1 and 255 characters"
    ))]
    pub title: String,

    /// URL slug derived from the title, unique across the catalog
    #[sea_orm(unique)]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Slug must be between 1 and 255 characters"
    ))]
    pub slug: String,

    pub description: Option<String>,

    /// Current unit price; carts snapshot this value at assembly time
    pub price: Decimal,

    pub category: Option<String>,
    pub brand: Option<String>,
    pub color: Option<String>,

    /// Units in stock. Order commitment decrements this conditionally and
    /// must never drive it negative.
    pub quantity: i32,

    /// Units sold, monotonically non-decreasing
    pub sold: i32,

    /// Rounded average star rating across all raters, 0 when unrated
    pub total_rating: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_rating::Entity")]
    Ratings,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::product_rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ratings.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.sold {
                active_model.sold = Set(0);
            }
            if let ActiveValue::NotSet = active_model.total_rating {
                active_model.total_rating = Set(0);
            }
            active_model.created_at = Set(Utc::now());
        }
        active_model.updated_at = Set(Utc::now());

        let model: Model = active_model.clone().try_into().map_err(|_| {
            DbErr::Custom("Failed to convert ActiveModel to Model for validation".to_string())
        })?;

        if let Err(err) = model.validate() {
            return Err(DbErr::Custom(format!("Validation error: {}", err)));
        }

        Ok(active_model)
    }
}
