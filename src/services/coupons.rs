use crate::{
    entities::{coupon, Coupon, CouponModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Coupon management and validation.
///
/// The CRUD surface is admin-only; `validate` is the lookup-and-expiry
/// kernel the checkout workflow uses when a coupon is applied to a cart.
#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// Input for creating a coupon
#[derive(Debug, Deserialize)]
pub struct CreateCouponInput {
    pub name: String,
    pub expiry: DateTime<Utc>,
    pub discount: Decimal,
}

/// Input for updating a coupon; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCouponInput {
    pub name: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub discount: Option<Decimal>,
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Create a coupon. Names are stored upper-cased; duplicates conflict.
    #[instrument(skip(self))]
    pub async fn create_coupon(
        &self,
        input: CreateCouponInput,
    ) -> Result<CouponModel, ServiceError> {
        let now = Utc::now();
        let active = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_uppercase()),
            expiry: Set(input.expiry),
            discount: Set(input.discount),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = match active.insert(&*self.db).await {
            Ok(model) => model,
            Err(e) => {
                return Err(match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        ServiceError::Conflict("Coupon name already exists".to_string())
                    }
                    _ => e.into(),
                })
            }
        };

        self.event_sender
            .send_or_log(Event::CouponCreated(created.id))
            .await;
        info!("Created coupon {} ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn list_coupons(&self) -> Result<Vec<CouponModel>, ServiceError> {
        Ok(Coupon::find()
            .order_by_asc(coupon::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_coupon(&self, id: Uuid) -> Result<CouponModel, ServiceError> {
        Coupon::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn update_coupon(
        &self,
        id: Uuid,
        input: UpdateCouponInput,
    ) -> Result<CouponModel, ServiceError> {
        let existing = self.get_coupon(id).await?;

        let mut active: coupon::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_uppercase());
        }
        if let Some(expiry) = input.expiry {
            active.expiry = Set(expiry);
        }
        if let Some(discount) = input.discount {
            active.discount = Set(discount);
        }
        active.updated_at = Set(Utc::now());

        let updated = match active.update(&*self.db).await {
            Ok(model) => model,
            Err(e) => {
                return Err(match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        ServiceError::Conflict("Coupon name already exists".to_string())
                    }
                    _ => e.into(),
                })
            }
        };

        self.event_sender
            .send_or_log(Event::CouponUpdated(updated.id))
            .await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_coupon(&self, id: Uuid) -> Result<CouponModel, ServiceError> {
        let existing = self.get_coupon(id).await?;
        Coupon::delete_by_id(id).exec(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CouponDeleted(id))
            .await;
        info!("Deleted coupon {}", id);
        Ok(existing)
    }

    /// Look a coupon up by code and reject it when expired.
    pub async fn validate(&self, code: &str) -> Result<CouponModel, ServiceError> {
        let normalized = code.trim().to_uppercase();
        let found = Coupon::find()
            .filter(coupon::Column::Name.eq(normalized.clone()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", normalized)))?;

        if found.is_expired(Utc::now()) {
            return Err(ServiceError::BadRequest("Coupon expired".to_string()));
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_is_exclusive_of_the_deadline() {
        let now = Utc::now();
        let model = CouponModel {
            id: Uuid::new_v4(),
            name: "SUMMER20".to_string(),
            expiry: now,
            discount: Decimal::from(20),
            created_at: now,
            updated_at: now,
        };

        // usable exactly at the deadline, rejected past it
        assert!(!model.is_expired(now));
        assert!(model.is_expired(now + Duration::seconds(1)));
        assert!(!model.is_expired(now - Duration::days(1)));
    }
}
