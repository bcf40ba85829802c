use crate::{
    entities::{
        product, product_rating, Product, ProductModel, ProductRating,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order as SortOrder,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Catalog maintenance: product CRUD, typed listing, rating aggregation.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub color: Option<String>,
    pub quantity: i32,
}

/// Input for updating a product; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub color: Option<String>,
    pub quantity: Option<i32>,
}

/// Recognised sort keys for product listings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortKey {
    Title,
    Price,
    CreatedAt,
    TotalRating,
    Sold,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Typed product listing query: enumerated filters, sort key and
/// pagination rather than free-form filter objects.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(default)]
pub struct ProductListQuery {
    pub page: u64,
    pub per_page: u64,
    pub sort_by: Option<ProductSortKey>,
    pub sort_dir: Option<SortDirection>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub color: Option<String>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    /// Case-sensitive title substring match
    pub search: Option<String>,
}

impl Default for ProductListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
            sort_by: None,
            sort_dir: None,
            category: None,
            brand: None,
            color: None,
            price_min: None,
            price_max: None,
            search: None,
        }
    }
}

/// Derive a URL slug from a product title: lower-cased ASCII alphanumerics
/// with single dashes in between.
pub(crate) fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Rounded mean star rating across all raters, 0 when there are none.
pub(crate) fn average_rating(stars: &[i32]) -> i32 {
    if stars.is_empty() {
        return 0;
    }
    let sum: i64 = stars.iter().map(|s| i64::from(*s)).sum();
    (Decimal::from(sum) / Decimal::from(stars.len() as u64))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i32()
        .unwrap_or(0)
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Create a product; the slug derives from the title and must be unique.
    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        let slug = slugify(&input.title);
        if slug.is_empty() {
            return Err(ServiceError::ValidationError(
                "Product title must contain at least one alphanumeric character".to_string(),
            ));
        }

        let active = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title),
            slug: Set(slug),
            description: Set(input.description),
            price: Set(input.price),
            category: Set(input.category),
            brand: Set(input.brand),
            color: Set(input.color),
            quantity: Set(input.quantity),
            ..Default::default()
        };

        let created = match active.insert(&*self.db).await {
            Ok(model) => model,
            Err(e) => {
                return Err(match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        ServiceError::Conflict("A product with this slug already exists".to_string())
                    }
                    _ => e.into(),
                })
            }
        };

        self.event_sender
            .send_or_log(Event::ProductCreated(created.id))
            .await;
        info!("Created product {} ({})", created.slug, created.id);
        Ok(created)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    /// List products through the typed query. Returns the page and the
    /// total match count.
    pub async fn list_products(
        &self,
        query: ProductListQuery,
    ) -> Result<(Vec<ProductModel>, u64), ServiceError> {
        let mut select = Product::find();

        if let Some(category) = &query.category {
            select = select.filter(product::Column::Category.eq(category.clone()));
        }
        if let Some(brand) = &query.brand {
            select = select.filter(product::Column::Brand.eq(brand.clone()));
        }
        if let Some(color) = &query.color {
            select = select.filter(product::Column::Color.eq(color.clone()));
        }
        if let Some(min) = query.price_min {
            select = select.filter(product::Column::Price.gte(min));
        }
        if let Some(max) = query.price_max {
            select = select.filter(product::Column::Price.lte(max));
        }
        if let Some(search) = &query.search {
            select = select.filter(product::Column::Title.contains(search));
        }

        let direction = match query.sort_dir {
            Some(SortDirection::Asc) => SortOrder::Asc,
            Some(SortDirection::Desc) | None => SortOrder::Desc,
        };
        select = match query.sort_by {
            Some(ProductSortKey::Title) => select.order_by(product::Column::Title, direction),
            Some(ProductSortKey::Price) => select.order_by(product::Column::Price, direction),
            Some(ProductSortKey::TotalRating) => {
                select.order_by(product::Column::TotalRating, direction)
            }
            Some(ProductSortKey::Sold) => select.order_by(product::Column::Sold, direction),
            Some(ProductSortKey::CreatedAt) | None => {
                select.order_by(product::Column::CreatedAt, direction)
            }
        };

        let per_page = query.per_page.clamp(1, 100);
        let paginator = select.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        Ok((data, total))
    }

    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        let existing = self.get_product(id).await?;

        let mut active: product::ActiveModel = existing.into();
        if let Some(title) = input.title {
            let slug = slugify(&title);
            if slug.is_empty() {
                return Err(ServiceError::ValidationError(
                    "Product title must contain at least one alphanumeric character".to_string(),
                ));
            }
            active.title = Set(title);
            active.slug = Set(slug);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(category) = input.category {
            active.category = Set(Some(category));
        }
        if let Some(brand) = input.brand {
            active.brand = Set(Some(brand));
        }
        if let Some(color) = input.color {
            active.color = Set(Some(color));
        }
        if let Some(quantity) = input.quantity {
            active.quantity = Set(quantity);
        }

        let updated = match active.update(&*self.db).await {
            Ok(model) => model,
            Err(e) => {
                return Err(match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        ServiceError::Conflict("A product with this slug already exists".to_string())
                    }
                    _ => e.into(),
                })
            }
        };

        self.event_sender
            .send_or_log(Event::ProductUpdated(updated.id))
            .await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<ProductModel, ServiceError> {
        let existing = self.get_product(id).await?;
        Product::delete_by_id(id).exec(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductDeleted(id))
            .await;
        info!("Deleted product {}", id);
        Ok(existing)
    }

    /// Record or overwrite the caller's rating and recompute the product's
    /// aggregate.
    ///
    /// A prior rating by the same user is updated in place; the aggregate is
    /// the rounded mean over all raters and is recomputed inside the same
    /// transaction as the mutation.
    #[instrument(skip(self, comment))]
    pub async fn rate_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        star: i32,
        comment: Option<String>,
    ) -> Result<ProductModel, ServiceError> {
        let txn = self.db.begin().await?;

        let rated = Product::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let now = Utc::now();
        let existing = ProductRating::find()
            .filter(product_rating::Column::ProductId.eq(product_id))
            .filter(product_rating::Column::UserId.eq(user_id))
            .one(&txn)
            .await?;

        match existing {
            Some(previous) => {
                let mut active: product_rating::ActiveModel = previous.into();
                active.star = Set(star);
                active.comment = Set(comment);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
            None => {
                let active = product_rating::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    product_id: Set(product_id),
                    user_id: Set(user_id),
                    star: Set(star),
                    comment: Set(comment),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                active.insert(&txn).await?;
            }
        }

        let stars: Vec<i32> = ProductRating::find()
            .filter(product_rating::Column::ProductId.eq(product_id))
            .all(&txn)
            .await?
            .iter()
            .map(|r| r.star)
            .collect();
        let total_rating = average_rating(&stars);

        let mut active: product::ActiveModel = rated.into();
        active.total_rating = Set(total_rating);
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ProductRated {
                product_id,
                user_id,
                star,
            })
            .await;
        info!(
            "Product {} rated {} by {} (aggregate {})",
            product_id, star, user_id, total_rating
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_dashes() {
        assert_eq!(slugify("Apple Watch Ultra 2"), "apple-watch-ultra-2");
        assert_eq!(slugify("  Trimmed   Title "), "trimmed-title");
        assert_eq!(slugify("Ceci n'est pas une pipe"), "ceci-n-est-pas-une-pipe");
    }

    #[test]
    fn slugify_drops_leading_and_trailing_separators() {
        assert_eq!(slugify("--weird--"), "weird");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn average_rating_is_rounded_mean() {
        assert_eq!(average_rating(&[5, 4]), 5); // 4.5 rounds away from zero
        assert_eq!(average_rating(&[5, 4, 2]), 4); // 3.67 -> 4
        assert_eq!(average_rating(&[1, 2]), 2); // 1.5 -> 2, Math.round style
        assert_eq!(average_rating(&[3]), 3);
    }

    #[test]
    fn average_rating_guards_empty_input() {
        assert_eq!(average_rating(&[]), 0);
    }
}
