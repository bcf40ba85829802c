//! Catalog tests: slug derivation, typed listing query and CRUD.

mod common;

use common::{seed_product, setup};
use rust_decimal_macros::dec;
use storefront_api::{
    errors::ServiceError,
    services::catalog::{
        CreateProductInput, ProductListQuery, ProductSortKey, SortDirection, UpdateProductInput,
    },
};

fn create_input(title: &str, price: rust_decimal::Decimal) -> CreateProductInput {
    CreateProductInput {
        title: title.to_string(),
        description: None,
        price,
        category: Some("audio".to_string()),
        brand: None,
        color: None,
        quantity: 10,
    }
}

#[tokio::test]
async fn created_product_gets_a_slug() {
    let ctx = setup().await;

    let product = ctx
        .catalog
        .create_product(create_input("Studio Monitor MK2", dec!(349.00)))
        .await
        .unwrap();

    assert_eq!(product.slug, "studio-monitor-mk2");
    assert_eq!(product.sold, 0);
    assert_eq!(product.total_rating, 0);
}

#[tokio::test]
async fn duplicate_slug_conflicts() {
    let ctx = setup().await;

    ctx.catalog
        .create_product(create_input("Same Title", dec!(10.00)))
        .await
        .unwrap();
    let err = ctx
        .catalog
        .create_product(create_input("Same Title", dec!(12.00)))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn typed_query_filters_and_sorts() {
    let ctx = setup().await;
    seed_product(&ctx, "Cheap Thing", dec!(5.00), 10).await;
    seed_product(&ctx, "Mid Thing", dec!(50.00), 10).await;
    seed_product(&ctx, "Expensive Thing", dec!(500.00), 10).await;

    let (page, total) = ctx
        .catalog
        .list_products(ProductListQuery {
            price_min: Some(dec!(10.00)),
            price_max: Some(dec!(100.00)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(page[0].title, "Mid Thing");

    let (sorted, _) = ctx
        .catalog
        .list_products(ProductListQuery {
            sort_by: Some(ProductSortKey::Price),
            sort_dir: Some(SortDirection::Asc),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(sorted.first().unwrap().title, "Cheap Thing");
    assert_eq!(sorted.last().unwrap().title, "Expensive Thing");

    let (searched, search_total) = ctx
        .catalog
        .list_products(ProductListQuery {
            search: Some("Expensive".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(search_total, 1);
    assert_eq!(searched[0].title, "Expensive Thing");
}

#[tokio::test]
async fn pagination_caps_and_pages() {
    let ctx = setup().await;
    for i in 0..5 {
        seed_product(&ctx, &format!("Bulk Item {}", i), dec!(9.99), 1).await;
    }

    let (first_page, total) = ctx
        .catalog
        .list_products(ProductListQuery {
            per_page: 2,
            page: 1,
            sort_by: Some(ProductSortKey::Title),
            sort_dir: Some(SortDirection::Asc),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(total, 5);
    assert_eq!(first_page.len(), 2);

    let (last_page, _) = ctx
        .catalog
        .list_products(ProductListQuery {
            per_page: 2,
            page: 3,
            sort_by: Some(ProductSortKey::Title),
            sort_dir: Some(SortDirection::Asc),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(last_page.len(), 1);
}

#[tokio::test]
async fn update_rederives_slug_and_delete_removes() {
    let ctx = setup().await;
    let product = ctx
        .catalog
        .create_product(create_input("Old Name", dec!(20.00)))
        .await
        .unwrap();

    let updated = ctx
        .catalog
        .update_product(
            product.id,
            UpdateProductInput {
                title: Some("New Name".to_string()),
                price: Some(dec!(25.00)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.slug, "new-name");
    assert_eq!(updated.price, dec!(25.00));

    ctx.catalog.delete_product(product.id).await.unwrap();
    let err = ctx.catalog.get_product(product.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}
