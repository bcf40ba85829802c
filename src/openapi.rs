use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "0.1.0",
        description = r#"
E-commerce storefront backend.

## Features

- **Catalog**: product management with typed filter/sort/paginate listings
- **Carts**: per-user cart snapshots with server-resolved prices
- **Coupons**: admin-issued percentage discounts with expiry
- **Orders**: cash-on-delivery checkout with conditional stock decrement

## Authentication

Protected endpoints expect a bearer JWT from the identity provider:

```
Authorization: Bearer <token>
```

## Responses

Every endpoint answers with the same envelope:

```json
{ "success": true, "message": "Cart created", "data": [ ... ] }
```
"#
    ),
    paths(
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::rate_product,
        crate::handlers::carts::toggle_cart,
        crate::handlers::carts::replace_cart,
        crate::handlers::carts::get_cart,
        crate::handlers::carts::empty_cart,
        crate::handlers::carts::apply_coupon,
        crate::handlers::coupons::create_coupon,
        crate::handlers::coupons::list_coupons,
        crate::handlers::coupons::get_coupon,
        crate::handlers::coupons::update_coupon,
        crate::handlers::coupons::delete_coupon,
        crate::handlers::orders::create_cash_order,
        crate::handlers::orders::get_my_orders,
        crate::handlers::orders::get_user_orders,
        crate::handlers::orders::update_order_status,
    ),
    components(schemas(
        crate::handlers::products::CreateProductRequest,
        crate::handlers::products::UpdateProductRequest,
        crate::handlers::products::RateProductRequest,
        crate::handlers::carts::CartRequest,
        crate::handlers::carts::CartLineRequest,
        crate::handlers::carts::ApplyCouponRequest,
        crate::handlers::coupons::CreateCouponRequest,
        crate::handlers::coupons::UpdateCouponRequest,
        crate::handlers::orders::CashOrderRequest,
        crate::handlers::orders::UpdateOrderStatusRequest,
        crate::entities::OrderStatus,
        crate::errors::ErrorResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "storefront-api", description = "Catalog, carts, coupons and orders")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Swagger UI mounted at /docs, serving the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
