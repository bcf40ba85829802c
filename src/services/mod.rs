pub mod carts;
pub mod catalog;
pub mod coupons;
pub mod orders;

pub use carts::{CartLineInput, CartService, CartToggleOutcome, CartWithItems};
pub use catalog::{CatalogService, CreateProductInput, ProductListQuery, UpdateProductInput};
pub use coupons::{CouponService, CreateCouponInput, UpdateCouponInput};
pub use orders::{OrderService, OrderWithItems};
